//! Moving artifacts into the quarantine tree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CollectError, Result};

/// Record of one eviction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineAction {
    /// Where the artifact lived in the output tree.
    pub from: PathBuf,

    /// Where it lives now.
    pub to: PathBuf,

    /// Whether an adjacent source map moved with it.
    pub source_map_moved: bool,
}

/// Move `relative` from `output_root` to the same relative path under
/// `quarantine_dir`, carrying its source map along if one exists.
pub(crate) fn quarantine(
    output_root: &Path,
    quarantine_dir: &Path,
    relative: &Path,
    source_map_suffix: &str,
) -> Result<QuarantineAction> {
    let from = output_root.join(relative);
    let to = quarantine_dir.join(relative);

    move_file(&from, &to)?;
    debug!("Quarantined {} -> {}", from.display(), to.display());

    let map_from = with_suffix(&from, source_map_suffix);
    let source_map_moved = if map_from.is_file() {
        let map_to = with_suffix(&to, source_map_suffix);
        match move_file(&map_from, &map_to) {
            Ok(()) => true,
            Err(e) => {
                warn!("{e}");
                false
            }
        }
    } else {
        false
    };

    Ok(QuarantineAction {
        from,
        to,
        source_map_moved,
    })
}

fn move_file(from: &Path, to: &Path) -> Result<()> {
    let fail = |source| CollectError::EvictionFailure {
        path: from.to_path_buf(),
        source,
    };

    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(fail)?;
    }
    match fs::rename(from, to) {
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!("{} is on another filesystem, copying", to.display());
            copy_then_remove(from, to).map_err(fail)
        }
        result => result.map_err(fail),
    }
}

/// Rename fallback across filesystems.
fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to)?;
    if let Err(e) = fs::remove_file(from) {
        // Leave exactly one copy behind.
        let _ = fs::remove_file(to);
        return Err(e);
    }
    Ok(())
}

/// `app.js` + `.map` -> `app.js.map`.
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
