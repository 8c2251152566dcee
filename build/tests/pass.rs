use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use pretty_assertions::assert_eq;
use quire_build::{
    BuildConfig, CopyTransformer, Format, FormatConfig, LiveBuild, PassReport, build_all,
    run_for_change, run_pass,
};
use quire_changeset::{ExcludeSpec, MatchKinds};
use quire_collector::{Collector, CollectorConfig};
use quire_invalidation::{StyleReferences, TemplateReferences};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn write_at(path: &Path, contents: &str, secs: u64) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut file = File::create(path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

struct Site {
    temp: TempDir,
}

impl Site {
    fn new() -> Self {
        init_tracing();
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    fn src(&self) -> PathBuf {
        self.temp.path().join("styles")
    }

    fn out(&self) -> PathBuf {
        self.temp.path().join("css")
    }

    fn styles(&self) -> FormatConfig {
        FormatConfig::new("styles", self.src(), self.out(), ["scss"], "css")
            .with_exclude(ExcludeSpec::List(vec!["_".to_string()]))
            .with_references(StyleReferences::new())
    }

    fn format(&self) -> Format {
        Format::from_config(&self.styles(), MatchKinds::default())
    }

    fn collector(&self) -> Collector {
        Collector::new(CollectorConfig::new(self.temp.path().join("quarantine")))
    }
}

fn pages(site: &Site) -> Format {
    let config = FormatConfig::new(
        "pages",
        site.temp.path().join("pages"),
        site.temp.path().join("public"),
        ["html"],
        "html",
    )
    .with_references(TemplateReferences::default());
    Format::from_config(&config, MatchKinds::default())
}

fn built(report: &PassReport) -> Vec<&str> {
    report
        .built
        .iter()
        .map(|p| p.to_str().unwrap())
        .collect()
}

#[test]
fn test_full_pass_builds_only_stale_sources() {
    let site = Site::new();
    write_at(&site.src().join("a.scss"), ".a {}", 100);
    write_at(&site.src().join("b.scss"), ".b {}", 100);
    write_at(&site.out().join("b.css"), "compiled b", 200);
    write_at(&site.src().join("_vars.scss"), "$x: 1;", 100);

    let report = run_pass(&site.format(), &CopyTransformer, &site.collector()).unwrap();

    assert_eq!(report.scanned, 2);
    assert_eq!(built(&report), vec!["a.scss"]);
    assert_eq!(report.fresh, 1);
    assert_eq!(report.evicted, 0);
    assert_eq!(
        fs::read_to_string(site.out().join("a.css")).unwrap(),
        ".a {}"
    );
    assert_eq!(
        fs::read_to_string(site.out().join("b.css")).unwrap(),
        "compiled b"
    );
    assert!(!site.out().join("_vars.css").exists());
}

#[test]
fn test_partial_bump_rebuilds_dependent() {
    let site = Site::new();
    write_at(&site.src().join("a.scss"), "@import \"vars\";\n.a {}", 100);
    write_at(&site.out().join("a.css"), "old", 200);
    write_at(&site.src().join("_vars.scss"), "$x: 1;", 300);

    let report = run_pass(&site.format(), &CopyTransformer, &site.collector()).unwrap();

    assert_eq!(built(&report), vec!["a.scss"]);
    assert_eq!(report.dangling, 0);
    assert!(
        fs::read_to_string(site.out().join("a.css"))
            .unwrap()
            .contains(".a {}")
    );
}

#[test]
fn test_second_pass_is_a_no_op() {
    let site = Site::new();
    write_at(&site.src().join("a.scss"), ".a {}", 100);

    let format = site.format();
    let first = run_pass(&format, &CopyTransformer, &site.collector()).unwrap();
    let second = run_pass(&format, &CopyTransformer, &site.collector()).unwrap();

    assert_eq!(built(&first), vec!["a.scss"]);
    assert!(second.built.is_empty());
    assert_eq!(second.fresh, 1);
}

#[test]
fn test_orphaned_output_is_quarantined() {
    let site = Site::new();
    write_at(&site.src().join("a.scss"), ".a {}", 100);
    write_at(&site.out().join("a.css"), ".a {}", 200);
    write_at(&site.out().join("removed.css"), ".gone {}", 200);

    let report = run_pass(&site.format(), &CopyTransformer, &site.collector()).unwrap();

    assert_eq!(report.evicted, 1);
    assert!(site.out().join("a.css").exists());
    assert!(!site.out().join("removed.css").exists());
    assert!(site.temp.path().join("quarantine/removed.css").exists());
}

#[test]
fn test_collection_can_be_disabled() {
    let site = Site::new();
    write_at(&site.src().join("a.scss"), ".a {}", 100);
    write_at(&site.out().join("removed.css"), ".gone {}", 200);

    let format = Format::from_config(
        &site.styles().without_collection(),
        MatchKinds::default(),
    );
    let report = run_pass(&format, &CopyTransformer, &site.collector()).unwrap();

    assert_eq!(report.evicted, 0);
    assert!(site.out().join("removed.css").exists());
}

#[test]
fn test_transform_failure_is_reported_not_fatal() {
    let site = Site::new();
    write_at(&site.src().join("bad.scss"), "{", 100);
    write_at(&site.src().join("good.scss"), ".g {}", 100);
    write_at(&site.out().join("bad.css"), "last good output", 50);

    let failing = |dir: &Path, rel: &Path| -> anyhow::Result<String> {
        if rel == Path::new("bad.scss") {
            anyhow::bail!("unbalanced braces");
        }
        Ok(fs::read_to_string(dir.join(rel))?)
    };
    let report = run_pass(&site.format(), &failing, &site.collector()).unwrap();

    assert_eq!(built(&report), vec!["good.scss"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, PathBuf::from("bad.scss"));
    assert!(report.failed[0].1.contains("unbalanced braces"));
    // Still tracked, so its previous output is kept.
    assert_eq!(report.evicted, 0);
    assert!(site.out().join("bad.css").exists());
}

#[test]
fn test_missing_source_root_fails_pass() {
    let site = Site::new();
    let result = run_pass(&site.format(), &CopyTransformer, &site.collector());
    assert!(result.is_err());
}

#[test]
fn test_change_to_partial_rebuilds_only_dependents() {
    let site = Site::new();
    write_at(&site.src().join("a.scss"), "@import \"vars\";\n.a {}", 100);
    write_at(&site.out().join("a.css"), "old a", 200);
    // c is stale on its own but does not reference the partial.
    write_at(&site.src().join("c.scss"), ".c {}", 100);
    write_at(&site.out().join("c.css"), "old c", 50);
    write_at(&site.src().join("_vars.scss"), "$x: 1;", 300);

    let report = run_for_change(
        &site.format(),
        &CopyTransformer,
        &site.collector(),
        Path::new("_vars.scss"),
    )
    .unwrap();

    assert_eq!(built(&report), vec!["a.scss"]);
    assert_eq!(
        fs::read_to_string(site.out().join("c.css")).unwrap(),
        "old c"
    );
}

#[test]
fn test_change_to_tracked_source_rebuilds_it() {
    let site = Site::new();
    write_at(&site.src().join("a.scss"), ".a { new }", 300);
    write_at(&site.out().join("a.css"), "old a", 200);
    write_at(&site.src().join("b.scss"), ".b {}", 300);
    write_at(&site.out().join("b.css"), "old b", 200);

    let report = run_for_change(
        &site.format(),
        &CopyTransformer,
        &site.collector(),
        Path::new("a.scss"),
    )
    .unwrap();

    assert_eq!(built(&report), vec!["a.scss"]);
    assert_eq!(
        fs::read_to_string(site.out().join("b.css")).unwrap(),
        "old b"
    );
}

#[test]
fn test_build_all_from_toml() {
    let site = Site::new();
    write_at(&site.src().join("main.scss"), "@use \"colors\";", 100);
    write_at(&site.src().join("lib/_colors.scss"), "$c: red;", 100);
    write_at(&site.temp.path().join("pages/index.html"), "<p>hi</p>", 100);

    let toml = r#"
quarantine_dir = "quarantine"

[[format]]
name = "styles"
source_dir = "styles"
output_dir = "css"
source_extensions = ["scss"]
target_extension = "css"
exclude = ["_"]
references = { kind = "style", load_paths = ["lib"] }

[[format]]
name = "pages"
source_dir = "pages"
output_dir = "public"
source_extensions = ["html"]
target_extension = "html"
"#;
    let config = BuildConfig::from_toml_str(toml, site.temp.path()).unwrap();
    let reports = build_all(&config, &CopyTransformer).unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].format, "styles");
    assert_eq!(built(&reports[0]), vec!["main.scss"]);
    assert_eq!(reports[0].dangling, 0);
    assert_eq!(reports[1].format, "pages");
    assert_eq!(built(&reports[1]), vec!["index.html"]);
    assert!(site.temp.path().join("public/index.html").exists());

    let json = serde_json::to_value(&reports[1]).unwrap();
    assert_eq!(json["format"], "pages");
    assert_eq!(json["built"][0], "index.html");
}

#[tokio::test]
async fn test_live_build_starts_with_missing_sources() {
    let site = Site::new();
    let config = BuildConfig::new()
        .with_quarantine_dir(site.temp.path().join("quarantine"))
        .with_format(site.styles());

    let mut live = LiveBuild::start(&config, Arc::new(CopyTransformer)).unwrap();
    assert_eq!(live.formats(), 1);

    live.stop();
    assert_eq!(live.formats(), 0);
}

#[test]
fn test_change_to_tracked_base_rebuilds_pages_extending_it() {
    let site = Site::new();
    let src = site.temp.path().join("pages");
    let out = site.temp.path().join("public");
    write_at(&src.join("a.html"), r#"{% extends "b.html" %}"#, 100);
    write_at(&src.join("b.html"), r#"{% extends "c.html" %}"#, 100);
    write_at(&src.join("c.html"), "<body></body>", 300);
    write_at(&src.join("other.html"), "<p>unrelated</p>", 100);
    for page in ["a.html", "b.html", "c.html", "other.html"] {
        write_at(&out.join(page), "old", 200);
    }

    let report = run_for_change(
        &pages(&site),
        &CopyTransformer,
        &site.collector(),
        Path::new("c.html"),
    )
    .unwrap();

    assert_eq!(built(&report), vec!["a.html", "b.html", "c.html"]);
    assert_eq!(report.fresh, 0);
    assert_eq!(fs::read_to_string(out.join("other.html")).unwrap(), "old");
}

#[test]
fn test_new_page_with_missing_include_reports_dangling() {
    let site = Site::new();
    let src = site.temp.path().join("pages");
    write_at(
        &src.join("new.html"),
        r#"{% include "missing.html" %}<p>new</p>"#,
        100,
    );

    let report = run_pass(&pages(&site), &CopyTransformer, &site.collector()).unwrap();

    assert_eq!(built(&report), vec!["new.html"]);
    assert_eq!(report.dangling, 1);
}

#[test]
fn test_per_change_fresh_counts_only_affected_sources() {
    let site = Site::new();
    write_at(&site.src().join("a.scss"), ".a {}", 100);
    write_at(&site.out().join("a.css"), "old a", 200);
    write_at(&site.src().join("b.scss"), ".b {}", 100);
    write_at(&site.out().join("b.css"), "old b", 200);

    let report = run_for_change(
        &site.format(),
        &CopyTransformer,
        &site.collector(),
        Path::new("a.scss"),
    )
    .unwrap();

    assert!(report.built.is_empty());
    assert_eq!(report.scanned, 2);
    assert_eq!(report.fresh, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_live_build_rebuilds_dependent_of_edited_partial() {
    let site = Site::new();
    write_at(&site.src().join("a.scss"), "@import \"vars\";\n.a {}", 100);
    write_at(&site.src().join("_vars.scss"), "$x: 1;", 100);

    let config = BuildConfig::new()
        .with_quarantine_dir(site.temp.path().join("quarantine"))
        .with_quiet_window(Duration::from_millis(100))
        .with_format(site.styles());
    let initial = build_all(&config, &CopyTransformer).unwrap();
    assert_eq!(built(&initial[0]), vec!["a.scss"]);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut live = LiveBuild::start_with_reports(
        &config,
        Arc::new(CopyTransformer),
        Arc::new(move |report: PassReport| {
            let _ = tx.send(report);
        }),
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    fs::write(site.src().join("_vars.scss"), "$x: 2;").unwrap();

    let rebuilt = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Some(report) if !report.built.is_empty() => break report,
                Some(_) => continue,
                None => panic!("live build dropped its report channel"),
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(built(&rebuilt), vec!["a.scss"]);
    live.stop();
}
