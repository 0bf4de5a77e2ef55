// tests/version_sync.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pipewright::config::model::DEFAULT_VERSION_PREFIX;
use pipewright::config::VersionRuleSpec;
use pipewright::errors::PipewrightError;
use pipewright::fs::mock::MockFileSystem;
use pipewright::fs::RealFileSystem;
use pipewright::version::{
    next_version, parse_version, ReleaseKind, VersionRequest, VersionRule, VersionSynchronizer,
};
use pipewright_test_utils::{init_tracing, ConfigBuilder};

fn rule(files: &[&str], version: &str) -> VersionRule {
    let spec = VersionRuleSpec {
        name: "js".to_string(),
        prefix: DEFAULT_VERSION_PREFIX.to_string(),
        files: files.iter().map(|s| s.to_string()).collect(),
    };
    VersionRule::from_spec(&spec, version, Path::new("."))
}

fn manifests() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file(
        "package.json",
        "{\n  \"name\": \"widget\",\n  \"version\": \"1.2.3\"\n}\n",
    );
    fs.add_file(
        "bower.json",
        "{ \"version\": \"1.2.3\", \"deps\": { \"x\": { \"version\": \"0.9.0\" } } }",
    );
    fs.add_file("src/widget.js", "/* no marker here */");
    fs
}

#[test]
fn every_marker_is_rewritten_and_the_prefix_kept() {
    init_tracing();
    let fs = manifests();
    let sync = VersionSynchronizer::new(Arc::new(fs.clone()));

    let report = sync
        .bump(&rule(&["package.json", "bower.json", "src/widget.js"], "1.3.0"))
        .unwrap();

    assert_eq!(report.total(), 3);
    assert_eq!(report.files[0].replacements, 1);
    assert_eq!(report.files[1].replacements, 2);
    assert_eq!(report.files[2].replacements, 0);
    assert_eq!(
        fs.contents("package.json").as_deref(),
        Some("{\n  \"name\": \"widget\",\n  \"version\": \"1.3.0\"\n}\n")
    );
    assert_eq!(
        fs.contents("bower.json").as_deref(),
        Some("{ \"version\": \"1.3.0\", \"deps\": { \"x\": { \"version\": \"1.3.0\" } } }")
    );
    assert_eq!(fs.contents("src/widget.js").as_deref(), Some("/* no marker here */"));
}

#[test]
fn custom_prefix_matches_other_marker_styles() {
    let fs = MockFileSystem::new();
    fs.add_file("src/lib.js", "/*! lib v0.1.0 */\nlib.VERSION = '0.1.0';");
    let spec = VersionRuleSpec {
        name: "banner".to_string(),
        prefix: r"lib v".to_string(),
        files: vec!["src/lib.js".to_string()],
    };

    let report = VersionSynchronizer::new(Arc::new(fs.clone()))
        .bump(&VersionRule::from_spec(&spec, "0.2.0", Path::new(".")))
        .unwrap();

    assert_eq!(report.total(), 1);
    assert_eq!(
        fs.contents("src/lib.js").as_deref(),
        Some("/*! lib v0.2.0 */\nlib.VERSION = '0.1.0';")
    );
}

#[test]
fn missing_file_aborts_before_any_write() {
    let fs = manifests();
    let sync = VersionSynchronizer::new(Arc::new(fs.clone()));

    let err = sync
        .bump(&rule(&["package.json", "missing.json"], "2.0.0"))
        .unwrap_err();

    match &err {
        PipewrightError::FileNotFound(path) => assert_eq!(path, &PathBuf::from("missing.json")),
        other => panic!("expected FileNotFound, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 5);
    assert!(fs.contents("package.json").unwrap().contains("1.2.3"));
}

#[test]
fn zero_matches_warn_or_fail_when_strict() {
    let fs = manifests();

    let lenient = VersionSynchronizer::new(Arc::new(fs.clone()));
    let report = lenient.bump(&rule(&["src/widget.js"], "2.0.0")).unwrap();
    assert_eq!(report.total(), 0);

    let strict = VersionSynchronizer::new(Arc::new(fs.clone())).with_strict(true);
    let err = strict.bump(&rule(&["src/widget.js"], "2.0.0")).unwrap_err();
    assert!(matches!(err, PipewrightError::NoMatchFound { ref rule } if rule == "js"));
    assert_eq!(err.exit_code(), 5);
}

#[test]
fn malformed_version_token_is_rejected() {
    let fs = manifests();
    let sync = VersionSynchronizer::new(Arc::new(fs.clone()));

    let err = sync.bump(&rule(&["package.json"], "1.0 beta")).unwrap_err();

    assert!(matches!(err, PipewrightError::InvalidVersion(_)));
    assert!(fs.contents("package.json").unwrap().contains("1.2.3"));
}

#[test]
fn current_version_is_the_first_marker() {
    let fs = manifests();
    let sync = VersionSynchronizer::new(Arc::new(fs));

    let current = sync
        .current_version(&rule(&["src/widget.js", "bower.json"], ""))
        .unwrap();

    assert_eq!(current.as_deref(), Some("1.2.3"));
}

#[test]
fn release_keywords_follow_semver() {
    let v = |s: &str| parse_version(s).unwrap();

    assert_eq!(next_version(&v("1.2.3"), ReleaseKind::Patch), v("1.2.4"));
    assert_eq!(next_version(&v("1.2.3"), ReleaseKind::Minor), v("1.3.0"));
    assert_eq!(next_version(&v("1.2.3"), ReleaseKind::Major), v("2.0.0"));
    assert_eq!(next_version(&v("2.0.0-rc.1"), ReleaseKind::Major), v("2.0.0"));
    assert_eq!(next_version(&v("1.3.0-beta"), ReleaseKind::Minor), v("1.3.0"));
    assert_eq!(next_version(&v("1.2.4-alpha+build.5"), ReleaseKind::Patch), v("1.2.4"));
    assert_eq!(v("v3.1.0"), v("3.1.0"));
}

#[test]
fn version_requests_parse_keywords_and_exact_versions() {
    assert_eq!(
        "patch".parse::<VersionRequest>().unwrap(),
        VersionRequest::Release(ReleaseKind::Patch)
    );
    assert_eq!(
        "MAJOR".parse::<VersionRequest>().unwrap(),
        VersionRequest::Release(ReleaseKind::Major)
    );
    assert_eq!(
        "1.4.0-rc.1".parse::<VersionRequest>().unwrap(),
        VersionRequest::Exact(parse_version("1.4.0-rc.1").unwrap())
    );

    let err = "not-a-version".parse::<VersionRequest>().unwrap_err();
    assert!(matches!(err, PipewrightError::InvalidVersion(_)));
    assert_eq!(err.exit_code(), 2);

    let err = VersionRequest::Release(ReleaseKind::Minor)
        .resolve(None)
        .unwrap_err();
    assert!(matches!(err, PipewrightError::InvalidVersion(_)));
}

#[test]
fn project_bumps_all_rules_from_the_current_version() {
    let fs = manifests();
    fs.add_file("README.md", "Install widget v1.2.3 today");
    let project = ConfigBuilder::new()
        .version_rule("manifests", &["package.json", "bower.json"])
        .version_rule("readme", &["README.md"])
        .set("versions.readme.prefix", "widget v")
        .project(Arc::new(fs.clone()), ".");

    let request: VersionRequest = "minor".parse().unwrap();
    let reports = project.sync_versions(&request, &[], false).unwrap();

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.version == "1.3.0"));
    assert_eq!(
        fs.contents("README.md").as_deref(),
        Some("Install widget v1.3.0 today")
    );

    // Only the selected rule is touched.
    let request: VersionRequest = "2.0.0".parse().unwrap();
    let reports = project
        .sync_versions(&request, &["readme".to_string()], false)
        .unwrap();
    assert_eq!(reports.len(), 1);
    assert!(fs.contents("package.json").unwrap().contains("1.3.0"));
    assert!(fs.contents("README.md").unwrap().contains("v2.0.0"));
}

#[test]
fn project_checks_every_rule_before_writing() {
    let fs = manifests();
    let project = ConfigBuilder::new()
        .version_rule("manifests", &["package.json"])
        .version_rule("docs", &["docs/missing.md"])
        .project(Arc::new(fs.clone()), ".");

    let err = project
        .sync_versions(&"9.9.9".parse().unwrap(), &[], false)
        .unwrap_err();

    assert!(matches!(err, PipewrightError::FileNotFound(_)));
    assert!(fs.contents("package.json").unwrap().contains("1.2.3"));

    let err = project
        .sync_versions(&"9.9.9".parse().unwrap(), &["nope".to_string()], false)
        .unwrap_err();
    assert!(matches!(err, PipewrightError::ConfigError(_)));
}

#[test]
fn strict_versions_setting_applies_without_the_flag() {
    let fs = manifests();
    let project = ConfigBuilder::new()
        .setting("strict_versions", true)
        .version_rule("source", &["src/widget.js"])
        .project(Arc::new(fs), ".");

    let err = project
        .sync_versions(&"2.0.0".parse().unwrap(), &[], false)
        .unwrap_err();

    assert!(matches!(err, PipewrightError::NoMatchFound { .. }));
}

#[test]
fn rewrite_on_disk_is_atomic_and_complete() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("package.json");
    std::fs::write(&manifest, "{ \"version\": \"0.1.0\" }").unwrap();

    let spec = VersionRuleSpec {
        name: "pkg".to_string(),
        prefix: DEFAULT_VERSION_PREFIX.to_string(),
        files: vec!["package.json".to_string()],
    };
    let report = VersionSynchronizer::new(Arc::new(RealFileSystem))
        .bump(&VersionRule::from_spec(&spec, "0.2.0", dir.path()))
        .unwrap();

    assert_eq!(report.total(), 1);
    assert_eq!(
        std::fs::read_to_string(&manifest).unwrap(),
        "{ \"version\": \"0.2.0\" }"
    );
    // No temp files are left behind next to the target.
    let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(leftovers, 1);
}

#[test]
fn strict_miss_in_a_later_rule_leaves_earlier_rules_untouched() {
    let fs = manifests();
    let project = ConfigBuilder::new()
        .version_rule("manifests", &["package.json"])
        .version_rule("source", &["src/widget.js"])
        .project(Arc::new(fs.clone()), ".");

    let err = project
        .sync_versions(&"2.0.0".parse().unwrap(), &[], true)
        .unwrap_err();

    assert!(matches!(err, PipewrightError::NoMatchFound { ref rule } if rule == "source"));
    assert!(fs.contents("package.json").unwrap().contains("1.2.3"));
}

#[test]
fn check_counts_markers_without_writing() {
    let fs = manifests();
    let sync = VersionSynchronizer::new(Arc::new(fs.clone()));

    let count = sync.check(&rule(&["package.json", "bower.json"], "3.0.0")).unwrap();

    assert_eq!(count, 3);
    assert!(fs.contents("bower.json").unwrap().contains("0.9.0"));
}
