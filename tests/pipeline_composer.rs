// tests/pipeline_composer.rs

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use pipewright::errors::PipewrightError;
use pipewright::fs::mock::MockFileSystem;
use pipewright::pipeline::{Composer, PipelineSet};
use pipewright::project::Project;
use pipewright::registry::Registry;
use pipewright::template::Resolver;
use pipewright::tools::ToolRegistry;
use pipewright_test_utils::{init_tracing, with_timeout, CallLog, ConfigBuilder, RecordingTool};

/// Three tasks, each with targets that need no sources.
fn base_config() -> ConfigBuilder {
    ConfigBuilder::new()
        .set("lint.scripts.dest", "reports/scripts.txt")
        .set("lint.styles.dest", "reports/styles.txt")
        .set("compile.main.dest", "dist/app.js")
        .set("package.zip.dest", "dist/app.zip")
}

/// Registers one recording tool per task kind, all sharing one log.
fn recording_tools(log: &CallLog, fail_on: Option<&str>) -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    for kind in ["lint", "compile", "package"] {
        let mut tool = RecordingTool::with_log(Arc::clone(log));
        if let Some(identity) = fail_on {
            tool = tool.failing_on(identity);
        }
        tools.register(kind, Arc::new(tool));
    }
    tools
}

fn composer(builder: ConfigBuilder, tools: ToolRegistry) -> Composer {
    let project = builder.project(Arc::new(MockFileSystem::new()), ".");
    project.composer_with_tools(tools, false).unwrap()
}

fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

#[tokio::test]
async fn steps_run_strictly_in_declaration_order() {
    init_tracing();
    let log = new_log();
    let composer = composer(
        base_config().pipeline("default", &["lint", "compile:main", "package"]),
        recording_tools(&log, None),
    );

    let report = with_timeout(composer.run("default")).await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["lint:scripts", "lint:styles", "compile:main", "package:zip"]
    );
    assert_eq!(report.steps.len(), 4);
    assert_eq!(report.invocation_count(), 4);
    assert_eq!(report.steps[2].identity, "compile:main");
    assert_eq!(report.steps[2].produced, vec![PathBuf::from("dist/app.js")]);
}

#[tokio::test]
async fn nested_pipelines_are_flattened_in_place() {
    let log = new_log();
    let composer = composer(
        base_config()
            .pipeline("check", &["lint:styles"])
            .pipeline("build", &["check", "compile"])
            .pipeline("release", &["build", "package", "check"]),
        recording_tools(&log, None),
    );

    let flat: Vec<String> = composer
        .flatten("release")
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(flat, vec!["lint:styles", "compile", "package", "lint:styles"]);

    composer.run("release").await.unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["lint:styles", "compile:main", "package:zip", "lint:styles"]
    );
}

#[tokio::test]
async fn first_failure_aborts_the_remaining_steps() {
    let log = new_log();
    let composer = composer(
        base_config().pipeline("default", &["lint", "compile", "package"]),
        recording_tools(&log, Some("compile:main")),
    );

    let err = composer.run("default").await.unwrap_err();

    match &err {
        PipewrightError::ToolFailed {
            step,
            identity,
            message,
        } => {
            assert_eq!(*step, 2);
            assert_eq!(identity, "compile:main");
            assert!(message.contains("configured to fail"), "message: {message}");
        }
        other => panic!("expected ToolFailed, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 4);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["lint:scripts", "lint:styles", "compile:main"]
    );
}

#[tokio::test]
async fn completed_steps_are_not_rolled_back() {
    let fs = MockFileSystem::new();
    fs.add_file("src/a.txt", "alpha");

    let log = new_log();
    let mut tools = ToolRegistry::with_builtins(Arc::new(fs.clone()));
    tools.register(
        "publish",
        Arc::new(RecordingTool::with_log(Arc::clone(&log)).failing_on("publish:site")),
    );

    let project = ConfigBuilder::new()
        .set("copy.assets.src", "src/a.txt")
        .set("copy.assets.dest", "build/a.txt")
        .set("publish.site.dest", "remote")
        .pipeline("deploy", &["copy", "publish"])
        .project(Arc::new(fs.clone()), ".");
    let composer = project.composer_with_tools(tools, false).unwrap();

    let err = composer.run("deploy").await.unwrap_err();

    assert!(matches!(err, PipewrightError::ToolFailed { step: 1, .. }));
    assert_eq!(fs.contents("build/a.txt").as_deref(), Some("alpha"));
}

#[tokio::test]
async fn later_steps_see_files_produced_by_earlier_steps() {
    let fs = MockFileSystem::new();
    fs.add_file("src/a.txt", "alpha");
    fs.add_file("src/b.txt", "beta");

    let recorder = RecordingTool::new();
    let mut tools = ToolRegistry::with_builtins(Arc::new(fs.clone()));
    tools.register("archive", Arc::new(recorder.clone()));

    let project = ConfigBuilder::new()
        .set_list("copy.assets.src", &["src/*.txt"])
        .set("copy.assets.dest", "build")
        .set_list("archive.all.src", &["build/*.txt"])
        .set("archive.all.dest", "dist/all.tar")
        .pipeline("default", &["copy", "archive"])
        .project(Arc::new(fs.clone()), ".");
    let composer = project.composer_with_tools(tools, false).unwrap();

    // Nothing under build/ exists yet when the pipeline is planned.
    let plan = composer.plan("default").unwrap();
    assert_eq!(plan.steps.len(), 2);

    composer.run_plan(&plan).await.unwrap();

    let invocations = recorder.invocations();
    assert_eq!(invocations.len(), 1);
    assert_eq!(
        invocations[0].src,
        vec![PathBuf::from("build/a.txt"), PathBuf::from("build/b.txt")]
    );
}

#[tokio::test]
async fn self_including_pipeline_fails_before_any_tool_runs() {
    let store = base_config().pipeline("p1", &["lint", "p1"]).build();

    let err = Project::from_store(store, Arc::new(MockFileSystem::new()), ".").unwrap_err();

    match &err {
        PipewrightError::CyclicPipeline { chain } => assert_eq!(chain, &vec!["p1", "p1"]),
        other => panic!("expected CyclicPipeline, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn indirect_pipeline_cycles_are_rejected_at_construction() {
    let store = Arc::new(base_config().build());
    let registry = Registry::new(
        Arc::new(Resolver::new(store)),
        Arc::new(MockFileSystem::new()),
        ".",
    );
    let pipelines = PipelineSet::from_steps(vec![
        ("a", vec!["lint", "b"]),
        ("b", vec!["c"]),
        ("c", vec!["compile", "a"]),
    ])
    .unwrap();

    let err = Composer::new(pipelines, registry, ToolRegistry::new()).unwrap_err();

    match err {
        PipewrightError::CyclicPipeline { chain } => {
            assert_eq!(chain.len(), 4);
            assert_eq!(chain.first(), chain.last());
        }
        other => panic!("expected CyclicPipeline, got {other:?}"),
    }
}

#[tokio::test]
async fn plan_resolves_everything_without_running() {
    let log = new_log();
    let composer = composer(
        base_config()
            .set("pkg.name", "widget")
            .set("package.zip.dest", "dist/{{ pkg.name }}.zip")
            .pipeline("default", &["lint:scripts", "package"]),
        recording_tools(&log, None),
    );

    let plan = composer.plan("default").unwrap();

    let identities: Vec<String> = plan.steps.iter().map(|s| s.identity()).collect();
    assert_eq!(identities, vec!["lint:scripts", "package:zip"]);
    assert_eq!(plan.steps[1].index, 1);
    assert_eq!(plan.steps[1].target.spec.dest.as_deref(), Some("dist/widget.zip"));
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_tool_is_reported_at_plan_time() {
    let log = new_log();
    let composer = composer(
        base_config()
            .set("minify.main.dest", "dist/app.min.js")
            .pipeline("default", &["lint", "minify"]),
        recording_tools(&log, None),
    );

    let err = composer.run("default").await.unwrap_err();

    assert!(matches!(err, PipewrightError::ConfigError(ref m) if m.contains("minify")));
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn bare_task_and_task_target_names_run_as_one_step_pipelines() {
    let log = new_log();
    let composer = composer(base_config(), recording_tools(&log, None));

    composer.run("lint:styles").await.unwrap();
    composer.run("package").await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["lint:styles", "package:zip"]);
}

#[tokio::test]
async fn unknown_names_are_config_errors() {
    let log = new_log();
    let composer = composer(
        base_config().pipeline("default", &["lint", "ghost"]),
        recording_tools(&log, None),
    );

    for name in ["nothing", "lint:ghost", "default", "settings"] {
        let err = composer.run(name).await.unwrap_err();
        assert!(
            matches!(err, PipewrightError::ConfigError(_)),
            "{name}: expected ConfigError, got {err:?}"
        );
    }
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn templated_step_targets_resolve_lazily() {
    let log = new_log();
    let composer = composer(
        base_config()
            .set("lint.broken.dest", "{{ missing.value }}")
            .pipeline("styles", &["lint:styles"]),
        recording_tools(&log, None),
    );

    // An unresolvable target elsewhere in the task does not block this step.
    composer.run("styles").await.unwrap();

    let err = composer.run("lint").await.unwrap_err();
    assert!(matches!(err, PipewrightError::PathNotFound(_)));
    assert_eq!(*log.lock().unwrap(), vec!["lint:styles"]);
}
