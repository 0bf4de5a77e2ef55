// tests/watch_loop.rs

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use pipewright::config::WatchRule;
use pipewright::engine::{LoopEvent, LoopOptions, LoopPhase, PipelineName, WatchCore, WatchLoop};
use pipewright::errors::Result;
use pipewright::watch::{build_profiles, pipelines_for_path, relative_str};
use pipewright_test_utils::{init_tracing, with_timeout, FakeRebuildBackend};

type Started = Arc<Mutex<Vec<PipelineName>>>;

struct Harness {
    tx: mpsc::Sender<LoopEvent>,
    started: Started,
    handle: JoinHandle<Result<WatchCore>>,
}

impl Harness {
    fn spawn(
        debounce_ms: u64,
        grace_ms: u64,
        configure: impl FnOnce(FakeRebuildBackend) -> FakeRebuildBackend,
    ) -> Self {
        init_tracing();
        let (tx, rx) = mpsc::channel(64);
        let started: Started = Arc::new(Mutex::new(Vec::new()));
        let backend = configure(FakeRebuildBackend::new(tx.clone(), Arc::clone(&started)));
        let core = WatchCore::new(LoopOptions {
            debounce: Duration::from_millis(debounce_ms),
            grace_period: Duration::from_millis(grace_ms),
        });
        let handle = tokio::spawn(WatchLoop::new(core, rx, tx.clone(), backend).run());
        Self {
            tx,
            started,
            handle,
        }
    }

    async fn change(&self, pipeline: &str) {
        self.tx
            .send(LoopEvent::Changed {
                pipeline: pipeline.to_string(),
            })
            .await
            .unwrap();
    }

    async fn cancel(self) -> (WatchCore, Vec<PipelineName>) {
        self.tx.send(LoopEvent::CancelRequested).await.unwrap();
        let core = with_timeout(self.handle).await.unwrap().unwrap();
        let started = self.started.lock().unwrap().clone();
        (core, started)
    }
}

#[tokio::test]
async fn burst_of_changes_triggers_a_single_rebuild() {
    let h = Harness::spawn(50, 1000, |b| b);

    for _ in 0..5 {
        h.change("build").await;
        sleep(Duration::from_millis(5)).await;
    }
    sleep(Duration::from_millis(250)).await;

    let (core, started) = h.cancel().await;
    assert_eq!(started, vec!["build"]);
    assert_eq!(core.completed_runs(), 1);
    assert_eq!(core.phase(), LoopPhase::Stopped);
}

#[tokio::test]
async fn changes_during_a_run_cause_one_follow_up_run() {
    let h = Harness::spawn(20, 1000, |b| b.with_duration(Duration::from_millis(150)));

    h.change("build").await;
    sleep(Duration::from_millis(80)).await;
    for _ in 0..3 {
        h.change("build").await;
    }
    sleep(Duration::from_millis(600)).await;

    let (core, started) = h.cancel().await;
    assert_eq!(started, vec!["build", "build"]);
    assert_eq!(core.completed_runs(), 2);
}

#[tokio::test]
async fn second_pipeline_waits_for_the_running_one() {
    let h = Harness::spawn(20, 1000, |b| b.with_duration(Duration::from_millis(150)));

    h.change("css").await;
    sleep(Duration::from_millis(60)).await;
    h.change("js").await;
    h.change("js").await;
    sleep(Duration::from_millis(600)).await;

    let (core, started) = h.cancel().await;
    assert_eq!(started, vec!["css", "js"]);
    assert_eq!(core.completed_runs(), 2);
}

#[tokio::test]
async fn failures_are_survived() {
    let h = Harness::spawn(20, 1000, |b| b.failing("build"));

    h.change("build").await;
    sleep(Duration::from_millis(150)).await;
    h.change("build").await;
    sleep(Duration::from_millis(150)).await;

    let (core, started) = h.cancel().await;
    assert_eq!(started, vec!["build", "build"]);
    assert_eq!(core.failed_runs(), 2);
}

#[tokio::test]
async fn cancel_waits_for_the_in_flight_rebuild() {
    let h = Harness::spawn(10, 5000, |b| b.with_duration(Duration::from_millis(200)));

    h.change("build").await;
    sleep(Duration::from_millis(60)).await;

    let begin = Instant::now();
    let (core, started) = h.cancel().await;

    assert_eq!(started, vec!["build"]);
    assert_eq!(core.completed_runs(), 1);
    assert!(begin.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn cancel_gives_up_after_the_grace_period() {
    let h = Harness::spawn(10, 100, |b| b.holding());

    h.change("build").await;
    sleep(Duration::from_millis(60)).await;

    let (core, started) = h.cancel().await;

    assert_eq!(started, vec!["build"]);
    assert_eq!(core.completed_runs(), 0);
    assert_eq!(core.running(), Some("build"));
    assert_eq!(core.phase(), LoopPhase::Stopped);
}

fn rule(name: &str, files: &[&str], exclude: &[&str], pipeline: &str) -> WatchRule {
    WatchRule {
        name: name.to_string(),
        files: files.iter().map(|s| s.to_string()).collect(),
        exclude: exclude.iter().map(|s| s.to_string()).collect(),
        pipeline: pipeline.to_string(),
    }
}

#[test]
fn paths_map_to_their_pipelines() {
    let profiles = build_profiles(&[
        rule("less", &["less/**/*.less"], &[], "build-css"),
        rule("vars", &["less/variables.less"], &[], "build-css"),
        rule("js", &["js/*.js", "!js/*.min.js"], &["js/vendor.js"], "build-js"),
        rule("all", &["**/*.md"], &[], "docs"),
    ])
    .unwrap();

    assert_eq!(pipelines_for_path("less/variables.less", &profiles), vec!["build-css"]);
    assert_eq!(pipelines_for_path("js/app.js", &profiles), vec!["build-js"]);
    assert!(pipelines_for_path("js/app.min.js", &profiles).is_empty());
    assert!(pipelines_for_path("js/vendor.js", &profiles).is_empty());
    assert!(pipelines_for_path("js/lib/deep.js", &profiles).is_empty());
    assert_eq!(pipelines_for_path("README.md", &profiles), vec!["docs"]);
    assert_eq!(pipelines_for_path("less/README.md", &profiles), vec!["docs"]);
}

#[test]
fn invalid_watch_glob_is_rejected() {
    assert!(build_profiles(&[rule("bad", &["src/[.js"], &[], "default")]).is_err());
}

#[test]
fn event_paths_are_made_relative_to_the_root() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("less")).unwrap();
    let file = dir.path().join("less/site.less");
    std::fs::write(&file, "a{}").unwrap();

    assert_eq!(
        relative_str(dir.path(), &file).as_deref(),
        Some("less/site.less")
    );
    assert_eq!(relative_str(&dir.path().join("less"), dir.path()), None);
}
