// tests/command_tool.rs

use std::path::PathBuf;
use std::sync::Arc;

use pipewright::config::{ConfigNode, Mapping, ToolSpec};
use pipewright::fs::mock::MockFileSystem;
use pipewright::fs::RealFileSystem;
use pipewright::registry::TargetInvocation;
use pipewright::template::Resolver;
use pipewright::tools::command::{invocation_env, shell_quote};
use pipewright::tools::{CommandTool, Tool, ToolRegistry};
use pipewright::types::SourceFilter;
use pipewright_test_utils::{init_tracing, with_timeout, ConfigBuilder};

fn spec(cmd: &str) -> ToolSpec {
    ToolSpec {
        kind: "shell".to_string(),
        cmd: cmd.to_string(),
        filter: None,
    }
}

fn invocation(src: &[&str], dest: Option<&str>) -> TargetInvocation {
    let mut options = Mapping::new();
    options.insert("mangle".to_string(), ConfigNode::string("true"));
    options.insert("source-map".to_string(), ConfigNode::string("inline"));
    TargetInvocation {
        task: "minify".to_string(),
        target: "main".to_string(),
        tool: "shell".to_string(),
        src: src.iter().map(PathBuf::from).collect(),
        dest: dest.map(PathBuf::from),
        options,
    }
}

#[test]
fn tokens_are_substituted_and_paths_quoted() {
    let tool = CommandTool::new(
        spec("uglify [src] -o [dest] --name [task]-[target]"),
        PathBuf::from("."),
        Arc::new(RealFileSystem),
    );
    let inv = invocation(&["src/a.js", "src/my file.js"], Some("dist/app.min.js"));

    assert_eq!(
        tool.render_command(&inv),
        "uglify src/a.js 'src/my file.js' -o dist/app.min.js --name minify-main"
    );
}

#[cfg(unix)]
#[test]
fn shell_quote_escapes_single_quotes() {
    assert_eq!(shell_quote("plain/path.js"), "plain/path.js");
    assert_eq!(shell_quote("it's.js"), r"'it'\''s.js'");
    assert_eq!(shell_quote(""), "''");
}

#[test]
fn environment_carries_invocation_and_scalar_options() {
    let env = invocation_env(&invocation(&["a.js", "b.js"], Some("out.js")));
    let get = |key: &str| {
        env.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };

    assert_eq!(get("PIPEWRIGHT_TASK"), Some("minify"));
    assert_eq!(get("PIPEWRIGHT_TARGET"), Some("main"));
    assert_eq!(get("PIPEWRIGHT_SRC"), Some("a.js\nb.js"));
    assert_eq!(get("PIPEWRIGHT_DEST"), Some("out.js"));
    assert_eq!(get("PIPEWRIGHT_OPT_MANGLE"), Some("true"));
    assert_eq!(get("PIPEWRIGHT_OPT_SOURCE_MAP"), Some("inline"));
}

#[test]
fn configured_tools_are_registered_over_builtins() {
    let store = ConfigBuilder::new()
        .set("tools.minify.cmd", "uglify [src] -o [dest]")
        .set("tools.copy.cmd", "cp [src] [dest]")
        .set("tools.copy.filter", "any")
        .build();
    let resolver = Resolver::new(Arc::new(store));

    let tools =
        ToolRegistry::from_config(&resolver, Arc::new(MockFileSystem::new()), ".".as_ref())
            .unwrap();

    assert!(tools.contains("minify"));
    assert!(tools.contains("concatenate"));
    assert_eq!(
        tools.get("copy").map(|t| t.source_filter()),
        Some(SourceFilter::Any)
    );
}

#[test]
fn tool_without_cmd_is_a_config_error() {
    let store = ConfigBuilder::new().set("tools.minify.args", "-c").build();
    let resolver = Resolver::new(Arc::new(store));

    let err = ToolRegistry::from_config(&resolver, Arc::new(MockFileSystem::new()), ".".as_ref())
        .unwrap_err();

    assert_eq!(err.exit_code(), 2);
}

#[cfg(unix)]
#[tokio::test]
async fn command_runs_in_the_project_root() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "alpha\n").unwrap();
    std::fs::write(dir.path().join("b.txt"), "beta\n").unwrap();

    let tool = CommandTool::new(
        spec("cat [src] > [dest] && echo \"note: $PIPEWRIGHT_TASK\" >&2"),
        dir.path().to_path_buf(),
        Arc::new(RealFileSystem),
    );
    let inv = invocation(&["a.txt", "b.txt"], Some("ab.txt"));

    let out = with_timeout(tool.invoke(&inv)).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(dir.path().join("ab.txt")).unwrap(),
        "alpha\nbeta\n"
    );
    assert_eq!(out.produced, vec![PathBuf::from("ab.txt")]);
    assert_eq!(out.warnings, vec!["note: minify".to_string()]);
}

#[cfg(unix)]
#[tokio::test]
async fn non_zero_exit_reports_code_and_stderr_tail() {
    let dir = tempfile::tempdir().unwrap();
    let tool = CommandTool::new(
        spec("echo 'syntax error in [src]' >&2; exit 3"),
        dir.path().to_path_buf(),
        Arc::new(RealFileSystem),
    );

    let err = with_timeout(tool.invoke(&invocation(&["a.js"], None)))
        .await
        .unwrap_err();
    let message = format!("{err:#}");

    assert!(message.contains("exited with code 3"), "{message}");
    assert!(message.contains("syntax error in a.js"), "{message}");
}

#[cfg(unix)]
#[tokio::test]
async fn produced_files_are_looked_up_through_the_filesystem() {
    let fs = MockFileSystem::new();
    fs.add_file("dist/app.min.js", "min");
    let tool = CommandTool::new(spec("true"), PathBuf::from("."), Arc::new(fs));

    let out = with_timeout(tool.invoke(&invocation(&["a.js"], Some("dist/app.min.js"))))
        .await
        .unwrap();
    assert_eq!(out.produced, vec![PathBuf::from("dist/app.min.js")]);

    let out = with_timeout(tool.invoke(&invocation(&["a.js"], Some("dist/other.js"))))
        .await
        .unwrap();
    assert!(out.produced.is_empty());
}
