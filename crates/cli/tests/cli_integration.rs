use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

/// A scratch project directory, removed when dropped.
struct Project {
    root: PathBuf,
}

impl Project {
    fn new(label: &str) -> Self {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        let root = std::env::temp_dir().join(format!(
            "paramkit-{label}-{}-{stamp}",
            std::process::id()
        ));
        fs::create_dir_all(&root).expect("failed to create project dir");
        Self { root }
    }

    fn root(&self) -> &Path {
        &self.root
    }

    /// Write option definitions and return their path.
    fn defs(&self, json: &str) -> PathBuf {
        let path = self.root.join("defs.json");
        fs::write(&path, json).expect("failed to write definitions");
        path
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn paramkit() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_paramkit"));
    cmd.env("RUST_LOG", "off");
    cmd
}

fn stdout_json(out: &Output) -> serde_json::Value {
    assert!(
        out.status.success(),
        "paramkit failed:\nstatus: {}\nstderr:\n{}",
        out.status,
        String::from_utf8_lossy(&out.stderr),
    );
    serde_json::from_slice(&out.stdout).expect("stdout is not JSON")
}

#[test]
fn help_works() {
    let out = paramkit()
        .arg("--help")
        .output()
        .expect("failed to run paramkit --help");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        stdout.contains("paramkit") && stdout.contains("parse") && stdout.contains("normalize"),
        "unexpected help output:\n{stdout}"
    );
}

#[test]
fn parse_prints_values() {
    let project = Project::new("parse-values");
    let defs = project.defs(
        r#"{ "prog": "demo", "options": { "n": 10, "v.type": "verbose", "f": false } }"#,
    );

    let out = paramkit()
        .arg("parse")
        .arg("--defs")
        .arg(&defs)
        .args(["--", "-n", "20", "-vv", "-f"])
        .output()
        .expect("failed to run paramkit parse");
    let json = stdout_json(&out);
    assert_eq!(json["values"]["n"], 20);
    assert_eq!(json["values"]["v"], 2);
    assert_eq!(json["values"]["f"], true);
    assert_eq!(json["values"]["help"], false);
}

#[test]
fn missing_required_prints_help_and_exits() {
    let project = Project::new("parse-required");
    let defs = project.defs(
        r#"{ "prog": "demo", "options": { "c.required": true, "a": 1 } }"#,
    );

    let out = paramkit()
        .arg("parse")
        .arg("-d")
        .arg(&defs)
        .args(["--", "-a", "2"])
        .output()
        .expect("failed to run paramkit parse");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Error: Option '-c' is required."), "stderr:\n{stderr}");
    assert!(stderr.contains("Usage:"), "stderr:\n{stderr}");
    assert!(out.stdout.is_empty());

    let out = paramkit()
        .arg("parse")
        .arg("-d")
        .arg(&defs)
        .arg("--no-exit")
        .args(["--", "-a", "2"])
        .output()
        .expect("failed to run paramkit parse --no-exit");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Option '-c' is required."), "stderr:\n{stderr}");
    assert!(!stderr.contains("Usage:"), "stderr:\n{stderr}");
}

#[test]
fn no_exit_reports_warnings() {
    let project = Project::new("parse-warnings");
    let defs = project.defs(r#"{ "options": { "a": 1 } }"#);

    let out = paramkit()
        .arg("parse")
        .arg("-d")
        .arg(&defs)
        .arg("--no-exit")
        .args(["--", "-a", "2", "--nope", "x"])
        .output()
        .expect("failed to run paramkit parse");
    let json = stdout_json(&out);
    assert_eq!(json["values"]["a"], 2);
    assert_eq!(json["warnings"][0], "Unrecognized option: '--nope'");
}

#[test]
fn exit_mode_logs_each_warning_once() {
    let project = Project::new("parse-warn-once");
    let defs = project.defs(r#"{ "options": { "a": 1 } }"#);

    let out = paramkit()
        .env("RUST_LOG", "warn")
        .arg("parse")
        .arg("-d")
        .arg(&defs)
        .args(["--", "-a", "2", "-b", "3"])
        .output()
        .expect("failed to run paramkit parse");
    let json = stdout_json(&out);
    assert_eq!(json["values"]["a"], 2);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert_eq!(
        stderr.matches("Unrecognized option: '-b'").count(),
        1,
        "stderr:\n{stderr}"
    );
}

#[test]
fn arbitrary_parse_needs_no_definitions() {
    let project = Project::new("parse-arbitrary");
    let out = paramkit()
        .current_dir(project.root())
        .arg("parse")
        .arg("--arbitrary")
        .args(["--", "-a", "1", "-b.c", "x", "pos"])
        .output()
        .expect("failed to run paramkit parse");
    let json = stdout_json(&out);
    assert_eq!(json["values"]["a"], 1);
    assert_eq!(json["values"]["b"]["c"], "x");
}

#[test]
fn commands_dispatch() {
    let project = Project::new("parse-commands");
    let defs = project.defs(
        r#"{
  "prog": "demo",
  "options": { "verbose": false },
  "commands": {
    "list": { "desc": ["List things."], "aliases": ["ls"], "options": { "all": false } }
  }
}"#,
    );

    let out = paramkit()
        .arg("parse")
        .arg("-d")
        .arg(&defs)
        .args(["--", "ls", "--all", "--verbose"])
        .output()
        .expect("failed to run paramkit parse");
    let json = stdout_json(&out);
    assert_eq!(json["command"], "ls");
    assert_eq!(json["values"]["all"], true);
    assert_eq!(json["global"]["verbose"], true);

    let out = paramkit()
        .arg("help")
        .arg("-d")
        .arg(&defs)
        .output()
        .expect("failed to run paramkit help");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Available commands:"), "stdout:\n{stdout}");
    assert!(stdout.contains("ls | list"), "stdout:\n{stdout}");

    let out = paramkit()
        .arg("parse")
        .arg("-d")
        .arg(&defs)
        .args(["--", "help", "nope"])
        .output()
        .expect("failed to run paramkit parse");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("No such command: nope"));
}

#[test]
fn help_renders_page() {
    let project = Project::new("help-page");
    let defs = project.defs(
        r#"{
  "prog": "demo",
  "desc": ["A demo program."],
  "options": { "n": 10, "n.desc": "Number of rows.", "nrows.alias": "n" }
}"#,
    );

    let out = paramkit()
        .arg("help")
        .arg("--defs")
        .arg(&defs)
        .output()
        .expect("failed to run paramkit help");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("Description:\n  A demo program.\n"), "stdout:\n{stdout}");
    assert!(stdout.contains("demo [OPTIONS]"), "stdout:\n{stdout}");
    assert!(stdout.contains("-n, --nrows <INT>"), "stdout:\n{stdout}");
    assert!(stdout.contains("Number of rows. Default: 10"), "stdout:\n{stdout}");
}

#[test]
fn normalize_and_coerce() {
    let out = paramkit()
        .args(["normalize", "l:i", "verb", "array:str"])
        .output()
        .expect("failed to run paramkit normalize");
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        "list:int\nverbose:\nlist:str\n"
    );

    let out = paramkit()
        .args(["normalize", "dict:int"])
        .output()
        .expect("failed to run paramkit normalize");
    assert!(!out.status.success());

    let out = paramkit()
        .args(["coerce", "--type", "py", "[1, 'a', None]"])
        .output()
        .expect("failed to run paramkit coerce");
    assert_eq!(stdout_json(&out), serde_json::json!([1, "a", null]));

    let out = paramkit()
        .args(["coerce", "-t", "int", "--", "-12"])
        .output()
        .expect("failed to run paramkit coerce");
    assert_eq!(stdout_json(&out), serde_json::json!(-12));

    let out = paramkit()
        .args(["coerce", "-t", "int", "x"])
        .output()
        .expect("failed to run paramkit coerce");
    assert!(!out.status.success());
}

#[test]
fn coerce_rejects_deeply_nested_literals() {
    let literal = format!("py:{}{}", "[".repeat(5_000), "]".repeat(5_000));
    let out = paramkit()
        .args(["coerce", "-t", "auto"])
        .arg(&literal)
        .output()
        .expect("failed to run paramkit coerce");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("failed to coerce value"), "stderr:\n{stderr}");
}

#[test]
fn init_writes_definitions() {
    let project = Project::new("init");

    let out = paramkit()
        .arg("init")
        .arg(project.root())
        .output()
        .expect("failed to run paramkit init");
    assert!(
        out.status.success(),
        "paramkit init failed:\nstderr:\n{}",
        String::from_utf8_lossy(&out.stderr),
    );
    let path = project.root().join("paramkit.json");
    assert!(path.is_file(), "paramkit.json not created");

    let out = paramkit()
        .current_dir(project.root())
        .args(["parse", "--", "--nrows", "3", "a.txt"])
        .output()
        .expect("failed to run paramkit parse");
    let json = stdout_json(&out);
    assert_eq!(json["values"]["n"], 3);
    assert_eq!(json["values"]["_"], serde_json::json!(["a.txt"]));
}
