//! Basic CLI E2E tests.
//!
//! Tests invoke the hyfocus binary with an isolated HOME and runtime dir and
//! verify outputs.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

struct Env {
    home: tempfile::TempDir,
    runtime: tempfile::TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            home: tempfile::tempdir().unwrap(),
            runtime: tempfile::tempdir().unwrap(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_hyfocus"));
        cmd.env("HOME", self.home.path())
            .env("XDG_RUNTIME_DIR", self.runtime.path())
            .env_remove("HYFOCUS_ENV")
            .env_remove("HYFOCUS_LOG");
        cmd
    }

    /// Run a CLI command and return (stdout, stderr, exit code).
    fn run_cli(&self, args: &[&str]) -> (String, String, i32) {
        let output = self
            .command()
            .args(args)
            .output()
            .expect("Failed to execute CLI command");
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.code().unwrap_or(-1),
        )
    }

    /// Feed a script to `hyfocus run` and return (stdout, stderr).
    fn run_script(&self, script: &str) -> (String, String) {
        let mut child = self
            .command()
            .args(["run", "--workspace", "1"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to spawn hyfocus run");
        child
            .stdin
            .take()
            .unwrap()
            .write_all(script.as_bytes())
            .unwrap();
        let output = child.wait_with_output().unwrap();
        assert!(output.status.success(), "hyfocus run failed: {output:?}");
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
        )
    }

    fn state_file(&self) -> std::path::PathBuf {
        self.runtime.path().join("hyfocus-state.json")
    }
}

fn config_file(home: &Path) -> std::path::PathBuf {
    home.join(".config").join("hyfocus").join("config.toml")
}

#[test]
fn test_config_get_defaults() {
    let env = Env::new();
    let (stdout, _, code) = env.run_cli(&["config", "get", "timer.work_minutes"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "25");
    assert!(config_file(env.home.path()).exists());
}

#[test]
fn test_config_set_then_get() {
    let env = Env::new();
    let (stdout, _, code) = env.run_cli(&["config", "set", "spawn.whitelist", "firefox,kitty"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (stdout, _, _) = env.run_cli(&["config", "get", "spawn.whitelist"]);
    assert_eq!(stdout.trim(), r#"["firefox","kitty"]"#);
}

#[test]
fn test_config_rejects_unknown_key() {
    let env = Env::new();
    let (_, stderr, code) = env.run_cli(&["config", "get", "timer.nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));

    let (_, stderr, code) = env.run_cli(&["config", "set", "challenge.kind", "riddle"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("challenge.kind"));
}

#[test]
fn test_config_list_reset_and_path() {
    let env = Env::new();
    env.run_cli(&["config", "set", "timer.total_minutes", "60"]);
    let (stdout, _, _) = env.run_cli(&["config", "list"]);
    assert!(stdout.contains("total_minutes = 60"));

    let (_, _, code) = env.run_cli(&["config", "reset"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = env.run_cli(&["config", "get", "timer.total_minutes"]);
    assert_eq!(stdout.trim(), "120");

    let (stdout, _, _) = env.run_cli(&["config", "path"]);
    assert!(stdout.trim().ends_with("config.toml"));
}

#[test]
fn test_run_session_enforces_workspaces_and_spawns() {
    let env = Env::new();
    let (stdout, stderr) = env.run_script(
        "start 1,2@50\n\
         status\n\
         goto 2\n\
         goto 5\n\
         spawn discord\n\
         whitelist discord\n\
         spawn discord --start-minimized\n\
         stop\n\
         status\n\
         quit\n",
    );

    assert!(stdout.contains("Allowed workspaces: 1, 2 (50 min work, 10 min break, 60 min total)"));
    assert!(stdout.contains("Session: WORKING | Remaining: "));
    assert!(stdout.contains("on workspace 2"));
    assert!(stdout.contains("workspace 5 blocked, back on workspace 2"));
    assert!(stdout.contains("blocked: discord"));
    assert!(stdout.contains("launched: discord --start-minimized"));
    assert!(stdout.contains("Focus session stopped. Total time: 00:0"));
    assert!(stdout.contains("No active focus session."));

    assert!(stderr.contains("[hyfocus] Focus mode: Workspace 5 is restricted!"));
    assert!(stderr.contains("[hyfocus] Focus mode: App launching is blocked!"));
    assert!(!env.state_file().exists());
}

#[test]
fn test_run_writes_state_file_while_active() {
    let env = Env::new();
    let (stdout, _) = env.run_script("start 3\nstatus json\n");
    let status: serde_json::Value = serde_json::from_str(
        stdout
            .lines()
            .find(|l| l.starts_with('{'))
            .expect("status json line"),
    )
    .unwrap();
    assert_eq!(status["active"], true);
    assert_eq!(status["state"], "working");
    assert_eq!(status["workspaces"], serde_json::json!([3]));
    // The context tears the session down when stdin closes.
    assert!(!env.state_file().exists());
}

#[test]
fn test_run_countdown_challenge() {
    let env = Env::new();
    env.run_cli(&["config", "set", "challenge.kind", "countdown"]);
    let (stdout, _) = env.run_script(
        "start\n\
         stop\n\
         confirm yes\n\
         confirm nope\n\
         confirm yes\n\
         confirm yes\n\
         status\n",
    );

    assert!(stdout.contains("Are you SURE you want to stop? (3 confirmations needed)"));
    assert!(stdout.contains("Keep going! 2 more confirmations needed."));
    assert!(stdout.contains("Wrong answer! Hint: Keep typing 'yes' to confirm"));
    assert!(stdout.contains("Keep going! 1 more confirmations needed."));
    assert!(stdout.contains("Challenge passed! Session stopped."));
    assert!(stdout.contains("No active focus session."));
}

#[test]
fn test_run_rejects_bad_arguments_without_exiting() {
    let env = Env::new();
    let (stdout, stderr) = env.run_script("allow zero\nallow 0\nfrobnicate\nallow 4\n");
    assert!(stderr.contains("Invalid workspace ID 'zero'"));
    assert!(stderr.contains("Invalid workspace ID '0'"));
    assert!(stdout.contains("unknown command: frobnicate"));
    assert!(stdout.contains("Workspace 4 added to allowed list."));
}

#[test]
fn test_run_reports_no_op_acl_edits() {
    let env = Env::new();
    let (stdout, _) = env.run_script(
        "allow 4\n\
         allow 4\n\
         disallow 9\n\
         except pavucontrol\n\
         except pavucontrol\n\
         unexcept kitty\n\
         whitelist firefox\n\
         whitelist firefox\n\
         unwhitelist discord\n",
    );

    assert!(stdout.contains("Workspace 4 added to allowed list."));
    assert!(stdout.contains("Workspace 4 is already allowed."));
    assert!(stdout.contains("Workspace 9 was not in the allowed list."));
    assert!(stdout.contains("Window class 'pavucontrol' is already an exception."));
    assert!(stdout.contains("Window class 'kitty' was not an exception."));
    assert!(stdout.contains("App 'firefox' is already whitelisted."));
    assert!(stdout.contains("App 'discord' was not whitelisted."));
}
