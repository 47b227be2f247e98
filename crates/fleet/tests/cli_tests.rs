//! Integration tests for the fleet CLI
//!
//! File-backed commands run against a state file or message tree written
//! into a temporary `FLEET_HOME`. Socket-backed commands run against a fake
//! daemon that serves a fixed number of connections on a thread and hands
//! back every request it saw, so tests can assert on the wire traffic too.

use assert_cmd::cargo;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Point the CLI at a throwaway home directory.
///
/// `FLEET_HOME` is checked before the platform home directory, so the test
/// never touches the real `~/.fleet/`.
fn set_home_env(cmd: &mut assert_cmd::Command, temp_dir: &TempDir) {
    cmd.env("FLEET_HOME", temp_dir.path());
}

/// Write a two-repo state snapshot into the temp home.
///
/// `api` has a supervisor, one running worker and one settled worker; `web`
/// has no agents.
fn write_state_fixture(temp_dir: &TempDir) {
    let state = serde_json::json!({
        "repos": {
            "api": {
                "github_url": "https://github.com/acme/api",
                "tmux_session": "fleet-api",
                "agents": {
                    "supervisor": {
                        "type": "supervisor",
                        "worktree_path": "/repos/api",
                        "tmux_window": "fleet-api:0",
                        "session_id": "sess-a",
                        "pid": 100,
                        "created_at": "2026-03-01T09:00:00Z"
                    },
                    "worker-1": {
                        "type": "worker",
                        "worktree_path": "/repos/api-wt/worker-1",
                        "tmux_window": "fleet-api:1",
                        "session_id": "sess-b",
                        "pid": 200,
                        "task": "Fix login flow",
                        "created_at": "2026-03-01T10:00:00Z"
                    },
                    "worker-2": {
                        "type": "worker",
                        "worktree_path": "/repos/api-wt/worker-2",
                        "tmux_window": "fleet-api:2",
                        "session_id": "sess-c",
                        "pid": 0,
                        "created_at": "2026-03-01T10:05:00Z"
                    }
                }
            },
            "web": {
                "github_url": "https://github.com/acme/web",
                "tmux_session": "fleet-web",
                "agents": {}
            }
        },
        "current_repo": "api"
    });
    fs::write(
        temp_dir.path().join("state.json"),
        serde_json::to_string_pretty(&state).unwrap(),
    )
    .unwrap();
}

/// Write one message file at `<home>/messages/<repo>/<agent>/<id>.json`.
fn write_message(
    temp_dir: &TempDir,
    repo: &str,
    agent: &str,
    id: &str,
    content: &str,
    acknowledged: bool,
) {
    let dir = temp_dir.path().join("messages").join(repo).join(agent);
    fs::create_dir_all(&dir).unwrap();

    let mut message = serde_json::json!({
        "id": id,
        "from": "supervisor",
        "to": agent,
        "content": content,
        "created_at": "2026-03-05T08:15:00Z"
    });
    if acknowledged {
        message["acknowledged"] = serde_json::json!(true);
    }
    fs::write(
        dir.join(format!("{id}.json")),
        serde_json::to_string_pretty(&message).unwrap(),
    )
    .unwrap();
}

// ── Help and argument parsing ────────────────────────────────────────────────

#[test]
fn test_help_lists_commands() {
    let mut cmd = cargo::cargo_bin_cmd!("fleet");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("spawn"))
        .stdout(predicate::str::contains("messages"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("daemon"));
}

#[test]
fn test_unknown_subcommand_fails() {
    let mut cmd = cargo::cargo_bin_cmd!("fleet");
    cmd.arg("reticulate").assert().failure();
}

// ── Socket-backed commands without a daemon ──────────────────────────────────

#[test]
fn test_status_daemon_not_running() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = cargo::cargo_bin_cmd!("fleet");
    set_home_env(&mut cmd, &temp_dir);
    cmd.arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not running"));
}

#[test]
fn test_status_json_daemon_not_running() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = cargo::cargo_bin_cmd!("fleet");
    set_home_env(&mut cmd, &temp_dir);
    cmd.arg("status")
        .arg("--json")
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"running\":false"));
}

#[test]
fn test_daemon_ping_not_running() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = cargo::cargo_bin_cmd!("fleet");
    set_home_env(&mut cmd, &temp_dir);
    cmd.arg("daemon")
        .arg("ping")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not responding"));
}

// ── File-backed commands ─────────────────────────────────────────────────────

#[test]
fn test_agents_reads_state_file() {
    let temp_dir = TempDir::new().unwrap();
    write_state_fixture(&temp_dir);

    let mut cmd = cargo::cargo_bin_cmd!("fleet");
    set_home_env(&mut cmd, &temp_dir);
    cmd.arg("agents")
        .assert()
        .success()
        .stdout(predicate::str::contains("supervisor (supervisor) [running]"))
        .stdout(predicate::str::contains("worker-1 (worker) [running] - Fix login flow"))
        .stdout(predicate::str::contains("worker-2 (worker) [stopped]"));
}

#[test]
fn test_agents_repo_filter() {
    let temp_dir = TempDir::new().unwrap();
    write_state_fixture(&temp_dir);

    let mut cmd = cargo::cargo_bin_cmd!("fleet");
    set_home_env(&mut cmd, &temp_dir);
    cmd.arg("agents")
        .arg("--repo")
        .arg("web")
        .assert()
        .success()
        .stdout(predicate::str::contains("web:"))
        .stdout(predicate::str::contains("(no agents)"))
        .stdout(predicate::str::contains("worker-1").not());
}

#[test]
fn test_agents_unknown_repo_fails() {
    let temp_dir = TempDir::new().unwrap();
    write_state_fixture(&temp_dir);

    let mut cmd = cargo::cargo_bin_cmd!("fleet");
    set_home_env(&mut cmd, &temp_dir);
    cmd.arg("agents")
        .arg("--repo")
        .arg("billing")
        .assert()
        .failure()
        .stderr(predicate::str::contains("'billing' is not tracked"));
}

#[test]
fn test_agents_without_state_file_fails() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = cargo::cargo_bin_cmd!("fleet");
    set_home_env(&mut cmd, &temp_dir);
    cmd.arg("agents")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no state file"));
}

#[test]
fn test_workers_lists_only_active() {
    let temp_dir = TempDir::new().unwrap();
    write_state_fixture(&temp_dir);

    let mut cmd = cargo::cargo_bin_cmd!("fleet");
    set_home_env(&mut cmd, &temp_dir);
    cmd.arg("workers")
        .assert()
        .success()
        .stdout(predicate::str::contains("Active workers: 1"))
        .stdout(predicate::str::contains("worker-1 (api)"))
        .stdout(predicate::str::contains("Task: Fix login flow"))
        .stdout(predicate::str::contains("worker-2").not());
}

#[test]
fn test_messages_lists_pending_only() {
    let temp_dir = TempDir::new().unwrap();
    write_message(&temp_dir, "api", "worker-1", "msg-001", "Rebase onto main", false);
    write_message(&temp_dir, "api", "worker-1", "msg-002", "Old news", true);

    let mut cmd = cargo::cargo_bin_cmd!("fleet");
    set_home_env(&mut cmd, &temp_dir);
    cmd.arg("messages")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rebase onto main"))
        .stdout(predicate::str::contains("Total: 1 message(s)"))
        .stdout(predicate::str::contains("Old news").not());
}

#[test]
fn test_messages_agent_filter() {
    let temp_dir = TempDir::new().unwrap();
    write_message(&temp_dir, "api", "worker-1", "msg-001", "For worker one", false);
    write_message(&temp_dir, "api", "worker-2", "msg-002", "For worker two", false);

    let mut cmd = cargo::cargo_bin_cmd!("fleet");
    set_home_env(&mut cmd, &temp_dir);
    cmd.arg("messages")
        .arg("--agent")
        .arg("worker-2")
        .assert()
        .success()
        .stdout(predicate::str::contains("For worker two"))
        .stdout(predicate::str::contains("For worker one").not());
}

#[test]
fn test_messages_empty_tree() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = cargo::cargo_bin_cmd!("fleet");
    set_home_env(&mut cmd, &temp_dir);
    cmd.arg("messages")
        .assert()
        .success()
        .stdout(predicate::str::contains("No pending messages"));
}

#[test]
fn test_messages_json_output() {
    let temp_dir = TempDir::new().unwrap();
    write_message(&temp_dir, "api", "worker-1", "msg-001", "Rebase onto main", false);

    let mut cmd = cargo::cargo_bin_cmd!("fleet");
    set_home_env(&mut cmd, &temp_dir);
    let assert = cmd.arg("messages").arg("--json").assert().success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let records: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["repo"], "api");
    assert_eq!(records[0]["message"]["id"], "msg-001");
}

// ── Socket-backed commands against a fake daemon ─────────────────────────────

#[cfg(unix)]
mod daemon_backed {
    use super::*;
    use serde_json::{Value, json};
    use std::io::{BufRead, BufReader, Write};
    use std::os::unix::net::UnixListener;
    use std::thread;

    /// Answer exactly `connections` requests, one per connection, then return
    /// every request seen in order.
    fn spawn_fake_daemon(
        listener: UnixListener,
        connections: usize,
    ) -> thread::JoinHandle<Vec<Value>> {
        thread::spawn(move || {
            let mut requests = Vec::new();
            for _ in 0..connections {
                let (mut stream, _) = listener.accept().unwrap();
                let mut line = String::new();
                BufReader::new(stream.try_clone().unwrap())
                    .read_line(&mut line)
                    .unwrap();
                let request: Value = serde_json::from_str(&line).unwrap();
                let reply = fake_reply(request["command"].as_str().unwrap_or_default());
                stream.write_all(reply.to_string().as_bytes()).unwrap();
                requests.push(request);
            }
            requests
        })
    }

    fn fake_reply(command: &str) -> Value {
        match command {
            "ping" => json!({"success": true, "data": "pong"}),
            "status" => json!({"success": true, "data": {
                "running": true,
                "pid": 4242,
                "repos": 2,
                "agents": 5,
                "socket_path": "/tmp/fleet-test/daemon.sock"
            }}),
            "list_repos" => json!({"success": true, "data": ["api", "web"]}),
            "spawn_worker" => json!({"success": true, "data": {"name": "worker-7"}}),
            "send_message" => json!({"success": true, "data": {"id": "m-123"}}),
            "task_history" => json!({"success": true, "data": [{
                "name": "worker-7",
                "task": "Fix flaky websocket test",
                "branch": "fleet/fix-flaky-ws",
                "pr_url": "https://github.com/acme/api/pull/481",
                "pr_number": 481,
                "status": "merged",
                "created_at": "2026-03-02T11:00:00Z",
                "completed_at": "2026-03-02T12:30:00Z"
            }]}),
            _ => json!({"success": true}),
        }
    }

    fn command_names(requests: &[Value]) -> Vec<&str> {
        requests
            .iter()
            .map(|request| request["command"].as_str().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_status_reports_running_daemon() {
        let temp_dir = TempDir::new().unwrap();
        let listener = UnixListener::bind(temp_dir.path().join("daemon.sock")).unwrap();
        let daemon = spawn_fake_daemon(listener, 2);

        let mut cmd = cargo::cargo_bin_cmd!("fleet");
        set_home_env(&mut cmd, &temp_dir);
        cmd.arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("fleetd running (PID: 4242)"))
            .stdout(predicate::str::contains("Repositories: 2"));

        let requests = daemon.join().unwrap();
        assert_eq!(command_names(&requests), ["ping", "status"]);
    }

    #[test]
    fn test_spawn_passes_arguments_through() {
        let temp_dir = TempDir::new().unwrap();
        let listener = UnixListener::bind(temp_dir.path().join("daemon.sock")).unwrap();
        let daemon = spawn_fake_daemon(listener, 1);

        let mut cmd = cargo::cargo_bin_cmd!("fleet");
        set_home_env(&mut cmd, &temp_dir);
        cmd.arg("spawn")
            .arg("Fix login flow")
            .arg("--repo")
            .arg("api")
            .arg("--branch")
            .arg("fix/login")
            .assert()
            .success()
            .stdout(predicate::str::contains("Spawned worker: worker-7"));

        let requests = daemon.join().unwrap();
        assert_eq!(command_names(&requests), ["spawn_worker"]);
        let args = &requests[0]["args"];
        assert_eq!(args["task"], "Fix login flow");
        assert_eq!(args["repo"], "api");
        assert_eq!(args["branch"], "fix/login");
        assert!(args.get("push_to").is_none());
    }

    #[test]
    fn test_repos_lists_names() {
        let temp_dir = TempDir::new().unwrap();
        let listener = UnixListener::bind(temp_dir.path().join("daemon.sock")).unwrap();
        let daemon = spawn_fake_daemon(listener, 1);

        let mut cmd = cargo::cargo_bin_cmd!("fleet");
        set_home_env(&mut cmd, &temp_dir);
        cmd.arg("repos")
            .assert()
            .success()
            .stdout(predicate::str::contains("api"))
            .stdout(predicate::str::contains("web"));

        let requests = daemon.join().unwrap();
        assert_eq!(command_names(&requests), ["list_repos"]);
    }

    #[test]
    fn test_send_reports_message_id() {
        let temp_dir = TempDir::new().unwrap();
        let listener = UnixListener::bind(temp_dir.path().join("daemon.sock")).unwrap();
        let daemon = spawn_fake_daemon(listener, 1);

        let mut cmd = cargo::cargo_bin_cmd!("fleet");
        set_home_env(&mut cmd, &temp_dir);
        cmd.arg("send")
            .arg("worker-1")
            .arg("Rebase onto main before opening the PR")
            .assert()
            .success()
            .stdout(predicate::str::contains("Sent message m-123 to worker-1"));

        let requests = daemon.join().unwrap();
        assert_eq!(command_names(&requests), ["send_message"]);
        let args = &requests[0]["args"];
        assert_eq!(args["to"], "worker-1");
        assert_eq!(args["body"], "Rebase onto main before opening the PR");
        assert_eq!(args["from"], "human");
    }

    #[test]
    fn test_daemon_ping_answers_pong() {
        let temp_dir = TempDir::new().unwrap();
        let listener = UnixListener::bind(temp_dir.path().join("daemon.sock")).unwrap();
        let daemon = spawn_fake_daemon(listener, 1);

        let mut cmd = cargo::cargo_bin_cmd!("fleet");
        set_home_env(&mut cmd, &temp_dir);
        cmd.arg("daemon")
            .arg("ping")
            .assert()
            .success()
            .stdout(predicate::str::contains("pong"));

        let requests = daemon.join().unwrap();
        assert_eq!(command_names(&requests), ["ping"]);
    }

    #[test]
    fn test_daemon_stop() {
        let temp_dir = TempDir::new().unwrap();
        let listener = UnixListener::bind(temp_dir.path().join("daemon.sock")).unwrap();
        let daemon = spawn_fake_daemon(listener, 1);

        let mut cmd = cargo::cargo_bin_cmd!("fleet");
        set_home_env(&mut cmd, &temp_dir);
        cmd.arg("daemon")
            .arg("stop")
            .assert()
            .success()
            .stdout(predicate::str::contains("Daemon stopping"));

        let requests = daemon.join().unwrap();
        assert_eq!(command_names(&requests), ["stop"]);
    }

    #[test]
    fn test_daemon_cleanup_and_route_trigger() {
        let temp_dir = TempDir::new().unwrap();
        let listener = UnixListener::bind(temp_dir.path().join("daemon.sock")).unwrap();
        let daemon = spawn_fake_daemon(listener, 2);

        let mut cmd = cargo::cargo_bin_cmd!("fleet");
        set_home_env(&mut cmd, &temp_dir);
        cmd.arg("daemon")
            .arg("cleanup")
            .assert()
            .success()
            .stdout(predicate::str::contains("Cleanup triggered"));

        let mut cmd = cargo::cargo_bin_cmd!("fleet");
        set_home_env(&mut cmd, &temp_dir);
        cmd.arg("daemon")
            .arg("route")
            .assert()
            .success()
            .stdout(predicate::str::contains("Message routing triggered"));

        let requests = daemon.join().unwrap();
        assert_eq!(command_names(&requests), ["cleanup", "route_messages"]);
    }

    #[test]
    fn test_history_renders_table() {
        let temp_dir = TempDir::new().unwrap();
        let listener = UnixListener::bind(temp_dir.path().join("daemon.sock")).unwrap();
        let daemon = spawn_fake_daemon(listener, 1);

        let mut cmd = cargo::cargo_bin_cmd!("fleet");
        set_home_env(&mut cmd, &temp_dir);
        cmd.arg("history")
            .arg("--repo")
            .arg("api")
            .arg("--status")
            .arg("merged")
            .assert()
            .success()
            .stdout(predicate::str::contains("worker-7"))
            .stdout(predicate::str::contains("merged"))
            .stdout(predicate::str::contains("https://github.com/acme/api/pull/481"));

        let requests = daemon.join().unwrap();
        assert_eq!(command_names(&requests), ["task_history"]);
        let args = &requests[0]["args"];
        assert_eq!(args["repo"], "api");
        assert_eq!(args["status"], "merged");
    }

    #[test]
    fn test_remove_agent() {
        let temp_dir = TempDir::new().unwrap();
        let listener = UnixListener::bind(temp_dir.path().join("daemon.sock")).unwrap();
        let daemon = spawn_fake_daemon(listener, 1);

        let mut cmd = cargo::cargo_bin_cmd!("fleet");
        set_home_env(&mut cmd, &temp_dir);
        cmd.arg("remove")
            .arg("worker-3")
            .arg("--repo")
            .arg("api")
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed agent: worker-3"));

        let requests = daemon.join().unwrap();
        assert_eq!(command_names(&requests), ["remove_agent"]);
        assert_eq!(requests[0]["args"]["name"], "worker-3");
        assert_eq!(requests[0]["args"]["repo"], "api");
    }

    #[test]
    fn test_daemon_error_is_surfaced() {
        let temp_dir = TempDir::new().unwrap();
        let listener = UnixListener::bind(temp_dir.path().join("daemon.sock")).unwrap();

        let daemon = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut line = String::new();
            BufReader::new(stream.try_clone().unwrap())
                .read_line(&mut line)
                .unwrap();
            let reply = json!({"success": false, "error": "no repository configured"});
            stream.write_all(reply.to_string().as_bytes()).unwrap();
        });

        let mut cmd = cargo::cargo_bin_cmd!("fleet");
        set_home_env(&mut cmd, &temp_dir);
        cmd.arg("spawn")
            .arg("Fix login flow")
            .assert()
            .failure()
            .stderr(predicate::str::contains("no repository configured"));

        daemon.join().unwrap();
    }
}
