//! End-to-end tests for the kumish binary.
//!
//! Each test runs `kumish -c ...` as a child process, so real forks, waits
//! and signals happen in the shell's own single-threaded process rather
//! than inside the test harness.

use std::io::{BufRead, BufReader, Read, Write};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use nix::libc;
use nix::pty::{openpty, OpenptyResult};
use nix::sys::signal::{kill, Signal};
use nix::unistd::{setsid, Pid};
use rstest::rstest;

const KUMISH: &str = env!("CARGO_BIN_EXE_kumish");

fn kumish() -> Command {
    let mut cmd = Command::new(KUMISH);
    cmd.stdin(Stdio::null()).process_group(0);
    cmd
}

fn run(source: &str) -> Output {
    kumish().args(["-c", source]).output().expect("spawn kumish")
}

/// Run `program` as the leader of a new session whose controlling terminal
/// is a fresh pty on its stdin. Output is captured through pipes.
fn run_on_pty(program: &str, args: &[&str]) -> Output {
    let OpenptyResult { master, slave } = openpty(None, None).expect("openpty");
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::from(slave))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    // SAFETY: setsid and ioctl are async-signal-safe.
    unsafe {
        cmd.pre_exec(|| {
            setsid()?;
            if libc::ioctl(libc::STDIN_FILENO, libc::TIOCSCTTY, 0) == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
    let output = cmd.output().expect("spawn on pty");
    drop(master);
    output
}

/// Fields of `/proc/<pid>/stat` after the command name.
fn stat_fields(stat: &str) -> Vec<&str> {
    stat.rsplit(')').next().unwrap_or_default().split_whitespace().collect()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn temp_path(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("kumish-it-{tag}-{}", std::process::id()))
}

/// Alive and not a zombie.
fn alive(pid: i32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return false;
    };
    let state = stat.rsplit(')').next().and_then(|rest| rest.trim_start().chars().next());
    !matches!(state, Some('Z') | Some('X') | None)
}

fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    done()
}

// ============================================================================
// Statuses
// ============================================================================

#[rstest]
#[case("true", 0)]
#[case("false", 1)]
#[case("false | true", 0)]
#[case("true | false", 1)]
#[case("! true", 1)]
#[case("! false | false", 0)]
#[case("exit 3", 3)]
#[case("exit 300", 44)]
#[case("true && false", 1)]
#[case("false || exit 6", 6)]
#[case("sh -c 'exit 9'", 9)]
#[case("sh -c 'kill -TERM $$'", 143)]
fn exit_statuses(#[case] source: &str, #[case] expected: i32) {
    let output = run(source);
    assert_eq!(output.status.code(), Some(expected), "{source}: {}", stderr(&output));
}

#[test]
fn and_or_short_circuits() {
    let output = run("true && echo yes || echo no; false && echo never || echo fallback");
    assert_eq!(stdout(&output), "yes\nfallback\n");
}

#[test]
fn status_of_the_last_pipeline_is_visible() {
    let output = run("sh -c 'exit 4'; echo $?");
    assert_eq!(stdout(&output), "4\n");
}

#[test]
fn command_not_found_is_127() {
    let output = run("kumish-no-such-command-anywhere");
    assert_eq!(output.status.code(), Some(127));
    assert!(stderr(&output).contains("command not found"), "{}", stderr(&output));
}

#[test]
fn not_executable_is_126() {
    let output = run("/dev/null");
    assert_eq!(output.status.code(), Some(126));
}

#[test]
fn syntax_error_is_2() {
    let output = run("&& true");
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("syntax error"));
}

// ============================================================================
// Pipelines and redirections
// ============================================================================

#[test]
fn pipes_connect_stages() {
    let output = run("echo one two | tr a-z A-Z | cat");
    assert_eq!(stdout(&output), "ONE TWO\n");
}

#[test]
fn builtins_run_inside_pipelines() {
    let output = run("echo piped | cat");
    assert_eq!(stdout(&output), "piped\n");
}

#[test]
fn redirections_write_and_read_files() {
    let path = temp_path("redirect");
    let p = path.display();
    let output = run(&format!("echo hi > {p}; echo there >> {p}; cat < {p}"));
    std::fs::remove_file(&path).ok();
    assert_eq!(stdout(&output), "hi\nthere\n");
}

#[test]
fn redirect_failure_only_fails_that_command() {
    let output = run("echo lost > /nonexistent-dir/x; echo $?");
    assert_eq!(stdout(&output), "2\n");
    let err = stderr(&output);
    assert!(err.starts_with("kumish: echo: /nonexistent-dir/x: "), "{err}");

}

#[test]
fn stderr_can_follow_stdout() {
    let output = run("sh -c 'echo oops >&2' 2>&1 | cat");
    assert_eq!(stdout(&output), "oops\n");
}

#[test]
fn loop_pipeline_finishes() {
    let output = run("true | true |");
    assert_eq!(output.status.code(), Some(0));
}

// ============================================================================
// Background jobs
// ============================================================================

#[test]
fn background_job_is_listed_then_reported_done() {
    let output = run("sleep 0.1 & sleep 0.6; jobs; jobs");
    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 1, "{out}");
    assert!(lines[0].starts_with("[1] + Done"), "{out}");
    assert!(lines[0].ends_with("sleep 0.1"), "{out}");
}

#[test]
fn running_job_is_listed() {
    let output = run("sleep 5 > /dev/null & jobs; kill %1");
    let out = stdout(&output);
    assert!(out.starts_with("[1] + Running"), "{out}");
    assert!(out.trim_end().ends_with("sleep 5 > /dev/null"), "{out}");
}

#[test]
fn bang_is_the_last_background_pid() {
    let output = run("true & echo $!");
    let pid: i32 = stdout(&output).trim().parse().expect("a pid");
    assert!(pid > 0);
}

#[test]
fn wait_returns_the_job_status() {
    let output = run("sh -c 'exit 7' & wait %1; echo $?; sh -c 'exit 5' & wait $!; echo $?");
    assert_eq!(stdout(&output), "7\n5\n");
}

#[test]
fn wait_reports_signal_deaths() {
    let output = run("sleep 5 & kill %1; wait %1; echo $?");
    assert_eq!(stdout(&output), "143\n");
}

#[test]
fn wait_for_strangers_is_127() {
    let output = run("wait 1; echo $?; wait %4; echo $?");
    assert_eq!(stdout(&output), "127\n127\n");
}

#[test]
fn wait_without_operands_drains_the_table() {
    let output = run("sleep 0.1 & sleep 0.2 & wait; echo $?; jobs");
    assert_eq!(stdout(&output), "0\n");
}

#[test]
fn background_and_or_list_is_one_job() {
    let output = run("sleep 0.1 && echo inner & wait %1; echo $?; jobs");
    assert_eq!(stdout(&output), "inner\n0\n");
}

#[test]
fn sigint_aborts_wait_with_130() {
    let mut child = kumish()
        .args(["-i", "-c", "sleep 30 > /dev/null 2>&1 & echo $!; wait %1; echo st=$?"])
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn kumish");
    let mut reader = BufReader::new(child.stdout.take().expect("stdout"));
    let mut line = String::new();
    reader.read_line(&mut line).expect("pid line");
    let sleeper: i32 = line.trim().parse().expect("a pid");

    std::thread::sleep(Duration::from_millis(200));
    kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).expect("send SIGINT");
    let mut rest = String::new();
    reader.read_to_string(&mut rest).expect("rest of stdout");
    let status = child.wait().expect("wait kumish");
    let _ = kill(Pid::from_raw(sleeper), Signal::SIGKILL);

    assert_eq!(rest, "st=130\n");
    assert_eq!(status.code(), Some(0));
}

#[test]
fn fg_without_job_control_still_waits() {
    let output = run("sh -c 'sleep 0.1; exit 3' & fg; echo $?");
    assert_eq!(stdout(&output), "sh -c 'sleep 0.1; exit 3'\n3\n");
}

#[test]
fn fg_and_bg_need_a_job() {
    let output = run("fg; echo $?; bg %2; echo $?");
    assert_eq!(stdout(&output), "1\n1\n");
    assert!(stderr(&output).contains("fg: current: no such job"));
}

#[test]
fn disown_forgets_the_job() {
    let output = run("sleep 0.1 & disown; jobs; wait %1; echo $?");
    assert_eq!(stdout(&output), "127\n");
}

// ============================================================================
// kill
// ============================================================================

#[test]
fn kill_lists_signals() {
    let output = run("kill -l");
    let out = stdout(&output);
    assert!(out.starts_with(" 1) HUP"), "{out}");
    assert!(out.contains(" 9) KILL"));
    assert!(out.contains("15) TERM"));
}

#[test]
fn kill_converts_statuses() {
    let output = run("kill -l 143; kill -l KILL");
    assert_eq!(stdout(&output), "TERM\n9\n");
}

#[test]
fn kill_probes_with_the_null_signal() {
    let output = run("kill -0 $$; echo $?; kill -s 0 %1; echo $?");
    assert_eq!(stdout(&output), "0\n1\n");
}

#[test]
fn kill_rejects_unknown_signals() {
    let output = run("kill -NOPE $$");
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("invalid signal specification"));
}

// ============================================================================
// SIGHUP
// ============================================================================

#[test]
fn hangup_spares_nohup_jobs() {
    let output = kumish()
        .args([
            "-i",
            "-c",
            "sleep 30 > /dev/null 2>&1 & echo $!; disown -h; \
             sleep 31 > /dev/null 2>&1 & echo $!; kill -HUP $$",
        ])
        .output()
        .expect("spawn kumish");

    assert_eq!(output.status.signal(), Some(Signal::SIGHUP as i32), "{}", stderr(&output));

    let pids: Vec<i32> = stdout(&output)
        .lines()
        .map(|line| line.trim().parse().expect("a pid"))
        .collect();
    assert_eq!(pids.len(), 2);
    let (kept, hung_up) = (pids[0], pids[1]);

    let gone = wait_until(Duration::from_secs(3), || !alive(hung_up));
    let survived = alive(kept);
    let _ = kill(Pid::from_raw(kept), Signal::SIGKILL);
    let _ = kill(Pid::from_raw(hung_up), Signal::SIGKILL);

    assert!(gone, "job without nohup outlived the shell");
    assert!(survived, "nohup job was hung up");
}

#[test]
fn hangup_continues_stopped_jobs_so_they_die() {
    let output = kumish()
        .args([
            "-i",
            "-c",
            "sleep 30 > /dev/null 2>&1 & echo $!; kill -STOP $!; sleep 0.2; kill -HUP $$",
        ])
        .output()
        .expect("spawn kumish");
    assert_eq!(output.status.signal(), Some(Signal::SIGHUP as i32), "{}", stderr(&output));

    let stopped: i32 = stdout(&output).trim().parse().expect("a pid");
    let gone = wait_until(Duration::from_secs(3), || !alive(stopped));
    let _ = kill(Pid::from_raw(stopped), Signal::SIGKILL);
    assert!(gone, "stopped job outlived the hangup");
}

// ============================================================================
// Terminal ownership
// ============================================================================

#[test]
fn backgrounded_shell_stops_until_foregrounded() {
    let source = format!("{KUMISH} -i < /dev/tty > /dev/null 2>&1 & sleep 1; jobs; kill -KILL %1; wait %1");
    let output = run_on_pty(KUMISH, &["-i", "-c", &source]);
    let out = stdout(&output);
    assert!(out.contains("Stopped(SIGTTIN)"), "{out}{}", stderr(&output));
}

#[test]
fn suspend_stops_the_shell_until_fg() {
    let source = format!("{KUMISH} -i -c 'suspend; echo resumed'; echo $?; jobs; fg; echo $?");
    let output = run_on_pty(KUMISH, &["-i", "-c", &source]);
    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();

    assert_eq!(lines.first(), Some(&"147"), "{out}{}", stderr(&output));
    assert!(lines.get(1).is_some_and(|l| l.contains("Stopped(SIGSTOP)")), "{out}");
    assert!(lines.ends_with(&["resumed", "0"]), "{out}");
}

#[test]
fn exit_gives_the_terminal_back() {
    // `sh` here has no job control: kumish starts in its process group.
    let source = format!("{KUMISH} -i -c true; cat /proc/$$/stat");
    let output = run_on_pty("sh", &["-c", &source]);
    let out = stdout(&output);
    let fields = stat_fields(&out);
    assert!(fields.len() > 5, "{out}{}", stderr(&output));
    // pgrp, then tpgid: the foreground group of the terminal.
    assert_eq!(fields[2], fields[5], "{out}");
}

// ============================================================================
// Entry points
// ============================================================================

#[test]
fn script_file_runs() {
    let path = temp_path("script");
    std::fs::write(&path, "echo from-script\nexit 5\necho unreachable\n").expect("write script");
    let output = kumish().arg(&path).output().expect("spawn kumish");
    std::fs::remove_file(&path).ok();
    assert_eq!(stdout(&output), "from-script\n");
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn commands_from_stdin() {
    let mut child = Command::new(KUMISH)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .process_group(0)
        .spawn()
        .expect("spawn kumish");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"echo from-stdin; false\n")
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait kumish");
    assert_eq!(stdout(&output), "from-stdin\n");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn version_and_help() {
    let output = kumish().arg("--version").output().expect("spawn kumish");
    assert!(stdout(&output).starts_with("kumish "));

    let output = kumish().arg("--help").output().expect("spawn kumish");
    assert!(stdout(&output).contains("-c <command>"));
}

#[test]
fn unknown_option_is_a_usage_error() {
    let output = kumish().arg("--bogus").output().expect("spawn kumish");
    assert_eq!(output.status.code(), Some(2));
}
