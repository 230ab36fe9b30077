//! Integration tests for sessions against real processes on a PTY.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use esh_expect::{ExpectError, Pattern, PatternSet, Session, SessionBuilder, SessionState, SpawnError};

fn sh(script: &str) -> SessionBuilder {
    SessionBuilder::new()
        .command("sh")
        .args(["-c", script])
        .timeout(Duration::from_secs(5))
}

/// Poll `check` until it holds or two seconds pass.
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn earliest_match_wins_regardless_of_order() {
    let mut session = sh("printf 'aaa BBB ccc'; sleep 5").spawn().await.unwrap();

    let patterns = PatternSet::from(vec![Pattern::literal("ccc"), Pattern::literal("BBB")]);
    let m = session.expect(patterns).await.unwrap();

    assert_eq!(m.pattern_index, 1);
    assert_eq!(m.before, "aaa ");
    assert_eq!(session.buffer(), " ccc");

    session.close(true).await.unwrap();
}

#[tokio::test]
async fn tie_goes_to_first_listed_pattern() {
    let mut session = sh("printf 'one two three'; sleep 5").spawn().await.unwrap();

    let patterns = PatternSet::from(vec![Pattern::literal("two"), Pattern::regex(r"t\w+").unwrap()]);
    let m = session.expect(patterns).await.unwrap();
    assert_eq!(m.pattern_index, 0);

    let patterns = PatternSet::from(vec![Pattern::regex(r"t\w+").unwrap(), Pattern::literal("three")]);
    let m = session.expect(patterns).await.unwrap();
    assert_eq!(m.pattern_index, 0);
    assert_eq!(m.matched, "three");

    session.close(true).await.unwrap();
}

#[tokio::test]
async fn captures_report_every_group() {
    let mut session = sh("echo 'x=1 y=2'").spawn().await.unwrap();

    let m = session.expect_regex(r"x=(\d) y=(\d)( z)?").await.unwrap();

    assert_eq!(m.captures, vec!["1", "2", ""]);
    assert_eq!(m.capture(1), Some("2"));
    assert_eq!(m.capture(3), None);

    session.close(true).await.unwrap();
}

#[tokio::test]
async fn consumed_ranges_are_contiguous() {
    let mut session = sh("printf 'first second third'; sleep 5").spawn().await.unwrap();

    let a = session.expect("first").await.unwrap();
    let b = session.expect("third").await.unwrap();

    assert_eq!(a.consumed, 0..5);
    assert_eq!(b.consumed.start, a.consumed.end);
    assert_eq!(b.before, " second ");

    session.close(true).await.unwrap();
}

#[tokio::test]
async fn timeout_keeps_output_for_next_expect() {
    let mut session = sh("printf 'partial'; sleep 5").spawn().await.unwrap();

    let start = Instant::now();
    let err = session
        .expect_timeout("never-printed", Duration::from_millis(300))
        .await
        .unwrap_err();
    let elapsed = start.elapsed();

    assert!(err.is_timeout(), "unexpected error: {err}");
    assert_eq!(err.buffer(), Some("partial"));
    assert!(elapsed >= Duration::from_millis(300), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "returned late: {elapsed:?}");

    let m = session.expect("partial").await.unwrap();
    assert_eq!(m.before, "");
    assert_eq!(session.state(), SessionState::Running);

    session.close(true).await.unwrap();
}

#[tokio::test]
async fn match_arriving_in_late_chunk_is_found() {
    let mut session = sh("printf 'wait'; sleep 0.3; printf 'ing-done'; sleep 5")
        .spawn()
        .await
        .unwrap();

    let m = session.expect("waiting-done").await.unwrap();
    assert_eq!(m.matched, "waiting-done");

    session.close(true).await.unwrap();
}

#[tokio::test]
async fn exit_before_match_is_reported_promptly() {
    let mut session = sh("echo done").spawn().await.unwrap();

    let start = Instant::now();
    let err = session.expect("missing").await.unwrap_err();

    assert!(err.is_process_exited(), "unexpected error: {err}");
    assert!(err.buffer().is_some_and(|b| b.contains("done")));
    assert!(start.elapsed() < Duration::from_secs(4));

    session.close(true).await.unwrap();
}

#[tokio::test]
async fn send_after_exit_is_a_write_error() {
    let mut session = SessionBuilder::new().command("true").spawn().await.unwrap();
    let status = session.wait().await.unwrap();

    let err = session.send_line("hello").await.unwrap_err();
    assert!(matches!(err, ExpectError::Write(_)), "unexpected error: {err:?}");
    assert_eq!(session.state(), SessionState::Exited(status));

    session.close(true).await.unwrap();
}

#[tokio::test]
async fn send_notices_an_unreaped_exit() {
    let mut session = SessionBuilder::new().command("true").spawn().await.unwrap();
    let pid = session.pid();
    assert!(eventually(|| !esh_pty::is_process_alive(pid)).await);

    let err = session.send(b"x").await.unwrap_err();
    assert!(matches!(err, ExpectError::Write(_)), "unexpected error: {err:?}");
    assert!(matches!(session.state(), SessionState::Exited(_)));

    // Output produced before the exit can still be drained
    assert!(session.expect_eof().await.is_ok());
    session.close(true).await.unwrap();
}

#[tokio::test]
async fn regex_spans_bytes_outside_utf8() {
    let mut session = sh("printf 'caf\\351 ok.\\n'; sleep 5").spawn().await.unwrap();

    let m = session.expect_regex(r".+?\.\r\n").await.unwrap();
    assert_eq!(m.consumed, 0..10);
    assert!(m.before.is_empty());
    assert_eq!(m.matched, "caf\u{fffd} ok.\r\n");

    session.close(true).await.unwrap();
}

#[tokio::test]
async fn expect_eof_returns_the_rest() {
    let mut session = SessionBuilder::new()
        .command("echo")
        .arg("hello")
        .timeout(Duration::from_secs(5))
        .spawn()
        .await
        .unwrap();

    let rest = session.expect_eof().await.unwrap();
    assert_eq!(rest, "hello\r\n");
    assert!(session.buffer().is_empty());

    session.close(false).await.unwrap();
}

#[tokio::test]
async fn closed_session_rejects_io_and_close_is_idempotent() {
    let mut session = SessionBuilder::new().command("cat").spawn().await.unwrap();

    session.close(true).await.unwrap();
    assert_eq!(session.state(), SessionState::Closed);

    assert!(matches!(session.send_line("hi").await, Err(ExpectError::SessionClosed)));
    assert!(matches!(session.expect("hi").await, Err(ExpectError::SessionClosed)));
    assert!(matches!(session.expect_eof().await, Err(ExpectError::SessionClosed)));

    session.close(true).await.unwrap();
    session.close(false).await.unwrap();
}

#[tokio::test]
async fn graceful_close_runs_exit_command() {
    let mut session = sh("read line; echo \"got $line\"").spawn().await.unwrap();

    session.close(false).await.unwrap();
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn missing_command_is_a_spawn_error() {
    let err = Session::spawn(esh_expect::SessionConfig::new("/nonexistent/esh-missing"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, ExpectError::Spawn(SpawnError::CommandNotFound { .. })),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn raw_output_is_mirrored_to_sinks_and_file() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("session.log");
    let capture = Capture::default();

    let mut session = sh("printf 'logged\\033[0m\\n'")
        .log_to_file(&log)
        .log_sink(capture.clone())
        .spawn()
        .await
        .unwrap();

    session.expect_eof().await.unwrap();
    session.close(true).await.unwrap();

    let expected = b"logged\x1b[0m\r\n";
    assert_eq!(&*capture.0.lock().unwrap(), expected);
    assert_eq!(std::fs::read(&log).unwrap(), expected);
}

#[tokio::test]
async fn large_output_does_not_stall_the_process() {
    let mut session = sh("seq 1 20000; echo END").spawn().await.unwrap();

    session.expect("END\r\n").await.unwrap();

    session.close(true).await.unwrap();
}

#[tokio::test]
async fn close_kills_background_jobs() {
    let mut session = sh("sleep 30 & echo \"job $!\"; wait").spawn().await.unwrap();
    let pgid = session.pid();

    let m = session.expect_regex(r"job (\d+)\r\n").await.unwrap();
    let job: u32 = m.capture(0).unwrap().parse().unwrap();
    assert!(esh_pty::is_process_alive(job));

    session.close(true).await.unwrap();

    assert!(eventually(|| !esh_pty::is_process_alive(job)).await, "background job {job} survived close");
    assert!(eventually(|| !esh_pty::is_group_alive(pgid)).await);
}

#[tokio::test]
async fn drop_without_close_kills_the_group() {
    let pid = {
        let session = SessionBuilder::new()
            .command("sleep")
            .arg("30")
            .spawn()
            .await
            .unwrap();
        session.pid()
    };

    assert!(eventually(|| !esh_pty::is_process_alive(pid)).await, "process {pid} survived drop");
}
