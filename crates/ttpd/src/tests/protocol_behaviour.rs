//! End-to-end behaviour of the command protocol over a real socket.

use std::sync::Arc;

use rstest::{fixture, rstest};
use serde_json::json;

use super::support::{
    BusRecorder, DaemonFiles, RecordingBusConnector, RecordingHealthReporter, RunningDaemon, pid,
};
use crate::runtime::RunOutcome;

#[fixture]
fn reporter() -> Arc<RecordingHealthReporter> {
    Arc::new(RecordingHealthReporter::default())
}

#[rstest]
fn status_lists_fields_and_never_touches_the_bus(reporter: Arc<RecordingHealthReporter>) {
    let files = DaemonFiles::new();
    let recorder = Arc::new(BusRecorder::default());
    let connector = RecordingBusConnector::new(&recorder);
    let daemon = RunningDaemon::spawn(&files, reporter, move |builder| {
        builder.bus_connector(Box::new(connector))
    });

    let answer = daemon.send("status\n");
    daemon.send("terminate\n");
    assert_eq!(daemon.join(), RunOutcome::Terminated);

    let pid = pid();
    let lines: Vec<&str> = answer.lines().collect();
    assert!(
        lines
            .first()
            .is_some_and(|line| line.starts_with(&format!("{pid} status: running since "))),
        "unexpected answer: {answer}"
    );
    let tail: Vec<&str> = lines.iter().rev().take(2).rev().copied().collect();
    let expected = [format!("{pid} textingInterval: 0"), format!("{pid} OK")];
    assert_eq!(tail, expected.iter().map(String::as_str).collect::<Vec<_>>());
    assert!(answer.contains(&format!("{pid} pid: {pid}\n")));
    assert_eq!(recorder.connects(), 0);
}

#[rstest]
fn unknown_command_gets_the_fallback_answer(reporter: Arc<RecordingHealthReporter>) {
    let files = DaemonFiles::new();
    let daemon = RunningDaemon::spawn(&files, reporter, |builder| builder);

    let answer = daemon.send("bogus\n");
    daemon.send("terminate\n");
    daemon.join();

    let pid = pid();
    assert_eq!(answer, format!("{pid} unknowned command 'bogus'\n{pid} OK\n"));
}

#[rstest]
fn daemon_commands_take_precedence_over_builtins(reporter: Arc<RecordingHealthReporter>) {
    let files = DaemonFiles::new();
    let daemon = RunningDaemon::spawn(&files, reporter, |builder| {
        builder
            .command("echo", |request| format!("{}\n", request.args().join(" ")))
            .command("status", |_| "overridden\n".to_string())
    });

    let echo = daemon.send("echo one  two\n");
    let status = daemon.send("status\n");
    let help = daemon.send("help\n");
    daemon.send("terminate\n");
    daemon.join();

    let pid = pid();
    assert_eq!(echo, format!("{pid} one two\n{pid} OK\n"));
    assert_eq!(status, format!("{pid} overridden\n{pid} OK\n"));
    assert_eq!(
        help,
        format!("{pid} echo\n{pid} help\n{pid} status\n{pid} terminate\n{pid} OK\n")
    );
}

#[rstest]
fn terminate_answers_with_the_trailer_only(reporter: Arc<RecordingHealthReporter>) {
    let files = DaemonFiles::new();
    let daemon = RunningDaemon::spawn(&files, reporter, |builder| builder);

    let answer = daemon.send("terminate\n");
    assert_eq!(daemon.join(), RunOutcome::Terminated);
    assert_eq!(answer, format!("{} OK\n", pid()));
}

#[rstest]
fn status_reflects_reloaded_configuration(reporter: Arc<RecordingHealthReporter>) {
    let mut files = DaemonFiles::new();
    let daemon = RunningDaemon::spawn(&files, reporter, |builder| builder);

    let before = daemon.send("status\n");
    files.rewrite("messagingTimeout", json!(45));
    let after = daemon.send("status\n");
    daemon.send("terminate\n");
    daemon.join();

    let pid = pid();
    assert!(before.contains(&format!("{pid} messagingTimeout: 30\n")));
    assert!(after.contains(&format!("{pid} messagingTimeout: 45\n")));
}
