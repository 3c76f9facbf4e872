//! Integration tests for the outbox and marker-delimited command capture.

mod common;

use std::time::Duration;

use common::TestFleet;
use fleetwatch::{FleetError, LoginOutcome, SessionPhase};
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn test_offline_commands_sent_once_after_login() {
    let t = TestFleet::start(&["alpha"]);

    let first = t.fleet.send_command(1, "bal");
    let second = t.fleet.send_command(1, "/pay Steve 10");
    assert!(matches!(first, Err(FleetError::CommandQueued(1))));
    assert!(matches!(second, Err(FleetError::CommandQueued(1))));
    assert!(first.unwrap_err().is_queued());

    sleep(Duration::from_secs(90)).await;
    assert!(t.fleet.is_online(1));
    assert_eq!(t.connector.attempts().len(), 1);

    let conn = t.connector.connection("alpha").unwrap();
    let sent = conn.sent_at();
    let bal: Vec<_> = sent.iter().filter(|(l, _)| l == "/bal").collect();
    let pay: Vec<_> = sent.iter().filter(|(l, _)| l == "/pay Steve 10").collect();
    assert_eq!(bal.len(), 1);
    assert_eq!(pay.len(), 1);
    assert!(pay[0].1 - bal[0].1 >= Duration::from_millis(900));

    // Queued commands go out after the settle sequence.
    let lines: Vec<&str> = sent.iter().map(|(l, _)| l.as_str()).collect();
    let bal_at = lines.iter().position(|l| *l == "/bal").unwrap();
    assert!(lines[..bal_at].contains(&"/home home"));
}

#[tokio::test(start_paused = true)]
async fn test_commands_held_while_settling() {
    let t = TestFleet::start(&["alpha"]);
    assert_eq!(t.fleet.login(1).await, LoginOutcome::Online);
    assert_eq!(t.fleet.session_phase(1), SessionPhase::Connected);

    // Joined but still settling: accepted, not sent yet.
    t.fleet.send_command(1, "bal").unwrap();
    sleep(Duration::from_secs(5)).await;
    let conn = t.connector.connection("alpha").unwrap();
    assert!(!conn.sent().contains(&"/bal".to_string()));

    sleep(Duration::from_secs(30)).await;
    assert_eq!(t.fleet.session_phase(1), SessionPhase::Ready);
    assert_eq!(
        conn.sent(),
        ["/server factions", "/home home", "/server factions", "/home home", "/bal"]
    );
    assert_eq!(t.connector.attempts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_online_commands_are_spaced() {
    let t = TestFleet::start(&["alpha"]);
    assert_eq!(t.fleet.login(1).await, LoginOutcome::Online);
    sleep(Duration::from_secs(30)).await;

    for cmd in ["/one", "/two", "/three"] {
        t.fleet.send_command(1, cmd).unwrap();
    }
    sleep(Duration::from_secs(5)).await;

    let sent = t.connector.connection("alpha").unwrap().sent_at();
    let ours: Vec<_> = sent
        .iter()
        .filter(|(l, _)| ["/one", "/two", "/three"].contains(&l.as_str()))
        .collect();
    let order: Vec<&str> = ours.iter().map(|(l, _)| l.as_str()).collect();
    assert_eq!(order, ["/one", "/two", "/three"]);
    for pair in ours.windows(2) {
        assert!(pair[1].1 - pair[0].1 >= Duration::from_millis(900));
    }
}

#[tokio::test(start_paused = true)]
async fn test_empty_command_rejected() {
    let t = TestFleet::start(&["alpha"]);
    assert!(matches!(t.fleet.send_command(1, "   "), Err(FleetError::EmptyCommand)));
    assert!(matches!(t.fleet.send_command(1, "/"), Err(FleetError::EmptyCommand)));
    sleep(Duration::from_secs(10)).await;
    assert!(t.connector.attempts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_marked_command_captures_reply() {
    let t = TestFleet::start(&["alpha"]);
    t.connector.world().replies.insert(
        "/bal".into(),
        vec!["Balance: $1,024".into(), "Rank: Member".into()],
    );
    assert_eq!(t.fleet.login(1).await, LoginOutcome::Online);
    sleep(Duration::from_secs(30)).await;

    let conn = t.connector.connection("alpha").unwrap();
    conn.chat("unrelated chatter before");

    let output = t.fleet.run_marked_command(1, "bal").await.unwrap();
    assert_eq!(output.as_deref(), Some("Balance: $1,024\nRank: Member"));

    let sent = conn.sent();
    let start = sent.iter().position(|l| l.starts_with("/gc [START_")).unwrap();
    assert_eq!(sent[start + 1], "/bal");
    assert!(sent[start + 2].starts_with("/gc [END_"));
}

#[tokio::test(start_paused = true)]
async fn test_marked_command_with_no_output() {
    let t = TestFleet::start(&["alpha"]);
    assert_eq!(t.fleet.login(1).await, LoginOutcome::Online);
    sleep(Duration::from_secs(30)).await;

    let output = t.fleet.run_marked_command(1, "/quiet").await.unwrap();
    assert_eq!(output.as_deref(), Some(""));
}

#[tokio::test(start_paused = true)]
async fn test_marked_command_silent_timeout() {
    let t = TestFleet::start(&["alpha"]);
    t.connector.world().mute_broadcast = true;
    t.connector
        .world()
        .replies
        .insert("/bal".into(), vec!["Balance: $5".into()]);
    assert_eq!(t.fleet.login(1).await, LoginOutcome::Online);
    sleep(Duration::from_secs(30)).await;

    // Without the start marker the reply cannot be attributed.
    let output = t.fleet.run_marked_command(1, "bal").await.unwrap();
    assert_eq!(output, None);
}

#[tokio::test(start_paused = true)]
async fn test_marked_command_requires_online() {
    let t = TestFleet::start(&["alpha"]);
    assert!(matches!(
        t.fleet.run_marked_command(1, "bal").await,
        Err(FleetError::NotOnline(1))
    ));

    assert_eq!(t.fleet.login(1).await, LoginOutcome::Online);
    t.fleet.logout(1).await;
    assert!(matches!(
        t.fleet.run_marked_command(1, "bal").await,
        Err(FleetError::NotOnline(1))
    ));
    assert_eq!(t.connector.connection("alpha").unwrap().sent(), Vec::<String>::new());
}
