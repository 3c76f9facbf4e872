//! Integration tests for the settle sequence and world-label capture.

mod common;

use std::time::Duration;

use common::TestFleet;
use fleetwatch::LoginOutcome;
use fleetwatch_proto::{DisplaySlot, Objective, ScoreEntry, SessionEvent};
use tokio::time::sleep;

fn panel(rows: &[&str]) -> Objective {
    let top = rows.len() as i32;
    Objective {
        name: "side".into(),
        title: "ꜰᴀᴄᴛɪᴏɴꜱ".into(),
        slot: Some(DisplaySlot::Sidebar),
        entries: rows
            .iter()
            .enumerate()
            .map(|(i, row)| ScoreEntry::new(*row, top - i as i32))
            .collect(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_settle_sends_hop_then_home() {
    let t = TestFleet::start(&["alpha"]);
    assert_eq!(t.fleet.login(1).await, LoginOutcome::Online);

    sleep(Duration::from_secs(30)).await;
    let sent = t.connector.connection("alpha").unwrap().sent_at();
    let lines: Vec<&str> = sent.iter().map(|(l, _)| l.as_str()).collect();
    assert_eq!(
        &lines[..4],
        ["/server factions", "/home home", "/server factions", "/home home"]
    );

    // home waits for the hop to land
    assert!(sent[1].1 - sent[0].1 >= Duration::from_millis(8_500));
    // one home attempt was enough
    assert_eq!(lines.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_label_captured_only_after_home_confirmed() {
    let t = TestFleet::start(&["alpha"]);
    t.connector.world().sidebar = Some(panel(&["Season Four", "Lobby [#2]", "Emberfall"]));
    assert_eq!(t.fleet.login(1).await, LoginOutcome::Online);

    // The lobby panel arrives before the account is home.
    let conn = t.connector.connection("alpha").unwrap();
    conn.push(SessionEvent::DisplayChanged(panel(&["Season Four", "Hub Lobby"])));
    sleep(Duration::from_secs(5)).await;
    assert_eq!(t.fleet.get_world_label(1), None);

    // Confirmation arms capture and evaluates what was already observed.
    sleep(Duration::from_secs(25)).await;
    assert_eq!(t.fleet.get_world_label(1), None);

    conn.push(SessionEvent::DisplayChanged(panel(&[
        "ꜱᴇᴀꜱᴏɴ ꜰᴏᴜʀ",
        "Balance: 10",
        "Emberfall",
    ])));
    sleep(Duration::from_millis(10)).await;
    assert_eq!(t.fleet.get_world_label(1).as_deref(), Some("Emberfall"));
}

#[tokio::test(start_paused = true)]
async fn test_arming_probes_the_current_panel() {
    let t = TestFleet::start(&["alpha"]);
    t.connector.world().sidebar = Some(panel(&["Season Two", "Northreach"]));
    assert_eq!(t.fleet.login(1).await, LoginOutcome::Online);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(t.fleet.get_world_label(1).as_deref(), Some("Northreach"));
}

#[tokio::test(start_paused = true)]
async fn test_capture_stays_disarmed_without_confirmation() {
    let t = TestFleet::start(&["alpha"]);
    t.connector.world().confirm_home = false;
    t.connector.world().sidebar = Some(panel(&["Season Two", "Northreach"]));
    assert_eq!(t.fleet.login(1).await, LoginOutcome::Online);

    let conn = t.connector.connection("alpha").unwrap();
    conn.push(SessionEvent::DisplayChanged(panel(&["Season Two", "Northreach"])));
    sleep(Duration::from_secs(60)).await;
    assert_eq!(t.fleet.get_world_label(1), None);

    let homes = conn.sent().iter().filter(|l| l.starts_with("/home")).count();
    // one settle home plus four redundancy attempts
    assert_eq!(homes, 5);
}

#[tokio::test(start_paused = true)]
async fn test_ensure_home_arms_on_demand() {
    let t = TestFleet::start(&["alpha"]);
    t.connector.world().confirm_home = false;
    t.connector.world().sidebar = Some(panel(&["Season Two", "Northreach"]));
    assert_eq!(t.fleet.login(1).await, LoginOutcome::Online);
    sleep(Duration::from_secs(60)).await;
    assert_eq!(t.fleet.get_world_label(1), None);

    t.connector.world().confirm_home = true;
    assert!(t.fleet.ensure_home(1).await.unwrap());
    assert_eq!(t.fleet.get_world_label(1).as_deref(), Some("Northreach"));
}

#[tokio::test(start_paused = true)]
async fn test_label_cleared_on_disconnect() {
    let t = TestFleet::start(&["alpha"]);
    t.connector.world().sidebar = Some(panel(&["Season Two", "Northreach"]));
    assert_eq!(t.fleet.login(1).await, LoginOutcome::Online);
    sleep(Duration::from_secs(30)).await;
    assert!(t.fleet.get_world_label(1).is_some());

    t.connector.connection("alpha").unwrap().kick("Server restarting");
    sleep(Duration::from_millis(10)).await;
    assert_eq!(t.fleet.get_world_label(1), None);
}
