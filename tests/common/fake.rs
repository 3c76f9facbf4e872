//! Scripted connector standing in for a protocol adapter.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fleetwatch_proto::{
    ConnectOptions, Connector, DeviceCode, EventStream, Objective, ProtoError, Result,
    SessionEvent, WorldConnection,
};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// What a fresh connection does on its own.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Joins immediately under the requested username.
    AutoJoin,
    /// Never reports anything until told to.
    Silent,
    /// Reports a device code and waits.
    InteractiveCode,
    /// Is kicked right away with this reason.
    KickOnConnect(String),
    /// The connector itself fails.
    Refuse,
}

/// Scripted server replies shared by every connection of one connector.
#[derive(Debug, Clone, Default)]
pub struct World {
    /// Reply to the home command with a teleport line.
    pub confirm_home: bool,
    /// Swallow broadcast chat instead of echoing it.
    pub mute_broadcast: bool,
    pub sidebar: Option<Objective>,
    pub completions: Vec<String>,
    /// Player -> group. `None` means "no group"; absent players get no reply.
    pub groups: HashMap<String, Option<String>>,
    /// Exact command -> reply lines.
    pub replies: HashMap<String, Vec<String>>,
    /// One-shot lines delivered ahead of the reply to a matching command.
    pub interjections: Vec<Interjection>,
}

/// Lines the server emits just before it handles a command starting with
/// `prefix`, after `skip` earlier matches have gone by.
#[derive(Debug, Clone)]
pub struct Interjection {
    pub prefix: String,
    pub skip: usize,
    pub lines: Vec<String>,
}

impl Interjection {
    pub fn new<const N: usize>(prefix: &str, skip: usize, lines: [&str; N]) -> Self {
        Self {
            prefix: prefix.to_string(),
            skip,
            lines: lines.map(String::from).to_vec(),
        }
    }
}

impl World {
    fn take_interjection(&mut self, line: &str) -> Vec<String> {
        let Some(pos) = self
            .interjections
            .iter()
            .position(|i| line.starts_with(&i.prefix))
        else {
            return Vec::new();
        };
        if self.interjections[pos].skip > 0 {
            self.interjections[pos].skip -= 1;
            return Vec::new();
        }
        self.interjections.remove(pos).lines
    }
}

pub struct FakeConnector {
    default: Mutex<Behavior>,
    overrides: Mutex<HashMap<String, Behavior>>,
    world: Arc<Mutex<World>>,
    attempts: Mutex<Vec<(String, Instant)>>,
    connections: Mutex<Vec<Arc<FakeConnection>>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self {
            default: Mutex::new(Behavior::AutoJoin),
            overrides: Mutex::new(HashMap::new()),
            world: Arc::new(Mutex::new(World {
                confirm_home: true,
                ..World::default()
            })),
            attempts: Mutex::new(Vec::new()),
            connections: Mutex::new(Vec::new()),
        }
    }

    pub fn set_default(&self, behavior: Behavior) {
        *self.default.lock() = behavior;
    }

    /// Behavior for connections requesting `username`.
    pub fn set_behavior(&self, username: &str, behavior: Behavior) {
        self.overrides.lock().insert(username.to_string(), behavior);
    }

    pub fn world(&self) -> parking_lot::MutexGuard<'_, World> {
        self.world.lock()
    }

    /// Every connect call, in order, with the time it was made.
    pub fn attempts(&self) -> Vec<(String, Instant)> {
        self.attempts.lock().clone()
    }

    pub fn attempts_for(&self, username: &str) -> Vec<Instant> {
        self.attempts
            .lock()
            .iter()
            .filter(|(u, _)| u == username)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn connections(&self) -> Vec<Arc<FakeConnection>> {
        self.connections.lock().clone()
    }

    /// Most recent connection for `username`.
    pub fn connection(&self, username: &str) -> Option<Arc<FakeConnection>> {
        self.connections
            .lock()
            .iter()
            .rev()
            .find(|c| c.requested == username)
            .cloned()
    }

    /// Connections that have not been closed.
    pub fn open_connections(&self) -> usize {
        self.connections.lock().iter().filter(|c| !c.is_closed()).count()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, opts: ConnectOptions) -> Result<(Arc<dyn WorldConnection>, EventStream)> {
        self.attempts
            .lock()
            .push((opts.username.clone(), Instant::now()));

        let behavior = self
            .overrides
            .lock()
            .get(&opts.username)
            .cloned()
            .unwrap_or_else(|| self.default.lock().clone());
        if let Behavior::Refuse = behavior {
            return Err(ProtoError::ConnectFailed("connection refused".into()));
        }

        let (tx, rx) = mpsc::channel(256);
        let conn = Arc::new(FakeConnection {
            requested: opts.username.clone(),
            events: tx,
            world: Arc::clone(&self.world),
            joined_as: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            close_reason: Mutex::new(None),
        });

        match behavior {
            Behavior::AutoJoin => conn.join(),
            Behavior::InteractiveCode => conn.push(SessionEvent::InteractiveCode(DeviceCode {
                user_code: Some("abcd-1234".into()),
                verification_uri: Some("https://example.net/link".into()),
                expires_in: Some(900),
                ..DeviceCode::default()
            })),
            Behavior::KickOnConnect(reason) => conn.push(SessionEvent::Kicked { reason }),
            Behavior::Silent | Behavior::Refuse => {}
        }

        self.connections.lock().push(Arc::clone(&conn));
        Ok((conn as Arc<dyn WorldConnection>, rx))
    }
}

pub struct FakeConnection {
    /// Username the fleet asked for.
    pub requested: String,
    events: mpsc::Sender<SessionEvent>,
    world: Arc<Mutex<World>>,
    joined_as: Mutex<Option<String>>,
    sent: Mutex<Vec<(String, Instant)>>,
    closed: AtomicBool,
    close_reason: Mutex<Option<String>>,
}

impl FakeConnection {
    pub fn push(&self, event: SessionEvent) {
        let _ = self.events.try_send(event);
    }

    pub fn join(&self) {
        *self.joined_as.lock() = Some(self.requested.clone());
        self.push(SessionEvent::Joined {
            username: self.requested.clone(),
            unique_id: Some(format!("uuid-{}", self.requested)),
        });
    }

    pub fn kick(&self, reason: &str) {
        self.push(SessionEvent::Kicked {
            reason: reason.to_string(),
        });
    }

    pub fn chat(&self, line: &str) {
        self.push(SessionEvent::Chat(line.to_string()));
    }

    /// Every line sent, in order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(l, _)| l.clone()).collect()
    }

    pub fn sent_at(&self) -> Vec<(String, Instant)> {
        self.sent.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn close_reason(&self) -> Option<String> {
        self.close_reason.lock().clone()
    }

    fn respond(&self, line: &str) {
        let (world, mut out) = {
            let mut world = self.world.lock();
            let early = world.take_interjection(line);
            (world.clone(), early)
        };

        if line.starts_with("/home") && world.confirm_home {
            out.push("Teleporting you home...".to_string());
        } else if let Some(text) = line.strip_prefix("/gc ") {
            if !world.mute_broadcast {
                out.push(format!("[Guild] {}: {}", self.requested, text));
            }
        } else if let Some(name) = line.strip_prefix("/f who ") {
            match world.groups.get(name) {
                Some(Some(group)) => {
                    out.push(format!("------------[ {group} ]------------"));
                    out.push("Leader: someone".to_string());
                }
                Some(None) => out.push(format!("✘ The faction \"{name}\" does not exist.")),
                None => {}
            }
        } else if let Some(lines) = world.replies.get(line) {
            out.extend(lines.iter().cloned());
        }

        for line in out {
            self.chat(&line);
        }
    }
}

#[async_trait]
impl WorldConnection for FakeConnection {
    fn send_text(&self, line: &str) -> Result<()> {
        if self.is_closed() {
            return Err(ProtoError::Closed);
        }
        self.sent.lock().push((line.to_string(), Instant::now()));
        self.respond(line);
        Ok(())
    }

    async fn complete(&self, _prefix: &str, _timeout: Duration) -> Result<Vec<String>> {
        if self.is_closed() {
            return Err(ProtoError::Closed);
        }
        Ok(self.world.lock().completions.clone())
    }

    fn username(&self) -> Option<String> {
        self.joined_as.lock().clone()
    }

    fn sidebar(&self) -> Option<Objective> {
        self.world.lock().sidebar.clone()
    }

    fn close(&self, reason: &str) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.close_reason.lock() = Some(reason.to_string());
        self.push(SessionEvent::Disconnected {
            reason: format!("closed: {reason}"),
        });
    }
}
