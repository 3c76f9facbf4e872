//! JSON-lines bridge to an external protocol adapter.
//!
//! The game protocol itself is spoken by a separate adapter process. Each
//! session opens one TCP connection to it and exchanges newline-delimited
//! JSON:
//!
//! ```text
//! fleetwatch -> adapter   {"op":"connect",...} {"op":"chat","text":"/home"}
//!                         {"op":"complete","id":1,"prefix":"/a "} {"op":"quit","reason":"logout"}
//! adapter -> fleetwatch   {"event":"joined","data":{"username":"Steve"}}
//!                         {"event":"chat","data":"Teleporting..."}
//!                         {"event":"completions","data":{"id":1,"matches":["Steve"]}}
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fleetwatch_proto::{
    AuthMode, ConnectOptions, Connector, EventStream, Objective, ProtoError, SessionEvent,
    WorldConnection,
};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, warn};

/// Events buffered per session before the adapter is back-pressured.
const EVENT_BUFFER: usize = 256;
/// Queued outbound frames per session.
const OUTBOUND_BUFFER: usize = 64;
/// Longest accepted frame.
const MAX_FRAME: usize = 64 * 1024;

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Outbound {
    Connect {
        host: String,
        port: u16,
        version: String,
        username: String,
        auth: AuthMode,
        profiles_dir: PathBuf,
        check_timeout_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
    Chat {
        text: String,
    },
    Complete {
        id: u64,
        prefix: String,
    },
    Quit {
        reason: String,
    },
}

impl From<ConnectOptions> for Outbound {
    fn from(opts: ConnectOptions) -> Self {
        Self::Connect {
            host: opts.host,
            port: opts.port,
            version: opts.version,
            username: opts.username,
            auth: opts.auth,
            profiles_dir: opts.profiles_dir,
            check_timeout_ms: opts.check_timeout.as_millis() as u64,
            password: opts.password,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
enum Reply {
    Completions { id: u64, matches: Vec<String> },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Inbound {
    Reply(Reply),
    Event(SessionEvent),
}

/// [`Connector`] that talks to an adapter at `address`.
#[derive(Debug, Clone)]
pub struct BridgeConnector {
    address: String,
}

impl BridgeConnector {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl Connector for BridgeConnector {
    async fn connect(
        &self,
        opts: ConnectOptions,
    ) -> fleetwatch_proto::Result<(Arc<dyn WorldConnection>, EventStream)> {
        let stream = TcpStream::connect(&self.address)
            .await
            .map_err(|e| ProtoError::ConnectFailed(format!("{}: {e}", self.address)))?;
        let framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_FRAME));
        let (mut sink, mut source) = framed.split();

        let (out_tx, mut out_rx) = mpsc::channel::<Outbound>(OUTBOUND_BUFFER);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

        let conn = Arc::new(BridgeConnection {
            outbound: out_tx,
            username: Mutex::new(None),
            sidebar: Mutex::new(None),
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        });

        conn.outbound
            .try_send(Outbound::from(opts))
            .map_err(|e| ProtoError::ConnectFailed(e.to_string()))?;

        // Writer
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                let quit = matches!(frame, Outbound::Quit { .. });
                let line = match serde_json::to_string(&frame) {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "failed to encode bridge frame");
                        continue;
                    }
                };
                if let Err(e) = sink.send(line).await {
                    warn!(error = %e, "bridge write error");
                    break;
                }
                if quit {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        // Reader
        let reader_conn = Arc::clone(&conn);
        tokio::spawn(async move {
            let reason = loop {
                match source.next().await {
                    Some(Ok(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<Inbound>(&line) {
                            Ok(Inbound::Reply(Reply::Completions { id, matches })) => {
                                reader_conn.resolve_completion(id, matches);
                            }
                            Ok(Inbound::Event(event)) => {
                                let terminal = matches!(
                                    event,
                                    SessionEvent::Disconnected { .. } | SessionEvent::Kicked { .. }
                                );
                                reader_conn.observe(&event);
                                if terminal {
                                    reader_conn.closed.store(true, Ordering::SeqCst);
                                }
                                if event_tx.send(event).await.is_err() || terminal {
                                    reader_conn.closed.store(true, Ordering::SeqCst);
                                    return;
                                }
                            }
                            Err(e) => {
                                debug!(error = %e, %line, "undecodable bridge frame");
                            }
                        }
                    }
                    Some(Err(e)) => break format!("bridge read error: {e}"),
                    None => break "bridge closed".to_string(),
                }
            };
            reader_conn.closed.store(true, Ordering::SeqCst);
            let _ = event_tx.send(SessionEvent::Disconnected { reason }).await;
        });

        Ok((conn as Arc<dyn WorldConnection>, event_rx))
    }
}

/// One session over the bridge.
pub struct BridgeConnection {
    outbound: mpsc::Sender<Outbound>,
    username: Mutex<Option<String>>,
    sidebar: Mutex<Option<Objective>>,
    pending: Mutex<HashMap<u64, oneshot::Sender<Vec<String>>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl BridgeConnection {
    fn push(&self, frame: Outbound) -> fleetwatch_proto::Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProtoError::Closed);
        }
        self.outbound.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Closed(_) => ProtoError::Closed,
            mpsc::error::TrySendError::Full(_) => ProtoError::SendFailed("outbound queue full".into()),
        })
    }

    fn observe(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Joined { username, .. } => {
                *self.username.lock() = Some(username.clone());
            }
            SessionEvent::DisplayChanged(objective) => {
                let mut sidebar = self.sidebar.lock();
                if objective.is_sidebar() {
                    *sidebar = Some(objective.clone());
                } else if sidebar.as_ref().is_some_and(|s| s.name == objective.name) {
                    *sidebar = None;
                }
            }
            _ => {}
        }
    }

    fn resolve_completion(&self, id: u64, matches: Vec<String>) {
        if let Some(tx) = self.pending.lock().remove(&id) {
            let _ = tx.send(matches);
        }
    }
}

#[async_trait]
impl WorldConnection for BridgeConnection {
    fn send_text(&self, line: &str) -> fleetwatch_proto::Result<()> {
        self.push(Outbound::Chat {
            text: line.to_string(),
        })
    }

    async fn complete(&self, prefix: &str, timeout: Duration) -> fleetwatch_proto::Result<Vec<String>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        if let Err(e) = self.push(Outbound::Complete {
            id,
            prefix: prefix.to_string(),
        }) {
            self.pending.lock().remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(matches)) => Ok(matches),
            Ok(Err(_)) => Err(ProtoError::CompletionFailed("connection closed".into())),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(ProtoError::Timeout)
            }
        }
    }

    fn username(&self) -> Option<String> {
        self.username.lock().clone()
    }

    fn sidebar(&self) -> Option<Objective> {
        self.sidebar.lock().clone()
    }

    fn close(&self, reason: &str) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.outbound.try_send(Outbound::Quit {
            reason: reason.to_string(),
        });
    }
}
