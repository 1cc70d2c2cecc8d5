mod ballot;
mod engine;
mod public;
mod team;

pub use engine::AdvanceTrigger;

use crate::protocol::ServerMessage;
use crate::registry::RoundRegistry;
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;

/// The single authoritative session aggregate. All mutation goes through
/// `AppState` methods while holding the write lock, which serializes inbound
/// events one at a time (the buzz race has exactly one winner because of
/// this, not because of luck).
#[derive(Debug, Default)]
pub struct Session {
    pub teams: HashMap<TeamId, Team>,
    pub current: Option<RoundInstance>,
    /// Private side table: round id -> ballot index -> owning team. Never
    /// included in broadcast state; queryable only by the admin.
    pub ballot_owners: HashMap<RoundId, Vec<TeamId>>,
    pub room_code: String,
    /// Monotonic phase-entry counter, source of timer staleness tokens.
    pub generation_seq: u64,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RwLock<Session>>,
    pub registry: Arc<RoundRegistry>,
    /// Broadcast channel fanning the public state out to every connection.
    pub broadcast: broadcast::Sender<ServerMessage>,
    /// At most one pending phase-advance timer, tagged with the generation
    /// that armed it; replaced (and the old one aborted) on every phase
    /// entry. An older generation can never displace a newer one's timer.
    phase_timer: Arc<Mutex<Option<(u64, JoinHandle<()>)>>>,
}

fn new_room_code() -> String {
    petname::petname(2, "-").unwrap_or_else(|| "game-night".to_string())
}

impl AppState {
    pub fn new() -> Self {
        Self::with_registry(RoundRegistry::builtin())
    }

    pub fn with_registry(registry: RoundRegistry) -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self {
            session: Arc::new(RwLock::new(Session {
                room_code: new_room_code(),
                ..Session::default()
            })),
            registry: Arc::new(registry),
            broadcast: tx,
            phase_timer: Arc::new(Mutex::new(None)),
        }
    }

    /// Fire-and-forget fan-out; no receivers connected is fine.
    pub fn broadcast_to_all(&self, msg: ServerMessage) {
        let _ = self.broadcast.send(msg);
    }

    /// Discard the whole session and start fresh with a new room code.
    pub async fn reset_session(&self) {
        self.cancel_phase_timer().await;
        {
            let mut session = self.session.write().await;
            *session = Session {
                room_code: new_room_code(),
                ..Session::default()
            };
        }
        self.broadcast_state().await;
    }

    pub(crate) async fn cancel_phase_timer(&self) {
        if let Some((_, handle)) = self.phase_timer.lock().await.take() {
            handle.abort();
        }
    }

    /// Arm `handle` for phase `generation`, aborting the previous timer.
    ///
    /// Events re-arm the timer after releasing the session write lock, so two
    /// phase entries can reach this in the opposite order of their state
    /// mutations. The one armed for the older generation loses regardless of
    /// arrival order, otherwise it would abort the live phase's timer.
    pub(crate) async fn replace_phase_timer(&self, generation: u64, handle: Option<JoinHandle<()>>) {
        let mut slot = self.phase_timer.lock().await;
        if let Some((armed, _)) = slot.as_ref() {
            if *armed > generation {
                if let Some(late) = handle {
                    late.abort();
                }
                return;
            }
        }
        if let Some((_, old)) = slot.take() {
            old.abort();
        }
        *slot = handle.map(|h| (generation, h));
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
