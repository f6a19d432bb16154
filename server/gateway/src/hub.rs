//! Registry of per-connection write-queues, generalized from the teacher's
//! `PushHub` (one `mpsc::Sender` per user, `try_send`-and-drop on
//! backpressure). Here queue overflow must close the offending connection
//! rather than silently drop a frame, so each entry also carries a
//! `Notify` the connection's main loop watches for a forced shutdown.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use vp_control::ParticipantId;

struct ConnHandle {
    outbox: mpsc::Sender<Vec<u8>>,
    kill: Arc<Notify>,
}

#[derive(Default)]
pub struct ConnectionHub {
    conns: RwLock<HashMap<ParticipantId, ConnHandle>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        ConnectionHub::default()
    }

    pub fn register(&self, id: ParticipantId, outbox: mpsc::Sender<Vec<u8>>, kill: Arc<Notify>) {
        self.conns.write().insert(id, ConnHandle { outbox, kill });
    }

    pub fn unregister(&self, id: ParticipantId) {
        self.conns.write().remove(&id);
    }

    /// Enqueues `frame` on `id`'s write-queue. Overflow (a full bounded
    /// queue, meaning a stalled peer) forcibly tears the connection down
    /// and removes it from the hub rather than dropping the frame.
    pub fn send_to(&self, id: ParticipantId, frame: Vec<u8>) {
        let kill = {
            let conns = self.conns.read();
            let Some(handle) = conns.get(&id) else { return };
            match handle.outbox.try_send(frame) {
                Ok(()) => return,
                Err(_) => handle.kill.clone(),
            }
        };
        self.conns.write().remove(&id);
        kill.notify_one();
    }
}
