use std::sync::Arc;

use lure_common::config::Config;
use lure_core::network::link::LinkProvider;
use tokio::sync::watch;

#[derive(Clone)]
pub struct AppState {
    pub links: Arc<dyn LinkProvider>,
    pub config: Arc<Config>,
    pub sessions: SessionSlot,
}

impl AppState {
    pub fn new(links: Arc<dyn LinkProvider>, config: Config) -> Self {
        Self {
            links,
            config: Arc::new(config),
            sessions: SessionSlot::default(),
        }
    }
}

/// Admits at most one spoofing session at a time.
#[derive(Clone)]
pub struct SessionSlot {
    active: Arc<watch::Sender<bool>>,
}

impl Default for SessionSlot {
    fn default() -> Self {
        Self {
            active: Arc::new(watch::Sender::new(false)),
        }
    }
}

impl SessionSlot {
    /// Claims the slot, or returns `None` while another session holds it.
    pub fn try_claim(&self) -> Option<SlotGuard> {
        let claimed = self.active.send_if_modified(|active| {
            if *active {
                return false;
            }
            *active = true;
            true
        });
        claimed.then(|| SlotGuard {
            active: self.active.clone(),
        })
    }

    pub fn is_active(&self) -> bool {
        *self.active.borrow()
    }

    /// Resolves once no session holds the slot.
    pub async fn wait_idle(&self) {
        let mut rx = self.active.subscribe();
        let _ = rx.wait_for(|active| !*active).await;
    }
}

/// Releases its [`SessionSlot`] when dropped.
pub struct SlotGuard {
    active: Arc<watch::Sender<bool>>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.active.send_replace(false);
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
