//! # Spoofing Session
//!
//! A session walks a fixed sequence of phases:
//!
//! ```text
//! Idle ──start──▶ Poisoning ──session timer──▶ Restoring ──restore window──▶ Terminated
//! ```
//!
//! [`Session::start`] performs every fallible step (interface lookup,
//! target expansion, capture handle, host resolution) before the first
//! forged reply leaves, and returns a [`RunningSession`]. From there a
//! controller task lets the poisoning phase run out, stops the workers,
//! restores the real host binding on every target and closes the capture
//! handle. [`RunningSession::finish`] waits for it.

use std::fmt;
use std::net::Ipv4Addr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use lure_common::config::SessionDefaults;
use lure_common::network::interface::spoofing_identity;
use lure_common::network::target;
use lure_common::{AddressBinding, TargetSet};
use pnet::util::MacAddr;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::cache::AddressCache;
use crate::error::SpoofError;
use crate::injector::{Injector, InjectorReport};
use crate::network::channel::{ListenerGuard, SharedSender};
use crate::network::link::LinkProvider;
use crate::observer::{Observer, ObserverReport};
use crate::resolver::Resolver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Interface selector: name, description or one of its IPv4 addresses.
    pub interface: String,
    pub host_ip: String,
    pub targets: String,
    pub injection_interval: Duration,
    pub session_duration: Duration,
    pub restore_interval: Duration,
    pub restore_duration: Duration,
    pub host_resolve_timeout: Duration,
}

impl From<&SessionDefaults> for SessionConfig {
    fn from(defaults: &SessionDefaults) -> Self {
        Self {
            interface: defaults.interface.clone(),
            host_ip: defaults.host_ip.clone(),
            targets: defaults.targets.clone(),
            injection_interval: Duration::from_millis(defaults.injection_interval_ms),
            session_duration: Duration::from_secs(defaults.session_duration_sec),
            restore_interval: Duration::from_millis(defaults.restore_interval_ms),
            restore_duration: Duration::from_millis(defaults.restore_duration_ms),
            host_resolve_timeout: Duration::from_millis(defaults.host_resolve_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Poisoning,
    Restoring,
    Terminated,
}

impl SessionState {
    /// The only state this one may move to.
    pub fn next(self) -> Option<SessionState> {
        match self {
            SessionState::Idle => Some(SessionState::Poisoning),
            SessionState::Poisoning => Some(SessionState::Restoring),
            SessionState::Restoring => Some(SessionState::Terminated),
            SessionState::Terminated => None,
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Poisoning | SessionState::Restoring)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Poisoning => "poisoning",
            SessionState::Restoring => "restoring",
            SessionState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Publishes state changes and keeps the sequence a session went through.
struct Phases {
    tx: watch::Sender<SessionState>,
    history: Vec<SessionState>,
}

impl Phases {
    fn new() -> Self {
        let (tx, _) = watch::channel(SessionState::Idle);
        Self {
            tx,
            history: vec![SessionState::Idle],
        }
    }

    fn current(&self) -> SessionState {
        *self.tx.borrow()
    }

    fn advance(&mut self) {
        let Some(next) = self.current().next() else {
            return;
        };
        self.tx.send_replace(next);
        self.history.push(next);
        info!(state = %next, "session state changed");
    }
}

/// What a finished session did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub host: AddressBinding,
    pub targets: usize,
    pub transitions: Vec<SessionState>,
    pub poison: InjectorReport,
    pub restore: InjectorReport,
    pub observer: ObserverReport,
}

pub struct Session;

impl Session {
    /// Moves a session from Idle to Poisoning.
    ///
    /// On error nothing forged has been sent and the capture handle, if it
    /// was opened, is closed again. On success the rest of the session runs
    /// on its own task: the session timer starts here, and dropping the
    /// returned [`RunningSession`] does not stop the restore.
    pub async fn start(
        config: SessionConfig,
        links: &dyn LinkProvider,
    ) -> Result<RunningSession, SpoofError> {
        if config.injection_interval.is_zero() {
            return Err(SpoofError::ZeroInterval("injection interval"));
        }
        if config.restore_interval.is_zero() {
            return Err(SpoofError::ZeroInterval("restore interval"));
        }

        let (targets, host_ip) = target::resolve(&config.targets, &config.host_ip)?;
        let interface = links.interface(&config.interface)?;
        let (own_ip, own_mac) =
            spoofing_identity(&interface).map_err(|reason| SpoofError::InterfaceUnusable {
                name: interface.name.clone(),
                reason,
            })?;
        let own = AddressBinding::new(own_ip, own_mac);

        let (tx, rx, listener) = links.open(&interface)?.into_parts();
        info!(
            interface = %interface.name,
            operator = %own,
            %host_ip,
            targets = targets.len(),
            "starting session"
        );

        let cache = AddressCache::new();
        let token = CancellationToken::new();
        let host_mac = Arc::new(OnceLock::new());

        let observer = tokio::spawn(
            Observer::new(rx, cache.clone(), own_mac, host_ip, host_mac.clone(), targets.clone())
                .run(token.clone()),
        );

        let resolver = Resolver::new(tx.clone(), own, cache);
        let host = match resolver
            .resolve_within(host_ip, config.host_resolve_timeout)
            .await
        {
            Ok(binding) => binding,
            Err(e) => {
                token.cancel();
                if let Err(join) = observer.await {
                    error!(error = %join, "observer task failed");
                }
                listener.close();
                return Err(e);
            }
        };
        let _ = host_mac.set(host.mac());

        let target_list: Arc<[Ipv4Addr]> = targets.as_slice().into();
        let injector = tokio::spawn(
            Injector::new(
                "poison",
                tx.clone(),
                resolver.clone(),
                own_mac,
                AddressBinding::new(host_ip, own_mac),
                target_list.clone(),
                config.injection_interval,
            )
            .run(token.clone()),
        );

        let mut phases = Phases::new();
        phases.advance();
        let state = phases.tx.subscribe();

        let controller = Controller {
            deadline: Instant::now() + config.session_duration,
            restore_interval: config.restore_interval,
            restore_duration: config.restore_duration,
            phases,
            token,
            observer,
            injector,
            tx,
            listener,
            resolver,
            own_mac,
            host,
            target_list,
        };

        Ok(RunningSession {
            state,
            host,
            targets,
            controller: tokio::spawn(controller.run()),
        })
    }

    /// Runs a whole session: start, poison for the configured duration,
    /// restore, terminate.
    pub async fn run(
        config: SessionConfig,
        links: &dyn LinkProvider,
    ) -> Result<SessionSummary, SpoofError> {
        Ok(Self::start(config, links).await?.finish().await)
    }
}

/// A started session. Its phases advance on their own; this is a handle
/// for watching them and collecting the summary.
pub struct RunningSession {
    state: watch::Receiver<SessionState>,
    host: AddressBinding,
    targets: TargetSet,
    controller: JoinHandle<SessionSummary>,
}

impl RunningSession {
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// The host's real binding, captured before poisoning began.
    pub fn host(&self) -> AddressBinding {
        self.host
    }

    pub fn targets(&self) -> &TargetSet {
        &self.targets
    }

    /// Waits until the session has restored and terminated.
    pub async fn finish(self) -> SessionSummary {
        match self.controller.await {
            Ok(summary) => summary,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                error!(error = %e, "session task cancelled");
                SessionSummary {
                    host: self.host,
                    targets: self.targets.len(),
                    transitions: vec![*self.state.borrow()],
                    poison: InjectorReport::default(),
                    restore: InjectorReport::default(),
                    observer: ObserverReport::default(),
                }
            }
        }
    }
}

/// Owns the workers of a session from Poisoning onwards.
struct Controller {
    deadline: Instant,
    restore_interval: Duration,
    restore_duration: Duration,
    phases: Phases,
    token: CancellationToken,
    observer: JoinHandle<Observer>,
    injector: JoinHandle<InjectorReport>,
    tx: SharedSender,
    listener: ListenerGuard,
    resolver: Resolver,
    own_mac: MacAddr,
    host: AddressBinding,
    target_list: Arc<[Ipv4Addr]>,
}

impl Controller {
    async fn run(mut self) -> SessionSummary {
        tokio::time::sleep_until(self.deadline).await;

        self.token.cancel();
        let poison = self.injector.await.unwrap_or_else(|e| {
            error!(error = %e, "injector task failed");
            InjectorReport::default()
        });
        // Dropping the observer drops the frame queue, which stops the listener.
        let observer = match self.observer.await {
            Ok(observer) => observer.report(),
            Err(e) => {
                error!(error = %e, "observer task failed");
                ObserverReport::default()
            }
        };

        self.phases.advance();
        let restore = Injector::new(
            "restore",
            self.tx.clone(),
            self.resolver.clone(),
            self.own_mac,
            self.host,
            self.target_list.clone(),
            self.restore_interval,
        )
        .run_for(self.restore_duration)
        .await;

        self.listener.close();
        self.phases.advance();

        info!(host = %self.host, "session terminated");
        SessionSummary {
            host: self.host,
            targets: self.target_list.len(),
            transitions: self.phases.history,
            poison,
            restore,
            observer,
        }
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
