//! Debounce and coalescing of raw change events.
//!
//! One coalescing task per watch session. It opens a window on the first raw event,
//! extends it while events keep arriving within `debounce` of each other, and closes it
//! after an idle `debounce` or once `max_wait` has passed since the window opened. Each
//! closed window produces exactly one [`WatchSignal::Changed`].

use crate::watch::{ChangeScope, ChangeSignal, SessionId, WatchSignal};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace, warn};

/// Raw event as bridged from the notify callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    /// A change at a root-relative path
    Change(String),
    /// The OS watch reported an error
    Error(String),
}

/// Coalescing windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoalesceConfig {
    pub debounce: Duration,
    pub max_wait: Duration,
}

impl Default for CoalesceConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            max_wait: Duration::from_millis(1000),
        }
    }
}

/// State shared between the notify callback thread and the coalescing task
#[derive(Debug, Default)]
pub struct Bridge {
    /// Set when a raw event was dropped because the bridge channel was full
    pub overflowed: AtomicBool,
    /// OS error that could not be queued
    pub error: Mutex<Option<String>>,
}

/// Identity of the session a coalescer emits for
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session: SessionId,
    pub root: PathBuf,
    pub active: Arc<AtomicBool>,
    pub bridge: Arc<Bridge>,
}

/// Open coalescing window
struct Window {
    opened_at: DateTime<Utc>,
    opened: Instant,
    last_event: Instant,
    latest: Option<String>,
    multiple: bool,
    event_count: usize,
}

impl Window {
    fn open() -> Self {
        let now = Instant::now();
        Self {
            opened_at: Utc::now(),
            opened: now,
            last_event: now,
            latest: None,
            multiple: false,
            event_count: 0,
        }
    }

    fn absorb(&mut self, path: String) {
        if let Some(previous) = &self.latest {
            if previous != &path {
                self.multiple = true;
            }
        }
        self.latest = Some(path);
        self.last_event = Instant::now();
        self.event_count += 1;
    }

    fn close_at(&self, config: &CoalesceConfig) -> Instant {
        (self.last_event + config.debounce).min(self.opened + config.max_wait)
    }

    fn into_signal(self, ctx: &SessionContext, overflowed: bool) -> ChangeSignal {
        let scope = match self.latest {
            Some(path) if !self.multiple && !overflowed => ChangeScope::Path(path),
            _ => ChangeScope::Multiple,
        };
        ChangeSignal {
            session: ctx.session,
            root: ctx.root.clone(),
            scope,
            window_opened: self.opened_at,
            event_count: self.event_count,
        }
    }
}

/// Run the coalescing loop until the raw channel closes, an error is reported, or the
/// session is deactivated.
pub async fn run(
    mut raw: mpsc::Receiver<RawEvent>,
    signals: mpsc::Sender<WatchSignal>,
    ctx: SessionContext,
    config: CoalesceConfig,
) {
    loop {
        let Some(first) = raw.recv().await else {
            return;
        };

        let mut window = Window::open();
        let mut error = None;
        let mut closed = false;
        match first {
            RawEvent::Change(path) => window.absorb(path),
            RawEvent::Error(message) => error = Some(message),
        }

        while error.is_none() {
            match timeout_at(window.close_at(&config), raw.recv()).await {
                Ok(Some(RawEvent::Change(path))) => {
                    trace!(session = %ctx.session, path = %path, "Raw change");
                    window.absorb(path);
                }
                Ok(Some(RawEvent::Error(message))) => error = Some(message),
                Ok(None) => {
                    closed = true;
                    break;
                }
                Err(_) => break,
            }
        }

        if error.is_none() {
            error = ctx.bridge.error.lock().take();
        }

        if window.event_count > 0 {
            let overflowed = ctx.bridge.overflowed.swap(false, Ordering::AcqRel);
            let signal = window.into_signal(&ctx, overflowed);
            debug!(
                session = %ctx.session,
                event_count = signal.event_count,
                scope = %signal.scope,
                "Coalesced change window"
            );
            if !emit(&signals, &ctx, WatchSignal::Changed(signal)).await {
                return;
            }
        }

        if let Some(message) = error {
            warn!(session = %ctx.session, error = %message, "Watch failed, session inactive");
            let signal = WatchSignal::Error {
                session: ctx.session,
                root: ctx.root.clone(),
                message,
            };
            emit(&signals, &ctx, signal).await;
            ctx.active.store(false, Ordering::Release);
            return;
        }

        if closed {
            return;
        }
    }
}

/// Send a signal if the session is still active. Returns false once sending is pointless.
async fn emit(signals: &mpsc::Sender<WatchSignal>, ctx: &SessionContext, signal: WatchSignal) -> bool {
    if !ctx.active.load(Ordering::Acquire) {
        return false;
    }
    signals.send(signal).await.is_ok()
}
