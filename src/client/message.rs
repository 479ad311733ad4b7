//! Error presentation: a de-duplicating presenter in front of a pluggable
//! sink, and the one-shot latch used for the session-expiry prompt.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::error::{Code, RequestError};

/// Where classified errors end up for the user. The host UI supplies a
/// toast implementation; the default logs through tracing.
pub trait ErrorSink: Send + Sync {
    fn show(&self, error: &RequestError);
}

pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn show(&self, error: &RequestError) {
        tracing::warn!("{}", error);
    }
}

/// Suppresses identical error codes while one is already on screen, so a
/// burst of failing calls produces a single toast.
pub struct DedupPresenter {
    sink: Box<dyn ErrorSink>,
    window: Duration,
    /// Codes that are never surfaced to the user.
    quiet_codes: Vec<Code>,
    shown: Mutex<HashMap<Code, Instant>>,
}

impl DedupPresenter {
    pub fn new(sink: Box<dyn ErrorSink>, window: Duration) -> Self {
        Self {
            sink,
            window,
            quiet_codes: Vec::new(),
            shown: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_quiet_codes(mut self, codes: Vec<Code>) -> Self {
        self.quiet_codes = codes;
        self
    }

    pub fn show(&self, error: &RequestError) {
        if error.msg.is_empty() || self.quiet_codes.contains(&error.code) {
            return;
        }

        let now = Instant::now();
        let mut shown = self.shown.lock().expect("presenter lock");
        shown.retain(|_, at| now.duration_since(*at) < self.window);

        if shown.contains_key(&error.code) {
            tracing::debug!("suppressing duplicate error toast: {}", error);
            return;
        }

        shown.insert(error.code.clone(), now);
        drop(shown);

        self.sink.show(error);
    }
}

/// One-shot latch for the re-login prompt: the first expired-session error
/// arms it, further ones are ignored until the prompt resolves.
#[derive(Default)]
pub struct ExpiryWatch {
    pending: AtomicBool,
}

impl ExpiryWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when this caller owns the prompt.
    pub fn try_begin(&self) -> bool {
        self.pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn finish(&self) {
        self.pending.store(false, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

/// Callback invoked when the backend reports an expired session. The host
/// is expected to confirm with the user, reset the session, and call
/// [`ExpiryWatch::finish`] once the prompt resolves.
pub trait ExpiryHandler: Send + Sync {
    fn on_expired(&self, error: &RequestError);
}
