use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

/// Reason reported when [`AbortSignal::abort`] is called without one.
const DEFAULT_REASON: &str = "aborted";

/// Error raised when an operation observes a fired [`AbortSignal`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct Aborted(pub String);

/// Cancellation signal shared by every upload of one publish session.
///
/// Clones observe the same signal. The first reason recorded wins.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<String>>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing token, e.g. one owned by the host application.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            reason: Arc::default(),
        }
    }

    /// Fires the signal.
    pub fn abort(&self) {
        self.token.cancel();
    }

    /// Fires the signal, recording why.
    pub fn abort_with(&self, reason: impl Into<String>) {
        let _ = self.reason.set(reason.into());
        self.token.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The recorded reason, or `"aborted"`.
    pub fn reason(&self) -> String {
        self.reason
            .get()
            .cloned()
            .unwrap_or_else(|| DEFAULT_REASON.to_string())
    }

    /// Returns `Err` if the signal has fired.
    pub fn check(&self) -> Result<(), Aborted> {
        if self.is_aborted() {
            Err(Aborted(self.reason()))
        } else {
            Ok(())
        }
    }

    /// Completes once the signal fires.
    pub async fn aborted(&self) {
        self.token.cancelled().await;
    }

    /// The underlying token, for `select!` on the host side.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}
