// Global error surface: the one place every non-recoverable error ends up.

use tracing::{debug, error};

use crate::error::ClientError;
use crate::ui::{FatalKind, FatalNotice};

#[derive(Debug, Default)]
pub struct ErrorSurface {
    suppressed: bool,
}

impl ErrorSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `err` and build the notice the view must show, if any.
    ///
    /// Aborts produce nothing. While suppressed (during teardown) errors
    /// are only logged.
    pub fn report(&self, err: &ClientError) -> Option<FatalNotice> {
        if err.is_abort() {
            debug!("ignoring aborted request");
            return None;
        }
        error!(suppressed = self.suppressed, "client error: {err}");
        if self.suppressed {
            return None;
        }

        let stale = matches!(err, ClientError::Service(envelope) if envelope.is_stale_state());
        let (kind, message) = if stale {
            (
                FatalKind::StaleState,
                "The game moved on while you were acting. Reload to catch up.".to_string(),
            )
        } else {
            (FatalKind::Generic, err.to_string())
        };
        Some(FatalNotice {
            kind,
            code: err.code().map(str::to_string),
            message,
        })
    }

    pub fn suppress(&mut self) {
        self.suppressed = true;
    }

    pub fn resume(&mut self) {
        self.suppressed = false;
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }
}
