// Combined error type for everything the controller can surface.

use thiserror::Error;

use cardstories_core::protocol::{ActionFailure, ErrorEnvelope, ProtocolError};
use cardstories_core::session::PollFailure;

use crate::transport::TransportError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Service(ErrorEnvelope),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ClientError {
    /// Deliberate cancellations are not errors.
    pub fn is_abort(&self) -> bool {
        matches!(self, ClientError::Transport(TransportError::Aborted))
    }

    /// Service error code, if the server rejected the request.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Service(envelope) => Some(&envelope.code),
            _ => None,
        }
    }
}

impl From<ActionFailure> for ClientError {
    fn from(failure: ActionFailure) -> Self {
        match failure {
            ActionFailure::Service(envelope) => ClientError::Service(envelope),
            ActionFailure::Protocol(e) => ClientError::Protocol(e),
        }
    }
}

impl From<PollFailure> for ClientError {
    fn from(failure: PollFailure) -> Self {
        match failure {
            PollFailure::Service(envelope) => ClientError::Service(envelope),
            PollFailure::Malformed(e) => ClientError::Protocol(e),
        }
    }
}
