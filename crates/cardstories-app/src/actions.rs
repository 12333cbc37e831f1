// One-shot requests: game actions and state loads.
//
// Actions never re-issue themselves. Callers discard the outstanding poll
// before anything that mutates server state.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use cardstories_core::protocol::{
    check_action_response, parse_update_items, Action, GameId, ProtocolError, Subject,
    UpdateItem, UpdateKind,
};

use crate::error::ClientError;
use crate::transport::Transport;

pub struct ActionClient {
    transport: Arc<dyn Transport>,
}

impl ActionClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Send `action` and return the response body once the error envelope
    /// has been ruled out.
    pub async fn send(&self, subject: &Subject, action: &Action) -> Result<Value, ClientError> {
        debug!(action = action.name(), ?subject, "sending action");
        let body = self.transport.request(action.query(subject)).await?;
        Ok(check_action_response(body)?)
    }

    /// Current state for `kinds`, as update items.
    pub async fn load_state(
        &self,
        subject: &Subject,
        kinds: BTreeSet<UpdateKind>,
    ) -> Result<Vec<UpdateItem>, ClientError> {
        let body = self.send(subject, &Action::State { kinds }).await?;
        Ok(parse_update_items(body)?)
    }

    /// Create a game owned by the subject's player.
    pub async fn create(&self, subject: &Subject) -> Result<GameId, ClientError> {
        let body = self.send(subject, &Action::Create).await?;
        let game_id = body
            .get("game_id")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                ProtocolError::UnexpectedShape(format!("create response without game_id: {body}"))
            })?;
        info!(game_id, "created game");
        Ok(game_id)
    }
}
