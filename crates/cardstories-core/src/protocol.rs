// Wire shapes for the game service: request parameters, poll/action
// responses, update items, and the application error envelope.
//
// Every request is a flat list of query parameters with an `action` name.
// Responses are JSON: either an error envelope `{error: {code, data}}`,
// a long-poll timeout marker `{timeout: ...}`, or an ordered array of
// update items tagged with a `type`.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::game::Card;

pub type PlayerId = u64;
pub type GameId = u64;

/// Query parameters for one request, in wire order.
pub type QueryParams = Vec<(String, String)>;

// ---------------------------------------------------------------------------
// Update kinds
// ---------------------------------------------------------------------------

/// The kinds of data a poll can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    Game,
    Chat,
    Bot,
    Tabs,
    Table,
}

impl UpdateKind {
    pub const ALL: [UpdateKind; 5] = [
        UpdateKind::Game,
        UpdateKind::Chat,
        UpdateKind::Bot,
        UpdateKind::Tabs,
        UpdateKind::Table,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UpdateKind::Game => "game",
            UpdateKind::Chat => "chat",
            UpdateKind::Bot => "bot",
            UpdateKind::Tabs => "tabs",
            UpdateKind::Table => "table",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Whom a request is about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Subject {
    pub player_id: Option<PlayerId>,
    pub game_id: Option<GameId>,
}

impl Subject {
    pub fn new(player_id: Option<PlayerId>, game_id: Option<GameId>) -> Self {
        Self { player_id, game_id }
    }

    fn push_params(&self, params: &mut QueryParams) {
        if let Some(player_id) = self.player_id {
            params.push(("player_id".into(), player_id.to_string()));
        }
        if let Some(game_id) = self.game_id {
            params.push(("game_id".into(), game_id.to_string()));
        }
    }
}

/// A long-poll request: "anything of these kinds newer than `modified`".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    pub subject: Subject,
    pub kinds: BTreeSet<UpdateKind>,
    pub modified: u64,
}

impl PollRequest {
    pub fn query(&self) -> QueryParams {
        let mut params: QueryParams = vec![("action".into(), "poll".into())];
        push_kinds(&mut params, &self.kinds);
        params.push(("modified".into(), self.modified.to_string()));
        self.subject.push_params(&mut params);
        params
    }
}

fn push_kinds(params: &mut QueryParams, kinds: &BTreeSet<UpdateKind>) {
    for kind in kinds {
        params.push(("type".into(), kind.as_str().into()));
    }
}

/// One-shot actions. None of them re-issue themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Read the current state for the subscribed kinds.
    State { kinds: BTreeSet<UpdateKind> },
    Create,
    SetCard { card: Card },
    SetSentence { sentence: String },
    Invite { invited: Vec<PlayerId> },
    Participate,
    Pick { card: Card },
    /// Author closes the invitation and opens the vote.
    Voting,
    Vote { card: Card },
    Complete,
    SetCountdown { seconds: u32 },
    Message { text: String },
    Bot { enable: bool },
    RemoveTab { game_id: GameId },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::State { .. } => "state",
            Action::Create => "create",
            Action::SetCard { .. } => "set_card",
            Action::SetSentence { .. } => "set_sentence",
            Action::Invite { .. } => "invite",
            Action::Participate => "participate",
            Action::Pick { .. } => "pick",
            Action::Voting => "voting",
            Action::Vote { .. } => "vote",
            Action::Complete => "complete",
            Action::SetCountdown { .. } => "set_countdown",
            Action::Message { .. } => "message",
            Action::Bot { .. } => "bot",
            Action::RemoveTab { .. } => "remove_tab",
        }
    }

    /// Whether the action changes server state. Mutating actions must not
    /// race an outstanding poll.
    pub fn mutates(&self) -> bool {
        !matches!(self, Action::State { .. })
    }

    pub fn query(&self, subject: &Subject) -> QueryParams {
        let mut params: QueryParams = vec![("action".into(), self.name().into())];

        // `remove_tab` names the tab's game explicitly; everything else is
        // about the subject's current game.
        match self {
            Action::RemoveTab { game_id } => {
                if let Some(player_id) = subject.player_id {
                    params.push(("player_id".into(), player_id.to_string()));
                }
                params.push(("game_id".into(), game_id.to_string()));
                return params;
            }
            Action::Create => {
                if let Some(player_id) = subject.player_id {
                    params.push(("player_id".into(), player_id.to_string()));
                }
                return params;
            }
            _ => subject.push_params(&mut params),
        }

        match self {
            Action::State { kinds } => push_kinds(&mut params, kinds),
            Action::SetCard { card } | Action::Pick { card } | Action::Vote { card } => {
                params.push(("card".into(), card.to_string()));
            }
            Action::SetSentence { sentence } => {
                params.push(("sentence".into(), sentence.clone()));
            }
            Action::Invite { invited } => {
                for player_id in invited {
                    params.push(("invited_player_id".into(), player_id.to_string()));
                }
            }
            Action::SetCountdown { seconds } => {
                params.push(("duration".into(), seconds.to_string()));
            }
            Action::Message { text } => {
                params.push(("text".into(), text.clone()));
            }
            Action::Bot { enable } => {
                params.push(("enable".into(), enable.to_string()));
            }
            Action::Create
            | Action::Participate
            | Action::Voting
            | Action::Complete
            | Action::RemoveTab { .. } => {}
        }
        params
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Application-level error returned inside a well-formed response.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Error)]
#[error("service error {code}")]
pub struct ErrorEnvelope {
    pub code: String,
    #[serde(default)]
    pub data: Value,
}

/// Prefix of the codes the service uses when an action targets a phase the
/// game has already left.
pub const STALE_STATE_PREFIX: &str = "WRONG_STATE";

impl ErrorEnvelope {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            data: Value::Null,
        }
    }

    /// Whether the error means "you acted on an outdated view".
    pub fn is_stale_state(&self) -> bool {
        self.code.starts_with(STALE_STATE_PREFIX)
    }
}

/// Malformed responses. These are not retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),

    #[error("update item {index} has no `type` field")]
    MissingType { index: usize },

    #[error("update item {index} has an invalid `modified` field")]
    InvalidModified { index: usize },

    #[error("invalid `{kind}` payload: {message}")]
    InvalidPayload { kind: String, message: String },
}

/// One update item from a poll or state response.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateItem {
    /// Raw `type` tag as sent by the server.
    pub kind: String,
    pub modified: Option<u64>,
    /// The whole item object, `type` and `modified` included.
    pub body: Value,
}

impl UpdateItem {
    pub fn new(kind: UpdateKind, modified: Option<u64>, body: Value) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            modified,
            body,
        }
    }

    pub fn update_kind(&self) -> Option<UpdateKind> {
        UpdateKind::parse(&self.kind)
    }

    /// Deserialize the item body into a typed payload.
    pub fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        serde_json::from_value(self.body.clone()).map_err(|e| ProtocolError::InvalidPayload {
            kind: self.kind.clone(),
            message: e.to_string(),
        })
    }
}

/// Highest `modified` among `items`, if any item carries one.
pub fn max_modified(items: &[UpdateItem]) -> Option<u64> {
    items.iter().filter_map(|item| item.modified).max()
}

/// A decoded poll response.
#[derive(Debug, Clone, PartialEq)]
pub enum PollResponse {
    /// The server held the request until its own timeout; nothing new.
    Timeout,
    Updates(Vec<UpdateItem>),
    Error(ErrorEnvelope),
}

/// Decode a poll response body.
pub fn parse_poll_response(value: Value) -> Result<PollResponse, ProtocolError> {
    if let Some(envelope) = error_envelope(&value)? {
        return Ok(PollResponse::Error(envelope));
    }
    if value.get("timeout").is_some() {
        return Ok(PollResponse::Timeout);
    }
    parse_update_items(value).map(PollResponse::Updates)
}

/// Decode an array of update items (poll data or `state` action result).
pub fn parse_update_items(value: Value) -> Result<Vec<UpdateItem>, ProtocolError> {
    let Value::Array(entries) = value else {
        return Err(ProtocolError::UnexpectedShape(describe(&value)));
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, body)| {
            let kind = body
                .get("type")
                .and_then(Value::as_str)
                .ok_or(ProtocolError::MissingType { index })?
                .to_string();
            let modified = match body.get("modified") {
                None | Some(Value::Null) => None,
                Some(raw) => Some(
                    raw.as_u64()
                        .ok_or(ProtocolError::InvalidModified { index })?,
                ),
            };
            Ok(UpdateItem {
                kind,
                modified,
                body,
            })
        })
        .collect()
}

/// Check an action response for the error envelope and hand back the body.
pub fn check_action_response(value: Value) -> Result<Value, ActionFailure> {
    match error_envelope(&value) {
        Ok(Some(envelope)) => Err(ActionFailure::Service(envelope)),
        Ok(None) => Ok(value),
        Err(e) => Err(ActionFailure::Protocol(e)),
    }
}

/// Why an action response was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionFailure {
    #[error(transparent)]
    Service(ErrorEnvelope),
    #[error(transparent)]
    Protocol(ProtocolError),
}

fn error_envelope(value: &Value) -> Result<Option<ErrorEnvelope>, ProtocolError> {
    let Some(raw) = value.get("error") else {
        return Ok(None);
    };
    // Some server paths send a bare code string instead of an object.
    if let Some(code) = raw.as_str() {
        return Ok(Some(ErrorEnvelope::new(code)));
    }
    serde_json::from_value(raw.clone())
        .map(Some)
        .map_err(|e| ProtocolError::UnexpectedShape(format!("error envelope: {e}")))
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(_) => "boolean".into(),
        Value::Number(_) => "number".into(),
        Value::String(_) => "string".into(),
        Value::Array(_) => "array".into(),
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
