use serde_json::Value;

use crate::foundation::error::{SceneError, SceneResult};
use crate::scene::model::EnvironmentState;

/// Keys that make a JSON object an environment state. Extra keys are allowed.
const STATE_KEYS: [&str; 3] = ["fixtures", "objectOrder", "objects"];

/// A validated answer from the generation service.
#[derive(Clone, Debug, PartialEq)]
pub enum GenerationResponse {
    State(EnvironmentState),
    States(Vec<EnvironmentState>),
    Text(String),
}

fn looks_like_state(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| STATE_KEYS.iter().all(|k| map.contains_key(*k)))
}

fn parse_state(value: Value) -> SceneResult<EnvironmentState> {
    serde_json::from_value(value)
        .map_err(|e| SceneError::protocol(format!("malformed environment state: {e}")))
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Discriminate a response body: a string is a caption, a state-shaped object is a state, an
/// array of state-shaped objects is a state list. Anything else is a protocol error.
pub fn classify_response(value: Value) -> SceneResult<GenerationResponse> {
    match value {
        Value::String(text) => Ok(GenerationResponse::Text(text)),
        v if looks_like_state(&v) => parse_state(v).map(GenerationResponse::State),
        Value::Array(items) if items.iter().all(looks_like_state) => items
            .into_iter()
            .map(parse_state)
            .collect::<SceneResult<Vec<_>>>()
            .map(GenerationResponse::States),
        other => Err(SceneError::protocol(format!(
            "unexpected response format: {}",
            describe(&other)
        ))),
    }
}

impl GenerationResponse {
    fn kind(&self) -> &'static str {
        match self {
            Self::State(_) => "a state",
            Self::States(_) => "a state list",
            Self::Text(_) => "a caption",
        }
    }

    /// The single state, or a protocol error for any other shape.
    pub fn into_state(self) -> SceneResult<EnvironmentState> {
        match self {
            Self::State(state) => Ok(state),
            other => Err(SceneError::protocol(format!(
                "expected a state, got {}",
                other.kind()
            ))),
        }
    }

    /// The state list, or a protocol error for any other shape.
    pub fn into_states(self) -> SceneResult<Vec<EnvironmentState>> {
        match self {
            Self::States(states) => Ok(states),
            other => Err(SceneError::protocol(format!(
                "expected a state list, got {}",
                other.kind()
            ))),
        }
    }

    /// The caption text, or a protocol error for any other shape.
    pub fn into_text(self) -> SceneResult<String> {
        match self {
            Self::Text(text) => Ok(text),
            other => Err(SceneError::protocol(format!(
                "expected a caption, got {}",
                other.kind()
            ))),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/remote/response.rs"]
mod tests;
