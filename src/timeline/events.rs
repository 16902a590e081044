use crate::foundation::core::{FixtureId, ObjectId};
use crate::scene::model::{EnvironmentState, ObjectPlacement};

/// What caused a state to be created or updated.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EditAction {
    ObjectMoved {
        object_name: ObjectId,
        old_position: ObjectPlacement,
        new_position: ObjectPlacement,
        distance: f64,
    },
    FixtureClick {
        fixture_name: FixtureId,
        fixture_type: String,
        old_fixture_state: String,
        new_fixture_state: String,
    },
    Instruction,
    CaptionRegenerated,
    AutocompleteAccepted,
}

/// Record of one accepted timeline mutation, shaped for the experiment log.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TimelineEvent {
    NewEnvStateCreated {
        action: EditAction,
        index: usize,
        new_env_state: EnvironmentState,
    },
    CurrentEnvStateUpdated {
        action: EditAction,
        index: usize,
        new_env_state: EnvironmentState,
    },
    StepCopied {
        index: usize,
        copied_env_state: EnvironmentState,
    },
    StepDeleted {
        index: usize,
        deleted_env_state: EnvironmentState,
    },
    ObjectMovedToFront {
        object: ObjectId,
        old_order: Vec<ObjectId>,
        new_order: Vec<ObjectId>,
    },
    CaptionEdited {
        index: usize,
        caption: String,
    },
    StepSelected {
        selected_index: Option<usize>,
    },
}

impl TimelineEvent {
    /// The `type` tag as written to the log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewEnvStateCreated { .. } => "newEnvStateCreated",
            Self::CurrentEnvStateUpdated { .. } => "currentEnvStateUpdated",
            Self::StepCopied { .. } => "stepCopied",
            Self::StepDeleted { .. } => "stepDeleted",
            Self::ObjectMovedToFront { .. } => "objectMovedToFront",
            Self::CaptionEdited { .. } => "captionEdited",
            Self::StepSelected { .. } => "stepSelected",
        }
    }
}
