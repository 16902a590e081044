use std::{fs::File, io::BufReader, path::Path};

use indexmap::IndexMap;
use uuid::Uuid;

use crate::foundation::core::{BoundingBox, FixtureId, ObjectId, Point};
use crate::foundation::error::{SceneError, SceneResult};
use crate::scene::containment::settle_hidden;

/// Static description of one task's scene. Loaded once and shared read-only by every state.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    /// Pre-rendered backgrounds keyed by the canonical fixture-state key
    /// (see [`crate::scene::background::fixtures_key`]).
    #[serde(default)]
    pub backgrounds: IndexMap<String, String>,
    #[serde(default)]
    pub fixtures: IndexMap<FixtureId, Fixture>,
    #[serde(default)]
    pub objects: IndexMap<ObjectId, SceneObject>,
    /// Suggested drop targets per object. Advisory only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub possible_manipulations: Option<Vec<PossibleManipulation>>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub possible_states: Vec<String>,
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneObject {
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub is_receptacle: bool,
    pub bounding_box: BoundingBox,
    pub width: f64,
    pub height: f64,
    /// Image reference (path, URL, or `data:` URL). Empty once stripped for transmission.
    #[serde(default)]
    pub image: String,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PossibleManipulation {
    pub unique_name: ObjectId,
    /// Fixture or object ids the object may be placed onto.
    pub places: Vec<String>,
}

/// Position of one object in one state.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ObjectPlacement {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

impl ObjectPlacement {
    /// Visible placement at (`x`, `y`).
    pub fn at(x: f64, y: f64) -> Self {
        Self { x, y, hidden: None }
    }

    /// Position as a point.
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// `true` only when the flag is explicitly set.
    pub fn is_hidden(&self) -> bool {
        self.hidden.unwrap_or(false)
    }
}

/// One snapshot on the timeline.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentState {
    /// Current discrete value per fixture, in insertion order. The order feeds the
    /// background key and must be preserved.
    #[serde(default)]
    pub fixtures: IndexMap<FixtureId, String>,
    /// Paint order; later entries draw on top.
    #[serde(default)]
    pub object_order: Vec<ObjectId>,
    #[serde(default)]
    pub objects: IndexMap<ObjectId, ObjectPlacement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Identity stamp assigned when a state is re-inserted by a branch.
    #[serde(rename = "image_id", default, skip_serializing_if = "Option::is_none")]
    pub stamp: Option<Uuid>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_autocomplete: bool,
}

impl EnvironmentState {
    /// Position of object `id`, if it has one.
    pub fn placement(&self, id: &str) -> Option<&ObjectPlacement> {
        self.objects.get(id)
    }

    /// Current value of fixture `id`.
    pub fn fixture_state(&self, id: &str) -> Option<&str> {
        self.fixtures.get(id).map(String::as_str)
    }

    /// Ids listed in `objectOrder` that have no position (not renderable).
    pub fn unplaced_ids(&self) -> Vec<&ObjectId> {
        self.object_order
            .iter()
            .filter(|id| !self.objects.contains_key(id.as_str()))
            .collect()
    }

    /// Same state with a fresh identity stamp.
    pub fn restamped(&self) -> Self {
        Self {
            stamp: Some(Uuid::new_v4()),
            ..self.clone()
        }
    }
}

impl Environment {
    /// Fixture definition by id.
    pub fn fixture(&self, id: &str) -> Option<&Fixture> {
        self.fixtures.get(id)
    }

    /// Object definition by id.
    pub fn object(&self, id: &str) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    /// Suggested targets for `object`; empty when none are listed.
    pub fn places_for(&self, object: &str) -> &[String] {
        self.possible_manipulations
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|m| m.unique_name == *object)
            .map(|m| m.places.as_slice())
            .unwrap_or_default()
    }

    /// Fixture and object ids referenced by `state` that this environment does not know.
    pub fn unknown_ids(&self, state: &EnvironmentState) -> Vec<String> {
        let fixtures = state
            .fixtures
            .keys()
            .filter(|id| !self.fixtures.contains_key(id.as_str()))
            .map(|id| id.to_string());
        let objects = state
            .objects
            .keys()
            .filter(|id| !self.objects.contains_key(id.as_str()))
            .map(|id| id.to_string());
        fixtures.chain(objects).collect()
    }

    /// Position that drops `object` onto `place`.
    ///
    /// Onto an object: the two are centered on each other. Onto a fixture: the object is
    /// centered on the fixture's bounding-box center. The hidden flag is dropped unless the new
    /// position is still inside a closed fixture. `None` when any lookup misses.
    pub fn placement_on(
        &self,
        state: &EnvironmentState,
        object: &str,
        place: &str,
    ) -> Option<ObjectPlacement> {
        let moving = self.object(object)?;
        let current = state.placement(object)?;

        let (x, y) = if let (Some(target), Some(target_pos)) =
            (self.object(place), state.placement(place))
        {
            (
                target_pos.x + (target.width - moving.width) / 2.0,
                target_pos.y + (target.height - moving.height) / 2.0,
            )
        } else {
            let center = self.fixture(place)?.bounding_box.center();
            (center.x - moving.width / 2.0, center.y - moving.height / 2.0)
        };

        Some(settle_hidden(self, state, ObjectPlacement { x, y, ..*current }))
    }
}

/// An environment plus its ordered states, as exchanged with the service and exported.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvAndEnvStates {
    pub env: Environment,
    #[serde(default)]
    pub env_states: Vec<EnvironmentState>,
    /// Canvas overrides carried by some task bundles.
    #[serde(
        rename = "HIGHEST_WIDTH",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub highest_width: Option<u32>,
    #[serde(
        rename = "HIGHEST_HEIGHT",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub highest_height: Option<u32>,
}

/// Top-level `{ "envAndEnvStates": ... }` document.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TaskBundle {
    #[serde(rename = "envAndEnvStates")]
    pub env_and_env_states: EnvAndEnvStates,
}

impl TaskBundle {
    /// Bundle without canvas overrides.
    pub fn new(env: Environment, env_states: Vec<EnvironmentState>) -> Self {
        Self {
            env_and_env_states: EnvAndEnvStates {
                env,
                env_states,
                ..EnvAndEnvStates::default()
            },
        }
    }

    /// Parse a bundle from JSON.
    pub fn from_reader<R: std::io::Read>(r: R) -> SceneResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| SceneError::validation(format!("parse task bundle JSON: {e}")))
    }

    /// Read and parse a bundle file.
    pub fn from_path(path: impl AsRef<Path>) -> SceneResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            SceneError::validation(format!("open task bundle '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Pretty-printed JSON, the export format.
    pub fn to_json_pretty(&self) -> SceneResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The shared environment.
    pub fn env(&self) -> &Environment {
        &self.env_and_env_states.env
    }

    /// States in timeline order.
    pub fn states(&self) -> &[EnvironmentState] {
        &self.env_and_env_states.env_states
    }

    /// Split into environment and states, dropping canvas overrides.
    pub fn into_parts(self) -> (Environment, Vec<EnvironmentState>) {
        (self.env_and_env_states.env, self.env_and_env_states.env_states)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
