//! Sceneline records how people edit a kitchen scene step by step.
//!
//! A task is an [`Environment`] (fixtures, movable objects, pre-rendered backgrounds) and a
//! [`Timeline`] of [`EnvironmentState`]s. Users drag objects, toggle fixtures, and type
//! instructions; each edit branches or amends the timeline. The crate provides:
//!
//! - The data model and the background/containment resolvers ([`scene`])
//! - The timeline and its edit rules ([`timeline`])
//! - A client for the remote generation service ([`remote`])
//! - A CPU compositor that turns a state into an image ([`render`])
//! - A [`TaskSession`] tying them together
#![forbid(unsafe_code)]

mod foundation;

/// Remote generation service and task host clients.
pub mod remote;
/// State compositing.
pub mod render;
/// Scene data model.
pub mod scene;
/// Task session orchestration.
pub mod session;
/// Timeline of states and its edit operations.
pub mod timeline;

pub use crate::foundation::config::{CanvasDimensions, CanvasObserver, SessionConfig};
pub use crate::foundation::core::{BoundingBox, Canvas, FixtureId, ObjectId, Point, Vec2};
pub use crate::foundation::error::{SceneError, SceneResult};

pub use crate::remote::{GenerationService, HttpGenerationClient, HttpTaskSource, TaskSource};
pub use crate::render::{ImageSource, InMemoryImageSource, LocalImageSource};
pub use crate::scene::background::{fixtures_key, resolve_background};
pub use crate::scene::containment::{is_object_visible, is_within_closed_fixture};
pub use crate::scene::model::{
    EnvAndEnvStates, Environment, EnvironmentState, Fixture, ObjectPlacement, PossibleManipulation,
    SceneObject, TaskBundle,
};
pub use crate::session::{SessionServices, TaskSession};
pub use crate::timeline::events::{EditAction, TimelineEvent};
pub use crate::timeline::{CaptionJob, Timeline, TimelineOptions};
