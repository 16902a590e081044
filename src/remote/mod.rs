//! Talking to the generation service and the task host.

pub mod client;
pub mod response;
pub mod strip;
pub mod tasks;

pub use client::{GenerationService, HttpGenerationClient};
pub use response::{GenerationResponse, classify_response};
pub use strip::{ImageMap, StrippedEnvironment, restore_image_data, strip_image_data};
pub use tasks::{HttpTaskSource, TaskSource};
