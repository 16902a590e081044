//! The branching sequence of scene states and the operations that edit it.

pub mod autocomplete;
pub mod caption_queue;
pub mod events;
/// [`Timeline`]: sequence, selection, hover, last-moved object, caption queue.
pub mod state;
/// Pure `(states, selection, payload)` transformations.
pub mod transitions;

pub use state::{CaptionJob, Timeline, TimelineOptions};
