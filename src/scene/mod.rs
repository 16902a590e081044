//! Scene data model and the pure resolvers derived from it.

/// Background lookup keyed by the fixture-state vector.
pub mod background;
/// Closed-fixture occlusion.
pub mod containment;
/// Environment, environment state, and task bundle types.
pub mod model;
