use crate::foundation::core::Point;
use crate::scene::model::{Environment, EnvironmentState, ObjectPlacement};

/// Fixture state value that occludes whatever lies inside the fixture.
pub const CLOSED: &str = "closed";

/// `true` if `point` lies inside (edges included) any fixture currently `"closed"`.
pub fn is_within_closed_fixture(point: Point, env: &Environment, state: &EnvironmentState) -> bool {
    env.fixtures.iter().any(|(id, fixture)| {
        state.fixture_state(id.as_str()) == Some(CLOSED) && fixture.bounding_box.contains(point)
    })
}

/// Whether `object` would be drawn in `state`: it has a position, is not flagged hidden, and
/// is not enclosed by a closed fixture.
pub fn is_object_visible(env: &Environment, state: &EnvironmentState, object: &str) -> bool {
    match state.placement(object) {
        Some(p) => !p.is_hidden() && !is_within_closed_fixture(p.point(), env, state),
        None => false,
    }
}

/// `placement` after a move: the hidden flag survives only while the object still lies inside
/// a closed fixture.
pub fn settle_hidden(
    env: &Environment,
    state: &EnvironmentState,
    mut placement: ObjectPlacement,
) -> ObjectPlacement {
    if !is_within_closed_fixture(placement.point(), env, state) {
        placement.hidden = None;
    }
    placement
}

#[cfg(test)]
#[path = "../../tests/unit/scene/containment.rs"]
mod tests;
