//! Pure timeline operations: `(states, selection, payload) -> (states, selection)`.
//!
//! Nothing here mutates its input. [`crate::timeline::Timeline`] owns the sequence and is the
//! only caller that commits the results.

use indexmap::IndexMap;

use crate::foundation::core::{FixtureId, ObjectId, Point, capitalize_first};
use crate::foundation::error::{SceneError, SceneResult};
use crate::scene::containment::{CLOSED, settle_hidden};
use crate::scene::model::{Environment, EnvironmentState, ObjectPlacement};

/// Fixture value meaning "active".
pub const ON: &str = "on";
/// Fixtures whose id starts with this share the single-active-burner rule.
pub const STOVE_PREFIX: &str = "stove";
/// Displacement a drag must exceed to count as a move.
pub const DEFAULT_MOVE_THRESHOLD: f64 = 5.0;

/// A new sequence and the selection that goes with it.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub states: Vec<EnvironmentState>,
    pub selected: Option<usize>,
}

/// Whether an edit grew the sequence or replaced the selected state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditMode {
    Branch,
    Amend,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FixtureToggle {
    pub transition: Transition,
    pub fixture: FixtureId,
    pub category: String,
    pub from: String,
    pub to: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DragCommit {
    pub transition: Transition,
    pub mode: EditMode,
    pub object: ObjectId,
    pub from: ObjectPlacement,
    pub to: ObjectPlacement,
    pub distance: f64,
    /// Index of the state that now carries the new positions.
    pub index: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Reorder {
    pub states: Vec<EnvironmentState>,
    pub old_order: Vec<ObjectId>,
    pub new_order: Vec<ObjectId>,
}

fn out_of_range(index: usize, len: usize) -> SceneError {
    SceneError::invariant(format!(
        "state index {index} out of range (timeline has {len} states)"
    ))
}

/// Flip `fixture` on the last state and append the result.
///
/// `Ok(None)` when the toggle cannot be resolved (fixture absent from the last state or the
/// environment, or no alternative value); that is logged and ignored.
pub fn toggle_fixture(
    env: &Environment,
    states: &[EnvironmentState],
    fixture: &str,
) -> SceneResult<Option<FixtureToggle>> {
    let Some(last) = states.last() else {
        return Err(SceneError::invariant(
            "cannot toggle a fixture on an empty timeline",
        ));
    };
    let Some(current) = last.fixture_state(fixture) else {
        tracing::warn!(fixture, "fixture not found in current state");
        return Ok(None);
    };
    let Some(def) = env.fixture(fixture) else {
        tracing::warn!(fixture, "possible states for fixture not found");
        return Ok(None);
    };
    let Some(next) = def.possible_states.iter().find(|s| s.as_str() != current) else {
        tracing::warn!(fixture, current, "no other state found for fixture");
        return Ok(None);
    };

    if next == ON {
        let active = last.fixtures.iter().find(|(id, value)| {
            id.as_str() != fixture && id.as_str().starts_with(STOVE_PREFIX) && value.as_str() == ON
        });
        if let Some((other, _)) = active {
            return Err(SceneError::rejected(format!(
                "'{other}' is already on; turn it off before switching '{fixture}' on"
            )));
        }
    }

    let hide = next == CLOSED;
    let mut updated = last.clone();
    updated.is_autocomplete = false;
    updated
        .fixtures
        .insert(FixtureId::new(fixture), next.clone());
    for placement in updated.objects.values_mut() {
        if def.bounding_box.contains(placement.point()) {
            placement.hidden = Some(hide);
        }
    }
    updated.caption = Some(format!("{} {next}.", capitalize_first(fixture)));

    let mut next_states = states.to_vec();
    next_states.push(updated);
    let selected = Some(next_states.len() - 1);

    Ok(Some(FixtureToggle {
        transition: Transition {
            states: next_states,
            selected,
        },
        fixture: FixtureId::new(fixture),
        category: def.category.clone(),
        from: current.to_string(),
        to: next.clone(),
    }))
}

/// Apply new object positions to the selected state.
///
/// The first entry of `positions` displaced by more than `threshold` decides the edit; if
/// there is none the edit is a no-op (`Ok(None)`). A move of a different object than
/// `last_moved`, or any move on state 0, branches; a repeat move of the same object amends
/// the selected state in place. Either way the edited state loses its caption.
pub fn commit_positions(
    states: &[EnvironmentState],
    selected: usize,
    positions: &IndexMap<ObjectId, ObjectPlacement>,
    last_moved: Option<&ObjectId>,
    threshold: f64,
) -> SceneResult<Option<DragCommit>> {
    let current = states
        .get(selected)
        .ok_or_else(|| out_of_range(selected, states.len()))?;

    if let Some(unknown) = positions
        .keys()
        .find(|id| !current.objects.contains_key(id.as_str()))
    {
        return Err(SceneError::invariant(format!(
            "object '{unknown}' has no position in state {selected}"
        )));
    }

    let changed = positions.iter().find_map(|(id, to)| {
        let from = current.objects.get(id.as_str())?;
        let distance = (to.point() - from.point()).hypot();
        (distance > threshold).then(|| (id.clone(), *from, *to, distance))
    });
    let Some((object, from, to, distance)) = changed else {
        tracing::debug!(selected, "no object moved past threshold");
        return Ok(None);
    };

    let mut updated = current.clone();
    updated.caption = None;
    for (id, placement) in positions {
        updated.objects.insert(id.clone(), *placement);
    }

    let branch = selected == 0 || last_moved != Some(&object);
    let (next_states, index, mode) = if branch {
        let mut next = Vec::with_capacity(states.len() + 1);
        next.extend_from_slice(&states[..selected]);
        next.push(current.restamped());
        next.push(updated);
        next.extend_from_slice(&states[selected + 1..]);
        (next, selected + 1, EditMode::Branch)
    } else {
        let mut next = states.to_vec();
        next[selected] = updated;
        (next, selected, EditMode::Amend)
    };

    Ok(Some(DragCommit {
        transition: Transition {
            states: next_states,
            selected: Some(index),
        },
        mode,
        object,
        from,
        to,
        distance,
        index,
    }))
}

/// Single-object drag: `object` dropped at `to` on the selected state. An object dragged out
/// of every closed fixture loses its hidden flag.
pub fn drag_object(
    env: &Environment,
    states: &[EnvironmentState],
    selected: usize,
    object: &str,
    to: Point,
    last_moved: Option<&ObjectId>,
    threshold: f64,
) -> SceneResult<Option<DragCommit>> {
    let current = states
        .get(selected)
        .ok_or_else(|| out_of_range(selected, states.len()))?;
    let placement = current.placement(object).ok_or_else(|| {
        SceneError::invariant(format!("object '{object}' not found in state {selected}"))
    })?;

    let mut positions = IndexMap::with_capacity(1);
    positions.insert(
        ObjectId::new(object),
        settle_hidden(
            env,
            current,
            ObjectPlacement {
                x: to.x,
                y: to.y,
                ..*placement
            },
        ),
    );
    commit_positions(states, selected, &positions, last_moved, threshold)
}

/// Copy the state at `index` right after itself and select the copy.
pub fn duplicate_step(states: &[EnvironmentState], index: usize) -> SceneResult<Transition> {
    let original = states
        .get(index)
        .ok_or_else(|| out_of_range(index, states.len()))?;
    let mut next = states.to_vec();
    next.insert(index + 1, original.clone());
    Ok(Transition {
        states: next,
        selected: Some(index + 1),
    })
}

/// Remove the state at `index` and clear the selection.
///
/// Index 0 is not protected here; callers keep the initial state.
pub fn delete_step(states: &[EnvironmentState], index: usize) -> SceneResult<Transition> {
    if index >= states.len() {
        return Err(out_of_range(index, states.len()));
    }
    let mut next = states.to_vec();
    next.remove(index);
    Ok(Transition {
        states: next,
        selected: None,
    })
}

/// Insert `state` directly after `after` and select it.
pub fn insert_after(
    states: &[EnvironmentState],
    after: usize,
    state: EnvironmentState,
) -> SceneResult<Transition> {
    if after >= states.len() {
        return Err(out_of_range(after, states.len()));
    }
    let mut next = states.to_vec();
    next.insert(after + 1, state);
    Ok(Transition {
        states: next,
        selected: Some(after + 1),
    })
}

/// Append `state` at the end and select it.
pub fn append_step(states: &[EnvironmentState], state: EnvironmentState) -> Transition {
    let mut next = states.to_vec();
    next.push(state);
    let selected = Some(next.len() - 1);
    Transition {
        states: next,
        selected,
    }
}

/// Replace the state at `index` without changing the length.
pub fn replace_step(
    states: &[EnvironmentState],
    index: usize,
    state: EnvironmentState,
) -> SceneResult<Vec<EnvironmentState>> {
    if index >= states.len() {
        return Err(out_of_range(index, states.len()));
    }
    let mut next = states.to_vec();
    next[index] = state;
    Ok(next)
}

/// Set the caption of the state at `index` in place.
pub fn set_caption(
    states: &[EnvironmentState],
    index: usize,
    caption: &str,
) -> SceneResult<Vec<EnvironmentState>> {
    let mut state = states
        .get(index)
        .ok_or_else(|| out_of_range(index, states.len()))?
        .clone();
    state.caption = Some(caption.to_string());
    replace_step(states, index, state)
}

/// Move `object` to the top of the paint order of the last state, in place.
pub fn bring_to_front(states: &[EnvironmentState], object: &str) -> SceneResult<Reorder> {
    let Some(last) = states.last() else {
        return Err(SceneError::invariant("cannot reorder an empty timeline"));
    };
    if !last.objects.contains_key(object) {
        return Err(SceneError::invariant(format!(
            "object '{object}' not found in the last state"
        )));
    }

    let old_order = last.object_order.clone();
    let mut new_order: Vec<ObjectId> = old_order
        .iter()
        .filter(|id| id.as_str() != object)
        .cloned()
        .collect();
    new_order.push(ObjectId::new(object));

    let mut updated = last.clone();
    updated.object_order = new_order.clone();
    let mut next = states.to_vec();
    let last_index = next.len() - 1;
    next[last_index] = updated;

    Ok(Reorder {
        states: next,
        old_order,
        new_order,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/transitions.rs"]
mod tests;
