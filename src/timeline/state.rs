use std::sync::Arc;

use indexmap::IndexMap;

use crate::foundation::config::SessionConfig;
use crate::foundation::core::{ObjectId, Point};
use crate::foundation::error::{SceneError, SceneResult};
use crate::scene::model::{Environment, EnvironmentState, ObjectPlacement, TaskBundle};
use crate::timeline::autocomplete::AutocompleteBuffer;
use crate::timeline::caption_queue::CaptionQueue;
use crate::timeline::events::{EditAction, TimelineEvent};
use crate::timeline::transitions::{self, DragCommit, EditMode, Transition};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimelineOptions {
    /// Queue recaptioning after drags.
    pub captioning: bool,
    pub move_threshold: f64,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            captioning: false,
            move_threshold: transitions::DEFAULT_MOVE_THRESHOLD,
        }
    }
}

impl From<&SessionConfig> for TimelineOptions {
    fn from(cfg: &SessionConfig) -> Self {
        Self {
            captioning: cfg.captioning_enabled(),
            move_threshold: cfg.move_threshold,
        }
    }
}

/// Inputs for one caption request, captured when the request is started.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptionJob {
    pub index: usize,
    pub previous: Option<EnvironmentState>,
    pub current: EnvironmentState,
}

impl CaptionJob {
    /// `[previous?, current]`, the state list sent with a caption request.
    pub fn states(&self) -> Vec<EnvironmentState> {
        self.previous
            .iter()
            .chain(std::iter::once(&self.current))
            .cloned()
            .collect()
    }
}

/// The ordered states of one task plus the editing cursor around them.
///
/// Every mutation goes through one of the methods below, which delegate to the pure functions
/// in [`transitions`] and commit their result. A timeline starts with at least one state;
/// [`Timeline::delete_step`] can empty it.
#[derive(Debug)]
pub struct Timeline {
    env: Arc<Environment>,
    states: Vec<EnvironmentState>,
    selected: Option<usize>,
    hovered: Option<usize>,
    last_moved: Option<ObjectId>,
    captions: CaptionQueue,
    autocomplete: AutocompleteBuffer,
    options: TimelineOptions,
    /// `HIGHEST_WIDTH` / `HIGHEST_HEIGHT` carried by the loaded bundle, written back on export.
    canvas_hint: (Option<u32>, Option<u32>),
}

impl Timeline {
    /// Timeline over `states`, nothing selected. Fails when `states` is empty.
    pub fn new(
        env: impl Into<Arc<Environment>>,
        states: Vec<EnvironmentState>,
        options: TimelineOptions,
    ) -> SceneResult<Self> {
        if states.is_empty() {
            return Err(SceneError::validation(
                "a timeline needs at least the initial state",
            ));
        }
        let env = env.into();
        for (index, state) in states.iter().enumerate() {
            let unknown = env.unknown_ids(state);
            if !unknown.is_empty() {
                tracing::warn!(index, ?unknown, "state references ids missing from the environment");
            }
            let unplaced = state.unplaced_ids();
            if !unplaced.is_empty() {
                tracing::warn!(index, ?unplaced, "objectOrder lists objects without a position");
            }
        }
        Ok(Self {
            env,
            states,
            selected: None,
            hovered: None,
            last_moved: None,
            captions: CaptionQueue::new(),
            autocomplete: AutocompleteBuffer::new(),
            options,
            canvas_hint: (None, None),
        })
    }

    /// Timeline over a loaded bundle; its canvas overrides are kept for [`Timeline::to_bundle`].
    pub fn from_bundle(bundle: TaskBundle, options: TimelineOptions) -> SceneResult<Self> {
        let payload = &bundle.env_and_env_states;
        let canvas_hint = (payload.highest_width, payload.highest_height);
        let (env, states) = bundle.into_parts();
        let mut timeline = Self::new(env, states, options)?;
        timeline.canvas_hint = canvas_hint;
        Ok(timeline)
    }

    /// The environment every state refers to.
    pub fn env(&self) -> &Arc<Environment> {
        &self.env
    }

    /// All states in order.
    pub fn states(&self) -> &[EnvironmentState] {
        &self.states
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// `true` once every state has been deleted.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// State at `index`.
    pub fn state(&self, index: usize) -> Option<&EnvironmentState> {
        self.states.get(index)
    }

    /// Selected index.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Selected state.
    pub fn selected_state(&self) -> Option<&EnvironmentState> {
        self.selected.and_then(|i| self.states.get(i))
    }

    /// Hovered index.
    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Object moved by the last drag, until another edit resets it.
    pub fn last_moved(&self) -> Option<&ObjectId> {
        self.last_moved.as_ref()
    }

    /// Options the timeline was built with.
    pub fn options(&self) -> TimelineOptions {
        self.options
    }

    /// Recaptioning queue.
    pub fn captions(&self) -> &CaptionQueue {
        &self.captions
    }

    /// Pending autocomplete candidates.
    pub fn autocomplete(&self) -> &AutocompleteBuffer {
        &self.autocomplete
    }

    /// Snapshot for export, including any canvas overrides the bundle was loaded with.
    pub fn to_bundle(&self) -> TaskBundle {
        let mut bundle = TaskBundle::new(self.env.as_ref().clone(), self.states.clone());
        let (width, height) = self.canvas_hint;
        bundle.env_and_env_states.highest_width = width;
        bundle.env_and_env_states.highest_height = height;
        bundle
    }

    fn check_index(&self, index: usize) -> SceneResult<()> {
        if index < self.states.len() {
            Ok(())
        } else {
            Err(SceneError::invariant(format!(
                "state index {index} out of range (timeline has {} states)",
                self.states.len()
            )))
        }
    }

    fn require_selection(&self) -> SceneResult<usize> {
        self.selected
            .ok_or_else(|| SceneError::invariant("no state is selected"))
    }

    fn commit(&mut self, transition: Transition) {
        self.states = transition.states;
        self.selected = transition.selected;
        self.hovered = self.hovered.filter(|&h| h < self.states.len());
    }

    /// Change the selection. `None` when nothing changed.
    pub fn select(&mut self, index: Option<usize>) -> SceneResult<Option<TimelineEvent>> {
        if let Some(i) = index {
            self.check_index(i)?;
        }
        if index == self.selected {
            return Ok(None);
        }
        self.selected = index;
        Ok(Some(TimelineEvent::StepSelected {
            selected_index: index,
        }))
    }

    /// Hover over a state for preview. Out-of-range indices clear the hover.
    pub fn hover(&mut self, index: Option<usize>) {
        self.hovered = index.filter(|&i| i < self.states.len());
    }

    /// `(earlier, later)` of the hovered and selected states, for a transition preview.
    pub fn preview_pair(&self) -> Option<(&EnvironmentState, &EnvironmentState)> {
        let (a, b) = (self.hovered?, self.selected?);
        let (earlier, later) = (a.min(b), a.max(b));
        Some((self.states.get(earlier)?, self.states.get(later)?))
    }

    /// Flip a fixture on the last state and append the result.
    ///
    /// A rejection leaves the timeline untouched and is returned as [`SceneError::Rejected`].
    pub fn toggle_fixture(&mut self, fixture: &str) -> SceneResult<Option<TimelineEvent>> {
        let toggle = match transitions::toggle_fixture(&self.env, &self.states, fixture) {
            Ok(Some(toggle)) => toggle,
            Ok(None) => return Ok(None),
            Err(e) => {
                if e.is_rejection() {
                    tracing::warn!(fixture, error = %e, "fixture toggle rejected");
                }
                return Err(e);
            }
        };

        self.commit(toggle.transition);
        self.last_moved = None;
        let index = self.states.len() - 1;
        tracing::info!(
            fixture,
            from = %toggle.from,
            to = %toggle.to,
            index,
            "fixture toggled"
        );
        Ok(Some(TimelineEvent::NewEnvStateCreated {
            action: EditAction::FixtureClick {
                fixture_name: toggle.fixture,
                fixture_type: toggle.category,
                old_fixture_state: toggle.from,
                new_fixture_state: toggle.to,
            },
            index,
            new_env_state: self.states[index].clone(),
        }))
    }

    /// Drop `object` at `to` on the selected state.
    pub fn drag_object(&mut self, object: &str, to: Point) -> SceneResult<Option<TimelineEvent>> {
        let selected = self.require_selection()?;
        let commit = transitions::drag_object(
            &self.env,
            &self.states,
            selected,
            object,
            to,
            self.last_moved.as_ref(),
            self.options.move_threshold,
        )?;
        Ok(commit.map(|c| self.apply_drag(c)))
    }

    /// Apply an updated position map to the selected state.
    pub fn commit_positions(
        &mut self,
        positions: &IndexMap<ObjectId, ObjectPlacement>,
    ) -> SceneResult<Option<TimelineEvent>> {
        let selected = self.require_selection()?;
        let commit = transitions::commit_positions(
            &self.states,
            selected,
            positions,
            self.last_moved.as_ref(),
            self.options.move_threshold,
        )?;
        Ok(commit.map(|c| self.apply_drag(c)))
    }

    /// Move `object` onto one of its suggested places (an object or fixture id).
    pub fn move_to_place(&mut self, object: &str, place: &str) -> SceneResult<Option<TimelineEvent>> {
        let selected = self.require_selection()?;
        let Some(placement) = self
            .env
            .placement_on(&self.states[selected], object, place)
        else {
            tracing::warn!(object, place, "cannot resolve drop position");
            return Ok(None);
        };
        self.drag_object(object, placement.point())
    }

    fn apply_drag(&mut self, commit: DragCommit) -> TimelineEvent {
        let DragCommit {
            transition,
            mode,
            object,
            from,
            to,
            distance,
            index,
        } = commit;

        self.commit(transition);
        self.last_moved = Some(object.clone());
        if self.options.captioning {
            self.captions.push(index);
        }
        tracing::info!(object = %object, distance, index, ?mode, "object moved");

        let action = EditAction::ObjectMoved {
            object_name: object,
            old_position: from,
            new_position: to,
            distance,
        };
        let new_env_state = self.states[index].clone();
        match mode {
            EditMode::Branch => TimelineEvent::NewEnvStateCreated {
                action,
                index,
                new_env_state,
            },
            EditMode::Amend => TimelineEvent::CurrentEnvStateUpdated {
                action,
                index,
                new_env_state,
            },
        }
    }

    /// Copy the step at `index` right after itself and select the copy.
    pub fn duplicate_step(&mut self, index: usize) -> SceneResult<TimelineEvent> {
        let transition = transitions::duplicate_step(&self.states, index)?;
        self.commit(transition);
        self.last_moved = None;
        tracing::info!(index, "step copied");
        Ok(TimelineEvent::StepCopied {
            index,
            copied_env_state: self.states[index].clone(),
        })
    }

    /// Remove the step at `index` and clear the selection.
    ///
    /// Any index is accepted, including 0; keeping the initial state is up to the caller (see
    /// [`crate::session::TaskSession::delete_step`]).
    pub fn delete_step(&mut self, index: usize) -> SceneResult<TimelineEvent> {
        self.check_index(index)?;
        let deleted = self.states[index].clone();
        let transition = transitions::delete_step(&self.states, index)?;
        self.commit(transition);
        self.last_moved = None;
        tracing::info!(index, "step deleted");
        Ok(TimelineEvent::StepDeleted {
            index,
            deleted_env_state: deleted,
        })
    }

    /// Move `object` to the top of the paint order of the last state.
    pub fn bring_to_front(&mut self, object: &str) -> SceneResult<TimelineEvent> {
        let reorder = transitions::bring_to_front(&self.states, object)?;
        self.states = reorder.states;
        tracing::debug!(object, "object moved to front");
        Ok(TimelineEvent::ObjectMovedToFront {
            object: ObjectId::new(object),
            old_order: reorder.old_order,
            new_order: reorder.new_order,
        })
    }

    /// Replace the caption of the state at `index`.
    pub fn set_caption(&mut self, index: usize, caption: &str) -> SceneResult<TimelineEvent> {
        self.states = transitions::set_caption(&self.states, index, caption)?;
        Ok(TimelineEvent::CaptionEdited {
            index,
            caption: caption.to_string(),
        })
    }

    /// Insert a generated state right after `after`, the index captured when the request was
    /// made.
    pub fn apply_generated(
        &mut self,
        after: usize,
        state: EnvironmentState,
    ) -> SceneResult<TimelineEvent> {
        let transition = transitions::insert_after(&self.states, after, state)?;
        self.commit(transition);
        self.last_moved = None;
        let index = after + 1;
        tracing::info!(index, "generated state inserted");
        Ok(TimelineEvent::NewEnvStateCreated {
            action: EditAction::Instruction,
            index,
            new_env_state: self.states[index].clone(),
        })
    }

    /// Replace the state at `index` with one regenerated from its edited caption.
    pub fn apply_regenerated(
        &mut self,
        index: usize,
        state: EnvironmentState,
    ) -> SceneResult<TimelineEvent> {
        self.states = transitions::replace_step(&self.states, index, state)?;
        tracing::info!(index, "state regenerated from caption");
        Ok(TimelineEvent::CurrentEnvStateUpdated {
            action: EditAction::CaptionRegenerated,
            index,
            new_env_state: self.states[index].clone(),
        })
    }

    /// Replace the autocomplete buffer with `candidates`.
    pub fn set_autocomplete(&mut self, candidates: Vec<EnvironmentState>) {
        tracing::debug!(count = candidates.len(), "autocomplete candidates received");
        self.autocomplete.fill(candidates);
    }

    /// Drop one autocomplete candidate.
    pub fn reject_autocomplete(&mut self, index: usize) -> SceneResult<()> {
        self.autocomplete.reject(index).map(|_| ())
    }

    /// Edit the caption of one autocomplete candidate.
    pub fn caption_autocomplete(&mut self, index: usize, caption: &str) -> SceneResult<()> {
        self.autocomplete.set_caption(index, caption)
    }

    /// Append autocomplete candidate `index` and clear the buffer.
    pub fn accept_autocomplete(&mut self, index: usize) -> SceneResult<TimelineEvent> {
        let state = self.autocomplete.take(index)?;
        let transition = transitions::append_step(&self.states, state);
        self.commit(transition);
        self.last_moved = None;
        let index = self.states.len() - 1;
        Ok(TimelineEvent::NewEnvStateCreated {
            action: EditAction::AutocompleteAccepted,
            index,
            new_env_state: self.states[index].clone(),
        })
    }

    /// Start the next queued caption request, if none is in flight.
    ///
    /// Indices that no longer exist are dropped.
    pub fn next_caption_job(&mut self) -> Option<CaptionJob> {
        while let Some(index) = self.captions.start_next() {
            let Some(current) = self.states.get(index) else {
                tracing::debug!(index, "queued caption index no longer exists");
                self.captions.finish();
                continue;
            };
            let previous = index
                .checked_sub(1)
                .and_then(|i| self.states.get(i))
                .cloned();
            return Some(CaptionJob {
                index,
                previous,
                current: current.clone(),
            });
        }
        None
    }

    /// Complete the in-flight caption request. A failure keeps the previous caption.
    pub fn finish_caption(&mut self, index: usize, result: SceneResult<String>) {
        self.captions.finish();
        match result {
            Ok(caption) => match self.states.get_mut(index) {
                Some(state) => state.caption = Some(caption),
                None => tracing::debug!(index, "captioned state no longer exists"),
            },
            Err(e) => tracing::warn!(index, error = %e, "caption generation failed"),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/state.rs"]
mod tests;
