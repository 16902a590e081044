use crate::foundation::error::{SceneError, SceneResult};
use crate::scene::model::EnvironmentState;

/// Suggested next states held outside the timeline until one is accepted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AutocompleteBuffer {
    candidates: Vec<EnvironmentState>,
}

impl AutocompleteBuffer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the buffer with `candidates`, flagging each as a suggestion.
    pub fn fill(&mut self, candidates: impl IntoIterator<Item = EnvironmentState>) {
        self.candidates = candidates
            .into_iter()
            .map(|mut state| {
                state.is_autocomplete = true;
                state
            })
            .collect();
    }

    /// Candidates in the order received.
    pub fn candidates(&self) -> &[EnvironmentState] {
        &self.candidates
    }

    /// Candidate at `index`.
    pub fn get(&self, index: usize) -> Option<&EnvironmentState> {
        self.candidates.get(index)
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// No candidates.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Take candidate `index` and clear the rest. The returned state is no longer flagged.
    pub fn take(&mut self, index: usize) -> SceneResult<EnvironmentState> {
        if index >= self.candidates.len() {
            return Err(self.missing(index));
        }
        let mut state = self.candidates.swap_remove(index);
        self.candidates.clear();
        state.is_autocomplete = false;
        Ok(state)
    }

    /// Drop candidate `index`, keeping the others in order.
    pub fn reject(&mut self, index: usize) -> SceneResult<EnvironmentState> {
        if index >= self.candidates.len() {
            return Err(self.missing(index));
        }
        Ok(self.candidates.remove(index))
    }

    /// Edit the caption of candidate `index`.
    pub fn set_caption(&mut self, index: usize, caption: &str) -> SceneResult<()> {
        let len = self.candidates.len();
        let state = self
            .candidates
            .get_mut(index)
            .ok_or_else(|| Self::missing_in(index, len))?;
        state.caption = Some(caption.to_string());
        Ok(())
    }

    /// Drop every candidate.
    pub fn clear(&mut self) {
        self.candidates.clear();
    }

    fn missing(&self, index: usize) -> SceneError {
        Self::missing_in(index, self.candidates.len())
    }

    fn missing_in(index: usize, len: usize) -> SceneError {
        SceneError::invariant(format!(
            "autocomplete candidate {index} out of range ({len} candidates)"
        ))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/autocomplete.rs"]
mod tests;
