use std::collections::VecDeque;

/// FIFO of state indices awaiting a generated caption.
///
/// At most one caption request is in flight. A finished request lets the next index start; a
/// failed one is dropped without retry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptionQueue {
    pending: VecDeque<usize>,
    in_flight: Option<usize>,
}

impl CaptionQueue {
    /// Empty queue, nothing in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `index` for recaptioning.
    pub fn push(&mut self, index: usize) {
        self.pending.push_back(index);
    }

    /// Dequeue the next index and mark it in flight. `None` while a request is outstanding or
    /// nothing is pending.
    pub fn start_next(&mut self) -> Option<usize> {
        if self.in_flight.is_some() {
            return None;
        }
        let next = self.pending.pop_front()?;
        self.in_flight = Some(next);
        Some(next)
    }

    /// Clear the in-flight marker. Returns the index that was in flight.
    pub fn finish(&mut self) -> Option<usize> {
        self.in_flight.take()
    }

    /// Whether a request is in flight.
    pub fn is_captioning(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Index of the in-flight request.
    pub fn in_flight(&self) -> Option<usize> {
        self.in_flight
    }

    /// Pending indices, not counting the one in flight.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// No pending indices.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending indices in submission order.
    pub fn pending(&self) -> impl Iterator<Item = usize> + '_ {
        self.pending.iter().copied()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/caption_queue.rs"]
mod tests;
