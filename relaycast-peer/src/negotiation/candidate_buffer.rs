use relaycast_core::IceCandidate;
use std::collections::VecDeque;

/// Holds remote candidates that arrive before the remote description is set.
///
/// Candidates come back out in arrival order, exactly once.
#[derive(Debug, Default)]
pub struct CandidateBuffer {
    pending: VecDeque<IceCandidate>,
    remote_description_set: bool,
}

impl CandidateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the candidate back when it can be applied right away,
    /// otherwise queues it.
    pub fn accept(&mut self, candidate: IceCandidate) -> Option<IceCandidate> {
        if self.remote_description_set {
            return Some(candidate);
        }
        self.pending.push_back(candidate);
        None
    }

    /// Marks the remote description as applied and hands over everything
    /// queued so far.
    pub fn release(&mut self) -> Vec<IceCandidate> {
        self.remote_description_set = true;
        self.pending.drain(..).collect()
    }

    /// Waits for a new remote description. Queued candidates stay queued.
    pub fn rearm(&mut self) {
        self.remote_description_set = false;
    }

    pub fn is_released(&self) -> bool {
        self.remote_description_set
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
