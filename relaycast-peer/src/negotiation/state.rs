use crate::error::NegotiationError;
use crate::negotiation::candidate_buffer::CandidateBuffer;
use relaycast_core::IceCandidate;

/// Offer/answer progress of one peer link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationState {
    Idle,
    OfferSent,
    OfferReceived,
    AnswerSent,
    AnswerReceived,
    Connected,
    Closed,
}

impl NegotiationState {
    /// True once the remote description has been applied.
    pub fn has_remote_description(self) -> bool {
        matches!(
            self,
            NegotiationState::OfferReceived
                | NegotiationState::AnswerSent
                | NegotiationState::AnswerReceived
                | NegotiationState::Connected
        )
    }

    pub fn is_closed(self) -> bool {
        self == NegotiationState::Closed
    }
}

/// State machine for a single offer/answer exchange plus the candidates that
/// raced ahead of it.
///
/// ```text
/// offerer:  Idle -> OfferSent -> AnswerReceived -> Connected
/// answerer: Idle -> OfferReceived -> AnswerSent -> Connected
/// any state -> Closed
/// ```
#[derive(Debug)]
pub struct Negotiation {
    state: NegotiationState,
    candidates: CandidateBuffer,
}

impl Default for Negotiation {
    fn default() -> Self {
        Self::new()
    }
}

impl Negotiation {
    pub fn new() -> Self {
        Self {
            state: NegotiationState::Idle,
            candidates: CandidateBuffer::new(),
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn buffered_candidates(&self) -> usize {
        self.candidates.len()
    }

    /// Fails unless the machine currently sits in `expected`.
    pub fn expect(
        &self,
        expected: NegotiationState,
        event: &'static str,
    ) -> Result<(), NegotiationError> {
        if self.state == NegotiationState::Closed {
            return Err(NegotiationError::Closed);
        }
        if self.state != expected {
            return Err(NegotiationError::InvalidTransition {
                from: self.state,
                event,
            });
        }
        Ok(())
    }

    pub fn offer_sent(&mut self) -> Result<(), NegotiationError> {
        self.advance(NegotiationState::Idle, NegotiationState::OfferSent, "offer sent")
    }

    /// Remote offer applied. Returns the candidates that were waiting for it.
    pub fn offer_received(&mut self) -> Result<Vec<IceCandidate>, NegotiationError> {
        self.advance(
            NegotiationState::Idle,
            NegotiationState::OfferReceived,
            "offer received",
        )?;
        Ok(self.candidates.release())
    }

    pub fn answer_sent(&mut self) -> Result<(), NegotiationError> {
        self.advance(
            NegotiationState::OfferReceived,
            NegotiationState::AnswerSent,
            "answer sent",
        )
    }

    /// Remote answer applied. Returns the candidates that were waiting for it.
    pub fn answer_received(&mut self) -> Result<Vec<IceCandidate>, NegotiationError> {
        self.advance(
            NegotiationState::OfferSent,
            NegotiationState::AnswerReceived,
            "answer received",
        )?;
        Ok(self.candidates.release())
    }

    /// Both descriptions are in place. Repeating it is harmless.
    pub fn connected(&mut self) -> Result<(), NegotiationError> {
        match self.state {
            NegotiationState::AnswerReceived
            | NegotiationState::AnswerSent
            | NegotiationState::Connected => {
                self.state = NegotiationState::Connected;
                Ok(())
            }
            NegotiationState::Closed => Err(NegotiationError::Closed),
            from => Err(NegotiationError::InvalidTransition {
                from,
                event: "connected",
            }),
        }
    }

    /// Routes a remote candidate: `Some` means apply it now, `None` means it
    /// was buffered until the remote description lands.
    pub fn remote_candidate(
        &mut self,
        candidate: IceCandidate,
    ) -> Result<Option<IceCandidate>, NegotiationError> {
        if self.state == NegotiationState::Closed {
            return Err(NegotiationError::Closed);
        }
        Ok(self.candidates.accept(candidate))
    }

    /// Starts a new exchange from `Idle`. Candidates still waiting for a
    /// remote description carry over to it.
    pub fn restart(&mut self) {
        self.state = NegotiationState::Idle;
        self.candidates.rearm();
    }

    pub fn close(&mut self) {
        self.state = NegotiationState::Closed;
        self.candidates.clear();
    }

    fn advance(
        &mut self,
        from: NegotiationState,
        to: NegotiationState,
        event: &'static str,
    ) -> Result<(), NegotiationError> {
        self.expect(from, event)?;
        self.state = to;
        Ok(())
    }
}
