mod candidate_buffer;
mod state;

pub use candidate_buffer::CandidateBuffer;
pub use state::{Negotiation, NegotiationState};
