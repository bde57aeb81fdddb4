mod key_code;
mod state;

pub use key_code::{KeyCode, KEY_CODE_LENGTH};
pub use state::ElectionState;

/// Our election IDs are integers.
pub type ElectionId = u32;
/// Our candidate IDs are integers, unique within their election.
pub type CandidateId = u32;
/// Our voter IDs are integers.
pub type VoterId = u32;
