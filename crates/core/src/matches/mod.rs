//! Matches module - stored match records and their repository contract.

mod matches_model;
mod matches_traits;

pub use matches_model::{MatchParticipant, MatchRecord, MatchRef};
pub use matches_traits::MatchRepositoryTrait;
