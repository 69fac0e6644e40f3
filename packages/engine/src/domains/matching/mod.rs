//! Matchmaking domain - candidate selection and atomic pairing.

pub mod criteria;
pub mod matchmaker;

pub use criteria::FilterCriteria;
pub use matchmaker::{try_match, MatchOutcome};
