use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::{CandidateId, ElectionId, ElectionState},
    db::election::{Candidate, Election},
};

/// Minimum number of candidates an election must have.
pub const MIN_CANDIDATES: usize = 2;

/// An election specification, as submitted by an admin.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSpec {
    /// Election name.
    pub name: String,
    /// When the election starts accepting votes.
    pub start_time: DateTime<Utc>,
    /// When the election stops accepting votes.
    pub close_time: DateTime<Utc>,
    /// Candidate display names, in ballot order.
    pub candidates: Vec<String>,
}

impl ElectionSpec {
    /// Reject specs that could never form a valid election.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("Election name is required"));
        }
        if self.close_time <= self.start_time {
            return Err(Error::validation(
                "Close time must be after the start time",
            ));
        }
        if self.candidates.len() < MIN_CANDIDATES {
            return Err(Error::validation(format!(
                "At least {MIN_CANDIDATES} candidates are required"
            )));
        }
        if self.candidates.iter().any(|name| name.trim().is_empty()) {
            return Err(Error::validation("Candidate names must not be empty"));
        }
        Ok(())
    }

    /// Convert this spec into a proper Election with unique IDs.
    /// Candidate IDs are 1-based and follow ballot order.
    pub fn into_election(self, election_id: ElectionId, now: DateTime<Utc>) -> Election {
        let candidates = self
            .candidates
            .into_iter()
            .enumerate()
            .map(|(i, name)| Candidate {
                id: i as CandidateId + 1,
                name: name.trim().to_string(),
            })
            .collect();
        Election::new(
            election_id,
            self.name.trim().to_string(),
            self.start_time,
            self.close_time,
            candidates,
            now,
        )
    }
}

/// An API-friendly election description, including the candidate list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionDescription {
    /// Election unique ID.
    pub id: ElectionId,
    /// Election name.
    pub name: String,
    /// Election state.
    pub state: ElectionState,
    /// Election start time.
    pub start_time: DateTime<Utc>,
    /// Election close time.
    pub close_time: DateTime<Utc>,
    /// Was the election closed manually?
    pub closed_manually: bool,
    /// Election creation time.
    pub created_at: DateTime<Utc>,
    /// The ordered candidate list.
    pub candidates: Vec<Candidate>,
}

impl From<Election> for ElectionDescription {
    fn from(election: Election) -> Self {
        Self {
            id: election.id,
            name: election.election.name,
            state: election.election.state,
            start_time: election.election.start_time,
            close_time: election.election.close_time,
            closed_manually: election.election.closed_manually,
            created_at: election.election.created_at,
            candidates: election.election.candidates,
        }
    }
}

/// A summary of an election, shorter than the full `ElectionDescription`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSummary {
    /// Election unique ID.
    pub id: ElectionId,
    /// Election name.
    pub name: String,
    /// Election state.
    pub state: ElectionState,
    /// Election start time.
    pub start_time: DateTime<Utc>,
    /// Election close time.
    pub close_time: DateTime<Utc>,
    /// Was the election closed manually?
    pub closed_manually: bool,
    /// Election creation time.
    pub created_at: DateTime<Utc>,
}

impl From<Election> for ElectionSummary {
    fn from(election: Election) -> Self {
        Self {
            id: election.id,
            name: election.election.name,
            state: election.election.state,
            start_time: election.election.start_time,
            close_time: election.election.close_time,
            closed_manually: election.election.closed_manually,
            created_at: election.election.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn spec(candidates: &[&str]) -> ElectionSpec {
        let now = Utc::now();
        ElectionSpec {
            name: "Test Election".to_string(),
            start_time: now,
            close_time: now + Duration::hours(1),
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn accepts_valid_spec() {
        assert!(spec(&["Alice", "Bob"]).validate().is_ok());
    }

    #[test]
    fn rejects_too_few_candidates() {
        assert!(spec(&[]).validate().is_err());
        assert!(spec(&["Alice"]).validate().is_err());
    }

    #[test]
    fn rejects_blank_names() {
        let mut bad = spec(&["Alice", "  "]);
        assert!(bad.validate().is_err());
        bad = spec(&["Alice", "Bob"]);
        bad.name = " ".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn rejects_inverted_window() {
        let mut bad = spec(&["Alice", "Bob"]);
        bad.close_time = bad.start_time - Duration::seconds(1);
        assert!(bad.validate().is_err());
        bad.close_time = bad.start_time;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn candidate_ids_follow_ballot_order() {
        let now = Utc::now();
        let election = spec(&["Alice", " Bob "]).into_election(7, now);
        assert_eq!(election.id, 7);
        assert_eq!(election.candidates.len(), 2);
        assert_eq!(election.candidates[0].id, 1);
        assert_eq!(election.candidates[0].name, "Alice");
        assert_eq!(election.candidates[1].id, 2);
        assert_eq!(election.candidates[1].name, "Bob");
    }
}
