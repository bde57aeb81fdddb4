use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    bson::serde_helpers::chrono_datetime_as_bson_datetime,
    error::Error as DbError,
    options::FindOneOptions,
};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{CandidateId, ElectionId, ElectionState},
    mongodb::Coll,
};

/// A candidate standing in an election. Candidates are embedded in their
/// election document, so they are created and deleted with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Candidate ID, unique within the election (1-based).
    pub id: CandidateId,
    /// Display name.
    pub name: String,
}

/// Core election data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ElectionCore {
    /// Election name.
    pub name: String,
    /// Election lifecycle state.
    pub state: ElectionState,
    /// When the election starts accepting votes.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    /// When the election stops accepting votes.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub close_time: DateTime<Utc>,
    /// Was the election closed by explicit admin action rather than by
    /// reaching its close time?
    pub closed_manually: bool,
    /// When the election was created.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    /// The ordered candidate list.
    pub candidates: Vec<Candidate>,
}

/// An election from the database, with its unique ID.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: ElectionId,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Election {
    /// Create a new election. The initial state is computed from the start
    /// time: an election whose start time has already passed is born active.
    pub fn new(
        id: ElectionId,
        name: String,
        start_time: DateTime<Utc>,
        close_time: DateTime<Utc>,
        candidates: Vec<Candidate>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            election: ElectionCore {
                name,
                state: initial_state(start_time, now),
                start_time,
                close_time,
                closed_manually: false,
                created_at: now,
                candidates,
            },
        }
    }

    /// Look up a candidate of this election by ID.
    pub fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}

/// The state a brand-new election starts in.
pub fn initial_state(start_time: DateTime<Utc>, now: DateTime<Utc>) -> ElectionState {
    if start_time <= now {
        ElectionState::Active
    } else {
        ElectionState::Pending
    }
}

/// Advance election states according to the wall clock: pending elections
/// whose start time has passed become active, active elections whose close
/// time has passed become closed.
///
/// Idempotent; must be invoked before any read or write that depends on the
/// current state. States persisted here never move backwards.
pub async fn derive_statuses(elections: &Coll<Election>) -> Result<(), DbError> {
    let now = BsonDateTime::from_chrono(Utc::now());

    let starting = doc! {
        "state": ElectionState::Pending,
        "start_time": { "$lte": now },
    };
    elections
        .update_many(starting, doc! {"$set": {"state": ElectionState::Active}}, None)
        .await?;

    let closing = doc! {
        "state": ElectionState::Active,
        "close_time": { "$lte": now },
    };
    elections
        .update_many(closing, doc! {"$set": {"state": ElectionState::Closed}}, None)
        .await?;

    Ok(())
}

/// The most recent active election, if any.
pub async fn current_election(elections: &Coll<Election>) -> Result<Option<Election>, DbError> {
    let options = FindOneOptions::builder().sort(doc! {"_id": -1}).build();
    elections
        .find_one(doc! {"state": ElectionState::Active}, options)
        .await
}

/// The most recently closed election, if any.
pub async fn latest_closed_election(
    elections: &Coll<Election>,
) -> Result<Option<Election>, DbError> {
    let options = FindOneOptions::builder().sort(doc! {"_id": -1}).build();
    elections
        .find_one(doc! {"state": ElectionState::Closed}, options)
        .await
}

/// Is any election currently pending or active?
pub async fn unfinished_election_exists(elections: &Coll<Election>) -> Result<bool, DbError> {
    let filter = doc! {
        "state": { "$in": [ElectionState::Pending, ElectionState::Active] },
    };
    Ok(elections.find_one(filter, None).await?.is_some())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn initial_state_from_start_time() {
        let now = Utc::now();
        assert_eq!(initial_state(now - Duration::hours(1), now), ElectionState::Active);
        assert_eq!(initial_state(now + Duration::hours(1), now), ElectionState::Pending);
        // Starting exactly now counts as started.
        assert_eq!(initial_state(now, now), ElectionState::Active);
    }

    #[test]
    fn candidate_lookup() {
        let now = Utc::now();
        let election = Election::new(
            1,
            "Test Election".to_string(),
            now - Duration::hours(1),
            now + Duration::hours(1),
            vec![
                Candidate {
                    id: 1,
                    name: "Alice".to_string(),
                },
                Candidate {
                    id: 2,
                    name: "Bob".to_string(),
                },
            ],
            now,
        );
        assert_eq!(election.state, ElectionState::Active);
        assert_eq!(election.candidate(2).unwrap().name, "Bob");
        assert!(election.candidate(3).is_none());
    }
}
