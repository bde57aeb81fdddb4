use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, oid::ObjectId, serde_helpers::chrono_datetime_as_bson_datetime},
    error::Error as DbError,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{CandidateId, ElectionId, VoterId},
    mongodb::Coll,
};

/// A vote ready for insertion. The database assigns the `_id`; the unique
/// index on `(election_id, voter_id)` rejects a second vote by the same
/// voter in the same election.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct NewVote {
    pub election_id: ElectionId,
    pub candidate_id: CandidateId,
    pub voter_id: VoterId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub voted_at: DateTime<Utc>,
}

impl NewVote {
    pub fn new(election_id: ElectionId, candidate_id: CandidateId, voter_id: VoterId) -> Self {
        Self {
            election_id,
            candidate_id,
            voter_id,
            voted_at: Utc::now(),
        }
    }
}

/// A vote from the database, with its unique ID. Votes are never updated;
/// they are only ever removed as a cascade of voter deletion.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(flatten)]
    pub vote: NewVote,
}

impl Deref for Vote {
    type Target = NewVote;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

/// All votes cast in the given election.
pub async fn votes_for_election(
    votes: &Coll<Vote>,
    election_id: ElectionId,
) -> Result<Vec<Vote>, DbError> {
    votes
        .find(doc! {"election_id": election_id as i64}, None)
        .await?
        .try_collect()
        .await
}

/// Has this voter already voted in this election?
pub async fn has_voted(
    votes: &Coll<Vote>,
    election_id: ElectionId,
    voter_id: VoterId,
) -> Result<bool, DbError> {
    let filter = doc! {
        "election_id": election_id as i64,
        "voter_id": voter_id as i64,
    };
    Ok(votes.find_one(filter, None).await?.is_some())
}
