use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime},
    error::Error as DbError,
};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{KeyCode, VoterId},
    mongodb::Coll,
};

/// Core voter data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct VoterCore {
    /// Display name.
    pub name: String,
    /// The voter's credential, normalised to uppercase. Unique store-wide.
    pub key_code: KeyCode,
    /// When the voter was registered.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// A voter from the database, with its unique ID.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: VoterId,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Voter {
    /// Create a new voter.
    pub fn new(id: VoterId, name: String, key_code: KeyCode) -> Self {
        Self {
            id,
            voter: VoterCore {
                name,
                key_code,
                created_at: Utc::now(),
            },
        }
    }
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}

/// Resolve a key code to its voter. The code is already normalised, so a
/// direct equality lookup suffices.
pub async fn voter_by_key_code(
    voters: &Coll<Voter>,
    key_code: &KeyCode,
) -> Result<Option<Voter>, DbError> {
    voters
        .find_one(doc! {"key_code": key_code.as_str()}, None)
        .await
}
