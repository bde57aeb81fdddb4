use mongodb::{
    bson::doc,
    error::Error as DbError,
    options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions},
};
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::Coll;

/// Counter providing election IDs.
pub const ELECTION_ID_COUNTER: &str = "elections";
/// Counter providing voter IDs.
pub const VOTER_ID_COUNTER: &str = "voters";

/// A counter object used to implement auto-increment IDs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u32,
}

impl Counter {
    /// Atomically retrieve the next value of the named counter.
    pub async fn next(counters: &Coll<Counter>, id: &str) -> Result<u32> {
        let filter = doc! {
            "_id": id,
        };
        let update = doc! {
            "$inc": { "next": 1 }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();
        let counter = counters
            .find_one_and_update(filter, update, options)
            .await?
            .ok_or_else(|| {
                Error::Status(
                    Status::InternalServerError,
                    format!("Failed to find counter '{id}'"),
                )
            })?;
        Ok(counter.next)
    }
}

/// Ensure all the named ID counters exist, starting at 1.
///
/// This operation is idempotent: existing counters are left untouched.
pub async fn ensure_counters_exist(counters: &Coll<Counter>) -> std::result::Result<(), DbError> {
    debug!("Ensuring ID counters exist");
    for id in [ELECTION_ID_COUNTER, VOTER_ID_COUNTER] {
        let filter = doc! {
            "_id": id,
        };
        let update = doc! {
            "$setOnInsert": { "next": 1 }
        };
        let options = UpdateOptions::builder().upsert(true).build();
        counters.update_one(filter, update, options).await?;
    }
    Ok(())
}
