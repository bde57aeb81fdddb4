use std::collections::HashMap;

use chrono::Utc;
use mongodb::{bson::doc, options::FindOptions};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route, State};

use crate::error::{Error, Result};
use crate::events::{broadcast_snapshot, ElectionEvent, EventBus};
use crate::model::{
    api::{
        auth::AdminKey,
        election::{ElectionDescription, ElectionSpec, ElectionSummary},
        results::DetailedResults,
    },
    common::{ElectionId, ElectionState},
    db::{
        election::{derive_statuses, unfinished_election_exists, Election},
        vote::{votes_for_election, Vote},
        voter::Voter,
    },
    mongodb::{Coll, Counter, ELECTION_ID_COUNTER},
};

use super::common::election_by_id;

pub fn routes() -> Vec<Route> {
    routes![
        create_election,
        close_election,
        get_elections,
        get_election,
        detailed_results,
    ]
}

#[post("/elections", data = "<spec>", format = "json")]
async fn create_election(
    _key: AdminKey,
    spec: Json<ElectionSpec>,
    elections: Coll<Election>,
    votes: Coll<Vote>,
    counters: Coll<Counter>,
    bus: &State<EventBus>,
) -> Result<Json<ElectionDescription>> {
    spec.validate()?;

    // Only one election may be underway at a time, regardless of whether
    // the time windows would overlap.
    derive_statuses(&elections).await?;
    if unfinished_election_exists(&elections).await? {
        return Err(Error::conflict(
            "Cannot create election: another election is pending or active",
        ));
    }

    // Candidates are embedded in the election document, so one insert
    // creates the whole thing atomically: no partial candidate set can
    // ever be observed.
    let election_id = Counter::next(&counters, ELECTION_ID_COUNTER).await?;
    let election = spec.0.into_election(election_id, Utc::now());
    elections.insert_one(&election, None).await?;
    info!("Created election {election_id} '{}'", election.name);

    broadcast_snapshot(&elections, &votes, bus).await;

    Ok(Json(election.into()))
}

#[post("/elections/<election_id>/close")]
async fn close_election(
    _key: AdminKey,
    election_id: ElectionId,
    elections: Coll<Election>,
    votes: Coll<Vote>,
    bus: &State<EventBus>,
) -> Result<Json<ElectionDescription>> {
    derive_statuses(&elections).await?;

    // Conditional update: only an active election can be closed, and a
    // repeat close fails cleanly.
    let filter = doc! {
        "_id": election_id as i64,
        "state": ElectionState::Active,
    };
    let update = doc! {
        "$set": {
            "state": ElectionState::Closed,
            "closed_manually": true,
        }
    };
    let result = elections.update_one(filter, update, None).await?;
    if result.modified_count != 1 {
        return Err(Error::Status(
            Status::BadRequest,
            format!("Election {election_id} does not exist or is not active"),
        ));
    }
    info!("Election {election_id} closed manually");

    // Push the final results to all subscribers.
    let election = election_by_id(&elections, election_id).await?;
    let closed = super::common::closed_election_results(election.clone(), &votes).await?;
    bus.publish(ElectionEvent::Closed(closed));

    Ok(Json(election.into()))
}

#[get("/elections")]
async fn get_elections(
    _key: AdminKey,
    elections: Coll<Election>,
) -> Result<Json<Vec<ElectionSummary>>> {
    derive_statuses(&elections).await?;
    let options = FindOptions::builder().sort(doc! {"_id": -1}).build();
    let all = elections
        .find(None, options)
        .await?
        .try_collect::<Vec<_>>()
        .await?;
    Ok(Json(all.into_iter().map(Into::into).collect()))
}

#[get("/elections/<election_id>")]
async fn get_election(
    _key: AdminKey,
    election_id: ElectionId,
    elections: Coll<Election>,
) -> Result<Json<ElectionDescription>> {
    derive_statuses(&elections).await?;
    let election = election_by_id(&elections, election_id).await?;
    Ok(Json(election.into()))
}

/// The de-anonymised view of a closed election. Admin-only because it maps
/// voters to their choices.
#[get("/elections/<election_id>/detailed-results")]
async fn detailed_results(
    _key: AdminKey,
    election_id: ElectionId,
    elections: Coll<Election>,
    votes: Coll<Vote>,
    voters: Coll<Voter>,
) -> Result<Json<DetailedResults>> {
    derive_statuses(&elections).await?;
    let election = election_by_id(&elections, election_id).await?;
    if election.state != ElectionState::Closed {
        return Err(Error::invalid_state(format!(
            "Election {election_id} is not closed yet"
        )));
    }

    let election_votes = votes_for_election(&votes, election_id).await?;

    // Attach voter identities.
    let voter_ids = election_votes
        .iter()
        .map(|vote| vote.voter_id as i64)
        .collect::<Vec<_>>();
    let voter_map = voters
        .find(doc! {"_id": {"$in": voter_ids}}, None)
        .await?
        .map_ok(|voter| (voter.id, voter))
        .try_collect::<HashMap<_, _>>()
        .await?;

    Ok(Json(DetailedResults::new(
        election,
        election_votes,
        &voter_map,
    )))
}
