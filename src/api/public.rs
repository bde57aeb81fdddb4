use rocket::{serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::events::{broadcast_snapshot, ElectionEvent, EventBus, VoteCast};
use crate::model::{
    api::{election::ElectionDescription, results::ElectionResults},
    common::{CandidateId, ElectionId, KeyCode},
    db::{
        election::{current_election, derive_statuses, latest_closed_election, Election},
        vote::{has_voted, NewVote, Vote},
        voter::{voter_by_key_code, Voter},
    },
    mongodb::{is_duplicate_key_error, Coll},
};

use super::common::{closed_election_results, election_by_id};

pub fn routes() -> Vec<Route> {
    routes![
        get_current_election,
        cast_vote,
        latest_results,
        election_results,
    ]
}

/// The election currently accepting votes, or `null`.
#[get("/current-election")]
async fn get_current_election(
    elections: Coll<Election>,
) -> Result<Json<Option<ElectionDescription>>> {
    derive_statuses(&elections).await?;
    let election = current_election(&elections).await?;
    Ok(Json(election.map(Into::into)))
}

/// A vote that a voter wishes to cast.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoteRequest {
    pub key_code: String,
    pub candidate_id: CandidateId,
}

/// Confirmation of a successfully cast vote.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoteReceipt {
    pub success: bool,
    pub voter_name: String,
}

#[post("/vote", data = "<request>", format = "json")]
async fn cast_vote(
    request: Json<VoteRequest>,
    elections: Coll<Election>,
    voters: Coll<Voter>,
    votes: Coll<Vote>,
    new_votes: Coll<NewVote>,
    bus: &State<EventBus>,
) -> Result<Json<VoteReceipt>> {
    derive_statuses(&elections).await?;

    // Find the election currently accepting votes.
    let election = current_election(&elections)
        .await?
        .ok_or_else(|| Error::invalid_state("No active election"))?;

    // Resolve the key code, case-insensitively.
    let key_code = KeyCode::try_from(request.key_code.clone())?;
    let voter = voter_by_key_code(&voters, &key_code)
        .await?
        .ok_or_else(|| Error::validation("Invalid key code"))?;

    // Friendly rejection for repeat voters. This check alone would race
    // against a concurrent cast with the same key code; the unique index
    // behind the insert below is what actually guarantees one vote each.
    if has_voted(&votes, election.id, voter.id).await? {
        return Err(Error::conflict("You have already voted in this election"));
    }

    // The candidate must stand in this election.
    let candidate = election
        .candidate(request.candidate_id)
        .ok_or_else(|| Error::validation("Invalid candidate for this election"))?;

    let new_vote = NewVote::new(election.id, candidate.id, voter.id);
    if let Err(err) = new_votes.insert_one(&new_vote, None).await {
        // The concurrent loser lands here: exactly one insert can win.
        if is_duplicate_key_error(&err) {
            return Err(Error::conflict("You have already voted in this election"));
        }
        return Err(err.into());
    }
    info!(
        "Vote cast in election {} for candidate {}",
        election.id, candidate.id
    );

    // Notify subscribers; never on the critical path of the response.
    bus.publish(ElectionEvent::VoteCast(VoteCast {
        candidate_id: candidate.id,
        voter_name: voter.name.clone(),
    }));
    broadcast_snapshot(&elections, &votes, bus).await;

    Ok(Json(VoteReceipt {
        success: true,
        voter_name: voter.voter.name,
    }))
}

/// Results of the most recently closed election.
#[get("/results/latest")]
async fn latest_results(
    elections: Coll<Election>,
    votes: Coll<Vote>,
) -> Result<Json<ElectionResults>> {
    derive_statuses(&elections).await?;
    let election = latest_closed_election(&elections)
        .await?
        .ok_or_else(|| Error::not_found("No closed election"))?;
    let results = closed_election_results(election, &votes).await?;
    Ok(Json(results))
}

/// Results of a specific election; only available once it has closed.
#[get("/results/<election_id>", rank = 2)]
async fn election_results(
    election_id: ElectionId,
    elections: Coll<Election>,
    votes: Coll<Vote>,
) -> Result<Json<ElectionResults>> {
    derive_statuses(&elections).await?;
    let election = election_by_id(&elections, election_id).await?;
    let results = closed_election_results(election, &votes).await?;
    Ok(Json(results))
}
