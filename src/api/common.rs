use crate::error::{Error, Result};
use crate::model::{
    api::results::ElectionResults,
    common::{ElectionId, ElectionState},
    db::{
        election::Election,
        vote::{votes_for_election, Vote},
    },
    mongodb::{u32_id_filter, Coll},
};

/// Look up an election, 404 on a miss.
pub async fn election_by_id(
    elections: &Coll<Election>,
    election_id: ElectionId,
) -> Result<Election> {
    elections
        .find_one(u32_id_filter(election_id), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))
}

/// Aggregate the results of a closed election.
/// Results are never revealed while an election can still receive votes.
pub async fn closed_election_results(
    election: Election,
    votes: &Coll<Vote>,
) -> Result<ElectionResults> {
    if election.state != ElectionState::Closed {
        return Err(Error::invalid_state(format!(
            "Election {} is not closed yet",
            election.id
        )));
    }
    let election_votes = votes_for_election(votes, election.id).await?;
    Ok(ElectionResults::new(election, &election_votes))
}
