use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{CandidateId, KeyCode, VoterId},
    db::{election::Election, vote::Vote, voter::Voter},
};

use super::election::ElectionDescription;

/// One candidate's share of the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTally {
    pub id: CandidateId,
    pub name: String,
    pub votes: u64,
}

/// The anonymous results of a closed election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResults {
    /// The election the results belong to.
    pub election: ElectionDescription,
    /// Per-candidate counts, ordered by votes descending, then name.
    pub results: Vec<CandidateTally>,
    /// Total number of votes cast.
    pub total_votes: u64,
    /// The leading candidate; absent when no votes were cast or the
    /// election had no candidates.
    pub winner: Option<CandidateTally>,
}

impl ElectionResults {
    /// Aggregate the given votes against the election's candidate list.
    pub fn new(election: Election, votes: &[Vote]) -> Self {
        let mut counts: HashMap<CandidateId, u64> = HashMap::new();
        for vote in votes {
            *counts.entry(vote.candidate_id).or_default() += 1;
        }

        let mut results = election
            .candidates
            .iter()
            .map(|candidate| CandidateTally {
                id: candidate.id,
                name: candidate.name.clone(),
                votes: counts.get(&candidate.id).copied().unwrap_or(0),
            })
            .collect::<Vec<_>>();
        // Highest count first; ties broken alphabetically.
        results.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.name.cmp(&b.name)));

        let total_votes = results.iter().map(|tally| tally.votes).sum();
        let winner = if total_votes > 0 {
            results.first().cloned()
        } else {
            None
        };

        Self {
            election: election.into(),
            results,
            total_votes,
            winner,
        }
    }
}

/// One vote with its voter identity attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteDetail {
    pub candidate_id: CandidateId,
    pub candidate_name: String,
    pub voter_id: VoterId,
    pub voter_name: String,
    pub key_code: KeyCode,
    pub voted_at: DateTime<Utc>,
}

/// All voters who chose one particular candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateVotes {
    pub candidate_id: CandidateId,
    pub candidate_name: String,
    pub votes: Vec<VoterChoice>,
}

/// One voter's appearance inside [`CandidateVotes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterChoice {
    pub voter_id: VoterId,
    pub voter_name: String,
    pub key_code: KeyCode,
    pub voted_at: DateTime<Utc>,
}

/// The de-anonymised results of a closed election. Admin-only: this view
/// maps individual voters to their choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedResults {
    #[serde(flatten)]
    pub summary: ElectionResults,
    /// Every vote, newest first.
    pub votes: Vec<VoteDetail>,
    /// Votes grouped per candidate, in ballot order.
    pub votes_by_candidate: Vec<CandidateVotes>,
}

impl DetailedResults {
    /// Aggregate votes with voter identities attached. Votes whose voter no
    /// longer exists are skipped; cascade deletion makes that unobservable
    /// in practice.
    pub fn new(election: Election, mut votes: Vec<Vote>, voters: &HashMap<VoterId, Voter>) -> Self {
        votes.sort_by(|a, b| b.voted_at.cmp(&a.voted_at));

        let detail = |vote: &Vote| -> Option<VoteDetail> {
            let voter = voters.get(&vote.voter_id)?;
            let candidate = election.candidate(vote.candidate_id)?;
            Some(VoteDetail {
                candidate_id: candidate.id,
                candidate_name: candidate.name.clone(),
                voter_id: voter.id,
                voter_name: voter.name.clone(),
                key_code: voter.key_code.clone(),
                voted_at: vote.voted_at,
            })
        };
        let details = votes.iter().filter_map(detail).collect::<Vec<_>>();

        let votes_by_candidate = election
            .candidates
            .iter()
            .map(|candidate| CandidateVotes {
                candidate_id: candidate.id,
                candidate_name: candidate.name.clone(),
                votes: details
                    .iter()
                    .filter(|detail| detail.candidate_id == candidate.id)
                    .map(|detail| VoterChoice {
                        voter_id: detail.voter_id,
                        voter_name: detail.voter_name.clone(),
                        key_code: detail.key_code.clone(),
                        voted_at: detail.voted_at,
                    })
                    .collect(),
            })
            .collect();

        Self {
            summary: ElectionResults::new(election, &votes),
            votes: details,
            votes_by_candidate,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use mongodb::bson::oid::ObjectId;

    use crate::model::db::{election::Candidate, vote::NewVote};

    use super::*;

    fn example_election(candidates: &[&str]) -> Election {
        let now = Utc::now();
        Election::new(
            1,
            "Test Election".to_string(),
            now - Duration::hours(2),
            now - Duration::hours(1),
            candidates
                .iter()
                .enumerate()
                .map(|(i, name)| Candidate {
                    id: i as CandidateId + 1,
                    name: name.to_string(),
                })
                .collect(),
            now - Duration::hours(2),
        )
    }

    fn vote_for(candidate_id: CandidateId, voter_id: VoterId) -> Vote {
        Vote {
            id: ObjectId::new(),
            vote: NewVote::new(1, candidate_id, voter_id),
        }
    }

    #[test]
    fn orders_by_count_then_name() {
        let election = example_election(&["Charlie", "Alice", "Bob"]);
        // Bob 2, Alice 1, Charlie 1: Alice beats Charlie alphabetically.
        let votes = vec![vote_for(3, 1), vote_for(3, 2), vote_for(2, 3), vote_for(1, 4)];

        let results = ElectionResults::new(election, &votes);
        let names = results
            .results
            .iter()
            .map(|tally| tally.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Bob", "Alice", "Charlie"]);
        assert_eq!(results.total_votes, 4);
        let winner = results.winner.unwrap();
        assert_eq!(winner.name, "Bob");
        assert_eq!(winner.votes, 2);
    }

    #[test]
    fn no_winner_without_votes() {
        let election = example_election(&["Alice", "Bob"]);
        let results = ElectionResults::new(election, &[]);
        assert_eq!(results.total_votes, 0);
        assert!(results.winner.is_none());
        // Candidates still appear, each with zero votes.
        assert_eq!(results.results.len(), 2);
        assert!(results.results.iter().all(|tally| tally.votes == 0));
    }

    #[test]
    fn no_winner_without_candidates() {
        let election = example_election(&[]);
        let results = ElectionResults::new(election, &[]);
        assert!(results.results.is_empty());
        assert!(results.winner.is_none());
    }

    #[test]
    fn detailed_results_group_by_candidate() {
        let election = example_election(&["Alice", "Bob"]);
        let votes = vec![vote_for(1, 10), vote_for(2, 20), vote_for(1, 30)];
        let voters = [
            (10, Voter::new(10, "Eve".to_string(), key_code("AAAAAA"))),
            (20, Voter::new(20, "Mallory".to_string(), key_code("BBBBBB"))),
            (30, Voter::new(30, "Trent".to_string(), key_code("CCCCCC"))),
        ]
        .into_iter()
        .collect::<HashMap<_, _>>();

        let detailed = DetailedResults::new(election, votes, &voters);
        assert_eq!(detailed.summary.total_votes, 3);
        assert_eq!(detailed.votes.len(), 3);

        assert_eq!(detailed.votes_by_candidate.len(), 2);
        let alice = &detailed.votes_by_candidate[0];
        assert_eq!(alice.candidate_name, "Alice");
        let mut alice_voters = alice
            .votes
            .iter()
            .map(|choice| choice.voter_name.as_str())
            .collect::<Vec<_>>();
        alice_voters.sort_unstable();
        assert_eq!(alice_voters, vec!["Eve", "Trent"]);
        let bob = &detailed.votes_by_candidate[1];
        assert_eq!(bob.votes.len(), 1);
        assert_eq!(bob.votes[0].voter_name, "Mallory");
    }

    fn key_code(raw: &str) -> KeyCode {
        KeyCode::try_from(raw.to_string()).unwrap()
    }
}
