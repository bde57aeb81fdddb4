//! The notification layer: a broadcast bus of election events, fed by the
//! request handlers and a periodic snapshot tick, consumed by the
//! server-sent-events endpoint.
//!
//! Delivery is strictly best-effort. Publishing never blocks, a lagging
//! subscriber loses events rather than slowing anyone down, and nothing is
//! replayed after a reconnect beyond the initial snapshot push.

use mongodb::Database;
use rocket::{
    fairing::{Fairing, Info, Kind},
    response::stream::Event,
    tokio::{self, sync::broadcast, time},
    Build, Orbit, Rocket,
};
use serde::Serialize;

use crate::error::Result;
use crate::model::{
    api::results::ElectionResults,
    api::election::ElectionDescription,
    common::CandidateId,
    db::{
        election::{current_election, derive_statuses, latest_closed_election, Election},
        vote::{votes_for_election, Vote},
    },
    mongodb::Coll,
};
use crate::Config;

/// Capacity of the broadcast channel. A subscriber that falls further
/// behind than this simply skips ahead.
const CHANNEL_CAPACITY: usize = 64;

/// The lightweight "a vote was just cast" notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCast {
    pub candidate_id: CandidateId,
    pub voter_name: String,
}

/// Everything that can be pushed to subscribers.
#[derive(Debug, Clone)]
pub enum ElectionEvent {
    /// Snapshot of the currently active election.
    Update(ElectionDescription),
    /// Results of the latest closed election.
    Closed(ElectionResults),
    /// A vote was cast just now.
    VoteCast(VoteCast),
}

impl ElectionEvent {
    /// The SSE event name clients subscribe to.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Update(_) => "election-update",
            Self::Closed(_) => "election-closed",
            Self::VoteCast(_) => "vote-cast",
        }
    }

    /// Render as a server-sent event.
    pub fn into_sse(self) -> Event {
        let name = self.name();
        match self {
            Self::Update(description) => Event::json(&description).event(name),
            Self::Closed(results) => Event::json(&results).event(name),
            Self::VoteCast(vote) => Event::json(&vote).event(name),
        }
    }
}

/// The observer registry: request handlers publish into it, SSE connections
/// subscribe to it. Cloning is cheap and shares the underlying channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ElectionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Fire-and-forget publish. Having no subscribers is not an error.
    pub fn publish(&self, event: ElectionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ElectionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// The snapshot pushed on connect and on every tick: the active election if
/// there is one, otherwise the latest closed results, otherwise nothing.
pub async fn current_snapshot(
    elections: &Coll<Election>,
    votes: &Coll<Vote>,
) -> Result<Option<ElectionEvent>> {
    derive_statuses(elections).await?;

    if let Some(election) = current_election(elections).await? {
        return Ok(Some(ElectionEvent::Update(election.into())));
    }

    if let Some(election) = latest_closed_election(elections).await? {
        let election_votes = votes_for_election(votes, election.id).await?;
        let results = ElectionResults::new(election, &election_votes);
        return Ok(Some(ElectionEvent::Closed(results)));
    }

    Ok(None)
}

/// Compute and publish the current snapshot. Failures are logged, never
/// propagated; notification must not break the operation that triggered it.
pub async fn broadcast_snapshot(elections: &Coll<Election>, votes: &Coll<Vote>, bus: &EventBus) {
    match current_snapshot(elections, votes).await {
        Ok(Some(event)) => bus.publish(event),
        Ok(None) => {}
        Err(err) => warn!("Failed to broadcast election snapshot: {err}"),
    }
}

/// A fairing that manages the [`EventBus`] and runs the periodic snapshot
/// broadcast for the lifetime of the process.
pub struct BroadcastFairing;

#[rocket::async_trait]
impl Fairing for BroadcastFairing {
    fn info(&self) -> Info {
        Info {
            name: "Broadcast",
            kind: Kind::Ignite | Kind::Liftoff,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        Ok(rocket.manage(EventBus::new()))
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        // All of these are managed by earlier fairings.
        let db = rocket
            .state::<Database>()
            .expect("Database is always managed")
            .clone();
        let bus = rocket
            .state::<EventBus>()
            .expect("EventBus is always managed")
            .clone();
        let period = rocket
            .state::<Config>()
            .expect("Config is always managed")
            .broadcast_interval();

        tokio::spawn(async move {
            let elections = Coll::<Election>::from_db(&db);
            let votes = Coll::<Vote>::from_db(&db);
            let mut interval = time::interval(period);
            loop {
                interval.tick().await;
                broadcast_snapshot(&elections, &votes, &bus).await;
            }
        });
        info!("Snapshot broadcast running every {period:?}");
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::model::db::election::Candidate;

    use super::*;

    fn example_description() -> ElectionDescription {
        let now = Utc::now();
        Election::new(
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
        )
        .into()
    }

    #[test]
    fn event_names() {
        assert_eq!(
            ElectionEvent::Update(example_description()).name(),
            "election-update"
        );
        assert_eq!(
            ElectionEvent::VoteCast(VoteCast {
                candidate_id: 1,
                voter_name: "Eve".to_string(),
            })
            .name(),
            "vote-cast"
        );
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(ElectionEvent::Update(example_description()));
    }

    #[test]
    fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(ElectionEvent::VoteCast(VoteCast {
            candidate_id: 2,
            voter_name: "Eve".to_string(),
        }));
        match rx.try_recv().unwrap() {
            ElectionEvent::VoteCast(vote) => {
                assert_eq!(vote.candidate_id, 2);
                assert_eq!(vote.voter_name, "Eve");
            }
            other => panic!("unexpected event {:?}", other.name()),
        }
    }
}
