use rocket::{
    response::stream::EventStream,
    tokio::{select, sync::broadcast::error::RecvError},
    Route, Shutdown, State,
};

use crate::events::{current_snapshot, EventBus};
use crate::model::db::{election::Election, vote::Vote};
use crate::model::mongodb::Coll;

pub fn routes() -> Vec<Route> {
    routes![subscribe]
}

/// Server-sent event stream of election activity. Every subscriber gets the
/// current snapshot immediately, then live events as they happen.
#[get("/events")]
async fn subscribe(
    elections: Coll<Election>,
    votes: Coll<Vote>,
    bus: &State<EventBus>,
    mut end: Shutdown,
) -> EventStream![] {
    // Subscribe before computing the snapshot so nothing published in
    // between is missed.
    let mut rx = bus.subscribe();
    let initial = match current_snapshot(&elections, &votes).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!("Failed to compute initial snapshot: {err}");
            None
        }
    };

    EventStream! {
        if let Some(event) = initial {
            yield event.into_sse();
        }
        loop {
            let event = select! {
                result = rx.recv() => match result {
                    Ok(event) => event,
                    Err(RecvError::Closed) => break,
                    // A slow consumer missed some events; the next
                    // periodic snapshot will catch it up.
                    Err(RecvError::Lagged(_)) => continue,
                },
                _ = &mut end => break,
            };
            yield event.into_sse();
        }
    }
}
