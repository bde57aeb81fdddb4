use rocket::{
    http::Status,
    response::status::Custom,
    serde::json::{serde_json::json, Json, Value},
    Catcher, Request, Route,
};

mod admin;
mod common;
mod events;
mod public;
mod voter;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(events::routes());
    routes.extend(public::routes());
    routes.extend(voter::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

/// Render framework-level failures (401 from the admin guard, 404 for
/// unknown routes, 422 for undeserialisable bodies, ...) in the same JSON
/// shape as our own errors.
#[catch(default)]
fn default_catcher(status: Status, _req: &Request) -> Custom<Json<Value>> {
    let message = match status.code {
        401 => "Unauthorized: Invalid admin key".to_string(),
        _ => status.reason_lossy().to_string(),
    };
    Custom(status, Json(json!({ "error": message })))
}
