use rocket::{
    http::Status,
    request::{FromRequest, Outcome, Request},
    State,
};

use crate::error::Error;
use crate::Config;

/// Header carrying the admin shared secret.
pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";
/// Query parameter alternative, for clients that cannot set headers.
pub const ADMIN_KEY_PARAM: &str = "admin_key";

/// Proof that the request carried the admin shared secret.
/// Add this guard to any endpoint that must be admin-only.
pub struct AdminKey;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminKey {
    type Error = Error;

    /// Check the supplied key against the configured secret. A missing or
    /// incorrect key fails the request outright with 401; there is no
    /// fallback route for unauthenticated callers.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let provided = req
            .headers()
            .get_one(ADMIN_KEY_HEADER)
            .map(str::to_string)
            .or_else(|| req.query_value::<String>(ADMIN_KEY_PARAM).and_then(|r| r.ok()));

        match provided {
            Some(ref key) if key == config.admin_key() => Outcome::Success(AdminKey),
            _ => Outcome::Failure((
                Status::Unauthorized,
                Error::unauthorized("Invalid admin key"),
            )),
        }
    }
}
