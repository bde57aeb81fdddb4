use std::io::Cursor;

use mongodb::error::Error as DbError;
use rocket::{
    http::{ContentType, Status},
    response::Responder,
    serde::json::serde_json::json,
    Request, Response,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure a request can produce. Each variant maps onto exactly one
/// HTTP status; the message becomes the JSON error body.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),
    /// Business-rule violation, e.g. a second concurrent election or a
    /// duplicate key code.
    #[error("{0}")]
    Conflict(String),
    /// The action is not valid for the entity's current lifecycle state.
    #[error("{0}")]
    InvalidState(String),
    /// Entity lookup failed.
    #[error("Not found: {0}")]
    NotFound(String),
    /// Bad or missing admin credential.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// Unexpected database failure.
    #[error(transparent)]
    Db(#[from] DbError),
    /// Escape hatch for anything else, e.g. action-target misses that
    /// surface as 400 rather than 404, or internal invariant failures.
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// The HTTP status this error translates to.
    pub fn status(&self) -> Status {
        match self {
            Self::Validation(_) | Self::Conflict(_) | Self::InvalidState(_) => Status::BadRequest,
            Self::NotFound(_) => Status::NotFound,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::Db(_) => Status::InternalServerError,
            Self::Status(status, _) => *status,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    /// Convert the error into a JSON `{"error": ...}` response.
    /// Database errors are not leaked to the client.
    fn respond_to(self, _: &'r Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        if status == Status::InternalServerError {
            error!("Internal error: {self:?}");
        } else {
            debug!("Request failed: {self:?}");
        }

        let message = match self {
            Self::Db(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let body = json!({ "error": message }).to_string();
        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            Error::validation("bad input").status(),
            Status::BadRequest
        );
        assert_eq!(Error::conflict("duplicate").status(), Status::BadRequest);
        assert_eq!(
            Error::invalid_state("not active").status(),
            Status::BadRequest
        );
        assert_eq!(Error::not_found("election 7").status(), Status::NotFound);
        assert_eq!(
            Error::unauthorized("bad key").status(),
            Status::Unauthorized
        );
        assert_eq!(
            Error::Status(Status::InternalServerError, "oops".to_string()).status(),
            Status::InternalServerError
        );
    }
}
