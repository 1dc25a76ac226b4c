use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::env;
use std::fmt::{self, Debug};

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

pub const NOT_FOUND: i32 = 100;
pub const CONFLICT: i32 = 101;
pub const UNAUTHORIZED: i32 = 102;
pub const INVALID_INPUT: i32 = 103;

impl Error {
    pub fn is_not_found(&self) -> bool {
        self.code == NOT_FOUND
    }

    pub fn is_conflict(&self) -> bool {
        self.code == CONFLICT
    }

    pub fn is_internal(&self) -> bool {
        matches!(self.code, 1..=99)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for Error {}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        database_error(err)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self.code {
            1..=99 => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            NOT_FOUND => (StatusCode::NOT_FOUND, self.message.as_str()),
            CONFLICT => (StatusCode::FORBIDDEN, self.message.as_str()),
            UNAUTHORIZED => (StatusCode::UNAUTHORIZED, self.message.as_str()),
            _ => (StatusCode::BAD_REQUEST, self.message.as_str()),
        };

        let body = Json(json!({
            "code": self.code,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub fn not_found_error() -> Error {
    Error {
        code: NOT_FOUND,
        message: "Trip was not found".into(),
    }
}

/// Business-rule violation. `reason` is one of the fixed messages the
/// lifecycle rules emit.
pub fn conflict_error(reason: &str) -> Error {
    Error {
        code: CONFLICT,
        message: reason.into(),
    }
}

pub fn unauthorized_error() -> Error {
    Error {
        code: UNAUTHORIZED,
        message: "Invalid user".into(),
    }
}

pub fn invalid_input_error(what: &str) -> Error {
    Error {
        code: INVALID_INPUT,
        message: format!("invalid input: {}", what),
    }
}

pub fn env_var_error(_: env::VarError) -> Error {
    Error {
        code: 1,
        message: "environment variable error".into(),
    }
}

pub fn database_error<T: Debug>(err: T) -> Error {
    tracing::error!("database error: {:?}", err);

    Error {
        code: 2,
        message: "database error".into(),
    }
}

pub fn unexpected_error() -> Error {
    Error {
        code: 5,
        message: "unexpected error".into(),
    }
}

#[test]
fn internal_errors_hide_their_message() {
    let response = database_error("connection refused").into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn rule_errors_map_to_client_statuses() {
    assert_eq!(
        not_found_error().into_response().status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        conflict_error("Driver is already on a trip")
            .into_response()
            .status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        unauthorized_error().into_response().status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        invalid_input_error("LISTEN_ADDR").into_response().status(),
        StatusCode::BAD_REQUEST
    );
}

#[test]
fn error_kind_predicates() {
    assert!(not_found_error().is_not_found());
    assert!(!not_found_error().is_conflict());
    assert!(conflict_error("Trip is not pending").is_conflict());
    assert!(!conflict_error("Trip is not pending").is_internal());
    assert!(unexpected_error().is_internal());
    assert!(!unauthorized_error().is_not_found());
}
