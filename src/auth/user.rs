use async_trait::async_trait;
use axum::extract::{FromRequest, Query, RequestParts};
use serde::{Deserialize, Serialize};

use crate::error::{unauthorized_error, Error};

/// The caller of a lifecycle operation, acting as passenger or driver.
///
/// Identity is taken on trust from the `user_id` query parameter; real
/// authentication happens in front of this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Deserialize)]
struct ActorParams {
    user_id: Option<String>,
}

impl User {
    pub fn new(id: i64) -> Self {
        Self { id }
    }
}

#[async_trait]
impl<B> FromRequest<B> for User
where
    B: Send,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<ActorParams>::from_request(req)
            .await
            .map_err(|_| unauthorized_error())?;

        let id = params
            .user_id
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .ok_or_else(unauthorized_error)?;

        Ok(User::new(id))
    }
}

#[cfg(test)]
fn extract(uri: &str) -> Result<User, Error> {
    use axum::http::Request;

    let request = Request::builder().uri(uri).body(()).unwrap();
    let mut parts = RequestParts::new(request);

    tokio_test::block_on(User::from_request(&mut parts))
}

#[test]
fn user_comes_from_query_string() {
    assert_eq!(extract("/driver/trip?user_id=7"), Ok(User::new(7)));
    assert_eq!(extract("/driver/trip?foo=bar&user_id=0"), Ok(User::new(0)));
}

#[test]
fn missing_or_malformed_user_is_unauthorized() {
    assert_eq!(extract("/driver/trip"), Err(unauthorized_error()));
    assert_eq!(extract("/driver/trip?user_id="), Err(unauthorized_error()));
    assert_eq!(extract("/driver/trip?user_id=abc"), Err(unauthorized_error()));
}
