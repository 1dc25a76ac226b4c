mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};

use crate::server::handlers::trips;
use crate::{
    api::API,
    error::{unexpected_error, Error},
};

type DynAPI = Arc<dyn API + Send + Sync>;

pub fn router<T: API + Sync + Send + 'static>(api: T) -> Router {
    let api = Arc::new(api) as DynAPI;

    Router::new()
        .route("/driver/trip", get(trips::find_all))
        .route("/driver/trip/:id", get(trips::find).delete(trips::cancel))
        .route("/driver/trip/:id/confirm", post(trips::confirm))
        .route("/driver/trip/:id/finish", post(trips::finish))
        .route("/passenger/trip", post(trips::create))
        .layer(Extension(api))
}

pub async fn serve<T: API + Sync + Send + 'static>(api: T, addr: SocketAddr) -> Result<(), Error> {
    let app = router(api);

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(|err| {
            tracing::error!("server error: {}", err);
            unexpected_error()
        })
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::db::MemoryStore;
    use crate::engine::Engine;

    async fn spawn_app() -> String {
        let app = router(Engine::new(MemoryStore::new()));
        let server = axum::Server::bind(&"127.0.0.1:0".parse().unwrap())
            .serve(app.into_make_service());
        let addr = server.local_addr();

        tokio::spawn(server);

        format!("http://{}", addr)
    }

    fn create_body() -> Value {
        json!({
            "driver_id": 1,
            "category_id": 1,
            "fare": 10.5,
            "waypoints": {
                "lat_from": 1,
                "lon_from": 1,
                "lat_to": -10,
                "lon_to": -10
            }
        })
    }

    #[tokio::test]
    async fn listing_requires_a_user() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();

        let response = client
            .get(format!("{}/driver/trip", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 401);

        let response = client
            .get(format!("{}/driver/trip?user_id=1", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.json::<Value>().await.unwrap(), json!([]));
    }

    #[tokio::test]
    async fn trip_goes_through_its_lifecycle_over_http() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/passenger/trip?user_id=1", base))
            .json(&create_body())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);

        let trip: Value = response.json().await.unwrap();
        assert_eq!(trip["id"], 1);
        assert_eq!(trip["passenger_id"], 1);
        assert_eq!(trip["status"]["name"], "pending");
        assert_eq!(trip["waypoints"]["lat_to"], -10.0);

        let response = client
            .post(format!("{}/driver/trip/1/confirm?user_id=1", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);

        let response = client
            .get(format!("{}/driver/trip/1?user_id=2", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 404);

        let response = client
            .delete(format!("{}/driver/trip/1?user_id=1", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let response = client
            .post(format!("{}/driver/trip/1/finish?user_id=1", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 403);

        let body: Value = response.json().await.unwrap();
        assert_eq!(
            body["error"],
            "Trip is not accepted or is already finished or canceled"
        );
    }

    #[tokio::test]
    async fn duplicate_booking_is_forbidden() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();

        for expected in [201u16, 403u16] {
            let response = client
                .post(format!("{}/passenger/trip?user_id=1", base))
                .json(&create_body())
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), expected);
        }
    }

    #[tokio::test]
    async fn create_accepts_camel_case_bodies() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/passenger/trip?user_id=1", base))
            .json(&json!({
                "driverId": 1,
                "categoryId": 1,
                "fare": 10.5,
                "waypoints": {
                    "latFrom": 1,
                    "lonFrom": 1,
                    "latTo": -10,
                    "lonTo": -10
                }
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);

        let trip: Value = response.json().await.unwrap();
        assert_eq!(trip["driver_id"], 1);
        assert_eq!(trip["category_id"], 1);
        assert_eq!(trip["waypoints"]["lon_to"], -10.0);
    }
}
