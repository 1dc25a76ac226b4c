use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    types::Json,
    Executor, Pool, Postgres, Row, Transaction,
};

use super::{TripStore, TripTransaction};
use crate::entities::{NewTrip, Trip, TripStatus};
use crate::error::Error;

type Database = Postgres;

macro_rules! select_trips {
    ($rest:literal) => {
        concat!(
            "SELECT id, passenger_id, driver_id, category_id, fare, waypoints, state, created_at, updated_at FROM trips ",
            $rest
        )
    };
}

const DRIVER_LOCK_SPACE: i64 = 0;
const PASSENGER_LOCK_SPACE: i64 = 1;

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: Pool<Database>,
}

impl PgStore {
    #[tracing::instrument(name = "PgStore::new", skip(db_uri))]
    pub async fn new(db_uri: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_uri)
            .await?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: Pool<Database>) -> Result<Self, Error> {
        pool.execute(
            "CREATE TABLE IF NOT EXISTS trips (
                id BIGSERIAL PRIMARY KEY,
                status VARCHAR NOT NULL,
                passenger_id BIGINT NOT NULL,
                driver_id BIGINT NOT NULL,
                category_id BIGINT NOT NULL,
                fare DOUBLE PRECISION NOT NULL,
                waypoints JSONB NOT NULL,
                state JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .await?;
        pool.execute("CREATE INDEX IF NOT EXISTS trips_driver_status ON trips (driver_id, status)")
            .await?;
        pool.execute(
            "CREATE INDEX IF NOT EXISTS trips_passenger_status ON trips (passenger_id, status)",
        )
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl TripStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn TripTransaction>, Error> {
        let tx = self.pool.begin().await?;

        Ok(Box::new(PgTransaction { tx }))
    }
}

struct PgTransaction {
    tx: Transaction<'static, Database>,
}

impl PgTransaction {
    // advisory locks are released when the transaction ends
    async fn advisory_lock(&mut self, space: i64, id: i64) -> Result<(), Error> {
        let key = id.wrapping_mul(2).wrapping_add(space);

        self.tx
            .execute(sqlx::query("SELECT pg_advisory_xact_lock($1)").bind(key))
            .await?;

        Ok(())
    }

    async fn fetch_trip(
        &mut self,
        sql: &'static str,
        first: i64,
        second: Option<i64>,
    ) -> Result<Option<Trip>, Error> {
        let mut query = sqlx::query(sql).bind(first);
        if let Some(second) = second {
            query = query.bind(second);
        }

        self.tx
            .fetch_optional(query)
            .await?
            .map(|row| trip_from_row(&row))
            .transpose()
    }
}

fn trip_from_row(row: &PgRow) -> Result<Trip, Error> {
    let Json(waypoints) = row.try_get("waypoints")?;
    let Json(status): Json<TripStatus> = row.try_get("state")?;

    Ok(Trip {
        id: row.try_get("id")?,
        fare: row.try_get("fare")?,
        category_id: row.try_get("category_id")?,
        passenger_id: row.try_get("passenger_id")?,
        driver_id: row.try_get("driver_id")?,
        waypoints,
        status,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl TripTransaction for PgTransaction {
    #[tracing::instrument(skip(self))]
    async fn lock_driver(&mut self, driver_id: i64) -> Result<(), Error> {
        self.advisory_lock(DRIVER_LOCK_SPACE, driver_id).await
    }

    #[tracing::instrument(skip(self))]
    async fn lock_passenger(&mut self, passenger_id: i64) -> Result<(), Error> {
        self.advisory_lock(PASSENGER_LOCK_SPACE, passenger_id).await
    }

    #[tracing::instrument(skip(self))]
    async fn insert(&mut self, trip: NewTrip) -> Result<Trip, Error> {
        let row = self
            .tx
            .fetch_one(
                sqlx::query(
                    "INSERT INTO trips (status, passenger_id, driver_id, category_id, fare, waypoints, state)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    RETURNING id, passenger_id, driver_id, category_id, fare, waypoints, state, created_at, updated_at",
                )
                .bind(TripStatus::Pending.name())
                .bind(trip.passenger_id)
                .bind(trip.driver_id)
                .bind(trip.category_id)
                .bind(trip.fare)
                .bind(Json(&trip.waypoints))
                .bind(Json(&TripStatus::Pending)),
            )
            .await?;

        trip_from_row(&row)
    }

    #[tracing::instrument(skip(self))]
    async fn list_all(&mut self) -> Result<Vec<Trip>, Error> {
        let mut trips = Vec::new();
        let mut rows = self.tx.fetch(sqlx::query(select_trips!("ORDER BY id")));

        while let Some(row) = rows.try_next().await? {
            trips.push(trip_from_row(&row)?);
        }

        Ok(trips)
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_id_and_driver(
        &mut self,
        id: i64,
        driver_id: i64,
    ) -> Result<Option<Trip>, Error> {
        self.fetch_trip(
            select_trips!("WHERE id = $1 AND driver_id = $2"),
            id,
            Some(driver_id),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn find_open_pairing(
        &mut self,
        passenger_id: i64,
        driver_id: i64,
    ) -> Result<Option<Trip>, Error> {
        self.fetch_trip(
            select_trips!(
                "WHERE passenger_id = $1 AND driver_id = $2 AND status IN ('pending', 'accepted') LIMIT 1"
            ),
            passenger_id,
            Some(driver_id),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn find_active_by_driver(&mut self, driver_id: i64) -> Result<Option<Trip>, Error> {
        self.fetch_trip(
            select_trips!("WHERE driver_id = $1 AND status = 'accepted' LIMIT 1"),
            driver_id,
            None,
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn find_active_by_passenger(
        &mut self,
        passenger_id: i64,
    ) -> Result<Option<Trip>, Error> {
        self.fetch_trip(
            select_trips!("WHERE passenger_id = $1 AND status = 'accepted' LIMIT 1"),
            passenger_id,
            None,
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn update(&mut self, id: i64, status: TripStatus) -> Result<Option<i64>, Error> {
        let maybe_row = self
            .tx
            .fetch_optional(
                sqlx::query(
                    "UPDATE trips SET status = $2, state = $3, updated_at = now() WHERE id = $1 RETURNING id",
                )
                .bind(id)
                .bind(status.name())
                .bind(Json(&status)),
            )
            .await?;

        match maybe_row {
            Some(row) => Ok(Some(row.try_get("id")?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn supersede_pending_except(
        &mut self,
        keep_id: i64,
        driver_id: i64,
        passenger_id: i64,
    ) -> Result<bool, Error> {
        let status = TripStatus::Superseded {
            deleted_at: Utc::now(),
        };

        let result = self
            .tx
            .execute(
                sqlx::query(
                    "UPDATE trips SET status = $4, state = $5, updated_at = now()
                    WHERE id <> $1
                        AND (driver_id = $2 OR passenger_id = $3)
                        AND status = 'pending'",
                )
                .bind(keep_id)
                .bind(driver_id)
                .bind(passenger_id)
                .bind(status.name())
                .bind(Json(&status)),
            )
            .await?;

        tracing::info!(affected = result.rows_affected(), "superseded pending trips");

        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> Result<(), Error> {
        let PgTransaction { tx } = *self;
        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
async fn test_store() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a scratch database");
    let store = PgStore::new(&url, 5).await.unwrap();
    store.pool.execute("TRUNCATE trips RESTART IDENTITY").await.unwrap();
    store
}

#[tokio::test]
#[ignore = "requires a running postgres at DATABASE_URL"]
async fn pg_store_supersedes_only_pending_siblings() {
    use crate::entities::sample_params;

    let store = test_store().await;
    let mut tx = store.begin().await.unwrap();

    let kept = tx
        .insert(NewTrip::new(1, sample_params(1), Utc::now()))
        .await
        .unwrap();
    let sibling = tx
        .insert(NewTrip::new(2, sample_params(1), Utc::now()))
        .await
        .unwrap();
    let stranger = tx
        .insert(NewTrip::new(2, sample_params(2), Utc::now()))
        .await
        .unwrap();

    assert!(tx.supersede_pending_except(kept.id, 1, 1).await.unwrap());
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let trips = tx.list_all().await.unwrap();

    assert_eq!(trips[0].id, kept.id);
    assert!(trips[0].status.is_pending());
    assert_eq!(trips[1].id, sibling.id);
    assert!(trips[1].status.deleted_at().is_some());
    assert_eq!(trips[2].id, stranger.id);
    assert!(trips[2].status.is_pending());
    assert_eq!(trips[0].waypoints, kept.waypoints);
}

#[tokio::test]
#[ignore = "requires a running postgres at DATABASE_URL"]
async fn pg_store_rolls_back_uncommitted_writes() {
    use crate::entities::sample_params;

    let store = test_store().await;

    let mut tx = store.begin().await.unwrap();
    tx.insert(NewTrip::new(1, sample_params(1), Utc::now()))
        .await
        .unwrap();
    drop(tx);

    let mut tx = store.begin().await.unwrap();
    assert!(tx.list_all().await.unwrap().is_empty());
}
