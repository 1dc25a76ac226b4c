use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{TripStore, TripTransaction};
use crate::entities::{NewTrip, Trip, TripStatus};
use crate::error::Error;

#[derive(Clone, Debug, Default)]
struct MemoryState {
    last_id: i64,
    trips: BTreeMap<i64, Trip>,
}

/// Keeps trips in process memory. Transactions are fully serialized: a
/// transaction owns the whole state until it commits or is dropped.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TripStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn TripTransaction>, Error> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();

        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

impl MemoryTransaction {
    fn find_first<P>(&self, predicate: P) -> Option<Trip>
    where
        P: Fn(&Trip) -> bool,
    {
        self.working.trips.values().find(|trip| predicate(*trip)).cloned()
    }
}

#[async_trait]
impl TripTransaction for MemoryTransaction {
    // the state guard already excludes every other transaction
    async fn lock_driver(&mut self, _driver_id: i64) -> Result<(), Error> {
        Ok(())
    }

    async fn lock_passenger(&mut self, _passenger_id: i64) -> Result<(), Error> {
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn insert(&mut self, trip: NewTrip) -> Result<Trip, Error> {
        self.working.last_id += 1;

        let trip = trip.into_trip(self.working.last_id, Utc::now());
        self.working.trips.insert(trip.id, trip.clone());

        Ok(trip)
    }

    async fn list_all(&mut self) -> Result<Vec<Trip>, Error> {
        Ok(self.working.trips.values().cloned().collect())
    }

    async fn find_by_id_and_driver(
        &mut self,
        id: i64,
        driver_id: i64,
    ) -> Result<Option<Trip>, Error> {
        Ok(self
            .working
            .trips
            .get(&id)
            .filter(|trip| trip.driver_id == driver_id)
            .cloned())
    }

    async fn find_open_pairing(
        &mut self,
        passenger_id: i64,
        driver_id: i64,
    ) -> Result<Option<Trip>, Error> {
        Ok(self.find_first(|trip| {
            trip.passenger_id == passenger_id
                && trip.driver_id == driver_id
                && trip.status.is_open()
        }))
    }

    async fn find_active_by_driver(&mut self, driver_id: i64) -> Result<Option<Trip>, Error> {
        Ok(self.find_first(|trip| trip.driver_id == driver_id && trip.status.is_active()))
    }

    async fn find_active_by_passenger(
        &mut self,
        passenger_id: i64,
    ) -> Result<Option<Trip>, Error> {
        Ok(self.find_first(|trip| trip.passenger_id == passenger_id && trip.status.is_active()))
    }

    #[tracing::instrument(skip(self))]
    async fn update(&mut self, id: i64, status: TripStatus) -> Result<Option<i64>, Error> {
        match self.working.trips.get_mut(&id) {
            Some(trip) => {
                trip.status = status;
                trip.updated_at = Utc::now();
                Ok(Some(id))
            }
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
        let now = Utc::now();
        let mut affected = 0;

        for trip in self.working.trips.values_mut() {
            if trip.id == keep_id
                || !trip.status.is_pending()
                || !trip.involves(driver_id, passenger_id)
            {
                continue;
            }

            trip.supersede(now)?;
            trip.updated_at = now;
            affected += 1;
        }

        tracing::info!(affected, "superseded pending trips");

        Ok(affected > 0)
    }

    async fn commit(self: Box<Self>) -> Result<(), Error> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;

        Ok(())
    }
}

#[cfg(test)]
fn new_trip(passenger_id: i64, driver_id: i64) -> NewTrip {
    NewTrip::new(
        passenger_id,
        crate::entities::sample_params(driver_id),
        Utc::now(),
    )
}

#[test]
fn dropped_transaction_discards_writes() {
    use tokio_test::block_on;

    let store = MemoryStore::new();

    block_on(async {
        let mut tx = store.begin().await.unwrap();
        tx.insert(new_trip(1, 1)).await.unwrap();
        drop(tx);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.list_all().await.unwrap().is_empty());
    });
}

#[test]
fn ids_are_assigned_in_order() {
    use tokio_test::block_on;

    let store = MemoryStore::new();

    block_on(async {
        let mut tx = store.begin().await.unwrap();
        let first = tx.insert(new_trip(1, 1)).await.unwrap();
        let second = tx.insert(new_trip(2, 1)).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        let mut tx = store.begin().await.unwrap();
        let ids: Vec<i64> = tx
            .list_all()
            .await
            .unwrap()
            .iter()
            .map(|trip| trip.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    });
}

#[test]
fn update_of_unknown_trip_is_a_no_op() {
    use tokio_test::block_on;

    let store = MemoryStore::new();

    block_on(async {
        let mut tx = store.begin().await.unwrap();
        let result = tx
            .update(
                42,
                TripStatus::Accepted {
                    accepted_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        assert_eq!(result, None);
    });
}

#[test]
fn supersede_skips_kept_and_non_pending_trips() {
    use tokio_test::block_on;

    let store = MemoryStore::new();

    block_on(async {
        let mut tx = store.begin().await.unwrap();
        let kept = tx.insert(new_trip(1, 1)).await.unwrap();
        let accepted = tx.insert(new_trip(1, 2)).await.unwrap();
        let sibling = tx.insert(new_trip(2, 1)).await.unwrap();
        let stranger = tx.insert(new_trip(3, 3)).await.unwrap();

        tx.update(
            accepted.id,
            TripStatus::Accepted {
                accepted_at: Utc::now(),
            },
        )
        .await
        .unwrap();

        assert!(tx.supersede_pending_except(kept.id, 1, 1).await.unwrap());
        assert!(!tx.supersede_pending_except(kept.id, 1, 1).await.unwrap());

        let trips = tx.list_all().await.unwrap();
        let status_of = |id: i64| {
            trips
                .iter()
                .find(|trip| trip.id == id)
                .map(|trip| trip.status.name())
                .unwrap()
        };

        assert_eq!(status_of(kept.id), "pending");
        assert_eq!(status_of(accepted.id), "accepted");
        assert_eq!(status_of(sibling.id), "superseded");
        assert_eq!(status_of(stranger.id), "pending");
    });
}
