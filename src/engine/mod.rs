mod helpers;
mod trip_api;

use crate::{api::API, db::TripStore};

/// Trip lifecycle rules on top of a [`TripStore`].
#[derive(Debug, Clone)]
pub struct Engine<S> {
    store: S,
}

impl<S: TripStore> Engine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: TripStore> API for Engine<S> {}
