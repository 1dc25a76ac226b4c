use tripline::config::{Config, StoreConfig};
use tripline::db::{MemoryStore, PgStore};
use tripline::engine::Engine;
use tripline::error::Error;
use tripline::server::serve;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    match config.store {
        StoreConfig::Memory => {
            tracing::warn!("using the in-memory trip store, trips are lost on exit");

            serve(Engine::new(MemoryStore::new()), config.listen_addr).await
        }
        StoreConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PgStore::new(&database_url, max_connections).await?;

            serve(Engine::new(store), config.listen_addr).await
        }
    }
}
