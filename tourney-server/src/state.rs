use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use crate::identity::{HeaderIdentity, Identify};
use crate::store::{MemoryStore, PgStore, Store};
use crate::{Config, Error};

#[derive(Clone, Debug)]
pub struct State(Arc<StateInner>);

impl State {
    /// Creates the shared state from `config`, connecting to and migrating the database.
    pub async fn new(config: &Config) -> Result<Self, Error> {
        let store: Box<dyn Store> = if config.database.is_memory() {
            log::warn!("Using the in-memory store, nothing will be persisted");

            Box::new(MemoryStore::new())
        } else {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .max_lifetime(Duration::new(3600, 0))
                .idle_timeout(Duration::new(60, 0))
                .connect_lazy(&config.database.url)?;

            let store = PgStore::new(pool, config.database.prefix.clone());
            store.migrate().await?;

            Box::new(store)
        };

        Ok(Self::from_parts(store, Box::new(HeaderIdentity)))
    }

    pub fn from_parts(store: Box<dyn Store>, identity: Box<dyn Identify>) -> Self {
        Self(Arc::new(StateInner { store, identity }))
    }
}

impl Deref for State {
    type Target = StateInner;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug)]
pub struct StateInner {
    pub store: Box<dyn Store>,
    pub identity: Box<dyn Identify>,
}

#[cfg(test)]
impl State {
    /// A state backed by a fresh [`MemoryStore`].
    pub fn memory() -> Self {
        Self::from_parts(Box::new(MemoryStore::new()), Box::new(HeaderIdentity))
    }
}
