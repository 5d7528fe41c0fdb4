// Service exports
pub mod cache;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use cache::{CacheError, CacheKey, CacheManager, CachedConfigSource};
pub use memory::InMemoryStore;
pub use postgres::PostgresClient;
pub use repository::{ConfigSource, HistorySource, MatchSink, ParticipantSource, StoreError};
