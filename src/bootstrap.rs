use std::sync::Arc;

use crate::config::Settings;
use crate::core::{GroupPartitioner, MatchingEngine, PreferenceScorer};
use crate::models::ScoringWeights;
use crate::services::{CacheManager, CachedConfigSource, ConfigSource, PostgresClient, StoreError};

/// Connect the stores and build a matching engine from settings
///
/// Redis is optional: when it cannot be reached, configs are cached in
/// process only.
pub async fn build_engine(
    settings: &Settings,
) -> Result<(MatchingEngine, Arc<PostgresClient>), StoreError> {
    let postgres = Arc::new(
        PostgresClient::from_settings(
            &settings.database.url,
            settings.database.max_connections,
            settings.database.min_connections,
            settings.database.acquire_timeout_secs,
            settings.database.idle_timeout_secs,
        )
        .await?,
    );

    tracing::info!(
        "PostgreSQL client initialized (max: {} connections)",
        settings.database.max_connections.unwrap_or(10)
    );

    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let cache = match CacheManager::new(&settings.cache.redis_url, l1_cache_size, cache_ttl).await {
        Ok(cache) => {
            tracing::info!(
                "Cache manager initialized (L1: {} entries, TTL: {}s)",
                l1_cache_size,
                cache_ttl
            );
            cache
        }
        Err(e) => {
            tracing::warn!("Failed to connect to Redis ({}), using in-process config cache", e);
            CacheManager::in_memory(l1_cache_size, cache_ttl)
        }
    };

    let configs: Arc<dyn ConfigSource> =
        Arc::new(CachedConfigSource::new(postgres.clone(), Arc::new(cache)));

    let weights = ScoringWeights::from(&settings.scoring.weights);
    tracing::info!("Scorer initialized with weights: {:?}", weights);

    let engine = MatchingEngine::from_store(postgres.clone())
        .with_configs(configs)
        .with_scorer(PreferenceScorer::new(weights))
        .with_partitioner(GroupPartitioner::new(settings.matching.penalty_factor))
        .with_default_lookback_days(settings.matching.default_lookback_days)
        .with_seed(settings.matching.seed);

    Ok((engine, postgres))
}
