/// Tier league creation at startup.
pub mod bootstrap_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Season history and achievement inputs.
pub mod history_service;
/// Season closure with promotion and demotion.
pub mod promotion_service;
/// Season opening and weekly rollover.
pub mod scheduler_service;
/// Daily zone snapshots.
pub mod snapshot_service;
/// Live league rankings.
pub mod standings_service;
/// Storage connection supervisor with reconnect and degraded-mode handling.
pub mod storage_supervisor;

#[cfg(test)]
mod fixtures;
