//! Sync and lineup services

pub mod lineup_resolver;
pub mod lineup_sync;
pub mod season_listing;
pub mod sync_orchestrator;

pub use lineup_resolver::LineupResolver;
pub use lineup_sync::{LineupProvider, LineupServiceClient, LineupServiceError, LineupSync};
pub use season_listing::{list_constructors_for_season, list_drivers_for_season, ListingSource};
pub use sync_orchestrator::{SeasonSyncReport, SyncError, SyncOrchestrator, SyncSummary};
