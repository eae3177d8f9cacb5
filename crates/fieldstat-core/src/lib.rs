// Library root for the shared data layer: match-event model, configuration,
// SQLite persistence, CSV import, and the data-access interface the metrics
// engine is driven through.

pub mod config;
pub mod db;
pub mod import;
pub mod model;
pub mod source;
