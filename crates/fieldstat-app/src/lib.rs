pub mod error;
pub mod leaderboard;
pub mod player;
pub mod scope;
pub mod service;
pub mod team;

pub use error::MetricsError;
pub use service::StatsService;
