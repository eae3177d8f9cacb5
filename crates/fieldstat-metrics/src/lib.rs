// Metrics engine: eligibility, role clustering, aggregation, peer pools,
// percentile ranking and radar profiles. Everything here is a pure function
// of its inputs; data access lives in fieldstat-core.

pub mod aggregate;
pub mod eligibility;
pub mod league;
pub mod percentile;
pub mod pool;
pub mod radar;
pub mod readiness;
pub mod roles;
