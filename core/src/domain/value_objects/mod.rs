//! Value objects for the domain layer.

pub mod actor;
pub mod pricing;
pub mod search;

pub use actor::Actor;
pub use pricing::{calculate_price, quote, PriceBreakdown, SERVICE_FEE_RATE};
pub use search::{HostSummary, SearchCriteria};
