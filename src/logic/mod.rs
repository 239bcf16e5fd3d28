pub mod advisor;
pub mod growth_stage;
pub mod matcher;
pub mod range;

pub use advisor::Advisor;
pub use matcher::{matches, OPTIMAL_SLACK};
pub use range::{lenient_number, RangeExpr};
