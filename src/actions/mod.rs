pub mod executor;
pub mod intent;

pub use executor::{ActionExecutor, ExecutionOutcome};
pub use intent::{Destination, Intent, SiteSpec};
