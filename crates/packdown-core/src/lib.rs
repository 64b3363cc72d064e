pub mod audit;
pub mod errors;
pub mod filter;
pub mod grouping;
pub mod logger;
pub mod model;
pub mod packer;
pub mod prefixes;
pub mod probe;
pub mod ranking;
pub mod sampling;
pub mod scan;
pub mod scorer;
pub mod script;
pub mod units;

pub use errors::{PlanError, PlanResult};
pub use model::{FileMove, FileRecord, MoveStatus, Plan, PlanSummary, VolumeState, WorldView};
pub use packer::{FitPolicy, PlanOptions, PlanOutcome};
