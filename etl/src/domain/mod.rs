//! Domain logic for the songplay warehouse
//!
//! - `schema` - Table definitions and the Schema Manager (drop/create)
//! - `jsonpaths` - JSONPaths field mapping for staging loads
//! - `load` - Bulk Loader for the staging tables
//! - `transform` - Derivation of dimensions and the songplay fact table
//! - `verify` - Row counts for every table
//! - `pipeline` - Ordered stages with declared preconditions

pub mod jsonpaths;
pub mod load;
pub mod pipeline;
pub mod schema;
pub mod transform;
pub mod verify;

pub use load::LoadReport;
pub use pipeline::{Pipeline, Stage, StageOutcome};
pub use verify::TableCount;
