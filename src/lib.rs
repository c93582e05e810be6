pub mod config;
pub mod driver;
pub mod error;
pub mod extract;
pub mod load;
pub mod logging;
pub mod recordset;
pub mod transform;

pub use config::Config;
pub use driver::{PipelineDriver, RunOutcome, RunReport, RunState};
pub use error::{EtlError, Result};
pub use recordset::RecordSet;
