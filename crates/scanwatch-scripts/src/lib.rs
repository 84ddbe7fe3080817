//! scanwatch scripts - turns a remediation plan into files
//!
//! - `ScriptGenerator` renders one SQL script per actionable suggestion
//! - `write_scripts` puts a batch of scripts on disk, all or nothing
//! - `ReportRenderer` renders the whole run as an HTML report

mod error;
mod filters;
mod generator;
mod report;
mod templates;
mod writer;

pub use error::*;
pub use filters::*;
pub use generator::*;
pub use report::*;
pub use writer::*;
