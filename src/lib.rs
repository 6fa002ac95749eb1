pub mod assemble;
pub mod cli;
pub mod dashboard;
pub mod dataset;
pub mod error;
pub mod export;
pub mod formatting;
pub mod progress;
pub mod report;
pub mod summary;

pub use assemble::assemble;
pub use dashboard::{Dashboard, Surface};
pub use dataset::Dataset;
pub use error::{DashboardError, Result};
