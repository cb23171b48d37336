pub mod checks;
pub mod error;

pub use checks::{check_career_path_ids, check_job_ids, check_no_nulls, check_schema};
pub use error::ValidationError;
