pub mod changelog;
pub mod columns;
pub mod error;
pub mod frame;
pub mod version;

pub use changelog::{ChangelogEntry, parse_head_version};
pub use error::{CohortError, Result};
pub use version::Version;
