use thiserror::Error;

#[derive(Debug, Error)]
pub enum CohortError {
    #[error("invalid version '{0}': expected MAJOR.MINOR.PATCH")]
    InvalidVersion(String),
    #[error("changelog is empty or malformed: {0}")]
    MalformedChangelog(String),
}

pub type Result<T> = std::result::Result<T, CohortError>;
