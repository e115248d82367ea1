use thiserror::Error;

#[derive(Error, Debug)]
pub enum PeersError {
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),
}
