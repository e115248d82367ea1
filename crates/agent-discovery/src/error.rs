use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("All configured models failed to generate a reply")]
    AllModelsFailed,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Could not parse agent reply: {0}")]
    ParseFailed(String),
}

pub type AgentResult<T> = Result<T, AgentError>;
