//! LLM discovery layer: given an industry, find tickers and the metrics that
//! matter; given a ticker, find competitors. Agent replies are free text that
//! may or may not contain the requested JSON, so everything that comes back
//! goes through defensive parsing with typed failures.

pub mod chat;
pub mod discovery;
pub mod error;
pub mod parse;

pub use chat::{AgentConfig, ChatClient};
pub use discovery::{DiscoveryClient, DiscoveryProvider};
pub use error::{AgentError, AgentResult};
pub use parse::{parse_agent_list, parse_chart_map, strip_code_fences};
