//! Discovery agents: tickers for an industry, competitors for a ticker, and
//! the metrics worth charting for an industry.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::chat::ChatClient;
use crate::error::{AgentError, AgentResult};
use crate::parse::{parse_agent_list, parse_chart_map};

const TICKER_SYSTEM: &str = "You are a financial data assistant. \
Given an industry or market segment name, return a JSON array of relevant \
company stock tickers in that industry. The entries of this list should only \
have tickers and no extra text or symbols. Return ONLY a JSON list of \
tickers, no explanations or extra text. IMPORTANT! Do not return any company \
names, only the tickers. If a company does not have a publicly traded \
ticker, do not include it in the list.";

const METRIC_SYSTEM: &str = "You are a metric agent. Given the name of an \
industry, identify and return the most important and relevant metrics for \
that industry. Focus on metrics that are widely used to evaluate \
performance, growth, or success within the specified industry. IMPORTANT: \
The metrics you provide should match the naming and format as found on \
Financial Modeling Prep (FMP), since they will be fetched from FMP. Return \
ONLY a JSON list containing all relevant metrics from both the \
income-statement endpoint and the balance-sheet-statement endpoint. Do not \
include explanations or extra text. The metrics you return must be in \
camelCase notation, as they appear on FMP (e.g., grossProfit). \
Abbreviations should be in all lowercase (e.g., ebitda). Return only \
metrics which FMP has data for. You must always return EXACTLY 12 metrics. \
Always include the following 6 metrics: revenue, grossProfit, eps, ebitda, \
netIncome, and totalAssets. In addition to these, return 6 more metrics \
that are the most important for the given industry.";

const INDUSTRIES_SYSTEM: &str = "You are an industries agent. Given a \
company ticker, return a JSON array of industries that the company belongs \
to. The entries of this list should only have industry names and no extra \
text or symbols. Return ONLY a JSON list of industries, no explanations or \
extra text.";

const COMPETITORS_SYSTEM: &str = "You are a competitors agent. Given a \
company ticker and a list of industries, return a JSON array of tickers for \
competitor companies. For each industry, you should research and find the \
top competitors in that industry. The entries of this list should only have \
tickers and no extra text or symbols. Return ONLY a JSON list of tickers, \
no names or explanations or extra text.";

const CHART_SYSTEM: &str = "You are a chart agent expert. You should analyze \
provided metrics. Given a list of metrics and a range parameter, for each \
metric, suggest the most suitable chart type for displaying it on the \
frontend. Return the result in the format: metric : chart_type. Only \
provide the mapping for each metric without any additional explanation.";

/// Discovery surface consumed by the HTTP layer. Abstracted so routes can be
/// exercised against canned replies.
#[async_trait]
pub trait DiscoveryProvider: Send + Sync {
    async fn tickers_by_industry(&self, industry: &str) -> AgentResult<Vec<String>>;

    async fn metrics_by_industry(&self, industry: &str) -> AgentResult<Vec<String>>;

    /// Returns the industry the competitors were drawn from alongside the
    /// competitor tickers.
    async fn competitors_by_ticker(&self, ticker: &str) -> AgentResult<(String, Vec<String>)>;
}

#[derive(Clone)]
pub struct DiscoveryClient {
    chat: ChatClient,
}

impl DiscoveryClient {
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }

    /// Suggest a chart type per metric for the frontend.
    pub async fn chart_types(
        &self,
        metrics: &[String],
        range: &str,
    ) -> AgentResult<BTreeMap<String, String>> {
        let prompt = format!(
            "Given the following metrics: {}, and the range: '{}', suggest \
             the most suitable chart type for each metric. Return the result \
             in the format: metric : chart_type, without any additional \
             explanation.",
            metrics.join(", "),
            range
        );
        let reply = self.chat.generate(CHART_SYSTEM, &prompt).await?;
        Ok(parse_chart_map(&reply))
    }
}

#[async_trait]
impl DiscoveryProvider for DiscoveryClient {
    async fn tickers_by_industry(&self, industry: &str) -> AgentResult<Vec<String>> {
        let prompt = format!(
            "List the top company tickers in the industry: '{industry}'. \
             Only return a JSON array of tickers, no explanations or extra text."
        );
        let reply = self.chat.generate(TICKER_SYSTEM, &prompt).await?;
        tracing::debug!("Ticker agent reply: {}", reply);
        parse_agent_list(&reply)
    }

    async fn metrics_by_industry(&self, industry: &str) -> AgentResult<Vec<String>> {
        let prompt = format!(
            "List the most important and relevant metrics for the industry: \
             '{industry}'. Only return a JSON array of metrics in camelCase \
             notation as found on Financial Modeling Prep (FMP), with no \
             explanations or extra text."
        );
        let reply = self.chat.generate(METRIC_SYSTEM, &prompt).await?;
        tracing::debug!("Metric agent reply: {}", reply);
        parse_agent_list(&reply)
    }

    async fn competitors_by_ticker(&self, ticker: &str) -> AgentResult<(String, Vec<String>)> {
        let industries_prompt = format!(
            "List the industries for the company with ticker: '{ticker}'. \
             Only return a JSON array of industries, no explanations or extra text."
        );
        let reply = self.chat.generate(INDUSTRIES_SYSTEM, &industries_prompt).await?;
        let industries = parse_agent_list(&reply)?;
        let Some(industry) = industries.into_iter().next() else {
            return Err(AgentError::InvalidResponse(
                "industries reply was an empty list".to_string(),
            ));
        };

        let competitors_prompt = format!(
            "List the top competitors for the company with ticker: '{ticker}' \
             in the industry: '{industry}'. Only return a JSON array of \
             tickers, no explanations or extra text."
        );
        let reply = self
            .chat
            .generate(COMPETITORS_SYSTEM, &competitors_prompt)
            .await?;
        let competitors = parse_agent_list(&reply)?;

        Ok((industry, competitors))
    }
}
