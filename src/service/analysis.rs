//! Attendance trend analysis through an LLM.
//!
//! The whole ledger is serialized to JSON and sent to an OpenAI-compatible
//! chat-completions endpoint, which must answer with a JSON object holding
//! `trends`, `predictions` and `insights`.

use crate::store::{AttendanceFilter, AttendanceLedger, StoreError};
use async_trait::async_trait;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, error, info};
use utoipa::ToSchema;

const SYSTEM_PROMPT: &str = "You are a school attendance data analyst. Analyze the following \
attendance data to identify trends, predict potential absenteeism, and offer insights for \
proactive intervention. Provide the trends, predictions, and insights in a clear and concise \
manner. Reply with a JSON object with exactly three string fields: \"trends\", \"predictions\" \
and \"insights\".";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TrendAnalysis {
    /// Identified trends in attendance data.
    pub trends: String,
    /// Predictions of potential absenteeism.
    pub predictions: String,
    /// Insights for proactive intervention.
    pub insights: String,
}

#[derive(Debug, Display)]
pub enum AnalysisError {
    #[display(fmt = "Attendance analysis is not configured")]
    NotConfigured,
    #[display(fmt = "Could not load attendance data")]
    Ledger(StoreError),
    #[display(fmt = "Analysis service request failed: {}", _0)]
    Upstream(String),
    #[display(fmt = "Analysis service returned an unexpected reply: {}", _0)]
    MalformedReply(String),
}

impl std::error::Error for AnalysisError {}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        AnalysisError::Upstream(e.to_string())
    }
}

#[async_trait]
pub trait TrendAnalyzer: Send + Sync {
    async fn analyze(&self, attendance_json: &str) -> Result<TrendAnalysis, AnalysisError>;
}

pub struct LlmTrendAnalyzer {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

impl LlmTrendAnalyzer {
    pub fn new(
        url: String,
        api_key: Option<String>,
        model: String,
        timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url, api_key, model })
    }
}

pub fn build_request(model: &str, attendance_json: &str) -> Value {
    json!({
        "model": model,
        "response_format": { "type": "json_object" },
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": format!("Attendance Data: {}", attendance_json) }
        ]
    })
}

/// Pulls the analysis out of a chat-completions response body.
pub fn parse_reply(body: &Value) -> Result<TrendAnalysis, AnalysisError> {
    let content = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| AnalysisError::MalformedReply("missing message content".into()))?;

    // some models wrap JSON in a markdown fence
    let content = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    serde_json::from_str(content).map_err(|e| AnalysisError::MalformedReply(e.to_string()))
}

#[async_trait]
impl TrendAnalyzer for LlmTrendAnalyzer {
    async fn analyze(&self, attendance_json: &str) -> Result<TrendAnalysis, AnalysisError> {
        let mut request = self
            .client
            .post(&self.url)
            .json(&build_request(&self.model, attendance_json));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!(url = %self.url, model = %self.model, "Sending analysis request");
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %body, "Analysis service returned an error");
            return Err(AnalysisError::Upstream(format!("status {}", status)));
        }

        let body: Value = response.json().await?;
        parse_reply(&body)
    }
}

/// Serializes the full ledger and hands it to the analyzer.
pub async fn run_attendance_analysis(
    ledger: &dyn AttendanceLedger,
    analyzer: Option<&dyn TrendAnalyzer>,
) -> Result<TrendAnalysis, AnalysisError> {
    let analyzer = analyzer.ok_or(AnalysisError::NotConfigured)?;

    let records = ledger
        .list(&AttendanceFilter::default())
        .await
        .map_err(AnalysisError::Ledger)?;
    let attendance_json = serde_json::to_string_pretty(&records)
        .map_err(|e| AnalysisError::Ledger(StoreError::CorruptRow(e.to_string())))?;

    info!(records = records.len(), "Running attendance analysis");
    analyzer.analyze(&attendance_json).await
}
