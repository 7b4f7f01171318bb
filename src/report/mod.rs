//! Narrative reports written by a text-generation model from aggregated figures.
//!
//! Only the aggregated payload leaves the machine, never individual records. A payload with
//! nothing in it is refused before the model is called.

mod gemini;

pub use gemini::Gemini;

use crate::aggregate::{Payload, QuarterlyData, TrendData};
use crate::error::{ErrorType, IntoResult};
use crate::Result;
use anyhow::{anyhow, ensure, Context};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

/// Something that can answer a prompt with JSON shaped like `output_schema`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, output_schema: Value) -> Result<Value>;
}

#[async_trait]
impl<'a, T: TextGenerator + ?Sized> TextGenerator for &'a T {
    async fn generate(&self, prompt: &str, output_schema: Value) -> Result<Value> {
        (**self).generate(prompt, output_schema).await
    }
}

/// Fails with a `Generation` error if there is nothing in `data` for a quarterly report.
pub fn check_quarterly(data: &QuarterlyData) -> Result<()> {
    refuse_empty::<_, QuarterlyReport>(data)
}

/// Fails with a `Generation` error if there is nothing in `data` to find trends in.
pub fn check_trends(data: &TrendData) -> Result<()> {
    refuse_empty::<_, FinancialTrends>(data)
}

fn refuse_empty<P: Payload, R: Report>(payload: &P) -> Result<()> {
    if payload.is_empty() {
        return Err(anyhow!(R::NO_DATA)).pub_result(ErrorType::Generation);
    }
    Ok(())
}

/// A summary of the last quarter's finances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuarterlyReport {
    /// A summary report of the financial data from the past quarter.
    pub report_summary: String,
}

/// Observations about a year of monthly income and expenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinancialTrends {
    /// The significant trends in income and expenses over the period.
    pub trends: String,
    /// What the trends suggest about the church's financial health.
    pub insights: String,
    /// Practical recommendations based on the trends and insights.
    pub recommendations: String,
}

/// A kind of report the model can be asked for.
trait Report: DeserializeOwned + JsonSchema {
    /// What the model is asked to do with the data.
    const INSTRUCTION: &'static str;
    /// Shown to the user when generation fails.
    const FAILURE: &'static str;
    /// Shown to the user when there is nothing to report on.
    const NO_DATA: &'static str;

    fn is_empty(&self) -> bool;
}

impl Report for QuarterlyReport {
    const INSTRUCTION: &'static str = "You are a financial expert. Generate a summary report of \
        the financial data from the past quarter.";
    const FAILURE: &'static str = "Failed to generate report. Please try again.";
    const NO_DATA: &'static str = "There are no income or expense records in the last three \
        full months to generate a report from.";

    fn is_empty(&self) -> bool {
        self.report_summary.trim().is_empty()
    }
}

impl Report for FinancialTrends {
    const INSTRUCTION: &'static str = "You are a financial analyst for a church. Analyze the \
        monthly income and expenses below. Identify the significant trends, explain what they \
        suggest about the church's finances, and give practical recommendations.";
    const FAILURE: &'static str = "Failed to identify trends. Please try again.";
    const NO_DATA: &'static str =
        "There are no income or expense records in the last twelve months to identify trends in.";

    fn is_empty(&self) -> bool {
        self.trends.trim().is_empty()
            && self.insights.trim().is_empty()
            && self.recommendations.trim().is_empty()
    }
}

/// The input handed to the model: the payload as a pretty-printed JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportInput {
    financial_data: String,
}

impl ReportInput {
    fn new<P: Payload>(payload: &P) -> Result<Self> {
        let financial_data =
            serde_json::to_string_pretty(payload).context("Unable to serialize the report data")?;
        Ok(Self { financial_data })
    }

    fn prompt(&self, instruction: &str) -> String {
        format!("{instruction}\n\nFinancial Data: {}", self.financial_data)
    }
}

/// Sends aggregated payloads to a `TextGenerator` and reads back the report.
pub struct ReportRequestor<'a> {
    generator: &'a dyn TextGenerator,
}

impl<'a> ReportRequestor<'a> {
    pub fn new(generator: &'a dyn TextGenerator) -> Self {
        Self { generator }
    }

    /// Asks for a quarterly summary of `data`.
    ///
    /// # Errors
    /// A `Generation` error if `data` is empty, if the model cannot be reached, or if its reply
    /// is empty or does not have the expected shape.
    pub async fn quarterly(&self, data: &QuarterlyData) -> Result<QuarterlyReport> {
        self.request(data).await
    }

    /// Asks for trends, insights and recommendations from twelve months of `data`.
    ///
    /// # Errors
    /// The same as `quarterly`.
    pub async fn trends(&self, data: &TrendData) -> Result<FinancialTrends> {
        self.request(data).await
    }

    async fn request<P, R>(&self, payload: &P) -> Result<R>
    where
        P: Payload + Sync,
        R: Report,
    {
        refuse_empty::<P, R>(payload)?;
        let input = ReportInput::new(payload)?;
        trace!("Report input:\n{}", input.financial_data);
        self.generate::<R>(&input)
            .await
            .context(R::FAILURE)
            .pub_result(ErrorType::Generation)
    }

    async fn generate<R: Report>(&self, input: &ReportInput) -> Result<R> {
        let schema = output_schema::<R>()?;
        let reply = self
            .generator
            .generate(&input.prompt(R::INSTRUCTION), schema)
            .await?;
        debug!("Model reply: {reply}");
        let report: R =
            serde_json::from_value(reply).context("The model's reply has an unexpected shape")?;
        ensure!(!report.is_empty(), "The model returned an empty report");
        Ok(report)
    }
}

/// The JSON schema of `R`, trimmed to the keywords generation APIs accept.
fn output_schema<R: JsonSchema>() -> Result<Value> {
    let mut schema = serde_json::to_value(schemars::schema_for!(R))
        .context("Unable to build the report schema")?;
    strip_keywords(&mut schema);
    Ok(schema)
}

fn strip_keywords(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in ["$schema", "$id", "title", "additionalProperties"] {
                map.remove(key);
            }
            map.values_mut().for_each(strip_keywords);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_keywords),
        _ => {}
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::aggregate::tests::{date, sample_ledger};
    use crate::error::error_type;
    use crate::model::Ledger;
    use serde_json::json;
    use std::sync::Mutex;

    /// A generator that answers with a fixed reply and remembers its prompts.
    pub(crate) struct FakeGenerator {
        reply: std::result::Result<Value, String>,
        pub(crate) prompts: Mutex<Vec<(String, Value)>>,
    }

    impl FakeGenerator {
        pub(crate) fn replying(reply: Value) -> Self {
            Self {
                reply: Ok(reply),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        async fn generate(&self, prompt: &str, output_schema: Value) -> Result<Value> {
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), output_schema));
            self.reply.clone().map_err(|e| anyhow!(e))
        }
    }

    #[tokio::test]
    async fn test_empty_payload_never_reaches_generator() {
        let generator = FakeGenerator::replying(json!({"reportSummary": "All good"}));
        let requestor = ReportRequestor::new(&generator);
        let empty = Ledger::default();

        let err = requestor
            .quarterly(&QuarterlyData::from_ledger(&empty, date("2024-06-15")))
            .await
            .unwrap_err();
        assert_eq!(error_type(&err), Some(ErrorType::Generation));
        assert!(err.to_string().contains("no income or expense records"));

        let err = requestor
            .trends(&TrendData::from_ledger(&empty, date("2024-06-15")))
            .await
            .unwrap_err();
        assert_eq!(error_type(&err), Some(ErrorType::Generation));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_quarterly_report() {
        let generator = FakeGenerator::replying(json!({"reportSummary": "Giving rose in March."}));
        let requestor = ReportRequestor::new(&generator);
        let data = QuarterlyData::from_ledger(&sample_ledger(), date("2024-06-15"));

        let report = requestor.quarterly(&data).await.unwrap();
        assert_eq!(report.report_summary, "Giving rose in March.");

        let prompts = generator.prompts.lock().unwrap();
        let (prompt, schema) = &prompts[0];
        assert!(prompt.starts_with(QuarterlyReport::INSTRUCTION));
        assert!(prompt.contains("Financial Data: {"));
        assert!(prompt.contains("\"summary_notes\""));
        assert!(prompt.contains("Q2 2024"));
        assert!(schema["properties"]["reportSummary"].is_object());
        assert_eq!(schema["required"], json!(["reportSummary"]));
    }

    #[tokio::test]
    async fn test_trends_report() {
        let generator = FakeGenerator::replying(json!({
            "trends": "Expenses peak in May.",
            "insights": "",
            "recommendations": "Plan rent ahead."
        }));
        let requestor = ReportRequestor::new(&generator);
        let data = TrendData::from_ledger(&sample_ledger(), date("2024-06-15"));

        let trends = requestor.trends(&data).await.unwrap();
        assert_eq!(trends.trends, "Expenses peak in May.");
        assert_eq!(trends.insights, "");

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].0.contains("\"monthly_records\""));
    }

    #[tokio::test]
    async fn test_generator_failure_is_generic() {
        let generator = FakeGenerator::failing("503 Service Unavailable");
        let requestor = ReportRequestor::new(&generator);
        let data = QuarterlyData::from_ledger(&sample_ledger(), date("2024-06-15"));

        let err = requestor.quarterly(&data).await.unwrap_err();
        assert_eq!(error_type(&err), Some(ErrorType::Generation));
        assert!(err
            .to_string()
            .contains("Failed to generate report. Please try again."));
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_reply_is_an_error() {
        let generator = FakeGenerator::replying(json!({
            "trends": " ",
            "insights": "",
            "recommendations": ""
        }));
        let requestor = ReportRequestor::new(&generator);
        let data = TrendData::from_ledger(&sample_ledger(), date("2024-06-15"));

        let err = requestor.trends(&data).await.unwrap_err();
        assert!(format!("{err:#}").contains("empty report"));
    }

    #[tokio::test]
    async fn test_misshapen_reply_is_an_error() {
        let generator = FakeGenerator::replying(json!({"summary": "wrong key"}));
        let requestor = ReportRequestor::new(&generator);
        let data = QuarterlyData::from_ledger(&sample_ledger(), date("2024-06-15"));
        let err = requestor.quarterly(&data).await.unwrap_err();
        assert!(format!("{err:#}").contains("unexpected shape"));
    }

    #[test]
    fn test_check_payloads() {
        let empty = Ledger::default();
        let err = check_quarterly(&QuarterlyData::from_ledger(&empty, date("2024-06-15")))
            .unwrap_err();
        assert_eq!(error_type(&err), Some(ErrorType::Generation));
        assert!(check_trends(&TrendData::from_ledger(&empty, date("2024-06-15"))).is_err());
        assert!(
            check_quarterly(&QuarterlyData::from_ledger(&sample_ledger(), date("2024-06-15")))
                .is_ok()
        );
    }

    #[test]
    fn test_output_schema_is_trimmed() {
        let schema = output_schema::<FinancialTrends>().unwrap();
        assert!(schema.get("$schema").is_none());
        assert!(schema.get("title").is_none());
        assert_eq!(schema["type"], json!("object"));
        for field in ["trends", "insights", "recommendations"] {
            assert_eq!(schema["properties"][field]["type"], json!("string"));
        }
    }
}
