//! Report command handlers.

use crate::aggregate::{QuarterlyData, TrendData};
use crate::api::{fetch_ledger, Filter};
use crate::commands::{Context, Out};
use crate::error::{ErrorType, IntoResult};
use crate::report::{
    check_quarterly, check_trends, FinancialTrends, QuarterlyReport, ReportRequestor,
    TextGenerator,
};
use crate::Result;
use tracing::info;

/// Handles `churchbooks report quarterly`: summarizes the last three full months.
/// `make_generator` is only called once there is data to send.
///
/// # Errors
/// - A `Store` error if the records cannot be fetched.
/// - A `Generation` error if there are no records in the quarter or the model fails.
/// - Any error from `make_generator`.
pub async fn report_quarterly<G, F>(
    ctx: &Context,
    make_generator: F,
) -> Result<Out<QuarterlyReport>>
where
    G: TextGenerator,
    F: FnOnce() -> Result<G>,
{
    let filter = Filter::within(QuarterlyData::range(ctx.today()));
    let ledger = fetch_ledger(ctx.store(), &filter)
        .await
        .pub_result(ErrorType::Store)?;
    let data = QuarterlyData::from_ledger(&ledger, ctx.today());
    check_quarterly(&data)?;
    let generator = make_generator()?;
    info!("Generating the report for {}", data.quarter);
    let report = ReportRequestor::new(&generator).quarterly(&data).await?;
    let body = format!("{}\n\n{}", data.quarter, report.report_summary.trim());
    Ok(Out::new("Generated the quarterly report", report).with_body(body))
}

/// Handles `churchbooks report trends`: looks for trends in the last twelve months.
///
/// # Errors
/// The same as `report_quarterly`.
pub async fn report_trends<G, F>(
    ctx: &Context,
    make_generator: F,
) -> Result<Out<FinancialTrends>>
where
    G: TextGenerator,
    F: FnOnce() -> Result<G>,
{
    let range = TrendData::range(ctx.today());
    let ledger = fetch_ledger(ctx.store(), &Filter::within(range))
        .await
        .pub_result(ErrorType::Store)?;
    let data = TrendData::from_ledger(&ledger, ctx.today());
    check_trends(&data)?;
    let generator = make_generator()?;
    info!(
        "Identifying trends from {} to {}",
        range.start(),
        range.end()
    );
    let trends = ReportRequestor::new(&generator).trends(&data).await?;
    let body = format!(
        "Trends\n{}\n\nInsights\n{}\n\nRecommendations\n{}",
        trends.trends.trim(),
        trends.insights.trim(),
        trends.recommendations.trim()
    );
    Ok(Out::new("Identified financial trends", trends).with_body(body))
}
