use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::db::CompanyFacts;

const BASE_URL: &str = "https://finnhub.io/api/v1/stock/financials-reported";

#[derive(Deserialize)]
struct ReportedResponse {
    symbol: Option<String>,
    cik: Option<String>,
    #[serde(default)]
    data: Vec<AnnualReport>,
}

#[derive(Deserialize)]
struct AnnualReport {
    year: Option<i32>,
    #[serde(rename = "startDate")]
    start_date: Option<String>,
    #[serde(rename = "endDate")]
    end_date: Option<String>,
    report: ReportBody,
}

#[derive(Deserialize)]
struct ReportBody {
    /// Balance sheet line items.
    #[serde(default)]
    bs: Vec<LineItem>,
    /// Income statement line items.
    #[serde(default)]
    ic: Vec<LineItem>,
}

#[derive(Deserialize)]
struct LineItem {
    label: Option<String>,
    value: Option<serde_json::Value>,
}

/// Fetch the latest annual reported financials for `symbol`. Returns None
/// (with a warning) when Finnhub has no filings for the symbol.
pub async fn fetch_financials(
    client: &reqwest::Client,
    api_key: &str,
    symbol: &str,
) -> Result<Option<CompanyFacts>> {
    info!("Fetching annual financials for {}", symbol);
    let resp: ReportedResponse = client
        .get(BASE_URL)
        .query(&[("symbol", symbol), ("freq", "annual"), ("token", api_key)])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
        .with_context(|| format!("Malformed Finnhub response for {}", symbol))?;

    let Some(report) = resp.data.first() else {
        warn!("No financial data found for {}", symbol);
        return Ok(None);
    };

    Ok(Some(CompanyFacts {
        symbol: resp.symbol.unwrap_or_else(|| symbol.to_string()),
        cik: resp.cik,
        fiscal_year: report.year,
        start_date: report.start_date.clone(),
        end_date: report.end_date.clone(),
        revenue: find_value(&report.report.ic, "Revenues"),
        net_income: find_value(&report.report.ic, "Net income"),
        assets: find_value(&report.report.bs, "Total assets"),
        liabilities: find_value(&report.report.bs, "Total liabilities"),
    }))
}

/// Find a line item by label, case-insensitively. Filings report values as
/// either JSON numbers or numeric strings.
fn find_value(items: &[LineItem], label: &str) -> Option<i64> {
    items
        .iter()
        .find(|item| {
            item.label
                .as_deref()
                .is_some_and(|l| l.eq_ignore_ascii_case(label))
        })
        .and_then(|item| item.value.as_ref())
        .and_then(as_i64)
}

fn as_i64(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    }
}

// ── Tests ──
