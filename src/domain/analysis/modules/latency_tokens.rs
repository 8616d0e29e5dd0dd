//! Latency & tokens overview - the built-in performance analysis module.
//!
//! Groups execution records by test unit and computes descriptive statistics
//! over `latency_ms` and `tokens_used`: averages, p95, extremes, totals, and
//! per-request throughput. Produces one result row per unit, short positional
//! labels, natural-language insights with structured details, and bar-chart
//! descriptors for the dashboard.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use super::super::context::AnalysisContext;
use super::super::dataset::{numeric, DataTable, JsonMap};
use super::super::definition::ModuleDefinition;
use super::super::errors::AnalysisError;
use super::super::handler::AnalysisHandler;
use super::super::result::{AnalysisResult, ColumnMeta};
use super::super::stats;
use super::units::{group_by_unit, UnitKey};

/// Stable identifier of the built-in module.
pub const MODULE_ID: &str = "latency_tokens_summary";

/// Columns of the result table, in output order.
const RESULT_COLUMNS: &[&str] = &[
    "unit_id",
    "unit_label",
    "unit_name",
    "sample_count",
    "avg_latency_ms",
    "p95_latency_ms",
    "max_latency_ms",
    "min_latency_ms",
    "avg_tokens",
    "p95_tokens",
    "max_tokens",
    "total_tokens",
    "avg_tokens_per_request",
    "avg_throughput_tokens_per_s",
];

/// Definition of the latency/tokens module.
pub fn definition() -> Result<ModuleDefinition, AnalysisError> {
    Ok(ModuleDefinition::new(MODULE_ID, "Latency & tokens overview")?
        .with_description(
            "Aggregates latency and token usage per test unit to assess performance and cost.",
        )
        .with_required_columns(["latency_ms", "tokens_used"])
        .with_tags(["performance", "cost"])
        .with_allow_llm(false))
}

/// Handler computing the per-unit performance summary.
#[derive(Debug, Default, Clone, Copy)]
pub struct LatencyTokensModule;

#[async_trait]
impl AnalysisHandler for LatencyTokensModule {
    async fn execute(
        &self,
        table: &DataTable,
        _params: &JsonMap,
        _context: &AnalysisContext,
    ) -> Result<AnalysisResult, AnalysisError> {
        let summaries = build_summaries(table);
        let (insights, details) = build_insights(&summaries);
        let charts = build_charts(&summaries);
        let links = build_unit_links(&summaries);

        let mut extra = JsonMap::new();
        extra.insert("module_id".to_string(), json!(MODULE_ID));
        extra.insert("charts".to_string(), serde_json::to_value(&charts)?);
        extra.insert("unit_links".to_string(), serde_json::to_value(&links)?);
        extra.insert("insight_details".to_string(), serde_json::to_value(&details)?);

        Ok(AnalysisResult::new(build_table(&summaries))
            .with_columns_meta(build_columns_meta())
            .with_insights(insights)
            .with_extra(extra))
    }
}

/// Per-unit aggregates. Metrics are `None` when their series is empty after
/// dropping non-numeric cells.
#[derive(Debug, Clone)]
struct UnitSummary {
    key: UnitKey,
    name: String,
    label: String,
    sample_count: usize,
    avg_latency_ms: Option<f64>,
    p95_latency_ms: Option<f64>,
    max_latency_ms: Option<f64>,
    min_latency_ms: Option<f64>,
    avg_tokens: Option<f64>,
    p95_tokens: Option<f64>,
    max_tokens: Option<i64>,
    total_tokens: Option<i64>,
    avg_tokens_per_request: Option<f64>,
    avg_throughput_tokens_per_s: Option<f64>,
}

fn build_summaries(table: &DataTable) -> Vec<UnitSummary> {
    group_by_unit(table)
        .into_iter()
        .map(|group| {
            let mut latencies = Vec::new();
            let mut tokens = Vec::new();
            let mut paired_tokens = Vec::new();
            let mut throughputs = Vec::new();

            for &index in &group.row_indices {
                let latency = table.cell(index, "latency_ms").and_then(numeric);
                let token_count = table.cell(index, "tokens_used").and_then(numeric);

                if let Some(l) = latency {
                    latencies.push(l);
                }
                if let Some(t) = token_count {
                    tokens.push(t);
                }
                if let (Some(l), Some(t)) = (latency, token_count) {
                    paired_tokens.push(t);
                    let rate = t / (l / 1000.0);
                    // Zero latency yields an infinite rate; drop it.
                    if rate.is_finite() {
                        throughputs.push(rate);
                    }
                }
            }

            UnitSummary {
                sample_count: group.row_indices.len(),
                avg_latency_ms: stats::mean(&latencies).map(stats::round2),
                p95_latency_ms: stats::percentile(&latencies, 0.95).map(stats::round2),
                max_latency_ms: stats::max(&latencies).map(stats::round2),
                min_latency_ms: stats::min(&latencies).map(stats::round2),
                avg_tokens: stats::mean(&tokens).map(stats::round2),
                p95_tokens: stats::percentile(&tokens, 0.95).map(stats::round2),
                max_tokens: stats::max(&tokens).map(|v| v as i64),
                total_tokens: if tokens.is_empty() {
                    None
                } else {
                    Some(tokens.iter().sum::<f64>() as i64)
                },
                avg_tokens_per_request: stats::mean(&paired_tokens).map(stats::round2),
                avg_throughput_tokens_per_s: stats::mean(&throughputs).map(stats::round2),
                key: group.key,
                name: group.name,
                label: group.label,
            }
        })
        .collect()
}

fn build_table(summaries: &[UnitSummary]) -> DataTable {
    let mut table = DataTable::new(RESULT_COLUMNS.iter().copied());
    for summary in summaries {
        let mut row = JsonMap::new();
        row.insert("unit_id".into(), summary.key.to_value());
        row.insert("unit_label".into(), json!(summary.label));
        row.insert("unit_name".into(), json!(summary.name));
        row.insert("sample_count".into(), json!(summary.sample_count));
        row.insert("avg_latency_ms".into(), opt_f64(summary.avg_latency_ms));
        row.insert("p95_latency_ms".into(), opt_f64(summary.p95_latency_ms));
        row.insert("max_latency_ms".into(), opt_f64(summary.max_latency_ms));
        row.insert("min_latency_ms".into(), opt_f64(summary.min_latency_ms));
        row.insert("avg_tokens".into(), opt_f64(summary.avg_tokens));
        row.insert("p95_tokens".into(), opt_f64(summary.p95_tokens));
        row.insert("max_tokens".into(), opt_i64(summary.max_tokens));
        row.insert("total_tokens".into(), opt_i64(summary.total_tokens));
        row.insert(
            "avg_tokens_per_request".into(),
            opt_f64(summary.avg_tokens_per_request),
        );
        row.insert(
            "avg_throughput_tokens_per_s".into(),
            opt_f64(summary.avg_throughput_tokens_per_s),
        );
        table.push_row(row);
    }
    table
}

fn opt_f64(value: Option<f64>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

fn opt_i64(value: Option<i64>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

fn build_columns_meta() -> Vec<ColumnMeta> {
    vec![
        ColumnMeta::new("unit_id", "Unit id"),
        ColumnMeta::new("unit_label", "Unit")
            .with_description("Short positional label, stable within one analysis."),
        ColumnMeta::new("unit_name", "Unit name"),
        ColumnMeta::new("sample_count", "Samples")
            .with_description("Rows in the unit, before dropping unparseable values.")
            .visualizable_as(["bar"]),
        ColumnMeta::new("avg_latency_ms", "Avg latency (ms)").visualizable_as(["bar"]),
        ColumnMeta::new("p95_latency_ms", "P95 latency (ms)")
            .with_description("Linear-interpolated 95th percentile.")
            .visualizable_as(["bar"]),
        ColumnMeta::new("max_latency_ms", "Max latency (ms)").visualizable_as(["bar"]),
        ColumnMeta::new("min_latency_ms", "Min latency (ms)").visualizable_as(["bar"]),
        ColumnMeta::new("avg_tokens", "Avg tokens").visualizable_as(["bar"]),
        ColumnMeta::new("p95_tokens", "P95 tokens").visualizable_as(["bar"]),
        ColumnMeta::new("max_tokens", "Max tokens").visualizable_as(["bar"]),
        ColumnMeta::new("total_tokens", "Total tokens").visualizable_as(["bar"]),
        ColumnMeta::new("avg_tokens_per_request", "Avg tokens/request")
            .with_description("Mean tokens over rows with both a latency and a token count.")
            .visualizable_as(["bar"]),
        ColumnMeta::new("avg_throughput_tokens_per_s", "Avg throughput (tokens/s)")
            .with_description("Mean of per-request tokens divided by latency; infinite rates dropped.")
            .visualizable_as(["bar"]),
    ]
}

/// Reference to a unit inside a structured insight detail.
#[derive(Debug, Clone, Serialize)]
struct UnitRef {
    id: Value,
    name: String,
    label: String,
    value: f64,
}

impl UnitRef {
    fn new(summary: &UnitSummary, value: f64) -> Self {
        Self {
            id: summary.key.to_value(),
            name: summary.name.clone(),
            label: summary.label.clone(),
            value,
        }
    }
}

/// Structured counterpart of an insight sentence.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum InsightDetail {
    LatencyComparison { fast: UnitRef, slow: UnitRef },
    SingleUnitLatency { unit: UnitRef },
    TokensPeak { unit: UnitRef },
    ThroughputPeak { unit: UnitRef },
}

fn build_insights(summaries: &[UnitSummary]) -> (Vec<String>, Vec<InsightDetail>) {
    let mut insights = Vec::new();
    let mut details = Vec::new();

    let with_latency: Vec<&UnitSummary> = summaries
        .iter()
        .filter(|s| s.avg_latency_ms.is_some())
        .collect();

    if with_latency.len() >= 2 {
        let fastest = select_by(&with_latency, |s| s.avg_latency_ms, false);
        let slowest = select_by(&with_latency, |s| s.avg_latency_ms, true);
        if let (Some((fast, fast_avg)), Some((slow, slow_avg))) = (fastest, slowest) {
            if fast.key != slow.key {
                insights.push(format!(
                    "Fastest unit is {} ({}) averaging {} ms; slowest is {} ({}) averaging {} ms.",
                    fast.label, fast.name, fast_avg, slow.label, slow.name, slow_avg
                ));
                details.push(InsightDetail::LatencyComparison {
                    fast: UnitRef::new(fast, fast_avg),
                    slow: UnitRef::new(slow, slow_avg),
                });
            } else if let Some(avg) = fast.avg_latency_ms {
                insights.push(single_latency_sentence(fast, avg));
                details.push(InsightDetail::SingleUnitLatency {
                    unit: UnitRef::new(fast, avg),
                });
            }
        }
    } else if let Some(only) = with_latency.first() {
        if let Some(avg) = only.avg_latency_ms {
            insights.push(single_latency_sentence(only, avg));
            details.push(InsightDetail::SingleUnitLatency {
                unit: UnitRef::new(only, avg),
            });
        }
    }

    let with_tokens: Vec<&UnitSummary> = summaries
        .iter()
        .filter(|s| s.avg_tokens_per_request.is_some())
        .collect();
    if let Some((peak, value)) = select_by(&with_tokens, |s| s.avg_tokens_per_request, true) {
        insights.push(format!(
            "{} ({}) consumes the most tokens per request, averaging {}.",
            peak.label, peak.name, value
        ));
        details.push(InsightDetail::TokensPeak {
            unit: UnitRef::new(peak, value),
        });
    }

    let with_throughput: Vec<&UnitSummary> = summaries
        .iter()
        .filter(|s| s.avg_throughput_tokens_per_s.is_some())
        .collect();
    if let Some((peak, value)) =
        select_by(&with_throughput, |s| s.avg_throughput_tokens_per_s, true)
    {
        insights.push(format!(
            "{} ({}) reaches the highest throughput at {} tokens/s.",
            peak.label, peak.name, value
        ));
        details.push(InsightDetail::ThroughputPeak {
            unit: UnitRef::new(peak, value),
        });
    }

    if insights.is_empty() {
        insights.push("Insufficient latency or token data to generate statistics.".to_string());
    }

    (insights, details)
}

fn single_latency_sentence(summary: &UnitSummary, avg: f64) -> String {
    format!(
        "Average latency for {} ({}) is {} ms.",
        summary.label, summary.name, avg
    )
}

/// Picks the unit with the extreme metric value; the first-encountered unit
/// wins ties.
fn select_by<'a, F>(
    candidates: &[&'a UnitSummary],
    metric: F,
    largest: bool,
) -> Option<(&'a UnitSummary, f64)>
where
    F: Fn(&UnitSummary) -> Option<f64>,
{
    let mut best: Option<(&UnitSummary, f64)> = None;
    for candidate in candidates {
        let value = match metric(candidate) {
            Some(value) => value,
            None => continue,
        };
        match best {
            None => best = Some((candidate, value)),
            Some((_, current)) => {
                let better = if largest { value > current } else { value < current };
                if better {
                    best = Some((candidate, value));
                }
            }
        }
    }
    best
}

/// Bar-chart descriptor for one metric across all units.
#[derive(Debug, Clone, Serialize)]
pub struct ChartConfig {
    /// Chart identifier, e.g. `avg_latency`.
    pub id: String,
    /// Chart title.
    pub title: String,
    /// One-line explanation.
    pub description: String,
    /// Chart kind; always `bar` here.
    pub chart_type: String,
    /// Unit of the value axis.
    pub value_unit: String,
    /// Category axis: unit labels in group order.
    pub categories: Vec<String>,
    /// Series values; units without the metric render as 0.
    pub series: Vec<f64>,
    /// Parallel arrays for cross-referencing categories to units.
    pub meta: ChartMeta,
}

/// Cross-reference block of a chart.
#[derive(Debug, Clone, Serialize)]
pub struct ChartMeta {
    /// Unit labels, parallel to `categories`.
    pub labels: Vec<String>,
    /// Canonical unit ids, parallel to `categories`.
    pub unit_ids: Vec<Value>,
    /// Unit display names, parallel to `categories`.
    pub unit_names: Vec<String>,
}

fn build_charts(summaries: &[UnitSummary]) -> Vec<ChartConfig> {
    type Extractor = fn(&UnitSummary) -> Option<f64>;
    let metrics: [(&str, &str, &str, &str, Extractor); 5] = [
        (
            "avg_latency",
            "Average latency per unit",
            "Mean request latency for each test unit.",
            "ms",
            |s| s.avg_latency_ms,
        ),
        (
            "p95_latency",
            "P95 latency per unit",
            "95th percentile latency for each test unit.",
            "ms",
            |s| s.p95_latency_ms,
        ),
        (
            "avg_tokens",
            "Average tokens per unit",
            "Mean token usage for each test unit.",
            "tokens",
            |s| s.avg_tokens,
        ),
        (
            "total_tokens",
            "Total tokens per unit",
            "Summed token usage for each test unit.",
            "tokens",
            |s| s.total_tokens.map(|v| v as f64),
        ),
        (
            "avg_throughput",
            "Average throughput per unit",
            "Mean tokens per second for each test unit.",
            "tokens/s",
            |s| s.avg_throughput_tokens_per_s,
        ),
    ];

    let mut charts = Vec::new();
    for (id, title, description, value_unit, extract) in metrics {
        let values: Vec<Option<f64>> = summaries.iter().map(extract).collect();
        if values.iter().all(Option::is_none) {
            // Entirely-null metrics get no chart rather than all-zero bars.
            continue;
        }
        charts.push(ChartConfig {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            chart_type: "bar".to_string(),
            value_unit: value_unit.to_string(),
            categories: summaries.iter().map(|s| s.label.clone()).collect(),
            series: values.into_iter().map(|v| v.unwrap_or(0.0)).collect(),
            meta: ChartMeta {
                labels: summaries.iter().map(|s| s.label.clone()).collect(),
                unit_ids: summaries.iter().map(|s| s.key.to_value()).collect(),
                unit_names: summaries.iter().map(|s| s.name.clone()).collect(),
            },
        });
    }
    charts
}

/// Maps a unit's identity to its short label for downstream highlighting.
#[derive(Debug, Clone, Serialize)]
pub struct UnitLink {
    /// Canonical unit id.
    pub unit_id: Value,
    /// Display name.
    pub unit_name: String,
    /// Short positional label.
    pub label: String,
}

fn build_unit_links(summaries: &[UnitSummary]) -> Vec<UnitLink> {
    summaries
        .iter()
        .map(|summary| UnitLink {
            unit_id: summary.key.to_value(),
            unit_name: summary.name.clone(),
            label: summary.label.clone(),
        })
        .collect()
}
