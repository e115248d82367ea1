//! FMP statement entries -> canonical record.

use peers_core::{CompanyFinancials, FiscalQuarter, PeriodWindow};
use serde_json::Value;

fn entry_year(entry: &Value) -> Option<i32> {
    let v = entry.get("fiscalYear")?;
    v.as_i64()
        .map(|y| y as i32)
        .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

/// Build a canonical record from the flat statement list.
///
/// Entries are grouped by `(fiscalYear, period)`; only the caller-supplied
/// metric labels pass through, and only periods inside `window`. This is the
/// one transformer that windows here rather than in the aggregator, because
/// the metric allow-list is per-request.
pub fn transform_statements(
    ticker: &str,
    entries: &[Value],
    metrics: &[String],
    window: &PeriodWindow,
) -> CompanyFinancials {
    let mut record = CompanyFinancials::new(ticker);

    for entry in entries {
        let Some(year) = entry_year(entry) else {
            continue;
        };
        let Some(period) = entry.get("period").and_then(|v| v.as_str()) else {
            continue;
        };
        let Some(quarter) = period.strip_prefix('Q').and_then(|q| q.parse::<u32>().ok()) else {
            continue;
        };

        if !window.contains(FiscalQuarter::new(year, quarter)) {
            continue;
        }

        let label = format!("{year}-{period}");
        for metric in metrics {
            if let Some(value) = entry.get(metric).and_then(|v| v.as_f64()) {
                record.push_point(metric, label.clone(), value);
            }
        }
    }

    record.sort_series();
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn window() -> PeriodWindow {
        PeriodWindow::for_range("1Y", NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
    }

    fn metrics(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn maps_one_entry_into_a_series() {
        let entries = vec![json!({"fiscalYear": 2024, "period": "Q1", "revenue": 1000.0})];
        let record = transform_statements("AAPL", &entries, &metrics(&["revenue"]), &window());

        assert_eq!(record.ticker, "AAPL");
        let series = &record.financials["revenue"];
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].period, "2024-Q1");
        assert_eq!(series[0].value, Some(1000.0));
    }

    #[test]
    fn accepts_string_fiscal_year() {
        let entries = vec![json!({"fiscalYear": "2024", "period": "Q1", "revenue": 5.0})];
        let record = transform_statements("AAPL", &entries, &metrics(&["revenue"]), &window());
        assert_eq!(record.financials["revenue"][0].period, "2024-Q1");
    }

    #[test]
    fn drops_periods_outside_the_window() {
        let entries = vec![
            json!({"fiscalYear": 2022, "period": "Q1", "revenue": 1.0}),
            json!({"fiscalYear": 2024, "period": "Q1", "revenue": 2.0}),
            // Future quarter past today's.
            json!({"fiscalYear": 2024, "period": "Q4", "revenue": 3.0}),
        ];
        let record = transform_statements("AAPL", &entries, &metrics(&["revenue"]), &window());
        let series = &record.financials["revenue"];
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].period, "2024-Q1");
    }

    #[test]
    fn only_requested_metrics_pass_through() {
        let entries = vec![json!({
            "fiscalYear": 2024,
            "period": "Q1",
            "revenue": 1.0,
            "netIncome": 2.0,
        })];
        let record = transform_statements("AAPL", &entries, &metrics(&["netIncome"]), &window());
        assert!(record.financials.contains_key("netIncome"));
        assert!(!record.financials.contains_key("revenue"));
    }

    #[test]
    fn skips_entries_missing_year_or_period() {
        let entries = vec![
            json!({"period": "Q1", "revenue": 1.0}),
            json!({"fiscalYear": 2024, "revenue": 2.0}),
            json!({"error": "timed out", "source": "income-statement"}),
            json!({"fiscalYear": 2024, "period": "FY", "revenue": 3.0}),
        ];
        let record = transform_statements("AAPL", &entries, &metrics(&["revenue"]), &window());
        assert!(record.financials.is_empty());
    }

    #[test]
    fn null_metric_values_are_omitted() {
        let entries = vec![json!({"fiscalYear": 2024, "period": "Q1", "revenue": null})];
        let record = transform_statements("AAPL", &entries, &metrics(&["revenue"]), &window());
        assert!(record.financials.is_empty());
    }

    #[test]
    fn series_comes_out_sorted() {
        let entries = vec![
            json!({"fiscalYear": 2024, "period": "Q2", "revenue": 2.0}),
            json!({"fiscalYear": 2023, "period": "Q4", "revenue": 1.0}),
            json!({"fiscalYear": 2023, "period": "Q3", "revenue": 0.5}),
        ];
        let record = transform_statements("AAPL", &entries, &metrics(&["revenue"]), &window());
        let periods: Vec<&str> = record.financials["revenue"]
            .iter()
            .map(|p| p.period.as_str())
            .collect();
        assert_eq!(periods, vec!["2023-Q3", "2023-Q4", "2024-Q2"]);
    }
}
