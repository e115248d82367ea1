//! Provider-shaped payloads -> canonical records.
//!
//! Neither transformer windows by period; the aggregator applies the lookback
//! filter after merging. Provider row labels become canonical metric labels
//! directly, with no remapping.

use peers_core::CompanyFinancials;

use crate::finnhub::ReportedFinancials;
use crate::yahoo::{StatementTable, YahooSnapshot};

/// `"2024-03-31"` -> `"2024-Q1"`. Falls back to the raw string when the
/// period key is not a date.
fn quarterly_label(period: &str) -> String {
    let mut parts = period.splitn(3, '-');
    let year = parts.next().and_then(|y| y.parse::<i32>().ok());
    let month = parts.next().and_then(|m| m.parse::<u32>().ok());
    match (year, month) {
        (Some(year), Some(month)) if (1..=12).contains(&month) => {
            format!("{}-Q{}", year, (month - 1) / 3 + 1)
        }
        _ => period.to_string(),
    }
}

fn annual_label(period: &str) -> String {
    period.chars().take(4).collect()
}

fn fold_table(
    record: &mut CompanyFinancials,
    table: &StatementTable,
    label_for: impl Fn(&str) -> String,
) {
    for (period, rows) in table {
        let period_label = label_for(period);
        for (label, value) in rows {
            if let Some(value) = value {
                record.push_point(label, period_label.clone(), *value);
            }
        }
    }
}

/// Yahoo's four tabular views -> canonical record. Annual periods shorten to
/// the year; quarterly periods map their month onto a fiscal quarter.
pub fn transform_yahoo(ticker: &str, snapshot: &YahooSnapshot) -> CompanyFinancials {
    let mut record = CompanyFinancials::new(ticker);

    let annual = &snapshot.annual;
    fold_table(&mut record, &annual.financials, annual_label);
    fold_table(&mut record, &annual.cashflow, annual_label);
    fold_table(&mut record, &annual.balance_sheet, annual_label);

    let quarterly = &snapshot.quarterly;
    fold_table(&mut record, &quarterly.financials, quarterly_label);
    fold_table(&mut record, &quarterly.cashflow, quarterly_label);
    fold_table(&mut record, &quarterly.balance_sheet, quarterly_label);

    record.sort_series();
    record
}

/// Finnhub reported financials -> canonical record. Annual reports land on Q4
/// of their fiscal year; quarterly reports use the report's own quarter.
/// Entries missing a year or quarter are skipped.
pub fn transform_finnhub(ticker: &str, reports: &ReportedFinancials) -> CompanyFinancials {
    let mut record = CompanyFinancials::new(ticker);

    for (freq, freq_reports) in [("quarterly", &reports.quarterly), ("annual", &reports.annual)] {
        for entry in &freq_reports.data {
            let Some(year) = entry.year.filter(|y| *y != 0) else {
                continue;
            };
            let quarter = if freq == "annual" {
                4
            } else {
                match entry.quarter {
                    Some(q) if q != 0 => q,
                    _ => continue,
                }
            };
            let period = format!("{year}-Q{quarter}");

            for items in [&entry.report.ic, &entry.report.bs, &entry.report.cf] {
                for item in items {
                    let Some(label) = item.label.as_deref() else {
                        continue;
                    };
                    let Some(value) = item.value.as_ref().and_then(|v| v.as_f64()) else {
                        continue;
                    };
                    record.push_point(label, period.clone(), value);
                }
            }
        }
    }

    record.sort_series();
    record
}
