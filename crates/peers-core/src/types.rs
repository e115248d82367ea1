use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::period::cmp_period_labels;
use crate::sanitize::sanitize_f64;

/// One observation of a metric in a fiscal period.
///
/// `value` is `None` only when a provider reported a non-finite number;
/// points are never silently omitted for that reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub period: String,
    pub value: Option<f64>,
}

/// Metric label -> chronologically sorted series.
pub type MetricSeries = BTreeMap<String, Vec<DataPoint>>;

/// Canonical per-ticker record produced fresh for every request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyFinancials {
    pub ticker: String,
    pub financials: MetricSeries,
}

impl CompanyFinancials {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            financials: MetricSeries::new(),
        }
    }

    /// Append a point to a metric's series, mapping non-finite values to null.
    pub fn push_point(&mut self, metric: &str, period: impl Into<String>, value: f64) {
        self.financials
            .entry(metric.to_string())
            .or_default()
            .push(DataPoint {
                period: period.into(),
                value: sanitize_f64(value),
            });
    }

    /// Sort every metric's series chronologically. Idempotent.
    pub fn sort_series(&mut self) {
        for series in self.financials.values_mut() {
            series.sort_by(|a, b| cmp_period_labels(&a.period, &b.period));
        }
    }

    /// Merge another record for the same ticker into this one. Series for a
    /// metric reported by both sides are concatenated, not deduplicated.
    pub fn absorb(&mut self, other: CompanyFinancials) {
        for (metric, points) in other.financials {
            self.financials.entry(metric).or_default().extend(points);
        }
    }
}
