//! Pass/fail evaluation of a run record against a target table.
//!
//! Throughput-style metrics are aggregated over successful outcomes only:
//! IOPS and MB/s are summed (jobs share the device concurrently), p99 latency
//! takes the worst job. A configured target with nothing to source it from
//! fails with an explicit no-data actual.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::outcome::RunRecord;
use crate::profile::{ProfileConfig, TargetTable};

/// Which measured quantity a check looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Iops,
    Throughput,
    LatencyP99,
    Power,
}

impl Metric {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Iops => "IOPS",
            Self::Throughput => "Throughput",
            Self::LatencyP99 => "Latency p99",
            Self::Power => "Power",
        }
    }

    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Iops => "IOPS",
            Self::Throughput => "MB/s",
            Self::LatencyP99 => "us",
            Self::Power => "W",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = "<=")]
    AtMost,
}

impl Comparator {
    #[must_use]
    pub fn holds(self, actual: f64, target: f64) -> bool {
        match self {
            Self::AtLeast => actual >= target,
            Self::AtMost => actual <= target,
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::AtLeast => ">=",
            Self::AtMost => "<=",
        }
    }
}

/// Actual value of a check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ActualValue {
    Measured(f64),
    NoData,
}

impl ActualValue {
    #[must_use]
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Measured(v) => Some(v),
            Self::NoData => None,
        }
    }
}

impl fmt::Display for ActualValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Measured(v) => write!(f, "{v}"),
            Self::NoData => f.write_str("no data"),
        }
    }
}

/// One metric comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    pub metric: Metric,
    pub name: String,
    pub passed: bool,
    pub actual: ActualValue,
    pub target: f64,
    pub comparator: Comparator,
}

/// Ordered checks plus the overall result (AND over all checks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub checks: Vec<Check>,
    pub passed: bool,
}

impl Verdict {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        if self.passed { "PASS" } else { "FAIL" }
    }

    #[must_use]
    pub fn check(&self, metric: Metric) -> Option<&Check> {
        self.checks.iter().find(|c| c.metric == metric)
    }
}

impl ProfileConfig {
    /// Target table with the power limit standing in for a missing power target.
    #[must_use]
    pub fn effective_targets(&self) -> TargetTable {
        let mut targets = *self.targets();
        if targets.power_avg_watts_max.is_none() {
            targets.power_avg_watts_max = self.power_limit_watts();
        }
        targets
    }
}

fn aggregate(record: &RunRecord, metric: Metric) -> ActualValue {
    if metric == Metric::Power {
        return record
            .power_stats
            .avg_watts()
            .map_or(ActualValue::NoData, ActualValue::Measured);
    }
    let values: Vec<f64> = record
        .successful()
        .filter_map(|o| o.metrics)
        .filter_map(|m| match metric {
            Metric::Iops => Some(m.iops),
            Metric::Throughput => Some(m.throughput_mbps),
            Metric::LatencyP99 | Metric::Power => m.latency_p99_us,
        })
        .collect();
    if values.is_empty() {
        return ActualValue::NoData;
    }
    let combined = match metric {
        Metric::LatencyP99 => values.iter().copied().fold(f64::MIN, f64::max),
        _ => values.iter().sum(),
    };
    ActualValue::Measured(combined)
}

/// Compare a run record against targets. Pure and deterministic.
#[must_use]
pub fn evaluate(record: &RunRecord, targets: &TargetTable) -> Verdict {
    let configured = [
        (Metric::Iops, targets.iops_min, Comparator::AtLeast),
        (Metric::Throughput, targets.throughput_mbps_min, Comparator::AtLeast),
        (Metric::LatencyP99, targets.latency_p99_us_max, Comparator::AtMost),
        (Metric::Power, targets.power_avg_watts_max, Comparator::AtMost),
    ];

    let checks: Vec<Check> = configured
        .into_iter()
        .filter_map(|(metric, target, comparator)| {
            let target = target?;
            let actual = aggregate(record, metric);
            let passed = actual
                .value()
                .is_some_and(|value| comparator.holds(value, target));
            Some(Check {
                metric,
                name: metric.label().to_string(),
                passed,
                actual,
                target,
                comparator,
            })
        })
        .collect();

    let passed = checks.iter().all(|c| c.passed);
    Verdict { checks, passed }
}
