//! Power sampling session and aggregate statistics.
//!
//! The sampler is the sole writer of its sample buffer. `start()` clears the
//! buffer, `stop()` freezes it, and `sample()` outside a session contributes
//! nothing.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PowerReadError;

/// Something that can return one instantaneous watt reading.
pub trait PowerSource: Send {
    fn read_watts(&mut self) -> Result<f64, PowerReadError>;
}

impl<F> PowerSource for F
where
    F: FnMut() -> Result<f64, PowerReadError> + Send,
{
    fn read_watts(&mut self) -> Result<f64, PowerReadError> {
        self()
    }
}

/// One power reading.
///
/// `valid == false` marks the zero-reading returned when no session is active
/// or the sensor failed; such markers are never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerSample {
    pub watts: f64,
    /// Milliseconds since the session started (monotonic clock).
    pub offset_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub valid: bool,
}

impl PowerSample {
    fn marker() -> Self {
        Self {
            watts: 0.0,
            offset_ms: 0,
            timestamp: Utc::now(),
            valid: false,
        }
    }
}

/// Aggregates over a non-empty sample set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerStats {
    pub avg_watts: f64,
    pub min_watts: f64,
    pub max_watts: f64,
    pub p99_watts: f64,
    pub sample_count: usize,
}

/// Aggregate statistics, or an explicit marker that nothing was sampled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PowerStatistics {
    NoData,
    Measured(PowerStats),
}

impl PowerStatistics {
    #[must_use]
    pub const fn avg_watts(&self) -> Option<f64> {
        match self {
            Self::NoData => None,
            Self::Measured(stats) => Some(stats.avg_watts),
        }
    }

    #[must_use]
    pub const fn sample_count(&self) -> usize {
        match self {
            Self::NoData => 0,
            Self::Measured(stats) => stats.sample_count,
        }
    }
}

/// Index of the 99th percentile in an ascending slice of length `n`:
/// `floor(n * 0.99)` clamped to the last valid index.
#[must_use]
pub fn p99_index(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let idx = (n as f64 * 0.99).floor() as usize;
    idx.min(n - 1)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Compute aggregates over raw watt values.
#[must_use]
pub fn compute_statistics(watts: &[f64]) -> PowerStatistics {
    if watts.is_empty() {
        return PowerStatistics::NoData;
    }
    let mut sorted = watts.to_vec();
    sorted.sort_by(f64::total_cmp);
    let avg = sorted.iter().sum::<f64>() / sorted.len() as f64;
    PowerStatistics::Measured(PowerStats {
        avg_watts: round_to(avg, 2),
        min_watts: sorted[0],
        max_watts: sorted[sorted.len() - 1],
        p99_watts: sorted[p99_index(sorted.len())],
        sample_count: sorted.len(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    Monitoring { started: Instant },
}

/// Power monitoring session over an external [`PowerSource`].
pub struct PowerSampler {
    source: Box<dyn PowerSource>,
    state: SessionState,
    samples: Vec<PowerSample>,
    read_failures: u64,
}

impl std::fmt::Debug for PowerSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerSampler")
            .field("state", &self.state)
            .field("samples", &self.samples.len())
            .field("read_failures", &self.read_failures)
            .finish_non_exhaustive()
    }
}

impl PowerSampler {
    pub fn new(source: impl PowerSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            state: SessionState::Idle,
            samples: Vec::new(),
            read_failures: 0,
        }
    }

    /// Begin a session, discarding samples of any previous one.
    pub fn start(&mut self) {
        self.samples.clear();
        self.read_failures = 0;
        self.state = SessionState::Monitoring {
            started: Instant::now(),
        };
        tracing::info!("power monitoring started");
    }

    /// End the session and freeze the buffer.
    pub fn stop(&mut self) {
        if matches!(self.state, SessionState::Monitoring { .. }) {
            tracing::info!(
                samples = self.samples.len(),
                read_failures = self.read_failures,
                "power monitoring stopped"
            );
        }
        self.state = SessionState::Idle;
    }

    #[must_use]
    pub const fn is_monitoring(&self) -> bool {
        matches!(self.state, SessionState::Monitoring { .. })
    }

    /// Take one reading. Returns an invalid marker while idle or when the
    /// sensor fails; only valid readings are appended.
    pub fn sample(&mut self) -> PowerSample {
        let SessionState::Monitoring { started } = self.state else {
            return PowerSample::marker();
        };
        match self.source.read_watts() {
            Ok(watts) if watts.is_finite() => {
                #[allow(clippy::cast_possible_truncation)]
                let sample = PowerSample {
                    watts,
                    offset_ms: started.elapsed().as_millis() as u64,
                    timestamp: Utc::now(),
                    valid: true,
                };
                self.samples.push(sample.clone());
                sample
            }
            Ok(watts) => {
                self.read_failures += 1;
                tracing::warn!(watts, "discarding non-finite power reading");
                PowerSample::marker()
            }
            Err(err) => {
                self.read_failures += 1;
                tracing::warn!(error = %err, "power read failed");
                PowerSample::marker()
            }
        }
    }

    #[must_use]
    pub fn samples(&self) -> &[PowerSample] {
        &self.samples
    }

    #[must_use]
    pub const fn read_failures(&self) -> u64 {
        self.read_failures
    }

    /// Aggregates over the current buffer. Safe to call at any time.
    #[must_use]
    pub fn statistics(&self) -> PowerStatistics {
        let watts: Vec<f64> = self.samples.iter().map(|s| s.watts).collect();
        compute_statistics(&watts)
    }

    /// Consume the sampler, yielding its frozen samples.
    #[must_use]
    pub fn into_samples(self) -> Vec<PowerSample> {
        self.samples
    }
}
