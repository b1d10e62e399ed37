//! Concrete power sources for the sampler.

use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

use regex::Regex;
use wlg_bench_core::{PowerReadError, PowerSource};

/// Simulated readings stay within this many watts of the configured limit.
pub const SIMULATED_SPREAD_WATTS: f64 = 2.0;

/// Upper bound on one external power command invocation.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Uniform readings in `[center - 2, center + 2]` W from a xorshift generator.
#[derive(Debug, Clone)]
pub struct SimulatedPowerSource {
    center_watts: f64,
    state: u64,
}

impl SimulatedPowerSource {
    #[must_use]
    pub fn new(center_watts: f64) -> Self {
        let mut seed = [0u8; 8];
        if getrandom::getrandom(&mut seed).is_err() {
            seed = 0x9E37_79B9_7F4A_7C15_u64.to_le_bytes();
        }
        Self::with_seed(center_watts, u64::from_le_bytes(seed))
    }

    #[must_use]
    pub const fn with_seed(center_watts: f64, seed: u64) -> Self {
        // xorshift has a fixed point at zero
        let state = if seed == 0 { 0x2545_F491_4F6C_DD1D } else { seed };
        Self {
            center_watts,
            state,
        }
    }

    const fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_unit(&mut self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let unit = (self.next_u64() >> 11) as f64 / (1_u64 << 53) as f64;
        unit
    }
}

impl PowerSource for SimulatedPowerSource {
    fn read_watts(&mut self) -> Result<f64, PowerReadError> {
        let offset = self.next_unit().mul_add(2.0, -1.0) * SIMULATED_SPREAD_WATTS;
        Ok(self.center_watts + offset)
    }
}

/// Runs a shell command and takes the first number it prints as watts.
#[derive(Debug, Clone)]
pub struct CommandPowerSource {
    command: String,
    timeout: Duration,
}

impl CommandPowerSource {
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: COMMAND_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self) -> Result<String, PowerReadError> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PowerReadError::Command(format!("spawn failed: {e}")))?;

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if start.elapsed() > self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(PowerReadError::Command(format!(
                        "timed out after {}ms",
                        self.timeout.as_millis()
                    )));
                }
                Ok(None) => thread::sleep(Duration::from_millis(10)),
                Err(e) => return Err(PowerReadError::Command(format!("wait failed: {e}"))),
            }
        };

        let mut stdout = String::new();
        if let Some(mut out) = child.stdout.take() {
            out.read_to_string(&mut stdout)
                .map_err(|e| PowerReadError::Command(format!("read failed: {e}")))?;
        }
        if !status.success() {
            return Err(PowerReadError::Command(format!(
                "power command exited with {status}"
            )));
        }
        Ok(stdout)
    }
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[-+]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][-+]?[0-9]+)?")
            .expect("valid regex")
    })
}

/// First decimal number in `text`.
#[must_use]
pub fn first_number(text: &str) -> Option<f64> {
    number_re()
        .find_iter(text)
        .find_map(|m| m.as_str().parse::<f64>().ok())
}

impl PowerSource for CommandPowerSource {
    fn read_watts(&mut self) -> Result<f64, PowerReadError> {
        let stdout = self.run()?;
        first_number(&stdout).ok_or_else(|| {
            let shown: String = stdout.trim().chars().take(80).collect();
            PowerReadError::Unparseable(shown)
        })
    }
}

/// Source for live runs with no sensor configured: every read fails, so the
/// run reports no power data instead of invented numbers.
#[derive(Debug, Clone, Default)]
pub struct UnavailablePowerSource;

impl PowerSource for UnavailablePowerSource {
    fn read_watts(&mut self) -> Result<f64, PowerReadError> {
        Err(PowerReadError::Unavailable(
            "no power command configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_readings_stay_in_band() {
        let mut src = SimulatedPowerSource::with_seed(11.0, 42);
        for _ in 0..1000 {
            let w = src.read_watts().expect("reading");
            assert!((9.0..=13.0).contains(&w), "{w}");
        }
    }

    #[test]
    fn simulated_zero_seed_still_varies() {
        let mut src = SimulatedPowerSource::with_seed(11.0, 0);
        let a = src.read_watts().expect("reading");
        let b = src.read_watts().expect("reading");
        assert!((a - b).abs() > f64::EPSILON);
    }

    #[test]
    fn first_number_extraction() {
        assert_eq!(first_number("11.25"), Some(11.25));
        assert_eq!(first_number("power: 9.5 W (avg)"), Some(9.5));
        assert_eq!(first_number("12W"), Some(12.0));
        assert_eq!(first_number("n/a"), None);
    }

    #[test]
    fn unavailable_always_errors() {
        assert!(matches!(
            UnavailablePowerSource.read_watts(),
            Err(PowerReadError::Unavailable(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn command_source_reads_and_fails() {
        let mut ok = CommandPowerSource::new("echo 'avg 10.75 W'");
        assert!((ok.read_watts().expect("reading") - 10.75).abs() < 1e-9);

        let mut failing = CommandPowerSource::new("echo 3.0; exit 2");
        assert!(matches!(
            failing.read_watts(),
            Err(PowerReadError::Command(_))
        ));

        let mut garbage = CommandPowerSource::new("echo unavailable");
        assert!(matches!(
            garbage.read_watts(),
            Err(PowerReadError::Unparseable(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn command_source_times_out() {
        let mut slow =
            CommandPowerSource::new("exec sleep 30").with_timeout(Duration::from_millis(100));
        let start = Instant::now();
        assert!(matches!(slow.read_watts(), Err(PowerReadError::Command(_))));
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
