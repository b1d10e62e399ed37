//! Workload profile model and validation.
//!
//! A profile document is parsed into an all-optional raw shape first, then
//! checked in one pass so that every failing rule is reported together. The
//! resulting [`ProfileConfig`] is immutable: it exposes accessors only.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::block_size::BlockSize;
use crate::error::{ConfigValidationError, ProfileError, ValidationIssue};

/// Queue depth used when a pattern does not set one.
pub const DEFAULT_QUEUE_DEPTH: u32 = 32;
/// Warm-up window written into every job file unless the profile overrides it.
pub const DEFAULT_RAMP_TIME_SECS: u64 = 60;
/// Target used when the profile names neither a test file nor a device.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/nvme0n1";

/// I/O direction of a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Read,
    Write,
    Mixed,
}

impl Direction {
    pub const ALL: [Self; 3] = [Self::Read, Self::Write, Self::Mixed];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Mixed => "mixed",
        }
    }

    /// The generator's `rw=` mode for this direction.
    #[must_use]
    pub const fn rw_mode(self) -> &'static str {
        match self {
            Self::Read => "randread",
            Self::Write => "randwrite",
            Self::Mixed => "randrw",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "read" => Some(Self::Read),
            "write" => Some(Self::Write),
            "mixed" | "rw" | "randrw" => Some(Self::Mixed),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One I/O pattern of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IoPattern {
    pub direction: Direction,
    pub block_size: BlockSize,
    pub percentage: u32,
    pub queue_depth: u32,
}

/// Throughput targets for one capacity tier.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TierTargets {
    pub read_total_mbps: Option<u64>,
    pub write_mbps: BTreeMap<BlockSize, u64>,
}

/// Pass/fail targets. Absent entries are not evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iops_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throughput_mbps_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_p99_us_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_avg_watts_max: Option<f64>,
}

/// Validated, immutable workload profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileConfig {
    profile_id: String,
    profile_name: String,
    runtime_hours: u32,
    power_limit_watts: Option<f64>,
    patterns: Vec<IoPattern>,
    tiers: BTreeMap<String, TierTargets>,
    targets: TargetTable,
    target_path: String,
    ramp_time_secs: u64,
    signature: String,
}

impl ProfileConfig {
    /// Read and validate a profile document (JSON or JSON5) from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parse and validate a profile document.
    pub fn from_json_str(text: &str) -> Result<Self, ProfileError> {
        let raw: RawProfile =
            json5::from_str(text).map_err(|e| ProfileError::Parse(e.to_string()))?;
        Ok(validate(raw, profile_signature(text))?)
    }

    #[must_use]
    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    #[must_use]
    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    #[must_use]
    pub const fn runtime_hours(&self) -> u32 {
        self.runtime_hours
    }

    #[must_use]
    pub const fn runtime_secs(&self) -> u64 {
        self.runtime_hours as u64 * 3600
    }

    #[must_use]
    pub const fn power_limit_watts(&self) -> Option<f64> {
        self.power_limit_watts
    }

    /// Patterns in document order.
    #[must_use]
    pub fn patterns(&self) -> &[IoPattern] {
        &self.patterns
    }

    pub fn patterns_for(&self, direction: Direction) -> impl Iterator<Item = &IoPattern> {
        self.patterns
            .iter()
            .filter(move |p| p.direction == direction)
    }

    #[must_use]
    pub fn tier(&self, label: &str) -> Option<&TierTargets> {
        self.tiers.get(label)
    }

    pub fn tier_labels(&self) -> impl Iterator<Item = &str> {
        self.tiers.keys().map(String::as_str)
    }

    #[must_use]
    pub const fn targets(&self) -> &TargetTable {
        &self.targets
    }

    /// File or device every job of this profile runs against.
    #[must_use]
    pub fn target_path(&self) -> &str {
        &self.target_path
    }

    #[must_use]
    pub const fn ramp_time_secs(&self) -> u64 {
        self.ramp_time_secs
    }

    /// Stable digest of the source document.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

/// First 16 hex chars of SHA-256 over the raw document.
#[must_use]
pub fn profile_signature(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())[..16].to_string()
}

// ──────────────────────────────────────────────────────────────────────────────
// Raw document shape
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct RawProfile {
    #[serde(default)]
    profile_id: Option<serde_json::Value>,
    #[serde(default)]
    profile_name: Option<String>,
    #[serde(default)]
    runtime_hours: Option<serde_json::Value>,
    #[serde(default)]
    power_limit_watts: Option<f64>,
    #[serde(default)]
    io_patterns: Option<Vec<RawPattern>>,
    #[serde(default)]
    read_patterns: Option<Vec<RawPattern>>,
    #[serde(default)]
    write_patterns: Option<Vec<RawPattern>>,
    #[serde(default)]
    throughput_targets: BTreeMap<String, RawTier>,
    #[serde(default)]
    targets: Option<TargetTable>,
    #[serde(default)]
    device: Option<RawDevice>,
    #[serde(default)]
    test_environment: Option<RawTestEnvironment>,
    #[serde(default)]
    ramp_time_secs: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPattern {
    #[serde(default, rename = "type")]
    direction: Option<String>,
    #[serde(default)]
    block_size: Option<String>,
    #[serde(default)]
    percentage: Option<serde_json::Value>,
    #[serde(default)]
    queue_depth: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTier {
    #[serde(default)]
    read_total_mbps: Option<serde_json::Value>,
    #[serde(default)]
    write_mbps: BTreeMap<String, serde_json::Value>,
    /// Legacy flat keys such as `write_4k_mbps`.
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

impl RawTier {
    fn write_entries(&self) -> Vec<(String, &serde_json::Value)> {
        let mut entries: Vec<(String, &serde_json::Value)> =
            self.write_mbps.iter().map(|(k, v)| (k.clone(), v)).collect();
        for (key, value) in &self.extra {
            if let Some(bs) = key
                .strip_prefix("write_")
                .and_then(|rest| rest.strip_suffix("_mbps"))
            {
                entries.push((bs.to_string(), value));
            }
        }
        entries
    }
}

/// Integral value of a JSON number, accepting integral floats such as `800.0`.
fn whole_number(value: &serde_json::Value) -> Option<i128> {
    if let Some(n) = value.as_u64() {
        return Some(i128::from(n));
    }
    if let Some(n) = value.as_i64() {
        return Some(i128::from(n));
    }
    value
        .as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < 1e30)
        .map(|f| {
            #[allow(clippy::cast_possible_truncation)]
            let whole = f as i128;
            whole
        })
}

/// Reads a whole-number field, recording an issue when the value is
/// fractional, negative, out of range for `T`, or not a number at all.
fn whole_field<T: TryFrom<i128>>(
    value: &serde_json::Value,
    field: impl Into<String>,
    issues: &mut Vec<ValidationIssue>,
) -> Option<T> {
    let parsed = whole_number(value).and_then(|n| T::try_from(n).ok());
    if parsed.is_none() {
        issues.push(ValidationIssue::NotWholeNumber {
            field: field.into(),
            value: value.to_string(),
        });
    }
    parsed
}

#[derive(Debug, Default, Deserialize)]
struct RawDevice {
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTestEnvironment {
    #[serde(default)]
    mount_point: Option<String>,
    #[serde(default)]
    test_file: Option<String>,
}

// ──────────────────────────────────────────────────────────────────────────────
// Validation
// ──────────────────────────────────────────────────────────────────────────────

fn missing(field: impl Into<String>) -> ValidationIssue {
    ValidationIssue::MissingField {
        field: field.into(),
    }
}

fn id_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Valid patterns, plus the directions whose percentage total cannot be
/// checked because one of their percentages was unreadable.
fn collect_patterns(
    raw: &RawProfile,
    issues: &mut Vec<ValidationIssue>,
) -> (Vec<IoPattern>, Vec<Direction>) {
    let mut sources: Vec<(&str, Option<Direction>, &Vec<RawPattern>)> = Vec::new();
    if let Some(list) = &raw.io_patterns {
        sources.push(("io_patterns", None, list));
    }
    if let Some(list) = &raw.read_patterns {
        sources.push(("read_patterns", Some(Direction::Read), list));
    }
    if let Some(list) = &raw.write_patterns {
        sources.push(("write_patterns", Some(Direction::Write), list));
    }

    let mut patterns = Vec::new();
    let mut unsummed = Vec::new();
    for (field, implied, list) in sources {
        for (idx, rp) in list.iter().enumerate() {
            let context = format!("{field}[{idx}]");
            let direction = match (implied, rp.direction.as_deref()) {
                (_, Some(raw_dir)) => {
                    let parsed = Direction::parse(raw_dir);
                    if parsed.is_none() {
                        issues.push(ValidationIssue::UnknownDirection {
                            value: raw_dir.to_string(),
                        });
                    }
                    parsed
                }
                (Some(dir), None) => Some(dir),
                (None, None) => {
                    issues.push(missing(format!("{context}.type")));
                    None
                }
            };
            let block_size = match rp.block_size.as_deref() {
                Some(s) => match s.parse::<BlockSize>() {
                    Ok(bs) => Some(bs),
                    Err(_) => {
                        issues.push(ValidationIssue::InvalidBlockSize {
                            context: context.clone(),
                            value: s.to_string(),
                        });
                        None
                    }
                },
                None => {
                    issues.push(missing(format!("{context}.block_size")));
                    None
                }
            };
            let percentage = match &rp.percentage {
                Some(v) => {
                    let parsed = whole_field::<u32>(v, format!("{context}.percentage"), issues);
                    if parsed.is_none() {
                        unsummed.extend(direction);
                    }
                    parsed
                }
                None => {
                    issues.push(missing(format!("{context}.percentage")));
                    None
                }
            };
            let queue_depth = match &rp.queue_depth {
                Some(v) => whole_field::<u32>(v, format!("{context}.queue_depth"), issues),
                None => Some(DEFAULT_QUEUE_DEPTH),
            };
            if let (Some(direction), Some(block_size), Some(percentage), Some(queue_depth)) =
                (direction, block_size, percentage, queue_depth)
            {
                patterns.push(IoPattern {
                    direction,
                    block_size,
                    percentage,
                    queue_depth,
                });
            }
        }
    }
    (patterns, unsummed)
}

fn check_patterns(
    patterns: &[IoPattern],
    unsummed: &[Direction],
    issues: &mut Vec<ValidationIssue>,
) {
    for p in patterns {
        if p.percentage == 0 || p.percentage > 100 {
            issues.push(ValidationIssue::PercentageOutOfRange {
                direction: p.direction.to_string(),
                block_size: p.block_size.to_string(),
                percentage: p.percentage,
            });
        }
        if p.queue_depth == 0 {
            issues.push(ValidationIssue::ZeroQueueDepth {
                direction: p.direction.to_string(),
                block_size: p.block_size.to_string(),
            });
        }
    }
    for direction in Direction::ALL.into_iter().filter(|d| !unsummed.contains(d)) {
        let mut any = false;
        let mut total: u32 = 0;
        for p in patterns.iter().filter(|p| p.direction == direction) {
            any = true;
            total = total.saturating_add(p.percentage);
        }
        if any && total != 100 {
            issues.push(ValidationIssue::PercentageSum {
                direction: direction.to_string(),
                total,
            });
        }
    }
}

fn collect_tiers(
    raw: &RawProfile,
    patterns: &[IoPattern],
    issues: &mut Vec<ValidationIssue>,
) -> BTreeMap<String, TierTargets> {
    let needs_read_total = patterns.iter().any(|p| p.direction != Direction::Write);
    let mut tiers = BTreeMap::new();
    for (label, raw_tier) in &raw.throughput_targets {
        let mut tier = TierTargets {
            read_total_mbps: None,
            write_mbps: BTreeMap::new(),
        };
        if let Some(v) = &raw_tier.read_total_mbps {
            tier.read_total_mbps =
                whole_field(v, format!("throughput_targets.{label}.read_total_mbps"), issues);
        } else if needs_read_total {
            issues.push(missing(format!(
                "throughput_targets.{label}.read_total_mbps"
            )));
        }
        for (key, value) in raw_tier.write_entries() {
            let Ok(bs) = key.parse::<BlockSize>() else {
                issues.push(ValidationIssue::InvalidBlockSize {
                    context: format!("throughput_targets.{label}"),
                    value: key,
                });
                continue;
            };
            let used = patterns
                .iter()
                .any(|p| p.direction == Direction::Write && p.block_size == bs);
            if !used {
                issues.push(ValidationIssue::UnknownTierBlockSize {
                    tier: label.clone(),
                    block_size: bs.to_string(),
                });
                continue;
            }
            let field = format!("throughput_targets.{label}.write_{bs}_mbps");
            if let Some(mbps) = whole_field(value, field, issues) {
                tier.write_mbps.insert(bs, mbps);
            }
        }
        tiers.insert(label.clone(), tier);
    }
    tiers
}

fn check_targets(targets: &TargetTable, issues: &mut Vec<ValidationIssue>) {
    let entries = [
        ("iops_min", targets.iops_min),
        ("throughput_mbps_min", targets.throughput_mbps_min),
        ("latency_p99_us_max", targets.latency_p99_us_max),
        ("power_avg_watts_max", targets.power_avg_watts_max),
    ];
    for (name, value) in entries {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                issues.push(ValidationIssue::InvalidTarget {
                    target: name.to_string(),
                    value: v.to_string(),
                });
            }
        }
    }
}

fn resolve_target_path(raw: &RawProfile) -> String {
    if let Some(env) = &raw.test_environment {
        if let (Some(mount), Some(file)) = (&env.mount_point, &env.test_file) {
            return format!("{}/{}", mount.trim_end_matches('/'), file);
        }
    }
    raw.device
        .as_ref()
        .and_then(|d| d.path.clone())
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DEVICE_PATH.to_string())
}

fn validate(raw: RawProfile, signature: String) -> Result<ProfileConfig, ConfigValidationError> {
    let mut issues = Vec::new();

    let profile_id = raw.profile_id.as_ref().and_then(id_string);
    if profile_id.is_none() {
        issues.push(missing("profile_id"));
    }

    let runtime_hours = match &raw.runtime_hours {
        None => {
            issues.push(missing("runtime_hours"));
            None
        }
        Some(v) => match whole_number(v) {
            Some(h) if h <= 0 => {
                issues.push(ValidationIssue::NonPositiveRuntime {
                    runtime_hours: i64::try_from(h).unwrap_or(i64::MIN),
                });
                None
            }
            _ => whole_field::<u32>(v, "runtime_hours", &mut issues),
        },
    };

    if let Some(w) = raw.power_limit_watts {
        if !w.is_finite() || w <= 0.0 {
            issues.push(ValidationIssue::NonPositivePowerLimit {
                watts: w.to_string(),
            });
        }
    }

    if raw.io_patterns.is_none() && raw.read_patterns.is_none() && raw.write_patterns.is_none() {
        issues.push(missing("io_patterns"));
    }
    let (patterns, unsummed) = collect_patterns(&raw, &mut issues);
    let lists_present =
        raw.io_patterns.is_some() || raw.read_patterns.is_some() || raw.write_patterns.is_some();
    let all_lists_empty = [&raw.io_patterns, &raw.read_patterns, &raw.write_patterns]
        .into_iter()
        .flatten()
        .all(Vec::is_empty);
    if lists_present && all_lists_empty {
        issues.push(ValidationIssue::NoPatterns);
    }
    check_patterns(&patterns, &unsummed, &mut issues);

    let ramp_time_secs = match &raw.ramp_time_secs {
        Some(v) => whole_field(v, "ramp_time_secs", &mut issues),
        None => Some(DEFAULT_RAMP_TIME_SECS),
    };

    let tiers = collect_tiers(&raw, &patterns, &mut issues);

    let targets = match raw.targets {
        Some(t) => {
            check_targets(&t, &mut issues);
            t
        }
        None => {
            issues.push(missing("targets"));
            TargetTable::default()
        }
    };

    if !issues.is_empty() {
        return Err(ConfigValidationError { issues });
    }

    let profile_id = profile_id.unwrap_or_default();
    Ok(ProfileConfig {
        profile_name: raw
            .profile_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("Profile {profile_id}")),
        target_path: resolve_target_path(&raw),
        profile_id,
        runtime_hours: runtime_hours.unwrap_or_default(),
        power_limit_watts: raw.power_limit_watts,
        patterns,
        tiers,
        targets,
        ramp_time_secs: ramp_time_secs.unwrap_or(DEFAULT_RAMP_TIME_SECS),
        signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "profile_id": 1,
        "profile_name": "WLG Profile 1",
        "runtime_hours": 168,
        "power_limit_watts": 11.0,
        "io_patterns": [
            {"type": "read", "block_size": "4k", "percentage": 42},
            {"type": "read", "block_size": "128k", "percentage": 58, "queue_depth": 64},
            {"type": "write", "block_size": "4k", "percentage": 65},
            {"type": "write", "block_size": "40k", "percentage": 35}
        ],
        "throughput_targets": {
            "64TB": {"read_total_mbps": 10000, "write_4k_mbps": 800, "write_40k_mbps": 1200},
            "16TB": {"read_total_mbps": 4000, "write_mbps": {"4k": 300, "40K": 500}}
        },
        "targets": {"iops_min": 850000, "latency_p99_us_max": 500},
        "test_environment": {"mount_point": "/mnt/wlg/", "test_file": "wlg.dat"}
    }"#;

    fn issues_of(text: &str) -> Vec<ValidationIssue> {
        match ProfileConfig::from_json_str(text) {
            Err(ProfileError::Validation(err)) => err.issues,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn loads_valid_profile() {
        let profile = ProfileConfig::from_json_str(VALID).expect("valid");
        assert_eq!(profile.profile_id(), "1");
        assert_eq!(profile.profile_name(), "WLG Profile 1");
        assert_eq!(profile.runtime_secs(), 168 * 3600);
        assert_eq!(profile.patterns().len(), 4);
        assert_eq!(profile.patterns()[0].queue_depth, DEFAULT_QUEUE_DEPTH);
        assert_eq!(profile.patterns()[1].queue_depth, 64);
        assert_eq!(profile.target_path(), "/mnt/wlg/wlg.dat");
        assert_eq!(profile.ramp_time_secs(), DEFAULT_RAMP_TIME_SECS);
        assert_eq!(profile.signature().len(), 16);

        let tier = profile.tier("64TB").expect("64TB");
        assert_eq!(tier.read_total_mbps, Some(10000));
        let bs40: BlockSize = "40k".parse().expect("bs");
        assert_eq!(tier.write_mbps.get(&bs40), Some(&1200));
        let tier16 = profile.tier("16TB").expect("16TB");
        assert_eq!(tier16.write_mbps.get(&bs40), Some(&500));
    }

    #[test]
    fn legacy_split_pattern_lists_are_accepted() {
        let text = r#"{
            profile_id: "2",
            runtime_hours: 1,
            read_patterns: [{block_size: "8k", percentage: 100}],
            write_patterns: [{block_size: "4k", percentage: 100}],
            throughput_targets: {"32TB": {read_total_mbps: 5000, write_4k_mbps: 100}},
            targets: {},
            // JSON5 comments are fine
            device: {path: "/dev/nvme1n1"},
        }"#;
        let profile = ProfileConfig::from_json_str(text).expect("valid");
        assert_eq!(profile.profile_name(), "Profile 2");
        assert_eq!(profile.patterns_for(Direction::Read).count(), 1);
        assert_eq!(profile.patterns_for(Direction::Write).count(), 1);
        assert_eq!(profile.target_path(), "/dev/nvme1n1");
    }

    #[test]
    fn reports_every_failing_rule_at_once() {
        let text = r#"{
            "runtime_hours": 0,
            "power_limit_watts": -1,
            "io_patterns": [
                {"type": "read", "block_size": "4k", "percentage": 40},
                {"type": "read", "block_size": "bogus", "percentage": 50},
                {"type": "write", "block_size": "4k", "percentage": 100, "queue_depth": 0}
            ],
            "throughput_targets": {"64TB": {"read_total_mbps": 1, "write_mbps": {"8k": 5}}}
        }"#;
        let issues = issues_of(text);
        assert!(issues.contains(&missing("profile_id")));
        assert!(issues.contains(&missing("targets")));
        assert!(issues.contains(&ValidationIssue::NonPositiveRuntime { runtime_hours: 0 }));
        assert!(issues.iter().any(|i| matches!(i, ValidationIssue::NonPositivePowerLimit { .. })));
        assert!(issues.iter().any(|i| matches!(
            i,
            ValidationIssue::InvalidBlockSize { value, .. } if value == "bogus"
        )));
        assert!(issues.contains(&ValidationIssue::PercentageSum {
            direction: "read".to_string(),
            total: 40,
        }));
        assert!(issues.iter().any(|i| matches!(i, ValidationIssue::ZeroQueueDepth { .. })));
        assert!(issues.contains(&ValidationIssue::UnknownTierBlockSize {
            tier: "64TB".to_string(),
            block_size: "8k".to_string(),
        }));
    }

    #[test]
    fn percentages_over_100_rejected_per_direction() {
        let text = r#"{
            "profile_id": "x", "runtime_hours": 1, "targets": {},
            "io_patterns": [
                {"type": "read", "block_size": "4k", "percentage": 42},
                {"type": "read", "block_size": "128k", "percentage": 59}
            ]
        }"#;
        assert_eq!(
            issues_of(text),
            vec![ValidationIssue::PercentageSum {
                direction: "read".to_string(),
                total: 101,
            }]
        );
    }

    fn not_whole(field: &str, value: &str) -> ValidationIssue {
        ValidationIssue::NotWholeNumber {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn fractional_percentage_and_runtime_are_rejected() {
        let text = r#"{
            profile_id: "x", runtime_hours: 1.7, targets: {},
            io_patterns: [
                {"type": "read", block_size: "4k", percentage: 60.9},
                {"type": "read", block_size: "8k", percentage: 40},
            ],
        }"#;
        assert_eq!(
            issues_of(text),
            vec![
                not_whole("runtime_hours", "1.7"),
                not_whole("io_patterns[0].percentage", "60.9"),
            ]
        );
    }

    #[test]
    fn fractional_thirds_are_reported_per_pattern_not_as_a_bad_total() {
        let text = r#"{
            profile_id: "x", runtime_hours: 1, targets: {},
            io_patterns: [
                {"type": "write", block_size: "4k", percentage: 33.3},
                {"type": "write", block_size: "8k", percentage: 33.3},
                {"type": "write", block_size: "16k", percentage: 33.4},
            ],
        }"#;
        let issues = issues_of(text);
        assert_eq!(issues.len(), 3, "{issues:?}");
        assert!(
            issues
                .iter()
                .all(|i| matches!(i, ValidationIssue::NotWholeNumber { .. }))
        );
    }

    #[test]
    fn wrongly_typed_numbers_join_the_aggregated_report() {
        let text = r#"{
            profile_id: "x", runtime_hours: -2, targets: {},
            io_patterns: [{"type": "read", block_size: "4k", percentage: "100", queue_depth: 1.5}],
            throughput_targets: {"16TB": {read_total_mbps: 10.5}},
            ramp_time_secs: -1,
        }"#;
        let issues = issues_of(text);
        assert!(issues.contains(&ValidationIssue::NonPositiveRuntime { runtime_hours: -2 }));
        assert!(issues.contains(&not_whole("io_patterns[0].percentage", "\"100\"")));
        assert!(issues.contains(&not_whole("io_patterns[0].queue_depth", "1.5")));
        assert!(issues.contains(&not_whole("throughput_targets.16TB.read_total_mbps", "10.5")));
        assert!(issues.contains(&not_whole("ramp_time_secs", "-1")));
    }

    #[test]
    fn integral_floats_are_accepted() {
        let text = r#"{
            profile_id: "x", runtime_hours: 2.0, targets: {},
            io_patterns: [{"type": "write", block_size: "4k", percentage: 100.0}],
            throughput_targets: {"16TB": {write_4k_mbps: 800.0}},
        }"#;
        let profile = ProfileConfig::from_json_str(text).expect("valid");
        assert_eq!(profile.runtime_hours(), 2);
        assert_eq!(profile.patterns()[0].percentage, 100);
        let bs4: BlockSize = "4k".parse().expect("bs");
        let tier = profile.tier("16TB").expect("16TB");
        assert_eq!(tier.write_mbps.get(&bs4), Some(&800));
    }

    #[test]
    fn fractional_legacy_write_target_is_rejected() {
        let text = r#"{
            profile_id: "x", runtime_hours: 1, targets: {},
            io_patterns: [{"type": "write", block_size: "4k", percentage: 100}],
            throughput_targets: {"16TB": {write_4k_mbps: 799.5}},
        }"#;
        assert_eq!(
            issues_of(text),
            vec![not_whole("throughput_targets.16TB.write_4k_mbps", "799.5")]
        );
    }

    #[test]
    fn missing_pattern_list_reported_once() {
        let issues = issues_of(r#"{"profile_id": "x", "runtime_hours": 1, "targets": {}}"#);
        assert_eq!(issues, vec![missing("io_patterns")]);
    }

    #[test]
    fn empty_pattern_list_is_rejected() {
        let text = r#"{"profile_id": "x", "runtime_hours": 1, "targets": {}, "io_patterns": []}"#;
        assert_eq!(issues_of(text), vec![ValidationIssue::NoPatterns]);
    }

    #[test]
    fn tier_without_read_total_is_reported_when_reads_exist() {
        let text = r#"{
            "profile_id": "x", "runtime_hours": 1, "targets": {},
            "io_patterns": [{"type": "read", "block_size": "4k", "percentage": 100}],
            "throughput_targets": {"16TB": {}}
        }"#;
        assert_eq!(
            issues_of(text),
            vec![missing("throughput_targets.16TB.read_total_mbps")]
        );
    }

    #[test]
    fn unknown_direction_and_negative_target_are_reported() {
        let text = r#"{
            "profile_id": "x", "runtime_hours": 1,
            "targets": {"iops_min": -5},
            "io_patterns": [{"type": "trim", "block_size": "4k", "percentage": 100}]
        }"#;
        let issues = issues_of(text);
        assert!(issues.contains(&ValidationIssue::UnknownDirection {
            value: "trim".to_string()
        }));
        assert!(issues.iter().any(|i| matches!(
            i,
            ValidationIssue::InvalidTarget { target, .. } if target == "iops_min"
        )));
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = ProfileConfig::from_json_str("{ not json").expect_err("parse");
        assert!(matches!(err, ProfileError::Parse(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = ProfileConfig::load(dir.path().join("nope.json")).expect_err("io");
        assert!(matches!(err, ProfileError::Io { .. }));
    }

    #[test]
    fn signature_is_stable_and_content_sensitive() {
        assert_eq!(profile_signature("a"), profile_signature("a"));
        assert_ne!(profile_signature("a"), profile_signature("b"));
    }
}
