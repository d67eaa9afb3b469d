//! Repository update and checksum policies.
//!
//! Every remote repository carries one policy for releases and one for
//! snapshots. The update policy decides when a previously checked artifact
//! is due for another remote check; the checksum policy decides what a bad
//! checksum means.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use mvnr_core::error::MvnrError;

/// When to check a remote repository again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum UpdatePolicy {
    Always,
    Daily,
    /// Minutes between checks
    Interval(u32),
    Never,
}

impl UpdatePolicy {
    /// Whether a check made at `last_checked` is out of date at `now`.
    ///
    /// Something never checked is always due, whatever the policy.
    pub fn is_due(&self, last_checked: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(last) = last_checked else {
            return true;
        };
        match self {
            UpdatePolicy::Always => true,
            UpdatePolicy::Daily => last < start_of_day(now),
            UpdatePolicy::Interval(minutes) => last + Duration::minutes(i64::from(*minutes)) < now,
            UpdatePolicy::Never => false,
        }
    }

    /// Position on the "checks more often" scale; lower is more frequent
    fn ordinal(&self) -> u64 {
        match self {
            UpdatePolicy::Always => 0,
            UpdatePolicy::Interval(minutes) => u64::from(*minutes),
            UpdatePolicy::Daily => 24 * 60,
            UpdatePolicy::Never => u64::MAX,
        }
    }
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .unwrap_or(now)
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        UpdatePolicy::Daily
    }
}

impl fmt::Display for UpdatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdatePolicy::Always => f.write_str("always"),
            UpdatePolicy::Daily => f.write_str("daily"),
            UpdatePolicy::Interval(minutes) => write!(f, "interval:{minutes}"),
            UpdatePolicy::Never => f.write_str("never"),
        }
    }
}

impl FromStr for UpdatePolicy {
    type Err = MvnrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        match value.as_str() {
            "always" => Ok(UpdatePolicy::Always),
            "daily" => Ok(UpdatePolicy::Daily),
            "never" => Ok(UpdatePolicy::Never),
            _ => value
                .strip_prefix("interval:")
                .and_then(|minutes| minutes.trim().parse::<u32>().ok())
                .map(UpdatePolicy::Interval)
                .ok_or_else(|| MvnrError::ConfigValidation {
                    field: "update-policy".to_string(),
                    reason: format!(
                        "'{s}' is not one of always, daily, interval:<minutes>, never"
                    ),
                }),
        }
    }
}

impl TryFrom<String> for UpdatePolicy {
    type Error = MvnrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UpdatePolicy> for String {
    fn from(policy: UpdatePolicy) -> Self {
        policy.to_string()
    }
}

/// What to do when a downloaded file does not match its published checksum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumPolicy {
    Fail,
    #[default]
    Warn,
    Ignore,
}

impl ChecksumPolicy {
    fn strictness(&self) -> u8 {
        match self {
            ChecksumPolicy::Fail => 2,
            ChecksumPolicy::Warn => 1,
            ChecksumPolicy::Ignore => 0,
        }
    }
}

impl fmt::Display for ChecksumPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChecksumPolicy::Fail => "fail",
            ChecksumPolicy::Warn => "warn",
            ChecksumPolicy::Ignore => "ignore",
        })
    }
}

impl FromStr for ChecksumPolicy {
    type Err = MvnrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(ChecksumPolicy::Fail),
            "warn" => Ok(ChecksumPolicy::Warn),
            "ignore" => Ok(ChecksumPolicy::Ignore),
            _ => Err(MvnrError::ConfigValidation {
                field: "checksum-policy".to_string(),
                reason: format!("'{s}' is not one of fail, warn, ignore"),
            }),
        }
    }
}

/// Release or snapshot policy of a repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RepositoryPolicy {
    pub enabled: bool,
    pub update_policy: UpdatePolicy,
    pub checksum_policy: ChecksumPolicy,
}

impl Default for RepositoryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            update_policy: UpdatePolicy::Daily,
            checksum_policy: ChecksumPolicy::Warn,
        }
    }
}

impl RepositoryPolicy {
    pub fn new(enabled: bool, update_policy: UpdatePolicy, checksum_policy: ChecksumPolicy) -> Self {
        Self {
            enabled,
            update_policy,
            checksum_policy,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Whether an artifact checked at `last_checked` should be checked again.
    /// A disabled policy never asks for an update.
    pub fn is_update_required(&self, last_checked: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        self.enabled && self.update_policy.is_due(last_checked, now)
    }

    /// Combine with the policy of another declaration of the same repository.
    ///
    /// Enabled wins over disabled, the more frequent update policy and the
    /// stricter checksum policy are kept.
    pub fn merge(&mut self, other: &RepositoryPolicy) {
        if !other.enabled {
            return;
        }
        if !self.enabled {
            *self = other.clone();
            return;
        }
        if other.update_policy.ordinal() < self.update_policy.ordinal() {
            self.update_policy = other.update_policy;
        }
        if other.checksum_policy.strictness() > self.checksum_policy.strictness() {
            self.checksum_policy = other.checksum_policy;
        }
    }
}
