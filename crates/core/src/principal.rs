//! Authenticated caller identity (C10) and rate-limit specification
//! parsing, shared by `gateway-config` (which loads `Principal`s from
//! the `users[]` config key) and `gateway-server` (which resolves and
//! enforces them).

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Opaque bearer-token secret. Never logged.
    pub key: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub rate_limit: Option<RateLimitSpec>,
    #[serde(default)]
    pub persona_prompt_file: Option<String>,
}

/// The well-known identity used when no API keys are configured at all,
/// so the gateway remains reachable for bootstrapping.
pub const PUBLIC_ACCESS_USERNAME: &str = "public_access";

impl Principal {
    pub fn anonymous() -> Self {
        Self {
            key: String::new(),
            username: PUBLIC_ACCESS_USERNAME.to_string(),
            display_name: Some("Public access".to_string()),
            rate_limit: None,
            persona_prompt_file: None,
        }
    }
}

/// `"100/hour"` | `"unlimited"`, parsed into a structured limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitSpec {
    Unlimited,
    Limited { max_requests: u32, period: RateLimitPeriod },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitPeriod {
    Second,
    Minute,
    Hour,
    Day,
}

impl RateLimitPeriod {
    pub fn as_duration(&self) -> std::time::Duration {
        match self {
            RateLimitPeriod::Second => std::time::Duration::from_secs(1),
            RateLimitPeriod::Minute => std::time::Duration::from_secs(60),
            RateLimitPeriod::Hour => std::time::Duration::from_secs(60 * 60),
            RateLimitPeriod::Day => std::time::Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl FromStr for RateLimitPeriod {
    type Err = RateLimitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "s" | "sec" | "second" | "seconds" => Ok(RateLimitPeriod::Second),
            "m" | "min" | "minute" | "minutes" => Ok(RateLimitPeriod::Minute),
            "h" | "hour" | "hours" => Ok(RateLimitPeriod::Hour),
            "d" | "day" | "days" => Ok(RateLimitPeriod::Day),
            other => Err(RateLimitParseError::UnknownPeriod(other.to_string())),
        }
    }
}

impl FromStr for RateLimitSpec {
    type Err = RateLimitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("unlimited") {
            return Ok(RateLimitSpec::Unlimited);
        }
        let (count_part, period_part) = trimmed
            .split_once('/')
            .ok_or_else(|| RateLimitParseError::Malformed(trimmed.to_string()))?;
        let max_requests: u32 = count_part
            .trim()
            .parse()
            .map_err(|_| RateLimitParseError::Malformed(trimmed.to_string()))?;
        let period = period_part.trim().parse()?;
        Ok(RateLimitSpec::Limited {
            max_requests,
            period,
        })
    }
}

impl<'de> Deserialize<'de> for RateLimitSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for RateLimitSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let rendered = match self {
            RateLimitSpec::Unlimited => "unlimited".to_string(),
            RateLimitSpec::Limited {
                max_requests,
                period,
            } => {
                let period_str = match period {
                    RateLimitPeriod::Second => "second",
                    RateLimitPeriod::Minute => "minute",
                    RateLimitPeriod::Hour => "hour",
                    RateLimitPeriod::Day => "day",
                };
                format!("{max_requests}/{period_str}")
            }
        };
        serializer.serialize_str(&rendered)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimitParseError {
    #[error("malformed rate limit string: {0:?}, expected \"N/period\" or \"unlimited\"")]
    Malformed(String),
    #[error("unknown rate limit period: {0:?}")]
    UnknownPeriod(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unlimited() {
        assert_eq!(
            "unlimited".parse::<RateLimitSpec>().unwrap(),
            RateLimitSpec::Unlimited
        );
    }

    #[test]
    fn parses_n_per_hour() {
        let spec: RateLimitSpec = "100/hour".parse().unwrap();
        assert_eq!(
            spec,
            RateLimitSpec::Limited {
                max_requests: 100,
                period: RateLimitPeriod::Hour
            }
        );
    }

    #[test]
    fn parses_abbreviated_period() {
        let spec: RateLimitSpec = "10/s".parse().unwrap();
        assert_eq!(
            spec,
            RateLimitSpec::Limited {
                max_requests: 10,
                period: RateLimitPeriod::Second
            }
        );
    }

    #[test]
    fn rejects_malformed() {
        assert!("not-a-limit".parse::<RateLimitSpec>().is_err());
        assert!("abc/hour".parse::<RateLimitSpec>().is_err());
        assert!("10/fortnight".parse::<RateLimitSpec>().is_err());
    }

    #[test]
    fn anonymous_principal_has_public_access_username() {
        assert_eq!(Principal::anonymous().username, PUBLIC_ACCESS_USERNAME);
    }
}
