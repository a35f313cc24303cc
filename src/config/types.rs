use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

/// A duration given as a human readable string such as `"30s"` or `"5m"`.
///
/// Unitless numbers are interpreted as seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl FromStr for HumanDuration {
    type Err = humantime::DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(secs) = s.parse::<u64>() {
            return Ok(Self::from_secs(secs));
        }
        humantime::parse_duration(s).map(Self)
    }
}

impl std::fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", humantime::format_duration(self.0))
    }
}

impl From<HumanDuration> for Duration {
    fn from(d: HumanDuration) -> Self {
        d.0
    }
}

impl From<Duration> for HumanDuration {
    fn from(d: Duration) -> Self {
        Self(d)
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Secs(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Secs(secs) => Ok(Self::from_secs(secs)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

impl Serialize for HumanDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Delay between status polls. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollInterval(Duration);

impl PollInterval {
    pub const fn from_secs(secs: u64) -> Self {
        assert!(secs > 0, "PollInterval: value must be greater than 0");
        Self(Duration::from_secs(secs))
    }
}

impl TryFrom<Duration> for PollInterval {
    type Error = String;

    fn try_from(d: Duration) -> Result<Self, Self::Error> {
        if d.is_zero() {
            return Err("poll interval must be greater than 0".into());
        }
        Ok(Self(d))
    }
}

impl FromStr for PollInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let d: HumanDuration = s.parse().map_err(|e: humantime::DurationError| e.to_string())?;
        d.0.try_into()
    }
}

impl std::fmt::Display for PollInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", humantime::format_duration(self.0))
    }
}

impl From<PollInterval> for Duration {
    fn from(p: PollInterval) -> Self {
        p.0
    }
}

impl<'de> Deserialize<'de> for PollInterval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let d = HumanDuration::deserialize(deserializer)?;
        d.0.try_into().map_err(serde::de::Error::custom)
    }
}

/// Upper bound on concurrently running operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyLimit(NonZeroUsize);

impl ConcurrencyLimit {
    pub const fn new(limit: usize) -> Self {
        match NonZeroUsize::new(limit) {
            Some(n) => Self(n),
            None => panic!("ConcurrencyLimit: value must be greater than 0"),
        }
    }

    pub fn into_inner(self) -> usize {
        self.0.get()
    }
}

impl Default for ConcurrencyLimit {
    fn default() -> Self {
        Self::new(4)
    }
}

impl FromStr for ConcurrencyLimit {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let val: usize = s.parse().map_err(|_| "not a number")?;
        NonZeroUsize::new(val)
            .map(Self)
            .ok_or_else(|| "concurrency must be > 0".to_string())
    }
}

impl std::fmt::Display for ConcurrencyLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unitless_is_seconds() {
        let d: HumanDuration = "90".parse().unwrap();
        assert_eq!(d.0, Duration::from_secs(90));
    }

    #[test]
    fn test_human_units() {
        let d: HumanDuration = "5m 30s".parse().unwrap();
        assert_eq!(d.0, Duration::from_secs(330));
        assert_eq!(d.to_string(), "5m 30s");
    }

    #[test]
    fn test_deserialize_number_or_string() {
        #[derive(Deserialize)]
        struct Cfg {
            a: HumanDuration,
            b: HumanDuration,
        }
        let cfg: Cfg = toml::from_str("a = 10\nb = \"2m\"").unwrap();
        assert_eq!(cfg.a, HumanDuration::from_secs(10));
        assert_eq!(cfg.b, HumanDuration::from_secs(120));
    }

    #[test]
    fn test_concurrency_rejects_zero() {
        assert!("0".parse::<ConcurrencyLimit>().is_err());
        assert_eq!("3".parse::<ConcurrencyLimit>().unwrap().into_inner(), 3);
    }

    #[test]
    fn test_poll_interval_rejects_zero() {
        assert!("0".parse::<PollInterval>().is_err());
        assert!("0s".parse::<PollInterval>().is_err());
        assert_eq!(
            "250ms".parse::<PollInterval>().unwrap(),
            PollInterval::try_from(Duration::from_millis(250)).unwrap()
        );

        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Cfg {
            interval: PollInterval,
        }
        let err = toml::from_str::<Cfg>("interval = 0").unwrap_err();
        assert!(err.to_string().contains("greater than 0"));
    }
}
