use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use envconfig::Envconfig;
use thiserror::Error;
use tracing::debug;

use crate::args::CommandLineArgs;
use crate::error::BootstrapError;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "8080")]
    pub port: u16,

    /// Falls back to the application's marker name when unset.
    #[envconfig(from = "APP_NAME")]
    pub app_name: Option<String>,

    #[envconfig(from = "SHUTDOWN_TIMEOUT", default = "30s")]
    pub shutdown_timeout: HumanDuration,

    #[envconfig(from = "LIVENESS_DEADLINE", default = "10s")]
    pub liveness_deadline: HumanDuration,

    #[envconfig(from = "EXPORT_PROMETHEUS", default = "true")]
    pub export_prometheus: bool,

    #[envconfig(from = "RUST_LOG", default = "info")]
    pub log_level: String,
}

impl Config {
    /// Produce a host:port address for binding a TcpListener.
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Load from env, then let command line properties take precedence.
    pub fn load(args: &CommandLineArgs) -> Result<Self, BootstrapError> {
        let mut config = Config::init_from_env()?;
        config.apply_args(args)?;
        Ok(config)
    }

    /// Override fields with the matching command line properties. Properties
    /// this config does not know about are left for the application to read.
    pub fn apply_args(&mut self, args: &CommandLineArgs) -> Result<(), BootstrapError> {
        for name in args.option_names() {
            let Some(value) = args.property(name) else {
                continue;
            };
            match name {
                "server.address" => self.host = value,
                "server.port" => self.port = parse_property(name, &value)?,
                "spring.application.name" | "application.name" => self.app_name = Some(value),
                "server.shutdown.timeout" | "spring.lifecycle.timeout-per-shutdown-phase" => {
                    self.shutdown_timeout = parse_property(name, &value)?
                }
                "management.health.liveness.deadline" => {
                    self.liveness_deadline = parse_property(name, &value)?
                }
                "management.metrics.enabled" => {
                    self.export_prometheus = parse_property(name, &value)?
                }
                "logging.level" => self.log_level = value,
                _ => debug!(property = name, "property not used by bootstrap config"),
            }
        }
        Ok(())
    }
}

fn parse_property<T>(key: &str, value: &str) -> Result<T, BootstrapError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| BootstrapError::InvalidProperty {
            key: key.to_owned(),
            value: value.to_owned(),
            reason: e.to_string(),
        })
}

/// A duration written as `<n><unit>` with unit one of ns, us, ms, s, m, h, d.
/// A bare number is milliseconds. Durations longer than [`HumanDuration::MAX`]
/// are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    pub const MAX: Duration = Duration::from_secs(MAX_DAYS * SECS_PER_DAY);
}

const SECS_PER_DAY: u64 = 24 * 60 * 60;
const MAX_DAYS: u64 = 365;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseDurationError {
    #[error("invalid duration {0:?}, expected <number>[ns|us|ms|s|m|h|d]")]
    Invalid(String),
    #[error("duration {0:?} is longer than {max}d", max = MAX_DAYS)]
    TooLong(String),
}

impl FromStr for HumanDuration {
    type Err = ParseDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (amount, unit) = trimmed.split_at(split);
        let amount: u64 = amount
            .parse()
            .map_err(|_| ParseDurationError::Invalid(s.to_owned()))?;

        let secs = |per_unit: u64| amount.checked_mul(per_unit).map(Duration::from_secs);
        let duration = match unit.trim().to_ascii_lowercase().as_str() {
            "ns" => Some(Duration::from_nanos(amount)),
            "us" => Some(Duration::from_micros(amount)),
            "" | "ms" => Some(Duration::from_millis(amount)),
            "s" => secs(1),
            "m" => secs(60),
            "h" => secs(60 * 60),
            "d" => secs(SECS_PER_DAY),
            _ => return Err(ParseDurationError::Invalid(s.to_owned())),
        };
        match duration {
            Some(duration) if duration <= Self::MAX => Ok(HumanDuration(duration)),
            _ => Err(ParseDurationError::TooLong(s.to_owned())),
        }
    }
}

impl From<HumanDuration> for Duration {
    fn from(d: HumanDuration) -> Self {
        d.0
    }
}
