//! Runtime configuration from the environment.

use std::time::Duration;

use url::Url;

use crate::application::sync::{SyncConfig, DEFAULT_STATUS_QUIET_PERIOD};
use crate::infrastructure::supabase::DEFAULT_CHANNEL;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: Url,
    pub supabase_anon_key: String,
    pub status_quiet_period: Duration,
    /// Adds the development character to the roster.
    pub dev_roster: bool,
    pub realtime_channel: String,
}

impl AppConfig {
    /// Reads the process environment. Call `dotenvy` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let raw_url = value("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let supabase_url = Url::parse(&raw_url).map_err(|e| ConfigError::Invalid {
            name: "SUPABASE_URL",
            message: e.to_string(),
        })?;
        let supabase_anon_key =
            value("SUPABASE_ANON_KEY").ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?;

        let status_quiet_period = match value("PARTYSHEET_STATUS_DEBOUNCE_MS") {
            Some(ms) => Duration::from_millis(ms.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    name: "PARTYSHEET_STATUS_DEBOUNCE_MS",
                    message: e.to_string(),
                }
            })?),
            None => DEFAULT_STATUS_QUIET_PERIOD,
        };

        let dev_roster = match value("PARTYSHEET_DEV_ROSTER").as_deref() {
            None => false,
            Some(flag) => match flag.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(ConfigError::Invalid {
                        name: "PARTYSHEET_DEV_ROSTER",
                        message: format!("expected a boolean, got {:?}", other),
                    })
                }
            },
        };

        let realtime_channel =
            value("PARTYSHEET_REALTIME_CHANNEL").unwrap_or_else(|| DEFAULT_CHANNEL.to_string());

        Ok(Self {
            supabase_url,
            supabase_anon_key,
            status_quiet_period,
            dev_roster,
            realtime_channel,
        })
    }

    pub fn sync(&self) -> SyncConfig {
        SyncConfig {
            status_quiet_period: self.status_quiet_period,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("SUPABASE_URL", "https://demo.supabase.co"),
        ("SUPABASE_ANON_KEY", "anon"),
    ];

    #[test]
    fn defaults_apply_when_only_credentials_are_set() {
        let config = config(&REQUIRED).expect("config");
        assert_eq!(config.status_quiet_period, Duration::from_millis(500));
        assert!(!config.dev_roster);
        assert_eq!(config.realtime_channel, "schema-db-changes");
        assert_eq!(config.supabase_url.host_str(), Some("demo.supabase.co"));
    }

    #[test]
    fn missing_credentials_are_reported() {
        assert!(matches!(
            config(&[("SUPABASE_URL", "https://demo.supabase.co")]),
            Err(ConfigError::Missing("SUPABASE_ANON_KEY"))
        ));
        assert!(matches!(
            config(&[("SUPABASE_URL", "  "), ("SUPABASE_ANON_KEY", "anon")]),
            Err(ConfigError::Missing("SUPABASE_URL"))
        ));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PARTYSHEET_STATUS_DEBOUNCE_MS", "250"));
        vars.push(("PARTYSHEET_DEV_ROSTER", "true"));
        vars.push(("PARTYSHEET_REALTIME_CHANNEL", "table-db-changes"));

        let config = config(&vars).expect("config");
        assert_eq!(config.sync().status_quiet_period, Duration::from_millis(250));
        assert!(config.dev_roster);
        assert_eq!(config.realtime_channel, "table-db-changes");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PARTYSHEET_STATUS_DEBOUNCE_MS", "soon"));
        assert!(matches!(
            config(&vars),
            Err(ConfigError::Invalid {
                name: "PARTYSHEET_STATUS_DEBOUNCE_MS",
                ..
            })
        ));

        let mut vars = REQUIRED.to_vec();
        vars.push(("PARTYSHEET_DEV_ROSTER", "maybe"));
        assert!(config(&vars).is_err());
    }
}
