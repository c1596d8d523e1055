//! Server configuration, read from the environment.

use std::env;
use std::str::FromStr;

use tsutome_session::SessionConfig;

use crate::TsutomeError;

/// Settings for [`TsutomeServer`](crate::TsutomeServer).
///
/// | Variable | Field | Default |
/// |---|---|---|
/// | `TSUTOME_BIND` | `bind_addr` | `127.0.0.1:8080` |
/// | `TSUTOME_SESSION_IDLE_SECS` | `session.idle_timeout_secs` | one week |
/// | `TSUTOME_REAP_INTERVAL_SECS` | `session.reap_interval_secs` | 60 |
/// | `TSUTOME_SECURE_COOKIE` | `secure_cookie` | `false` |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub session: SessionConfig,
    /// Adds `Secure` to the session cookie. Turn on behind HTTPS.
    pub secure_cookie: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            session: SessionConfig::default(),
            secure_cookie: false,
        }
    }
}

impl ServerConfig {
    /// Reads the process environment. Unset variables keep their
    /// defaults; set but unparsable ones are an error.
    pub fn from_env() -> Result<Self, TsutomeError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, TsutomeError> {
        let mut config = Self::default();
        if let Some(addr) = lookup("TSUTOME_BIND") {
            config.bind_addr = addr;
        }
        if let Some(secs) = parse(&lookup, "TSUTOME_SESSION_IDLE_SECS")? {
            config.session.idle_timeout_secs = secs;
        }
        if let Some(secs) = parse(&lookup, "TSUTOME_REAP_INTERVAL_SECS")? {
            config.session.reap_interval_secs = secs;
        }
        if let Some(secure) = parse(&lookup, "TSUTOME_SECURE_COOKIE")? {
            config.secure_cookie = secure;
        }
        Ok(config)
    }
}

fn parse<V: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<V>, TsutomeError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| TsutomeError::Config(format!("{key}: cannot parse {raw:?}"))),
    }
}
