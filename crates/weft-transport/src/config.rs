use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

/// Where the document service listens.
///
/// The socket URL is `ws://<host>:<port>/ws`, or `wss://` when secure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub secure: bool,
}

impl Endpoint {
    /// Port the document service is served on unless overridden.
    pub const DEFAULT_PORT: u16 = 8080;

    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            secure: false,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn url(&self) -> Result<Url, ConfigError> {
        let scheme = if self.secure { "wss" } else { "ws" };
        parse_url(&format!("{scheme}://{}:{}/ws", self.host, self.port))
    }
}

/// Configuration for the transport bridge.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Websocket URL of the document service
    pub url: Url,
    /// Wait between a closed or failed connection and the next attempt
    pub reconnect_delay: Duration,
    /// Most operations buffered while not connected
    pub outbox_capacity: usize,
}

impl TransportConfig {
    pub const DEFAULT_HOST: &'static str = "localhost";
    pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1000);
    pub const DEFAULT_OUTBOX_CAPACITY: usize = 1024;

    pub fn new(url: Url) -> Self {
        Self {
            url,
            reconnect_delay: Self::DEFAULT_RECONNECT_DELAY,
            outbox_capacity: Self::DEFAULT_OUTBOX_CAPACITY,
        }
    }

    pub fn for_endpoint(endpoint: &Endpoint) -> Result<Self, ConfigError> {
        Ok(Self::new(endpoint.url()?))
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_outbox_capacity(mut self, capacity: usize) -> Self {
        self.outbox_capacity = capacity;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Optional env vars:
    /// - `WEFT_URL`: full websocket URL, overrides the endpoint vars below
    /// - `WEFT_HOST`: service host (default: localhost)
    /// - `WEFT_PORT`: service port (default: 8080)
    /// - `WEFT_SECURE`: use `wss` (default: false)
    /// - `WEFT_RECONNECT_DELAY_MS`: reconnect delay (default: 1000)
    /// - `WEFT_OUTBOX_CAPACITY`: offline buffer size (default: 1024)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = match lookup("WEFT_URL") {
            Some(url) => parse_url(&url)?,
            None => {
                let host = lookup("WEFT_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
                let port = parse_var(&lookup, "WEFT_PORT")?.unwrap_or(Endpoint::DEFAULT_PORT);
                let secure = match lookup("WEFT_SECURE") {
                    Some(value) => parse_flag("WEFT_SECURE", &value)?,
                    None => false,
                };
                Endpoint::new(host).with_port(port).with_secure(secure).url()?
            }
        };

        let mut config = Self::new(url);
        if let Some(ms) = parse_var::<u64>(&lookup, "WEFT_RECONNECT_DELAY_MS")? {
            config.reconnect_delay = Duration::from_millis(ms);
        }
        if let Some(capacity) = parse_var(&lookup, "WEFT_OUTBOX_CAPACITY")? {
            config.outbox_capacity = capacity;
        }
        Ok(config)
    }
}

fn parse_url(url: &str) -> Result<Url, ConfigError> {
    let parsed = Url::parse(url).map_err(|e| ConfigError::UrlParse {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed),
        other => Err(ConfigError::UrlParse {
            url: url.to_string(),
            message: format!("unsupported scheme {other}, expected ws or wss"),
        }),
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    field: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    lookup(field)
        .map(|raw| {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                field,
                message: e.to_string(),
            })
        })
        .transpose()
}

fn parse_flag(field: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            field,
            message: format!("expected a boolean, got {other:?}"),
        }),
    }
}
