use miette::Diagnostic;
use thiserror::Error;

/// Errors raised by a channel to the document service.
///
/// None of these are fatal to the bridge: every one of them ends the current
/// connection and schedules a reconnect.
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum TransportError {
    #[error("failed to connect to {url}")]
    #[diagnostic(code(weft::transport::connect))]
    Connect {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to send message")]
    #[diagnostic(code(weft::transport::send))]
    Send(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to receive message")]
    #[diagnostic(code(weft::transport::receive))]
    Receive(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to encode operation")]
    #[diagnostic(code(weft::transport::encode))]
    Encode(#[from] serde_json::Error),

    #[error("connection closed")]
    #[diagnostic(code(weft::transport::closed))]
    Closed,
}

impl TransportError {
    pub fn connect(url: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Connect {
            url: url.into(),
            source: Box::new(source),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid configuration value for {field}: {message}")]
    #[diagnostic(
        code(weft::config::invalid),
        help("Check the {field} setting or the matching environment variable")
    )]
    InvalidValue { field: &'static str, message: String },

    #[error("failed to parse URL: {url}")]
    #[diagnostic(code(weft::config::url_parse))]
    UrlParse { url: String, message: String },
}
