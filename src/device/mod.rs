pub mod client;

pub use client::query;

use bytes::Bytes;
use std::time::Duration;

/// Outcome of a single query round trip. Produced exactly once per attempt.
pub type QueryOutcome = Result<Bytes, QueryError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("write failed: {0}")]
    Write(String),
    #[error("timeout after {0} ms")]
    Timeout(u128),
    #[error("socket error: {0}")]
    Socket(String),
    #[error("response exceeded {0} bytes")]
    Oversize(usize),
}

impl QueryError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

// DeviceTarget {{{
/// One physical battery unit, addressed by host and port.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceTarget {
    host: String,
    port: u16,
}

impl DeviceTarget {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Topic segment for this device: 192.168.1.50 -> 192-168-1-50
    pub fn topic_prefix(&self) -> String {
        self.host.replace('.', "-")
    }
}

impl std::fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
} // }}}

// QueryOptions {{{
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryOptions {
    /// Bounds the whole attempt, starting at connect.
    pub timeout: Duration,
    /// Ends accumulation early when seen. Empty is treated as unset.
    pub delimiter: Option<Bytes>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            delimiter: None,
        }
    }
}

impl QueryOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_delimiter(mut self, delimiter: &[u8]) -> Self {
        self.delimiter = Some(Bytes::copy_from_slice(delimiter));
        self
    }

    pub fn delimiter(&self) -> Option<&[u8]> {
        self.delimiter.as_deref().filter(|d| !d.is_empty())
    }
} // }}}
