//! Timeout enforcement and transport failure classification.
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; dropping the timed-out future drops
//!   the outbound connection with it
//! - Timeout errors are distinct from other errors
//! - Timeouts and connection resets return 504, everything else 502

use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::io;
use std::time::Duration;

/// Why the upstream produced no usable response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailureKind {
    /// Deadline exceeded before the full response arrived.
    Timeout,
    /// The connection was reset, aborted or broken mid-exchange.
    ConnectionReset,
    /// DNS, refused connection, TLS or any other transport error.
    Other,
}

impl TransportFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportFailureKind::Timeout => "timeout",
            TransportFailureKind::ConnectionReset => "connection_reset",
            TransportFailureKind::Other => "other",
        }
    }

    /// Timeouts and resets are gateway timeouts, the rest bad gateways.
    pub fn is_gateway_timeout(&self) -> bool {
        matches!(
            self,
            TransportFailureKind::Timeout | TransportFailureKind::ConnectionReset
        )
    }
}

impl fmt::Display for TransportFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure to obtain a response from the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub kind: TransportFailureKind,
    /// Best-effort diagnostic code (`ETIMEDOUT`, `ECONNREFUSED`, ...).
    pub code: &'static str,
    pub message: String,
}

impl TransportFailure {
    pub fn timeout(deadline: Duration) -> Self {
        Self {
            kind: TransportFailureKind::Timeout,
            code: "ETIMEDOUT",
            message: format!("upstream did not respond within {}s", deadline.as_secs_f64()),
        }
    }

    /// Classify a client error.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        let message = error_chain(err);

        if err.is_timeout() {
            return Self {
                kind: TransportFailureKind::Timeout,
                code: "ETIMEDOUT",
                message,
            };
        }

        // upstream closed the socket without answering
        if find_source::<hyper::Error>(err).is_some_and(|e| e.is_incomplete_message()) {
            return Self::reset("ECONNRESET", message);
        }

        if let Some(io_kind) = find_source::<io::Error>(err).map(io::Error::kind) {
            match io_kind {
                io::ErrorKind::ConnectionReset => {
                    return Self::reset("ECONNRESET", message);
                }
                io::ErrorKind::ConnectionAborted => {
                    return Self::reset("ECONNABORTED", message);
                }
                io::ErrorKind::BrokenPipe => {
                    return Self::reset("EPIPE", message);
                }
                io::ErrorKind::TimedOut => {
                    return Self {
                        kind: TransportFailureKind::Timeout,
                        code: "ETIMEDOUT",
                        message,
                    };
                }
                io::ErrorKind::ConnectionRefused => {
                    return Self::other("ECONNREFUSED", message);
                }
                _ => {}
            }
        }

        let code = if err.is_connect() {
            if is_dns_failure(&message) {
                "ENOTFOUND"
            } else if is_tls_failure(&message) {
                "ETLS"
            } else {
                "ECONNECT"
            }
        } else if err.is_body() || err.is_decode() {
            "EBODY"
        } else if err.is_request() || err.is_builder() {
            "EREQUEST"
        } else {
            "UNKNOWN"
        };

        Self::other(code, message)
    }

    fn reset(code: &'static str, message: String) -> Self {
        Self {
            kind: TransportFailureKind::ConnectionReset,
            code,
            message,
        }
    }

    fn other(code: &'static str, message: String) -> Self {
        Self {
            kind: TransportFailureKind::Other,
            code,
            message,
        }
    }
}

/// Run `future` under a deadline, classifying its error or the elapsed
/// deadline as a [`TransportFailure`].
pub async fn with_deadline<T, F>(deadline: Duration, future: F) -> Result<T, TransportFailure>
where
    F: Future<Output = Result<T, reqwest::Error>>,
{
    match tokio::time::timeout(deadline, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(TransportFailure::from_reqwest(&e)),
        Err(_) => Err(TransportFailure::timeout(deadline)),
    }
}

/// First error of type `T` along the source chain.
fn find_source<'a, T: StdError + 'static>(err: &'a (dyn StdError + 'static)) -> Option<&'a T> {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = source {
        if let Some(found) = e.downcast_ref::<T>() {
            return Some(found);
        }
        source = e.source();
    }
    None
}

/// Render an error and all of its sources on one line.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(e) = source {
        let text = e.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = e.source();
    }
    message
}

fn is_dns_failure(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("dns") || message.contains("failed to lookup") || message.contains("name or service not known")
}

fn is_tls_failure(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("tls") || message.contains("certificate") || message.contains("handshake")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_timeout_classes() {
        assert!(TransportFailureKind::Timeout.is_gateway_timeout());
        assert!(TransportFailureKind::ConnectionReset.is_gateway_timeout());
        assert!(!TransportFailureKind::Other.is_gateway_timeout());
    }

    #[test]
    fn io_error_found_through_chain() {
        #[derive(Debug)]
        struct Wrapper(io::Error);
        impl fmt::Display for Wrapper {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "wrapped")
            }
        }
        impl StdError for Wrapper {
            fn source(&self) -> Option<&(dyn StdError + 'static)> {
                Some(&self.0)
            }
        }

        let err = Wrapper(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"));
        let found = find_source::<io::Error>(&err).map(io::Error::kind);
        assert_eq!(found, Some(io::ErrorKind::ConnectionReset));
        assert_eq!(error_chain(&err), "wrapped: reset by peer");
    }

    #[tokio::test]
    async fn elapsed_deadline_is_timeout() {
        let deadline = Duration::from_millis(20);
        let result: Result<(), _> = with_deadline(deadline, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        let failure = result.unwrap_err();
        assert_eq!(failure.kind, TransportFailureKind::Timeout);
        assert_eq!(failure.code, "ETIMEDOUT");
    }

    #[tokio::test]
    async fn refused_connection_is_other() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = reqwest::Client::new();
        let result = with_deadline(
            Duration::from_secs(5),
            client.get(format!("http://{addr}/webhook")).send(),
        )
        .await;

        let failure = result.unwrap_err();
        assert_eq!(failure.kind, TransportFailureKind::Other);
        assert!(["ECONNREFUSED", "ECONNECT"].contains(&failure.code), "code {}", failure.code);
    }
}
