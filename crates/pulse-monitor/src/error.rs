//! Probe error types and outcome classification.

use bounded_fetch::FetchError;
use thiserror::Error;

/// Substrings that mark an error message as a network-layer failure.
const NETWORK_MARKERS: [&str; 4] = ["fetch", "network", "abort", "timeout"];

/// Liveness probe error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error(transparent)]
    Transport(#[from] FetchError),

    /// The backend answered, but not with success.
    #[error("Probe rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// What a failed probe says about reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeVerdict {
    /// The backend could not be reached.
    Unreachable,
    /// The failure says nothing about reachability.
    Inconclusive,
}

impl ProbeError {
    pub fn verdict(&self) -> ProbeVerdict {
        let unreachable = match self {
            ProbeError::Transport(err) => {
                err.is_network_class() || mentions_network_failure(&err.to_string())
            }
            ProbeError::Rejected { message, .. } => mentions_network_failure(message),
        };

        if unreachable {
            ProbeVerdict::Unreachable
        } else {
            ProbeVerdict::Inconclusive
        }
    }
}

fn mentions_network_failure(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    NETWORK_MARKERS.iter().any(|marker| message.contains(marker))
}

/// Result type alias using ProbeError.
pub type ProbeResult<T> = Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_failures_are_unreachable() {
        for err in [
            FetchError::Timeout { after_ms: 15_000 },
            FetchError::Aborted,
            FetchError::Network("dns error".to_string()),
        ] {
            assert_eq!(ProbeError::from(err).verdict(), ProbeVerdict::Unreachable);
        }
    }

    #[test]
    fn test_decode_failure_is_inconclusive() {
        let err = ProbeError::from(FetchError::Decode("expected value".to_string()));
        assert_eq!(err.verdict(), ProbeVerdict::Inconclusive);
    }

    #[test]
    fn test_rejection_classified_by_message() {
        let gateway = ProbeError::Rejected {
            status: 502,
            message: "TypeError: Failed to fetch".to_string(),
        };
        assert_eq!(gateway.verdict(), ProbeVerdict::Unreachable);

        let auth = ProbeError::Rejected {
            status: 401,
            message: "JWT expired".to_string(),
        };
        assert_eq!(auth.verdict(), ProbeVerdict::Inconclusive);
    }
}
