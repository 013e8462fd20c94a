use thiserror::Error;

/// Crate-wide error taxonomy. Each variant maps to one of the categories
/// components must classify errors into before deciding whether to skip,
/// retry next tick, or abort.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or ill-formed input, e.g. a non-positive `order_size`.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unknown strategy-id or account-key.
    #[error("not found: {0}")]
    NotFound(String),

    /// Required venue-specific field missing (e.g. `vault` for the
    /// Starknet venue), or malformed account record.
    #[error("configuration error on field `{field}`: {message}")]
    Configuration { field: String, message: String },

    /// Network timeouts, socket resets, "connector closed". Retryable on
    /// the next tick; never fatal on its own.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// Venue rejected the request: rate-limited, insufficient margin,
    /// post-only would have crossed the spread.
    #[error("venue rejected request: {0}")]
    VenueRejection(String),

    /// Unrecoverable: executor thread dead, SDK session unrecoverably
    /// broken. Prevents a strategy from transitioning to running.
    #[error("fatal error: {0}")]
    Fatal(String),
}

impl Error {
    /// Classifies a raw venue SDK error message the way the adapter
    /// boundary must before handing it to the Strategy Core. Token
    /// matching happens exactly once, here, rather than being
    /// re-implemented wherever an error is observed.
    pub fn classify_venue_message(msg: &str) -> Error {
        let lower = msg.to_lowercase();
        if lower.contains("timeout") || lower.contains("timed out") {
            Error::Connectivity(msg.to_string())
        } else if lower.contains("rate limit") || lower.contains("insufficient margin") {
            Error::VenueRejection(msg.to_string())
        } else if lower.contains("post") && lower.contains("cross") {
            Error::VenueRejection(msg.to_string())
        } else {
            Error::Connectivity(msg.to_string())
        }
    }

    /// True if the error message identifies a timeout, in either locale
    /// token the original venue logs used ("timeout" / "超时"). Used to
    /// suppress PositionManager's log spam on a stalled loop.
    pub fn is_timeout_message(msg: &str) -> bool {
        let lower = msg.to_lowercase();
        lower.contains("timeout") || msg.contains("超时")
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_timeout_as_connectivity() {
        matches!(
            Error::classify_venue_message("request timeout after 60s"),
            Error::Connectivity(_)
        );
    }

    #[test]
    fn classifies_rate_limit_as_venue_rejection() {
        matches!(
            Error::classify_venue_message("Rate limit exceeded"),
            Error::VenueRejection(_)
        );
    }

    #[test]
    fn is_timeout_message_matches_both_locales() {
        assert!(Error::is_timeout_message("request timeout"));
        assert!(Error::is_timeout_message("操作超时"));
        assert!(!Error::is_timeout_message("insufficient margin"));
    }
}
