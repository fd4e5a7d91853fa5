use crate::tier::Tier;

/// Every condition the pipeline reports to a caller.
///
/// Variants are user-legible on their own; transports only choose a status
/// code per variant and forward the message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("insufficient balance to write: measured {balance}, tier I needs {required}")]
    InsufficientTier { balance: f64, required: f64 },

    #[error("entry too long: tier {tier} allows {max} characters, got {len}")]
    TextTooLong { tier: Tier, max: usize, len: usize },

    #[error("core memories require tier III, author is tier {tier}")]
    CoreMemoryNotEligible { tier: Tier },

    #[error("tier {tier} allows {cap} entries per cycle, limit reached for cycle {cycle}")]
    RateLimitExceeded { tier: Tier, cap: u32, cycle: u32 },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid transition: cannot {action} an entry that is {from}")]
    InvalidTransition { action: &'static str, from: String },

    #[error("no approved entries in cycle {0}, nothing to synthesize")]
    NothingToSynthesize(u32),

    #[error("generation failed: {0}")]
    GenerationFailed(String),

    #[error("balance oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl Error {
    /// Stable snake_case code for wire payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::InsufficientTier { .. } => "insufficient_tier",
            Error::TextTooLong { .. } => "text_too_long",
            Error::CoreMemoryNotEligible { .. } => "core_memory_not_eligible",
            Error::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Error::NotFound(_) => "not_found",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::NothingToSynthesize(_) => "nothing_to_synthesize",
            Error::GenerationFailed(_) => "generation_failed",
            Error::OracleUnavailable(_) => "oracle_unavailable",
            Error::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_legible() {
        let err = Error::TextTooLong {
            tier: Tier::One,
            max: 280,
            len: 300,
        };
        assert_eq!(
            err.to_string(),
            "entry too long: tier I allows 280 characters, got 300"
        );
        assert_eq!(err.code(), "text_too_long");
    }

    #[test]
    fn test_transition_message() {
        let err = Error::InvalidTransition {
            action: "approve",
            from: "rejected".to_string(),
        };
        assert!(err.to_string().contains("cannot approve"));
        assert!(err.to_string().contains("rejected"));
    }
}
