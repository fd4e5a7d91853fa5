use blank_core::admission::{self, SubmissionRequest};
use blank_core::time::unix_to_iso8601;
use blank_core::{Entry, Error, Result};
use blank_store::InsertOutcome;

use super::Pipeline;

impl Pipeline {
    /// Admit an entry against an already measured balance.
    pub async fn submit(
        &self,
        author_id: &str,
        text: &str,
        requested_core_memory: bool,
        measured_balance: f64,
    ) -> Result<Entry> {
        let now = self.now_secs();
        let request = SubmissionRequest {
            author_id,
            text,
            requested_core_memory,
            measured_balance,
        };
        let entry = admission::admit(
            &request,
            &self.policies,
            self.clock.cycle_at(now),
            unix_to_iso8601(now),
        )?;

        let outcome = self.store.lock().await.insert_entry_capped(&entry)?;
        match outcome {
            InsertOutcome::Inserted => {
                tracing::info!(
                    id = %entry.id,
                    tier = %entry.tier,
                    cycle = entry.cycle_number,
                    core = entry.is_core_memory,
                    "entry admitted"
                );
                Ok(entry.into_entry())
            }
            InsertOutcome::CapReached => Err(admission::rate_limit_exceeded(&entry)),
        }
    }

    /// Measure the author's balance, then [`Pipeline::submit`]. An oracle
    /// failure counts as a zero balance.
    pub async fn submit_entry(
        &self,
        author_id: &str,
        text: &str,
        requested_core_memory: bool,
    ) -> Result<Entry> {
        if !admission::is_valid_author_id(author_id) {
            return Err(Error::InvalidInput(
                "author id must be 32-64 alphanumeric characters".to_string(),
            ));
        }
        let balance = self.measure_balance(author_id).await;
        self.submit(author_id, text, requested_core_memory, balance)
            .await
    }

    async fn measure_balance(&self, account: &str) -> f64 {
        let timeout = self.settings.oracle_timeout;
        match tokio::time::timeout(timeout, self.oracle.balance_of(account)).await {
            Ok(Ok(balance)) => balance,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "balance oracle failed, treating balance as 0");
                0.0
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = timeout.as_secs_f32(),
                    "balance oracle timed out, treating balance as 0"
                );
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use blank_core::{EntryStatus, Tier};

    use crate::pipeline::testing::*;
    use super::*;

    fn with_balance(balance: f64) -> Harness {
        harness(
            ScriptedGenerator::replying("unused"),
            Arc::new(FixedOracle(balance)),
        )
    }

    #[tokio::test]
    async fn test_submit_entry_uses_oracle_balance() {
        let h = with_balance(60_000.0);
        let entry = h
            .pipeline
            .submit_entry(AUTHOR, "  the lights stayed on  ", false)
            .await
            .unwrap();
        assert_eq!(entry.tier, Tier::Two);
        assert_eq!(entry.measured_balance, 60_000.0);
        assert_eq!(entry.text, "the lights stayed on");
        assert_eq!(entry.status, EntryStatus::Pending);
        assert_eq!(entry.cycle_number, 1);
    }

    #[tokio::test]
    async fn test_oracle_failure_fails_closed() {
        let h = harness(ScriptedGenerator::replying("unused"), Arc::new(FailingOracle));
        let err = h.pipeline.submit_entry(AUTHOR, "hello", false).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientTier { balance, .. } if balance == 0.0));
    }

    #[tokio::test]
    async fn test_oracle_timeout_fails_closed() {
        let h = harness(ScriptedGenerator::replying("unused"), Arc::new(HangingOracle));
        let err = h.pipeline.submit_entry(AUTHOR, "hello", false).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientTier { .. }));
    }

    #[tokio::test]
    async fn test_bad_author_rejected_before_oracle() {
        let h = harness(ScriptedGenerator::replying("unused"), Arc::new(HangingOracle));
        let err = h
            .pipeline
            .submit_entry("short", "hello", false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_tier_zero_always_rejected() {
        let h = with_balance(0.0);
        for balance in [0.0, 1.0, 9_999.99] {
            let err = h.pipeline.submit(AUTHOR, "hi", false, balance).await.unwrap_err();
            assert!(matches!(err, Error::InsufficientTier { .. }), "{balance}");
        }
    }

    #[tokio::test]
    async fn test_length_boundary() {
        let h = with_balance(0.0);
        let exact = "a".repeat(1000);
        h.pipeline.submit(AUTHOR, &exact, false, 60_000.0).await.unwrap();

        let over = "a".repeat(1001);
        let err = h
            .pipeline
            .submit(AUTHOR, &over, false, 60_000.0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TextTooLong { max: 1000, len: 1001, .. }));
    }

    #[tokio::test]
    async fn test_core_request_below_tier_three_is_refused() {
        let h = with_balance(0.0);
        let err = h
            .pipeline
            .submit(AUTHOR, "remember me", true, 60_000.0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CoreMemoryNotEligible { tier: Tier::Two }));

        let entry = h
            .pipeline
            .submit(AUTHOR, "remember me", true, 250_000.0)
            .await
            .unwrap();
        assert!(entry.is_core_memory);
    }

    #[tokio::test]
    async fn test_capped_tier_second_submission_then_next_cycle() {
        let h = with_balance(0.0);
        h.pipeline.submit(AUTHOR, "first", false, 10_000.0).await.unwrap();

        let err = h
            .pipeline
            .submit(AUTHOR, "second", false, 10_000.0)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::RateLimitExceeded {
                tier: Tier::One,
                cap: 1,
                cycle: 1
            }
        );

        // Other authors are unaffected.
        h.pipeline
            .submit(OTHER_AUTHOR, "mine", false, 10_000.0)
            .await
            .unwrap();

        h.advance_days(1);
        let entry = h
            .pipeline
            .submit(AUTHOR, "second", false, 10_000.0)
            .await
            .unwrap();
        assert_eq!(entry.cycle_number, 2);
    }

    #[tokio::test]
    async fn test_concurrent_capped_submissions_admit_one() {
        let h = with_balance(0.0);
        let a = h.pipeline.clone();
        let b = h.pipeline.clone();
        let (ra, rb) = tokio::join!(
            a.submit(AUTHOR, "one", false, 10_000.0),
            b.submit(AUTHOR, "two", false, 10_000.0),
        );
        assert_eq!(ra.is_ok() as u8 + rb.is_ok() as u8, 1);
    }
}
