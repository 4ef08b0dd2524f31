//! Drives full request sessions against scripted ledger behavior.

use std::sync::Arc;
use std::time::Duration;

use provernet_sdk::prelude::*;
use provernet_sdk::request::RequestRecord;
use provernet_sdk::testing::MockLedger;

use crate::types::{Expected, SuiteReport, TestCase, TestResult};

/// Runs [`TestCase`]s end to end: in-memory ledger, registered image,
/// funded payer, and whatever prover/canceller/clock behavior the case
/// scripts.
pub struct E2ERunner {
    pub poll_interval: Duration,
    pub funding: u64,
}

impl E2ERunner {
    pub fn default_config() -> Self {
        Self { poll_interval: Duration::from_millis(25), funding: 100_000_000_000 }
    }

    pub async fn run_test(&self, case: &TestCase) -> TestResult {
        let program = Address([0xe2; 32]);

        let image = match ImageId::from_hex(case.image_hex) {
            Ok(image) => image,
            Err(error) => return Self::fail(case, format!("bad image id: {error}")),
        };

        let mock = Arc::new(MockLedger::new());
        mock.register_image(&image, &program);
        let payer = SigningIdentity::generate();
        let payer_address = payer.address();
        mock.fund(payer_address, self.funding);

        if let Some(delay) = case.claim_after {
            let prover = mock.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                loop {
                    if prover.claim_first_unclaimed(&program).is_some() {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
            });
        }

        let cancel = case.cancel_after.map(|delay| {
            let (handle, signal) = cancellation();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                handle.cancel();
            });
            signal
        });

        if let Some(delay) = case.expire_after {
            let clock = mock.clone();
            let jump = case.expiry_offset + 1_000;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                clock.advance_slot(jump);
            });
        }

        let config = ClientConfig {
            poll_interval: self.poll_interval,
            watch_timeout: case.watch_timeout,
            ..ClientConfig::default()
        };
        let ledger: Arc<dyn Ledger> = mock.clone();
        let session = RequestSession::new(ledger, program, payer, config);

        let outcome = match session
            .run(
                &image,
                InputPayload::Inline(case.input.as_bytes().to_vec()),
                SessionParams {
                    tip: case.tip,
                    expiry_offset: case.expiry_offset,
                    callback_program: program,
                },
                cancel,
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(error) => {
                return Self::fail(
                    case,
                    format!("session failed in {} phase: {error}", error.phase()),
                )
            }
        };

        let matched = matches!(
            (&outcome.resolution, case.expected),
            (Resolution::ClaimedOrFulfilled(_), Expected::ClaimedOrFulfilled)
                | (Resolution::WatchTimedOut { .. }, Expected::WatchTimeout)
                | (Resolution::Cancelled, Expected::Cancelled)
                | (Resolution::Expired { .. }, Expected::Expired)
        );
        if !matched {
            return Self::fail(
                case,
                format!("resolved to {:?}, expected {:?}", outcome.resolution, case.expected),
            );
        }

        // whatever the resolution, the request itself must be durable and
        // intact on the ledger
        let data = match mock.account_data(&outcome.account) {
            Some(data) => data,
            None => return Self::fail(case, "request account missing after session".into()),
        };
        let record = match RequestRecord::from_bytes(&data) {
            Ok(record) => record,
            Err(error) => return Self::fail(case, format!("undecodable record: {error}")),
        };
        if record.tip != case.tip
            || record.payer != payer_address
            || record.image_ref != outcome.image_ref
            || record.input != InputPayload::Inline(case.input.as_bytes().to_vec())
        {
            return Self::fail(case, "persisted record does not match the submission".into());
        }

        TestResult { name: case.name, passed: true, error: None, outcome: Some(outcome) }
    }

    pub async fn run_standard_suite(&self) -> SuiteReport {
        let cases = [
            TestCase::hello_world(),
            TestCase::never_claimed(),
            TestCase::cancelled_midway(),
            TestCase::expires_unclaimed(),
            TestCase::slow_prover(),
        ];
        let mut report = SuiteReport::default();
        for case in &cases {
            report.push(self.run_test(case).await);
        }
        report
    }

    fn fail(case: &TestCase, error: String) -> TestResult {
        TestResult { name: case.name, passed: false, error: Some(error), outcome: None }
    }
}
