//! Main e2e test entrypoint.
//!
//! Run with: cargo test -p e2e-tests

use e2e_tests::{E2ERunner, Expected, TestCase};
use provernet_sdk::Resolution;

#[tokio::test]
async fn test_e2e_hello_world() {
    let runner = E2ERunner::default_config();
    let result = runner.run_test(&TestCase::hello_world()).await;

    assert!(result.passed, "hello_world failed: {:?}", result.error);
    let outcome = result.outcome.expect("passing case carries an outcome");
    assert!(matches!(outcome.resolution, Resolution::ClaimedOrFulfilled(_)));
    // the request account is freshly minted, distinct from the image address
    assert_ne!(outcome.account, outcome.image_ref);
}

#[tokio::test]
async fn test_e2e_never_claimed() {
    let runner = E2ERunner::default_config();
    let result = runner.run_test(&TestCase::never_claimed()).await;

    assert!(result.passed, "never_claimed failed: {:?}", result.error);
    let outcome = result.outcome.unwrap();
    assert!(matches!(outcome.resolution, Resolution::WatchTimedOut { .. }));
}

#[tokio::test]
async fn test_e2e_cancelled_midway() {
    let runner = E2ERunner::default_config();
    let result = runner.run_test(&TestCase::cancelled_midway()).await;

    assert!(result.passed, "cancelled_midway failed: {:?}", result.error);
    assert!(matches!(result.outcome.unwrap().resolution, Resolution::Cancelled));
}

#[tokio::test]
async fn test_e2e_expires_unclaimed() {
    let runner = E2ERunner::default_config();
    let result = runner.run_test(&TestCase::expires_unclaimed()).await;

    assert!(result.passed, "expires_unclaimed failed: {:?}", result.error);
    assert!(matches!(result.outcome.unwrap().resolution, Resolution::Expired { .. }));
}

#[tokio::test]
async fn test_e2e_fresh_account_per_session() {
    let runner = E2ERunner::default_config();
    let first = runner.run_test(&TestCase::hello_world()).await;
    let second = runner.run_test(&TestCase::hello_world()).await;

    assert!(first.passed && second.passed);
    // image addresses are derived and identical; request accounts are minted
    let (a, b) = (first.outcome.unwrap(), second.outcome.unwrap());
    assert_eq!(a.image_ref, b.image_ref);
    assert_ne!(a.account, b.account);
}

#[tokio::test]
async fn test_e2e_standard_suite() {
    let runner = E2ERunner::default_config();
    let results = runner.run_standard_suite().await;

    results.print_summary();

    assert!(
        results.all_passed(),
        "e2e suite failed: {} of {} scenarios failed",
        results.failed,
        results.total
    );

    let expectations: Vec<Expected> = [
        TestCase::hello_world(),
        TestCase::never_claimed(),
        TestCase::cancelled_midway(),
        TestCase::expires_unclaimed(),
        TestCase::slow_prover(),
    ]
    .iter()
    .map(|case| case.expected)
    .collect();
    assert_eq!(results.total, expectations.len());
}
