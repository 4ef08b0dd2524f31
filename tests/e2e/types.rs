//! Scenario definitions for the e2e suite.

use std::time::Duration;

/// The image id used throughout the suite (the hello-world computation).
pub const HELLO_IMAGE_HEX: &str =
    "7f8ebdabe3ed69b8d47b2cbc86e8668d171e1a0ced01610fd1ecc224db69767b";

/// Which terminal resolution a scenario must end in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expected {
    ClaimedOrFulfilled,
    WatchTimeout,
    Cancelled,
    Expired,
}

/// One end-to-end scenario: a request plus the scripted environment
/// behavior around it.
#[derive(Clone, Debug)]
pub struct TestCase {
    pub name: &'static str,
    pub image_hex: &'static str,
    pub input: &'static str,
    pub tip: u64,
    pub expiry_offset: u64,
    /// Simulated prover claims the request after this delay.
    pub claim_after: Option<Duration>,
    /// Caller cancels the watch after this delay.
    pub cancel_after: Option<Duration>,
    /// The slot clock jumps past the expiry after this delay.
    pub expire_after: Option<Duration>,
    /// Synchronous wait bound for the watch phase.
    pub watch_timeout: Duration,
    pub expected: Expected,
}

impl TestCase {
    fn base(name: &'static str) -> Self {
        Self {
            name,
            image_hex: HELLO_IMAGE_HEX,
            input: "Hello, World!",
            tip: 12_000,
            expiry_offset: 2_000,
            claim_after: None,
            cancel_after: None,
            expire_after: None,
            watch_timeout: Duration::from_secs(5),
            expected: Expected::ClaimedOrFulfilled,
        }
    }

    /// The canonical flow: submit, prover claims shortly after.
    pub fn hello_world() -> Self {
        Self { claim_after: Some(Duration::from_millis(80)), ..Self::base("hello_world") }
    }

    /// No prover ever shows up; the watch times out as an outcome.
    pub fn never_claimed() -> Self {
        Self {
            watch_timeout: Duration::from_millis(200),
            expected: Expected::WatchTimeout,
            ..Self::base("never_claimed")
        }
    }

    /// The caller cancels mid-watch.
    pub fn cancelled_midway() -> Self {
        Self {
            cancel_after: Some(Duration::from_millis(80)),
            watch_timeout: Duration::from_secs(30),
            expected: Expected::Cancelled,
            ..Self::base("cancelled_midway")
        }
    }

    /// The expiry slot passes with the request still unclaimed.
    pub fn expires_unclaimed() -> Self {
        Self {
            expiry_offset: 10,
            expire_after: Some(Duration::from_millis(80)),
            watch_timeout: Duration::from_secs(30),
            expected: Expected::Expired,
            ..Self::base("expires_unclaimed")
        }
    }

    /// A slow prover that still beats the timeout.
    pub fn slow_prover() -> Self {
        Self { claim_after: Some(Duration::from_millis(300)), ..Self::base("slow_prover") }
    }
}

/// Result of one scenario run.
#[derive(Debug)]
pub struct TestResult {
    pub name: &'static str,
    pub passed: bool,
    pub error: Option<String>,
    /// The session's terminal outcome, when it produced one.
    pub outcome: Option<provernet_sdk::RequestOutcome>,
}

/// Aggregate over a suite run.
#[derive(Debug, Default)]
pub struct SuiteReport {
    pub results: Vec<TestResult>,
    pub total: usize,
    pub failed: usize,
}

impl SuiteReport {
    pub fn push(&mut self, result: TestResult) {
        self.total += 1;
        if !result.passed {
            self.failed += 1;
        }
        self.results.push(result);
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn print_summary(&self) {
        println!("e2e suite: {}/{} passed", self.total - self.failed, self.total);
        for result in &self.results {
            let status = if result.passed { "PASS" } else { "FAIL" };
            match &result.error {
                Some(error) => println!("  [{status}] {} — {error}", result.name),
                None => println!("  [{status}] {}", result.name),
            }
        }
    }
}
