//! TAP (Test Anything Protocol) harness for on-device verification.
//!
//! The link protocol is covered by ordinary `cargo test` unit tests on the
//! host. This harness exists for the parts that are worth re-running on a
//! flashed board (budget arithmetic, wake signalling, payload codec), where
//! the only output channel is the serial console.
//!
//! Only compiled with the `tap-tests` feature so production images never
//! carry test code.
//!
//! ```ignore
//! #[cfg(feature = "tap-tests")]
//! mod tap_tests {
//!     use super::*;
//!     use doorlink_esp32_macros::tap_test;
//!
//!     #[tap_test]
//!     fn refill_restores_budget() {
//!         let mut budget = SendBudget::new(3);
//!         budget.refill();
//!         assert_eq!(budget.remaining(), 3);
//!     }
//! }
//! ```
//!
//! `src/bin/device-tests.rs` calls [`run_all_tests`] and exits (host) or
//! halts (board) once the plan is complete.

use std::panic::{catch_unwind, AssertUnwindSafe};

// Re-exported for the `#[tap_test]` expansion.
pub use inventory;

/// Result type for fallible test bodies.
pub type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Registration hook generated by `#[tap_test]`.
pub type TestRegisterFn = fn(&mut TestRunner);

/// One collected test.
pub struct TapTestEntry {
    /// Test name as printed in the TAP stream.
    pub name: &'static str,
    /// Runs the test against a runner.
    pub register: TestRegisterFn,
}

impl TapTestEntry {
    pub const fn new(name: &'static str, register: TestRegisterFn) -> Self {
        Self { name, register }
    }
}

inventory::collect!(TapTestEntry);

/// Number of tests registered via `#[tap_test]`.
pub fn test_count() -> usize {
    inventory::iter::<TapTestEntry>.into_iter().count()
}

/// Run every registered test. Returns `true` if all passed.
pub fn run_all_tests() -> bool {
    let mut runner = TestRunner::new();
    runner.print_header(test_count());

    for entry in inventory::iter::<TapTestEntry> {
        (entry.register)(&mut runner);
    }

    runner.finish()
}

/// Outcome of a single test, before it is written to the stream.
enum Outcome {
    Pass,
    Fail(String),
}

/// Sequential TAP runner. Counts results and prints one line per test.
#[derive(Default)]
pub struct TestRunner {
    tests_run: usize,
    tests_passed: usize,
    tests_failed: usize,
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl TestRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a test returning [`TestResult`]. Panics count as failures.
    pub fn run<F>(&mut self, name: &str, test_fn: F)
    where
        F: FnOnce() -> TestResult + std::panic::UnwindSafe,
    {
        let outcome = match catch_unwind(AssertUnwindSafe(test_fn)) {
            Ok(Ok(())) => Outcome::Pass,
            Ok(Err(e)) => Outcome::Fail(format!("Error: {}", e)),
            Err(payload) => Outcome::Fail(format!("Panic: {}", panic_message(&payload))),
        };
        self.report(name, outcome);
    }

    /// Run an assertion-style test.
    pub fn run_assert<F>(&mut self, name: &str, test_fn: F)
    where
        F: FnOnce() + std::panic::UnwindSafe,
    {
        self.run(name, || {
            test_fn();
            Ok(())
        });
    }

    /// Run a test that must panic, optionally with a message containing `expected`.
    pub fn run_should_panic<F>(&mut self, name: &str, test_fn: F, expected: Option<&str>)
    where
        F: FnOnce() + std::panic::UnwindSafe,
    {
        let outcome = match catch_unwind(AssertUnwindSafe(test_fn)) {
            Ok(()) => Outcome::Fail("Expected panic but test completed normally".to_string()),
            Err(payload) => {
                let msg = panic_message(&payload);
                match expected {
                    Some(fragment) if !msg.contains(fragment) => Outcome::Fail(format!(
                        "Expected panic containing '{}', got '{}'",
                        fragment, msg
                    )),
                    _ => Outcome::Pass,
                }
            }
        };
        self.report(name, outcome);
    }

    fn report(&mut self, name: &str, outcome: Outcome) {
        self.tests_run += 1;
        match outcome {
            Outcome::Pass => {
                self.tests_passed += 1;
                println!("ok {} - {}", self.tests_run, name);
            }
            Outcome::Fail(reason) => {
                self.tests_failed += 1;
                println!("not ok {} - {}", self.tests_run, name);
                println!("# {}", reason);
            }
        }
    }

    /// Print the TAP version line and plan.
    pub fn print_header(&self, planned_tests: usize) {
        println!("TAP version 14");
        println!("1..{}", planned_tests);
    }

    /// Print a diagnostic line.
    pub fn comment(msg: &str) {
        println!("# {}", msg);
    }

    /// Print the summary. Returns `true` if nothing failed.
    pub fn finish(&self) -> bool {
        println!("# -----------------------");
        println!("# Tests run: {}", self.tests_run);
        println!("# Passed: {}", self.tests_passed);
        println!("# Failed: {}", self.tests_failed);

        let passed = self.tests_failed == 0;
        println!("# Result: {}", if passed { "PASS" } else { "FAIL" });
        passed
    }

    pub fn tests_run(&self) -> usize {
        self.tests_run
    }

    pub fn tests_passed(&self) -> usize {
        self.tests_passed
    }

    pub fn tests_failed(&self) -> usize {
        self.tests_failed
    }
}

mod tap_tests {
    use super::*;
    use doorlink_esp32_macros::tap_test;

    #[tap_test]
    fn runner_counts_pass_and_fail() {
        let mut runner = TestRunner::new();
        runner.run("pass", || Ok(()));
        runner.run("fail", || Err("boom".into()));
        assert_eq!(runner.tests_run(), 2);
        assert_eq!(runner.tests_passed(), 1);
        assert_eq!(runner.tests_failed(), 1);
    }

    #[tap_test]
    fn runner_records_panic_as_failure() {
        let mut runner = TestRunner::new();
        runner.run_assert("panics", || panic!("intentional"));
        assert_eq!(runner.tests_failed(), 1);
    }

    #[tap_test]
    fn should_panic_checks_message() {
        let mut runner = TestRunner::new();
        runner.run_should_panic("matches", || panic!("drain cap hit"), Some("drain cap"));
        runner.run_should_panic("mismatch", || panic!("other"), Some("drain cap"));
        runner.run_should_panic("no_panic", || {}, None);
        assert_eq!(runner.tests_passed(), 1);
        assert_eq!(runner.tests_failed(), 2);
    }
}
