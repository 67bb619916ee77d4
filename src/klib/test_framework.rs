//! Framework de testes do kernel
//!
//! Suites de self-test rodam no boot (feature `self_test`) e também sob
//! `cargo test`, onde cada suite vira um único `#[test]`.

/// Resultado de teste
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TestResult {
    Passed,
    Failed,
    Skipped,
}

/// Um caso de teste
pub struct TestCase {
    pub name: &'static str,
    pub func: fn() -> TestResult,
}

/// Contagem de resultados de uma suite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl TestSummary {
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.failed == 0
    }

    pub fn merge(&mut self, other: TestSummary) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// Converte uma condição em resultado.
#[inline]
pub fn check(condition: bool) -> TestResult {
    if condition {
        TestResult::Passed
    } else {
        TestResult::Failed
    }
}

/// Executa suite de testes
pub fn run_test_suite(name: &str, tests: &[TestCase]) -> TestSummary {
    crate::kinfo!("=== Executando suite:");
    crate::kinfo!(name);

    let mut summary = TestSummary::default();

    for test in tests {
        let result = (test.func)();
        match result {
            TestResult::Passed => {
                crate::kok!(test.name);
                summary.passed += 1;
            }
            TestResult::Failed => {
                crate::kfail!(test.name);
                summary.failed += 1;
            }
            TestResult::Skipped => {
                crate::kwarn!(test.name);
                summary.skipped += 1;
            }
        }
    }

    crate::kinfo!("Resultados: passed=", summary.passed);
    if summary.failed != 0 {
        crate::kerror!("Resultados: failed=", summary.failed);
    }
    summary
}
