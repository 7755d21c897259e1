// ABOUTME: Diagnostics accumulator for non-fatal warnings during a pipeline run.
// ABOUTME: Collects advisory outcomes that are reported but never change the exit code.

/// Collects non-fatal warnings during pipeline execution.
#[derive(Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during a pipeline run.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// The in-container smoke command failed.
    pub fn smoke_test(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SmokeTest,
            message: message.into(),
        }
    }

    /// The started container was no longer running after the settle interval.
    pub fn start_probe(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::StartProbe,
            message: message.into(),
        }
    }

    /// A health endpoint probe did not return 2xx in time.
    pub fn health_probe(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::HealthProbe,
            message: message.into(),
        }
    }

    /// The optional credentialed request against the deployed service failed.
    pub fn credential_test(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::CredentialTest,
            message: message.into(),
        }
    }

    /// Log artifacts could not be removed after a successful run.
    pub fn log_cleanup(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::LogCleanup,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    SmokeTest,
    StartProbe,
    HealthProbe,
    CredentialTest,
    LogCleanup,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn diagnostics_collects_warnings() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::smoke_test("import check exited 1"));
        diag.warn(Warning::health_probe("connection refused"));

        assert!(diag.has_warnings());
        assert_eq!(diag.warnings().len(), 2);
    }

    #[test]
    fn warning_constructors_set_correct_kind() {
        assert_eq!(Warning::smoke_test("t").kind, WarningKind::SmokeTest);
        assert_eq!(Warning::start_probe("t").kind, WarningKind::StartProbe);
        assert_eq!(Warning::health_probe("t").kind, WarningKind::HealthProbe);
        assert_eq!(
            Warning::credential_test("t").kind,
            WarningKind::CredentialTest
        );
        assert_eq!(Warning::log_cleanup("t").kind, WarningKind::LogCleanup);
    }
}
