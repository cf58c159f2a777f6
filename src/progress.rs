//! Progress reporting for provisioning runs.
//!
//! The orchestrator reports each stage transition through a caller-supplied
//! callback, so a front end can render progress without parsing logs.

use crate::install::StrategyKind;
use crate::TargetSpec;

/// Stages of a provisioning run, in the order they are reported.
///
/// # Example
///
/// ```rust
/// use cli_provisioner::ProvisionProgress;
///
/// fn on_progress(progress: ProvisionProgress) {
///     match &progress {
///         ProvisionProgress::Installing { strategy } => {
///             println!("Installing with {strategy}...");
///         }
///         ProvisionProgress::Completed { version } => {
///             println!("Ready: {version}");
///         }
///         other => println!("{}...", other.description()),
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionProgress {
    /// The host was mapped to a supported target.
    PlatformResolved {
        target: TargetSpec,
    },

    /// Probing and, if needed, installing the runtime.
    CheckingPrerequisites,

    /// Running one install strategy.
    Installing {
        strategy: StrategyKind,
    },

    /// An install strategy failed and the next one is being tried.
    FallingBack {
        from: StrategyKind,
        to: StrategyKind,
    },

    /// Checking the installed binary.
    Verifying {
        /// Whether an interactive session will be started.
        interactive: bool,
    },

    /// The run succeeded.
    Completed {
        /// The version the binary reported.
        version: String,
    },
}

impl ProvisionProgress {
    /// Get a human-readable description of the current stage.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cli_provisioner::ProvisionProgress;
    ///
    /// let progress = ProvisionProgress::CheckingPrerequisites;
    /// assert_eq!(progress.description(), "Checking prerequisites");
    /// ```
    pub fn description(&self) -> &'static str {
        match self {
            Self::PlatformResolved { .. } => "Platform resolved",
            Self::CheckingPrerequisites => "Checking prerequisites",
            Self::Installing { .. } => "Installing",
            Self::FallingBack { .. } => "Falling back",
            Self::Verifying { .. } => "Verifying installation",
            Self::Completed { .. } => "Provisioning complete",
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptions() {
        assert_eq!(
            ProvisionProgress::Installing {
                strategy: StrategyKind::Script
            }
            .description(),
            "Installing"
        );
        assert_eq!(
            ProvisionProgress::Verifying { interactive: true }.description(),
            "Verifying installation"
        );
    }

    #[test]
    fn test_only_completed_is_complete() {
        assert!(ProvisionProgress::Completed {
            version: "1.0.0".to_string()
        }
        .is_complete());
        assert!(!ProvisionProgress::CheckingPrerequisites.is_complete());
        assert!(!ProvisionProgress::FallingBack {
            from: StrategyKind::PackageManager,
            to: StrategyKind::Script,
        }
        .is_complete());
    }
}
