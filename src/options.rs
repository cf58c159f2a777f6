//! Tunables for a provisioning run.
//!
//! [`ProvisionOptions`] holds the timeouts and thresholds used by every
//! stage; [`SessionTimings`] holds the timers of the interactive session.
//! Both have defaults suitable for hosted CI runners.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration options for a provisioning run.
///
/// # Example
///
/// ```rust
/// use cli_provisioner::ProvisionOptions;
/// use std::time::Duration;
///
/// let opts = ProvisionOptions {
///     install_timeout: Duration::from_secs(600),
///     ..Default::default()
/// };
/// assert_eq!(opts.min_runtime_major, 22);
/// ```
#[derive(Debug, Clone)]
pub struct ProvisionOptions {
    /// Minimum Node.js major version.
    ///
    /// Default: 22
    pub min_runtime_major: u64,

    /// Minimum npm major version.
    ///
    /// Default: 10
    pub min_pkg_mgr_major: u64,

    /// Base URL of the Node.js release index. The runtime is fetched from
    /// `<base>/latest-v<major>.x/`.
    pub node_dist_base_url: String,

    /// Where downloaded runtimes are unpacked. Anything left under its
    /// `extracted/` folder by an earlier run is removed first. A new
    /// directory under the system temp dir, kept after the run, is used
    /// when `None`.
    pub runtime_dir: Option<PathBuf>,

    /// Root passed as `PREFIX` to the install script. `$HOME/.local` when
    /// `None`.
    pub install_prefix: Option<PathBuf>,

    /// Limit for each install command (npm install, install script).
    ///
    /// Default: 5 minutes
    pub install_timeout: Duration,

    /// Limit for quick probes such as `--version` queries.
    ///
    /// Default: 10 seconds
    pub probe_timeout: Duration,

    /// Limit for each HTTP download.
    ///
    /// Default: 5 minutes
    pub download_timeout: Duration,

    /// Timers of the interactive session.
    pub session: SessionTimings,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            min_runtime_major: 22,
            min_pkg_mgr_major: 10,
            node_dist_base_url: "https://nodejs.org/dist".to_string(),
            runtime_dir: None,
            install_prefix: None,
            install_timeout: Duration::from_secs(300),
            probe_timeout: Duration::from_secs(10),
            download_timeout: Duration::from_secs(300),
            session: SessionTimings::default(),
        }
    }
}

/// Timers and terminal geometry for the interactive session.
///
/// Both stop timers are measured from spawn and are armed independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    /// When the first interrupt is written into the terminal.
    ///
    /// Default: 5 seconds
    pub graceful_stop_after: Duration,

    /// Delay between the first and second interrupt.
    ///
    /// Default: 250 milliseconds
    pub second_interrupt_delay: Duration,

    /// When the process is killed if it is still alive.
    ///
    /// Default: 8 seconds
    pub hard_stop_after: Duration,

    pub cols: u16,
    pub rows: u16,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            graceful_stop_after: Duration::from_secs(5),
            second_interrupt_delay: Duration::from_millis(250),
            hard_stop_after: Duration::from_secs(8),
            cols: 80,
            rows: 24,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let opts = ProvisionOptions::default();
        assert_eq!(opts.min_runtime_major, 22);
        assert_eq!(opts.min_pkg_mgr_major, 10);
        assert_eq!(opts.install_timeout, Duration::from_secs(300));
        assert!(opts.install_prefix.is_none());
    }

    #[test]
    fn test_default_session_timings() {
        let timings = SessionTimings::default();
        assert_eq!(timings.graceful_stop_after, Duration::from_secs(5));
        assert_eq!(timings.second_interrupt_delay, Duration::from_millis(250));
        assert_eq!(timings.hard_stop_after, Duration::from_secs(8));
        assert_eq!((timings.cols, timings.rows), (80, 24));
    }

    #[test]
    fn test_struct_update_syntax() {
        let opts = ProvisionOptions {
            probe_timeout: Duration::from_millis(500),
            ..Default::default()
        };
        assert_eq!(opts.probe_timeout, Duration::from_millis(500));
        assert_eq!(opts.session, SessionTimings::default());
    }
}
