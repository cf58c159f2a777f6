//! Per-run environment state.
//!
//! Stages never touch the process environment directly. Search-path
//! additions and exported variables go into a [`RunContext`] that is threaded
//! through the run; every child process is started from
//! [`RunContext::command_env`].

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment of one provisioning run.
///
/// # Example
///
/// ```rust
/// use cli_provisioner::RunContext;
/// use std::path::PathBuf;
///
/// let mut ctx = RunContext::empty();
/// ctx.prepend_path("/opt/node/bin");
/// ctx.export("COPILOT_GITHUB_TOKEN", "secret");
///
/// assert_eq!(ctx.search_dirs()[0], PathBuf::from("/opt/node/bin"));
/// assert_eq!(ctx.exported("COPILOT_GITHUB_TOKEN"), Some("secret"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    base_path: Vec<PathBuf>,
    prepended: Vec<PathBuf>,
    appended: Vec<PathBuf>,
    exported: BTreeMap<String, String>,
    home: Option<PathBuf>,
}

impl RunContext {
    /// A context with no search path and no home directory.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot `PATH` and `HOME` of the current process.
    pub fn from_process_env() -> Self {
        let base_path = std::env::var_os("PATH")
            .map(|p| std::env::split_paths(&p).collect())
            .unwrap_or_default();
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from);
        Self {
            base_path,
            home,
            ..Default::default()
        }
    }

    /// Replace the inherited search path.
    pub fn with_base_path<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.base_path = dirs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    /// Put a directory in front of everything else on the search path.
    pub fn prepend_path(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if !self.prepended.contains(&dir) {
            self.prepended.insert(0, dir);
        }
    }

    /// Put a directory behind everything else on the search path.
    pub fn append_path(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if !self.appended.contains(&dir) {
            self.appended.push(dir);
        }
    }

    /// Directories this run added to the search path, in search order.
    pub fn added_dirs(&self) -> impl Iterator<Item = &Path> {
        self.prepended
            .iter()
            .chain(self.appended.iter())
            .map(PathBuf::as_path)
    }

    /// The effective search path, in lookup order.
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        self.prepended
            .iter()
            .chain(self.base_path.iter())
            .chain(self.appended.iter())
            .cloned()
            .collect()
    }

    /// The effective search path as a `PATH` value.
    pub fn search_path(&self) -> OsString {
        std::env::join_paths(self.search_dirs()).unwrap_or_default()
    }

    /// Export a variable to every process started from this context.
    pub fn export(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.exported.insert(key.into(), value.into());
    }

    pub fn exported(&self, key: &str) -> Option<&str> {
        self.exported.get(key).map(String::as_str)
    }

    /// Variables to overlay on the inherited environment of a child process.
    ///
    /// Always contains `PATH`; exported variables follow.
    pub fn command_env(&self) -> Vec<(OsString, OsString)> {
        let mut env = vec![(OsString::from("PATH"), self.search_path())];
        env.extend(
            self.exported
                .iter()
                .map(|(k, v)| (OsString::from(k), OsString::from(v))),
        );
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_order() {
        let mut ctx = RunContext::empty().with_base_path(["/usr/bin", "/bin"]);
        ctx.append_path("/home/ci/.local/bin");
        ctx.prepend_path("/tmp/node/bin");

        assert_eq!(
            ctx.search_dirs(),
            vec![
                PathBuf::from("/tmp/node/bin"),
                PathBuf::from("/usr/bin"),
                PathBuf::from("/bin"),
                PathBuf::from("/home/ci/.local/bin"),
            ]
        );
    }

    #[test]
    fn test_added_dirs_deduplicated() {
        let mut ctx = RunContext::empty();
        ctx.append_path("/a");
        ctx.append_path("/a");
        ctx.prepend_path("/b");
        ctx.prepend_path("/b");
        let added: Vec<_> = ctx.added_dirs().collect();
        assert_eq!(added, vec![Path::new("/b"), Path::new("/a")]);
    }

    #[test]
    fn test_command_env_contains_path_and_exports() {
        let mut ctx = RunContext::empty().with_base_path(["/usr/bin"]);
        ctx.export("TOKEN", "abc");
        let env = ctx.command_env();
        assert_eq!(env[0].0, OsString::from("PATH"));
        assert!(env
            .iter()
            .any(|(k, v)| k == "TOKEN" && v == "abc"));
    }

    #[test]
    fn test_export_overwrites() {
        let mut ctx = RunContext::empty();
        ctx.export("TOKEN", "one");
        ctx.export("TOKEN", "two");
        assert_eq!(ctx.exported("TOKEN"), Some("two"));
        assert_eq!(ctx.exported("MISSING"), None);
    }
}
