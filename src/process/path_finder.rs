//! Search-path executable lookup.

use crate::RunContext;
use std::path::{Path, PathBuf};

/// Find an executable on the context's search path.
///
/// Names that already contain a path separator are returned as-is when the
/// file exists. Lookup goes through the `which` crate so `PATHEXT` is
/// honoured on Windows (npm installs `.cmd` shims there).
///
/// # Returns
///
/// `Some(PathBuf)` if the executable is found, `None` otherwise.
pub fn find_executable(name: &str, ctx: &RunContext) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return candidate.exists().then(|| candidate.to_path_buf());
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    which::which_in(name, Some(ctx.search_path()), cwd).ok()
}
