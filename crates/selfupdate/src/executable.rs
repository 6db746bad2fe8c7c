//! Location of the running executable and its update siblings.

use crate::error::Result;
use crate::version::Version;
use once_cell::sync::{Lazy, OnceCell};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type Locator = Box<dyn Fn() -> io::Result<PathBuf> + Send + Sync>;

static PROCESS: Lazy<ExecutableResolver> = Lazy::new(ExecutableResolver::new);

/// Failure to resolve the running executable. Cloning shares the underlying
/// I/O error, so a cached failure is the same value on every query.
#[derive(thiserror::Error, Debug, Clone)]
pub enum ResolveError {
    /// The OS could not report the executable path.
    #[error("unable to locate the running executable: {0}")]
    Locate(Arc<io::Error>),
    /// The reported path could not be resolved through symlinks.
    #[error("unable to resolve {path}: {source}")]
    Canonicalize {
        /// Path reported by the locator.
        path: PathBuf,
        /// Underlying failure.
        source: Arc<io::Error>,
    },
    /// The resolved path does not name a file.
    #[error("executable path {0} has no file name")]
    NoFileName(PathBuf),
}

/// The running binary and the sibling paths an update stages through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutablePaths {
    /// Symlink-resolved path of the running binary.
    pub real: PathBuf,
    /// `.<name>.old` next to `real`, where the replaced binary is parked.
    pub old: PathBuf,
    /// `.<name>.new` next to `real`, where the candidate is staged.
    pub new: PathBuf,
}

impl ExecutablePaths {
    /// Derive the sibling paths for an already resolved binary path.
    pub fn for_real_path(real: PathBuf) -> std::result::Result<Self, ResolveError> {
        let file_name = real
            .file_name()
            .ok_or_else(|| ResolveError::NoFileName(real.clone()))?
            .to_string_lossy()
            .into_owned();
        let dir = real.parent().unwrap_or_else(|| Path::new(""));

        let old = dir.join(format!(".{file_name}.old"));
        let new = dir.join(format!(".{file_name}.new"));
        Ok(Self { real, old, new })
    }

    /// File name of the running binary.
    pub fn file_name(&self) -> Option<&str> {
        self.real.file_name().and_then(|name| name.to_str())
    }
}

/// Resolves the executable paths once and hands out the cached result.
///
/// The first caller performs the resolution; concurrent callers wait for it
/// and every caller observes the same value afterwards. Failures are cached
/// too and never retried.
pub struct ExecutableResolver {
    locate: Locator,
    paths: OnceCell<std::result::Result<ExecutablePaths, ResolveError>>,
}

impl ExecutableResolver {
    /// Resolver for the current process executable.
    pub fn new() -> Self {
        Self::with_locator(std::env::current_exe)
    }

    /// Resolver using an alternate way to find the executable.
    pub fn with_locator<F>(locate: F) -> Self
    where
        F: Fn() -> io::Result<PathBuf> + Send + Sync + 'static,
    {
        Self {
            locate: Box::new(locate),
            paths: OnceCell::new(),
        }
    }

    /// Lazily created resolver shared by everything in this process that is
    /// not handed an explicit one.
    pub fn process() -> &'static ExecutableResolver {
        &PROCESS
    }

    /// The resolved path triple, computing it on first use.
    pub fn paths(&self) -> std::result::Result<&ExecutablePaths, ResolveError> {
        self.paths
            .get_or_init(|| self.resolve())
            .as_ref()
            .map_err(|err| err.clone())
    }

    /// Path of the running binary, symlinks resolved.
    pub fn real_path(&self) -> std::result::Result<&Path, ResolveError> {
        self.paths().map(|paths| paths.real.as_path())
    }

    /// Where the replaced binary is parked during an update.
    pub fn old_path(&self) -> std::result::Result<&Path, ResolveError> {
        self.paths().map(|paths| paths.old.as_path())
    }

    /// Where the candidate binary is staged during an update.
    pub fn new_path(&self) -> std::result::Result<&Path, ResolveError> {
        self.paths().map(|paths| paths.new.as_path())
    }

    /// Modification time of the running binary, usable as the known version
    /// before the first poll.
    pub fn last_modified(&self) -> Result<Version> {
        let real = self.real_path()?;
        let modified = std::fs::metadata(real)?.modified()?;
        Ok(Version::from(modified))
    }

    fn resolve(&self) -> std::result::Result<ExecutablePaths, ResolveError> {
        let located = (self.locate)().map_err(|err| ResolveError::Locate(Arc::new(err)))?;
        let real = std::fs::canonicalize(&located).map_err(|err| ResolveError::Canonicalize {
            path: located.clone(),
            source: Arc::new(err),
        })?;
        ExecutablePaths::for_real_path(real)
    }
}

impl Default for ExecutableResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExecutableResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutableResolver")
            .field("paths", &self.paths.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn current_process_paths_are_distinct_siblings() {
        let resolver = ExecutableResolver::new();
        let paths = resolver.paths().expect("test binary resolves");

        assert_ne!(paths.real, paths.old);
        assert_ne!(paths.real, paths.new);
        assert_ne!(paths.old, paths.new);
        assert_eq!(paths.old.parent(), paths.real.parent());
        assert_eq!(paths.new.parent(), paths.real.parent());
        assert_eq!(paths.old.extension().unwrap(), "old");
        assert_eq!(paths.new.extension().unwrap(), "new");

        let again = resolver.paths().unwrap();
        assert_eq!(paths.real.as_os_str(), again.real.as_os_str());
        assert_eq!(paths.old.as_os_str(), again.old.as_os_str());
        assert_eq!(paths.new.as_os_str(), again.new.as_os_str());
    }

    #[test]
    fn sibling_names_are_hidden_variants() {
        let paths = ExecutablePaths::for_real_path(PathBuf::from("/opt/app/bin/tool")).unwrap();
        assert_eq!(paths.old, PathBuf::from("/opt/app/bin/.tool.old"));
        assert_eq!(paths.new, PathBuf::from("/opt/app/bin/.tool.new"));
        assert_eq!(paths.file_name(), Some("tool"));
    }

    #[test]
    fn resolves_once() {
        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("tool");
        std::fs::write(&binary, b"binary").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let located = binary.clone();
        let resolver = ExecutableResolver::with_locator(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(located.clone())
        });

        let first = resolver.real_path().unwrap().to_path_buf();
        let second = resolver.real_path().unwrap().to_path_buf();
        assert_eq!(first, second);
        assert_eq!(first, std::fs::canonicalize(&binary).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[cfg(unix)]
    #[test]
    fn follows_symlinks_to_the_real_binary() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("tool-1.2");
        let link = dir.path().join("tool");
        std::fs::write(&target, b"binary").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let resolver = ExecutableResolver::with_locator(move || Ok(link.clone()));
        let paths = resolver.paths().unwrap();
        assert_eq!(paths.real, std::fs::canonicalize(&target).unwrap());
        assert_eq!(paths.file_name(), Some("tool-1.2"));
    }

    #[test]
    fn failure_is_cached_without_retrying() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let resolver = ExecutableResolver::with_locator(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::new(io::ErrorKind::NotFound, "no /proc entry"))
        });

        let first = resolver.paths().unwrap_err();
        let second = resolver.new_path().unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        match (first, second) {
            (ResolveError::Locate(a), ResolveError::Locate(b)) => assert!(Arc::ptr_eq(&a, &b)),
            other => panic!("unexpected errors: {other:?}"),
        }
    }

    #[test]
    fn concurrent_callers_share_one_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("tool");
        std::fs::write(&binary, b"binary").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let resolver = Arc::new(ExecutableResolver::with_locator(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(binary.clone())
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                std::thread::spawn(move || resolver.real_path().unwrap().to_path_buf())
            })
            .collect();
        let results: Vec<PathBuf> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn last_modified_reads_binary_mtime() {
        let version = ExecutableResolver::process().last_modified().unwrap();
        assert!(!version.is_zero());
    }
}
