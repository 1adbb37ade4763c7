//! File access for static assets.

use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use view_core::{ChangeToken, NeverChangeToken};

use crate::watcher::FileWatcher;

/// Default interval between file system checks of a polling token.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(4);

/// Read and watch access to static files.
///
/// Paths are `/`-separated and relative to the provider's root; a leading
/// `/` is ignored.
pub trait FileProvider: Send + Sync {
    /// Whether a file exists at `path`.
    fn exists(&self, path: &str) -> bool;

    /// Open the file for reading.
    fn open_read(&self, path: &str) -> io::Result<Box<dyn Read + Send>>;

    /// Token that changes when the file at `path` is created, modified or deleted.
    fn watch(&self, path: &str) -> Arc<dyn ChangeToken>;
}

/// File provider over a directory on disk.
///
/// Watch tokens are pushed by file system notifications. When notifications
/// cannot be set up for the root, or polling is requested, tokens poll file
/// metadata instead. Clones share one watcher.
#[derive(Debug, Clone)]
pub struct PhysicalFileProvider {
    root: PathBuf,
    polling_interval: Duration,
    use_polling: bool,
    watcher: Arc<OnceLock<Option<FileWatcher>>>,
}

impl PhysicalFileProvider {
    /// Create a provider rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            polling_interval: DEFAULT_POLLING_INTERVAL,
            use_polling: false,
            watcher: Arc::default(),
        }
    }

    /// Use polling tokens that check the file system at most once per `interval`.
    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self.use_polling = true;
        self
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether watch tokens come from file system notifications.
    pub fn uses_notifications(&self) -> bool {
        self.watcher().is_some()
    }

    fn watcher(&self) -> Option<&FileWatcher> {
        if self.use_polling {
            return None;
        }

        self.watcher
            .get_or_init(|| match FileWatcher::start(&self.root) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    tracing::warn!(
                        root = %self.root.display(),
                        error = %e,
                        "file notifications unavailable, falling back to polling"
                    );
                    None
                }
            })
            .as_ref()
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        self.relative(path).map(|relative| self.root.join(relative))
    }

    /// Map a provider path to a path relative to the root.
    ///
    /// Returns `None` for paths that would escape the root.
    fn relative(&self, path: &str) -> Option<PathBuf> {
        let mut resolved = PathBuf::new();
        for segment in path.split(['/', '\\']) {
            if segment.is_empty() {
                continue;
            }
            match Path::new(segment).components().next() {
                Some(Component::Normal(part)) if !segment.contains(':') => resolved.push(part),
                Some(Component::CurDir) => {}
                _ => return None,
            }
        }
        Some(resolved)
    }
}

impl FileProvider for PhysicalFileProvider {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_some_and(|p| p.is_file())
    }

    fn open_read(&self, path: &str) -> io::Result<Box<dyn Read + Send>> {
        let resolved = self.resolve(path).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("path outside root: {path}"))
        })?;
        let file = fs::File::open(resolved)?;
        Ok(Box::new(file))
    }

    fn watch(&self, path: &str) -> Arc<dyn ChangeToken> {
        let Some(relative) = self.relative(path) else {
            return Arc::new(NeverChangeToken);
        };

        match self.watcher() {
            Some(watcher) => Arc::new(watcher.watch(&relative)),
            None => Arc::new(PollingFileChangeToken::new(
                self.root.join(relative),
                self.polling_interval,
            )),
        }
    }
}

/// Existence, modification time and length of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

fn fingerprint(path: &Path) -> Option<Fingerprint> {
    let meta = fs::metadata(path).ok().filter(|m| m.is_file())?;
    Some(Fingerprint {
        modified: meta.modified().ok(),
        len: meta.len(),
    })
}

#[derive(Debug)]
struct PollState {
    last_checked: Instant,
    changed: bool,
}

/// Change token that polls a file's metadata.
///
/// Compares existence, modification time and length against a snapshot
/// taken at creation. Checks are throttled to the polling interval; once a
/// change is seen the token stays changed.
#[derive(Debug)]
pub struct PollingFileChangeToken {
    path: PathBuf,
    initial: Option<Fingerprint>,
    interval: Duration,
    state: Mutex<PollState>,
}

impl PollingFileChangeToken {
    /// Snapshot `path` and watch it.
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        let path = path.into();
        let initial = fingerprint(&path);
        Self {
            path,
            initial,
            interval,
            state: Mutex::new(PollState {
                last_checked: Instant::now(),
                changed: false,
            }),
        }
    }

    /// Watched path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChangeToken for PollingFileChangeToken {
    fn has_changed(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.changed {
            return true;
        }
        if !self.interval.is_zero() && state.last_checked.elapsed() < self.interval {
            return false;
        }

        state.last_checked = Instant::now();
        if fingerprint(&self.path) != self.initial {
            tracing::debug!(path = %self.path.display(), "watched file changed");
            state.changed = true;
        }
        state.changed
    }
}
