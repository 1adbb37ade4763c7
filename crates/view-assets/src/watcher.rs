//! File system notifications for `PhysicalFileProvider`.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use view_core::{ChangeTokenSource, SignalChangeToken};

type Sources = Arc<Mutex<HashMap<PathBuf, ChangeTokenSource>>>;

/// Recursive watch over a provider root that fires one token per watched path.
///
/// A path's token fires on the first create, modify or remove event for the
/// path or any of its ancestors. After that, `watch` hands out a fresh token.
pub(crate) struct FileWatcher {
    root: PathBuf,
    sources: Sources,
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Start watching `root` and everything below it.
    pub(crate) fn start(root: &Path) -> notify::Result<Self> {
        // Events report canonical paths.
        let root = root.canonicalize().map_err(notify::Error::io)?;
        let sources: Sources = Arc::default();

        let handler_sources = Arc::clone(&sources);
        let mut watcher = recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => dispatch(&handler_sources, &event),
            Err(e) => tracing::warn!(error = %e, "file watcher error"),
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        tracing::debug!(root = %root.display(), "file watcher started");

        Ok(Self {
            root,
            sources,
            _watcher: watcher,
        })
    }

    /// Token for a path relative to the root.
    pub(crate) fn watch(&self, relative: &Path) -> SignalChangeToken {
        let path = self.root.join(relative);
        let mut sources = self.sources.lock().unwrap_or_else(PoisonError::into_inner);
        sources.entry(path).or_default().token()
    }
}

impl fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let watched = self
            .sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("FileWatcher")
            .field("root", &self.root)
            .field("watched", &watched)
            .finish()
    }
}

fn dispatch(sources: &Mutex<HashMap<PathBuf, ChangeTokenSource>>, event: &Event) {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return;
    }

    let fired: Vec<(PathBuf, ChangeTokenSource)> = {
        let mut sources = sources.lock().unwrap_or_else(PoisonError::into_inner);
        let matching: Vec<PathBuf> = sources
            .keys()
            .filter(|watched| event.paths.iter().any(|p| watched.starts_with(p)))
            .cloned()
            .collect();
        matching
            .into_iter()
            .filter_map(|path| sources.remove_entry(&path))
            .collect()
    };

    // Signalled outside the lock; callbacks may call back into `watch`.
    for (path, source) in fired {
        tracing::debug!(path = %path.display(), kind = ?event.kind, "watched file changed");
        source.signal();
    }
}
