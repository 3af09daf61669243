//! Path Index: every request path the server currently knows how to answer.
//!
//! The index is seeded with `/`, one `/<name>` route per capability entry, and
//! every regular file below the web root. HTML files are indexed twice, with
//! and without their extension, so `/about` resolves to `about.html`.
//!
//! A rebuild scans into a fresh [`IndexSnapshot`] and then swaps it in under a
//! short write lock. Readers clone the current `Arc` and never observe a
//! half-built set.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

/// An immutable, fully built set of known paths.
#[derive(Debug, Default, Clone)]
pub struct IndexSnapshot {
    /// Paths in insertion order, case preserved.
    paths: Vec<String>,
    /// Lowercased paths for membership tests.
    lookup: HashSet<String>,
}

impl IndexSnapshot {
    fn insert(&mut self, path: String) {
        if self.lookup.insert(path.to_lowercase()) {
            self.paths.push(path);
        }
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, path: &str) -> bool {
        self.lookup.contains(&path.to_lowercase())
    }

    /// Known paths in insertion order, case preserved.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Membership as a set of lowercase paths.
    pub fn members(&self) -> &HashSet<String> {
        &self.lookup
    }
}

/// Build a snapshot from `routes` plus a recursive scan of `root`.
///
/// Directory errors are logged and the failing subtree is left out; the scan
/// itself never fails.
pub fn scan<I>(root: &Path, routes: I) -> IndexSnapshot
where
    I: IntoIterator<Item = String>,
{
    let mut snapshot = IndexSnapshot::default();
    snapshot.insert("/".to_string());
    for route in routes {
        snapshot.insert(route);
    }
    index_directory(root, root, &mut snapshot);
    snapshot
}

fn index_directory(root: &Path, dir: &Path, snapshot: &mut IndexSnapshot) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!(
                category = "failure",
                path = %dir.display(),
                error = %e,
                "Failed to index resource"
            );
            return;
        }
    };

    let mut subdirectories = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::error!(
                    category = "failure",
                    path = %dir.display(),
                    error = %e,
                    "Failed to index resource"
                );
                continue;
            }
        };
        let path = entry.path();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            subdirectories.push(path);
        } else if path.is_file() {
            if let Some(request_path) = request_path(root, &path) {
                if let Some(stripped) = strip_html_extension(&request_path) {
                    let stripped = stripped.to_string();
                    snapshot.insert(request_path);
                    snapshot.insert(stripped);
                } else {
                    snapshot.insert(request_path);
                }
            }
        }
    }

    for subdirectory in subdirectories {
        index_directory(root, &subdirectory, snapshot);
    }
}

/// `/`-separated path of `file` relative to `root`, with a leading `/`.
fn request_path(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let mut out = String::new();
    for component in relative.components() {
        out.push('/');
        out.push_str(&component.as_os_str().to_string_lossy());
    }
    Some(out)
}

/// `path` without a trailing `.html` (any case), if it has one.
fn strip_html_extension(path: &str) -> Option<&str> {
    const EXTENSION: &str = ".html";
    if path.len() < EXTENSION.len() {
        return None;
    }
    let split = path.len() - EXTENSION.len();
    if path.is_char_boundary(split) && path[split..].eq_ignore_ascii_case(EXTENSION) {
        Some(&path[..split])
    } else {
        None
    }
}

/// Shared, self-healing index of request paths.
#[derive(Debug)]
pub struct PathIndex {
    root: PathBuf,
    routes: Vec<String>,
    current: RwLock<Arc<IndexSnapshot>>,
    min_interval: Duration,
    last_rebuild: Mutex<Option<Instant>>,
}

impl PathIndex {
    /// Create an index over `root` seeded with capability `routes`.
    ///
    /// The index starts empty; call [`PathIndex::rebuild`] before serving.
    pub fn new(root: impl Into<PathBuf>, routes: Vec<String>) -> Self {
        Self {
            root: root.into(),
            routes,
            current: RwLock::new(Arc::new(IndexSnapshot::default())),
            min_interval: Duration::ZERO,
            last_rebuild: Mutex::new(None),
        }
    }

    /// Skip miss-triggered rebuilds that come sooner than `interval` after the
    /// previous one. `Duration::ZERO` disables the guard.
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Rescan the web root and publish the new snapshot.
    pub fn rebuild(&self) -> Arc<IndexSnapshot> {
        let snapshot = Arc::new(scan(&self.root, self.routes.iter().cloned()));
        *self.current.write() = Arc::clone(&snapshot);
        *self.last_rebuild.lock() = Some(Instant::now());

        tracing::trace!(
            category = "info",
            count = snapshot.len(),
            "Resources loaded:\n{}",
            snapshot.paths().join("\n")
        );
        snapshot
    }

    /// Rebuild unless the minimum-interval guard says the last rebuild is
    /// still fresh. Returns whether a rebuild ran.
    pub fn rebuild_if_due(&self) -> bool {
        if !self.min_interval.is_zero() {
            let last = *self.last_rebuild.lock();
            if let Some(last) = last {
                if last.elapsed() < self.min_interval {
                    tracing::debug!("Skipping rebuild, last one is still fresh");
                    return false;
                }
            }
        }
        self.rebuild();
        true
    }

    /// [`PathIndex::rebuild_if_due`] on the blocking pool, so a filesystem walk
    /// never stalls the async workers.
    pub async fn refresh(self: &Arc<Self>) -> bool {
        let index = Arc::clone(self);
        match tokio::task::spawn_blocking(move || index.rebuild_if_due()).await {
            Ok(rebuilt) => rebuilt,
            Err(e) => {
                tracing::error!(category = "failure", error = %e, "Index rebuild aborted");
                false
            }
        }
    }

    /// Case-insensitive membership test against the current snapshot.
    pub fn contains(&self, path: &str) -> bool {
        self.current.read().contains(path)
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.current.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_scan_seeds_root_and_routes() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = scan(dir.path(), vec!["/Version".to_string()]);

        assert_eq!(snapshot.paths(), &["/".to_string(), "/Version".to_string()]);
        assert!(snapshot.contains("/version"));
    }

    #[test]
    fn test_scan_indexes_html_twice() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "about.html", "<h1>About</h1>");
        write(dir.path(), "docs/Guide.HTML", "guide");
        write(dir.path(), "css/site.css", "body {}");

        let snapshot = scan(dir.path(), Vec::new());

        assert!(snapshot.contains("/about.html"));
        assert!(snapshot.contains("/about"));
        assert!(snapshot.contains("/docs/Guide.HTML"));
        assert!(snapshot.contains("/docs/guide"));
        assert!(snapshot.contains("/css/site.css"));
        assert!(!snapshot.contains("/css/site"));
        assert!(!snapshot.contains("/css"));
        assert!(snapshot.paths().contains(&"/docs/Guide".to_string()));
    }

    #[test]
    fn test_scan_missing_root_keeps_routes() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let snapshot = scan(&missing, vec!["/Greet".to_string()]);

        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains("/"));
        assert!(snapshot.contains("/greet"));
    }

    #[test]
    fn test_failing_subtree_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "index.html", "home");
        write(dir.path(), "docs/guide.txt", "guide");
        let mut snapshot = scan(dir.path(), vec!["/Version".to_string()]);
        let before = snapshot.len();

        index_directory(dir.path(), &dir.path().join("vanished"), &mut snapshot);

        assert_eq!(snapshot.len(), before);
        assert!(snapshot.contains("/version"));
        assert!(snapshot.contains("/index.html"));
        assert!(snapshot.contains("/index"));
        assert!(snapshot.contains("/docs/guide.txt"));
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "index.html", "home");
        write(dir.path(), "a/b/c.txt", "deep");
        let index = PathIndex::new(dir.path(), vec!["/Version".to_string()]);

        let first = index.rebuild();
        let second = index.rebuild();

        assert_eq!(first.members(), second.members());
    }

    #[test]
    fn test_rebuild_publishes_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let index = PathIndex::new(dir.path(), Vec::new());
        index.rebuild();
        assert!(!index.contains("/new.txt"));

        write(dir.path(), "new.txt", "fresh");
        assert!(!index.contains("/new.txt"));

        index.rebuild();
        assert!(index.contains("/NEW.txt"));
    }

    #[test]
    fn test_old_snapshot_survives_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "gone.txt", "soon");
        let index = PathIndex::new(dir.path(), Vec::new());
        index.rebuild();

        let held = index.snapshot();
        fs::remove_file(dir.path().join("gone.txt")).unwrap();
        index.rebuild();

        assert!(held.contains("/gone.txt"));
        assert!(!index.contains("/gone.txt"));
    }

    #[test]
    fn test_min_interval_guard() {
        let dir = tempfile::tempdir().unwrap();
        let index =
            PathIndex::new(dir.path(), Vec::new()).with_min_interval(Duration::from_secs(3600));

        assert!(index.rebuild_if_due());
        write(dir.path(), "late.txt", "late");
        assert!(!index.rebuild_if_due());
        assert!(!index.contains("/late.txt"));
    }

    #[test]
    fn test_guard_disabled_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let index = PathIndex::new(dir.path(), Vec::new());

        assert!(index.rebuild_if_due());
        assert!(index.rebuild_if_due());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_never_see_partial_index() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..50 {
            write(dir.path(), &format!("page{i}.html"), "x");
        }
        let index = Arc::new(PathIndex::new(dir.path(), vec!["/Version".to_string()]));
        index.rebuild();

        let writer = {
            let index = Arc::clone(&index);
            tokio::spawn(async move {
                for _ in 0..20 {
                    index.refresh().await;
                }
            })
        };
        let reader = {
            let index = Arc::clone(&index);
            tokio::spawn(async move {
                for _ in 0..2000 {
                    assert!(index.contains("/version"));
                    assert!(index.contains("/page49"));
                    tokio::task::yield_now().await;
                }
            })
        };

        writer.await.unwrap();
        reader.await.unwrap();
    }

    #[test]
    fn test_strip_html_extension() {
        assert_eq!(strip_html_extension("/about.html"), Some("/about"));
        assert_eq!(strip_html_extension("/About.HtMl"), Some("/About"));
        assert_eq!(strip_html_extension("/about.htm"), None);
        assert_eq!(strip_html_extension("html"), None);
    }
}
