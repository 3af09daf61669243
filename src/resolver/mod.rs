//! Resource Resolver: serves indexed, non-capability paths from the web root.
//!
//! Resolution order:
//! 1. `/` streams `index.html` as `text/html`
//! 2. A path whose last segment has no `.` streams `<path>.html` as `text/html`
//! 3. Anything else streams the file verbatim, typed by extension
//!
//! A failed open is answered with 500 (branches 1 and 2) or 404 (branch 3),
//! and the path index is rebuilt since the file set evidently changed.

pub mod mime;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs::File;

use crate::dispatch::Outcome;
use crate::index::PathIndex;

const HTML: &str = "text/html";

/// Which resolution branch a path takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Index,
    HtmlFallback,
    Verbatim,
}

impl Resolution {
    pub fn classify(path: &str) -> Self {
        if path == "/" {
            return Self::Index;
        }
        let last_segment = path.rsplit('/').next().unwrap_or(path);
        if last_segment.contains('.') {
            Self::Verbatim
        } else {
            Self::HtmlFallback
        }
    }
}

/// File-serving half of the dispatcher.
#[derive(Debug, Clone)]
pub struct ResourceResolver {
    index: Arc<PathIndex>,
}

impl ResourceResolver {
    pub fn new(index: Arc<PathIndex>) -> Self {
        Self { index }
    }

    /// Serve `path`, which the caller has already found in the index.
    pub async fn resolve(&self, path: &str) -> Outcome {
        let resolution = Resolution::classify(path);
        let (file, content_type) = match resolution {
            Resolution::Index => (self.file_path("/index.html"), Some(HTML)),
            Resolution::HtmlFallback => (self.file_path(&format!("{}.html", path)), Some(HTML)),
            Resolution::Verbatim => (self.file_path(path), mime::content_type_for(path)),
        };

        match File::open(&file).await {
            Ok(handle) => {
                tracing::info!(
                    category = "success",
                    file = %file.display(),
                    "Request handled successfully"
                );
                Outcome::file(handle, content_type)
            }
            Err(e) => {
                tracing::error!(
                    category = "failure",
                    file = %file.display(),
                    error = %e,
                    "Failed to load resource"
                );
                self.index.refresh().await;
                match resolution {
                    Resolution::Verbatim => Outcome::not_found(),
                    Resolution::Index | Resolution::HtmlFallback => Outcome::server_error(format!(
                        "Failed to load resource {}: {}",
                        file.display(),
                        e
                    )),
                }
            }
        }
    }

    fn file_path(&self, path: &str) -> PathBuf {
        self.index.root().join(path.trim_start_matches('/'))
    }
}
