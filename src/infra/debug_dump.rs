use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

/// Writes raw fetched bodies to disk for manual inspection. Does nothing without a directory.
pub struct DebugDumps {
    dir: Option<PathBuf>,
    counter: AtomicUsize,
}

impl DebugDumps {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            counter: AtomicUsize::new(0),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Save `body` prefixed with its source URL; returns the written path
    pub fn save(&self, label: &str, url: &str, body: &str) -> Option<PathBuf> {
        let dir = self.dir.as_deref()?;
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!("debug_{:03}_{}.html", n, sanitize(label)));

        match write_dump(dir, &path, url, body) {
            Ok(()) => {
                info!("Saved {} response to {}", label, path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Error saving debug file {}: {}", path.display(), e);
                None
            }
        }
    }
}

fn write_dump(dir: &Path, path: &Path, url: &str, body: &str) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(path, format!("<!-- URL: {} -->\n{}", url, body))
}

fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(40)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_dumps_write_nothing() {
        assert!(DebugDumps::disabled().save("x", "https://a", "body").is_none());
    }

    #[test]
    fn dump_has_url_header_and_numbered_name() {
        let dir = tempfile::tempdir().unwrap();
        let dumps = DebugDumps::new(Some(dir.path().join("dumps")));

        let first = dumps.save("GET variation 1", "https://webook.com/api/events", "<html/>").unwrap();
        let second = dumps.save("known_url", "https://webook.com/en", "<p/>").unwrap();

        assert!(first.ends_with("debug_000_GET_variation_1.html"));
        assert!(second.ends_with("debug_001_known_url.html"));
        let content = fs::read_to_string(first).unwrap();
        assert_eq!(content, "<!-- URL: https://webook.com/api/events -->\n<html/>");
    }
}
