//! Live-reloading keyword list backed by a plain text file.
//!
//! The file holds one keyword per line. Blank lines and lines starting with
//! `#` are ignored and surrounding whitespace is trimmed. The list is only
//! ever replaced as a whole, so readers see either the old or the new list.

use crate::error::{CoreError, KeywordError};
use crate::error_utils::ErrorExt;
use crate::types::Keyword;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;
use tracing::{debug, info};

/// Immutable view of the keyword list at one point in time.
pub type KeywordSnapshot = Arc<Vec<Keyword>>;

const COMMENT_MARKER: &str = "#";

/// What a call to [`KeywordStore::refresh_if_changed`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Modification time matches the last recorded one; the file was not read.
    Unchanged,
    /// The file was re-read but parsed to the list already held.
    ContentUnchanged,
    /// A new list was swapped in.
    Reloaded { count: usize },
    /// The file could not be stat'ed or read; the previous list stays active.
    Failed,
}

#[derive(Debug)]
struct KeywordState {
    keywords: KeywordSnapshot,
    last_modified: Option<SystemTime>,
}

#[derive(Debug)]
pub struct KeywordStore {
    path: PathBuf,
    state: Mutex<KeywordState>,
}

impl KeywordStore {
    /// Creates an empty store. Nothing is read until the first refresh.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(KeywordState {
                keywords: Arc::new(Vec::new()),
                last_modified: None,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> KeywordSnapshot {
        Arc::clone(&self.lock().keywords)
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.lock().last_modified
    }

    /// Reloads the list if the file's modification time moved and its content changed.
    ///
    /// Errors are logged and reported as [`RefreshOutcome::Failed`]; the
    /// previously loaded list remains authoritative.
    pub fn refresh_if_changed(&self) -> RefreshOutcome {
        match self.try_refresh() {
            Ok(outcome) => outcome,
            Err(e) => {
                CoreError::from(e).log_warn();
                RefreshOutcome::Failed
            }
        }
    }

    fn try_refresh(&self) -> Result<RefreshOutcome, KeywordError> {
        let modified = fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .map_err(|source| KeywordError::Unavailable {
                path: self.path.display().to_string(),
                source,
            })?;

        if self.last_modified() == Some(modified) {
            return Ok(RefreshOutcome::Unchanged);
        }

        let contents =
            fs::read_to_string(&self.path).map_err(|source| KeywordError::Unreadable {
                path: self.path.display().to_string(),
                source,
            })?;
        let parsed = parse_keywords(&contents);

        let mut state = self.lock();
        if *state.keywords == parsed {
            // The timestamp is only recorded together with a new list, so a
            // touched-but-identical file is parsed again on the next event.
            debug!(
                "Keyword file {} touched without content change",
                self.path.display()
            );
            return Ok(RefreshOutcome::ContentUnchanged);
        }

        let count = parsed.len();
        state.keywords = Arc::new(parsed);
        state.last_modified = Some(modified);
        let loaded = Arc::clone(&state.keywords);
        drop(state);

        info!(
            "Loaded {} keywords: {}",
            count,
            loaded
                .iter()
                .map(|k| k.text.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(RefreshOutcome::Reloaded { count })
    }

    fn lock(&self) -> MutexGuard<'_, KeywordState> {
        self.state.lock().expect("keyword store mutex poisoned")
    }
}

/// Parses keyword file contents, keeping file order.
pub fn parse_keywords(contents: &str) -> Vec<Keyword> {
    contents
        .lines()
        .filter(|line| !line.starts_with(COMMENT_MARKER))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(Keyword::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_file(path: &Path, contents: &str) {
        let mut file = File::create(path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.sync_all().unwrap();
    }

    fn set_mtime(path: &Path, secs: u64) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn texts(snapshot: &KeywordSnapshot) -> Vec<String> {
        snapshot.iter().map(|k| k.text.clone()).collect()
    }

    #[test]
    fn test_parse_skips_blanks_and_comments() {
        let parsed = parse_keywords("# header\n  giveaway \n\nScam\n#disabled\n\t\nfree stuff\n");
        let texts: Vec<&str> = parsed.iter().map(|k| k.text.as_str()).collect();
        assert_eq!(texts, vec!["giveaway", "Scam", "free stuff"]);
        assert_eq!(parsed[1].normalized(), "scam");
    }

    #[test]
    fn test_indented_comment_marker_is_a_keyword() {
        // Only lines that begin with the marker are comments.
        let parsed = parse_keywords("  #rust\n");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].text, "#rust");
    }

    #[test]
    fn test_snapshot_after_refresh_matches_file_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keywords.txt");
        write_file(&path, "alpha\n# note\n\n beta \ngamma\n");

        let store = KeywordStore::new(&path);
        assert!(store.snapshot().is_empty());

        assert_eq!(
            store.refresh_if_changed(),
            RefreshOutcome::Reloaded { count: 3 }
        );
        assert_eq!(texts(&store.snapshot()), vec!["alpha", "beta", "gamma"]);
        assert!(store.last_modified().is_some());
    }

    #[test]
    fn test_refresh_without_change_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keywords.txt");
        write_file(&path, "alpha\nbeta\n");

        let store = KeywordStore::new(&path);
        store.refresh_if_changed();
        let before = store.snapshot();
        let stamp = store.last_modified();

        assert_eq!(store.refresh_if_changed(), RefreshOutcome::Unchanged);
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
        assert_eq!(stamp, store.last_modified());
    }

    #[test]
    fn test_content_change_swaps_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keywords.txt");
        write_file(&path, "alpha\n");
        set_mtime(&path, 1_000);

        let store = KeywordStore::new(&path);
        store.refresh_if_changed();
        let old = store.snapshot();

        write_file(&path, "alpha\nbeta\n");
        set_mtime(&path, 2_000);

        assert_eq!(
            store.refresh_if_changed(),
            RefreshOutcome::Reloaded { count: 2 }
        );
        // Snapshots taken earlier keep the list they were taken from.
        assert_eq!(texts(&old), vec!["alpha"]);
        assert_eq!(texts(&store.snapshot()), vec!["alpha", "beta"]);
        assert_eq!(
            store.last_modified(),
            Some(SystemTime::UNIX_EPOCH + Duration::from_secs(2_000))
        );
    }

    #[test]
    fn test_touch_without_content_change_keeps_old_timestamp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keywords.txt");
        write_file(&path, "alpha\n");
        set_mtime(&path, 1_000);

        let store = KeywordStore::new(&path);
        store.refresh_if_changed();
        let before = store.snapshot();

        set_mtime(&path, 2_000);
        assert_eq!(store.refresh_if_changed(), RefreshOutcome::ContentUnchanged);
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
        assert_eq!(
            store.last_modified(),
            Some(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000))
        );

        // Still differs from the recorded timestamp, so it is parsed again.
        assert_eq!(store.refresh_if_changed(), RefreshOutcome::ContentUnchanged);
    }

    #[test]
    fn test_missing_file_keeps_previous_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keywords.txt");
        write_file(&path, "alpha\n");

        let store = KeywordStore::new(&path);
        store.refresh_if_changed();

        fs::remove_file(&path).unwrap();
        assert_eq!(store.refresh_if_changed(), RefreshOutcome::Failed);
        assert_eq!(texts(&store.snapshot()), vec!["alpha"]);
    }

    #[test]
    fn test_missing_file_on_first_refresh_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let store = KeywordStore::new(dir.path().join("absent.txt"));
        assert_eq!(store.refresh_if_changed(), RefreshOutcome::Failed);
        assert!(store.snapshot().is_empty());
        assert!(store.last_modified().is_none());
    }

    #[test]
    fn test_snapshot_readers_during_refresh_see_complete_lists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keywords.txt");
        write_file(&path, "a\nb\n");
        set_mtime(&path, 1_000);

        let store = Arc::new(KeywordStore::new(&path));
        store.refresh_if_changed();

        let reader = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..1_000 {
                    let len = store.snapshot().len();
                    assert!(len == 2 || len == 4, "partial list of {len} observed");
                }
            })
        };

        write_file(&path, "a\nb\nc\nd\n");
        set_mtime(&path, 2_000);
        store.refresh_if_changed();

        reader.join().unwrap();
        assert_eq!(store.snapshot().len(), 4);
    }
}
