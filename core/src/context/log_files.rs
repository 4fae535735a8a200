use crate::context::error::WatcherError;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub const LOG_FILE_PREFIX: &str = "eqlog_";
pub const LOG_FILE_EXTENSION: &str = ".txt";
pub const UNKNOWN_CHARACTER: &str = "Unknown";

pub struct LogFileMetaData {
    pub path: PathBuf,
    pub filename: String,
    pub character_name: String,
    pub modified: SystemTime,
    pub file_size: u64,
}

impl LogFileMetaData {
    fn from_path(path: PathBuf) -> Option<Self> {
        let filename = path.file_name()?.to_str()?.to_string();
        let metadata = fs::metadata(&path).ok()?;
        if !metadata.is_file() {
            return None;
        }

        Some(Self {
            character_name: character_name(&path),
            modified: metadata.modified().ok()?,
            file_size: metadata.len(),
            filename,
            path,
        })
    }

    /// Formatted modification time for display
    pub fn formatted_modified(&self) -> String {
        DateTime::<Local>::from(self.modified)
            .format("%Y-%m-%d %-H:%M")
            .to_string()
    }
}

/// `eqlog_<character>_<server>.txt`
pub fn is_game_log(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(LOG_FILE_PREFIX) && n.ends_with(LOG_FILE_EXTENSION))
        .unwrap_or(false)
}

/// Character name is the second `_`-separated token of the file name.
pub fn character_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.strip_suffix(LOG_FILE_EXTENSION).unwrap_or(n))
        .and_then(|stem| stem.split('_').nth(1))
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_CHARACTER)
        .to_string()
}

/// All game logs in `dir`, newest modification first.
///
/// Files that disappear or can't be stat'ed while listing are skipped.
pub fn list_log_files(dir: &Path) -> Result<Vec<LogFileMetaData>, WatcherError> {
    let entries = fs::read_dir(dir).map_err(|source| WatcherError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<LogFileMetaData> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| is_game_log(p))
        .filter_map(LogFileMetaData::from_path)
        .collect();

    files.sort_by(|a, b| b.modified.cmp(&a.modified));
    Ok(files)
}

/// The log the game is currently writing to: the most recently modified
/// `eqlog_*.txt` in `dir`.
pub fn newest_log_file(dir: &Path) -> Result<Option<PathBuf>, WatcherError> {
    Ok(list_log_files(dir)?.into_iter().next().map(|f| f.path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn touch(path: &Path, age_secs: u64) {
        let file = fs::File::create(path).unwrap();
        let when = SystemTime::now() - Duration::from_secs(age_secs);
        file.set_modified(when).unwrap();
    }

    #[test]
    fn character_name_from_file_name() {
        assert_eq!(
            character_name(Path::new("/logs/eqlog_Soandso_P1999Green.txt")),
            "Soandso"
        );
        assert_eq!(character_name(Path::new("eqlog_Solo.txt")), "Solo");
        assert_eq!(character_name(Path::new("eqlog.txt")), UNKNOWN_CHARACTER);
        assert_eq!(character_name(Path::new("eqlog__x.txt")), UNKNOWN_CHARACTER);
    }

    #[test]
    fn only_game_logs_match() {
        assert!(is_game_log(Path::new("eqlog_Soandso_P1999Green.txt")));
        assert!(!is_game_log(Path::new("dbg.txt")));
        assert!(!is_game_log(Path::new("eqlog_Soandso_P1999Green.txt.bak")));
    }

    #[test]
    fn newest_log_file_uses_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("eqlog_Older_P1999Green.txt"), 600);
        touch(&dir.path().join("eqlog_Newer_P1999Green.txt"), 5);
        touch(&dir.path().join("notes.txt"), 0);

        let newest = newest_log_file(dir.path()).unwrap().unwrap();
        assert_eq!(newest.file_name().unwrap(), "eqlog_Newer_P1999Green.txt");

        let listed = list_log_files(dir.path()).unwrap();
        let names: Vec<_> = listed.iter().map(|f| f.character_name.as_str()).collect();
        assert_eq!(names, vec!["Newer", "Older"]);
    }

    #[test]
    fn empty_directory_has_no_active_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(newest_log_file(dir.path()).unwrap().is_none());
    }

    #[test]
    fn unreadable_directory_is_an_error() {
        let err = newest_log_file(Path::new("/no/such/eqlive/dir")).unwrap_err();
        assert!(matches!(err, WatcherError::ReadDir { .. }));
    }
}
