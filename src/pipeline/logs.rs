// ABOUTME: Per-run log directory under .caravel/logs/.
// ABOUTME: Kept on failure for inspection, removed after a clean run.

use chrono::Utc;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

const LOGS_SUBDIR: &str = ".caravel/logs";

/// A timestamped directory holding one log file per stage.
pub struct LogDir {
    root: PathBuf,
}

impl LogDir {
    /// Create `.caravel/logs/<timestamp>/` under the project directory.
    pub fn create(project_dir: &Path) -> io::Result<Self> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%SZ");
        let root = project_dir.join(LOGS_SUBDIR).join(stamp.to_string());
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Open a log file for a stage, returning its path and writer.
    pub fn stage_log(&self, stage: &str) -> io::Result<(PathBuf, File)> {
        let path = self.root.join(format!("{stage}.log"));
        let file = File::create(&path)?;
        Ok((path, file))
    }

    /// Remove the whole run directory. Called after a successful run.
    pub fn remove(&self) -> io::Result<()> {
        fs::remove_dir_all(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn stage_log_lands_under_run_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let logs = LogDir::create(tmp.path()).unwrap();

        let (path, mut file) = logs.stage_log("build").unwrap();
        writeln!(file, "step 1/3").unwrap();

        assert!(path.starts_with(logs.path()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "step 1/3\n");
    }

    #[test]
    fn remove_deletes_run_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let logs = LogDir::create(tmp.path()).unwrap();
        let root = logs.path().to_path_buf();

        logs.stage_log("verify").unwrap();
        logs.remove().unwrap();

        assert!(!root.exists());
    }
}
