// ABOUTME: Build context archiving for engine-side image builds.
// ABOUTME: Packs a directory into a tar.gz archive the build endpoint accepts.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs;
use std::io;
use std::path::Path;
use tar::Builder;

const MAX_CONTEXT_SIZE: usize = 500 * 1024 * 1024;

// Run logs and other pipeline artifacts; never part of the image.
const WORK_DIR: &str = ".caravel";

/// Create a tar.gz build context from a directory.
///
/// The directory must contain the Dockerfile; the archive preserves relative
/// paths so the engine sees the same layout as a `.` build context. The
/// pipeline's own work directory is left out.
pub fn build_context(context_dir: &Path) -> io::Result<Vec<u8>> {
    tracing::debug!("creating build context from {}", context_dir.display());

    let mut archive_data = Vec::new();
    {
        let encoder = GzEncoder::new(&mut archive_data, Compression::default());
        let mut tar = Builder::new(encoder);
        for entry in fs::read_dir(context_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if name == WORK_DIR {
                continue;
            }
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                tar.append_dir_all(Path::new(&name), &path)?;
            } else {
                tar.append_path_with_name(&path, Path::new(&name))?;
            }
        }
        tar.finish()?;
    }

    tracing::debug!("build context: {} bytes", archive_data.len());

    if archive_data.len() > MAX_CONTEXT_SIZE {
        tracing::warn!(
            "build context is {}MB; consider a .dockerignore to exclude local artifacts",
            archive_data.len() / 1024 / 1024
        );
    }

    Ok(archive_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn packs_directory_with_relative_paths() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM alpine\n").unwrap();
        fs::write(dir.path().join("app.py"), "print('hi')\n").unwrap();
        let sub = dir.path().join("static");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("index.html"), "<html/>").unwrap();

        let archive = build_context(dir.path()).unwrap();
        assert!(!archive.is_empty());

        let extract = tempdir().unwrap();
        let decoder = flate2::read::GzDecoder::new(std::io::Cursor::new(archive));
        tar::Archive::new(decoder).unpack(extract.path()).unwrap();

        assert!(extract.path().join("Dockerfile").exists());
        assert!(extract.path().join("app.py").exists());
        assert!(extract.path().join("static/index.html").exists());
    }

    #[test]
    fn run_logs_stay_out_of_the_context() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM alpine\n").unwrap();
        let logs = dir.path().join(".caravel/logs/20260830T120000Z");
        fs::create_dir_all(&logs).unwrap();
        fs::write(logs.join("build.log"), "step 1/1\n").unwrap();

        let archive = build_context(dir.path()).unwrap();

        let extract = tempdir().unwrap();
        let decoder = flate2::read::GzDecoder::new(std::io::Cursor::new(archive));
        tar::Archive::new(decoder).unpack(extract.path()).unwrap();

        assert!(extract.path().join("Dockerfile").exists());
        assert!(!extract.path().join(".caravel").exists());
    }

    #[test]
    fn empty_directory_still_archives() {
        let dir = tempdir().unwrap();
        let archive = build_context(dir.path()).unwrap();
        assert!(!archive.is_empty());
    }
}
