//! Zip packing and unpacking.
//!
//! Two archive shapes flow through a gear run: the preprocessed
//! derivatives archive supplied as input (unpacked into the work
//! directory), and the analysis tree packed back up for the platform to
//! collect. Entry names always use forward slashes and are kept relative
//! so the archive root is the destination-id directory itself.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};

/// Extract an archive into a directory.
///
/// Extraction refuses entries that would escape `dest` (the zip crate
/// rejects non-enclosed names).
///
/// # Errors
///
/// Returns an error if the archive cannot be opened or extracted.
pub fn unzip_to(zip_path: &Path, dest: &Path) -> Result<()> {
    info!(
        archive = %zip_path.display(),
        dest = %dest.display(),
        "Unpacking archive"
    );
    let file = File::open(zip_path)?;
    let mut archive = ZipArchive::new(file)?;
    archive.extract(dest)?;
    debug!(entries = archive.len(), "Archive unpacked");
    Ok(())
}

/// The first path component of an archive's first entry.
///
/// Preprocessing gears pack their output under a single directory named
/// after the producing analysis; that name tells us where the unpacked
/// tree will land.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened, is empty, or its
/// first entry has no usable leading component.
pub fn top_level_dir(zip_path: &Path) -> Result<String> {
    let file = File::open(zip_path)?;
    let archive = ZipArchive::new(file)?;

    let first = archive.file_names().next().ok_or_else(|| Error::ZipEntry {
        path: zip_path.to_path_buf(),
        message: "archive is empty".to_string(),
    })?;

    let component = first
        .split('/')
        .find(|part| !part.is_empty())
        .ok_or_else(|| Error::ZipEntry {
            path: zip_path.to_path_buf(),
            message: format!("entry '{first}' has no leading directory"),
        })?;

    Ok(component.to_string())
}

/// Recursively archive `src_root/dir_name` into `dest_zip`.
///
/// Entry names are relative to `src_root`, so unpacking the result
/// recreates `dir_name/...`.
///
/// # Errors
///
/// Returns an error if the tree cannot be walked or the archive written.
pub fn zip_dir(src_root: &Path, dir_name: &str, dest_zip: &Path) -> Result<()> {
    let src = src_root.join(dir_name);
    info!(
        src = %src.display(),
        dest = %dest_zip.display(),
        "Packing directory"
    );

    let mut writer = ZipWriter::new(File::create(dest_zip)?);
    add_dir_contents(&mut writer, src_root, &src)?;
    writer.finish()?;
    Ok(())
}

/// Default compression options for archive entries.
pub(crate) fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Add one file to an open archive under an explicit entry name.
pub(crate) fn add_file(
    writer: &mut ZipWriter<File>,
    path: &Path,
    entry_name: &str,
) -> Result<()> {
    debug!(entry = entry_name, "Adding archive entry");
    writer.start_file(entry_name, entry_options())?;
    let mut file = File::open(path)?;
    io::copy(&mut file, writer)?;
    Ok(())
}

/// Recursively add a directory's contents to an open archive, with entry
/// names relative to `root`. Traversal is sorted for stable archives.
pub(crate) fn add_dir_contents(
    writer: &mut ZipWriter<File>,
    root: &Path,
    dir: &Path,
) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .collect();
    entries.sort();

    for path in entries {
        let name = entry_name(root, &path)?;
        if path.is_dir() {
            writer.add_directory(format!("{name}/"), entry_options())?;
            add_dir_contents(writer, root, &path)?;
        } else {
            add_file(writer, &path, &name)?;
        }
    }
    Ok(())
}

/// Forward-slash entry name of `path` relative to `root`.
pub(crate) fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let rel = path.strip_prefix(root).map_err(|_| {
        Error::internal(format!(
            "{} is not under {}",
            path.display(),
            root.display()
        ))
    })?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_tree(root: &Path) {
        let analysis = root.join("analysis-1").join("fmriprep").join("sub-01");
        fs::create_dir_all(&analysis).unwrap();
        fs::write(analysis.join("report.html"), "<html></html>").unwrap();
        fs::write(
            root.join("analysis-1").join("dataset_description.json"),
            "{}",
        )
        .unwrap();
    }

    fn archive_names(path: &Path) -> Vec<String> {
        let archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        archive.file_names().map(String::from).collect()
    }

    #[test]
    fn test_zip_dir_entry_names_are_relative() {
        let dir = tempfile::tempdir().unwrap();
        build_tree(dir.path());
        let dest = dir.path().join("out.zip");

        zip_dir(dir.path(), "analysis-1", &dest).unwrap();

        let names = archive_names(&dest);
        assert!(names.contains(&"analysis-1/dataset_description.json".to_string()));
        assert!(names.contains(&"analysis-1/fmriprep/sub-01/report.html".to_string()));
        assert!(names.iter().all(|n| n.starts_with("analysis-1")));
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        build_tree(dir.path());
        let dest = dir.path().join("out.zip");
        zip_dir(dir.path(), "analysis-1", &dest).unwrap();

        let unpack = tempfile::tempdir().unwrap();
        unzip_to(&dest, unpack.path()).unwrap();
        assert!(unpack
            .path()
            .join("analysis-1/fmriprep/sub-01/report.html")
            .is_file());
    }

    #[test]
    fn test_top_level_dir() {
        let dir = tempfile::tempdir().unwrap();
        build_tree(dir.path());
        let dest = dir.path().join("out.zip");
        zip_dir(dir.path(), "analysis-1", &dest).unwrap();

        assert_eq!(top_level_dir(&dest).unwrap(), "analysis-1");
    }

    #[test]
    fn test_top_level_dir_empty_archive() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("empty.zip");
        let writer = ZipWriter::new(File::create(&dest).unwrap());
        writer.finish().unwrap();

        let err = top_level_dir(&dest).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_unzip_missing_archive() {
        let dir = tempfile::tempdir().unwrap();
        let err = unzip_to(&dir.path().join("nope.zip"), dir.path()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_unzip_rejects_escaping_entries() {
        let dir = tempfile::tempdir().unwrap();
        let evil = dir.path().join("evil.zip");
        let mut writer = ZipWriter::new(File::create(&evil).unwrap());
        // Some writer versions refuse escaping names outright; that is an
        // equally acceptable outcome for this test.
        if writer.start_file("../escaped.txt", entry_options()).is_ok() {
            use std::io::Write;
            let _ = writer.write_all(b"nope");
            let _ = writer.finish();

            let unpack = dir.path().join("unpack");
            fs::create_dir_all(&unpack).unwrap();
            let _ = unzip_to(&evil, &unpack);
        }
        // Whatever the outcome, nothing may land outside the target.
        assert!(!dir.path().join("escaped.txt").exists());
    }

    #[test]
    fn test_entry_name_uses_forward_slashes() {
        let root = Path::new("/work");
        let path = Path::new("/work/a/b/c.txt");
        assert_eq!(entry_name(root, path).unwrap(), "a/b/c.txt");
    }

    #[test]
    fn test_entry_name_outside_root() {
        let root = Path::new("/work");
        let path = Path::new("/elsewhere/c.txt");
        assert!(entry_name(root, path).is_err());
    }
}
