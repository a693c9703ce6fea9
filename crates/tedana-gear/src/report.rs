//! HTML report post-processing.
//!
//! tedana writes its reports as an HTML file plus a sibling `figures/`
//! directory of images. The platform file browser serves single files, so
//! reports are made portable in two ways: every figure reference is
//! inlined as a base64 `data:` URI to produce a self-contained `.html`,
//! and `index.html` is packed together with its figure directories into a
//! `.html.zip` the platform renders in a browser tab.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Local;
use tracing::{debug, error, info, warn};
use zip::ZipWriter;

use crate::archive;
use crate::error::Result;

/// Directory of images referenced by a report.
const FIGURES_DIR: &str = "figures";

/// MIME type for an inlined figure, by extension.
fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .as_deref()
    {
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Rewrite a report so its figure references are embedded data URIs.
///
/// Every file in the sibling `figures/` directory whose relative
/// reference (`./figures/<name>`) appears in the HTML text is inlined.
/// Without a figures directory the report is copied through unchanged.
///
/// # Errors
///
/// Returns an error if the report or a referenced figure cannot be read,
/// or the result cannot be written.
pub fn flatten_image_refs(html_path: &Path, dest_path: &Path) -> Result<()> {
    let mut text = fs::read_to_string(html_path)?;

    let figures = html_path
        .parent()
        .map(|p| p.join(FIGURES_DIR))
        .filter(|p| p.is_dir());

    if let Some(figures) = figures {
        let mut entries: Vec<PathBuf> = fs::read_dir(&figures)?
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        entries.sort();

        for figure in entries {
            let Some(name) = figure.file_name().map(|n| n.to_string_lossy().to_string())
            else {
                continue;
            };
            let needle = format!("./{FIGURES_DIR}/{name}");
            if !text.contains(&needle) {
                continue;
            }
            let encoded = STANDARD.encode(fs::read(&figure)?);
            let uri = format!("data:{};base64,{encoded}", mime_for(&figure));
            text = text.replace(&needle, &uri);
            debug!(figure = %name, "Inlined figure");
        }
    }

    info!(report = %dest_path.display(), "Writing self-contained report");
    fs::write(dest_path, text)?;
    Ok(())
}

/// Pack a report into a browser-viewable archive.
///
/// The archive lands in `output_dir` as `<stem>_<destination_id>.html.zip`
/// and contains the report as `index.html` (the name the platform opens)
/// plus every `figures/` directory beneath `report_dir`.
///
/// # Errors
///
/// Returns an error if the archive cannot be written.
pub fn zip_viewable(
    output_dir: &Path,
    destination_id: &str,
    html_name: &str,
    report_dir: &Path,
) -> Result<()> {
    let stem = html_name.strip_suffix(".html").unwrap_or(html_name);
    let dest_zip = output_dir.join(format!("{stem}_{destination_id}.html.zip"));
    debug!(archive = %dest_zip.display(), "Creating viewable archive");

    let mut writer = ZipWriter::new(File::create(&dest_zip)?);
    archive::add_file(&mut writer, &report_dir.join(html_name), "index.html")?;

    for figures in collect_figure_dirs(report_dir)? {
        info!(figures = %figures.display(), "Including figure directory");
        let name = archive::entry_name(report_dir, &figures)?;
        writer.add_directory(format!("{name}/"), archive::entry_options())?;
        archive::add_dir_contents(&mut writer, report_dir, &figures)?;
    }

    writer.finish()?;
    Ok(())
}

/// Publish every report in a result directory to the gear output.
///
/// `index.html` is handled first: it is packed via [`zip_viewable`] and
/// set aside under a timestamped name so a later report named `index`
/// can't collide, then restored afterwards. Every other `*.html` is
/// flattened into `output_dir` as `<stem>_<destination_id>.html`.
///
/// A missing result directory or a directory without reports is logged
/// and tolerated; the run's outcome is decided by the denoiser itself.
///
/// # Errors
///
/// Returns an error if reading or writing a report fails.
pub fn publish_reports(
    output_dir: &Path,
    destination_id: &str,
    report_dir: &Path,
) -> Result<()> {
    info!("Creating viewable archives for all html files");

    if !report_dir.is_dir() {
        error!(path = %report_dir.display(), "Report path not found");
        return Ok(());
    }

    let mut html_files: Vec<String> = fs::read_dir(report_dir)?
        .filter_map(std::result::Result::ok)
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(".html"))
        .collect();
    html_files.sort();

    if html_files.is_empty() {
        warn!(path = %report_dir.display(), "No *.html files to publish");
        return Ok(());
    }

    let mut saved_index: Option<String> = None;
    if let Some(idx) = html_files.iter().position(|n| n == "index.html") {
        info!("Found index.html");
        zip_viewable(output_dir, destination_id, "index.html", report_dir)?;

        let save_name = format!(
            "{}_index.html",
            Local::now().format("%Y-%m-%d_%H-%M-%S")
        );
        fs::rename(report_dir.join("index.html"), report_dir.join(&save_name))?;
        saved_index = Some(save_name);
        html_files.remove(idx);
    }

    for name in &html_files {
        info!(report = %name, "Found report");
        let stem = name.strip_suffix(".html").unwrap_or(name);
        let dest = output_dir.join(format!("{stem}_{destination_id}.html"));
        flatten_image_refs(&report_dir.join(name), &dest)?;
    }

    if let Some(save_name) = saved_index {
        fs::rename(report_dir.join(save_name), report_dir.join("index.html"))?;
    }

    Ok(())
}

fn collect_figure_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let mut children: Vec<PathBuf> = fs::read_dir(&current)?
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        children.sort();
        for child in children {
            if child.file_name().map(|n| n == FIGURES_DIR).unwrap_or(false) {
                found.push(child);
            } else {
                stack.push(child);
            }
        }
    }
    found.sort();
    Ok(found)
}
