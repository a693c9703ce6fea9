//! End-to-end gear workflow.
//!
//! One gear run is a single deterministic pass: discover the echo groups,
//! run the denoiser once per group, then publish reports and pack the
//! analysis tree for the platform to collect. The two run modes differ
//! only in where the echo files and echo times come from.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::archive;
use crate::bids::{self, Entities};
use crate::command::TedanaCommand;
use crate::config::{AppConfig, OutputLayout};
use crate::context::{GearContext, InputKind, INPUT_ECHOES, INPUT_FMRIPREP_ZIP};
use crate::error::{Error, Result};
use crate::exec;
use crate::report;

/// Run the gear workflow selected by the provided inputs.
///
/// # Errors
///
/// Returns an error if discovery fails, the denoiser fails, or any
/// post-processing step fails.
pub fn run(ctx: &GearContext, cfg: &AppConfig) -> Result<()> {
    let kind = ctx.input_kind()?;
    info!(mode = %kind, destination = %ctx.destination_id(), "Starting workflow");
    match kind {
        InputKind::Fmriprep => run_fmriprep(ctx, cfg),
        InputKind::Manual => run_manual(ctx, cfg),
    }
}

/// Denoise every multi-echo task group found in a preprocessed archive.
fn run_fmriprep(ctx: &GearContext, cfg: &AppConfig) -> Result<()> {
    let zip_path = ctx
        .input_path(INPUT_FMRIPREP_ZIP)
        .filter(|p| p.is_file())
        .ok_or_else(|| Error::input_missing(INPUT_FMRIPREP_ZIP))?;

    let analysis_id = archive::top_level_dir(zip_path)?;
    archive::unzip_to(zip_path, ctx.work_dir())?;
    let fmriprep_dir = ctx.work_dir().join(&analysis_id).join("fmriprep");

    let (sid, sesid, session_dir) = bids::discover_session_dir(
        &fmriprep_dir,
        cfg.subject_label.as_deref(),
        cfg.session_label.as_deref(),
    )?;
    info!(subject = %sid, session = %sesid, "Resolved session");

    let func_dir = session_dir.join("func");
    let tasks = bids::discover_tasks(&func_dir)?;
    if tasks.is_empty() {
        return Err(Error::discovery(format!(
            "no multi-echo task groups under {}",
            func_dir.display()
        )));
    }
    info!(groups = tasks.len(), "Discovered task groups");

    for task in &tasks {
        let echoes = bids::echo_files(&func_dir, task)?;
        if echoes.len() < 2 {
            warn!(task = %task, "Fewer than two preprocessed echoes, skipping group");
            continue;
        }

        let echo_times = echoes
            .iter()
            .map(|p| bids::read_echo_time_ms(&bids::sidecar_path(p)))
            .collect::<Result<Vec<_>>>()?;
        info!(
            task = %task,
            files = echoes.len(),
            times_ms = ?echo_times,
            "Using multi-echo group"
        );

        let prefix = group_prefix(&echoes[0])?;
        let out_dir = analysis_out_dir(ctx, cfg, &sid, &sesid);
        fs::create_dir_all(&out_dir).map_err(|source| Error::DirectoryCreate {
            path: out_dir.clone(),
            source,
        })?;

        let mut command = TedanaCommand::new(echoes, echo_times, out_dir.clone())
            .with_prefix(&prefix)
            .with_extra_args(cfg.extra_args());

        if cfg.explicit_mask {
            let mask = bids::find_mask(&func_dir, &prefix)?.ok_or_else(|| {
                Error::discovery(format!(
                    "explicit mask requested but no {prefix}*desc-brain_mask.nii.gz found"
                ))
            })?;
            info!(mask = %mask.display(), "Using explicit brain mask");
            command = command.with_mask(mask);
        }

        exec::run_streamed(&command.to_argv(), ctx.work_dir(), cfg.gear_dry_run)?;

        if !cfg.gear_dry_run {
            rename_outputs(&out_dir, &prefix)?;
            report::publish_reports(ctx.output_dir(), ctx.destination_id(), &out_dir)?;
        }
    }

    if !cfg.gear_dry_run {
        pack_analysis(ctx, Some(&sesid))?;
    }
    Ok(())
}

/// Denoise a single group of manually supplied echo images.
fn run_manual(ctx: &GearContext, cfg: &AppConfig) -> Result<()> {
    let mut echoes: Vec<PathBuf> = Vec::new();
    for name in INPUT_ECHOES {
        if let Some(path) = ctx.input_path(name) {
            if !path.is_file() {
                return Err(Error::input_missing(name));
            }
            echoes.push(path.to_path_buf());
        }
    }
    if echoes.len() < 2 {
        return Err(Error::validation(
            "multi-echo denoising needs at least two echo inputs",
        ));
    }

    let echo_times = match cfg.parsed_echo_times()? {
        Some(times) => times,
        None => echoes
            .iter()
            .map(|p| bids::read_echo_time_ms(&bids::sidecar_path(p)))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| {
                Error::validation(format!(
                    "echo-times is not set and sidecar lookup failed: {e}"
                ))
            })?,
    };
    if echo_times.len() != echoes.len() {
        return Err(Error::validation(format!(
            "{} echo times were given for {} echo files",
            echo_times.len(),
            echoes.len()
        )));
    }
    info!(files = echoes.len(), times_ms = ?echo_times, "Using manual echo group");

    let prefix = echoes[0]
        .file_name()
        .map(|n| Entities::parse(&n.to_string_lossy()))
        .and_then(|e| e.prefix())
        .unwrap_or_else(|| "tedana".to_string());

    let out_dir = ctx.work_dir().join(ctx.destination_id()).join("func");
    fs::create_dir_all(&out_dir).map_err(|source| Error::DirectoryCreate {
        path: out_dir.clone(),
        source,
    })?;

    if cfg.explicit_mask {
        warn!("explicit-mask only applies when running from a preprocessed archive, ignoring");
    }

    let command = TedanaCommand::new(echoes, echo_times, out_dir.clone())
        .with_prefix(&prefix)
        .with_extra_args(cfg.extra_args());

    exec::run_streamed(&command.to_argv(), ctx.work_dir(), cfg.gear_dry_run)?;

    if !cfg.gear_dry_run {
        rename_outputs(&out_dir, &prefix)?;
        report::publish_reports(ctx.output_dir(), ctx.destination_id(), &out_dir)?;
        pack_analysis(ctx, cfg.session_label.as_deref())?;
    }
    Ok(())
}

/// Where tedana derivatives go for one session, by configured layout.
fn analysis_out_dir(ctx: &GearContext, cfg: &AppConfig, sid: &str, sesid: &str) -> PathBuf {
    let base = ctx
        .work_dir()
        .join(ctx.destination_id())
        .join("fmriprep");
    let base = match cfg.output_layout {
        OutputLayout::Bids => base.join("derivatives").join("tedana"),
        OutputLayout::Legacy => base,
    };
    base.join(format!("sub-{sid}"))
        .join(format!("ses-{sesid}"))
        .join("func")
}

/// Output naming prefix of an echo group, from its first file.
fn group_prefix(first_echo: &Path) -> Result<String> {
    let name = first_echo
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Entities::parse(&name).prefix().ok_or_else(|| {
        Error::discovery(format!("cannot derive output prefix from '{name}'"))
    })
}

/// Rename default-named denoiser outputs to carry the group prefix.
///
/// Files already carrying the prefix are left alone.
fn rename_outputs(out_dir: &Path, prefix: &str) -> Result<()> {
    for entry in fs::read_dir(out_dir)? {
        let Ok(entry) = entry else { continue };
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with("tedana") || name.contains(prefix) {
            continue;
        }
        let renamed = name.replacen("tedana", prefix, 1);
        debug!(from = %name, to = %renamed, "Renaming output");
        fs::rename(entry.path(), out_dir.join(renamed))?;
    }
    Ok(())
}

/// Pack the destination analysis tree into the gear output directory.
fn pack_analysis(ctx: &GearContext, session: Option<&str>) -> Result<()> {
    let zip_name = match session {
        Some(session) => format!("tedana_{session}_{}.zip", ctx.destination_id()),
        None => format!("tedana_{}.zip", ctx.destination_id()),
    };
    archive::zip_dir(
        ctx.work_dir(),
        ctx.destination_id(),
        &ctx.output_dir().join(zip_name),
    )
}
