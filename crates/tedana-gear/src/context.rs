//! Platform invocation layout and parsing.
//!
//! A gear run receives a fixed directory layout from the hosting platform:
//! an invocation file (`config.json`) describing inputs and the destination
//! analysis, an `input/` tree holding the staged input files, an `output/`
//! directory the platform collects after the run, and a scratch `work/`
//! directory. This module resolves that layout and decides which of the two
//! run modes the provided inputs select.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Default gear base directory inside the platform container.
pub const DEFAULT_BASE_DIR: &str = "/flywheel/v0";

/// Invocation file name within the base directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Input slot holding the preprocessed derivatives archive.
pub const INPUT_FMRIPREP_ZIP: &str = "fmriprep_zip";

/// Input slots holding manually supplied per-echo images.
pub const INPUT_ECHOES: [&str; 3] = ["fmri_echo_1", "fmri_echo_2", "fmri_echo_3"];

/// Which discovery path a run takes, decided by the provided inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Echo images are unpacked from a preprocessed derivatives archive.
    Fmriprep,
    /// Echo images were supplied directly as gear inputs.
    Manual,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fmriprep => write!(f, "fmriprep"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Location of a staged input file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InputLocation {
    /// Absolute path of the staged file.
    pub path: PathBuf,
    /// Original file name.
    pub name: String,
}

/// A named input slot from the invocation file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InputFile {
    /// Where the platform staged the file.
    pub location: InputLocation,
}

/// The analysis container this run writes into.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Destination {
    /// Destination analysis id.
    pub id: String,
}

/// The parsed invocation file.
///
/// The `config` table is deliberately absent here; it is layered through
/// figment in [`crate::config::AppConfig`] so environment overrides apply.
#[derive(Debug, Clone, Deserialize)]
pub struct Invocation {
    /// Provided input slots, keyed by manifest name.
    #[serde(default)]
    pub inputs: HashMap<String, InputFile>,
    /// Destination analysis.
    pub destination: Destination,
}

/// Resolved gear run layout.
#[derive(Debug)]
pub struct GearContext {
    base_dir: PathBuf,
    config_path: PathBuf,
    output_dir: PathBuf,
    work_dir: PathBuf,
    invocation: Invocation,
}

impl GearContext {
    /// Load the gear context from a base directory.
    ///
    /// Reads and parses the invocation file and creates the output and
    /// work directories if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the invocation file is missing or malformed,
    /// or if the output/work directories cannot be created.
    pub fn load(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        let config_path = base_dir.join(CONFIG_FILE_NAME);

        debug!("Reading invocation file {}", config_path.display());
        let raw = fs::read_to_string(&config_path).map_err(|source| Error::InvocationRead {
            path: config_path.clone(),
            source,
        })?;
        let invocation: Invocation =
            serde_json::from_str(&raw).map_err(|source| Error::InvocationParse {
                path: config_path.clone(),
                source,
            })?;

        let output_dir = base_dir.join("output");
        let work_dir = base_dir.join("work");
        for dir in [&output_dir, &work_dir] {
            fs::create_dir_all(dir).map_err(|source| Error::DirectoryCreate {
                path: dir.clone(),
                source,
            })?;
        }

        info!(
            destination = %invocation.destination.id,
            inputs = invocation.inputs.len(),
            "Loaded gear invocation"
        );

        Ok(Self {
            base_dir,
            config_path,
            output_dir,
            work_dir,
            invocation,
        })
    }

    /// The gear base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the invocation file.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Directory the platform collects after the run.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Scratch directory for intermediate files.
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Destination analysis id.
    #[must_use]
    pub fn destination_id(&self) -> &str {
        &self.invocation.destination.id
    }

    /// Path of a named input, if it was provided.
    #[must_use]
    pub fn input_path(&self, name: &str) -> Option<&Path> {
        self.invocation
            .inputs
            .get(name)
            .map(|input| input.location.path.as_path())
    }

    /// Decide which run mode the provided inputs select.
    ///
    /// Exactly one of the archive input and the first manual echo input
    /// must be present; anything else is a configuration mistake worth
    /// failing loudly on.
    ///
    /// # Errors
    ///
    /// Returns an error if neither or both run modes are selected.
    pub fn input_kind(&self) -> Result<InputKind> {
        let has_archive = self.input_path(INPUT_FMRIPREP_ZIP).is_some();
        let has_manual = self.input_path(INPUT_ECHOES[0]).is_some();

        match (has_archive, has_manual) {
            (true, false) => Ok(InputKind::Fmriprep),
            (false, true) => Ok(InputKind::Manual),
            (true, true) => Err(Error::input_selection(
                "both a preprocessed archive and manual echo inputs were provided; \
                 remove one of them",
            )),
            (false, false) => Err(Error::input_selection(
                "no inputs were provided; supply either a preprocessed archive or \
                 manual echo files",
            )),
        }
    }

    /// Paths of the manually supplied echo inputs, in slot order.
    #[must_use]
    pub fn manual_echo_paths(&self) -> Vec<&Path> {
        INPUT_ECHOES
            .iter()
            .filter_map(|name| self.input_path(name))
            .collect()
    }
}
