//! BIDS filename conventions.
//!
//! Preprocessed multi-echo runs arrive as flat `func/` directories full of
//! files like
//! `sub-01_ses-01_task-rest_run-1_echo-2_desc-preproc_bold.nii.gz`.
//! Everything this gear needs to know (which files belong to one
//! acquisition, what to call the outputs, where the echo times live) is
//! encoded in those names:
//!
//! - **Entity parsing**: splitting a filename into its ordered
//!   `key-value` segments.
//!
//! - **Discovery**: sweeping a `func/` directory for multi-echo task
//!   groups, their per-echo files, sidecar metadata, and brain masks.
//!
//! # Example
//!
//! ```
//! use tedana_gear::bids::Entities;
//!
//! let e = Entities::parse("sub-01_ses-01_task-rest_echo-2_desc-preproc_bold.nii.gz");
//! assert_eq!(e.task_key().as_deref(), Some("task-rest"));
//! assert_eq!(e.prefix().as_deref(), Some("sub-01_ses-01_task-rest"));
//! ```

mod discover;
mod entities;

pub use discover::{
    discover_session_dir, discover_tasks, echo_files, find_mask, read_echo_time_ms, sidecar_path,
};
pub use entities::Entities;
