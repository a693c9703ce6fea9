//! tedana command-line construction.
//!
//! The workflow is invoked through its CLI, so everything the gear decides
//! ends up as argv entries here. Parameters are rendered GNU-style: a
//! single-character key becomes `-k`, a longer key `--key`, and
//! multi-value parameters contribute one argv entry per value (the
//! denoiser accepts `-d file1 file2 ...`).

use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

/// The external program this gear wraps.
pub const TEDANA_PROGRAM: &str = "tedana";

/// Option keys reserved for the scheduler layers wrapped around the gear.
/// These must never leak onto the external command line.
fn reserved_option_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(gear|lsf|slurm|singularity)-").expect("reserved option pattern is valid")
    })
}

/// Check whether an option key belongs to a scheduler layer.
#[must_use]
pub fn is_reserved_option(key: &str) -> bool {
    reserved_option_pattern().is_match(key)
}

/// The value attached to one command parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// A bare flag with no value.
    Flag,
    /// A single value.
    Value(String),
    /// A list of values, one argv entry each.
    Values(Vec<String>),
}

/// Render a program, passthrough arguments, and keyed parameters into argv.
///
/// Reserved scheduler keys are dropped. Passthrough arguments come first so
/// a user-supplied option can still be overridden by the gear's own
/// parameters (last occurrence wins in the external CLI).
#[must_use]
pub fn build_argv(
    program: &str,
    extra_args: &[String],
    params: &[(String, ParamValue)],
) -> Vec<String> {
    let mut argv = Vec::with_capacity(1 + extra_args.len() + params.len() * 2);
    argv.push(program.to_string());
    argv.extend(extra_args.iter().cloned());

    for (key, value) in params {
        if is_reserved_option(key) {
            continue;
        }
        let option = if key.chars().count() == 1 {
            format!("-{key}")
        } else {
            format!("--{key}")
        };
        argv.push(option);
        match value {
            ParamValue::Flag => {}
            ParamValue::Value(v) => argv.push(v.clone()),
            ParamValue::Values(vs) => argv.extend(vs.iter().cloned()),
        }
    }

    argv
}

/// A fully specified tedana invocation for one echo group.
#[derive(Debug, Clone, PartialEq)]
pub struct TedanaCommand {
    data_files: Vec<PathBuf>,
    echo_times_ms: Vec<f64>,
    prefix: Option<String>,
    mask: Option<PathBuf>,
    out_dir: PathBuf,
    extra_args: Vec<String>,
}

impl TedanaCommand {
    /// Create a command for a group of echo files and their echo times.
    #[must_use]
    pub fn new(data_files: Vec<PathBuf>, echo_times_ms: Vec<f64>, out_dir: PathBuf) -> Self {
        Self {
            data_files,
            echo_times_ms,
            prefix: None,
            mask: None,
            out_dir,
            extra_args: Vec::new(),
        }
    }

    /// Set the output naming prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Use an explicit brain mask instead of letting tedana compute one.
    #[must_use]
    pub fn with_mask(mut self, mask: PathBuf) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Append raw passthrough arguments.
    #[must_use]
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Render the full argv for this invocation.
    #[must_use]
    pub fn to_argv(&self) -> Vec<String> {
        let mut params: Vec<(String, ParamValue)> = vec![
            (
                "d".to_string(),
                ParamValue::Values(
                    self.data_files
                        .iter()
                        .map(|p| p.to_string_lossy().to_string())
                        .collect(),
                ),
            ),
            (
                "e".to_string(),
                ParamValue::Values(
                    self.echo_times_ms.iter().map(|t| format!("{t}")).collect(),
                ),
            ),
        ];
        if let Some(prefix) = &self.prefix {
            params.push(("prefix".to_string(), ParamValue::Value(prefix.clone())));
        }
        if let Some(mask) = &self.mask {
            params.push((
                "mask".to_string(),
                ParamValue::Value(mask.to_string_lossy().to_string()),
            ));
        }
        params.push((
            "out-dir".to_string(),
            ParamValue::Value(self.out_dir.to_string_lossy().to_string()),
        ));

        build_argv(TEDANA_PROGRAM, &self.extra_args, &params)
    }
}

impl fmt::Display for TedanaCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_argv().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TedanaCommand {
        TedanaCommand::new(
            vec![
                PathBuf::from("/w/func/sub-01_task-rest_echo-1_desc-preproc_bold.nii.gz"),
                PathBuf::from("/w/func/sub-01_task-rest_echo-2_desc-preproc_bold.nii.gz"),
            ],
            vec![13.7, 31.2],
            PathBuf::from("/w/out/func"),
        )
    }

    #[test]
    fn test_is_reserved_option() {
        assert!(is_reserved_option("gear-dry-run"));
        assert!(is_reserved_option("lsf-queue"));
        assert!(is_reserved_option("slurm-partition"));
        assert!(is_reserved_option("singularity-bind"));
        assert!(!is_reserved_option("out-dir"));
        assert!(!is_reserved_option("mask"));
    }

    #[test]
    fn test_build_argv_short_and_long_keys() {
        let argv = build_argv(
            "tedana",
            &[],
            &[
                ("d".to_string(), ParamValue::Value("file".to_string())),
                ("out-dir".to_string(), ParamValue::Value("/out".to_string())),
            ],
        );
        assert_eq!(argv, vec!["tedana", "-d", "file", "--out-dir", "/out"]);
    }

    #[test]
    fn test_build_argv_flag_has_no_value() {
        let argv = build_argv(
            "tedana",
            &[],
            &[("no-reports".to_string(), ParamValue::Flag)],
        );
        assert_eq!(argv, vec!["tedana", "--no-reports"]);
    }

    #[test]
    fn test_build_argv_drops_reserved_keys() {
        let argv = build_argv(
            "tedana",
            &[],
            &[
                ("gear-dry-run".to_string(), ParamValue::Flag),
                ("slurm-cpus".to_string(), ParamValue::Value("4".to_string())),
                ("mask".to_string(), ParamValue::Value("m.nii.gz".to_string())),
            ],
        );
        assert_eq!(argv, vec!["tedana", "--mask", "m.nii.gz"]);
    }

    #[test]
    fn test_build_argv_passthrough_before_params() {
        let argv = build_argv(
            "tedana",
            &["--tedpca".to_string(), "kundu".to_string()],
            &[("d".to_string(), ParamValue::Value("f".to_string()))],
        );
        assert_eq!(argv, vec!["tedana", "--tedpca", "kundu", "-d", "f"]);
    }

    #[test]
    fn test_to_argv_minimal() {
        let argv = sample().to_argv();
        assert_eq!(
            argv,
            vec![
                "tedana",
                "-d",
                "/w/func/sub-01_task-rest_echo-1_desc-preproc_bold.nii.gz",
                "/w/func/sub-01_task-rest_echo-2_desc-preproc_bold.nii.gz",
                "-e",
                "13.7",
                "31.2",
                "--out-dir",
                "/w/out/func",
            ]
        );
    }

    #[test]
    fn test_to_argv_with_prefix_and_mask() {
        let argv = sample()
            .with_prefix("sub-01_task-rest")
            .with_mask(PathBuf::from("/w/func/mask.nii.gz"))
            .to_argv();

        let joined = argv.join(" ");
        assert!(joined.contains("--prefix sub-01_task-rest"));
        assert!(joined.contains("--mask /w/func/mask.nii.gz"));
        // out-dir stays last.
        assert_eq!(argv[argv.len() - 2], "--out-dir");
    }

    #[test]
    fn test_to_argv_with_extra_args() {
        let argv = sample()
            .with_extra_args(vec!["--tedpca".to_string(), "mdl".to_string()])
            .to_argv();
        assert_eq!(argv[1], "--tedpca");
        assert_eq!(argv[2], "mdl");
        assert_eq!(argv[3], "-d");
    }

    #[test]
    fn test_echo_time_formatting() {
        let cmd = TedanaCommand::new(
            vec![PathBuf::from("f")],
            vec![12.0, 28.5],
            PathBuf::from("/out"),
        );
        let argv = cmd.to_argv();
        let e_idx = argv.iter().position(|a| a == "-e").unwrap();
        assert_eq!(argv[e_idx + 1], "12");
        assert_eq!(argv[e_idx + 2], "28.5");
    }

    #[test]
    fn test_display_joins_argv() {
        let display = sample().to_string();
        assert!(display.starts_with("tedana -d "));
        assert!(display.contains("--out-dir /w/out/func"));
    }
}
