//! Subprocess execution.
//!
//! The gear runs exactly one kind of child process: the denoising workflow
//! itself. Its output is the only progress signal the platform shows users
//! during a run, so both pipes are streamed into the gear log line by line
//! while the child runs instead of being collected at the end.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Run a command to completion, streaming its output into the gear log.
///
/// With `dry_run` set, the rendered command line is logged and nothing is
/// spawned. Otherwise the child runs with `cwd` as its working directory
/// and a non-zero exit becomes an error carrying the status.
///
/// # Errors
///
/// Returns an error if the argv is empty, the program cannot be spawned,
/// or the child exits with a failure status.
pub fn run_streamed(argv: &[String], cwd: &Path, dry_run: bool) -> Result<()> {
    let Some((program, args)) = argv.split_first() else {
        return Err(Error::internal("empty command"));
    };

    info!(command = %argv.join(" "), "Running");
    if dry_run {
        info!("Dry run requested, not executing");
        return Ok(());
    }

    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| Error::CommandSpawn {
            program: program.clone(),
            source,
        })?;

    debug!(pid = child.id(), "Child process started");

    // Drain both pipes on their own threads so a chatty child can't
    // deadlock against a full pipe buffer.
    let stdout_handle = child.stdout.take().map(|out| {
        thread::spawn(move || forward_lines(out, false))
    });
    let stderr_handle = child.stderr.take().map(|err| {
        thread::spawn(move || forward_lines(err, true))
    });

    let status = child.wait().map_err(|source| Error::CommandSpawn {
        program: program.clone(),
        source,
    })?;

    if let Some(handle) = stdout_handle {
        let _ = handle.join();
    }
    if let Some(handle) = stderr_handle {
        let _ = handle.join();
    }

    if status.success() {
        debug!("Child process finished successfully");
        Ok(())
    } else {
        Err(Error::CommandFailed {
            program: program.clone(),
            status,
        })
    }
}

fn forward_lines(reader: impl Read, is_stderr: bool) {
    for line in BufReader::new(reader).lines() {
        match line {
            Ok(line) if is_stderr => warn!(stream = "stderr", "{line}"),
            Ok(line) => info!(stream = "stdout", "{line}"),
            Err(_) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| (*s).to_string()).collect()
    }

    fn cwd() -> PathBuf {
        std::env::temp_dir()
    }

    #[test]
    fn test_empty_argv_is_error() {
        let err = run_streamed(&[], &cwd(), false).unwrap_err();
        assert!(err.to_string().contains("empty command"));
    }

    #[test]
    fn test_dry_run_spawns_nothing() {
        // The program does not exist; dry run must still succeed.
        let argv = args(&["definitely-not-a-real-binary", "--flag"]);
        assert!(run_streamed(&argv, &cwd(), true).is_ok());
    }

    #[test]
    fn test_successful_command() {
        let argv = args(&["sh", "-c", "echo hello"]);
        assert!(run_streamed(&argv, &cwd(), false).is_ok());
    }

    #[test]
    fn test_failing_command() {
        let argv = args(&["sh", "-c", "exit 3"]);
        let err = run_streamed(&argv, &cwd(), false).unwrap_err();
        assert!(err.is_command_failure());
        assert!(err.to_string().contains("sh"));
    }

    #[test]
    fn test_missing_program() {
        let argv = args(&["definitely-not-a-real-binary"]);
        let err = run_streamed(&argv, &cwd(), false).unwrap_err();
        assert!(matches!(err, Error::CommandSpawn { .. }));
    }

    #[test]
    fn test_runs_in_requested_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let argv = args(&["sh", "-c", "touch marker"]);
        run_streamed(&argv, dir.path(), false).unwrap();
        assert!(dir.path().join("marker").exists());
    }

    #[test]
    fn test_large_output_does_not_deadlock() {
        // Writes well past a pipe buffer on both streams.
        let argv = args(&[
            "sh",
            "-c",
            "i=0; while [ $i -lt 5000 ]; do echo line-$i; echo err-$i >&2; i=$((i+1)); done",
        ]);
        assert!(run_streamed(&argv, &cwd(), false).is_ok());
    }
}
