//! Filename entity parsing.

/// The ordered `key-value` segments of a BIDS-style filename.
///
/// A name like `sub-01_task-rest_echo-2_desc-preproc_bold.nii.gz` splits on
/// `_` into segments; each `key-value` segment is an entity, the trailing
/// segments without a `-` (here `bold`) form the suffix, and everything
/// from the first `.` on is the extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entities {
    parts: Vec<String>,
    extension: String,
}

impl Entities {
    /// Parse a filename into its entity segments.
    #[must_use]
    pub fn parse(file_name: &str) -> Self {
        let (stem, extension) = match file_name.find('.') {
            Some(idx) => (&file_name[..idx], file_name[idx..].to_string()),
            None => (file_name, String::new()),
        };

        let parts = stem
            .split('_')
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();

        Self { parts, extension }
    }

    /// The filename extension, including the leading dot (`.nii.gz`).
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// The value of an entity key, if present.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.index_of(key)
            .map(|idx| &self.parts[idx][key.len() + 1..])
    }

    /// Whether the filename carries an entity key.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.index_of(key).is_some()
    }

    /// The grouping key for collecting echoes of one acquisition: the
    /// segments from `task-` up to (excluding) `echo-`, joined by `_`.
    ///
    /// `sub-01_task-rest_run-2_echo-1_bold` groups under `task-rest_run-2`,
    /// so different runs of the same task are denoised separately.
    #[must_use]
    pub fn task_key(&self) -> Option<String> {
        let task = self.index_of("task")?;
        let echo = self.index_of("echo")?;
        if task >= echo {
            return None;
        }
        Some(self.parts[task..echo].join("_"))
    }

    /// The output naming prefix: every segment before `echo-`.
    #[must_use]
    pub fn prefix(&self) -> Option<String> {
        let echo = self.index_of("echo")?;
        if echo == 0 {
            return None;
        }
        Some(self.parts[..echo].join("_"))
    }

    fn index_of(&self, key: &str) -> Option<usize> {
        self.parts
            .iter()
            .position(|p| p.len() > key.len() && p.starts_with(key) && p.as_bytes()[key.len()] == b'-')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: &str = "sub-01_ses-01_task-rest_run-2_echo-1_desc-preproc_bold.nii.gz";

    #[test]
    fn test_parse_extension() {
        let e = Entities::parse(NAME);
        assert_eq!(e.extension(), ".nii.gz");
    }

    #[test]
    fn test_parse_no_extension() {
        let e = Entities::parse("sub-01_bold");
        assert_eq!(e.extension(), "");
    }

    #[test]
    fn test_value() {
        let e = Entities::parse(NAME);
        assert_eq!(e.value("sub"), Some("01"));
        assert_eq!(e.value("task"), Some("rest"));
        assert_eq!(e.value("echo"), Some("1"));
        assert_eq!(e.value("desc"), Some("preproc"));
        assert_eq!(e.value("acq"), None);
    }

    #[test]
    fn test_has() {
        let e = Entities::parse(NAME);
        assert!(e.has("echo"));
        assert!(!e.has("space"));
    }

    #[test]
    fn test_key_must_match_whole_segment() {
        // "task-rest" must not be found under the key "ta".
        let e = Entities::parse(NAME);
        assert_eq!(e.value("ta"), None);
        // A bare suffix segment ("bold") is not an entity.
        assert_eq!(e.value("bold"), None);
    }

    #[test]
    fn test_task_key_spans_to_echo() {
        let e = Entities::parse(NAME);
        assert_eq!(e.task_key().as_deref(), Some("task-rest_run-2"));
    }

    #[test]
    fn test_task_key_without_run() {
        let e = Entities::parse("sub-01_task-nback_echo-3_bold.nii.gz");
        assert_eq!(e.task_key().as_deref(), Some("task-nback"));
    }

    #[test]
    fn test_task_key_missing_task() {
        let e = Entities::parse("sub-01_echo-1_bold.nii.gz");
        assert_eq!(e.task_key(), None);
    }

    #[test]
    fn test_task_key_missing_echo() {
        let e = Entities::parse("sub-01_task-rest_bold.nii.gz");
        assert_eq!(e.task_key(), None);
    }

    #[test]
    fn test_prefix() {
        let e = Entities::parse(NAME);
        assert_eq!(
            e.prefix().as_deref(),
            Some("sub-01_ses-01_task-rest_run-2")
        );
    }

    #[test]
    fn test_prefix_missing_echo() {
        let e = Entities::parse("sub-01_task-rest_bold.nii.gz");
        assert_eq!(e.prefix(), None);
    }

    #[test]
    fn test_prefix_echo_first_segment() {
        let e = Entities::parse("echo-1_bold.nii.gz");
        assert_eq!(e.prefix(), None);
    }

    #[test]
    fn test_value_with_dash_in_value() {
        let e = Entities::parse("sub-01_task-rest-eyesopen_echo-1_bold.nii.gz");
        assert_eq!(e.value("task"), Some("rest-eyesopen"));
        assert_eq!(e.task_key().as_deref(), Some("task-rest-eyesopen"));
    }
}
