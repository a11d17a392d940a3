//! Marker-bounded, idempotent text patching with backup/rollback.
//!
//! Every installer and adapter that needs to modify a third-party source
//! file goes through [`patch`]: it locates a region between two line
//! markers, checks whether the patch content is already present (making
//! reinstall-without-force a safe no-op), and only then mutates the file,
//! guarded by a one-time pristine backup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::WeftError;

/// Sibling file holding the pristine original of a patched target.
/// Created at most once; repeated runs never overwrite it.
pub const BACKUP_SUFFIX: &str = ".WEACEBackup";

/// How the located region is mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchMode {
    /// Insert the content immediately before the end bound, keeping
    /// everything else.
    #[default]
    Insert,
    /// Delete everything strictly between the bounds and substitute the
    /// content.
    Replace,
}

/// How the idempotence check sequence must appear in the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// The check sequence appears as a contiguous run of lines.
    #[default]
    Contiguous,
    /// The check sequence's elements appear in order, possibly with other
    /// lines interspersed. Used when prior insertions changed surrounding
    /// content.
    Interleaved,
}

/// One element of an idempotence check sequence.
#[derive(Debug, Clone)]
pub enum CheckItem {
    Literal(String),
    Pattern(Regex),
}

impl CheckItem {
    pub fn literal(line: impl Into<String>) -> Self {
        CheckItem::Literal(trim_newline(line.into()))
    }

    pub fn pattern(pattern: Regex) -> Self {
        CheckItem::Pattern(pattern)
    }

    fn matches(&self, line: &str) -> bool {
        match self {
            CheckItem::Literal(expected) => expected == line,
            CheckItem::Pattern(pattern) => pattern.is_match(line),
        }
    }
}

/// Idempotence check: a sequence of literal lines and/or patterns that,
/// when found in the region, makes the patch a successful no-op.
#[derive(Debug, Clone, Default)]
pub struct CheckSpec {
    pub items: Vec<CheckItem>,
    pub mode: MatchMode,
}

impl CheckSpec {
    pub fn contiguous(items: Vec<CheckItem>) -> Self {
        Self {
            items,
            mode: MatchMode::Contiguous,
        }
    }

    pub fn interleaved(items: Vec<CheckItem>) -> Self {
        Self {
            items,
            mode: MatchMode::Interleaved,
        }
    }

    /// True when the check sequence is found in the region. An empty
    /// sequence never matches: there is nothing to verify, so the patch
    /// always applies.
    fn found_in(&self, region: &[String]) -> bool {
        if self.items.is_empty() {
            return false;
        }
        match self.mode {
            MatchMode::Contiguous => region
                .windows(self.items.len())
                .any(|window| {
                    window
                        .iter()
                        .zip(&self.items)
                        .all(|(line, item)| item.matches(line))
                }),
            MatchMode::Interleaved => {
                let mut next = 0;
                for line in region {
                    if next == self.items.len() {
                        break;
                    }
                    if self.items[next].matches(line) {
                        next += 1;
                    }
                }
                next == self.items.len()
            }
        }
    }
}

/// Options for one [`patch`] call.
#[derive(Debug, Clone, Default)]
pub struct PatchOptions {
    /// Line pattern opening the patchable region; `None` means start of file.
    pub begin_marker: Option<Regex>,
    /// Line pattern closing the patchable region; `None` means end of file.
    pub end_marker: Option<Regex>,
    /// Lines to insert, without trailing newlines (normalized on build).
    pub content: Vec<String>,
    pub mode: PatchMode,
    /// Explicit idempotence check; when absent, the literal content lines
    /// are the check sequence (contiguous).
    pub check: Option<CheckSpec>,
    /// Skip the pristine-backup guard.
    pub no_backup: bool,
}

impl PatchOptions {
    /// Insert `content` immediately before the end bound.
    pub fn insert<I, S>(content: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            content: normalize_content(content),
            mode: PatchMode::Insert,
            ..Self::default()
        }
    }

    /// Replace everything strictly between the bounds with `content`.
    pub fn replace<I, S>(content: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            content: normalize_content(content),
            mode: PatchMode::Replace,
            ..Self::default()
        }
    }

    pub fn between(mut self, begin: Option<Regex>, end: Option<Regex>) -> Self {
        self.begin_marker = begin;
        self.end_marker = end;
        self
    }

    pub fn with_check(mut self, check: CheckSpec) -> Self {
        self.check = Some(check);
        self
    }

    pub fn without_backup(mut self) -> Self {
        self.no_backup = true;
        self
    }

    fn check_spec(&self) -> CheckSpec {
        self.check.clone().unwrap_or_else(|| {
            CheckSpec::contiguous(
                self.content
                    .iter()
                    .map(|line| CheckItem::Literal(line.clone()))
                    .collect(),
            )
        })
    }
}

/// Result of a successful [`patch`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The file was mutated.
    Applied,
    /// The idempotence check matched; the file was left untouched.
    AlreadyApplied,
}

/// Apply a marker-bounded patch to `path`.
///
/// Fails without touching the file when either bound is unmatched. On a
/// write failure the target is restored from its backup and the call
/// returns [`WeftError::WriteFailed`] wrapping the original cause.
pub fn patch(path: &Path, options: &PatchOptions) -> Result<PatchOutcome, WeftError> {
    apply_with_writer(path, options, &mut |p, text| fs::write(p, text))
}

/// Path of the pristine backup sibling for a patch target.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(BACKUP_SUFFIX);
    PathBuf::from(os)
}

fn apply_with_writer(
    path: &Path,
    options: &PatchOptions,
    write: &mut dyn FnMut(&Path, &str) -> io::Result<()>,
) -> Result<PatchOutcome, WeftError> {
    if !path.is_file() {
        return Err(WeftError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    // Unreadable targets (permissions, non-text content) are treated the
    // same as absent ones: nothing to patch.
    let original = fs::read_to_string(path).map_err(|_| WeftError::MissingFile {
        path: path.to_path_buf(),
    })?;
    let lines: Vec<String> = original.lines().map(str::to_string).collect();

    let (region_start, region_end) = locate_bounds(
        &lines,
        options.begin_marker.as_ref(),
        options.end_marker.as_ref(),
    )
    .map_err(|marker| WeftError::MarkerNotFound {
        path: path.to_path_buf(),
        marker,
    })?;

    // Idempotence: only the region strictly between the bounds is inspected.
    let region = &lines[region_start..region_end];
    if options.check_spec().found_in(region) {
        return Ok(PatchOutcome::AlreadyApplied);
    }

    let mut next_lines: Vec<String> = Vec::with_capacity(lines.len() + options.content.len());
    match options.mode {
        PatchMode::Insert => {
            next_lines.extend_from_slice(&lines[..region_end]);
            next_lines.extend(options.content.iter().cloned());
            next_lines.extend_from_slice(&lines[region_end..]);
        }
        PatchMode::Replace => {
            next_lines.extend_from_slice(&lines[..region_start]);
            next_lines.extend(options.content.iter().cloned());
            next_lines.extend_from_slice(&lines[region_end..]);
        }
    }

    let mut text = next_lines.join("\n");
    text.push('\n');

    let backup = backup_path(path);
    if !options.no_backup && !backup.exists() {
        fs::copy(path, &backup).map_err(|e| WeftError::WriteFailed {
            path: path.to_path_buf(),
            cause: anyhow::Error::from(e).context("failed to create backup before patching"),
        })?;
    }

    if let Err(e) = write(path, &text) {
        if !options.no_backup && backup.exists() {
            if let Err(restore_err) = fs::copy(&backup, path) {
                tracing::warn!(
                    path = %path.display(),
                    error = %restore_err,
                    "failed to restore patch target from backup"
                );
            }
        }
        return Err(WeftError::WriteFailed {
            path: path.to_path_buf(),
            cause: e.into(),
        });
    }

    Ok(PatchOutcome::Applied)
}

/// Two-pointer scan for the patchable region.
///
/// Returns half-open `(start, end)` line indices of the region strictly
/// between the bounds: a matched begin marker places `start` just after its
/// line, a matched end marker places `end` on its line. `Err` carries the
/// unmatched marker's pattern.
fn locate_bounds(
    lines: &[String],
    begin: Option<&Regex>,
    end: Option<&Regex>,
) -> Result<(usize, usize), String> {
    let region_start = match begin {
        None => 0,
        Some(marker) => {
            let idx = lines
                .iter()
                .position(|line| marker.is_match(line))
                .ok_or_else(|| marker.as_str().to_string())?;
            idx + 1
        }
    };
    let region_end = match end {
        None => lines.len(),
        Some(marker) => lines[region_start..]
            .iter()
            .position(|line| marker.is_match(line))
            .map(|offset| region_start + offset)
            .ok_or_else(|| marker.as_str().to_string())?,
    };
    Ok((region_start, region_end))
}

fn normalize_content<I, S>(content: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut lines = Vec::new();
    for item in content {
        let item = item.into();
        for line in item.split('\n') {
            lines.push(line.trim_end_matches('\r').to_string());
        }
        // A trailing newline on an item is a line terminator, not an
        // extra empty line.
        if item.ends_with('\n') {
            lines.pop();
        }
    }
    lines
}

fn trim_newline(mut line: String) -> String {
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn marker(pattern: &str) -> Option<Regex> {
        Some(Regex::new(pattern).unwrap())
    }

    #[test]
    fn test_insert_between_markers() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "F.txt", "a\nBEGIN\nb\nEND\nc\n");

        let options = PatchOptions::insert(["X"]).between(marker("^BEGIN$"), marker("^END$"));
        let outcome = patch(&path, &options).unwrap();

        assert_eq!(outcome, PatchOutcome::Applied);
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nBEGIN\nb\nX\nEND\nc\n");
    }

    #[test]
    fn test_second_call_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "F.txt", "a\nBEGIN\nb\nEND\nc\n");
        let options = PatchOptions::insert(["X"]).between(marker("^BEGIN$"), marker("^END$"));

        patch(&path, &options).unwrap();
        let after_first = fs::read_to_string(&path).unwrap();

        let outcome = patch(&path, &options).unwrap();
        assert_eq!(outcome, PatchOutcome::AlreadyApplied);
        assert_eq!(fs::read_to_string(&path).unwrap(), after_first);
    }

    #[test]
    fn test_explicit_check_match_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "F.txt", "a\nBEGIN\nb\nX\nEND\nc\n");

        let options = PatchOptions::insert(["X"])
            .between(marker("^BEGIN$"), marker("^END$"))
            .with_check(CheckSpec::contiguous(vec![CheckItem::literal("X\n")]));

        let outcome = patch(&path, &options).unwrap();
        assert_eq!(outcome, PatchOutcome::AlreadyApplied);
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nBEGIN\nb\nX\nEND\nc\n");
    }

    #[test]
    fn test_interleaved_check_tolerates_interspersed_lines() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "F.txt", "BEGIN\none\nnoise\ntwo\nmore\nEND\n");

        let options = PatchOptions::insert(["one", "two"])
            .between(marker("^BEGIN$"), marker("^END$"))
            .with_check(CheckSpec::interleaved(vec![
                CheckItem::literal("one"),
                CheckItem::literal("two"),
            ]));

        assert_eq!(patch(&path, &options).unwrap(), PatchOutcome::AlreadyApplied);

        // Out of order must not match.
        let path2 = write_file(&dir, "G.txt", "BEGIN\ntwo\nnoise\none\nEND\n");
        assert_eq!(patch(&path2, &options).unwrap(), PatchOutcome::Applied);
    }

    #[test]
    fn test_interleaved_check_is_bounded_by_the_region() {
        let dir = TempDir::new().unwrap();
        // "one" and "two" exist in the file but outside the markers.
        let path = write_file(&dir, "F.txt", "one\nBEGIN\nmid\nEND\ntwo\n");

        let options = PatchOptions::insert(["one", "two"])
            .between(marker("^BEGIN$"), marker("^END$"))
            .with_check(CheckSpec::interleaved(vec![
                CheckItem::literal("one"),
                CheckItem::literal("two"),
            ]));

        assert_eq!(patch(&path, &options).unwrap(), PatchOutcome::Applied);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "one\nBEGIN\nmid\none\ntwo\nEND\ntwo\n"
        );
    }

    #[test]
    fn test_pattern_check_items() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "F.txt", "BEGIN\nrequire 'hook-1.2'\nEND\n");

        let options = PatchOptions::insert(["require 'hook-1.3'"])
            .between(marker("^BEGIN$"), marker("^END$"))
            .with_check(CheckSpec::contiguous(vec![CheckItem::pattern(
                Regex::new(r"^require 'hook-\d+\.\d+'$").unwrap(),
            )]));

        // Any prior hook version counts as already applied.
        assert_eq!(patch(&path, &options).unwrap(), PatchOutcome::AlreadyApplied);
    }

    #[test]
    fn test_replace_mode_substitutes_region() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "F.txt", "a\nBEGIN\nold1\nold2\nEND\nc\n");

        let options = PatchOptions::replace(["new"]).between(marker("^BEGIN$"), marker("^END$"));
        assert_eq!(patch(&path, &options).unwrap(), PatchOutcome::Applied);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "a\nBEGIN\nnew\nEND\nc\n"
        );
    }

    #[test]
    fn test_nil_bounds_cover_whole_file() {
        let dir = TempDir::new().unwrap();

        // No end marker: insert at end of file.
        let path = write_file(&dir, "F.txt", "a\nb\n");
        let options = PatchOptions::insert(["tail"]);
        patch(&path, &options).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\ntail\n");

        // End marker only: insert before it, from start of file.
        let path2 = write_file(&dir, "G.txt", "a\nEND\nb\n");
        let options2 = PatchOptions::insert(["head"]).between(None, marker("^END$"));
        patch(&path2, &options2).unwrap();
        assert_eq!(fs::read_to_string(&path2).unwrap(), "a\nhead\nEND\nb\n");
    }

    #[test]
    fn test_unmatched_marker_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "F.txt", "a\nb\n");
        let options = PatchOptions::insert(["X"]).between(marker("^BEGIN$"), marker("^END$"));

        let err = patch(&path, &options).unwrap_err();
        assert!(matches!(err, WeftError::MarkerNotFound { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_end_marker_before_begin_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "F.txt", "END\nBEGIN\n");
        let options = PatchOptions::insert(["X"]).between(marker("^BEGIN$"), marker("^END$"));
        assert!(matches!(
            patch(&path, &options).unwrap_err(),
            WeftError::MarkerNotFound { .. }
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let options = PatchOptions::insert(["X"]);
        let err = patch(&dir.path().join("absent.txt"), &options).unwrap_err();
        assert!(matches!(err, WeftError::MissingFile { .. }));
    }

    #[test]
    fn test_unreadable_target_is_missing_file_not_write_failed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("F.bin");
        fs::write(&path, [0x80u8, 0xFF, 0x00]).unwrap();

        let options = PatchOptions::insert(["X"]);
        let err = patch(&path, &options).unwrap_err();
        assert!(matches!(err, WeftError::MissingFile { .. }));
        // Nothing was written or backed up.
        assert_eq!(fs::read(&path).unwrap(), [0x80u8, 0xFF, 0x00]);
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_backup_holds_pristine_original_across_runs() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "F.txt", "BEGIN\nEND\n");

        let first = PatchOptions::insert(["one"]).between(marker("^BEGIN$"), marker("^END$"));
        patch(&path, &first).unwrap();

        let second = PatchOptions::insert(["two"]).between(marker("^BEGIN$"), marker("^END$"));
        patch(&path, &second).unwrap();

        // The backup is the true original, not the state after run one.
        assert_eq!(
            fs::read_to_string(backup_path(&path)).unwrap(),
            "BEGIN\nEND\n"
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "BEGIN\none\ntwo\nEND\n");
    }

    #[test]
    fn test_rollback_restores_content_on_write_failure() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "F.txt", "BEGIN\nEND\n");
        let options = PatchOptions::insert(["X"]).between(marker("^BEGIN$"), marker("^END$"));

        // A writer that corrupts the target and then reports failure.
        let err = apply_with_writer(&path, &options, &mut |p, _| {
            fs::write(p, "CORRUPTED").unwrap();
            Err(io::Error::other("disk full"))
        })
        .unwrap_err();

        assert!(matches!(err, WeftError::WriteFailed { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "BEGIN\nEND\n");
    }

    #[test]
    fn test_no_backup_skips_guard() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "F.txt", "BEGIN\nEND\n");
        let options = PatchOptions::insert(["X"])
            .between(marker("^BEGIN$"), marker("^END$"))
            .without_backup();

        patch(&path, &options).unwrap();
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_multiline_content_items_are_normalized() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "F.txt", "BEGIN\nEND\n");
        let options =
            PatchOptions::insert(["x\ny\n"]).between(marker("^BEGIN$"), marker("^END$"));

        patch(&path, &options).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "BEGIN\nx\ny\nEND\n");
    }
}
