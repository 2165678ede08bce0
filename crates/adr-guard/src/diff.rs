// diff.rs — Unified diff parsing.
//
// Accepts `git diff` output and plain `diff -u` output. For each file the
// parser collects added, removed, and context lines with their line numbers.
//
// Hunks are all-or-nothing. A hunk with a malformed header, a line with an
// unknown prefix, or fewer lines than its header promises is dropped whole
// and reported in `ParsedDiff::skipped`; parsing resumes at the next header.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static HUNK_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@(?:\s.*)?$").expect("static regex")
});

const DEV_NULL: &str = "/dev/null";

/// One line of a hunk. `line` is the new-file line number for added and
/// context lines and the old-file line number for removed lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffLine {
    pub line: usize,
    pub text: String,
}

/// All accepted changes to one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileDiff {
    /// Repository-relative path after the change (before it, for deletions).
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    pub added: Vec<DiffLine>,
    pub removed: Vec<DiffLine>,
    pub context: Vec<DiffLine>,
    pub is_new: bool,
    pub is_deleted: bool,
}

impl FileDiff {
    pub fn is_deletion_only(&self) -> bool {
        self.added.is_empty() && !self.removed.is_empty()
    }

    /// Lines that existed before the change.
    pub fn preexisting(&self) -> impl Iterator<Item = &DiffLine> {
        self.context.iter().chain(self.removed.iter())
    }
}

/// A hunk that was dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedHunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub header: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedDiff {
    pub files: Vec<FileDiff>,
    pub skipped: Vec<SkippedHunk>,
}

struct OpenHunk {
    header: String,
    old_line: usize,
    new_line: usize,
    old_remaining: usize,
    new_remaining: usize,
    added: Vec<DiffLine>,
    removed: Vec<DiffLine>,
    context: Vec<DiffLine>,
}

impl OpenHunk {
    fn is_complete(&self) -> bool {
        self.old_remaining == 0 && self.new_remaining == 0
    }
}

#[derive(Default)]
struct Parser {
    out: ParsedDiff,
    current: Option<FileDiff>,
    /// The current file already received its `---`/`+++` pair.
    paths_set: bool,
    pending_old: Option<String>,
    hunk: Option<OpenHunk>,
}

/// Parse unified diff text. Never fails; problems are reported as skipped hunks.
pub fn parse_unified_diff(text: &str) -> ParsedDiff {
    let lines: Vec<&str> = text.lines().collect();
    let mut p = Parser::default();
    for (i, raw) in lines.iter().enumerate() {
        p.line(raw, lines.get(i + 1).copied());
    }
    p.finish()
}

/// `---` followed by `+++` opens a file even in the middle of a hunk.
fn is_file_header(raw: &str, next: Option<&str>) -> bool {
    raw.starts_with("--- ") && next.is_some_and(|n| n.starts_with("+++ "))
}

impl Parser {
    fn line(&mut self, raw: &str, next: Option<&str>) {
        if let Some(hunk) = self.hunk.as_mut() {
            let result = if is_file_header(raw, next) || raw.starts_with("diff --git ") {
                Err(format!(
                    "truncated hunk: {} old and {} new lines missing",
                    hunk.old_remaining, hunk.new_remaining
                ))
            } else {
                body_line(hunk, raw)
            };
            match result {
                Ok(()) => {
                    if hunk.is_complete() {
                        self.commit_hunk();
                    }
                    return;
                }
                // The line itself may still be a header; handled below.
                Err(reason) => self.reject_hunk(reason),
            }
        }

        if let Some(rest) = raw.strip_prefix("diff --git ") {
            self.start_file(git_header_path(rest));
        } else if is_file_header(raw, next) {
            self.pending_old = raw.strip_prefix("--- ").map(|rest| clean_path(rest, "a/"));
        } else if let Some(rest) = raw.strip_prefix("+++ ") {
            if let Some(old_path) = self.pending_old.take() {
                self.set_file_paths(old_path, clean_path(rest, "b/"));
            }
        } else if raw.starts_with("@@") {
            self.open_hunk(raw);
        }
        // Anything else between hunks (index lines, mode lines, "\ No
        // newline" markers, commit headers) carries nothing to analyze.
    }

    fn start_file(&mut self, path: Option<String>) {
        self.flush_file();
        self.paths_set = false;
        self.current = Some(FileDiff {
            path: path.unwrap_or_default(),
            ..Default::default()
        });
    }

    fn set_file_paths(&mut self, old_path: String, new_path: String) {
        // A pair without a preceding `diff --git` starts a new file.
        if self.current.is_none() || self.paths_set {
            self.start_file(None);
        }
        self.paths_set = true;
        let Some(file) = self.current.as_mut() else {
            return;
        };

        file.is_new = old_path == DEV_NULL;
        file.is_deleted = new_path == DEV_NULL;
        if file.is_deleted {
            if !file.is_new {
                file.path = old_path;
            }
        } else {
            if !file.is_new && old_path != new_path {
                file.old_path = Some(old_path);
            }
            file.path = new_path;
        }
    }

    fn open_hunk(&mut self, header: &str) {
        let Some(caps) = HUNK_HEADER_RE.captures(header) else {
            self.record_skip(header, "malformed hunk header".to_string());
            return;
        };
        if self.current.as_ref().map_or(true, |f| f.path.is_empty()) {
            self.record_skip(header, "hunk without a file header".to_string());
            return;
        }
        let num = |i: usize, default: usize| {
            caps.get(i)
                .map_or(Some(default), |m| m.as_str().parse::<usize>().ok())
        };
        let (Some(old_line), Some(old_count), Some(new_line), Some(new_count)) =
            (num(1, 0), num(2, 1), num(3, 0), num(4, 1))
        else {
            self.record_skip(header, "hunk header numbers out of range".to_string());
            return;
        };

        let hunk = OpenHunk {
            header: header.to_string(),
            old_line,
            new_line,
            old_remaining: old_count,
            new_remaining: new_count,
            added: Vec::new(),
            removed: Vec::new(),
            context: Vec::new(),
        };
        if !hunk.is_complete() {
            self.hunk = Some(hunk);
        }
    }

    fn commit_hunk(&mut self) {
        let Some(hunk) = self.hunk.take() else {
            return;
        };
        if let Some(file) = self.current.as_mut() {
            file.added.extend(hunk.added);
            file.removed.extend(hunk.removed);
            file.context.extend(hunk.context);
        }
    }

    fn reject_hunk(&mut self, reason: String) {
        if let Some(hunk) = self.hunk.take() {
            self.record_skip(&hunk.header, reason);
        }
    }

    fn record_skip(&mut self, header: &str, reason: String) {
        let file = self
            .current
            .as_ref()
            .map(|f| f.path.clone())
            .filter(|p| !p.is_empty());
        tracing::debug!(file = ?file, header = %header, reason = %reason, "skipping hunk");
        self.out.skipped.push(SkippedHunk {
            file,
            header: header.to_string(),
            reason,
        });
    }

    fn flush_file(&mut self) {
        if let Some(file) = self.current.take() {
            if !file.path.is_empty() {
                self.out.files.push(file);
            }
        }
    }

    fn finish(mut self) -> ParsedDiff {
        if let Some(hunk) = &self.hunk {
            let reason = format!(
                "truncated hunk: {} old and {} new lines missing",
                hunk.old_remaining, hunk.new_remaining
            );
            self.reject_hunk(reason);
        }
        self.flush_file();
        self.out
    }
}

/// Consume one line inside an open hunk.
fn body_line(hunk: &mut OpenHunk, raw: &str) -> Result<(), String> {
    let (prefix, text) = match raw.chars().next() {
        Some(c) => (c, &raw[c.len_utf8()..]),
        // Some tools strip the single space of an empty context line.
        None => (' ', ""),
    };
    match prefix {
        ' ' if hunk.old_remaining > 0 && hunk.new_remaining > 0 => {
            hunk.context.push(DiffLine {
                line: hunk.new_line,
                text: text.to_string(),
            });
            hunk.old_line += 1;
            hunk.new_line += 1;
            hunk.old_remaining -= 1;
            hunk.new_remaining -= 1;
            Ok(())
        }
        '-' if hunk.old_remaining > 0 => {
            hunk.removed.push(DiffLine {
                line: hunk.old_line,
                text: text.to_string(),
            });
            hunk.old_line += 1;
            hunk.old_remaining -= 1;
            Ok(())
        }
        '+' if hunk.new_remaining > 0 => {
            hunk.added.push(DiffLine {
                line: hunk.new_line,
                text: text.to_string(),
            });
            hunk.new_line += 1;
            hunk.new_remaining -= 1;
            Ok(())
        }
        '\\' => Ok(()),
        ' ' | '-' | '+' => Err(format!(
            "hunk line does not fit its header counts: {:?}",
            truncate(raw)
        )),
        _ => Err(format!(
            "malformed hunk line {:?} ({} old and {} new lines missing)",
            truncate(raw),
            hunk.old_remaining,
            hunk.new_remaining
        )),
    }
}

/// `a/src/x.py b/src/x.py` → `src/x.py` (the `b/` side).
fn git_header_path(rest: &str) -> Option<String> {
    let (_, b) = rest.rsplit_once(" b/")?;
    Some(b.trim().to_string())
}

/// Strip a timestamp suffix and the `a/`/`b/` prefix from a `---`/`+++` path.
fn clean_path(rest: &str, prefix: &str) -> String {
    let path = rest.split('\t').next().unwrap_or(rest).trim();
    if path == DEV_NULL {
        return path.to_string();
    }
    path.strip_prefix(prefix).unwrap_or(path).to_string()
}

fn truncate(line: &str) -> String {
    line.chars().take(60).collect()
}
