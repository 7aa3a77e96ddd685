//! Regeneration of the `[EnvironmentVariables]` section
//!
//! [`upsert`] rewrites only the managed section: assigned keys are re-emitted
//! in a fixed order, keys that left the managed set are deleted, anything else
//! in the section is kept once. Text before and after the section is copied
//! through unchanged, then runs of blank lines are collapsed file-wide.

use crate::env_section::{
    find_managed_section, format_assignment, KeyValueLine, DEFAULT_KEYS, ENV_SECTION_BANNER,
    ENV_SECTION_MARKER,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// A body line that survives the merge
#[derive(Debug)]
enum Preserved {
    /// Key/value line not owned by the engine
    Entry { line: String, commented: bool },

    /// Anything else that is not blank
    Opaque(String),
}

impl Preserved {
    fn into_line(self) -> String {
        match self {
            Preserved::Entry { line, .. } | Preserved::Opaque(line) => line,
        }
    }
}

/// Merge `assignments` into the managed section of `text`.
///
/// `managed_before` lists keys the caller owned at load time; such keys are
/// deleted when missing from `assignments` unless they are in `skip_keys`.
/// The result is identical for identical inputs.
pub fn upsert(
    text: &str,
    assignments: &BTreeMap<String, String>,
    managed_before: &BTreeSet<String>,
    skip_keys: &BTreeSet<String>,
) -> String {
    let text = ensure_section(text);
    let Some(range) = find_managed_section(&text) else {
        // ensure_section always leaves a marker behind
        return collapse_newlines(&text);
    };

    let prefix = &text[..range.start];
    let section = &text[range.clone()];
    let suffix = &text[range.end..];

    // Indentation is kept on lines written back as-is: trimming a line like
    // `  [Foo]` would turn it into a section boundary.
    let lines: Vec<&str> = section.split('\n').map(str::trim_end).collect();
    let header_index = lines
        .iter()
        .position(|line| line.contains(ENV_SECTION_MARKER))
        .unwrap_or(0);

    let header = lines[..=header_index]
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string);

    let mut preserved: Vec<Preserved> = Vec::new();
    let mut kept_index: HashMap<String, usize> = HashMap::new();
    let mut dropped = 0usize;

    for line in &lines[header_index + 1..] {
        if line.trim_start().is_empty() {
            continue;
        }

        let Some(kv) = KeyValueLine::parse(line) else {
            preserved.push(Preserved::Opaque(line.to_string()));
            continue;
        };

        if assignments.contains_key(&kv.key) {
            dropped += 1;
            continue;
        }

        if managed_before.contains(&kv.key) && !skip_keys.contains(&kv.key) {
            debug!("Removing unmanaged variable {}", kv.key);
            dropped += 1;
            continue;
        }

        match kept_index.get(&kv.key) {
            Some(&index) => {
                // An active line beats an earlier commented one, in place.
                if let Preserved::Entry { commented: true, .. } = preserved[index] {
                    if !kv.commented {
                        preserved[index] = Preserved::Entry {
                            line: kv.to_line(),
                            commented: false,
                        };
                    }
                }
            }
            None => {
                let line = if kv.commented {
                    line.to_string()
                } else {
                    kv.to_line()
                };
                kept_index.insert(kv.key, preserved.len());
                preserved.push(Preserved::Entry {
                    line,
                    commented: kv.commented,
                });
            }
        }
    }

    debug!(
        "Merging {} assignments, preserving {} lines, dropping {}",
        assignments.len(),
        preserved.len(),
        dropped
    );

    let mut new_lines: Vec<String> = header.collect();
    new_lines.extend(preserved.into_iter().map(Preserved::into_line));
    new_lines.extend(
        ordered_keys(assignments)
            .into_iter()
            .map(|key| format_assignment(key, &assignments[key])),
    );

    let mut new_section = new_lines.join("\n");
    if !new_section.ends_with('\n') {
        new_section.push('\n');
    }

    collapse_newlines(&format!("{prefix}{new_section}{suffix}"))
}

/// Append the banner and an empty section when the marker is missing
fn ensure_section(text: &str) -> String {
    if find_managed_section(text).is_some() {
        text.to_string()
    } else if text.trim().is_empty() {
        format!("{ENV_SECTION_BANNER}\n")
    } else {
        format!("{text}\n\n{ENV_SECTION_BANNER}\n")
    }
}

/// Default keys first in their fixed order, then the rest ascending
fn ordered_keys(assignments: &BTreeMap<String, String>) -> Vec<&str> {
    let mut keys: Vec<&str> = DEFAULT_KEYS
        .iter()
        .copied()
        .filter(|key| assignments.contains_key(*key))
        .collect();
    keys.extend(
        assignments
            .keys()
            .map(String::as_str)
            .filter(|key| !DEFAULT_KEYS.contains(key)),
    );
    keys
}

/// Replace every run of two or more `\n` with a single one
fn collapse_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_newline = false;
    for ch in text.chars() {
        if ch == '\n' {
            if previous_newline {
                continue;
            }
            previous_newline = true;
        } else {
            previous_newline = false;
        }
        out.push(ch);
    }
    out
}
