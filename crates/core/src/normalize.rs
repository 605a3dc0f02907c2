// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path pattern normalization shared by the rule store and the learned-rule
//! deriver: expand a leading `~`, then clean the literal prefix of a
//! pattern up to its first glob metacharacter, leaving any wildcard suffix
//! untouched. Applied to file-tool (`read`/`write`/`edit`/`find`/`ls`)
//! patterns only — a `bash` pattern is a command line, not a path, and is
//! matched verbatim.

const GLOB_METACHARS: &[char] = &['*', '?', '[', '{'];

/// Expand a leading `~` or `~/...` to the resolved home directory. Anything
/// else is returned unchanged.
pub fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if rest.is_empty() || rest.starts_with('/') {
            if let Some(home) = dirs::home_dir() {
                return format!("{}{rest}", home.to_string_lossy());
            }
        }
    }
    path.to_string()
}

/// Normalize a file-path pattern: expand `~`, then clean the literal
/// prefix (up to the first glob metacharacter) the way `path.Clean` would,
/// preserving the glob suffix verbatim.
///
/// Idempotent: `normalize_path_pattern(normalize_path_pattern(p)) ==
/// normalize_path_pattern(p)`, since the home prefix is already resolved
/// and the literal prefix is already clean after the first pass.
pub fn normalize_path_pattern(pattern: &str) -> String {
    let expanded = expand_home(pattern);
    let split_at = expanded.find(GLOB_METACHARS).unwrap_or(expanded.len());
    let (literal, glob_suffix) = expanded.split_at(split_at);
    format!("{}{glob_suffix}", clean_path(literal))
}

/// A minimal `path.Clean`: collapses `.` segments, resolves `..` against
/// preceding segments, and squashes duplicate `/` separators. Pure string
/// manipulation — never touches the filesystem.
fn clean_path(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    let is_absolute = input.starts_with('/');
    let mut out: Vec<&str> = Vec::new();
    for segment in input.split('/') {
        match segment {
            "" | "." => continue,
            ".." => match out.last() {
                Some(last) if *last != ".." => {
                    out.pop();
                }
                _ if !is_absolute => out.push(".."),
                _ => {}
            },
            other => out.push(other),
        }
    }
    let joined = out.join("/");
    let mut result = if is_absolute { format!("/{joined}") } else { joined };
    if result.is_empty() {
        result = if is_absolute { "/".to_string() } else { ".".to_string() };
    }
    if input.ends_with('/') && !result.ends_with('/') {
        result.push('/');
    }
    result
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
