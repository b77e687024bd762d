// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Remote Path Helpers
//!
//! Slash-delimited path manipulation for remote store paths. Paths are
//! handled lexically; nothing here touches the remote store.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Normalization, parent and name derivation, session joins

/// Normalize a path to absolute form.
///
/// Repeated slashes and `.` segments are dropped; `..` removes the previous
/// segment and never climbs above `/`. The result always starts with `/`
/// and never ends with one (except for the root itself).
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    tracing::debug!(path = %path, "Path climbs above root, clamping");
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Parent of an absolute path: everything before the final `/`, or the
/// root when there is no `/` after position 0.
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) if pos > 0 => &path[..pos],
        _ => "/",
    }
}

/// Last segment of a path; the root is named `/`.
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) if path.len() == 1 => "/",
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Combine a session's current directory with a client supplied name.
///
/// Absolute names ignore the current directory entirely.
pub fn join(current_dir: &str, name: &str) -> String {
    if name.starts_with('/') {
        name.to_string()
    } else if current_dir.len() > 1 {
        format!("{current_dir}/{name}")
    } else {
        format!("/{name}")
    }
}
