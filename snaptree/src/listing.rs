// SPDX-License-Identifier: GPL-3.0-only

//! Enumeration of the subvolumes nested under a path.
//!
//! Discovery consumes this through the [`SubvolumeLister`] capability so the
//! production `btrfs(8)` invocation can be swapped for a scripted listing in
//! tests.

use std::path::Path;
use std::process::Command;

use crate::error::{Result, SnapError};

/// Source of raw subvolume listing entries.
pub trait SubvolumeLister {
    /// Return the raw path fragments of the subvolumes directly nested
    /// under `path`, one entry per subvolume.
    ///
    /// Entries are expressed relative to the filesystem's internal root and
    /// carry its leading naming fragment; discovery strips that fragment
    /// when reconstructing mount-relative paths.
    fn list_nested(&self, path: &Path) -> Result<Vec<String>>;
}

/// Production lister invoking `btrfs subvolume list -o`.
pub struct BtrfsCliLister;

impl BtrfsCliLister {
    /// Fails when the `btrfs` tool cannot be found, before any tree walk
    /// has started.
    pub fn new() -> Result<Self> {
        which::which("btrfs")
            .map_err(|_| SnapError::Listing("btrfs binary not found in PATH".into()))?;
        Ok(Self)
    }
}

impl SubvolumeLister for BtrfsCliLister {
    fn list_nested(&self, path: &Path) -> Result<Vec<String>> {
        let output = Command::new("btrfs")
            .args(["subvolume", "list", "-o"])
            .arg(path)
            .output()
            .map_err(|e| SnapError::Listing(format!("failed to run btrfs subvolume list: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SnapError::Listing(format!(
                "btrfs subvolume list -o {} failed: {}",
                path.display(),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let entries = parse_list_output(&stdout);
        if entries.is_empty() && !stdout.trim().is_empty() {
            return Err(SnapError::Listing(format!(
                "unrecognized btrfs subvolume list output for {}",
                path.display()
            )));
        }

        tracing::debug!(path = %path.display(), entries = entries.len(), "listed nested subvolumes");
        Ok(entries)
    }
}

/// Extract the path fragment of every `btrfs subvolume list` line.
///
/// Lines look like `ID 257 gen 10 top level 5 path root/opt/VM/data`; the
/// fragment is everything after the `path` keyword. Subvolume names may
/// contain spaces, so the remaining fields are rejoined.
fn parse_list_output(stdout: &str) -> Vec<String> {
    let mut entries = Vec::new();

    for line in stdout.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.first() != Some(&"ID") {
            continue;
        }

        let Some(idx) = parts.iter().position(|&p| p == "path") else {
            continue;
        };
        if idx + 1 >= parts.len() {
            continue;
        }

        entries.push(parts[idx + 1..].join(" "));
    }

    entries
}
