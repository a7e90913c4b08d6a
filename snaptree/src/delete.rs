// SPDX-License-Identifier: GPL-3.0-only

//! Deletion engine.

use crate::error::Result;
use crate::mapping::split_parent_name;
use crate::ops::SubvolumeOps;

/// Per-subvolume confirmation for deleting read-only subvolumes.
///
/// The rendering lives with the caller; a scripted implementation stands
/// in for the operator in tests.
pub trait ConfirmPrompt {
    /// Ask whether the read-only subvolume at `path` may be deleted.
    fn confirm_delete(&mut self, path: &str) -> Result<bool>;
}

/// Outcome of a delete run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Completed,
    /// The operator declined a confirmation; nothing was destroyed.
    Declined,
}

/// Delete the subvolume tree in `list`, deepest subvolume first.
///
/// Phase 1 queries every entry's read-only flag; read-only subvolumes are
/// included unconditionally under `force` and otherwise confirmed one by
/// one through `prompt`; a single declined answer aborts the whole
/// operation before anything is touched. Phase 2 clears the flags of the
/// confirmed set; a read-only subvolume cannot be destroyed. Phase 3 walks
/// `list` in reverse, so every subvolume is empty of nested subvolumes by
/// the time it is destroyed, reporting each deletion as it happens.
///
/// Any failure aborts immediately; flags already cleared and subvolumes
/// already destroyed stay that way.
pub fn delete_subvolumes<O: SubvolumeOps + ?Sized>(
    ops: &O,
    list: &[String],
    force: bool,
    prompt: &mut dyn ConfirmPrompt,
    report: &mut dyn FnMut(&str),
) -> Result<DeleteOutcome> {
    let mut readonly = Vec::new();
    for path in list {
        if ops.get_readonly(path)? {
            if force || prompt.confirm_delete(path)? {
                readonly.push(path.as_str());
            } else {
                tracing::debug!(path, "deletion declined by the operator");
                return Ok(DeleteOutcome::Declined);
            }
        }
    }

    for path in &readonly {
        ops.set_readonly(path, false)?;
    }

    for path in list.iter().rev() {
        let (parent, name) = split_parent_name(path);
        let parent = if parent.is_empty() { "." } else { parent };
        ops.destroy(parent, name)?;
        report(path);
    }

    Ok(DeleteOutcome::Completed)
}
