// SPDX-License-Identifier: GPL-3.0-only

//! Subvolume tree discovery.
//!
//! Expands a root subvolume path into the full list of its own path plus
//! every descendant subvolume path. The list is a pre-order walk of the
//! tree: a parent always precedes its descendants. Both engines lean on
//! that ordering; snapshot creation walks it forward, deletion walks it
//! backward.

use std::path::Path;

use crate::error::Result;
use crate::listing::SubvolumeLister;

/// Last component of a `/`-separated path string.
pub(crate) fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Build the pre-order subvolume list rooted at `root`.
///
/// `list[0]` is always `root` itself. Raw listing entries are not directly
/// usable as paths: they carry the filesystem's internal leading fragment
/// (an administrative mount name such as `root/`). Each entry is
/// re-anchored by locating the first occurrence of the basename of `root`
/// and gluing the remaining suffix onto `root`:
///
/// ```text
/// root       = /opt/VM
/// raw entry  = root/opt/VM/data/inner
///                        ^^ suffix starts here -> /data/inner
/// result     = /opt/VM/data/inner
/// ```
///
/// Entries that do not contain the basename at all are skipped. A listing
/// failure at any level aborts discovery; no partial tree is returned.
pub fn discover(root: &str, lister: &dyn SubvolumeLister) -> Result<Vec<String>> {
    let mut list = vec![root.to_string()];
    let root_name = basename(root).to_string();
    walk(root, root, &root_name, lister, &mut list)?;
    Ok(list)
}

fn walk(
    current: &str,
    root: &str,
    root_name: &str,
    lister: &dyn SubvolumeLister,
    list: &mut Vec<String>,
) -> Result<()> {
    for raw in lister.list_nested(Path::new(current))? {
        let Some(idx) = raw.find(root_name) else {
            tracing::debug!(entry = %raw, "listing entry does not contain the root name, skipped");
            continue;
        };

        let suffix = &raw[idx + root_name.len()..];
        let path = format!("{root}{suffix}");
        // Push before descending: parents precede their descendants, and a
        // child's own subtree is finished before the next sibling starts.
        list.push(path.clone());
        walk(&path, root, root_name, lister, list)?;
    }
    Ok(())
}
