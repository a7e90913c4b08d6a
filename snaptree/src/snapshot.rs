// SPDX-License-Identifier: GPL-3.0-only

//! Snapshot engine.

use crate::error::Result;
use crate::mapping::{map_path, split_parent_name};
use crate::ops::SubvolumeOps;

/// Mirror the subvolume tree in `list` under `dest_root`.
///
/// `list` must be a pre-order subvolume list rooted at `list[0]`; the
/// forward walk guarantees every destination parent exists before its
/// children are snapshotted into it. Each created mapping is handed to
/// `report` before the next entry is processed.
///
/// With `preserve_flags`, a second pass re-applies the read-only flag to
/// every destination whose source carries it. The two passes are a hard
/// ordering contract: a read-only destination rejects snapshot creation
/// inside it, so no flag is set until the whole tree exists.
///
/// Any failure aborts immediately; snapshots already created stay behind.
pub fn create_snapshots<O: SubvolumeOps + ?Sized>(
    ops: &O,
    list: &[String],
    dest_root: &str,
    preserve_flags: bool,
    report: &mut dyn FnMut(&str, &str),
) -> Result<()> {
    let Some(root) = list.first() else {
        return Ok(());
    };

    for (i, path) in list.iter().enumerate() {
        let dest = map_path(path, root, dest_root);

        // Snapshotting a parent materializes an empty plain directory in
        // place of each nested subvolume; it must give way to the real
        // snapshot.
        if i != 0 {
            ops.remove_placeholder(&dest)?;
        }

        let (parent, name) = split_parent_name(&dest);
        let parent = if parent.is_empty() { "." } else { parent };
        ops.snapshot(path, parent, name)?;
        report(path, &dest);
    }

    if preserve_flags {
        for path in list {
            if ops.get_readonly(path)? {
                ops.set_readonly(&map_path(path, root, dest_root), true)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SnapError;
    use crate::ops::testing::{Call, MockOps};

    fn list(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    fn collect_reports(
        ops: &MockOps,
        list: &[String],
        dest: &str,
        preserve: bool,
    ) -> Result<Vec<String>> {
        let mut reports = Vec::new();
        create_snapshots(ops, list, dest, preserve, &mut |src, dst| {
            reports.push(format!("{src} -> {dst}"))
        })?;
        Ok(reports)
    }

    #[test]
    fn reports_mappings_in_creation_order() {
        let mock = MockOps::default();
        let list = list(&["/data/vm", "/data/vm/logs"]);

        let reports = collect_reports(&mock, &list, "/backup/vm", false).unwrap();

        assert_eq!(
            reports,
            vec!["/data/vm -> /backup/vm", "/data/vm/logs -> /backup/vm/logs"]
        );
    }

    #[test]
    fn snapshots_parents_before_children() {
        let mock = MockOps::default();
        let list = list(&["/data/vm", "/data/vm/logs", "/data/vm/logs/archive"]);

        collect_reports(&mock, &list, "/backup/vm", false).unwrap();

        let snapshots: Vec<Call> = mock
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Snapshot { .. }))
            .collect();
        assert_eq!(
            snapshots,
            vec![
                Call::Snapshot {
                    source: "/data/vm".into(),
                    dest_parent: "/backup/".into(),
                    name: "vm".into(),
                },
                Call::Snapshot {
                    source: "/data/vm/logs".into(),
                    dest_parent: "/backup/vm/".into(),
                    name: "logs".into(),
                },
                Call::Snapshot {
                    source: "/data/vm/logs/archive".into(),
                    dest_parent: "/backup/vm/logs/".into(),
                    name: "archive".into(),
                },
            ]
        );
    }

    #[test]
    fn removes_placeholders_for_every_entry_but_the_root() {
        let mock = MockOps::default();
        let list = list(&["/data/vm", "/data/vm/logs"]);

        collect_reports(&mock, &list, "/backup/vm", false).unwrap();

        let calls = mock.calls();
        assert!(!calls.contains(&Call::RemovePlaceholder("/backup/vm".into())));
        // The placeholder goes right before the snapshot that replaces it.
        let rm = calls
            .iter()
            .position(|c| *c == Call::RemovePlaceholder("/backup/vm/logs".into()))
            .unwrap();
        assert!(matches!(calls[rm + 1], Call::Snapshot { .. }));
    }

    #[test]
    fn relative_destination_root_uses_the_current_directory() {
        let mock = MockOps::default();
        let list = list(&["/data/vm"]);

        let reports = collect_reports(&mock, &list, "vm", false).unwrap();

        assert_eq!(reports, vec!["/data/vm -> vm"]);
        assert_eq!(
            mock.calls(),
            vec![Call::Snapshot {
                source: "/data/vm".into(),
                dest_parent: ".".into(),
                name: "vm".into(),
            }]
        );
    }

    #[test]
    fn preserve_flags_sets_destinations_only_after_all_children_exist() {
        let mock = MockOps::with_readonly(&["/data/vm", "/data/vm/logs"]);
        let list = list(&["/data/vm", "/data/vm/logs", "/data/vm/cache"]);

        collect_reports(&mock, &list, "/backup/vm", true).unwrap();

        let calls = mock.calls();
        let last_snapshot = calls
            .iter()
            .rposition(|c| matches!(c, Call::Snapshot { .. }))
            .unwrap();
        let first_set = calls
            .iter()
            .position(|c| matches!(c, Call::SetReadonly(_, true)))
            .unwrap();
        assert!(
            last_snapshot < first_set,
            "read-only flag applied before the tree was complete"
        );
        assert!(calls.contains(&Call::SetReadonly("/backup/vm".into(), true)));
        assert!(calls.contains(&Call::SetReadonly("/backup/vm/logs".into(), true)));
        assert!(!calls.contains(&Call::SetReadonly("/backup/vm/cache".into(), true)));
    }

    #[test]
    fn without_preserve_flags_no_destination_becomes_readonly() {
        let mock = MockOps::with_readonly(&["/data/vm"]);
        let list = list(&["/data/vm", "/data/vm/logs"]);

        collect_reports(&mock, &list, "/backup/vm", false).unwrap();

        assert!(
            !mock
                .calls()
                .iter()
                .any(|c| matches!(c, Call::SetReadonly(_, _)))
        );
    }

    #[test]
    fn aborts_on_first_failure_keeping_earlier_reports() {
        let mut mock = MockOps::default();
        mock.fail_snapshot_of = Some("/data/vm/logs".to_string());
        let list = list(&["/data/vm", "/data/vm/logs", "/data/vm/cache"]);

        let mut reports = Vec::new();
        let err = create_snapshots(&mock, &list, "/backup/vm", false, &mut |src, dst| {
            reports.push(format!("{src} -> {dst}"))
        })
        .unwrap_err();

        assert!(matches!(err, SnapError::SnapshotCreate { .. }));
        assert_eq!(reports, vec!["/data/vm -> /backup/vm"]);
        // Nothing past the failing entry was attempted.
        assert!(
            !mock
                .calls()
                .contains(&Call::RemovePlaceholder("/backup/vm/cache".into()))
        );
    }

    #[test]
    fn empty_list_is_a_no_op() {
        let mock = MockOps::default();
        let reports = collect_reports(&mock, &[], "/backup/vm", true).unwrap();
        assert!(reports.is_empty());
        assert!(mock.calls().is_empty());
    }
}
