// SPDX-License-Identifier: GPL-3.0-only

//! Path remapping between the source and destination trees.

/// Replace the leading `source_root` prefix of `path` with `dest_root`.
///
/// The replacement covers exactly `source_root.len()` bytes,
/// character-for-character; it is not segment-aware. Every entry of a
/// discovery list rooted at `source_root` begins with it by construction,
/// which is the only guarantee callers get; an accidental prefix
/// collision on other input is undefined (see DESIGN.md).
pub fn map_path(path: &str, source_root: &str, dest_root: &str) -> String {
    debug_assert!(
        path.starts_with(source_root),
        "{path} does not start with {source_root}"
    );
    format!("{dest_root}{}", &path[source_root.len()..])
}

/// Split a subvolume path into its parent directory and subvolume name.
///
/// The parent keeps its trailing `/`. A single-component path has an empty
/// parent; callers substitute the current directory for it.
pub fn split_parent_name(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..=idx], &path[idx + 1..]),
        None => ("", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_the_root_itself() {
        assert_eq!(map_path("/data/vm", "/data/vm", "/backup/vm"), "/backup/vm");
    }

    #[test]
    fn maps_nested_paths_under_the_root() {
        assert_eq!(
            map_path("/data/vm/logs", "/data/vm", "/backup/vm"),
            "/backup/vm/logs"
        );
    }

    #[test]
    fn roots_of_different_lengths_remap_cleanly() {
        assert_eq!(map_path("/a/sub", "/a", "/long/dest"), "/long/dest/sub");
        assert_eq!(map_path("/very/long/root/x", "/very/long/root", "/d"), "/d/x");
    }

    #[test]
    fn mapping_round_trips() {
        let paths = ["/data/vm", "/data/vm/logs", "/data/vm/a/b/c"];
        for path in paths {
            let there = map_path(path, "/data/vm", "/backup/img");
            let back = map_path(&there, "/backup/img", "/data/vm");
            assert_eq!(back, path);
        }
    }

    #[test]
    fn splits_parent_and_name() {
        assert_eq!(split_parent_name("/backup/vm"), ("/backup/", "vm"));
        assert_eq!(split_parent_name("/vm"), ("/", "vm"));
        assert_eq!(split_parent_name("vm"), ("", "vm"));
        assert_eq!(split_parent_name("backup/vm/logs"), ("backup/vm/", "logs"));
    }
}
