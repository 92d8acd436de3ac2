//! Deterministic segment naming.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Name used when the bag location has no final component, e.g. `/`.
const FALLBACK_SEGMENT_NAME: &str = "bag";

/// Returns the location of segment `rotation_index` of the bag at `base`.
///
/// Segments live inside the bag directory and are named after it. The first
/// segment keeps the bare name so bags that never split look the same as
/// before splitting existed; later segments get `_<index>` inserted before
/// any extension:
///
/// ```text
/// next_segment_location("out/run", 0)    == "out/run/run"
/// next_segment_location("out/run", 2)    == "out/run/run_2"
/// next_segment_location("out/run.v2", 1) == "out/run.v2/run_1.v2"
/// ```
///
/// The function performs no I/O.
#[must_use]
pub fn next_segment_location(base: &Path, rotation_index: u64) -> PathBuf {
    let Some(name) = base.file_name() else {
        return base.join(indexed(OsStr::new(FALLBACK_SEGMENT_NAME), None, rotation_index));
    };

    let file_name = Path::new(name);
    match (file_name.file_stem(), file_name.extension()) {
        (Some(stem), Some(extension)) => base.join(indexed(stem, Some(extension), rotation_index)),
        _ => base.join(indexed(name, None, rotation_index)),
    }
}

fn indexed(stem: &OsStr, extension: Option<&OsStr>, index: u64) -> OsString {
    let mut name = OsString::from(stem);
    if index > 0 {
        name.push(format!("_{index}"));
    }
    if let Some(extension) = extension {
        name.push(".");
        name.push(extension);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_segment_keeps_bare_name() {
        assert_eq!(
            next_segment_location(Path::new("out/run"), 0),
            PathBuf::from("out/run/run")
        );
    }

    #[test]
    fn later_segments_are_indexed() {
        assert_eq!(
            next_segment_location(Path::new("out/run"), 1),
            PathBuf::from("out/run/run_1")
        );
        assert_eq!(
            next_segment_location(Path::new("/tmp/bags/run"), 12),
            PathBuf::from("/tmp/bags/run/run_12")
        );
    }

    #[test]
    fn index_goes_before_extension() {
        assert_eq!(
            next_segment_location(Path::new("out/run.v2"), 3),
            PathBuf::from("out/run.v2/run_3.v2")
        );
        assert_eq!(
            next_segment_location(Path::new("out/run.v2"), 0),
            PathBuf::from("out/run.v2/run.v2")
        );
    }

    #[test]
    fn trailing_separator_is_ignored() {
        assert_eq!(
            next_segment_location(Path::new("out/run/"), 1),
            PathBuf::from("out/run/run_1")
        );
    }

    #[test]
    fn root_falls_back_to_default_name() {
        assert_eq!(
            next_segment_location(Path::new("/"), 1),
            PathBuf::from("/bag_1")
        );
    }

    proptest! {
        #[test]
        fn deterministic_and_distinct(a in 0u64..10_000, b in 0u64..10_000) {
            let base = Path::new("bags/session");
            prop_assert_eq!(next_segment_location(base, a), next_segment_location(base, a));
            if a != b {
                prop_assert_ne!(next_segment_location(base, a), next_segment_location(base, b));
            }
        }
    }
}
