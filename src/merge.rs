//! Three-way merge of ordered persistent-id sequences.
//!
//! Two divergent orderings of the same playlist merge against their
//! common ancestor by treating each sequence as a text document with one
//! id per line: patches from `base` to `delta_one` are applied onto
//! `delta_two`. When every patch applies the merged lines parse back to
//! ids; otherwise `delta_two` wins unchanged.

use crate::model::Pid;
use diff_match_patch_rs::{DiffMatchPatch, Efficient, PatchInput};

fn pids_to_text(pids: &[Pid]) -> String {
    pids.iter()
        .map(|p| p.hex())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Merge `delta_one`'s edits into `delta_two`, both relative to `base`.
///
/// Returns the merged sequence and whether the merge applied cleanly.
/// Lines that fail to parse after patching become zero ids so positions
/// stay stable.
pub fn three_way_merge(base: &[Pid], delta_one: &[Pid], delta_two: &[Pid]) -> (Vec<Pid>, bool) {
    let base_txt = pids_to_text(base);
    let one_txt = pids_to_text(delta_one);
    let two_txt = pids_to_text(delta_two);

    let dmp = DiffMatchPatch::new();
    let applied = (|| {
        let diffs = dmp.diff_main::<Efficient>(&base_txt, &one_txt).ok()?;
        let patches = dmp.patch_make(PatchInput::new_diffs(&diffs)).ok()?;
        dmp.patch_apply(&patches, &two_txt).ok()
    })();

    let Some((merged, results)) = applied else {
        return (delta_two.to_vec(), false);
    };
    if results.iter().any(|ok| !ok) {
        return (delta_two.to_vec(), false);
    }

    let pids = merged
        .split('\n')
        .map(|line| Pid::from_hex(line).unwrap_or(Pid(0)))
        .collect();
    (pids, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pids(vals: &[u64]) -> Vec<Pid> {
        vals.iter().map(|&v| Pid(v)).collect()
    }

    #[test]
    fn merge_is_idempotent() {
        let base = pids(&[1, 2, 3]);
        let (merged, ok) = three_way_merge(&base, &base, &base);
        assert!(ok);
        assert_eq!(merged, base);
    }

    #[test]
    fn left_identity_keeps_delta_two() {
        let base = pids(&[1, 2, 3]);
        let two = pids(&[3, 1, 2]);
        let (merged, ok) = three_way_merge(&base, &base, &two);
        assert!(ok);
        assert_eq!(merged, two);
    }

    #[test]
    fn append_merges_into_reordered_list() {
        let base = pids(&[0xA, 0xB, 0xC]);
        let one = pids(&[0xA, 0xB, 0xC, 0xD]);
        let two = pids(&[0xA, 0x58, 0xB, 0xC]);
        let (merged, ok) = three_way_merge(&base, &one, &two);
        assert!(ok);
        assert_eq!(merged, pids(&[0xA, 0x58, 0xB, 0xC, 0xD]));
    }

    #[test]
    fn removal_merges() {
        let base = pids(&[1, 2, 3, 4]);
        let one = pids(&[1, 3, 4]); // dropped 2
        let two = pids(&[1, 2, 3, 4, 5]); // appended 5
        let (merged, ok) = three_way_merge(&base, &one, &two);
        assert!(ok);
        assert_eq!(merged, pids(&[1, 3, 4, 5]));
    }
}
