//! Merkle root over a block's transaction digests.

use crate::hash::{hash_concat, Hash};

/// Compute the merkle root of a list of transaction digests.
///
/// Returns the zero hash if the list is empty. Pairs are hashed left to
/// right; an odd node at the end of a level is hashed with itself.
pub fn merkle_root(hashes: &[Hash]) -> Hash {
    match hashes {
        [] => Hash::ZERO,
        [single] => *single,
        _ => {
            let mut level: Vec<Hash> = hashes.to_vec();
            while level.len() > 1 {
                level = level
                    .chunks(2)
                    .map(|pair| {
                        let right = pair.get(1).unwrap_or(&pair[0]);
                        hash_concat(&[pair[0].as_ref(), right.as_ref()])
                    })
                    .collect();
            }
            level[0]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash;

    #[test]
    fn test_empty_root() {
        assert_eq!(merkle_root(&[]), Hash::ZERO);
    }

    #[test]
    fn test_single_leaf_is_root() {
        let leaf = hash(b"only");
        assert_eq!(merkle_root(&[leaf]), leaf);
    }

    #[test]
    fn test_two_leaves() {
        let a = hash(b"a");
        let b = hash(b"b");
        assert_eq!(merkle_root(&[a, b]), hash_concat(&[a.as_ref(), b.as_ref()]));
    }

    #[test]
    fn test_odd_leaf_duplicated() {
        let a = hash(b"a");
        let b = hash(b"b");
        let c = hash(b"c");

        let ab = hash_concat(&[a.as_ref(), b.as_ref()]);
        let cc = hash_concat(&[c.as_ref(), c.as_ref()]);
        let expected = hash_concat(&[ab.as_ref(), cc.as_ref()]);

        assert_eq!(merkle_root(&[a, b, c]), expected);
    }

    #[test]
    fn test_order_matters() {
        let a = hash(b"a");
        let b = hash(b"b");
        assert_ne!(merkle_root(&[a, b]), merkle_root(&[b, a]));
    }
}
