use er_types::{Bit, BitVector};

/// Index changes needed to move an element from one flag set to another.
///
/// Both lists are ascending. Bits set in both vectors appear in neither.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlagDelta {
    /// Set before, clear now: drop the name from these indexes.
    pub removed: Vec<Bit>,
    /// Clear before, set now: add the name to these indexes.
    pub added: Vec<Bit>,
}

impl FlagDelta {
    /// Walk both ascending position lists once.
    pub fn between(old: &BitVector, new: &BitVector) -> Self {
        let (old_bits, new_bits) = (old.set_bits(), new.set_bits());
        let mut delta = Self::default();
        let (mut i, mut j) = (0, 0);
        while i < old_bits.len() && j < new_bits.len() {
            match old_bits[i].cmp(&new_bits[j]) {
                std::cmp::Ordering::Less => {
                    delta.removed.push(old_bits[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    delta.added.push(new_bits[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
            }
        }
        delta.removed.extend_from_slice(&old_bits[i..]);
        delta.added.extend_from_slice(&new_bits[j..]);
        delta
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }

    /// Number of index writes the delta implies.
    pub fn len(&self) -> usize {
        self.removed.len() + self.added.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use er_types::BitOp;
    use proptest::prelude::*;

    fn v(bits: &[usize]) -> BitVector {
        BitVector::from_bits(bits.iter().copied()).unwrap()
    }

    fn idx(bits: &[Bit]) -> Vec<usize> {
        bits.iter().map(|b| b.index()).collect()
    }

    #[test]
    fn disjoint_and_overlapping() {
        let d = FlagDelta::between(&v(&[1, 2, 3]), &v(&[2, 4]));
        assert_eq!(idx(&d.removed), vec![1, 3]);
        assert_eq!(idx(&d.added), vec![4]);
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn identical_vectors_need_nothing() {
        let d = FlagDelta::between(&v(&[5, 4095]), &v(&[5, 4095]));
        assert!(d.is_empty());
    }

    #[test]
    fn from_and_to_empty() {
        let d = FlagDelta::between(&BitVector::new(), &v(&[0, 9]));
        assert!(d.removed.is_empty());
        assert_eq!(idx(&d.added), vec![0, 9]);
        let d = FlagDelta::between(&v(&[0, 9]), &BitVector::new());
        assert_eq!(idx(&d.removed), vec![0, 9]);
    }

    proptest! {
        #[test]
        fn delta_is_the_symmetric_difference(
            a in proptest::collection::btree_set(0usize..4096, 0..64),
            b in proptest::collection::btree_set(0usize..4096, 0..64),
        ) {
            let (old, new) = (v(&a.iter().copied().collect::<Vec<_>>()), v(&b.iter().copied().collect::<Vec<_>>()));
            let d = FlagDelta::between(&old, &new);
            let expected_removed: Vec<usize> = a.difference(&b).copied().collect();
            let expected_added: Vec<usize> = b.difference(&a).copied().collect();
            prop_assert_eq!(idx(&d.removed), expected_removed);
            prop_assert_eq!(idx(&d.added), expected_added);
            prop_assert_eq!(d.len(), old.combine(&new, BitOp::Xor).count_ones());
        }
    }
}
