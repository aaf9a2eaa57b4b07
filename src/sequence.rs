//! Longest increasing subsequence, used by the keyed diff to find the
//! children that can stay where they are.

/// Indices of a longest strictly increasing subsequence of `values`.
///
/// Zero entries are placeholders ("no old counterpart") and never take part
/// in the sequence. Runs in O(n log n): `tails[k]` holds the index of the
/// smallest value ending an increasing run of length `k + 1`, and each
/// entry remembers its predecessor so the run can be rebuilt backwards.
pub fn get_sequence(values: &[usize]) -> Vec<usize> {
    let mut predecessors = vec![usize::MAX; values.len()];
    let mut tails: Vec<usize> = Vec::new();

    for (i, &value) in values.iter().enumerate() {
        if value == 0 {
            continue;
        }
        if let Some(&last) = tails.last() {
            if values[last] < value {
                predecessors[i] = last;
                tails.push(i);
                continue;
            }
        } else {
            tails.push(i);
            continue;
        }
        // First tail whose value is not smaller than `value`.
        let slot = tails.partition_point(|&t| values[t] < value);
        if value < values[tails[slot]] {
            if slot > 0 {
                predecessors[i] = tails[slot - 1];
            }
            tails[slot] = i;
        }
    }

    let mut sequence = vec![0; tails.len()];
    let mut cursor = tails.last().copied().unwrap_or(usize::MAX);
    for slot in sequence.iter_mut().rev() {
        *slot = cursor;
        cursor = predecessors[cursor];
    }
    sequence
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn is_increasing_run(values: &[usize], indices: &[usize]) -> bool {
        indices.windows(2).all(|w| w[0] < w[1] && values[w[0]] < values[w[1]])
            && indices.iter().all(|&i| values[i] != 0)
    }

    /// Quadratic reference used to check the length is maximal.
    fn lis_len(values: &[usize]) -> usize {
        let mut best = vec![0usize; values.len()];
        for i in 0..values.len() {
            if values[i] == 0 {
                continue;
            }
            best[i] = 1;
            for j in 0..i {
                if values[j] != 0 && values[j] < values[i] {
                    best[i] = best[i].max(best[j] + 1);
                }
            }
        }
        best.into_iter().max().unwrap_or(0)
    }

    #[test]
    fn empty_input_yields_empty_sequence() {
        assert!(get_sequence(&[]).is_empty());
    }

    #[test]
    fn classic_example() {
        let values = [2, 3, 1, 5, 6, 8, 7, 9, 4];
        let sequence = get_sequence(&values);
        assert_eq!(sequence.len(), 6);
        assert!(is_increasing_run(&values, &sequence));
        assert_eq!(sequence, vec![0, 1, 3, 4, 6, 7]);
    }

    #[test]
    fn zero_placeholders_are_skipped() {
        let values = [0, 3, 0, 1, 2];
        let sequence = get_sequence(&values);
        assert_eq!(sequence, vec![3, 4]);
    }

    #[test]
    fn all_placeholders_yield_empty_sequence() {
        assert!(get_sequence(&[0, 0, 0]).is_empty());
    }

    proptest! {
        #[test]
        fn sequence_is_increasing_and_maximal(values in prop::collection::vec(0usize..20, 0..40)) {
            let sequence = get_sequence(&values);
            prop_assert!(is_increasing_run(&values, &sequence));
            prop_assert_eq!(sequence.len(), lis_len(&values));
        }
    }
}
