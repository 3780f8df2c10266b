//! Combinatorics over proposal subsets.

/// Binomial coefficient C(n, k).
pub fn count_subsets(n: usize, k: usize) -> u64 {
    if k > n {
        return 0;
    }
    let k = usize::min(k, n - k);
    let mut count = 1u128;
    for offset in 0..k {
        count = count * (n - offset) as u128 / (offset + 1) as u128;
    }
    count as u64
}

/// Iterates over all size-`k` subsets of `0..n` in lexicographic order. Each item
/// is the sorted list of member ordinals.
pub struct KSubsets {
    n: usize,
    next: Option<Vec<usize>>,
}
impl KSubsets {
    pub fn new(n: usize, k: usize) -> Self {
        let next = if k <= n { Some((0..k).collect()) } else { None };
        Self { n, next }
    }
}

impl Iterator for KSubsets {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let k = current.len();
        let mut successor = current.clone();
        let mut index = k;
        while index > 0 {
            index -= 1;
            if successor[index] < self.n - (k - index) {
                successor[index] += 1;
                for follow in index + 1..k {
                    successor[follow] = successor[follow - 1] + 1;
                }
                self.next = Some(successor);
                break;
            }
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts() {
        assert_eq!(1, count_subsets(0, 0));
        assert_eq!(6, count_subsets(4, 2));
        assert_eq!(10, count_subsets(5, 3));
        assert_eq!(0, count_subsets(3, 4));
        assert_eq!(184_756, count_subsets(20, 10));
    }

    #[test]
    fn enumerates_lexicographically() {
        let subsets: Vec<_> = KSubsets::new(4, 2).collect();
        assert_eq!(
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3],
            ],
            subsets
        );
    }

    #[test]
    fn full_and_empty_subsets() {
        let all: Vec<_> = KSubsets::new(3, 3).collect();
        assert_eq!(vec![vec![0, 1, 2]], all);

        let empty: Vec<_> = KSubsets::new(3, 0).collect();
        assert_eq!(vec![Vec::<usize>::new()], empty);

        let none: Vec<_> = KSubsets::new(2, 3).collect();
        assert!(none.is_empty());
    }

    #[test]
    fn subset_count_matches_binomial() {
        for (n, k) in [(5usize, 2usize), (6, 3), (7, 1), (8, 8)] {
            let enumerated = KSubsets::new(n, k).count() as u64;
            assert_eq!(count_subsets(n, k), enumerated, "n={n}, k={k}");
        }
    }
}
