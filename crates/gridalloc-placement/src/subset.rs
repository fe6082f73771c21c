//! Subset-sum over host capacities.
//!
//! Host counts are small, so an exact dynamic program over the reachable
//! sums is used. For every sum the program keeps the best subset under the
//! tie-break order: fewest hosts, then the lexicographically smallest
//! tuple of host indices.

use gridalloc_core::SubsetFallback;

/// Pick indices into `capacities` whose sum is `target`, or apply
/// `fallback` when no subset sums to it exactly. Indices are ascending.
///
/// A target at or above the total capacity takes every non-empty host
/// whatever the fallback.
pub fn best_subset(capacities: &[usize], target: usize, fallback: SubsetFallback) -> Vec<usize> {
    let total: usize = capacities.iter().sum();
    if target >= total {
        return (0..capacities.len()).filter(|&i| capacities[i] > 0).collect();
    }

    // best[s] = best subset summing to s among the items seen so far.
    let mut best: Vec<Option<Vec<usize>>> = vec![None; target + 1];
    best[0] = Some(Vec::new());

    for (i, &cap) in capacities.iter().enumerate() {
        if cap == 0 || cap > target {
            continue;
        }
        // Descending so each item is used at most once.
        for sum in (cap..=target).rev() {
            let candidate = match &best[sum - cap] {
                Some(prefix) => {
                    let mut c = prefix.clone();
                    c.push(i);
                    c
                }
                None => continue,
            };
            if best[sum].as_ref().is_none_or(|current| preferred(&candidate, current)) {
                best[sum] = Some(candidate);
            }
        }
    }

    match fallback {
        SubsetFallback::ExactOnly => best[target].take().unwrap_or_default(),
        SubsetFallback::LargestBelow => best
            .into_iter()
            .rev()
            .flatten()
            .next()
            .unwrap_or_default(),
    }
}

fn preferred(a: &[usize], b: &[usize]) -> bool {
    (a.len(), a) < (b.len(), b)
}
