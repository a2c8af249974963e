// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use std::collections::HashSet;
use std::hash::Hash;

/// Set algebra shared by the sorted and suffix indexes when combining
/// posting lists, grounded on `pkg/inmemory/intersect.go`.
///
/// The dense-index variants operate on `u64`s (the `Idx` bijection's
/// dense side) since that's the representation postings are stored in;
/// the generic variants are for the rarer case of combining id lists
/// directly.
pub fn intersect_dense(lists: &[Vec<u64>]) -> Vec<u64> {
	let Some((first, rest)) = lists.split_first() else {
		return Vec::new();
	};
	let mut counts: std::collections::HashMap<u64, usize> = std::collections::HashMap::new();
	for list in rest {
		for &v in list {
			*counts.entry(v).or_insert(0) += 1;
		}
	}
	first.iter().copied().filter(|v| counts.get(v).copied().unwrap_or(0) == rest.len()).collect()
}

pub fn union<T: Eq + Hash + Clone>(a: &[T], b: &[T]) -> Vec<T> {
	let mut seen: HashSet<T> = a.iter().cloned().collect();
	let mut out: Vec<T> = a.to_vec();
	for v in b {
		if seen.insert(v.clone()) {
			out.push(v.clone());
		}
	}
	out
}

/// Elements of `a` not present in `b`.
pub fn left_outer<T: Eq + Hash + Clone>(a: &[T], b: &[T]) -> Vec<T> {
	let exclude: HashSet<&T> = b.iter().collect();
	a.iter().filter(|v| !exclude.contains(v)).cloned().collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn intersect_dense_requires_presence_in_every_list() {
		let lists = vec![vec![1, 2, 3], vec![2, 3, 4], vec![3, 4, 5]];
		assert_eq!(intersect_dense(&lists), vec![3]);
	}

	#[test]
	fn intersect_dense_single_list_is_identity() {
		assert_eq!(intersect_dense(&[vec![5, 6]]), vec![5, 6]);
	}

	#[test]
	fn left_outer_excludes_second_set() {
		assert_eq!(left_outer(&[1, 2, 3], &[2]), vec![1, 3]);
	}

	#[test]
	fn union_dedupes_preserving_first_occurrence_order() {
		assert_eq!(union(&[1, 2], &[2, 3]), vec![1, 2, 3]);
	}
}
