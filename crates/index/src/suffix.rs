// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use viewcache_core::{Entity, EntityId, FieldAccess, Mergeable, SetPatch, UnsetPatch};

use crate::cache::PrimaryCache;
use crate::inverse::entity_key;
use crate::listener::StreamListener;
use crate::set_ops::intersect_dense;

type Trigram = [char; 3];
type Postings = BTreeMap<Trigram, Vec<u64>>;

/// Reuses posting-list buffers across `Put`/`Search` calls instead of
/// allocating fresh `Vec`s, grounded on `pkg/inmemory/suffixindex.go`'s
/// `sync.Pool`-backed `Pool`/`F`. A freestanding `Vec` pool is enough in
/// Rust; there's no need for the original's manual struct reset since
/// `Vec::clear` does it.
struct Pool {
	free: Mutex<Vec<Vec<u64>>>,
}

impl Pool {
	fn new() -> Self {
		Self::with_capacity(0)
	}

	fn with_capacity(capacity: usize) -> Self {
		Self { free: Mutex::new(Vec::with_capacity(capacity)) }
	}

	fn acquire(&self) -> Vec<u64> {
		self.free.lock().pop().unwrap_or_default()
	}

	fn release(&self, mut buf: Vec<u64>) {
		buf.clear();
		self.free.lock().push(buf);
	}
}

fn shingles(text: &str) -> Vec<Trigram> {
	let lower: Vec<char> = text.chars().flat_map(char::to_lowercase).collect();
	if lower.len() < 3 {
		return Vec::new();
	}
	(0..=lower.len() - 3).map(|i| [lower[i], lower[i + 1], lower[i + 2]]).collect()
}

fn put(tree: &mut Postings, text: &str, dense: u64) {
	for gram in shingles(text) {
		let postings = tree.entry(gram).or_default();
		if !postings.contains(&dense) {
			postings.push(dense);
		}
	}
}

/// Trigram-shingle substring search index, grounded on
/// `pkg/inmemory/suffixindex.go` (`Suffix`/`M`/`S`).
///
/// Postings are keyed by dense `u64` index rather than `EntityId`
/// directly — a fixed-size integer sorts and packs far more cheaply in
/// a `BTreeMap<[char; 3], Vec<u64>>` than a 24-hex-character id would.
///
/// Deletes intentionally leave stale postings behind (matching the
/// original, whose `Suffix.Delete` is a no-op): a deleted id's dense
/// index is never reassigned, so a stale hit resolves to `None` via
/// `PrimaryCache::id_by_index` rather than to the wrong entity. Call
/// `rebuild` periodically to actually reclaim the space.
pub struct TrigramSuffixIndex<E> {
	cache: Arc<PrimaryCache<E>>,
	from: Vec<String>,
	tree: RwLock<Postings>,
	shadow: RwLock<Postings>,
	pool: Pool,
}

impl<E: Entity + Mergeable + FieldAccess + Clone> TrigramSuffixIndex<E> {
	pub fn new(cache: Arc<PrimaryCache<E>>, from: Vec<String>) -> Self {
		Self::with_pool_capacity(cache, from, 0)
	}

	/// As `new`, pre-sizing the buffer pool's free list so the first
	/// `pool_capacity` rebuilds don't pay allocation cost for posting
	/// buffers (`PipelineConfig::trigram_pool_capacity`).
	pub fn with_pool_capacity(cache: Arc<PrimaryCache<E>>, from: Vec<String>, pool_capacity: usize) -> Self {
		Self {
			cache,
			from,
			tree: RwLock::new(Postings::new()),
			shadow: RwLock::new(Postings::new()),
			pool: Pool::with_capacity(pool_capacity),
		}
	}

	/// Full rebuild: populates the shadow tree from every live entity,
	/// then atomically swaps it in as the primary tree.
	pub fn rebuild(&self) {
		self.shadow.write().clear();
		for id in self.cache.all() {
			let Some(entity) = self.cache.get(id) else { continue };
			self.rebuild_one(&entity);
		}
		let mut tree = self.tree.write();
		let mut shadow = self.shadow.write();
		std::mem::swap(&mut *tree, &mut *shadow);
	}

	fn rebuild_one(&self, entity: &E) {
		let Some(dense) = self.cache.index_by_id(entity.id()) else { return };
		let Some(key) = entity_key(entity, &self.from) else { return };
		put(&mut self.shadow.write(), &key, dense);
	}

	/// Every id whose indexed text contains `text` as a substring (via
	/// trigram intersection; exact for queries of length >= 3).
	pub fn search(&self, text: &str) -> Vec<EntityId> {
		let grams = shingles(text);
		if grams.is_empty() {
			return Vec::new();
		}
		let tree = self.tree.read();
		let mut lists: Vec<Vec<u64>> = Vec::with_capacity(grams.len());
		for gram in &grams {
			let mut buf = self.pool.acquire();
			if let Some(postings) = tree.get(gram) {
				buf.extend_from_slice(postings);
			}
			lists.push(buf);
		}
		drop(tree);
		let dense_hits = intersect_dense(&lists);
		for buf in lists {
			self.pool.release(buf);
		}
		dense_hits.into_iter().filter_map(|dense| self.cache.id_by_index(dense)).collect()
	}
}

impl<E: Entity + Mergeable + FieldAccess + Clone + Send + Sync> StreamListener<E> for TrigramSuffixIndex<E> {
	fn on_add(&self, entity: &E) {
		let Some(dense) = self.cache.index_by_id(entity.id()) else { return };
		let Some(key) = entity_key(entity, &self.from) else { return };
		put(&mut self.tree.write(), &key, dense);
	}

	fn on_update(&self, id: EntityId, _set: &SetPatch, _unset: &UnsetPatch) {
		// Re-derives the key from the merged entity rather than the raw
		// patch (unlike the inverse indexes) because a substring index
		// has no stable "old key" to remove postings from — the
		// original re-derives on every Update too and simply grows the
		// posting list, relying on `Rebuild` to drop stale shingles.
		let Some(entity) = self.cache.get(id) else { return };
		let Some(dense) = self.cache.index_by_id(id) else { return };
		let Some(key) = entity_key(&entity, &self.from) else { return };
		put(&mut self.tree.write(), &key, dense);
	}

	fn on_delete(&self, _id: EntityId) {}
}
