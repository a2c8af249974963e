// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use viewcache_core::{Entity, EntityId, FieldAccess, Mergeable, SetPatch, UnsetPatch};

use crate::cache::PrimaryCache;
use crate::inverse::{entity_key, patch_key};
use crate::listener::StreamListener;
use crate::set_ops::left_outer;

/// A `BTreeSet`-backed total order over the indexed field, grounded on
/// `pkg/inmemory/sortedindex.go`'s `btree.BTree` of `(text, id)` items.
///
/// Mirrors the original's `fill()` step: every mutation recomputes a
/// flat `Vec<EntityId>` snapshot in ascending order, which is what
/// `intersect` filters against. A `BTreeMap` would do for point lookups
/// but the whole point of this index is handing back an *ordered*
/// result set, so the flattened snapshot is the real product.
///
/// Unlike the inverse indexes, a sorted index always returns entity
/// ids — there is no `to` field override, since an ordered result set
/// of arbitrary strings wouldn't be something a caller could join back
/// against the cache.
pub struct SortedIndex<E> {
	tree: RwLock<BTreeSet<(String, EntityId)>>,
	snapshot: RwLock<Vec<EntityId>>,
	cache: Arc<PrimaryCache<E>>,
	from: Vec<String>,
}

impl<E: Entity + Mergeable + FieldAccess + Clone> SortedIndex<E> {
	pub fn new(cache: Arc<PrimaryCache<E>>, from: Vec<String>) -> Self {
		Self { tree: RwLock::new(BTreeSet::new()), snapshot: RwLock::new(Vec::new()), cache, from }
	}

	/// Entities from `in_set` that appear in this index, in ascending
	/// order of the indexed field.
	pub fn intersect(&self, in_set: &[EntityId]) -> Vec<EntityId> {
		let wanted: std::collections::HashSet<EntityId> = in_set.iter().copied().collect();
		self.snapshot.read().iter().filter(|id| wanted.contains(id)).copied().collect()
	}

	/// Entities from `universe` this index has no entry for.
	pub fn not_indexed(&self, universe: &[EntityId]) -> Vec<EntityId> {
		left_outer(universe, &self.snapshot.read())
	}

	fn refill(&self) {
		let tree = self.tree.read();
		*self.snapshot.write() = tree.iter().map(|(_, id)| *id).collect();
	}
}

impl<E: Entity + Mergeable + FieldAccess + Clone + Send + Sync> StreamListener<E> for SortedIndex<E> {
	fn on_add(&self, entity: &E) {
		let Some(key) = entity_key(entity, &self.from) else { return };
		self.tree.write().insert((key, entity.id()));
		self.refill();
	}

	fn on_update(&self, id: EntityId, set: &SetPatch, _unset: &UnsetPatch) {
		let Some(new_key) = patch_key(&self.from, set) else { return };
		let Some(old) = self.cache.get(id) else { return };
		let Some(old_key) = entity_key(&old, &self.from) else { return };
		{
			let mut tree = self.tree.write();
			tree.remove(&(old_key, id));
			tree.insert((new_key, id));
		}
		self.refill();
	}

	fn on_delete(&self, id: EntityId) {
		let Some(old) = self.cache.get(id) else { return };
		let Some(old_key) = entity_key(&old, &self.from) else { return };
		self.tree.write().remove(&(old_key, id));
		self.refill();
	}
}
