// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use std::collections::HashMap;

use parking_lot::RwLock;
use viewcache_core::{Entity, EntityId, Mergeable, SetPatch, UnsetPatch};

use crate::idx::IndexTable;

struct Inner<E> {
	idx: IndexTable,
	data: HashMap<EntityId, E>,
}

/// The authoritative in-process copy of every cached entity, grounded on
/// `pkg/inmemory/cache.go`.
///
/// One lock guards both the dense-index bijection and the entity map so
/// that a reader never observes one without the other in sync. `get`
/// and `get_by_index` hand back an owned clone, the Rust equivalent of
/// the original's reflective field-by-field copy: callers mutate their
/// own copy freely without racing the cache.
pub struct PrimaryCache<E> {
	inner: RwLock<Inner<E>>,
}

impl<E> Default for PrimaryCache<E> {
	fn default() -> Self {
		Self { inner: RwLock::new(Inner { idx: IndexTable::new(), data: HashMap::new() }) }
	}
}

impl<E: Entity + Mergeable + Clone> PrimaryCache<E> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn all(&self) -> Vec<EntityId> {
		self.inner.read().data.keys().copied().collect()
	}

	pub fn get(&self, id: EntityId) -> Option<E> {
		self.inner.read().data.get(&id).cloned()
	}

	pub fn get_by_index(&self, idx: u64) -> Option<E> {
		let inner = self.inner.read();
		let id = inner.idx.id_by_index(idx)?;
		inner.data.get(&id).cloned()
	}

	pub fn index_by_id(&self, id: EntityId) -> Option<u64> {
		self.inner.read().idx.index_by_id(id)
	}

	pub fn id_by_index(&self, idx: u64) -> Option<EntityId> {
		self.inner.read().idx.id_by_index(idx)
	}

	pub fn add(&self, v: E) {
		let mut inner = self.inner.write();
		let id = v.id();
		inner.idx.add(id);
		inner.data.insert(id, v);
	}

	pub fn update(&self, id: EntityId, set: &SetPatch, unset: &UnsetPatch) {
		let mut inner = self.inner.write();
		if let Some(entity) = inner.data.get_mut(&id) {
			entity.merge_from(set, unset);
		}
	}

	pub fn delete(&self, id: EntityId) {
		let mut inner = self.inner.write();
		inner.data.remove(&id);
		inner.idx.remove_by_id(id);
	}
}
