// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use viewcache_core::{Entity, EntityId, FieldAccess, Mergeable, SetPatch, UnsetPatch};

use crate::cache::PrimaryCache;
use crate::inverse::{entity_key, patch_key, posting_value};
use crate::listener::StreamListener;

/// Single-valued secondary index: field value -> the one entity that
/// owns it, grounded on `pkg/inmemory/inverseuniqindex.go`.
///
/// Unlike `InverseIndex`, a write to an already-occupied key silently
/// overwrites the previous owner rather than appending — callers are
/// expected to have already enforced the uniqueness constraint upstream
/// (e.g. the backing store's own unique index). There is no nil-bucket
/// here: absent keys are simply not indexed.
pub struct InverseUniqueIndex<E> {
	data: RwLock<IndexMap<String, String>>,
	cache: Arc<PrimaryCache<E>>,
	from: Vec<String>,
	to: Option<String>,
}

impl<E: Entity + Mergeable + FieldAccess + Clone> InverseUniqueIndex<E> {
	pub fn new(cache: Arc<PrimaryCache<E>>, from: Vec<String>, to: Option<String>) -> Self {
		Self { data: RwLock::new(IndexMap::new()), cache, from, to }
	}

	pub fn get(&self, val: &str) -> Option<String> {
		self.data.read().get(val).cloned()
	}
}

impl<E: Entity + Mergeable + FieldAccess + Clone + Send + Sync> StreamListener<E> for InverseUniqueIndex<E> {
	fn on_add(&self, entity: &E) {
		let Some(key) = entity_key(entity, &self.from) else { return };
		let value = posting_value(entity, self.to.as_deref());
		self.data.write().insert(key, value);
	}

	fn on_update(&self, id: EntityId, set: &SetPatch, unset: &UnsetPatch) {
		let touches_from = self.from.iter().any(|p| set.contains_key(p) || unset.iter().any(|u| u == p));
		if !touches_from {
			return;
		}
		let Some(old) = self.cache.get(id) else { return };
		let Some(old_key) = entity_key(&old, &self.from) else { return };
		match patch_key(&self.from, set) {
			// No-op if the indexed field's canonical value didn't
			// actually change: a merge that leaves every indexed
			// field unchanged is legal, not an error.
			Some(new_key) if new_key == old_key => {}
			Some(new_key) => {
				let value = posting_value(&old, self.to.as_deref());
				let mut data = self.data.write();
				data.remove(&old_key);
				data.insert(new_key, value);
			}
			// `set` doesn't fully re-cover the from paths but `unset`
			// named one of them: the key transitions to the nil-bucket.
			None => {
				self.data.write().remove(&old_key);
			}
		}
	}

	fn on_delete(&self, id: EntityId) {
		let Some(old) = self.cache.get(id) else { return };
		let Some(old_key) = entity_key(&old, &self.from) else { return };
		self.data.write().remove(&old_key);
	}
}
