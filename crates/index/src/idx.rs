// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use std::collections::HashMap;

use viewcache_core::EntityId;

/// Bijection between an entity's stable id and a dense `u64` position,
/// grounded on `pkg/inmemory/idx.go`.
///
/// The dense side is what `TrigramSuffixIndex` postings are keyed on: a
/// `u64` sorts and packs far better than a 24-hex-character id. The
/// counter is monotonic and never reused, even across deletes — a
/// dense index handed out once is never handed to a different entity,
/// which is what makes stale postings merely "dangling" rather than
/// "wrong".
#[derive(Default)]
pub struct IndexTable {
	next: u64,
	by_index: HashMap<u64, EntityId>,
	by_id: HashMap<EntityId, u64>,
}

impl IndexTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Assigns a fresh dense index to `id`, or returns the existing one
	/// if `id` is already registered.
	pub fn add(&mut self, id: EntityId) -> u64 {
		if let Some(&existing) = self.by_id.get(&id) {
			return existing;
		}
		self.next += 1;
		let idx = self.next;
		self.by_index.insert(idx, id);
		self.by_id.insert(id, idx);
		idx
	}

	pub fn id_by_index(&self, idx: u64) -> Option<EntityId> {
		self.by_index.get(&idx).copied()
	}

	pub fn index_by_id(&self, id: EntityId) -> Option<u64> {
		self.by_id.get(&id).copied()
	}

	pub fn remove_by_id(&mut self, id: EntityId) {
		if let Some(idx) = self.by_id.remove(&id) {
			self.by_index.remove(&idx);
		}
	}
}
