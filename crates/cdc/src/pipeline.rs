// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use std::collections::HashMap;
use std::sync::Arc;

use viewcache_core::{Entity, EntityId, FieldAccess, IndexKind, IndexPlan, Mergeable, SetPatch, UnsetPatch};
use viewcache_index::{InverseIndex, InverseUniqueIndex, Listener, PrimaryCache, SortedIndex, StreamListener, TrigramSuffixIndex};

use crate::notifier::{Notifier, Subscription};

/// Per-pipeline tunables, collected into one struct rather than threaded
/// as individual constructor arguments, matching the `*Config`
/// convention used elsewhere in this crate (e.g. `PollConsumerConfig`).
///
/// `btree_degree` mirrors a constructor argument the original source
/// takes for its B-tree-backed sorted/suffix indexes; `SortedIndex` and
/// `TrigramSuffixIndex` are built on `std::collections::BTreeMap`/
/// `BTreeSet` here, which don't expose a branching-factor knob, so this
/// field is accepted for API parity with a caller porting tuning code
/// over but has no effect on either index's behavior.
#[derive(Clone, Copy, Debug)]
pub struct PipelineConfig {
	pub btree_degree: usize,
	pub trigram_pool_capacity: usize,
}

impl Default for PipelineConfig {
	fn default() -> Self {
		Self { btree_degree: 1000, trigram_pool_capacity: 0 }
	}
}

/// Wires a `PrimaryCache`, every secondary index an `IndexPlan`
/// declares, and the await-coordinator `Notifier` into one pipeline,
/// grounded on `pkg/inmemory/builder.go`'s `NewCacheWithEventListener`.
///
/// Index listeners are registered *before* the cache mutation (so they
/// can read pre-mutation state off `cache` during an update/delete);
/// the `Notifier` is registered *after* (so a woken waiter is
/// guaranteed a coherent read of its own write) — the same ordering
/// `NewCacheWithEventListener` hard-codes.
pub struct Pipeline<E> {
	pub cache: Arc<PrimaryCache<E>>,
	pub notifier: Arc<Notifier>,
	listener: Listener<E>,
	inverse: HashMap<String, Arc<InverseIndex<E>>>,
	inverse_unique: HashMap<String, Arc<InverseUniqueIndex<E>>>,
	sorted: HashMap<String, Arc<SortedIndex<E>>>,
	suffix: HashMap<String, Arc<TrigramSuffixIndex<E>>>,
}

impl<E: Entity + Mergeable + FieldAccess + Clone + Send + Sync + 'static> Pipeline<E> {
	pub fn new(plan: &IndexPlan) -> Self {
		Self::with_extra_listener(plan, None)
	}

	/// As `new`, plus one caller-supplied after-listener (the `Notify`
	/// slot in the original source — a caller-owned side effect, e.g.
	/// invalidating an external cache, that should only fire once the
	/// mutation is fully visible).
	pub fn with_extra_listener(plan: &IndexPlan, extra_after: Option<Arc<dyn StreamListener<E>>>) -> Self {
		Self::with_config(plan, PipelineConfig::default(), extra_after)
	}

	/// As `with_extra_listener`, overriding the per-pipeline tunables.
	pub fn with_config(plan: &IndexPlan, config: PipelineConfig, extra_after: Option<Arc<dyn StreamListener<E>>>) -> Self {
		let cache = Arc::new(PrimaryCache::new());
		let mut listener = Listener::new(cache.clone());

		let mut inverse = HashMap::new();
		let mut inverse_unique = HashMap::new();
		let mut sorted = HashMap::new();
		let mut suffix = HashMap::new();

		for d in &plan.descriptors {
			match d.kind {
				IndexKind::Inverse => {
					let idx = Arc::new(InverseIndex::new(cache.clone(), d.from.clone(), d.to.clone()));
					listener.add_before(idx.clone());
					inverse.insert(d.name.clone(), idx);
				}
				IndexKind::InverseUnique => {
					let idx = Arc::new(InverseUniqueIndex::new(cache.clone(), d.from.clone(), d.to.clone()));
					listener.add_before(idx.clone());
					inverse_unique.insert(d.name.clone(), idx);
				}
				IndexKind::Sorted => {
					let idx = Arc::new(SortedIndex::new(cache.clone(), d.from.clone()));
					listener.add_before(idx.clone());
					sorted.insert(d.name.clone(), idx);
				}
				IndexKind::Suffix => {
					let idx = Arc::new(TrigramSuffixIndex::with_pool_capacity(cache.clone(), d.from.clone(), config.trigram_pool_capacity));
					listener.add_before(idx.clone());
					suffix.insert(d.name.clone(), idx);
				}
			}
		}

		let notifier = Arc::new(Notifier::new());
		listener.add_after(notifier.clone());
		if let Some(extra) = extra_after {
			listener.add_after(extra);
		}

		Self { cache, notifier, listener, inverse, inverse_unique, sorted, suffix }
	}

	pub fn add(&self, v: E) {
		self.listener.add(v);
	}

	pub fn update(&self, id: EntityId, set: SetPatch, unset: UnsetPatch) {
		self.listener.update(id, set, unset);
	}

	pub fn delete(&self, id: EntityId) {
		self.listener.delete(id);
	}

	pub fn get(&self, id: EntityId) -> Option<E> {
		self.cache.get(id)
	}

	pub fn all(&self) -> Vec<EntityId> {
		self.cache.all()
	}

	pub fn inverse(&self, name: &str) -> Option<&Arc<InverseIndex<E>>> {
		self.inverse.get(name)
	}

	pub fn inverse_unique(&self, name: &str) -> Option<&Arc<InverseUniqueIndex<E>>> {
		self.inverse_unique.get(name)
	}

	pub fn sorted(&self, name: &str) -> Option<&Arc<SortedIndex<E>>> {
		self.sorted.get(name)
	}

	pub fn suffix(&self, name: &str) -> Option<&Arc<TrigramSuffixIndex<E>>> {
		self.suffix.get(name)
	}

	/// Rebuilds every suffix index from the current cache contents, the
	/// only way to reclaim postings for deleted entities.
	pub fn rebuild_suffix_indexes(&self) {
		for idx in self.suffix.values() {
			idx.rebuild();
		}
	}

	pub fn await_create(&self, id: EntityId) -> Subscription {
		self.notifier.await_create(id)
	}

	pub fn await_update(&self, id: EntityId) -> Subscription {
		self.notifier.await_update(id)
	}

	pub fn await_delete(&self, id: EntityId) -> Subscription {
		self.notifier.await_delete(id)
	}
}
