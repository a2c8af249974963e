// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use std::sync::Arc;

use viewcache_core::{Entity, EntityId, Mergeable, SetPatch, UnsetPatch};

use crate::cache::PrimaryCache;

/// Observes every mutation the pipeline applies to a `PrimaryCache`,
/// grounded on `pkg/inmemory/listener.go`'s `StreamEventListener`.
///
/// Every method has a no-op default so a listener interested in only
/// one event (the original's `AddCallbackListener` family) doesn't have
/// to implement the other two.
pub trait StreamListener<E>: Send + Sync {
	fn on_add(&self, _entity: &E) {}
	fn on_update(&self, _id: EntityId, _set: &SetPatch, _unset: &UnsetPatch) {}
	fn on_delete(&self, _id: EntityId) {}
}

/// Fans a mutation out to before-listeners, the primary cache, then
/// after-listeners, grounded on `pkg/inmemory/listener.go`'s `Listener`.
///
/// Before-listeners run first and therefore still see the *old* cache
/// state if they read it back via `cache` — this is how the secondary
/// indexes compute stale postings to remove during an update or delete.
/// After-listeners (the `Notifier`, a caller-supplied `Notify`) only
/// ever see the cache post-mutation.
pub struct Listener<E> {
	cache: Arc<PrimaryCache<E>>,
	before: Vec<Arc<dyn StreamListener<E>>>,
	after: Vec<Arc<dyn StreamListener<E>>>,
}

impl<E: Entity + Mergeable + Clone> Listener<E> {
	pub fn new(cache: Arc<PrimaryCache<E>>) -> Self {
		Self { cache, before: Vec::new(), after: Vec::new() }
	}

	pub fn add_before(&mut self, listener: Arc<dyn StreamListener<E>>) {
		self.before.push(listener);
	}

	pub fn add_after(&mut self, listener: Arc<dyn StreamListener<E>>) {
		self.after.push(listener);
	}

	pub fn add(&self, v: E) {
		for l in &self.before {
			l.on_add(&v);
		}
		self.cache.add(v.clone());
		for l in &self.after {
			l.on_add(&v);
		}
	}

	pub fn update(&self, id: EntityId, set: SetPatch, unset: UnsetPatch) {
		for l in &self.before {
			l.on_update(id, &set, &unset);
		}
		self.cache.update(id, &set, &unset);
		for l in &self.after {
			l.on_update(id, &set, &unset);
		}
	}

	pub fn delete(&self, id: EntityId) {
		for l in &self.before {
			l.on_delete(id);
		}
		self.cache.delete(id);
		for l in &self.after {
			l.on_delete(id);
		}
	}
}
