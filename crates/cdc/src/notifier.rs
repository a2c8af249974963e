// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::Mutex;
use viewcache_core::{Entity, EntityId, Mergeable, SetPatch, UnsetPatch};

use viewcache_index::StreamListener;

static NEXT_WAITER_ID: AtomicU64 = AtomicU64::new(1);

fn next_waiter_id() -> u64 {
	NEXT_WAITER_ID.fetch_add(1, Ordering::Relaxed)
}

/// A single-shot wake-up handed to a registered waiter. `notify`
/// consumes itself; dropping it without calling `notify` silently
/// abandons the waiter (their `recv` call will return a disconnect,
/// which the coordinator treats as "never happened" rather than
/// panicking).
struct Waiter {
	id: u64,
	tx: Sender<()>,
}

impl Waiter {
	fn notify(&self) {
		// A bounded(1) channel with try_send rather than send: the
		// notifier must never block on a waiter that already gave up
		// (cancelled its await) and stopped polling its receiver.
		let _ = self.tx.try_send(());
	}
}

type Registry = Arc<Mutex<HashMap<EntityId, Vec<Waiter>>>>;

fn cancel(registry: &Registry, id: EntityId, waiter_id: u64) {
	let mut registry = registry.lock();
	if let Some(waiters) = registry.get_mut(&id) {
		waiters.retain(|w| w.id != waiter_id);
		if waiters.is_empty() {
			registry.remove(&id);
		}
	}
}

/// The await-coordinator's three one-shot waiter registries, grounded
/// on `pkg/inmemory/notifier.go`'s `Notifier`.
///
/// Registered as an after-listener on the pipeline: by the
/// time `on_add`/`on_update`/`on_delete` fire here, the primary cache
/// and every secondary index have already observed the mutation, so a
/// waiter woken from here is guaranteed a coherent read of its own
/// write.
#[derive(Default)]
pub struct Notifier {
	create: Registry,
	update: Registry,
	delete: Registry,
}

/// A handle to a registered waiter. Each carries the waiter id and a
/// clone of the registry it lives in, so it can unregister itself
/// without going back through `Notifier` — the `Delete*(id, waiter-id)`
/// cancellation operation.
pub struct Subscription {
	waiter_id: u64,
	entity_id: EntityId,
	registry: Registry,
	receiver: Receiver<()>,
}

impl Subscription {
	/// Blocks until the entity reaches the awaited state, or returns
	/// `false` immediately if cancelled. There is no timeout here
	/// deliberately: a stuck store write should time out at the store
	/// layer, not here.
	pub fn wait(&self) -> bool {
		self.receiver.recv().is_ok()
	}

	pub fn try_wait(&self) -> Option<bool> {
		match self.receiver.try_recv() {
			Ok(()) => Some(true),
			Err(crossbeam_channel::TryRecvError::Empty) => None,
			Err(crossbeam_channel::TryRecvError::Disconnected) => Some(false),
		}
	}

	/// The id this waiter was registered under, for callers that want
	/// to cancel through `Notifier::cancel_create`/`cancel_update`/
	/// `cancel_delete` instead of this handle directly.
	pub fn id(&self) -> u64 {
		self.waiter_id
	}

	/// Unregisters this waiter before it ever fires. A pre-event cancel
	/// guarantees the callback never runs, even if the matching CDC
	/// event arrives afterward; a no-op if the waiter already fired or
	/// was already cancelled.
	pub fn cancel(&self) {
		cancel(&self.registry, self.entity_id, self.waiter_id);
	}
}

fn subscribe(registry: &Registry, id: EntityId) -> Subscription {
	let (tx, rx) = bounded(1);
	let waiter_id = next_waiter_id();
	registry.lock().entry(id).or_default().push(Waiter { id: waiter_id, tx });
	Subscription { waiter_id, entity_id: id, registry: registry.clone(), receiver: rx }
}

fn fire(registry: &Registry, id: EntityId) {
	if let Some(waiters) = registry.lock().remove(&id) {
		for w in waiters {
			w.notify();
		}
	}
}

impl Notifier {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn await_create(&self, id: EntityId) -> Subscription {
		subscribe(&self.create, id)
	}

	pub fn await_update(&self, id: EntityId) -> Subscription {
		subscribe(&self.update, id)
	}

	pub fn await_delete(&self, id: EntityId) -> Subscription {
		subscribe(&self.delete, id)
	}

	/// Unregisters a pending create waiter by id (spec's `Delete*(id,
	/// waiter-id)`). Equivalent to calling `cancel` on the matching
	/// `Subscription`; kept here too for a caller that only carries the
	/// waiter id.
	pub fn cancel_create(&self, id: EntityId, waiter_id: u64) {
		cancel(&self.create, id, waiter_id);
	}

	pub fn cancel_update(&self, id: EntityId, waiter_id: u64) {
		cancel(&self.update, id, waiter_id);
	}

	pub fn cancel_delete(&self, id: EntityId, waiter_id: u64) {
		cancel(&self.delete, id, waiter_id);
	}
}

impl<E: Entity + Mergeable + Clone + Send + Sync> StreamListener<E> for Notifier {
	fn on_add(&self, entity: &E) {
		fire(&self.create, entity.id());
	}

	fn on_update(&self, id: EntityId, _set: &SetPatch, _unset: &UnsetPatch) {
		fire(&self.update, id);
	}

	fn on_delete(&self, id: EntityId) {
		fire(&self.delete, id);
	}
}

#[cfg(test)]
mod tests {
	use std::thread;
	use std::time::Duration;

	use super::*;

	#[derive(Clone)]
	struct Doc {
		id: EntityId,
		version: i64,
		deleted: bool,
	}

	impl Entity for Doc {
		fn id(&self) -> EntityId {
			self.id
		}
		fn version(&self) -> i64 {
			self.version
		}
		fn set_version(&mut self, version: i64) {
			self.version = version;
		}
		fn deleted(&self) -> bool {
			self.deleted
		}
		fn set_deleted(&mut self, deleted: bool) {
			self.deleted = deleted;
		}
	}

	impl Mergeable for Doc {
		fn merge_from(&mut self, _set: &SetPatch, _unset: &UnsetPatch) {}
	}

	#[test]
	fn create_waiter_wakes_on_matching_add() {
		let notifier = Notifier::new();
		let id = EntityId::generate(1);
		let sub = notifier.await_create(id);
		notifier.on_add(&Doc { id, version: 1, deleted: false });
		assert!(sub.wait());
	}

	#[test]
	fn abandoned_waiter_does_not_block_the_notifying_thread() {
		let notifier = Notifier::new();
		let id = EntityId::generate(1);
		let sub = notifier.await_create(id);
		drop(sub);
		// Firing after the subscriber has gone away must not hang: the
		// bounded(1) try_send just finds nobody listening and drops it.
		notifier.on_add(&Doc { id, version: 1, deleted: false });
	}

	#[test]
	fn waiters_are_one_shot_and_scoped_per_id() {
		let notifier = Notifier::new();
		let watched = EntityId::generate(1);
		let other = EntityId::generate(2);
		let sub = notifier.await_create(watched);
		notifier.on_add(&Doc { id: other, version: 1, deleted: false });
		assert!(sub.try_wait().is_none());
		notifier.on_add(&Doc { id: watched, version: 1, deleted: false });
		assert!(sub.wait());
	}

	#[test]
	fn wait_does_not_busy_spin_before_notification() {
		let notifier = Notifier::new();
		let id = EntityId::generate(1);
		let sub = notifier.await_create(id);
		thread::sleep(Duration::from_millis(5));
		assert!(sub.try_wait().is_none());
	}

	#[test]
	fn cancelled_waiter_never_fires_even_if_the_event_still_arrives() {
		let notifier = Notifier::new();
		let id = EntityId::generate(1);
		let sub = notifier.await_create(id);
		sub.cancel();
		notifier.on_add(&Doc { id, version: 1, deleted: false });
		assert_eq!(sub.try_wait(), Some(false));
	}

	#[test]
	fn cancelling_one_waiter_leaves_a_sibling_waiter_on_the_same_id_intact() {
		let notifier = Notifier::new();
		let id = EntityId::generate(1);
		let cancelled = notifier.await_create(id);
		let survivor = notifier.await_create(id);
		cancelled.cancel();
		notifier.on_add(&Doc { id, version: 1, deleted: false });
		assert_eq!(cancelled.try_wait(), Some(false));
		assert!(survivor.wait());
	}

	#[test]
	fn cancel_by_waiter_id_through_the_notifier_matches_subscription_cancel() {
		let notifier = Notifier::new();
		let id = EntityId::generate(1);
		let sub = notifier.await_create(id);
		notifier.cancel_create(id, sub.id());
		notifier.on_add(&Doc { id, version: 1, deleted: false });
		assert_eq!(sub.try_wait(), Some(false));
	}

	#[test]
	fn cancelling_an_already_fired_waiter_is_a_harmless_no_op() {
		let notifier = Notifier::new();
		let id = EntityId::generate(1);
		let sub = notifier.await_create(id);
		notifier.on_add(&Doc { id, version: 1, deleted: false });
		assert!(sub.wait());
		sub.cancel();
	}
}
