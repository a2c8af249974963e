// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use std::sync::Arc;

use viewcache_cdc::Pipeline;
use viewcache_core::{Diffable, Entity, EntityId, Error, FieldAccess, Mergeable, Result, SetPatch};

use crate::store::Store;

/// Gives a writer read-your-writes against the cache without the writer
/// ever touching the cache directly: it stamps a diff, hands it to the
/// `Store`, and blocks until the CDC loop has replayed the matching event
/// through the `Pipeline`.
///
/// Grounded on `pkg/mongo/processor.go`'s `Create`/`Update`/`Delete`, with
/// the await machinery bolted on per the awaiting-writer flow: register
/// the waiter *before* issuing the write, so the write can never complete
/// and get replayed in the gap between write and registration.
pub struct Coordinator<E> {
	pipeline: Arc<Pipeline<E>>,
	store: Arc<dyn Store<E>>,
}

impl<E> Coordinator<E>
where
	E: Entity + Mergeable + Diffable + FieldAccess + Clone + Send + Sync + 'static,
{
	pub fn new(pipeline: Arc<Pipeline<E>>, store: Arc<dyn Store<E>>) -> Self {
		Self { pipeline, store }
	}

	/// The cache a reader should query after a successful write; writers
	/// never need it, since `create`/`update`/`delete` already block
	/// until their own effect is visible here.
	pub fn pipeline(&self) -> &Arc<Pipeline<E>> {
		&self.pipeline
	}

	/// Creates `entity`, whose id the caller has already minted (there is
	/// no server-assigned id to learn back, unlike the original Mongo
	/// flow: the id is chosen up front so the waiter can be registered
	/// against it before the write is issued at all).
	///
	/// `entity` is always created not-deleted, matching `Processor.Create`
	/// forcing `SetDeleted(false)` regardless of what the caller passed.
	pub fn create(&self, entity: E) -> Result<EntityId> {
		let mut entity = entity;
		entity.set_deleted(false);
		let set = entity.prepare_create();
		if set.is_empty() {
			return Err(Error::NothingToCreate);
		}

		let id = entity.id();
		let sub = self.pipeline.await_create(id);
		if let Err(err) = self.store.create(id, &set) {
			sub.cancel();
			return Err(err);
		}
		if !sub.wait() {
			return Err(Error::Cancelled);
		}
		Ok(id)
	}

	/// Diffs `new` against `old` and applies only the changed fields.
	///
	/// An empty diff is not an error: the caller's intent already holds,
	/// so this returns `Ok(())` without registering a waiter or touching
	/// the store at all.
	pub fn update(&self, old: &E, new: &E) -> Result<()> {
		let (set, unset) = new.prepare_update(old);
		if set.is_empty() && unset.is_empty() {
			return Ok(());
		}

		let id = new.id();
		let sub = self.pipeline.await_update(id);
		match self.store.update_one(id, old.version(), &set, &unset) {
			Ok(true) => {}
			Ok(false) => {
				sub.cancel();
				return Err(Error::NotFound);
			}
			Err(err) => {
				sub.cancel();
				return Err(err);
			}
		}
		if !sub.wait() {
			return Err(Error::Cancelled);
		}
		Ok(())
	}

	pub fn delete(&self, id: EntityId) -> Result<()> {
		let sub = self.pipeline.await_delete(id);
		match self.store.remove(id) {
			Ok(removed) if removed > 0 => {}
			Ok(_) => {
				sub.cancel();
				return Err(Error::NotFound);
			}
			Err(err) => {
				sub.cancel();
				return Err(err);
			}
		}
		if !sub.wait() {
			return Err(Error::Cancelled);
		}
		Ok(())
	}

	/// Inserts or replaces `id` with `set` directly, no diffing and no
	/// await — grounded on `Upsert.UpsertOne`, a separate bulk-loading
	/// path the original wires independently of `Processor`.
	pub fn upsert_one(&self, id: EntityId, set: SetPatch) -> Result<()> {
		self.store.upsert_one(id, &set)
	}

	pub fn upsert_many(&self, items: Vec<(EntityId, SetPatch)>) -> Result<()> {
		self.store.upsert_many(&items)
	}

	pub fn all(&self) -> Result<Vec<E>> {
		self.store.all()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Mutex as StdMutex;

	use viewcache_core::{FieldValue, IndexPlan, UnsetPatch};
	use viewcache_index::StreamListener;

	use super::*;

	#[derive(Clone)]
	struct Doc {
		id: EntityId,
		version: i64,
		deleted: bool,
		title: String,
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
		fn merge_from(&mut self, set: &SetPatch, unset: &UnsetPatch) {
			if let Some(t) = set.get("title") {
				self.title = t.clone();
			}
			if unset.iter().any(|f| f == "title") {
				self.title.clear();
			}
		}
	}

	impl FieldAccess for Doc {
		fn field(&self, path: &str) -> FieldValue {
			match path {
				"title" => FieldValue::Text(self.title.clone()),
				_ => FieldValue::Absent,
			}
		}
	}

	impl Diffable for Doc {
		fn prepare_create(&self) -> SetPatch {
			let mut set = SetPatch::new();
			set.insert("title".to_string(), self.title.clone());
			set
		}

		fn prepare_update(&self, old: &Self) -> (SetPatch, UnsetPatch) {
			let mut set = SetPatch::new();
			if self.title != old.title {
				set.insert("title".to_string(), self.title.clone());
			}
			(set, UnsetPatch::new())
		}
	}

	/// A `Store` double that feeds every write straight back into the
	/// pipeline, standing in for a real CDC consumer so these tests can
	/// exercise await-coordination without a background thread.
	struct LoopbackStore {
		pipeline: Arc<Pipeline<Doc>>,
		rows: StdMutex<Vec<Doc>>,
	}

	impl LoopbackStore {
		fn new(pipeline: Arc<Pipeline<Doc>>) -> Self {
			Self { pipeline, rows: StdMutex::new(Vec::new()) }
		}
	}

	impl Store<Doc> for LoopbackStore {
		fn create(&self, id: EntityId, set: &SetPatch) -> Result<()> {
			let title = set.get("title").cloned().unwrap_or_default();
			let doc = Doc { id, version: 1, deleted: false, title };
			self.rows.lock().unwrap().push(doc.clone());
			self.pipeline.add(doc);
			Ok(())
		}

		fn update_one(&self, id: EntityId, _expected_version: i64, set: &SetPatch, unset: &UnsetPatch) -> Result<bool> {
			let mut rows = self.rows.lock().unwrap();
			let Some(row) = rows.iter_mut().find(|r| r.id == id) else {
				return Ok(false);
			};
			row.merge_from(set, unset);
			row.version += 1;
			self.pipeline.update(id, set.clone(), unset.clone());
			Ok(true)
		}

		fn remove(&self, id: EntityId) -> Result<usize> {
			let mut rows = self.rows.lock().unwrap();
			let before = rows.len();
			rows.retain(|r| r.id != id);
			let removed = before - rows.len();
			if removed > 0 {
				self.pipeline.delete(id);
			}
			Ok(removed)
		}

		fn upsert_one(&self, id: EntityId, set: &SetPatch) -> Result<()> {
			self.create(id, set)
		}

		fn upsert_many(&self, items: &[(EntityId, SetPatch)]) -> Result<()> {
			for (id, set) in items {
				self.upsert_one(*id, set)?;
			}
			Ok(())
		}

		fn all(&self) -> Result<Vec<Doc>> {
			Ok(self.rows.lock().unwrap().clone())
		}
	}

	fn coordinator() -> Coordinator<Doc> {
		let pipeline = Arc::new(Pipeline::new(&IndexPlan::default()));
		let store = Arc::new(LoopbackStore::new(pipeline.clone()));
		Coordinator::new(pipeline, store)
	}

	#[test]
	fn create_is_visible_in_the_cache_immediately_after_returning() {
		let coordinator = coordinator();
		let id = EntityId::generate(1);
		let created = coordinator.create(Doc { id, version: 0, deleted: false, title: "first".into() }).unwrap();
		assert_eq!(created, id);
		assert_eq!(coordinator.pipeline.get(id).unwrap().title, "first");
	}

	#[test]
	fn update_with_no_changed_fields_succeeds_without_touching_the_store() {
		let coordinator = coordinator();
		let id = EntityId::generate(1);
		let old = Doc { id, version: 0, deleted: false, title: "same".into() };
		coordinator.create(old.clone()).unwrap();
		let new = old.clone();
		assert!(coordinator.update(&old, &new).is_ok());
	}

	#[test]
	fn update_applies_the_diff_and_is_visible_after_returning() {
		let coordinator = coordinator();
		let id = EntityId::generate(1);
		let old = Doc { id, version: 0, deleted: false, title: "before".into() };
		coordinator.create(old.clone()).unwrap();
		let old = coordinator.pipeline.get(id).unwrap();
		let mut new = old.clone();
		new.title = "after".into();
		coordinator.update(&old, &new).unwrap();
		assert_eq!(coordinator.pipeline.get(id).unwrap().title, "after");
	}

	#[test]
	fn update_against_a_missing_row_is_not_found() {
		let coordinator = coordinator();
		let old = Doc { id: EntityId::generate(1), version: 0, deleted: false, title: "a".into() };
		let mut new = old.clone();
		new.title = "b".into();
		assert!(matches!(coordinator.update(&old, &new), Err(Error::NotFound)));
	}

	#[test]
	fn delete_removes_the_entity_from_the_cache() {
		let coordinator = coordinator();
		let id = EntityId::generate(1);
		coordinator.create(Doc { id, version: 0, deleted: false, title: "x".into() }).unwrap();
		coordinator.delete(id).unwrap();
		assert!(coordinator.pipeline.get(id).is_none());
	}

	#[test]
	fn delete_of_an_unknown_id_is_not_found() {
		let coordinator = coordinator();
		assert!(matches!(coordinator.delete(EntityId::generate(99)), Err(Error::NotFound)));
	}

	/// Fails the first `create` call, then behaves like `LoopbackStore`.
	/// Stands in for a transient store error arriving after the waiter
	/// has already been registered.
	struct FailOnceStore {
		inner: LoopbackStore,
		failed_once: StdMutex<bool>,
	}

	impl FailOnceStore {
		fn new(pipeline: Arc<Pipeline<Doc>>) -> Self {
			Self { inner: LoopbackStore::new(pipeline), failed_once: StdMutex::new(false) }
		}
	}

	impl Store<Doc> for FailOnceStore {
		fn create(&self, id: EntityId, set: &SetPatch) -> Result<()> {
			let mut failed_once = self.failed_once.lock().unwrap();
			if !*failed_once {
				*failed_once = true;
				return Err(Error::NothingToCreate);
			}
			self.inner.create(id, set)
		}

		fn update_one(&self, id: EntityId, expected_version: i64, set: &SetPatch, unset: &UnsetPatch) -> Result<bool> {
			self.inner.update_one(id, expected_version, set, unset)
		}

		fn remove(&self, id: EntityId) -> Result<usize> {
			self.inner.remove(id)
		}

		fn upsert_one(&self, id: EntityId, set: &SetPatch) -> Result<()> {
			self.inner.upsert_one(id, set)
		}

		fn upsert_many(&self, items: &[(EntityId, SetPatch)]) -> Result<()> {
			self.inner.upsert_many(items)
		}

		fn all(&self) -> Result<Vec<Doc>> {
			self.inner.all()
		}
	}

	#[test]
	fn a_store_error_during_create_unregisters_the_waiter_instead_of_leaking_it() {
		let pipeline = Arc::new(Pipeline::new(&IndexPlan::default()));
		let store = Arc::new(FailOnceStore::new(pipeline.clone()));
		let coordinator = Coordinator::new(pipeline, store);
		let id = EntityId::generate(1);

		let doc = Doc { id, version: 0, deleted: false, title: "first".into() };
		assert!(coordinator.create(doc.clone()).is_err());

		// If the failed attempt's waiter had leaked, this retry would
		// register a second waiter for the same id; both would need to
		// fire correctly and the first must never be observed again.
		let created = coordinator.create(doc).unwrap();
		assert_eq!(created, id);
		assert_eq!(coordinator.pipeline.get(id).unwrap().title, "first");
	}
}
