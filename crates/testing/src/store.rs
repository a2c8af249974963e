// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use std::collections::{HashMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::json;
use tracing::debug;
use viewcache_cdc::CdcSource;
use viewcache_core::{Entity, EntityId, Error, Result, SetPatch, UnsetPatch};

use crate::seedable::Seedable;

fn now_nanos() -> i64 {
	SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before unix epoch").as_nanos() as i64
}

fn insert_envelope<E: Serialize>(entity: &E) -> Vec<u8> {
	json!({"operationType": "insert", "fullDocument": entity}).to_string().into_bytes()
}

fn update_envelope(id: EntityId, set: &SetPatch, unset: &UnsetPatch) -> Vec<u8> {
	json!({
		"operationType": "update",
		"documentKey": {"_id": id.to_hex()},
		"updateDescription": {"updatedFields": set, "removedFields": unset},
	})
	.to_string()
	.into_bytes()
}

fn delete_envelope(id: EntityId) -> Vec<u8> {
	json!({"operationType": "delete", "documentKey": {"_id": id.to_hex()}}).to_string().into_bytes()
}

/// An in-process stand-in for the document store, grounded on
/// `pkg/mongo`'s `Creator`/`Updater`/`Remover`/`Upsert`/`Searcher` quintet
/// collapsed into one `Store` implementor. Every mutating call also
/// appends the CDC envelope bytes a real change stream would have
/// produced to an internal outbox; `source()` hands out a `CdcSource`
/// that drains it, so a `CdcConsumer` can be pointed at this store the
/// same way it would be pointed at a real change stream.
pub struct InMemoryStore<E> {
	rows: RwLock<HashMap<EntityId, E>>,
	outbox: Mutex<VecDeque<Vec<u8>>>,
}

impl<E: Seedable> InMemoryStore<E> {
	pub fn new() -> Self {
		Self { rows: RwLock::new(HashMap::new()), outbox: Mutex::new(VecDeque::new()) }
	}

	fn push(&self, envelope: Vec<u8>) {
		self.outbox.lock().push_back(envelope);
	}

	fn drain(&self) -> Option<Vec<u8>> {
		self.outbox.lock().pop_front()
	}
}

impl<E: Seedable> Default for InMemoryStore<E> {
	fn default() -> Self {
		Self::new()
	}
}

impl<E: Seedable + Serialize + Send + Sync> viewcache_coordinator::Store<E> for InMemoryStore<E> {
	fn create(&self, id: EntityId, set: &SetPatch) -> Result<()> {
		let mut rows = self.rows.write();
		if rows.contains_key(&id) {
			return Err(Error::StoreIo(format!("duplicate id {id}")));
		}
		let mut entity = E::blank(id);
		entity.set_version(now_nanos());
		entity.merge_from(set, &UnsetPatch::new());
		debug!(%id, "store: create");
		self.push(insert_envelope(&entity));
		rows.insert(id, entity);
		Ok(())
	}

	fn update_one(&self, id: EntityId, expected_version: i64, set: &SetPatch, unset: &UnsetPatch) -> Result<bool> {
		let mut rows = self.rows.write();
		let Some(row) = rows.get_mut(&id) else {
			return Ok(false);
		};
		if row.version() != expected_version {
			debug!(%id, expected_version, actual_version = row.version(), "store: version mismatch, matched none");
			return Ok(false);
		}
		row.set_version(now_nanos());
		row.merge_from(set, unset);
		self.push(update_envelope(id, set, unset));
		Ok(true)
	}

	fn remove(&self, id: EntityId) -> Result<usize> {
		let mut rows = self.rows.write();
		if rows.remove(&id).is_some() {
			self.push(delete_envelope(id));
			Ok(1)
		} else {
			Ok(0)
		}
	}

	fn upsert_one(&self, id: EntityId, set: &SetPatch) -> Result<()> {
		let mut rows = self.rows.write();
		let mut entity = rows.remove(&id).unwrap_or_else(|| E::blank(id));
		entity.set_version(now_nanos());
		entity.merge_from(set, &UnsetPatch::new());
		self.push(insert_envelope(&entity));
		rows.insert(id, entity);
		Ok(())
	}

	fn upsert_many(&self, items: &[(EntityId, SetPatch)]) -> Result<()> {
		for (id, set) in items {
			self.upsert_one(*id, set)?;
		}
		Ok(())
	}

	fn all(&self) -> Result<Vec<E>> {
		Ok(self.rows.read().values().cloned().collect())
	}
}

/// Drains `InMemoryStore`'s outbox; handed to a `CdcConsumer` in place
/// of a real change-stream cursor.
pub struct OutboxSource<E> {
	store: std::sync::Arc<InMemoryStore<E>>,
}

impl<E: Seedable> OutboxSource<E> {
	pub fn new(store: std::sync::Arc<InMemoryStore<E>>) -> Self {
		Self { store }
	}
}

impl<E: Seedable + Send + Sync + 'static> CdcSource for OutboxSource<E> {
	fn try_next(&mut self) -> Option<Vec<u8>> {
		self.store.drain()
	}
}
