// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use viewcache_core::{Entity, EntityId, FieldAccess, FieldValue, Mergeable, SetPatch, UnsetPatch, extract_composite};

use crate::cache::PrimaryCache;
use crate::listener::StreamListener;

pub(crate) fn patch_key(from: &[String], set: &SetPatch) -> Option<String> {
	let mut out = String::new();
	for path in from {
		out.push_str(set.get(path)?);
	}
	Some(out)
}

pub(crate) fn entity_key<E: FieldAccess>(entity: &E, from: &[String]) -> Option<String> {
	let paths: Vec<&str> = from.iter().map(String::as_str).collect();
	match extract_composite(entity, &paths) {
		FieldValue::Text(s) => Some(s),
		FieldValue::Absent => None,
	}
}

pub(crate) fn posting_value<E: Entity + FieldAccess>(entity: &E, to: Option<&str>) -> String {
	match to {
		Some(path) => match entity.field(path) {
			FieldValue::Text(s) if !s.is_empty() => s,
			_ => entity.id().to_hex(),
		},
		None => entity.id().to_hex(),
	}
}

/// Multi-valued secondary index: field value -> every entity that has
/// it, grounded on `pkg/inmemory/inverseindex.go`.
///
/// Entities whose composed key is absent (any `from` component resolves
/// to `FieldValue::Absent`) live in `nil_bucket` rather than under some
/// placeholder key in `data` — `data` never has an entry for the empty
/// string. `IndexMap` rather than `HashMap` so a bucket's posting order
/// reflects insertion order, matching the original's append-only slice.
pub struct InverseIndex<E> {
	data: RwLock<IndexMap<String, Vec<String>>>,
	nil_bucket: RwLock<Vec<String>>,
	cache: Arc<PrimaryCache<E>>,
	from: Vec<String>,
	to: Option<String>,
}

impl<E: Entity + Mergeable + FieldAccess + Clone> InverseIndex<E> {
	pub fn new(cache: Arc<PrimaryCache<E>>, from: Vec<String>, to: Option<String>) -> Self {
		Self { data: RwLock::new(IndexMap::new()), nil_bucket: RwLock::new(Vec::new()), cache, from, to }
	}

	pub fn get(&self, val: &str) -> Vec<String> {
		self.data.read().get(val).cloned().unwrap_or_default()
	}

	/// The postings for entities whose composed key is absent.
	pub fn get_nil(&self) -> Vec<String> {
		self.nil_bucket.read().clone()
	}
}

impl<E: Entity + Mergeable + FieldAccess + Clone + Send + Sync> StreamListener<E> for InverseIndex<E> {
	fn on_add(&self, entity: &E) {
		let value = posting_value(entity, self.to.as_deref());
		match entity_key(entity, &self.from) {
			Some(key) => {
				let mut data = self.data.write();
				let postings = data.entry(key).or_default();
				if !postings.contains(&value) {
					postings.push(value);
				}
			}
			None => {
				let mut nil_bucket = self.nil_bucket.write();
				if !nil_bucket.contains(&value) {
					nil_bucket.push(value);
				}
			}
		}
	}

	fn on_update(&self, id: EntityId, set: &SetPatch, unset: &UnsetPatch) {
		// "Patch doesn't mention any from field" is a no-op (don't even
		// read old state). Otherwise the transition is driven by where
		// the posting lives before and after: `data[k]` when the
		// composed key resolves, `nil_bucket` when it doesn't.
		let touches_from = self.from.iter().any(|p| set.contains_key(p) || unset.iter().any(|u| u == p));
		if !touches_from {
			return;
		}
		let Some(old) = self.cache.get(id) else { return };
		let old_key = entity_key(&old, &self.from);
		let new_key = patch_key(&self.from, set);
		let value = posting_value(&old, self.to.as_deref());

		match (old_key, new_key) {
			// Neither before nor after state has a composed key: the
			// posting was never in `data` and isn't moving out of
			// `nil_bucket` either.
			(None, None) => {}
			// Was in the nil-bucket, the patch now supplies every
			// `from` component: move it into `data[new_key]`.
			(None, Some(new_key)) => {
				self.nil_bucket.write().retain(|v| v != &value);
				let mut data = self.data.write();
				let postings = data.entry(new_key).or_default();
				if !postings.contains(&value) {
					postings.push(value);
				}
			}
			// Was keyed, the patch nulls a `from` component without
			// resupplying the rest: move it into the nil-bucket.
			(Some(old_key), None) => {
				if let Some(postings) = self.data.write().get_mut(&old_key) {
					postings.retain(|v| v != &value);
				}
				let mut nil_bucket = self.nil_bucket.write();
				if !nil_bucket.contains(&value) {
					nil_bucket.push(value);
				}
			}
			// Keyed both before and after: ordinary re-bucketing.
			(Some(old_key), Some(new_key)) => {
				let mut data = self.data.write();
				if let Some(postings) = data.get_mut(&old_key) {
					postings.retain(|v| v != &value);
				}
				let postings = data.entry(new_key).or_default();
				if !postings.contains(&value) {
					postings.push(value);
				}
			}
		}
	}

	fn on_delete(&self, id: EntityId) {
		let Some(old) = self.cache.get(id) else { return };
		let value = posting_value(&old, self.to.as_deref());
		match entity_key(&old, &self.from) {
			Some(old_key) => {
				if let Some(postings) = self.data.write().get_mut(&old_key) {
					postings.retain(|v| v != &value);
				}
			}
			None => {
				self.nil_bucket.write().retain(|v| v != &value);
			}
		}
	}
}
