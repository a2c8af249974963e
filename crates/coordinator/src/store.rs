// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use viewcache_core::{EntityId, Result, SetPatch, UnsetPatch};

/// The durable side of a cached collection: whatever actually persists a
/// write, independent of the in-process cache and its indexes.
///
/// Grounded on `pkg/mongo`'s `Creator`/`Updater`/`Remover`/`Upsert`/
/// `Searcher`, generalized from five separate Mongo-specific structs into
/// one trait so the testing crate can substitute an in-memory store
/// without pulling in a database driver.
pub trait Store<E>: Send + Sync {
	/// Inserts a brand-new document under `id` with the given fields,
	/// stamping a fresh version. Mirrors `Creator.Create`, which always
	/// overwrites (or appends) a `version` field before inserting.
	fn create(&self, id: EntityId, set: &SetPatch) -> Result<()>;

	/// Applies `set`/`unset` to the document at `id`, filtered on
	/// `expected_version` for optimistic concurrency, and stamps a fresh
	/// version. Returns whether a document matched the filter.
	///
	/// Grounded on `Updater.UpdateOne`: a mismatched version (the
	/// document moved on since the caller read it) is not itself an
	/// error, it just reports `false` so the caller can retry against a
	/// fresher read.
	fn update_one(&self, id: EntityId, expected_version: i64, set: &SetPatch, unset: &UnsetPatch) -> Result<bool>;

	/// Removes the document at `id`, returning the number removed (0 or
	/// 1). Grounded on `Remover.Remove`.
	fn remove(&self, id: EntityId) -> Result<usize>;

	/// Inserts or fully replaces the document at `id`, no version check.
	/// Grounded on `Upsert.UpsertOne`.
	fn upsert_one(&self, id: EntityId, set: &SetPatch) -> Result<()>;

	/// Batched form of `upsert_one`, grounded on `Upsert.UpsertMany`'s
	/// single bulk-write round trip.
	fn upsert_many(&self, items: &[(EntityId, SetPatch)]) -> Result<()>;

	/// Loads the full collection as typed entities, grounded on
	/// `Searcher.All`'s cursor-then-deserialize loop (there via BSON
	/// extended JSON; here the store owns whatever its own wire format
	/// is and hands back the already-typed result).
	fn all(&self) -> Result<Vec<E>>;
}
