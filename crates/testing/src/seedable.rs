// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use viewcache_core::{Entity, EntityId, Mergeable};

/// Constructs a zero-valued entity under a given id, so `InMemoryStore`
/// can materialize a full row from nothing but an id and a `SetPatch`
/// (the only things a `Store::create` call is handed).
///
/// This is deliberately not part of `viewcache_core::Entity`: the rest of
/// the pipeline never needs to conjure an entity out of thin air, only
/// the test/demo store does, so the contract lives here rather than
/// widening the trait every concrete entity type has to implement.
pub trait Seedable: Entity + Mergeable + Clone {
	fn blank(id: EntityId) -> Self;
}
