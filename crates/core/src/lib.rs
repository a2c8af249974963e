// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

//! Entity contract shared by every cached type: stable identity, opaque
//! leaf values, field-path resolution, and the index-descriptor schema
//! that secondary indexes are built from.

mod entity;
mod error;
mod field;
mod id;
mod index_plan;
mod value;

pub use entity::{Diffable, Entity, Mergeable, SetPatch, UnsetPatch};
pub use error::{Error, Result};
pub use field::{FieldAccess, FieldValue, extract_composite};
pub use id::EntityId;
pub use index_plan::{IndexDescriptor, IndexKind, IndexPlan, IndexPlanBuilder};
pub use value::{Decimal, RawBytes};
