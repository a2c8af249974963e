// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

//! In-memory `Store` implementation, a demo `Document` entity, and the
//! `Seedable` trait the store needs to materialize rows from nothing but
//! an id and a patch. Exists to exercise the cache end to end without a
//! real document store or change stream behind it.

mod document;
mod seedable;
mod store;

pub use document::{Document, index_plan};
pub use seedable::Seedable;
pub use store::{InMemoryStore, OutboxSource};
