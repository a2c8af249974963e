// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

//! The primary in-process cache, its listener fan-out, and every
//! secondary index built on top of it.

mod cache;
mod idx;
mod inverse;
mod inverse_unique;
mod listener;
mod set_ops;
mod sorted;
mod suffix;

pub use cache::PrimaryCache;
pub use idx::IndexTable;
pub use inverse::InverseIndex;
pub use inverse_unique::InverseUniqueIndex;
pub use listener::{Listener, StreamListener};
pub use set_ops::{intersect_dense, left_outer, union};
pub use sorted::SortedIndex;
pub use suffix::TrigramSuffixIndex;
