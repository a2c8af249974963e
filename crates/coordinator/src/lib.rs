// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

//! The `Store` trait a durable backend implements, and the `Coordinator`
//! that gives writers a synchronous read-your-writes view by blocking on
//! the CDC loop's own replay of the write it just issued.

mod coordinator;
mod store;

pub use coordinator::Coordinator;
pub use store::Store;
