// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use thiserror::Error;

/// Error taxonomy for the whole pipeline.
#[derive(Debug, Error)]
pub enum Error {
	#[error("not found")]
	NotFound,

	#[error("nothing to create")]
	NothingToCreate,

	#[error("nothing to update")]
	NothingToUpdate,

	#[error("store io: {0}")]
	StoreIo(String),

	#[error("malformed cdc envelope: {0}")]
	Decode(String),

	#[error("cancelled")]
	Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
