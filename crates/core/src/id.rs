// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Stable entity identity. 12 bytes, rendered as 24 lowercase hex
/// characters, matching the document store's `primitive.ObjectID`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId([u8; 12]);

impl EntityId {
	pub const ZERO: EntityId = EntityId([0; 12]);

	pub fn from_bytes(bytes: [u8; 12]) -> Self {
		Self(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; 12] {
		&self.0
	}

	pub fn is_zero(&self) -> bool {
		self.0 == [0; 12]
	}

	/// Generates a fresh id from a monotonic counter plus a random tail,
	/// sufficient for tests and the in-memory store; a real store
	/// adapter would mint ids the way the upstream document store does.
	pub fn generate(counter: u64) -> Self {
		let mut bytes = [0u8; 12];
		bytes[..8].copy_from_slice(&counter.to_be_bytes());
		let tail = uuid::Uuid::new_v4();
		bytes[8..].copy_from_slice(&tail.as_bytes()[..4]);
		Self(bytes)
	}

	pub fn to_hex(&self) -> String {
		hex::encode(self.0)
	}

	pub fn from_hex(s: &str) -> Option<Self> {
		let bytes = hex::decode(s).ok()?;
		let array: [u8; 12] = bytes.try_into().ok()?;
		Some(Self(array))
	}
}

impl fmt::Debug for EntityId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "EntityId({})", self.to_hex())
	}
}

impl fmt::Display for EntityId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.to_hex())
	}
}

impl Serialize for EntityId {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_hex())
	}
}

/// Accepts either a plain 24-hex-character string or MongoDB extended
/// JSON's `{"$oid": "..."}` wrapper, since a `fullDocument` may arrive
/// in either shape depending on how the upstream store serializes it.
impl<'de> Deserialize<'de> for EntityId {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		use serde::de::Error;

		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Repr {
			Hex(String),
			Oid { #[serde(rename = "$oid")] oid: String },
		}

		let hex = match Repr::deserialize(deserializer)? {
			Repr::Hex(s) => s,
			Repr::Oid { oid } => oid,
		};
		EntityId::from_hex(&hex).ok_or_else(|| D::Error::custom(format!("invalid entity id hex: {hex}")))
	}
}
