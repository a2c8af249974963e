// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An opaque byte blob. Compared and diffed by byte equality, never
/// recursed into structurally.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawBytes(pub Vec<u8>);

impl RawBytes {
	pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
		Self(bytes.into())
	}
}

impl Serialize for RawBytes {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&hex::encode(&self.0))
	}
}

impl<'de> Deserialize<'de> for RawBytes {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		use serde::de::Error;
		let s = String::deserialize(deserializer)?;
		hex::decode(&s).map(RawBytes).map_err(|e| D::Error::custom(format!("invalid raw bytes hex: {e}")))
	}
}

/// A fixed-precision decimal, compared by numeric value rather than by
/// representation.
#[derive(Clone, Debug)]
pub struct Decimal(pub BigDecimal);

impl Decimal {
	pub fn new(inner: BigDecimal) -> Self {
		Self(inner)
	}

	pub fn to_canonical_string(&self) -> String {
		self.0.normalized().to_string()
	}
}

impl PartialEq for Decimal {
	fn eq(&self, other: &Self) -> bool {
		self.0 == other.0
	}
}
impl Eq for Decimal {}

impl fmt::Display for Decimal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl Serialize for Decimal {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.0.to_string())
	}
}

impl<'de> Deserialize<'de> for Decimal {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		use serde::de::Error;
		let s = String::deserialize(deserializer)?;
		BigDecimal::from_str(&s).map(Decimal).map_err(|e| D::Error::custom(format!("invalid decimal: {e}")))
	}
}
