// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

/// Result of resolving a dotted field path against an entity.
///
/// `Absent` covers both "the path descends through an unset optional"
/// and "the path doesn't resolve to a scalar leaf" — both collapse a
/// composite key to absent, which is load-bearing for S1/S2.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
	Absent,
	Text(String),
}

impl FieldValue {
	pub fn is_absent(&self) -> bool {
		matches!(self, FieldValue::Absent)
	}

	pub fn text(&self) -> Option<&str> {
		match self {
			FieldValue::Text(s) => Some(s),
			FieldValue::Absent => None,
		}
	}
}

/// Implemented by every cached entity type. Resolves a single dotted
/// field path (e.g. `"Embed.Parent"`) to its canonical string form.
///
/// This is the Rust stand-in for the original's reflection-based
/// `getStringFieldValueByName` (`pkg/inmemory/indextools.go`): since
/// Rust has no general field-path reflection, each entity hand-resolves
/// its own paths, the same way a type hand-implements `Ord` when the
/// derive doesn't fit.
pub trait FieldAccess {
	fn field(&self, path: &str) -> FieldValue;
}

/// Canonical string form of a scalar value: decimal integer
/// for ints, lowercase `true`/`false` for bools, `%f`-style for floats,
/// identity for strings.
pub fn canonical_int(v: i64) -> String {
	v.to_string()
}

pub fn canonical_uint(v: u64) -> String {
	v.to_string()
}

pub fn canonical_bool(v: bool) -> String {
	if v { "true".to_string() } else { "false".to_string() }
}

pub fn canonical_float(v: f64) -> String {
	format!("{v:.6}")
}

/// Composes multiple field paths into one composite key: the
/// concatenation of their canonical string forms, or `Absent` if any
/// single component is absent.
pub fn extract_composite<E: FieldAccess + ?Sized>(entity: &E, paths: &[&str]) -> FieldValue {
	let mut out = String::new();
	for path in paths {
		match entity.field(path) {
			FieldValue::Absent => return FieldValue::Absent,
			FieldValue::Text(s) => out.push_str(&s),
		}
	}
	FieldValue::Text(out)
}
