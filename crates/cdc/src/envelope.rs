// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use serde::de::DeserializeOwned;
use serde_json::Value;
use viewcache_core::{EntityId, Error, Result, SetPatch, UnsetPatch};

/// A decoded change event, grounded on `pkg/mongo/listener.go`'s
/// `StreamInsert`/`StreamUpdate`/`StreamDelete` trio and the
/// `operationType` dispatch that picks among them.
pub enum CdcEvent<T> {
	Insert { full_document: T },
	Update { id: EntityId, set: SetPatch, unset: UnsetPatch },
	Delete { id: EntityId },
}

fn document_key_id(value: &Value) -> Result<EntityId> {
	let raw = value
		.get("documentKey")
		.and_then(|k| k.get("_id"))
		.ok_or_else(|| Error::Decode("missing documentKey._id".to_string()))?;
	let hex = match raw {
		Value::String(s) => s.as_str(),
		Value::Object(map) => map.get("$oid").and_then(Value::as_str).ok_or_else(|| Error::Decode("malformed $oid".to_string()))?,
		_ => return Err(Error::Decode("documentKey._id is neither a string nor $oid".to_string())),
	};
	EntityId::from_hex(hex).ok_or_else(|| Error::Decode(format!("invalid entity id hex: {hex}")))
}

/// Canonical string form of a decoded JSON scalar: this is
/// the wire-side mirror of `viewcache_core::field`'s canonicalization,
/// since `updatedFields` arrives as loosely-typed JSON rather than as
/// the strongly-typed entity the rest of the pipeline works with.
fn canonicalize(value: &Value) -> Option<String> {
	match value {
		Value::Null => None,
		Value::Bool(b) => Some(if *b { "true".to_string() } else { "false".to_string() }),
		Value::Number(n) => Some(n.to_string()),
		Value::String(s) => Some(s.clone()),
		Value::Array(_) | Value::Object(_) => Some(value.to_string()),
	}
}

fn set_patch_from_updated_fields(value: &Value) -> SetPatch {
	let mut set = SetPatch::new();
	if let Some(Value::Object(fields)) = value.get("updateDescription").and_then(|d| d.get("updatedFields")) {
		for (path, v) in fields {
			if let Some(canonical) = canonicalize(v) {
				set.insert(path.clone(), canonical);
			}
		}
	}
	set
}

fn unset_patch_from_removed_fields(value: &Value) -> UnsetPatch {
	value
		.get("updateDescription")
		.and_then(|d| d.get("removedFields"))
		.and_then(Value::as_array)
		.map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect())
		.unwrap_or_default()
}

/// Decodes one CDC envelope into a typed event. Grounded on
/// `pkg/mongo/listener.go`'s `Listener.Listen`: dispatch on
/// `operationType`, decode the matching shape.
pub fn decode_envelope<T: DeserializeOwned>(bytes: &[u8]) -> Result<CdcEvent<T>> {
	let value: Value = serde_json::from_slice(bytes).map_err(|e| Error::Decode(e.to_string()))?;
	let op = value.get("operationType").and_then(Value::as_str).ok_or_else(|| Error::Decode("missing operationType".to_string()))?;
	match op {
		"insert" => {
			let full_document: T = value
				.get("fullDocument")
				.cloned()
				.ok_or_else(|| Error::Decode("missing fullDocument".to_string()))
				.and_then(|v| serde_json::from_value(v).map_err(|e| Error::Decode(e.to_string())))?;
			Ok(CdcEvent::Insert { full_document })
		}
		"update" => {
			let id = document_key_id(&value)?;
			let set = set_patch_from_updated_fields(&value);
			let unset = unset_patch_from_removed_fields(&value);
			Ok(CdcEvent::Update { id, set, unset })
		}
		"delete" => {
			let id = document_key_id(&value)?;
			Ok(CdcEvent::Delete { id })
		}
		other => Err(Error::Decode(format!("unknown operationType: {other}"))),
	}
}
