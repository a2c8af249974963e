// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use std::collections::HashMap;

use crate::id::EntityId;

/// Contract every cached entity type satisfies: a stable id, an
/// optimistic-concurrency version stamp, and a soft-delete flag.
///
/// Grounded on `pkg/mongo/models.go`'s base document embedding (`ID`,
/// `Version`, `Deleted`) that every concrete collection document embeds.
pub trait Entity: Clone {
	fn id(&self) -> EntityId;
	fn version(&self) -> i64;
	fn set_version(&mut self, version: i64);
	fn deleted(&self) -> bool;
	fn set_deleted(&mut self, deleted: bool);
}

/// A named scalar assignment, keyed by the same dotted path vocabulary
/// `FieldAccess` resolves.
pub type SetPatch = HashMap<String, String>;

/// The set of field paths a CDC update envelope's `removedFields` named;
/// each resets the corresponding field to its zero value on merge.
pub type UnsetPatch = Vec<String>;

/// Merges a CDC update's set/unset patch into an existing cached value.
///
/// Grounded on `pkg/inmemory/cache.go`'s `Update`, which walks the
/// reflected struct applying each non-zero field from the incoming
/// document and zeroing every field named in `removedFields`; here each
/// entity owns that walk directly since there is no struct-tag
/// reflection to drive it generically.
///
/// A merge that leaves every indexed field's value unchanged is a legal
/// no-op, not an error.
pub trait Mergeable: Entity {
	fn merge_from(&mut self, set: &SetPatch, unset: &UnsetPatch);
}

/// Produces the wire-level patches a CDC consumer would later replay,
/// from old/new snapshots of the same entity.
///
/// Grounded on `pkg/mongo/processor.go`'s `PrepareCreate` (full
/// document, no removed fields) and `PrepareUpdate` (diff against the
/// previous snapshot via `isEquals`, scalar overwrite unless absent/
/// empty/all-zero).
pub trait Diffable: Entity {
	/// Full-document patch for a freshly created entity; no unset keys.
	fn prepare_create(&self) -> SetPatch;

	/// Diff from `old` (the previous snapshot) to `self` (the new one):
	/// `(changed-fields, removed-field-names)`. A field is "removed"
	/// when it held a non-zero value in `old` and now holds the zero
	/// value; fields unchanged between `old` and `self` are omitted
	/// from both, matching the original's `isEquals` skip.
	fn prepare_update(&self, old: &Self) -> (SetPatch, UnsetPatch);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Clone)]
	struct Doc {
		id: EntityId,
		version: i64,
		deleted: bool,
		width: i64,
		parent: Option<String>,
	}

	impl Entity for Doc {
		fn id(&self) -> EntityId {
			self.id
		}
		fn version(&self) -> i64 {
			self.version
		}
		fn set_version(&mut self, version: i64) {
			self.version = version;
		}
		fn deleted(&self) -> bool {
			self.deleted
		}
		fn set_deleted(&mut self, deleted: bool) {
			self.deleted = deleted;
		}
	}

	impl Mergeable for Doc {
		fn merge_from(&mut self, set: &SetPatch, unset: &UnsetPatch) {
			if let Some(w) = set.get("width") {
				self.width = w.parse().unwrap();
			}
			if let Some(p) = set.get("parent") {
				self.parent = Some(p.clone());
			}
			for field in unset {
				match field.as_str() {
					"width" => self.width = 0,
					"parent" => self.parent = None,
					_ => {}
				}
			}
		}
	}

	impl Diffable for Doc {
		fn prepare_create(&self) -> SetPatch {
			let mut set = SetPatch::new();
			set.insert("width".to_string(), self.width.to_string());
			if let Some(p) = &self.parent {
				set.insert("parent".to_string(), p.clone());
			}
			set
		}

		fn prepare_update(&self, old: &Self) -> (SetPatch, UnsetPatch) {
			let mut set = SetPatch::new();
			let mut unset = UnsetPatch::new();
			if self.width != old.width {
				if self.width == 0 {
					unset.push("width".to_string());
				} else {
					set.insert("width".to_string(), self.width.to_string());
				}
			}
			if self.parent != old.parent {
				match &self.parent {
					Some(p) => {
						set.insert("parent".to_string(), p.clone());
					}
					None => unset.push("parent".to_string()),
				}
			}
			(set, unset)
		}
	}

	fn fixture() -> Doc {
		Doc { id: EntityId::generate(1), version: 1, deleted: false, width: 100, parent: None }
	}

	#[test]
	fn no_op_merge_when_unchanged() {
		let mut doc = fixture();
		let before = doc.width;
		doc.merge_from(&SetPatch::new(), &UnsetPatch::new());
		assert_eq!(doc.width, before);
	}

	#[test]
	fn prepare_update_omits_unchanged_fields() {
		let old = fixture();
		let mut new = old.clone();
		new.width = 200;
		let (set, unset) = new.prepare_update(&old);
		assert_eq!(set.get("width"), Some(&"200".to_string()));
		assert!(unset.is_empty());
	}

	#[test]
	fn prepare_update_unsets_fields_gone_to_zero() {
		let mut old = fixture();
		old.width = 50;
		let mut new = old.clone();
		new.width = 0;
		let (set, unset) = new.prepare_update(&old);
		assert!(set.get("width").is_none());
		assert_eq!(unset, vec!["width".to_string()]);
	}
}
