// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use serde::{Deserialize, Serialize};
use viewcache_core::{Decimal, Diffable, Entity, EntityId, FieldAccess, FieldValue, IndexPlan, Mergeable, RawBytes, SetPatch, UnsetPatch};

use crate::seedable::Seedable;

/// A demo entity exercising every leaf kind the cache has to diff and
/// merge: plain scalars, an optional parent (inverse index), a composite
/// unique key, sortable/searchable text, and the two opaque leaf types
/// (§9 "opaque types" — `price` never gets compared field-by-field, only
/// by numeric value; `thumbnail` only by byte equality).
///
/// Grounded on `pkg/mongo/models.go`'s base document plus a handful of
/// representative collection fields, collapsed into one type since this
/// crate exists to exercise the pipeline, not to model a real domain.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
	#[serde(rename = "_id")]
	pub id: EntityId,
	pub version: i64,
	#[serde(default)]
	pub deleted: bool,
	#[serde(default)]
	pub parent: Option<String>,
	#[serde(default)]
	pub orig: String,
	#[serde(default)]
	pub width: i64,
	#[serde(default)]
	pub height: i64,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub price: Option<Decimal>,
	#[serde(default)]
	pub thumbnail: Option<RawBytes>,
}

impl Entity for Document {
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

impl Seedable for Document {
	fn blank(id: EntityId) -> Self {
		Self { id, version: 0, deleted: false, parent: None, orig: String::new(), width: 0, height: 0, title: String::new(), price: None, thumbnail: None }
	}
}

impl Mergeable for Document {
	fn merge_from(&mut self, set: &SetPatch, unset: &UnsetPatch) {
		if let Some(v) = set.get("parent") {
			self.parent = Some(v.clone());
		}
		if let Some(v) = set.get("orig") {
			self.orig = v.clone();
		}
		if let Some(v) = set.get("width") {
			self.width = v.parse().unwrap_or(0);
		}
		if let Some(v) = set.get("height") {
			self.height = v.parse().unwrap_or(0);
		}
		if let Some(v) = set.get("title") {
			self.title = v.clone();
		}
		if let Some(v) = set.get("deleted") {
			self.deleted = v == "true";
		}
		if let Some(v) = set.get("price") {
			self.price = v.parse::<bigdecimal::BigDecimal>().ok().map(Decimal::new);
		}
		if let Some(v) = set.get("thumbnail") {
			self.thumbnail = hex::decode(v).ok().map(RawBytes::new);
		}
		for field in unset {
			match field.as_str() {
				"parent" => self.parent = None,
				"orig" => self.orig.clear(),
				"width" => self.width = 0,
				"height" => self.height = 0,
				"title" => self.title.clear(),
				"price" => self.price = None,
				"thumbnail" => self.thumbnail = None,
				_ => {}
			}
		}
	}
}

impl FieldAccess for Document {
	fn field(&self, path: &str) -> FieldValue {
		match path {
			"parent" => self.parent.clone().map(FieldValue::Text).unwrap_or(FieldValue::Absent),
			"orig" => if self.orig.is_empty() { FieldValue::Absent } else { FieldValue::Text(self.orig.clone()) },
			"width" => FieldValue::Text(self.width.to_string()),
			"height" => FieldValue::Text(self.height.to_string()),
			"title" => if self.title.is_empty() { FieldValue::Absent } else { FieldValue::Text(self.title.clone()) },
			_ => FieldValue::Absent,
		}
	}
}

impl Diffable for Document {
	fn prepare_create(&self) -> SetPatch {
		let mut set = SetPatch::new();
		if let Some(p) = &self.parent {
			set.insert("parent".to_string(), p.clone());
		}
		if !self.orig.is_empty() {
			set.insert("orig".to_string(), self.orig.clone());
		}
		if self.width != 0 {
			set.insert("width".to_string(), self.width.to_string());
		}
		if self.height != 0 {
			set.insert("height".to_string(), self.height.to_string());
		}
		if !self.title.is_empty() {
			set.insert("title".to_string(), self.title.clone());
		}
		if self.deleted {
			set.insert("deleted".to_string(), "true".to_string());
		}
		if let Some(price) = &self.price {
			set.insert("price".to_string(), price.to_canonical_string());
		}
		if let Some(thumb) = &self.thumbnail {
			set.insert("thumbnail".to_string(), hex::encode(&thumb.0));
		}
		set
	}

	fn prepare_update(&self, old: &Self) -> (SetPatch, UnsetPatch) {
		let mut set = SetPatch::new();
		let mut unset = UnsetPatch::new();

		macro_rules! diff_string {
			($field:ident) => {
				if self.$field != old.$field {
					if self.$field.is_empty() {
						unset.push(stringify!($field).to_string());
					} else {
						set.insert(stringify!($field).to_string(), self.$field.clone());
					}
				}
			};
		}
		diff_string!(orig);
		diff_string!(title);

		if self.width != old.width {
			if self.width == 0 {
				unset.push("width".to_string());
			} else {
				set.insert("width".to_string(), self.width.to_string());
			}
		}
		if self.height != old.height {
			if self.height == 0 {
				unset.push("height".to_string());
			} else {
				set.insert("height".to_string(), self.height.to_string());
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
		if self.deleted != old.deleted {
			set.insert("deleted".to_string(), self.deleted.to_string());
		}
		if self.price != old.price {
			match &self.price {
				Some(price) => {
					set.insert("price".to_string(), price.to_canonical_string());
				}
				None => unset.push("price".to_string()),
			}
		}
		if self.thumbnail != old.thumbnail {
			match &self.thumbnail {
				Some(thumb) => {
					set.insert("thumbnail".to_string(), hex::encode(&thumb.0));
				}
				None => unset.push("thumbnail".to_string()),
			}
		}

		(set, unset)
	}
}

/// The index plan a caller wires a `Pipeline<Document>` with: a
/// multi-valued parent index, a composite unique (orig, width, height)
/// key, a sorted title index, and a trigram search index over the title.
pub fn index_plan() -> IndexPlan {
	IndexPlan::builder()
		.inverse("by_parent", &["parent"])
		.inverse_unique("by_dimensions", &["orig", "width", "height"])
		.sorted("by_title", &["title"])
		.suffix("search", &["title"])
		.build()
}
