// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

/// Which secondary-index family a descriptor builds.
///
/// The original drives this off struct tags (`indexes:"kind:name"`,
/// `pkg/inmemory/builder.go`'s `InverseIndexType` family of constants);
/// here it's an explicit enum fed to `IndexPlanBuilder` by hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexKind {
	Inverse,
	InverseUnique,
	Sorted,
	Suffix,
}

/// One secondary index to build over a cached type: which field path(s)
/// to key on (`from`, composed via `extract_composite` when more than
/// one), and an optional separate field to store as the indexed value
/// (`to`) rather than the entity id itself.
#[derive(Clone, Debug)]
pub struct IndexDescriptor {
	pub kind: IndexKind,
	pub name: String,
	pub from: Vec<String>,
	pub to: Option<String>,
}

/// The full set of secondary indexes a cached type declares.
#[derive(Clone, Debug, Default)]
pub struct IndexPlan {
	pub descriptors: Vec<IndexDescriptor>,
}

impl IndexPlan {
	pub fn builder() -> IndexPlanBuilder {
		IndexPlanBuilder::default()
	}

	pub fn of_kind(&self, kind: IndexKind) -> impl Iterator<Item = &IndexDescriptor> {
		self.descriptors.iter().filter(move |d| d.kind == kind)
	}
}

/// Fluent replacement for the original's `idx{from,to}` struct-tag
/// grammar (`kind:name[:direction]`); each cached type builds its plan
/// once, typically in a `const fn`-style associated function.
#[derive(Default)]
pub struct IndexPlanBuilder {
	descriptors: Vec<IndexDescriptor>,
}

impl IndexPlanBuilder {
	fn push(mut self, kind: IndexKind, name: &str, from: &[&str], to: Option<&str>) -> Self {
		self.descriptors.push(IndexDescriptor {
			kind,
			name: name.to_string(),
			from: from.iter().map(|s| s.to_string()).collect(),
			to: to.map(|s| s.to_string()),
		});
		self
	}

	pub fn inverse(self, name: &str, from: &[&str]) -> Self {
		self.push(IndexKind::Inverse, name, from, None)
	}

	pub fn inverse_to(self, name: &str, from: &[&str], to: &str) -> Self {
		self.push(IndexKind::Inverse, name, from, Some(to))
	}

	pub fn inverse_unique(self, name: &str, from: &[&str]) -> Self {
		self.push(IndexKind::InverseUnique, name, from, None)
	}

	pub fn inverse_unique_to(self, name: &str, from: &[&str], to: &str) -> Self {
		self.push(IndexKind::InverseUnique, name, from, Some(to))
	}

	pub fn sorted(self, name: &str, from: &[&str]) -> Self {
		self.push(IndexKind::Sorted, name, from, None)
	}

	pub fn suffix(self, name: &str, from: &[&str]) -> Self {
		self.push(IndexKind::Suffix, name, from, None)
	}

	pub fn build(self) -> IndexPlan {
		IndexPlan { descriptors: self.descriptors }
	}
}
