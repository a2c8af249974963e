// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use std::sync::Arc;
use std::time::Duration;

use viewcache_cdc::{CdcConsumer, Pipeline, PollConsumerConfig};
use viewcache_coordinator::Coordinator;
use viewcache_core::EntityId;
use viewcache_testing::{Document, InMemoryStore, OutboxSource, Seedable, index_plan};

fn wired() -> (Arc<Coordinator<Document>>, Arc<InMemoryStore<Document>>, CdcConsumer<Document>) {
	let plan = index_plan();
	let pipeline = Arc::new(Pipeline::<Document>::new(&plan));
	let store = Arc::new(InMemoryStore::<Document>::new());
	let consumer = CdcConsumer::new(pipeline.clone(), OutboxSource::new(store.clone()), PollConsumerConfig::new(Duration::from_millis(2)));
	consumer.start();
	let coordinator = Arc::new(Coordinator::new(pipeline, store.clone()));
	(coordinator, store, consumer)
}

/// Exercises S5 (read-your-writes) over the genuine envelope
/// encode/decode path: the store emits real CDC bytes, a background
/// `CdcConsumer` decodes and replays them, and `Coordinator::create`
/// only returns once that replay has landed in the cache.
#[test]
fn create_is_visible_through_the_real_cdc_path_once_it_returns() {
	let (coordinator, _store, consumer) = wired();

	let id = EntityId::generate(1);
	let doc = Document { title: "hello world".to_string(), ..Document::blank(id) };
	let returned_id = coordinator.create(doc).unwrap();
	assert_eq!(returned_id, id);

	let cached = coordinator.pipeline().get(id).unwrap();
	assert_eq!(cached.title, "hello world");

	consumer.stop();
}

#[test]
fn update_through_the_real_cdc_path_is_visible_once_it_returns() {
	let (coordinator, _store, consumer) = wired();

	let id = EntityId::generate(2);
	let original = Document { title: "draft".to_string(), ..Document::blank(id) };
	coordinator.create(original.clone()).unwrap();

	let mut updated = coordinator.pipeline().get(id).unwrap();
	updated.title = "final".to_string();
	coordinator.update(&coordinator.pipeline().get(id).unwrap(), &updated).unwrap();

	assert_eq!(coordinator.pipeline().get(id).unwrap().title, "final");

	consumer.stop();
}

#[test]
fn delete_through_the_real_cdc_path_removes_the_entity() {
	let (coordinator, _store, consumer) = wired();

	let id = EntityId::generate(3);
	let doc = Document { title: "transient".to_string(), ..Document::blank(id) };
	coordinator.create(doc).unwrap();
	assert!(coordinator.pipeline().get(id).is_some());

	coordinator.delete(id).unwrap();
	assert!(coordinator.pipeline().get(id).is_none());

	consumer.stop();
}

#[test]
fn inverse_index_reflects_writes_replayed_off_the_store() {
	let (coordinator, _store, consumer) = wired();

	let parent = EntityId::generate(10);
	let child_a = EntityId::generate(11);
	let child_b = EntityId::generate(12);
	for (id, parent_id) in [(child_a, parent), (child_b, parent)] {
		let doc = Document { parent: Some(parent_id.to_hex()), ..Document::blank(id) };
		coordinator.create(doc).unwrap();
	}

	let index = coordinator.pipeline().inverse("by_parent").unwrap();
	let mut children = index.get(&parent.to_hex());
	children.sort();
	let mut expected = vec![child_a.to_hex(), child_b.to_hex()];
	expected.sort();
	assert_eq!(children, expected);

	consumer.stop();
}

#[test]
fn upsert_many_bypasses_diffing_and_await_entirely() {
	let (coordinator, _store, consumer) = wired();

	let ids: Vec<EntityId> = (20..25).map(EntityId::generate).collect();
	let items = ids
		.iter()
		.map(|id| {
			let mut set = viewcache_core::SetPatch::new();
			set.insert("title".to_string(), format!("item-{id}"));
			(*id, set)
		})
		.collect();
	coordinator.upsert_many(items).unwrap();

	// upsert bypasses the await coordinator, so give the background
	// consumer a moment to drain and replay the envelopes.
	std::thread::sleep(Duration::from_millis(50));

	for id in ids {
		assert!(coordinator.pipeline().get(id).is_some());
	}

	consumer.stop();
}
