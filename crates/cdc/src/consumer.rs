// Copyright (c) 2025
// This file is licensed under the Apache-2.0 license, see LICENSE file

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use viewcache_core::{Entity, FieldAccess, Mergeable};

use crate::envelope::{CdcEvent, decode_envelope};
use crate::pipeline::Pipeline;

/// Anything that can hand the consumer raw CDC envelope bytes one at a
/// time, grounded on `pkg/mongo/stream.go`'s `Stream.Listen` polling
/// loop (there `change.TryNext` pulls from a Mongo change stream; here
/// it's an abstract source so the testing crate can drive the same
/// consumer off an in-process queue).
pub trait CdcSource: Send + 'static {
	/// Returns the next pending envelope, or `None` if none is ready
	/// right now (not an error — just "nothing to do this tick").
	fn try_next(&mut self) -> Option<Vec<u8>>;
}

pub struct PollConsumerConfig {
	pub poll_interval: Duration,
}

impl PollConsumerConfig {
	pub fn new(poll_interval: Duration) -> Self {
		Self { poll_interval }
	}
}

impl Default for PollConsumerConfig {
	fn default() -> Self {
		Self { poll_interval: Duration::from_millis(50) }
	}
}

/// Background-thread CDC consumer: polls a `CdcSource`, decodes each
/// envelope, and replays it into a `Pipeline`. Grounded on
/// `crates/cdc/tests/cdc.rs`'s `PollConsumer` lifecycle
/// (`start`/`stop`/`is_running`) and `pkg/mongo/listener.go`'s
/// operation-type dispatch.
pub struct CdcConsumer<E> {
	pipeline: Arc<Pipeline<E>>,
	config: PollConsumerConfig,
	source: Mutex<Option<Box<dyn CdcSource>>>,
	running: Arc<AtomicBool>,
	handle: Mutex<Option<JoinHandle<()>>>,
}

impl<E: Entity + Mergeable + FieldAccess + Clone + DeserializeOwned + Send + Sync + 'static> CdcConsumer<E> {
	pub fn new(pipeline: Arc<Pipeline<E>>, source: impl CdcSource, config: PollConsumerConfig) -> Self {
		Self {
			pipeline,
			config,
			source: Mutex::new(Some(Box::new(source))),
			running: Arc::new(AtomicBool::new(false)),
			handle: Mutex::new(None),
		}
	}

	pub fn is_running(&self) -> bool {
		self.running.load(Ordering::SeqCst)
	}

	pub fn start(&self) {
		if self.running.swap(true, Ordering::SeqCst) {
			return;
		}
		let Some(mut source) = self.source.lock().take() else {
			self.running.store(false, Ordering::SeqCst);
			return;
		};
		let pipeline = self.pipeline.clone();
		let running = self.running.clone();
		let poll_interval = self.config.poll_interval;
		let handle = thread::spawn(move || {
			while running.load(Ordering::SeqCst) {
				match source.try_next() {
					Some(bytes) => apply_envelope(&pipeline, &bytes),
					None => thread::sleep(poll_interval),
				}
			}
		});
		*self.handle.lock() = Some(handle);
	}

	pub fn stop(&self) {
		self.running.store(false, Ordering::SeqCst);
		if let Some(handle) = self.handle.lock().take() {
			let _ = handle.join();
		}
	}
}

fn apply_envelope<E: Entity + Mergeable + FieldAccess + Clone + DeserializeOwned + Send + Sync + 'static>(pipeline: &Pipeline<E>, bytes: &[u8]) {
	match decode_envelope::<E>(bytes) {
		Ok(CdcEvent::Insert { full_document }) => {
			debug!(id = %full_document.id(), "cdc insert");
			pipeline.add(full_document);
		}
		Ok(CdcEvent::Update { id, set, unset }) => {
			debug!(%id, "cdc update");
			pipeline.update(id, set, unset);
		}
		Ok(CdcEvent::Delete { id }) => {
			debug!(%id, "cdc delete");
			pipeline.delete(id);
		}
		Err(e) => warn!(error = %e, "dropping malformed cdc envelope"),
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Mutex as StdMutex;
	use std::time::Duration;

	use serde::{Deserialize, Serialize};
	use viewcache_core::{EntityId, FieldValue, IndexPlan, SetPatch, UnsetPatch};

	use super::*;

	#[derive(Clone, Serialize, Deserialize)]
	struct Doc {
		#[serde(rename = "_id")]
		id: EntityId,
		version: i64,
		#[serde(default)]
		deleted: bool,
		width: i64,
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
		fn merge_from(&mut self, set: &SetPatch, _unset: &UnsetPatch) {
			if let Some(w) = set.get("width") {
				self.width = w.parse().unwrap();
			}
		}
	}

	impl FieldAccess for Doc {
		fn field(&self, _path: &str) -> FieldValue {
			FieldValue::Absent
		}
	}

	struct QueueSource {
		queue: std::sync::Arc<StdMutex<Vec<Vec<u8>>>>,
	}

	impl CdcSource for QueueSource {
		fn try_next(&mut self) -> Option<Vec<u8>> {
			self.queue.lock().unwrap().pop()
		}
	}

	#[test]
	fn lifecycle_start_stop_is_idempotent() {
		let pipeline = Arc::new(Pipeline::<Doc>::new(&IndexPlan::default()));
		let queue = std::sync::Arc::new(StdMutex::new(Vec::new()));
		let consumer = CdcConsumer::new(pipeline, QueueSource { queue }, PollConsumerConfig::new(Duration::from_millis(5)));

		assert!(!consumer.is_running());
		consumer.start();
		assert!(consumer.is_running());
		consumer.stop();
		assert!(!consumer.is_running());
		consumer.stop();
		assert!(!consumer.is_running());
	}

	#[test]
	fn consumed_insert_becomes_visible_in_the_cache() {
		let pipeline = Arc::new(Pipeline::<Doc>::new(&IndexPlan::default()));
		let id = EntityId::generate(1);
		let envelope = format!(
			r#"{{"operationType":"insert","fullDocument":{{"_id":"{}","version":1,"width":10}}}}"#,
			id.to_hex()
		);
		let queue = std::sync::Arc::new(StdMutex::new(vec![envelope.into_bytes()]));
		let consumer = CdcConsumer::new(pipeline.clone(), QueueSource { queue }, PollConsumerConfig::new(Duration::from_millis(5)));

		let sub = pipeline.await_create(id);
		consumer.start();
		assert!(sub.wait());
		assert_eq!(pipeline.get(id).unwrap().width, 10);
		consumer.stop();
	}
}
