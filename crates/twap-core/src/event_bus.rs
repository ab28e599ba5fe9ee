//! Event bus for engine observers.
//!
//! A broadcast channel: the engine publishes, any number of subscribers
//! (CLI output, tests, a future UI tap) consume their own copy. Publishing
//! with no subscribers is not an error.

use tokio::sync::broadcast;
use twap_types::EngineEvent;

pub struct EventBus {
	sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
		self.sender.subscribe()
	}

	/// Publishes to all current subscribers, dropping the event when there
	/// are none.
	pub fn publish(&self, event: EngineEvent) {
		let _ = self.sender.send(event);
	}
}

impl Clone for EventBus {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}
