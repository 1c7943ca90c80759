//! Cooperative shutdown flag shared by the loop and its retry helpers.
//!
//! Nothing is preempted: holders check the flag at tick boundaries and race
//! it only against their own sleeps.

use std::time::Duration;

use tokio::sync::watch;

/// Raises the shutdown flag.
#[derive(Debug)]
pub struct ShutdownTrigger {
	tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
	pub fn trigger(&self) {
		self.tx.send_replace(true);
	}
}

/// Observes the shutdown flag.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
	rx: watch::Receiver<bool>,
}

/// Creates a connected trigger/signal pair.
pub fn channel() -> (ShutdownTrigger, ShutdownSignal) {
	let (tx, rx) = watch::channel(false);
	(ShutdownTrigger { tx }, ShutdownSignal { rx })
}

impl ShutdownSignal {
	/// A signal that never fires.
	pub fn never() -> Self {
		channel().1
	}

	pub fn is_triggered(&self) -> bool {
		*self.rx.borrow()
	}

	/// Resolves once the flag is raised; pends forever if the trigger is gone.
	pub async fn triggered(&self) {
		let mut rx = self.rx.clone();
		if rx.wait_for(|raised| *raised).await.is_err() {
			std::future::pending::<()>().await;
		}
	}

	/// Sleeps for `duration` unless shutdown is requested first.
	///
	/// Returns `false` when the sleep was cut short.
	pub async fn sleep(&self, duration: Duration) -> bool {
		if self.is_triggered() {
			return false;
		}
		tokio::select! {
			_ = tokio::time::sleep(duration) => true,
			_ = self.triggered() => false,
		}
	}
}
