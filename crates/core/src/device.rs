//! Lifecycle of the one network light the loop drives.
//!
//! A [`DeviceController`] is only constructed after a successful handshake.
//! From then on its handle moves between three states:
//!
//! ```text
//! Connected --(command fails)--> Invalidated --(reconnect)--> Connected
//!     \______________________________________________________/
//!                              |
//!                       release_safely
//!                              v
//!                          Released
//! ```

use statusbulb_protocol::HANDSHAKE_PROPS;
use statusbulb_runtime::{Light, LightConnector, Rgb};
use tracing::{debug, info, warn};

use crate::backoff::{Backoff, RetryError};
use crate::error::DeviceError;
use crate::shutdown::ShutdownSignal;

/// Color shown once the tool stops driving the light.
pub const TERMINAL_COLOR: Rgb = Rgb::WHITE;

enum DeviceHandle {
	Connected { light: Box<dyn Light>, powered: bool },
	Invalidated,
	Released,
}

impl DeviceHandle {
	fn label(&self) -> &'static str {
		match self {
			DeviceHandle::Connected { .. } => "connected",
			DeviceHandle::Invalidated => "invalidated",
			DeviceHandle::Released => "released",
		}
	}
}

/// Owns the connection to one light at a fixed address.
pub struct DeviceController<C> {
	connector: C,
	address: String,
	backoff: Backoff,
	shutdown: ShutdownSignal,
	handle: DeviceHandle,
}

impl<C> std::fmt::Debug for DeviceController<C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DeviceController")
			.field("address", &self.address)
			.field("backoff", &self.backoff)
			.field("handle", &self.handle.label())
			.finish()
	}
}

/// Connects and reads back device properties; the handle is usable only if both succeed.
async fn handshake<C: LightConnector>(connector: &C, address: &str) -> Result<DeviceHandle, DeviceError> {
	let connect_failed = |source| DeviceError::ConnectFailed {
		address: address.to_string(),
		source,
	};
	let mut light = connector.connect(address).await.map_err(connect_failed)?;
	let props = light.get_properties(&HANDSHAKE_PROPS).await.map_err(connect_failed)?;
	let powered = props.first().is_none_or(|power| power != "off");
	debug!(target = "statusbulb.device", %address, ?props, "handshake complete");
	Ok(DeviceHandle::Connected { light, powered })
}

impl<C: LightConnector> DeviceController<C> {
	/// Connects to `address`, retrying with `backoff`.
	///
	/// Exhausting the attempts yields [`DeviceError::Unreachable`], which is
	/// fatal for the process.
	pub async fn connect(connector: C, address: impl Into<String>, backoff: Backoff, shutdown: ShutdownSignal) -> Result<Self, DeviceError> {
		let address = address.into();
		let handle = connect_with_backoff(&connector, &address, &backoff, &shutdown).await?;
		info!(target = "statusbulb.device", %address, "light connected");
		Ok(Self {
			connector,
			address,
			backoff,
			shutdown,
			handle,
		})
	}

	pub fn is_connected(&self) -> bool {
		matches!(self.handle, DeviceHandle::Connected { .. })
	}

	pub fn is_released(&self) -> bool {
		matches!(self.handle, DeviceHandle::Released)
	}

	/// Sends one color command.
	///
	/// Any failure invalidates the handle; a later [`reconnect`](Self::reconnect)
	/// makes it usable again.
	pub async fn set_color(&mut self, color: Rgb) -> Result<(), DeviceError> {
		let DeviceHandle::Connected { light, powered } = &mut self.handle else {
			return Err(DeviceError::NotConnected);
		};

		let result = async {
			if !*powered {
				light.set_power(true).await?;
				*powered = true;
			}
			light.set_rgb(color).await
		}
		.await;

		match result {
			Ok(()) => {
				debug!(target = "statusbulb.device", %color, "color applied");
				Ok(())
			}
			Err(err) => {
				warn!(target = "statusbulb.device", address = %self.address, %color, error = %err, "light command failed");
				self.handle = DeviceHandle::Invalidated;
				Err(DeviceError::CommandFailed(err))
			}
		}
	}

	/// Replaces the handle with a fresh connection, retrying with backoff.
	pub async fn reconnect(&mut self) -> Result<(), DeviceError> {
		if self.is_released() {
			return Err(DeviceError::NotConnected);
		}
		info!(target = "statusbulb.device", address = %self.address, "reconnecting to light");
		self.handle = DeviceHandle::Invalidated;
		self.handle = connect_with_backoff(&self.connector, &self.address, &self.backoff, &self.shutdown).await?;
		info!(target = "statusbulb.device", address = %self.address, "light reconnected");
		Ok(())
	}

	/// Applies `color`, repairing the connection once if the command fails.
	///
	/// Only [`DeviceError::Unreachable`] and [`DeviceError::Cancelled`] escape;
	/// a command that still fails after a successful reconnect is logged and
	/// left for the next tick.
	pub async fn drive(&mut self, color: Rgb) -> Result<(), DeviceError> {
		match self.set_color(color).await {
			Ok(()) => return Ok(()),
			Err(DeviceError::CommandFailed(_) | DeviceError::NotConnected) => {}
			Err(other) => return Err(other),
		}

		self.reconnect().await?;
		if let Err(err) = self.set_color(color).await {
			warn!(target = "statusbulb.device", %color, error = %err, "color still not applied after reconnect");
		}
		Ok(())
	}

	/// Shows [`TERMINAL_COLOR`] and releases the handle; never fails.
	pub async fn release_safely(&mut self) {
		if self.is_released() {
			return;
		}

		if !self.is_connected() {
			match handshake(&self.connector, &self.address).await {
				Ok(handle) => self.handle = handle,
				Err(err) => debug!(target = "statusbulb.device", error = %err, "no connection for terminal color"),
			}
		}

		if self.is_connected() {
			match self.set_color(TERMINAL_COLOR).await {
				Ok(()) => info!(target = "statusbulb.device", color = %TERMINAL_COLOR, "light reset to terminal color"),
				Err(err) => warn!(target = "statusbulb.device", error = %err, "failed to set terminal color"),
			}
		} else {
			warn!(target = "statusbulb.device", address = %self.address, "light unreachable; terminal color not applied");
		}

		self.handle = DeviceHandle::Released;
	}
}

async fn connect_with_backoff<C: LightConnector>(
	connector: &C,
	address: &str,
	backoff: &Backoff,
	shutdown: &ShutdownSignal,
) -> Result<DeviceHandle, DeviceError> {
	match backoff.retry("light connect", shutdown, |_| handshake(connector, address)).await {
		Ok(handle) => Ok(handle),
		Err(RetryError::Exhausted { attempts, last }) => {
			let source = match last {
				DeviceError::ConnectFailed { source, .. } => source,
				other => return Err(other),
			};
			Err(DeviceError::Unreachable {
				address: address.to_string(),
				attempts,
				source,
			})
		}
		Err(RetryError::Cancelled { .. }) => Err(DeviceError::Cancelled),
	}
}
