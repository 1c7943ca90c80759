//! Yeelight LAN control client.

use std::time::Duration;

use async_trait::async_trait;
use statusbulb_protocol::{Command, DEFAULT_PORT, Effect, Frame};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::trace;

use crate::error::LightError;
use crate::light::{Light, LightConnector, Rgb};

/// Default bound on connect and on each command round trip.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens [`YeelightBulb`] connections.
#[derive(Debug, Clone)]
pub struct YeelightConnector {
	effect: Effect,
	duration_ms: u32,
	io_timeout: Duration,
}

impl Default for YeelightConnector {
	fn default() -> Self {
		Self {
			effect: Effect::Smooth,
			duration_ms: 500,
			io_timeout: DEFAULT_IO_TIMEOUT,
		}
	}
}

impl YeelightConnector {
	pub fn new(effect: Effect, duration_ms: u32, io_timeout: Duration) -> Self {
		Self {
			effect,
			duration_ms,
			io_timeout,
		}
	}
}

/// Appends the default control port when `address` has none.
fn socket_address(address: &str) -> String {
	if !address.starts_with('[') && address.matches(':').count() > 1 {
		// bare IPv6 literal
		format!("[{}]:{}", address, DEFAULT_PORT)
	} else if address.rsplit_once(':').is_some_and(|(_, port)| port.parse::<u16>().is_ok()) {
		address.to_string()
	} else {
		format!("{}:{}", address, DEFAULT_PORT)
	}
}

#[async_trait]
impl LightConnector for YeelightConnector {
	async fn connect(&self, address: &str) -> Result<Box<dyn Light>, LightError> {
		let target = socket_address(address);
		let stream = tokio::time::timeout(self.io_timeout, TcpStream::connect(&target))
			.await
			.map_err(|_| LightError::Timeout(self.io_timeout))??;
		stream.set_nodelay(true)?;
		let (read, write) = stream.into_split();
		Ok(Box::new(YeelightBulb {
			reader: BufReader::new(read),
			writer: write,
			next_id: 1,
			effect: self.effect,
			duration_ms: self.duration_ms,
			io_timeout: self.io_timeout,
		}))
	}
}

/// One TCP control connection to a bulb.
#[derive(Debug)]
pub struct YeelightBulb {
	reader: BufReader<OwnedReadHalf>,
	writer: OwnedWriteHalf,
	next_id: u32,
	effect: Effect,
	duration_ms: u32,
	io_timeout: Duration,
}

impl YeelightBulb {
	fn next_id(&mut self) -> u32 {
		let id = self.next_id;
		self.next_id = self.next_id.wrapping_add(1).max(1);
		id
	}

	async fn request(&mut self, command: Command) -> Result<Frame, LightError> {
		let line = command.to_line().map_err(|e| LightError::Protocol(e.to_string()))?;
		trace!(target = "statusbulb.device", line = line.trim_end(), "send");
		let io_timeout = self.io_timeout;
		tokio::time::timeout(io_timeout, self.round_trip(&line, command.id))
			.await
			.map_err(|_| LightError::Timeout(io_timeout))?
	}

	async fn round_trip(&mut self, line: &str, id: u32) -> Result<Frame, LightError> {
		self.writer.write_all(line.as_bytes()).await?;
		self.writer.flush().await?;

		let mut buf = String::new();
		loop {
			buf.clear();
			if self.reader.read_line(&mut buf).await? == 0 {
				return Err(LightError::Io(std::io::Error::new(
					std::io::ErrorKind::UnexpectedEof,
					"bulb closed the connection",
				)));
			}
			if buf.trim().is_empty() {
				continue;
			}
			let frame = Frame::parse(&buf).map_err(|e| LightError::Protocol(format!("{}: {}", e, buf.trim())))?;
			if frame.is_notification() || frame.id != Some(id) {
				trace!(target = "statusbulb.device", line = buf.trim(), "skipping unrelated frame");
				continue;
			}
			if let Some(error) = frame.error {
				return Err(LightError::Reply {
					code: error.code,
					message: error.message,
				});
			}
			return Ok(frame);
		}
	}

	async fn expect_ok(&mut self, command: Command) -> Result<(), LightError> {
		let frame = self.request(command).await?;
		match frame.result_strings().first().map(String::as_str) {
			Some("ok") => Ok(()),
			other => Err(LightError::Protocol(format!("expected [\"ok\"], got {:?}", other))),
		}
	}
}

#[async_trait]
impl Light for YeelightBulb {
	async fn get_properties(&mut self, props: &[&str]) -> Result<Vec<String>, LightError> {
		let id = self.next_id();
		let frame = self.request(Command::get_prop(id, props)).await?;
		let values = frame.result_strings();
		if values.len() != props.len() {
			return Err(LightError::Protocol(format!("asked for {} properties, got {}", props.len(), values.len())));
		}
		Ok(values)
	}

	async fn set_rgb(&mut self, color: Rgb) -> Result<(), LightError> {
		let id = self.next_id();
		let command = Command::set_rgb(id, color.packed(), self.effect, self.duration_ms);
		self.expect_ok(command).await
	}

	async fn set_power(&mut self, on: bool) -> Result<(), LightError> {
		let id = self.next_id();
		let command = Command::set_power(id, on, self.effect, self.duration_ms);
		self.expect_ok(command).await
	}
}

#[cfg(test)]
mod tests {
	use tokio::net::TcpListener;
	use tokio::task::JoinHandle;

	use super::*;

	/// Answers each received line with the next scripted reply block.
	async fn fake_bulb(replies: Vec<&'static str>) -> (String, JoinHandle<Vec<String>>) {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let address = listener.local_addr().unwrap().to_string();
		let server = tokio::spawn(async move {
			let (stream, _) = listener.accept().await.unwrap();
			let (read, mut write) = stream.into_split();
			let mut lines = BufReader::new(read).lines();
			let mut received = Vec::new();
			for reply in replies {
				let Some(line) = lines.next_line().await.unwrap() else {
					break;
				};
				received.push(line);
				write.write_all(reply.as_bytes()).await.unwrap();
			}
			received
		});
		(address, server)
	}

	#[tokio::test]
	async fn set_rgb_skips_notifications_and_accepts_ok() {
		let (address, server) = fake_bulb(vec![
			"{\"id\":1,\"result\":[\"on\",\"100\",\"65280\"]}\r\n",
			"{\"method\":\"props\",\"params\":{\"rgb\":16711680}}\r\n{\"id\":2,\"result\":[\"ok\"]}\r\n",
		])
		.await;

		let mut bulb = YeelightConnector::default().connect(&address).await.unwrap();
		let props = bulb.get_properties(&["power", "bright", "rgb"]).await.unwrap();
		assert_eq!(props, vec!["on", "100", "65280"]);
		bulb.set_rgb(Rgb::new(255, 0, 0)).await.unwrap();
		drop(bulb);

		let received = server.await.unwrap();
		assert_eq!(received[1], "{\"id\":2,\"method\":\"set_rgb\",\"params\":[16711680,\"smooth\",500]}");
	}

	#[tokio::test]
	async fn error_reply_becomes_reply_error() {
		let (address, _server) = fake_bulb(vec!["{\"id\":1,\"error\":{\"code\":-1,\"message\":\"client quota exceeded\"}}\r\n"]).await;

		let mut bulb = YeelightConnector::default().connect(&address).await.unwrap();
		let err = bulb.set_power(true).await.unwrap_err();
		assert!(matches!(err, LightError::Reply { code: -1, .. }));
	}

	#[tokio::test]
	async fn silent_bulb_times_out() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let address = listener.local_addr().unwrap().to_string();
		let _server = tokio::spawn(async move {
			let (stream, _) = listener.accept().await.unwrap();
			tokio::time::sleep(Duration::from_secs(5)).await;
			drop(stream);
		});

		let connector = YeelightConnector::new(Effect::Sudden, 0, Duration::from_millis(100));
		let mut bulb = connector.connect(&address).await.unwrap();
		assert!(matches!(bulb.set_rgb(Rgb::WHITE).await, Err(LightError::Timeout(_))));
	}

	#[test]
	fn socket_address_defaults_port() {
		assert_eq!(socket_address("192.168.1.100"), "192.168.1.100:55443");
		assert_eq!(socket_address("192.168.1.100:1234"), "192.168.1.100:1234");
		assert_eq!(socket_address("bulb.lan"), "bulb.lan:55443");
		assert_eq!(socket_address("fe80::1"), "[fe80::1]:55443");
	}
}
