//! Yeelight LAN control protocol messages.
//!
//! Commands and replies are single JSON objects terminated by `\r\n` on a TCP
//! connection to port 55443. The bulb also pushes unsolicited `props`
//! notifications on the same connection; those carry a `method` but no `id`.
//!
//! ```json
//! {"id":1,"method":"set_rgb","params":[16711680,"smooth",500]}
//! {"id":1,"result":["ok"]}
//! {"id":2,"error":{"code":-1,"message":"client quota exceeded"}}
//! {"method":"props","params":{"power":"on"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Default LAN control port.
pub const DEFAULT_PORT: u16 = 55443;

/// Properties read back during the connect handshake.
pub const HANDSHAKE_PROPS: [&str; 3] = ["power", "bright", "rgb"];

/// Transition applied by the bulb when a state change is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
	Sudden,
	Smooth,
}

impl Effect {
	pub fn as_str(self) -> &'static str {
		match self {
			Effect::Sudden => "sudden",
			Effect::Smooth => "smooth",
		}
	}
}

/// Outbound command frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
	pub id: u32,
	pub method: &'static str,
	pub params: Vec<Value>,
}

impl Command {
	pub fn get_prop(id: u32, props: &[&str]) -> Self {
		Self {
			id,
			method: "get_prop",
			params: props.iter().map(|p| json!(p)).collect(),
		}
	}

	/// `rgb` is the packed `0xRRGGBB` integer.
	pub fn set_rgb(id: u32, rgb: u32, effect: Effect, duration_ms: u32) -> Self {
		Self {
			id,
			method: "set_rgb",
			params: vec![json!(rgb), json!(effect.as_str()), json!(duration_ms)],
		}
	}

	pub fn set_power(id: u32, on: bool, effect: Effect, duration_ms: u32) -> Self {
		Self {
			id,
			method: "set_power",
			params: vec![json!(if on { "on" } else { "off" }), json!(effect.as_str()), json!(duration_ms)],
		}
	}

	/// Serializes the command as a `\r\n` terminated line.
	pub fn to_line(&self) -> serde_json::Result<String> {
		let mut line = serde_json::to_string(self)?;
		line.push_str("\r\n");
		Ok(line)
	}
}

/// Error object inside a failed reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReplyError {
	pub code: i64,
	#[serde(default)]
	pub message: String,
}

/// Inbound frame: a reply to a command or a notification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Frame {
	#[serde(default)]
	pub id: Option<u32>,
	#[serde(default)]
	pub result: Option<Vec<Value>>,
	#[serde(default)]
	pub error: Option<ReplyError>,
	#[serde(default)]
	pub method: Option<String>,
}

impl Frame {
	pub fn parse(line: &str) -> serde_json::Result<Self> {
		serde_json::from_str(line.trim())
	}

	/// Returns `true` for unsolicited notifications.
	pub fn is_notification(&self) -> bool {
		self.id.is_none() && self.method.is_some()
	}

	/// Flattens `result` into strings, the shape `get_prop` replies use.
	pub fn result_strings(&self) -> Vec<String> {
		self.result
			.as_deref()
			.unwrap_or_default()
			.iter()
			.map(|v| match v {
				Value::String(s) => s.clone(),
				other => other.to_string(),
			})
			.collect()
	}
}

/// Packs components into the integer `set_rgb` expects.
pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
	(u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}
