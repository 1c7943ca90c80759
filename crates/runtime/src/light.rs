//! Network light seam and the color type it speaks.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::LightError;

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
	pub r: u8,
	pub g: u8,
	pub b: u8,
}

impl Rgb {
	pub const WHITE: Rgb = Rgb::new(255, 255, 255);
	pub const GRAY: Rgb = Rgb::new(128, 128, 128);

	pub const fn new(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b }
	}

	/// `0xRRGGBB` as used on the wire.
	pub fn packed(self) -> u32 {
		statusbulb_protocol::pack_rgb(self.r, self.g, self.b)
	}
}

impl fmt::Display for Rgb {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{},{},{}", self.r, self.g, self.b)
	}
}

/// Failure parsing an `"R,G,B"` color string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color `{input}`: expected \"R,G,B\" with components 0-255")]
pub struct ParseRgbError {
	pub input: String,
}

impl FromStr for Rgb {
	type Err = ParseRgbError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let err = || ParseRgbError { input: s.to_string() };
		let parts: Vec<&str> = s.split(',').map(str::trim).collect();
		let [r, g, b] = parts.as_slice() else {
			return Err(err());
		};
		let component = |p: &str| p.parse::<u8>().map_err(|_| err());
		Ok(Rgb::new(component(*r)?, component(*g)?, component(*b)?))
	}
}

/// One open control channel to a light.
#[async_trait]
pub trait Light: Send {
	/// Reads the named properties, in order.
	async fn get_properties(&mut self, props: &[&str]) -> Result<Vec<String>, LightError>;

	async fn set_rgb(&mut self, color: Rgb) -> Result<(), LightError>;

	async fn set_power(&mut self, on: bool) -> Result<(), LightError>;
}

/// Opens control channels to a light by address.
#[async_trait]
pub trait LightConnector: Send + Sync {
	async fn connect(&self, address: &str) -> Result<Box<dyn Light>, LightError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_components_with_whitespace() {
		assert_eq!(" 255, 0 ,10".parse::<Rgb>().unwrap(), Rgb::new(255, 0, 10));
	}

	#[test]
	fn rejects_out_of_range_and_wrong_arity() {
		assert!("256,0,0".parse::<Rgb>().is_err());
		assert!("1,2".parse::<Rgb>().is_err());
		assert!("1,2,3,4".parse::<Rgb>().is_err());
		assert!("red".parse::<Rgb>().is_err());
		assert!("-1,0,0".parse::<Rgb>().is_err());
	}

	#[test]
	fn display_round_trips_config_format() {
		assert_eq!(Rgb::GRAY.to_string(), "128,128,128");
	}
}
