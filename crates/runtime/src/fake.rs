//! Scripted in-memory doubles for the browser, light, and notifier seams.
//!
//! Each double is a cheap `Clone` over shared state: hand one clone to the code
//! under test and keep another to script failures and inspect what happened.
//!
//! # Example
//!
//! ```ignore
//! let browser = FakeBrowser::new("s1").with_element(&status, &[("aria-label", "status busy")], "");
//! let factory = FakeDriverFactory::default();
//! factory.push(browser.clone());
//!
//! // ... run the keeper against `factory` ...
//!
//! browser.kill();
//! assert!(browser.events().contains(&BrowserEvent::Quit));
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use statusbulb_protocol::{Cookie, ElementRef, Locator};

use crate::driver::{BrowserDriver, DriverFactory};
use crate::error::{DriverError, LightError, Result};
use crate::light::{Light, LightConnector, Rgb};
use crate::relay::Notifier;

/// Side effect observed on a [`FakeBrowser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserEvent {
	Navigate(String),
	Refresh,
	SendKeys { locator: String, text: String },
	Click(String),
	AddCookie(String),
	Screenshot,
	PageSource,
	Quit,
}

#[derive(Debug, Default)]
struct ElementScript {
	attributes: HashMap<String, String>,
	text: String,
	appear_after: u32,
	lookups: u32,
}

#[derive(Debug)]
struct BrowserState {
	alive: bool,
	script_error: Option<(String, String)>,
	quit_fails: bool,
	cookies_fail: bool,
	elements: HashMap<String, ElementScript>,
	cookies: Vec<Cookie>,
	events: Vec<BrowserEvent>,
}

/// Browser session double.
#[derive(Debug, Clone)]
pub struct FakeBrowser {
	session_id: Arc<str>,
	state: Arc<Mutex<BrowserState>>,
}

impl FakeBrowser {
	pub fn new(session_id: &str) -> Self {
		Self {
			session_id: Arc::from(session_id),
			state: Arc::new(Mutex::new(BrowserState {
				alive: true,
				script_error: None,
				quit_fails: false,
				cookies_fail: false,
				elements: HashMap::new(),
				cookies: Vec::new(),
				events: Vec::new(),
			})),
		}
	}

	/// Adds an element that is present immediately.
	pub fn with_element(self, locator: &Locator, attributes: &[(&str, &str)], text: &str) -> Self {
		self.with_element_after(locator, 0, attributes, text)
	}

	/// Adds an element that only matches after `lookups` failed lookups.
	pub fn with_element_after(self, locator: &Locator, lookups: u32, attributes: &[(&str, &str)], text: &str) -> Self {
		self.state.lock().elements.insert(
			locator.to_string(),
			ElementScript {
				attributes: attributes.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
				text: text.to_string(),
				appear_after: lookups,
				lookups: 0,
			},
		);
		self
	}

	pub fn with_cookies(self, cookies: Vec<Cookie>) -> Self {
		self.set_cookies(cookies);
		self
	}

	/// Makes every later call fail as if the browser process died.
	pub fn kill(&self) {
		self.state.lock().alive = false;
	}

	/// Makes scripts fail with an application-level WebDriver error.
	pub fn fail_scripts(&self, code: &str, message: &str) {
		self.state.lock().script_error = Some((code.to_string(), message.to_string()));
	}

	pub fn fail_quit(&self) {
		self.state.lock().quit_fails = true;
	}

	pub fn fail_cookie_reads(&self) {
		self.state.lock().cookies_fail = true;
	}

	pub fn set_cookies(&self, cookies: Vec<Cookie>) {
		self.state.lock().cookies = cookies;
	}

	pub fn set_attribute(&self, locator: &Locator, name: &str, value: &str) {
		if let Some(element) = self.state.lock().elements.get_mut(&locator.to_string()) {
			element.attributes.insert(name.to_string(), value.to_string());
		}
	}

	pub fn events(&self) -> Vec<BrowserEvent> {
		self.state.lock().events.clone()
	}

	/// Returns `true` if any text was typed into an element.
	pub fn typed_anything(&self) -> bool {
		self.events().iter().any(|e| matches!(e, BrowserEvent::SendKeys { .. }))
	}

	fn live(&self) -> Result<MutexGuard<'_, BrowserState>> {
		let state = self.state.lock();
		if !state.alive {
			return Err(DriverError::Command {
				code: "invalid session id".to_string(),
				message: format!("session {} is gone", self.session_id),
			});
		}
		Ok(state)
	}
}

#[async_trait]
impl BrowserDriver for FakeBrowser {
	fn session_id(&self) -> &str {
		&self.session_id
	}

	async fn navigate(&self, url: &str) -> Result<()> {
		self.live()?.events.push(BrowserEvent::Navigate(url.to_string()));
		Ok(())
	}

	async fn refresh(&self) -> Result<()> {
		self.live()?.events.push(BrowserEvent::Refresh);
		Ok(())
	}

	async fn find_element(&self, locator: &Locator, timeout: Duration) -> Result<ElementRef> {
		let mut state = self.live()?;
		let key = locator.to_string();
		match state.elements.get_mut(&key) {
			Some(element) if element.lookups >= element.appear_after => Ok(ElementRef { id: key }),
			Some(element) => {
				element.lookups += 1;
				Err(DriverError::Timeout {
					ms: timeout.as_millis() as u64,
					condition: key,
				})
			}
			None => Err(DriverError::Timeout {
				ms: timeout.as_millis() as u64,
				condition: key,
			}),
		}
	}

	async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
		let state = self.live()?;
		let script = state.elements.get(&element.id).ok_or_else(|| DriverError::Command {
			code: "stale element reference".to_string(),
			message: element.id.clone(),
		})?;
		Ok(script.attributes.get(name).cloned())
	}

	async fn text(&self, element: &ElementRef) -> Result<String> {
		let state = self.live()?;
		state.elements.get(&element.id).map(|e| e.text.clone()).ok_or_else(|| DriverError::Command {
			code: "stale element reference".to_string(),
			message: element.id.clone(),
		})
	}

	async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
		self.live()?.events.push(BrowserEvent::SendKeys {
			locator: element.id.clone(),
			text: text.to_string(),
		});
		Ok(())
	}

	async fn click(&self, element: &ElementRef) -> Result<()> {
		self.live()?.events.push(BrowserEvent::Click(element.id.clone()));
		Ok(())
	}

	async fn execute_trivial(&self) -> Result<()> {
		let state = self.live()?;
		match &state.script_error {
			Some((code, message)) => Err(DriverError::Command {
				code: code.clone(),
				message: message.clone(),
			}),
			None => Ok(()),
		}
	}

	async fn cookies(&self) -> Result<Vec<Cookie>> {
		let state = self.live()?;
		if state.cookies_fail {
			return Err(DriverError::Command {
				code: "unknown error".to_string(),
				message: "cookie read failed".to_string(),
			});
		}
		Ok(state.cookies.clone())
	}

	async fn add_cookie(&self, cookie: &Cookie) -> Result<()> {
		let mut state = self.live()?;
		state.events.push(BrowserEvent::AddCookie(cookie.name.clone()));
		state.cookies.push(cookie.clone());
		Ok(())
	}

	async fn screenshot(&self) -> Result<Vec<u8>> {
		self.live()?.events.push(BrowserEvent::Screenshot);
		Ok(vec![0x89, b'P', b'N', b'G'])
	}

	async fn page_source(&self) -> Result<String> {
		self.live()?.events.push(BrowserEvent::PageSource);
		Ok("<html></html>".to_string())
	}

	async fn quit(&self) -> Result<()> {
		let mut state = self.state.lock();
		state.events.push(BrowserEvent::Quit);
		if state.quit_fails || !state.alive {
			state.alive = false;
			return Err(DriverError::Transport("browser already gone".to_string()));
		}
		state.alive = false;
		Ok(())
	}
}

#[derive(Debug, Default)]
struct FactoryState {
	queue: VecDeque<FakeBrowser>,
	created: usize,
}

/// Hands out scripted [`FakeBrowser`]s in push order.
#[derive(Debug, Clone, Default)]
pub struct FakeDriverFactory {
	state: Arc<Mutex<FactoryState>>,
}

impl FakeDriverFactory {
	pub fn push(&self, browser: FakeBrowser) {
		self.state.lock().queue.push_back(browser);
	}

	/// Number of sessions created so far.
	pub fn created(&self) -> usize {
		self.state.lock().created
	}
}

#[async_trait]
impl DriverFactory for FakeDriverFactory {
	async fn create(&self) -> Result<Box<dyn BrowserDriver>> {
		let mut state = self.state.lock();
		let browser = state
			.queue
			.pop_front()
			.ok_or_else(|| DriverError::Launch("no scripted browser left".to_string()))?;
		state.created += 1;
		Ok(Box::new(browser))
	}
}

/// Command accepted by a [`FakeLight`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightCommand {
	GetProperties,
	SetRgb(Rgb),
	SetPower(bool),
}

#[derive(Debug)]
struct LightState {
	power: String,
	connect_failures: u32,
	command_failures: u32,
	connects: u32,
	generation: u32,
	addresses: Vec<String>,
	commands: Vec<LightCommand>,
}

/// Light connector double; every [`FakeLight`] it opens shares its log.
#[derive(Debug, Clone)]
pub struct FakeLightConnector {
	state: Arc<Mutex<LightState>>,
}

impl Default for FakeLightConnector {
	fn default() -> Self {
		Self {
			state: Arc::new(Mutex::new(LightState {
				power: "on".to_string(),
				connect_failures: 0,
				command_failures: 0,
				connects: 0,
				generation: 0,
				addresses: Vec::new(),
				commands: Vec::new(),
			})),
		}
	}
}

impl FakeLightConnector {
	/// Fails the next `n` connect attempts.
	pub fn fail_connects(&self, n: u32) {
		self.state.lock().connect_failures = n;
	}

	/// Rejects the next `n` commands as if the bulb were busy.
	pub fn fail_commands(&self, n: u32) {
		self.state.lock().command_failures = n;
	}

	/// Drops every open connection; their later commands fail with I/O errors.
	pub fn break_connections(&self) {
		self.state.lock().generation += 1;
	}

	pub fn set_power_state(&self, power: &str) {
		self.state.lock().power = power.to_string();
	}

	/// Successful connect handshakes so far.
	pub fn connects(&self) -> u32 {
		self.state.lock().connects
	}

	pub fn addresses(&self) -> Vec<String> {
		self.state.lock().addresses.clone()
	}

	pub fn commands(&self) -> Vec<LightCommand> {
		self.state.lock().commands.clone()
	}

	pub fn colors(&self) -> Vec<Rgb> {
		self.commands()
			.into_iter()
			.filter_map(|c| match c {
				LightCommand::SetRgb(rgb) => Some(rgb),
				_ => None,
			})
			.collect()
	}
}

#[async_trait]
impl LightConnector for FakeLightConnector {
	async fn connect(&self, address: &str) -> std::result::Result<Box<dyn Light>, LightError> {
		let mut state = self.state.lock();
		state.addresses.push(address.to_string());
		if state.connect_failures > 0 {
			state.connect_failures -= 1;
			return Err(LightError::Io(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused")));
		}
		state.connects += 1;
		Ok(Box::new(FakeLight {
			state: Arc::clone(&self.state),
			generation: state.generation,
		}))
	}
}

/// One connection opened by [`FakeLightConnector`].
#[derive(Debug)]
pub struct FakeLight {
	state: Arc<Mutex<LightState>>,
	generation: u32,
}

impl FakeLight {
	fn run(&self, command: LightCommand) -> std::result::Result<MutexGuard<'_, LightState>, LightError> {
		let mut state = self.state.lock();
		if state.generation != self.generation {
			return Err(LightError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "connection reset")));
		}
		if state.command_failures > 0 {
			state.command_failures -= 1;
			return Err(LightError::Reply {
				code: -1,
				message: "device busy".to_string(),
			});
		}
		state.commands.push(command);
		Ok(state)
	}
}

#[async_trait]
impl Light for FakeLight {
	async fn get_properties(&mut self, props: &[&str]) -> std::result::Result<Vec<String>, LightError> {
		let state = self.run(LightCommand::GetProperties)?;
		Ok(props
			.iter()
			.map(|p| match *p {
				"power" => state.power.clone(),
				"bright" => "100".to_string(),
				"rgb" => "16777215".to_string(),
				_ => String::new(),
			})
			.collect())
	}

	async fn set_rgb(&mut self, color: Rgb) -> std::result::Result<(), LightError> {
		self.run(LightCommand::SetRgb(color)).map(|_| ())
	}

	async fn set_power(&mut self, on: bool) -> std::result::Result<(), LightError> {
		let mut state = self.run(LightCommand::SetPower(on))?;
		state.power = if on { "on" } else { "off" }.to_string();
		Ok(())
	}
}

/// Notifier double that records every message.
#[derive(Debug, Clone)]
pub struct FakeNotifier {
	accept: bool,
	sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeNotifier {
	pub fn new(accept: bool) -> Self {
		Self {
			accept,
			sent: Arc::default(),
		}
	}

	pub fn sent(&self) -> Vec<(String, String)> {
		self.sent.lock().clone()
	}
}

#[async_trait]
impl Notifier for FakeNotifier {
	async fn send(&self, number: &str, text: &str) -> bool {
		self.sent.lock().push((number.to_string(), text.to_string()));
		self.accept
	}
}
