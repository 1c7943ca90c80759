//! I/O drivers for statusbulb.
//!
//! Everything that touches a socket, an HTTP endpoint, or a child process
//! lives here, behind the traits the core consumes:
//!
//! * [`BrowserDriver`] / [`DriverFactory`]: one WebDriver browser session
//! * [`Light`] / [`LightConnector`]: one Yeelight LAN connection
//! * [`Notifier`]: one-shot SMS relay
//!
//! [`ChromeDriverService`] owns the `chromedriver` child process that backs
//! the WebDriver sessions.

pub mod chromedriver;
pub mod driver;
pub mod error;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
pub mod light;
pub mod process;
pub mod relay;
pub mod webdriver;
pub mod yeelight;

pub use chromedriver::ChromeDriverService;
pub use driver::{BrowserDriver, DriverFactory};
pub use error::{DriverError, LightError, Result};
pub use light::{Light, LightConnector, ParseRgbError, Rgb};
pub use relay::{DisabledNotifier, Notifier, TwilioNotifier};
pub use statusbulb_protocol::{Cookie, ElementRef, Locator};
pub use webdriver::{WebDriverFactory, WebDriverSession};
pub use yeelight::{YeelightBulb, YeelightConnector};
