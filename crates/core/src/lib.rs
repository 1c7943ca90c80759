//! Mirrors a Teams presence indicator onto a Yeelight bulb.
//!
//! The [`SyncLoop`] owns one browser [`SessionHandle`] and one
//! [`DeviceController`]. Each tick it probes the session, recreating it when
//! the browser is gone, classifies the presence signal, and drives the light.
//! On shutdown the light is reset to white before the session is disposed.
//!
//! ```ignore
//! let device = DeviceController::connect(YeelightConnector::default(), "192.168.1.100", backoff, signal.clone()).await?;
//! let keeper = SessionKeeper::new(factory, settings).with_shutdown(signal.clone());
//! let session = keeper.authenticate().await.ok();
//! SyncLoop::new(keeper, classifier, device, session, signal).run().await?;
//! ```

pub mod backoff;
pub mod device;
pub mod diagnostics;
pub mod error;
pub mod session;
pub mod shutdown;
pub mod status;
pub mod sync;

pub use backoff::{Backoff, RetryError};
pub use device::{DeviceController, TERMINAL_COLOR};
pub use diagnostics::{Diagnostics, SnapshotTag};
pub use error::{DeviceError, ExtractError, SessionError, SyncError};
pub use session::{Credentials, Liveness, LoginSelectors, LoginTimeouts, SessionHandle, SessionKeeper, SessionSettings};
pub use shutdown::{ShutdownSignal, ShutdownTrigger};
pub use status::{StatusClassifier, StatusMapping, StatusProbe, StatusRecord, classify};
pub use statusbulb_runtime::{Cookie, Locator, Rgb};
pub use sync::{DEFAULT_REFRESH_INTERVAL, SyncLoop};
