//! Browser session lifecycle: sign-in, liveness probing, and replacement.
//!
//! The sync loop holds at most one [`SessionHandle`]. `None` means no
//! session yet, or the last replacement failed; the next tick asks
//! [`SessionKeeper::recreate`] again.

mod handle;
mod keeper;
mod login;

pub use handle::SessionHandle;
pub use keeper::{Liveness, SessionKeeper, SessionSettings};
pub use login::{Credentials, LoginSelectors, LoginTimeouts};
