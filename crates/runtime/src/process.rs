//! Port helper for driver processes launched by the runtime.

use std::net::TcpListener;

/// Asks the OS for a currently free localhost port.
///
/// The port is released before returning, so a racing process may still grab
/// it; callers that spawn a server on it should treat bind failure as a launch
/// failure.
pub fn free_local_port() -> std::io::Result<u16> {
	let listener = TcpListener::bind(("127.0.0.1", 0))?;
	Ok(listener.local_addr()?.port())
}
