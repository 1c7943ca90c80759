//! One-shot SMS relay used to forward MFA codes.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

const TWILIO_API: &str = "https://api.twilio.com";

/// Fire-and-forget message sender.
///
/// Returns `true` when the provider accepted the message. Implementations log
/// their own failures; callers never retry.
#[async_trait]
pub trait Notifier: Send + Sync {
	async fn send(&self, number: &str, text: &str) -> bool;
}

/// Notifier used when no relay credentials are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
	async fn send(&self, number: &str, _text: &str) -> bool {
		debug!(target = "statusbulb.relay", %number, "relay disabled; message dropped");
		false
	}
}

/// Sends SMS through the Twilio Messages API.
#[derive(Debug, Clone)]
pub struct TwilioNotifier {
	http: reqwest::Client,
	api_base: String,
	account_sid: String,
	auth_token: String,
	from_number: String,
}

impl TwilioNotifier {
	pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>, from_number: impl Into<String>) -> reqwest::Result<Self> {
		let http = reqwest::Client::builder().timeout(Duration::from_secs(15)).build()?;
		Ok(Self {
			http,
			api_base: TWILIO_API.to_string(),
			account_sid: account_sid.into(),
			auth_token: auth_token.into(),
			from_number: from_number.into(),
		})
	}

	/// Points the notifier at a different API host.
	pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
		self.api_base = api_base.into().trim_end_matches('/').to_string();
		self
	}

	fn messages_url(&self) -> String {
		format!("{}/2010-04-01/Accounts/{}/Messages.json", self.api_base, self.account_sid)
	}
}

#[async_trait]
impl Notifier for TwilioNotifier {
	async fn send(&self, number: &str, text: &str) -> bool {
		let form = [("To", number), ("From", self.from_number.as_str()), ("Body", text)];
		let result = self
			.http
			.post(self.messages_url())
			.basic_auth(&self.account_sid, Some(&self.auth_token))
			.form(&form)
			.send()
			.await;

		match result {
			Ok(response) if response.status().is_success() => {
				debug!(target = "statusbulb.relay", %number, "message accepted");
				true
			}
			Ok(response) => {
				warn!(target = "statusbulb.relay", %number, status = %response.status(), "relay rejected message");
				false
			}
			Err(err) => {
				warn!(target = "statusbulb.relay", %number, error = %err, "relay request failed");
				false
			}
		}
	}
}
