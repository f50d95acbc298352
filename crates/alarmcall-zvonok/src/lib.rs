//! Client for the Zvonok voice-call API.
//!
//! Three operations share one request shape (a form with the public key,
//! the phone and the campaign ID) and one error contract: every failure is
//! a [`ZvonokError::Api`] whose message says what went wrong.
//!
//! # Example
//!
//! ```no_run
//! use alarmcall_zvonok::{ZvonokClient, ZvonokConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ZvonokConfig::new(
//!         std::env::var("ZVONOK_API_TOKEN").ok(),
//!         "270119321",
//!         "https://zvonok.com",
//!     );
//!     let client = ZvonokClient::new(config)?;
//!     let body = client.create_call("+15550001234").await?;
//!     println!("{}", body);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod response;
pub mod retry;

pub use client::{Endpoint, ZvonokClient, ZvonokConfig};
pub use error::{Result, ZvonokError};
pub use response::check_response;
pub use retry::RetryPolicy;
