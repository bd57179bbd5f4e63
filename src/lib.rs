//! Stealth browser automation over the Chrome DevTools Protocol.
//!
//! Connects to a running Chromium instance over a single websocket,
//! multiplexes any number of page sessions over it, tracks every page
//! through its navigation lifecycle and can harden pages against bot
//! detection with an ordered set of stealth patches, including a detector
//! and solver for Cloudflare Turnstile widgets.
//!
//! The design follows the handler pattern: [`Browser::connect`] returns the
//! api handle together with a [`Handler`] stream that owns the websocket.
//! Spawn a task that polls the handler; everything else is plain async
//! calls:
//!
//! ```no_run
//! use cdp_stealth::{Browser, BrowserConfig, StealthProfile};
//! use futures::StreamExt;
//!
//! # async fn run() -> Result<(), cdp_stealth::CdpError> {
//! let config = BrowserConfig::default().with_stealth(StealthProfile::default());
//! let (browser, mut handler) = Browser::connect(config).await?;
//! let driver = async_std::task::spawn(async move {
//!     while handler.next().await.is_some() {}
//! });
//!
//! let page = browser.new_page().await?;
//! page.navigate("https://example.com").await?;
//! let title = page.get_title().await?;
//! assert_eq!(title, "Example Domain");
//!
//! browser.close().await?;
//! driver.await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod browser;
pub mod cdp;
pub(crate) mod cmd;
pub mod conn;
pub mod emitter;
pub mod error;
pub mod handler;
pub mod input;
pub mod keys;
pub mod page;
pub mod protocol;
pub mod stealth;
pub mod turnstile;
pub(crate) mod utils;

pub use crate::browser::{Browser, BrowserConfig};
pub use crate::error::{CdpError, NavigationError, Result};
pub use crate::handler::Handler;
pub use crate::page::{Page, WaitUntil};
pub use crate::stealth::{PatchRegistry, StealthLevel, StealthProfile};
pub use crate::turnstile::TurnstileWatcher;
