//! Rolys page grabber.
//!
//! Three cooperating components mirror the browser extension they came
//! from: the popup sends one-shot action requests, the content script
//! extracts text or packages images from the page's content region, and
//! the background worker executes download instructions. Host capabilities
//! (tabs, messaging, file saving, downloads, clock) are traits so the same
//! flow runs inside a real host, in tests, or from the CLI.

pub mod api;
pub mod config;
pub mod content;
pub mod error;
pub mod host;
pub mod message;
pub mod popup;
pub mod runtime;
pub mod worker;

pub use error::{Result, RolysError};
