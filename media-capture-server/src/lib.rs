//! # media-capture-server
//!
//! TCP command layer over `media-capture-core`.
//!
//! ```text
//! client ──line──▶ server ──Command──▶ MediaController ──▶ CaptureService
//!        ◀─text / FILE:<name>:<len>\n<bytes>──────────────┘
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod protocol;
pub mod server;

pub use config::ServerConfig;
pub use controller::MediaController;
pub use error::ServerError;
pub use protocol::{Command, Reply};
