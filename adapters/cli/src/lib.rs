#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wiring that turns the Marble Maze crates into a playable game.
//!
//! The binary in `main.rs` only parses arguments; everything it runs lives
//! here so the frame loop can be exercised headlessly in tests.

pub mod config;
pub mod input;
pub mod scene;
pub mod session;
pub mod simulate;
pub mod validate;

pub use config::{ConfigError, GameConfig};
pub use session::{BodyConfig, Session, SessionConfig, SessionError, SessionEvent};
