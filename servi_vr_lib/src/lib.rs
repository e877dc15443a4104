//! # Servi VR Library
//!
//! Shared types and utilities for the Servi VR visualization backend.
//! This library is used by the relay server and by any tool that needs
//! to speak the same wire format as the WebXR frontend.

pub mod types;
pub mod utils;

// Re-export everything for convenience
pub use types::*;
pub use utils::*;
