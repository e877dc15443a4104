//! # Servi Relay Server
//!
//! Backend for the Servi WebXR visualization: a telemetry generator that
//! simulates one service robot, and a Socket.IO relay that fans telemetry
//! out to connected clients and forwards presence events between them.

pub mod relay;
pub mod simulator;
pub mod terminal;
