pub mod config;
pub mod map_types;
pub mod presence_types;
pub mod robot_types;
pub mod telemetry;

pub use config::*;
pub use map_types::*;
pub use presence_types::*;
pub use robot_types::*;
pub use telemetry::*;
