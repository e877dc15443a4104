use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Oldest warnings/errors are dropped once a status list grows past this.
pub const MAX_STATUS_MESSAGES: usize = 5;

/// One complete telemetry frame for a single robot, as sent to the
/// WebXR frontend on every simulation tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub id: String,
    /// Milliseconds since Unix epoch
    pub timestamp: u64,
    pub position: Position,
    pub rotation: Rotation,
    pub velocity: Velocity,
    pub battery: BatteryState,
    pub status: StatusInfo,
    pub sensors: SensorSuite,
    pub network: NetworkState,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Orientation quaternion (x, y, z, w)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Rotation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Rotation {
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }

    /// Quaternion for a rotation of `angle` radians about the vertical axis.
    pub fn from_yaw(angle: f64) -> Self {
        let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle);
        Self {
            x: q.i,
            y: q.j,
            z: q.k,
            w: q.w,
        }
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::identity()
    }
}

/// Differential-drive velocity: linear (m/s) and angular (rad/s)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub linear: f64,
    pub angular: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryState {
    pub percentage: f64,
    pub voltage: f64,
    pub current: f64,
    pub temperature: f64,
}

/// Operational state plus bounded error/warning histories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub state: RobotState,
    pub mode: ControlMode,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl StatusInfo {
    /// Append a warning, evicting the oldest once the list is full.
    pub fn push_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
        if self.warnings.len() > MAX_STATUS_MESSAGES {
            self.warnings.remove(0);
        }
    }

    /// Append an error, evicting the oldest once the list is full.
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        if self.errors.len() > MAX_STATUS_MESSAGES {
            self.errors.remove(0);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotState {
    Idle,
    Navigating,
    Docked,
    Charging,
    Error,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    Autonomous,
    Manual,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSuite {
    pub lidar: LidarState,
    pub cameras: CameraState,
    pub imu: ImuState,
    pub encoders: EncoderState,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LidarState {
    pub points: u32,
    pub range: f64,
}

/// Health flags for the three onboard cameras.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CameraState {
    pub front: bool,
    pub rear: bool,
    pub depth: bool,
}

/// Attitude in degrees
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ImuState {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
}

/// Cumulative wheel encoder counts
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EncoderState {
    pub left: i64,
    pub right: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkState {
    pub connected: bool,
    /// Wi-Fi RSSI in dBm
    pub signal_strength: f64,
    pub latency: f64,
}

impl TelemetrySnapshot {
    /// Frame for a robot that has just powered on and not yet moved.
    pub fn initial(robot_id: &str) -> Self {
        Self {
            id: robot_id.to_string(),
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_millis() as u64,
            position: Position::default(),
            rotation: Rotation::identity(),
            velocity: Velocity::default(),
            battery: BatteryState {
                percentage: 85.0,
                voltage: 48.2,
                current: 2.5,
                temperature: 32.0,
            },
            status: StatusInfo {
                state: RobotState::Idle,
                mode: ControlMode::Autonomous,
                errors: Vec::new(),
                warnings: Vec::new(),
            },
            sensors: SensorSuite {
                lidar: LidarState {
                    points: 1024,
                    range: 10.0,
                },
                cameras: CameraState {
                    front: true,
                    rear: true,
                    depth: true,
                },
                imu: ImuState::default(),
                encoders: EncoderState::default(),
            },
            network: NetworkState {
                connected: true,
                signal_strength: -45.0,
                latency: 12.0,
            },
        }
    }
}
