use rand::prelude::*;
use servi_vr_lib::{RobotState, Rotation, TelemetrySnapshot};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Radius of the circular path the simulated robot drives, in meters.
const ORBIT_RADIUS: f64 = 2.0;
/// Battery percentage never drains below this.
const BATTERY_FLOOR_PCT: f64 = 20.0;
const BATTERY_DRAIN_PER_TICK: f64 = 0.001;
const STATE_FLIP_PROBABILITY: f64 = 0.001;
const WARNING_PROBABILITY: f64 = 0.002;

/// States the simulation wanders between. Error states are never entered
/// spontaneously.
const REACHABLE_STATES: [RobotState; 4] = [
    RobotState::Idle,
    RobotState::Navigating,
    RobotState::Docked,
    RobotState::Charging,
];

/// Opaque key identifying one telemetry subscriber.
pub type SubscriberId = u64;

/// A live telemetry feed. Keep `rx` to receive one frame per tick and
/// pass `id` back to [`RobotSimulator::unsubscribe`] when done.
pub struct TelemetrySubscription {
    pub id: SubscriberId,
    pub rx: UnboundedReceiver<TelemetrySnapshot>,
}

struct SimulatorState {
    telemetry: TelemetrySnapshot,
    subscribers: HashMap<SubscriberId, UnboundedSender<TelemetrySnapshot>>,
    next_subscriber: SubscriberId,
    rng: StdRng,
}

impl SimulatorState {
    /// Advance the simulation by one tick at wall-clock time `now_ms`.
    fn advance(&mut self, now_ms: u64) {
        let t = now_ms as f64 / 5000.0;

        // Circular path around the scene origin
        self.telemetry.position.x = t.cos() * ORBIT_RADIUS;
        self.telemetry.position.y = t.sin() * ORBIT_RADIUS;

        // Face the direction of travel, from the previous tick's velocity
        let heading = self
            .telemetry
            .velocity
            .linear
            .atan2(self.telemetry.velocity.angular);
        self.telemetry.rotation = Rotation::from_yaw(heading);

        self.telemetry.velocity.linear = 0.5 + self.rng.gen::<f64>() * 0.2;
        self.telemetry.velocity.angular = self.rng.gen::<f64>() * 0.1 - 0.05;

        self.telemetry.battery.percentage = (self.telemetry.battery.percentage
            - BATTERY_DRAIN_PER_TICK)
            .max(BATTERY_FLOOR_PCT);
        self.telemetry.battery.voltage = 44.0 + self.telemetry.battery.percentage / 100.0 * 4.0;
        self.telemetry.battery.current = 2.0 + self.rng.gen::<f64>() * 2.0;
        self.telemetry.battery.temperature = 30.0 + self.rng.gen::<f64>() * 5.0;

        if self.rng.gen::<f64>() < STATE_FLIP_PROBABILITY {
            self.telemetry.status.state =
                REACHABLE_STATES[self.rng.gen_range(0..REACHABLE_STATES.len())];
        }

        if self.rng.gen::<f64>() < WARNING_PROBABILITY {
            let warning = if self.rng.gen::<f64>() > 0.5 {
                "Warning: Low battery"
            } else {
                "Warning: High CPU usage"
            };
            self.telemetry.status.push_warning(warning);
        }

        self.telemetry.sensors.imu.pitch = (t * 2.0).sin() * 2.0;
        self.telemetry.sensors.imu.roll = (t * 3.0).cos() * 1.0;
        self.telemetry.sensors.imu.yaw = (t * 50.0) % 360.0;

        self.telemetry.network.signal_strength = -40.0 + self.rng.gen::<f64>() * -10.0;
        self.telemetry.network.latency = 10.0 + self.rng.gen::<f64>() * 20.0;

        self.telemetry.timestamp = now_ms;
    }

    /// Send the current frame to every subscriber, dropping any whose
    /// receiver has gone away.
    fn publish(&mut self) {
        let frame = self.telemetry.clone();
        self.subscribers.retain(|_, tx| tx.send(frame.clone()).is_ok());
    }
}

/// Simulated 10 Hz telemetry source for one Servi robot.
///
/// Cheap to clone; all clones share the same simulation. The ticker task
/// only runs between [`start`](Self::start) and [`stop`](Self::stop),
/// but snapshots and subscriptions work at any time.
#[derive(Clone)]
pub struct RobotSimulator {
    state: Arc<Mutex<SimulatorState>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
}

impl RobotSimulator {
    pub fn new(robot_id: &str, tick_interval: Duration) -> Self {
        Self::from_rng(robot_id, tick_interval, StdRng::from_entropy())
    }

    /// Deterministic variant for tests and reproducible demos.
    pub fn with_seed(robot_id: &str, tick_interval: Duration, seed: u64) -> Self {
        Self::from_rng(robot_id, tick_interval, StdRng::seed_from_u64(seed))
    }

    fn from_rng(robot_id: &str, tick_interval: Duration, rng: StdRng) -> Self {
        let state = SimulatorState {
            telemetry: TelemetrySnapshot::initial(robot_id),
            subscribers: HashMap::new(),
            next_subscriber: 0,
            rng,
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            ticker: Arc::new(Mutex::new(None)),
            tick_interval,
        }
    }

    /// Start the tick loop. Only one ticker runs at a time: calling this
    /// while already running replaces the previous ticker.
    pub fn start(&self) {
        let state = Arc::clone(&self.state);
        let tick_interval = self.tick_interval;

        let ticker = tokio::spawn(async move {
            loop {
                tokio::time::sleep(tick_interval).await;
                if let Ok(mut sim) = state.lock() {
                    let now = now_millis();
                    sim.advance(now);
                    sim.publish();
                }
            }
        });

        if let Some(previous) = self.ticker.lock().unwrap().replace(ticker) {
            previous.abort();
        }
    }

    /// Stop the tick loop. Safe to call when not running.
    pub fn stop(&self) {
        if let Some(ticker) = self.ticker.lock().unwrap().take() {
            ticker.abort();
        }
    }

    /// Register a listener that receives every future telemetry frame.
    pub fn subscribe(&self) -> TelemetrySubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock().unwrap();
        let id = state.next_subscriber;
        state.next_subscriber += 1;
        state.subscribers.insert(id, tx);

        TelemetrySubscription { id, rx }
    }

    /// Remove a subscriber. Unknown or already-removed ids are a no-op.
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.state.lock().unwrap().subscribers.remove(&id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().unwrap().subscribers.len()
    }

    /// Copy of the current telemetry frame. Mutating the returned value
    /// has no effect on the simulation.
    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.state.lock().unwrap().telemetry.clone()
    }

    /// Override the commanded velocity until the next tick resamples it.
    pub fn set_velocity(&self, linear: f64, angular: f64) {
        let mut state = self.state.lock().unwrap();
        state.telemetry.velocity.linear = linear;
        state.telemetry.velocity.angular = angular;
    }

    /// Override the position until the next tick puts the robot back on
    /// its orbit.
    pub fn set_position(&self, x: f64, y: f64) {
        let mut state = self.state.lock().unwrap();
        state.telemetry.position.x = x;
        state.telemetry.position.y = y;
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use servi_vr_lib::MAX_STATUS_MESSAGES;

    fn test_sim() -> RobotSimulator {
        RobotSimulator::with_seed("SERVI-001", Duration::from_millis(100), 42)
    }

    /// Drive one tick synchronously, without the ticker task.
    fn tick(sim: &RobotSimulator) {
        let mut state = sim.state.lock().unwrap();
        let now = now_millis();
        state.advance(now);
        state.publish();
    }

    #[test]
    fn test_tick_keeps_robot_on_orbit() {
        let sim = test_sim();
        tick(&sim);

        let frame = sim.telemetry();
        let distance = (frame.position.x.powi(2) + frame.position.y.powi(2)).sqrt();
        assert!((distance - ORBIT_RADIUS).abs() < 1e-9);
        assert_eq!(frame.position.z, 0.0);
    }

    #[test]
    fn test_tick_value_envelopes() {
        let sim = test_sim();

        for _ in 0..50 {
            tick(&sim);
            let frame = sim.telemetry();

            assert!(frame.velocity.linear >= 0.5 && frame.velocity.linear < 0.7);
            assert!(frame.velocity.angular >= -0.05 && frame.velocity.angular < 0.05);
            assert!(frame.battery.current >= 2.0 && frame.battery.current < 4.0);
            assert!(frame.battery.temperature >= 30.0 && frame.battery.temperature < 35.0);
            assert!(frame.network.signal_strength > -50.0 && frame.network.signal_strength <= -40.0);
            assert!(frame.network.latency >= 10.0 && frame.network.latency < 30.0);
            assert!(frame.sensors.imu.yaw >= 0.0 && frame.sensors.imu.yaw < 360.0);

            let expected_voltage = 44.0 + frame.battery.percentage / 100.0 * 4.0;
            assert!((frame.battery.voltage - expected_voltage).abs() < 1e-9);
        }
    }

    #[test]
    fn test_battery_drains_monotonically_to_floor() {
        let sim = test_sim();

        // Start just above the floor so we reach it quickly
        sim.state.lock().unwrap().telemetry.battery.percentage = BATTERY_FLOOR_PCT + 0.005;

        let mut previous = sim.telemetry().battery.percentage;
        for _ in 0..20 {
            tick(&sim);
            let current = sim.telemetry().battery.percentage;
            assert!(current <= previous);
            assert!(current >= BATTERY_FLOOR_PCT);
            previous = current;
        }
        assert_eq!(previous, BATTERY_FLOOR_PCT);
    }

    #[test]
    fn test_rotation_derived_from_previous_velocity() {
        let sim = test_sim();

        // First tick: velocity is still zero, atan2(0, 0) = 0, identity rotation
        tick(&sim);
        let first = sim.telemetry();
        assert!((first.rotation.z - 0.0).abs() < 1e-9);
        assert!((first.rotation.w - 1.0).abs() < 1e-9);

        // Second tick: heading comes from the velocity sampled on tick one
        let velocity = first.velocity;
        tick(&sim);
        let second = sim.telemetry();
        let heading = velocity.linear.atan2(velocity.angular);
        assert!((second.rotation.z - (heading / 2.0).sin()).abs() < 1e-9);
        assert!((second.rotation.w - (heading / 2.0).cos()).abs() < 1e-9);
    }

    #[test]
    fn test_warnings_stay_bounded_over_long_runs() {
        let sim = test_sim();

        for _ in 0..10_000 {
            tick(&sim);
            assert!(sim.telemetry().status.warnings.len() <= MAX_STATUS_MESSAGES);
        }
    }

    #[test]
    fn test_subscriber_receives_each_tick() {
        let sim = test_sim();
        let mut subscription = sim.subscribe();

        tick(&sim);
        tick(&sim);
        tick(&sim);

        let mut timestamps = Vec::new();
        while let Ok(frame) = subscription.rx.try_recv() {
            timestamps.push(frame.timestamp);
        }

        assert_eq!(timestamps.len(), 3);
        assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_unsubscribe_stops_delivery_and_is_idempotent() {
        let sim = test_sim();
        let mut subscription = sim.subscribe();
        assert_eq!(sim.subscriber_count(), 1);

        sim.unsubscribe(subscription.id);
        assert_eq!(sim.subscriber_count(), 0);

        tick(&sim);
        assert!(subscription.rx.try_recv().is_err());

        // Releasing the same handle again changes nothing
        sim.unsubscribe(subscription.id);
        assert_eq!(sim.subscriber_count(), 0);
    }

    #[test]
    fn test_unsubscribe_leaves_other_subscribers_alone() {
        let sim = test_sim();
        let first = sim.subscribe();
        let mut second = sim.subscribe();

        sim.unsubscribe(first.id);
        tick(&sim);

        assert_eq!(sim.subscriber_count(), 1);
        assert!(second.rx.try_recv().is_ok());
    }

    #[test]
    fn test_dropped_receiver_is_pruned_on_publish() {
        let sim = test_sim();
        let subscription = sim.subscribe();
        drop(subscription);

        assert_eq!(sim.subscriber_count(), 1);
        tick(&sim);
        assert_eq!(sim.subscriber_count(), 0);
    }

    #[test]
    fn test_snapshot_is_a_defensive_copy() {
        let sim = test_sim();

        let mut copy = sim.telemetry();
        copy.battery.percentage = 0.0;
        copy.status.push_error("tampered");

        let fresh = sim.telemetry();
        assert_eq!(fresh.battery.percentage, 85.0);
        assert!(fresh.status.errors.is_empty());
    }

    #[test]
    fn test_set_velocity_and_position_overrides() {
        let sim = test_sim();

        sim.set_velocity(1.5, 0.25);
        sim.set_position(7.0, -7.0);

        let frame = sim.telemetry();
        assert_eq!(frame.velocity.linear, 1.5);
        assert_eq!(frame.velocity.angular, 0.25);
        assert_eq!(frame.position.x, 7.0);
        assert_eq!(frame.position.y, -7.0);

        // The next tick puts the robot back on its orbit
        tick(&sim);
        let frame = sim.telemetry();
        let distance = (frame.position.x.powi(2) + frame.position.y.powi(2)).sqrt();
        assert!((distance - ORBIT_RADIUS).abs() < 1e-9);
    }

    #[test]
    fn test_stop_without_start_is_a_noop() {
        let sim = test_sim();
        sim.stop();
        sim.stop();
    }

    #[tokio::test]
    async fn test_start_ticks_and_stop_halts() {
        let sim = RobotSimulator::with_seed("SERVI-001", Duration::from_millis(20), 7);
        let mut subscription = sim.subscribe();

        sim.start();
        let first = tokio::time::timeout(Duration::from_secs(2), subscription.rx.recv())
            .await
            .expect("no frame within two seconds")
            .expect("feed closed");
        assert_eq!(first.id, "SERVI-001");

        sim.stop();
        // Let any in-flight tick land, then drain and verify silence
        tokio::time::sleep(Duration::from_millis(100)).await;
        while subscription.rx.try_recv().is_ok() {}

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(subscription.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_restart_does_not_stack_tickers() {
        let sim = RobotSimulator::with_seed("SERVI-001", Duration::from_millis(50), 7);
        let mut subscription = sim.subscribe();

        sim.start();
        sim.start();

        tokio::time::sleep(Duration::from_millis(350)).await;
        sim.stop();

        let mut frames = 0;
        while subscription.rx.try_recv().is_ok() {
            frames += 1;
        }

        // A leaked second ticker would roughly double the frame rate
        assert!(frames >= 3, "expected some frames, got {}", frames);
        assert!(frames <= 9, "too many frames for one ticker: {}", frames);
    }
}
