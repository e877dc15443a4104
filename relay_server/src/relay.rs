use axum::http::{HeaderValue, Method};
use eyre::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use socketioxide::{
    extract::{Data, SocketRef, TryData},
    SocketIo,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use servi_vr_lib::RelayConfig;

use crate::simulator::{RobotSimulator, SubscriberId};
use crate::terminal;

/// Pose update sent by a client as it moves through the scene.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserMovePayload {
    pub position: [f64; 3],
    pub rotation: [f64; 4],
}

struct ConnectionState {
    subscription: SubscriberId,
    pending: Vec<JoinHandle<()>>,
}

/// Per-connection bookkeeping: which telemetry subscription a socket
/// owns and which spawned tasks (telemetry forwarder, delayed terminal
/// replies) must be cancelled when it disconnects.
#[derive(Clone, Default)]
pub struct ConnectionTasks {
    inner: Arc<Mutex<HashMap<String, ConnectionState>>>,
}

impl ConnectionTasks {
    pub fn register(&self, socket_id: &str, subscription: SubscriberId) {
        self.inner.lock().unwrap().insert(
            socket_id.to_string(),
            ConnectionState {
                subscription,
                pending: Vec::new(),
            },
        );
    }

    /// Track a task owned by this connection so teardown can cancel it.
    /// If the connection is already gone the task is aborted right away.
    pub fn track(&self, socket_id: &str, task: JoinHandle<()>) {
        let mut inner = self.inner.lock().unwrap();
        match inner.get_mut(socket_id) {
            Some(connection) => {
                connection.pending.retain(|t| !t.is_finished());
                connection.pending.push(task);
            }
            None => task.abort(),
        }
    }

    /// Abort everything this connection spawned and forget it, returning
    /// its telemetry subscription id so the caller can release that too.
    pub fn teardown(&self, socket_id: &str) -> Option<SubscriberId> {
        let connection = self.inner.lock().unwrap().remove(socket_id)?;
        for task in connection.pending {
            task.abort();
        }
        Some(connection.subscription)
    }

    pub fn connection_count(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn pending_count(&self, socket_id: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .get(socket_id)
            .map(|connection| connection.pending.len())
            .unwrap_or(0)
    }
}

/// Everything the socket handlers need, cloned into each closure.
#[derive(Clone)]
pub struct RelayState {
    pub simulator: RobotSimulator,
    pub connections: ConnectionTasks,
    command_delay: Duration,
}

impl RelayState {
    pub fn new(simulator: RobotSimulator, config: &RelayConfig) -> Self {
        Self {
            simulator,
            connections: ConnectionTasks::default(),
            command_delay: Duration::from_millis(config.command_delay_ms),
        }
    }
}

pub fn setup_socketio(state: RelayState) -> (SocketIo, socketioxide::layer::SocketIoLayer) {
    let (layer, io) = SocketIo::new_layer();

    io.ns("/", move |socket: SocketRef| {
        let socket_id = socket.id.to_string();
        tracing::info!("Client connected: {}", socket_id);

        // Send the current frame immediately so the scene renders a
        // robot before the first tick arrives
        socket.emit("telemetry", state.simulator.telemetry()).ok();

        // Follow the tick feed for the rest of this connection
        let subscription = state.simulator.subscribe();
        state.connections.register(&socket_id, subscription.id);

        let socket_clone = socket.clone();
        let mut feed = subscription.rx;
        let forwarder = tokio::spawn(async move {
            while let Some(frame) = feed.recv().await {
                if socket_clone.emit("telemetry", frame).is_err() {
                    break;
                }
            }
        });
        state.connections.track(&socket_id, forwarder);

        socket.on("user:join", move |socket: SocketRef, Data::<Value>(user)| {
            let username = user
                .get("username")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            tracing::info!("User joined: {}", username);
            // The 1-tuple keeps the payload a single event argument;
            // a bare array would be spread into several
            socket.broadcast().emit("user:joined", (user,)).ok();
        });

        socket.on(
            "user:move",
            move |socket: SocketRef, TryData::<UserMovePayload>(payload)| match payload {
                Ok(payload) => {
                    let sender_id = socket.id.to_string();
                    socket
                        .broadcast()
                        .emit("user:moved", (sender_id, payload.position, payload.rotation))
                        .ok();
                }
                Err(err) => {
                    tracing::warn!("Ignoring malformed user:move payload: {}", err);
                }
            },
        );

        socket.on(
            "annotation:add",
            move |socket: SocketRef, Data::<Value>(annotation)| {
                let text = annotation.get("text").and_then(Value::as_str).unwrap_or("");
                tracing::info!("Annotation added: {}", text);
                socket.broadcast().emit("annotation:added", (annotation,)).ok();
            },
        );

        let state_clone = state.clone();
        socket.on(
            "terminal:command",
            move |socket: SocketRef, Data::<String>(command)| {
                tracing::info!("Terminal command: {}", command);

                let socket_id = socket.id.to_string();
                let lines = terminal::response_lines(&command);
                let delay = state_clone.command_delay;

                // Replies go to the sender only, after a short delay, and
                // die with the connection
                let socket_clone = socket.clone();
                let reply = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    for line in lines {
                        if socket_clone.emit("terminal:output", line).is_err() {
                            break;
                        }
                    }
                });
                state_clone.connections.track(&socket_id, reply);
            },
        );

        let state_clone = state.clone();
        socket.on_disconnect(move |socket: SocketRef| {
            let socket_id = socket.id.to_string();
            tracing::info!("Client disconnected: {}", socket_id);

            if let Some(subscription) = state_clone.connections.teardown(&socket_id) {
                state_clone.simulator.unsubscribe(subscription);
                tracing::debug!(
                    "Telemetry subscribers remaining: {}",
                    state_clone.simulator.subscriber_count()
                );
            }
            socket.broadcast().emit("user:left", socket_id).ok();
        });
    });

    (io, layer)
}

fn build_cors(allowed_origins: &[String]) -> CorsLayer {
    // A wildcard origin cannot be combined with credentials
    if allowed_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST]);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let allowed_headers = [
        axum::http::header::CONTENT_TYPE,
        axum::http::header::AUTHORIZATION,
        axum::http::header::ACCEPT,
    ];

    if origins.is_empty() {
        tracing::warn!("No valid CORS origins configured, defaulting to localhost");
        CorsLayer::new()
            .allow_origin([
                "http://localhost:3000".parse::<HeaderValue>().unwrap(),
                "http://localhost:5173".parse::<HeaderValue>().unwrap(),
            ])
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(allowed_headers)
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(allowed_headers)
            .allow_credentials(true)
    }
}

/// Handle for the running relay server.
pub struct RelayServerHandle {
    address: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RelayServerHandle {
    /// Return the bound listening address.
    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Trigger graceful shutdown and await completion.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(()) => Ok(()),
            Err(err) => Err(eyre::eyre!(err)),
        }
    }

    /// Block until the server task exits on its own.
    pub async fn wait(self) -> Result<()> {
        match self.task.await {
            Ok(()) => Ok(()),
            Err(err) => Err(eyre::eyre!(err)),
        }
    }
}

/// Bind the relay and serve Socket.IO traffic until shut down.
///
/// The simulator must already be owned by the caller; the relay only
/// subscribes connections to it and never starts or stops it.
pub async fn spawn_relay(config: &RelayConfig, simulator: RobotSimulator) -> Result<RelayServerHandle> {
    let state = RelayState::new(simulator, config);
    let (_io, layer) = setup_socketio(state);

    let cors_layer = build_cors(&config.allowed_origins);
    tracing::info!("CORS allowed origins: {:?}", config.allowed_origins);

    let app = axum::Router::new().layer(ServiceBuilder::new().layer(cors_layer).layer(layer));

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!("Socket.IO relay listening on http://{}", local_addr);

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        });
        if let Err(err) = server.await {
            tracing::warn!("Relay server exited with error: {}", err);
        }
    });

    Ok(RelayServerHandle {
        address: local_addr,
        shutdown: shutdown_tx,
        task,
    })
}
