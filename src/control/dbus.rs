// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! D-Bus implementation of the control client
//!
//! The session (bus connection plus proxy) is created on first use and kept
//! for the lifetime of the gateway. A transport failure drops it; the next
//! operation rebuilds it with exponential backoff. Concurrent operations
//! share one reconnection cycle, so no operation waits longer than one
//! cycle plus its own call timeout.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::sync::{Mutex, RwLock};
use zbus::proxy::CacheProperties;
use zbus::zvariant::{OwnedValue, Value};
use zbus::{fdo, proxy, Connection, DBusError};

use super::{AcquisitionRequest, ControlClient, ControlError, ControlResult, SpectrumRecord};
use crate::config::{BusKind, ControlConfig};

/// D-Bus error name GIO uses for `G_IO_ERROR_NOT_FOUND` when no domain mapping is registered
const GIO_NOT_FOUND_ERROR: &str = "org.gtk.GDBus.UnmappedGError.Quark._g_2dio_2derror_2dquark.Code1";

/// Proxy of the `hodr.server.Control` interface
///
/// Member names mix conventions on the remote side, so every member carries
/// its exact D-Bus name.
#[proxy(
    gen_blocking = false,
    interface = "hodr.server.Control",
    default_service = "hodr.server.Control",
    default_path = "/hodr/server/Control"
)]
trait Control {
    #[zbus(name = "stop_acquisition")]
    fn stop_acquisition(&self) -> zbus::Result<()>;

    #[zbus(name = "activate")]
    fn activate(&self) -> zbus::Result<bool>;

    #[zbus(name = "deactivate")]
    fn deactivate(&self) -> zbus::Result<bool>;

    #[zbus(name = "reset")]
    fn reset(&self) -> zbus::Result<bool>;

    #[zbus(name = "set_temperature")]
    fn set_temperature(&self, target: i32) -> zbus::Result<bool>;

    #[zbus(name = "start_acquisition")]
    fn start_acquisition(
        &self,
        integration_time: f64,
        interval_time: f64,
        mode: u32,
        n_captures: u32,
    ) -> zbus::Result<i32>;

    #[zbus(name = "get_data")]
    fn get_data(&self) -> zbus::Result<OwnedValue>;

    #[zbus(property, name = "active")]
    fn active(&self) -> zbus::Result<bool>;

    #[zbus(property, name = "Temperature")]
    fn temperature(&self) -> zbus::Result<f64>;

    #[zbus(property, name = "TargetTemperature")]
    fn target_temperature(&self) -> zbus::Result<f64>;

    #[zbus(property, name = "TemperatureStatus")]
    fn temperature_status(&self) -> zbus::Result<String>;

    #[zbus(property, name = "numberSpectra")]
    fn number_spectra(&self) -> zbus::Result<u32>;

    #[zbus(property, name = "acquisitionStatus")]
    fn acquisition_status(&self) -> zbus::Result<i32>;

    #[zbus(property, name = "dataReady")]
    fn data_ready(&self) -> zbus::Result<bool>;

    #[zbus(property, name = "dataPath")]
    fn data_path(&self) -> zbus::Result<String>;
}

/// Bus connection and proxy currently in use
#[derive(Clone)]
struct Session {
    /// Distinguishes successive sessions, so a late failure report from an
    /// old session never drops a newer one
    generation: u64,
    connection: Connection,
    proxy: ControlProxy<'static>,
}

/// Control client talking to `hodr.server.Control` over D-Bus
pub struct DbusControlClient {
    config: ControlConfig,
    session: RwLock<Option<Session>>,
    /// Held by the task running a reconnection cycle
    reconnecting: Mutex<()>,
    generations: AtomicU64,
}

impl DbusControlClient {
    pub fn new(config: ControlConfig) -> Self {
        Self {
            config,
            session: RwLock::new(None),
            reconnecting: Mutex::new(()),
            generations: AtomicU64::new(0),
        }
    }

    /// Upper bound of one operation: a full reconnection cycle plus the call
    fn operation_deadline(&self) -> Duration {
        self.config
            .reconnect_budget()
            .saturating_add(self.config.call_timeout())
    }

    async fn current(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Return the live session, establishing it when needed
    ///
    /// A single reconnection cycle runs at a time. Callers arriving during a
    /// cycle wait for its outcome instead of queueing cycles of their own.
    async fn session(&self) -> ControlResult<Session> {
        if let Some(session) = self.current().await {
            return Ok(session);
        }

        let _cycle = match self.reconnecting.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(
                    "Waiting for the reconnection to {} in progress",
                    self.config.service_name
                );
                let _joined = self.reconnecting.lock().await;
                return self.current().await.ok_or_else(|| {
                    ControlError::Connection(format!(
                        "reconnection to {} failed",
                        self.config.service_name
                    ))
                });
            }
        };
        // A cycle may have finished between the read and taking the gate
        if let Some(session) = self.current().await {
            return Ok(session);
        }

        let mut backoff = self.config.reconnect_backoff();
        let mut last_error = ControlError::Connection("no connection attempt made".to_string());
        for attempt in 1..=self.config.reconnect_attempts {
            match self.establish().await {
                Ok(session) => {
                    info!(
                        "Connected to {} at {} (attempt {})",
                        self.config.service_name, self.config.object_path, attempt
                    );
                    *self.session.write().await = Some(session.clone());
                    return Ok(session);
                }
                Err(e) => {
                    warn!(
                        "Connection attempt {}/{} to {} failed: {}",
                        attempt, self.config.reconnect_attempts, self.config.service_name, e
                    );
                    last_error = e;
                    if attempt < self.config.reconnect_attempts {
                        tokio::time::sleep(backoff).await;
                        backoff = backoff.saturating_mul(2);
                    }
                }
            }
        }
        Err(last_error)
    }

    /// Open the bus connection, build the proxy and ping the remote object
    async fn establish(&self) -> ControlResult<Session> {
        let timeout = self.config.call_timeout();
        let attempt = async {
            let connection = match self.config.bus {
                BusKind::Session => Connection::session().await?,
                BusKind::System => Connection::system().await?,
                BusKind::Address => {
                    let address = self.config.bus_address.as_deref().unwrap_or_default();
                    zbus::connection::Builder::address(address)?.build().await?
                }
                BusKind::Peer => {
                    let address = self.config.bus_address.as_deref().unwrap_or_default();
                    zbus::connection::Builder::address(address)?
                        .p2p()
                        .build()
                        .await?
                }
            };

            let proxy = ControlProxy::builder(&connection)
                .destination(self.config.service_name.clone())?
                .path(self.config.object_path.clone())?
                .cache_properties(CacheProperties::No)
                .build()
                .await?;

            ping(&connection, &self.config).await?;
            Ok::<_, zbus::Error>((connection, proxy))
        };

        match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok((connection, proxy))) => Ok(Session {
                generation: self.generations.fetch_add(1, Ordering::Relaxed) + 1,
                connection,
                proxy,
            }),
            Ok(Err(e)) => Err(ControlError::Connection(e.to_string())),
            Err(_) => Err(ControlError::Connection(format!(
                "no answer from {} within {:?}",
                self.config.service_name, timeout
            ))),
        }
    }

    /// Forget `failed` so the next operation reconnects
    async fn invalidate(&self, failed: &Session) {
        let mut slot = self.session.write().await;
        if slot
            .as_ref()
            .is_some_and(|session| session.generation == failed.generation)
        {
            *slot = None;
            warn!("Control session to {} dropped", self.config.service_name);
        }
    }

    /// Run one remote operation, reconnecting first when needed
    ///
    /// The whole operation is bounded by [`Self::operation_deadline`]; the
    /// remote call alone by the call timeout.
    async fn call<T, F, Fut>(&self, operation: &str, f: F) -> ControlResult<T>
    where
        F: FnOnce(ControlProxy<'static>) -> Fut + Send,
        Fut: Future<Output = zbus::Result<T>> + Send,
        T: Send,
    {
        let deadline = self.operation_deadline();
        let run = async {
            let session = self.session().await?;
            let after = self.config.call_timeout();
            debug!("Calling {} on {}", operation, self.config.service_name);

            match tokio::time::timeout(after, f(session.proxy.clone())).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => {
                    let error = classify(operation, e);
                    if error.is_transport() {
                        self.invalidate(&session).await;
                    }
                    Err(error)
                }
                Err(_) => Err(ControlError::Timeout {
                    operation: operation.to_string(),
                    after,
                }),
            }
        };

        match tokio::time::timeout(deadline, run).await {
            Ok(result) => result,
            Err(_) => Err(ControlError::Timeout {
                operation: operation.to_string(),
                after: deadline,
            }),
        }
    }

    async fn ping_session(&self) -> ControlResult<()> {
        let session = self.session().await?;
        let after = self.config.call_timeout();
        match tokio::time::timeout(after, ping(&session.connection, &self.config)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                // A failed ping means the peer is gone, whatever the error says
                self.invalidate(&session).await;
                Err(ControlError::Connection(e.to_string()))
            }
            Err(_) => {
                self.invalidate(&session).await;
                Err(ControlError::Timeout {
                    operation: "ping".to_string(),
                    after,
                })
            }
        }
    }
}

/// `org.freedesktop.DBus.Peer.Ping` on the control object
async fn ping(connection: &Connection, config: &ControlConfig) -> zbus::Result<()> {
    let peer = fdo::PeerProxy::builder(connection)
        .destination(config.service_name.clone())?
        .path(config.object_path.clone())?
        .cache_properties(CacheProperties::No)
        .build()
        .await?;
    peer.ping().await?;
    Ok(())
}

/// Map a zbus failure onto the gateway's error categories
fn classify(operation: &str, error: zbus::Error) -> ControlError {
    match error {
        zbus::Error::MethodError(name, detail, _) => {
            classify_error_name(operation, name.as_str(), detail.unwrap_or_default())
        }
        zbus::Error::FDO(fdo_error) => match *fdo_error {
            fdo::Error::ZBus(inner) => classify(operation, inner),
            other => {
                let name = other.name().to_string();
                let detail = other.description().unwrap_or_default().to_string();
                classify_error_name(operation, &name, detail)
            }
        },
        zbus::Error::InputOutput(e) => ControlError::Connection(e.to_string()),
        zbus::Error::Variant(e) => ControlError::MalformedReply {
            operation: operation.to_string(),
            reason: e.to_string(),
        },
        zbus::Error::InvalidReply => ControlError::MalformedReply {
            operation: operation.to_string(),
            reason: "unexpected reply".to_string(),
        },
        other => ControlError::CallFailed {
            operation: operation.to_string(),
            reason: other.to_string(),
        },
    }
}

fn classify_error_name(operation: &str, name: &str, detail: String) -> ControlError {
    match name {
        GIO_NOT_FOUND_ERROR => ControlError::NotFound(detail),
        "org.freedesktop.DBus.Error.UnknownProperty" => {
            ControlError::PropertyNotFound(operation.to_string())
        }
        // GDBus answers an unknown property with InvalidArgs
        "org.freedesktop.DBus.Error.InvalidArgs" if detail.contains("property") => {
            ControlError::PropertyNotFound(operation.to_string())
        }
        "org.freedesktop.DBus.Error.ServiceUnknown"
        | "org.freedesktop.DBus.Error.NameHasNoOwner"
        | "org.freedesktop.DBus.Error.NoReply"
        | "org.freedesktop.DBus.Error.Disconnected"
        | "org.freedesktop.DBus.Error.UnknownObject" => {
            ControlError::Connection(format!("{}: {}", name, detail))
        }
        _ => ControlError::CallFailed {
            operation: operation.to_string(),
            reason: format!("{}: {}", name, detail),
        },
    }
}

/// Decode the variant returned by `get_data`, expected to hold `(sddai)`
fn decode_spectrum(reply: &Value<'_>) -> ControlResult<SpectrumRecord> {
    let malformed = |reason: String| ControlError::MalformedReply {
        operation: "get_data".to_string(),
        reason,
    };

    let mut value = reply;
    while let Value::Value(inner) = value {
        value = inner.as_ref();
    }

    let fields = match value {
        Value::Structure(structure) => structure.fields(),
        other => {
            return Err(malformed(format!(
                "expected a structure, got signature {}",
                other.value_signature()
            )))
        }
    };
    if fields.len() != 4 {
        return Err(malformed(format!(
            "expected 4 fields, got {}",
            fields.len()
        )));
    }

    let timestamp = match &fields[0] {
        Value::Str(s) => s.as_str().to_string(),
        _ => return Err(malformed("timestamp is not a string".to_string())),
    };
    let integration_time = match &fields[1] {
        Value::F64(v) => *v,
        _ => return Err(malformed("integration time is not a double".to_string())),
    };
    let temperature = match &fields[2] {
        Value::F64(v) => *v,
        _ => return Err(malformed("temperature is not a double".to_string())),
    };
    let data = match &fields[3] {
        Value::Array(array) => array
            .iter()
            .map(|item| match item {
                Value::I32(v) => Ok(*v),
                _ => Err(malformed("spectrum sample is not an int32".to_string())),
            })
            .collect::<ControlResult<Vec<i32>>>()?,
        _ => return Err(malformed("spectrum data is not an array".to_string())),
    };

    Ok(SpectrumRecord {
        timestamp,
        integration_time,
        temperature,
        data,
    })
}

#[async_trait]
impl ControlClient for DbusControlClient {
    fn backend_name(&self) -> &'static str {
        "dbus"
    }

    async fn connect(&self) -> ControlResult<()> {
        let deadline = self.operation_deadline();
        match tokio::time::timeout(deadline, self.session()).await {
            Ok(result) => result.map(|_| ()),
            Err(_) => Err(ControlError::Connection(format!(
                "no session to {} within {:?}",
                self.config.service_name, deadline
            ))),
        }
    }

    async fn health_check(&self) -> ControlResult<()> {
        let deadline = self.operation_deadline();
        match tokio::time::timeout(deadline, self.ping_session()).await {
            Ok(result) => result,
            Err(_) => Err(ControlError::Timeout {
                operation: "ping".to_string(),
                after: deadline,
            }),
        }
    }

    async fn active(&self) -> ControlResult<bool> {
        self.call("active", |p| async move { p.active().await })
            .await
    }

    async fn temperature(&self) -> ControlResult<f64> {
        self.call("Temperature", |p| async move { p.temperature().await })
            .await
    }

    async fn target_temperature(&self) -> ControlResult<f64> {
        self.call("TargetTemperature", |p| async move {
            p.target_temperature().await
        })
        .await
    }

    async fn temperature_status(&self) -> ControlResult<String> {
        self.call("TemperatureStatus", |p| async move {
            p.temperature_status().await
        })
        .await
    }

    async fn number_spectra(&self) -> ControlResult<u32> {
        self.call("numberSpectra", |p| async move { p.number_spectra().await })
            .await
    }

    async fn acquisition_status(&self) -> ControlResult<i32> {
        self.call("acquisitionStatus", |p| async move {
            p.acquisition_status().await
        })
        .await
    }

    async fn data_ready(&self) -> ControlResult<bool> {
        self.call("dataReady", |p| async move { p.data_ready().await })
            .await
    }

    async fn data_path(&self) -> ControlResult<String> {
        self.call("dataPath", |p| async move { p.data_path().await })
            .await
    }

    async fn stop_acquisition(&self) -> ControlResult<()> {
        self.call("stop_acquisition", |p| async move {
            p.stop_acquisition().await
        })
        .await
    }

    async fn activate(&self) -> ControlResult<bool> {
        self.call("activate", |p| async move { p.activate().await })
            .await
    }

    async fn deactivate(&self) -> ControlResult<bool> {
        self.call("deactivate", |p| async move { p.deactivate().await })
            .await
    }

    async fn reset(&self) -> ControlResult<bool> {
        self.call("reset", |p| async move { p.reset().await }).await
    }

    async fn set_temperature(&self, target: i32) -> ControlResult<bool> {
        self.call("set_temperature", move |p| async move {
            p.set_temperature(target).await
        })
        .await
    }

    async fn start_acquisition(&self, request: &AcquisitionRequest) -> ControlResult<i32> {
        let request = *request;
        self.call("start_acquisition", move |p| async move {
            p.start_acquisition(
                request.integration_time,
                request.interval_time,
                request.mode.code(),
                request.capture_count,
            )
            .await
        })
        .await
    }

    async fn get_data(&self) -> ControlResult<SpectrumRecord> {
        let reply = self
            .call("get_data", |p| async move { p.get_data().await })
            .await?;
        decode_spectrum(&reply)
    }
}

impl std::fmt::Debug for DbusControlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbusControlClient")
            .field("service_name", &self.config.service_name)
            .field("object_path", &self.config.object_path)
            .finish()
    }
}
