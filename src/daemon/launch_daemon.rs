// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Management Module
//!
//! Runs the gateway's background tasks and coordinates their shutdown:
//!
//! - HTTP server (Rocket)
//! - Control session health monitor
//! - Heartbeat
//!
//! ## Usage
//!
//! ```no_run
//! use hodr_gateway::{config::Config, daemon::launch_daemon::Daemon};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config).await?;
//!
//!     // Later, trigger a graceful shutdown
//!     daemon.shutdown();
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Result;
use log::{debug, error, info, warn};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::{Config, ControlConfig};
use crate::control::{create_client, SharedControlClient};
use crate::server::{build_rocket, gateway_figment};

/// Period of the heartbeat log line
const HEARTBEAT_PERIOD: Duration = Duration::from_secs(60);

/// Coordinates the gateway's background tasks
///
/// * `tasks` - Handles of the running tasks, awaited by `join()`
/// * `running` - Flag checked by the periodic tasks between iterations
/// * `wakeup` - Interrupts the periodic tasks' sleep on shutdown
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    wakeup: Arc<Notify>,
    client: Option<SharedControlClient>,
    http_shutdown: Option<rocket::Shutdown>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a daemon with no task running
    ///
    /// ```
    /// use hodr_gateway::daemon::launch_daemon::Daemon;
    ///
    /// let daemon = Daemon::new();
    /// assert!(daemon.control_client().is_none());
    /// ```
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            wakeup: Arc::new(Notify::new()),
            client: None,
            http_shutdown: None,
        }
    }

    /// Launch all configured tasks
    ///
    /// The control client is created from `config.control` and a first
    /// connection is attempted. An unreachable control object does not
    /// prevent the gateway from starting: requests answer 502 until the
    /// health monitor or a request re-establishes the session.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP server configuration is rejected by Rocket
    /// (invalid address, port already bound).
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        let client = create_client(&config.control);
        info!(
            "Using {} control backend for {} at {}",
            client.backend_name(),
            config.control.service_name,
            config.control.object_path
        );
        match client.connect().await {
            Ok(()) => info!("Control object reachable"),
            Err(e) => warn!("Control object not reachable yet: {}", e),
        }
        self.client = Some(client.clone());

        if config.server.enabled {
            self.start_http_server(config, client.clone()).await?;
        } else {
            warn!("HTTP server disabled by configuration");
        }

        self.start_health_monitor(&config.control, client)?;
        self.start_heartbeat()?;

        Ok(())
    }

    /// Control client shared by the running tasks, once launched
    pub fn control_client(&self) -> Option<SharedControlClient> {
        self.client.clone()
    }

    /// Ignite and launch the Rocket server in its own task
    async fn start_http_server(
        &mut self,
        config: &Config,
        client: SharedControlClient,
    ) -> Result<()> {
        info!(
            "Starting web server on {}:{}",
            config.server.address, config.server.port
        );
        info!(
            "Serving static files from {:?}, data files from {:?}",
            config.server.resolved_www_dir(),
            config.data.base_dir
        );

        let figment = gateway_figment(config);
        let rocket = build_rocket(figment, Arc::new(config.clone()), client);
        let ignited = rocket
            .ignite()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to configure the web server: {}", e))?;
        self.http_shutdown = Some(ignited.shutdown());

        let task = tokio::spawn(async move {
            ignited
                .launch()
                .await
                .map_err(|e| anyhow::anyhow!("Web server error: {}", e))?;
            info!("Web server stopped");
            Ok::<(), anyhow::Error>(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Periodically ping the control object
    ///
    /// A failed check drops the session; the next check (or request)
    /// reconnects with backoff.
    fn start_health_monitor(
        &mut self,
        control: &ControlConfig,
        client: SharedControlClient,
    ) -> Result<()> {
        let period = control.health_check_interval();
        info!("Starting control health monitor (every {:?})", period);

        let running = self.running.clone();
        let wakeup = self.wakeup.clone();
        let task = tokio::spawn(async move {
            let mut healthy = true;
            while running.load(Ordering::SeqCst) {
                tokio::select! {
                    _ = time::sleep(period) => {}
                    _ = wakeup.notified() => continue,
                }
                match client.health_check().await {
                    Ok(()) => {
                        if !healthy {
                            info!("Control object reachable again");
                        }
                        healthy = true;
                    }
                    Err(e) => {
                        if healthy {
                            error!("Control object health check failed: {}", e);
                        } else {
                            debug!("Control object still unreachable: {}", e);
                        }
                        healthy = false;
                    }
                }
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Log a heartbeat line while the daemon runs
    fn start_heartbeat(&mut self) -> Result<()> {
        info!("Starting heartbeat monitor");

        let running = self.running.clone();
        let wakeup = self.wakeup.clone();
        let task = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                debug!("Daemon heartbeat: running");
                tokio::select! {
                    _ = time::sleep(HEARTBEAT_PERIOD) => {}
                    _ = wakeup.notified() => {}
                }
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Signal all tasks to stop
    ///
    /// Only signals; call `join()` afterwards to wait for the tasks.
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
        self.wakeup.notify_waiters();
        if let Some(shutdown) = &self.http_shutdown {
            shutdown.clone().notify();
        }
    }

    /// Wait for all tasks to complete, at most 5 seconds each
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match time::timeout(Duration::from_secs(5), task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => error!("Task failed: {:#}", e),
                Ok(Err(e)) => error!("Task panicked: {}", e),
                Err(_) => warn!("Task did not complete within timeout period, may be hung"),
            }
        }
        Ok(())
    }
}
