// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rocket instance construction

use std::sync::Arc;

use rocket::config::LogLevel;
use rocket::data::{Limits, ToByteUnit};
use rocket::figment::Figment;
use rocket::{catchers, routes, Build, Rocket};

use super::{api, commands, cors, handlers};
use crate::config::Config;
use crate::control::SharedControlClient;

/// Rocket configuration derived from the gateway configuration
pub fn gateway_figment(config: &Config) -> Figment {
    rocket::Config::figment()
        .merge(("ident", config.server.name.clone()))
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port))
        .merge(("limits", Limits::new().limit("string", 64.kibibytes())))
        .merge(("log_level", LogLevel::Normal))
}

/// Build the gateway's Rocket instance
///
/// # Arguments
///
/// * `figment` - Rocket configuration (address, port, limits)
/// * `config` - Gateway configuration, used for the www and data directories
/// * `client` - Control client shared by every route
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use hodr_gateway::config::Config;
/// use hodr_gateway::control::MockControlClient;
/// use hodr_gateway::server::{build_rocket, gateway_figment};
///
/// # async fn example() {
/// let config = Arc::new(Config::default());
/// let rocket = build_rocket(
///     gateway_figment(&config),
///     config.clone(),
///     Arc::new(MockControlClient::new()),
/// );
/// let _ = rocket.launch().await;
/// # }
/// ```
pub fn build_rocket(
    figment: Figment,
    config: Arc<Config>,
    client: SharedControlClient,
) -> Rocket<Build> {
    rocket::custom(figment)
        .attach(cors::CORS)
        .mount(
            "/",
            routes![
                handlers::index,
                handlers::index_html,
                handlers::favicon,
                handlers::style,
                cors::options,
            ],
        )
        .mount(
            "/",
            routes![
                api::status,
                api::temperature,
                api::target_temperature,
                api::temperature_status,
                api::data_ready,
                api::number_spectra,
                api::acquisition_status,
                api::power_status,
                api::data,
                api::health,
            ],
        )
        .mount(
            "/",
            routes![
                commands::stop_acquisition,
                commands::activate,
                commands::deactivate,
                commands::reset,
                commands::set_target_temperature,
                commands::start_acquisition,
                commands::get_spectrum,
            ],
        )
        .register(
            "/",
            catchers![handlers::not_found, handlers::default_catcher],
        )
        .manage(config)
        .manage(client)
}
