/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

mod config;

use crate::config::Config;
use clap::Parser;
use route_engine::{EngineError, RouteContext};
use std::fs;
use tracing::{info, warn};

#[derive(Parser)]
#[command()]
struct EngineArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), EngineError> {
    let _ = tracing_subscriber::fmt::try_init();

    info!("Started configurable-route-engine");

    let args = EngineArgs::parse();
    let contents = fs::read_to_string(&args.config)
        .map_err(|e| EngineError::Config(format!("Unable to read config file: {e}")))?;
    let config = Config::from_json5_str(&contents)?;

    let context = RouteContext::with_default_components(config.engine.clone());
    for route in &config.routes {
        context.add_route(route.to_definition()).await?;
    }
    context.start().await?;
    info!(
        context = %context.name(),
        routes = context.route_ids().len(),
        "route engine running, press ctrl-c to stop"
    );

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(err = %err, "unable to listen for shutdown signal");
    }

    info!("Stopping configurable-route-engine");
    context.shutdown().await
}
