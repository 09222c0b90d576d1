//! AWS Lambda entry point.
//!
//! Serves the same router as the `sprintwise` binary behind API Gateway (HTTP API or REST API
//! proxy integration). Configuration comes from the function's environment; a config file is
//! only read if one is bundled and pointed to with `SPRINTWISE_CONFIG`.

use clap::Parser;
use sprintwise::{Application, Config, config::Args, telemetry};

#[tokio::main]
async fn main() -> Result<(), lambda_http::Error> {
    sprintwise::install_crypto_provider();

    // Lambda passes no arguments; only the environment is consulted
    let args = Args::parse_from(["sprintwise-lambda"]);
    let config = Config::load(&args)?;

    telemetry::init_telemetry(config.enable_otel_export)?;

    let router = Application::new(config).await?.into_router();
    let result = lambda_http::run(router).await;

    telemetry::shutdown_telemetry();
    result
}
