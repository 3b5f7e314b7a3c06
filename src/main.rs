use std::net::SocketAddr;

use clap::Parser;
use tracing::{error, info};
use zentro::cli::{
    Args, auth_settings, build_config, handle_create_admin, init_logging, load_jwt_secret,
    open_database,
};
use zentro::{create_app, init_cleanup};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let jwt_secret = match load_jwt_secret(args.jwt_secret_file.as_deref()) {
        Ok(secret) => secret,
        Err(e) => {
            error!(error = %e, "Set JWT_SECRET (recommended) or use --jwt-secret-file");
            std::process::exit(1);
        }
    };
    let settings = auth_settings(&args, jwt_secret);

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(email) = args.create_admin.as_deref() {
        handle_create_admin(&db, email).await;
    }

    let config = match build_config(db, &settings, args.ip_header.clone()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    init_cleanup(&config.db).await;

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = match listener.local_addr() {
        Ok(a) => a,
        Err(e) => {
            error!(error = %e, "Failed to read local address");
            std::process::exit(1);
        }
    };

    let app = create_app(&config);

    info!(address = %local_addr, "Listening");

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
