use std::net::SocketAddr;

use clap::Parser;
use tokengate::cli::{
    Args, build_config, handle_create_admin, init_logging, load_jwt_secret, open_database,
};
use tokengate::{create_app, init_cleanup};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    let config = build_config(&args, db, jwt_secret);

    if let Some(username) = &args.create_admin {
        handle_create_admin(&config.db, username, config.clock.as_ref()).await;
    }

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap_or_else(|e| {
        error!(error = %e, "Failed to read local address");
        std::process::exit(1);
    });

    init_cleanup(&config).await;
    let app = create_app(&config);

    info!(
        address = %local_addr,
        access_ttl_secs = config.tokens.access_ttl_secs,
        refresh_ttl_secs = config.tokens.refresh_ttl_secs,
        "Listening"
    );

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
