//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::cleanup::CleanupSchedule;
use crate::clock::{Clock, SystemClock};
use crate::db::{Database, UserRole};
use crate::jwt::{DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS, TokenConfig};
use crate::password;
use crate::rate_limit::LoginQuota;
use clap::Parser;
use rand::Rng;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{error, info};

const MIN_JWT_SECRET_LENGTH: usize = 32;
const GENERATED_PASSWORD_LENGTH: usize = 24;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tokengate",
    about = "JWT access/refresh token service with a rotating refresh whitelist"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE", default_value = "tokengate.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, env = "ACCESS_TTL_SECS", default_value_t = DEFAULT_ACCESS_TTL_SECS,
        value_parser = clap::value_parser!(u64).range(1..))]
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, env = "REFRESH_TTL_SECS", default_value_t = DEFAULT_REFRESH_TTL_SECS,
        value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh_ttl_secs: u64,

    /// UTC hour at which stale refresh tokens are swept
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(0..24))]
    pub cleanup_hour: u8,

    /// Use the first X-Forwarded-For entry as client IP (only behind a trusted proxy)
    #[arg(long)]
    pub trust_forwarded_for: bool,

    /// Set the Secure flag on cookies (enable when served over HTTPS)
    #[arg(long)]
    pub secure_cookies: bool,

    /// Login attempts allowed in a burst per client IP
    #[arg(long, default_value = "5")]
    pub login_burst: NonZeroU32,

    /// Create a local admin account with this username on startup.
    /// The password is read from ADMIN_PASSWORD or generated and printed once
    #[arg(long, value_name = "USERNAME")]
    pub create_admin: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // SAFETY: called during startup before the runtime spawns other tasks
        // that could read the environment.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    check_secret_length(&secret)?;
    Some(secret)
}

fn check_secret_length(secret: &str) -> Option<()> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }
    Some(())
}

/// Random alphanumeric password for a freshly created admin.
pub fn generate_password() -> String {
    rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(GENERATED_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

/// Handle the --create-admin flag: create a local admin, or report that the
/// username is already taken. Exits the process on failure.
pub async fn handle_create_admin(db: &Database, username: &str, clock: &dyn Clock) {
    let username = username.trim();

    match db.users().get_by_username(username).await {
        Ok(Some(existing)) => {
            println!();
            println!(
                "User already exists: {} (role: {})",
                existing.username,
                existing.role.as_str()
            );
            println!();
            return;
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "Failed to check for existing admin");
            std::process::exit(1);
        }
    }

    let (password, generated) = match std::env::var("ADMIN_PASSWORD") {
        Ok(password) => {
            // SAFETY: startup, no other tasks read the environment yet.
            unsafe { std::env::remove_var("ADMIN_PASSWORD") };
            (password, false)
        }
        Err(_) => (generate_password(), true),
    };

    let hash = match password::hash_password(&password).await {
        Ok(hash) => hash,
        Err(e) => {
            error!(error = %e, "Failed to hash admin password");
            std::process::exit(1);
        }
    };

    match db
        .users()
        .create_local(username, &hash, UserRole::Admin, None, None, clock.now())
        .await
    {
        Ok(_) => {
            info!(username = %username, "Admin user created");
            println!();
            println!("Admin user created: {}", username);
            if generated {
                println!("Password: {}", password);
            }
            println!();
        }
        Err(e) => {
            error!(error = %e, "Failed to create admin user");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, jwt_secret: String) -> ServerConfig {
    ServerConfig {
        db,
        tokens: TokenConfig {
            secret: jwt_secret.into_bytes(),
            access_ttl_secs: args.access_ttl_secs,
            refresh_ttl_secs: args.refresh_ttl_secs,
        },
        clock: Arc::new(SystemClock),
        secure_cookies: args.secure_cookies,
        trust_forwarded_for: args.trust_forwarded_for,
        login_quota: LoginQuota {
            burst: args.login_burst,
            ..LoginQuota::default()
        },
        cleanup: CleanupSchedule {
            hour_utc: args.cleanup_hour,
            ..CleanupSchedule::default()
        },
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
