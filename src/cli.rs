//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::auth::{TokenIssuer, hash_password};
use crate::db::{Database, NewUser, UserRole};
use crate::server_config::{AuthSettings, ConfigError, Environment};
use crate::validators::{normalize_email, validate_email};
use clap::Parser;
use rand::{Rng, distr::Alphanumeric};
use tracing::{error, info};
use uuid::Uuid;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const ADMIN_PASSWORD_LENGTH: usize = 24;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "Zentro", about = "Storefront API with JWT cookie sessions")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "zentro.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Session token validity, e.g. "7d", "12h", or milliseconds
    #[arg(long, env = "JWT_EXPIRE", default_value = "7d")]
    pub jwt_expire: String,

    /// Session cookie max-age, same format as --jwt-expire
    #[arg(long, env = "JWT_COOKIE_EXPIRE", default_value = "7d")]
    pub jwt_cookie_expire: String,

    /// Deployment environment; "production" enables Secure, SameSite=None cookies
    #[arg(long, env = "NODE_ENV", default_value = "development")]
    pub node_env: String,

    /// Read the client IP from this header (e.g. x-forwarded-for) when behind a proxy
    #[arg(long)]
    pub ip_header: Option<String>,

    /// Create an admin account with this email on startup and print its password
    #[arg(long, value_name = "EMAIL")]
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

/// Load JWT secret from the `JWT_SECRET` environment variable or a file.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Result<String, ConfigError> {
    let from_env = std::env::var("JWT_SECRET").ok();
    if from_env.is_some() {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
    }
    resolve_jwt_secret(from_env, jwt_secret_file)
}

fn resolve_jwt_secret(
    from_env: Option<String>,
    jwt_secret_file: Option<&str>,
) -> Result<String, ConfigError> {
    let secret = match (from_env, jwt_secret_file) {
        (Some(secret), _) => secret,
        (None, Some(path)) => std::fs::read_to_string(path)
            .map_err(|e| ConfigError::UnreadableSecretFile {
                path: path.to_string(),
                reason: e.to_string(),
            })?
            .trim()
            .to_string(),
        (None, None) => return Err(ConfigError::MissingSecret),
    };

    if secret.is_empty() {
        return Err(ConfigError::MissingSecret);
    }

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::WeakSecret {
            min_len: MIN_JWT_SECRET_LENGTH,
        });
    }

    Ok(secret)
}

/// Build auth settings from validated arguments.
pub fn auth_settings(args: &Args, jwt_secret: String) -> AuthSettings {
    AuthSettings {
        jwt_secret: jwt_secret.into_bytes(),
        jwt_expire: args.jwt_expire.clone().into(),
        cookie_expire: args.jwt_cookie_expire.clone().into(),
        environment: Environment::from_node_env(&args.node_env),
    }
}

/// Build ServerConfig; fails only if the issuer cannot be created.
pub fn build_config(
    db: Database,
    settings: &AuthSettings,
    ip_header: Option<String>,
) -> Result<ServerConfig, ConfigError> {
    let issuer = TokenIssuer::new(settings)?;
    info!(
        environment = settings.environment.as_str(),
        token_ttl_ms = settings.jwt_expire.as_millis(),
        cookie_ttl_ms = settings.cookie_expire.as_millis(),
        "Session settings"
    );
    Ok(ServerConfig {
        db,
        issuer,
        ip_header,
    })
}

/// Handle the --create-admin flag: create a verified admin with a generated password.
pub async fn handle_create_admin(db: &Database, email: &str) {
    let email = normalize_email(email);
    if let Err(msg) = validate_email(&email) {
        error!(email = %email, "Invalid admin email: {}", msg);
        std::process::exit(1);
    }

    match db.users().get_by_email(&email).await {
        Ok(Some(existing)) => {
            println!();
            println!("User already exists: {} (role: {})", existing.email, existing.role.as_str());
            println!();
        }
        Ok(None) => {
            let password: String = rand::rng()
                .sample_iter(&Alphanumeric)
                .take(ADMIN_PASSWORD_LENGTH)
                .map(char::from)
                .collect();

            let hashed = {
                let password = password.clone();
                tokio::task::spawn_blocking(move || hash_password(&password)).await
            };
            let password_hash = match hashed {
                Ok(Ok(hash)) => hash,
                Ok(Err(e)) => {
                    error!(error = %e, "Failed to hash admin password");
                    std::process::exit(1);
                }
                Err(e) => {
                    error!(error = %e, "Admin password hashing task failed");
                    std::process::exit(1);
                }
            };

            let uuid = Uuid::new_v4().to_string();
            let created = db
                .users()
                .create(&NewUser {
                    uuid: &uuid,
                    name: "Administrator",
                    email: &email,
                    password_hash: &password_hash,
                    role: UserRole::Admin,
                })
                .await;

            match created {
                Ok(id) => {
                    if let Err(e) = db.users().mark_verified(id).await {
                        error!(error = %e, "Failed to mark admin as verified");
                    }
                    println!();
                    println!("Admin user created: {}", email);
                    println!("Password: {}", password);
                    println!();
                }
                Err(e) => {
                    error!(error = %e, "Failed to create admin user");
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to check for existing admin");
            std::process::exit(1);
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_secret_from_env_value() {
        assert_eq!(
            resolve_jwt_secret(Some(LONG_SECRET.to_string()), None),
            Ok(LONG_SECRET.to_string())
        );
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        assert_eq!(resolve_jwt_secret(None, None), Err(ConfigError::MissingSecret));
        assert_eq!(
            resolve_jwt_secret(Some(String::new()), None),
            Err(ConfigError::MissingSecret)
        );
    }

    #[test]
    fn test_short_secret_rejected() {
        assert_eq!(
            resolve_jwt_secret(Some("short".to_string()), None),
            Err(ConfigError::WeakSecret { min_len: 32 })
        );
    }

    #[test]
    fn test_secret_from_file() {
        let path = std::env::temp_dir().join(format!("zentro-secret-{}", Uuid::new_v4()));
        std::fs::write(&path, format!("{}\n", LONG_SECRET)).unwrap();

        let result = resolve_jwt_secret(None, path.to_str());
        std::fs::remove_file(&path).ok();
        assert_eq!(result, Ok(LONG_SECRET.to_string()));
    }

    #[test]
    fn test_unreadable_secret_file() {
        let result = resolve_jwt_secret(None, Some("/nonexistent/zentro/secret"));
        assert!(matches!(
            result,
            Err(ConfigError::UnreadableSecretFile { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_admin_stores_verified_admin() {
        let db = Database::open(":memory:").await.unwrap();
        handle_create_admin(&db, " Root@Example.com ").await;

        let admin = db
            .users()
            .get_by_email("root@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, UserRole::Admin);
        assert!(admin.is_verified);
        assert!(admin.password_hash.starts_with("$argon2"));

        handle_create_admin(&db, "root@example.com").await;
        let again = db
            .users()
            .get_by_email("root@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.uuid, admin.uuid);
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["zentro"]).unwrap();
        let settings = auth_settings(&args, LONG_SECRET.to_string());
        assert_eq!(settings.jwt_expire.as_millis(), 604_800_000);
        assert_eq!(settings.cookie_expire.as_millis(), 604_800_000);
    }

    #[test]
    fn test_args_production() {
        let args = Args::try_parse_from([
            "zentro",
            "--node-env",
            "production",
            "--jwt-expire",
            "1h",
            "--jwt-cookie-expire",
            "garbage",
        ])
        .unwrap();
        let settings = auth_settings(&args, LONG_SECRET.to_string());
        assert_eq!(settings.environment, Environment::Production);
        assert_eq!(settings.jwt_expire.as_millis(), 3_600_000);
        assert_eq!(settings.cookie_expire.as_millis(), 604_800_000);
    }
}
