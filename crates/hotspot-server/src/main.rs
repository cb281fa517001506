use clap::Parser;
use hotspot_server::auth::AuthEngine;
use hotspot_server::cache::{CacheBackend, ValkeyCache};
use hotspot_server::config::{parse_delay, Config};
use hotspot_server::expiration::ExpirationPolicy;
use hotspot_server::otp::OtpManager;
use hotspot_server::policy::{EmployeeDirectory, HttpEmployeeDirectory, PolicyEngine};
use hotspot_server::repo::{IdentityRepository, PgIdentityRepository};
use hotspot_server::server::{RadiusServer, ServerContext};
use hotspot_server::sms::{DebugSender, HttpSmsSender, SmsSender};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Hotspot RADIUS server - venue WiFi AAA backend
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "hotspot-radius")]
struct Cli {
    /// Path to configuration file
    #[arg(value_name = "CONFIG", default_value = "config.json")]
    config_path: String,

    /// Validate configuration and exit (doesn't start the server)
    #[arg(short, long)]
    validate: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing_subscriber::registry()
                .with(EnvFilter::new("info"))
                .with(tracing_subscriber::fmt::layer())
                .init();

            if cli.validate {
                eprintln!("Configuration validation failed: {}", e);
                process::exit(1);
            }

            warn!("Could not load config file from: {}", cli.config_path);
            info!("Creating example configuration at: {}", cli.config_path);
            if let Err(e) = Config::example().to_file(&cli.config_path) {
                error!("Error creating example config: {}", e);
                process::exit(1);
            }
            info!("Please edit {} and restart the server", cli.config_path);
            process::exit(0);
        }
    };

    if cli.validate {
        println!("Configuration validated successfully");
        println!("  Auth/acct/coa ports: {}/{}/{}", config.auth_port, config.acct_port, config.coa_port);
        println!("  RADIUS token mode: {}", config.radius_enabled);
        println!("  NAS clients: {}", config.clients.len());
        println!("  Employee directory: {}", config.employee_directory_url.as_deref().unwrap_or("(local table only)"));
        process::exit(0);
    }

    let log_level = config.log_level.as_deref().unwrap_or("info");
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Hotspot RADIUS server v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration from: {}", cli.config_path);

    if config.clients.is_empty() {
        warn!("No NAS clients configured; accepting any source with the default secret");
    }

    // Delay strings were validated with the config; parse_delay cannot fail
    // here, but keep the error path anyway.
    let expiration = match (parse_delay(&config.guest.delay), parse_delay(&config.staff.delay)) {
        (Ok(guest), Ok(staff)) => ExpirationPolicy::new(guest, staff),
        (Err(e), _) | (_, Err(e)) => {
            error!("Invalid delay configuration: {}", e);
            process::exit(1);
        }
    };

    let cache: Arc<dyn CacheBackend> =
        match ValkeyCache::connect(&config.cache_url, config.cache_key_prefix.clone()).await {
            Ok(cache) => Arc::new(cache),
            Err(e) => {
                error!("Cache connection failed: {}", e);
                process::exit(1);
            }
        };

    let repo: Arc<dyn IdentityRepository> =
        match PgIdentityRepository::connect(&config.database_url).await {
            Ok(repo) => Arc::new(repo),
            Err(e) => {
                error!("Database connection failed: {}", e);
                process::exit(1);
            }
        };

    let directory: Option<Arc<dyn EmployeeDirectory>> = config
        .employee_directory_url
        .as_deref()
        .map(|url| Arc::new(HttpEmployeeDirectory::new(url)) as Arc<dyn EmployeeDirectory>);
    if directory.is_some() {
        info!("Employee directory enabled, local table is the fallback");
    }

    let policy = PolicyEngine::new(
        Arc::clone(&repo),
        Arc::clone(&cache),
        directory,
        Duration::from_secs(config.employee_directory_cache_ttl_secs),
    );

    let sender: Arc<dyn SmsSender> = match &config.sms.url {
        Some(url) => Arc::new(HttpSmsSender::new(url.clone(), config.sms.api_key.clone())),
        None => {
            warn!("No SMS gateway configured, codes go to the log only");
            Arc::new(DebugSender)
        }
    };
    let otp = OtpManager::new(Arc::clone(&cache), sender);

    let engine = Arc::new(AuthEngine::new(Arc::clone(&repo), policy, expiration, otp));

    let ctx = ServerContext::new(Arc::new(config), engine, repo, cache);
    let server = match RadiusServer::bind(ctx).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to bind RADIUS sockets: {}", e);
            process::exit(1);
        }
    };

    info!("Server started, press Ctrl+C to stop");
    if let Err(e) = server.run().await {
        error!("Server error: {}", e);
        process::exit(1);
    }
}
