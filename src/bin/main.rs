use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use reelgate::{AppConfig, AuthSettings, DatabaseConfig, create_app};

#[derive(Parser)]
#[command(name = "reelgate")]
#[command(about = "Movie review REST API with token-gated writes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST server
    Server {
        #[arg(short, long, default_value = "8080")]
        port: u16,
        #[arg(long, default_value = "memory")]
        db_url: String,
        /// Name of the review table (required; startup fails without it)
        #[arg(long, env = "REVIEWS_TABLE")]
        table: String,
        /// Full JWKS URL, overriding the well-known issuer location
        #[arg(long, env = "JWKS_URL")]
        jwks_url: Option<String>,
        /// Issuer region, used to build the well-known JWKS URL
        #[arg(long, env = "AWS_REGION")]
        region: Option<String>,
        /// Issuer user pool id, used to build the well-known JWKS URL
        #[arg(long, env = "USER_POOL_ID")]
        user_pool_id: Option<String>,
        /// Always verify with the first key in the set, ignoring the token
        /// kid (compatibility mode)
        #[arg(long, default_value_t = false)]
        use_first_key: bool,
    },
    /// Initialize the review table schema
    Init {
        #[arg(long, default_value = "memory")]
        db_url: String,
        #[arg(long, env = "REVIEWS_TABLE")]
        table: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("reelgate=info".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server {
            port,
            db_url,
            table,
            jwks_url,
            region,
            user_pool_id,
            use_first_key,
        } => {
            let auth = AuthSettings::resolve(
                jwks_url,
                region.as_deref(),
                user_pool_id.as_deref(),
                use_first_key,
            )?;
            info!("Verifying credentials against {}", auth.jwks_url);

            let config = AppConfig {
                database: DatabaseConfig {
                    url: db_url,
                    ..Default::default()
                },
                table,
                auth,
            };
            info!("Using database url: {}", config.database.url);

            let app = create_app(config).await?;

            let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
            info!("Review API listening on http://0.0.0.0:{}", port);

            axum::serve(listener, app).await?;
        }
        Commands::Init { db_url, table } => {
            let config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Using database url for initialization: {}", config.url);

            let db = reelgate::create_connection(config).await?;
            reelgate::ensure_schema(&db, &table).await?;
            info!("Review table `{}` initialized successfully", table);
        }
    }

    Ok(())
}
