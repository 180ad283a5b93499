//! Cartwheel CLI - inspect and edit the remote cart from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart with product names and totals
//! cartwheel show
//!
//! # Put two Large units of product 5 in the cart
//! cartwheel add 5 large 2
//!
//! # Change the quantity of an existing line
//! cartwheel set 5 large 3
//!
//! # Remove a line, or everything
//! cartwheel remove 5 large
//! cartwheel clear
//!
//! # Print the order draft the checkout page would submit
//! cartwheel checkout
//! ```
//!
//! # Environment Variables
//!
//! - `CART_API_BASE_URL` - Cart backend base URL
//! - `CART_API_TOKEN` - Bearer token for the signed-in user
//! - `SENTRY_DSN` - Report warnings and errors to Sentry (optional)

#![cfg_attr(not(test), forbid(unsafe_code))]

use cartwheel_core::Size;
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "cartwheel")]
#[command(author, version, about = "Cartwheel cart client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cart with product details and totals
    Show,
    /// Add a product, or update the quantity of an existing line
    Add {
        /// Product ID
        product: i32,
        /// Size label (`small`, `2xl`, `no-size`) or wire code (0-8)
        #[arg(value_parser = parse_size)]
        size: Size,
        /// Quantity (0 removes the line)
        #[arg(default_value_t = 1)]
        quantity: i64,
    },
    /// Set the quantity of a line
    Set {
        product: i32,
        #[arg(value_parser = parse_size)]
        size: Size,
        quantity: i64,
    },
    /// Remove a line
    Remove {
        product: i32,
        #[arg(value_parser = parse_size)]
        size: Size,
    },
    /// Remove every line
    Clear,
    /// Print the total number of units
    Count,
    /// Print the order draft as JSON
    Checkout,
}

/// Accept a wire code or a size label, ignoring case, spaces and dashes.
fn parse_size(raw: &str) -> Result<Size, String> {
    if let Ok(code) = raw.parse::<i32>() {
        return Size::try_from(code).map_err(|e| e.to_string());
    }

    let normalize = |s: &str| {
        s.chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase()
    };
    let wanted = normalize(raw);

    Size::ALL
        .into_iter()
        .find(|size| normalize(size.label()) == wanted)
        .ok_or_else(|| format!("Unknown size: {raw}"))
}

/// Start Sentry when `SENTRY_DSN` is set. Keep the guard alive until exit.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|s| !s.is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Warnings and errors become Sentry events; info and debug become
/// breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cartwheel_sync=info,cartwheel_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let session = commands::Session::connect().await?;

    match cli.command {
        Commands::Show => commands::cart::show(&session).await?,
        Commands::Add {
            product,
            size,
            quantity,
        } => commands::cart::add(&session, product, size, quantity).await?,
        Commands::Set {
            product,
            size,
            quantity,
        } => commands::cart::set(&session, product, size, quantity).await?,
        Commands::Remove { product, size } => commands::cart::remove(&session, product, size).await?,
        Commands::Clear => commands::cart::clear(&session).await?,
        Commands::Count => commands::cart::count(&session),
        Commands::Checkout => commands::checkout::checkout(&session)?,
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_accepts_codes_and_labels() {
        assert_eq!(parse_size("2").unwrap(), Size::Large);
        assert_eq!(parse_size("large").unwrap(), Size::Large);
        assert_eq!(parse_size("2XL").unwrap(), Size::XXL);
        assert_eq!(parse_size("no-size").unwrap(), Size::NoSize);
        assert_eq!(parse_size("8").unwrap(), Size::NoSize);
    }

    #[test]
    fn test_parse_size_rejects_unknown() {
        assert!(parse_size("9").is_err());
        assert!(parse_size("huge").is_err());
    }

    #[test]
    fn test_cli_parses_add() {
        let cli = Cli::try_parse_from(["cartwheel", "add", "5", "xl", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Add {
                product: 5,
                size: Size::XL,
                quantity: 3
            }
        ));
    }
}
