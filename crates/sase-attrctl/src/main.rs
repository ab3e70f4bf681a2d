//! OpenSASE attribute resolution tool
//!
//! Builds the attribute repository from a TOML configuration and resolves
//! principals against it.
//!
//! # Usage
//!
//! ```bash
//! sase-attrctl --config attributes.toml resolve casuser alice
//! sase-attrctl --config attributes.toml sources
//! sase-attrctl --config attributes.toml check
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use sase_attributes::{AttributeRepositoryBuilder, RepositoryConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod output;

use output::{OutputFormat, ResolvedPrincipal, SourceRow};

#[derive(Parser)]
#[command(name = "sase-attrctl")]
#[command(version)]
#[command(about = "Resolve principal attributes across configured sources", long_about = None)]
struct Cli {
    /// Repository configuration file
    #[arg(long, short, env = "SASE_ATTRIBUTES_CONFIG", default_value = "/etc/opensase/attributes.toml")]
    config: String,

    /// Output format
    #[arg(long, short, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve attributes for one or more principals
    Resolve {
        /// Principal identifiers
        #[arg(required = true)]
        principals: Vec<String>,

        /// Print repository statistics afterwards
        #[arg(long)]
        stats: bool,
    },
    /// List sources in precedence order
    Sources,
    /// Validate the configuration
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = RepositoryConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;

    match cli.command {
        Commands::Check => {
            let settings = config.validate().context("invalid configuration")?;
            tracing::info!(
                "Configuration OK: merger={}, {} source(s), cache size {}, expiry {:?}",
                settings.merge_policy,
                config.sources.len(),
                settings.cache.maximum_size,
                settings.cache.time_to_live
            );
        }
        Commands::Sources => {
            let repository = AttributeRepositoryBuilder::from_config(&config)?.build()?;
            let rows: Vec<SourceRow> = repository
                .registry()
                .ordered_sources()
                .iter()
                .map(SourceRow::from)
                .collect();
            cli.format.print_sources(&rows);
        }
        Commands::Resolve { principals, stats } => {
            let repository = AttributeRepositoryBuilder::from_config(&config)?.build()?;

            let mut resolved = Vec::with_capacity(principals.len());
            for principal in principals {
                let attributes = repository.resolve(&principal).await;
                resolved.push(ResolvedPrincipal {
                    principal,
                    attributes: attributes.map(|a| (*a).clone()),
                });
            }
            cli.format.print_resolved(&resolved);

            if stats {
                cli.format.print(&repository.stats());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sase_attributes::SourceConfig;
    use std::path::Path;

    #[test]
    fn test_sample_config_locations_resolve_from_workspace_root() {
        let config = RepositoryConfig::from_toml_str(include_str!("../config/attributes.toml")).unwrap();
        config.validate().unwrap();

        let workspace = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
        for source in &config.sources {
            if let SourceConfig::Json { location, .. } = source {
                assert!(location.is_relative());
                assert!(workspace.join(location).is_file(), "{}", location.display());
            }
        }
    }
}
