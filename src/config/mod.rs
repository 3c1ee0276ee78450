pub mod credentials;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use toml_config::{LogFormat, SourceKind, SyncConfig};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "owner-sync")]
#[command(
    about = "Make open deal owners own their organizations, and organization owners own their contact people"
)]
pub struct CliConfig {
    /// Path to the TOML configuration file (default: ./owner-sync.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Read recorded JSON collections from this directory instead of the live API
    #[arg(long)]
    pub fixtures: Option<String>,

    /// Log the owner changes that would be made without sending them
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Command line flags override the file.
    pub fn apply_to(&self, config: &mut SyncConfig) {
        if let Some(dir) = &self.fixtures {
            config.source.kind = SourceKind::Fixture;
            config.source.fixture_dir = dir.clone();
        }
        if self.dry_run {
            config.reconcile.dry_run = true;
        }
        if self.json_logs {
            config.logging.format = LogFormat::Json;
        }
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_file() {
        let cli = CliConfig::parse_from([
            "owner-sync",
            "--fixtures",
            "recorded",
            "--dry-run",
            "--json-logs",
        ]);
        let mut config = SyncConfig::default();

        cli.apply_to(&mut config);

        assert_eq!(config.source.kind, SourceKind::Fixture);
        assert_eq!(config.source.fixture_dir, "recorded");
        assert!(config.reconcile.dry_run);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_no_flags_keep_file_values() {
        let cli = CliConfig::parse_from(["owner-sync"]);
        let mut config = SyncConfig::default();
        config.reconcile.dry_run = true;

        cli.apply_to(&mut config);

        assert!(config.reconcile.dry_run);
        assert_eq!(config.source.kind, SourceKind::Live);
    }
}
