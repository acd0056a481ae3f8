use std::error::Error;
use std::fs;

use clap::Parser;
use leaf_core::config::{config_dir, AppConfig, ConfigError};
use leaf_core::profiles::{ConnectionProfile, FileProfilesStore};
use leaf_tui::{TuiError, TuiOptions};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "leaf.log";

/// Browse and edit MongoDB collections from the terminal.
#[derive(Debug, Parser)]
#[command(name = "leaf", version, about)]
struct Cli {
    /// Connection URL. Takes precedence over any saved profile.
    #[arg(long)]
    url: Option<String>,
    /// Name of a saved connection profile.
    #[arg(long)]
    profile: Option<String>,
    /// Disable editing and deleting documents.
    #[arg(long)]
    read_only: bool,
}

/// Picks the URL to open: `--url`, then the requested or default profile,
/// then the configured default URL.
fn resolve_options(
    cli: &Cli,
    config: &AppConfig,
    profiles: &[ConnectionProfile],
) -> Result<TuiOptions, Box<dyn Error>> {
    if let Some(url) = &cli.url {
        return Ok(TuiOptions {
            url: url.clone(),
            profile: None,
            read_only: cli.read_only,
        });
    }

    let find = |name: &str| profiles.iter().find(|profile| profile.name == name).cloned();
    let profile = match (&cli.profile, &config.default_profile) {
        (Some(name), _) => Some(find(name).ok_or_else(|| format!("unknown profile `{name}`"))?),
        (None, Some(name)) => {
            let profile = find(name);
            if profile.is_none() {
                warn!(profile = %name, "default profile not found, using default url");
            }
            profile
        }
        (None, None) => None,
    };

    Ok(match profile {
        Some(profile) => TuiOptions {
            url: profile.url.clone(),
            read_only: cli.read_only || profile.read_only,
            profile: Some(profile),
        },
        None => TuiOptions {
            url: config.default_url.clone(),
            profile: None,
            read_only: cli.read_only,
        },
    })
}

fn load_config() -> Result<AppConfig, ConfigError> {
    match AppConfig::load_default() {
        Err(ConfigError::ConfigDirUnavailable) => Ok(AppConfig::default()),
        result => result,
    }
}

/// Routes tracing output to a daily log file so it never draws over the UI.
/// `RUST_LOG` overrides the configured filter.
fn init_logging(default_filter: &str) -> Option<WorkerGuard> {
    let Some(log_dir) = config_dir().map(|dir| dir.join("logs")) else {
        eprintln!("leaf: no config directory, logging disabled");
        return None;
    };
    if let Err(error) = fs::create_dir_all(&log_dir) {
        eprintln!(
            "leaf: cannot create log directory {}: {error}",
            log_dir.display()
        );
        return None;
    }

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME));
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init();
    if installed.is_err() {
        eprintln!("leaf: a global logger is already installed");
    }
    Some(guard)
}

fn run_app(
    options: TuiOptions,
    run_tui: impl FnOnce(TuiOptions) -> Result<(), TuiError>,
) -> Result<(), Box<dyn Error>> {
    info!(read_only = options.read_only, "starting leaf");
    run_tui(options)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = load_config()?;
    let _log_guard = init_logging(&config.log_filter);

    let wants_profile =
        cli.url.is_none() && (cli.profile.is_some() || config.default_profile.is_some());
    let profiles = if wants_profile {
        FileProfilesStore::load_default()?.profiles().to_vec()
    } else {
        Vec::new()
    };

    let options = resolve_options(&cli, &config, &profiles)?;
    run_app(options, leaf_tui::run)
}

#[cfg(test)]
mod tests {
    use std::io;

    use clap::{CommandFactory, Parser};
    use leaf_core::config::AppConfig;
    use leaf_core::profiles::ConnectionProfile;
    use leaf_tui::{TuiError, TuiOptions};

    use super::{resolve_options, run_app, Cli};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("leaf").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    fn saved_profiles() -> Vec<ConnectionProfile> {
        let mut analytics = ConnectionProfile::new("analytics", "mongodb://analytics:27017");
        analytics.read_only = true;
        vec![
            ConnectionProfile::new("local", "mongodb://127.0.0.1:27017"),
            analytics,
        ]
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn explicit_url_wins_over_profiles() {
        let cli = parse(&["--url", "mongodb://db:27017", "--profile", "local"]);
        let options = resolve_options(&cli, &AppConfig::default(), &saved_profiles())
            .expect("options should resolve");

        assert_eq!(options.url, "mongodb://db:27017");
        assert!(options.profile.is_none());
        assert!(!options.read_only);
    }

    #[test]
    fn named_profile_supplies_url_and_read_only_flag() {
        let cli = parse(&["--profile", "analytics"]);
        let options = resolve_options(&cli, &AppConfig::default(), &saved_profiles())
            .expect("options should resolve");

        assert_eq!(options.url, "mongodb://analytics:27017");
        assert!(options.read_only);
        assert_eq!(
            options.profile.map(|profile| profile.name),
            Some("analytics".to_string())
        );
    }

    #[test]
    fn unknown_named_profile_is_an_error() {
        let cli = parse(&["--profile", "missing"]);
        assert!(resolve_options(&cli, &AppConfig::default(), &saved_profiles()).is_err());
    }

    #[test]
    fn default_profile_from_config_is_used_and_missing_one_falls_back() {
        let cli = parse(&["--read-only"]);
        let mut config = AppConfig {
            default_profile: Some("local".to_string()),
            ..AppConfig::default()
        };
        let options =
            resolve_options(&cli, &config, &saved_profiles()).expect("options should resolve");
        assert_eq!(options.url, "mongodb://127.0.0.1:27017");
        assert!(options.read_only);

        config.default_profile = Some("gone".to_string());
        config.default_url = "mongodb://fallback:27017".to_string();
        let options =
            resolve_options(&cli, &config, &saved_profiles()).expect("options should resolve");
        assert_eq!(options.url, "mongodb://fallback:27017");
        assert!(options.profile.is_none());
    }

    #[test]
    fn run_app_hands_options_to_tui_runner() {
        let options = TuiOptions {
            url: "mongodb://localhost:27017".to_string(),
            profile: None,
            read_only: true,
        };
        let result = run_app(options, |options| {
            assert!(options.read_only);
            Ok(())
        });
        assert!(result.is_ok());
    }

    #[test]
    fn run_app_propagates_tui_errors() {
        let options = TuiOptions {
            url: "mongodb://localhost:27017".to_string(),
            profile: None,
            read_only: false,
        };
        let result = run_app(options, |_| Err(TuiError::Io(io::Error::other("boom"))));
        assert!(result.is_err());
    }
}
