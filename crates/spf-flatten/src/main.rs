// # spf-flatten - SPF Flattening CLI
//
// Thin integration layer only: argument parsing, settings loading, wiring
// the Cloudflare client, the splitter and the notification channels
// together, and mapping the run outcome onto an exit code. All flattening
// logic lives in spf-core.
//
// ## Usage
//
// ```bash
// # Flatten every zone the api token can see
// spf-flatten account-flatten settings.json
//
// # Flatten a single zone
// spf-flatten zone-flatten settings.json example.com
// ```
//
// Log verbosity is controlled with `SPF_LOG_LEVEL` (error, warn, info,
// debug, trace; default info).
//
// Digest notification channels are flushed on every exit path, success or
// failure; a failed run additionally records one critical event so the
// digest carries the reason.

use clap::{Parser, Subcommand};
use spf_core::notify::{Notifier, TracingLive};
use spf_core::{AccountOrchestrator, DnsApi, Error, Settings, SpfSplitter, ZoneReconciler};
use spf_notify_email::EmailDigest;
use spf_provider_cloudflare::CloudflareApi;
use spf_splitter::ChunkingSplitter;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Run completed
/// - 1: Configuration error, nothing was touched
/// - 2: Run failure, records may have been partially written
#[derive(Debug, Clone, Copy)]
enum FlattenExitCode {
    Success = 0,
    ConfigError = 1,
    RunFailure = 2,
}

impl From<FlattenExitCode> for ExitCode {
    fn from(code: FlattenExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Parser)]
#[command(name = "spf-flatten", version, about = "Flattens SPF records across Cloudflare zones")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Flatten SPF records for every zone visible to the api token
    AccountFlatten {
        /// Path to the settings JSON file
        settings: PathBuf,
    },
    /// Flatten SPF records for one domain
    ZoneFlatten {
        /// Path to the settings JSON file
        settings: PathBuf,
        /// Domain to flatten SPF records for
        domain: String,
    },
}

impl Command {
    fn settings_path(&self) -> &Path {
        match self {
            Command::AccountFlatten { settings } => settings,
            Command::ZoneFlatten { settings, .. } => settings,
        }
    }
}

fn init_tracing() {
    let level = env::var("SPF_LOG_LEVEL")
        .ok()
        .and_then(|s| s.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Warning: tracing subscriber already set");
    }
}

fn load_settings(path: &Path) -> spf_core::Result<Settings> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Settings JSON file is not readable or does not exist: {}: {}",
            path.display(),
            e
        ))
    })?;
    Settings::from_json(&text)
}

/// Tracing live destination plus one email digest per configured channel
fn build_notifier(settings: &Settings) -> spf_core::Result<Arc<Notifier>> {
    let mut notifier = Notifier::new();
    notifier.add_live(Box::new(TracingLive::new()));

    for (name, channel) in &settings.notifications.channels {
        let digest = EmailDigest::from_channel(name, channel)?;
        notifier.add_digest(Box::new(digest), channel.threshold());
    }

    Ok(Arc::new(notifier))
}

fn valid_domain(domain: &str) -> bool {
    !domain.is_empty()
        && domain.contains('.')
        && domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

async fn run(
    command: &Command,
    settings: &Settings,
    notifier: Arc<Notifier>,
) -> spf_core::Result<()> {
    let api: Arc<dyn DnsApi> = Arc::new(CloudflareApi::new(&settings.api_token)?);
    let splitter: Arc<dyn SpfSplitter> = Arc::new(ChunkingSplitter::new());
    let opts = settings.flatten.to_options();

    match command {
        Command::AccountFlatten { .. } => {
            let orchestrator = AccountOrchestrator::new(api, splitter, notifier)
                .set_excluded(settings.zones.excluded.clone())
                .set_order(settings.zones.order.clone())
                .with_policy(settings.failure_policy)
                .with_options(opts);

            let outcomes = orchestrator.flatten().await?;
            let failed = outcomes.values().filter(|o| !o.is_completed()).count();
            info!(
                "Account flattening finished: {} zones processed, {} failed",
                outcomes.len(),
                failed
            );
            if failed > 0 {
                return Err(Error::Other(format!(
                    "{} zone(s) failed to flatten",
                    failed
                )));
            }
            Ok(())
        }
        Command::ZoneFlatten { domain, .. } => {
            if !valid_domain(domain) {
                return Err(Error::config("Invalid domain provided."));
            }

            let mut reconciler =
                ZoneReconciler::new(domain.clone(), api, splitter, notifier, opts);
            let results = reconciler.flatten().await?;
            info!(
                "Zone flattening finished for {}: {} records touched",
                domain,
                results.len()
            );
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let settings = match load_settings(cli.command.settings_path()) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            return FlattenExitCode::ConfigError.into();
        }
    };

    let notifier = match build_notifier(&settings) {
        Ok(notifier) => notifier,
        Err(e) => {
            error!("{}", e);
            return FlattenExitCode::ConfigError.into();
        }
    };

    let outcome = run(&cli.command, &settings, Arc::clone(&notifier)).await;
    let mut exit_code = match outcome {
        Ok(()) => FlattenExitCode::Success,
        Err(ref e) => {
            notifier.critical(e.to_string());
            match e {
                Error::Config(_) => FlattenExitCode::ConfigError,
                _ => FlattenExitCode::RunFailure,
            }
        }
    };

    // Digests flush on every exit path; the critical event above rides along.
    if let Err(e) = notifier.flush_digests().await {
        error!("{}", e);
        if matches!(exit_code, FlattenExitCode::Success) {
            exit_code = FlattenExitCode::RunFailure;
        }
    }

    exit_code.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_validation() {
        assert!(valid_domain("example.com"));
        assert!(valid_domain("sub.example-two.co.uk"));
        assert!(!valid_domain("example"));
        assert!(!valid_domain(""));
        assert!(!valid_domain("bad domain.com"));
        assert!(!valid_domain("emoji🦀.com"));
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["spf-flatten", "account-flatten", "settings.json"]).unwrap();
        assert!(matches!(cli.command, Command::AccountFlatten { .. }));

        let cli = Cli::try_parse_from([
            "spf-flatten",
            "zone-flatten",
            "settings.json",
            "example.com",
        ])
        .unwrap();
        match cli.command {
            Command::ZoneFlatten { domain, .. } => assert_eq!(domain, "example.com"),
            _ => panic!("expected zone-flatten"),
        }
    }

    #[test]
    fn missing_settings_file_is_a_config_error() {
        let err = load_settings(Path::new("/nonexistent/settings.json")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn settings_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"api_token":"t0ken","zones":{"excluded":["skip.com"]}}"#,
        )
        .unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.api_token, "t0ken");
        assert_eq!(settings.zones.excluded, vec!["skip.com"]);
    }

    #[test]
    fn invalid_settings_json_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = load_settings(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn exit_codes_are_stable() {
        assert_eq!(FlattenExitCode::Success as u8, 0);
        assert_eq!(FlattenExitCode::ConfigError as u8, 1);
        assert_eq!(FlattenExitCode::RunFailure as u8, 2);
    }
}
