mod config;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use clap::{Args, Parser, Subcommand};
use console::style;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

use warden_http_core::{full_url, HttpApiIntegration, WardenCheckResult, WardenIteration};

fn version_string() -> &'static str {
    static VERSION: OnceLock<String> = OnceLock::new();
    VERSION.get_or_init(|| {
        let version = env!("CARGO_PKG_VERSION");
        match env!("GIT_HASH") {
            "" => version.to_string(),
            hash => format!("{version} ({hash})"),
        }
    })
}

/// Post warden iterations, check results or any JSON document to an HTTP API.
#[derive(Parser)]
#[command(name = "warden-http", version = version_string(), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Target {
    /// Path to TOML config file.
    #[arg(short, long)]
    config: PathBuf,

    /// Base URL of the API. Overrides `api.url` from the config file.
    #[arg(long)]
    url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// POST an arbitrary JSON document.
    Post {
        #[command(flatten)]
        target: Target,

        /// Endpoint relative to the base URL (e.g. /events).
        #[arg(short, long, default_value = "")]
        endpoint: String,

        /// JSON file with the request payload.
        payload: PathBuf,
    },
    /// POST a warden iteration to the panel.
    Iteration {
        #[command(flatten)]
        target: Target,

        /// JSON file with the iteration. Posted as is; only `wardenName` is
        /// read from it.
        payload: PathBuf,
    },
    /// POST a single check result to the panel.
    Check {
        #[command(flatten)]
        target: Target,

        /// JSON file with the check result. Posted as is; only
        /// `watcherCheckResult.watcherName` is read from it.
        payload: PathBuf,
    },
}

impl Commands {
    fn target(&self) -> &Target {
        match self {
            Commands::Post { target, .. }
            | Commands::Iteration { target, .. }
            | Commands::Check { target, .. } => target,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let target = cli.command.target();

    let app_config = match config::AppConfig::load(&target.config) {
        Ok(c) => {
            init_tracing(&c.log.format);
            tracing::debug!(path = %target.config.display(), "Loaded config file");
            c
        }
        Err(e) => {
            init_tracing("pretty");
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let integration = match app_config.to_integration(target.url.as_deref()) {
        Ok(i) => i,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    match run(&cli.command, &integration).await {
        Ok(url) => {
            let note = if integration.config().fail_fast() {
                ""
            } else {
                " (fail_fast is off, delivery errors are only logged)"
            };
            println!("{} {}{}", style("posted").green().bold(), url, style(note).dim());
        }
        Err(e) => {
            tracing::error!(error = %e, "POST failed");
            std::process::exit(1);
        }
    }
}

/// Sends the payload and returns the URL it was posted to.
async fn run(command: &Commands, integration: &HttpApiIntegration) -> Result<String, String> {
    match command {
        Commands::Post { endpoint, payload, .. } => {
            let value = read_json(payload)?;
            integration
                .post_to(endpoint, &value)
                .await
                .map_err(|e| e.to_string())?;
            Ok(full_url(integration.config().uri().as_str(), endpoint))
        }
        Commands::Iteration { payload, .. } => {
            let iteration = PanelPayload::iteration(read_json(payload)?);
            integration
                .post_iteration_to_panel(Some(&iteration))
                .await
                .map_err(|e| e.to_string())?;
            Ok(integration.iteration_url(&iteration.name))
        }
        Commands::Check { payload, .. } => {
            let check = PanelPayload::check_result(read_json(payload)?);
            integration
                .post_check_result_to_panel(Some(&check))
                .await
                .map_err(|e| e.to_string())?;
            Ok(integration.check_result_url())
        }
    }
}

fn read_json(path: &Path) -> Result<Value, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read payload {}: {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse payload {}: {}", path.display(), e))
}

/// A panel document read from disk. The body is posted untouched, so dates in
/// any format pass through; only the name the panel routes on is extracted.
struct PanelPayload {
    name: String,
    body: Value,
}

impl PanelPayload {
    fn iteration(body: Value) -> Self {
        let name = string_member(&body, &["wardenName", "warden_name"]);
        Self { name, body }
    }

    fn check_result(body: Value) -> Self {
        let name = ["watcherCheckResult", "watcher_check_result"]
            .iter()
            .find_map(|key| body.get(key))
            .map(|inner| string_member(inner, &["watcherName", "watcher_name"]))
            .unwrap_or_default();
        Self { name, body }
    }
}

/// First of `keys` holding a string, or empty.
fn string_member(value: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

impl Serialize for PanelPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}

impl WardenIteration for PanelPayload {
    fn warden_name(&self) -> &str {
        &self.name
    }
}

impl WardenCheckResult for PanelPayload {
    fn watcher_name(&self) -> &str {
        &self.name
    }
}

fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format {
        "json" => {
            fmt().with_env_filter(filter).json().init();
        }
        _ => {
            fmt().with_env_filter(filter).init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_http_core::{to_json, SerializerOptions};

    #[test]
    fn iteration_name_is_read_from_either_key_case() {
        let camel = PanelPayload::iteration(json!({ "wardenName": "My Agent" }));
        assert_eq!(camel.warden_name(), "My Agent");

        let snake = PanelPayload::iteration(json!({ "warden_name": "My Agent" }));
        assert_eq!(snake.warden_name(), "My Agent");

        let missing = PanelPayload::iteration(json!({ "ordinal": 1 }));
        assert_eq!(missing.warden_name(), "");
    }

    #[test]
    fn check_result_name_is_nested() {
        let check = PanelPayload::check_result(json!({
            "isValid": true,
            "watcherCheckResult": { "watcherName": "Website" },
        }));
        assert_eq!(check.watcher_name(), "Website");

        let flat = PanelPayload::check_result(json!({ "watcherName": "Website" }));
        assert_eq!(flat.watcher_name(), "");
    }

    #[test]
    fn formatted_dates_pass_through() {
        let iteration = PanelPayload::iteration(json!({
            "wardenName": "My Agent",
            "startedAt": "2024-05-01 8:30:00",
        }));
        let body = to_json(&iteration, &SerializerOptions::default()).unwrap();
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["startedAt"], "2024-05-01 8:30:00");
    }
}
