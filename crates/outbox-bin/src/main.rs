//! Offline Outbox - queue mutating HTTP requests while offline and replay them
//! on reconnect.

mod app;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use offline_request_queue::RequestMethod;
use outbox_config_and_utils::{init_logging, Config, Paths};

/// Offline outbox command-line interface.
#[derive(Parser)]
#[command(name = "offline-outbox")]
#[command(about = "Durable outbox for requests made while offline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the config value
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for runtime files (store, logs, config). Defaults to ~/.offline-outbox
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a request now, or queue it if the network is unreachable
    Submit {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        #[arg(short, long, value_parser = parse_method)]
        method: RequestMethod,

        /// Absolute URL, or a path resolved against api_base_url
        #[arg(short, long)]
        url: String,

        /// Header as `Name: value`; repeatable
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// JSON body
        #[arg(short, long, value_parser = parse_json)]
        data: Option<serde_json::Value>,

        /// Identifier used to check whether a queued create already landed
        #[arg(long)]
        object_hint: Option<String>,

        /// Treat the network as unreachable and queue the request
        #[arg(long)]
        offline: bool,
    },
    /// Print queued requests as JSON, head first
    List,
    /// Print queue length and reachability
    Status,
    /// Run one drain pass now
    Drain,
    /// Watch reachability and drain on every reconnect until Ctrl-C
    Run,
    /// Drop every queued request
    Clear,
}

fn parse_method(raw: &str) -> Result<RequestMethod, String> {
    raw.parse().map_err(|e: offline_request_queue::OutboxError| e.to_string())
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected `Name: value`, got {:?}", raw)),
    }
}

fn parse_json(raw: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON body: {}", e))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging(level, &paths);

    match cli.command {
        Commands::Submit {
            method,
            url,
            headers,
            data,
            object_hint,
            offline,
        } => {
            let request = app::SubmitRequest {
                method,
                url,
                headers,
                data,
                object_hint,
                offline,
            };
            app::submit(&config, &paths, request).await?;
        }
        Commands::List => app::list(&config, &paths).await?,
        Commands::Status => app::status(&config, &paths).await?,
        Commands::Drain => app::drain(&config, &paths).await?,
        Commands::Run => app::run(&config, &paths).await?,
        Commands::Clear => app::clear(&config, &paths).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_header_trims_name_and_value() {
        assert_eq!(
            parse_header("Authorization:  Bearer t ").unwrap(),
            ("Authorization".to_string(), "Bearer t".to_string())
        );
        assert_eq!(
            parse_header("X-Url: http://a:1").unwrap(),
            ("X-Url".to_string(), "http://a:1".to_string())
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn parse_json_rejects_garbage() {
        assert_eq!(
            parse_json(r#"{"a":1}"#).unwrap(),
            serde_json::json!({"a": 1})
        );
        assert!(parse_json("{a:1}").is_err());
    }

    #[test]
    fn submit_arguments_parse() {
        let cli = Cli::try_parse_from([
            "offline-outbox",
            "submit",
            "--method",
            "post",
            "--url",
            "/clocks",
            "-H",
            "Authorization: Bearer t",
            "--data",
            r#"{"start":"09:00"}"#,
            "--object-hint",
            "12",
            "--offline",
        ])
        .unwrap();

        match cli.command {
            Commands::Submit {
                method,
                url,
                headers,
                data,
                object_hint,
                offline,
            } => {
                assert_eq!(method, RequestMethod::Post);
                assert_eq!(url, "/clocks");
                assert_eq!(headers.len(), 1);
                assert_eq!(data, Some(serde_json::json!({"start": "09:00"})));
                assert_eq!(object_hint.as_deref(), Some("12"));
                assert!(offline);
            }
            _ => panic!("expected submit"),
        }
    }

    #[test]
    fn unknown_method_is_rejected() {
        assert!(Cli::try_parse_from([
            "offline-outbox",
            "submit",
            "--method",
            "TRACE",
            "--url",
            "http://a",
        ])
        .is_err());
    }
}
