use crate::{
    cli::telemetry,
    permalink,
    redirect::RenamePolicy,
    service::SlugService,
    store::{MemoryStore, PgStore, Store},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    /// `None` runs on the in-memory store.
    pub dsn: Option<String>,
    pub max_connections: u32,
    pub frontend_url: Option<String>,
    pub policy: RenamePolicy,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be applied,
/// or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let store: Arc<dyn Store> = match &args.dsn {
        Some(dsn) => {
            let store = PgStore::connect(dsn, args.max_connections).await?;
            store
                .apply_schema()
                .await
                .context("Failed to apply database schema")?;
            Arc::new(store)
        }
        None => {
            warn!("Using the in-memory store, data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    let service = SlugService::new(store, args.policy);
    let result = permalink::new(args.port, service, args.frontend_url.as_deref()).await;

    telemetry::shutdown_tracer();

    result
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        (
            "store",
            args.dsn
                .as_deref()
                .map_or_else(|| "memory".to_string(), redact_dsn),
        ),
        ("max_connections", args.max_connections.to_string()),
        (
            "frontend_url",
            args.frontend_url
                .clone()
                .unwrap_or_else(|| "none".to_string()),
        ),
        ("redirect_batch_size", args.policy.batch_size().to_string()),
        ("redirect_max_depth", args.policy.max_depth().to_string()),
    ];
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} ({})\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(permalink::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_dsn() {
        assert_eq!(
            redact_dsn("postgres://user:secret@db:5432/permalink"),
            "postgres://user:REDACTED@db:5432/permalink"
        );
        assert_eq!(
            redact_dsn("postgres://db:5432/permalink"),
            "postgres://db:5432/permalink"
        );
        assert_eq!(redact_dsn("not a dsn"), "invalid-dsn");
    }

    #[test]
    fn test_short_commit() {
        assert_eq!(short_commit("0123456789abcdef"), "0123456");
        assert_eq!(short_commit("unknown"), "unknown");
        assert_eq!(short_commit("abc"), "abc");
    }
}
