use crate::{
    cli::actions::{server::Args, Action},
    redirect::{RenamePolicy, DEFAULT_BATCH_SIZE, DEFAULT_MAX_DEPTH},
};
use anyhow::{Context, Result};

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let in_memory = matches.get_flag("in-memory");
    let dsn = matches.get_one::<String>("dsn").cloned();
    if !in_memory && dsn.is_none() {
        return Err(anyhow::anyhow!("missing required argument: --dsn"));
    }

    let max_connections = matches
        .get_one::<u32>("max-connections")
        .copied()
        .unwrap_or(5);
    let frontend_url = matches.get_one::<String>("frontend-url").cloned();

    let batch_size = matches
        .get_one::<u64>("redirect-batch-size")
        .map(|&size| usize::try_from(size))
        .transpose()
        .context("invalid --redirect-batch-size")?
        .unwrap_or(DEFAULT_BATCH_SIZE);
    let max_depth = matches
        .get_one::<u64>("redirect-max-depth")
        .map(|&depth| usize::try_from(depth))
        .transpose()
        .context("invalid --redirect-max-depth")?
        .unwrap_or(DEFAULT_MAX_DEPTH);

    Ok(Action::Server(Args {
        port,
        dsn: if in_memory { None } else { dsn },
        max_connections,
        frontend_url,
        policy: RenamePolicy::new()
            .with_batch_size(batch_size)
            .with_max_depth(max_depth),
    }))
}
