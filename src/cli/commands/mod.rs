use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("permalink")
        .about("Durable slugs with redirect history")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("PERMALINK_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .env("PERMALINK_DSN")
                .required_unless_present("in-memory"),
        )
        .arg(
            Arg::new("in-memory")
                .long("in-memory")
                .help("Keep records and redirects in process memory instead of PostgreSQL")
                .env("PERMALINK_IN_MEMORY")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("max-connections")
                .long("max-connections")
                .help("Maximum number of database connections")
                .default_value("5")
                .env("PERMALINK_MAX_CONNECTIONS")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new("frontend-url")
                .long("frontend-url")
                .help("Frontend origin allowed by CORS, example: https://app.tld")
                .env("PERMALINK_FRONTEND_URL"),
        )
        .arg(
            Arg::new("redirect-batch-size")
                .long("redirect-batch-size")
                .help("Redirects retargeted per update when flattening chains")
                .default_value("100")
                .env("PERMALINK_REDIRECT_BATCH_SIZE")
                .value_parser(clap::value_parser!(u64).range(1..=10_000)),
        )
        .arg(
            Arg::new("redirect-max-depth")
                .long("redirect-max-depth")
                .help("Maximum redirect hops followed before a chain is rejected")
                .default_value("50")
                .env("PERMALINK_REDIRECT_MAX_DEPTH")
                .value_parser(clap::value_parser!(u64).range(1..=1_000)),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .help("Emit logs as JSON")
                .env("PERMALINK_LOG_JSON")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("PERMALINK_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
