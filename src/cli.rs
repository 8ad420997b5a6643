use clap::{Arg, Command};

/// Column names accepted by `--sort`
pub const SORT_COLUMNS: [&str; 7] = ["process", "pid", "ip", "port", "status", "family", "type"];

pub fn build_cli() -> Command {
    Command::new("connview")
        .version(env!("CARGO_PKG_VERSION"))
        .about("List the machine's current network connections")
        .arg(
            Arg::new("refresh-interval")
                .short('r')
                .long("refresh-interval")
                .value_name("MILLISECONDS")
                .help("Auto-refresh interval in milliseconds")
                .value_parser(clap::value_parser!(u64).range(250..))
                .required(false),
        )
        .arg(
            Arg::new("auto-refresh")
                .short('a')
                .long("auto-refresh")
                .help("Start with auto-refresh enabled")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("filter")
                .short('f')
                .long("filter")
                .value_name("QUERY")
                .help("Initial filter, e.g. \"name:sshd lport:22\"")
                .required(false),
        )
        .arg(
            Arg::new("sort")
                .short('s')
                .long("sort")
                .value_name("COLUMN")
                .help("Initial sort column")
                .value_parser(SORT_COLUMNS)
                .required(false),
        )
        .arg(
            Arg::new("desc")
                .long("desc")
                .help("Sort descending")
                .requires("sort")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Set the log level (if not provided, no logging will be enabled)")
                .required(false),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (default: ~/.config/connview/config.yml)")
                .required(false),
        )
}
