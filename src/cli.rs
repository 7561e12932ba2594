use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Clone)]
#[command(name = "tallycast")]
#[command(
    about = "Live vote-tally broadcaster - polls the vote store and pushes score updates to WebSocket subscribers"
)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output (-q)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output logs in JSON format
    #[arg(long)]
    pub json: bool,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 4000)]
    pub port: u16,

    /// Hostname of the vote store
    #[arg(long, default_value = "db")]
    pub db_host: String,

    /// Database name on the vote store
    #[arg(long, default_value = "postgres")]
    pub db_name: String,

    /// Path to the mounted credentials file (username= and password= lines)
    #[arg(long, default_value = "/vault/secrets/db-creds")]
    pub credentials_file: PathBuf,

    /// Milliseconds to wait between aggregation polls, measured from the
    /// completion of the previous query
    #[arg(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Connection attempts against the vote store before giving up at startup
    #[arg(long, default_value_t = 1000)]
    pub connect_attempts: u32,

    /// Milliseconds to wait between connection attempts
    #[arg(long, default_value_t = 1000)]
    pub connect_interval_ms: u64,

    /// Category labels always present in a tally, even before any votes exist
    #[arg(long, value_delimiter = ',', default_value = "a,b")]
    pub seed_labels: Vec<String>,

    /// Directory of static assets
    #[arg(long, default_value = "static")]
    pub static_dir: PathBuf,
}
