use clap::Parser;
use std::path::PathBuf;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "hyperdag-gateway")]
#[command(about = "API gateway with tiered per-key rate limiting for HyperDAG services")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // JSON file with API key records
    // Example entry: {"key": "...", "name": "ci bot", "permissions": ["basic"]}
    #[arg(long)]
    pub keys_file: Option<PathBuf>,

    // Seed well-known development keys (logged once at startup)
    #[arg(long, default_value_t = false)]
    pub dev_keys: bool,

    // JSON file with the grant catalog (built-in seed catalog if omitted)
    #[arg(long)]
    pub grants_file: Option<PathBuf>,

    // How often to sweep expired quota entries, in seconds
    #[arg(long, default_value_t = 60)]
    pub sweep_interval: u64,

    // On internal limiter failure: let the request through (true) or return 500 (false)
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub fail_open: bool,
}
