// src/cli/commands.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CommuDAO Miner CLI - proof-of-work NFT mining in Rust
#[derive(Parser, Debug)]
#[command(name = "commu-miner-rs")]
#[command(version, about, long_about = None)]
pub struct Commands {
    /// The action to perform (start mining, run benchmarks, or generate config)
    #[command(subcommand)]
    pub action: Action,
}

/// Top-level commands for the miner application
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Start mining with the given wallet and NFT
    Start(StartOptions),

    /// Measure hash throughput of the search workers
    Benchmark(BenchmarkOptions),

    /// Generate configuration file template
    Config(ConfigOptions),
}

/// Options for starting the mining operation
#[derive(Parser, Debug)]
pub struct StartOptions {
    /// Encrypted keystore used to sign submissions
    #[arg(long)]
    pub wallet: PathBuf,

    /// Row index of the NFT
    #[arg(long, alias = "nft_index")]
    pub nft_index: u64,

    /// ID of the NFT; also adjusts this miner's difficulty
    #[arg(long, alias = "nft_id")]
    pub nft_id: u64,

    /// Number of worker threads to use (overrides config)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Gas price in gwei (default: query the network)
    #[arg(long, alias = "gas_price")]
    pub gas_price: Option<u64>,

    /// Path to configuration file; defaults apply if it does not exist
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// File holding the wallet passphrase (otherwise env or prompt)
    #[arg(long)]
    pub password_file: Option<PathBuf>,
}

/// Options for running mining benchmarks
#[derive(Parser, Debug)]
pub struct BenchmarkOptions {
    /// Duration of benchmark in seconds
    #[arg(short, long, default_value_t = 60)]
    pub duration: u64,

    /// Number of threads to use
    #[arg(short, long, default_value_t = num_cpus::get())]
    pub threads: usize,

    /// Difficulty to search at; the default is never met
    #[arg(long, default_value_t = 256)]
    pub difficulty: u32,
}

/// Options for generating configuration files
#[derive(Parser, Debug)]
pub struct ConfigOptions {
    /// Output file path
    #[arg(short, long, default_value = "config.toml")]
    pub output: PathBuf,
}
