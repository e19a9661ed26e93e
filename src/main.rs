// src/main.rs
use clap::Parser;
use commu_miner_rs::miner::{
    Coordinator, CoordinatorConfig, HashFunction, MiningLoop, ProgressStore, RoundTracker,
    Sha256Pow, TargetPolicy,
};
use commu_miner_rs::network::signer::{keystore_address, read_passphrase};
use commu_miner_rs::network::submission::WEI_PER_GWEI;
use commu_miner_rs::network::{
    ChainWatcher, KeystoreSigner, PipelineConfig, RpcClient, SubmissionPipeline,
};
use commu_miner_rs::stats::{StatsReporter, format_hash_rate};
use commu_miner_rs::types::Round;
use commu_miner_rs::utils::logging::init_bench_logging;
use commu_miner_rs::{MinerError, cli, config, utils};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

/// Main entry point for the miner
///
/// # Returns
/// - `Ok(())` on successful execution
/// - `Err(MinerError)` if any operation fails; the process exits non-zero
fn main() -> Result<(), MinerError> {
    let cli = cli::Commands::parse();

    match cli.action {
        cli::Action::Start(opts) => start_mining(opts),
        cli::Action::Benchmark(opts) => run_benchmark(opts),
        cli::Action::Config(opts) => generate_config(opts),
    }
}

/// Starts mining with the given wallet and NFT
///
/// # Operations
/// 1. Initializes logging and loads configuration
/// 2. Unlocks the wallet; a wrong passphrase ends the process
/// 3. Sets up statistics reporting, the worker pool and the RPC client
/// 4. Runs the mining loop until it fails or Ctrl-C is pressed
fn start_mining(opts: cli::StartOptions) -> Result<(), MinerError> {
    utils::init_logging();

    let mut config = config::load(&opts.config)?;
    // Apply CLI overrides
    if let Some(threads) = opts.threads {
        config.worker_threads = threads;
    }
    config.validate()?;

    log::info!("Wallet Address: {}", keystore_address(&opts.wallet)?);
    let signer = KeystoreSigner::open(
        &opts.wallet,
        &read_passphrase(opts.password_file.as_deref())?,
    )?;

    let contract = config.contract()?;
    let client = Arc::new(RpcClient::new(
        &config.rpc_url,
        contract,
        config.rpc_timeout(),
    )?);

    // Statistics reporting
    let reporter = StatsReporter::new(config.stats_interval());
    reporter.start_reporting();

    // Mining setup
    let coordinator = Coordinator::new(
        Arc::new(Sha256Pow),
        CoordinatorConfig {
            worker_count: config.worker_threads,
            check_interval: config.check_interval,
            join_timeout: config.join_timeout(),
        },
    )?
    .with_counter(reporter.hash_counter());

    let tracker = Arc::new(RoundTracker::new());
    let policy = TargetPolicy::new(opts.nft_id);
    log::info!(
        "NFT #{} (row {}): difficulty reduced by {}",
        opts.nft_id,
        opts.nft_index,
        policy.adjustment()
    );
    let watcher = ChainWatcher::new(
        client.clone(),
        policy,
        tracker.clone(),
        config.poll_interval(),
        config.retry_backoff(),
    );
    let pipeline = SubmissionPipeline::new(
        client,
        PipelineConfig {
            contract,
            nft_index: opts.nft_index,
            nft_id: opts.nft_id,
            confirmations: config.confirmations,
            poll_interval: config.poll_interval(),
            stall_timeout: config.stall_timeout(),
            fee_market_chains: config.fee_market_chains.clone(),
            gas_price_override: opts.gas_price.map(|gwei| u128::from(gwei) * WEI_PER_GWEI),
        },
    )
    .with_events(reporter.submission_sender());

    let mut mining = MiningLoop::new(
        watcher,
        Arc::new(coordinator),
        pipeline,
        signer,
        ProgressStore::new(config.progress_file.clone()),
    )
    .with_stats(reporter)
    .with_checkpoint_interval(config.checkpoint_interval());

    // Runtime setup
    let rt = Runtime::new()?;
    let result = rt.block_on(async {
        tokio::select! {
            result = mining.run() => result,
            signal = tokio::signal::ctrl_c() => {
                signal?;
                log::info!("Shutting down");
                tracker.cancel_active();
                Ok(())
            }
        }
    });
    rt.shutdown_timeout(config.join_timeout());
    result
}

/// Runs the search workers against an unreachable target
///
/// # Operations
/// 1. Initializes benchmark-specific logging
/// 2. Starts a round on the real coordinator
/// 3. Cancels it after the requested duration
/// 4. Reports total hashes and the average rate
fn run_benchmark(opts: cli::BenchmarkOptions) -> Result<(), MinerError> {
    init_bench_logging();

    let hasher = Arc::new(Sha256Pow);
    let coordinator = Coordinator::new(
        hasher.clone(),
        CoordinatorConfig {
            worker_count: opts.threads,
            ..CoordinatorConfig::default()
        },
    )?;
    let round = Round {
        block_number: 0,
        raw_difficulty: u64::from(opts.difficulty),
        effective_difficulty: opts.difficulty.max(1),
    };
    let ctx = coordinator.context(round);

    log::info!(
        "Starting {} benchmark for {} seconds on {} threads",
        hasher.name(),
        opts.duration,
        coordinator.config().worker_count
    );

    let timer = ctx.clone();
    let duration = Duration::from_secs(opts.duration);
    std::thread::spawn(move || {
        std::thread::sleep(duration);
        timer.cancel();
    });

    let start_time = Instant::now();
    let report = coordinator.search(ctx, 0);
    let elapsed = start_time.elapsed().as_secs_f64();

    if let Some(result) = report.result() {
        log::info!(
            "Difficulty {} met at nonce {} after {:?}",
            opts.difficulty,
            result.nonce,
            result.elapsed
        );
    }

    // Report final results
    log::info!("Benchmark results:");
    log::info!("Total hashes: {}", report.hashes);
    log::info!(
        "Average hashrate: {}",
        format_hash_rate(if elapsed > 0.0 {
            report.hashes as f64 / elapsed
        } else {
            0.0
        })
    );
    log::logger().flush(); // Ensure final results appear

    Ok(())
}

/// Writes the configuration template to `opts.output`
fn generate_config(opts: cli::ConfigOptions) -> Result<(), MinerError> {
    let config = config::generate_template();
    std::fs::write(opts.output, config)?;
    Ok(())
}
