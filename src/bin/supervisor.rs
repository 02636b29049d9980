#![deny(warnings)]
use dfas::channel::Receiver;
use dfas::config::ChannelConfig;
use dfas::log::build_logger_for_verbosity;
use dfas::signal_handling;
use dfas::supervisor::Supervisor;
use log::*;
use std::io::stdout;
use std::time::Duration;
use structopt::StructOpt;

#[cfg(feature = "jemallocator")]
#[cfg(not(target_env = "msvc"))]
use jemallocator::Jemalloc;

#[cfg(feature = "jemallocator")]
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "supervisor",
    about = "Collects feedback arc sets found by generators and prints every improvement."
)]
struct Opt {
    /// Prefix of the shared memory and semaphore names. Generators have to use the same.
    #[structopt(short, long, default_value = "/dfas")]
    namespace: String,

    /// Milliseconds a blocked wait lasts before termination requests are checked again
    #[structopt(long, default_value = "100")]
    poll_interval_ms: u64,

    /// Removes resources left behind by a crashed run with the same namespace
    #[structopt(long)]
    reclaim: bool,

    /// Verbose mode (-v, -vv, -vvv, etc.)
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,
}

fn main() -> std::io::Result<()> {
    let opt = Opt::from_args();
    build_logger_for_verbosity("supervisor", LevelFilter::Warn, opt.verbose);
    signal_handling::initialize()?;

    let config = ChannelConfig::new(opt.namespace, Duration::from_millis(opt.poll_interval_ms));
    if opt.reclaim {
        info!("Removing stale resources of {}", config.namespace);
        Receiver::remove_stale(&config)?;
    }

    let receiver = Receiver::create(&config).map_err(|e| {
        error!("Cannot set up the channel: {}", e);
        e
    })?;

    let mut supervisor = Supervisor::new(receiver, stdout());
    supervisor.run()
}
