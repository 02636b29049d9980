#![deny(warnings)]
use dfas::agent::{RelabelingSink, SearchAgent};
use dfas::algorithm::IterativeAlgorithm;
use dfas::channel::Sender;
use dfas::config::ChannelConfig;
use dfas::graph::io::{compact_graph_from_edges, parse_edges};
use dfas::graph::*;
use dfas::log::build_logger_for_verbosity;
use dfas::signal_handling;
use log::*;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use std::time::{Duration, Instant};
use structopt::StructOpt;

#[cfg(feature = "jemallocator")]
#[cfg(not(target_env = "msvc"))]
use jemallocator::Jemalloc;

#[cfg(feature = "jemallocator")]
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

type Graph = SuccArray;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "generator",
    about = "Searches feedback arc sets of random vertex orders and sends improvements to the supervisor."
)]
struct Opt {
    /// Edges of the graph as SOURCE-TARGET tokens, e.g. `0-1 1-2 2-0`
    #[structopt(required = true)]
    edges: Vec<String>,

    /// Prefix of the shared memory and semaphore names used by the supervisor
    #[structopt(short, long, default_value = "/dfas")]
    namespace: String,

    /// Milliseconds a blocked wait lasts before termination requests are checked again
    #[structopt(long, default_value = "100")]
    poll_interval_ms: u64,

    /// Seed of the random number generator. Drawn from the operating system if not specified.
    #[structopt(short, long)]
    seed: Option<u64>,

    /// Stops after this many random vertex orders
    #[structopt(short, long)]
    max_iterations: Option<u64>,

    /// Stops after this many seconds
    #[structopt(short, long)]
    time_limit_secs: Option<u64>,

    /// Verbose mode (-v, -vv, -vvv, etc.)
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,
}

fn main() -> std::io::Result<()> {
    let opt = Opt::from_args();
    build_logger_for_verbosity("generator", LevelFilter::Warn, opt.verbose);

    let (edges, vertices) = parse_edges(&opt.edges).map_err(|e| {
        error!("{}", e);
        e
    })?;

    let self_loops = edges.iter().filter(|(u, v)| u == v).count();
    if self_loops > 0 {
        warn!(
            "Input has {} self-loops; no vertex order exposes them, so they never show up in a solution",
            self_loops
        );
    }

    let (graph, mapper): (Graph, _) = compact_graph_from_edges(&edges, &vertices)?;
    info!(
        "Input graph with n={}, m={}, labels up to {}",
        graph.number_of_nodes(),
        graph.number_of_edges(),
        vertices.last().copied().unwrap_or(0)
    );

    signal_handling::initialize()?;
    let config = ChannelConfig::new(opt.namespace, Duration::from_millis(opt.poll_interval_ms));
    let sender = Sender::attach(&config).map_err(|e| {
        error!("Cannot attach to the supervisor: {}", e);
        e
    })?;

    let mut rng = match opt.seed {
        Some(seed) => Pcg64::seed_from_u64(seed),
        None => Pcg64::from_entropy(),
    };

    let sink = RelabelingSink::new(&mapper, sender);
    let mut agent = SearchAgent::new(&graph, graph.vertices().collect(), &mut rng, sink);
    let time_limit = opt.time_limit_secs.map(Duration::from_secs);
    match (opt.max_iterations, time_limit) {
        (None, None) => agent.run_to_completion()?,
        (None, Some(timeout)) => agent.run_until_timeout(timeout)?,
        (Some(limit), None) => agent.run_while(|agent| agent.stats().trials < limit)?,
        (Some(limit), Some(timeout)) => {
            let start = Instant::now();
            agent.run_while(|agent| agent.stats().trials < limit && start.elapsed() < timeout)?
        }
    }

    let stats = agent.stats();
    info!(
        "Finished after {} orders: {} cut short, {} published, {} dropped for the shared best, {} abandoned",
        stats.trials, stats.early_exits, stats.published, stats.adopted, stats.abandoned
    );
    if let Some(size) = agent.best_known_solution_size() {
        debug!("Smallest published solution has {} edges", size);
    }
    Ok(())
}
