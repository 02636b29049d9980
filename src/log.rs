use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

/// Builds the logger using the environment variable 'RUST_LOG' to determine the log level. Uses the
/// passed in `level` if the environment variable is not set. Records carry the elapsed time, the
/// process id and the name of the program emitting them, since several processes share a terminal.
pub fn build_logger_for_level(program: &'static str, level: LevelFilter) {
    let start_time = Arc::new(Instant::now());
    let pid = std::process::id();

    let env = Env::default().default_filter_or(level.as_str());
    let mut builder = Builder::from_env(env);
    builder
        .format(move |buf, record| {
            let elapsed = start_time.elapsed().as_millis();
            writeln!(
                buf,
                "{:>6}.{:<03} {}[{}] [{}] - {}",
                elapsed / 1000,
                elapsed % 1000,
                program,
                pid,
                record.level(),
                record.args()
            )
        })
        .init();
}

/// Builds the logger using the environment variable 'RUST_LOG' to determine the log level. If the
/// environment variable is not set, the passed in `default_level` is increased by `verbosity` many
/// levels and the result is used as the log level.
pub fn build_logger_for_verbosity(
    program: &'static str,
    default_level: LevelFilter,
    verbosity: usize,
) {
    let result_level = level_from_verbosity(default_level, verbosity);
    build_logger_for_level(program, result_level);
}

/// All filters from quiet to chatty
const LEVELS: [LevelFilter; 6] = [
    LevelFilter::Off,
    LevelFilter::Error,
    LevelFilter::Warn,
    LevelFilter::Info,
    LevelFilter::Debug,
    LevelFilter::Trace,
];

fn level_from_verbosity(default_level: LevelFilter, verbosity: usize) -> LevelFilter {
    let base = LEVELS
        .iter()
        .position(|&level| level == default_level)
        .unwrap_or(0);
    LEVELS[(base + verbosity).min(LEVELS.len() - 1)]
}

#[cfg(test)]
mod test_cases {
    use super::*;
    use log::LevelFilter;
    use test_case::test_case;

    #[test_case(LevelFilter::Off, 5 => LevelFilter::Trace)]
    #[test_case(LevelFilter::Warn, 1 => LevelFilter::Info)]
    #[test_case(LevelFilter::Error, 0 => LevelFilter::Error)]
    #[test_case(LevelFilter::Trace, 1 => LevelFilter::Trace)]
    #[test_case(LevelFilter::Warn, 9 => LevelFilter::Trace)]
    fn test_level_from_verbosity(default: LevelFilter, verbosity: usize) -> LevelFilter {
        level_from_verbosity(default, verbosity)
    }
}
