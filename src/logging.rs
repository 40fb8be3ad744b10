//! Logger setup for the command-line tools

use log::LevelFilter;

/// Level for a `-v` count: warnings by default, `-v` info, `-vv` debug,
/// `-vvv` trace (which includes raw AT traffic)
pub fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install env_logger at the level for `verbosity`. `RUST_LOG` still
/// overrides per module. Calling this twice is harmless.
pub fn init_logging(verbosity: u8) {
    let _ = env_logger::Builder::new()
        .filter_level(level_for_verbosity(verbosity))
        .parse_default_env()
        .format_timestamp_secs()
        .try_init();
}
