use log::LevelFilter;

pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Error,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Installs env_logger at the `-v` level; `RUST_LOG` still overrides it.
pub fn init(verbosity: u8) {
    env_logger::Builder::new()
        .filter_level(level_for(verbosity))
        .parse_default_env()
        .init();
}
