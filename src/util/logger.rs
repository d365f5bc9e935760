use log::SetLoggerError;

/// Attempt to init a env_logger for the index.
/// Does nothing if the "builtin_env_logger" feature is disabled.
///
/// An allocator that embeds the index usually installs its own logger, or none at all (a logger
/// that allocates must not be used from inside a global allocator).  This function is mostly
/// useful for tests, benchmarks and tools.
pub fn try_init() -> Result<(), SetLoggerError> {
    cfg_if::cfg_if! {
        if #[cfg(feature = "builtin_env_logger")] {
            env_logger::try_init_from_env(
                // By default, use info level logging.
                env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
            )
        } else {
            Ok(())
        }
    }
}
