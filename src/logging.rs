use crate::config::Settings;
use tracing_subscriber::EnvFilter;

/// Maps a Python-style level name (`INFO`, `WARNING`, ...) onto a `tracing` filter directive.
pub fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "WARN" | "WARNING" => "warn",
        "ERROR" | "CRITICAL" | "FATAL" => "error",
        "OFF" => "off",
        _ => "info",
    }
}

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(settings: &Settings) -> EnvFilter {
    if settings.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(level_directive(&settings.log_level))
    }
}

/// Installs the global `fmt` subscriber. Safe to call more than once.
pub fn init(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(settings));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_level_names_map_to_tracing() {
        assert_eq!(level_directive("INFO"), "info");
        assert_eq!(level_directive("warning"), "warn");
        assert_eq!(level_directive("CRITICAL"), "error");
        assert_eq!(level_directive("Debug"), "debug");
        assert_eq!(level_directive("verbose"), "info");
    }
}
