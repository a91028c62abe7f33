//! Logging initialization using `tracing` and `tracing-subscriber`.
//!
//! Controlled by:
//! - `RUST_LOG`: log level filtering, see [`EnvFilter`]
//! - `TMSOURCE_FORMAT`: output format, see [`LogFormat`]

use std::io;
use std::str::FromStr;

use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

/// Log output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Emit human-readable, single-line logs.
    /// See [format::Full](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/fmt/format/struct.Full.html#example-output)
    Full,

    /// A variant of the full-format, optimized for short line lengths (default).
    /// See [format::Compact](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/fmt/format/struct.Compact.html#example-output)
    Compact,

    /// A very bare format without timestamps, targets or ANSI colors.
    Bare,

    /// Excessively pretty, multi-line logs for local development/debugging.
    /// See [format::Pretty](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/fmt/format/struct.Pretty.html#example-output)
    Pretty,

    /// Output newline-delimited (structured) JSON logs.
    /// See [format::Json](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/fmt/format/struct.Json.html#example-output)
    Json,
}

impl LogFormat {
    /// Install the global subscriber for this format. Logs go to stderr, so
    /// that stdout only carries the command output.
    pub fn init(self, env_filter: EnvFilter) {
        let builder = tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_span_events(FmtSpan::NONE)
            .with_env_filter(env_filter);
        let dispatch = match self {
            Self::Full => builder.finish().into(),
            Self::Compact => builder.compact().finish().into(),
            Self::Pretty => builder.pretty().finish().into(),
            Self::Bare => builder
                .compact()
                .without_time()
                .with_target(false)
                .with_ansi(false)
                .finish()
                .into(),
            Self::Json => builder.json().finish().into(),
        };
        // `SubscriberInitExt::init()` would install a second `LogTracer`
        tracing::dispatcher::set_global_default(dispatch)
            .expect("failed to set global default subscriber");
    }
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Compact
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "compact" => Ok(Self::Compact),
            "pretty" | "verbose" => Ok(Self::Pretty),
            "bare" => Ok(Self::Bare),
            "json" | "jsonl" => Ok(Self::Json),
            _ => Err(format!(
                "Invalid log format '{s}'. Valid options: json, full, compact, bare or pretty"
            )),
        }
    }
}

/// Forward `log` records into `tracing`, up to the most verbose level `env_filter` allows.
fn init_log_bridge(env_filter: &EnvFilter) {
    let mut log_builder = tracing_log::LogTracer::builder()
        .with_interest_cache(tracing_log::InterestCacheConfig::default());
    if let Some(Some(max_level)) = env_filter.max_level_hint().map(LevelFilter::into_level) {
        let max_level = match max_level {
            Level::DEBUG => log::LevelFilter::Debug,
            Level::INFO => log::LevelFilter::Info,
            Level::WARN => log::LevelFilter::Warn,
            Level::ERROR => log::LevelFilter::Error,
            Level::TRACE => log::LevelFilter::Trace,
        };
        log_builder = log_builder.with_max_level(max_level);
    }
    log_builder
        .init()
        .expect("failed to initialize log -> tracing bridge: LogTracer already set");
}

/// Initialize the global tracing subscriber for the given filter and format.
///
/// An invalid filter falls back to `debug`, an invalid format to the default one.
pub fn init_tracing(filter: &str, format: Option<String>) {
    let env_filter = EnvFilter::from_str(filter).unwrap_or_else(|_| {
        eprintln!("Warning: Invalid filter string '{filter}' passed, falling back to 'debug'");
        EnvFilter::new("debug")
    });

    let log_format = format
        .and_then(|s| {
            s.parse::<LogFormat>()
                .map_err(|e| {
                    eprintln!("Warning: {e}");
                    eprintln!(
                        "Falling back to default format ({:?})",
                        LogFormat::default()
                    );
                })
                .ok()
        })
        .unwrap_or_default();

    init_log_bridge(&env_filter);
    log_format.init(env_filter);
}

/// Mirror the level set for `replacement` (e.g. `tmsource=`) onto `tmsource_core`,
/// unless the filter already sets one.
#[must_use]
pub fn ensure_core_log_level_matches(
    env_filter: Option<String>,
    replacement: &'static str,
) -> String {
    let Some(rust_log) = env_filter else {
        return format!("{replacement}info,tmsource_core=info");
    };
    if rust_log.contains("tmsource_core=") {
        return rust_log;
    }
    match rust_log
        .split(',')
        .find_map(|s| s.strip_prefix(replacement))
    {
        Some(level) => format!("{rust_log},tmsource_core={level}"),
        None => rust_log,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::unset(None, "tmsource=info,tmsource_core=info")]
    #[case::mirrored(Some("tmsource=debug"), "tmsource=debug,tmsource_core=debug")]
    #[case::explicit(Some("tmsource=debug,tmsource_core=warn"), "tmsource=debug,tmsource_core=warn")]
    #[case::global(Some("trace"), "trace")]
    fn core_log_level(#[case] rust_log: Option<&str>, #[case] expected: &str) {
        assert_eq!(
            ensure_core_log_level_matches(rust_log.map(str::to_string), "tmsource="),
            expected
        );
    }

    #[rstest]
    #[case("json", LogFormat::Json)]
    #[case("JSONL", LogFormat::Json)]
    #[case("bare", LogFormat::Bare)]
    #[case("verbose", LogFormat::Pretty)]
    #[case("full", LogFormat::Full)]
    #[case("compact", LogFormat::Compact)]
    fn parses_formats(#[case] name: &str, #[case] expected: LogFormat) {
        assert_eq!(name.parse::<LogFormat>(), Ok(expected));
    }

    #[test]
    fn rejects_unknown_format() {
        assert!("colorful".parse::<LogFormat>().is_err());
    }
}
