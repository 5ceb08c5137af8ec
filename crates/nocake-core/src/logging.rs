//! Logging utilities with indicatif integration
//!
//! Every line carries a severity tag (`info`, `warning`, `error`, ...), which
//! is the only report the importer gives about lifecycle transitions, skipped
//! lists and failed bulk writes.

use indicatif::MultiProgress;

/// ANSI color code and severity tag for a log level.
fn level_style(level: log::Level, color: bool) -> (&'static str, &'static str, &'static str) {
    let label = match level {
        log::Level::Error => "error",
        log::Level::Warn => "warning",
        log::Level::Info => "info",
        log::Level::Debug => "debug",
        log::Level::Trace => "trace",
    };
    if !color {
        return ("", label, "");
    }
    let ansi = match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    };
    (ansi, label, "\x1b[0m")
}

/// Render one log line: `<tag>: <message>`
fn format_line(level: log::Level, color: bool, args: &std::fmt::Arguments<'_>) -> String {
    let (pre, label, post) = level_style(level, color);
    format!("{pre}{label}{post}: {}", args.to_string().trim())
}

/// Writes log lines above the spinners of a `MultiProgress`.
///
/// Filtering is delegated to an `env_logger` built from `RUST_LOG`.
pub struct IndicatifLogger {
    filter: env_logger::Logger,
    multi: MultiProgress,
}

impl IndicatifLogger {
    pub fn new(filter: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { filter, multi }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.filter.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.filter.matches(record) {
            return;
        }
        let line = format_line(record.level(), true, record.args());
        self.multi.suspend(|| eprintln!("{line}"));
    }

    fn flush(&self) {}
}

/// `RUST_LOG` if set, otherwise `debug` / `warn` / `info`
fn env_builder(quiet: bool, debug: bool) -> env_logger::Builder {
    let level = match (debug, quiet) {
        (true, _) => "debug",
        (false, true) => "warn",
        (false, false) => "info",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
}

/// Install the global logger. Call once, before the first log line.
///
/// With `multi`, lines are colored and drawn through the progress bars.
/// Without, they are plain `<tag>: <message>` lines on stderr.
pub fn init_logging(quiet: bool, debug: bool, multi: Option<&MultiProgress>) {
    use std::io::Write;

    let mut builder = env_builder(quiet, debug);
    let Some(multi) = multi else {
        builder
            .format(|buf, record| {
                writeln!(buf, "{}", format_line(record.level(), false, record.args()))
            })
            .init();
        return;
    };

    let filter = builder.build();
    let max_level = filter.filter();
    match log::set_boxed_logger(Box::new(IndicatifLogger::new(filter, multi.clone()))) {
        Ok(()) => log::set_max_level(max_level),
        Err(e) => eprintln!("warning: logger already installed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_tags() {
        assert_eq!(level_style(log::Level::Info, false).1, "info");
        assert_eq!(level_style(log::Level::Warn, false).1, "warning");
        assert_eq!(level_style(log::Level::Error, false).1, "error");
    }

    #[test]
    fn plain_line_is_trimmed() {
        let line = format_line(log::Level::Warn, false, &format_args!("  no charset found \n"));
        assert_eq!(line, "warning: no charset found");
    }

    #[test]
    fn colored_line_wraps_tag() {
        let line = format_line(log::Level::Error, true, &format_args!("boom"));
        assert_eq!(line, "\x1b[31merror\x1b[0m: boom");
    }
}
