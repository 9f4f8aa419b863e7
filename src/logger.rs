use core::fmt::Arguments;
use log::{LevelFilter, Record};
use std::io;
use std::path::Path;

/// Console logging, plus an optional plain-text log file.
pub fn init_logger(level: LevelFilter, file: Option<&Path>) -> anyhow::Result<()> {
    let console = fern::Dispatch::new()
        .format(console_format)
        .level(level)
        .level_for("hyper", LevelFilter::Warn)
        .chain(io::stderr());

    let mut root = fern::Dispatch::new().chain(console);
    if let Some(path) = file {
        let file = fern::Dispatch::new()
            .format(file_format)
            .level(level)
            .chain(fern::log_file(path)?);
        root = root.chain(file);
    }
    root.apply()?;
    Ok(())
}

fn console_format(cb: fern::FormatCallback, message: &Arguments, record: &Record) {
    cb.finish(format_args!(
        "{} {:<5} {}",
        chrono::Local::now().format("%H:%M:%S"),
        record.level(),
        message
    ))
}

fn file_format(cb: fern::FormatCallback, message: &Arguments, record: &Record) {
    cb.finish(format_args!(
        "{} [{}] {:<5} {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        record.target(),
        record.level(),
        message
    ))
}
