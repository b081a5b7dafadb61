use std::fmt::Display;
use std::fs::OpenOptions;
use std::str::FromStr;

use simplelog::{ColorChoice, LevelFilter, TerminalMode, TermLogger, WriteLogger};

use crate::config::LogSettings;
use crate::utils::{ErrorStr, ResultV};


pub fn init_logger(cfg: &LogSettings) -> ResultV {
    let level = LevelFilter::from_str(&cfg.level).unwrap_or_else(|_| {
        eprintln!("Unsupported log level: {}, use `info` by default", cfg.level);
        LevelFilter::Info
    });

    match cfg.kind.as_str() {
        "console" => init_term_logger(level),
        "file"    => init_file_logger(level, &cfg.file),
        _         => {
            eprintln!(
                "Unsupported log type: {}, only `file` and `console` are supported. Use `console` by default",
                cfg.kind
            );
            init_term_logger(level)
        }
    }
}

/// Build an error mapper that logs the real error and yields a short static message.
pub fn get_reporter<E: Display>(module: &'static str, action: &'static str, msg: ErrorStr) -> impl Fn(E) -> ErrorStr {
    move |e: E| {
        error!("[{}] {} failed: {}", module, action, e);
        msg
    }
}


fn prepare_logger_config() -> simplelog::Config {
    let mut builder = simplelog::ConfigBuilder::new();
    builder.set_time_format_custom(
        simplelog::format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
        )
    );
    // Falls back to UTC when the local offset cannot be determined.
    match builder.set_time_offset_to_local() {
        Ok(b) | Err(b) => b.build(),
    }
}

fn init_term_logger(level: LevelFilter) -> ResultV {
    TermLogger::init(
        level,
        prepare_logger_config(),
        TerminalMode::Stderr, ColorChoice::Auto
    ).map_err(|e| {
        eprintln!("Could not init console logger: {}", e);
        "init logger error"
    })
}

fn init_file_logger(level: LevelFilter, filename: &str) -> ResultV {
    let file = OpenOptions::new().create(true).append(true).open(filename).map_err(|e| {
        eprintln!("Could not open log file {}: {}", filename, e);
        "open log file error"
    })?;

    WriteLogger::init(level, prepare_logger_config(), file).map_err(|e| {
        eprintln!("Could not init file logger: {}", e);
        "init logger error"
    })
}
