// Logging utilities for CLI
use std::io::Write;

/// Initialize logger for CLI
pub fn init_logger(verbose: bool, quiet: bool) {
    // RUST_LOG overrides the flags completely
    if std::env::var_os("RUST_LOG").is_some() {
        env_logger::init();
        return;
    }

    let default_level = if quiet {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();

    builder.filter_level(default_level).format(|buf, record| {
        if record.level() >= log::Level::Debug {
            writeln!(buf, "[{}] {}", record.level(), record.args())
        } else {
            writeln!(
                buf,
                "{} {:<5} {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        }
    });

    // Debug only for this crate, never for the HTTP stack
    if verbose && !quiet {
        builder.filter_module("debitur_print", log::LevelFilter::Debug);
        builder.filter_module("reqwest", log::LevelFilter::Info);
        builder.filter_module("hyper", log::LevelFilter::Info);
        builder.filter_module("h2", log::LevelFilter::Info);
        builder.filter_module("tokio", log::LevelFilter::Info);
    }

    builder.init();
}
