use std::{env, panic, process};

use backtrace::Backtrace;
use clap::Parser;

use libscenepatch::cli::{GlobalOptions, Options};

fn main() {
    install_panic_hook();

    let options = Options::parse();
    init_logging(&options.global);

    if let Err(err) = options.run() {
        log::error!("{:?}", err);
        process::exit(1);
    }
}

/// Reports a panic through the logger, with a backtrace when one was asked
/// for, and exits.
fn install_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        let payload = panic_info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .map(|message| message.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "<no message>".to_owned());

        log::error!(
            "scenepatch {} hit an internal error: {}",
            env!("CARGO_PKG_VERSION"),
            message
        );

        if let Some(location) = panic_info.location() {
            log::error!("at {}:{}", location.file(), location.line());
        }

        // The backtrace crate does not look at RUST_BACKTRACE on its own.
        let wants_backtrace = env::var_os("RUST_BACKTRACE").map_or(false, |var| var != "0");

        if wants_backtrace {
            eprintln!("{:?}", Backtrace::new());
        } else {
            eprintln!("note: set RUST_BACKTRACE=1 to print a backtrace");
        }

        process::exit(101);
    }));
}

fn init_logging(global: &GlobalOptions) {
    let log_env = env_logger::Env::default().default_filter_or(log_filter(global.verbosity));

    env_logger::Builder::from_env(log_env)
        .format_module_path(false)
        .format_timestamp(None)
        // Continuation lines line up after the `[LEVEL] ` label.
        .format_indent(Some(8))
        .write_style(global.color.into())
        .init();
}

/// `RUST_LOG` still wins over whatever `-v` asks for.
fn log_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "info,libscenepatch=debug,scenefs=debug",
        2 => "info,libscenepatch=trace,scenefs=trace",
        _ => "trace",
    }
}
