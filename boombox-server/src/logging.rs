use colored::{ColoredString, Colorize};
use log::{Level, LevelFilter};

/// Installs the process-wide logger. Our own crates log at info and above;
/// dependencies are only let through at warn and above.
pub fn init_logger() {
    fern::Dispatch::new()
        .format(|out, message, record| {
            let time = chrono::Local::now().format("%H:%M:%S");

            out.finish(format_args!(
                "{} {} {:^8} {}",
                time.to_string().bright_black(),
                level_badge(record.level()),
                crate_label(record.target()),
                message
            ))
        })
        .level(LevelFilter::Warn)
        .level_for("boombox_core", LevelFilter::Info)
        .level_for("boombox_server", LevelFilter::Info)
        .chain(std::io::stdout())
        .apply()
        .expect("logging is initialized")
}

fn crate_label(target: &str) -> ColoredString {
    let module = target.split("::").next().unwrap_or(target);

    match module {
        "boombox_core" => "CORE".blue(),
        "boombox_server" => "SERVER".bright_green(),
        other => other.clear(),
    }
}

fn level_badge(level: Level) -> ColoredString {
    match level {
        Level::Error => " ERR ".black().on_red().bold(),
        Level::Warn => " WRN ".black().on_yellow().bold(),
        Level::Info => " INF ".black().on_blue().bold(),
        Level::Debug => " DBG ".white().on_black(),
        Level::Trace => " TRC ".normal(),
    }
}
