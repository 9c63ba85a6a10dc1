use std::{env, fmt::Display};

use colored::{Color, Colorize};
use flashmob_core::Config;
use log::{Level, LevelFilter, Metadata};

/// What gets printed, per origin of the record
#[derive(Debug, Clone, Copy, PartialEq)]
struct LogFilter {
    /// Records from the flashmob crates
    local: LevelFilter,
    /// Records from dependencies, such as sqlx and hyper
    external: LevelFilter,
}

impl LogFilter {
    /// Reads the verbosity of the flashmob crates from `FLASHMOB_LOG`.
    /// Returns the unparsable value along with the default filter.
    fn from_env() -> (Self, Option<String>) {
        let value = env::var(Config::LOG_LEVEL_VAR).ok();

        match value.as_deref().map(|v| v.trim().parse::<LevelFilter>()) {
            None => (Self::default(), None),
            Some(Ok(local)) => (Self::with_local(local), None),
            Some(Err(_)) => (Self::default(), value),
        }
    }

    fn with_local(local: LevelFilter) -> Self {
        Self {
            local,
            ..Self::default()
        }
    }

    fn allows(&self, meta: &Metadata) -> bool {
        let max = if Target::from_str(meta.target()).is_local() {
            self.local
        } else {
            self.external
        };

        meta.level() <= max
    }
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            local: LevelFilter::Info,
            external: LevelFilter::Warn,
        }
    }
}

pub fn init_logger() -> Result<(), log::SetLoggerError> {
    let (filter, invalid) = LogFilter::from_env();

    fern::Dispatch::new()
        .format(move |out, message, record| {
            let target = Target::from_str(record.target());
            let now = chrono::Local::now();

            out.finish(format_args!(
                "{:^5} {} {:^8} {}",
                level_badge(record.level()),
                now.format("%H:%M:%S").to_string().bright_black(),
                target,
                message
            ))
        })
        .level(filter.local.max(filter.external))
        .filter(move |meta| filter.allows(meta))
        .chain(std::io::stdout())
        .apply()?;

    if let Some(value) = invalid {
        log::warn!(
            "{} has an invalid value {:?}, expected one of off, error, warn, info, debug, trace",
            Config::LOG_LEVEL_VAR,
            value
        );
    }

    Ok(())
}

pub enum LogColor {
    Red,
    Dimmed,
}

impl From<LogColor> for Color {
    fn from(value: LogColor) -> Self {
        match value {
            LogColor::Red => Color::BrightRed,
            LogColor::Dimmed => Color::BrightBlack,
        }
    }
}

/// The flashmob crate a record comes from
enum Target {
    External(String),
    Main,
    Server,
    Collab,
    Core,
}

impl Target {
    fn from_str(str: &str) -> Self {
        let module = str.split("::").next().unwrap_or_default();

        match module {
            "flashmob" => Self::Main,
            "flashmob_core" => Self::Core,
            "flashmob_server" => Self::Server,
            "flashmob_collab" => Self::Collab,
            other => Target::External(other.to_string()),
        }
    }

    fn is_local(&self) -> bool {
        !matches!(self, Self::External(_))
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = match self {
            Target::External(x) => x.as_str().clear(),
            Target::Main => "MAIN".bright_white(),
            Target::Server => "SERVER".bright_green(),
            Target::Collab => "COLLAB".bright_purple(),
            Target::Core => "CORE".blue(),
        };

        Display::fmt(&result, f)
    }
}

fn level_badge(level: Level) -> String {
    match level {
        Level::Error => " ERR ".black().on_red().bold().to_string(),
        Level::Warn => " WRN ".black().on_yellow().bold().to_string(),
        Level::Info => " INF ".black().on_blue().bold().to_string(),
        Level::Debug => " DBG ".white().on_black().to_string(),
        Level::Trace => " TRC ".to_string(),
    }
}
