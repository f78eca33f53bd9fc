// src/backend/utils/log.rs
// Canister logging. Off-chain builds (unit tests) write to stderr instead of
// the replica debug log.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn prefix(self) -> &'static str {
        match self {
            Level::Info => "INFO:",
            Level::Warn => "WARN:",
            Level::Error => "🔥 ERROR:",
        }
    }
}

pub fn emit(level: Level, args: fmt::Arguments<'_>) {
    #[cfg(target_arch = "wasm32")]
    {
        match level {
            Level::Error => ic_cdk::eprintln!("{} {}", level.prefix(), args),
            _ => ic_cdk::println!("{} {}", level.prefix(), args),
        }
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        eprintln!("{} {}", level.prefix(), args);
    }
}

macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::utils::log::emit($crate::utils::log::Level::Info, format_args!($($arg)*))
    };
}

macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::utils::log::emit($crate::utils::log::Level::Warn, format_args!($($arg)*))
    };
}

macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::utils::log::emit($crate::utils::log::Level::Error, format_args!($($arg)*))
    };
}

pub(crate) use log_error;
pub(crate) use log_info;
pub(crate) use log_warn;
