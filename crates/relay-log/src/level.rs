use std::sync::atomic::{AtomicU8, Ordering};

/// Severity of a log line, ordered `Debug < Info < Warn < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl Level {
    /// Five-character, space-padded label used in the on-disk line format
    /// (spec §4.7 "Lines").
    pub(crate) fn padded(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO ",
            Level::Warn => "WARN ",
            Level::Error => "ERROR",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => Level::Debug,
            1 => Level::Info,
            2 => Level::Warn,
            _ => Level::Error,
        }
    }
}

/// Lock-free minimum-level gate (spec §4.7 "Level filtering" / §5 "Log").
pub struct LevelFilter(AtomicU8);

impl LevelFilter {
    #[must_use]
    pub fn new(min_level: Level) -> Self {
        Self(AtomicU8::new(min_level as u8))
    }

    pub(crate) fn allows(&self, level: Level) -> bool {
        level >= Level::from_u8(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, min_level: Level) {
        self.0.store(min_level as u8, Ordering::Relaxed);
    }

    #[must_use]
    pub fn get(&self) -> Level {
        Level::from_u8(self.0.load(Ordering::Relaxed))
    }
}
