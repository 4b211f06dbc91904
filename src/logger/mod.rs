//! Leveled logging over any `ufmt` sink
//!
//! On the board the sink is the serial console; in tests it is a buffer.
//! Use the `log_*!` macros, which skip formatting entirely when the level is
//! filtered out. `log_debug!` compiles to nothing without the `debug` feature.

use ufmt::uWrite;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl Level {
    pub const fn tag(self) -> &'static str {
        match self {
            Level::Error => "[ERR] ",
            Level::Warn => "[WRN] ",
            Level::Info => "[INF] ",
            Level::Debug => "[DBG] ",
        }
    }
}

pub struct Logger<W: uWrite> {
    sink: W,
    max: Level,
}

impl<W: uWrite> Logger<W> {
    pub const fn new(sink: W, max: Level) -> Self {
        Self { sink, max }
    }

    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.max
    }

    pub fn set_level(&mut self, max: Level) {
        self.max = max;
    }

    /// Start a record: write the level tag and hand out the sink, or `None`
    /// if the level is filtered or the sink failed.
    pub fn begin(&mut self, level: Level) -> Option<&mut W> {
        if !self.enabled(level) {
            return None;
        }
        self.sink.write_str(level.tag()).ok()?;
        Some(&mut self.sink)
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

#[macro_export]
macro_rules! log_at {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        if let Some(w) = $logger.begin($level) {
            let _ = ::ufmt::uwrite!(w, $($arg)+);
            let _ = ::ufmt::uWrite::write_str(w, "\r\n");
        }
    }};
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::logger::Level::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::logger::Level::Warn, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::logger::Level::Info, $($arg)+)
    };
}

#[cfg(feature = "debug")]
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::logger::Level::Debug, $($arg)+)
    };
}

#[cfg(not(feature = "debug"))]
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)+) => {{}};
}
