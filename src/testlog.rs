//! Logger that keeps every record in memory, for tests that check what a
//! failure was logged as. Tests share one process-wide logger, so look for
//! text only your own test produces.

use std::sync::{Mutex, Once};

use log::{LevelFilter, Metadata, Record};

struct MemoryLogger {
    lines: Mutex<Vec<String>>,
}

static LOGGER: MemoryLogger = MemoryLogger {
    lines: Mutex::new(Vec::new()),
};
static INSTALL: Once = Once::new();

impl log::Log for MemoryLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.lines.lock().unwrap().push(record.args().to_string());
    }

    fn flush(&self) {}
}

pub fn install() {
    INSTALL.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(LevelFilter::Trace);
    });
}

pub fn logged(needle: &str) -> bool {
    LOGGER
        .lines
        .lock()
        .unwrap()
        .iter()
        .any(|line| line.contains(needle))
}
