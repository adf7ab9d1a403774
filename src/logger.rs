

use std::io::Write;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use std::cell::RefCell;
use std::thread;
use log::{set_logger, Log, LogMetadata, LogRecord, LogLevel, LogLevelFilter, SetLoggerError};


pub struct ConsoleFileLogger {
    pub file: Option<Mutex<RefCell<File>>>,
    pub verbose: bool,
}

impl Log for ConsoleFileLogger {
    fn enabled(&self, metadata: &LogMetadata) -> bool {
        let min_level = if self.verbose { LogLevel::Info } else { LogLevel::Trace };
        metadata.level() <= min_level
    }

    fn log(&self, record: &LogRecord) {
        if self.enabled(record.metadata()) {
            let cur = thread::current();
            let tid = cur.name().unwrap_or("<?>");
            let loc = record.location();
            let loc = format!("[{}:{} - {}]", loc.file(), loc.line(), loc.module_path());
            let fmt = format!("{}", record.args()).replace("\n","\n\t\t   ");
            let msg = format!("[TID={}]\t{}\t{}\n\t\t-- {}\n", tid, record.level(), loc, fmt);

            // File only: stdout is reserved for the rendered assembly listing.
            if let Some(f) = self.file.as_ref() {
                let tmp = f.lock().unwrap();
                writeln!(*(tmp.borrow_mut()), "{}", msg).unwrap();
            }
        }
    }
}


pub fn init_with(file: &Path, verbose: bool) -> Result<(), SetLoggerError> {
    set_logger(|max_log_level| {
        max_log_level.set(LogLevelFilter::Trace);
        box ConsoleFileLogger {
            file: Some(Mutex::new(RefCell::new(File::create(file).unwrap()))),
            verbose: verbose,
        }
    })
}
