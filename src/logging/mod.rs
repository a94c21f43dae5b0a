use std::{fmt::Write as _, sync::Mutex, thread};

use chrono::{format::DelayedFormat, DateTime, Local};
use once_cell::sync::Lazy;
use strum::Display;
use tokio::sync::{
    mpsc::{self, UnboundedSender},
    oneshot,
};

use crate::logging::rotate::Rotate;

pub mod rotate;

/// 每批寫入的上限
const BATCH_CAPACITY: usize = 4096;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("default"));

/// Every logger created in this process, so `flush_all` can reach them.
static WRITERS: Lazy<Mutex<Vec<UnboundedSender<Command>>>> = Lazy::new(|| Mutex::new(Vec::new()));

#[derive(Display, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

pub struct LogMessage {
    pub level: Level,
    pub msg: String,
    pub created_at: DateTime<Local>,
}

impl LogMessage {
    pub fn new(level: Level, msg: String) -> Self {
        LogMessage {
            level,
            msg,
            created_at: Local::now(),
        }
    }
}

enum Command {
    Write(LogMessage),
    /// Answered once everything queued before it is on disk.
    Flush(oneshot::Sender<()>),
}

/// A named file logger.
///
/// Messages are queued on an unbounded channel and written by a dedicated
/// thread to `log/%Y-%m-%d-{name}.log`, so callers never block on disk I/O.
/// The thread is detached; call [`flush_all`] before the process exits or
/// the lines still queued are lost.
pub struct Logger {
    writer: UnboundedSender<Command>,
}

impl Logger {
    pub fn new(log_name: &str) -> Self {
        Self::with_pattern(format!("log/%Y-%m-%d-{}.log", log_name))
    }

    /// `pattern` is a chrono format string for the file path.
    pub fn with_pattern(pattern: String) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();

        // 寫入檔案的操作使用另一個線程處理
        thread::spawn(move || {
            let mut rotate = Rotate::new(pattern);
            let mut batch = String::with_capacity(BATCH_CAPACITY);
            let mut batch_at = Local::now();

            while let Some(command) = rx.blocking_recv() {
                match command {
                    Command::Write(received) => {
                        if writeln!(
                            &mut batch,
                            "{} {} {}",
                            received.created_at.format("%F %X%.6f"),
                            received.level,
                            received.msg
                        )
                        .is_err()
                        {
                            continue;
                        }

                        batch_at = received.created_at;
                        if rx.is_empty() || batch.len() >= BATCH_CAPACITY {
                            write_batch(&mut rotate, &mut batch, batch_at);
                        }
                    }
                    Command::Flush(ack) => {
                        write_batch(&mut rotate, &mut batch, batch_at);
                        let _ = ack.send(());
                    }
                }
            }
        });

        if let Ok(mut writers) = WRITERS.lock() {
            writers.push(tx.clone());
        }

        Logger { writer: tx }
    }

    pub fn debug(&self, log: String) {
        self.send(Level::Debug, log);
    }

    pub fn info(&self, log: String) {
        self.send(Level::Info, log);
    }

    pub fn warn(&self, log: String) {
        self.send(Level::Warn, log);
    }

    pub fn error(&self, log: String) {
        self.send(Level::Error, log);
    }

    fn send(&self, level: Level, msg: String) {
        if let Err(why) = self.writer.send(Command::Write(LogMessage::new(level, msg))) {
            error_console(why.to_string());
        }
    }
}

fn write_batch(rotate: &mut Rotate, batch: &mut String, at: DateTime<Local>) {
    if batch.is_empty() {
        return;
    }

    if let Err(why) = rotate.write_msg(at, batch.as_bytes()) {
        error_console(format!(
            "Failed to write to log file. because:{:#?}\r\nmsg:{}",
            why, batch
        ));
    }

    rotate.flush();
    batch.clear();
}

/// Waits until every line sent to `writer` so far is written and flushed.
async fn flush_writer(writer: &UnboundedSender<Command>) {
    let (ack, done) = oneshot::channel();
    if writer.send(Command::Flush(ack)).is_ok() {
        let _ = done.await;
    }
}

/// Flushes every logger created so far. Run it last, before `main` returns.
pub async fn flush_all() {
    let writers = WRITERS
        .lock()
        .map(|writers| writers.clone())
        .unwrap_or_default();

    for writer in &writers {
        flush_writer(writer).await;
    }
}

pub fn debug_file_async(log: String) {
    LOGGER.debug(log);
}

pub fn info_file_async(log: String) {
    LOGGER.info(log);
}

pub fn warn_file_async(log: String) {
    LOGGER.warn(log);
}

pub fn error_file_async(log: String) {
    LOGGER.error(log);
}

/// Goes to stderr so it never interleaves with the report on stdout.
pub fn error_console(log: String) {
    eprintln!(
        "{} Error {}",
        DelayedFormat::to_string(&Local::now().format("%Y-%m-%d %H:%M:%S.%3f")),
        log
    );
}
