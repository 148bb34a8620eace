//! Answer framing.

use std::io::Write;

use super::errors::DispatchError;

/// Terminal line of every answer.
pub const ANSWER_TRAILER: &str = "OK";

/// Writes pid-tagged answer lines.
pub struct ResponseWriter<W> {
    writer: W,
    pid: u32,
}

impl<W: Write> ResponseWriter<W> {
    pub fn new(writer: W, pid: u32) -> Self {
        Self { writer, pid }
    }

    /// Writes each line of `text` as `"<pid> <line>\n"`, then the
    /// `"<pid> OK\n"` trailer, and flushes.
    pub fn answer(&mut self, text: &str) -> Result<(), DispatchError> {
        for line in text.lines() {
            self.write_line(line)?;
        }
        self.write_line(ANSWER_TRAILER)?;
        self.writer.flush().map_err(DispatchError::Write)
    }

    fn write_line(&mut self, line: &str) -> Result<(), DispatchError> {
        writeln!(self.writer, "{} {line}", self.pid).map_err(DispatchError::Write)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
