use crate::helpers::LineBuffer;

/// Splits the sensor byte stream into `\n` terminated lines.
///
/// Bytes are buffered until their line is complete and only then decoded, so
/// a multi-byte character split across two reads survives intact. A line
/// longer than `max_line` bytes is dropped as a whole; the bytes after it
/// start a fresh line.
#[derive(Debug)]
pub struct LineFramer {
    carry: Vec<u8>,
    max_line: usize,
    discarding: bool,
    discarded: u64,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    pub const DEFAULT_MAX_LINE: usize = 4096;

    pub fn new() -> Self {
        Self::with_max_line(Self::DEFAULT_MAX_LINE)
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            carry: Vec::new(),
            max_line,
            discarding: false,
            discarded: 0,
        }
    }

    /// Appends `chunk` and returns every line it completed, oldest first.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(line) = self.carry.take_line() {
            if self.discarding || line.len() > self.max_line {
                self.discarding = false;
                self.discarded += line.len() as u64;
                continue;
            }

            lines.push(String::from_utf8_lossy(&line).into_owned());
        }

        if self.carry.len() > self.max_line {
            self.discarded += self.carry.len() as u64;
            self.carry.clear();
            self.discarding = true;
        }

        lines
    }

    /// Bytes waiting for their terminating newline.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    /// Bytes thrown away because their line outgrew `max_line`.
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded
    }
}
