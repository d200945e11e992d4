//! Buffered line-oriented output writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes G-code lines to the target file, tracking the byte count for the
/// compression statistics.
#[derive(Debug)]
pub struct OutputWriter {
    inner: BufWriter<File>,
    line_ending: &'static str,
    bytes_written: u64,
}

impl OutputWriter {
    /// Create the target file, truncating any existing content.
    pub fn create(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            inner: BufWriter::new(File::create(path)?),
            line_ending: "\n",
            bytes_written: 0,
        })
    }

    /// Use CRLF line endings, matching a CRLF source file.
    pub fn set_crlf(&mut self, crlf: bool) {
        self.line_ending = if crlf { "\r\n" } else { "\n" };
    }

    /// Write one line, appending the line ending.
    pub fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        self.inner.write_all(line.as_bytes())?;
        self.inner.write_all(self.line_ending.as_bytes())?;
        self.bytes_written += (line.len() + self.line_ending.len()) as u64;
        Ok(())
    }

    /// Bytes written so far, line endings included.
    #[inline]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush buffered output to disk.
    pub fn finish(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("arc_welder_writer_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_write_lines_and_count() {
        let path = temp_path("count.gcode");
        let mut w = OutputWriter::create(&path).unwrap();
        w.write_line("G1 X1").unwrap();
        w.write_line("G1 X2").unwrap();
        w.finish().unwrap();

        assert_eq!(w.bytes_written(), 12);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "G1 X1\nG1 X2\n");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_crlf() {
        let path = temp_path("crlf.gcode");
        let mut w = OutputWriter::create(&path).unwrap();
        w.set_crlf(true);
        w.write_line("G1 X1").unwrap();
        w.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "G1 X1\r\n");
        std::fs::remove_file(&path).ok();
    }
}
