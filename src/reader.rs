use std::io::{self, BufRead, Write};

/// One command line at a time from any buffered source, with an optional prompt.
pub struct LineReader<R, W> {
    input: R,
    prompt_out: W,
    buf: Vec<u8>,
}

impl<R: BufRead, W: Write> LineReader<R, W> {
    pub fn new(input: R, prompt_out: W) -> Self {
        LineReader { input, prompt_out, buf: Vec::new() }
    }

    /// `None` at end of input. The line ending is stripped; invalid UTF-8 is replaced.
    pub fn next_line(&mut self, prompt: Option<&str>) -> io::Result<Option<String>> {
        if let Some(p) = prompt {
            self.prompt_out.write_all(p.as_bytes())?;
            self.prompt_out.flush()?;
        }
        self.buf.clear();
        if self.input.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}
