use std::io::{self, Cursor, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::pipe::PipeClient;

/// Write half double that remembers everything sent down the pipe.
#[derive(Clone, Default)]
pub struct WriteLog {
    data: Arc<Mutex<Vec<u8>>>,
    flushes: Arc<AtomicUsize>,
}

impl WriteLog {
    pub fn bytes(&self) -> Vec<u8> {
        self.data.lock().expect("write log poisoned").clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.bytes()).expect("write log was not UTF-8")
    }

    /// Sent commands, one per line.
    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_string).collect()
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl Write for WriteLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data
            .lock()
            .expect("write log poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Read half double that hands out its bytes a few at a time, so tests can
/// check that chunk boundaries never change what a response looks like.
pub struct ChunkedReader {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
}

impl ChunkedReader {
    pub fn new(data: &str, chunk: usize) -> Self {
        ChunkedReader {
            data: data.as_bytes().to_vec(),
            pos: 0,
            chunk,
        }
    }
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.data.len() {
            return Ok(0);
        }
        let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// An acknowledgement exactly as Audacity frames one.
pub fn ack() -> &'static str {
    "BatchCommand finished: OK\n\n"
}

/// A `GetInfo:` style reply carrying `body` ahead of the status line.
pub fn info(body: &str) -> String {
    format!("{}\nBatchCommand finished: OK\n\n", body)
}

/// A client wired to canned host output, plus the log of what it writes.
pub fn scripted_client(feed: &str) -> (PipeClient, WriteLog) {
    let log = WriteLog::default();
    let client = PipeClient::from_halves(log.clone(), Cursor::new(feed.as_bytes().to_vec()), None);
    (client, log)
}
