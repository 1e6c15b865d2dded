//! A synchronous, in-memory pipe: the producer side blocks until the
//! consumer has taken the previous chunk, giving the fetch-and-extract
//! producer/consumer pair the same backpressure an `io.Pipe()` would. Built
//! on `crossbeam_channel` rather than a raw `std::sync::mpsc` because the
//! rest of the crate already leans on crossbeam for its worker-thread
//! plumbing.

use std::io::{self, Read, Write};

use crossbeam_channel::{bounded, Receiver, Sender};

enum Chunk {
    Data(Vec<u8>),
    Err(io::Error),
}

pub struct PipeReader {
    receiver: Receiver<Chunk>,
    buf: Vec<u8>,
    pos: usize,
}

pub struct PipeWriter {
    sender: Sender<Chunk>,
}

/// Creates a connected reader/writer pair. The channel is rendezvous
/// (capacity zero): a write only returns once the reader has started
/// consuming it.
pub fn pipe() -> (PipeReader, PipeWriter) {
    let (sender, receiver) = bounded(0);
    (
        PipeReader {
            receiver,
            buf: Vec::new(),
            pos: 0,
        },
        PipeWriter { sender },
    )
}

impl PipeWriter {
    /// Closes the pipe, delivering `err` to the reader's next `read` call
    /// instead of a clean EOF. Used when the producer side fails partway
    /// through and the consumer needs to see that failure rather than a
    /// silently truncated stream.
    pub fn close_with_error(self, err: io::Error) {
        let _ = self.sender.send(Chunk::Err(err));
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sender
            .send(Chunk::Data(buf.to_vec()))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader was dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for PipeReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.buf.len() {
            match self.receiver.recv() {
                Ok(Chunk::Data(chunk)) => {
                    self.buf = chunk;
                    self.pos = 0;
                }
                Ok(Chunk::Err(err)) => return Err(err),
                // Sender dropped without an explicit error: clean EOF.
                Err(_) => return Ok(0),
            }
        }
        let available = self.buf.len() - self.pos;
        let n = out.len().min(available);
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
