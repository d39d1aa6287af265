use crate::compress::CompressWriter;
use crate::error::{Capability, Error, Result};
use crate::writer::{Closer, Flusher, Hijacked, Hijacker, PushOptions, Pusher, ResponseWriter};
use http::{HeaderMap, StatusCode};
use std::io::{self, Write};

/// A [`ResponseWriter`] that sends the body through a [`CompressWriter`].
///
/// Body bytes always go to the compressing writer. Everything else is handed
/// to the original writer. The wrapper answers every capability query, so
/// handlers see flush, hijack, push and close as available and get
/// [`Error::Unsupported`] back when the original writer cannot do it. Use
/// [`get_mut`](Self::get_mut) or [`unwrap_writer`](ResponseWriter::unwrap_writer)
/// to inspect the original writer's own capabilities.
#[derive(Debug)]
pub struct CompressResponseWriter<W: ResponseWriter> {
    compressed: CompressWriter<W>,
}

impl<W: ResponseWriter> CompressResponseWriter<W> {
    /// Wraps the writer owned by `compressed`.
    pub fn new(compressed: CompressWriter<W>) -> Self {
        Self { compressed }
    }

    /// Returns a reference to the original writer.
    pub fn get_ref(&self) -> &W {
        self.compressed.get_ref()
    }

    /// Returns a mutable reference to the original writer.
    pub fn get_mut(&mut self) -> &mut W {
        self.compressed.get_mut()
    }

    /// Returns the compressing writer.
    pub fn compressor(&self) -> &CompressWriter<W> {
        &self.compressed
    }
}

impl<W: ResponseWriter> ResponseWriter for CompressResponseWriter<W> {
    fn headers(&self) -> &HeaderMap {
        self.compressed.get_ref().headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.compressed.get_mut().headers_mut()
    }

    fn write_head(&mut self, status: StatusCode) {
        self.compressed.write_head(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.compressed.write(buf)
    }

    fn as_flusher(&mut self) -> Option<&mut dyn Flusher> {
        Some(self)
    }

    fn as_hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        Some(self)
    }

    fn as_pusher(&mut self) -> Option<&mut dyn Pusher> {
        Some(self)
    }

    fn as_closer(&mut self) -> Option<&mut dyn Closer> {
        Some(self)
    }

    fn unwrap_writer(&mut self) -> Option<&mut dyn ResponseWriter> {
        Some(self.compressed.get_mut())
    }
}

/// Flushes the original writer. The encoder's buffer is left alone.
impl<W: ResponseWriter> Flusher for CompressResponseWriter<W> {
    fn flush(&mut self) {
        if let Some(flusher) = self.compressed.get_mut().as_flusher() {
            flusher.flush();
        }
    }
}

impl<W: ResponseWriter> Hijacker for CompressResponseWriter<W> {
    fn hijack(&mut self) -> Result<Hijacked> {
        match self.compressed.get_mut().as_hijacker() {
            Some(hijacker) => hijacker.hijack(),
            None => Err(Error::Unsupported(Capability::Hijack)),
        }
    }
}

impl<W: ResponseWriter> Pusher for CompressResponseWriter<W> {
    fn push(&mut self, target: &str, opts: &PushOptions) -> Result<()> {
        match self.compressed.get_mut().as_pusher() {
            Some(pusher) => pusher.push(target, opts),
            None => Err(Error::Unsupported(Capability::Push)),
        }
    }
}

/// Finishes the compressed stream, then closes the original writer.
///
/// A failure to finish the stream is returned as is and the original writer
/// is left open.
impl<W: ResponseWriter> Closer for CompressResponseWriter<W> {
    fn close(&mut self) -> Result<()> {
        self.compressed.close()?;

        match self.compressed.get_mut().as_closer() {
            Some(closer) => closer.close(),
            None => Err(Error::Unsupported(Capability::Close)),
        }
    }
}
