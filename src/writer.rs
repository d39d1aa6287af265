use crate::error::Result;
use bytes::BytesMut;
use http::{HeaderMap, Method, StatusCode};
use std::io;

/// The contract a host server hands to handlers for producing a response.
///
/// Only the base operations are required. Optional behavior is exposed through
/// the `as_*` capability queries, which return `None` unless a writer opts in.
pub trait ResponseWriter {
    /// Returns the response headers.
    fn headers(&self) -> &HeaderMap;

    /// Returns the response headers for modification.
    ///
    /// Changes made after the head has been written have no effect.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Writes the status line and headers.
    ///
    /// Only the first call takes effect.
    fn write_head(&mut self, status: StatusCode);

    /// Writes body bytes, committing a `200 OK` head first if none was written.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Writes the whole buffer.
    fn write_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write whole buffer",
                    ));
                }
                Ok(n) => buf = &buf[n..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Returns this writer as a [`Flusher`] if it supports flushing.
    fn as_flusher(&mut self) -> Option<&mut dyn Flusher> {
        None
    }

    /// Returns this writer as a [`Hijacker`] if it supports hijacking.
    fn as_hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        None
    }

    /// Returns this writer as a [`Pusher`] if it supports server push.
    fn as_pusher(&mut self) -> Option<&mut dyn Pusher> {
        None
    }

    /// Returns this writer as a [`Closer`] if it can be closed.
    fn as_closer(&mut self) -> Option<&mut dyn Closer> {
        None
    }

    /// Returns the writer this one wraps, if it is a wrapper.
    fn unwrap_writer(&mut self) -> Option<&mut dyn ResponseWriter> {
        None
    }

    /// Summarizes which optional capabilities this writer exposes.
    fn capabilities(&mut self) -> Capabilities {
        Capabilities {
            flush: self.as_flusher().is_some(),
            hijack: self.as_hijacker().is_some(),
            push: self.as_pusher().is_some(),
            close: self.as_closer().is_some(),
        }
    }
}

/// Presence of each optional writer capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// The writer is a [`Flusher`].
    pub flush: bool,
    /// The writer is a [`Hijacker`].
    pub hijack: bool,
    /// The writer is a [`Pusher`].
    pub push: bool,
    /// The writer is a [`Closer`].
    pub close: bool,
}

/// Sends any buffered response data to the client.
pub trait Flusher {
    /// Flushes buffered data.
    fn flush(&mut self);
}

/// Hands the underlying connection over to the caller.
pub trait Hijacker {
    /// Takes over the connection. The server no longer manages it afterwards.
    fn hijack(&mut self) -> Result<Hijacked>;
}

/// Initiates server push of an associated resource.
pub trait Pusher {
    /// Pushes `target`, an absolute path or absolute URL.
    fn push(&mut self, target: &str, opts: &PushOptions) -> Result<()>;
}

/// Finishes the response.
pub trait Closer {
    /// Closes the writer.
    fn close(&mut self) -> Result<()>;
}

/// A raw bidirectional connection.
pub trait Connection: io::Read + io::Write + Send {}

impl<T> Connection for T where T: io::Read + io::Write + Send {}

/// A connection taken over from the server.
pub struct Hijacked {
    /// The raw connection.
    pub conn: Box<dyn Connection>,
    /// Bytes the server already read from the connection but did not consume.
    pub buffered: BytesMut,
}

impl std::fmt::Debug for Hijacked {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hijacked")
            .field("buffered", &self.buffered.len())
            .finish_non_exhaustive()
    }
}

/// Options for a server push.
#[derive(Debug, Clone)]
pub struct PushOptions {
    /// Method of the promised request. Must be safe and cacheable.
    pub method: Method,
    /// Additional headers of the promised request.
    pub headers: HeaderMap,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
        }
    }
}

impl<W> ResponseWriter for &mut W
where
    W: ResponseWriter + ?Sized,
{
    fn headers(&self) -> &HeaderMap {
        (**self).headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        (**self).headers_mut()
    }

    fn write_head(&mut self, status: StatusCode) {
        (**self).write_head(status)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        (**self).write_all(buf)
    }

    fn as_flusher(&mut self) -> Option<&mut dyn Flusher> {
        (**self).as_flusher()
    }

    fn as_hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        (**self).as_hijacker()
    }

    fn as_pusher(&mut self) -> Option<&mut dyn Pusher> {
        (**self).as_pusher()
    }

    fn as_closer(&mut self) -> Option<&mut dyn Closer> {
        (**self).as_closer()
    }

    fn unwrap_writer(&mut self) -> Option<&mut dyn ResponseWriter> {
        (**self).unwrap_writer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts at most `limit` bytes per write.
    struct Trickle {
        headers: HeaderMap,
        limit: usize,
        body: Vec<u8>,
        interrupts: usize,
    }

    impl ResponseWriter for Trickle {
        fn headers(&self) -> &HeaderMap {
            &self.headers
        }

        fn headers_mut(&mut self) -> &mut HeaderMap {
            &mut self.headers
        }

        fn write_head(&mut self, _status: StatusCode) {}

        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.interrupts > 0 {
                self.interrupts -= 1;
                return Err(io::ErrorKind::Interrupted.into());
            }
            let n = buf.len().min(self.limit);
            self.body.extend_from_slice(&buf[..n]);
            Ok(n)
        }
    }

    fn trickle(limit: usize) -> Trickle {
        Trickle {
            headers: HeaderMap::new(),
            limit,
            body: Vec::new(),
            interrupts: 0,
        }
    }

    #[test]
    fn test_write_all_loops_over_short_writes() {
        let mut w = trickle(3);
        w.interrupts = 2;
        w.write_all(b"hello world").unwrap();
        assert_eq!(w.body, b"hello world");
    }

    #[test]
    fn test_write_all_reports_write_zero() {
        let mut w = trickle(0);
        let err = w.write_all(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
    }

    #[test]
    fn test_default_capabilities_are_absent() {
        let mut w = trickle(1);
        assert_eq!(w.capabilities(), Capabilities::default());
        assert!(w.unwrap_writer().is_none());
    }

    #[test]
    fn test_mut_ref_forwards_to_target() {
        fn fill<W: ResponseWriter>(mut w: W) {
            w.headers_mut().insert("x-test", "1".parse().unwrap());
            w.write_all(b"abc").unwrap();
        }

        let mut w = trickle(16);
        fill(&mut w);
        assert_eq!(w.headers.get("x-test").unwrap(), "1");
        assert_eq!(w.body, b"abc");
    }

    #[test]
    fn test_push_options_default_to_get() {
        let opts = PushOptions::default();
        assert_eq!(opts.method, Method::GET);
        assert!(opts.headers.is_empty());
    }
}
