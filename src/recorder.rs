use crate::error::Result;
use crate::writer::{Closer, Flusher, ResponseWriter};
use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Response, StatusCode};
use http_body_util::Full;
use std::io;

/// An in-memory [`ResponseWriter`].
///
/// Headers are snapshotted when the head is written, so later changes to
/// [`headers_mut`](ResponseWriter::headers_mut) are not part of the recorded
/// response. The recorder supports flushing and closing but not hijacking or
/// server push.
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    headers: HeaderMap,
    head: Option<(StatusCode, HeaderMap)>,
    body: BytesMut,
    flushes: usize,
    closed: bool,
}

impl ResponseRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded status, `200 OK` if no head was written yet.
    pub fn status(&self) -> StatusCode {
        self.head.as_ref().map_or(StatusCode::OK, |(status, _)| *status)
    }

    /// Returns the headers as sent, or the pending headers if no head was written.
    pub fn sent_headers(&self) -> &HeaderMap {
        self.head.as_ref().map_or(&self.headers, |(_, headers)| headers)
    }

    /// Returns the body written so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns how many times the recorder was flushed.
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Returns whether the recorder was closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Converts the recording into an HTTP response.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let (status, headers) = self.head.unwrap_or((StatusCode::OK, self.headers));

        let mut response = Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

impl ResponseWriter for ResponseRecorder {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_head(&mut self, status: StatusCode) {
        if self.head.is_none() {
            self.head = Some((status, self.headers.clone()));
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "write on closed response",
            ));
        }
        self.write_head(StatusCode::OK);
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn as_flusher(&mut self) -> Option<&mut dyn Flusher> {
        Some(self)
    }

    fn as_closer(&mut self) -> Option<&mut dyn Closer> {
        Some(self)
    }
}

impl Flusher for ResponseRecorder {
    fn flush(&mut self) {
        self.write_head(StatusCode::OK);
        self.flushes += 1;
    }
}

impl Closer for ResponseRecorder {
    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
