use crate::codec::{Codec, Encoder};
use crate::writer::ResponseWriter;
use http::{HeaderMap, HeaderValue, Request, StatusCode, header};
use std::io;
use std::mem;

/// A writer that compresses the response body on its way to `W`.
///
/// The encoding is negotiated from the request up front but only applied when
/// the response head is committed, on the first [`write_head`], write or
/// [`close`]. At that point the handler's headers can still rule compression
/// out and the body passes through unchanged.
///
/// The stream is finished on [`close`], or on drop if it was never closed.
///
/// [`write_head`]: CompressWriter::write_head
/// [`close`]: CompressWriter::close
pub struct CompressWriter<W: ResponseWriter> {
    inner: W,
    state: State,
    min_size: usize,
}

enum State {
    /// Head not committed yet. Holds the negotiated codec.
    Pending(Option<Codec>),
    Encoding(Encoder),
    Identity,
    Closed,
}

impl<W: ResponseWriter> CompressWriter<W> {
    /// Creates a writer using the best encoding the request accepts.
    ///
    /// Responses with a known `Content-Length` below `min_size` are not
    /// compressed. A missing or unusable `Accept-Encoding` header yields a
    /// pass-through writer.
    pub fn negotiate<B>(inner: W, req: &Request<B>, min_size: usize) -> Self {
        let codec = req
            .headers()
            .get(header::ACCEPT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .and_then(Codec::from_accept_encoding);

        match codec {
            Some(codec) => tracing::trace!(
                encoding = codec.content_encoding(),
                "negotiated response encoding"
            ),
            None => tracing::trace!("no acceptable response encoding"),
        }

        Self {
            inner,
            state: State::Pending(codec),
            min_size,
        }
    }

    /// Creates a writer that passes the body through unchanged.
    pub fn identity(inner: W) -> Self {
        Self {
            inner,
            state: State::Pending(None),
            min_size: 0,
        }
    }

    /// Returns a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Returns a mutable reference to the underlying writer.
    ///
    /// Writing body bytes to it directly corrupts the compressed stream.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Returns the codec in use once the head is committed and compression applies.
    pub fn encoding(&self) -> Option<Codec> {
        match &self.state {
            State::Encoding(encoder) => Some(encoder.codec()),
            _ => None,
        }
    }

    /// Returns whether the writer was closed.
    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// Commits the response head, deciding whether the body gets compressed.
    pub fn write_head(&mut self, status: StatusCode) {
        if let State::Pending(codec) = self.state {
            let min_size = self.min_size;
            let headers = self.inner.headers_mut();

            self.state = match codec.filter(|_| should_compress(status, headers, min_size)) {
                Some(codec) => {
                    let always_flush = wants_always_flush(headers);
                    set_encoding_headers(headers, codec);
                    tracing::trace!(
                        encoding = codec.content_encoding(),
                        always_flush,
                        "compressing response body"
                    );
                    State::Encoding(Encoder::new(codec, always_flush))
                }
                None => {
                    if codec.is_some() {
                        tracing::trace!(%status, "response not compressible, passing through");
                    }
                    State::Identity
                }
            };
        }

        self.inner.write_head(status);
    }

    /// Finishes the compressed stream.
    ///
    /// Commits a `200 OK` head if none was written, so an empty body still
    /// produces a complete stream. The underlying writer is not closed.
    /// Calling this again is a no-op.
    pub fn close(&mut self) -> io::Result<()> {
        if let State::Pending(_) = self.state {
            self.write_head(StatusCode::OK);
        }

        match mem::replace(&mut self.state, State::Closed) {
            State::Encoding(mut encoder) => encoder.finish(&mut self.inner),
            _ => Ok(()),
        }
    }
}

impl<W: ResponseWriter> io::Write for CompressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let State::Pending(_) = self.state {
            self.write_head(StatusCode::OK);
        }

        match &mut self.state {
            State::Encoding(encoder) => {
                encoder.encode(buf, &mut self.inner)?;
                Ok(buf.len())
            }
            State::Identity | State::Pending(_) => self.inner.write(buf),
            State::Closed => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "write on closed compressed stream",
            )),
        }
    }

    /// Emits the encoder's buffered output and flushes the underlying writer.
    fn flush(&mut self) -> io::Result<()> {
        if let State::Encoding(encoder) = &mut self.state {
            encoder.flush(&mut self.inner)?;
        }
        if let Some(flusher) = self.inner.as_flusher() {
            flusher.flush();
        }
        Ok(())
    }
}

impl<W: ResponseWriter> Drop for CompressWriter<W> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl<W: ResponseWriter> std::fmt::Debug for CompressWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            State::Pending(_) => "pending",
            State::Encoding(encoder) => encoder.codec().content_encoding(),
            State::Identity => "identity",
            State::Closed => "closed",
        };
        f.debug_struct("CompressWriter")
            .field("state", &state)
            .field("min_size", &self.min_size)
            .finish_non_exhaustive()
    }
}

fn should_compress(status: StatusCode, headers: &HeaderMap, min_size: usize) -> bool {
    has_body(status)
        && !headers.contains_key(header::CONTENT_ENCODING)
        && !headers.contains_key(header::CONTENT_RANGE)
        && !is_uncompressible_content_type(headers)
        && !is_below_min_size(headers, min_size)
}

/// Informational, `204` and `304` responses carry no body to encode.
fn has_body(status: StatusCode) -> bool {
    !status.is_informational()
        && status != StatusCode::NO_CONTENT
        && status != StatusCode::NOT_MODIFIED
}

fn set_encoding_headers(headers: &mut HeaderMap, codec: Codec) {
    headers.insert(
        header::CONTENT_ENCODING,
        HeaderValue::from_static(codec.content_encoding()),
    );
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::ACCEPT_RANGES);

    let varies = headers
        .get_all(header::VARY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|v| {
            let v = v.trim();
            v == "*" || v.eq_ignore_ascii_case("accept-encoding")
        });
    if !varies {
        headers.append(header::VARY, HeaderValue::from_static("accept-encoding"));
    }
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
}

/// Images other than SVG are already compressed; gRPC frames its own messages.
fn is_uncompressible_content_type(headers: &HeaderMap) -> bool {
    match content_type(headers) {
        Some(ct) if ct.starts_with("image/") => !ct.starts_with("image/svg+xml"),
        Some(ct) if ct.starts_with("application/grpc") => {
            !ct.starts_with("application/grpc-web")
        }
        _ => false,
    }
}

/// Streaming responses must reach the client chunk by chunk.
fn wants_always_flush(headers: &HeaderMap) -> bool {
    let accel_off = headers
        .get("x-accel-buffering")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("no"));

    accel_off
        || content_type(headers).is_some_and(|ct| {
            ct.starts_with("text/event-stream") || ct.starts_with("application/grpc-web")
        })
}

fn is_below_min_size(headers: &HeaderMap, min_size: usize) -> bool {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<usize>().ok())
        .is_some_and(|len| len < min_size)
}
