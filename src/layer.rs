use crate::compress::CompressWriter;
use crate::handler::Handler;
use crate::response::CompressResponseWriter;
use crate::writer::ResponseWriter;
use bytes::Bytes;
use http::Request;
use tower::Layer;

/// Default minimum body size for compression (approximately 1 MTU).
pub const DEFAULT_MIN_SIZE: usize = 860;

/// Wraps `handler` so its responses are compressed with default settings.
pub fn middleware<H: Handler>(handler: H) -> Compress<H> {
    CompressionLayer::new().layer(handler)
}

/// A Tower layer that makes handlers compress their response bodies.
///
/// The encoding is negotiated from each request's `Accept-Encoding` header.
#[derive(Debug, Clone)]
pub struct CompressionLayer {
    min_size: usize,
}

impl CompressionLayer {
    /// Creates a new compression layer with default settings.
    ///
    /// The default minimum size for compression is 860 bytes.
    pub fn new() -> Self {
        Self {
            min_size: DEFAULT_MIN_SIZE,
        }
    }

    /// Sets the minimum body size required for compression.
    ///
    /// Responses with a known Content-Length smaller than this value
    /// will not be compressed.
    pub fn min_size(mut self, size: usize) -> Self {
        self.min_size = size;
        self
    }
}

impl Default for CompressionLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Layer<H> for CompressionLayer {
    type Service = Compress<H>;

    fn layer(&self, inner: H) -> Self::Service {
        Compress {
            inner,
            min_size: self.min_size,
        }
    }
}

/// A [`Handler`] that compresses the responses of the handler it wraps.
#[derive(Debug, Clone)]
pub struct Compress<H> {
    inner: H,
    min_size: usize,
}

impl<H> Compress<H> {
    /// Returns a reference to the inner handler.
    pub fn get_ref(&self) -> &H {
        &self.inner
    }

    /// Returns a mutable reference to the inner handler.
    pub fn get_mut(&mut self) -> &mut H {
        &mut self.inner
    }

    /// Consumes this handler, returning the inner handler.
    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H: Handler> Handler for Compress<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request<Bytes>) {
        // Dropping the wrapper finishes the compressed stream, unwinding included.
        let compressed = CompressWriter::negotiate(w, req, self.min_size);
        let mut writer = CompressResponseWriter::new(compressed);
        self.inner.serve(&mut writer, req);
    }
}
