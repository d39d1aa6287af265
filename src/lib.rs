//! Response compression middleware for writer-style HTTP handlers.
//!
//! Handlers write their response to a [`ResponseWriter`]. The middleware
//! swaps that writer for a [`CompressResponseWriter`] which sends body bytes
//! through a streaming encoder chosen from the request's `Accept-Encoding`
//! header, while flush, hijack, push and close still reach the original
//! writer.
//!
//! # Example
//!
//! ```ignore
//! use http_compress_writer::{handler_fn, middleware, ResponseWriter};
//!
//! let handler = middleware(handler_fn(|w: &mut dyn ResponseWriter, _req| {
//!     w.write_all(b"hello world").unwrap();
//! }));
//! ```
//!
//! With Tower, [`CompressionLayer`] does the same and [`HandlerService`] turns
//! any handler into a `tower::Service`:
//!
//! ```ignore
//! use http_compress_writer::{CompressionLayer, HandlerService};
//! use tower::ServiceBuilder;
//!
//! let service = HandlerService::new(
//!     ServiceBuilder::new()
//!         .layer(CompressionLayer::new())
//!         .service(my_handler),
//! );
//! ```
//!
//! # Capabilities
//!
//! Optional writer behavior is discovered at runtime through
//! [`ResponseWriter::as_flusher`], [`as_hijacker`](ResponseWriter::as_hijacker),
//! [`as_pusher`](ResponseWriter::as_pusher) and
//! [`as_closer`](ResponseWriter::as_closer). The compressing wrapper always
//! offers all four and returns [`Error::Unsupported`] when the original writer
//! lacks one. Flushing a writer without flush support does nothing.
//!
//! # Compression Rules
//!
//! The body is passed through unchanged when:
//! - No supported `Accept-Encoding` is present in the request
//! - The status is informational, `204 No Content` or `304 Not Modified`
//! - `Content-Encoding` header is already set
//! - `Content-Range` header is present (range responses)
//! - `Content-Type` starts with `image/` (except `image/svg+xml`)
//! - `Content-Type` starts with `application/grpc` (except `application/grpc-web`)
//! - `Content-Length` is below the minimum size threshold (default: 860 bytes)
//!
//! These are checked when the head is written, so handlers decide with their
//! own headers. The encoder is flushed after every write when
//! `X-Accel-Buffering: no` is set or the content type is `text/event-stream`
//! or `application/grpc-web`.
//!
//! When compression is applied `Content-Encoding` is set, `Content-Length`
//! and `Accept-Ranges` are removed, and `Vary` includes `Accept-Encoding`.

#![deny(missing_docs)]

mod codec;
mod compress;
mod error;
mod handler;
mod layer;
mod recorder;
mod response;
mod service;
mod writer;

pub use codec::Codec;
pub use compress::CompressWriter;
pub use error::{Capability, Error, Result};
pub use handler::{Handler, HandlerFn, handler_fn};
pub use layer::{Compress, CompressionLayer, DEFAULT_MIN_SIZE, middleware};
pub use recorder::ResponseRecorder;
pub use response::CompressResponseWriter;
pub use service::HandlerService;
pub use writer::{
    Capabilities, Closer, Connection, Flusher, Hijacked, Hijacker, PushOptions, Pusher,
    ResponseWriter,
};
