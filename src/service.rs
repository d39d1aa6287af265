use crate::handler::Handler;
use crate::recorder::ResponseRecorder;
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use std::convert::Infallible;
use std::future::{Ready, ready};
use std::task::{Context, Poll};
use tower::Service;

/// A Tower service that runs a [`Handler`] against an in-memory writer.
///
/// The handler writes into a [`ResponseRecorder`] and the service resolves to
/// the recorded response once the handler returns. Capabilities the recorder
/// lacks, such as hijacking, are reported as unsupported to the handler.
#[derive(Debug, Clone)]
pub struct HandlerService<H> {
    handler: H,
}

impl<H> HandlerService<H> {
    /// Creates a new service running the given handler.
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    /// Returns a reference to the handler.
    pub fn get_ref(&self) -> &H {
        &self.handler
    }

    /// Consumes this service, returning the handler.
    pub fn into_inner(self) -> H {
        self.handler
    }
}

impl<H: Handler> Service<Request<Bytes>> for HandlerService<H> {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Bytes>) -> Self::Future {
        let mut recorder = ResponseRecorder::new();
        self.handler.serve(&mut recorder, &req);
        ready(Ok(recorder.into_response()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::layer::CompressionLayer;
    use crate::writer::ResponseWriter;
    use http::{StatusCode, header};
    use http_body::Body;
    use std::future::Future;
    use std::io::Read;
    use std::pin::Pin;
    use tower::{ServiceBuilder, ServiceExt};

    fn block_on<F: Future>(fut: F) -> F::Output {
        let waker = std::task::Waker::noop();
        let mut cx = Context::from_waker(waker);
        let mut fut = std::pin::pin!(fut);
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(output) => output,
            Poll::Pending => panic!("service future was not ready"),
        }
    }

    fn body_bytes(mut body: Full<Bytes>) -> Vec<u8> {
        let waker = std::task::Waker::noop();
        let mut cx = Context::from_waker(waker);
        let mut out = Vec::new();
        while let Poll::Ready(Some(frame)) = Pin::new(&mut body).poll_frame(&mut cx) {
            if let Ok(data) = frame.unwrap().into_data() {
                out.extend_from_slice(&data);
            }
        }
        out
    }

    fn greeting(w: &mut dyn ResponseWriter, req: &Request<Bytes>) {
        w.headers_mut()
            .insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());
        w.write_head(StatusCode::CREATED);
        w.write_all(b"hello ").unwrap();
        w.write_all(req.body()).unwrap();
    }

    fn request(accept_encoding: Option<&str>) -> Request<Bytes> {
        let mut builder = Request::builder().uri("/greet");
        if let Some(value) = accept_encoding {
            builder = builder.header(header::ACCEPT_ENCODING, value);
        }
        builder.body(Bytes::from_static(b"world")).unwrap()
    }

    #[test]
    fn test_plain_handler() {
        let svc = HandlerService::new(handler_fn(greeting));
        let response = block_on(svc.oneshot(request(Some("gzip")))).unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
        assert_eq!(body_bytes(response.into_body()), b"hello world");
    }

    #[test]
    #[cfg(feature = "gzip")]
    fn test_compressed_handler() {
        let svc = HandlerService::new(
            ServiceBuilder::new()
                .layer(CompressionLayer::new().min_size(0))
                .service(handler_fn(greeting)),
        );
        let response = block_on(svc.oneshot(request(Some("gzip")))).unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(header::CONTENT_ENCODING).unwrap(),
            "gzip"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );

        let mut decoded = String::new();
        flate2::read::GzDecoder::new(&body_bytes(response.into_body())[..])
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "hello world");
    }

    #[test]
    fn test_compressed_handler_without_accept_encoding() {
        let svc = HandlerService::new(crate::middleware(handler_fn(greeting)));
        let response = block_on(svc.oneshot(request(None))).unwrap();

        assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
        assert_eq!(body_bytes(response.into_body()), b"hello world");
    }
}
