use crate::writer::ResponseWriter;
use bytes::Bytes;
use http::Request;
use std::fmt;

/// Produces a response by writing it to a [`ResponseWriter`].
pub trait Handler {
    /// Handles `req`, writing the response to `w`.
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request<Bytes>);
}

impl<H: Handler + ?Sized> Handler for &H {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request<Bytes>) {
        (**self).serve(w, req)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request<Bytes>) {
        (**self).serve(w, req)
    }
}

impl<H: Handler + ?Sized> Handler for std::sync::Arc<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request<Bytes>) {
        (**self).serve(w, req)
    }
}

/// Returns a [`Handler`] that calls `f`.
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request<Bytes>),
{
    HandlerFn { f }
}

/// A [`Handler`] built from a closure with [`handler_fn`].
#[derive(Clone, Copy)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request<Bytes>),
{
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request<Bytes>) {
        (self.f)(w, req)
    }
}

impl<F> fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn")
            .field("f", &std::any::type_name::<F>())
            .finish()
    }
}
