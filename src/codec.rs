#[cfg(feature = "brotli")]
use compression_codecs::brotli::{BrotliEncoder, params::EncoderParams as BrotliParams};
#[cfg(feature = "deflate")]
use compression_codecs::deflate::DeflateEncoder;
#[cfg(feature = "gzip")]
use compression_codecs::gzip::GzipEncoder;
#[cfg(feature = "zstd")]
use compression_codecs::zstd::ZstdEncoder;
use compression_codecs::EncodeV2;
#[cfg(any(feature = "gzip", feature = "deflate"))]
use compression_core::Level;
use compression_core::util::{PartialBuffer, WriteBuffer};
use std::io;

use crate::writer::ResponseWriter;

const OUTPUT_BUFFER_SIZE: usize = 8 * 1024;

/// Compression codecs enabled in this build, most preferred first.
const PREFERENCE: &[Codec] = &[
    #[cfg(feature = "zstd")]
    Codec::Zstd,
    #[cfg(feature = "brotli")]
    Codec::Brotli,
    #[cfg(feature = "gzip")]
    Codec::Gzip,
    #[cfg(feature = "deflate")]
    Codec::Deflate,
];

/// A response body encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Zstd compression.
    #[cfg(feature = "zstd")]
    Zstd,
    /// Brotli compression.
    #[cfg(feature = "brotli")]
    Brotli,
    /// Gzip compression.
    #[cfg(feature = "gzip")]
    Gzip,
    /// Deflate compression.
    #[cfg(feature = "deflate")]
    Deflate,
}

impl Codec {
    /// Returns the `Content-Encoding` token for this codec.
    pub fn content_encoding(&self) -> &'static str {
        match *self {
            #[cfg(feature = "zstd")]
            Codec::Zstd => "zstd",
            #[cfg(feature = "brotli")]
            Codec::Brotli => "br",
            #[cfg(feature = "gzip")]
            Codec::Gzip => "gzip",
            #[cfg(feature = "deflate")]
            Codec::Deflate => "deflate",
        }
    }

    fn from_token(token: &str) -> Option<Codec> {
        PREFERENCE.iter().copied().find(|codec| {
            token.eq_ignore_ascii_case(codec.content_encoding())
                || codec.alias().is_some_and(|a| token.eq_ignore_ascii_case(a))
        })
    }

    fn alias(&self) -> Option<&'static str> {
        match *self {
            #[cfg(feature = "brotli")]
            Codec::Brotli => Some("brotli"),
            #[cfg(feature = "gzip")]
            Codec::Gzip => Some("x-gzip"),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    fn rank(&self) -> usize {
        PREFERENCE
            .iter()
            .position(|c| c == self)
            .unwrap_or(PREFERENCE.len())
    }

    fn encoder(&self) -> Box<dyn EncodeV2 + Send> {
        match *self {
            #[cfg(feature = "zstd")]
            Codec::Zstd => Box::new(ZstdEncoder::new(3)),
            #[cfg(feature = "brotli")]
            Codec::Brotli => Box::new(BrotliEncoder::new(BrotliParams::default())),
            #[cfg(feature = "gzip")]
            Codec::Gzip => Box::new(GzipEncoder::new(Level::Default.into())),
            #[cfg(feature = "deflate")]
            Codec::Deflate => Box::new(DeflateEncoder::new(Level::Default.into())),
        }
    }

    /// Picks the best codec the client accepts from an `Accept-Encoding` value.
    ///
    /// Entries are comma-separated with optional weights, e.g.
    /// `"gzip, br;q=0.9, *;q=0.1"`. The highest weight wins and ties go to the
    /// stronger codec. `q=0` refuses an encoding, and `*` stands for every
    /// enabled codec the header does not name. Returns `None` when nothing
    /// acceptable remains.
    pub fn from_accept_encoding(header: &str) -> Option<Codec> {
        let mut listed: Vec<(Codec, f32)> = Vec::new();
        let mut wildcard: Option<f32> = None;

        for entry in header.split(',') {
            let (token, quality) = parse_entry(entry);
            if token == "*" {
                wildcard = Some(quality);
            } else if let Some(codec) = Codec::from_token(token) {
                if !listed.iter().any(|(c, _)| *c == codec) {
                    listed.push((codec, quality));
                }
            }
        }

        let unlisted = wildcard.into_iter().flat_map(|q| {
            PREFERENCE
                .iter()
                .filter(|c| !listed.iter().any(|(l, _)| l == *c))
                .map(move |c| (*c, q))
                .collect::<Vec<_>>()
        });

        listed
            .iter()
            .copied()
            .chain(unlisted)
            .filter(|(_, q)| *q > 0.0)
            .fold(None, |best: Option<(Codec, f32)>, (codec, q)| match best {
                Some((b, bq)) if bq > q || (bq == q && b.rank() <= codec.rank()) => best,
                _ => Some((codec, q)),
            })
            .map(|(codec, _)| codec)
    }
}

/// Splits `"br;q=0.8"` into `("br", 0.8)`. A missing or malformed weight is 1.
fn parse_entry(entry: &str) -> (&str, f32) {
    let mut params = entry.split(';');
    let token = params.next().unwrap_or("").trim();

    let quality = params
        .filter_map(|p| {
            let (name, value) = p.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case("q")
                .then(|| value.trim().parse::<f32>().ok())
                .flatten()
        })
        .next()
        .unwrap_or(1.0);

    (token, quality.clamp(0.0, 1.0))
}

/// Streaming encoder that pushes compressed output straight into a writer.
pub(crate) struct Encoder {
    codec: Codec,
    inner: Box<dyn EncodeV2 + Send>,
    output_buffer: Vec<u8>,
    always_flush: bool,
}

impl Encoder {
    pub(crate) fn new(codec: Codec, always_flush: bool) -> Self {
        Self {
            codec,
            inner: codec.encoder(),
            output_buffer: vec![0u8; OUTPUT_BUFFER_SIZE],
            always_flush,
        }
    }

    pub(crate) fn codec(&self) -> Codec {
        self.codec
    }

    #[cfg(test)]
    pub(crate) fn always_flush(&self) -> bool {
        self.always_flush
    }

    /// Compresses all of `input`, writing whatever the codec emits to `out`.
    pub(crate) fn encode<W>(&mut self, input: &[u8], out: &mut W) -> io::Result<()>
    where
        W: ResponseWriter + ?Sized,
    {
        let mut input_buf = PartialBuffer::new(input);

        while input_buf.written_len() < input.len() {
            let consumed = input_buf.written_len();
            let mut output = WriteBuffer::new_initialized(self.output_buffer.as_mut_slice());
            self.inner.encode(&mut input_buf, &mut output)?;

            let written = output.written_len();
            if written > 0 {
                out.write_all(&self.output_buffer[..written])?;
            } else if input_buf.written_len() == consumed {
                return Err(io::Error::other("encoder made no progress"));
            }
        }

        if self.always_flush {
            self.flush(out)?;
        }
        Ok(())
    }

    /// Emits everything the codec has buffered so far.
    pub(crate) fn flush<W>(&mut self, out: &mut W) -> io::Result<()>
    where
        W: ResponseWriter + ?Sized,
    {
        loop {
            let mut output = WriteBuffer::new_initialized(self.output_buffer.as_mut_slice());
            let done = self.inner.flush(&mut output)?;

            let written = output.written_len();
            if written > 0 {
                out.write_all(&self.output_buffer[..written])?;
            }
            if done {
                return Ok(());
            }
        }
    }

    /// Ends the stream, emitting the codec trailer.
    pub(crate) fn finish<W>(&mut self, out: &mut W) -> io::Result<()>
    where
        W: ResponseWriter + ?Sized,
    {
        loop {
            let mut output = WriteBuffer::new_initialized(self.output_buffer.as_mut_slice());
            let done = self.inner.finish(&mut output)?;

            let written = output.written_len();
            if written > 0 {
                out.write_all(&self.output_buffer[..written])?;
            }
            if done {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(all(feature = "zstd", feature = "gzip", feature = "deflate"))]
    fn test_content_encoding() {
        assert_eq!(Codec::Zstd.content_encoding(), "zstd");
        assert_eq!(Codec::Gzip.content_encoding(), "gzip");
        assert_eq!(Codec::Deflate.content_encoding(), "deflate");
    }

    #[test]
    #[cfg(feature = "brotli")]
    fn test_brotli_tokens() {
        assert_eq!(Codec::Brotli.content_encoding(), "br");
        assert_eq!(Codec::from_accept_encoding("br"), Some(Codec::Brotli));
        assert_eq!(Codec::from_accept_encoding("brotli"), Some(Codec::Brotli));
        assert_eq!(Codec::from_accept_encoding("BR;q=0.5"), Some(Codec::Brotli));
    }

    #[test]
    #[cfg(all(feature = "brotli", feature = "gzip", feature = "zstd"))]
    fn test_brotli_preference() {
        assert_eq!(Codec::from_accept_encoding("gzip, br"), Some(Codec::Brotli));
        assert_eq!(Codec::from_accept_encoding("br, zstd"), Some(Codec::Zstd));
        assert_eq!(
            Codec::from_accept_encoding("zstd;q=0.5, br;q=0.8, gzip"),
            Some(Codec::Gzip)
        );
        assert_eq!(
            Codec::from_accept_encoding("zstd;q=0, *"),
            Some(Codec::Brotli)
        );
    }

    #[test]
    #[cfg(feature = "gzip")]
    fn test_from_accept_encoding_aliases_and_case() {
        assert_eq!(Codec::from_accept_encoding("x-gzip"), Some(Codec::Gzip));
        assert_eq!(Codec::from_accept_encoding("GZIP"), Some(Codec::Gzip));
        assert_eq!(Codec::from_accept_encoding("  gzip  "), Some(Codec::Gzip));
    }

    #[test]
    #[cfg(all(feature = "zstd", feature = "gzip", feature = "deflate"))]
    fn test_from_accept_encoding_prefers_stronger_on_tie() {
        assert_eq!(
            Codec::from_accept_encoding("deflate, gzip, zstd"),
            Some(Codec::Zstd)
        );
        assert_eq!(
            Codec::from_accept_encoding("deflate, gzip"),
            Some(Codec::Gzip)
        );
    }

    #[test]
    #[cfg(all(feature = "zstd", feature = "gzip"))]
    fn test_from_accept_encoding_weights() {
        assert_eq!(
            Codec::from_accept_encoding("gzip;q=1.0, zstd;q=0.5"),
            Some(Codec::Gzip)
        );
        assert_eq!(
            Codec::from_accept_encoding("gzip; Q=0.4, zstd ; q = 0.6"),
            Some(Codec::Zstd)
        );
    }

    #[test]
    #[cfg(feature = "gzip")]
    fn test_from_accept_encoding_refused() {
        assert_eq!(Codec::from_accept_encoding("gzip;q=0"), None);
        assert_eq!(Codec::from_accept_encoding("identity"), None);
        assert_eq!(Codec::from_accept_encoding("compress, identity;q=0.5"), None);
        assert_eq!(Codec::from_accept_encoding(""), None);
    }

    #[test]
    #[cfg(all(feature = "zstd", feature = "gzip"))]
    fn test_from_accept_encoding_wildcard() {
        assert_eq!(Codec::from_accept_encoding("*"), Some(Codec::Zstd));
        // Named refusals are not revived by the wildcard.
        assert_eq!(
            Codec::from_accept_encoding("zstd;q=0, *"),
            PREFERENCE.iter().copied().find(|c| *c != Codec::Zstd)
        );
        assert_eq!(
            Codec::from_accept_encoding("gzip, *;q=0.5"),
            Some(Codec::Gzip)
        );
        assert_eq!(Codec::from_accept_encoding("*;q=0"), None);
    }

    #[test]
    fn test_parse_entry() {
        assert_eq!(parse_entry("br;q=0.8"), ("br", 0.8));
        assert_eq!(parse_entry("gzip"), ("gzip", 1.0));
        assert_eq!(parse_entry("gzip;level=1;q=0.2"), ("gzip", 0.2));
        assert_eq!(parse_entry("gzip;q=abc"), ("gzip", 1.0));
        assert_eq!(parse_entry("gzip;q=7"), ("gzip", 1.0));
    }
}
