//! The response body-source abstraction: exactly six named variants, one
//! tagged sum the emitter switches on exhaustively, replacing the source
//! system's variable-arity tagged tuples.

use std::path::PathBuf;
use std::pin::Pin;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::AsyncRead;

/// One pull from a [`Body::Stream`] or the producer of a
/// [`Body::SizedStream`].
pub enum Chunk {
    /// A chunk of in-memory bytes.
    Data(Bytes),
    /// A chunk that is itself a slice of a file, spliced directly into the
    /// chunked output without the caller reading it into memory first.
    ChunkFile(PathBuf, u64, u64),
}

/// The result of pulling the next element from a stream body.
pub enum Next {
    Chunk(Chunk),
    Done,
}

/// A lazy source of [`Next`] elements. Implemented by controllers that
/// generate a body incrementally rather than producing it all at once.
pub trait Stream: Send {
    fn poll_next(&mut self) -> Next;
}

/// A callback-driven body: given a sink, the callback pushes chunks itself
/// and signals completion by returning.
#[async_trait::async_trait]
pub trait Writer: Send {
    async fn write(&mut self, sink: &mut (dyn Sink + Send)) -> std::io::Result<()>;
}

/// The sink a [`Writer`] pushes chunks into.
#[async_trait::async_trait]
pub trait Sink {
    async fn send(&mut self, chunk: Bytes) -> std::io::Result<()>;
}

/// A producer of a [`Box<dyn Stream>`] for an explicit `(from, to)` byte
/// range, used by [`Body::SizedStream`] when the total length is known up
/// front (e.g. range requests against a generated body).
pub type RangeProducer = Box<dyn Fn(u64, u64) -> Box<dyn Stream> + Send + Sync>;

/// Where response bytes come from, and how the emitter should stream them.
pub enum Body {
    /// An owned in-memory byte sequence.
    Bytes(Bytes),
    /// A filesystem path; length is discovered lazily by the emitter.
    FilePath(PathBuf),
    /// An already-open seekable file; length is discovered lazily.
    FileHandle(File),
    /// A lazy generator producing chunks on demand.
    Stream(Box<dyn Stream>),
    /// A callback that drives emission itself via a sink.
    Writer(Box<dyn Writer>),
    /// `(total_size, producer)`; the producer is invoked once per surviving
    /// range with the concrete `(from, to)` byte offsets.
    SizedStream(u64, RangeProducer),
}

impl Body {
    pub fn from_static(bytes: &'static [u8]) -> Self {
        Body::Bytes(Bytes::from_static(bytes))
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(bytes))
    }

    pub fn path(p: impl Into<PathBuf>) -> Self {
        Body::FilePath(p.into())
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Body::FilePath(p) => f.debug_tuple("FilePath").field(p).finish(),
            Body::FileHandle(_) => f.write_str("FileHandle(..)"),
            Body::Stream(_) => f.write_str("Stream(..)"),
            Body::Writer(_) => f.write_str("Writer(..)"),
            Body::SizedStream(n, _) => f.debug_tuple("SizedStream").field(n).finish(),
        }
    }
}

/// A boxed async reader, the shape the emitter ultimately reduces every
/// body variant to when it is not eligible for `sendfile`.
pub type BoxAsyncRead = Pin<Box<dyn AsyncRead + Send>>;
