//! The response emitter: turns (status, headers, body source) plus the
//! request context into exactly one correctly-framed response.

use bytes::Bytes;
use httpdate::fmt_http_date;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::body::{Body, Chunk, Next};
use crate::config::{Config, SendfileMode};
use crate::error::EngineError;
use crate::http::{HeaderMap, Method, Status};
use crate::range::ByteRange;

/// Anything the emitter can write framed response bytes to. A real
/// transport implements this directly against its connection; tests use an
/// in-memory `Vec<u8>`.
#[async_trait::async_trait]
pub trait Transport: Send {
    async fn write_status_and_headers(&mut self, status: Status, headers: &HeaderMap) -> std::io::Result<()>;
    async fn write_chunk(&mut self, data: &[u8], fin: bool) -> std::io::Result<()>;
}

/// One fully-resolved response: everything the decision engine produced,
/// ready for the emitter.
pub struct Response {
    pub status: Status,
    pub headers: HeaderMap,
    pub body: Option<Body>,
}

/// Emits `response` to `transport` for a request of `method`, optionally
/// slicing `body` per `ranges` (already normalized against the body's
/// known length) and `content_type` for multipart preambles.
pub async fn emit(
    mut response: Response,
    method: &Method,
    ranges: &[ByteRange],
    config: &Config,
    transport: &mut dyn Transport,
) -> Result<(), EngineError> {
    add_default_headers(&mut response.headers, config);

    if response.status == Status::NOT_MODIFIED {
        response.headers.remove("content-length");
        response.headers.remove("content-type");
        response.body = None;
    }

    let is_head = *method == Method::HEAD;

    let body = match response.body.take() {
        Some(b) => b,
        None => {
            transport.write_status_and_headers(response.status, &response.headers).await?;
            transport.write_chunk(&[], true).await?;
            return Ok(());
        }
    };

    if is_head {
        transport.write_status_and_headers(response.status, &response.headers).await?;
        transport.write_chunk(&[], true).await?;
        return Ok(());
    }

    match body {
        Body::Bytes(bytes) => emit_bytes(response.status, response.headers, bytes, transport).await,
        Body::FilePath(path) => {
            let mut file = tokio::fs::File::open(&path).await?;
            emit_file(response.status, response.headers, &mut file, ranges, config, transport).await
        }
        Body::FileHandle(mut file) => {
            emit_file(response.status, response.headers, &mut file, ranges, config, transport).await
        }
        Body::Stream(stream) => emit_stream(response.status, response.headers, stream, transport).await,
        Body::Writer(writer) => emit_writer(response.status, response.headers, writer, transport).await,
        Body::SizedStream(total, producer) => {
            emit_sized_stream(response.status, response.headers, total, producer, ranges, transport).await
        }
    }
}

fn add_default_headers(headers: &mut HeaderMap, config: &Config) {
    if !headers.contains("server") {
        headers.set("Server", &config.server_header);
    }
    if !headers.contains("date") {
        headers.set("Date", fmt_http_date(std::time::SystemTime::now()));
    }
}

async fn emit_bytes(
    status: Status,
    mut headers: HeaderMap,
    bytes: Bytes,
    transport: &mut dyn Transport,
) -> Result<(), EngineError> {
    headers.set("Content-Length", bytes.len().to_string());
    transport.write_status_and_headers(status, &headers).await?;
    if !bytes.is_empty() {
        transport.write_chunk(&bytes, false).await?;
    }
    transport.write_chunk(&[], true).await?;
    Ok(())
}

async fn emit_file(
    status: Status,
    mut headers: HeaderMap,
    file: &mut tokio::fs::File,
    ranges: &[ByteRange],
    config: &Config,
    transport: &mut dyn Transport,
) -> Result<(), EngineError> {
    let total_len = file.metadata().await?.len();

    match ranges.len() {
        0 => {
            headers.set("Content-Length", total_len.to_string());
            write_file_body(headers, status, file, 0, total_len, config, transport).await
        }
        1 => {
            let r = ranges[0];
            headers.set("Content-Length", r.length.to_string());
            headers.set("Content-Range", format!("bytes {}-{}/{}", r.offset, r.end_inclusive(), total_len));
            write_file_body(headers, status, file, r.offset, r.length, config, transport).await
        }
        _ => emit_multipart_file(status, headers, file, ranges, total_len, transport).await,
    }
}

async fn write_file_body(
    headers: HeaderMap,
    status: Status,
    file: &mut tokio::fs::File,
    offset: u64,
    length: u64,
    config: &Config,
    transport: &mut dyn Transport,
) -> Result<(), EngineError> {
    transport.write_status_and_headers(status, &headers).await?;

    if config.use_sendfile == SendfileMode::Disabled {
        tracing::trace!("sendfile disabled; falling back to chunked reads");
    }

    file.seek(std::io::SeekFrom::Start(offset)).await?;
    let mut remaining = length;
    let mut buf = vec![0u8; config.file_chunk_size.max(1)];
    while remaining > 0 {
        let to_read = remaining.min(buf.len() as u64) as usize;
        let n = file.read(&mut buf[..to_read]).await?;
        if n == 0 {
            break;
        }
        remaining -= n as u64;
        transport.write_chunk(&buf[..n], remaining == 0).await?;
    }
    if length == 0 {
        transport.write_chunk(&[], true).await?;
    }
    Ok(())
}

async fn emit_multipart_file(
    status: Status,
    mut headers: HeaderMap,
    file: &mut tokio::fs::File,
    ranges: &[ByteRange],
    total_len: u64,
    transport: &mut dyn Transport,
) -> Result<(), EngineError> {
    let content_type = headers.get_one("content-type").unwrap_or("application/octet-stream").to_string();
    let boundary = crate::range::generate_boundary();
    headers.set("Content-Type", format!("multipart/byteranges; boundary={boundary}"));
    let content_length = crate::range::multipart_content_length(&boundary, &content_type, ranges, total_len);
    headers.set("Content-Length", content_length.to_string());

    transport.write_status_and_headers(status, &headers).await?;

    for r in ranges {
        let preamble = crate::range::part_preamble(&boundary, &content_type, *r, total_len);
        transport.write_chunk(preamble.as_bytes(), false).await?;

        file.seek(std::io::SeekFrom::Start(r.offset)).await?;
        let mut remaining = r.length;
        let mut buf = vec![0u8; 65_536];
        while remaining > 0 {
            let to_read = remaining.min(buf.len() as u64) as usize;
            let n = file.read(&mut buf[..to_read]).await?;
            if n == 0 {
                break;
            }
            remaining -= n as u64;
            transport.write_chunk(&buf[..n], false).await?;
        }
        transport.write_chunk(b"\r\n", false).await?;
    }

    let closing = crate::range::closing_boundary(&boundary);
    transport.write_chunk(closing.as_bytes(), true).await?;
    Ok(())
}

async fn emit_stream(
    status: Status,
    headers: HeaderMap,
    mut stream: Box<dyn crate::body::Stream>,
    transport: &mut dyn Transport,
) -> Result<(), EngineError> {
    transport.write_status_and_headers(status, &headers).await?;

    loop {
        match stream.poll_next() {
            Next::Done => {
                transport.write_chunk(&[], true).await?;
                break;
            }
            Next::Chunk(Chunk::Data(data)) => {
                if data.is_empty() {
                    continue; // empty-chunk suppression
                }
                transport.write_chunk(&data, false).await?;
            }
            Next::Chunk(Chunk::ChunkFile(path, offset, length)) => {
                let mut file = tokio::fs::File::open(&path).await?;
                file.seek(std::io::SeekFrom::Start(offset)).await?;
                let mut remaining = length;
                let mut buf = vec![0u8; 65_536];
                while remaining > 0 {
                    let to_read = remaining.min(buf.len() as u64) as usize;
                    let n = file.read(&mut buf[..to_read]).await?;
                    if n == 0 {
                        break;
                    }
                    remaining -= n as u64;
                    transport.write_chunk(&buf[..n], false).await?;
                }
            }
        }
    }
    Ok(())
}

struct TransportSink<'a> {
    transport: &'a mut dyn Transport,
}

#[async_trait::async_trait]
impl<'a> crate::body::Sink for TransportSink<'a> {
    async fn send(&mut self, chunk: Bytes) -> std::io::Result<()> {
        if !chunk.is_empty() {
            self.transport.write_chunk(&chunk, false).await?;
        }
        Ok(())
    }
}

async fn emit_writer(
    status: Status,
    headers: HeaderMap,
    mut writer: Box<dyn crate::body::Writer>,
    transport: &mut dyn Transport,
) -> Result<(), EngineError> {
    transport.write_status_and_headers(status, &headers).await?;
    {
        let mut sink = TransportSink { transport };
        writer.write(&mut sink).await?;
    }
    transport.write_chunk(&[], true).await?;
    Ok(())
}

async fn emit_sized_stream(
    status: Status,
    mut headers: HeaderMap,
    total: u64,
    producer: crate::body::RangeProducer,
    ranges: &[ByteRange],
    transport: &mut dyn Transport,
) -> Result<(), EngineError> {
    let effective_ranges: Vec<ByteRange> =
        if ranges.is_empty() { vec![ByteRange { offset: 0, length: total }] } else { ranges.to_vec() };

    if effective_ranges.len() == 1 {
        let r = effective_ranges[0];
        if r.offset != 0 || r.length != total {
            headers.set("Content-Range", format!("bytes {}-{}/{}", r.offset, r.end_inclusive(), total));
        }
    }

    transport.write_status_and_headers(status, &headers).await?;

    for r in &effective_ranges {
        let mut stream = producer(r.offset, r.offset + r.length);
        loop {
            match stream.poll_next() {
                Next::Done => break,
                Next::Chunk(Chunk::Data(data)) => {
                    if !data.is_empty() {
                        transport.write_chunk(&data, false).await?;
                    }
                }
                Next::Chunk(Chunk::ChunkFile(path, offset, length)) => {
                    let mut file = tokio::fs::File::open(&path).await?;
                    file.seek(std::io::SeekFrom::Start(offset)).await?;
                    let mut remaining = length;
                    let mut buf = vec![0u8; 65_536];
                    while remaining > 0 {
                        let to_read = remaining.min(buf.len() as u64) as usize;
                        let n = file.read(&mut buf[..to_read]).await?;
                        if n == 0 {
                            break;
                        }
                        remaining -= n as u64;
                        transport.write_chunk(&buf[..n], false).await?;
                    }
                }
            }
        }
    }

    transport.write_chunk(&[], true).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingTransport {
        status: Option<Status>,
        headers: HeaderMap,
        data: Vec<u8>,
        fin_count: usize,
    }

    impl RecordingTransport {
        fn new() -> Self {
            RecordingTransport { status: None, headers: HeaderMap::new(), data: Vec::new(), fin_count: 0 }
        }
    }

    #[async_trait::async_trait]
    impl Transport for RecordingTransport {
        async fn write_status_and_headers(&mut self, status: Status, headers: &HeaderMap) -> std::io::Result<()> {
            self.status = Some(status);
            self.headers = headers.clone();
            Ok(())
        }

        async fn write_chunk(&mut self, data: &[u8], fin: bool) -> std::io::Result<()> {
            self.data.extend_from_slice(data);
            if fin {
                self.fin_count += 1;
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn simple_get_emits_bytes_with_content_length() {
        let mut headers = HeaderMap::new();
        headers.set("Content-Type", "text/html");
        let response = Response { status: Status::OK, headers, body: Some(Body::from_static(b"hi")) };

        let mut transport = RecordingTransport::new();
        let config = Config::default();
        emit(response, &Method::GET, &[], &config, &mut transport).await.unwrap();

        assert_eq!(transport.status, Some(Status::OK));
        assert_eq!(transport.headers.get_one("content-length"), Some("2"));
        assert_eq!(transport.data, b"hi");
        assert_eq!(transport.fin_count, 1);
    }

    #[tokio::test]
    async fn head_request_suppresses_body() {
        let response = Response { status: Status::OK, headers: HeaderMap::new(), body: Some(Body::from_static(b"hi")) };
        let mut transport = RecordingTransport::new();
        let config = Config::default();
        emit(response, &Method::HEAD, &[], &config, &mut transport).await.unwrap();
        assert!(transport.data.is_empty());
    }

    #[tokio::test]
    async fn not_modified_drops_content_length_and_type() {
        let mut headers = HeaderMap::new();
        headers.set("Content-Type", "text/html");
        headers.set("Content-Length", "100");
        headers.set("ETag", "\"v1\"");
        let response = Response { status: Status::NOT_MODIFIED, headers, body: Some(Body::from_static(b"hi")) };

        let mut transport = RecordingTransport::new();
        let config = Config::default();
        emit(response, &Method::GET, &[], &config, &mut transport).await.unwrap();

        assert!(transport.headers.get_one("content-length").is_none());
        assert!(transport.headers.get_one("content-type").is_none());
        assert_eq!(transport.headers.get_one("etag"), Some("\"v1\""));
    }
}
