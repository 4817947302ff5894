//! Streaming content hashing.
//!
//! Hashes are rendered as `blake3-<base64>`: a fixed ASCII algorithm prefix
//! followed by the standard base64 encoding of the raw digest. The rendered
//! string is the value type of both hash caches and the unit of every
//! equality comparison in the transfer logic.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::io::{self, Read, Write};

/// Algorithm prefix carried by every rendered hash.
pub const HASH_ALGORITHM: &str = "blake3";

const CHUNK_SIZE: usize = 64 * 1024;

/// Render a raw digest in the canonical `<algo>-<base64>` form.
pub fn format_digest(digest: &[u8; 32]) -> String {
    format!("{}-{}", HASH_ALGORITHM, BASE64.encode(digest))
}

/// Single-pass streaming hasher over a byte stream.
#[derive(Default)]
pub struct ContentHasher {
    inner: blake3::Hasher,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    pub fn finalize(self) -> String {
        format_digest(self.inner.finalize().as_bytes())
    }
}

/// Hash an entire reader in fixed-size chunks.
pub fn hash_reader<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut hasher = ContentHasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

/// Pass-through writer that hashes everything written to the wrapped sink.
///
/// Used to learn the content hash of a download while it streams into a
/// tentative destination (or into `io::sink()` for hash-only downloads).
pub struct HashingWriter<W> {
    inner: W,
    hasher: blake3::Hasher,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: blake3::Hasher::new(),
        }
    }

    /// Consume the writer, returning the wrapped sink and the rendered hash.
    pub fn finalize(self) -> (W, String) {
        let hash = format_digest(self.hasher.finalize().as_bytes());
        (self.inner, hash)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
