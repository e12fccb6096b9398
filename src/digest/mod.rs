//! Streaming digest boundary.
//!
//! The engine never looks inside the hash: any streaming 64-bit digest that
//! can be seeded, fed incrementally and finalized is substitutable. The
//! default is XXH64, which is fast enough to keep large-file hashing
//! I/O-bound.

use xxhash_rust::xxh64::Xxh64;

/// One in-flight digest computation.
pub trait StreamingDigest: Send {
    /// Feed the next run of bytes into the digest state.
    fn update(&mut self, bytes: &[u8]);

    /// Consume the state and produce the 64-bit digest.
    fn finalize(&mut self) -> u64;
}

/// Factory for digest states. Shared across worker threads; one state is
/// created per file.
pub trait DigestAlgorithm: Send + Sync {
    /// Start a new digest computation with the given seed.
    fn init(&self, seed: u64) -> Box<dyn StreamingDigest>;

    /// Short algorithm name, recorded in manifest headers.
    fn name(&self) -> &'static str;
}

/// Default algorithm: XXH64.
#[derive(Debug, Default, Clone, Copy)]
pub struct Xxh64Algorithm;

impl DigestAlgorithm for Xxh64Algorithm {
    fn init(&self, seed: u64) -> Box<dyn StreamingDigest> {
        Box::new(Xxh64State(Xxh64::new(seed)))
    }

    fn name(&self) -> &'static str {
        "xxh64"
    }
}

struct Xxh64State(Xxh64);

impl StreamingDigest for Xxh64State {
    fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }

    fn finalize(&mut self) -> u64 {
        self.0.digest()
    }
}
