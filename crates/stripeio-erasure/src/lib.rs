//! StripeIO Erasure Coding - Cauchy Reed-Solomon over GF(2^8)
//!
//! This crate implements a systematic Cauchy Reed-Solomon codec: `k` data
//! parts are encoded into `m` code (parity) parts, and any up-to-`m` missing
//! parts can be reconstructed from the survivors.
//!
//! The codec converts all finite-field multiplication into XOR at setup time:
//!
//! - an `m x k` Cauchy coding matrix is built over GF(2^8) and sparsified to
//!   minimize its bit weight,
//! - the matrix is expanded into a binary bit matrix where each field element
//!   becomes an 8x8 block,
//! - the bit matrix is reduced to a *schedule*, an ordered list of COPY/XOR
//!   operations with common subexpressions reused across output rows.
//!
//! Encoding and decoding then execute a schedule over the part buffers in
//! 32 KiB stripes, touching memory only with packet-sized copies and
//! 64-bit-wide XOR. Decoding inverts the surviving rows of the coding matrix
//! over GF(2) per call; the codec itself retains only the immutable encoding
//! state and is safe to share across threads.
//!
//! # Example
//!
//! ```
//! use stripeio_common::ErasureConfig;
//! use stripeio_erasure::{CauchyCodec, STRIPE_SIZE};
//!
//! let codec = CauchyCodec::new(ErasureConfig::new(4, 2)).unwrap();
//!
//! let data: Vec<Vec<u8>> = (0..4).map(|i| vec![i as u8; STRIPE_SIZE]).collect();
//! let mut code: Vec<Vec<u8>> = vec![vec![0u8; STRIPE_SIZE]; 2];
//!
//! let data_refs: Vec<&[u8]> = data.iter().map(|p| p.as_slice()).collect();
//! let mut code_refs: Vec<&mut [u8]> = code.iter_mut().map(|p| p.as_mut_slice()).collect();
//! codec.encode(&data_refs, &mut code_refs).unwrap();
//! ```

pub mod codec;
mod gf256;
mod matrix;
mod schedule;

pub use codec::{CauchyCodec, CodecError};

/// Granularity of a single schedule operation, in bytes.
pub const PACKET_SIZE: usize = 4096;

/// Field width in bits; also the number of sub-packets per part.
pub const WORD_BITS: usize = 8;

/// One round of schedule execution covers this many bytes of every part.
/// Buffer sizes must be positive multiples of this.
pub const STRIPE_SIZE: usize = PACKET_SIZE * WORD_BITS;

/// Prelude for common imports
pub mod prelude {
    pub use super::{CauchyCodec, CodecError, PACKET_SIZE, STRIPE_SIZE, WORD_BITS};
    pub use stripeio_common::ErasureConfig;
}
