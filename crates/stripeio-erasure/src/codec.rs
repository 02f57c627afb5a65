//! Cauchy Reed-Solomon encoder/decoder
//!
//! `CauchyCodec` holds the immutable encoding state (bit matrix + schedule)
//! for a fixed `k + m` layout and transforms caller-owned part buffers in
//! place. Encoding runs the retained schedule; decoding assembles a
//! per-call bit matrix from the surviving parts, inverts it over GF(2),
//! compiles a fresh schedule, and runs that. The codec performs no I/O and
//! retains nothing across calls, so one instance may be shared freely
//! between threads operating on disjoint buffer sets.
//!
//! # Example
//!
//! ```
//! use stripeio_common::ErasureConfig;
//! use stripeio_erasure::{CauchyCodec, STRIPE_SIZE};
//!
//! let codec = CauchyCodec::new(ErasureConfig::EC_4_2).unwrap();
//! let data: Vec<Vec<u8>> = (0..4).map(|i| vec![i as u8; STRIPE_SIZE]).collect();
//! let mut code = vec![vec![0u8; STRIPE_SIZE]; 2];
//!
//! let data_refs: Vec<&[u8]> = data.iter().map(|p| p.as_slice()).collect();
//! let mut code_refs: Vec<&mut [u8]> = code.iter_mut().map(|p| p.as_mut_slice()).collect();
//! codec.encode(&data_refs, &mut code_refs).unwrap();
//! ```

use crate::gf256::GfTables;
use crate::matrix::{BitMatrix, MatrixBuilder};
use crate::schedule::{build_schedule, Op, OpKind};
use crate::{PACKET_SIZE, STRIPE_SIZE, WORD_BITS};
use std::ptr;
use stripeio_common::{Error as CommonError, ErasureConfig};
use thiserror::Error;
use tracing::debug;

/// Errors specific to erasure coding operations
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid buffers: {0}")]
    InvalidBuffers(String),

    #[error("insufficient parts: have {available}, need {required}")]
    InsufficientParts { available: usize, required: usize },

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CodecError> for CommonError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::InsufficientParts {
                available,
                required,
            } => Self::InsufficientParts {
                available,
                required,
            },
            CodecError::InvalidConfig(msg) | CodecError::InvalidBuffers(msg) => {
                Self::InvalidArgument(msg)
            }
            CodecError::Internal(msg) => Self::ErasureCoding(msg),
        }
    }
}

/// Systematic Cauchy Reed-Solomon codec over GF(2^8)
///
/// Construction cost is dominated by building the field tables and the
/// encoding schedule; both are reused by every `encode` call. `decode`
/// builds its matrix and schedule per call and releases them before
/// returning.
#[derive(Debug)]
pub struct CauchyCodec {
    config: ErasureConfig,
    data_parts: usize,
    code_parts: usize,
    encoding_bits: BitMatrix,
    encoding_schedule: Vec<Op>,
}

impl CauchyCodec {
    /// Create a codec for `config.data_parts` + `config.code_parts`.
    ///
    /// # Errors
    /// Returns `CodecError::InvalidConfig` if either count is zero or the
    /// total exceeds 256 (the Cauchy construction indexes field elements
    /// `i XOR (m + j)`, which must stay within GF(2^8)).
    pub fn new(config: ErasureConfig) -> Result<Self, CodecError> {
        config.validate().map_err(|e| match e {
            CommonError::InvalidArgument(msg) => CodecError::InvalidConfig(msg),
            other => CodecError::InvalidConfig(other.to_string()),
        })?;
        let data_parts = usize::from(config.data_parts);
        let code_parts = usize::from(config.code_parts);
        if data_parts + code_parts > 256 {
            return Err(CodecError::InvalidConfig(
                "data_parts + code_parts must be <= 256".into(),
            ));
        }

        let field = GfTables::new();
        let encoding_bits = MatrixBuilder::new(&field).encoding_bit_matrix(data_parts, code_parts);
        let encoding_schedule = build_schedule(data_parts, code_parts, &encoding_bits);
        debug!(
            data_parts,
            code_parts,
            ops = encoding_schedule.len(),
            "built encoding schedule"
        );

        Ok(Self {
            config,
            data_parts,
            code_parts,
            encoding_bits,
            encoding_schedule,
        })
    }

    /// Get the configuration
    #[must_use]
    pub const fn config(&self) -> ErasureConfig {
        self.config
    }

    /// Get the number of data parts (k)
    #[must_use]
    pub fn data_parts(&self) -> usize {
        self.data_parts
    }

    /// Get the number of code parts (m)
    #[must_use]
    pub fn code_parts(&self) -> usize {
        self.code_parts
    }

    /// Get the total number of parts (k + m)
    #[must_use]
    pub fn total_parts(&self) -> usize {
        self.data_parts + self.code_parts
    }

    /// Compute the `m` code parts from the `k` data parts, in place.
    ///
    /// All parts must share one size, a positive multiple of
    /// [`STRIPE_SIZE`](crate::STRIPE_SIZE). Only the code buffers are
    /// written.
    ///
    /// # Errors
    /// Returns `CodecError::InvalidBuffers` on wrong part counts or sizes.
    pub fn encode(&self, data: &[&[u8]], code: &mut [&mut [u8]]) -> Result<(), CodecError> {
        let size = self.checked_part_size(
            data.iter().map(|p| p.len()),
            code.iter().map(|p| p.len()),
        )?;

        let mut ptrs: Vec<*mut u8> = Vec::with_capacity(self.total_parts());
        // Data parts are sources only; the encoding schedule never writes a
        // destination below `data_parts`, so the cast is not observable.
        for part in data {
            ptrs.push(part.as_ptr() as *mut u8);
        }
        for part in code.iter_mut() {
            ptrs.push(part.as_mut_ptr());
        }

        // SAFETY: every pointer covers `size` validated bytes; schedule ops
        // pair distinct parts, or distinct sub-packets of one part, so no
        // source packet overlaps its destination packet.
        unsafe { execute_schedule(&self.encoding_schedule, &ptrs, size) };
        Ok(())
    }

    /// Rebuild the erased parts from the survivors, in place.
    ///
    /// `erased[i]` marks part `i` (data parts first, then code parts) as
    /// lost; its buffer contents are ignored and overwritten. With no parts
    /// erased this is a no-op. At most `m` parts can be recovered.
    ///
    /// # Errors
    /// Returns `CodecError::InsufficientParts` if more than `m` parts are
    /// erased, `CodecError::InvalidBuffers` on wrong counts or sizes.
    pub fn decode(
        &self,
        erased: &[bool],
        data: &mut [&mut [u8]],
        code: &mut [&mut [u8]],
    ) -> Result<(), CodecError> {
        let k = self.data_parts;
        let total = self.total_parts();
        if erased.len() != total {
            return Err(CodecError::InvalidBuffers(format!(
                "expected {} erasure flags, got {}",
                total,
                erased.len()
            )));
        }
        let size = self.checked_part_size(
            data.iter().map(|p| p.len()),
            code.iter().map(|p| p.len()),
        )?;

        let erased_total = erased.iter().filter(|&&e| e).count();
        if erased_total == 0 {
            return Ok(());
        }
        if erased_total > self.code_parts {
            return Err(CodecError::InsufficientParts {
                available: total - erased_total,
                required: k,
            });
        }

        // Assemble the pointer array the schedule executes over: slots
        // [0, k) are readable sources (intact data parts, with each erased
        // data part replaced by the lowest intact code part not yet used),
        // and slots [k, k + erased_total) are the erased buffers to fill,
        // data parts first. The two maps link matrix row ids with part
        // indices in both directions.
        let data_ptrs: Vec<*mut u8> = data.iter_mut().map(|p| p.as_mut_ptr()).collect();
        let code_ptrs: Vec<*mut u8> = code.iter_mut().map(|p| p.as_mut_ptr()).collect();

        let mut ptrs: Vec<*mut u8> = vec![ptr::null_mut(); total];
        let mut rowid_to_partidx = vec![0usize; total];
        let mut partidx_to_rowid = vec![0usize; total];
        let mut next_intact_code = k;
        let mut next_output = k;
        let mut erased_data = 0usize;
        let mut erased_code = 0usize;

        for i in 0..k {
            if !erased[i] {
                ptrs[i] = data_ptrs[i];
                rowid_to_partidx[i] = i;
                partidx_to_rowid[i] = i;
            } else {
                while erased[next_intact_code] {
                    next_intact_code += 1;
                }
                ptrs[i] = code_ptrs[next_intact_code - k];
                rowid_to_partidx[i] = next_intact_code;
                partidx_to_rowid[next_intact_code] = i;
                next_intact_code += 1;

                ptrs[next_output] = data_ptrs[i];
                rowid_to_partidx[next_output] = i;
                partidx_to_rowid[i] = next_output;
                next_output += 1;
                erased_data += 1;
            }
        }
        for i in k..total {
            if erased[i] {
                ptrs[next_output] = code_ptrs[i - k];
                rowid_to_partidx[next_output] = i;
                partidx_to_rowid[i] = next_output;
                next_output += 1;
                erased_code += 1;
            }
        }

        let decoding = self.decoding_bit_matrix(
            &rowid_to_partidx,
            &partidx_to_rowid,
            erased_data,
            erased_code,
        )?;
        let decoding_schedule = build_schedule(k, erased_data + erased_code, &decoding);
        debug!(
            erased_data,
            erased_code,
            ops = decoding_schedule.len(),
            "built decoding schedule"
        );

        // SAFETY: every slot the schedule references covers `size` validated
        // bytes (slots past the outputs stay null and unreferenced). Sources
        // are intact buffers or previously filled outputs, destinations are
        // erased buffers; an op's two parts are either distinct buffers or
        // distinct sub-packets of one buffer.
        unsafe { execute_schedule(&decoding_schedule, &ptrs, size) };
        Ok(())
    }

    /// Check that the code parts are consistent with the data parts.
    ///
    /// Re-encodes into scratch buffers and compares byte-for-byte; a scrub
    /// probe for detecting silent corruption.
    ///
    /// # Errors
    /// Returns `CodecError::InvalidBuffers` on wrong part counts or sizes.
    pub fn verify(&self, data: &[&[u8]], code: &[&[u8]]) -> Result<bool, CodecError> {
        let size = self.checked_part_size(
            data.iter().map(|p| p.len()),
            code.iter().map(|p| p.len()),
        )?;

        let mut scratch = vec![vec![0u8; size]; self.code_parts];
        let mut scratch_refs: Vec<&mut [u8]> =
            scratch.iter_mut().map(|p| p.as_mut_slice()).collect();
        self.encode(data, &mut scratch_refs)?;

        Ok(scratch
            .iter()
            .zip(code)
            .all(|(fresh, presented)| fresh.as_slice() == *presented))
    }

    /// Build the per-call decoding bit matrix: one 8-row block per erased
    /// part, expressed entirely in terms of the surviving parts sitting in
    /// pointer slots [0, k).
    fn decoding_bit_matrix(
        &self,
        rowid_to_partidx: &[usize],
        partidx_to_rowid: &[usize],
        erased_data: usize,
        erased_code: usize,
    ) -> Result<BitMatrix, CodecError> {
        let k = self.data_parts;
        let kb = k * WORD_BITS;
        let mut decoding = BitMatrix::zeros((erased_data + erased_code) * WORD_BITS, kb);

        if erased_data > 0 {
            // What the first k pointer slots now hold, as a matrix over the
            // original data parts: identity blocks for intact parts, coding
            // blocks for the substituted code parts. Its inverse expresses
            // each original data part in terms of the slots.
            let mut composite = BitMatrix::zeros(kb, kb);
            for i in 0..k {
                if rowid_to_partidx[i] == i {
                    for b in 0..WORD_BITS {
                        composite.set(i * WORD_BITS + b, i * WORD_BITS + b, 1);
                    }
                } else {
                    let block = rowid_to_partidx[i] - k;
                    for b in 0..WORD_BITS {
                        composite.copy_row_from(
                            i * WORD_BITS + b,
                            &self.encoding_bits,
                            block * WORD_BITS + b,
                        );
                    }
                }
            }
            let inverse = composite.inverted()?;

            for slot in 0..erased_data {
                let part = rowid_to_partidx[k + slot];
                for b in 0..WORD_BITS {
                    decoding.copy_row_from(
                        slot * WORD_BITS + b,
                        &inverse,
                        part * WORD_BITS + b,
                    );
                }
            }
        }

        // Erased code parts start from their encoding rows, but any column
        // belonging to an erased data part refers to a buffer that no longer
        // holds that part. Zero those columns and substitute the recovery
        // rows built above, once per one-bit of the original block.
        for slot in 0..erased_code {
            let code_block = rowid_to_partidx[k + erased_data + slot] - k;
            let base = (erased_data + slot) * WORD_BITS;
            for b in 0..WORD_BITS {
                decoding.copy_row_from(base + b, &self.encoding_bits, code_block * WORD_BITS + b);
            }

            for i in 0..k {
                if rowid_to_partidx[i] != i {
                    for b in 0..WORD_BITS {
                        for c in 0..WORD_BITS {
                            decoding.set(base + b, i * WORD_BITS + c, 0);
                        }
                    }
                }
            }

            for i in 0..k {
                if rowid_to_partidx[i] != i {
                    let recovery_base = (partidx_to_rowid[i] - k) * WORD_BITS;
                    for b in 0..WORD_BITS {
                        for c in 0..WORD_BITS {
                            if self
                                .encoding_bits
                                .get(code_block * WORD_BITS + b, i * WORD_BITS + c)
                                != 0
                            {
                                decoding.xor_row_into(recovery_base + c, base + b);
                            }
                        }
                    }
                }
            }
        }

        Ok(decoding)
    }

    /// Validate part counts and sizes; returns the shared part size.
    fn checked_part_size<D, C>(&self, data_lens: D, code_lens: C) -> Result<usize, CodecError>
    where
        D: ExactSizeIterator<Item = usize>,
        C: ExactSizeIterator<Item = usize>,
    {
        if data_lens.len() != self.data_parts {
            return Err(CodecError::InvalidBuffers(format!(
                "expected {} data parts, got {}",
                self.data_parts,
                data_lens.len()
            )));
        }
        if code_lens.len() != self.code_parts {
            return Err(CodecError::InvalidBuffers(format!(
                "expected {} code parts, got {}",
                self.code_parts,
                code_lens.len()
            )));
        }

        let mut size = 0usize;
        for (index, len) in data_lens.chain(code_lens).enumerate() {
            if index == 0 {
                size = len;
            } else if len != size {
                return Err(CodecError::InvalidBuffers(format!(
                    "part {index} has size {len}, expected {size}"
                )));
            }
        }
        if size == 0 {
            return Err(CodecError::InvalidBuffers("part size must be > 0".into()));
        }
        if size % STRIPE_SIZE != 0 {
            return Err(CodecError::InvalidBuffers(format!(
                "part size {size} is not a multiple of the {STRIPE_SIZE}-byte stripe"
            )));
        }
        Ok(size)
    }
}

/// Execute a schedule over the assembled part pointers, one stripe at a time.
///
/// # Safety
///
/// Every `ptrs` slot referenced by an op must point to at least `size` bytes,
/// `size` must be a multiple of `STRIPE_SIZE`, and no referenced slot may
/// alias another (distinct sub-packets of one slot are fine; ops never pair
/// a sub-packet with itself).
unsafe fn execute_schedule(schedule: &[Op], ptrs: &[*mut u8], size: usize) {
    let mut offset = 0;
    while offset < size {
        for op in schedule {
            let src = ptrs[op.src_part].add(offset + op.src_bit * PACKET_SIZE) as *const u8;
            let dst = ptrs[op.dst_part].add(offset + op.dst_bit * PACKET_SIZE);
            match op.kind {
                OpKind::Copy => ptr::copy_nonoverlapping(src, dst, PACKET_SIZE),
                OpKind::Xor => xor_packet(dst, src),
            }
        }
        offset += STRIPE_SIZE;
    }
}

/// `dst[i] ^= src[i]` over one packet, eight bytes per step.
///
/// # Safety
/// Both pointers must be valid for `PACKET_SIZE` bytes and must not overlap.
unsafe fn xor_packet(dst: *mut u8, src: *const u8) {
    // PACKET_SIZE is a multiple of 8; unaligned loads keep this independent
    // of the caller's buffer alignment.
    let mut i = 0;
    while i < PACKET_SIZE {
        let word = ptr::read_unaligned(src.add(i) as *const u64)
            ^ ptr::read_unaligned(dst.add(i) as *const u64);
        ptr::write_unaligned(dst.add(i) as *mut u64, word);
        i += 8;
    }
}
