//! COPY/XOR schedules compiled from bit matrices.
//!
//! A schedule realizes a bit-matrix-times-input product as a flat list of
//! packet operations, so encode and decode never walk the matrix. Output
//! rows are emitted greedily: after a row is computed, every remaining row
//! re-ranks itself against it, since XOR-ing an already computed output row
//! into a fresh destination replaces all the columns the two rows share.

use crate::matrix::BitMatrix;
use crate::WORD_BITS;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OpKind {
    Copy,
    Xor,
}

/// One packet operation of a schedule.
///
/// `src_part`/`dst_part` index the combined data-then-code part array;
/// `src_bit`/`dst_bit` select one of the eight sub-packets within a part.
/// The first operation targeting a destination is always a `Copy`, every
/// later one an `Xor`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Op {
    pub(crate) kind: OpKind,
    pub(crate) src_part: usize,
    pub(crate) src_bit: usize,
    pub(crate) dst_part: usize,
    pub(crate) dst_bit: usize,
}

/// Compile `bits` (shape `(code_rows*8) x (data_parts*8)`) into a schedule.
///
/// Destination parts are numbered from `data_parts` upwards, matching the
/// combined pointer array the executor runs over.
pub(crate) fn build_schedule(data_parts: usize, code_rows: usize, bits: &BitMatrix) -> Vec<Op> {
    let rows = code_rows * WORD_BITS;
    let cols = data_parts * WORD_BITS;
    debug_assert_eq!(bits.rows(), rows);
    debug_assert_eq!(bits.cols(), cols);

    // diff[i]: cost of emitting row i right now; derive_from[i]: the emitted
    // row it is cheapest to start from, if any beats building from scratch.
    let mut diff: Vec<usize> = (0..rows).map(|i| count_ones(bits.row(i))).collect();
    let mut derive_from: Vec<Option<usize>> = vec![None; rows];
    let mut pending = vec![true; rows];

    let mut ops = Vec::new();

    let mut best = 0;
    for i in 1..rows {
        if diff[i] < diff[best] {
            best = i;
        }
    }

    for _ in 0..rows {
        let row_index = best;
        pending[row_index] = false;
        let row = bits.row(row_index);
        let dst_part = data_parts + row_index / WORD_BITS;
        let dst_bit = row_index % WORD_BITS;

        match derive_from[row_index] {
            None => {
                let mut kind = OpKind::Copy;
                for j in 0..cols {
                    if row[j] != 0 {
                        ops.push(Op {
                            kind,
                            src_part: j / WORD_BITS,
                            src_bit: j % WORD_BITS,
                            dst_part,
                            dst_bit,
                        });
                        kind = OpKind::Xor;
                    }
                }
            }
            Some(parent) => {
                // Seed the fresh destination with the already-computed
                // parent row, then XOR in the columns where the rows differ.
                ops.push(Op {
                    kind: OpKind::Copy,
                    src_part: data_parts + parent / WORD_BITS,
                    src_bit: parent % WORD_BITS,
                    dst_part,
                    dst_bit,
                });
                let parent_row = bits.row(parent);
                for j in 0..cols {
                    if row[j] ^ parent_row[j] != 0 {
                        ops.push(Op {
                            kind: OpKind::Xor,
                            src_part: j / WORD_BITS,
                            src_bit: j % WORD_BITS,
                            dst_part,
                            dst_bit,
                        });
                    }
                }
            }
        }

        // Re-rank the remaining rows against the row just computed, then
        // pick the cheapest (lowest index on ties) as the next to emit.
        let mut best_diff = cols + 1;
        let mut found = false;
        for i in 0..rows {
            if !pending[i] {
                continue;
            }
            let candidate = 1 + xor_distance(row, bits.row(i));
            if candidate < diff[i] {
                diff[i] = candidate;
                derive_from[i] = Some(row_index);
            }
            if diff[i] < best_diff {
                best_diff = diff[i];
                best = i;
                found = true;
            }
        }
        if !found {
            break;
        }
    }

    ops
}

fn count_ones(row: &[u8]) -> usize {
    row.iter().map(|&b| usize::from(b)).sum()
}

fn xor_distance(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).map(|(&x, &y)| usize::from(x ^ y)).sum()
}
