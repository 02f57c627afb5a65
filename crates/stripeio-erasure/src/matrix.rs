//! Cauchy coding matrix construction and GF(2) bit-matrix machinery.
//!
//! The coding matrix entry for code part `i` and data part `j` starts as
//! `1 / (i XOR (m + j))`; because the two index sets are disjoint the
//! denominator is never zero, and every square submatrix of the stacked
//! `[identity; matrix]` is invertible, which is what makes any up-to-m
//! erasures recoverable. The matrix is then rescaled to minimize the number
//! of ones in its bit expansion, which directly minimizes XOR work: scaling a
//! row only rescales that parity symbol and preserves invertibility of every
//! submatrix.

use crate::gf256::GfTables;
use crate::{CodecError, WORD_BITS};

/// A dense binary matrix with one byte per bit, row-major.
///
/// The 8x8 block at rows `[i*8, i*8+8)`, columns `[j*8, j*8+8)` of an
/// expanded coding matrix is the multiplication-by-`M[i][j]` map over GF(2):
/// column `c` holds the little-endian bits of `M[i][j] * 2^c`.
#[derive(Clone, Debug)]
pub(crate) struct BitMatrix {
    rows: usize,
    cols: usize,
    bits: Vec<u8>,
}

impl BitMatrix {
    pub(crate) fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            bits: vec![0u8; rows * cols],
        }
    }

    #[inline]
    pub(crate) fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub(crate) fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub(crate) fn get(&self, row: usize, col: usize) -> u8 {
        self.bits[row * self.cols + col]
    }

    #[inline]
    pub(crate) fn set(&mut self, row: usize, col: usize, value: u8) {
        self.bits[row * self.cols + col] = value;
    }

    #[inline]
    pub(crate) fn row(&self, row: usize) -> &[u8] {
        &self.bits[row * self.cols..(row + 1) * self.cols]
    }

    /// Overwrite row `dst_row` with row `src_row` of `other`.
    pub(crate) fn copy_row_from(&mut self, dst_row: usize, other: &BitMatrix, src_row: usize) {
        debug_assert_eq!(self.cols, other.cols);
        let dst = dst_row * self.cols;
        let src = src_row * other.cols;
        self.bits[dst..dst + self.cols].copy_from_slice(&other.bits[src..src + self.cols]);
    }

    /// XOR row `src` into row `dst`, full width.
    pub(crate) fn xor_row_into(&mut self, src: usize, dst: usize) {
        debug_assert_ne!(src, dst);
        let s = src * self.cols;
        let d = dst * self.cols;
        for c in 0..self.cols {
            self.bits[d + c] ^= self.bits[s + c];
        }
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let cols = self.cols;
        for c in 0..cols {
            self.bits.swap(a * cols + c, b * cols + c);
        }
    }

    /// Invert a square matrix over GF(2) by Gauss-Jordan elimination.
    ///
    /// # Errors
    /// Returns `CodecError::Internal` if no non-zero pivot can be found; for
    /// matrices assembled from Cauchy blocks this indicates a bug, not a bad
    /// input.
    pub(crate) fn inverted(&self) -> Result<BitMatrix, CodecError> {
        debug_assert_eq!(self.rows, self.cols);
        let n = self.rows;

        let mut work = self.clone();
        let mut inverse = BitMatrix::zeros(n, n);
        for i in 0..n {
            inverse.set(i, i, 1);
        }

        // Forward pass: reduce to upper triangular.
        for i in 0..n {
            if work.get(i, i) == 0 {
                let pivot = (i + 1..n)
                    .find(|&j| work.get(j, i) != 0)
                    .ok_or_else(|| CodecError::Internal("singular bit matrix".into()))?;
                work.swap_rows(i, pivot);
                inverse.swap_rows(i, pivot);
            }
            for j in i + 1..n {
                if work.get(j, i) != 0 {
                    work.xor_row_into(i, j);
                    inverse.xor_row_into(i, j);
                }
            }
        }

        // Backward pass: clear everything above the diagonal.
        for i in (0..n).rev() {
            for j in 0..i {
                if work.get(j, i) != 0 {
                    work.xor_row_into(i, j);
                    inverse.xor_row_into(i, j);
                }
            }
        }

        Ok(inverse)
    }
}

/// Builds sparsified Cauchy coding matrices and their bit expansions.
pub(crate) struct MatrixBuilder<'a> {
    field: &'a GfTables,
    /// Low eight bits of x * x^8: the reduction pattern applied when a shift
    /// carries out of the field.
    prim: u8,
}

impl<'a> MatrixBuilder<'a> {
    pub(crate) fn new(field: &'a GfTables) -> Self {
        let prim = field.multiply(1 << (WORD_BITS - 1), 2);
        Self { field, prim }
    }

    /// Build the complete encoding bit matrix for `k` data parts and `m`
    /// code parts: the sparsified coding matrix expanded to `(m*8) x (k*8)`.
    pub(crate) fn encoding_bit_matrix(&self, k: usize, m: usize) -> BitMatrix {
        let matrix = self.coding_matrix(k, m);
        self.expand(&matrix, k, m)
    }

    /// Build the `m x k` coding matrix (row-major).
    ///
    /// Starts from the Cauchy construction, rescales columns so the first
    /// row is all ones, then rescales each later row by whichever of its
    /// elements leaves the fewest ones in the row's bit expansion.
    pub(crate) fn coding_matrix(&self, k: usize, m: usize) -> Vec<u8> {
        let field = self.field;
        let mut matrix = vec![0u8; m * k];
        for i in 0..m {
            for j in 0..k {
                matrix[i * k + j] = field.divide(1, (i ^ (m + j)) as u8);
            }
        }

        // Normalize the first row to all ones by rescaling columns.
        for j in 0..k {
            if matrix[j] != 1 {
                let inv = field.divide(1, matrix[j]);
                for i in 0..m {
                    matrix[i * k + j] = field.multiply(matrix[i * k + j], inv);
                }
            }
        }

        // Sparsify the remaining rows. Dividing row i by one of its elements
        // can only help if that element is not already 1; keep the division
        // only on a strict improvement, preferring the lowest column.
        for i in 1..m {
            let row = i * k;
            let mut min_ones: u32 = (0..k)
                .map(|j| self.count_cauchy_ones(matrix[row + j]))
                .sum();
            let mut best_col = None;
            for j in 0..k {
                if matrix[row + j] != 1 {
                    let inv = field.divide(1, matrix[row + j]);
                    let candidate: u32 = (0..k)
                        .map(|c| self.count_cauchy_ones(field.multiply(matrix[row + c], inv)))
                        .sum();
                    if candidate < min_ones {
                        min_ones = candidate;
                        best_col = Some(j);
                    }
                }
            }
            if let Some(j) = best_col {
                let inv = field.divide(1, matrix[row + j]);
                for c in 0..k {
                    matrix[row + c] = field.multiply(matrix[row + c], inv);
                }
            }
        }

        matrix
    }

    /// Number of ones in the 8x8 bit expansion of `element`.
    fn count_cauchy_ones(&self, element: u8) -> u32 {
        let mut value = element;
        let mut total = value.count_ones();
        for _ in 1..WORD_BITS {
            let carry = value & 0x80 != 0;
            value <<= 1;
            if carry {
                value ^= self.prim;
            }
            total += value.count_ones();
        }
        total
    }

    /// Expand an `m x k` coding matrix into its `(m*8) x (k*8)` bit matrix.
    fn expand(&self, matrix: &[u8], k: usize, m: usize) -> BitMatrix {
        let mut bits = BitMatrix::zeros(m * WORD_BITS, k * WORD_BITS);
        for i in 0..m {
            for j in 0..k {
                let mut element = matrix[i * k + j];
                for c in 0..WORD_BITS {
                    for n in 0..WORD_BITS {
                        bits.set(i * WORD_BITS + n, j * WORD_BITS + c, (element >> n) & 1);
                    }
                    element = self.field.multiply(element, 2);
                }
            }
        }
        bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder_fixture() -> GfTables {
        GfTables::new()
    }

    #[test]
    fn test_first_row_is_all_ones() {
        let field = builder_fixture();
        let builder = MatrixBuilder::new(&field);
        for (k, m) in [(2, 1), (3, 2), (4, 2), (8, 4), (16, 6), (100, 12)] {
            let matrix = builder.coding_matrix(k, m);
            assert!(matrix[..k].iter().all(|&e| e == 1), "k={k} m={m}");
        }
    }

    #[test]
    fn test_coding_matrix_8_4_reference() {
        // The sparsified Cauchy matrix for the common 8+4 layout.
        let field = builder_fixture();
        let builder = MatrixBuilder::new(&field);
        let matrix = builder.coding_matrix(8, 4);
        #[rustfmt::skip]
        let expected: [u8; 32] = [
            1,   1,   1,   1,   1,   1,   1,   1,
            66,  235, 38,  13,  138, 73,  1,   147,
            143, 114, 101, 200, 1,   39,  217, 161,
            187, 70,  1,   172, 238, 200, 104, 16,
        ];
        assert_eq!(matrix, expected);
    }

    #[test]
    fn test_count_cauchy_ones_matches_expansion() {
        let field = builder_fixture();
        let builder = MatrixBuilder::new(&field);
        for element in 0..=255u8 {
            let bits = builder.expand(&[element], 1, 1);
            let expanded: u32 = (0..bits.rows())
                .map(|r| bits.row(r).iter().map(|&b| u32::from(b)).sum::<u32>())
                .sum();
            assert_eq!(builder.count_cauchy_ones(element), expanded, "{element}");
        }
    }

    #[test]
    fn test_expand_identity_element() {
        // The element 1 expands to the 8x8 identity block.
        let field = builder_fixture();
        let builder = MatrixBuilder::new(&field);
        let bits = builder.expand(&[1], 1, 1);
        for r in 0..WORD_BITS {
            for c in 0..WORD_BITS {
                assert_eq!(bits.get(r, c), u8::from(r == c));
            }
        }
    }

    fn mat_mul_gf2(a: &BitMatrix, b: &BitMatrix) -> BitMatrix {
        let mut out = BitMatrix::zeros(a.rows(), b.cols());
        for i in 0..a.rows() {
            for j in 0..b.cols() {
                let mut acc = 0u8;
                for t in 0..a.cols() {
                    acc ^= a.get(i, t) & b.get(t, j);
                }
                out.set(i, j, acc);
            }
        }
        out
    }

    #[test]
    fn test_invert_round_trip() {
        // Compose a survivor matrix the way decode does: identity blocks for
        // intact data parts, coding blocks for substituted ones.
        let field = builder_fixture();
        let builder = MatrixBuilder::new(&field);
        let (k, m) = (4, 2);
        let encoding = builder.encoding_bit_matrix(k, m);

        let n = k * WORD_BITS;
        let mut composite = BitMatrix::zeros(n, n);
        for i in 0..k {
            if i == 1 {
                // part 1 substituted by code part 0
                for b in 0..WORD_BITS {
                    composite.copy_row_from(i * WORD_BITS + b, &encoding, b);
                }
            } else {
                for b in 0..WORD_BITS {
                    composite.set(i * WORD_BITS + b, i * WORD_BITS + b, 1);
                }
            }
        }

        let inverse = composite.inverted().unwrap();
        let product = mat_mul_gf2(&composite, &inverse);
        for i in 0..n {
            for j in 0..n {
                assert_eq!(product.get(i, j), u8::from(i == j), "({i}, {j})");
            }
        }
    }

    #[test]
    fn test_invert_singular_matrix_fails() {
        let mut singular = BitMatrix::zeros(8, 8);
        // Two identical rows cannot be inverted.
        for c in 0..8 {
            singular.set(0, c, 1);
            singular.set(1, c, 1);
        }
        assert!(singular.inverted().is_err());
    }
}
