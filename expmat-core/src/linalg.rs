//! Minors, determinant, inverse and integer powers.
//!
//! Determinants use closed forms up to 4x4 and cofactor expansion along the first
//! row beyond that, with the expansion terms evaluated in parallel. Cofactor
//! expansion costs O(n!) and is only suitable for small matrices.

use crate::error::{MatrixError, Result};
use crate::matrix::{ensure_square, Matrix};
use crate::traits::Element;

/// `value` multiplied by `(-1)^exponent`, without requiring `Neg` on `T`.
fn signed<T: Element>(value: T, exponent: usize) -> T {
    if exponent % 2 == 0 {
        value
    } else {
        T::zero() - value
    }
}

impl<T: Element> Matrix<T> {
    /// Submatrix with row `excluding_row` and column `excluding_col` removed.
    pub fn minor(&self, excluding_row: usize, excluding_col: usize) -> Result<Matrix<T>> {
        let (rows, cols) = self.dims();
        if excluding_row >= rows {
            return Err(MatrixError::IndexOutOfRange {
                axis: "Row",
                index: excluding_row,
                count: rows,
            });
        }
        if excluding_col >= cols {
            return Err(MatrixError::IndexOutOfRange {
                axis: "Column",
                index: excluding_col,
                count: cols,
            });
        }
        let result: Matrix<T> = self.derived(rows - 1, cols - 1);
        self.parallel().for_each(0, rows - 1, |r| {
            let src_r = if r < excluding_row { r } else { r + 1 };
            for c in 0..cols - 1 {
                let src_c = if c < excluding_col { c } else { c + 1 };
                if self.store.contains(src_r, src_c) {
                    result.store.set(r, c, self.get(src_r, src_c));
                }
            }
            Ok(())
        })?;
        Ok(result)
    }

    /// Determinant of a square matrix. The empty matrix has determinant one.
    pub fn determinant(&self) -> Result<T> {
        let n = ensure_square(self)?;
        let a = |r: usize, c: usize| self.get(r, c);
        let det = match n {
            0 => T::one(),
            1 => a(0, 0),
            2 => a(0, 0) * a(1, 1) - a(0, 1) * a(1, 0),
            3 => {
                a(0, 0) * (a(1, 1) * a(2, 2) - a(1, 2) * a(2, 1))
                    - a(0, 1) * (a(1, 0) * a(2, 2) - a(1, 2) * a(2, 0))
                    + a(0, 2) * (a(1, 0) * a(2, 1) - a(1, 1) * a(2, 0))
            }
            4 => {
                // Laplace expansion over the 2x2 minors of the top and bottom row pairs.
                let s0 = a(0, 0) * a(1, 1) - a(1, 0) * a(0, 1);
                let s1 = a(0, 0) * a(1, 2) - a(1, 0) * a(0, 2);
                let s2 = a(0, 0) * a(1, 3) - a(1, 0) * a(0, 3);
                let s3 = a(0, 1) * a(1, 2) - a(1, 1) * a(0, 2);
                let s4 = a(0, 1) * a(1, 3) - a(1, 1) * a(0, 3);
                let s5 = a(0, 2) * a(1, 3) - a(1, 2) * a(0, 3);

                let c5 = a(2, 2) * a(3, 3) - a(3, 2) * a(2, 3);
                let c4 = a(2, 1) * a(3, 3) - a(3, 1) * a(2, 3);
                let c3 = a(2, 1) * a(3, 2) - a(3, 1) * a(2, 2);
                let c2 = a(2, 0) * a(3, 3) - a(3, 0) * a(2, 3);
                let c1 = a(2, 0) * a(3, 2) - a(3, 0) * a(2, 2);
                let c0 = a(2, 0) * a(3, 1) - a(3, 0) * a(2, 1);

                s0 * c5 - s1 * c4 + s2 * c3 + s3 * c2 - s4 * c1 + s5 * c0
            }
            _ => self.cofactor_expansion(n)?,
        };
        Ok(det)
    }

    fn cofactor_expansion(&self, n: usize) -> Result<T> {
        log::debug!("determinant: cofactor expansion of {}x{}", n, n);
        let terms = self.parallel().try_map(0, n, |j| {
            let pivot = self.get(0, j);
            if pivot.is_zero_value() {
                return Ok(T::zero());
            }
            let minor_det = self.minor(0, j)?.determinant()?;
            Ok(signed(pivot * minor_det, j))
        })?;
        Ok(terms.into_iter().fold(T::zero(), |acc, term| acc + term))
    }

    /// Inverse of a square, non-singular matrix.
    ///
    /// Diagonal matrices are inverted element-wise; everything else goes through the
    /// adjugate, built from the cofactors of every `(i, j)` in parallel.
    pub fn inverse(&self) -> Result<Matrix<T>> {
        let n = ensure_square(self)?;
        let det = self.determinant()?;
        if det.is_zero_value() {
            return Err(MatrixError::SingularMatrix);
        }
        let result: Matrix<T> = self.derived(n, n);
        if n == 0 {
            return Ok(result);
        }
        if n == 1 {
            result.store.set(0, 0, T::one() / det);
            return Ok(result);
        }
        if self.is_diagonal() {
            log::debug!("inverse: diagonal fast path for {}x{}", n, n);
            self.parallel().for_each(0, n, |i| {
                result.store.set(i, i, T::one() / self.get(i, i));
                Ok(())
            })?;
            return Ok(result);
        }

        log::debug!("inverse: adjugate of {}x{}", n, n);
        self.parallel().for_each(0, n * n, |k| {
            let (i, j) = (k / n, k % n);
            let cofactor = signed(self.minor(i, j)?.determinant()?, i + j);
            let value = cofactor / det.clone();
            if !value.is_zero_value() {
                // Adjugate is the transpose of the cofactor matrix.
                result.store.set(j, i, value);
            }
            Ok(())
        })?;
        Ok(result)
    }

    /// `self` multiplied by itself `exponent` times; `power(0)` is the identity.
    pub fn power(&self, exponent: u32) -> Result<Matrix<T>> {
        let n = ensure_square(self)?;
        if exponent == 0 {
            let identity: Matrix<T> = self.derived(n, n);
            for i in 0..n {
                identity.store.set(i, i, T::one());
            }
            return Ok(identity);
        }
        let mut result = self.clone();
        for _ in 1..exponent {
            result = result.dot_product(self)?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: &[&[f64]]) -> Matrix<f64> {
        let rows: Vec<Vec<f64>> = rows.iter().map(|r| r.to_vec()).collect();
        Matrix::from_rows(&rows).unwrap()
    }

    fn assert_approx_eq(a: &Matrix<f64>, b: &Matrix<f64>, tolerance: f64) {
        assert_eq!(a.dims(), b.dims(), "Matrix sizes differ");
        for r in 0..a.row_count() {
            for c in 0..a.column_count() {
                let diff = (a.get(r, c) - b.get(r, c)).abs();
                assert!(
                    diff <= tolerance,
                    "Mismatch at ({}, {}): expected {}, got {}, diff {}",
                    r,
                    c,
                    b.get(r, c),
                    a.get(r, c),
                    diff
                );
            }
        }
    }

    #[test]
    fn test_minor() {
        let a = m(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], &[7.0, 8.0, 9.0]]);
        assert_eq!(a.minor(1, 1).unwrap(), m(&[&[1.0, 3.0], &[7.0, 9.0]]));
        assert_eq!(a.minor(0, 2).unwrap(), m(&[&[4.0, 5.0], &[7.0, 8.0]]));
        assert!(matches!(
            a.minor(3, 0),
            Err(MatrixError::IndexOutOfRange { axis: "Row", .. })
        ));
    }

    #[test]
    fn test_determinant_small_sizes() {
        assert_eq!(m(&[&[7.0]]).determinant().unwrap(), 7.0);
        assert_eq!(m(&[&[2.0, 0.0], &[0.0, 3.0]]).determinant().unwrap(), 6.0);
        assert_eq!(
            m(&[&[2.0, -3.0, 1.0], &[2.0, 0.0, -1.0], &[1.0, 4.0, 5.0]])
                .determinant()
                .unwrap(),
            49.0
        );
        assert_eq!(
            m(&[
                &[1.0, 0.0, 2.0, -1.0],
                &[3.0, 0.0, 0.0, 5.0],
                &[2.0, 1.0, 4.0, -3.0],
                &[1.0, 0.0, 5.0, 0.0],
            ])
            .determinant()
            .unwrap(),
            30.0
        );
        let empty: Matrix<f64> = Matrix::new();
        assert_eq!(empty.determinant().unwrap(), 1.0);
    }

    #[test]
    fn test_closed_form_matches_cofactor_expansion() {
        let a = m(&[
            &[3.0, 2.0, -1.0, 4.0],
            &[2.0, 1.0, 5.0, 7.0],
            &[0.0, 5.0, 2.0, -6.0],
            &[-1.0, 2.0, 1.0, 0.0],
        ]);
        let closed = a.determinant().unwrap();
        let expanded = a.cofactor_expansion(4).unwrap();
        assert!((closed - expanded).abs() < 1e-9);
    }

    fn random_matrix(rng: &mut fastrand::Rng, n: usize) -> Matrix<f64> {
        let mut a = Matrix::zeros(n, n);
        for r in 0..n {
            for c in 0..n {
                a.set(r, c, rng.f64() * 2.0 - 1.0);
            }
        }
        a
    }

    /// Leibniz sum over all permutations of the columns. Permutations are built
    /// by swaps, and every real swap flips the sign.
    fn leibniz_determinant(a: &Matrix<f64>, perm: &mut [usize], k: usize, sign: f64) -> f64 {
        let n = perm.len();
        if k == n {
            return sign * (0..n).map(|i| a.get(i, perm[i])).product::<f64>();
        }
        let mut sum = 0.0;
        for i in k..n {
            perm.swap(k, i);
            let next_sign = if i == k { sign } else { -sign };
            sum += leibniz_determinant(a, perm, k + 1, next_sign);
            perm.swap(k, i);
        }
        sum
    }

    #[test]
    fn test_closed_form_matches_leibniz_on_random_matrices() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        for n in 2..=4 {
            for _ in 0..25 {
                let a = random_matrix(&mut rng, n);
                let mut perm: Vec<usize> = (0..n).collect();
                let expected = leibniz_determinant(&a, &mut perm, 0, 1.0);
                let actual = a.determinant().unwrap();
                assert!(
                    (actual - expected).abs() <= 1e-10,
                    "{}x{} determinant: expected {}, got {}",
                    n,
                    n,
                    expected,
                    actual
                );
            }
        }
    }

    #[test]
    fn test_random_inverse_gives_identity() {
        let mut rng = fastrand::Rng::with_seed(42);
        for n in 2..=5 {
            for _ in 0..10 {
                // A strong diagonal keeps the matrix well conditioned.
                let mut a = random_matrix(&mut rng, n);
                for i in 0..n {
                    a.set(i, i, a.get(i, i) + n as f64);
                }
                let inv = a.inverse().unwrap();
                assert_approx_eq(&a.dot_product(&inv).unwrap(), &Matrix::identity(n), 1e-9);
                assert_approx_eq(&inv.dot_product(&a).unwrap(), &Matrix::identity(n), 1e-9);
            }
        }
    }

    #[test]
    fn test_determinant_large_via_cofactors() {
        // Upper triangular: determinant is the product of the diagonal.
        let mut a = Matrix::zeros(6, 6);
        for i in 0..6 {
            for j in i..6 {
                a.set(i, j, (i + j + 1) as f64);
            }
        }
        let expected: f64 = (0..6).map(|i| (2 * i + 1) as f64).product();
        assert_eq!(a.determinant().unwrap(), expected);
    }

    #[test]
    fn test_determinant_requires_square() {
        assert!(matches!(
            m(&[&[1.0, 2.0]]).determinant(),
            Err(MatrixError::NotSquare { rows: 1, cols: 2 })
        ));
    }

    #[test]
    fn test_inverse_diagonal_scenario() {
        let a = m(&[&[2.0, 0.0], &[0.0, 3.0]]);
        assert!(a.is_diagonal());
        assert_eq!(a.determinant().unwrap(), 6.0);
        let inv = a.inverse().unwrap();
        assert_eq!(inv.get(0, 0), 0.5);
        assert_eq!(inv.get(1, 1), 1.0 / 3.0);
        assert_eq!(inv.get(0, 1), 0.0);
    }

    #[test]
    fn test_inverse_general() {
        let a = m(&[
            &[10.0, 1.0, 2.0, 0.0, 1.0],
            &[3.0, 12.0, 1.0, 2.0, 0.0],
            &[2.0, 5.0, 15.0, 1.0, 1.0],
            &[1.0, 0.0, 2.0, 9.0, 3.0],
            &[0.0, 1.0, 1.0, 2.0, 8.0],
        ]);
        let inv = a.inverse().unwrap();
        assert_approx_eq(&a.dot_product(&inv).unwrap(), &Matrix::identity(5), 1e-9);
        assert_approx_eq(&inv.dot_product(&a).unwrap(), &Matrix::identity(5), 1e-9);
    }

    #[test]
    fn test_inverse_one_by_one_and_empty() {
        assert_eq!(m(&[&[4.0]]).inverse().unwrap().get(0, 0), 0.25);
        let empty: Matrix<f64> = Matrix::new();
        assert_eq!(empty.inverse().unwrap().dims(), (0, 0));
    }

    #[test]
    fn test_inverse_singular() {
        let singular = m(&[&[1.0, 2.0], &[2.0, 4.0]]);
        assert!(matches!(
            singular.inverse(),
            Err(MatrixError::SingularMatrix)
        ));
        assert!(matches!(
            m(&[&[1.0, 2.0, 3.0]]).inverse(),
            Err(MatrixError::NotSquare { .. })
        ));
    }

    #[test]
    fn test_power() {
        let a = m(&[&[1.0, 1.0], &[0.0, 1.0]]);
        assert_eq!(a.power(0).unwrap(), Matrix::identity(2));
        assert_eq!(a.power(1).unwrap(), a);
        assert_eq!(a.power(5).unwrap(), m(&[&[1.0, 5.0], &[0.0, 1.0]]));
        assert!(m(&[&[1.0, 2.0]]).power(2).is_err());
    }
}
