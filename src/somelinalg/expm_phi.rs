//! phi functions for exponential integrators, dense path.
//!
//! phi_0(z) = exp(z), phi_{k+1}(z) = (phi_k(z) - 1/k!)/z. The downward
//! recurrence is catastrophically unstable near z = 0, so everything here
//! goes through Sidje's augmented matrix exponential instead: exponentiate
//!
//! ```text
//!     | A   v   0  ...  0 |
//!     | 0   0   1  ...  0 |
//! M = | 0   0   0  ...  . |
//!     | .            .  1 |
//!     | 0   0   0  ...  0 |
//! ```
//!
//! and read phi_1(A)v .. phi_k(A)v out of the trailing columns. The matrix
//! exponential itself is nalgebra's Pade scaling-and-squaring `Matrix::exp`.
use nalgebra::{ComplexField, DMatrix, DVector};
use std::error::Error;

/// `[phi_0(z), ..., phi_k(z)]` for a scalar argument.
pub fn phi<T: ComplexField>(z: T, k: usize) -> Vec<T> {
    let mut out = vec![T::zero(); k + 1];
    // the slice is sized correctly by construction
    phi_into(z, &mut out).unwrap();
    out
}

/// In-place variant of [`phi`]; `out.len()` fixes `k + 1`.
pub fn phi_into<T: ComplexField>(z: T, out: &mut [T]) -> Result<(), Box<dyn Error>> {
    if out.is_empty() {
        return Err("phi output slice must hold at least phi_0".into());
    }
    let k = out.len() - 1;
    let mut M = DMatrix::<T>::zeros(k + 1, k + 1);
    M[(0, 0)] = z;
    for j in 0..k {
        M[(j, j + 1)] = T::one();
    }
    let P = M.exp();
    for (j, slot) in out.iter_mut().enumerate() {
        *slot = P[(0, j)].clone();
    }
    Ok(())
}

/// Cache for [`phimv_dense_into`]: the augmented matrix, allocated once.
pub struct PhimvDenseCache<T: ComplexField> {
    M: DMatrix<T>,
}

impl<T: ComplexField> PhimvDenseCache<T> {
    pub fn new(n: usize, k: usize) -> Self {
        PhimvDenseCache {
            M: DMatrix::zeros(n + k, n + k),
        }
    }
}

/// `[phi_0(A)v, ..., phi_k(A)v]` as the columns of an n x (k+1) matrix.
pub fn phimv_dense<T: ComplexField>(
    A: &DMatrix<T>,
    v: &DVector<T>,
    k: usize,
) -> Result<DMatrix<T>, Box<dyn Error>> {
    let n = A.nrows();
    let mut out = DMatrix::zeros(n, k + 1);
    let mut cache = PhimvDenseCache::new(n, k);
    phimv_dense_into(A, v, &mut out, &mut cache)?;
    Ok(out)
}

/// In-place variant of [`phimv_dense`]; `out.ncols()` fixes `k + 1`.
/// All dimension checks run before any buffer is touched.
pub fn phimv_dense_into<T: ComplexField>(
    A: &DMatrix<T>,
    v: &DVector<T>,
    out: &mut DMatrix<T>,
    cache: &mut PhimvDenseCache<T>,
) -> Result<(), Box<dyn Error>> {
    let n = A.nrows();
    if A.ncols() != n {
        return Err(format!("operator must be square, got {}x{}", n, A.ncols()).into());
    }
    if v.len() != n {
        return Err(format!(
            "seed vector length {} does not match operator dimension {}",
            v.len(),
            n
        )
        .into());
    }
    if out.nrows() != n || out.ncols() == 0 {
        return Err(format!(
            "output must be {}x(k+1), got {}x{}",
            n,
            out.nrows(),
            out.ncols()
        )
        .into());
    }
    let k = out.ncols() - 1;
    if cache.M.nrows() != n + k {
        return Err(format!(
            "cache sized for dimension {}, need {}",
            cache.M.nrows(),
            n + k
        )
        .into());
    }

    cache.M.fill(T::zero());
    cache.M.view_mut((0, 0), (n, n)).copy_from(A);
    if k > 0 {
        for i in 0..n {
            cache.M[(i, n)] = v[i].clone();
        }
        for j in 0..k - 1 {
            cache.M[(n + j, n + j + 1)] = T::one();
        }
    }
    let P = cache.M.exp();

    // column 0: phi_0(A) v = exp(A) v
    out.column_mut(0)
        .gemv(T::one(), &P.view((0, 0), (n, n)), v, T::zero());
    // columns 1..k sit in the augmented block
    for j in 1..=k {
        out.column_mut(j).copy_from(&P.view((0, n + j - 1), (n, 1)));
    }
    Ok(())
}

/// The full operators `[phi_0(A), ..., phi_k(A)]`, assembled column by
/// column from [`phimv_dense_into`] applied to the basis vectors.
pub fn phim<T: ComplexField>(
    A: &DMatrix<T>,
    k: usize,
) -> Result<Vec<DMatrix<T>>, Box<dyn Error>> {
    let n = A.nrows();
    let mut out = vec![DMatrix::zeros(n, n); k + 1];
    phim_into(A, &mut out)?;
    Ok(out)
}

/// In-place variant of [`phim`]; `out.len()` fixes `k + 1`.
pub fn phim_into<T: ComplexField>(
    A: &DMatrix<T>,
    out: &mut [DMatrix<T>],
) -> Result<(), Box<dyn Error>> {
    let n = A.nrows();
    if A.ncols() != n {
        return Err(format!("operator must be square, got {}x{}", n, A.ncols()).into());
    }
    if out.is_empty() {
        return Err("phim output must hold at least phi_0".into());
    }
    let k = out.len() - 1;
    for (j, mat) in out.iter().enumerate() {
        if mat.nrows() != n || mat.ncols() != n {
            return Err(format!(
                "phim output {} must be {}x{}, got {}x{}",
                j,
                n,
                n,
                mat.nrows(),
                mat.ncols()
            )
            .into());
        }
    }

    let mut cache = PhimvDenseCache::new(n, k);
    let mut cols = DMatrix::zeros(n, k + 1);
    let mut e_i = DVector::zeros(n);
    for i in 0..n {
        e_i.fill(T::zero());
        e_i[i] = T::one();
        phimv_dense_into(A, &e_i, &mut cols, &mut cache)?;
        for (j, mat) in out.iter_mut().enumerate() {
            mat.set_column(i, &cols.column(j));
        }
    }
    Ok(())
}
