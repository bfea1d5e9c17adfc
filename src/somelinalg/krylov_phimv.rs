//! Krylov evaluation of `phi_j(A) b` for large operators.
//!
//! Arnoldi with a single modified Gram-Schmidt pass projects `A` onto the
//! Krylov subspace `K_m(A, b)`; the small Hessenberg projection goes through
//! the dense augmented exponential of [`crate::somelinalg::expm_phi`] and the
//! result is lifted back: `w = ||b|| * V * [phi_0(H)e1, ..., phi_k(H)e1]`.
//! The approximation is exact when `m = n`.
use crate::somelinalg::expm_phi::{phimv_dense_into, PhimvDenseCache};
use nalgebra::{ComplexField, DMatrix, DVector, DVectorView, DVectorViewMut};
use num_traits::identities::Zero;
use std::error::Error;

/// An operator applied by matrix-vector products.
pub trait MatVec<T: ComplexField> {
    fn dim(&self) -> usize;
    /// `out = A x`
    fn matvec(&self, x: DVectorView<T>, out: DVectorViewMut<T>);
}

impl<T: ComplexField> MatVec<T> for DMatrix<T> {
    fn dim(&self) -> usize {
        self.nrows()
    }

    fn matvec(&self, x: DVectorView<T>, mut out: DVectorViewMut<T>) {
        out.gemv(T::one(), self, &x, T::zero());
    }
}

/// What to do when the subdiagonal `H[j+1, j]` vanishes and the basis cannot
/// be extended. `Truncate` stops early and shrinks the subspace; `Fail`
/// reports a structural error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakdownPolicy {
    Truncate,
    Fail,
}

/// Orthonormal basis `V` (n x m) and upper-Hessenberg projection `H` (m x m)
/// of the operator against the seed `b`, `V[:, 0] = b/||b||`.
pub fn arnoldi<T: ComplexField, Op: MatVec<T>>(
    op: &Op,
    b: &DVector<T>,
    m: usize,
) -> Result<(DMatrix<T>, DMatrix<T>), Box<dyn Error>> {
    let n = op.dim();
    let mut V = DMatrix::zeros(n, m);
    let mut H = DMatrix::zeros(m, m);
    let mut w = DVector::zeros(n);
    arnoldi_into(op, b, &mut V, &mut H, &mut w, BreakdownPolicy::Truncate)?;
    Ok((V, H))
}

/// In-place Arnoldi; `V.ncols()` fixes the requested subspace size `m`.
///
/// Returns the effective subspace size, which is smaller than `m` only when
/// the iteration broke down under `BreakdownPolicy::Truncate`; trailing
/// columns of `V` are zeroed in that case. A single modified Gram-Schmidt
/// pass is used, matching the usual Krylov-phi construction; callers needing
/// tighter orthogonality can reorthogonalize `V` themselves.
pub fn arnoldi_into<T: ComplexField, Op: MatVec<T>>(
    op: &Op,
    b: &DVector<T>,
    V: &mut DMatrix<T>,
    H: &mut DMatrix<T>,
    w: &mut DVector<T>,
    policy: BreakdownPolicy,
) -> Result<usize, Box<dyn Error>> {
    let n = op.dim();
    let m = V.ncols();
    if m == 0 {
        return Err("Krylov subspace size must be at least 1".into());
    }
    if m > n {
        return Err(format!(
            "Krylov subspace size {} exceeds operator dimension {}",
            m, n
        )
        .into());
    }
    if b.len() != n {
        return Err(format!(
            "seed vector length {} does not match operator dimension {}",
            b.len(),
            n
        )
        .into());
    }
    if V.nrows() != n {
        return Err(format!("basis must have {} rows, got {}", n, V.nrows()).into());
    }
    if H.nrows() != m || H.ncols() != m {
        return Err(format!(
            "Hessenberg buffer must be {0}x{0}, got {1}x{2}",
            m,
            H.nrows(),
            H.ncols()
        )
        .into());
    }
    if w.len() != n {
        return Err(format!("work vector must have length {}, got {}", n, w.len()).into());
    }

    let beta = b.norm();
    if beta == T::RealField::zero() {
        return Err("Arnoldi seed vector has zero norm".into());
    }
    let eps: T::RealField = nalgebra::convert(f64::EPSILON * n as f64);
    let breakdown_tol = eps * beta.clone();

    H.fill(T::zero());
    V.column_mut(0).copy_from(b);
    V.column_mut(0).unscale_mut(beta);

    let mut msize = m;
    for j in 0..m {
        op.matvec(V.column(j), w.column_mut(0));
        for i in 0..=j {
            let h = V.column(i).dotc(w);
            H[(i, j)] = h.clone();
            w.axpy(-h, &V.column(i), T::one());
        }
        if j + 1 < m {
            let hnext = w.norm();
            if hnext <= breakdown_tol {
                match policy {
                    BreakdownPolicy::Truncate => {
                        msize = j + 1;
                        break;
                    }
                    BreakdownPolicy::Fail => {
                        return Err(format!(
                            "Arnoldi breakdown after {} vectors (subdiagonal {:?})",
                            j + 1,
                            hnext
                        )
                        .into());
                    }
                }
            }
            H[(j + 1, j)] = T::from_real(hnext.clone());
            V.column_mut(j + 1).copy_from(w);
            V.column_mut(j + 1).unscale_mut(hnext);
        }
    }
    if msize < m {
        V.columns_mut(msize, m - msize).fill(T::zero());
    }
    Ok(msize)
}

/// Cache for [`phimv_into`]: basis, projection and the small phi block.
pub struct PhimvCache<T: ComplexField> {
    pub V: DMatrix<T>,
    pub H: DMatrix<T>,
    pub C: DMatrix<T>,
    w: DVector<T>,
    e1: DVector<T>,
    dense: PhimvDenseCache<T>,
}

impl<T: ComplexField> PhimvCache<T> {
    pub fn new(n: usize, m: usize, k: usize) -> Self {
        let mut e1 = DVector::zeros(m);
        if m > 0 {
            e1[0] = T::one();
        }
        PhimvCache {
            V: DMatrix::zeros(n, m),
            H: DMatrix::zeros(m, m),
            C: DMatrix::zeros(m, k + 1),
            w: DVector::zeros(n),
            e1,
            dense: PhimvDenseCache::new(m, k),
        }
    }
}

/// `[phi_0(A)b, ..., phi_k(A)b]` via an m-dimensional Krylov projection,
/// written as the columns of an n x (k+1) matrix.
pub fn phimv<T: ComplexField, Op: MatVec<T>>(
    op: &Op,
    b: &DVector<T>,
    k: usize,
    m: usize,
) -> Result<DMatrix<T>, Box<dyn Error>> {
    let n = op.dim();
    let mut out = DMatrix::zeros(n, k + 1);
    let mut cache = PhimvCache::new(n, m, k);
    phimv_into(op, b, &mut out, &mut cache, BreakdownPolicy::Truncate)?;
    Ok(out)
}

/// In-place variant of [`phimv`]; `cache` fixes `m`, `out.ncols()` fixes
/// `k + 1`. On breakdown with `Truncate` the projection proceeds on the
/// effective (smaller) subspace.
pub fn phimv_into<T: ComplexField, Op: MatVec<T>>(
    op: &Op,
    b: &DVector<T>,
    out: &mut DMatrix<T>,
    cache: &mut PhimvCache<T>,
    policy: BreakdownPolicy,
) -> Result<(), Box<dyn Error>> {
    let n = op.dim();
    let m = cache.V.ncols();
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
    if cache.C.nrows() != m || cache.C.ncols() != k + 1 {
        return Err(format!(
            "cache sized for m = {}, k = {}, need m = {}, k = {}",
            cache.C.nrows(),
            cache.C.ncols().saturating_sub(1),
            m,
            k
        )
        .into());
    }

    let beta = b.norm();
    let msize = arnoldi_into(op, b, &mut cache.V, &mut cache.H, &mut cache.w, policy)?;

    if msize == m {
        phimv_dense_into(&cache.H, &cache.e1, &mut cache.C, &mut cache.dense)?;
        out.gemm(T::from_real(beta), &cache.V, &cache.C, T::zero());
    } else {
        // breakdown path: redo the small problem on the effective subspace;
        // the allocations here are msize-sized and happen only on breakdown
        let Hm = cache.H.view((0, 0), (msize, msize)).into_owned();
        let mut e1m = DVector::zeros(msize);
        e1m[0] = T::one();
        let mut Cm = DMatrix::zeros(msize, k + 1);
        let mut dense_m = PhimvDenseCache::new(msize, k);
        phimv_dense_into(&Hm, &e1m, &mut Cm, &mut dense_m)?;
        out.gemm(
            T::from_real(beta),
            &cache.V.columns(0, msize),
            &Cm,
            T::zero(),
        );
    }
    Ok(())
}
