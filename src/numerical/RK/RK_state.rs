//! State carriers for the stepping engine.
//!
//! Every stepper is generic over [`OdeState`], the small algebra of
//! operations a Runge-Kutta step needs. Two shapes are supported
//! transparently: scalar states (`f64`, `Complex<f64>`), which produce fresh
//! values, and vector states (`DVector<f64>`, `DVector<Complex<f64>>`), which
//! are written in place into preallocated buffers. The accumulation order of
//! every operation is the same in both shapes, so a scalar state and a
//! length-1 vector state produce bitwise identical trajectories.
use nalgebra::{ComplexField, Complex, DVector};
use std::mem;

/// Operations the steppers perform on a state carrier.
///
/// `stage_from` skips zero coefficients, so tableau zeros cost nothing in
/// either shape.
pub trait OdeState: Clone + 'static {
    /// a new state of the same shape, filled with zeros
    fn zeros_like(&self) -> Self;
    /// copy `src` into `self` without reallocating
    fn assign(&mut self, src: &Self);
    /// `self = base + dt * (coeffs[0]*slopes[0] + coeffs[1]*slopes[1] + ...)`
    fn stage_from(&mut self, base: &Self, dt: f64, coeffs: &[f64], slopes: &[&Self]);
    /// `self = dt * (coeffs[0]*slopes[0] + ...)`
    fn combine(&mut self, dt: f64, coeffs: &[f64], slopes: &[&Self]);
    /// `self = a - b`
    fn diff_from(&mut self, a: &Self, b: &Self);
    /// elementwise `self = self / (abstol + max(|uprev|, |u|) * reltol)`
    fn scaled_residual(&mut self, uprev: &Self, u: &Self, abstol: f64, reltol: f64);
    /// `||v||_2 / sqrt(n)` for vectors, `|v|` for scalars
    fn rms_norm(&self) -> f64;
}

impl OdeState for f64 {
    fn zeros_like(&self) -> Self {
        0.0
    }

    fn assign(&mut self, src: &Self) {
        *self = *src;
    }

    fn stage_from(&mut self, base: &Self, dt: f64, coeffs: &[f64], slopes: &[&Self]) {
        debug_assert_eq!(coeffs.len(), slopes.len());
        let mut acc = 0.0;
        for (c, k) in coeffs.iter().zip(slopes.iter()) {
            if *c != 0.0 {
                acc += **k * *c;
            }
        }
        *self = *base + acc * dt;
    }

    fn combine(&mut self, dt: f64, coeffs: &[f64], slopes: &[&Self]) {
        debug_assert_eq!(coeffs.len(), slopes.len());
        let mut acc = 0.0;
        for (c, k) in coeffs.iter().zip(slopes.iter()) {
            if *c != 0.0 {
                acc += **k * *c;
            }
        }
        *self = acc * dt;
    }

    fn diff_from(&mut self, a: &Self, b: &Self) {
        *self = *a - *b;
    }

    fn scaled_residual(&mut self, uprev: &Self, u: &Self, abstol: f64, reltol: f64) {
        let scale = abstol + uprev.abs().max(u.abs()) * reltol;
        *self = *self / scale;
    }

    fn rms_norm(&self) -> f64 {
        self.abs()
    }
}

impl OdeState for Complex<f64> {
    fn zeros_like(&self) -> Self {
        Complex::new(0.0, 0.0)
    }

    fn assign(&mut self, src: &Self) {
        *self = *src;
    }

    fn stage_from(&mut self, base: &Self, dt: f64, coeffs: &[f64], slopes: &[&Self]) {
        debug_assert_eq!(coeffs.len(), slopes.len());
        let mut acc = Complex::new(0.0, 0.0);
        for (c, k) in coeffs.iter().zip(slopes.iter()) {
            if *c != 0.0 {
                acc += **k * *c;
            }
        }
        *self = *base + acc * dt;
    }

    fn combine(&mut self, dt: f64, coeffs: &[f64], slopes: &[&Self]) {
        debug_assert_eq!(coeffs.len(), slopes.len());
        let mut acc = Complex::new(0.0, 0.0);
        for (c, k) in coeffs.iter().zip(slopes.iter()) {
            if *c != 0.0 {
                acc += **k * *c;
            }
        }
        *self = acc * dt;
    }

    fn diff_from(&mut self, a: &Self, b: &Self) {
        *self = *a - *b;
    }

    fn scaled_residual(&mut self, uprev: &Self, u: &Self, abstol: f64, reltol: f64) {
        let scale = abstol + uprev.norm().max(u.norm()) * reltol;
        *self = *self / scale;
    }

    fn rms_norm(&self) -> f64 {
        self.norm()
    }
}

impl<T> OdeState for DVector<T>
where
    T: ComplexField<RealField = f64> + Copy,
{
    fn zeros_like(&self) -> Self {
        DVector::zeros(self.len())
    }

    fn assign(&mut self, src: &Self) {
        self.copy_from(src);
    }

    fn stage_from(&mut self, base: &Self, dt: f64, coeffs: &[f64], slopes: &[&Self]) {
        debug_assert_eq!(coeffs.len(), slopes.len());
        debug_assert_eq!(self.len(), base.len());
        for e in 0..self.len() {
            let mut acc = T::zero();
            for (c, k) in coeffs.iter().zip(slopes.iter()) {
                if *c != 0.0 {
                    acc += k[e] * T::from_real(*c);
                }
            }
            self[e] = base[e] + acc * T::from_real(dt);
        }
    }

    fn combine(&mut self, dt: f64, coeffs: &[f64], slopes: &[&Self]) {
        debug_assert_eq!(coeffs.len(), slopes.len());
        for e in 0..self.len() {
            let mut acc = T::zero();
            for (c, k) in coeffs.iter().zip(slopes.iter()) {
                if *c != 0.0 {
                    acc += k[e] * T::from_real(*c);
                }
            }
            self[e] = acc * T::from_real(dt);
        }
    }

    fn diff_from(&mut self, a: &Self, b: &Self) {
        debug_assert_eq!(a.len(), b.len());
        for e in 0..self.len() {
            self[e] = a[e] - b[e];
        }
    }

    fn scaled_residual(&mut self, uprev: &Self, u: &Self, abstol: f64, reltol: f64) {
        for e in 0..self.len() {
            let scale = abstol + uprev[e].modulus().max(u[e].modulus()) * reltol;
            self[e] = self[e] / T::from_real(scale);
        }
    }

    fn rms_norm(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.norm() / (self.len() as f64).sqrt()
    }
}

/// Hairer-style scaled norm used for error control.
pub fn norm(vector: &DVector<f64>) -> f64 {
    vector.norm() / (vector.len() as f64).sqrt()
}

/// The per-solve handle the steppers operate on.
///
/// Holds the right-hand side, the current step data `(t, dt, uprev)`, the
/// step products `(u, fsallast, EEst, k)` and the error-control options.
/// `fsalfirst` always carries `f(t, uprev)` at the start of a step; steppers
/// write `fsallast` only, so a rejected step leaves `fsalfirst` valid and
/// [`RKIntegrator::accept_step`] promotes `fsallast` without recomputation.
pub struct RKIntegrator<S: OdeState> {
    pub f: Box<dyn Fn(f64, &S, &mut S)>,
    pub t: f64,
    pub dt: f64,
    pub uprev: S,
    pub u: S,
    pub fsalfirst: S,
    pub fsallast: S,
    /// dense-output slopes, populated when `calck` is set
    pub k: Vec<S>,
    /// unit-free embedded error estimate of the last step (adaptive only)
    pub EEst: f64,
    pub abstol: f64,
    pub reltol: f64,
    pub adaptive: bool,
    pub calck: bool,
    /// reduction of the scaled residual to a scalar; `None` means RMS
    pub internalnorm: Option<Box<dyn Fn(&S) -> f64>>,
}

impl<S: OdeState> RKIntegrator<S> {
    pub fn new(f: Box<dyn Fn(f64, &S, &mut S)>, t0: f64, dt: f64, u0: S) -> Self {
        let zero = u0.zeros_like();
        RKIntegrator {
            f,
            t: t0,
            dt,
            uprev: u0.clone(),
            u: u0,
            fsalfirst: zero.clone(),
            fsallast: zero,
            k: Vec::new(),
            EEst: 0.0,
            abstol: 1e-6,
            reltol: 1e-3,
            adaptive: false,
            calck: false,
            internalnorm: None,
        }
    }

    /// reduce a scaled residual with the configured norm
    pub fn error_norm(&self, atmp: &S) -> f64 {
        match &self.internalnorm {
            Some(reduce) => reduce(atmp),
            None => atmp.rms_norm(),
        }
    }

    /// promote the step products: `u -> uprev`, `fsallast -> fsalfirst`,
    /// `t -> t + dt`. Called by the driver on step acceptance only.
    pub fn accept_step(&mut self) {
        self.t += self.dt;
        let RKIntegrator { uprev, u, .. } = self;
        uprev.assign(u);
        mem::swap(&mut self.fsalfirst, &mut self.fsallast);
    }
}
