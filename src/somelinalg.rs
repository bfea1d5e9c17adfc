//! some linear algebra functions used throughout the code
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

/// phi functions of scalars and small dense matrices via the augmented
/// matrix exponential
pub mod expm_phi;
/// Arnoldi projection and Krylov evaluation of phi_j(A)*b for large operators
pub mod krylov_phimv;
