//! Butcher tableaus for the embedded explicit Runge-Kutta methods.
//!
//! Coefficients are stored in named fields and constructed once per solve in
//! the working precision `T`. Rational constants are divided in `T` itself so
//! that an `f64` tableau carries the correctly rounded value of the exact
//! fraction. The fixed-step methods (Euler, explicit midpoint, classical RK4)
//! keep their handful of classical constants inline in the stepper.
use nalgebra::RealField;

/// exact fraction evaluated in the target precision
fn rat<T: RealField>(num: f64, den: f64) -> T {
    let n: T = nalgebra::convert(num);
    let d: T = nalgebra::convert(den);
    n / d
}

fn lit<T: RealField>(x: f64) -> T {
    nalgebra::convert(x)
}

/// Bogacki-Shampine 3(2).
///
/// `btilde_i = bhat_i - b_i`, so the embedded solution is
/// `utilde = u + dt*(btilde1*k1 + ... + btilde4*k4)`.
#[derive(Debug, Clone)]
pub struct BS3Tableau<T> {
    pub c2: T,
    pub c3: T,
    pub a21: T,
    pub a32: T,
    pub b1: T,
    pub b2: T,
    pub b3: T,
    pub btilde1: T,
    pub btilde2: T,
    pub btilde3: T,
    pub btilde4: T,
}

impl<T: RealField> BS3Tableau<T> {
    pub fn new() -> Self {
        BS3Tableau {
            c2: rat(1.0, 2.0),
            c3: rat(3.0, 4.0),
            a21: rat(1.0, 2.0),
            a32: rat(3.0, 4.0),
            b1: rat(2.0, 9.0),
            b2: rat(1.0, 3.0),
            b3: rat(4.0, 9.0),
            // 7/24 - 2/9, 1/4 - 1/3, 1/3 - 4/9, 1/8 - 0
            btilde1: rat(5.0, 72.0),
            btilde2: rat(-1.0, 12.0),
            btilde3: rat(-1.0, 9.0),
            btilde4: rat(1.0, 8.0),
        }
    }
}

impl<T: RealField> Default for BS3Tableau<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Dormand-Prince 5(4), the DOPRI5 pair, with the extra dense-output row `d`.
#[derive(Debug, Clone)]
pub struct DP5Tableau<T> {
    pub c2: T,
    pub c3: T,
    pub c4: T,
    pub c5: T,
    pub a21: T,
    pub a31: T,
    pub a32: T,
    pub a41: T,
    pub a42: T,
    pub a43: T,
    pub a51: T,
    pub a52: T,
    pub a53: T,
    pub a54: T,
    pub a61: T,
    pub a62: T,
    pub a63: T,
    pub a64: T,
    pub a65: T,
    /// the seventh stage row equals the propagating weights b1..b6 (FSAL)
    pub b1: T,
    pub b3: T,
    pub b4: T,
    pub b5: T,
    pub b6: T,
    pub btilde1: T,
    pub btilde3: T,
    pub btilde4: T,
    pub btilde5: T,
    pub btilde6: T,
    pub btilde7: T,
    pub d1: T,
    pub d3: T,
    pub d4: T,
    pub d5: T,
    pub d6: T,
    pub d7: T,
}

impl<T: RealField> DP5Tableau<T> {
    pub fn new() -> Self {
        DP5Tableau {
            c2: rat(1.0, 5.0),
            c3: rat(3.0, 10.0),
            c4: rat(4.0, 5.0),
            c5: rat(8.0, 9.0),
            a21: rat(1.0, 5.0),
            a31: rat(3.0, 40.0),
            a32: rat(9.0, 40.0),
            a41: rat(44.0, 45.0),
            a42: rat(-56.0, 15.0),
            a43: rat(32.0, 9.0),
            a51: rat(19372.0, 6561.0),
            a52: rat(-25360.0, 2187.0),
            a53: rat(64448.0, 6561.0),
            a54: rat(-212.0, 729.0),
            a61: rat(9017.0, 3168.0),
            a62: rat(-355.0, 33.0),
            a63: rat(46732.0, 5247.0),
            a64: rat(49.0, 176.0),
            a65: rat(-5103.0, 18656.0),
            b1: rat(35.0, 384.0),
            b3: rat(500.0, 1113.0),
            b4: rat(125.0, 192.0),
            b5: rat(-2187.0, 6784.0),
            b6: rat(11.0, 84.0),
            btilde1: rat(-71.0, 57600.0),
            btilde3: rat(71.0, 16695.0),
            btilde4: rat(-71.0, 1920.0),
            btilde5: rat(17253.0, 339200.0),
            btilde6: rat(-22.0, 525.0),
            btilde7: rat(1.0, 40.0),
            d1: rat(-12715105075.0, 11282082432.0),
            d3: rat(87487479700.0, 32700410799.0),
            d4: rat(-10690763975.0, 1880347072.0),
            d5: rat(701980252875.0, 199316789632.0),
            d6: rat(-1453857185.0, 822651844.0),
            d7: rat(69997945.0, 29380423.0),
        }
    }
}

impl<T: RealField> Default for DP5Tableau<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Tsitouras 5(4). Published in decimal form; the literals below carry the
/// full double precision of the paper.
#[derive(Debug, Clone)]
pub struct Tsit5Tableau<T> {
    pub c2: T,
    pub c3: T,
    pub c4: T,
    pub c5: T,
    pub a21: T,
    pub a31: T,
    pub a32: T,
    pub a41: T,
    pub a42: T,
    pub a43: T,
    pub a51: T,
    pub a52: T,
    pub a53: T,
    pub a54: T,
    pub a61: T,
    pub a62: T,
    pub a63: T,
    pub a64: T,
    pub a65: T,
    pub b1: T,
    pub b2: T,
    pub b3: T,
    pub b4: T,
    pub b5: T,
    pub b6: T,
    pub btilde1: T,
    pub btilde2: T,
    pub btilde3: T,
    pub btilde4: T,
    pub btilde5: T,
    pub btilde6: T,
    pub btilde7: T,
}

impl<T: RealField> Tsit5Tableau<T> {
    pub fn new() -> Self {
        Tsit5Tableau {
            c2: lit(0.161),
            c3: lit(0.327),
            c4: lit(0.9),
            c5: lit(0.9800255409045097),
            a21: lit(0.161),
            a31: lit(-0.008480655492356989),
            a32: lit(0.335480655492357),
            a41: lit(2.8971530571054935),
            a42: lit(-6.359448489975075),
            a43: lit(4.3622954328695815),
            a51: lit(5.325864828439257),
            a52: lit(-11.748883564062828),
            a53: lit(7.4955393428898365),
            a54: lit(-0.09249506636175525),
            a61: lit(5.86145544294642),
            a62: lit(-12.92096931784711),
            a63: lit(8.159367898576159),
            a64: lit(-0.071584973281401),
            a65: lit(-0.028269050394068383),
            b1: lit(0.09646076681806523),
            b2: lit(0.01),
            b3: lit(0.4798896504144996),
            b4: lit(1.379008574103742),
            b5: lit(-3.290069515436081),
            b6: lit(2.324710524099774),
            btilde1: lit(-1.780011052226e-3),
            btilde2: lit(-8.164344596567e-4),
            btilde3: lit(7.880878010262e-3),
            btilde4: lit(-1.447110071732629e-1),
            btilde5: lit(5.823571654525552e-1),
            btilde6: lit(-4.580821059291869e-1),
            btilde7: lit(1.515151515151515e-2),
        }
    }
}

impl<T: RealField> Default for Tsit5Tableau<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Bogacki-Shampine 5(4), the eight-stage pair with two independent error
/// estimators.
///
/// `bhat` is the full fourth-order companion weight vector; `btilde` is the
/// second estimator row, which sums to zero and is applied about `u`.
#[derive(Debug, Clone)]
pub struct BS5Tableau<T> {
    pub c2: T,
    pub c3: T,
    pub c4: T,
    pub c5: T,
    pub c6: T,
    pub a21: T,
    pub a31: T,
    pub a32: T,
    pub a41: T,
    pub a42: T,
    pub a43: T,
    pub a51: T,
    pub a52: T,
    pub a53: T,
    pub a54: T,
    pub a61: T,
    pub a62: T,
    pub a63: T,
    pub a64: T,
    pub a65: T,
    pub a71: T,
    pub a72: T,
    pub a73: T,
    pub a74: T,
    pub a75: T,
    pub a76: T,
    /// the eighth stage row equals the propagating weights b1..b7 (FSAL)
    pub b1: T,
    pub b3: T,
    pub b4: T,
    pub b5: T,
    pub b6: T,
    pub b7: T,
    pub bhat1: T,
    pub bhat3: T,
    pub bhat4: T,
    pub bhat5: T,
    pub bhat6: T,
    pub bhat7: T,
    pub bhat8: T,
    pub btilde1: T,
    pub btilde3: T,
    pub btilde4: T,
    pub btilde5: T,
    pub btilde6: T,
}

impl<T: RealField> BS5Tableau<T> {
    pub fn new() -> Self {
        BS5Tableau {
            c2: rat(1.0, 6.0),
            c3: rat(2.0, 9.0),
            c4: rat(3.0, 7.0),
            c5: rat(2.0, 3.0),
            c6: rat(3.0, 4.0),
            a21: rat(1.0, 6.0),
            a31: rat(2.0, 27.0),
            a32: rat(4.0, 27.0),
            a41: rat(183.0, 1372.0),
            a42: rat(-162.0, 343.0),
            a43: rat(1053.0, 1372.0),
            a51: rat(68.0, 297.0),
            a52: rat(-4.0, 11.0),
            a53: rat(42.0, 143.0),
            a54: rat(1960.0, 3861.0),
            a61: rat(597.0, 22528.0),
            a62: rat(81.0, 352.0),
            a63: rat(63099.0, 585728.0),
            a64: rat(58653.0, 366080.0),
            a65: rat(4617.0, 20480.0),
            a71: rat(174197.0, 959244.0),
            a72: rat(-30942.0, 79937.0),
            a73: rat(8152137.0, 19744439.0),
            a74: rat(666106.0, 1039181.0),
            a75: rat(-29421.0, 29068.0),
            a76: rat(482048.0, 414219.0),
            b1: rat(587.0, 8064.0),
            b3: rat(4440339.0, 15491840.0),
            b4: rat(24353.0, 124800.0),
            b5: rat(387.0, 44800.0),
            b6: rat(2152.0, 5985.0),
            b7: rat(7267.0, 94080.0),
            bhat1: rat(2479.0, 34992.0),
            bhat3: rat(123.0, 416.0),
            bhat4: rat(612941.0, 3411720.0),
            bhat5: rat(43.0, 1440.0),
            bhat6: rat(2272.0, 6561.0),
            bhat7: rat(79937.0, 1113912.0),
            bhat8: rat(3293.0, 556956.0),
            btilde1: rat(-3.0, 1280.0),
            btilde3: rat(6561.0, 632320.0),
            btilde4: rat(-343.0, 20800.0),
            btilde5: rat(243.0, 12800.0),
            btilde6: rat(-1.0, 95.0),
        }
    }
}

impl<T: RealField> Default for BS5Tableau<T> {
    fn default() -> Self {
        Self::new()
    }
}
