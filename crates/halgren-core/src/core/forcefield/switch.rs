/// Quintic multiplicative switch that takes a potential smoothly to zero.
///
/// The polynomial is 1 with zero first and second derivatives at `cut`, and
/// 0 with zero first and second derivatives at `off`. Below `cut` the switch
/// is the identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultiplicativeSwitch {
    cut: f64,
    off: f64,
    cut2: f64,
    off2: f64,
    c: [f64; 6],
}

impl MultiplicativeSwitch {
    pub fn new(cut: f64, off: f64) -> Self {
        let cut2 = cut * cut;
        let off2 = off * off;
        let c = if off > cut {
            let denom = (off - cut).powi(5);
            [
                off * off2 * (off2 - 5.0 * off * cut + 10.0 * cut2) / denom,
                -30.0 * off2 * cut2 / denom,
                30.0 * (off2 * cut + off * cut2) / denom,
                -10.0 * (off2 + 4.0 * off * cut + cut2) / denom,
                15.0 * (off + cut) / denom,
                -6.0 / denom,
            ]
        } else {
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        };
        Self {
            cut,
            off,
            cut2,
            off2,
            c,
        }
    }

    /// A switch that starts at `taper * off`.
    pub fn from_taper(off: f64, taper: f64) -> Self {
        Self::new(taper * off, off)
    }

    #[inline]
    pub fn cut(&self) -> f64 {
        self.cut
    }

    #[inline]
    pub fn off(&self) -> f64 {
        self.off
    }

    #[inline]
    pub fn off2(&self) -> f64 {
        self.off2
    }

    #[inline]
    pub fn coefficients(&self) -> &[f64; 6] {
        &self.c
    }

    /// Returns `(taper, dtaper/dr)` at separation `r` (with `r2 = r * r`).
    #[inline]
    pub fn evaluate(&self, r: f64, r2: f64) -> (f64, f64) {
        if r2 <= self.cut2 {
            return (1.0, 0.0);
        }
        let [c0, c1, c2, c3, c4, c5] = self.c;
        let r3 = r2 * r;
        let r4 = r2 * r2;
        let r5 = r2 * r3;
        let taper = c5 * r5 + c4 * r4 + c3 * r3 + c2 * r2 + c1 * r + c0;
        let dtaper = 5.0 * c5 * r4 + 4.0 * c4 * r3 + 3.0 * c3 * r2 + 2.0 * c2 * r + c1;
        (taper, dtaper)
    }

    /// Second derivative of the polynomial, zero below the switch start.
    pub fn second_derivative(&self, r: f64) -> f64 {
        if r * r <= self.cut2 {
            return 0.0;
        }
        let [_, _, c2, c3, c4, c5] = self.c;
        20.0 * c5 * r.powi(3) + 12.0 * c4 * r * r + 6.0 * c3 * r + 2.0 * c2
    }
}
