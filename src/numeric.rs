//! Exact rational arithmetic for monetary quantities (spec §4.1, component
//! C1). Every `Numeric` carries an explicit denominator — two values that
//! are mathematically equal but were produced with different denominators
//! (`1/2` vs `50/100`) are `==` only after `convert`-ing to a common one,
//! mirroring `gnc_numeric` in `examples/original_source/src/engine/
//! Transaction.c` (which this crate does not vendor, since the original's
//! rational arithmetic lives in a header this pack didn't retrieve — the
//! behavior below is reconstructed from spec §4.1's operation list).
//!
//! Overflow is never silent: every operation that can overflow i64 returns
//! a `LedgerError::Overflow`, and `NEVER` rounding that would lose
//! precision returns `LedgerError::InexactConversion`.

use crate::errors::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How to reduce an exact rational result down to a target denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Round half away from zero.
    Round,
    /// Truncate toward zero.
    Truncate,
    /// Round toward negative infinity.
    Floor,
    /// Round toward positive infinity.
    Ceil,
    /// Fail with `InexactConversion` unless the result is already exact.
    Never,
    /// Reduce the fraction to lowest terms instead of rescaling it.
    Reduce,
}

/// Target denominator for a conversion or a binary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denom {
    /// Rescale to this exact denominator.
    Fixed(u64),
    /// Preserve exactness where possible: the least common denominator of
    /// the operands, reduced to lowest terms.
    Auto,
    /// Choose the smallest power-of-ten denominator giving this many
    /// significant figures.
    SigFigs(u8),
}

/// An exact rational `numerator / denominator`, denominator always > 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Numeric {
    numerator: i64,
    denominator: u64,
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl Numeric {
    pub fn zero() -> Self {
        Numeric { numerator: 0, denominator: 1 }
    }

    /// Construct `n/d`. A zero denominator is a programmer error (spec
    /// §7.1): it is reported and clamped to 1 rather than propagated.
    pub fn create(n: i64, d: u64) -> Self {
        if d == 0 {
            log::warn!("Numeric::create with zero denominator, clamping to 1");
            return Numeric { numerator: n, denominator: 1 };
        }
        Numeric { numerator: n, denominator: d }
    }

    pub fn numerator(&self) -> i64 {
        self.numerator
    }

    pub fn denominator(&self) -> u64 {
        self.denominator
    }

    pub fn neg(&self) -> Self {
        Numeric { numerator: -self.numerator, denominator: self.denominator }
    }

    pub fn positive_p(&self) -> bool {
        self.numerator > 0
    }

    pub fn negative_p(&self) -> bool {
        self.numerator < 0
    }

    pub fn zero_p(&self) -> bool {
        self.numerator == 0
    }

    /// Checks whether this value is well-formed. Construction already
    /// guarantees a non-zero denominator, so this mostly exists as the
    /// explicit status query spec §4.1 asks for.
    pub fn check(&self) -> Result<()> {
        if self.denominator == 0 {
            return Err(LedgerError::Overflow);
        }
        Ok(())
    }

    /// Total order on the rational values (not on their representations).
    pub fn compare(&self, other: &Numeric) -> std::cmp::Ordering {
        let a = self.numerator as i128 * other.denominator as i128;
        let b = other.numerator as i128 * self.denominator as i128;
        a.cmp(&b)
    }

    pub fn equal(&self, other: &Numeric) -> bool {
        self.compare(other) == std::cmp::Ordering::Equal
    }

    pub fn add(&self, other: &Numeric, denom: Denom, rounding: Rounding) -> Result<Numeric> {
        let common = lcm(self.denominator, other.denominator);
        let a = scale_numerator(self.numerator, common / self.denominator)?;
        let b = scale_numerator(other.numerator, common / other.denominator)?;
        let num = (a as i128) + (b as i128);
        finish(num, common as i128, denom, rounding)
    }

    pub fn sub(&self, other: &Numeric, denom: Denom, rounding: Rounding) -> Result<Numeric> {
        self.add(&other.neg(), denom, rounding)
    }

    pub fn mul(&self, other: &Numeric, denom: Denom, rounding: Rounding) -> Result<Numeric> {
        let num = self.numerator as i128 * other.numerator as i128;
        let den = self.denominator as i128 * other.denominator as i128;
        finish(num, den, denom, rounding)
    }

    pub fn div(&self, other: &Numeric, denom: Denom, rounding: Rounding) -> Result<Numeric> {
        if other.numerator == 0 {
            return Err(LedgerError::Overflow);
        }
        let mut num = self.numerator as i128 * other.denominator as i128;
        let mut den = self.denominator as i128 * other.numerator as i128;
        if den < 0 {
            num = -num;
            den = -den;
        }
        finish(num, den, denom, rounding)
    }

    /// Re-express `self` with the given target denominator/rounding.
    pub fn convert(&self, denom: Denom, rounding: Rounding) -> Result<Numeric> {
        finish(self.numerator as i128, self.denominator as i128, denom, rounding)
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

fn lcm(a: u64, b: u64) -> u64 {
    a / gcd(a, b) * b
}

fn scale_numerator(n: i64, factor: u64) -> Result<i64> {
    i64::try_from(n as i128 * factor as i128).map_err(|_| LedgerError::Overflow)
}

/// Shared tail of every arithmetic op: reduce the exact rational
/// `num/den` (den > 0) to the requested target denominator.
fn finish(num: i128, den: i128, denom: Denom, rounding: Rounding) -> Result<Numeric> {
    debug_assert!(den > 0);

    let target: i128 = match denom {
        Denom::Fixed(d) => d as i128,
        Denom::Auto => {
            // Preserve exactness: reduce the exact fraction to lowest terms.
            let g = gcd_i128(num.unsigned_abs() as u64, den as u64) as i128;
            let g = g.max(1);
            return finish(num / g, den / g, Denom::Fixed((den / g) as u64), Rounding::Never);
        }
        Denom::SigFigs(figs) => sigfigs_denom(num, den, figs),
    };

    if rounding == Rounding::Reduce {
        let g = gcd_i128(num.unsigned_abs() as u64, den as u64).max(1) as i128;
        let reduced_num = num / g;
        let reduced_den = den / g;
        let n = i64::try_from(reduced_num).map_err(|_| LedgerError::Overflow)?;
        let d = u64::try_from(reduced_den).map_err(|_| LedgerError::Overflow)?;
        return Ok(Numeric::create(n, d));
    }

    // Rescale num/den to target/<that> : new_num = num * target / den
    let scaled_num = num.checked_mul(target).ok_or(LedgerError::Overflow)?;
    let (q, r) = (scaled_num / den, scaled_num % den);

    let rounded = if r == 0 {
        q
    } else {
        match rounding {
            Rounding::Never => return Err(LedgerError::InexactConversion),
            Rounding::Truncate => q,
            Rounding::Floor => {
                if (r < 0) != (den < 0) { q - 1 } else { q }
            }
            Rounding::Ceil => {
                if (r < 0) == (den < 0) { q + 1 } else { q }
            }
            Rounding::Round => {
                if 2 * r.abs() >= den.abs() {
                    if (scaled_num < 0) != (den < 0) { q - 1 } else { q + 1 }
                } else {
                    q
                }
            }
            Rounding::Reduce => unreachable!("handled above"),
        }
    };

    let n = i64::try_from(rounded).map_err(|_| LedgerError::Overflow)?;
    let d = u64::try_from(target).map_err(|_| LedgerError::Overflow)?;
    Ok(Numeric::create(n, d))
}

fn gcd_i128(a: u64, b: u64) -> u64 {
    gcd(a, b)
}

/// Pick the smallest power-of-ten denominator that represents `num/den`
/// with `figs` significant figures. This is a pragmatic reading of
/// `GNC_DENOM_SIGFIGS`: GnuCash uses it only for computed share prices
/// (`xaccSplitGetSharePrice`), never for stored amounts, so exactness
/// elsewhere is unaffected.
fn sigfigs_denom(num: i128, den: i128, figs: u8) -> i128 {
    if num == 0 {
        return 10i128.pow(figs as u32);
    }
    let value = (num as f64 / den as f64).abs();
    let magnitude = if value >= 1.0 {
        value.log10().floor() as i32 + 1
    } else {
        value.log10().ceil() as i32
    };
    let exp = figs as i32 - magnitude;
    if exp >= 0 {
        10i128.pow(exp as u32)
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_common_denominator() {
        let a = Numeric::create(100, 100);
        let b = Numeric::create(-100, 100);
        let sum = a.add(&b, Denom::Fixed(100), Rounding::Never).unwrap();
        assert!(sum.zero_p());
    }

    #[test]
    fn test_convert_exact() {
        let a = Numeric::create(1, 2);
        let b = a.convert(Denom::Fixed(100), Rounding::Never).unwrap();
        assert_eq!(b, Numeric::create(50, 100));
    }

    #[test]
    fn test_convert_inexact_never_fails() {
        let a = Numeric::create(1, 3);
        let err = a.convert(Denom::Fixed(100), Rounding::Never).unwrap_err();
        assert_eq!(err, LedgerError::InexactConversion);
    }

    #[test]
    fn test_convert_round() {
        let a = Numeric::create(1, 3);
        let b = a.convert(Denom::Fixed(100), Rounding::Round).unwrap();
        assert_eq!(b, Numeric::create(33, 100));
    }

    #[test]
    fn test_mul_share_price() {
        let amount = Numeric::create(10, 1);
        let price = Numeric::create(12050, 100); // 120.50
        let value = amount.mul(&price, Denom::Fixed(100), Rounding::Round).unwrap();
        assert_eq!(value, Numeric::create(120500, 100));
    }

    #[test]
    fn test_compare_cross_denominator() {
        let a = Numeric::create(1, 2);
        let b = Numeric::create(50, 100);
        assert!(a.equal(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_auto_reduces() {
        let a = Numeric::create(50, 100);
        let r = a.convert(Denom::Auto, Rounding::Never).unwrap();
        assert_eq!(r, Numeric::create(1, 2));
    }

    #[test]
    fn test_overflow_reported() {
        let a = Numeric::create(i64::MAX, 1);
        let b = Numeric::create(1, 1);
        let err = a.add(&b, Denom::Fixed(1), Rounding::Never).unwrap_err();
        assert_eq!(err, LedgerError::Overflow);
    }
}
