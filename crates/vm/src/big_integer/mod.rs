//! Arbitrary-precision signed integers for the Neo Virtual Machine.
//!
//! [`BigInteger`] is an immutable sign-magnitude value. Anything that fits in
//! 31 bits plus sign lives inline in `sign`; larger magnitudes are kept as a
//! trimmed little-endian word array with `sign` reduced to +1/-1. The encoding
//! is canonical, so derived equality and hashing agree with numeric equality.

mod builder;

use builder::{BigIntegerBuilder, compare_magnitudes};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, BitAnd, BitOr, BitXor, Mul, Neg, Not, Shl, Shr, Sub};

/// Canonical arbitrary-precision signed integer.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BigInteger {
    /// The value itself when `bits` is `None`, otherwise +1 or -1.
    sign: i32,
    /// Magnitude words, least significant first, never with a zero top word.
    bits: Option<Box<[u32]>>,
}

impl BigInteger {
    pub const ZERO: Self = Self { sign: 0, bits: None };
    pub const ONE: Self = Self { sign: 1, bits: None };
    pub const MINUS_ONE: Self = Self { sign: -1, bits: None };

    fn from_magnitude(negative: bool, mut magnitude: Vec<u32>) -> Self {
        while magnitude.last() == Some(&0) {
            magnitude.pop();
        }
        match magnitude.as_slice() {
            [] => Self::ZERO,
            [word] if *word <= i32::MAX as u32 => {
                let value = *word as i32;
                Self {
                    sign: if negative { -value } else { value },
                    bits: None,
                }
            }
            _ => Self {
                sign: if negative { -1 } else { 1 },
                bits: Some(magnitude.into_boxed_slice()),
            },
        }
    }

    pub fn from_i64(value: i64) -> Self {
        if value > i64::from(i32::MIN) && value <= i64::from(i32::MAX) {
            return Self {
                sign: value as i32,
                bits: None,
            };
        }
        let magnitude = value.unsigned_abs();
        Self::from_magnitude(value < 0, vec![magnitude as u32, (magnitude >> 32) as u32])
    }

    pub fn from_u64(value: u64) -> Self {
        Self::from_magnitude(false, vec![value as u32, (value >> 32) as u32])
    }

    /// Decodes a little-endian two's-complement byte string. Empty input is zero.
    pub fn from_bytes_le(bytes: &[u8]) -> Self {
        let Some(&last) = bytes.last() else {
            return Self::ZERO;
        };
        let fill = if last & 0x80 != 0 { 0xFF } else { 0x00 };
        let words = bytes
            .chunks(4)
            .map(|chunk| {
                let mut buf = [fill; 4];
                buf[..chunk.len()].copy_from_slice(chunk);
                u32::from_le_bytes(buf)
            })
            .collect();
        Self::from_twos_complement(words)
    }

    /// Minimal little-endian two's-complement encoding. Zero encodes as `[0]`.
    pub fn to_byte_array(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = self
            .to_twos_complement()
            .iter()
            .flat_map(|word| word.to_le_bytes())
            .collect();
        while bytes.len() > 1 {
            let last = bytes[bytes.len() - 1];
            let prev = bytes[bytes.len() - 2];
            if (last == 0x00 && prev & 0x80 == 0) || (last == 0xFF && prev & 0x80 != 0) {
                bytes.pop();
            } else {
                break;
            }
        }
        bytes
    }

    /// Length of [`Self::to_byte_array`].
    pub fn byte_len(&self) -> usize {
        match &self.bits {
            None => {
                let v = self.sign;
                if (-0x80..0x80).contains(&v) {
                    1
                } else if (-0x8000..0x8000).contains(&v) {
                    2
                } else if (-0x80_0000..0x80_0000).contains(&v) {
                    3
                } else {
                    4
                }
            }
            Some(_) => self.to_byte_array().len(),
        }
    }

    /// -1, 0 or 1.
    pub fn signum(&self) -> i32 {
        match self.bits {
            None => self.sign.signum(),
            Some(_) => self.sign,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.bits.is_none() && self.sign == 0
    }

    pub fn is_one(&self) -> bool {
        self.bits.is_none() && self.sign == 1
    }

    /// Returns the value as `i32`, or `None` if it needs more than 32 bits.
    pub fn to_i32(&self) -> Option<i32> {
        match &self.bits {
            None => Some(self.sign),
            Some(bits) if self.sign < 0 && bits.len() == 1 && bits[0] == 0x8000_0000 => {
                Some(i32::MIN)
            }
            Some(_) => None,
        }
    }

    pub fn to_i64(&self) -> Option<i64> {
        let bits = match &self.bits {
            None => return Some(i64::from(self.sign)),
            Some(bits) if bits.len() <= 2 => bits,
            Some(_) => return None,
        };
        let magnitude = u64::from(bits[0]) | (u64::from(bits.get(1).copied().unwrap_or(0)) << 32);
        if self.sign > 0 {
            i64::try_from(magnitude).ok()
        } else if magnitude == 1 << 63 {
            Some(i64::MIN)
        } else {
            i64::try_from(magnitude).ok().map(|v| -v)
        }
    }

    pub fn abs(&self) -> Self {
        if self.signum() < 0 {
            -self
        } else {
            self.clone()
        }
    }

    /// Truncating division. `None` when `divisor` is zero.
    pub fn checked_div(&self, divisor: &Self) -> Option<Self> {
        if divisor.is_zero() {
            return None;
        }
        if let (None, None) = (&self.bits, &divisor.bits) {
            return Some(Self::from_i64(i64::from(self.sign) / i64::from(divisor.sign)));
        }
        let (mut num, num_sign) = BigIntegerBuilder::new(self);
        let (den, den_sign) = BigIntegerBuilder::new(divisor);
        let quotient = num.div_rem(&den);
        Some(quotient.get_integer(num_sign * den_sign))
    }

    /// Remainder carrying the dividend's sign. `None` when `divisor` is zero.
    pub fn checked_rem(&self, divisor: &Self) -> Option<Self> {
        if divisor.is_zero() {
            return None;
        }
        if let (None, None) = (&self.bits, &divisor.bits) {
            return Some(Self::from_i64(i64::from(self.sign) % i64::from(divisor.sign)));
        }
        let (mut num, num_sign) = BigIntegerBuilder::new(self);
        let (den, _) = BigIntegerBuilder::new(divisor);
        num.div_rem(&den);
        Some(num.get_integer(num_sign))
    }

    fn magnitude(&self) -> Vec<u32> {
        match &self.bits {
            Some(bits) => bits.to_vec(),
            None if self.sign == 0 => Vec::new(),
            None => vec![self.sign.unsigned_abs()],
        }
    }

    /// Two's-complement words, sign-extended by one word when the top bit
    /// would otherwise misrepresent the sign.
    fn to_twos_complement(&self) -> Vec<u32> {
        let mut words = self.magnitude();
        if words.is_empty() {
            return vec![0];
        }
        if self.signum() < 0 {
            negate_words(&mut words);
            if words.last().is_some_and(|w| w & 0x8000_0000 == 0) {
                words.push(u32::MAX);
            }
        } else if words.last().is_some_and(|w| w & 0x8000_0000 != 0) {
            words.push(0);
        }
        words
    }

    fn from_twos_complement(mut words: Vec<u32>) -> Self {
        let negative = words.last().is_some_and(|w| w & 0x8000_0000 != 0);
        if negative {
            negate_words(&mut words);
        }
        Self::from_magnitude(negative, words)
    }

    fn bitwise(&self, other: &Self, op: impl Fn(u32, u32) -> u32) -> Self {
        if let (None, None) = (&self.bits, &other.bits) {
            return Self::from_i64(i64::from(op(self.sign as u32, other.sign as u32) as i32));
        }
        let a = self.to_twos_complement();
        let b = other.to_twos_complement();
        let fill_a = if self.signum() < 0 { u32::MAX } else { 0 };
        let fill_b = if other.signum() < 0 { u32::MAX } else { 0 };
        let words = (0..a.len().max(b.len()))
            .map(|i| {
                op(
                    a.get(i).copied().unwrap_or(fill_a),
                    b.get(i).copied().unwrap_or(fill_b),
                )
            })
            .collect();
        Self::from_twos_complement(words)
    }

    fn shift_left(&self, shift: u32) -> Self {
        if self.is_zero() || shift == 0 {
            return self.clone();
        }
        Self::from_magnitude(
            self.signum() < 0,
            builder::shl_words(&self.magnitude(), shift),
        )
    }

    /// Arithmetic right shift: negative values round toward negative infinity.
    fn shift_right(&self, shift: u32) -> Self {
        if self.is_zero() || shift == 0 {
            return self.clone();
        }
        let magnitude = self.magnitude();
        if self.signum() > 0 {
            return Self::from_magnitude(false, builder::shr_words(&magnitude, shift));
        }
        // floor(-m / 2^n) == -(((m - 1) >> n) + 1)
        let reduced = builder::sub_magnitudes(&magnitude, &[1]);
        let shifted = builder::shr_words(&reduced, shift);
        Self::from_magnitude(true, builder::add_magnitudes(&shifted, &[1]))
    }

    fn add_impl(&self, other: &Self) -> Self {
        if let (None, None) = (&self.bits, &other.bits) {
            return Self::from_i64(i64::from(self.sign) + i64::from(other.sign));
        }
        let (mut reg, mut sign) = BigIntegerBuilder::new(self);
        let (other_reg, other_sign) = BigIntegerBuilder::new(other);
        if sign == 0 {
            return other.clone();
        }
        if other_sign == 0 {
            return self.clone();
        }
        if sign == other_sign {
            reg.add(&other_reg);
        } else {
            reg.sub(&other_reg, &mut sign);
        }
        reg.get_integer(sign)
    }

    fn sub_impl(&self, other: &Self) -> Self {
        if let (None, None) = (&self.bits, &other.bits) {
            return Self::from_i64(i64::from(self.sign) - i64::from(other.sign));
        }
        let (mut reg, mut sign) = BigIntegerBuilder::new(self);
        let (other_reg, other_sign) = BigIntegerBuilder::new(other);
        if sign == 0 {
            return -other;
        }
        if other_sign == 0 {
            return self.clone();
        }
        if sign == other_sign {
            reg.sub(&other_reg, &mut sign);
        } else {
            reg.add(&other_reg);
        }
        reg.get_integer(sign)
    }

    fn mul_impl(&self, other: &Self) -> Self {
        if let (None, None) = (&self.bits, &other.bits) {
            return Self::from_i64(i64::from(self.sign) * i64::from(other.sign));
        }
        let (mut reg, sign) = BigIntegerBuilder::new(self);
        let (other_reg, other_sign) = BigIntegerBuilder::new(other);
        reg.mul(&other_reg);
        reg.get_integer(sign * other_sign)
    }
}

/// In-place two's-complement negation over a fixed word width.
fn negate_words(words: &mut [u32]) {
    let mut carry = true;
    for word in words.iter_mut() {
        let (value, overflow) = (!*word).overflowing_add(u32::from(carry));
        *word = value;
        carry = overflow;
    }
}

impl Default for BigInteger {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<i32> for BigInteger {
    fn from(value: i32) -> Self {
        Self::from_i64(i64::from(value))
    }
}

impl From<i64> for BigInteger {
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

impl From<u64> for BigInteger {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<usize> for BigInteger {
    fn from(value: usize) -> Self {
        Self::from_u64(value as u64)
    }
}

impl From<bool> for BigInteger {
    fn from(value: bool) -> Self {
        if value {
            Self::ONE
        } else {
            Self::ZERO
        }
    }
}

impl Ord for BigInteger {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.signum(), other.signum());
        if a != b {
            return a.cmp(&b);
        }
        if let (None, None) = (&self.bits, &other.bits) {
            return self.sign.cmp(&other.sign);
        }
        let ordering = compare_magnitudes(&self.magnitude(), &other.magnitude());
        if a < 0 {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

impl PartialOrd for BigInteger {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Neg for &BigInteger {
    type Output = BigInteger;

    fn neg(self) -> BigInteger {
        BigInteger {
            sign: -self.sign,
            bits: self.bits.clone(),
        }
    }
}

impl Neg for BigInteger {
    type Output = BigInteger;

    fn neg(self) -> BigInteger {
        BigInteger {
            sign: -self.sign,
            bits: self.bits,
        }
    }
}

impl Not for &BigInteger {
    type Output = BigInteger;

    /// Bitwise complement, `-(x + 1)`.
    fn not(self) -> BigInteger {
        -(self + &BigInteger::ONE)
    }
}

impl Not for BigInteger {
    type Output = BigInteger;

    fn not(self) -> BigInteger {
        !&self
    }
}

macro_rules! forward_binop {
    ($imp:ident, $method:ident, $body:expr) => {
        impl $imp<&BigInteger> for &BigInteger {
            type Output = BigInteger;

            fn $method(self, other: &BigInteger) -> BigInteger {
                $body(self, other)
            }
        }

        impl $imp<BigInteger> for BigInteger {
            type Output = BigInteger;

            fn $method(self, other: BigInteger) -> BigInteger {
                $body(&self, &other)
            }
        }

        impl $imp<&BigInteger> for BigInteger {
            type Output = BigInteger;

            fn $method(self, other: &BigInteger) -> BigInteger {
                $body(&self, other)
            }
        }
    };
}

forward_binop!(Add, add, BigInteger::add_impl);
forward_binop!(Sub, sub, BigInteger::sub_impl);
forward_binop!(Mul, mul, BigInteger::mul_impl);
forward_binop!(BitAnd, bitand, |a: &BigInteger, b: &BigInteger| a.bitwise(b, |x, y| x & y));
forward_binop!(BitOr, bitor, |a: &BigInteger, b: &BigInteger| a.bitwise(b, |x, y| x | y));
forward_binop!(BitXor, bitxor, |a: &BigInteger, b: &BigInteger| a.bitwise(b, |x, y| x ^ y));

impl Shl<i32> for &BigInteger {
    type Output = BigInteger;

    /// A negative shift shifts right.
    fn shl(self, shift: i32) -> BigInteger {
        if shift >= 0 {
            self.shift_left(shift as u32)
        } else {
            self.shift_right(shift.unsigned_abs())
        }
    }
}

impl Shr<i32> for &BigInteger {
    type Output = BigInteger;

    /// A negative shift shifts left.
    fn shr(self, shift: i32) -> BigInteger {
        if shift >= 0 {
            self.shift_right(shift as u32)
        } else {
            self.shift_left(shift.unsigned_abs())
        }
    }
}

impl fmt::Display for BigInteger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bits.is_none() {
            return write!(f, "{}", self.sign);
        }
        const CHUNK: u32 = 1_000_000_000;
        let mut words = self.magnitude();
        let mut chunks = Vec::new();
        while !words.is_empty() {
            let (quotient, remainder) = builder::div_rem_word(&words, CHUNK);
            chunks.push(remainder);
            words = quotient;
        }
        if self.sign < 0 {
            f.write_str("-")?;
        }
        let mut iter = chunks.iter().rev();
        if let Some(head) = iter.next() {
            write!(f, "{head}")?;
        }
        for chunk in iter {
            write!(f, "{chunk:09}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for BigInteger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BigInteger({self})")
    }
}
