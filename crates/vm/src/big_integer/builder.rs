//! Mutable multi-word register used by [`BigInteger`] arithmetic.
//!
//! The register always holds an unsigned magnitude; callers carry the sign
//! separately and combine it according to the add/sub rules. Values that fit
//! one word stay in `small` so the common case never touches the heap.

use super::BigInteger;
use std::cmp::Ordering;

#[derive(Debug, Clone, Default)]
pub(crate) struct BigIntegerBuilder {
    /// Number of significant words. Zero means the register holds zero.
    len: usize,
    /// Register value while `len <= 1`.
    small: u32,
    /// Register words while `len > 1`; exactly `len` long with a nonzero top word.
    bits: Vec<u32>,
}

impl BigIntegerBuilder {
    /// Loads the magnitude of `value`, returning the register and the sign.
    pub(crate) fn new(value: &BigInteger) -> (Self, i32) {
        let mut builder = Self::default();
        match &value.bits {
            Some(bits) => builder.set_words(bits.to_vec()),
            None if value.sign != 0 => {
                builder.len = 1;
                builder.small = value.sign.unsigned_abs();
            }
            None => {}
        }
        (builder, value.signum())
    }

    fn from_words(words: Vec<u32>) -> Self {
        let mut builder = Self::default();
        builder.set_words(words);
        builder
    }

    fn words(&self) -> &[u32] {
        match self.len {
            0 => &[],
            1 => std::slice::from_ref(&self.small),
            _ => &self.bits,
        }
    }

    fn set_words(&mut self, mut words: Vec<u32>) {
        trim(&mut words);
        match words.len() {
            0 => {
                self.len = 0;
                self.small = 0;
                self.bits.clear();
            }
            1 => {
                self.len = 1;
                self.small = words[0];
                self.bits.clear();
            }
            n => {
                self.len = n;
                self.small = 0;
                self.bits = words;
            }
        }
    }

    fn set_u64(&mut self, value: u64) {
        if value >> 32 == 0 {
            self.len = usize::from(value != 0);
            self.small = value as u32;
            self.bits.clear();
        } else {
            self.set_words(vec![value as u32, (value >> 32) as u32]);
        }
    }

    /// Materializes the register as a canonical integer with the given sign.
    pub(crate) fn get_integer(&self, sign: i32) -> BigInteger {
        if self.len == 0 || sign == 0 {
            return BigInteger::ZERO;
        }
        BigInteger::from_magnitude(sign < 0, self.words().to_vec())
    }

    /// `self += other` on magnitudes.
    pub(crate) fn add(&mut self, other: &Self) {
        if self.len <= 1 && other.len <= 1 {
            self.set_u64(u64::from(self.small) + u64::from(other.small));
            return;
        }
        let sum = add_magnitudes(self.words(), other.words());
        self.set_words(sum);
    }

    /// `self -= other` on magnitudes. When `other` is larger the operands are
    /// swapped and `sign` is flipped.
    pub(crate) fn sub(&mut self, other: &Self, sign: &mut i32) {
        if self.len <= 1 && other.len <= 1 {
            if self.small >= other.small {
                self.set_u64(u64::from(self.small - other.small));
            } else {
                self.set_u64(u64::from(other.small - self.small));
                *sign = -*sign;
            }
            return;
        }
        match compare_magnitudes(self.words(), other.words()) {
            Ordering::Equal => self.set_words(Vec::new()),
            Ordering::Greater => {
                let diff = sub_magnitudes(self.words(), other.words());
                self.set_words(diff);
            }
            Ordering::Less => {
                let diff = sub_magnitudes(other.words(), self.words());
                self.set_words(diff);
                *sign = -*sign;
            }
        }
    }

    /// `self *= other` on magnitudes.
    pub(crate) fn mul(&mut self, other: &Self) {
        if self.len <= 1 && other.len <= 1 {
            self.set_u64(u64::from(self.small) * u64::from(other.small));
            return;
        }
        let product = mul_magnitudes(self.words(), other.words());
        self.set_words(product);
    }

    /// Divides the register by `den`, leaving the remainder in `self` and
    /// returning the quotient. `den` must be nonzero.
    pub(crate) fn div_rem(&mut self, den: &Self) -> Self {
        debug_assert!(den.len > 0, "division by a zero register");

        if self.len <= 1 && den.len == 1 {
            let quotient = self.small / den.small;
            self.set_u64(u64::from(self.small % den.small));
            return Self::from_words(vec![quotient]);
        }
        if compare_magnitudes(self.words(), den.words()) == Ordering::Less {
            return Self::default();
        }
        if den.len == 1 {
            let (quotient, remainder) = div_rem_word(self.words(), den.small);
            self.set_u64(u64::from(remainder));
            return Self::from_words(quotient);
        }

        let (quotient, remainder) = div_rem_knuth(self.words(), den.words());
        self.set_words(remainder);
        Self::from_words(quotient)
    }
}

fn trim(words: &mut Vec<u32>) {
    while words.last() == Some(&0) {
        words.pop();
    }
}

/// Three-way comparison of trimmed magnitudes.
pub(crate) fn compare_magnitudes(a: &[u32], b: &[u32]) -> Ordering {
    a.len()
        .cmp(&b.len())
        .then_with(|| a.iter().rev().cmp(b.iter().rev()))
}

pub(crate) fn add_magnitudes(a: &[u32], b: &[u32]) -> Vec<u32> {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let mut out = Vec::with_capacity(long.len() + 1);
    let mut carry = 0u64;
    for (i, &word) in long.iter().enumerate() {
        let sum = u64::from(word) + u64::from(short.get(i).copied().unwrap_or(0)) + carry;
        out.push(sum as u32);
        carry = sum >> 32;
    }
    if carry != 0 {
        out.push(carry as u32);
    }
    out
}

/// `a - b` where `a >= b`.
pub(crate) fn sub_magnitudes(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(a.len());
    let mut borrow = 0i64;
    for (i, &word) in a.iter().enumerate() {
        let diff = i64::from(word) - i64::from(b.get(i).copied().unwrap_or(0)) - borrow;
        out.push(diff as u32);
        borrow = i64::from(diff < 0);
    }
    debug_assert_eq!(borrow, 0, "magnitude subtraction underflow");
    trim(&mut out);
    out
}

/// Schoolbook O(n*m) multiplication.
pub(crate) fn mul_magnitudes(a: &[u32], b: &[u32]) -> Vec<u32> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0u32; a.len() + b.len()];
    for (i, &x) in a.iter().enumerate() {
        let mut carry = 0u64;
        for (j, &y) in b.iter().enumerate() {
            let t = u64::from(x) * u64::from(y) + u64::from(out[i + j]) + carry;
            out[i + j] = t as u32;
            carry = t >> 32;
        }
        out[i + b.len()] = carry as u32;
    }
    trim(&mut out);
    out
}

/// Short division by a single word.
pub(crate) fn div_rem_word(num: &[u32], den: u32) -> (Vec<u32>, u32) {
    let mut quotient = vec![0u32; num.len()];
    let mut rem = 0u64;
    for i in (0..num.len()).rev() {
        let cur = (rem << 32) | u64::from(num[i]);
        quotient[i] = (cur / u64::from(den)) as u32;
        rem = cur % u64::from(den);
    }
    trim(&mut quotient);
    (quotient, rem as u32)
}

/// Knuth algorithm D. Requires `den.len() >= 2` and `num >= den`.
fn div_rem_knuth(num: &[u32], den: &[u32]) -> (Vec<u32>, Vec<u32>) {
    const BASE: u64 = 1 << 32;
    let m = num.len();
    let n = den.len();
    let shift = den[n - 1].leading_zeros();

    // Normalize so the top denominator word has its high bit set.
    let mut vn = vec![0u32; n];
    for i in (1..n).rev() {
        vn[i] = (den[i] << shift) | (u64::from(den[i - 1]) >> (32 - shift)) as u32;
    }
    vn[0] = den[0] << shift;

    let mut un = vec![0u32; m + 1];
    un[m] = (u64::from(num[m - 1]) >> (32 - shift)) as u32;
    for i in (1..m).rev() {
        un[i] = (num[i] << shift) | (u64::from(num[i - 1]) >> (32 - shift)) as u32;
    }
    un[0] = num[0] << shift;

    let top = u64::from(vn[n - 1]);
    let next = u64::from(vn[n - 2]);
    let mut quotient = vec![0u32; m - n + 1];

    for j in (0..=m - n).rev() {
        let dividend = (u64::from(un[j + n]) << 32) | u64::from(un[j + n - 1]);
        let mut qhat = dividend / top;
        let mut rhat = dividend % top;
        while qhat >= BASE || qhat * next > ((rhat << 32) | u64::from(un[j + n - 2])) {
            qhat -= 1;
            rhat += top;
            if rhat >= BASE {
                break;
            }
        }

        // Multiply and subtract.
        let mut borrow = 0i64;
        for i in 0..n {
            let product = qhat * u64::from(vn[i]);
            let t = i64::from(un[i + j]) - borrow - (product & 0xFFFF_FFFF) as i64;
            un[i + j] = t as u32;
            borrow = (product >> 32) as i64 - (t >> 32);
        }
        let t = i64::from(un[j + n]) - borrow;
        un[j + n] = t as u32;

        quotient[j] = qhat as u32;
        if t < 0 {
            // Trial digit was one too large; add the divisor back.
            quotient[j] = quotient[j].wrapping_sub(1);
            let mut carry = 0u64;
            for i in 0..n {
                let sum = u64::from(un[i + j]) + u64::from(vn[i]) + carry;
                un[i + j] = sum as u32;
                carry = sum >> 32;
            }
            un[j + n] = un[j + n].wrapping_add(carry as u32);
        }
    }

    let mut remainder = vec![0u32; n];
    for i in 0..n - 1 {
        remainder[i] = (un[i] >> shift) | (u64::from(un[i + 1]) << (32 - shift)) as u32;
    }
    remainder[n - 1] = un[n - 1] >> shift;

    trim(&mut quotient);
    trim(&mut remainder);
    (quotient, remainder)
}

pub(crate) fn shl_words(words: &[u32], shift: u32) -> Vec<u32> {
    let word_shift = (shift / 32) as usize;
    let bit_shift = shift % 32;
    let mut out = vec![0u32; word_shift];
    out.reserve(words.len() + 1);
    if bit_shift == 0 {
        out.extend_from_slice(words);
    } else {
        let mut carry = 0u32;
        for &word in words {
            out.push((word << bit_shift) | carry);
            carry = word >> (32 - bit_shift);
        }
        if carry != 0 {
            out.push(carry);
        }
    }
    trim(&mut out);
    out
}

pub(crate) fn shr_words(words: &[u32], shift: u32) -> Vec<u32> {
    let word_shift = (shift / 32) as usize;
    if word_shift >= words.len() {
        return Vec::new();
    }
    let bit_shift = shift % 32;
    let src = &words[word_shift..];
    if bit_shift == 0 {
        return src.to_vec();
    }
    let mut out: Vec<u32> = (0..src.len())
        .map(|i| {
            let high = src.get(i + 1).copied().unwrap_or(0);
            (src[i] >> bit_shift) | (u64::from(high) << (32 - bit_shift)) as u32
        })
        .collect();
    trim(&mut out);
    out
}
