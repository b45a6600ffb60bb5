//! BigInteger arithmetic checked against `num-bigint`.

use neo_legacy_vm::BigInteger;
use num_bigint::{BigInt, Sign};
use num_traits::{ToPrimitive, Zero};
use proptest::prelude::*;

fn pair(bytes: &[u8]) -> (BigInteger, BigInt) {
    (
        BigInteger::from_bytes_le(bytes),
        BigInt::from_signed_bytes_le(bytes),
    )
}

fn operand() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        proptest::collection::vec(any::<u8>(), 0..5),
        proptest::collection::vec(any::<u8>(), 0..40),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn byte_encoding_matches(bytes in operand()) {
        let (ours, theirs) = pair(&bytes);
        prop_assert_eq!(ours.to_byte_array(), theirs.to_signed_bytes_le());
        prop_assert_eq!(ours.byte_len(), theirs.to_signed_bytes_le().len());
        prop_assert_eq!(ours.to_string(), theirs.to_string());
        prop_assert_eq!(ours.is_zero(), theirs.is_zero());
    }

    #[test]
    fn additive_ops_match(a in operand(), b in operand()) {
        let (x, bx) = pair(&a);
        let (y, by) = pair(&b);
        prop_assert_eq!((&x + &y).to_string(), (&bx + &by).to_string());
        prop_assert_eq!((&x - &y).to_string(), (&bx - &by).to_string());
        prop_assert_eq!((-x.clone()).to_string(), (-bx.clone()).to_string());
        prop_assert_eq!(x.abs().to_string(), num_traits::Signed::abs(&bx).to_string());
    }

    #[test]
    fn multiplicative_ops_match(a in operand(), b in operand()) {
        let (x, bx) = pair(&a);
        let (y, by) = pair(&b);
        prop_assert_eq!((&x * &y).to_string(), (&bx * &by).to_string());

        if by.is_zero() {
            prop_assert!(x.checked_div(&y).is_none());
            prop_assert!(x.checked_rem(&y).is_none());
        } else {
            let quotient = x.checked_div(&y).expect("non-zero divisor");
            let remainder = x.checked_rem(&y).expect("non-zero divisor");
            prop_assert_eq!(quotient.to_string(), (&bx / &by).to_string());
            prop_assert_eq!(remainder.to_string(), (&bx % &by).to_string());
        }
    }

    #[test]
    fn bitwise_ops_match(a in operand(), b in operand()) {
        let (x, bx) = pair(&a);
        let (y, by) = pair(&b);
        prop_assert_eq!((&x & &y).to_string(), (&bx & &by).to_string());
        prop_assert_eq!((&x | &y).to_string(), (&bx | &by).to_string());
        prop_assert_eq!((&x ^ &y).to_string(), (&bx ^ &by).to_string());
        prop_assert_eq!((!x.clone()).to_string(), (-(&bx + BigInt::from(1))).to_string());
    }

    #[test]
    fn shifts_match(a in operand(), shift in 0u32..200) {
        let (x, bx) = pair(&a);
        prop_assert_eq!((&x << shift as i32).to_string(), (&bx << shift as usize).to_string());
        prop_assert_eq!((&x >> shift as i32).to_string(), (&bx >> shift as usize).to_string());
    }

    #[test]
    fn ordering_and_narrowing_match(a in operand(), b in operand()) {
        let (x, bx) = pair(&a);
        let (y, by) = pair(&b);
        prop_assert_eq!(x.cmp(&y), bx.cmp(&by));
        prop_assert_eq!(x == y, bx == by);
        prop_assert_eq!(x.to_i32(), bx.to_i32());
        prop_assert_eq!(x.to_i64(), bx.to_i64());
        let expected_sign = match bx.sign() {
            Sign::Minus => -1,
            Sign::NoSign => 0,
            Sign::Plus => 1,
        };
        prop_assert_eq!(x.signum(), expected_sign);
    }
}

#[test]
fn test_canonical_values_compare_equal() {
    let from_wide = BigInteger::from_bytes_le(&[0x05, 0x00, 0x00, 0x00, 0x00]);
    assert_eq!(from_wide, BigInteger::from(5));
    assert_eq!(
        BigInteger::from_bytes_le(&[0xFF, 0xFF]),
        BigInteger::from(-1)
    );
    assert_eq!(BigInteger::from(i64::MIN).to_i64(), Some(i64::MIN));
    assert_eq!(BigInteger::from(i32::MIN as i64).to_i32(), Some(i32::MIN));
}
