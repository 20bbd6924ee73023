use propsmt::BitVector;

#[test]
fn test_concat_slice_roundtrip() {
    let a = BitVector::from_u64(0b1011, 4);
    let b = BitVector::from_u64(0b001101, 6);
    let c = a.concat(&b);
    assert_eq!(c.width(), 10);
    assert_eq!(c.slice(5, 0), b);
    assert_eq!(c.slice(9, 6), a);
}

#[test]
fn test_concat_width_one() {
    let a = BitVector::one(1);
    let b = BitVector::zero(1);
    let c = a.concat(&b);
    assert_eq!(c.width(), 2);
    assert_eq!(c.to_u64(), 0b10);
}

#[test]
fn test_add_neg_cancels() {
    for v in [0u64, 1, 17, 200, 255] {
        let a = BitVector::from_u64(v, 8);
        let zero = BitVector::zero(8);
        assert!(a.add(&zero.sub(&a)).is_zero());
    }
}

#[test]
fn test_mod_inverse_roundtrip() {
    for v in [1u64, 3, 99, 255] {
        let a = BitVector::from_u64(v, 8);
        assert!(a.mul(&a.mod_inverse()).is_one());
    }
}

#[test]
fn test_shift_saturates_at_width() {
    let a = BitVector::from_u64(0xAB, 8);
    for s in [8u64, 9, 200] {
        assert!(a.shl(&BitVector::from_u64(s, 8)).is_zero());
        assert!(a.lshr(&BitVector::from_u64(s, 8)).is_zero());
    }
}

#[test]
fn test_division_conventions() {
    let x = BitVector::from_u64(0x5a, 8);
    let zero = BitVector::zero(8);
    assert!(x.udiv(&zero).is_ones());
    assert_eq!(x.urem(&zero), x);
}

#[test]
fn test_counting_primitives() {
    let v = BitVector::from_u64(0b00101000, 8);
    assert_eq!(v.num_trailing_zeros(), 3);
    assert_eq!(v.num_leading_zeros(), 2);
    assert_eq!(v.count_ones(), 2);
    assert_eq!(v.power_of_two(), -1);
    assert_eq!(BitVector::from_u64(64, 8).power_of_two(), 6);
    assert_eq!(BitVector::zero(8).num_trailing_zeros(), 8);
}

#[test]
fn test_unsigned_compare() {
    let a = BitVector::from_u64(0x80, 8);
    let b = BitVector::from_u64(0x7f, 8);
    assert!(b.ult(&a));
    assert!(!a.ult(&b));
    assert!(!a.ult(&a));
}

#[test]
fn test_hamming() {
    let a = BitVector::from_u64(0b1100, 4);
    let b = BitVector::from_u64(0b1010, 4);
    assert_eq!(a.hamming_distance(&b), 2);
    assert_eq!(a.hamming_distance(&a), 0);
}

#[test]
fn test_width_one_semantics() {
    let t = BitVector::one(1);
    let f = BitVector::zero(1);
    assert!(t.is_true() && !t.is_false());
    assert!(f.is_false() && !f.is_true());
    assert!(t.not().is_false());
}

#[test]
fn test_umul_overflow_boundary() {
    // 2^4 * 2^4 = 2^8 overflows at width 8, 15 * 17 = 255 does not
    let a = BitVector::from_u64(16, 8);
    assert!(a.umul_overflow(&a));
    let b = BitVector::from_u64(15, 8);
    let c = BitVector::from_u64(17, 8);
    assert!(!b.umul_overflow(&c));
}
