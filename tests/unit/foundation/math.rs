use super::*;

#[test]
fn mul_div255_endpoints() {
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(0, 255), 0);
    assert_eq!(mul_div255_u8(128, 255), 128);
}

#[test]
fn clamp01_handles_nan() {
    assert_eq!(clamp01(f64::NAN), 0.0);
    assert_eq!(clamp01(2.0), 1.0);
    assert_eq!(clamp01(-1.0), 0.0);
}

#[test]
fn unit_hash_is_stable_and_in_range() {
    let a = unit_hash(42, 3);
    assert_eq!(a, unit_hash(42, 3));
    assert_ne!(a, unit_hash(42, 4));
    for lane in 0..256 {
        let v = unit_hash(7, lane);
        assert!((0.0..1.0).contains(&v));
    }
}

#[test]
fn identity_hash_distinguishes_inputs() {
    assert_eq!(identity_hash(b"cover.png"), identity_hash(b"cover.png"));
    assert_ne!(identity_hash(b"a"), identity_hash(b"b"));
}
