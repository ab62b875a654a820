//! Property tests for the codec invariants: insert/extract identity,
//! physical round-trips, and preservation of untouched payload bits.

use ccs_dbc::codec::{extract_bits, insert_bits, physical_to_raw, raw_to_physical};
use ccs_dbc::ByteOrder;
use proptest::prelude::*;

/// Layouts whose whole bit range stays inside the 8-byte payload. Both bit
/// orders walk the same global positions forward, so `start + len <= 64`
/// keeps either order in bounds.
fn in_payload_layout() -> impl Strategy<Value = (u16, u16, ByteOrder)> {
    (1u16..=64)
        .prop_flat_map(|len| (0..=64 - len, Just(len)))
        .prop_flat_map(|(start, len)| {
            (
                Just(start),
                Just(len),
                prop_oneof![Just(ByteOrder::LittleEndian), Just(ByteOrder::BigEndian)],
            )
        })
}

proptest! {
    #[test]
    fn insert_then_extract_is_identity(
        (start, len, order) in in_payload_layout(),
        value in any::<u64>(),
    ) {
        let masked = if len == 64 { value } else { value & ((1u64 << len) - 1) };
        let mut data = [0u8; 8];
        insert_bits(&mut data, start, len, order, masked);
        prop_assert_eq!(extract_bits(&data, start, len, order), masked);
    }

    #[test]
    fn insert_preserves_untouched_bits(
        (start, len, order) in in_payload_layout(),
        value in any::<u64>(),
        background in any::<[u8; 8]>(),
    ) {
        let masked = if len == 64 { value } else { value & ((1u64 << len) - 1) };

        let mut data = background;
        insert_bits(&mut data, start, len, order, masked);

        // Undo the insertion bit range on a copy of the background and
        // compare: every bit outside the range must be untouched.
        let mut mask = [0u8; 8];
        insert_bits(&mut mask, start, len, order, u64::MAX);
        for i in 0..8 {
            prop_assert_eq!(data[i] & !mask[i], background[i] & !mask[i]);
        }
    }

    #[test]
    fn physical_roundtrip_is_within_one_factor(
        raw in 0u64..=0xFFFF,
        factor in prop_oneof![Just(0.1f64), Just(1.0), Just(0.5), Just(100.0)],
        offset in prop_oneof![Just(0.0f64), Just(-3250.0), Just(40.0)],
    ) {
        let physical = raw_to_physical(raw, factor, offset, false, 16);
        let back = physical_to_raw(physical, factor, offset);
        let roundtrip = raw_to_physical(back, factor, offset, false, 16);
        prop_assert!((roundtrip - physical).abs() <= factor);
    }

    #[test]
    fn zero_factor_never_divides(physical in any::<f64>()) {
        prop_assert_eq!(physical_to_raw(physical, 0.0, 123.0), 0);
    }
}
