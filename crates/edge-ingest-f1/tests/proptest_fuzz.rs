//! Property-based fuzz tests for the F1 packet decoder.
//!
//! The decoder sits directly on a UDP socket; it must never panic on whatever
//! arrives there.

use edge_ingest_f1::{builders, decode, packets};
use proptest::prelude::*;

const F1_PACKET_MAX: usize = 2048;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_random_bytes_no_panic(
        data in proptest::collection::vec(any::<u8>(), 0..F1_PACKET_MAX)
    ) {
        let _ = decode(&data);
    }

    /// Valid header, random body of random length, every consumed packet id.
    #[test]
    fn prop_valid_header_random_body_no_panic(
        packet_id in prop::sample::select(vec![0u8, 1, 2, 6, 7, 10]),
        format in prop::sample::select(vec![packets::FORMAT_2023, packets::FORMAT_2024]),
        player in 0u8..22,
        body in proptest::collection::vec(any::<u8>(), 0..1400)
    ) {
        let mut raw = builders::header(format, packet_id, 1, player);
        raw.extend_from_slice(&body);
        let _ = decode(&raw);
    }

    /// Truncating a valid lap-data packet anywhere yields an error, never a tick.
    #[test]
    fn prop_truncated_lap_data_is_error(cut in 0usize..1129) {
        let raw = builders::lap_data(packets::FORMAT_2023, 1, 0, &[]);
        prop_assert!(decode(&raw[..cut]).is_err());
    }
}
