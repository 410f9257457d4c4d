//! Property-based tests
//!
//! Window ownership and carving results must not depend on how the input
//! is cut into windows.

mod common;

use artefact::CarveOptions;
use artefact::domain::repositories::ByteSource;
use artefact::domain::services::ChunkScanner;
use common::*;
use proptest::prelude::*;
use std::sync::Arc;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn owned_ranges_partition_any_input(
        len in 0usize..4000,
        chunk in 1usize..700,
        overlap in 0usize..300,
    ) {
        let input: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let source: Arc<dyn ByteSource> = Arc::new(input.clone());

        let mut covered = 0u64;
        for window in ChunkScanner::new(source, chunk, overlap) {
            let window = window.unwrap();
            prop_assert_eq!(window.start(), covered);
            let start = window.start() as usize;
            prop_assert_eq!(window.data(), &input[start..start + window.len()]);
            covered = window.owned_end();
        }
        prop_assert_eq!(covered, len as u64);
    }

    #[test]
    fn embedded_jpeg_is_reproduced_byte_for_byte(
        prefix in 0usize..3000,
        suffix in 0usize..3000,
        body in 0usize..5000,
        chunk in 16usize..2048,
        overlap in 7usize..64,
        seed in any::<u64>(),
    ) {
        let file = jpeg(body);
        let mut input = noise(prefix, seed);
        input.extend_from_slice(&file);
        input.extend(noise(suffix, seed.wrapping_add(1)));

        let options = CarveOptions::new()
            .with_formats(["jpg"])
            .with_chunk_size(chunk)
            .with_overlap_size(overlap)
            .sequential();
        let (summary, artifacts) = carve(input, options).unwrap();

        prop_assert_eq!(artifacts.len(), 1);
        prop_assert_eq!(artifacts[0].origin_offset(), prefix as u64);
        prop_assert_eq!(artifacts[0].content(), file.as_slice());
        prop_assert_eq!(summary.format("jpg").candidates, 1);
    }

    #[test]
    fn carving_is_independent_of_window_size(
        chunk in 32usize..1500,
        overlap in 8usize..128,
        workers in 1usize..4,
    ) {
        let (input, _) = layout(
            &[
                ("png", png(3, 5)),
                ("jpg", jpeg(900)),
                ("zip", zip(b"")),
                ("bmp", bmp(256, 256)),
                ("gif", gif()),
            ],
            200,
        );
        let reference = carve(input.clone(), CarveOptions::new().sequential()).unwrap().1;
        let options = CarveOptions::new()
            .with_chunk_size(chunk)
            .with_overlap_size(overlap)
            .with_workers(workers);

        let first = carve(input.clone(), options.clone()).unwrap().1;
        let second = carve(input, options).unwrap().1;
        prop_assert_eq!(describe(&first), describe(&reference));
        prop_assert_eq!(describe(&second), describe(&first));
    }
}
