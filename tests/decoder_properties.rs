use proptest::prelude::*;

use assetrun::decode::{LineCategory, OutputChunk, decode, strip_csi};
use assetrun::types::StreamKind;

// A complete CSI sequence: ESC '[' params intermediates final.
fn csi_strategy() -> impl Strategy<Value = Vec<u8>> {
    (
        proptest::collection::vec(0x30u8..=0x3f, 0..6),
        proptest::collection::vec(0x20u8..=0x2f, 0..2),
        0x40u8..=0x7e,
    )
        .prop_map(|(params, inter, fin)| {
            let mut seq = vec![0x1b, b'['];
            seq.extend(params);
            seq.extend(inter);
            seq.push(fin);
            seq
        })
}

// Plain text never contains ESC.
fn text_strategy() -> impl Strategy<Value = String> {
    "[^\x1b]{0,12}"
}

proptest! {
    #[test]
    fn stripping_keeps_text_and_drops_every_sequence(
        parts in proptest::collection::vec((text_strategy(), proptest::option::of(csi_strategy())), 0..8)
    ) {
        let mut input = Vec::new();
        let mut expected = String::new();
        for (text, seq) in &parts {
            input.extend_from_slice(text.as_bytes());
            expected.push_str(text);
            if let Some(seq) = seq {
                input.extend_from_slice(seq);
            }
        }

        let line = decode(&OutputChunk::new(StreamKind::Stdout, 0, input));
        prop_assert_eq!(line.text, expected);
        prop_assert_eq!(line.category, LineCategory::Success);
    }

    #[test]
    fn stripping_is_idempotent(input in proptest::collection::vec(any::<u8>(), 0..64)) {
        let once = strip_csi(&input);
        let twice = strip_csi(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn output_never_contains_a_complete_sequence(input in proptest::collection::vec(any::<u8>(), 0..64)) {
        let stripped = strip_csi(&input);
        prop_assert!(!assetrun::decode::ansi::contains_csi(&stripped));
    }

    #[test]
    fn stderr_is_always_an_error_line(text in text_strategy()) {
        let line = decode(&OutputChunk::new(StreamKind::Stderr, 3, text.as_bytes()));
        prop_assert_eq!(line.category, LineCategory::Error);
        prop_assert_eq!(line.seq, 3);
        prop_assert_eq!(line.text, text);
    }
}
