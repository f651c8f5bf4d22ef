// Pocketkeys Property Tests
//
// Invariants of key resolution, segmentation and composing that must hold
// for any input, checked with proptest.

use proptest::prelude::*;

use pocketkeys_core::grapheme::{last_cluster_len, split_into_clusters};
use pocketkeys_core::{
    Composer, ComposerConfig, InputMode, Key, KeyEvent, KeyMapEntry, KeyMapTable, KeyMapping,
    MemoryTextSink, TextSink,
};
use std::collections::HashMap;

fn entries(chars: &[char]) -> Vec<KeyMapEntry> {
    chars.iter().map(|&c| KeyMapEntry::new(c, None)).collect()
}

fn text_strategy() -> impl Strategy<Value = String> {
    let pieces = prop::sample::select(vec![
        "a",
        "\u{00E9}",
        " ",
        "\u{1F44B}\u{1F3FD}",
        "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}",
        "\u{1F1FA}\u{1F1F8}",
        "\u{2764}\u{FE0F}",
        "b\u{200D}",
        "\u{1F3F4}\u{E0067}\u{E0062}\u{E0065}\u{E006E}\u{E0067}\u{E007F}",
    ]);
    prop::collection::vec(pieces, 0..12).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn test_resolve_cycles_modulo_length(
        values in prop::collection::vec(any::<char>(), 1..6),
        counter in any::<u8>(),
    ) {
        let mapping = KeyMapping::new(entries(&values), []).unwrap();
        let expected = values[usize::from(counter) % values.len()];
        prop_assert_eq!(mapping.resolve(false, false, counter), expected);
        prop_assert_eq!(mapping.resolve(false, true, counter), expected);
    }

    #[test]
    fn test_shift_falls_back_to_base(
        base in any::<char>(),
        shift in any::<char>(),
    ) {
        let plain = KeyMapping::new([KeyMapEntry::new(base, None)], []).unwrap();
        prop_assert_eq!(plain.resolve(true, false, 0), base);

        let shifted = KeyMapping::new([KeyMapEntry::new(base, Some(shift))], []).unwrap();
        prop_assert_eq!(shifted.resolve(true, false, 0), shift);
        prop_assert_eq!(shifted.resolve(false, false, 0), base);
    }

    #[test]
    fn test_clusters_rejoin_to_input(text in text_strategy()) {
        let clusters = split_into_clusters(&text);
        prop_assert_eq!(clusters.concat(), text.clone());
        prop_assert!(clusters.iter().all(|c| !c.is_empty()));
        prop_assert_eq!(last_cluster_len(&text), clusters.last().map_or(0, |c| c.len()));
    }

    #[test]
    fn test_multi_tap_leaves_one_character(
        taps in 1usize..20,
        values in prop::collection::vec(prop::char::range('a', 'z'), 2..5),
    ) {
        let mut mappings = HashMap::new();
        mappings.insert(Key::K, KeyMapping::new(entries(&values), []).unwrap());
        let table = KeyMapTable::new("prop", mappings).unwrap();

        let mut composer = Composer::new(ComposerConfig::default());
        composer.start_input(InputMode::text(true));
        let mut sink = MemoryTextSink::new();

        for n in 0..taps {
            let event = KeyEvent::press(Key::K, 1000 + n as u64 * 50);
            composer.key_down(&event, Some(&table), false, false, &mut sink, None);
        }

        let expected = values[(taps - 1) % values.len()].to_string();
        prop_assert_eq!(composer.composing_text(), expected.as_str());
        prop_assert_eq!(sink.text(), expected.as_str());
        prop_assert_eq!(sink.text_before(10), expected);
    }
}
