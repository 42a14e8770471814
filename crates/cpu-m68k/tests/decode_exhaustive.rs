//! Exhaustive check of the compressed decode trie.
//!
//! The trie must agree with a linear first-match scan over the sorted
//! permutation list for every one of the 65536 opcode words.

use cpu_m68k::isa;

#[test]
fn trie_equals_linear_first_match_for_all_words() {
    let table = isa::decode_table().expect("instruction set builds");
    let perms = table.permutations();

    for word in 0..=u16::MAX {
        let linear = perms
            .iter()
            .position(|p| p.opcode.matches(word))
            .unwrap_or(table.illegal());
        assert_eq!(
            table.decode(word),
            linear,
            "trie and linear scan disagree on {word:#06x}"
        );
    }
}

#[test]
fn permutations_are_sorted_most_specific_first() {
    let perms = isa::decode_table().expect("instruction set builds").permutations();
    for pair in perms.windows(2) {
        assert!(
            pair[0].opcode.wildcards() <= pair[1].opcode.wildcards(),
            "{} sorts after {} despite being more specific",
            pair[0].name,
            pair[1].name
        );
    }
}

#[test]
fn table_compresses_well_below_the_page_bound() {
    let table = isa::decode_table().expect("instruction set builds");
    // 2^12 pages is the uncompressed bound; interning should land far
    // under it for a real instruction set.
    assert!(
        table.page_count() < 1 << 12,
        "page count {} exceeds the structural bound",
        table.page_count()
    );
}

#[test]
fn every_word_yields_a_valid_handler_index() {
    let table = isa::decode_table().expect("instruction set builds");
    for word in 0..=u16::MAX {
        assert!(table.decode(word) <= table.illegal());
    }
}
