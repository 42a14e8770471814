//! Property tests for the value-level laws.

use proptest::prelude::*;

use cpu_m68k::alu::{self, Size};
use cpu_m68k::instruction::{Instruction, SizeSpec};
use cpu_m68k::{DecodeTable, OpcodePattern, Pipeline};

proptest! {
    #[test]
    fn bcd_roundtrip_is_mod_100(v in any::<u8>()) {
        let (bcd, carry) = alu::tobcd(v);
        prop_assert_eq!(alu::frombcd(bcd), v % 100);
        prop_assert_eq!(carry, v > 99);
    }

    #[test]
    fn overwrite_preserves_upper_and_replaces_lower(x in any::<u32>(), y in any::<u32>()) {
        for size in [Size::Byte, Size::Word, Size::Long] {
            let r = alu::overwrite(x, y, size);
            prop_assert_eq!(r & !size.mask(), x & !size.mask());
            prop_assert_eq!(r & size.mask(), y & size.mask());
        }
    }

    #[test]
    fn extend_matches_arithmetic_shifts(y in any::<u32>()) {
        prop_assert_eq!(alu::extend(y, Size::Byte), ((y as i32) << 24 >> 24) as u32);
        prop_assert_eq!(alu::extend(y, Size::Word), ((y as i32) << 16 >> 16) as u32);
        prop_assert_eq!(alu::extend(y, Size::Long), y);
    }

    #[test]
    fn add_carry_matches_wide_arithmetic(a in any::<u16>(), b in any::<u16>()) {
        let (r, carry, _) = alu::add(u32::from(a), u32::from(b), Size::Word);
        let wide = u32::from(a) + u32::from(b);
        prop_assert_eq!(r, wide & 0xFFFF);
        prop_assert_eq!(carry, wide > 0xFFFF);
    }
}

/// A random `{0,1,x}` opcode template.
fn template() -> impl Strategy<Value = String> {
    proptest::collection::vec(prop::sample::select(vec!['0', '1', 'x']), 16)
        .prop_map(|chars| chars.into_iter().collect())
}

fn pattern_set() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(template(), 1..10)
}

proptest! {
    // Table construction scans all 2^16 words, so keep the case count low.
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn trie_matches_linear_search_on_arbitrary_pattern_sets(
        templates in pattern_set(),
        words in proptest::collection::vec(any::<u16>(), 64),
    ) {
        let instructions: Vec<Instruction> = templates
            .iter()
            .map(|t| Instruction {
                name: "probe",
                size: SizeSpec::None,
                opcode: OpcodePattern::new(t).expect("generated template is valid"),
                code: Pipeline::new().fetch(),
            })
            .collect();
        let table = DecodeTable::new(&instructions);
        let perms = table.permutations();

        for word in words {
            let linear = perms
                .iter()
                .position(|p| p.opcode.matches(word))
                .unwrap_or(table.illegal());
            prop_assert_eq!(table.decode(word), linear, "word {:#06x}", word);
        }
    }
}
