//! Table-driven opcode dispatch.
//!
//! The decoder maps any 16-bit opcode word to a permutation index in O(1)
//! through a 4-level, 16-ary trie: four dependent table loads, one per
//! nibble. The trie is built once from the permutation list and compressed
//! by interning pages, so subtrees that resolve to the same handler share
//! storage; a uniform subtree becomes a chain of single-valued pages that
//! the interning collapses across the whole table.
//!
//! Permutations are sorted most-specific first (fewest wildcard bits), so
//! wherever two patterns overlap the narrower one wins. Words no pattern
//! matches resolve to the sentinel index `perms.len()`, behind which sits
//! the fallback handler.

#![allow(clippy::cast_possible_truncation)]

use log::debug;

use crate::instruction::{Instruction, Permutation};
use crate::microcode::Handler;

/// Entries per trie page: one per 4-bit nibble.
const PAGE_WIDTH: usize = 16;

/// A compressed decode table plus the handler bound for each permutation.
pub struct DecodeTable {
    pages: Vec<[u16; PAGE_WIDTH]>,
    root: u16,
    perms: Vec<Permutation>,
    /// One handler per permutation, plus the fallback at `perms.len()`.
    handlers: Vec<Handler>,
}

impl DecodeTable {
    /// Build the table from an instruction set.
    ///
    /// Cost is O(2^16 · P) over P permutations; run once at start-up.
    #[must_use]
    pub fn new(instructions: &[Instruction]) -> Self {
        let mut perms: Vec<Permutation> = instructions
            .iter()
            .flat_map(Instruction::permutations)
            .collect();
        // Most specific first; stable, so declaration order breaks ties.
        perms.sort_by_key(|p| p.opcode.wildcards());

        let sentinel = perms.len() as u16;
        let match_of: Vec<u16> = (0..=u16::MAX)
            .map(|word| {
                perms
                    .iter()
                    .position(|p| p.opcode.matches(word))
                    .map_or(sentinel, |i| i as u16)
            })
            .collect();

        let mut builder = TrieBuilder {
            match_of: &match_of,
            pages: Vec::new(),
        };
        let root = builder.visit(0, 0);

        let mut handlers: Vec<Handler> = perms.iter().map(|p| p.code.bind(p.size)).collect();
        handlers.push(Handler::noop());

        debug!(
            "decode table: {} permutations, {} pages, {} bytes",
            perms.len(),
            builder.pages.len(),
            builder.pages.len() * PAGE_WIDTH * 2,
        );

        Self {
            pages: builder.pages,
            root,
            perms,
            handlers,
        }
    }

    /// Decode a word to its permutation index, or [`Self::illegal`].
    #[must_use]
    pub fn decode(&self, word: u16) -> usize {
        let mut i = self.root as usize;
        i = self.pages[i][(word >> 12 & 0xF) as usize] as usize;
        i = self.pages[i][(word >> 8 & 0xF) as usize] as usize;
        i = self.pages[i][(word >> 4 & 0xF) as usize] as usize;
        i = self.pages[i][(word & 0xF) as usize] as usize;
        i
    }

    /// The sentinel index for unmatched words.
    #[must_use]
    pub fn illegal(&self) -> usize {
        self.perms.len()
    }

    /// The handler for a word; unmatched words get the fallback.
    #[must_use]
    pub fn handler(&self, word: u16) -> &Handler {
        &self.handlers[self.decode(word)]
    }

    /// The permutation a word decodes to, or `None` for the sentinel.
    #[must_use]
    pub fn permutation(&self, word: u16) -> Option<&Permutation> {
        self.perms.get(self.decode(word))
    }

    /// The sorted permutation list backing the table.
    #[must_use]
    pub fn permutations(&self) -> &[Permutation] {
        &self.perms
    }

    /// Replace the fallback handler run for unmatched words.
    pub fn set_fallback(&mut self, handler: Handler) {
        let illegal = self.illegal();
        self.handlers[illegal] = handler;
    }

    /// Number of interned pages.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

struct TrieBuilder<'a> {
    match_of: &'a [u16],
    pages: Vec<[u16; PAGE_WIDTH]>,
}

impl TrieBuilder<'_> {
    /// Build the page for the subtree whose prefix is `prefix`
    /// (`depth` nibbles long) and return its page index.
    fn visit(&mut self, prefix: u16, depth: u8) -> u16 {
        let mut page = [0u16; PAGE_WIDTH];
        for (nibble, entry) in page.iter_mut().enumerate() {
            let sub = (prefix << 4) | nibble as u16;
            let consumed = depth + 1;
            if consumed == 4 {
                *entry = self.match_of[sub as usize];
            } else {
                let span = 16 - u32::from(consumed) * 4;
                let base = (sub as usize) << span;
                *entry = match self.uniform(base, 1usize << span) {
                    Some(index) => self.stub(index, consumed),
                    None => self.visit(sub, consumed),
                };
            }
        }
        self.intern(page)
    }

    /// The single permutation index covering `len` words from `base`, if
    /// there is exactly one.
    fn uniform(&self, base: usize, len: usize) -> Option<u16> {
        let first = self.match_of[base];
        self.match_of[base..base + len]
            .iter()
            .all(|&m| m == first)
            .then_some(first)
    }

    /// Pad a uniform subtree: a chain of single-valued pages from the leaf
    /// level up to `depth`. Interning collapses the duplicates.
    fn stub(&mut self, index: u16, depth: u8) -> u16 {
        let mut entry = index;
        for _ in depth..4 {
            entry = self.intern([entry; PAGE_WIDTH]);
        }
        entry
    }

    /// Structural dedup: reuse an equal page if one exists.
    fn intern(&mut self, page: [u16; PAGE_WIDTH]) -> u16 {
        if let Some(found) = self.pages.iter().position(|p| *p == page) {
            return found as u16;
        }
        self.pages.push(page);
        (self.pages.len() - 1) as u16
    }
}
