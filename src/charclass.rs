//! Character classes for grammar terminals
//!
//! A class is a predicate over code points with two storage tiers: a 256-bit
//! bitmap for low code points and a sorted, disjoint range set for everything
//! above. Classes are built from the `[^]a-b` mini-syntax, from explicit
//! characters and ranges, or from Unicode general categories.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use unicode_general_category::{get_general_category, GeneralCategory};

/// Sorted set of inclusive code-point ranges. Inserting a range that
/// overlaps or touches an existing one merges the two, so the stored ranges
/// are always non-overlapping and non-adjacent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<(char, char)>,
}

impl RangeSet {
    pub fn new() -> Self {
        RangeSet { ranges: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn add_char(&mut self, ch: char) {
        self.add_range(ch, ch);
    }

    /// Insert an inclusive range, keeping the set sorted. Any stored
    /// range that overlaps or touches the new one is absorbed into it,
    /// so no two stored ranges ever overlap or sit adjacent.
    pub fn add_range(&mut self, start: char, end: char) {
        if start > end {
            return;
        }
        let mut lo = start as u32;
        let mut hi = end as u32;

        // Skip every range that ends clearly before the new one, then
        // widen the new range over the run of ranges it touches
        let from = self.ranges.partition_point(|&(_, e)| (e as u32) + 1 < lo);
        let mut to = from;
        while to < self.ranges.len() && self.ranges[to].0 as u32 <= hi + 1 {
            lo = lo.min(self.ranges[to].0 as u32);
            hi = hi.max(self.ranges[to].1 as u32);
            to += 1;
        }

        // lo and hi are each one of the absorbed endpoints (or the
        // arguments), so they are valid scalar values
        let merged = (
            char::from_u32(lo).unwrap_or(start),
            char::from_u32(hi).unwrap_or(end),
        );
        self.ranges.drain(from..to);
        self.ranges.insert(from, merged);
    }

    pub fn contains(&self, ch: char) -> bool {
        self.contains_u32(ch as u32)
    }

    /// Membership test on a raw code point. The lenient UTF-8 decoder can
    /// produce values that are not scalar values, so this takes a `u32`.
    pub(crate) fn contains_u32(&self, cp: u32) -> bool {
        self.ranges
            .iter()
            .any(|&(start, end)| cp >= start as u32 && cp <= end as u32)
    }

}

/// A character-class predicate: bitmap below U+0100, range set above,
/// optional inversion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CharClass {
    bits: [u64; 4],
    high: RangeSet,
    negated: bool,
}

impl CharClass {
    pub fn new() -> Self {
        CharClass::default()
    }

    /// Build a class from the mini-syntax: an optional leading `^` inverts
    /// the class; `a-b` with the dash in the middle (not first, not last)
    /// is an inclusive range; every other character stands for itself.
    ///
    /// The pattern is Unicode text, so ranges may span non-ASCII:
    /// `"а-я"` covers the Cyrillic lowercase block.
    pub fn parse(pattern: &str) -> Self {
        let mut class = CharClass::new();
        let chars: Vec<char> = pattern.chars().collect();
        let mut i = 0;

        if chars.first() == Some(&'^') {
            class.negated = true;
            i = 1;
        }
        while i < chars.len() {
            // A dash counts as a range separator only with a character on
            // both sides
            if i + 2 < chars.len() && chars[i + 1] == '-' {
                class.insert_range(chars[i], chars[i + 2]);
                i += 3;
            } else {
                class.insert_char(chars[i]);
                i += 1;
            }
        }
        class
    }

    pub fn single(ch: char) -> Self {
        let mut class = CharClass::new();
        class.insert_char(ch);
        class
    }

    pub fn range(start: char, end: char) -> Self {
        let mut class = CharClass::new();
        class.insert_range(start, end);
        class
    }

    /// Build a class from a Unicode general category name, either major
    /// (`"L"`, `"N"`, ...) or minor (`"Lu"`, `"Nd"`, ...). Returns `None`
    /// for unknown names. Results are cached: computing a category walks
    /// the full code-point space once.
    pub fn category(name: &str) -> Option<Self> {
        static CACHE: OnceLock<Mutex<HashMap<String, CharClass>>> = OnceLock::new();
        let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));

        if let Some(class) = cache.lock().unwrap().get(name) {
            return Some(class.clone());
        }

        let members = category_members(name)?;
        let mut class = CharClass::new();
        let mut run: Option<(char, char)> = None;

        for cp in 0u32..=0x10FFFF {
            let ch = match char::from_u32(cp) {
                Some(ch) => ch,
                None => continue,
            };
            if members.contains(&get_general_category(ch)) {
                run = match run {
                    Some((start, _)) => Some((start, ch)),
                    None => Some((ch, ch)),
                };
            } else if let Some((start, end)) = run.take() {
                class.insert_range(start, end);
            }
        }
        if let Some((start, end)) = run {
            class.insert_range(start, end);
        }

        cache
            .lock()
            .unwrap()
            .insert(name.to_string(), class.clone());
        Some(class)
    }

    /// Flip the class: it now matches exactly the code points it rejected.
    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn insert_char(&mut self, ch: char) {
        self.insert_range(ch, ch);
    }

    /// Insert an inclusive range, splitting it across the bitmap/range-set
    /// boundary at U+0100.
    pub fn insert_range(&mut self, start: char, end: char) {
        if start > end {
            return;
        }
        let (lo, hi) = (start as u32, end as u32);
        for cp in lo..=hi.min(0xFF) {
            self.bits[(cp / 64) as usize] |= 1 << (cp % 64);
        }
        if hi >= 0x100 {
            let lo = lo.max(0x100);
            // Both bounds are >= 0x100 here, so they are valid chars
            let start = char::from_u32(lo).unwrap_or(start);
            self.high.add_range(start, end);
        }
    }

    pub fn contains(&self, ch: char) -> bool {
        self.contains_u32(ch as u32)
    }

    pub(crate) fn contains_u32(&self, cp: u32) -> bool {
        let member = if cp < 0x100 {
            self.bits[(cp / 64) as usize] & (1 << (cp % 64)) != 0
        } else {
            self.high.contains_u32(cp)
        };
        member != self.negated
    }
}

/// General categories covered by a (major or minor) category name.
fn category_members(name: &str) -> Option<&'static [GeneralCategory]> {
    use GeneralCategory::*;
    let members: &[GeneralCategory] = match name {
        "L" => &[
            UppercaseLetter,
            LowercaseLetter,
            TitlecaseLetter,
            ModifierLetter,
            OtherLetter,
        ],
        "LC" => &[UppercaseLetter, LowercaseLetter, TitlecaseLetter],
        "M" => &[NonspacingMark, SpacingMark, EnclosingMark],
        "N" => &[DecimalNumber, LetterNumber, OtherNumber],
        "P" => &[
            ConnectorPunctuation,
            DashPunctuation,
            OpenPunctuation,
            ClosePunctuation,
            InitialPunctuation,
            FinalPunctuation,
            OtherPunctuation,
        ],
        "S" => &[MathSymbol, CurrencySymbol, ModifierSymbol, OtherSymbol],
        "Z" => &[SpaceSeparator, LineSeparator, ParagraphSeparator],
        "C" => &[Control, Format, Surrogate, PrivateUse, Unassigned],
        "Lu" => &[UppercaseLetter],
        "Ll" => &[LowercaseLetter],
        "Lt" => &[TitlecaseLetter],
        "Lm" => &[ModifierLetter],
        "Lo" => &[OtherLetter],
        "Mn" => &[NonspacingMark],
        "Mc" => &[SpacingMark],
        "Me" => &[EnclosingMark],
        "Nd" => &[DecimalNumber],
        "Nl" => &[LetterNumber],
        "No" => &[OtherNumber],
        "Pc" => &[ConnectorPunctuation],
        "Pd" => &[DashPunctuation],
        "Ps" => &[OpenPunctuation],
        "Pe" => &[ClosePunctuation],
        "Pi" => &[InitialPunctuation],
        "Pf" => &[FinalPunctuation],
        "Po" => &[OtherPunctuation],
        "Sm" => &[MathSymbol],
        "Sc" => &[CurrencySymbol],
        "Sk" => &[ModifierSymbol],
        "So" => &[OtherSymbol],
        "Zs" => &[SpaceSeparator],
        "Zl" => &[LineSeparator],
        "Zp" => &[ParagraphSeparator],
        "Cc" => &[Control],
        "Cf" => &[Format],
        "Cs" => &[Surrogate],
        "Co" => &[PrivateUse],
        "Cn" => &[Unassigned],
        _ => return None,
    };
    Some(members)
}
