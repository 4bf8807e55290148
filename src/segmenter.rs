//! Address segmentation functionality.
//!
//! Splits a normalized Japanese address into its administrative hierarchy
//! (prefecture → city → town → chōme → banchi → gō → building). Each level is
//! an explicit grammar rule applied to a cursor over the remaining text: a
//! rule either consumes a prefix and fills its field, or leaves the field
//! empty and the cursor where it was.

use serde::{Deserialize, Serialize};

use crate::normalizer::NormalizedAddress;
use crate::types::SpecificityLevel;

/// All 47 prefectures, matched literally before the generic suffix rule so
/// that names containing a suffix character (京都府) are not cut short.
const PREFECTURES: [&str; 47] = [
    "北海道", "青森県", "岩手県", "宮城県", "秋田県", "山形県", "福島県",
    "茨城県", "栃木県", "群馬県", "埼玉県", "千葉県", "東京都", "神奈川県",
    "新潟県", "富山県", "石川県", "福井県", "山梨県", "長野県", "岐阜県",
    "静岡県", "愛知県", "三重県", "滋賀県", "京都府", "大阪府", "兵庫県",
    "奈良県", "和歌山県", "鳥取県", "島根県", "岡山県", "広島県", "山口県",
    "徳島県", "香川県", "愛媛県", "高知県", "福岡県", "佐賀県", "長崎県",
    "熊本県", "大分県", "宮崎県", "鹿児島県", "沖縄県",
];

const PREFECTURE_SUFFIXES: &[char] = &['都', '道', '府', '県'];
const CITY_SUFFIXES: &[char] = &['市', '区', '町', '村'];
const TOWN_SUFFIXES: &[char] = &['町', '村'];
const HIGHER_LEVEL_SUFFIXES: &[char] = &['都', '道', '府', '県', '市', '区'];

/// A suffix-terminated grammar rule: the shortest prefix of at least two
/// characters ending in one of `suffixes`, accepted only if `guard` allows it.
struct SuffixRule {
    suffixes: &'static [char],
    max_chars: Option<usize>,
    guard: fn(&str) -> bool,
}

const PREFECTURE_RULE: SuffixRule = SuffixRule {
    suffixes: PREFECTURE_SUFFIXES,
    max_chars: Some(4),
    guard: is_place_name,
};

const CITY_RULE: SuffixRule = SuffixRule {
    suffixes: CITY_SUFFIXES,
    max_chars: None,
    guard: is_place_name,
};

const WARD_RULE: SuffixRule = SuffixRule {
    suffixes: &['区'],
    max_chars: Some(4),
    guard: is_place_name,
};

const TOWN_RULE: SuffixRule = SuffixRule {
    suffixes: TOWN_SUFFIXES,
    max_chars: None,
    guard: is_town_name,
};

impl SuffixRule {
    /// Byte length of the match at the start of `rest`, if any.
    fn match_prefix(&self, rest: &str) -> Option<usize> {
        for (position, (offset, c)) in rest.char_indices().enumerate() {
            if self.max_chars.is_some_and(|max| position >= max) {
                return None;
            }
            if position > 0 && self.suffixes.contains(&c) {
                let end = offset + c.len_utf8();
                return (self.guard)(&rest[..end]).then_some(end);
            }
        }
        None
    }
}

fn is_place_name(candidate: &str) -> bool {
    !candidate.chars().any(|c| c.is_ascii_digit() || c == '-')
}

fn is_town_name(candidate: &str) -> bool {
    is_place_name(candidate) && !candidate.chars().any(|c| HIGHER_LEVEL_SUFFIXES.contains(&c))
}

/// Cursor over the unconsumed tail of the address.
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }

    fn rest(&self) -> &'a str {
        self.rest
    }

    fn take(&mut self, len: Option<usize>) -> Option<String> {
        let len = len.filter(|len| *len > 0)?;
        let (head, tail) = self.rest.split_at(len);
        self.rest = tail;
        Some(head.to_string())
    }
}

fn match_prefecture(rest: &str) -> Option<usize> {
    PREFECTURES
        .iter()
        .find(|name| rest.starts_with(*name))
        .map(|name| name.len())
        .or_else(|| {
            // 京都市 without a prefecture is a city, not 京都 + 市.
            PREFECTURE_RULE
                .match_prefix(rest)
                .filter(|end| !rest[*end..].starts_with(CITY_SUFFIXES))
        })
}

fn match_city(rest: &str) -> Option<usize> {
    let mut end = CITY_RULE.match_prefix(rest)?;
    if !rest[..end].ends_with('区') && rest[end..].starts_with('市') {
        // 十日町市, 大町市, 四日市市, 廿日市市
        end += '市'.len_utf8();
    }
    if rest[..end].ends_with('市') {
        // Designated cities are addressed by ward: 横浜市中区.
        end += WARD_RULE.match_prefix(&rest[end..]).unwrap_or(0);
    }
    Some(end)
}

fn match_town(rest: &str) -> Option<usize> {
    TOWN_RULE.match_prefix(rest).or_else(|| {
        let first_digit = rest.find(|c: char| c.is_ascii_digit())?;
        let run = &rest[..first_digit];
        (!run.is_empty() && !run.contains('-')).then_some(first_digit)
    })
}

fn leading_digits(rest: &str) -> usize {
    rest.bytes().take_while(u8::is_ascii_digit).count()
}

fn match_chome(rest: &str) -> Option<usize> {
    let digits = leading_digits(rest);
    if digits == 0 {
        return None;
    }
    let marker = ["丁目", "丁", "-"]
        .into_iter()
        .find(|marker| rest[digits..].starts_with(marker))?;
    Some(digits + marker.len())
}

/// Spans of the lot number groups: `banchi` and optional `go` byte lengths.
///
/// A group is a digit run with an optional 番地/番/号 marker. Groups after the
/// first are introduced by `-` (kept with the group it introduces) or follow
/// a 番地/番 marker directly; 号 closes the sequence.
fn match_lot(rest: &str) -> Option<(usize, Option<usize>)> {
    let mut groups: Vec<(usize, usize)> = Vec::with_capacity(3);
    let mut pos = 0;
    let mut after_marker = false;

    while groups.len() < 3 {
        let start = pos;
        let mut cursor = pos;
        if !groups.is_empty() && !after_marker {
            if !rest[cursor..].starts_with('-') {
                break;
            }
            cursor += 1;
        }

        let digits = leading_digits(&rest[cursor..]);
        if digits == 0 {
            break;
        }
        cursor += digits;

        after_marker = false;
        let mut closed = false;
        if rest[cursor..].starts_with("番地") {
            cursor += "番地".len();
            after_marker = true;
        } else if rest[cursor..].starts_with('番') {
            cursor += '番'.len_utf8();
            after_marker = true;
        } else if rest[cursor..].starts_with('号') {
            cursor += '号'.len_utf8();
            closed = true;
        }

        groups.push((start, cursor));
        pos = cursor;
        if closed {
            break;
        }
    }

    match groups.as_slice() {
        [] => None,
        [(_, end)] => Some((*end, None)),
        [(_, banchi_end), (_, go_end)] => Some((*banchi_end, Some(go_end - banchi_end))),
        [_, (_, banchi_end), (_, go_end), ..] => Some((*banchi_end, Some(go_end - banchi_end))),
    }
}

/// High-level address segmenter.
#[derive(Debug, Clone, Default)]
pub struct AddressSegmenter;

impl AddressSegmenter {
    /// Create a new segmenter.
    pub fn new() -> Self {
        Self
    }

    /// Segment a normalized address into its administrative hierarchy.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mappicker_rs::{AddressNormalizer, AddressSegmenter};
    ///
    /// let address = AddressNormalizer::new().normalize("東京都千代田区丸の内１丁目９−１");
    /// let segments = AddressSegmenter::new().segment(&address);
    /// assert_eq!(segments.prefecture.as_deref(), Some("東京都"));
    /// assert_eq!(segments.town.as_deref(), Some("丸の内"));
    /// assert_eq!(segments.banchi.as_deref(), Some("9"));
    /// ```
    pub fn segment(&self, address: &NormalizedAddress) -> AddressSegments {
        let mut cursor = Cursor::new(address.as_str());
        let mut segments = AddressSegments::default();

        segments.prefecture = cursor.take(match_prefecture(cursor.rest()));
        segments.city = cursor.take(match_city(cursor.rest()));
        segments.town = cursor.take(match_town(cursor.rest()));
        segments.chome = cursor.take(match_chome(cursor.rest()));

        if let Some((banchi_len, go_len)) = match_lot(cursor.rest()) {
            segments.banchi = cursor.take(Some(banchi_len));
            segments.go = cursor.take(go_len);
        }

        segments.building = cursor.take(Some(cursor.rest().len()));
        segments
    }

    /// Segment multiple addresses in batch.
    pub fn segment_batch(&self, addresses: &[NormalizedAddress]) -> Vec<AddressSegments> {
        addresses.iter().map(|address| self.segment(address)).collect()
    }

    /// Segment multiple addresses in parallel using multiple threads.
    ///
    /// Results are returned in input order.
    #[cfg(feature = "parallel")]
    pub fn segment_batch_parallel(&self, addresses: &[NormalizedAddress]) -> Vec<AddressSegments> {
        use rayon::prelude::*;

        addresses
            .par_iter()
            .map(|address| self.segment(address))
            .collect()
    }
}

/// Structured representation of a segmented address.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AddressSegments {
    /// Prefecture (e.g., "東京都")
    pub prefecture: Option<String>,
    /// City, ward, town or village (e.g., "千代田区", "横浜市中区")
    pub city: Option<String>,
    /// Town or district (e.g., "丸の内")
    pub town: Option<String>,
    /// Block with its marker (e.g., "1丁目", "1-")
    pub chome: Option<String>,
    /// Lot number (e.g., "9", "9番地")
    pub banchi: Option<String>,
    /// Building number, with its leading separator if any (e.g., "-1", "1号")
    pub go: Option<String>,
    /// Unparsed trailing text, usually a building name
    pub building: Option<String>,
}

impl AddressSegments {
    /// Segment value for a hierarchy level.
    pub fn get(&self, level: SpecificityLevel) -> Option<&str> {
        match level {
            SpecificityLevel::Prefecture => self.prefecture.as_deref(),
            SpecificityLevel::City => self.city.as_deref(),
            SpecificityLevel::Town => self.town.as_deref(),
            SpecificityLevel::Chome => self.chome.as_deref(),
            SpecificityLevel::Banchi => self.banchi.as_deref(),
            SpecificityLevel::Go => self.go.as_deref(),
            SpecificityLevel::Full | SpecificityLevel::Unknown => None,
        }
    }

    /// Get all present components in hierarchical order.
    pub fn components(&self) -> Vec<(&'static str, &str)> {
        [
            ("prefecture", &self.prefecture),
            ("city", &self.city),
            ("town", &self.town),
            ("chome", &self.chome),
            ("banchi", &self.banchi),
            ("go", &self.go),
            ("building", &self.building),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|value| (name, value)))
        .collect()
    }

    /// Check if no component was recognised.
    pub fn is_empty(&self) -> bool {
        self.components().is_empty()
    }

    /// The finest administrative level present (building excluded).
    pub fn finest_level(&self) -> SpecificityLevel {
        SpecificityLevel::FALLBACK_ORDER
            .into_iter()
            .find(|level| self.get(*level).is_some())
            .unwrap_or(SpecificityLevel::Unknown)
    }

    /// Copy of these segments keeping only `level` and coarser.
    pub fn through(&self, level: SpecificityLevel) -> AddressSegments {
        let keep = |candidate: SpecificityLevel, value: &Option<String>| {
            if candidate >= level { value.clone() } else { None }
        };
        AddressSegments {
            prefecture: keep(SpecificityLevel::Prefecture, &self.prefecture),
            city: keep(SpecificityLevel::City, &self.city),
            town: keep(SpecificityLevel::Town, &self.town),
            chome: keep(SpecificityLevel::Chome, &self.chome),
            banchi: keep(SpecificityLevel::Banchi, &self.banchi),
            go: keep(SpecificityLevel::Go, &self.go),
            building: None,
        }
    }

    /// Concatenated administrative segments as a search query.
    ///
    /// A dangling `-` (from a `1-` chōme) is trimmed so it is never sent.
    pub fn query(&self) -> String {
        let mut query: String = SpecificityLevel::FALLBACK_ORDER
            .iter()
            .rev()
            .filter_map(|level| self.get(*level))
            .collect();
        while query.ends_with('-') {
            query.pop();
        }
        query
    }

    /// Search query made of the segments from `prefecture` down to `level`.
    pub fn query_up_to(&self, level: SpecificityLevel) -> String {
        self.through(level).query()
    }
}
