//! Address normalization functionality.
//!
//! Canonicalizes raw user input before it is geocoded or segmented:
//! full-width ASCII folding, whitespace removal, dash unification and
//! removal of list punctuation.

/// Offset between a full-width ASCII form and its half-width counterpart.
const FULL_WIDTH_OFFSET: u32 = 0xFEE0;

/// Dash-like characters unified to an ASCII hyphen.
const DASH_VARIANTS: [char; 4] = [
    '\u{2212}', // − minus sign
    '\u{30FC}', // ー katakana prolonged sound mark
    '\u{2010}', // ‐ hyphen
    '\u{FF0D}', // － full-width hyphen-minus
];

/// Punctuation dropped entirely.
const REMOVED_PUNCTUATION: [char; 2] = ['、', '・'];

/// High-level address normalizer with builder pattern.
#[derive(Debug, Clone)]
pub struct AddressNormalizer {
    fold_width: bool,
    unify_dashes: bool,
}

impl AddressNormalizer {
    /// Create a new normalizer with every pass enabled.
    pub fn new() -> Self {
        Self {
            fold_width: true,
            unify_dashes: true,
        }
    }

    /// Enable/disable full-width digit and letter folding.
    pub fn with_width_folding(mut self, enabled: bool) -> Self {
        self.fold_width = enabled;
        self
    }

    /// Enable/disable dash unification.
    pub fn with_dash_unification(mut self, enabled: bool) -> Self {
        self.unify_dashes = enabled;
        self
    }

    /// Normalize an address string.
    ///
    /// Never fails: garbage in yields garbage out. Passes run in a fixed
    /// order, width folding before dash unification.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mappicker_rs::AddressNormalizer;
    ///
    /// let normalized = AddressNormalizer::new().normalize("東京都千代田区丸の内１丁目９−１");
    /// assert_eq!(normalized.as_str(), "東京都千代田区丸の内1丁目9-1");
    /// ```
    pub fn normalize(&self, input: &str) -> NormalizedAddress {
        let folded: String = if self.fold_width {
            input.chars().map(fold_full_width).collect()
        } else {
            input.to_string()
        };

        let normalized = folded
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| {
                if self.unify_dashes && DASH_VARIANTS.contains(&c) {
                    '-'
                } else {
                    c
                }
            })
            .filter(|c| !REMOVED_PUNCTUATION.contains(c))
            .collect();

        NormalizedAddress {
            original: input.to_string(),
            normalized,
        }
    }

    /// Normalize multiple address strings in batch.
    pub fn normalize_batch(&self, inputs: &[&str]) -> Vec<NormalizedAddress> {
        inputs.iter().map(|input| self.normalize(input)).collect()
    }
}

impl Default for AddressNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn fold_full_width(c: char) -> char {
    match c {
        '０'..='９' | 'Ａ'..='Ｚ' | 'ａ'..='ｚ' => {
            char::from_u32(c as u32 - FULL_WIDTH_OFFSET).unwrap_or(c)
        }
        _ => c,
    }
}

/// Result of address normalization.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NormalizedAddress {
    /// Original input string
    pub original: String,
    normalized: String,
}

impl NormalizedAddress {
    /// Wrap text that is already normalized.
    pub fn from_normalized(text: impl Into<String>) -> Self {
        let normalized = text.into();
        Self {
            original: normalized.clone(),
            normalized,
        }
    }

    /// The canonical text.
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// Check if normalization left nothing to search for.
    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    /// Length of the canonical text in bytes.
    pub fn len(&self) -> usize {
        self.normalized.len()
    }
}

impl AsRef<str> for NormalizedAddress {
    fn as_ref(&self) -> &str {
        &self.normalized
    }
}

impl std::fmt::Display for NormalizedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(input: &str) -> String {
        AddressNormalizer::new().normalize(input).as_str().to_string()
    }

    #[test]
    fn test_full_width_digits_and_letters() {
        assert_eq!(normalize("０１２３４５６７８９"), "0123456789");
        assert_eq!(normalize("ＡＢＣｘｙｚ"), "ABCxyz");
    }

    #[test]
    fn test_numeric_value_preserved() {
        let out = normalize("港区六本木６丁目１０−１");
        assert!(!out.chars().any(|c| ('０'..='９').contains(&c)));
        assert_eq!(out, "港区六本木6丁目10-1");
    }

    #[test]
    fn test_whitespace_removed() {
        assert_eq!(normalize(" 東京都\u{3000}千代田区 \t丸の内\n"), "東京都千代田区丸の内");
    }

    #[test]
    fn test_dash_variants_unified() {
        assert_eq!(normalize("1−2ー3‐4－5"), "1-2-3-4-5");
    }

    #[test]
    fn test_list_punctuation_removed() {
        assert_eq!(normalize("東京都、千代田区・丸の内"), "東京都千代田区丸の内");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "東京都千代田区丸の内１丁目９−１",
            "  ＡＢＣ ビル　１Ｆ ",
            "",
            "、、・",
            "大阪府大阪市北区梅田３ー１ー１",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_empty_and_garbage() {
        let normalizer = AddressNormalizer::new();
        assert!(normalizer.normalize("   ").is_empty());
        assert!(normalizer.normalize("、・").is_empty());
        assert_eq!(normalizer.normalize("???").as_str(), "???");
    }

    #[test]
    fn test_disabled_passes() {
        let normalizer = AddressNormalizer::new()
            .with_width_folding(false)
            .with_dash_unification(false);
        assert_eq!(normalizer.normalize("１ − ２").as_str(), "１−２");
    }

    #[test]
    fn test_batch_keeps_original() {
        let batch = AddressNormalizer::new().normalize_batch(&["１ 丁目", "２"]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].original, "１ 丁目");
        assert_eq!(batch[0].as_str(), "1丁目");
    }
}
