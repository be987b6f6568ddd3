//! Statement normalization
//!
//! Turns raw statement text into a canonical shape so structurally identical
//! statements aggregate under one key. Literals are elided:
//! - integers become `N`, hex literals `0xN`
//! - quoted strings become `S`
//! - long literal lists fold into `...`
//!
//! The rules run in a fixed order. Later rules rely on earlier ones having
//! collapsed whitespace and literals already.

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

/// One substitution step of the normalizer.
struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

impl Rule {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("valid regex"),
            replacement,
        }
    }

    fn apply<'a>(&self, text: Cow<'a, str>) -> Cow<'a, str> {
        let replaced = match self.pattern.replace_all(&text, self.replacement) {
            Cow::Borrowed(_) => None,
            Cow::Owned(replaced) => Some(replaced),
        };
        replaced.map_or(text, Cow::Owned)
    }
}

static RULES: OnceLock<Vec<Rule>> = OnceLock::new();

fn rules() -> &'static [Rule] {
    RULES.get_or_init(|| {
        vec![
            Rule::new(r" +", " "),
            Rule::new(r"[+\-]?\b[0-9]+\b", "N"),
            Rule::new(r"\b0x[0-9A-Fa-f]+\b", "0xN"),
            Rule::new(r"\\'", ""),
            Rule::new(r#"\\""#, ""),
            Rule::new(r"'[^']+'", "S"),
            Rule::new(r#""[^"]+""#, "S"),
            Rule::new(r"([NS]\s*,\s*){4,}", "..."),
        ]
    })
}

/// Normalize a statement into its canonical shape.
///
/// Total over any input: text that is not valid SQL is still rewritten on a
/// best-effort basis.
pub fn normalize(query: &str) -> String {
    rules()
        .iter()
        .fold(Cow::Borrowed(query), |text, rule| rule.apply(text))
        .into_owned()
}

/// Normalize every statement of a round in place, keeping order.
pub fn normalize_all(queries: &mut [String]) {
    for query in queries.iter_mut() {
        *query = normalize(query);
    }
}
