use std::borrow::Cow;
use std::sync::OnceLock;

use basket_core::Money;
use regex::Regex;

use crate::types::{LineItem, ParsedReceipt, UNKNOWN_STORE};
use crate::vocabulary::ParserVocabulary;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Leftmost decimal with exactly two fractional digits.
re!(re_price, r"[0-9]+\.[0-9]{2}");
// OCR reads the ")" in "(2)" as "Y".
re!(re_paren_y, r"\(([0-9]+)Y");
re!(re_qty_prefix, r"^\(([0-9]+)\)\s*(.*)");
// Secondary "38 $2.29" style price/code pairs left in the name.
re!(re_embedded_price, r"[0-9]+\s*\$?[0-9]+\.[0-9]{2}");
re!(re_trailing_digits, r"[0-9]+$");

// ── Public parsing API ───────────────────────────────────────────────────────

/// Parse raw OCR text with the built-in vocabulary.
pub fn parse_receipt_text(raw_text: &str) -> ParsedReceipt {
    ReceiptParser::default().parse(raw_text)
}

/// Heuristic receipt reconstruction: line merging, store detection, item
/// extraction and subtotal/total lookup in a single pass.
///
/// Never fails. Unrecognisable input yields [`ParsedReceipt::empty`].
#[derive(Debug, Clone, Default)]
pub struct ReceiptParser {
    vocabulary: ParserVocabulary,
}

impl ReceiptParser {
    pub fn with_vocabulary(vocabulary: ParserVocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn parse(&self, raw_text: &str) -> ParsedReceipt {
        let lines = normalize_lines(raw_text);
        if lines.is_empty() {
            return ParsedReceipt::empty();
        }

        let header = self.detect_store(&lines);
        let merged = merge_lines(&lines, header.map(|(idx, _)| idx));

        let items: Vec<LineItem> = merged
            .iter()
            .filter_map(|line| self.parse_item_line(line))
            .collect();

        let (subtotal, total) = extract_totals(&merged, &items);

        ParsedReceipt {
            store_name: header
                .map(|(_, line)| line.to_string())
                .unwrap_or_else(|| UNKNOWN_STORE.to_string()),
            subtotal,
            tax: Money::zero(),
            total,
            items,
        }
    }

    // ── Store ────────────────────────────────────────────────────────────────

    /// Index and text of the first line naming a known chain.
    fn detect_store<'a>(&self, lines: &'a [String]) -> Option<(usize, &'a str)> {
        lines.iter().enumerate().find_map(|(idx, line)| {
            let chain = self.vocabulary.store_chain(&line.to_lowercase())?;
            tracing::debug!(chain, line = %line, "store detected");
            Some((idx, line.as_str()))
        })
    }

    // ── Items ────────────────────────────────────────────────────────────────

    /// Turn one merged line into an item, or `None` for summary, footer and
    /// price-less lines.
    pub fn parse_item_line(&self, line: &str) -> Option<LineItem> {
        if let Some(reason) = self.vocabulary.skip_reason(&line.to_lowercase()) {
            tracing::trace!(?reason, line, "skipping non-item line");
            return None;
        }

        let price = re_price().find(line)?;
        let total_price = Money::parse(price.as_str())?;

        let mut before = String::with_capacity(line.len());
        before.push_str(&line[..price.start()]);
        before.push_str(&line[price.end()..]);
        let before = before.trim();

        let (qty, name) = match re_qty_prefix().captures(before) {
            Some(c) => {
                let qty = c[1].parse::<u32>().ok().filter(|q| *q > 0).unwrap_or(1);
                let rest = c.get(2).map_or("", |m| m.as_str()).trim();
                (qty, rest)
            }
            None => (1, before),
        };

        Some(LineItem {
            name: clean_name(name),
            qty,
            unit_price: total_price.per_unit(qty),
            total_price,
        })
    }
}

// ── Line reconstruction ──────────────────────────────────────────────────────

fn normalize_lines(raw_text: &str) -> Vec<String> {
    raw_text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn fix_ocr_paren(line: &str) -> Cow<'_, str> {
    re_paren_y().replace(line, "(${1})")
}

/// Join a price-less line with its successor when the successor carries a
/// price. One lookahead only; the store header line is never joined forward.
fn merge_lines(lines: &[String], header: Option<usize>) -> Vec<String> {
    let mut merged = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        let line = fix_ocr_paren(&lines[i]);
        let continuation = lines
            .get(i + 1)
            .filter(|next| header != Some(i) && !re_price().is_match(&line) && re_price().is_match(next));

        match continuation {
            Some(next) => {
                merged.push(format!("{line} {next}"));
                i += 2;
            }
            None => {
                merged.push(line.into_owned());
                i += 1;
            }
        }
    }
    merged
}

fn clean_name(name: &str) -> String {
    let name = re_embedded_price().replace_all(name, "");
    let name = re_trailing_digits().replace(&name, "");
    name.trim().to_string()
}

// ── Aggregates ───────────────────────────────────────────────────────────────

fn first_price(line: &str) -> Option<Money> {
    re_price().find(line).and_then(|m| Money::parse(m.as_str()))
}

/// Subtotal from the first "subtotal" line, total from the first line starting
/// with "total". Missing or zero values fall back to the item sum and the
/// subtotal respectively.
fn extract_totals(lines: &[String], items: &[LineItem]) -> (Money, Money) {
    let subtotal = lines
        .iter()
        .find(|l| l.to_lowercase().contains("subtotal"))
        .and_then(|l| first_price(l))
        .filter(|m| !m.is_zero())
        .unwrap_or_else(|| items.iter().map(|i| i.total_price).sum());

    let total = lines
        .iter()
        .find(|l| l.to_lowercase().starts_with("total"))
        .and_then(|l| first_price(l))
        .filter(|m| !m.is_zero())
        .unwrap_or(subtotal);

    (subtotal, total)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
