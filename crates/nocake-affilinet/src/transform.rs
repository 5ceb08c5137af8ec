//! RawProductRecord → ProductDocument

use serde::Serialize;

use crate::parser::RawProductRecord;

/// Search document for one product
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductDocument {
    pub list: String,
    pub price: Price,
    pub articlenumber: String,
    pub link: String,
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub categories: Vec<String>,
    pub brand: String,
    pub image: Image,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Price {
    pub value: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Image {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl ProductDocument {
    /// Document id: `<list tag>-<article number>`
    pub fn identity(&self) -> String {
        format!("{}-{}", self.list, self.articlenumber)
    }
}

/// Map a product record to its search document. Never fails; absent fields
/// become empty strings or zero.
pub fn map_product(record: &RawProductRecord, list_tag: &str) -> ProductDocument {
    let text = |field: &Option<String>| field.clone().unwrap_or_default();

    ProductDocument {
        list: list_tag.to_string(),
        price: parse_price(record.display_price.as_deref().unwrap_or("")),
        articlenumber: text(&record.article_number),
        link: text(&record.deeplink),
        title: text(&record.title),
        description: text(&record.description_short),
        keywords: split_keywords(record.keywords.as_deref().unwrap_or("")),
        categories: split_categories(record.category_path.as_deref().unwrap_or("")),
        brand: text(&record.brand),
        image: Image {
            url: text(&record.image_url),
            width: parse_dimension(record.image_width.as_deref()),
            height: parse_dimension(record.image_height.as_deref()),
        },
    }
}

/// `"19.99 EUR"` → `{19, "EUR"}`; extra leading tokens are dropped
pub fn parse_price(display: &str) -> Price {
    let tokens: Vec<&str> = display.split_whitespace().collect();
    match tokens.as_slice() {
        [] => Price::default(),
        [value] => Price {
            value: parse_int(value),
            currency: String::new(),
        },
        [.., value, currency] => Price {
            value: parse_int(value),
            currency: currency.to_string(),
        },
    }
}

/// Leading integer of `s`: optional sign, then digits up to the first
/// non-digit. Fractions are truncated, garbage gives 0, overflow saturates.
pub fn parse_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        let digit = i64::from(b - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(digit)
        } else {
            value.saturating_mul(10).saturating_add(digit)
        };
    }
    value
}

/// Comma-separated, trimmed, empty entries kept
fn split_keywords(keywords: &str) -> Vec<String> {
    keywords.split(',').map(|k| k.trim().to_string()).collect()
}

/// `Home > Kitchen > Mugs` → `["Home", "Kitchen", "Mugs"]`
fn split_categories(path: &str) -> Vec<String> {
    if path.trim().is_empty() {
        return Vec::new();
    }
    path.split('>').map(|c| c.trim().to_string()).collect()
}

fn parse_dimension(value: Option<&str>) -> u32 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}
