//! Field value synthesis.
//!
//! Values for fields that no guard pins are drawn from the field's kind and
//! validation hints (`enum`, `minimum`, `maximum`, `minLength`,
//! `maxLength`, `format`). All randomness comes from the caller's seeded
//! generator.

use fake::faker::address::en::{CityName, CountryName, PostCode, StreetName};
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::{Sentence, Word};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use formflow_core::Field;
use formflow_eval::numeric::values_equal;
use rand::rngs::StdRng;
use rand::Rng;
use serde_json::Value;

/// A plausible value for `field`. Unknown fields get a lorem word.
pub fn synthesize(field: Option<&Field>, rng: &mut StdRng) -> Value {
    let Some(field) = field else {
        return Value::String(Word().fake_with_rng(rng));
    };

    if let Some(Value::Array(options)) = field.hint("enum") {
        if !options.is_empty() {
            return options[rng.gen_range(0..options.len())].clone();
        }
    }

    let format = field.hint("format").and_then(Value::as_str).unwrap_or("");
    let schema_type = field.hint("type").and_then(Value::as_str).unwrap_or("");
    let kind = field.kind.to_ascii_lowercase();

    match (kind.as_str(), format, schema_type) {
        (_, "email", _) | ("email", _, _) => Value::String(SafeEmail().fake_with_rng(rng)),
        (_, "date", _) | ("date", _, _) => Value::String(date(rng)),
        (_, "uri", _) | ("url", _, _) => {
            let host: String = Word().fake_with_rng(rng);
            Value::String(format!("https://{}.example.com", host.to_ascii_lowercase()))
        }
        ("phone" | "tel", _, _) => Value::String(PhoneNumber().fake_with_rng(rng)),
        ("name" | "fullname", _, _) => Value::String(Name().fake_with_rng(rng)),
        ("firstname", _, _) => Value::String(FirstName().fake_with_rng(rng)),
        ("lastname", _, _) => Value::String(LastName().fake_with_rng(rng)),
        ("city", _, _) => Value::String(CityName().fake_with_rng(rng)),
        ("country", _, _) => Value::String(CountryName().fake_with_rng(rng)),
        ("zip" | "postcode" | "postalcode", _, _) => Value::String(PostCode().fake_with_rng(rng)),
        ("address" | "street", _, _) => Value::String(StreetName().fake_with_rng(rng)),
        ("boolean" | "checkbox" | "toggle", _, _) | (_, _, "boolean") => {
            Value::Bool(rng.gen_bool(0.5))
        }
        ("number" | "integer" | "currency" | "range", _, _) | (_, _, "number" | "integer") => {
            Value::from(integer(field, rng))
        }
        ("textarea" | "paragraph", _, _) => Value::String(bounded(field, Sentence(3..8).fake_with_rng(rng), rng)),
        _ => Value::String(bounded(field, Word().fake_with_rng(rng), rng)),
    }
}

/// A synthesized value equal to none of `avoid`.
pub fn synthesize_outside(field: Option<&Field>, avoid: &[Value], rng: &mut StdRng) -> Value {
    let candidate = synthesize(field, rng);
    if !avoid.iter().any(|a| values_equal(a, &candidate)) {
        return candidate;
    }
    let numbers: Vec<i64> = avoid.iter().filter_map(Value::as_i64).collect();
    if let Some(max) = numbers.iter().max() {
        return Value::from(max.saturating_add(1));
    }
    let mut text = match candidate {
        Value::String(s) => s,
        other => other.to_string(),
    };
    while avoid.iter().any(|a| a.as_str() == Some(text.as_str())) {
        text.push('x');
    }
    Value::String(text)
}

fn integer(field: &Field, rng: &mut StdRng) -> i64 {
    let bound = |key: &str| field.hint(key).and_then(Value::as_f64);
    let lo = bound("minimum")
        .map(|v| v.ceil() as i64)
        .or_else(|| bound("exclusiveMinimum").map(|v| (v.floor() as i64).saturating_add(1)))
        .unwrap_or(0);
    let hi = bound("maximum")
        .map(|v| v.floor() as i64)
        .or_else(|| bound("exclusiveMaximum").map(|v| (v.ceil() as i64).saturating_sub(1)))
        .unwrap_or(lo.saturating_add(100));
    if hi <= lo {
        lo
    } else {
        rng.gen_range(lo..=hi)
    }
}

fn bounded(field: &Field, seed_text: String, rng: &mut StdRng) -> String {
    let length = |key: &str| field.hint(key).and_then(Value::as_u64).map(|v| v as usize);
    let min = length("minLength").unwrap_or(0);
    let mut text = seed_text;
    while text.chars().count() < min {
        let word: String = Word().fake_with_rng(rng);
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(&word);
    }
    if let Some(max) = length("maxLength") {
        text = text.chars().take(max).collect();
    }
    text
}

fn date(rng: &mut StdRng) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        rng.gen_range(1970..=2030),
        rng.gen_range(1..=12),
        rng.gen_range(1..=28)
    )
}
