//! Dotted field path resolution over JSON form data.
//!
//! Paths are dot-separated keys with optional bracketed indices:
//! `applicant.address.city`, `items[0].sku`, `items.0.sku`.

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

fn segments(path: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    for piece in path.split('.') {
        let Some(open) = piece.find('[') else {
            out.push(Segment::Key(piece));
            continue;
        };
        if open > 0 {
            out.push(Segment::Key(&piece[..open]));
        }
        let mut rest = &piece[open..];
        while let Some(stripped) = rest.strip_prefix('[') {
            let Some(close) = stripped.find(']') else {
                // unterminated bracket: treat the remainder as a plain key
                out.push(Segment::Key(rest));
                break;
            };
            match stripped[..close].parse::<usize>() {
                Ok(i) => out.push(Segment::Index(i)),
                Err(_) => out.push(Segment::Key(&stripped[..close])),
            }
            rest = &stripped[close + 1..];
        }
    }
    out
}

/// Resolve `path` inside `data`. Missing members resolve to `None`.
pub fn resolve<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for segment in segments(path) {
        current = match (segment, current) {
            (Segment::Key(k), Value::Object(map)) => map.get(k)?,
            (Segment::Key(k), Value::Array(items)) => items.get(k.parse::<usize>().ok()?)?,
            (Segment::Index(i), Value::Array(items)) => items.get(i)?,
            _ => return None,
        };
    }
    Some(current)
}

/// True when `path` resolves to something other than `null`.
pub fn is_set(data: &Value, path: &str) -> bool {
    !matches!(resolve(data, path), None | Some(Value::Null))
}

/// Largest number of `null` slots `set_path` appends to reach an index.
const MAX_PADDING: usize = 1024;

/// Write `value` at `path`, creating intermediate objects and padding
/// arrays with `null`. Returns `false` when an existing scalar blocks the
/// path or an index lies too far past the end of its array.
pub fn set_path(data: &mut Value, path: &str, value: Value) -> bool {
    let segs = segments(path);
    let Some((last, parents)) = segs.split_last() else {
        return false;
    };

    let mut current = data;
    for segment in parents {
        if current.is_null() {
            *current = match segment {
                Segment::Key(_) => Value::Object(Map::new()),
                Segment::Index(_) => Value::Array(Vec::new()),
            };
        }
        current = match (segment, current) {
            (Segment::Key(k), Value::Object(map)) => {
                map.entry(k.to_string()).or_insert(Value::Null)
            }
            (Segment::Index(i), Value::Array(items)) => match slot(items, *i) {
                Some(slot) => slot,
                None => return false,
            },
            _ => return false,
        };
    }

    if current.is_null() {
        *current = match last {
            Segment::Key(_) => Value::Object(Map::new()),
            Segment::Index(_) => Value::Array(Vec::new()),
        };
    }
    match (last, current) {
        (Segment::Key(k), Value::Object(map)) => {
            map.insert(k.to_string(), value);
            true
        }
        (Segment::Index(i), Value::Array(items)) => match slot(items, *i) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        },
        _ => false,
    }
}

/// Element `i` of `items`, padding with `null` up to `MAX_PADDING` slots
/// past the current end.
fn slot(items: &mut Vec<Value>, i: usize) -> Option<&mut Value> {
    if i >= items.len() {
        if i - items.len() >= MAX_PADDING {
            return None;
        }
        items.resize(i.checked_add(1)?, Value::Null);
    }
    items.get_mut(i)
}

/// Remove the member at `path`, returning it.
pub fn remove_path(data: &mut Value, path: &str) -> Option<Value> {
    let segs = segments(path);
    let (last, parents) = segs.split_last()?;
    let mut current = data;
    for segment in parents {
        current = match (segment, current) {
            (Segment::Key(k), Value::Object(map)) => map.get_mut(*k)?,
            (Segment::Index(i), Value::Array(items)) => items.get_mut(*i)?,
            _ => return None,
        };
    }
    match (last, current) {
        (Segment::Key(k), Value::Object(map)) => map.remove(*k),
        (Segment::Index(i), Value::Array(items)) if *i < items.len() => {
            Some(std::mem::replace(&mut items[*i], Value::Null))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_keys_and_indices() {
        let data = json!({"applicant": {"address": {"city": "Oslo"}}, "items": [{"sku": "a"}, {"sku": "b"}]});
        assert_eq!(resolve(&data, "applicant.address.city"), Some(&json!("Oslo")));
        assert_eq!(resolve(&data, "items[1].sku"), Some(&json!("b")));
        assert_eq!(resolve(&data, "items.0.sku"), Some(&json!("a")));
        assert_eq!(resolve(&data, "items[5].sku"), None);
        assert_eq!(resolve(&data, "applicant.phone"), None);
    }

    #[test]
    fn is_set_treats_null_as_unset() {
        let data = json!({"a": null, "b": 0});
        assert!(!is_set(&data, "a"));
        assert!(is_set(&data, "b"));
        assert!(!is_set(&data, "c"));
    }

    #[test]
    fn set_path_creates_intermediates() {
        let mut data = json!({});
        assert!(set_path(&mut data, "applicant.address.city", json!("Bergen")));
        assert!(set_path(&mut data, "items[2]", json!(7)));
        assert_eq!(
            data,
            json!({"applicant": {"address": {"city": "Bergen"}}, "items": [null, null, 7]})
        );
    }

    #[test]
    fn set_path_refuses_to_descend_into_scalars() {
        let mut data = json!({"a": 1});
        assert!(!set_path(&mut data, "a.b", json!(2)));
        assert_eq!(data, json!({"a": 1}));
    }

    #[test]
    fn set_path_refuses_far_out_indices() {
        let mut data = json!({"items": [1]});
        assert!(!set_path(&mut data, "items[18446744073709551615]", json!(2)));
        assert!(!set_path(&mut data, "items[100000000000]", json!(2)));
        assert!(!set_path(&mut data, "items[5000].sku", json!("a")));
        assert_eq!(data, json!({"items": [1]}));

        assert!(set_path(&mut data, "items[3]", json!(4)));
        assert_eq!(data, json!({"items": [1, null, null, 4]}));
    }

    #[test]
    fn remove_path_returns_value() {
        let mut data = json!({"a": {"b": 1, "c": 2}});
        assert_eq!(remove_path(&mut data, "a.b"), Some(json!(1)));
        assert_eq!(data, json!({"a": {"c": 2}}));
        assert_eq!(remove_path(&mut data, "a.zzz"), None);
    }
}
