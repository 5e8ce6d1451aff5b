//! The per-entry override sentence accepted by `create`.
//!
//! A selector is a `;`-separated list of `index=spec[:spec...]` clauses.
//! Each spec is `png` (write as PNG), `bit` (write as 32-bit planar or
//! bitmap data), a 3 or 4 character element type, or `*` (leave the entry
//! out).

use super::entry::{IconEntry, Target};
use super::error::IconResult;
use super::icontype::leading_size;

/// Resets every entry's target, then applies `selector` to the entries it
/// names.  Any malformed clause is an argument error.
pub fn apply(selector: Option<&str>, entries: &mut [IconEntry]) -> IconResult<()> {
    for entry in entries.iter_mut() {
        entry.target = Target::Unset;
    }
    let selector = match selector {
        Some(selector) => selector,
        None => return Ok(()),
    };
    for clause in split_fields(selector, ';') {
        let parts = split_fields(clause, '=');
        if parts.len() > 2 {
            return Err(argument_error!("selector clause {:?} has more than one '='", clause));
        }
        if parts.len() < 2 {
            return Err(argument_error!("selector clause {:?} is missing '='", clause));
        }
        let index: usize = parts[0]
            .parse()
            .map_err(|_| argument_error!("selector clause {:?} has a bad index", clause))?;
        let count = entries.len();
        let entry = entries.get_mut(index).ok_or_else(|| {
            argument_error!("selector index {} is out of range (0..{})", index, count)
        })?;
        for spec in split_fields(parts[1], ':') {
            apply_spec(spec, entry)?;
        }
    }
    Ok(())
}

fn apply_spec(spec: &str, entry: &mut IconEntry) -> IconResult<()> {
    let size = entry
        .layout
        .as_deref()
        .and_then(leading_size)
        .unwrap_or(entry.size);
    if spec.eq_ignore_ascii_case("png") {
        entry.layout = Some(format!("{} PNG", size));
    } else if spec.eq_ignore_ascii_case("bit") {
        entry.layout = Some(format!("{} 32-bit", size));
    } else if matches!(spec.chars().count(), 3 | 4) {
        entry.tag = spec.to_string();
    } else if spec == "*" {
        entry.target = Target::Omit;
    } else {
        return Err(argument_error!("unknown selector spec {:?}", spec));
    }
    Ok(())
}

/// Splits like a regular-expression split that drops trailing empty
/// fields, so `"0=png;"` is a single clause.  Text without the separator
/// is returned whole, even when empty.
fn split_fields(text: &str, separator: char) -> Vec<&str> {
    if !text.contains(separator) {
        return vec![text];
    }
    let mut fields: Vec<&str> = text.split(separator).collect();
    while fields.last() == Some(&"") {
        fields.pop();
    }
    fields
}
