//! YAML front matter.
//!
//! A document opens its metadata block with a `---` line and closes it with
//! `---` or `...`:
//!
//! ```text
//! ---
//! title: Hello
//! tags: [go, infra]
//! publish: true
//! template: post
//! ---
//! # body starts here
//! ```
//!
//! A document that does not start with `---` has empty front matter.

use crate::error::{SiteError, SiteResult};
use serde_yaml::{Mapping, Value};
use std::path::Path;

const OPEN_FENCE: &str = "---";
const CLOSE_FENCES: &[&str] = &["---", "..."];

/// Ordered key → value mapping parsed from a metadata block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    map: Mapping,
}

impl FrontMatter {
    /// Value under `key`. Absence is not an error.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// `publish: true` exactly. Anything else, including absence, is unpublished.
    pub fn is_published(&self) -> bool {
        matches!(self.get("publish"), Some(Value::Bool(true)))
    }

    /// Tags as an ordered, de-duplicated list.
    ///
    /// Absent → `Ok(vec![])`. Present but not a sequence of strings → `Err`
    /// with a reason; callers treat that as "no tags".
    pub fn tags(&self) -> Result<Vec<String>, String> {
        let Some(value) = self.get("tags") else {
            return Ok(Vec::new());
        };
        let Value::Sequence(items) = value else {
            return Err(format!("`tags` must be a list, found {}", type_name(value)));
        };

        let mut tags: Vec<String> = Vec::with_capacity(items.len());
        for item in items {
            let Value::String(tag) = item else {
                return Err(format!(
                    "`tags` must contain only strings, found {}",
                    type_name(item)
                ));
            };
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_owned());
            }
        }
        Ok(tags)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Split `text` into its metadata block (if any) and body.
///
/// Returns `Err` with a reason when the block is opened but never closed.
pub fn split(text: &str) -> Result<(Option<&str>, &str), String> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let Some((first, rest)) = text.split_once('\n') else {
        return Ok((None, text));
    };
    if first.trim_end() != OPEN_FENCE {
        return Ok((None, text));
    }

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if CLOSE_FENCES.contains(&trimmed) {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Ok((Some(yaml), body));
        }
        offset += line.len();
    }

    Err("front matter block is not closed".into())
}

/// Parse the metadata block of `text`, returning it with the remaining body.
pub fn parse<'a>(path: &Path, text: &'a str) -> SiteResult<(FrontMatter, &'a str)> {
    let error = |message: String| SiteError::FrontMatter {
        path: path.to_path_buf(),
        message,
    };

    let (yaml, body) = split(text).map_err(error)?;
    let Some(yaml) = yaml.filter(|yaml| !yaml.trim().is_empty()) else {
        return Ok((FrontMatter::default(), body));
    };

    let value: Value = serde_yaml::from_str(yaml).map_err(|err| error(err.to_string()))?;
    let map = match value {
        Value::Mapping(map) => map,
        Value::Null => Mapping::new(),
        other => {
            return Err(error(format!(
                "expected a mapping of keys, found {}",
                type_name(&other)
            )));
        }
    };

    Ok((FrontMatter { map }, body))
}
