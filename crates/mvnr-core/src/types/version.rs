//! Maven version ordering.
//!
//! Versions are split into numeric and qualifier items, grouped into nested
//! lists at every `-` and at every digit/letter transition. Trailing "null"
//! items (`0`, release qualifiers, empty lists) are dropped so that `1`,
//! `1.0` and `1-ga` compare equal.
//!
//! Well-known qualifiers order as
//! `alpha < beta < milestone < rc < snapshot < "" (release) < sp`; unknown
//! qualifiers sort after `sp`, lexically among themselves.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Qualifier used by mutable development versions
pub const SNAPSHOT: &str = "SNAPSHOT";

const QUALIFIERS: [&str; 7] = ["alpha", "beta", "milestone", "rc", "snapshot", "", "sp"];

/// Rank of the empty qualifier, i.e. a plain release
const RELEASE_INDEX: &str = "5";

/// Version parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Version string is empty")]
    Empty,

    #[error("Invalid character '{character}' in version {input}")]
    InvalidCharacter { input: String, character: char },
}

#[derive(Debug, Clone)]
enum Item {
    /// Digits without leading zeros; zero is "0"
    Int(String),
    Str(String),
    List(Vec<Item>),
}

/// A Maven version with comparable-version ordering
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    items: Vec<Item>,
    canonical: String,
}

impl Version {
    /// The version string exactly as declared
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Normalized form used for equality and hashing
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Whether this is a `-SNAPSHOT` or timestamped snapshot version
    pub fn is_snapshot(&self) -> bool {
        is_snapshot(&self.raw)
    }

    /// The `-SNAPSHOT` form of a timestamped snapshot, otherwise the version itself
    pub fn base_version(&self) -> String {
        base_version(&self.raw)
    }
}

/// Whether a version string denotes a snapshot
pub fn is_snapshot(version: &str) -> bool {
    version.to_ascii_uppercase().ends_with(SNAPSHOT) || is_timestamped_snapshot(version)
}

/// Whether a version string is a deployed snapshot of the form
/// `1.0-20240101.120000-3`
pub fn is_timestamped_snapshot(version: &str) -> bool {
    split_timestamped(version).is_some()
}

/// Convert `1.0-20240101.120000-3` into `1.0-SNAPSHOT`; other versions are
/// returned unchanged
pub fn base_version(version: &str) -> String {
    match split_timestamped(version) {
        Some(prefix) => format!("{prefix}-{SNAPSHOT}"),
        None => version.to_string(),
    }
}

fn split_timestamped(version: &str) -> Option<&str> {
    let (rest, build) = version.rsplit_once('-')?;
    if build.is_empty() || !build.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (prefix, stamp) = rest.rsplit_once('-')?;
    let (date, time) = stamp.split_once('.')?;
    let digits = |s: &str, n: usize| s.len() == n && s.bytes().all(|b| b.is_ascii_digit());
    if prefix.is_empty() || !digits(date, 8) || !digits(time, 6) {
        return None;
    }
    Some(prefix)
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(VersionError::Empty);
        }
        if let Some(character) = raw
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '[' | ']' | '(' | ')' | ',' | '/'))
        {
            return Err(VersionError::InvalidCharacter {
                input: raw.to_string(),
                character,
            });
        }

        let items = parse_items(&raw.to_lowercase());
        let canonical = render_list(&items);
        Ok(Self {
            raw: raw.to_string(),
            items,
            canonical,
        })
    }
}

fn parse_items(version: &str) -> Vec<Item> {
    // Innermost list is last; every new list is appended to its parent on close.
    let mut stack: Vec<Vec<Item>> = vec![Vec::new()];
    let chars: Vec<char> = version.chars().collect();
    let mut is_digit = false;
    let mut start = 0usize;

    fn current(stack: &mut [Vec<Item>]) -> &mut Vec<Item> {
        let last = stack.len() - 1;
        &mut stack[last]
    }

    for (i, &c) in chars.iter().enumerate() {
        let token: String = chars[start..i].iter().collect();
        match c {
            '.' => {
                let item = if i == start {
                    Item::Int("0".to_string())
                } else {
                    parse_item(is_digit, &token)
                };
                current(&mut stack).push(item);
                start = i + 1;
            },
            '-' => {
                let item = if i == start {
                    Item::Int("0".to_string())
                } else {
                    parse_item(is_digit, &token)
                };
                current(&mut stack).push(item);
                start = i + 1;
                stack.push(Vec::new());
            },
            c if c.is_ascii_digit() => {
                if !is_digit && i > start {
                    current(&mut stack).push(string_item(&token, true));
                    start = i;
                    stack.push(Vec::new());
                }
                is_digit = true;
            },
            _ => {
                if is_digit && i > start {
                    current(&mut stack).push(parse_item(true, &token));
                    start = i;
                    stack.push(Vec::new());
                }
                is_digit = false;
            },
        }
    }

    if chars.len() > start {
        let token: String = chars[start..].iter().collect();
        current(&mut stack).push(parse_item(is_digit, &token));
    }

    while stack.len() > 1 {
        let mut child = stack.pop().unwrap_or_default();
        normalize(&mut child);
        current(&mut stack).push(Item::List(child));
    }
    let mut root = stack.pop().unwrap_or_default();
    normalize(&mut root);
    root
}

fn parse_item(is_digit: bool, token: &str) -> Item {
    if is_digit {
        let trimmed = token.trim_start_matches('0');
        Item::Int(if trimmed.is_empty() { "0" } else { trimmed }.to_string())
    } else {
        string_item(token, false)
    }
}

fn string_item(token: &str, followed_by_digit: bool) -> Item {
    let value = match token {
        "a" if followed_by_digit => "alpha",
        "b" if followed_by_digit => "beta",
        "m" if followed_by_digit => "milestone",
        "ga" | "final" | "release" => "",
        "cr" => "rc",
        other => other,
    };
    Item::Str(value.to_string())
}

fn normalize(list: &mut Vec<Item>) {
    // Trailing nulls are dropped; a non-null sublist does not stop the scan.
    let mut i = list.len();
    while i > 0 {
        i -= 1;
        if is_null(&list[i]) {
            list.remove(i);
        } else if !matches!(list[i], Item::List(_)) {
            break;
        }
    }
}

fn is_null(item: &Item) -> bool {
    match item {
        Item::Int(n) => n == "0",
        Item::Str(s) => comparable_qualifier(s) == RELEASE_INDEX,
        Item::List(l) => l.is_empty(),
    }
}

fn comparable_qualifier(qualifier: &str) -> String {
    match QUALIFIERS.iter().position(|q| *q == qualifier) {
        Some(index) => index.to_string(),
        None => format!("{}-{}", QUALIFIERS.len(), qualifier),
    }
}

fn compare_int(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Compare an item against a missing counterpart
fn compare_to_null(item: &Item) -> Ordering {
    match item {
        Item::Int(n) if n == "0" => Ordering::Equal,
        Item::Int(_) => Ordering::Greater,
        Item::Str(s) => comparable_qualifier(s).as_str().cmp(RELEASE_INDEX),
        Item::List(l) => l.first().map_or(Ordering::Equal, compare_to_null),
    }
}

fn compare_items(left: &Item, right: &Item) -> Ordering {
    match (left, right) {
        (Item::Int(a), Item::Int(b)) => compare_int(a, b),
        (Item::Int(_), _) => Ordering::Greater,
        (Item::Str(_), Item::Int(_)) => Ordering::Less,
        (Item::Str(a), Item::Str(b)) => comparable_qualifier(a).cmp(&comparable_qualifier(b)),
        (Item::Str(_), Item::List(_)) => Ordering::Less,
        (Item::List(_), Item::Int(_)) => Ordering::Less,
        (Item::List(_), Item::Str(_)) => Ordering::Greater,
        (Item::List(a), Item::List(b)) => compare_lists(a, b),
    }
}

fn compare_lists(left: &[Item], right: &[Item]) -> Ordering {
    for i in 0..left.len().max(right.len()) {
        let result = match (left.get(i), right.get(i)) {
            (Some(l), Some(r)) => compare_items(l, r),
            (Some(l), None) => compare_to_null(l),
            (None, Some(r)) => compare_to_null(r).reverse(),
            (None, None) => Ordering::Equal,
        };
        if result != Ordering::Equal {
            return result;
        }
    }
    Ordering::Equal
}

fn render_list(items: &[Item]) -> String {
    let mut out = String::new();
    for item in items {
        if !out.is_empty() {
            out.push(if matches!(item, Item::List(_)) { '-' } else { '.' });
        }
        match item {
            Item::Int(n) => out.push_str(n),
            Item::Str(s) => out.push_str(s),
            Item::List(l) => out.push_str(&render_list(l)),
        }
    }
    out
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_lists(&self.items, &other.items)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
