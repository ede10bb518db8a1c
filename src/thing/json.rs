//! Read-only view over JSON objects.
//!
//! Inbound messages stay in their receive buffer: a [`Params`] borrows the
//! text and every lookup runs a `serde-json-core` deserializer over it,
//! skipping the members it does not need. Nothing here allocates.

use core::fmt;
use core::marker::PhantomData;

use heapless::String;
use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json_core::str::{EscapedStr, EscapedStringFragment};

use super::Error;

/// A JSON object, borrowed from the message it came from.
///
/// Keys are compared after escape decoding, so `"\u0070ower"` matches
/// `power`. When a key repeats, the first occurrence wins. Nested objects
/// are read by deserializing them into a type of their own.
///
/// ```rust
/// use serde::Deserialize;
/// use thinglink::thing::Params;
///
/// #[derive(Deserialize)]
/// struct Color {
///     r: u8,
/// }
///
/// let params = Params::parse(r#"{"power": 1, "name": "lamp\n2", "color": {"r": 255}}"#).unwrap();
/// assert_eq!(params.get::<u8>("power"), Some(1));
/// assert_eq!(params.get_str::<16>("name").unwrap().as_str(), "lamp\n2");
/// assert_eq!(params.get::<Color>("color").map(|c| c.r), Some(255));
/// assert!(!params.contains_key("speed"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params<'a> {
    text: &'a str,
    member: Option<&'static str>,
}

impl<'a> Params<'a> {
    /// Check that `text` is a single JSON object and view it.
    pub fn parse(text: &'a str) -> Result<Self, Error> {
        validate_object(text)?;
        Ok(Self { text, member: None })
    }

    /// The empty object `{}`.
    pub const fn empty() -> Params<'static> {
        Params {
            text: "{}",
            member: None,
        }
    }

    /// View the object under `member` of the already validated object in
    /// `text`. A missing or non-object member reads as empty.
    pub(crate) const fn member(text: &'a str, member: &'static str) -> Self {
        Self {
            text,
            member: Some(member),
        }
    }

    /// Deserialize the value under `key`.
    ///
    /// Returns `None` when the key is missing or the value does not fit `T`.
    /// Borrowed `&str` values come back with their escapes still encoded;
    /// use [`Params::get_str`] for text.
    pub fn get<T: Deserialize<'a>>(&self, key: &str) -> Option<T> {
        self.read(Member::new(key, PhantomData::<T>)).flatten()
    }

    /// The decoded string under `key`, if it is a string and fits in `N` bytes.
    pub fn get_str<const N: usize>(&self, key: &str) -> Option<String<N>> {
        let escaped: EscapedStr<'a> = self.get(key)?;
        unescape(escaped)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get::<IgnoredAny>(key).is_some()
    }

    /// Number of members, duplicates included.
    pub fn len(&self) -> usize {
        self.read(Count).unwrap_or(0)
    }

    /// Whether the object has no members.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `seed` over the object this view stands for.
    fn read<S: DeserializeSeed<'a>>(&self, seed: S) -> Option<S::Value> {
        match self.member {
            None => deserialize(self.text, seed),
            Some(member) => deserialize(self.text, Member::new(member, seed)).flatten(),
        }
    }
}

/// Check that `text` is exactly one JSON object, surrounding whitespace allowed.
pub(crate) fn validate_object(text: &str) -> Result<(), Error> {
    deserialize(text, Count).map(|_| ()).ok_or(Error::Malformed)
}

/// Check that `text` is exactly one JSON value, surrounding whitespace allowed.
pub(crate) fn validate_value(text: &str) -> Result<(), Error> {
    let valid = match text.trim_start().as_bytes().first() {
        Some(b'{') => deserialize(text, Count).is_some(),
        Some(b'[') => deserialize(text, PhantomData::<Skip>).is_some(),
        Some(b'"') => deserialize(text, PhantomData::<EscapedStr<'_>>).is_some(),
        Some(b't' | b'f') => deserialize(text, PhantomData::<bool>).is_some(),
        Some(b'n') => deserialize(text, PhantomData::<()>).is_some(),
        Some(b'-' | b'0'..=b'9') => deserialize(text, PhantomData::<f64>).is_some(),
        _ => false,
    };
    if valid { Ok(()) } else { Err(Error::Malformed) }
}

/// Decode a JSON string body into an owned string of at most `N` bytes.
pub(crate) fn unescape<const N: usize>(escaped: EscapedStr<'_>) -> Option<String<N>> {
    let mut out = String::new();
    for fragment in escaped.fragments() {
        match fragment.ok()? {
            EscapedStringFragment::NotEscaped(text) => out.push_str(text).ok()?,
            EscapedStringFragment::Escaped(c) => out.push(c).ok()?,
        }
    }
    Some(out)
}

/// Whether the JSON string body `escaped` decodes to exactly `text`.
pub(crate) fn decodes_to(escaped: EscapedStr<'_>, text: &str) -> bool {
    let mut rest = text;
    for fragment in escaped.fragments() {
        let next = match fragment {
            Ok(EscapedStringFragment::NotEscaped(part)) => rest.strip_prefix(part),
            Ok(EscapedStringFragment::Escaped(c)) => rest.strip_prefix(c),
            Err(_) => None,
        };
        match next {
            Some(next) => rest = next,
            None => return false,
        }
    }
    rest.is_empty()
}

/// Run `seed` over all of `text`; trailing data is an error.
fn deserialize<'a, S: DeserializeSeed<'a>>(text: &'a str, seed: S) -> Option<S::Value> {
    let mut de = serde_json_core::de::Deserializer::new(text.as_bytes(), None);
    let value = seed.deserialize(&mut de).ok()?;
    de.end().ok()?;
    Some(value)
}

/// Finds the first member named `key` and hands its value to `seed`.
struct Member<'k, S> {
    key: &'k str,
    seed: S,
}

impl<'k, S> Member<'k, S> {
    fn new(key: &'k str, seed: S) -> Self {
        Self { key, seed }
    }
}

impl<'de, S: DeserializeSeed<'de>> DeserializeSeed<'de> for Member<'_, S> {
    type Value = Option<S::Value>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de, S: DeserializeSeed<'de>> Visitor<'de> for Member<'_, S> {
    type Value = Option<S::Value>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut seed = Some(self.seed);
        let mut found = None;
        while let Some(matches) = map.next_key_seed(KeyIs(self.key))? {
            match (matches, seed.take()) {
                (true, Some(wanted)) => found = Some(map.next_value_seed(wanted)?),
                (_, unused) => {
                    seed = unused;
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(found)
    }
}

/// Compares an object key against `self.0` after decoding escapes.
struct KeyIs<'k>(&'k str);

impl<'de> DeserializeSeed<'de> for KeyIs<'_> {
    type Value = bool;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<bool, D::Error> {
        deserializer.deserialize_str(self)
    }
}

impl<'de> Visitor<'de> for KeyIs<'_> {
    type Value = bool;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object key")
    }

    fn visit_str<E: de::Error>(self, key: &str) -> Result<bool, E> {
        Ok(decodes_to(EscapedStr(key), self.0))
    }
}

/// Counts the members of an object, skipping their values.
struct Count;

impl<'de> DeserializeSeed<'de> for Count {
    type Value = usize;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<usize, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for Count {
    type Value = usize;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<usize, A::Error> {
        let mut count = 0;
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {
            count += 1;
        }
        Ok(count)
    }
}

/// Any JSON array, elements skipped.
struct Skip;

impl<'de> Deserialize<'de> for Skip {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(Skip)
    }
}

impl<'de> Visitor<'de> for Skip {
    type Value = Skip;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON array")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Skip, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Skip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Color {
        r: u8,
        g: u8,
    }

    #[test]
    fn test_values_accepted() {
        for raw in [
            "0",
            "-12.5e+3",
            "true",
            "null",
            r#""aé\n""#,
            "[]",
            "[1, [2, {}]]",
            r#" {"a": {"b": [true, false]}} "#,
        ] {
            assert_eq!(validate_value(raw), Ok(()), "{}", raw);
        }
    }

    #[test]
    fn test_values_rejected() {
        for raw in [
            "",
            "tru",
            "-",
            r#""unterminated"#,
            "{\"a\":1,}",
            "[1,]",
            "{} {}",
            "{'a':1}",
            "{oops",
            "nope",
        ] {
            assert_eq!(validate_value(raw), Err(Error::Malformed), "{}", raw);
        }
    }

    #[test]
    fn test_parse_requires_object() {
        assert!(Params::parse("[1]").is_err());
        assert!(Params::parse("42").is_err());
        assert!(Params::parse("{\"a\":1").is_err());
        assert!(Params::parse("  {}\n").is_ok());
    }

    #[test]
    fn test_len_counts_members() {
        let params = Params::parse(r#"{"b": 1, "a": "x", "c": [1,2], "d": {"e": null}}"#).unwrap();
        assert_eq!(params.len(), 4);
        assert!(Params::parse("{ }").unwrap().is_empty());
        assert!(Params::empty().is_empty());
    }

    #[test]
    fn test_typed_access() {
        let params = Params::parse(r#"{"power":1,"temp":21.5,"on":true,"id":"abc"}"#).unwrap();
        assert_eq!(params.get::<i32>("power"), Some(1));
        assert_eq!(params.get::<f32>("temp"), Some(21.5));
        assert_eq!(params.get::<bool>("on"), Some(true));
        assert_eq!(params.get::<&str>("id"), Some("abc"));
        assert_eq!(params.get::<bool>("power"), None);
        assert_eq!(params.get::<i32>("missing"), None);
    }

    #[test]
    fn test_nested_struct() {
        let params = Params::parse(r#"{"color":{"g":2,"alpha":0.5,"r":1}}"#).unwrap();
        assert_eq!(params.get::<Color>("color"), Some(Color { r: 1, g: 2 }));
    }

    #[test]
    fn test_first_duplicate_wins() {
        let params = Params::parse(r#"{"a":1,"a":2}"#).unwrap();
        assert_eq!(params.get::<u8>("a"), Some(1));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_escaped_key_matches() {
        let params = Params::parse(r#"{"\u0070ower":1}"#).unwrap();
        assert!(params.contains_key("power"));
        assert_eq!(params.get::<u8>("power"), Some(1));
        assert!(!params.contains_key("\\u0070ower"));
    }

    #[test]
    fn test_get_str_decodes_escapes() {
        let params = Params::parse(r#"{"s":"a\"b\\c\/dé😀"}"#).unwrap();
        let s = params.get_str::<32>("s").unwrap();
        assert_eq!(s.as_str(), "a\"b\\c/d\u{e9}\u{1F600}");
        assert!(params.get_str::<4>("s").is_none());
    }

    #[test]
    fn test_get_str_rejects_non_strings() {
        let params = Params::parse(r#"{"n":5}"#).unwrap();
        assert!(params.get_str::<8>("n").is_none());
    }

    #[test]
    fn test_member_view() {
        let text = r#"{"method":"control","params":{"power":1},"power":9}"#;
        let params = Params::member(text, "params");
        assert_eq!(params.get::<u8>("power"), Some(1));
        assert_eq!(params.len(), 1);
        assert!(!params.contains_key("method"));
    }

    #[test]
    fn test_missing_member_reads_empty() {
        let params = Params::member(r#"{"method":"control"}"#, "params");
        assert!(params.is_empty());
        assert!(!params.contains_key("power"));

        let params = Params::member(r#"{"params":5}"#, "params");
        assert!(params.is_empty());
    }

    #[test]
    fn test_decodes_to() {
        assert!(decodes_to(EscapedStr(r"line\nbreak"), "line\nbreak"));
        assert!(decodes_to(EscapedStr(""), ""));
        assert!(!decodes_to(EscapedStr("abc"), "ab"));
        assert!(!decodes_to(EscapedStr("ab"), "abc"));
        assert!(!decodes_to(EscapedStr(r"\x"), "x"));
    }
}
