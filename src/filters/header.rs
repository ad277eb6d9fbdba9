/*
 * Copyright 2024 Google LLC
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    exchange::Exchange,
    filters::{ConvertProtoConfigError, CreationError},
};

use super::proto::route as proto;

/// Matches a single request header.
///
/// # Examples
/// ```
/// use accesslog_filter::{filters::header::{HeaderMatcher, HeaderMatch}, ExchangeRecord};
///
/// let matcher = HeaderMatcher::new("x-debug", HeaderMatch::Exact("1".into()));
/// let record = ExchangeRecord::default().with_header("X-Debug", "1");
///
/// assert!(matcher.matches(&record));
/// assert!(!matcher.clone().invert(true).matches(&record));
/// assert!(!matcher.matches(&ExchangeRecord::default()));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct HeaderMatcher {
    /// The name of the header, compared without regard to ASCII case.
    pub name: String,
    /// How the header value is matched. Defaults to matching on presence.
    #[serde(default, rename = "match")]
    pub matcher: HeaderMatch,
    /// Inverts the result of the match.
    #[serde(default)]
    pub invert_match: bool,
}

/// How a header's value is compared.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HeaderMatch {
    /// Matches on the presence (`true`) or absence (`false`) of the header.
    Present(bool),
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
    /// The whole header value must match the regular expression.
    SafeRegex(#[schemars(with = "String")] SafeRegex),
    /// The header value parsed as a base 10 integer lies in `[start, end)`.
    Range { start: i64, end: i64 },
}

impl Default for HeaderMatch {
    fn default() -> Self {
        Self::Present(true)
    }
}

impl HeaderMatcher {
    pub fn new(name: impl Into<String>, matcher: HeaderMatch) -> Self {
        Self {
            name: name.into(),
            matcher,
            invert_match: false,
        }
    }

    pub fn invert(mut self, invert_match: bool) -> Self {
        self.invert_match = invert_match;
        self
    }

    /// Checks the parts of the matcher that cannot be expressed in its type.
    pub fn validate(&self) -> Result<(), CreationError> {
        if self.name.is_empty() {
            return Err(CreationError::field_invalid(
                "header.name",
                "header name cannot be empty",
            ));
        }

        if let HeaderMatch::Range { start, end } = self.matcher {
            if start >= end {
                return Err(CreationError::field_invalid(
                    "header.match.range",
                    format!("start {start} must be less than end {end}"),
                ));
            }
        }

        Ok(())
    }

    /// Returns whether the header of `exchange` satisfies this matcher.
    pub fn matches<E: Exchange + ?Sized>(&self, exchange: &E) -> bool {
        let value = exchange.header(&self.name);

        let matched = match (&self.matcher, value) {
            (HeaderMatch::Present(expected), value) => value.is_some() == *expected,
            (_, None) => false,
            (HeaderMatch::Exact(expected), Some(value)) => value == expected,
            (HeaderMatch::Prefix(prefix), Some(value)) => value.starts_with(prefix.as_str()),
            (HeaderMatch::Suffix(suffix), Some(value)) => value.ends_with(suffix.as_str()),
            (HeaderMatch::Contains(needle), Some(value)) => value.contains(needle.as_str()),
            (HeaderMatch::SafeRegex(regex), Some(value)) => regex.is_match(value),
            (HeaderMatch::Range { start, end }, Some(value)) => value
                .parse::<i64>()
                .map_or(false, |value| (*start..*end).contains(&value)),
        };

        matched != self.invert_match
    }
}

/// A regular expression that must match an entire value.
#[derive(Clone, Debug)]
pub struct SafeRegex {
    pattern: String,
    anchored: Regex,
}

impl SafeRegex {
    pub fn new(pattern: impl Into<String>) -> Result<Self, regex::Error> {
        let pattern = pattern.into();
        let anchored = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(Self { pattern, anchored })
    }

    /// The pattern as it was configured.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.anchored.is_match(value)
    }
}

impl PartialEq for SafeRegex {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Serialize for SafeRegex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.pattern)
    }
}

impl<'de> Deserialize<'de> for SafeRegex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pattern = String::deserialize(deserializer)?;
        Self::new(pattern).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<proto::HeaderMatcher> for HeaderMatcher {
    type Error = ConvertProtoConfigError;

    fn try_from(value: proto::HeaderMatcher) -> Result<Self, Self::Error> {
        use proto::header_matcher::HeaderMatchSpecifier;

        if value.name.is_empty() {
            return Err(ConvertProtoConfigError::missing_field("header.name"));
        }

        let matcher = match value.header_match_specifier {
            None => HeaderMatch::default(),
            Some(HeaderMatchSpecifier::PresentMatch(present)) => HeaderMatch::Present(present),
            Some(HeaderMatchSpecifier::ExactMatch(exact)) => HeaderMatch::Exact(exact),
            Some(HeaderMatchSpecifier::PrefixMatch(prefix)) => HeaderMatch::Prefix(prefix),
            Some(HeaderMatchSpecifier::SuffixMatch(suffix)) => HeaderMatch::Suffix(suffix),
            Some(HeaderMatchSpecifier::ContainsMatch(needle)) => HeaderMatch::Contains(needle),
            Some(HeaderMatchSpecifier::SafeRegexMatch(regex)) => SafeRegex::new(regex.regex)
                .map(HeaderMatch::SafeRegex)
                .map_err(|error| {
                    ConvertProtoConfigError::new(error, Some("header.safe_regex_match".into()))
                })?,
            Some(HeaderMatchSpecifier::RangeMatch(range)) => {
                if range.start >= range.end {
                    return Err(ConvertProtoConfigError::new(
                        format!("start {} must be less than end {}", range.start, range.end),
                        Some("header.range_match".into()),
                    ));
                }
                HeaderMatch::Range {
                    start: range.start,
                    end: range.end,
                }
            }
        };

        Ok(Self {
            name: value.name,
            matcher,
            invert_match: value.invert_match,
        })
    }
}
