//! Generic search filters and their IMAP translation.
//!
//! A [`SearchFilter`] is a flat key/value map. Keys are matched ignoring
//! case, `-` and `_`, so `before-date`, `BeforeDate` and `before_date` are
//! the same key. Unknown keys are ignored. POP3 never looks at filters.

use chrono::NaiveDate;
use mailbridge_imap::SearchKey;

use crate::error::{Error, Result};

/// A filter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// Flag keys such as `seen`.
    Bool(bool),
    /// Substring keys such as `subject`.
    Text(String),
    /// Date keys such as `afterdate`.
    Date(NaiveDate),
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

/// An ordered filter map. Setting a key again replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    entries: Vec<(String, FilterValue)>,
}

impl SearchFilter {
    /// Creates an empty filter, which matches every message.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Sets a key and returns the filter.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<FilterValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets a key.
    pub fn set(&mut self, key: &str, value: impl Into<FilterValue>) {
        let value = value.into();
        let normalized = normalize_key(key);
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| normalize_key(existing) == normalized)
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    /// Value of a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        let normalized = normalize_key(key);
        self.entries
            .iter()
            .find(|(existing, _)| normalize_key(existing) == normalized)
            .map(|(_, value)| value)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no key is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates keys and values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Translates to an IMAP search key.
    ///
    /// Each recognized key adds one condition to a conjunction. With no
    /// recognized key the result is [`SearchKey::All`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgumentType`] if a recognized key holds a
    /// value of the wrong kind.
    pub fn to_search_key(&self) -> Result<SearchKey> {
        let mut keys = Vec::new();
        for (name, value) in &self.entries {
            if let Some(key) = translate(name, value)? {
                keys.push(key);
            }
        }
        Ok(match keys.len() {
            0 => SearchKey::All,
            1 => keys.remove(0),
            _ => SearchKey::And(keys),
        })
    }
}

impl<K: AsRef<str>, V: Into<FilterValue>> FromIterator<(K, V)> for SearchFilter {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut filter = Self::new();
        for (key, value) in iter {
            filter.set(key.as_ref(), value);
        }
        filter
    }
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

enum Kind {
    Flag(SearchKey, SearchKey),
    Text(fn(String) -> SearchKey),
    Date(fn(NaiveDate) -> SearchKey),
}

fn kind_of(normalized: &str) -> Option<Kind> {
    let kind = match normalized {
        "answered" => Kind::Flag(SearchKey::Answered, SearchKey::Unanswered),
        "recent" => Kind::Flag(SearchKey::Recent, SearchKey::Old),
        "deleted" => Kind::Flag(SearchKey::Deleted, SearchKey::Undeleted),
        "flagged" => Kind::Flag(SearchKey::Flagged, SearchKey::Unflagged),
        "seen" => Kind::Flag(SearchKey::Seen, SearchKey::Unseen),
        "new" => Kind::Flag(SearchKey::New, SearchKey::not(SearchKey::New)),
        "bcc" => Kind::Text(SearchKey::Bcc),
        "cc" => Kind::Text(SearchKey::Cc),
        "to" => Kind::Text(SearchKey::To),
        "from" => Kind::Text(SearchKey::From),
        "subject" => Kind::Text(SearchKey::Subject),
        "text" => Kind::Text(SearchKey::Text),
        "body" => Kind::Text(SearchKey::Body),
        "date" | "postingdate" => Kind::Date(SearchKey::SentOn),
        "beforedate" | "beforedateofposting" => Kind::Date(SearchKey::SentBefore),
        "afterdate" | "afterdateofposting" => Kind::Date(SearchKey::SentSince),
        _ => return None,
    };
    Some(kind)
}

fn translate(name: &str, value: &FilterValue) -> Result<Option<SearchKey>> {
    let Some(kind) = kind_of(&normalize_key(name)) else {
        return Ok(None);
    };
    let key = match (kind, value) {
        (Kind::Flag(yes, no), FilterValue::Bool(flag)) => {
            if *flag {
                yes
            } else {
                no
            }
        }
        (Kind::Text(make), FilterValue::Text(text)) => make(text.clone()),
        (Kind::Date(make), FilterValue::Date(date)) => make(*date),
        (Kind::Flag(..), _) => return Err(wrong_kind(name, "a boolean")),
        (Kind::Text(_), _) => return Err(wrong_kind(name, "a string")),
        (Kind::Date(_), _) => return Err(wrong_kind(name, "a date")),
    };
    Ok(Some(key))
}

fn wrong_kind(name: &str, expected: &str) -> Error {
    Error::InvalidArgumentType(format!("filter key {name:?} needs {expected}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_empty_matches_all() {
        assert_eq!(SearchFilter::new().to_search_key().unwrap(), SearchKey::All);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let filter = SearchFilter::new()
            .with("priority", true)
            .with("x-spam-score", "high");
        assert_eq!(filter.to_search_key().unwrap(), SearchKey::All);
    }

    #[test]
    fn test_flag_polarity() {
        let filter = SearchFilter::new().with("Seen", false);
        assert_eq!(filter.to_search_key().unwrap(), SearchKey::Unseen);

        let filter = SearchFilter::new().with("new", false);
        assert_eq!(
            filter.to_search_key().unwrap(),
            SearchKey::not(SearchKey::New)
        );
    }

    #[test]
    fn test_conjunction_in_insertion_order() {
        let filter: SearchFilter = [
            ("subject", FilterValue::from("invoice")),
            ("Before-Date", FilterValue::from(day(2025, 1, 31))),
            ("after_date_of_posting", FilterValue::from(day(2025, 1, 1))),
            ("flagged", FilterValue::from(true)),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            filter.to_search_key().unwrap(),
            SearchKey::And(vec![
                SearchKey::Subject("invoice".into()),
                SearchKey::SentBefore(day(2025, 1, 31)),
                SearchKey::SentSince(day(2025, 1, 1)),
                SearchKey::Flagged,
            ])
        );
    }

    #[test]
    fn test_key_normalization_replaces() {
        let mut filter = SearchFilter::new().with("from", "alice");
        filter.set("FROM", "bob");
        assert_eq!(filter.len(), 1);
        assert_eq!(filter.get("From"), Some(&FilterValue::Text("bob".into())));
        assert_eq!(
            filter.to_search_key().unwrap(),
            SearchKey::From("bob".into())
        );
    }

    #[test]
    fn test_posting_date_alias() {
        let filter = SearchFilter::new().with("PostingDate", day(2024, 12, 25));
        assert_eq!(
            filter.to_search_key().unwrap(),
            SearchKey::SentOn(day(2024, 12, 25))
        );
    }

    #[test]
    fn test_wrong_value_kind() {
        let filter = SearchFilter::new().with("seen", "yes");
        assert!(matches!(
            filter.to_search_key(),
            Err(Error::InvalidArgumentType(_))
        ));
        let filter = SearchFilter::new().with("subject", true);
        assert!(matches!(
            filter.to_search_key(),
            Err(Error::InvalidArgumentType(_))
        ));
        let filter = SearchFilter::new().with("afterdate", "2024-01-01");
        assert!(matches!(
            filter.to_search_key(),
            Err(Error::InvalidArgumentType(_))
        ));
    }
}
