use std::str::FromStr;

use serde::Serialize;

/// Ordered multimap of node properties.
///
/// A name may be recorded several times. Names keep the order in which they were
/// first seen and every value list keeps insertion order, so both the original
/// annotation ([`Properties::first`]) and the most specific one ([`Properties::get`])
/// stay available.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct Properties {
    entries: Vec<(String, Vec<String>)>,
}

impl Properties {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// First value ever recorded for `name`.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.all(name).first().map(String::as_str)
    }

    /// Authoritative value for `name`: the one recorded last.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.all(name).last().map(String::as_str)
    }

    #[must_use]
    pub fn all(&self, name: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map_or(&[][..], |(_, values)| values.as_slice())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Every `(name, value)` pair, grouped by name in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(name, values)| {
            values
                .iter()
                .map(move |value| (name.as_str(), value.as_str()))
        })
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses the first value of `name`. `Err` carries the raw value that failed.
    pub fn first_as<T: FromStr>(&self, name: &str) -> Result<Option<T>, String> {
        parse_value(self.first(name))
    }

    /// Parses the authoritative value of `name`.
    pub fn get_as<T: FromStr>(&self, name: &str) -> Result<Option<T>, String> {
        parse_value(self.get(name))
    }
}

fn parse_value<T: FromStr>(raw: Option<&str>) -> Result<Option<T>, String> {
    raw.map(|value| value.trim().parse::<T>().map_err(|_| value.to_string()))
        .transpose()
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut properties = Self::new();
        for (name, value) in iter {
            properties.push(name, value);
        }
        properties
    }
}
