// Copyright 2021-2022 Sebastian Ramacher
// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Utils used by other modules.

use chrono::{DateTime, TimeZone, Utc};
use serde::de;
use std::{fmt, marker::PhantomData};

/// Generic visitor deserializing a string field via `T::try_from(&str)`,
/// for the many newtypes in this crate that validate on construction.
pub(crate) struct TryFromStrVisitor<T> {
    expecting: &'static str,
    _marker: PhantomData<T>,
}

impl<T> TryFromStrVisitor<T> {
    pub(crate) fn new(expecting: &'static str) -> Self {
        Self {
            expecting,
            _marker: PhantomData,
        }
    }
}

impl<'de, T> de::Visitor<'de> for TryFromStrVisitor<T>
where
    T: for<'a> TryFrom<&'a str>,
{
    type Value = T;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{}", self.expecting)
    }

    fn visit_str<E>(self, s: &str) -> std::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        T::try_from(s).map_err(|_| de::Error::invalid_value(de::Unexpected::Str(s), &self))
    }
}

/// Generic visitor deserializing a whitespace-separated list of tokens,
/// each parsed via `T::try_from(&str)`. Used for fields like `Architectures`
/// and `Components` in a `Release`/`InRelease` stanza.
pub(crate) struct WhitespaceListVisitor<T> {
    _marker: PhantomData<T>,
}

impl<T> WhitespaceListVisitor<T> {
    pub(crate) fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<'de, T> de::Visitor<'de> for WhitespaceListVisitor<T>
where
    T: for<'a> TryFrom<&'a str>,
{
    type Value = Vec<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a whitespace-separated list of tokens")
    }

    fn visit_str<E>(self, s: &str) -> std::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        s.split_ascii_whitespace()
            .map(|tok| {
                T::try_from(tok).map_err(|_| de::Error::invalid_value(de::Unexpected::Str(tok), &self))
            })
            .collect()
    }
}

#[derive(Debug)]
pub(crate) struct DateTimeVisitor<'a>(pub &'a str);

impl<'de> de::Visitor<'de> for DateTimeVisitor<'_> {
    type Value = DateTime<Utc>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a date and time formatted as {}", self.0)
    }

    fn visit_str<E>(self, s: &str) -> std::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        match Utc.datetime_from_str(s, self.0) {
            Ok(dt) => Ok(dt),
            Err(_) => Err(de::Error::invalid_value(de::Unexpected::Str(s), &self)),
        }
    }
}
