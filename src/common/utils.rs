use std::fmt::Display;
use std::str::FromStr;

use crate::common::errors::Error;

/// Reads `key` through `lookup` and parses it, `Ok(None)` when unset.
pub fn parse_override<T, F>(lookup: &F, key: &str) -> Result<Option<T>, Error>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| Error::InvalidConfig(format!("{key}={raw:?}: {err}"))),
    }
}
