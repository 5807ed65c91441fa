//! Callback token codec.
//!
//! Inline buttons carry a token of the form `identifier[.data]`. The identifier
//! selects a handler; the data is opaque to everyone but that handler. Only the
//! first `.` is significant, so data may itself contain dots.

use std::str::FromStr;

use crate::{errors::Error, Result};

/// Reserved separator. Never part of an identifier.
pub const DELIMITER: char = '.';

pub fn encode(identifier: &str, data: Option<&str>) -> String {
    debug_assert!(
        !identifier.contains(DELIMITER),
        "callback identifier must not contain the delimiter: {identifier}"
    );
    match data {
        None => identifier.to_string(),
        Some(data) => format!("{identifier}{DELIMITER}{data}"),
    }
}

pub fn identifier_of(token: &str) -> &str {
    match token.split_once(DELIMITER) {
        Some((identifier, _)) => identifier,
        None => token,
    }
}

pub fn data_of(token: &str) -> Option<&str> {
    token.split_once(DELIMITER).map(|(_, data)| data)
}

/// Decode the embedded data and parse it.
///
/// Missing or unparseable data means the token was not produced by us.
pub fn parse_data<T: FromStr>(token: &str) -> Result<T> {
    let raw = data_of(token)
        .ok_or_else(|| Error::Decode(format!("callback {token:?} carries no data")))?;
    raw.parse::<T>()
        .map_err(|_| Error::Decode(format!("callback {token:?} has malformed data")))
}

/// Like [`data_of`], but missing data is a decode error.
pub fn require_data(token: &str) -> Result<&str> {
    data_of(token).ok_or_else(|| Error::Decode(format!("callback {token:?} carries no data")))
}
