//! Conversion between instants and the epoch-millisecond integers stored in the database.

use rusqlite::types::Type;
use time::OffsetDateTime;

/// Convert an instant to Unix epoch milliseconds.
pub(crate) fn to_millis(instant: OffsetDateTime) -> i64 {
    (instant.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Convert Unix epoch milliseconds read from column `column` back into a UTC instant.
pub(crate) fn from_millis(millis: i64, column: usize) -> Result<OffsetDateTime, rusqlite::Error> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(column, Type::Integer, Box::new(error))
    })
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::{from_millis, to_millis};

    #[test]
    fn millis_keep_instant_to_the_millisecond() {
        let instant = datetime!(2025-03-14 09:26:53.589 UTC);

        let got = from_millis(to_millis(instant), 0).unwrap();

        assert_eq!(got, instant);
    }

    #[test]
    fn sub_millisecond_precision_is_truncated() {
        let instant = datetime!(2025-03-14 09:26:53.589_793 UTC);

        assert_eq!(to_millis(instant), 1_741_944_413_589);
    }
}
