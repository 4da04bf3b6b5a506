use chrono::DateTime;

/// Render epoch seconds as RFC 3339 for log output, falling back to the raw number
pub fn epoch_to_iso(epoch_secs: i64) -> String {
    DateTime::from_timestamp(epoch_secs, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| epoch_secs.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_to_iso() {
        assert_eq!(epoch_to_iso(0), "1970-01-01T00:00:00+00:00");
        assert_eq!(epoch_to_iso(1540000000), "2018-10-20T01:46:40+00:00");
    }
}
