use jiff::{
    Timestamp,
    civil::{Date, DateTime, Time},
    tz::Offset,
};

use crate::chew::ChewError;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn number<T: std::str::FromStr>(value: &str, input: &str) -> Result<T, ChewError> {
    if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(ChewError::InvalidDate(input.to_string()));
    }
    value
        .parse()
        .map_err(|_| ChewError::InvalidDate(input.to_string()))
}

fn zone_seconds(zone: &str, input: &str) -> Result<i32, ChewError> {
    let invalid = || ChewError::InvalidDate(input.to_string());
    let (sign, digits) = match zone.split_at_checked(1) {
        Some(("+", digits)) => (1, digits),
        Some(("-", digits)) => (-1, digits),
        _ => return Err(invalid()),
    };
    if digits.len() != 4 {
        return Err(invalid());
    }
    let hours: i32 = number(&digits[..2], input)?;
    let minutes: i32 = number(&digits[2..], input)?;

    Ok(sign * (hours * 3600 + minutes * 60))
}

/// Parses an IMAP `date-time` with its quotes already stripped, e.g.
/// `17-Jul-1996 02:44:25 -0700`.
///
/// The day may be a single digit with or without a leading space and a
/// missing zone counts as UTC.
pub fn parse_imap_date_time(input: &str) -> Result<Timestamp, ChewError> {
    let invalid = || ChewError::InvalidDate(input.to_string());

    let mut fields = input.strip_prefix(' ').unwrap_or(input).split(' ');
    let date = fields.next().ok_or_else(invalid)?;
    let time = fields.next().ok_or_else(invalid)?;
    let zone = fields.next();
    if fields.next().is_some() {
        return Err(invalid());
    }

    let mut date_fields = date.splitn(3, '-');
    let (Some(day), Some(month), Some(year)) =
        (date_fields.next(), date_fields.next(), date_fields.next())
    else {
        return Err(invalid());
    };
    if day.len() > 2 || year.len() != 4 {
        return Err(invalid());
    }
    let month = MONTHS
        .iter()
        .position(|name| *name == month)
        .ok_or_else(invalid)?;

    let mut time_fields = time.splitn(3, ':');
    let (Some(hour), Some(minute), Some(second)) =
        (time_fields.next(), time_fields.next(), time_fields.next())
    else {
        return Err(invalid());
    };
    if [hour, minute, second].iter().any(|field| field.len() != 2) {
        return Err(invalid());
    }

    let date = Date::new(
        number(year, input)?,
        i8::try_from(month + 1).map_err(|_| invalid())?,
        number(day, input)?,
    )
    .map_err(|_| invalid())?;
    let time = Time::new(
        number(hour, input)?,
        number(minute, input)?,
        number(second, input)?,
        0,
    )
    .map_err(|_| invalid())?;
    let offset = match zone {
        Some(zone) => Offset::from_seconds(zone_seconds(zone, input)?).map_err(|_| invalid())?,
        None => Offset::UTC,
    };

    offset
        .to_timestamp(DateTime::from_parts(date, time))
        .map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;

    #[rstest]
    #[case("17-Jul-1996 02:44:25 -0700", "1996-07-17T09:44:25Z")]
    #[case("17-Jul-1996 02:44:25 +0130", "1996-07-17T01:14:25Z")]
    #[case(" 7-Feb-2020 23:00:00 +0000", "2020-02-07T23:00:00Z")]
    #[case("7-Feb-2020 23:00:00 +0000", "2020-02-07T23:00:00Z")]
    #[case("07-Feb-2020 23:00:00", "2020-02-07T23:00:00Z")]
    fn test_parses_imap_date_time(#[case] input: &str, #[case] expected: &str) {
        let expected: Timestamp = assert_ok!(expected.parse());

        assert_eq!(assert_ok!(parse_imap_date_time(input)), expected);
    }

    #[rstest]
    #[case("")]
    #[case("17-July-1996 02:44:25 -0700")]
    #[case("17-Jul-96 02:44:25 -0700")]
    #[case("31-Feb-2020 10:00:00 +0000")]
    #[case("17-Jul-1996 2:44:25 -0700")]
    #[case("17-Jul-1996 02:44:25 0700")]
    #[case("17-Jul-1996 02:44:25 -0700 extra")]
    fn test_rejects_malformed_date_time(#[case] input: &str) {
        assert_matches!(parse_imap_date_time(input), Err(ChewError::InvalidDate(_)));
    }
}
