//! Temporal parameter values.
//!
//! Literals arrive as ISO-8601 strings and are bound as component maps
//! (`{hour, minute, second, nanosecond}` and so on), which the matching Cypher
//! constructor (`localtime($p)`, `datetime($p)`, ...) accepts directly.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use nom::{
    bytes::complete::take_while_m_n,
    character::complete::{char, digit1},
    combinator::{all_consuming, map_res, opt},
    sequence::{preceded, terminated},
    IResult, Parser,
};
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::errors::CypherBuilderError;
use crate::graph_catalog::TemporalKind;

/// ISO-8601 duration normalized to the four components Cypher stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationValue {
    pub months: i64,
    pub days: i64,
    pub seconds: i64,
    pub nanoseconds: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemporalValue {
    DateTime(DateTime<FixedOffset>),
    LocalDateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime, FixedOffset),
    LocalTime(NaiveTime),
    Duration(DurationValue),
}

impl TemporalValue {
    pub fn parse(kind: TemporalKind, input: &str) -> Result<Self, CypherBuilderError> {
        let invalid = |reason: String| CypherBuilderError::InvalidTemporal {
            kind: format!("{:?}", kind),
            value: input.to_string(),
            reason,
        };
        let value = match kind {
            TemporalKind::DateTime => DateTime::parse_from_rfc3339(input)
                .map(TemporalValue::DateTime)
                .map_err(|e| invalid(e.to_string()))?,
            TemporalKind::LocalDateTime => {
                NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f")
                    .map(TemporalValue::LocalDateTime)
                    .map_err(|e| invalid(e.to_string()))?
            }
            TemporalKind::Date => NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .map(TemporalValue::Date)
                .map_err(|e| invalid(e.to_string()))?,
            TemporalKind::LocalTime => parse_naive_time(input)
                .map(TemporalValue::LocalTime)
                .map_err(invalid)?,
            TemporalKind::Time => {
                let (time, offset) = split_offset(input).ok_or_else(|| {
                    invalid("expected a UTC offset such as `Z` or `+01:00`".to_string())
                })?;
                TemporalValue::Time(parse_naive_time(time).map_err(invalid)?, offset)
            }
            TemporalKind::Duration => parse_duration(input)
                .map(TemporalValue::Duration)
                .map_err(invalid)?,
        };
        Ok(value)
    }
}

/// Cypher constructor accepting the component map of a temporal kind
pub fn cypher_constructor(kind: TemporalKind) -> &'static str {
    match kind {
        TemporalKind::DateTime => "datetime",
        TemporalKind::LocalDateTime => "localdatetime",
        TemporalKind::Date => "date",
        TemporalKind::Time => "time",
        TemporalKind::LocalTime => "localtime",
        TemporalKind::Duration => "duration",
    }
}

fn parse_naive_time(input: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(input, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M"))
        .map_err(|e| e.to_string())
}

/// `12:00:00+01:00` -> (`12:00:00`, +01:00)
fn split_offset(input: &str) -> Option<(&str, FixedOffset)> {
    if let Some(time) = input.strip_suffix('Z') {
        return Some((time, FixedOffset::east_opt(0)?));
    }
    let idx = input.rfind(['+', '-'])?;
    let (time, offset) = input.split_at(idx);
    let sign = if offset.starts_with('-') { -1 } else { 1 };
    let (hours, minutes) = offset[1..].split_once(':')?;
    let secs = hours.parse::<i32>().ok()? * 3600 + minutes.parse::<i32>().ok()? * 60;
    Some((time, FixedOffset::east_opt(sign * secs)?))
}

fn number(input: &str) -> IResult<&str, i64> {
    map_res(digit1, str::parse::<i64>).parse(input)
}

fn component<'a>(unit: char) -> impl Parser<&'a str, Output = Option<i64>, Error = nom::error::Error<&'a str>> {
    opt(terminated(number, char(unit)))
}

/// `12.5S` -> (12, 500_000_000)
fn seconds_component(input: &str) -> IResult<&str, Option<(i64, i64)>> {
    opt(terminated(
        (
            number,
            opt(preceded(char('.'), take_while_m_n(1, 9, |c: char| c.is_ascii_digit()))),
        ),
        char('S'),
    ))
    .map(|secs| {
        secs.map(|(whole, fraction): (i64, Option<&str>)| {
            let nanos = fraction
                .map(|f| format!("{:0<9}", f).parse::<i64>().unwrap_or(0))
                .unwrap_or(0);
            (whole, nanos)
        })
    })
    .parse(input)
}

/// Components of `P[nY][nM][nW][nD][T[nH][nM][n[.f]S]]` as written
#[derive(Debug)]
struct DurationParts {
    years: Option<i64>,
    months: Option<i64>,
    weeks: Option<i64>,
    days: Option<i64>,
    hours: Option<i64>,
    minutes: Option<i64>,
    seconds: Option<(i64, i64)>,
}

fn parse_iso_duration(input: &str) -> IResult<&str, DurationParts> {
    let (input, _) = char('P').parse(input)?;
    let (input, (years, months, weeks, days)) =
        (component('Y'), component('M'), component('W'), component('D')).parse(input)?;
    let (input, time) = opt(preceded(
        char('T'),
        (component('H'), component('M'), seconds_component),
    ))
    .parse(input)?;
    let (hours, minutes, seconds) = time.unwrap_or((None, None, None));
    Ok((
        input,
        DurationParts {
            years,
            months,
            weeks,
            days,
            hours,
            minutes,
            seconds,
        },
    ))
}

impl DurationParts {
    fn is_empty(&self) -> bool {
        self.years.is_none()
            && self.months.is_none()
            && self.weeks.is_none()
            && self.days.is_none()
            && self.hours.is_none()
            && self.minutes.is_none()
            && self.seconds.is_none()
    }

    /// Fold into Cypher's four components; `None` on overflow
    fn normalize(&self) -> Option<DurationValue> {
        let scaled = |value: Option<i64>, factor: i64| value.unwrap_or(0).checked_mul(factor);
        let (secs, nanos) = self.seconds.unwrap_or((0, 0));
        Some(DurationValue {
            months: scaled(self.years, 12)?.checked_add(self.months.unwrap_or(0))?,
            days: scaled(self.weeks, 7)?.checked_add(self.days.unwrap_or(0))?,
            seconds: scaled(self.hours, 3600)?
                .checked_add(scaled(self.minutes, 60)?)?
                .checked_add(secs)?,
            nanoseconds: nanos,
        })
    }
}

fn parse_duration(input: &str) -> Result<DurationValue, String> {
    let (_, parts) = all_consuming(parse_iso_duration)
        .parse(input)
        .map_err(|_| "expected an ISO-8601 duration such as `P1DT2H`".to_string())?;
    if parts.is_empty() || input.ends_with('T') {
        return Err("duration has no components".to_string());
    }
    parts
        .normalize()
        .ok_or_else(|| "duration is out of range".to_string())
}

impl Serialize for TemporalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            TemporalValue::DateTime(dt) => {
                write_date(&mut map, &dt.date_naive())?;
                write_time(&mut map, &dt.time())?;
                map.serialize_entry("timezone", &dt.offset().to_string())?;
            }
            TemporalValue::LocalDateTime(dt) => {
                write_date(&mut map, &dt.date())?;
                write_time(&mut map, &dt.time())?;
            }
            TemporalValue::Date(d) => write_date(&mut map, d)?,
            TemporalValue::Time(t, offset) => {
                write_time(&mut map, t)?;
                map.serialize_entry("timezone", &offset.to_string())?;
            }
            TemporalValue::LocalTime(t) => write_time(&mut map, t)?,
            TemporalValue::Duration(d) => {
                map.serialize_entry("months", &d.months)?;
                map.serialize_entry("days", &d.days)?;
                map.serialize_entry("seconds", &d.seconds)?;
                map.serialize_entry("nanoseconds", &d.nanoseconds)?;
            }
        }
        map.end()
    }
}

fn write_date<M: SerializeMap>(map: &mut M, date: &NaiveDate) -> Result<(), M::Error> {
    map.serialize_entry("year", &date.year())?;
    map.serialize_entry("month", &date.month())?;
    map.serialize_entry("day", &date.day())
}

fn write_time<M: SerializeMap>(map: &mut M, time: &NaiveTime) -> Result<(), M::Error> {
    map.serialize_entry("hour", &time.hour())?;
    map.serialize_entry("minute", &time.minute())?;
    map.serialize_entry("second", &time.second())?;
    map.serialize_entry("nanosecond", &time.nanosecond())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn test_local_time_components() {
        let value = TemporalValue::parse(TemporalKind::LocalTime, "12:34:56.5").unwrap();
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({ "hour": 12, "minute": 34, "second": 56, "nanosecond": 500_000_000 })
        );
    }

    #[test]
    fn test_datetime_keeps_offset() {
        let value = TemporalValue::parse(TemporalKind::DateTime, "2021-03-04T05:06:07+01:00").unwrap();
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["year"], 2021);
        assert_eq!(json["hour"], 5);
        assert_eq!(json["timezone"], "+01:00");
    }

    #[test]
    fn test_time_with_zulu_offset() {
        let value = TemporalValue::parse(TemporalKind::Time, "10:00:00Z").unwrap();
        assert!(matches!(value, TemporalValue::Time(..)));
        assert_eq!(serde_json::to_value(&value).unwrap()["timezone"], "+00:00");
    }

    #[test_case("P1Y2M", 14, 0, 0, 0)]
    #[test_case("P2W3D", 0, 17, 0, 0)]
    #[test_case("PT1H30M", 0, 0, 5400, 0)]
    #[test_case("P1DT0.25S", 0, 1, 0, 250_000_000)]
    fn test_iso_duration(input: &str, months: i64, days: i64, seconds: i64, nanoseconds: i64) {
        assert_eq!(
            TemporalValue::parse(TemporalKind::Duration, input).unwrap(),
            TemporalValue::Duration(DurationValue {
                months,
                days,
                seconds,
                nanoseconds
            })
        );
    }

    #[test_case(TemporalKind::Date, "2021-13-01")]
    #[test_case(TemporalKind::LocalTime, "noon")]
    #[test_case(TemporalKind::Time, "10:00:00")]
    #[test_case(TemporalKind::Duration, "1 day")]
    #[test_case(TemporalKind::Duration, "P")]
    #[test_case(TemporalKind::Duration, "PT")]
    #[test_case(TemporalKind::Duration, "P1DT")]
    #[test_case(TemporalKind::Duration, "P999999999999999999Y")]
    #[test_case(TemporalKind::Duration, "PT999999999999999999H")]
    #[test_case(TemporalKind::Duration, "PT1M9223372036854775807S")]
    fn test_invalid_temporal_literals(kind: TemporalKind, input: &str) {
        assert!(matches!(
            TemporalValue::parse(kind, input),
            Err(CypherBuilderError::InvalidTemporal { .. })
        ));
    }
}
