//! [`time`] integration.
use bytes::{Buf, Bytes};
use time::{
    Date, Month, PrimitiveDateTime, Time,
    format_description::{BorrowedFormatItem as I, Component as C, modifier},
};

use crate::{
    Value,
    protocol::{ColumnMetadata, ColumnType},
    row::DecodeError,
};

const DATE: &[I<'_>] = &[
    I::Component(C::Year(modifier::Year::default())),
    I::Literal(b"-"),
    I::Component(C::Month(modifier::Month::default())),
    I::Literal(b"-"),
    I::Component(C::Day(modifier::Day::default())),
];

const TIME: &[I<'_>] = &[
    I::Component(C::Hour(modifier::Hour::default())),
    I::Literal(b":"),
    I::Component(C::Minute(modifier::Minute::default())),
    I::Literal(b":"),
    I::Component(C::Second(modifier::Second::default())),
    I::Optional(&I::Compound(&[
        I::Literal(b"."),
        I::Component(C::Subsecond(modifier::Subsecond::default())),
    ])),
];

const DATETIME: &[I<'_>] = &[
    I::Compound(DATE),
    I::Literal(b" "),
    I::Compound(TIME),
];

pub(crate) fn format_date(date: &Date) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day())
}

pub(crate) fn format_time(time: &Time) -> String {
    let (h, m, s, micro) = time.as_hms_micro();
    match micro {
        0 => format!("{h:02}:{m:02}:{s:02}"),
        _ => format!("{h:02}:{m:02}:{s:02}.{micro:06}"),
    }
}

pub(crate) fn decode_date(buf: &mut Bytes, column: &ColumnMetadata, binary: bool) -> Result<Value, DecodeError> {
    if !binary {
        let date = parse_text(buf, column, |s| Date::parse(s, DATE))?;
        return Ok(Value::Date(date));
    }

    let len = get(buf.try_get_u8(), column)?;
    if len < 4 {
        return Err(DecodeError::OutOfRange { target: "time::Date" });
    }
    let date = get_date(buf, column)?;
    buf.advance(usize::from(len - 4).min(buf.remaining()));
    Ok(Value::Date(date))
}

pub(crate) fn decode_time(buf: &mut Bytes, column: &ColumnMetadata, binary: bool) -> Result<Value, DecodeError> {
    if !binary {
        let time = parse_text(buf, column, |s| Time::parse(s, TIME))?;
        return Ok(Value::Time(time));
    }

    let len = get(buf.try_get_u8(), column)?;
    if len == 0 {
        return Ok(Value::Time(Time::MIDNIGHT));
    }

    let negative = get(buf.try_get_u8(), column)?;
    let days = get(buf.try_get_u32_le(), column)?;
    if negative != 0 || days != 0 {
        return Err(DecodeError::OutOfRange { target: "time::Time" });
    }

    let time = get_time(buf, column, len > 8)?;
    Ok(Value::Time(time))
}

pub(crate) fn decode_datetime(buf: &mut Bytes, column: &ColumnMetadata, binary: bool) -> Result<Value, DecodeError> {
    if !binary {
        let datetime = match column.column_type {
            ColumnType::Date => parse_text(buf, column, |s| Date::parse(s, DATE))?.midnight(),
            _ => parse_text(buf, column, |s| PrimitiveDateTime::parse(s, DATETIME))?,
        };
        return Ok(Value::DateTime(datetime));
    }

    let len = get(buf.try_get_u8(), column)?;
    if len < 4 {
        return Err(DecodeError::OutOfRange { target: "time::PrimitiveDateTime" });
    }

    let date = get_date(buf, column)?;
    let time = match len {
        4 => Time::MIDNIGHT,
        _ => get_time(buf, column, len > 7)?,
    };
    Ok(Value::DateTime(PrimitiveDateTime::new(date, time)))
}

fn get<T, E>(result: Result<T, E>, column: &ColumnMetadata) -> Result<T, DecodeError> {
    result.map_err(|_| DecodeError::malformed(column.column_type))
}

fn get_date(buf: &mut Bytes, column: &ColumnMetadata) -> Result<Date, DecodeError> {
    let year = get(buf.try_get_u16_le(), column)?;
    let month = get(buf.try_get_u8(), column)?;
    let day = get(buf.try_get_u8(), column)?;
    let month = get(Month::try_from(month), column)?;
    get(Date::from_calendar_date(year.into(), month, day), column)
}

fn get_time(buf: &mut Bytes, column: &ColumnMetadata, micro: bool) -> Result<Time, DecodeError> {
    let hour = get(buf.try_get_u8(), column)?;
    let minute = get(buf.try_get_u8(), column)?;
    let second = get(buf.try_get_u8(), column)?;
    let micro = match micro {
        true => get(buf.try_get_u32_le(), column)?,
        false => 0,
    };
    get(Time::from_hms_micro(hour, minute, second, micro), column)
}

fn parse_text<T, E>(
    buf: &mut Bytes,
    column: &ColumnMetadata,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, DecodeError> {
    let value = get(parse(std::str::from_utf8(buf)?), column)?;
    buf.clear();
    Ok(value)
}

#[cfg(test)]
mod test {
    use bytes::Bytes;
    use time::{Date, Month, PrimitiveDateTime, Time};

    use super::*;

    fn column(ty: ColumnType) -> ColumnMetadata {
        ColumnMetadata::new("t", ty)
    }

    #[test]
    fn binary_datetime() {
        let mut buf = Bytes::from_static(b"\x0b\xe8\x07\x02\x1d\x0c\x22\x38\x40\xe2\x01\x00");
        let value = decode_datetime(&mut buf, &column(ColumnType::DateTime), true).unwrap();
        let expected = PrimitiveDateTime::new(
            Date::from_calendar_date(2024, Month::February, 29).unwrap(),
            Time::from_hms_micro(12, 34, 56, 123_456).unwrap(),
        );
        assert_eq!(value, Value::DateTime(expected));
        assert!(buf.is_empty());
    }

    #[test]
    fn text_time() {
        let mut buf = Bytes::from_static(b"08:09:10.5");
        let value = decode_time(&mut buf, &column(ColumnType::Time), false).unwrap();
        assert_eq!(value, Value::Time(Time::from_hms_milli(8, 9, 10, 500).unwrap()));

        let mut buf = Bytes::from_static(b"08:09:10");
        assert!(decode_time(&mut buf, &column(ColumnType::Time), false).is_ok());
    }

    #[test]
    fn encode_year_out_of_range() {
        let codecs = crate::Codecs::default();
        let date = Date::from_calendar_date(-1, Month::January, 1).unwrap();
        assert!(codecs.encode(Value::Date(date)).is_err());

        let datetime = PrimitiveDateTime::new(date, Time::MIDNIGHT);
        assert!(codecs.encode(Value::DateTime(datetime)).is_err());

        let date = Date::from_calendar_date(9999, Month::December, 31).unwrap();
        assert_eq!(codecs.encode(Value::Date(date)).unwrap().text_literal(), "'9999-12-31'");
    }

    #[test]
    fn zero_date() {
        let mut buf = Bytes::from_static(b"\x00");
        assert!(matches!(
            decode_date(&mut buf, &column(ColumnType::Date), true),
            Err(DecodeError::OutOfRange { .. })
        ));
    }

    #[test]
    fn negative_time() {
        let mut buf = Bytes::from_static(b"\x08\x01\x00\x00\x00\x00\x01\x00\x00");
        assert!(decode_time(&mut buf, &column(ColumnType::Time), true).is_err());
    }

    #[test]
    fn format() {
        let date = Date::from_calendar_date(7, Month::March, 4).unwrap();
        assert_eq!(format_date(&date), "0007-03-04");
        assert_eq!(format_time(&Time::from_hms(1, 2, 3).unwrap()), "01:02:03");
        assert_eq!(format_time(&Time::from_hms_micro(1, 2, 3, 40).unwrap()), "01:02:03.000040");
    }
}
