use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use serde::Serialize;
use serde::Serializer;
use std::fmt;

/// How a raw `<c>` element of a worksheet should be interpreted.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values (true/false)
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    /// Date values stored as numbers from 1900 epoch
    NumberDate1900,
    /// Time values stored as numbers from 1900 epoch
    NumberTime1900,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    /// Date values stored as numbers from 1904 epoch
    NumberDate1904,
    /// Time values stored as numbers from 1904 epoch
    NumberTime1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Inline string values and cached formula strings
    InlineString,
    /// Shared string table references
    SharedString,
    /// Error values
    Error,
}

impl CellType {
    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Parses custom number format strings to determine cell type.
    /// Looks for date/time tokens outside literals, escapes and bracketed sections.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_color = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_escaped => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_literal && !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_color && !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }

    /// Converts the raw text of a cell into a value.
    ///
    /// Shared strings must be resolved by the caller; numbers that fail to parse
    /// are kept as text rather than failing the whole row.
    pub(crate) fn to_value(self, raw: String) -> CellValue {
        match self {
            Self::Empty => CellValue::Empty,
            Self::Boolean => CellValue::Boolean(raw.trim() == "1" || raw.trim().eq_ignore_ascii_case("true")),
            Self::InlineString | Self::SharedString => CellValue::Text(raw),
            Self::Error => CellValue::Error(raw),
            Self::Number => match raw.trim().parse::<f64>() {
                Ok(number) => CellValue::Number(number),
                Err(_) => CellValue::Text(raw),
            },
            Self::NumberDateTime1900 | Self::NumberDate1900 | Self::NumberTime1900
            | Self::NumberDateTime1904 | Self::NumberDate1904 | Self::NumberTime1904 => {
                let is_1904 = matches!(self, Self::NumberDateTime1904 | Self::NumberDate1904 | Self::NumberTime1904);
                let Ok(serial) = raw.trim().parse::<f64>() else {
                    return CellValue::Text(raw);
                };
                match (self, serial_to_datetime(serial, is_1904)) {
                    (_, None) => CellValue::Number(serial),
                    (Self::NumberDate1900 | Self::NumberDate1904, Some(datetime)) => CellValue::Date(datetime.date()),
                    (Self::NumberTime1900 | Self::NumberTime1904, Some(datetime)) if serial < 1.0 => CellValue::Time(datetime.time()),
                    (_, Some(datetime)) => CellValue::DateTime(datetime),
                }
            }
            Self::IsoDateTime => {
                let value = raw.trim();
                if let Ok(datetime) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
                    CellValue::DateTime(datetime)
                } else if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
                    CellValue::Date(date)
                } else if let Ok(time) = NaiveTime::parse_from_str(value, "%H:%M:%S%.f") {
                    CellValue::Time(time)
                } else {
                    CellValue::Text(raw)
                }
            }
        }
    }
}

/// Converts an Excel serial date number to a date-time.
/// Handles the Lotus 1-2-3 leap year bug of the 1900 date system.
pub(crate) fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial > 2_958_465.0 {
        return None;
    }
    let days = serial.trunc() as i64;
    let offset = if is_1904 {
        1_462
    } else if days < 60 {
        1
    } else {
        0
    };
    let milliseconds = ((serial - serial.trunc()) * 86_400_000f64).round() as i64;
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    epoch
        .checked_add_signed(Duration::days(days + offset))?
        .checked_add_signed(Duration::milliseconds(milliseconds))
}

/// A resolved cell value as emitted by the row sources.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    /// Error literal such as `#N/A` or `#DIV/0!`
    Error(String),
}

impl CellValue {
    /// A cell is empty when it holds nothing or only whitespace text.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Whether the value is textual.
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// The displayed text of the value with surrounding whitespace removed.
    pub fn trimmed(&self) -> String {
        self.to_string().trim().to_owned()
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(text) => f.write_str(text),
            Self::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => write!(f, "{}", *number as i64),
            Self::Number(number) => write!(f, "{}", number),
            Self::Boolean(true) => f.write_str("TRUE"),
            Self::Boolean(false) => f.write_str("FALSE"),
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Time(time) => write!(f, "{}", time.format("%H:%M:%S")),
            Self::DateTime(datetime) => write!(f, "{}", datetime.format("%Y-%m-%d %H:%M:%S")),
            Self::Error(error) => f.write_str(error),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_none(),
            Self::Text(text) | Self::Error(text) => serializer.serialize_str(text),
            Self::Number(number) => serializer.serialize_f64(*number),
            Self::Boolean(value) => serializer.serialize_bool(*value),
            Self::Date(_) | Self::Time(_) | Self::DateTime(_) => serializer.collect_str(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, s).unwrap()
    }

    #[test]
    fn builtin_formats() {
        assert_eq!(CellType::parse_builtin_number_format_id("14", false), Some(CellType::NumberDate1900));
        assert_eq!(CellType::parse_builtin_number_format_id("22", true), Some(CellType::NumberDateTime1904));
        assert_eq!(CellType::parse_builtin_number_format_id("0", false), None);
    }

    #[test]
    fn custom_formats() {
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd", false), CellType::NumberDate1900);
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd hh:mm", false), CellType::NumberDateTime1900);
        assert_eq!(CellType::parse_custom_number_format("hh:mm:ss", true), CellType::NumberTime1904);
        assert_eq!(CellType::parse_custom_number_format("[Red]0.00", false), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("0.00\" days\"", false), CellType::Number);
    }

    #[test]
    fn serial_dates() {
        assert_eq!(serial_to_datetime(1.0, false), Some(datetime(1900, 1, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(61.0, false), Some(datetime(1900, 3, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(45_000.5, false), Some(datetime(2023, 3, 15, 12, 0, 0)));
        assert_eq!(serial_to_datetime(0.0, true), Some(datetime(1904, 1, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(-1.0, false), None);
    }

    #[test]
    fn raw_values() {
        assert_eq!(CellType::Number.to_value("42".to_owned()), CellValue::Number(42.0));
        assert_eq!(CellType::Number.to_value("n/a".to_owned()), CellValue::Text("n/a".to_owned()));
        assert_eq!(CellType::Boolean.to_value("1".to_owned()), CellValue::Boolean(true));
        assert_eq!(CellType::Error.to_value("#N/A".to_owned()), CellValue::Error("#N/A".to_owned()));
        assert_eq!(
            CellType::NumberDate1900.to_value("45000".to_owned()),
            CellValue::Date(NaiveDate::from_ymd_opt(2023, 3, 15).unwrap())
        );
        assert_eq!(
            CellType::NumberTime1900.to_value("0.75".to_owned()),
            CellValue::Time(NaiveTime::from_hms_opt(18, 0, 0).unwrap())
        );
        assert_eq!(
            CellType::IsoDateTime.to_value("2024-02-29T08:30:00".to_owned()),
            CellValue::DateTime(datetime(2024, 2, 29, 8, 30, 0))
        );
    }

    #[test]
    fn emptiness() {
        assert!(CellValue::Empty.is_empty());
        assert!(CellValue::from("  \t").is_empty());
        assert!(!CellValue::from("x").is_empty());
        assert!(!CellValue::Number(0.0).is_empty());
        assert!(!CellValue::Boolean(false).is_empty());
    }

    #[test]
    fn display() {
        assert_eq!(CellValue::Number(3.0).to_string(), "3");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Boolean(true).to_string(), "TRUE");
        assert_eq!(CellValue::from(" Name ").trimmed(), "Name");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn serialize() {
        let values = vec![
            CellValue::Empty,
            CellValue::from("a"),
            CellValue::Number(1.5),
            CellValue::Boolean(false),
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[null,"a",1.5,false,"2024-01-02"]"#);
    }
}
