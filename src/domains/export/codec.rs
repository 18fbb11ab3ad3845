use crate::domains::export::schema::Header;
use crate::domains::export::types::{base_column, type_column};
use crate::errors::{DomainError, DomainResult};
use crate::types::{Entity, PropertyValue, TypeTag, PARTITION_KEY, ROW_KEY, TIMESTAMP};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use csv::StringRecord;
use uuid::Uuid;

/// Date/time as `yyyy-MM-ddTHH:mm:ss[.fffffff]Z`: UTC, at most seven
/// fractional digits, trailing zeros dropped
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    let mut text = value.format("%Y-%m-%dT%H:%M:%S").to_string();
    let fraction = format!("{:07}", value.nanosecond() % 1_000_000_000 / 100);
    let fraction = fraction.trim_end_matches('0');
    if !fraction.is_empty() {
        text.push('.');
        text.push_str(fraction);
    }
    text.push('Z');
    text
}

/// Parse the date/time spellings found in exported and hand-edited files.
/// Values without an offset are taken as UTC. Precision is cut to 100ns.
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    let parsed = DateTime::parse_from_rfc3339(text)
        .map(|d| d.with_timezone(&Utc))
        .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f %:z").map(|d| d.with_timezone(&Utc)))
        .or_else(|_| DateTime::parse_from_str(text, "%m/%d/%Y %H:%M:%S %:z").map(|d| d.with_timezone(&Utc)))
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").map(|d| d.and_utc()))
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f").map(|d| d.and_utc()))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|d| d.and_utc())
        })?;

    let nanos = parsed.nanosecond();
    parsed.with_nanosecond(nanos - nanos % 100)
}

pub fn format_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "Infinity".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        value.to_string()
    }
}

pub fn parse_double(text: &str) -> Option<f64> {
    match text.trim() {
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        other => other.parse().ok(),
    }
}

/// Text of a property value as written into a cell
pub fn format_value(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Boolean(b) => b.to_string(),
        PropertyValue::Int32(n) => n.to_string(),
        PropertyValue::Int64(n) => n.to_string(),
        PropertyValue::Double(d) => format_double(*d),
        PropertyValue::String(s) => s.clone(),
        PropertyValue::Binary(bytes) => STANDARD.encode(bytes),
        PropertyValue::Guid(id) => id.to_string(),
        PropertyValue::DateTime(dt) => format_datetime(dt),
    }
}

/// Convert cell text to a value of the given kind. The error is a
/// human-readable reason.
pub fn coerce(tag: TypeTag, text: &str) -> Result<PropertyValue, String> {
    match tag {
        TypeTag::Boolean => {
            if text.trim().eq_ignore_ascii_case("true") {
                Ok(PropertyValue::Boolean(true))
            } else if text.trim().eq_ignore_ascii_case("false") {
                Ok(PropertyValue::Boolean(false))
            } else {
                Err(format!("'{}' is not a boolean", text))
            }
        }
        TypeTag::DateTime => parse_datetime(text)
            .map(PropertyValue::DateTime)
            .ok_or_else(|| format!("'{}' is not a date/time", text)),
        TypeTag::Double => parse_double(text)
            .map(PropertyValue::Double)
            .ok_or_else(|| format!("'{}' is not a number", text)),
        TypeTag::Guid => Uuid::parse_str(text.trim())
            .map(PropertyValue::Guid)
            .map_err(|e| format!("'{}' is not a GUID: {}", text, e)),
        TypeTag::Int32 => text
            .trim()
            .parse::<i32>()
            .map(PropertyValue::Int32)
            .map_err(|e| format!("'{}' is not a 32-bit integer: {}", text, e)),
        TypeTag::Int64 => text
            .trim()
            .parse::<i64>()
            .map(PropertyValue::Int64)
            .map_err(|e| format!("'{}' is not a 64-bit integer: {}", text, e)),
        TypeTag::Binary => STANDARD
            .decode(text.trim())
            .map(PropertyValue::Binary)
            .map_err(|e| format!("invalid base64: {}", e)),
        TypeTag::String => Ok(PropertyValue::String(text.to_string())),
    }
}

/// Cell text of `entity` under `column`
pub fn render_cell(entity: &Entity, column: &str) -> String {
    match column {
        PARTITION_KEY => entity.partition_key.clone(),
        ROW_KEY => entity.row_key.clone(),
        TIMESTAMP => entity.timestamp.as_ref().map(format_datetime).unwrap_or_default(),
        _ => {
            if let Some(value) = entity.get(column) {
                return format_value(value);
            }
            base_column(column)
                .and_then(|base| entity.get(base))
                .map(|value| value.type_tag().as_str().to_string())
                .unwrap_or_default()
        }
    }
}

pub fn render_row(header: &Header, entity: &Entity) -> Vec<String> {
    header.columns().map(|column| render_cell(entity, column)).collect()
}

/// Rebuilds entities from data rows of a typed CSV file
#[derive(Debug, Clone)]
pub struct RowDecoder {
    columns: Vec<String>,
    /// For each column, the index of its `@type` column if the file has one
    tag_columns: Vec<Option<usize>>,
    lenient_type_tags: bool,
}

impl RowDecoder {
    pub fn new(columns: Vec<String>, lenient_type_tags: bool) -> Self {
        let tag_columns = columns
            .iter()
            .map(|column| {
                let wanted = type_column(column);
                columns.iter().position(|c| *c == wanted)
            })
            .collect();
        Self {
            columns,
            tag_columns,
            lenient_type_tags,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Decode one record; `row` is the 1-based data row number used in errors
    pub fn decode(&self, row: usize, record: &StringRecord) -> DomainResult<Entity> {
        let mut entity = Entity::default();

        for (index, field) in record.iter().enumerate() {
            if field.is_empty() {
                continue;
            }
            let column = self.columns.get(index).ok_or_else(|| DomainError::MalformedRow {
                row,
                column: format!("#{}", index + 1),
                reason: format!(
                    "row has {} fields but the header has {} columns",
                    record.len(),
                    self.columns.len()
                ),
            })?;

            match column.as_str() {
                PARTITION_KEY => entity.partition_key = field.to_string(),
                ROW_KEY => entity.row_key = field.to_string(),
                TIMESTAMP => {
                    let timestamp = parse_datetime(field).ok_or_else(|| DomainError::MalformedRow {
                        row,
                        column: column.clone(),
                        reason: format!("'{}' is not a date/time", field),
                    })?;
                    entity.timestamp = Some(timestamp);
                }
                // consulted through the paired value column
                _ if base_column(column).is_some() => {}
                _ => {
                    let value = self.decode_value(row, index, column, field, record)?;
                    entity.insert(column.clone(), value);
                }
            }
        }

        Ok(entity)
    }

    fn decode_value(
        &self,
        row: usize,
        index: usize,
        column: &str,
        field: &str,
        record: &StringRecord,
    ) -> DomainResult<PropertyValue> {
        let tag_text = self.tag_columns[index]
            .and_then(|i| record.get(i))
            .unwrap_or("");

        // Untagged values (legacy files, hand-written columns) stay text
        if tag_text.is_empty() {
            return Ok(PropertyValue::String(field.to_string()));
        }

        match TypeTag::parse(tag_text) {
            Some(tag) => coerce(tag, field).map_err(|reason| DomainError::MalformedRow {
                row,
                column: column.to_string(),
                reason,
            }),
            None if self.lenient_type_tags => Ok(PropertyValue::String(field.to_string())),
            None => Err(DomainError::UnknownTypeTag {
                row,
                column: type_column(column),
                tag: tag_text.to_string(),
            }),
        }
    }
}
