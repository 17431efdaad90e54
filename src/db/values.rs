//! Column value rendering.
//!
//! Converts tiberius column data into the plain-text form used by the
//! CSV-like result output. NULL of any type renders as `None`, which the
//! formatter turns into an empty field.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tiberius::{ColumnData, FromSql};

use crate::error::DbResult;

/// Render a single cell to text. `None` means SQL NULL.
pub fn render(data: &ColumnData<'static>) -> DbResult<Option<String>> {
    let rendered = match data {
        ColumnData::U8(v) => v.map(|n| n.to_string()),
        ColumnData::I16(v) => v.map(|n| n.to_string()),
        ColumnData::I32(v) => v.map(|n| n.to_string()),
        ColumnData::I64(v) => v.map(|n| n.to_string()),
        ColumnData::F32(v) => v.map(|n| n.to_string()),
        ColumnData::F64(v) => v.map(|n| n.to_string()),
        ColumnData::Bit(v) => v.map(|b| b.to_string()),
        ColumnData::String(v) => v.as_ref().map(|s| s.to_string()),
        ColumnData::Guid(v) => v.map(|g| g.to_string()),
        ColumnData::Numeric(v) => v.map(|n| n.to_string()),
        ColumnData::Binary(v) => v.as_ref().map(|bytes| BASE64.encode(bytes)),
        ColumnData::Xml(v) => v.as_ref().map(|xml| xml.to_string()),
        ColumnData::Date(_) => chrono::NaiveDate::from_sql(data)?.map(|d| d.to_string()),
        ColumnData::Time(_) => chrono::NaiveTime::from_sql(data)?.map(|t| t.to_string()),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            chrono::NaiveDateTime::from_sql(data)?.map(|dt| dt.to_string())
        }
        ColumnData::DateTimeOffset(_) => {
            chrono::DateTime::<chrono::Utc>::from_sql(data)?.map(|dt| dt.to_string())
        }
    };
    Ok(rendered)
}
