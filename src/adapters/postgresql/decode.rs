//! Binary column decoding
//!
//! Turns the raw bytes of a result column into a JSON value or a watermark
//! key. Only a SQL NULL becomes `null`: bytes that do not decode and column
//! types without a JSON mapping fail the poll instead.

use crate::domain::{Result, TidemarkError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use std::error::Error;
use tokio_postgres::types::{FromSql, Kind, Type};

type DecodeError = Box<dyn Error + Sync + Send>;

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Undecoded bytes of one column
///
/// Accepts every column type, so `Row::try_get::<_, Option<RawColumn>>`
/// hands back the wire bytes and leaves NULL as `None`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawColumn<'a>(pub &'a [u8]);

impl<'a> FromSql<'a> for RawColumn<'a> {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> std::result::Result<Self, DecodeError> {
        Ok(RawColumn(raw))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Decode a watermark column, widening smaller integer types to i64
pub(crate) fn decode_key(column: &str, ty: &Type, raw: Option<&[u8]>) -> Result<i64> {
    let value = match *ty {
        Type::INT2 => Option::<i16>::from_sql_nullable(ty, raw).map(|v| v.map(i64::from)),
        Type::INT4 => Option::<i32>::from_sql_nullable(ty, raw).map(|v| v.map(i64::from)),
        Type::INT8 => Option::<i64>::from_sql_nullable(ty, raw),
        _ => {
            return Err(TidemarkError::QueryExecution(format!(
                "Watermark column '{}' has type {}, expected an integer type",
                column, ty
            )))
        }
    }
    .map_err(|e| decode_failed(column, ty, e))?;

    value.ok_or_else(|| {
        TidemarkError::QueryExecution(format!("Watermark column '{}' is NULL", column))
    })
}

/// Decode one selected column to JSON
///
/// NUMERIC is emitted as a decimal string so no precision is lost; the
/// date and time types use their ISO text forms and BYTEA is hex.
pub(crate) fn decode_column(column: &str, ty: &Type, raw: Option<&[u8]>) -> Result<Value> {
    let Some(raw) = raw else {
        return Ok(Value::Null);
    };

    let value = match *ty {
        Type::BOOL => json::<bool>(ty, raw),
        Type::INT2 => json::<i16>(ty, raw),
        Type::INT4 => json::<i32>(ty, raw),
        Type::INT8 => json::<i64>(ty, raw),
        Type::OID => json::<u32>(ty, raw),
        Type::FLOAT4 => json::<f32>(ty, raw),
        Type::FLOAT8 => json::<f64>(ty, raw),
        Type::NUMERIC => numeric_to_string(raw).map(Value::from),
        Type::JSON | Type::JSONB => json::<Value>(ty, raw),
        Type::UUID => uuid::Uuid::from_sql(ty, raw).map(|v| Value::from(v.to_string())),
        Type::TIMESTAMPTZ => {
            DateTime::<Utc>::from_sql(ty, raw).map(|v| Value::from(v.to_rfc3339()))
        }
        Type::TIMESTAMP => NaiveDateTime::from_sql(ty, raw).map(|v| Value::from(v.to_string())),
        Type::DATE => NaiveDate::from_sql(ty, raw).map(|v| Value::from(v.to_string())),
        Type::TIME => NaiveTime::from_sql(ty, raw).map(|v| Value::from(v.to_string())),
        Type::BYTEA => Vec::<u8>::from_sql(ty, raw).map(|bytes| {
            Value::from(bytes.iter().map(|b| format!("{b:02x}")).collect::<String>())
        }),
        Type::XML => json::<String>(&Type::TEXT, raw),
        Type::BOOL_ARRAY => json::<Vec<Option<bool>>>(ty, raw),
        Type::INT2_ARRAY => json::<Vec<Option<i16>>>(ty, raw),
        Type::INT4_ARRAY => json::<Vec<Option<i32>>>(ty, raw),
        Type::INT8_ARRAY => json::<Vec<Option<i64>>>(ty, raw),
        Type::FLOAT8_ARRAY => json::<Vec<Option<f64>>>(ty, raw),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => json::<Vec<Option<String>>>(ty, raw),
        // Enum labels travel as plain text
        _ if matches!(ty.kind(), Kind::Enum(_)) => json::<String>(&Type::TEXT, raw),
        _ if <String as FromSql>::accepts(ty) => json::<String>(ty, raw),
        _ => {
            return Err(TidemarkError::QueryExecution(format!(
                "Column '{}' has type {} with no JSON mapping; leave it out of \
                 select_columns or select it through a view that casts it to text",
                column, ty
            )))
        }
    };

    value.map_err(|e| decode_failed(column, ty, e))
}

fn json<'a, T>(ty: &Type, raw: &'a [u8]) -> std::result::Result<Value, DecodeError>
where
    T: FromSql<'a> + Into<Value>,
{
    T::from_sql(ty, raw).map(Into::into)
}

fn decode_failed(column: &str, ty: &Type, err: DecodeError) -> TidemarkError {
    TidemarkError::QueryExecution(format!(
        "Failed to decode column '{}' of type {}: {}",
        column, ty, err
    ))
}

/// Render the binary NUMERIC format as decimal text
///
/// The payload is a header of four 16-bit words (digit count, weight of the
/// first digit, sign, display scale) followed by base-10000 digits.
fn numeric_to_string(raw: &[u8]) -> std::result::Result<String, DecodeError> {
    let word = |i: usize| -> std::result::Result<[u8; 2], DecodeError> {
        raw.get(i * 2..i * 2 + 2)
            .map(|b| [b[0], b[1]])
            .ok_or_else(|| "numeric value is truncated".into())
    };

    let ndigits = usize::from(u16::from_be_bytes(word(0)?));
    let weight = i32::from(i16::from_be_bytes(word(1)?));
    let sign = u16::from_be_bytes(word(2)?);
    let dscale = usize::from(u16::from_be_bytes(word(3)?));

    if raw.len() != 8 + ndigits * 2 {
        return Err("invalid numeric buffer size".into());
    }
    let digits = (0..ndigits)
        .map(|i| word(4 + i).map(u16::from_be_bytes))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    match sign {
        NUMERIC_POS | NUMERIC_NEG => {}
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        other => return Err(format!("invalid numeric sign {other:#06x}").into()),
    }

    // Digit i carries weight (weight - i); positions outside the stored digits are zero
    let digit = |i: i32| -> u16 {
        usize::try_from(i)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut text = String::new();
    if sign == NUMERIC_NEG {
        text.push('-');
    }
    if weight < 0 {
        text.push('0');
    } else {
        text.push_str(&digit(0).to_string());
        for i in 1..=weight {
            text.push_str(&format!("{:04}", digit(i)));
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut i = weight + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", digit(i)));
            i += 1;
        }
        fraction.truncate(dscale);
        text.push('.');
        text.push_str(&fraction);
    }

    Ok(text)
}
