//! Row value coercion into display-safe scalars
//!
//! Every cell is decoded from its binary wire form through [`Cell`], which
//! accepts any column type. Types without a dedicated rendering fall back to
//! their UTF-8 payload, or a `\x` hex string when the payload is binary.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::error::Error;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tabula_core::ScalarValue;
use tokio_postgres::types::{FromSql, Kind, Type};
use tokio_postgres::Row;
use tracing::debug;
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// How a column's wire type is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    SmallInt,
    Int,
    BigInt,
    Oid,
    Real,
    Double,
    Numeric,
    Bool,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Interval,
    Json,
    Text,
    Uuid,
    Inet,
    Bytea,
    Array,
    Other,
}

impl CellKind {
    pub fn of(ty: &Type) -> Self {
        if *ty == Type::INT2 {
            Self::SmallInt
        } else if *ty == Type::INT4 {
            Self::Int
        } else if *ty == Type::INT8 {
            Self::BigInt
        } else if *ty == Type::OID {
            Self::Oid
        } else if *ty == Type::FLOAT4 {
            Self::Real
        } else if *ty == Type::FLOAT8 {
            Self::Double
        } else if *ty == Type::NUMERIC {
            Self::Numeric
        } else if *ty == Type::BOOL {
            Self::Bool
        } else if *ty == Type::DATE {
            Self::Date
        } else if *ty == Type::TIME {
            Self::Time
        } else if *ty == Type::TIMESTAMP {
            Self::Timestamp
        } else if *ty == Type::TIMESTAMPTZ {
            Self::TimestampTz
        } else if *ty == Type::INTERVAL {
            Self::Interval
        } else if *ty == Type::JSON || *ty == Type::JSONB {
            Self::Json
        } else if *ty == Type::TEXT
            || *ty == Type::VARCHAR
            || *ty == Type::BPCHAR
            || *ty == Type::NAME
            || *ty == Type::UNKNOWN
        {
            Self::Text
        } else if *ty == Type::UUID {
            Self::Uuid
        } else if *ty == Type::INET || *ty == Type::CIDR {
            Self::Inet
        } else if *ty == Type::BYTEA {
            Self::Bytea
        } else if matches!(ty.kind(), Kind::Array(_)) {
            Self::Array
        } else {
            Self::Other
        }
    }
}

/// A single decoded cell; SQL NULL is handled by `Option<Cell>`
struct Cell(ScalarValue);

impl<'a> FromSql<'a> for Cell {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        decode(ty, raw).map(Cell)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Decode every cell of a row.
///
/// Integer columns of any width become `Integer`, so a nullable integer
/// column is always `Integer` or `Null` and never mixes representations.
pub fn row_values(row: &Row) -> Vec<ScalarValue> {
    (0..row.len())
        .map(|idx| match row.try_get::<_, Option<Cell>>(idx) {
            Ok(Some(Cell(value))) => value,
            Ok(None) => ScalarValue::Null,
            Err(e) => {
                debug!(column = idx, error = %e, "Malformed cell, rendering as NULL");
                ScalarValue::Null
            }
        })
        .collect()
}

fn decode(ty: &Type, raw: &[u8]) -> Result<ScalarValue, BoxError> {
    let value = match CellKind::of(ty) {
        CellKind::SmallInt => ScalarValue::Integer(i16::from_sql(ty, raw)?.into()),
        CellKind::Int => ScalarValue::Integer(i32::from_sql(ty, raw)?.into()),
        CellKind::BigInt => ScalarValue::Integer(i64::from_sql(ty, raw)?),
        CellKind::Oid => ScalarValue::Integer(u32::from_sql(ty, raw)?.into()),
        CellKind::Real => ScalarValue::Float(f32::from_sql(ty, raw)?.into()),
        CellKind::Double => ScalarValue::Float(f64::from_sql(ty, raw)?),
        CellKind::Numeric => numeric(ty, raw)?,
        CellKind::Bool => ScalarValue::Text(bool::from_sql(ty, raw)?.to_string()),
        CellKind::Date => {
            ScalarValue::Text(NaiveDate::from_sql(ty, raw)?.format("%Y-%m-%d").to_string())
        }
        CellKind::Time => {
            ScalarValue::Text(NaiveTime::from_sql(ty, raw)?.format("%H:%M:%S").to_string())
        }
        CellKind::Timestamp => ScalarValue::Text(
            NaiveDateTime::from_sql(ty, raw)?
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        ),
        CellKind::TimestampTz => {
            ScalarValue::Text(DateTime::<Utc>::from_sql(ty, raw)?.to_rfc3339())
        }
        CellKind::Interval => ScalarValue::Text(interval(raw)?),
        CellKind::Json => ScalarValue::Text(serde_json::Value::from_sql(ty, raw)?.to_string()),
        CellKind::Text => ScalarValue::Text(<&str>::from_sql(ty, raw)?.to_string()),
        CellKind::Uuid => ScalarValue::Text(Uuid::from_slice(raw)?.hyphenated().to_string()),
        CellKind::Inet => ScalarValue::Text(inet(raw)?),
        CellKind::Bytea => ScalarValue::Text(hex_text(raw)),
        CellKind::Array => match ty.kind() {
            Kind::Array(element) => ScalarValue::Text(array(element, raw)?),
            _ => ScalarValue::Text(hex_text(raw)),
        },
        CellKind::Other => match ty.kind() {
            Kind::Domain(inner) => decode(inner, raw)?,
            // enums, citext, xml and friends send their text form
            _ => match std::str::from_utf8(raw) {
                Ok(text) => ScalarValue::Text(text.to_string()),
                Err(_) => ScalarValue::Text(hex_text(raw)),
            },
        },
    };
    Ok(value)
}

fn hex_text(raw: &[u8]) -> String {
    format!("\\x{}", hex::encode(raw))
}

/// Big-endian cursor over a binary payload
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], BoxError> {
        if self.buf.len() < n {
            return Err("truncated value".into());
        }
        let (head, rest) = self.buf.split_at(n);
        self.buf = rest;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8, BoxError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, BoxError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn i16(&mut self) -> Result<i16, BoxError> {
        Ok(self.u16()? as i16)
    }

    fn i32(&mut self) -> Result<i32, BoxError> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i64(&mut self) -> Result<i64, BoxError> {
        let b = self.take(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(b);
        Ok(i64::from_be_bytes(bytes))
    }
}

/// NUMERIC through `Decimal` when it fits, else from the base-10000 digits
fn numeric(ty: &Type, raw: &[u8]) -> Result<ScalarValue, BoxError> {
    if let Some(value) = Decimal::from_sql(ty, raw).ok().and_then(|d| d.to_f64()) {
        return Ok(ScalarValue::Float(value));
    }

    let mut r = Reader::new(raw);
    let ndigits = r.i16()?;
    let weight = r.i16()?;
    let sign = r.u16()?;
    let _dscale = r.u16()?;

    let text = match sign {
        NUMERIC_NAN => return Ok(ScalarValue::Text("NaN".into())),
        NUMERIC_PINF => return Ok(ScalarValue::Text("Infinity".into())),
        NUMERIC_NINF => return Ok(ScalarValue::Text("-Infinity".into())),
        _ if ndigits <= 0 => return Ok(ScalarValue::Float(0.0)),
        _ => {
            let mut mantissa = String::with_capacity(ndigits as usize * 4);
            for _ in 0..ndigits {
                mantissa.push_str(&format!("{:04}", r.i16()?));
            }
            let exponent = 4 * (i32::from(weight) + 1);
            let minus = if sign == NUMERIC_NEG { "-" } else { "" };
            format!("{}0.{}e{}", minus, mantissa, exponent)
        }
    };

    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(ScalarValue::Float(value)),
        _ => Ok(ScalarValue::Text(text)),
    }
}

/// INTERVAL in PostgreSQL's default output style
fn interval(raw: &[u8]) -> Result<String, BoxError> {
    let mut r = Reader::new(raw);
    let micros = r.i64()?;
    let days = r.i32()?;
    let months = r.i32()?;

    let unit = |n: i64, name: &str| {
        if n.abs() == 1 {
            format!("{} {}", n, name)
        } else {
            format!("{} {}s", n, name)
        }
    };

    let mut parts = Vec::new();
    let (years, months) = (months / 12, months % 12);
    if years != 0 {
        parts.push(unit(years.into(), "year"));
    }
    if months != 0 {
        parts.push(unit(months.into(), "mon"));
    }
    if days != 0 {
        parts.push(unit(days.into(), "day"));
    }
    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 { "-" } else { "" };
        let total = micros.unsigned_abs();
        let secs = total / 1_000_000;
        let mut clock = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
        if total % 1_000_000 != 0 {
            clock.push_str(&format!(".{:06}", total % 1_000_000));
        }
        parts.push(clock);
    }
    Ok(parts.join(" "))
}

/// INET/CIDR; the prefix is shown unless it covers the whole address
fn inet(raw: &[u8]) -> Result<String, BoxError> {
    let mut r = Reader::new(raw);
    let _family = r.u8()?;
    let bits = r.u8()?;
    let is_cidr = r.u8()? != 0;
    let len = r.u8()? as usize;
    let addr = r.take(len)?;

    let (ip, full) = match len {
        4 => (IpAddr::V4(Ipv4Addr::new(addr[0], addr[1], addr[2], addr[3])), 32),
        16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(addr);
            (IpAddr::V6(Ipv6Addr::from(octets)), 128)
        }
        other => return Err(format!("invalid inet address length {}", other).into()),
    };

    if is_cidr || bits != full {
        Ok(format!("{}/{}", ip, bits))
    } else {
        Ok(ip.to_string())
    }
}

/// Arrays in PostgreSQL's `{a,b,NULL}` literal form, nested per dimension
fn array(element: &Type, raw: &[u8]) -> Result<String, BoxError> {
    let mut r = Reader::new(raw);
    let ndim = r.i32()?;
    let _has_nulls = r.i32()?;
    let _element_oid = r.i32()?;

    let mut dims = Vec::with_capacity(ndim.max(0) as usize);
    for _ in 0..ndim {
        let len = r.i32()?;
        let _lower_bound = r.i32()?;
        dims.push(len.max(0) as usize);
    }

    if dims.is_empty() {
        return Ok("{}".to_string());
    }

    let mut out = String::new();
    array_level(element, &dims, &mut r, &mut out)?;
    Ok(out)
}

fn array_level(
    element: &Type,
    dims: &[usize],
    r: &mut Reader<'_>,
    out: &mut String,
) -> Result<(), BoxError> {
    out.push('{');
    for i in 0..dims[0] {
        if i > 0 {
            out.push(',');
        }
        if dims.len() > 1 {
            array_level(element, &dims[1..], r, out)?;
            continue;
        }

        let len = r.i32()?;
        if len < 0 {
            out.push_str("NULL");
            continue;
        }
        match decode(element, r.take(len as usize)?)? {
            ScalarValue::Text(text) => out.push_str(&array_item(&text)),
            other => out.push_str(&other.to_string()),
        }
    }
    out.push('}');
    Ok(())
}

fn array_item(text: &str) -> String {
    let needs_quotes = text.is_empty()
        || text.eq_ignore_ascii_case("null")
        || text
            .chars()
            .any(|c| matches!(c, ',' | '{' | '}' | '"' | '\\') || c.is_whitespace());
    if needs_quotes {
        format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        text.to_string()
    }
}
