//! Persistent identifiers.
//!
//! Every library, track and playlist carries an opaque 64-bit identifier
//! that stays stable across sessions. The canonical textual form is
//! 16 uppercase hex digits; the artwork cache binds the same value as a
//! signed integer.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A persistent identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pid(pub u64);

impl Pid {
    /// Canonical rendering: 16 uppercase hex digits, zero padded.
    pub fn hex(&self) -> String {
        format!("{:016X}", self.0)
    }

    /// Parse from hexadecimal text.
    pub fn from_hex(s: &str) -> Result<Self, std::num::ParseIntError> {
        u64::from_str_radix(s, 16).map(Pid)
    }

    /// Two's-complement signed form used at the SQL boundary.
    ///
    /// Values at or above 2^63 map to their negative counterparts so the
    /// full u64 range round-trips through a signed column.
    pub fn signed(&self) -> i64 {
        self.0 as i64
    }

    /// Inverse of [`Pid::signed`].
    pub fn from_signed(v: i64) -> Self {
        Pid(v as u64)
    }

    /// Whether this is the zero ("absent") id.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Convert the zero sentinel into `None`.
    pub fn nonzero(self) -> Option<Self> {
        if self.is_zero() {
            None
        } else {
            Some(self)
        }
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

impl From<u64> for Pid {
    fn from(v: u64) -> Self {
        Pid(v)
    }
}

impl FromStr for Pid {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pid::from_hex(s)
    }
}

impl Serialize for Pid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex())
    }
}

struct PidVisitor;

impl Visitor<'_> for PidVisitor {
    type Value = Pid;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a 16-digit hex persistent id")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Pid, E> {
        Pid::from_hex(v).map_err(|_| E::custom(format!("invalid persistent id {v:?}")))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Pid, E> {
        Ok(Pid(v))
    }
}

impl<'de> Deserialize<'de> for Pid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PidVisitor)
    }
}

impl ToSql for Pid {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.signed()))
    }
}

impl FromSql for Pid {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(v) => Ok(Pid::from_signed(v)),
            ValueRef::Text(t) => {
                let s = std::str::from_utf8(t).map_err(|e| FromSqlError::Other(Box::new(e)))?;
                Pid::from_hex(s).map_err(|e| FromSqlError::Other(Box::new(e)))
            }
            ValueRef::Null => Ok(Pid(0)),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_canonical() {
        assert_eq!(Pid(0).hex(), "0000000000000000");
        assert_eq!(Pid(0xABCD).hex(), "000000000000ABCD");
        assert_eq!(Pid(u64::MAX).hex(), "FFFFFFFFFFFFFFFF");
        assert_eq!(Pid(0xABCD).hex().len(), 16);
    }

    #[test]
    fn hex_round_trip() {
        for v in [0u64, 1, 0xDEADBEEF, 1 << 63, u64::MAX] {
            let p = Pid(v);
            assert_eq!(Pid::from_hex(&p.hex()).unwrap(), p);
        }
    }

    #[test]
    fn signed_round_trip() {
        for v in [0u64, 1, 0x7FFF_FFFF_FFFF_FFFF, 1 << 63, u64::MAX] {
            let p = Pid(v);
            assert_eq!(Pid::from_signed(p.signed()), p);
        }
    }

    #[test]
    fn high_bit_signs_negative() {
        let p = Pid(0x8000_0000_0000_0000);
        assert_eq!(p.signed(), i64::MIN);
        assert_eq!(Pid::from_signed(i64::MIN), p);
    }

    #[test]
    fn parses_lowercase() {
        assert_eq!(Pid::from_hex("00000000deadbeef").unwrap(), Pid(0xDEADBEEF));
    }

    #[test]
    fn serde_as_hex_string() {
        let json = serde_json::to_string(&Pid(0xAB)).unwrap();
        assert_eq!(json, "\"00000000000000AB\"");
        let back: Pid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Pid(0xAB));
    }

    #[test]
    fn sql_binding_round_trip() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (id INTEGER)", []).unwrap();
        let p = Pid(0x8000_0000_0000_0000);
        conn.execute("INSERT INTO t VALUES (?1)", rusqlite::params![p])
            .unwrap();
        let raw: i64 = conn.query_row("SELECT id FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(raw, -9223372036854775808);
        let back: Pid = conn.query_row("SELECT id FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(back, p);
    }
}
