//! QPack serialization (the compact binary format used by SiriDB).
//!
//! Every value starts with a single type byte:
//!
//! | byte        | meaning                                      |
//! |-------------|----------------------------------------------|
//! | `0..=63`    | integer 0..63                                |
//! | `64..=123`  | integer -1..-60 (`63 - byte`)                |
//! | `124`       | hook (not produced, rejected on decode)      |
//! | `125..=127` | double -1.0, 0.0, 1.0                        |
//! | `128..=227` | raw string, length `byte - 128`              |
//! | `228..=231` | raw string with u8/u16/u32/u64 length        |
//! | `232..=235` | i8/i16/i32/i64                               |
//! | `236`       | f64                                          |
//! | `237..=242` | array with 0..5 items                        |
//! | `243..=248` | map with 0..5 pairs                          |
//! | `249..=251` | true, false, null                            |
//! | `252..=255` | array open, map open, array close, map close |
//!
//! All multi-byte numbers are little-endian.

use serde_json::{Map, Number, Value};
use thiserror::Error;

const QP_HOOK: u8 = 124;
const QP_DOUBLE_N1: u8 = 125;
const QP_DOUBLE_0: u8 = 126;
const QP_DOUBLE_1: u8 = 127;
const QP_RAW_INLINE: u8 = 128;
const QP_RAW8: u8 = 228;
const QP_RAW16: u8 = 229;
const QP_RAW32: u8 = 230;
const QP_RAW64: u8 = 231;
const QP_INT8: u8 = 232;
const QP_INT16: u8 = 233;
const QP_INT32: u8 = 234;
const QP_INT64: u8 = 235;
const QP_DOUBLE: u8 = 236;
const QP_ARRAY0: u8 = 237;
const QP_ARRAY5: u8 = 242;
const QP_MAP0: u8 = 243;
const QP_MAP5: u8 = 248;
const QP_TRUE: u8 = 249;
const QP_FALSE: u8 = 250;
const QP_NULL: u8 = 251;
const QP_ARRAY_OPEN: u8 = 252;
const QP_MAP_OPEN: u8 = 253;
const QP_ARRAY_CLOSE: u8 = 254;
const QP_MAP_CLOSE: u8 = 255;

const MAX_INLINE_RAW: usize = 99;
const MAX_FIXED_ITEMS: usize = 5;
/// Maximum container nesting accepted by `unpack`.
const MAX_DEPTH: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QpackError {
    #[error("unexpected end of qpack data")]
    UnexpectedEnd,
    #[error("unexpected qpack type byte {0} at offset {1}")]
    UnexpectedType(u8, usize),
    #[error("invalid utf-8 in qpack string at offset {0}")]
    InvalidUtf8(usize),
    #[error("{0} trailing byte(s) after qpack value")]
    TrailingBytes(usize),
    #[error("qpack value is not representable: {0}")]
    Unrepresentable(String),
    #[error("qpack containers nested too deeply at offset {0}")]
    TooDeep(usize),
}

/// Serializes a structured value.
pub fn pack(value: &Value) -> Result<Vec<u8>, QpackError> {
    let mut out = Vec::with_capacity(64);
    pack_into(value, &mut out)?;
    Ok(out)
}

fn pack_into(value: &Value, out: &mut Vec<u8>) -> Result<(), QpackError> {
    match value {
        Value::Null => out.push(QP_NULL),
        Value::Bool(true) => out.push(QP_TRUE),
        Value::Bool(false) => out.push(QP_FALSE),
        Value::Number(n) => pack_number(n, out)?,
        Value::String(s) => pack_raw(s.as_bytes(), out),
        Value::Array(items) => {
            if items.len() <= MAX_FIXED_ITEMS {
                out.push(QP_ARRAY0 + items.len() as u8);
                for item in items {
                    pack_into(item, out)?;
                }
            } else {
                out.push(QP_ARRAY_OPEN);
                for item in items {
                    pack_into(item, out)?;
                }
                out.push(QP_ARRAY_CLOSE);
            }
        }
        Value::Object(map) => {
            let fixed = map.len() <= MAX_FIXED_ITEMS;
            out.push(if fixed {
                QP_MAP0 + map.len() as u8
            } else {
                QP_MAP_OPEN
            });
            for (key, item) in map {
                pack_raw(key.as_bytes(), out);
                pack_into(item, out)?;
            }
            if !fixed {
                out.push(QP_MAP_CLOSE);
            }
        }
    }
    Ok(())
}

fn pack_number(n: &Number, out: &mut Vec<u8>) -> Result<(), QpackError> {
    if let Some(i) = n.as_i64() {
        pack_int(i, out);
    } else if let Some(u) = n.as_u64() {
        // larger than i64::MAX; qpack has no unsigned 64-bit type
        return Err(QpackError::Unrepresentable(u.to_string()));
    } else if let Some(f) = n.as_f64() {
        pack_double(f, out);
    }
    Ok(())
}

fn pack_int(i: i64, out: &mut Vec<u8>) {
    if (0..64).contains(&i) {
        out.push(i as u8);
    } else if (-60..0).contains(&i) {
        out.push((63 - i) as u8);
    } else if let Ok(v) = i8::try_from(i) {
        out.push(QP_INT8);
        out.extend_from_slice(&v.to_le_bytes());
    } else if let Ok(v) = i16::try_from(i) {
        out.push(QP_INT16);
        out.extend_from_slice(&v.to_le_bytes());
    } else if let Ok(v) = i32::try_from(i) {
        out.push(QP_INT32);
        out.extend_from_slice(&v.to_le_bytes());
    } else {
        out.push(QP_INT64);
        out.extend_from_slice(&i.to_le_bytes());
    }
}

fn pack_double(f: f64, out: &mut Vec<u8>) {
    if f == -1.0 {
        out.push(QP_DOUBLE_N1);
    } else if f == 0.0 && f.is_sign_positive() {
        out.push(QP_DOUBLE_0);
    } else if f == 1.0 {
        out.push(QP_DOUBLE_1);
    } else {
        out.push(QP_DOUBLE);
        out.extend_from_slice(&f.to_le_bytes());
    }
}

fn pack_raw(raw: &[u8], out: &mut Vec<u8>) {
    let len = raw.len();
    if len <= MAX_INLINE_RAW {
        out.push(QP_RAW_INLINE + len as u8);
    } else if let Ok(l) = u8::try_from(len) {
        out.push(QP_RAW8);
        out.push(l);
    } else if let Ok(l) = u16::try_from(len) {
        out.push(QP_RAW16);
        out.extend_from_slice(&l.to_le_bytes());
    } else if let Ok(l) = u32::try_from(len) {
        out.push(QP_RAW32);
        out.extend_from_slice(&l.to_le_bytes());
    } else {
        out.push(QP_RAW64);
        out.extend_from_slice(&(len as u64).to_le_bytes());
    }
    out.extend_from_slice(raw);
}

/// Deserializes exactly one root value.
pub fn unpack(data: &[u8]) -> Result<Value, QpackError> {
    let mut reader = Reader { data, pos: 0 };
    let value = match reader.next(0)? {
        Item::Value(v) => v,
        Item::Close(tp) => return Err(QpackError::UnexpectedType(tp, 0)),
    };
    let rest = data.len() - reader.pos;
    if rest > 0 {
        return Err(QpackError::TrailingBytes(rest));
    }
    Ok(value)
}

enum Item {
    Value(Value),
    Close(u8),
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], QpackError> {
        let end = self.pos.checked_add(n).ok_or(QpackError::UnexpectedEnd)?;
        let slice = self.data.get(self.pos..end).ok_or(QpackError::UnexpectedEnd)?;
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], QpackError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn raw(&mut self, len: usize) -> Result<Value, QpackError> {
        let start = self.pos;
        let bytes = self.take(len)?;
        let s = std::str::from_utf8(bytes).map_err(|_| QpackError::InvalidUtf8(start))?;
        Ok(Value::String(s.to_string()))
    }

    fn value(&mut self, depth: usize) -> Result<Value, QpackError> {
        let offset = self.pos;
        match self.next(depth)? {
            Item::Value(v) => Ok(v),
            Item::Close(tp) => Err(QpackError::UnexpectedType(tp, offset)),
        }
    }

    fn next(&mut self, depth: usize) -> Result<Item, QpackError> {
        let offset = self.pos;
        let tp = self.take(1)?[0];
        if depth >= MAX_DEPTH && is_container(tp) {
            return Err(QpackError::TooDeep(offset));
        }
        let value = match tp {
            0..=63 => Value::from(tp as i64),
            64..=123 => Value::from(63 - tp as i64),
            QP_HOOK => return Err(QpackError::UnexpectedType(tp, offset)),
            QP_DOUBLE_N1 => Value::from(-1.0),
            QP_DOUBLE_0 => Value::from(0.0),
            QP_DOUBLE_1 => Value::from(1.0),
            QP_RAW_INLINE..=227 => self.raw((tp - QP_RAW_INLINE) as usize)?,
            QP_RAW8 => {
                let len = self.take_array::<1>()?[0] as usize;
                self.raw(len)?
            }
            QP_RAW16 => {
                let len = u16::from_le_bytes(self.take_array()?) as usize;
                self.raw(len)?
            }
            QP_RAW32 => {
                let len = u32::from_le_bytes(self.take_array()?) as usize;
                self.raw(len)?
            }
            QP_RAW64 => {
                let len = u64::from_le_bytes(self.take_array()?);
                let len = usize::try_from(len).map_err(|_| QpackError::UnexpectedEnd)?;
                self.raw(len)?
            }
            QP_INT8 => Value::from(i8::from_le_bytes(self.take_array()?) as i64),
            QP_INT16 => Value::from(i16::from_le_bytes(self.take_array()?) as i64),
            QP_INT32 => Value::from(i32::from_le_bytes(self.take_array()?) as i64),
            QP_INT64 => Value::from(i64::from_le_bytes(self.take_array()?)),
            QP_DOUBLE => {
                let f = f64::from_le_bytes(self.take_array()?);
                Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| QpackError::Unrepresentable(f.to_string()))?
            }
            QP_ARRAY0..=QP_ARRAY5 => {
                let n = (tp - QP_ARRAY0) as usize;
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    items.push(self.value(depth + 1)?);
                }
                Value::Array(items)
            }
            QP_MAP0..=QP_MAP5 => {
                let n = (tp - QP_MAP0) as usize;
                let mut map = Map::new();
                for _ in 0..n {
                    let key = key_string(self.value(depth + 1)?);
                    let item = self.value(depth + 1)?;
                    map.insert(key, item);
                }
                Value::Object(map)
            }
            QP_TRUE => Value::Bool(true),
            QP_FALSE => Value::Bool(false),
            QP_NULL => Value::Null,
            QP_ARRAY_OPEN => {
                let mut items = Vec::new();
                while !self.at_end() {
                    match self.next(depth + 1)? {
                        Item::Value(v) => items.push(v),
                        Item::Close(QP_ARRAY_CLOSE) => break,
                        Item::Close(other) => {
                            return Err(QpackError::UnexpectedType(other, self.pos - 1))
                        }
                    }
                }
                Value::Array(items)
            }
            QP_MAP_OPEN => {
                let mut map = Map::new();
                while !self.at_end() {
                    let key = match self.next(depth + 1)? {
                        Item::Value(v) => key_string(v),
                        Item::Close(QP_MAP_CLOSE) => break,
                        Item::Close(other) => {
                            return Err(QpackError::UnexpectedType(other, self.pos - 1))
                        }
                    };
                    let item = self.value(depth + 1)?;
                    map.insert(key, item);
                }
                Value::Object(map)
            }
            QP_ARRAY_CLOSE | QP_MAP_CLOSE => return Ok(Item::Close(tp)),
        };
        Ok(Item::Value(value))
    }
}

fn is_container(tp: u8) -> bool {
    matches!(tp, QP_ARRAY0..=QP_MAP5 | QP_ARRAY_OPEN | QP_MAP_OPEN)
}

fn key_string(key: Value) -> String {
    match key {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn small_ints_fit_in_the_type_byte() {
        assert_eq!(pack(&json!(0)).unwrap(), vec![0]);
        assert_eq!(pack(&json!(63)).unwrap(), vec![63]);
        assert_eq!(pack(&json!(-1)).unwrap(), vec![64]);
        assert_eq!(pack(&json!(-60)).unwrap(), vec![123]);
        assert_eq!(pack(&json!(64)).unwrap(), vec![QP_INT8, 64]);
        assert_eq!(pack(&json!(-61)).unwrap(), vec![QP_INT8, (-61i8) as u8]);
        assert_eq!(pack(&json!(300)).unwrap(), vec![QP_INT16, 0x2c, 0x01]);
    }

    #[test]
    fn strings_use_inline_length_up_to_99() {
        assert_eq!(pack(&json!("abc")).unwrap(), vec![131, b'a', b'b', b'c']);
        let long = "x".repeat(100);
        let packed = pack(&json!(long)).unwrap();
        assert_eq!(&packed[..2], &[QP_RAW8, 100]);
        assert_eq!(unpack(&packed).unwrap(), json!(long));
    }

    #[test]
    fn decodes_series_payload() {
        // {"cpu": [[1500000000, 0.5]]}
        let mut data = vec![QP_MAP0 + 1, 131, b'c', b'p', b'u', QP_ARRAY0 + 1, QP_ARRAY0 + 2];
        data.push(QP_INT32);
        data.extend_from_slice(&1_500_000_000i32.to_le_bytes());
        data.push(QP_DOUBLE);
        data.extend_from_slice(&0.5f64.to_le_bytes());
        assert_eq!(unpack(&data).unwrap(), json!({"cpu": [[1500000000, 0.5]]}));
    }

    #[test]
    fn open_containers_may_omit_close_at_end() {
        let data = [QP_ARRAY_OPEN, 1, 2, 3];
        assert_eq!(unpack(&data).unwrap(), json!([1, 2, 3]));
        let data = [QP_MAP_OPEN, 129, b'a', 1];
        assert_eq!(unpack(&data).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn large_collections_round_trip() {
        let value = json!({
            "a": 1, "b": [1, 2, 3, 4, 5, 6, 7], "c": null, "d": true,
            "e": false, "f": -1.0, "g": 2.25, "h": "text", "i": i64::MIN
        });
        assert_eq!(unpack(&pack(&value).unwrap()).unwrap(), value);
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(unpack(&[]), Err(QpackError::UnexpectedEnd));
        assert_eq!(unpack(&[QP_INT32, 1, 2]), Err(QpackError::UnexpectedEnd));
        assert_eq!(unpack(&[1, 2]), Err(QpackError::TrailingBytes(1)));
        assert_eq!(unpack(&[QP_HOOK]), Err(QpackError::UnexpectedType(QP_HOOK, 0)));
        assert_eq!(unpack(&[QP_ARRAY_CLOSE]), Err(QpackError::UnexpectedType(QP_ARRAY_CLOSE, 0)));
        assert_eq!(unpack(&[130, 0xff, 0xfe]), Err(QpackError::InvalidUtf8(1)));
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let mut nested = vec![QP_ARRAY0 + 1; 10_000];
        nested.push(0);
        assert_eq!(unpack(&nested), Err(QpackError::TooDeep(MAX_DEPTH)));

        let open = vec![QP_ARRAY_OPEN; 10_000];
        assert_eq!(unpack(&open), Err(QpackError::TooDeep(MAX_DEPTH)));

        let maps: Vec<u8> = std::iter::repeat([QP_MAP0 + 1, 129, b'k'])
            .take(5_000)
            .flatten()
            .collect();
        assert!(matches!(unpack(&maps), Err(QpackError::TooDeep(_))));
    }

    #[test]
    fn nesting_up_to_the_limit_is_accepted() {
        let mut nested = vec![QP_ARRAY0 + 1; MAX_DEPTH];
        nested.push(7);
        let mut expected = json!(7);
        for _ in 0..MAX_DEPTH {
            expected = json!([expected]);
        }
        assert_eq!(unpack(&nested).unwrap(), expected);
    }
}
