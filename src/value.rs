use crate::error::{Error, Result};

use byteorder::{BigEndian, ByteOrder};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Arrangement of the bytes inside registers and of the registers inside a value.
///
/// The default is big endian with the most significant register first.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordOrder {
    #[serde(default)]
    pub swap_bytes: bool,
    #[serde(default)]
    pub swap_words: bool,
}

impl WordOrder {
    /// Convert the registers of a single value into big endian bytes.
    pub fn to_bytes(&self, words: &[u16]) -> Vec<u8> {
        let words: Vec<u16> = if self.swap_words {
            words.iter().rev().copied().collect()
        } else {
            words.to_vec()
        };
        self.stream(&words)
    }

    /// Convert big endian bytes of a single value into registers.
    pub fn to_words(&self, bytes: &[u8]) -> Vec<u16> {
        let words = self.pack(bytes);
        if self.swap_words {
            words.into_iter().rev().collect()
        } else {
            words
        }
    }

    /// Byte stream of consecutive registers, used for text and raw bytes.
    ///
    /// Word swapping has no meaning for a stream and is ignored.
    pub fn stream(&self, words: &[u16]) -> Vec<u8> {
        words
            .iter()
            .flat_map(|w| {
                let [hi, lo] = w.to_be_bytes();
                if self.swap_bytes { [lo, hi] } else { [hi, lo] }
            })
            .collect()
    }

    /// Pack a byte stream into registers, padding an odd tail with zero.
    pub fn pack(&self, bytes: &[u8]) -> Vec<u16> {
        bytes
            .chunks(2)
            .map(|c| {
                let (hi, lo) = (c[0], c.get(1).copied().unwrap_or(0));
                if self.swap_bytes {
                    u16::from_be_bytes([lo, hi])
                } else {
                    u16::from_be_bytes([hi, lo])
                }
            })
            .collect()
    }
}

/// Numeric data type tags that decode into a single `Value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberType {
    Short,
    UShort,
    Int,
    UInt,
    Float,
    Double,
    Long,
    ULong,
}

impl NumberType {
    /// The width in Modbus registers (u16) of the type
    pub fn width(&self) -> u16 {
        match self {
            Self::Short | Self::UShort => 1,
            Self::Int | Self::UInt | Self::Float => 2,
            Self::Long | Self::ULong | Self::Double => 4,
        }
    }

    pub fn decode(&self, words: &[u16], order: WordOrder) -> Result<Value> {
        let width = self.width() as usize;
        if words.len() < width {
            return Err(Error::Read(format!(
                "Too few registers to decode {:?} ({} of {})",
                self,
                words.len(),
                width
            )));
        }
        let bytes = order.to_bytes(&words[..width]);
        Ok(match self {
            Self::Short => Value::I16(BigEndian::read_i16(&bytes)),
            Self::UShort => Value::U16(BigEndian::read_u16(&bytes)),
            Self::Int => Value::I32(BigEndian::read_i32(&bytes)),
            Self::UInt => Value::U32(BigEndian::read_u32(&bytes)),
            Self::Float => Value::F32(BigEndian::read_f32(&bytes)),
            Self::Long => Value::I64(BigEndian::read_i64(&bytes)),
            Self::ULong => Value::U64(BigEndian::read_u64(&bytes)),
            Self::Double => Value::F64(BigEndian::read_f64(&bytes)),
        })
    }

    /// Parse the literal `s` and encode it into the registers of one value.
    pub fn encode(&self, s: &str, order: WordOrder) -> Result<Vec<u16>> {
        let invalid = |e: &dyn std::fmt::Display| {
            Error::config(format!("Invalid {:?} value '{}' [{}]", self, s, e))
        };
        let mut bytes = vec![0u8; self.width() as usize * 2];
        match self {
            Self::Short => {
                BigEndian::write_i16(&mut bytes, parse_signed(s).map_err(|e| invalid(&e))?)
            }
            Self::UShort => {
                BigEndian::write_u16(&mut bytes, parse_unsigned(s).map_err(|e| invalid(&e))?)
            }
            Self::Int => {
                BigEndian::write_i32(&mut bytes, parse_signed(s).map_err(|e| invalid(&e))?)
            }
            Self::UInt => {
                BigEndian::write_u32(&mut bytes, parse_unsigned(s).map_err(|e| invalid(&e))?)
            }
            Self::Long => {
                BigEndian::write_i64(&mut bytes, parse_signed(s).map_err(|e| invalid(&e))?)
            }
            Self::ULong => {
                BigEndian::write_u64(&mut bytes, parse_unsigned(s).map_err(|e| invalid(&e))?)
            }
            Self::Float => {
                let val: f32 = if let Some(h) = s.strip_prefix("0x") {
                    u32::from_str_radix(h, 16)
                        .map(f32::from_bits)
                        .map_err(|e| invalid(&e))?
                } else {
                    s.parse().map_err(|e| invalid(&e))?
                };
                BigEndian::write_f32(&mut bytes, val)
            }
            Self::Double => {
                let val: f64 = if let Some(h) = s.strip_prefix("0x") {
                    u64::from_str_radix(h, 16)
                        .map(f64::from_bits)
                        .map_err(|e| invalid(&e))?
                } else {
                    s.parse().map_err(|e| invalid(&e))?
                };
                BigEndian::write_f64(&mut bytes, val)
            }
        }
        Ok(order.to_words(&bytes))
    }
}

fn parse_unsigned<T>(s: &str) -> std::result::Result<T, String>
where
    T: TryFrom<u64> + std::str::FromStr,
    <T as std::str::FromStr>::Err: std::fmt::Display,
{
    if let Some(h) = s.strip_prefix("0x") {
        let v = u64::from_str_radix(h, 16).map_err(|e| e.to_string())?;
        T::try_from(v).map_err(|_| "value out of range".to_owned())
    } else {
        s.parse().map_err(|e: <T as std::str::FromStr>::Err| e.to_string())
    }
}

fn parse_signed<T>(s: &str) -> std::result::Result<T, String>
where
    T: TryFrom<i128> + std::str::FromStr,
    <T as std::str::FromStr>::Err: std::fmt::Display,
{
    let hex = |h: &str| i128::from_str_radix(h, 16).map_err(|e| e.to_string());
    let v = if let Some(h) = s.strip_prefix("-0x") {
        -hex(h)?
    } else if let Some(h) = s.strip_prefix("0x") {
        hex(h)?
    } else {
        return s.parse().map_err(|e: <T as std::str::FromStr>::Err| e.to_string());
    };
    T::try_from(v).map_err(|_| "value out of range".to_owned())
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U16(u16),
    U32(u32),
    U64(u64),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Value {
    pub fn as_str(&self) -> String {
        match self {
            Self::U16(v) => format!("{v}"),
            Self::U32(v) => format!("{v}"),
            Self::U64(v) => format!("{v}"),
            Self::I16(v) => format!("{v}"),
            Self::I32(v) => format!("{v}"),
            Self::I64(v) => format!("{v}"),
            Self::F32(v) => format!("{v}"),
            Self::F64(v) => format!("{v}"),
        }
    }

    pub fn as_hex_str(&self) -> String {
        match self {
            Self::U16(v) => format!("0x{:01$X}", v, 4),
            Self::U32(v) => format!("0x{:01$X}", v, 8),
            Self::U64(v) => format!("0x{:01$X}", v, 16),
            Self::I16(v) => format!("0x{:01$X}", v, 4),
            Self::I32(v) => format!("0x{:01$X}", v, 8),
            Self::I64(v) => format!("0x{:01$X}", v, 16),
            Self::F32(v) => format!("0x{:01$X}", v.to_bits(), 8),
            Self::F64(v) => format!("0x{:01$X}", v.to_bits(), 16),
        }
    }
}

/// Render raw bytes as a single `0x` prefixed hex string.
pub fn hex_bytes(bytes: &[u8]) -> String {
    format!("0x{}", bytes.iter().map(|b| format!("{:02X}", b)).join(""))
}

/// Render bytes as text, dropping trailing NUL padding.
pub fn ascii(bytes: &[u8]) -> String {
    let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |p| p + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
