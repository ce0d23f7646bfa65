//! Maps a validated `RequestSpec` onto a single session operation and renders the result.
//!
//! Every supported `(Category, DataType)` pair has one entry in a static table holding the
//! operation to execute and the formatter for its result. Adding a data type means adding a
//! row, not another branch in every command.

use crate::error::{Error, Result};
use crate::net::DeviceSession;
use crate::request::{Category, DataType, RequestSpec};
use crate::value::{ascii, hex_bytes, NumberType, Value};

use itertools::Itertools;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::info;

/// Class of session operation an entry performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Bools,
    Words,
    Bytes,
    BitVector,
    Number(NumberType),
}

/// Result of one operation before formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Bools(Vec<bool>),
    Words(Vec<u16>),
    Bytes(Vec<u8>),
    BitVector(u16),
    Values(Vec<Value>),
}

type Formatter = fn(&RequestSpec, Reading) -> Result<Vec<String>>;

pub struct Entry {
    pub operation: Operation,
    format: Formatter,
}

static TABLE: Lazy<HashMap<(Category, DataType), Entry>> = Lazy::new(|| {
    let mut table = HashMap::new();
    for category in [Category::Coil, Category::DiscreteInput] {
        table.insert(
            (category, DataType::None),
            Entry {
                operation: Operation::Bools,
                format: format_bools,
            },
        );
    }
    let numbers = [
        NumberType::Short,
        NumberType::UShort,
        NumberType::Int,
        NumberType::UInt,
        NumberType::Float,
        NumberType::Double,
        NumberType::Long,
        NumberType::ULong,
    ];
    for category in [Category::HoldingRegister, Category::InputRegister] {
        let rows: [(DataType, Operation, Formatter); 4] = [
            (DataType::None, Operation::Words, format_words),
            (DataType::String, Operation::Bytes, format_text),
            (DataType::Byte, Operation::Bytes, format_bytes),
            (DataType::Bits, Operation::BitVector, format_bit_vector),
        ];
        for (data_type, operation, format) in rows {
            table.insert((category, data_type), Entry { operation, format });
        }
        for ty in numbers {
            table.insert(
                (category, DataType::Number(ty)),
                Entry {
                    operation: Operation::Number(ty),
                    format: format_values,
                },
            );
        }
    }
    table
});

fn unexpected(reading: Reading) -> Error {
    Error::Read(format!("Unexpected reading {:?}", reading))
}

fn format_bools(spec: &RequestSpec, reading: Reading) -> Result<Vec<String>> {
    match reading {
        Reading::Bools(v) => Ok(v
            .iter()
            .enumerate()
            .map(|(i, b)| {
                format!(
                    "Value of {}[{}] = {}",
                    spec.category(),
                    spec.offset() as usize + i,
                    b
                )
            })
            .collect()),
        r => Err(unexpected(r)),
    }
}

fn format_words(spec: &RequestSpec, reading: Reading) -> Result<Vec<String>> {
    match reading {
        Reading::Words(v) => Ok(v
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let value = if spec.hex() {
                    format!("0x{:04X}", w)
                } else {
                    format!("{}", w)
                };
                format!(
                    "Value of {}[{}] = {}",
                    spec.category(),
                    spec.offset() as usize + i,
                    value
                )
            })
            .collect()),
        r => Err(unexpected(r)),
    }
}

fn format_text(spec: &RequestSpec, reading: Reading) -> Result<Vec<String>> {
    match reading {
        Reading::Bytes(v) => {
            let value = if spec.hex() { hex_bytes(&v) } else { ascii(&v) };
            Ok(vec![format!(
                "Value of {}[{}] = {}",
                spec.category(),
                spec.offset(),
                value
            )])
        }
        r => Err(unexpected(r)),
    }
}

fn format_bytes(spec: &RequestSpec, reading: Reading) -> Result<Vec<String>> {
    match reading {
        Reading::Bytes(v) => Ok(v
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let value = if spec.hex() {
                    format!("0x{:02X}", b)
                } else {
                    format!("{}", b)
                };
                format!(
                    "Value of {}[{}] byte[{}] = {}",
                    spec.category(),
                    spec.offset() as usize + i / 2,
                    i,
                    value
                )
            })
            .collect()),
        r => Err(unexpected(r)),
    }
}

fn format_bit_vector(spec: &RequestSpec, reading: Reading) -> Result<Vec<String>> {
    match reading {
        Reading::BitVector(bits) => Ok(vec![format!(
            "Bits of {}[{}] = {:016b}",
            spec.category(),
            spec.offset(),
            bits
        )]),
        r => Err(unexpected(r)),
    }
}

fn format_values(spec: &RequestSpec, reading: Reading) -> Result<Vec<String>> {
    let width = match spec.data_type() {
        DataType::Number(ty) => ty.width() as usize,
        _ => 1,
    };
    match reading {
        Reading::Values(v) => Ok(v
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let value = if spec.hex() {
                    value.as_hex_str()
                } else {
                    value.as_str()
                };
                format!(
                    "Value of {}[{}] = {}",
                    spec.category(),
                    spec.offset() as usize + i * width,
                    value
                )
            })
            .collect()),
        r => Err(unexpected(r)),
    }
}

/// Executes one validated request against a session.
pub struct Dispatcher {
    spec: RequestSpec,
    entry: &'static Entry,
}

impl Dispatcher {
    pub fn new(spec: RequestSpec) -> Result<Self> {
        let entry = TABLE
            .get(&(spec.category(), spec.data_type()))
            .ok_or_else(|| {
                Error::config(format!(
                    "Data type {} is not supported for {}s. Supported: {}",
                    spec.data_type(),
                    spec.category(),
                    supported(spec.category())
                ))
            })?;
        Ok(Self { spec, entry })
    }

    pub fn spec(&self) -> &RequestSpec {
        &self.spec
    }

    pub fn operation(&self) -> Operation {
        self.entry.operation
    }

    /// Perform the read and return one rendered line per item.
    pub async fn execute<S>(&self, session: &mut S, verbose: bool) -> Result<Vec<String>>
    where
        S: DeviceSession + ?Sized,
    {
        if verbose {
            info!("{}", self.spec.describe());
        }
        let category = self.spec.category();
        let (offset, count) = (self.spec.offset(), self.spec.count());
        let reading = match self.operation() {
            Operation::Bools => {
                Reading::Bools(session.read_bools(category, offset, count).await?)
            }
            Operation::Words => {
                Reading::Words(session.read_words(category, offset, count).await?)
            }
            Operation::Bytes => {
                Reading::Bytes(session.read_bytes(category, offset, count).await?)
            }
            Operation::BitVector => {
                Reading::BitVector(session.read_bit_vector(category, offset).await?)
            }
            Operation::Number(ty) if count == 1 => {
                Reading::Values(vec![session.read_value(category, offset, ty).await?])
            }
            Operation::Number(ty) => {
                Reading::Values(session.read_values(category, offset, ty, count).await?)
            }
        };
        (self.entry.format)(&self.spec, reading)
    }
}

/// Readable list of the data types supported for `category`.
pub fn supported(category: Category) -> String {
    TABLE
        .keys()
        .filter(|(c, _)| *c == category)
        .map(|(_, t)| t.to_string())
        .sorted()
        .join(", ")
}
