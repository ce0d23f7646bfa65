//! Validated read request built once from the operator's flags.

use crate::error::{Error, Result};
use crate::value::NumberType;

use std::fmt::Display;
use std::str::FromStr;

/// Modbus object table a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Coil,
    DiscreteInput,
    HoldingRegister,
    InputRegister,
}

impl Category {
    /// Single bit tables (coils, discrete inputs).
    pub fn is_bit(&self) -> bool {
        matches!(self, Self::Coil | Self::DiscreteInput)
    }
}

impl Display for Category {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Coil => fmt.write_str("coil"),
            Category::DiscreteInput => fmt.write_str("discrete input"),
            Category::HoldingRegister => fmt.write_str("holding register"),
            Category::InputRegister => fmt.write_str("input register"),
        }
    }
}

/// Category flags as given on the command line. Exactly one must be set.
#[derive(Debug, Clone, Copy, Default)]
pub struct Selection {
    pub coil: bool,
    pub discrete_input: bool,
    pub holding_register: bool,
    pub input_register: bool,
}

impl Selection {
    pub fn category(&self) -> Result<Category> {
        let selected: Vec<Category> = [
            (self.coil, Category::Coil),
            (self.discrete_input, Category::DiscreteInput),
            (self.holding_register, Category::HoldingRegister),
            (self.input_register, Category::InputRegister),
        ]
        .into_iter()
        .filter_map(|(set, c)| set.then_some(c))
        .collect();

        match selected.as_slice() {
            [c] => Ok(*c),
            [] => Err(Error::config(
                "No category selected. Use one of -c, -d, -h or -i.",
            )),
            _ => Err(Error::config(
                "Multiple categories selected. Use exactly one of -c, -d, -h or -i.",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    None,
    Bits,
    String,
    HexString,
    Byte,
    Number(NumberType),
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_lowercase().as_str() {
            "" | "none" => Self::None,
            "bits" => Self::Bits,
            "string" => Self::String,
            "hexstring" => Self::HexString,
            "byte" => Self::Byte,
            "short" => Self::Number(NumberType::Short),
            "ushort" => Self::Number(NumberType::UShort),
            "int" => Self::Number(NumberType::Int),
            "uint" => Self::Number(NumberType::UInt),
            "float" => Self::Number(NumberType::Float),
            "double" => Self::Number(NumberType::Double),
            "long" => Self::Number(NumberType::Long),
            "ulong" => Self::Number(NumberType::ULong),
            other => {
                return Err(Error::config(format!(
                    "Unsupported data type '{}'. Supported: bits, string, hexstring, byte, \
                     short, ushort, int, uint, float, double, long, ulong",
                    other
                )));
            }
        })
    }
}

impl Display for DataType {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::None => fmt.write_str("raw"),
            DataType::Bits => fmt.write_str("bits"),
            DataType::String => fmt.write_str("string"),
            DataType::HexString => fmt.write_str("hexstring"),
            DataType::Byte => fmt.write_str("byte"),
            DataType::Number(n) => write!(fmt, "{}", format!("{:?}", n).to_lowercase()),
        }
    }
}

/// Adjustments applied while validating a request. Reported to the operator
/// but never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    DataTypeIgnored(Category),
    HexIgnored(Category),
    CountClamped(u16),
}

impl Display for Warning {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::DataTypeIgnored(c) => {
                write!(fmt, "Data type is ignored when reading {}s.", c)
            }
            Warning::HexIgnored(c) => write!(fmt, "Hex display is ignored when reading {}s.", c),
            Warning::CountClamped(n) => {
                write!(fmt, "Data type bits reads a single register, count {} clamped to 1.", n)
            }
        }
    }
}

/// Raw request parameters before validation.
#[derive(Debug, Clone, Default)]
pub struct RequestArgs {
    pub selection: Selection,
    pub data_type: Option<String>,
    pub offset: u16,
    pub count: u16,
    pub hex: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    category: Category,
    data_type: DataType,
    offset: u16,
    count: u16,
    hex: bool,
    warnings: Vec<Warning>,
}

impl RequestSpec {
    pub fn new(args: &RequestArgs) -> Result<Self> {
        let category = args.selection.category()?;
        let mut data_type = match args.data_type {
            Some(ref s) => s.parse()?,
            None => DataType::None,
        };
        if args.count == 0 {
            return Err(Error::config("Number of items must be at least 1."));
        }

        let mut warnings = vec![];
        let mut count = args.count;
        let mut hex = args.hex;

        if category.is_bit() {
            if data_type != DataType::None {
                warnings.push(Warning::DataTypeIgnored(category));
                data_type = DataType::None;
            }
            if hex {
                warnings.push(Warning::HexIgnored(category));
                hex = false;
            }
        }

        // `hexstring` is the hex rendering of a string read
        if data_type == DataType::HexString {
            data_type = DataType::String;
            hex = true;
        }

        if data_type == DataType::Bits && count > 1 {
            warnings.push(Warning::CountClamped(count));
            count = 1;
        }

        Ok(Self {
            category,
            data_type,
            offset: args.offset,
            count,
            hex,
            warnings,
        })
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn offset(&self) -> u16 {
        self.offset
    }

    pub fn count(&self) -> u16 {
        self.count
    }

    pub fn hex(&self) -> bool {
        self.hex
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// One line description used for verbose output.
    pub fn describe(&self) -> String {
        format!(
            "Reading {} {}(s) as {} starting at offset {}{}",
            self.count,
            self.category,
            self.data_type,
            self.offset,
            if self.hex { " (hex)" } else { "" }
        )
    }
}
