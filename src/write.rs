//! Validated write request, the counterpart of `RequestSpec` for the write command.

use crate::error::{Error, Result};
use crate::net::DeviceSession;
use crate::request::{Category, DataType, Selection};
use crate::value::NumberType;

/// Payload of a write, already parsed so no I/O happens for invalid input.
#[derive(Debug, Clone, PartialEq)]
enum Payload {
    Bools(Vec<bool>),
    Text(String),
    Bytes(Vec<u8>),
    Numbers(NumberType, Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteSpec {
    category: Category,
    offset: u16,
    payload: Payload,
}

fn parse_bool(s: &str) -> Result<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "on" => Ok(true),
        "0" | "false" | "off" => Ok(false),
        other => Err(Error::config(format!(
            "Invalid coil value '{}' [values: 1, 0, true, false, on, off]",
            other
        ))),
    }
}

fn parse_byte(s: &str) -> Result<u8> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| Error::config(format!("Invalid byte '{}': {}", s, e)))
}

impl WriteSpec {
    pub fn new(
        selection: Selection,
        data_type: Option<&str>,
        offset: u16,
        values: &[String],
    ) -> Result<Self> {
        let category = selection.category()?;
        if values.is_empty() {
            return Err(Error::config("No values to write given."));
        }
        let data_type: DataType = data_type.unwrap_or_default().parse()?;

        let payload = match category {
            Category::Coil => {
                if data_type != DataType::None {
                    return Err(Error::config(format!(
                        "Data type {} cannot be written to coils.",
                        data_type
                    )));
                }
                Payload::Bools(values.iter().map(|v| parse_bool(v)).collect::<Result<_>>()?)
            }
            Category::HoldingRegister => match data_type {
                DataType::None => Payload::Numbers(NumberType::UShort, values.to_vec()),
                DataType::Number(ty) => Payload::Numbers(ty, values.to_vec()),
                DataType::String => Payload::Text(values.join(" ")),
                DataType::Byte => {
                    Payload::Bytes(values.iter().map(|v| parse_byte(v)).collect::<Result<_>>()?)
                }
                DataType::Bits | DataType::HexString => {
                    return Err(Error::config(format!(
                        "Data type {} is not writable. Use string, byte or a numeric type.",
                        data_type
                    )));
                }
            },
            Category::DiscreteInput | Category::InputRegister => {
                return Err(Error::config(format!("{}s are read only.", category)));
            }
        };

        Ok(Self {
            category,
            offset,
            payload,
        })
    }

    /// Write the payload and return a confirmation line.
    pub async fn execute<S>(&self, session: &mut S) -> Result<String>
    where
        S: DeviceSession + ?Sized,
    {
        let items = match &self.payload {
            Payload::Bools(values) => {
                session.write_bools(self.offset, values).await?;
                values.len()
            }
            Payload::Text(text) => {
                session.write_text(self.offset, text).await?;
                text.len().div_ceil(2)
            }
            Payload::Bytes(bytes) => {
                let words = session.word_order().pack(bytes);
                session.write_words(self.offset, &words).await?;
                words.len()
            }
            Payload::Numbers(ty, literals) => {
                session.write_values(self.offset, *ty, literals).await?;
                literals.len() * ty.width() as usize
            }
        };
        Ok(format!(
            "Wrote {} {}(s) starting at offset {}",
            items, self.category, self.offset
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::WriteSpec;
    use crate::net::fake::FakeSession;
    use crate::request::Selection;

    fn coils() -> Selection {
        Selection {
            coil: true,
            ..Default::default()
        }
    }

    fn holding() -> Selection {
        Selection {
            holding_register: true,
            ..Default::default()
        }
    }

    fn values(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn ut_write_coils() {
        let mut session = FakeSession::with_coils(&[false; 4]);
        let spec = WriteSpec::new(coils(), None, 1, &values(&["on", "0", "TRUE"])).unwrap();
        let line = spec.execute(&mut session).await.unwrap();
        assert_eq!(session.coils, vec![false, true, false, true]);
        assert_eq!(line, "Wrote 3 coil(s) starting at offset 1");
        assert_eq!(session.calls.write_bools, 1);
    }

    #[test]
    fn ut_invalid_coil_value() {
        assert!(WriteSpec::new(coils(), None, 0, &values(&["2"]))
            .unwrap_err()
            .is_configuration());
    }

    #[tokio::test]
    async fn ut_write_default_ushort() {
        let mut session = FakeSession::with_holding(&[0; 3]);
        let spec = WriteSpec::new(holding(), None, 0, &values(&["17", "0xFFFF"])).unwrap();
        spec.execute(&mut session).await.unwrap();
        assert_eq!(session.holding, vec![17, 0xFFFF, 0]);
    }

    #[tokio::test]
    async fn ut_write_float() {
        let mut session = FakeSession::with_holding(&[0; 2]);
        let spec = WriteSpec::new(holding(), Some("float"), 0, &values(&["1.5"])).unwrap();
        let line = spec.execute(&mut session).await.unwrap();
        assert_eq!(session.holding, vec![0x3FC0, 0x0000]);
        assert_eq!(line, "Wrote 2 holding register(s) starting at offset 0");
    }

    #[tokio::test]
    async fn ut_write_text_and_bytes() {
        let mut session = FakeSession::with_holding(&[0xFFFF; 3]);
        let spec = WriteSpec::new(holding(), Some("string"), 0, &values(&["ABC"])).unwrap();
        spec.execute(&mut session).await.unwrap();
        assert_eq!(session.holding, vec![0x4142, 0x4300, 0xFFFF]);

        let spec = WriteSpec::new(holding(), Some("byte"), 1, &values(&["0x01", "2", "3"])).unwrap();
        spec.execute(&mut session).await.unwrap();
        assert_eq!(session.holding, vec![0x4142, 0x0102, 0x0300]);
    }

    #[test]
    fn ut_rejected_requests() {
        let inputs = Selection {
            input_register: true,
            ..Default::default()
        };
        assert!(WriteSpec::new(inputs, None, 0, &values(&["1"])).is_err());
        assert!(WriteSpec::new(holding(), Some("bits"), 0, &values(&["1"])).is_err());
        assert!(WriteSpec::new(holding(), None, 0, &[]).is_err());
        assert!(WriteSpec::new(coils(), Some("int"), 0, &values(&["1"])).is_err());
        assert!(WriteSpec::new(holding(), Some("byte"), 0, &values(&["256"])).is_err());
    }
}
