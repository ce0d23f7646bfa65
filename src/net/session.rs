use crate::error::{Error, Result};
use crate::request::Category;
use crate::value::{NumberType, Value, WordOrder};

use async_trait::async_trait;

/// Typed access to one connected Modbus device.
///
/// Implementors provide the raw protocol requests. The typed operations are built on top of
/// them and each one issues exactly one request, honouring the session's `WordOrder`.
#[async_trait]
pub trait DeviceSession: Send {
    /// Open the transport. Returns `false` if the device is not reachable.
    async fn connect(&mut self) -> bool;

    /// Close the transport. Calling it on a closed session does nothing.
    async fn disconnect(&mut self);

    fn connected(&self) -> bool;

    fn word_order(&self) -> WordOrder;

    async fn read_bools(&mut self, category: Category, offset: u16, count: u16)
        -> Result<Vec<bool>>;

    async fn read_words(&mut self, category: Category, offset: u16, count: u16)
        -> Result<Vec<u16>>;

    async fn write_bools(&mut self, offset: u16, values: &[bool]) -> Result<()>;

    async fn write_words(&mut self, offset: u16, values: &[u16]) -> Result<()>;

    /// Read `count` bytes packed into consecutive registers.
    async fn read_bytes(&mut self, category: Category, offset: u16, count: u16) -> Result<Vec<u8>> {
        let words = self.read_words(category, offset, count.div_ceil(2)).await?;
        let mut bytes = self.word_order().stream(&words);
        bytes.truncate(count as usize);
        Ok(bytes)
    }

    /// Read the single register at `offset` as a bit vector.
    async fn read_bit_vector(&mut self, category: Category, offset: u16) -> Result<u16> {
        let words = self.read_words(category, offset, 1).await?;
        let bytes = self.word_order().stream(&words);
        match bytes.as_slice() {
            [hi, lo] => Ok(u16::from_be_bytes([*hi, *lo])),
            _ => Err(Error::Read(format!(
                "Expected one register, received {}",
                words.len()
            ))),
        }
    }

    async fn read_value(&mut self, category: Category, offset: u16, ty: NumberType) -> Result<Value> {
        let words = self.read_words(category, offset, ty.width()).await?;
        ty.decode(&words, self.word_order())
    }

    async fn read_values(
        &mut self,
        category: Category,
        offset: u16,
        ty: NumberType,
        count: u16,
    ) -> Result<Vec<Value>> {
        let total = u16::try_from(count as u32 * ty.width() as u32).map_err(|_| {
            Error::config(format!("Too many {:?} values requested ({})", ty, count))
        })?;
        let words = self.read_words(category, offset, total).await?;
        let order = self.word_order();
        words
            .chunks(ty.width() as usize)
            .map(|chunk| ty.decode(chunk, order))
            .collect()
    }

    /// Write text into consecutive holding registers, zero padded to whole registers.
    async fn write_text(&mut self, offset: u16, text: &str) -> Result<()> {
        let words = self.word_order().pack(text.as_bytes());
        self.write_words(offset, &words).await
    }

    /// Encode the given literals as `ty` and write them to consecutive holding registers.
    async fn write_values(&mut self, offset: u16, ty: NumberType, literals: &[String]) -> Result<()> {
        let order = self.word_order();
        let mut words = Vec::with_capacity(literals.len() * ty.width() as usize);
        for literal in literals {
            words.extend(ty.encode(literal, order)?);
        }
        self.write_words(offset, &words).await
    }
}

#[cfg(test)]
mod tests {
    use super::DeviceSession;
    use crate::net::fake::FakeSession;
    use crate::request::Category;
    use crate::value::{NumberType, Value, WordOrder};

    #[tokio::test]
    async fn ut_read_bytes_odd_count() {
        let mut session = FakeSession::with_holding(&[0x4142, 0x4344]);
        let bytes = session
            .read_bytes(Category::HoldingRegister, 0, 3)
            .await
            .unwrap();
        assert_eq!(bytes, b"ABC".to_vec());
        assert_eq!(session.calls.read_words, 1);
        assert_eq!(session.calls.read_word_counts, vec![2]);
    }

    #[tokio::test]
    async fn ut_read_bit_vector_swapped() {
        let mut session = FakeSession::with_holding(&[0x0100]);
        session.order = WordOrder {
            swap_bytes: true,
            swap_words: false,
        };
        let bits = session
            .read_bit_vector(Category::HoldingRegister, 0)
            .await
            .unwrap();
        assert_eq!(bits, 0x0001);
    }

    #[tokio::test]
    async fn ut_read_values() {
        let mut session = FakeSession::with_holding(&[0x0000, 0x0001, 0xFFFF, 0xFFFF]);
        let values = session
            .read_values(Category::HoldingRegister, 0, NumberType::Int, 2)
            .await
            .unwrap();
        assert_eq!(values, vec![Value::I32(1), Value::I32(-1)]);
        assert_eq!(session.calls.read_words, 1);
    }

    #[tokio::test]
    async fn ut_read_values_overflow() {
        let mut session = FakeSession::with_holding(&[]);
        assert!(session
            .read_values(Category::HoldingRegister, 0, NumberType::Double, 20000)
            .await
            .is_err());
        assert_eq!(session.calls.read_words, 0);
    }

    #[tokio::test]
    async fn ut_write_values() {
        let mut session = FakeSession::with_holding(&[0; 4]);
        session
            .write_values(
                1,
                NumberType::UInt,
                &["0x00010002".to_owned()],
            )
            .await
            .unwrap();
        assert_eq!(session.holding, vec![0, 1, 2, 0]);

        session.write_text(0, "Hey").await.unwrap();
        assert_eq!(session.holding, vec![0x4865, 0x7900, 2, 0]);
    }
}
