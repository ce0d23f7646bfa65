//! In-memory device used by the unit tests.

use crate::error::{Error, Result};
use crate::net::DeviceSession;
use crate::request::Category;
use crate::value::WordOrder;

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default, Clone)]
pub struct Calls {
    pub connect: usize,
    pub disconnect: usize,
    pub read_bools: usize,
    pub read_words: usize,
    pub read_word_counts: Vec<u16>,
    pub write_bools: usize,
    pub write_words: usize,
}

impl Calls {
    pub fn requests(&self) -> usize {
        self.read_bools + self.read_words + self.write_bools + self.write_words
    }
}

#[derive(Debug, Default)]
pub struct FakeSession {
    pub reachable: bool,
    pub connected: bool,
    pub order: WordOrder,
    pub coils: Vec<bool>,
    pub discrete_inputs: Vec<bool>,
    pub holding: Vec<u16>,
    pub input: Vec<u16>,
    pub calls: Calls,
    /// Simulated processing time of every read
    pub latency: Duration,
    /// Indices of reads (zero based) that fail
    pub failing_reads: Vec<usize>,
    /// Index of a read that panics
    pub panicking_read: Option<usize>,
    /// Start time of every read
    pub started: Vec<Instant>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            reachable: true,
            ..Default::default()
        }
    }

    pub fn with_holding(values: &[u16]) -> Self {
        Self {
            holding: values.to_vec(),
            connected: true,
            ..Self::new()
        }
    }

    pub fn with_input(values: &[u16]) -> Self {
        Self {
            input: values.to_vec(),
            connected: true,
            ..Self::new()
        }
    }

    pub fn with_coils(values: &[bool]) -> Self {
        Self {
            coils: values.to_vec(),
            connected: true,
            ..Self::new()
        }
    }

    async fn begin_read(&mut self) -> Result<()> {
        let index = self.started.len();
        self.started.push(Instant::now());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.panicking_read == Some(index) {
            panic!("device exploded on read {index}");
        }
        if self.failing_reads.contains(&index) {
            return Err(Error::Read(format!("simulated failure of read {index}")));
        }
        if !self.connected {
            return Err(Error::NotConnected);
        }
        Ok(())
    }
}

fn slice<T: Clone>(table: &[T], offset: u16, count: u16) -> Result<Vec<T>> {
    let (start, end) = (offset as usize, offset as usize + count as usize);
    table
        .get(start..end)
        .map(|s| s.to_vec())
        .ok_or_else(|| Error::Read(format!("Illegal data address [{start}, {end})")))
}

fn store<T: Clone>(table: &mut [T], offset: u16, values: &[T]) -> Result<()> {
    let start = offset as usize;
    match table.get_mut(start..start + values.len()) {
        Some(dst) => {
            dst.clone_from_slice(values);
            Ok(())
        }
        None => Err(Error::Write(format!("Illegal data address {start}"))),
    }
}

#[async_trait]
impl DeviceSession for FakeSession {
    async fn connect(&mut self) -> bool {
        self.calls.connect += 1;
        self.connected = self.reachable;
        self.connected
    }

    async fn disconnect(&mut self) {
        self.calls.disconnect += 1;
        self.connected = false;
    }

    fn connected(&self) -> bool {
        self.connected
    }

    fn word_order(&self) -> WordOrder {
        self.order
    }

    async fn read_bools(
        &mut self,
        category: Category,
        offset: u16,
        count: u16,
    ) -> Result<Vec<bool>> {
        self.calls.read_bools += 1;
        self.begin_read().await?;
        match category {
            Category::Coil => slice(&self.coils, offset, count),
            Category::DiscreteInput => slice(&self.discrete_inputs, offset, count),
            _ => Err(Error::Read(format!("{category} is not a bit table"))),
        }
    }

    async fn read_words(
        &mut self,
        category: Category,
        offset: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        self.calls.read_words += 1;
        self.calls.read_word_counts.push(count);
        self.begin_read().await?;
        match category {
            Category::HoldingRegister => slice(&self.holding, offset, count),
            Category::InputRegister => slice(&self.input, offset, count),
            _ => Err(Error::Read(format!("{category} is not a register table"))),
        }
    }

    async fn write_bools(&mut self, offset: u16, values: &[bool]) -> Result<()> {
        self.calls.write_bools += 1;
        store(&mut self.coils, offset, values)
    }

    async fn write_words(&mut self, offset: u16, values: &[u16]) -> Result<()> {
        self.calls.write_words += 1;
        store(&mut self.holding, offset, values)
    }
}
