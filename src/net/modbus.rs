use crate::error::{Error, Result};
use crate::net::{DeviceSession, SessionConfig, Transport};
use crate::request::Category;
use crate::value::WordOrder;

use async_trait::async_trait;
use std::borrow::Cow;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_modbus::client::{rtu, tcp, Client, Context};
use tokio_modbus::{Request, Response, Slave};
use tokio_serial::SerialStream;
use tracing::{debug, info, warn};

/// `DeviceSession` backed by a tokio-modbus client context.
pub struct ModbusSession {
    config: SessionConfig,
    context: Option<Context>,
}

impl ModbusSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            context: None,
        }
    }

    async fn open(config: &SessionConfig) -> Result<Context> {
        let slave = Slave(config.slave);
        match &config.transport {
            Transport::Rtu(config) => {
                let builder = config.builder()?;
                let stream = SerialStream::open(&builder).map_err(|e| {
                    Error::Connection(format!("Unable to open {}: {}", config.path, e))
                })?;
                Ok(rtu::attach_slave(stream, slave))
            }
            Transport::Tcp(config) => {
                let addr = config.resolve().await?;
                timeout(config.timeout(), tcp::connect_slave(addr, slave))
                    .await
                    .map_err(|_| Error::TimedOut(config.timeout_ms))?
                    .map_err(|e| Error::Connection(format!("Unable to connect to {addr}: {e}")))
            }
        }
    }

    /// Attempts and pause between attempts of a single request.
    fn attempts(&self) -> (u32, Duration) {
        match &self.config.transport {
            Transport::Rtu(config) => (config.retries + 1, config.retry_delay()),
            Transport::Tcp(_) => (1, Duration::ZERO),
        }
    }

    async fn call(&mut self, request: Request<'static>) -> Result<Response> {
        let (attempts, delay) = self.attempts();
        let limit = self.config.timeout();
        let limit_ms = limit.as_millis() as u64;
        let context = self.context.as_mut().ok_or(Error::NotConnected)?;

        let mut last = Error::NotConnected;
        for attempt in 1..=attempts {
            if attempt > 1 {
                sleep(delay).await;
            }
            last = match timeout(limit, context.call(request.clone())).await {
                Ok(Ok(Ok(response))) => return Ok(response),
                Ok(Ok(Err(exception))) => {
                    // The device answered, repeating the request will not change the answer
                    return Err(Error::Read(format!("Device responded with {:?}", exception)));
                }
                Ok(Err(e)) => Error::Read(format!("{e}")),
                Err(_) => Error::TimedOut(limit_ms),
            };
            debug!("Request {:?} failed ({}/{}). [{}]", request, attempt, attempts, last);
        }
        Err(last)
    }
}

#[async_trait]
impl DeviceSession for ModbusSession {
    async fn connect(&mut self) -> bool {
        if self.connected() {
            return true;
        }
        match Self::open(&self.config).await {
            Ok(context) => {
                info!("Connected to {}.", self.config);
                self.context = Some(context);
                true
            }
            Err(e) => {
                warn!("Failed to connect to {}. [{}]", self.config, e);
                false
            }
        }
    }

    async fn disconnect(&mut self) {
        if let Some(mut context) = self.context.take() {
            if let Err(e) = context.disconnect().await {
                debug!("Closing the transport reported an error. [{}]", e);
            }
            info!("Disconnected from {}.", self.config);
        }
    }

    fn connected(&self) -> bool {
        self.context.is_some()
    }

    fn word_order(&self) -> WordOrder {
        self.config.order
    }

    async fn read_bools(
        &mut self,
        category: Category,
        offset: u16,
        count: u16,
    ) -> Result<Vec<bool>> {
        let request = match category {
            Category::Coil => Request::ReadCoils(offset, count),
            Category::DiscreteInput => Request::ReadDiscreteInputs(offset, count),
            _ => return Err(Error::config(format!("Cannot read {category}s as bits"))),
        };
        match self.call(request).await? {
            Response::ReadCoils(mut v) | Response::ReadDiscreteInputs(mut v) => {
                // Responses are padded to whole bytes
                v.truncate(count as usize);
                Ok(v)
            }
            other => Err(Error::Read(format!("Unexpected response {:?}", other))),
        }
    }

    async fn read_words(
        &mut self,
        category: Category,
        offset: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        let request = match category {
            Category::HoldingRegister => Request::ReadHoldingRegisters(offset, count),
            Category::InputRegister => Request::ReadInputRegisters(offset, count),
            _ => return Err(Error::config(format!("Cannot read {category}s as registers"))),
        };
        match self.call(request).await? {
            Response::ReadHoldingRegisters(v) | Response::ReadInputRegisters(v) => Ok(v),
            other => Err(Error::Read(format!("Unexpected response {:?}", other))),
        }
    }

    async fn write_bools(&mut self, offset: u16, values: &[bool]) -> Result<()> {
        let request = match values {
            [value] => Request::WriteSingleCoil(offset, *value),
            _ => Request::WriteMultipleCoils(offset, Cow::Owned(values.to_vec())),
        };
        self.call(request).await.map(|_| ()).map_err(into_write)
    }

    async fn write_words(&mut self, offset: u16, values: &[u16]) -> Result<()> {
        let request = match values {
            [value] => Request::WriteSingleRegister(offset, *value),
            _ => Request::WriteMultipleRegisters(offset, Cow::Owned(values.to_vec())),
        };
        self.call(request).await.map(|_| ()).map_err(into_write)
    }
}

fn into_write(e: Error) -> Error {
    match e {
        Error::Read(msg) => Error::Write(msg),
        e => e,
    }
}
