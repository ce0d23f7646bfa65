use crate::error::{Error, Result};

use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;
use tokio_serial::{DataBits, SerialPortBuilder, StopBits};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

impl Display for Parity {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Parity::None => fmt.write_str("NONE"),
            Parity::Even => fmt.write_str("EVEN"),
            Parity::Odd => fmt.write_str("ODD"),
        }
    }
}

impl From<Parity> for tokio_serial::Parity {
    fn from(p: Parity) -> Self {
        match p {
            Parity::None => tokio_serial::Parity::None,
            Parity::Even => tokio_serial::Parity::Even,
            Parity::Odd => tokio_serial::Parity::Odd,
        }
    }
}

/// Serial line parameters of a RTU session.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    pub path: String,
    pub baud_rate: u32,
    pub parity: Parity,
    pub data_bits: u8,
    pub stop_bits: u8,
    /// Additional attempts after a failed request
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: String::new(),
            baud_rate: 9600,
            parity: Parity::None,
            data_bits: 8,
            stop_bits: 1,
            retries: 3,
            retry_delay_ms: 100,
            timeout_ms: 1000,
        }
    }
}

impl Config {
    /// Apply the operator overrides on top of these values.
    pub fn merge(mut self, o: &Overrides) -> Self {
        if let Some(ref v) = o.path {
            self.path = v.clone();
        }
        if let Some(v) = o.baud_rate {
            self.baud_rate = v;
        }
        if let Some(v) = o.parity {
            self.parity = v;
        }
        if let Some(v) = o.data_bits {
            self.data_bits = v;
        }
        if let Some(v) = o.stop_bits {
            self.stop_bits = v;
        }
        if let Some(v) = o.retries {
            self.retries = v;
        }
        if let Some(v) = o.retry_delay_ms {
            self.retry_delay_ms = v;
        }
        if let Some(v) = o.timeout_ms {
            self.timeout_ms = v;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.is_empty() {
            return Err(Error::config("No serial port given."));
        }
        if self.baud_rate == 0 {
            return Err(Error::config("Baud rate must not be zero."));
        }
        self.data_bits()?;
        self.stop_bits()?;
        Ok(())
    }

    fn data_bits(&self) -> Result<DataBits> {
        match self.data_bits {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            v => Err(Error::config(format!("Invalid data bits {v} [values: 5, 6, 7, 8]"))),
        }
    }

    fn stop_bits(&self) -> Result<StopBits> {
        match self.stop_bits {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            v => Err(Error::config(format!("Invalid stop bits {v} [values: 1, 2]"))),
        }
    }

    pub fn builder(&self) -> Result<SerialPortBuilder> {
        Ok(tokio_serial::new(&self.path, self.baud_rate)
            .data_bits(self.data_bits()?)
            .stop_bits(self.stop_bits()?)
            .parity(self.parity.into())
            .timeout(self.timeout()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Serial line parameters given on the command line.
#[derive(Clone, Debug, Default, Args)]
pub struct Overrides {
    /// The device path to use for communication.
    #[arg(short = 'P', long)]
    pub path: Option<String>,

    /// The baud rate to use for the serial connection.
    #[arg(short, long)]
    pub baud_rate: Option<u32>,

    /// The parity bit
    #[arg(short, long)]
    pub parity: Option<Parity>,

    /// The data bits [values: 5, 6, 7, 8]
    #[arg(short, long)]
    pub data_bits: Option<u8>,

    /// The stop bits [values: 1, 2]
    #[arg(id = "stop-bits", short = 'S', long = "stop-bits")]
    pub stop_bits: Option<u8>,

    /// Number of retries of a failed request
    #[arg(short, long)]
    pub retries: Option<u32>,

    /// The delay in milliseconds between retries
    #[arg(id = "retry-delay", long = "retry-delay")]
    pub retry_delay_ms: Option<u64>,

    /// The timeout in milliseconds for each Modbus operation
    #[arg(id = "timeout", short, long = "timeout")]
    pub timeout_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::{Config, Overrides, Parity};

    #[test]
    fn ut_merge() {
        let base = Config {
            path: "/dev/ttyS0".to_owned(),
            baud_rate: 19200,
            ..Default::default()
        };
        let overrides = Overrides {
            path: Some("/dev/ttyUSB1".to_owned()),
            parity: Some(Parity::Even),
            ..Default::default()
        };
        let merged = base.merge(&overrides);
        assert_eq!(merged.path, "/dev/ttyUSB1");
        assert_eq!(merged.baud_rate, 19200);
        assert_eq!(merged.parity, Parity::Even);
        assert_eq!(merged.retries, 3);
    }

    #[test]
    fn ut_validate() {
        assert!(Config::default().validate().is_err());
        let config = Config {
            path: "/dev/ttyUSB0".to_owned(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        let config = Config {
            data_bits: 9,
            ..config
        };
        assert!(config.validate().is_err());
    }
}
