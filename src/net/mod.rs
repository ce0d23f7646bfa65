pub mod modbus;
pub mod rtu;
pub mod session;
pub mod tcp;

#[cfg(test)]
pub mod fake;

pub use modbus::ModbusSession;
pub use session::DeviceSession;

use crate::value::WordOrder;

use std::fmt::Display;
use std::time::Duration;
use tokio_modbus::SlaveId;

#[derive(Clone, Debug, PartialEq)]
pub enum Transport {
    Rtu(rtu::Config),
    Tcp(tcp::Config),
}

/// Everything needed to open a session. Built once per invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    pub transport: Transport,
    pub slave: SlaveId,
    pub order: WordOrder,
}

impl SessionConfig {
    /// Timeout of a single request
    pub fn timeout(&self) -> Duration {
        match &self.transport {
            Transport::Rtu(c) => c.timeout(),
            Transport::Tcp(c) => c.timeout(),
        }
    }
}

impl Display for SessionConfig {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.transport {
            Transport::Rtu(c) => write!(
                fmt,
                "{} ({} {}{}{}, slave {})",
                c.path,
                c.baud_rate,
                c.data_bits,
                c.parity.to_string().chars().next().unwrap_or('N'),
                c.stop_bits,
                self.slave
            ),
            Transport::Tcp(c) => write!(fmt, "{}:{} (slave {})", c.ip, c.port, self.slave),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{rtu, tcp, SessionConfig, Transport};
    use crate::value::WordOrder;

    #[test]
    fn ut_display() {
        let config = SessionConfig {
            transport: Transport::Rtu(rtu::Config {
                path: "/dev/ttyUSB0".to_owned(),
                parity: rtu::Parity::Even,
                ..Default::default()
            }),
            slave: 7,
            order: WordOrder::default(),
        };
        assert_eq!(config.to_string(), "/dev/ttyUSB0 (9600 8E1, slave 7)");

        let config = SessionConfig {
            transport: Transport::Tcp(tcp::Config::default()),
            slave: 1,
            order: WordOrder::default(),
        };
        assert_eq!(config.to_string(), "127.0.0.1:502 (slave 1)");
        assert_eq!(config.timeout().as_millis(), 3000);
    }
}
