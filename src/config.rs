//! Settings file and the merge of file values with command line overrides.

use crate::error::{Error, Result};
use crate::log::LoggingConfig;
use crate::net::{rtu, tcp, SessionConfig, Transport};
use crate::value::WordOrder;

use clap::Args;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use tokio_modbus::SlaveId;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MonitorSettings {
    /// Default poll period in seconds
    pub seconds: f64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self { seconds: 10.0 }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub slave: SlaveId,
    pub order: WordOrder,
    pub rtu: rtu::Config,
    pub tcp: tcp::Config,
    pub monitor: MonitorSettings,
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            slave: 1,
            order: WordOrder::default(),
            rtu: rtu::Config::default(),
            tcp: tcp::Config::default(),
            monitor: MonitorSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Session options shared by both transports.
#[derive(Clone, Debug, Default, Args)]
pub struct SessionFlags {
    /// The slave address of the device
    #[arg(short = 'a', long = "address")]
    pub slave: Option<SlaveId>,

    /// Swap the two bytes inside every register
    #[arg(long)]
    pub swap_bytes: bool,

    /// Put the least significant register of a value first
    #[arg(long)]
    pub swap_words: bool,
}

impl Settings {
    /// Read settings from a JSON or TOML file.
    pub fn read(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Settings(format!("Unable to read {}: {}", path, e)))?;
        Self::parse(&content).map_err(|e| Error::Settings(format!("{}: {}", path, e)))
    }

    fn parse(content: &str) -> std::result::Result<Self, String> {
        match serde_json::from_str(content) {
            Ok(settings) => Ok(settings),
            Err(json) => toml::from_str(content)
                .map_err(|toml| format!("neither valid JSON ({}) nor TOML ({})", json, toml.message())),
        }
    }

    pub fn period(&self, seconds: Option<f64>) -> Result<Duration> {
        let seconds = seconds.unwrap_or(self.monitor.seconds);
        Duration::try_from_secs_f64(seconds)
            .map_err(|_| Error::config(format!("Invalid poll period {} s.", seconds)))
    }

    pub fn rtu_session(&self, o: &rtu::Overrides, flags: &SessionFlags) -> Result<SessionConfig> {
        let config = self.rtu.clone().merge(o);
        config.validate()?;
        Ok(self.session(Transport::Rtu(config), flags))
    }

    pub fn tcp_session(&self, o: &tcp::Overrides, flags: &SessionFlags) -> Result<SessionConfig> {
        let config = self.tcp.clone().merge(o);
        config.validate()?;
        Ok(self.session(Transport::Tcp(config), flags))
    }

    fn session(&self, transport: Transport, flags: &SessionFlags) -> SessionConfig {
        SessionConfig {
            transport,
            slave: flags.slave.unwrap_or(self.slave),
            order: WordOrder {
                swap_bytes: flags.swap_bytes || self.order.swap_bytes,
                swap_words: flags.swap_words || self.order.swap_words,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionFlags, Settings};
    use crate::log::LogFormat;
    use crate::net::{rtu, tcp, Transport};

    #[test]
    fn ut_parse_json() {
        let settings = Settings::parse(
            r#"{ "slave": 3, "rtu": { "path": "/dev/ttyS1", "parity": "even" } }"#,
        )
        .unwrap();
        assert_eq!(settings.slave, 3);
        assert_eq!(settings.rtu.path, "/dev/ttyS1");
        assert_eq!(settings.rtu.parity, rtu::Parity::Even);
        assert_eq!(settings.rtu.baud_rate, 9600);
        assert_eq!(settings.tcp.port, 502);
    }

    #[test]
    fn ut_parse_toml() {
        let settings = Settings::parse(
            r#"
            [order]
            swap_words = true

            [monitor]
            seconds = 0.5

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();
        assert!(settings.order.swap_words);
        assert!(!settings.order.swap_bytes);
        assert_eq!(settings.monitor.seconds, 0.5);
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn ut_parse_invalid() {
        assert!(Settings::parse("slave = [").is_err());
    }

    #[test]
    fn ut_read_missing_file() {
        assert!(Settings::read("/nonexistent/modbus-poll.toml").is_err());
    }

    #[test]
    fn ut_period() {
        let settings = Settings::default();
        assert_eq!(settings.period(None).unwrap().as_secs(), 10);
        assert_eq!(settings.period(Some(0.25)).unwrap().as_millis(), 250);
        assert!(settings.period(Some(0.0)).unwrap().is_zero());
        assert!(settings.period(Some(-1.0)).unwrap_err().is_configuration());
    }

    #[test]
    fn ut_session_overrides() {
        let settings = Settings {
            slave: 4,
            ..Default::default()
        };
        let flags = SessionFlags {
            slave: Some(9),
            swap_bytes: true,
            ..Default::default()
        };
        let o = tcp::Overrides {
            port: Some(1502),
            ..Default::default()
        };
        let session = settings.tcp_session(&o, &flags).unwrap();
        assert_eq!(session.slave, 9);
        assert!(session.order.swap_bytes);
        assert!(!session.order.swap_words);
        match session.transport {
            Transport::Tcp(c) => {
                assert_eq!(c.port, 1502);
                assert_eq!(c.ip, "127.0.0.1");
            }
            _ => panic!("expected tcp"),
        }

        let session = settings
            .tcp_session(&tcp::Overrides::default(), &SessionFlags::default())
            .unwrap();
        assert_eq!(session.slave, 4);
    }

    #[test]
    fn ut_rtu_requires_path() {
        let settings = Settings::default();
        let err = settings
            .rtu_session(&rtu::Overrides::default(), &SessionFlags::default())
            .unwrap_err();
        assert!(err.is_configuration());

        let o = rtu::Overrides {
            path: Some("/dev/ttyUSB0".to_owned()),
            ..Default::default()
        };
        assert!(settings.rtu_session(&o, &SessionFlags::default()).is_ok());
    }
}
