use crate::config::SessionFlags;
use crate::net::{rtu, tcp};
use crate::request::{RequestArgs, Selection};

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Read, write and monitor Modbus devices over RTU or TCP.", long_about = None)]
pub struct ArgParser {
    /// Path to a JSON or TOML settings file providing defaults.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Log filter, e.g. `debug`. `RUST_LOG` takes precedence.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Use a serial RTU connection
    Rtu {
        #[command(flatten)]
        config: rtu::Overrides,

        #[command(flatten)]
        session: SessionFlags,

        #[command(subcommand)]
        action: Action,
    },

    /// Use a TCP connection
    Tcp {
        #[command(flatten)]
        config: tcp::Overrides,

        #[command(flatten)]
        session: SessionFlags,

        #[command(subcommand)]
        action: Action,
    },
}

#[derive(Subcommand, Debug)]
pub enum Action {
    /// Check whether the device can be reached
    Ping,

    /// Read once and print the values
    #[command(disable_help_flag = true)]
    Read {
        #[command(flatten)]
        request: RequestFlags,

        #[arg(long, action = clap::ArgAction::Help)]
        help: Option<bool>,
    },

    /// Write values to coils or holding registers
    #[command(disable_help_flag = true)]
    Write {
        #[command(flatten)]
        target: TargetFlags,

        /// The values to write
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        values: Vec<String>,

        #[arg(long, action = clap::ArgAction::Help)]
        help: Option<bool>,
    },

    /// Read periodically until interrupted
    #[command(disable_help_flag = true)]
    Monitor {
        #[command(flatten)]
        request: RequestFlags,

        /// Number of reads, 0 polls until interrupted
        #[arg(short, long, default_value_t = 0)]
        repeat: u64,

        /// Seconds between the start of two reads
        #[arg(short, long)]
        seconds: Option<f64>,

        #[arg(long, action = clap::ArgAction::Help)]
        help: Option<bool>,
    },
}

/// Object table, data type and start offset.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetFlags {
    /// Coils
    #[arg(short = 'c', long = "coil")]
    pub coil: bool,

    /// Discrete inputs
    #[arg(short = 'd', long = "discrete-input")]
    pub discrete_input: bool,

    /// Holding registers
    #[arg(short = 'h', long = "holding-register")]
    pub holding_register: bool,

    /// Input registers
    #[arg(short = 'i', long = "input-register")]
    pub input_register: bool,

    /// Address of the first item
    #[arg(short, long, default_value_t = 0)]
    pub offset: u16,

    /// Data type [values: bits, string, hexstring, byte, short, ushort, int, uint, float, double, long, ulong]
    #[arg(short = 't', long = "type")]
    pub data_type: Option<String>,
}

impl TargetFlags {
    pub fn selection(&self) -> Selection {
        Selection {
            coil: self.coil,
            discrete_input: self.discrete_input,
            holding_register: self.holding_register,
            input_register: self.input_register,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct RequestFlags {
    #[command(flatten)]
    pub target: TargetFlags,

    /// Number of items to read
    #[arg(short = 'n', long = "number", default_value_t = 1)]
    pub count: u16,

    /// Render values as hexadecimal
    #[arg(short = 'x', long)]
    pub hex: bool,
}

impl From<&RequestFlags> for RequestArgs {
    fn from(f: &RequestFlags) -> Self {
        RequestArgs {
            selection: f.target.selection(),
            data_type: f.target.data_type.clone(),
            offset: f.target.offset,
            count: f.count,
            hex: f.hex,
        }
    }
}
