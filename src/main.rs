use anyhow::{Context, bail};
use clap::Parser;
use inquire::Select;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use sms_nobreak::{delay::StdDelay, ups::QueryConfig, ups::Ups};
use tracing_subscriber::EnvFilter;

const DEFAULT_TTY: &str = "/dev/ttyUSB0";
const DEFAULT_BAUD_RATE: u32 = 2400;
// Short so a silent line reads as "nothing yet" and the poll loop keeps pacing itself.
const SERIAL_TIMEOUT_MS: u64 = 5;
const LOG_ENV: &str = "NOBREAK_LOG";

/// Query and control SMS UPS units over a serial port.
#[derive(Parser, Debug)]
#[command(name = "nobreak", version)]
struct Cli {
    /// Start a 10 second battery test.
    #[arg(short = 's', long, conflicts_with = "abort_test")]
    start_test: bool,

    /// Abort a running battery test.
    #[arg(short = 'a', long)]
    abort_test: bool,

    /// Switch the buzzer ON/OFF.
    #[arg(short = 'b', long)]
    buzzer: bool,

    /// Path to the serial device (e.g. /dev/ttyUSB0).
    #[arg(short = 't', long, env = "NOBREAK_TTY", default_value = DEFAULT_TTY)]
    tty: String,

    /// Choose the serial device from a list instead of using --tty.
    #[arg(long)]
    pick: bool,

    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Give up on a reply after this many reads. Waits forever if unset.
    #[arg(long)]
    max_polls: Option<u32>,

    /// Also print the model name and firmware version.
    #[arg(long)]
    info: bool,

    /// Log protocol traffic to stderr.
    #[arg(short, long)]
    verbose: bool,
}

pub struct PortWrapper(Box<dyn SerialPort>);

#[derive(Debug)]
pub struct IoError(std::io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            // No data before the port timeout, not a failure.
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                embedded_io::ErrorKind::TimedOut
            }
            std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            std::io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            std::io::ErrorKind::Unsupported => embedded_io::ErrorKind::Unsupported,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for PortWrapper {
    type Error = IoError;
}

impl embedded_io::Read for PortWrapper {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        std::io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::Write for PortWrapper {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    // `NOBREAK_LOG` first, then `RUST_LOG`, then the verbosity flag.
    let filter = std::env::var(LOG_ENV)
        .ok()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn pick_port() -> anyhow::Result<String> {
    let ports = serialport::available_ports().context("Failed to enumerate serial ports")?;
    if ports.is_empty() {
        bail!("No serial ports found!");
    }
    let port_names: Vec<String> = ports.into_iter().map(|p| p.port_name).collect();

    Select::new("Select the UPS serial port:", port_names)
        .prompt()
        .context("Failed to select port")
}

fn open_port(path: &str, baud: u32) -> anyhow::Result<PortWrapper> {
    let port = serialport::new(path, baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(std::time::Duration::from_millis(SERIAL_TIMEOUT_MS))
        .open()
        .with_context(|| format!("Unable to open {path}, device not found"))?;
    Ok(PortWrapper(port))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let tty = if cli.pick { pick_port()? } else { cli.tty.clone() };
    tracing::debug!(%tty, baud = cli.baud, "opening serial port");
    let port = open_port(&tty, cli.baud)?;

    let config = QueryConfig {
        poll_limit: cli.max_polls,
        ..QueryConfig::default()
    };
    let mut ups = Ups::with_config(port, StdDelay, config);

    if cli.buzzer {
        ups.switch_buzzer()?;
    }
    if cli.start_test {
        ups.start_test()?;
    }
    if cli.abort_test {
        ups.abort_test()?;
    }

    if cli.info {
        let info = ups.query_device_info()?;
        println!("{:>20}:{}", "Model", info.model);
        println!("{:>20}:{}", "Firmware", info.firmware);
    }

    let status = ups.query_status()?;
    drop(ups);

    print!("{status}");
    Ok(())
}
