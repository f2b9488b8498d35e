//! Buffered UART adapters
//!
//! The buffered UART fills a ring buffer from its interrupt handler; reads
//! here only take what is already in that buffer.

use embassy_rp::uart::{self, BufferedUartRx, BufferedUartTx};
use embedded_io::{Read, ReadReady, Write};

use pgnlink_hal::uart::{DataBits, Parity, StopBits, UartConfig, UartRx, UartTx};

/// Convert a link UART configuration to embassy-rp's
///
/// Returns `None` for settings the RP2040 UART cannot do (9 data bits).
pub fn rp_uart_config(config: &UartConfig) -> Option<uart::Config> {
    let mut rp = uart::Config::default();
    rp.baudrate = config.baudrate;
    rp.data_bits = match config.data_bits {
        DataBits::Seven => uart::DataBits::DataBits7,
        DataBits::Eight => uart::DataBits::DataBits8,
        DataBits::Nine => return None,
    };
    rp.parity = match config.parity {
        Parity::None => uart::Parity::ParityNone,
        Parity::Even => uart::Parity::ParityEven,
        Parity::Odd => uart::Parity::ParityOdd,
    };
    rp.stop_bits = match config.stop_bits {
        StopBits::One => uart::StopBits::STOP1,
        StopBits::Two => uart::StopBits::STOP2,
    };
    Some(rp)
}

/// Receive half of the bridge UART
pub struct BridgeUartRx {
    rx: BufferedUartRx,
}

impl BridgeUartRx {
    /// Wrap the receive half of a split buffered UART
    pub fn new(rx: BufferedUartRx) -> Self {
        Self { rx }
    }
}

impl UartRx for BridgeUartRx {
    type Error = uart::Error;

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() || !ReadReady::read_ready(&mut self.rx)? {
            return Ok(0);
        }
        Read::read(&mut self.rx, buf)
    }
}

/// Transmit half of the bridge UART
pub struct BridgeUartTx {
    tx: BufferedUartTx,
}

impl BridgeUartTx {
    /// Wrap the transmit half of a split buffered UART
    pub fn new(tx: BufferedUartTx) -> Self {
        Self { tx }
    }
}

impl UartTx for BridgeUartTx {
    type Error = uart::Error;

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        Write::write_all(&mut self.tx, data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Write::flush(&mut self.tx)
    }
}
