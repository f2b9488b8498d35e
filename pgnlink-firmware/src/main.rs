//! pgnlink - PGN serial bridge firmware
//!
//! Runs the bridge end of the link on an RP2040: announces itself over
//! UART0 until the host answers with a valid frame, then reports status once
//! a second and forwards every routed frame to the application task.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Uart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use pgnlink_hal::UartConfig;
use pgnlink_hal_rp2040::{rp_uart_config, BridgeUartRx, BridgeUartTx};

mod channels;
mod config;
mod handlers;
mod tasks;

/// Embedded link configuration (compiled into firmware)
/// Edit link.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../link.toml");

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// UART ring buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 512]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("pgnlink firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let link_config = config::load(EMBEDDED_CONFIG);

    let uart_settings = UartConfig::default();
    let Some(uart_config) = rp_uart_config(&uart_settings) else {
        error!("Unsupported UART settings");
        return;
    };

    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 512]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();
    info!("UART0 initialized at {} baud", uart_settings.baudrate);

    spawner
        .spawn(tasks::link_task(
            BridgeUartRx::new(rx),
            BridgeUartTx::new(tx),
            link_config,
        ))
        .unwrap();
    spawner.spawn(tasks::app_task()).unwrap();

    info!("All tasks spawned");
}
