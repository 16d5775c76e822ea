use hal::{
    gpio::{Alternate, Pin},
    pac,
    prelude::*,
    rcc::Clocks,
    serial::{self, Serial},
};
use stm32f7xx_hal as hal;

use voltstream_core::reading;

/// Host link baud rate.
pub const BAUD: u32 = 9_600;

/// USART3 on PD8/PD9 is wired to the Nucleo's on-board ST-LINK serial port.
pub type TxPin = Pin<'D', 8, Alternate<7>>;
pub type RxPin = Pin<'D', 9, Alternate<7>>;

pub struct SerialTx {
    tx: serial::Tx<pac::USART3>,
}

pub struct SerialRx {
    rx: serial::Rx<pac::USART3>,
}

/// Bring up the host link and split it into its two halves. The receiver
/// interrupts on every byte; the transmitter is driven by busy-waiting.
pub fn init(usart: pac::USART3, pins: (TxPin, RxPin), clocks: &Clocks) -> (SerialTx, SerialRx) {
    let mut serial = Serial::new(
        usart,
        pins,
        clocks,
        serial::Config {
            baud_rate: BAUD.bps(),
            ..Default::default()
        },
    );
    serial.listen(serial::Event::Rxne);

    let (tx, rx) = serial.split();
    (SerialTx { tx }, SerialRx { rx })
}

impl SerialTx {
    /// Busy-wait until the transmit buffer frees up, then queue `byte`.
    pub fn send_byte(&mut self, byte: u8) {
        while self.tx.write(byte).is_err() {}
    }

    /// Send one reading the way the host expects it: decimal digits, then a
    /// bare newline.
    pub fn send_line(&mut self, volts: u16) {
        for &byte in reading::report_line(volts).as_bytes() {
            self.send_byte(byte);
        }
    }
}

impl SerialRx {
    /// Pull the next received byte, if any arrived.
    pub fn read(&mut self) -> Option<u8> {
        match self.rx.read() {
            Ok(byte) => Some(byte),
            Err(nb::Error::WouldBlock) => None,
            Err(nb::Error::Other(_)) => {
                defmt::warn!("receiver fault, dropping byte");
                // Fault flags latch until acknowledged and would re-raise
                // the receive interrupt forever
                let usart = unsafe { &*pac::USART3::ptr() };
                usart.icr.write(|w| {
                    w.orecf()
                        .set_bit()
                        .fecf()
                        .set_bit()
                        .ncf()
                        .set_bit()
                        .pecf()
                        .set_bit()
                });
                None
            }
        }
    }
}
