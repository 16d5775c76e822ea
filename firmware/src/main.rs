#![no_main]
#![no_std]

use defmt::{unwrap, Debug2Format};
use defmt_rtt as _;
use panic_probe as _;
use rtic::app;
use rtic_monotonics::systick::{ExtU64, Systick};
use rtic_sync::{
    channel::{Receiver, Sender},
    make_channel,
};
use stm32f7xx_hal::{
    gpio::{Output, Pin},
    prelude::*,
};

use voltstream_core::{reading, Mode};
use voltstream_firmware::{
    sampling::{Sampler, Ticker},
    serial_link::{self, SerialRx, SerialTx},
};

#[app(device = stm32f7xx_hal::pac, dispatchers = [CAN1_RX0])]
mod app {
    use super::*;

    #[shared]
    struct Shared {
        mode: Mode,
        sampler: Sampler,
    }

    #[local]
    struct Local {
        link_rx: SerialRx,
        wake_sender: Sender<'static, (), 1>,
        ticker: Ticker,
        reading_sender: Sender<'static, u16, 8>,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local) {
        let p = cx.device;

        // Setup clocks
        let mut rcc = p.RCC.constrain();
        let clocks = rcc.cfgr.sysclk(216.MHz()).hclk(216.MHz()).freeze();
        defmt::println!("Clocks: {:?}", Debug2Format(&clocks));

        // Systick drives the heartbeat delays
        let systick_token = rtic_monotonics::create_systick_token!();
        Systick::start(cx.core.SYST, clocks.sysclk().to_Hz(), systick_token);

        // Setup GPIO
        let (led_pin, tx_pin, rx_pin) = {
            let gpioa = p.GPIOA.split();
            let gpiob = p.GPIOB.split();
            let gpiod = p.GPIOD.split();

            let _probe_in = gpioa.pa3.into_analog();
            let led_pin = gpiob.pb7.into_push_pull_output();

            (
                led_pin,
                gpiod.pd8.into_alternate(),
                gpiod.pd9.into_alternate(),
            )
        };

        let (link_tx, link_rx) = serial_link::init(p.USART3, (tx_pin, rx_pin), &clocks);
        let sampler = Sampler::init(p.ADC1, &mut rcc.apb2);
        let ticker = Ticker::init(p.TIM2, &mut rcc.apb1, clocks.timclk1());

        defmt::info!(
            "probe on PA3, host link at {=u32} baud, {=u32} Hz continuous cadence",
            serial_link::BAUD,
            Ticker::TICK_HZ,
        );

        // Host commands wake the dispatcher; completed readings queue up for
        // the report task to drain
        let (wake_sender, wake_receiver) = make_channel!((), 1);
        let (reading_sender, reading_receiver) = make_channel!(u16, 8);

        // Start tasks
        {
            blinky::spawn(led_pin).unwrap_or_else(|_| defmt::panic!("Failed to start blinky"));

            dispatch::spawn(wake_receiver)
                .unwrap_or_else(|_| defmt::panic!("Failed to start dispatch"));

            report::spawn(reading_receiver, link_tx)
                .unwrap_or_else(|_| defmt::panic!("Failed to start report"));
        }

        (
            Shared {
                mode: Mode::default(),
                sampler,
            },
            Local {
                link_rx,
                wake_sender,
                ticker,
                reading_sender,
            },
        )
    }

    /// Host command bytes arrive on the receive interrupt
    #[task(binds = USART3, shared = [mode], local = [link_rx, wake_sender], priority = 2)]
    fn on_host_byte(mut cx: on_host_byte::Context) {
        while let Some(byte) = cx.local.link_rx.read() {
            if cx.shared.mode.lock(|mode| mode.apply_command(byte)) {
                defmt::debug!("host command {=u8}", byte);
                // A full slot just means a wake is already pending
                let _ = cx.local.wake_sender.try_send(());
            } else {
                defmt::trace!("ignoring byte {=u8:x}", byte);
            }
        }
    }

    /// Sampling cadence: in continuous mode every tick starts a conversion
    #[task(binds = TIM2, shared = [mode, sampler], local = [ticker], priority = 1)]
    fn on_tick(mut cx: on_tick::Context) {
        if !cx.local.ticker.acknowledge() {
            return;
        }

        let sampler = &mut cx.shared.sampler;
        cx.shared.mode.lock(|mode| {
            if mode.is_continuous() {
                sampler.lock(|sampler| sampler.start_conversion());
            }
        });
    }

    /// A conversion finished: convert counts to volts and queue the reading
    #[task(binds = ADC, shared = [sampler], local = [reading_sender], priority = 2)]
    fn on_conversion_done(mut cx: on_conversion_done::Context) {
        if let Some(raw) = cx.shared.sampler.lock(|sampler| sampler.take_sample()) {
            let volts = reading::raw_to_volts(raw);
            if cx.local.reading_sender.try_send(volts).is_err() {
                defmt::warn!("report queue full, dropping {=u16} V", volts);
            }
        }
    }

    /// Runs the single-shot trigger whenever the receive handler signals a
    /// mode change
    #[task(shared = [mode, sampler], priority = 1)]
    async fn dispatch(mut cx: dispatch::Context, mut wake: Receiver<'static, (), 1>) {
        let mode = &mut cx.shared.mode;
        let sampler = &mut cx.shared.sampler;

        loop {
            unwrap!(wake.recv().await.ok());

            mode.lock(|mode| {
                if mode.take_single_request() {
                    sampler.lock(|sampler| sampler.start_conversion());
                }
            });
        }
    }

    /// Drains the reading queue in order. Lowest priority: this is the only
    /// place that busy-waits on the transmitter.
    #[task(priority = 0)]
    async fn report(
        _cx: report::Context,
        mut readings: Receiver<'static, u16, 8>,
        mut link_tx: SerialTx,
    ) {
        loop {
            let volts = unwrap!(readings.recv().await.ok());
            link_tx.send_line(volts);
        }
    }

    /// Heartbeat
    ///
    /// Blinks the Nucleo's blue user LED to show the firmware is alive
    #[task(priority = 0)]
    async fn blinky(_cx: blinky::Context, mut led: Pin<'B', 7, Output>) {
        loop {
            Systick::delay(500u64.millis()).await;
            led.set_high();
            Systick::delay(500u64.millis()).await;
            led.set_low();
        }
    }
}
