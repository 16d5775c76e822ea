use fugit::HertzU32;
use hal::{
    pac,
    rcc::{self, Enable, Reset, APB2},
};
use stm32f7xx_hal as hal;

pub struct Sampler {
    adc1: pac::ADC1,
}

impl Sampler {
    pub fn init(adc1: pac::ADC1, apb2: &mut APB2) -> Self {
        let mut this = Self { adc1 };
        this.init_adc1(apb2);
        this
    }

    /// Configure ADC1 for software-triggered single conversions of the PA3
    /// input at 10-bit resolution, interrupting on end-of-conversion
    fn init_adc1(&mut self, apb2: &mut APB2) {
        let adc1 = &self.adc1;
        <pac::ADC1 as Enable>::enable(apb2);
        // Converter off while reconfiguring
        adc1.cr2.modify(|_, w| w.adon().clear_bit());
        <pac::ADC1 as Reset>::reset(apb2);

        // One channel, one conversion per software trigger
        adc1.cr2.modify(|_, w| w.cont().single());
        adc1.cr1
            .modify(|_, w| w.scan().clear_bit().discen().clear_bit());

        // Setup ADC1 resolution to 10 bit, counts 0..=1023
        adc1.cr1.modify(|_, w| w.res().bits(0b01));

        // Longest sampling window on channel 3: the cadence leaves time to spare
        adc1.smpr2.modify(|_, w| unsafe { w.smp3().bits(0b111) });

        // Enable ADC end-of-conversion and overrun interrupts
        adc1.cr1.modify(|_, w| w.eocie().enabled().ovrie().enabled());

        // Convert channel 3, the PA3 analog input
        adc1.sqr3.modify(|_, w| unsafe { w.sq1().bits(3) });

        // Power up ADC1
        adc1.cr2.modify(|_, w| w.adon().enabled());
    }

    /// Kick off one conversion. Completion raises the ADC interrupt.
    pub fn start_conversion(&mut self) {
        self.adc1.cr2.modify(|_, w| w.swstart().set_bit());
    }

    /// Read out a completed conversion, if one is pending.
    pub fn take_sample(&mut self) -> Option<u16> {
        let sr = self.adc1.sr.read();

        if sr.ovr().bit_is_set() {
            // A conversion landed before the previous one was read out. That
            // sample is gone; clear the flag so the converter keeps going.
            defmt::warn!("converter overrun, sample lost");
            self.adc1.sr.modify(|_, w| w.ovr().clear_bit());
        }

        if sr.eoc().bit_is_set() {
            // Reading the data register clears the end-of-conversion flag
            let raw = self.adc1.dr.read().data().bits();
            self.adc1.sr.modify(|_, w| w.strt().not_started());
            Some(raw)
        } else {
            None
        }
    }
}

pub struct Ticker {
    tim2: pac::TIM2,
}

impl Ticker {
    /// Count clock after prescaling.
    const COUNT_HZ: u32 = 10_000;
    /// Continuous-mode sampling cadence: one conversion every 500 ms.
    pub const TICK_HZ: u32 = 2;

    pub fn init(tim2: pac::TIM2, apb1: &mut rcc::APB1, timclk: HertzU32) -> Self {
        let mut this = Self { tim2 };
        this.init_tim2(apb1, timclk);
        this
    }

    /// Setup TIM2 to raise its update interrupt once per sampling period
    fn init_tim2(&mut self, apb1: &mut rcc::APB1, timclk: HertzU32) {
        let tim2 = &self.tim2;
        <pac::TIM2 as Enable>::enable(apb1);
        <pac::TIM2 as Reset>::reset(apb1);

        // Prescale the timer clock down to the count clock
        assert_eq!(timclk.to_Hz() % Self::COUNT_HZ, 0);
        let prescale = timclk.to_Hz() / Self::COUNT_HZ;
        tim2.psc.write(|w| w.psc().bits((prescale - 1) as u16));
        tim2.arr.write(|w| w.arr().bits(Self::COUNT_HZ / Self::TICK_HZ - 1));

        // The prescaler only loads on an update event. Force one, then drop
        // the flag it raises so the first real tick comes a full period in.
        tim2.egr.write(|w| w.ug().set_bit());
        tim2.sr.modify(|_, w| w.uif().clear_bit());

        // Enable the update interrupt; the counter reloads itself
        tim2.dier.modify(|_, w| w.uie().enabled());

        // Run the counter
        tim2.cr1.modify(|_, w| w.cen().enabled());
    }

    /// Clear the tick flag. False when the interrupt fired without a pending
    /// update, in which case the tick must not be acted on.
    pub fn acknowledge(&mut self) -> bool {
        let pending = self.tim2.sr.read().uif().bit_is_set();
        if pending {
            self.tim2.sr.modify(|_, w| w.uif().clear_bit());
        }
        pending
    }
}
