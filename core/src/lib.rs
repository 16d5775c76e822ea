#![cfg_attr(not(test), no_std)]

pub mod reading;

/// Host command byte that arms a single conversion.
pub const CMD_SINGLE_SHOT: u8 = b'S';
/// Host command byte that switches to continuous sampling.
pub const CMD_CONTINUOUS: u8 = b'C';

/// Sampling policy selected by the host.
///
/// Written from the serial receive path, consumed by the dispatch and tick
/// paths. `SingleArmed` means exactly one conversion is owed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// No conversion owed, periodic sampling off.
    #[default]
    Idle,
    /// One conversion owed to the host.
    SingleArmed,
    /// Convert on every timer tick.
    Continuous,
}

impl Mode {
    /// Applies one received command byte and reports whether it was a
    /// recognized command. Unrecognized bytes leave the mode untouched.
    pub fn apply_command(&mut self, byte: u8) -> bool {
        match byte {
            CMD_SINGLE_SHOT => {
                *self = Mode::SingleArmed;
                true
            }
            CMD_CONTINUOUS => {
                *self = Mode::Continuous;
                true
            }
            _ => false,
        }
    }

    /// Takes the armed single-shot request, disarming it. True at most once
    /// per received `'S'`.
    pub fn take_single_request(&mut self) -> bool {
        if *self == Mode::SingleArmed {
            *self = Mode::Idle;
            true
        } else {
            false
        }
    }

    /// Whether every timer tick should start a conversion.
    pub fn is_continuous(&self) -> bool {
        *self == Mode::Continuous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [Mode; 3] = [Mode::Idle, Mode::SingleArmed, Mode::Continuous];

    #[test]
    fn boots_idle() {
        assert_eq!(Mode::default(), Mode::Idle);
        assert!(!Mode::default().is_continuous());
    }

    #[test]
    fn command_s_arms_single_from_any_state() {
        for start in ALL_STATES {
            let mut mode = start;
            assert!(mode.apply_command(b'S'));
            assert_eq!(mode, Mode::SingleArmed);
            assert!(!mode.is_continuous());
        }
    }

    #[test]
    fn command_c_enables_continuous_from_any_state() {
        for start in ALL_STATES {
            let mut mode = start;
            assert!(mode.apply_command(b'C'));
            assert_eq!(mode, Mode::Continuous);
            assert!(mode.is_continuous());
        }
    }

    #[test]
    fn unrecognized_bytes_leave_mode_untouched() {
        for byte in 0..=u8::MAX {
            if byte == CMD_SINGLE_SHOT || byte == CMD_CONTINUOUS {
                continue;
            }
            for start in ALL_STATES {
                let mut mode = start;
                assert!(!mode.apply_command(byte));
                assert_eq!(mode, start);
            }
        }
    }

    #[test]
    fn single_request_taken_at_most_once() {
        let mut mode = Mode::Idle;
        mode.apply_command(b'S');
        assert!(mode.take_single_request());
        assert!(!mode.take_single_request());
        assert_eq!(mode, Mode::Idle);
    }

    #[test]
    fn take_is_a_no_op_when_nothing_is_armed() {
        let mut mode = Mode::Idle;
        assert!(!mode.take_single_request());
        assert_eq!(mode, Mode::Idle);

        let mut mode = Mode::Continuous;
        assert!(!mode.take_single_request());
        assert_eq!(mode, Mode::Continuous);
    }

    #[test]
    fn latest_command_wins_when_switching() {
        let mut mode = Mode::default();

        mode.apply_command(b'S');
        mode.apply_command(b'C');
        assert!(!mode.take_single_request());
        assert!(mode.is_continuous());

        mode.apply_command(b'S');
        assert!(!mode.is_continuous());
        assert!(mode.take_single_request());
        assert_eq!(mode, Mode::Idle);
    }

    // The paths the interrupt handlers drive, minus the hardware: command
    // byte in, mode consulted, reading converted and encoded.

    #[test]
    fn single_shot_produces_exactly_one_line() {
        let mut mode = Mode::default();
        let mut wire = Vec::new();

        assert!(mode.apply_command(b'S'));
        if mode.take_single_request() {
            let volts = reading::raw_to_volts(341);
            wire.extend_from_slice(reading::report_line(volts).as_bytes());
        }

        // Later dispatch wakes and ticks stay quiet until the next 'S'.
        for _ in 0..10 {
            assert!(!mode.take_single_request());
            assert!(!mode.is_continuous());
        }

        assert_eq!(wire, b"0\n");
    }

    #[test]
    fn continuous_mode_produces_one_line_per_tick() {
        let mut mode = Mode::default();
        let mut wire = Vec::new();

        assert!(mode.apply_command(b'C'));
        for raw in [0_u16, 341, 512, 1023] {
            if mode.is_continuous() {
                let volts = reading::raw_to_volts(raw);
                wire.extend_from_slice(reading::report_line(volts).as_bytes());
            }
        }

        assert_eq!(wire, b"0\n0\n1\n2\n");
    }
}
