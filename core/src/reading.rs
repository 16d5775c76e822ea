//! Conversion results and their wire form: integer volts, one ASCII decimal
//! line per reading.

use core::fmt::Write;

/// Converter reference voltage, whole volts.
pub const REFERENCE_VOLTS: u32 = 3;
/// Count range of the 10-bit converter.
pub const FULL_SCALE: u32 = 1024;

/// Integer volts for a raw converter count, truncating toward zero.
pub fn raw_to_volts(raw: u16) -> u16 {
    (u32::from(raw) * REFERENCE_VOLTS / FULL_SCALE) as u16
}

/// The full host-facing frame for one reading: decimal digits and a bare
/// newline. Five digits plus the terminator bound the length for any u16.
pub fn report_line(volts: u16) -> heapless::String<6> {
    let mut line = heapless::String::new();
    writeln!(line, "{}", volts).unwrap();
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_count_is_zero_volts() {
        assert_eq!(raw_to_volts(0), 0);
    }

    #[test]
    fn full_scale_count_truncates_to_two_volts() {
        // floor(1023 * 3 / 1024) = 2, never 3
        assert_eq!(raw_to_volts(1023), 2);
    }

    #[test]
    fn truncation_boundaries() {
        assert_eq!(raw_to_volts(341), 0);
        assert_eq!(raw_to_volts(342), 1);
        assert_eq!(raw_to_volts(512), 1);
        assert_eq!(raw_to_volts(682), 1);
        assert_eq!(raw_to_volts(683), 2);
    }

    #[test]
    fn line_is_digits_then_bare_newline() {
        assert_eq!(report_line(0).as_bytes(), b"0\n");
        assert_eq!(report_line(2).as_bytes(), b"2\n");
        assert_eq!(report_line(191).as_bytes(), b"191\n");
    }

    #[test]
    fn any_u16_fits_the_line_capacity() {
        assert_eq!(raw_to_volts(u16::MAX), 191);
        assert_eq!(report_line(u16::MAX).as_str(), "65535\n");
    }
}
