use crate::dbc::types::{errors::DbcError, signal::Endianness};

/// Elementary step for moving a bit field between a payload and a raw value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Step {
    /// Source byte index.
    pub(crate) byte_index: usize,
    /// LSB within the source byte (0..7).
    pub(crate) src_lsb: u8,
    /// Number of bits to take (1..8).
    pub(crate) width: u8,
    /// Destination LSB in the raw value (LSB-first).
    pub(crate) dst_lsb: u16,
}

impl Step {
    #[inline]
    pub(crate) fn mask(&self) -> u8 {
        if self.width == 8 {
            0xFF
        } else {
            ((1u16 << self.width) - 1) as u8
        }
    }
}

/// Precomputes the byte-wise steps covering a signal.
///
/// - Intel (`@1`): `start_bit` is the LSB; bits ascend through the frame.
/// - Motorola (`@0`): `start_bit` is the MSB; bits descend within a byte and
///   continue at bit 7 of the next byte.
pub(crate) fn compile_steps(start_bit: u16, length: u16, endianness: Endianness) -> Vec<Step> {
    let n_steps = (length as usize).div_ceil(8) + 1;
    let mut steps = Vec::with_capacity(n_steps);
    match endianness {
        Endianness::Intel => {
            let mut remaining = length;
            let mut bit = start_bit as usize;
            let mut dst: u16 = 0;
            while remaining > 0 {
                let bit_off = (bit % 8) as u8;
                let take = remaining.min(8 - bit_off as u16) as u8;
                steps.push(Step {
                    byte_index: bit / 8,
                    src_lsb: bit_off,
                    width: take,
                    dst_lsb: dst,
                });
                bit += take as usize;
                dst += take as u16;
                remaining -= take as u16;
            }
        }
        Endianness::Motorola => {
            let mut remaining = length;
            let mut byte = start_bit as usize / 8;
            let mut msb = (start_bit % 8) as u8;
            while remaining > 0 {
                let take = (msb as u16 + 1).min(remaining) as u8;
                remaining -= take as u16;
                steps.push(Step {
                    byte_index: byte,
                    src_lsb: msb + 1 - take,
                    width: take,
                    dst_lsb: remaining,
                });
                byte += 1;
                msb = 7;
            }
        }
    }
    steps
}

/// Number of payload bytes the steps touch.
pub(crate) fn bytes_spanned(steps: &[Step]) -> usize {
    steps.iter().map(|s| s.byte_index + 1).max().unwrap_or(0)
}

/// Verify that a compiled signal fits within a payload of `byte_count` bytes.
pub(crate) fn check_signal_fits(signal: &str, steps: &[Step], byte_count: usize) -> Result<(), DbcError> {
    let needed = bytes_spanned(steps);
    if needed <= byte_count {
        Ok(())
    } else {
        Err(DbcError::InvalidLayout {
            signal: signal.to_string(),
            details: format!(
                "needs {} bytes but the payload holds {} (total_bits={})",
                needed,
                byte_count,
                byte_count * 8
            ),
        })
    }
}

/// True when the two step lists claim at least one common payload bit.
pub(crate) fn steps_overlap(a: &[Step], b: &[Step]) -> bool {
    a.iter().any(|x| {
        b.iter().any(|y| {
            x.byte_index == y.byte_index
                && (((x.mask() as u16) << x.src_lsb) & ((y.mask() as u16) << y.src_lsb)) != 0
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intel_steps() {
        let steps = compile_steps(4, 12, Endianness::Intel);
        assert_eq!(
            steps,
            vec![
                Step { byte_index: 0, src_lsb: 4, width: 4, dst_lsb: 0 },
                Step { byte_index: 1, src_lsb: 0, width: 8, dst_lsb: 4 },
            ]
        );
    }

    #[test]
    fn test_motorola_steps() {
        // 12 bits starting at bit 0 of byte 0: one bit there, eight in byte 1, three in byte 2
        let steps = compile_steps(0, 12, Endianness::Motorola);
        assert_eq!(
            steps,
            vec![
                Step { byte_index: 0, src_lsb: 0, width: 1, dst_lsb: 11 },
                Step { byte_index: 1, src_lsb: 0, width: 8, dst_lsb: 3 },
                Step { byte_index: 2, src_lsb: 5, width: 3, dst_lsb: 0 },
            ]
        );
        let within = compile_steps(6, 6, Endianness::Motorola);
        assert_eq!(
            within,
            vec![Step { byte_index: 0, src_lsb: 1, width: 6, dst_lsb: 0 }]
        );
    }

    #[test]
    fn test_check_signal_fits() {
        let steps = compile_steps(56, 8, Endianness::Intel);
        assert!(check_signal_fits("s", &steps, 8).is_ok());
        assert!(check_signal_fits("s", &steps, 7).is_err());

        let moto = compile_steps(7, 16, Endianness::Motorola);
        assert_eq!(bytes_spanned(&moto), 2);
        assert!(check_signal_fits("m", &moto, 2).is_ok());
        assert!(matches!(
            check_signal_fits("m", &moto, 1),
            Err(DbcError::InvalidLayout { .. })
        ));
    }

    #[test]
    fn test_overlap() {
        let a = compile_steps(0, 8, Endianness::Intel);
        let b = compile_steps(7, 2, Endianness::Intel);
        let c = compile_steps(8, 8, Endianness::Intel);
        assert!(steps_overlap(&a, &b));
        assert!(!steps_overlap(&a, &c));
    }
}
