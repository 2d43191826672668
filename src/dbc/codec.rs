//! Signal bit codec.
//!
//! Moves raw values between a payload and the bits a [`Signal`] occupies,
//! and converts between raw and physical values
//! (`physical = raw * factor + offset`).
//!
//! The free functions work on a single signal and any byte slice; the
//! [`Message`] methods add the DLC check and multiplexer gating.

use crate::dbc::core::message_layout::{bytes_spanned, check_signal_fits};
use crate::dbc::types::{errors::DbcError, message::Message, signal::Signal};

/// Raw value bounds of a signal as `(min, max_exclusive)`.
///
/// Both are powers of two and exact in f64, unlike `2^63 - 1` or `2^64 - 1`.
fn raw_limits(signal: &Signal) -> (f64, f64) {
    let n = signal.length() as i32;
    if signal.is_signed() {
        (-(2f64.powi(n - 1)), 2f64.powi(n - 1))
    } else {
        (0.0, 2f64.powi(n))
    }
}

/// Inclusive raw value bounds, for error reports.
fn raw_bounds(signal: &Signal) -> (f64, f64) {
    let (min, max_exclusive) = raw_limits(signal);
    (min, max_exclusive - 1.0)
}

fn value_mask(length: u16) -> u64 {
    if length >= 64 {
        u64::MAX
    } else {
        (1u64 << length) - 1
    }
}

fn check_payload(signal: &Signal, frame: &[u8]) -> Result<(), DbcError> {
    check_signal_fits(signal.name(), signal.steps(), frame.len())
}

/// Extracts the **unsigned** raw value (LSB-first accumulation) from the payload.
pub fn extract_raw_u64(signal: &Signal, frame: &[u8]) -> Result<u64, DbcError> {
    check_payload(signal, frame)?;
    let mut out: u64 = 0;
    for st in signal.steps() {
        let chunk = ((frame[st.byte_index] >> st.src_lsb) & st.mask()) as u64;
        out |= chunk << st.dst_lsb;
    }
    Ok(out)
}

/// Extracts the raw value, sign-extending it when the signal is signed.
pub fn extract_raw_i64(signal: &Signal, frame: &[u8]) -> Result<i64, DbcError> {
    let raw_u = extract_raw_u64(signal, frame)?;
    let n = signal.length();
    if signal.is_signed() && n < 64 && (raw_u & (1u64 << (n - 1))) != 0 {
        Ok((raw_u | !value_mask(n)) as i64)
    } else {
        Ok(raw_u as i64)
    }
}

/// Physical value of the signal in `frame`.
pub fn decode(signal: &Signal, frame: &[u8]) -> Result<f64, DbcError> {
    let raw = if signal.is_signed() {
        extract_raw_i64(signal, frame)? as f64
    } else {
        extract_raw_u64(signal, frame)? as f64
    };
    Ok(raw * signal.factor() + signal.offset())
}

/// Writes the low `length` bits of `bits` into the signal's position.
fn insert_bits(signal: &Signal, frame: &mut [u8], bits: u64) {
    for st in signal.steps() {
        let chunk = ((bits >> st.dst_lsb) as u8) & st.mask();
        let byte = &mut frame[st.byte_index];
        *byte = (*byte & !(st.mask() << st.src_lsb)) | (chunk << st.src_lsb);
    }
}

fn out_of_range(signal: &Signal, value: f64) -> DbcError {
    let (raw_min, raw_max) = raw_bounds(signal);
    DbcError::OutOfRange {
        signal: signal.name().to_string(),
        value,
        raw_min,
        raw_max,
    }
}

/// Packs an unsigned raw value. Only the signal's own bits are written.
pub fn encode_raw_u64(signal: &Signal, frame: &mut [u8], raw: u64) -> Result<(), DbcError> {
    check_payload(signal, frame)?;
    if raw & !value_mask(signal.length()) != 0 {
        return Err(out_of_range(signal, raw as f64));
    }
    insert_bits(signal, frame, raw);
    Ok(())
}

/// Packs a signed raw value in two's complement.
pub fn encode_raw_i64(signal: &Signal, frame: &mut [u8], raw: i64) -> Result<(), DbcError> {
    check_payload(signal, frame)?;
    let n = signal.length();
    let fits = if signal.is_signed() {
        n >= 64 || {
            let half = 1i64 << (n - 1);
            (-half..half).contains(&raw)
        }
    } else {
        raw >= 0 && (n >= 64 || (raw as u64) <= value_mask(n))
    };
    if !fits {
        return Err(out_of_range(signal, raw as f64));
    }
    insert_bits(signal, frame, (raw as u64) & value_mask(n));
    Ok(())
}

/// Scales a physical value to raw (`round((value - offset) / factor)`) and packs it.
///
/// On [`DbcError::OutOfRange`] the frame is left unmodified.
pub fn encode(signal: &Signal, frame: &mut [u8], value: f64) -> Result<(), DbcError> {
    check_payload(signal, frame)?;
    let raw = ((value - signal.offset()) / signal.factor()).round();
    let (raw_min, raw_limit) = raw_limits(signal);
    if !raw.is_finite() || raw < raw_min || raw >= raw_limit {
        return Err(out_of_range(signal, value));
    }
    let bits = if signal.is_signed() {
        (raw as i64) as u64
    } else {
        raw as u64
    };
    insert_bits(signal, frame, bits & value_mask(signal.length()));
    Ok(())
}

impl Message {
    fn signal_or_err(&self, name: &str) -> Result<&Signal, DbcError> {
        self.signal(name).ok_or_else(|| DbcError::SignalNotFound {
            message: self.name().to_string(),
            signal: name.to_string(),
        })
    }

    fn check_frame(&self, frame: &[u8]) -> Result<(), DbcError> {
        if frame.len() < self.dlc() as usize {
            return Err(DbcError::ShortFrame {
                name: self.name().to_string(),
                expected: self.dlc() as usize,
                actual: frame.len(),
            });
        }
        Ok(())
    }

    /// Checks the signal fits the DLC and, when multiplexed, that its
    /// multiplexor currently carries the matching value.
    fn check_active(&self, signal: &Signal, frame: &[u8]) -> Result<(), DbcError> {
        check_signal_fits(signal.name(), signal.steps(), self.dlc() as usize)?;
        let Some(expected) = signal.multiplexer_identifier() else {
            return Ok(());
        };
        let multiplexor = self.multiplexor().ok_or_else(|| DbcError::InvalidLayout {
            signal: signal.name().to_string(),
            details: format!("message '{}' has no multiplexor", self.name()),
        })?;
        let actual = extract_raw_u64(multiplexor, &frame[..self.dlc() as usize])?;
        if actual != expected as u64 {
            return Err(DbcError::NotActive {
                signal: signal.name().to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Physical value of one signal of this message.
    pub fn decode_signal(&self, name: &str, frame: &[u8]) -> Result<f64, DbcError> {
        self.check_frame(frame)?;
        let signal = self.signal_or_err(name)?;
        self.check_active(signal, frame)?;
        decode(signal, frame)
    }

    /// Encodes one signal into `frame`, leaving every other bit untouched.
    ///
    /// A multiplexed signal is only written while its multiplexor selects it;
    /// encode the multiplexor first.
    pub fn encode_signal(&self, name: &str, frame: &mut [u8], value: f64) -> Result<(), DbcError> {
        self.check_frame(frame)?;
        let signal = self.signal_or_err(name)?;
        self.check_active(signal, frame)?;
        encode(signal, frame, value)
    }

    /// Decodes every signal present in `frame`, in declaration order.
    ///
    /// Multiplexed signals not selected by the multiplexor are left out.
    pub fn decode_frame(&self, frame: &[u8]) -> Result<Vec<(&str, f64)>, DbcError> {
        self.check_frame(frame)?;
        let mut values = Vec::with_capacity(self.signals().len());
        for signal in self.signals() {
            match self.check_active(signal, frame) {
                Ok(()) => values.push((signal.name(), decode(signal, frame)?)),
                Err(DbcError::NotActive { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(values)
    }

    /// Smallest payload, in bytes, that holds every signal.
    pub fn min_payload_len(&self) -> usize {
        self.signals()
            .iter()
            .map(|s| bytes_spanned(s.steps()))
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbc::types::object::DbcObject;
    use crate::dbc::types::signal::{Endianness, MuxRole};

    fn sig(text: &str) -> Signal {
        Signal::from_dbc_text(text).unwrap()
    }

    fn build_test_motohawk() -> Message {
        Message::from_dbc_text(
            "BO_ 496 ExampleMessage: 8 PCM1
 SG_ Enable : 7|1@0+ (1,0) [0|0] \"-\" Vector__XXX
 SG_ AverageRadius : 6|6@0+ (0.1,0) [0|5] \"m\" Vector__XXX
 SG_ Temperature : 0|12@0- (0.01,250) [229.52|270.47] \"degK\" Vector__XXX",
        )
        .unwrap()
    }

    #[test]
    fn test_motorola_golden_bytes() {
        let msg = build_test_motohawk();
        let mut frame = [0u8; 8];
        encode_raw_u64(msg.signal("Temperature").unwrap(), &mut frame, 0xDB6).unwrap();
        encode_raw_u64(msg.signal("AverageRadius").unwrap(), &mut frame, 18).unwrap();
        encode_raw_u64(msg.signal("Enable").unwrap(), &mut frame, 1).unwrap();
        assert_eq!(frame, [0xA5, 0xB6, 0xC0, 0, 0, 0, 0, 0]);

        assert_eq!(extract_raw_u64(msg.signal("Temperature").unwrap(), &frame).unwrap(), 0xDB6);
        assert_eq!(extract_raw_u64(msg.signal("AverageRadius").unwrap(), &frame).unwrap(), 18);
        assert_eq!(extract_raw_u64(msg.signal("Enable").unwrap(), &frame).unwrap(), 1);
    }

    #[test]
    fn test_encode_only_touches_own_bits() {
        let msg = build_test_motohawk();
        let mut frame = [0xFFu8; 8];
        encode_raw_u64(msg.signal("Enable").unwrap(), &mut frame, 0).unwrap();
        assert_eq!(frame[0], 0x7F);
        assert!(frame[1..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_signed_physical_value() {
        let msg = build_test_motohawk();
        let frame = [0xA5, 0xB6, 0xC0, 0, 0, 0, 0, 0];
        // 0xDB6 as 12-bit two's complement is -586
        let temp = msg.decode_signal("Temperature", &frame).unwrap();
        assert!((temp - (250.0 - 5.86)).abs() < 1e-9);
        let radius = msg.decode_signal("AverageRadius", &frame).unwrap();
        assert!((radius - 1.8).abs() < 1e-9);
    }

    #[test]
    fn test_sign_extension() {
        let s = sig("SG_ T : 0|8@1- (1,0) [0|0] \"\" A");
        assert_eq!(extract_raw_i64(&s, &[0xFF]).unwrap(), -1);
        assert_eq!(extract_raw_i64(&s, &[0x80]).unwrap(), -128);
        assert_eq!(decode(&s, &[0x7F]).unwrap(), 127.0);
        let u = sig("SG_ U : 0|8@1+ (1,0) [0|0] \"\" A");
        assert_eq!(decode(&u, &[0xFF]).unwrap(), 255.0);
    }

    #[test]
    fn test_intel_encode_decode() {
        let s = sig("SG_ Speed : 4|16@1+ (0.1,0) [0|6553.5] \"km/h\" A");
        let mut frame = [0u8; 3];
        encode(&s, &mut frame, 123.4).unwrap();
        assert_eq!(extract_raw_u64(&s, &frame).unwrap(), 1234);
        assert_eq!(frame, [0x20, 0x4D, 0x00]);
        assert!((decode(&s, &frame).unwrap() - 123.4).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_leaves_frame() {
        let s = sig("SG_ Small : 0|4@1+ (1,0) [0|15] \"\" A");
        let mut frame = [0xAAu8; 1];
        let err = encode(&s, &mut frame, 16.0).unwrap_err();
        assert!(matches!(err, DbcError::OutOfRange { raw_max, .. } if raw_max == 15.0));
        assert_eq!(frame, [0xAA]);
        assert!(encode(&s, &mut frame, -1.0).is_err());
        assert!(encode_raw_u64(&s, &mut frame, 16).is_err());
        assert_eq!(frame, [0xAA]);

        let signed = sig("SG_ S : 0|4@1- (1,0) [0|0] \"\" A");
        assert!(encode_raw_i64(&signed, &mut frame, -8).is_ok());
        assert!(encode_raw_i64(&signed, &mut frame, 8).is_err());
        assert_eq!(frame[0] & 0x0F, 0x08);
    }

    #[test]
    fn test_full_width_signal() {
        let s = sig("SG_ Wide : 0|64@1+ (1,0) [0|0] \"\" A");
        let mut frame = [0u8; 8];
        encode_raw_u64(&s, &mut frame, u64::MAX).unwrap();
        assert_eq!(extract_raw_u64(&s, &frame).unwrap(), u64::MAX);
        let signed = sig("SG_ Wide : 0|64@1- (1,0) [0|0] \"\" A");
        encode_raw_i64(&signed, &mut frame, i64::MIN).unwrap();
        assert_eq!(extract_raw_i64(&signed, &frame).unwrap(), i64::MIN);
    }

    #[test]
    fn test_full_width_physical_bounds() {
        let mut frame = [0x5Au8; 8];
        let unsigned = sig("SG_ Wide : 0|64@1+ (1,0) [0|0] \"\" A");
        assert!(matches!(
            encode(&unsigned, &mut frame, 2f64.powi(64)),
            Err(DbcError::OutOfRange { .. })
        ));
        let signed = sig("SG_ Wide : 0|64@1- (1,0) [0|0] \"\" A");
        assert!(matches!(
            encode(&signed, &mut frame, 2f64.powi(63)),
            Err(DbcError::OutOfRange { .. })
        ));
        assert_eq!(frame, [0x5A; 8]);

        encode(&signed, &mut frame, -(2f64.powi(63))).unwrap();
        assert_eq!(extract_raw_i64(&signed, &frame).unwrap(), i64::MIN);
        encode(&unsigned, &mut frame, 2f64.powi(63)).unwrap();
        assert_eq!(extract_raw_u64(&unsigned, &frame).unwrap(), 1u64 << 63);
    }

    /// Every layout that fits 8 bytes packs and unpacks boundary raws
    /// symmetrically and leaves the surrounding bits alone.
    #[test]
    fn test_layout_symmetry() {
        let mut layouts = 0;
        for endianness in [Endianness::Intel, Endianness::Motorola] {
            for is_signed in [false, true] {
                for start in 0..64u16 {
                    for length in 1..=64u16 {
                        let s = Signal::new("S", start, length, endianness, is_signed).unwrap();
                        if extract_raw_u64(&s, &[0u8; 8]).is_err() {
                            continue;
                        }
                        layouts += 1;
                        check_symmetry(&s);
                    }
                }
            }
        }
        // 2080 Intel layouts per signedness, and as many Motorola ones
        assert_eq!(layouts, 4 * 2080);
    }

    fn check_symmetry(s: &Signal) {
        let n = s.length() as u32;
        let mut own = [0u8; 8];
        encode_raw_u64(s, &mut own, value_mask(s.length())).unwrap();

        let raws: Vec<i128> = if s.is_signed() {
            let half = 1i128 << (n - 1);
            vec![0, -1, -half, half - 1, half / 2]
        } else {
            let top = 1i128 << (n - 1);
            vec![0, 1, (1i128 << n) - 1, top]
        };
        for raw in raws {
            let mut zeros = [0u8; 8];
            let mut ones = [0xFFu8; 8];
            if s.is_signed() {
                encode_raw_i64(s, &mut zeros, raw as i64).unwrap();
                encode_raw_i64(s, &mut ones, raw as i64).unwrap();
                assert_eq!(extract_raw_i64(s, &zeros).unwrap() as i128, raw, "{:?}", s);
                assert_eq!(extract_raw_i64(s, &ones).unwrap() as i128, raw, "{:?}", s);
            } else {
                encode_raw_u64(s, &mut zeros, raw as u64).unwrap();
                encode_raw_u64(s, &mut ones, raw as u64).unwrap();
                assert_eq!(extract_raw_u64(s, &zeros).unwrap() as i128, raw, "{:?}", s);
                assert_eq!(extract_raw_u64(s, &ones).unwrap() as i128, raw, "{:?}", s);
            }
            for i in 0..8 {
                assert_eq!(zeros[i] & !own[i], 0, "{:?}", s);
                assert_eq!(ones[i] & !own[i], !own[i], "{:?}", s);
                assert_eq!(ones[i] & own[i], zeros[i], "{:?}", s);
            }
            if n <= 52 {
                let mut frame = [0u8; 8];
                encode(s, &mut frame, raw as f64).unwrap();
                assert_eq!(decode(s, &frame).unwrap(), raw as f64, "{:?}", s);
            }
        }
    }

    #[test]
    fn test_payload_too_small() {
        let s = sig("SG_ Late : 56|8@1+ (1,0) [0|0] \"\" A");
        assert!(matches!(
            extract_raw_u64(&s, &[0u8; 4]),
            Err(DbcError::InvalidLayout { .. })
        ));
    }

    fn build_test_mux() -> Message {
        let mux = Signal::new("Mux", 0, 8, Endianness::Intel, false)
            .unwrap()
            .with_mux(MuxRole::Multiplexor);
        let a = Signal::new("A", 8, 8, Endianness::Intel, false)
            .unwrap()
            .with_mux(MuxRole::Multiplexed(1));
        let b = Signal::new("B", 8, 8, Endianness::Intel, false)
            .unwrap()
            .with_mux(MuxRole::Multiplexed(2));
        Message::new(300, "Muxed", 2, None, vec![mux, a, b]).unwrap()
    }

    #[test]
    fn test_mux_gating() {
        let msg = build_test_mux();
        let frame = [0x02, 0x2A];
        assert_eq!(msg.decode_signal("B", &frame).unwrap(), 42.0);
        assert_eq!(
            msg.decode_signal("A", &frame),
            Err(DbcError::NotActive {
                signal: "A".into(),
                expected: 1,
                actual: 2
            })
        );
        assert_eq!(msg.decode_frame(&frame).unwrap(), vec![("Mux", 2.0), ("B", 42.0)]);

        let mut out = [0u8; 2];
        msg.encode_signal("Mux", &mut out, 1.0).unwrap();
        msg.encode_signal("A", &mut out, 7.0).unwrap();
        assert!(msg.encode_signal("B", &mut out, 7.0).is_err());
        assert_eq!(out, [0x01, 0x07]);
    }

    #[test]
    fn test_message_frame_checks() {
        let msg = build_test_mux();
        assert!(matches!(
            msg.decode_signal("Mux", &[0x01]),
            Err(DbcError::ShortFrame { expected: 2, actual: 1, .. })
        ));
        assert!(matches!(
            msg.decode_signal("Nope", &[0, 0]),
            Err(DbcError::SignalNotFound { .. })
        ));
        let wide = Message::from_dbc_text("BO_ 9 Wide: 1 A\n SG_ W : 0|16@1+ (1,0) [0|0] \"\" B").unwrap();
        assert!(matches!(
            wide.decode_signal("W", &[0, 0]),
            Err(DbcError::InvalidLayout { .. })
        ));
        assert_eq!(wide.min_payload_len(), 2);
    }
}
