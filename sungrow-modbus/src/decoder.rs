//! Decoding of block word buffers into typed, scaled register values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::planner::RegisterBlock;
use crate::register::{DataType, Register};

/// A decoded register value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Integer value with a scale of 1.0.
    Integer(i64),
    /// Numeric value after a non-unit scale was applied.
    Float(f64),
    /// String value with NULs and surrounding whitespace removed.
    Text(String),
}

impl Value {
    /// Numeric view of the value, `None` for strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Decode the words read for `block` into `{address -> value}`.
///
/// `words` must hold exactly `block.total_word_count()` entries; anything else
/// means the response does not belong to this request and nothing is decoded.
pub fn decode(block: &RegisterBlock, words: &[u16]) -> Result<BTreeMap<u16, Value>, DecodeError> {
    let expected = usize::from(block.total_word_count());
    if words.len() != expected {
        return Err(DecodeError {
            start: block.start_address(),
            expected,
            actual: words.len(),
        });
    }

    let mut values = BTreeMap::new();
    let mut offset = 0;

    for register in block.registers() {
        let width = usize::from(register.word_count);
        let value = decode_register(register, &words[offset..offset + width]);
        values.insert(register.address, value);
        offset += width;
    }

    Ok(values)
}

/// Decode a single register from exactly its own words.
///
/// Callers slice `words` to `register.word_count`, which `Register::validate`
/// ties to the fixed width of numeric types.
fn decode_register(register: &Register, words: &[u16]) -> Value {
    let raw = match register.data_type {
        DataType::String => return Value::Text(decode_string(words)),
        DataType::UInt16 => i64::from(words[0]),
        DataType::Int16 => i64::from(words[0] as i16),
        DataType::UInt32 => i64::from(combine_words(words[0], words[1])),
        DataType::Int32 => i64::from(combine_words(words[0], words[1]) as i32),
    };

    apply_scale(raw, register.scale)
}

/// Join two words, high word first.
fn combine_words(high: u16, low: u16) -> u32 {
    (u32::from(high) << 16) | u32::from(low)
}

/// Scale is applied after sign adjustment.
fn apply_scale(raw: i64, scale: f64) -> Value {
    if scale == 1.0 {
        Value::Integer(raw)
    } else {
        Value::Float(raw as f64 * scale)
    }
}

fn decode_string(words: &[u16]) -> String {
    let text: String = words
        .iter()
        .flat_map(|w| w.to_be_bytes())
        .filter(|&b| b != 0)
        .map(char::from)
        .collect();

    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::plan;

    fn single(register: Register, words: &[u16]) -> Value {
        let blocks = plan(&[register.clone()]).unwrap();
        decode(&blocks[0], words).unwrap().remove(&register.address).unwrap()
    }

    #[test]
    fn test_uint32_high_word_first() {
        assert_eq!(
            single(Register::uint32(0, "u32"), &[0x0001, 0x0002]),
            Value::Integer(65538)
        );
    }

    #[test]
    fn test_int32_negative() {
        assert_eq!(
            single(Register::int32(0, "i32"), &[0xFFFF, 0xFFFF]),
            Value::Integer(-1)
        );
        assert_eq!(
            single(Register::int32(0, "i32"), &[0x8000, 0x0000]),
            Value::Integer(i64::from(i32::MIN))
        );
    }

    #[test]
    fn test_int16_boundaries() {
        assert_eq!(single(Register::int16(0, "i16"), &[0x7FFF]), Value::Integer(32767));
        assert_eq!(single(Register::int16(0, "i16"), &[0x8000]), Value::Integer(-32768));
        assert_eq!(single(Register::uint16(0, "u16"), &[0x8000]), Value::Integer(32768));
    }

    #[test]
    fn test_string_strips_nul() {
        assert_eq!(
            single(Register::string(0, "s", 2), &[0x4142, 0x0000]),
            Value::Text("AB".to_string())
        );
    }

    #[test]
    fn test_string_trims_whitespace() {
        // " A1 " followed by padding
        let words = [0x2041, 0x3120, 0x0000];
        assert_eq!(
            single(Register::string(0, "s", 3), &words),
            Value::Text("A1".to_string())
        );
    }

    #[test]
    fn test_scale_after_sign_adjustment() {
        let reg = Register::int16(5007, "Inverter Temperature").scaled(0.1);
        let value = single(reg, &[0xFFF6]);
        let Value::Float(v) = value else {
            panic!("expected float, got {:?}", value);
        };
        assert!((v - -1.0).abs() < 1e-9);
    }

    #[test]
    fn test_scale_applies_to_wide_values() {
        let reg = Register::uint32(0, "Energy").scaled(0.5);
        assert_eq!(single(reg, &[0x0001, 0x0000]), Value::Float(32768.0));
    }

    #[test]
    fn test_block_offsets() {
        let registers = vec![
            Register::string(10, "serial", 2),
            Register::uint32(12, "total"),
            Register::int16(14, "temp"),
        ];
        let blocks = plan(&registers).unwrap();
        let words = [0x5348, 0x3130, 0x0000, 0x0064, 0xFFFE];

        let values = decode(&blocks[0], &words).unwrap();

        assert_eq!(values.len(), 3);
        assert_eq!(values[&10], Value::Text("SH10".to_string()));
        assert_eq!(values[&12], Value::Integer(100));
        assert_eq!(values[&14], Value::Integer(-2));
    }

    #[test]
    fn test_word_count_mismatch() {
        let blocks = plan(&[Register::uint32(40, "u32")]).unwrap();

        let err = decode(&blocks[0], &[0x0001]).unwrap_err();

        assert_eq!(
            err,
            DecodeError {
                start: 40,
                expected: 2,
                actual: 1,
            }
        );
        assert!(decode(&blocks[0], &[0, 1, 2]).is_err());
    }

    #[test]
    fn test_narrow_wide_register_never_reaches_decoder() {
        let mut register = Register::uint32(100, "Energy");
        register.word_count = 1;

        assert!(matches!(
            plan(&[register]),
            Err(crate::error::PlanError::InvalidRegister { address: 100, .. })
        ));
    }

    #[test]
    fn test_decode_is_pure() {
        let blocks = plan(&[Register::uint16(0, "a"), Register::int32(1, "b")]).unwrap();
        let words = [7, 0xFFFF, 0xFFF0];

        assert_eq!(
            decode(&blocks[0], &words).unwrap(),
            decode(&blocks[0], &words).unwrap()
        );
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(Value::Text("x".into()).as_str(), Some("x"));
        assert_eq!(Value::Text("x".into()).as_f64(), None);
    }
}
