//! Literal coercion applied during field population.

use crate::error::BoxError;
use crate::value::{Value, ValueKind};

/// Converts literal binding values to the kind a field setter expects.
///
/// The container consults the converter only when a literal's kind differs
/// from the target field's kind. Without a converter the literal is handed to
/// the setter unchanged.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{StandardConverter, TypeConverter, Value, ValueKind};
///
/// let converter = StandardConverter;
/// assert!(converter.can_convert(ValueKind::Str, ValueKind::Int));
/// assert_eq!(converter.convert(Value::from("8080"), ValueKind::Int).unwrap(), Value::Int(8080));
/// ```
pub trait TypeConverter: Send + Sync {
    /// Whether values of kind `from` can be turned into kind `to`.
    fn can_convert(&self, from: ValueKind, to: ValueKind) -> bool;

    /// Performs the conversion.
    fn convert(&self, value: Value, to: ValueKind) -> Result<Value, BoxError>;
}

/// Converter covering the common string and numeric coercions.
///
/// - string to int, float or bool (by parsing)
/// - int to float and float to int (when the float is integral and in range)
/// - any kind to string
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardConverter;

impl TypeConverter for StandardConverter {
    fn can_convert(&self, from: ValueKind, to: ValueKind) -> bool {
        use ValueKind::*;
        matches!(
            (from, to),
            (Str, Int) | (Str, Float) | (Str, Bool) | (Int, Float) | (Float, Int) | (_, Str)
        )
    }

    fn convert(&self, value: Value, to: ValueKind) -> Result<Value, BoxError> {
        if value.kind() == to {
            return Ok(value);
        }
        let converted = match (value, to) {
            (Value::Str(s), ValueKind::Int) => Value::Int(s.trim().parse()?),
            (Value::Str(s), ValueKind::Float) => Value::Float(s.trim().parse()?),
            (Value::Str(s), ValueKind::Bool) => Value::Bool(s.trim().parse()?),
            (Value::Int(i), ValueKind::Float) => Value::Float(i as f64),
            (Value::Float(x), ValueKind::Int) => {
                if x.fract() != 0.0 || !x.is_finite() {
                    return Err(format!("{} is not an integral value", x).into());
                }
                // 2^63 itself does not fit
                if x < i64::MIN as f64 || x >= i64::MAX as f64 {
                    return Err(format!("{} is out of range for an int", x).into());
                }
                Value::Int(x as i64)
            }
            (other, ValueKind::Str) => Value::Str(other.to_string()),
            (other, to) => {
                return Err(format!("cannot convert {} '{}' to {}", other.kind(), other, to).into())
            }
        };
        Ok(converted)
    }
}
