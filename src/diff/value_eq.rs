use serde_json::Value;

/// Accepts three arguments: a float type and two values to compare.
///
/// Returns a bool indicating whether they're equal. This accounts for NaN such
/// that `approx_eq!(f64, f64::NAN, f64::NAN)` is `true`.
macro_rules! approx_eq {
    ($Ty:ty, $a:expr, $b:expr) => {
        float_cmp::approx_eq!($Ty, $a, $b) || $a.is_nan() && $b.is_nan()
    };
}

/// Compares two serialized values to determine if they're equal, accounting
/// for float rounding in numbers at any depth.
pub fn value_eq(value_a: &Value, value_b: &Value) -> bool {
    match (value_a, value_b) {
        (Value::Number(a), Value::Number(b)) => {
            if a.is_f64() || b.is_f64() {
                match (a.as_f64(), b.as_f64()) {
                    (Some(a), Some(b)) => approx_eq!(f64, a, b),
                    _ => false,
                }
            } else {
                a == b
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| value_eq(a, b))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, a)| b.get(key).map_or(false, |b| value_eq(a, b)))
        }
        (a, b) => a == b,
    }
}

/// Whether two sequences differ at any position, or in length.
pub fn sequence_differs(current: &[Value], original: &[Value]) -> bool {
    current.len() != original.len()
        || current
            .iter()
            .zip(original)
            .any(|(current, original)| !value_eq(current, original))
}
