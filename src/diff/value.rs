// Type-aware cell equality
//
// Drivers and repeated runs do not agree on how a value is represented on
// the wire: the same count can arrive as `10`, `10.0` or `"10"`, and the
// same instant can carry different offsets. Comparing raw representations
// would report differences that are not there, so cells are normalized
// before they are compared:
//
// 1. NULL handling (both NULL equal, one NULL never equal)
// 2. Numeric comparison with optional absolute tolerance
// 3. RFC3339 instant comparison (tolerance never applies)
// 4. Structural JSON equality as the fallback

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

/// A cell normalized to a comparable number
#[derive(Debug, Clone, Copy, PartialEq)]
enum Numeric {
    Int(i128),
    Float(f64),
}

impl Numeric {
    fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(i) => i as f64,
            Numeric::Float(f) => f,
        }
    }
}

/// Compare two result cells
///
/// `tolerance` is an absolute bound on numeric difference. A tolerance of
/// `0.0` (or anything non-positive) means exact comparison.
///
/// # Example
/// ```
/// use querydrift::diff::values_equal;
/// use serde_json::json;
///
/// assert!(values_equal(&json!(10), &json!(10.0), 0.0));
/// assert!(values_equal(&json!(1.0), &json!(1.0004), 0.001));
/// assert!(!values_equal(&json!(null), &json!(0), 0.0));
/// ```
pub fn values_equal(a: &Value, b: &Value, tolerance: f64) -> bool {
    match (a.is_null(), b.is_null()) {
        (true, true) => return true,
        (true, false) | (false, true) => return false,
        (false, false) => {}
    }

    if let (Some(x), Some(y)) = (as_numeric(a), as_numeric(b)) {
        return numbers_equal(x, y, tolerance);
    }

    if let (Some(x), Some(y)) = (as_timestamp(a), as_timestamp(b)) {
        return x == y;
    }

    a == b
}

fn numbers_equal(x: Numeric, y: Numeric, tolerance: f64) -> bool {
    if tolerance > 0.0 {
        return (x.as_f64() - y.as_f64()).abs() <= tolerance;
    }

    match (x, y) {
        // Large integers lose precision as f64
        (Numeric::Int(i), Numeric::Int(j)) => i == j,
        _ => x.as_f64() == y.as_f64(),
    }
}

fn as_numeric(value: &Value) -> Option<Numeric> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Numeric::Int(i128::from(i)))
            } else if let Some(u) = n.as_u64() {
                Some(Numeric::Int(i128::from(u)))
            } else {
                n.as_f64().map(Numeric::Float)
            }
        }
        Value::String(s) => parse_numeric_str(s),
        _ => None,
    }
}

fn parse_numeric_str(s: &str) -> Option<Numeric> {
    if let Ok(i) = s.parse::<i128>() {
        return Some(Numeric::Int(i));
    }

    // "NaN" and "inf" parse as f64 but are text as far as a result set goes
    s.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Numeric::Float)
}

fn as_timestamp(value: &Value) -> Option<DateTime<FixedOffset>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
}
