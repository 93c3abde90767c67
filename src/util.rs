//! Small numeric helpers used across modules.

/// Round to one decimal place, the precision accuracy and best scores are reported with.
pub fn round1(x: f64) -> f64 {
  (x * 10.0).round() / 10.0
}

/// Greatest common divisor of the absolute values. `gcd(0, 0) == 0`.
pub fn gcd(a: i64, b: i64) -> i64 {
  let (mut a, mut b) = (a.abs(), b.abs());
  while b != 0 {
    let t = a % b;
    a = b;
    b = t;
  }
  a
}

/// Render an operand, wrapping negatives in parentheses: `-4` -> `(-4)`.
pub fn paren_if_negative(n: i64) -> String {
  if n < 0 { format!("({})", n) } else { n.to_string() }
}

/// Integer percentage of `current` towards `target`, capped at 100.
/// A zero target counts as already reached.
pub fn progress_percent(current: f64, target: f64) -> u8 {
  if target <= 0.0 {
    return 100;
  }
  let pct = (current / target * 100.0).floor();
  pct.clamp(0.0, 100.0) as u8
}
