//! Generated multiplication/division questions for the three tiers.
//!
//! Every generator is a pure function of the injected RNG. The computed answer
//! is fed into `distractors::generate_options` with the tier's option policy.

use rand::Rng;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::distractors::{generate_options, DEFAULT_OPTION_COUNT};
use crate::domain::Tier;
use crate::util::{gcd, paren_if_negative};

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
  Multiply,
  Divide,
  /// `(a × b) ÷ c`
  MultiplyThenDivide,
  /// `(a ÷ b) × c`
  DivideThenMultiply,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SignPattern {
  DoubleNegative,
  SingleNegative,
  Positive,
}

/// A question ready to be shown: text, answer, shuffled options, explanation.
/// `operands` are in reading order (for division: dividend, divisor).
#[derive(Clone, Debug, Serialize)]
pub struct GeneratedQuestion {
  pub tier: Tier,
  pub operation: Operation,
  pub operands: Vec<i64>,
  pub question_text: String,
  pub answer: i64,
  pub options: Vec<i64>,
  pub explanation: String,
}

struct Problem {
  operation: Operation,
  operands: Vec<i64>,
  answer: i64,
  text: String,
}

/// Generate one question with the default four options.
pub fn generate_question<R: Rng + ?Sized>(tier: Tier, rng: &mut R) -> GeneratedQuestion {
  generate_question_with(tier, DEFAULT_OPTION_COUNT, rng)
}

#[instrument(level = "debug", skip_all, fields(tier = tier.as_str(), option_count))]
pub fn generate_question_with<R: Rng + ?Sized>(tier: Tier, option_count: usize, rng: &mut R) -> GeneratedQuestion {
  let problem = match tier {
    Tier::Beginner => beginner(rng),
    Tier::Intermediate => intermediate(rng),
    Tier::Advanced => advanced(rng),
  };
  let (range_size, allow_negative) = tier.option_policy();
  let options = generate_options(rng, problem.answer, option_count, range_size, allow_negative);
  debug!(target: "generator", tier = tier.as_str(), text = %problem.text, answer = problem.answer, "Question generated");

  GeneratedQuestion {
    tier,
    operation: problem.operation,
    operands: problem.operands,
    explanation: format!("{} = {}", problem.text, problem.answer),
    question_text: problem.text,
    answer: problem.answer,
    options,
  }
}

/// A full quiz of `count` independent questions.
pub fn generate_quiz<R: Rng + ?Sized>(tier: Tier, count: usize, option_count: usize, rng: &mut R) -> Vec<GeneratedQuestion> {
  (0..count).map(|_| generate_question_with(tier, option_count, rng)).collect()
}

// -------- Beginner: 1–10, exact division, no negatives --------

fn beginner<R: Rng + ?Sized>(rng: &mut R) -> Problem {
  if rng.gen_bool(0.5) {
    let a = rng.gen_range(1..=10);
    let b = rng.gen_range(1..=10);
    multiply(a, b, format!("{} × {}", a, b))
  } else {
    let divisor = rng.gen_range(1..=10);
    let quotient = rng.gen_range(1..=10);
    divide(divisor, quotient, |dividend| format!("{} ÷ {}", dividend, divisor))
  }
}

// -------- Intermediate: optionally exactly one negative operand --------

fn intermediate<R: Rng + ?Sized>(rng: &mut R) -> Problem {
  let include_negative = rng.gen_bool(0.5);
  if rng.gen_bool(0.5) {
    let (a, b) = if include_negative {
      let a = signed_nonzero(rng, 10, 1, 10);
      let b = signed_nonzero(rng, 10, 1, 10);
      single_negative(rng, a, b)
    } else {
      (rng.gen_range(10..=25), rng.gen_range(2..=12))
    };
    multiply(a, b, format!("{} × {}", a, b))
  } else {
    let (divisor, quotient) = if include_negative {
      let divisor = signed_nonzero(rng, 10, 2, 10);
      let quotient = signed_nonzero(rng, 10, 1, 10);
      single_negative(rng, divisor, quotient)
    } else {
      (rng.gen_range(2..=12), rng.gen_range(10..=50))
    };
    divide(divisor, quotient, |dividend| format!("{} ÷ {}", dividend, divisor))
  }
}

/// Uniform draw from `-neg_max..=-1` ∪ `pos_min..=pos_max`.
fn signed_nonzero<R: Rng + ?Sized>(rng: &mut R, neg_max: i64, pos_min: i64, pos_max: i64) -> i64 {
  let positives = pos_max - pos_min + 1;
  let idx = rng.gen_range(0..neg_max + positives);
  if idx < neg_max { -(idx + 1) } else { pos_min + (idx - neg_max) }
}

/// Force exactly one of the pair negative: two negatives lose the second sign,
/// two positives get one flipped at random.
fn single_negative<R: Rng + ?Sized>(rng: &mut R, a: i64, b: i64) -> (i64, i64) {
  if a < 0 && b < 0 {
    (a, b.abs())
  } else if a > 0 && b > 0 {
    if rng.gen_bool(0.5) { (-a, b) } else { (a, -b) }
  } else {
    (a, b)
  }
}

// -------- Advanced: weighted signs, mixed chains, three digits --------

fn advanced<R: Rng + ?Sized>(rng: &mut R) -> Problem {
  match rng.gen_range(0..4) {
    0 => advanced_multiply(rng),
    1 => advanced_divide(rng),
    2 => mixed(rng),
    _ => three_digit(rng),
  }
}

/// 40% double negative, 40% single negative, 20% positive.
fn sign_pattern<R: Rng + ?Sized>(rng: &mut R) -> SignPattern {
  match rng.gen_range(0..100) {
    0..=39 => SignPattern::DoubleNegative,
    40..=79 => SignPattern::SingleNegative,
    _ => SignPattern::Positive,
  }
}

fn flip_one<R: Rng + ?Sized>(rng: &mut R, a: i64, b: i64) -> (i64, i64) {
  if rng.gen_bool(0.5) { (-a, b) } else { (a, -b) }
}

fn advanced_multiply<R: Rng + ?Sized>(rng: &mut R) -> Problem {
  match sign_pattern(rng) {
    SignPattern::DoubleNegative => {
      let a = rng.gen_range(-50..=-10);
      let b = rng.gen_range(-20..=-2);
      multiply(a, b, format!("({}) × ({})", a, b))
    }
    SignPattern::SingleNegative => {
      let a = rng.gen_range(10..=50);
      let b = rng.gen_range(2..=25);
      let (a, b) = flip_one(rng, a, b);
      multiply(a, b, format!("{} × {}", a, b))
    }
    SignPattern::Positive => {
      let a = rng.gen_range(20..=99);
      let b = rng.gen_range(11..=25);
      multiply(a, b, format!("{} × {}", a, b))
    }
  }
}

fn advanced_divide<R: Rng + ?Sized>(rng: &mut R) -> Problem {
  match sign_pattern(rng) {
    SignPattern::DoubleNegative => {
      let divisor = rng.gen_range(-25..=-2);
      let quotient = rng.gen_range(-50..=-5);
      divide(divisor, quotient, |dividend| format!("({}) ÷ ({})", dividend, divisor))
    }
    SignPattern::SingleNegative => {
      let divisor = rng.gen_range(2..=25);
      let quotient = rng.gen_range(5..=50);
      let (divisor, quotient) = flip_one(rng, divisor, quotient);
      divide(divisor, quotient, |dividend| format!("{} ÷ {}", dividend, divisor))
    }
    SignPattern::Positive => {
      let divisor = rng.gen_range(11..=25);
      let quotient = rng.gen_range(20..=100);
      divide(divisor, quotient, |dividend| format!("{} ÷ {}", dividend, divisor))
    }
  }
}

fn nonzero_or<R: Rng + ?Sized>(rng: &mut R, value: i64, fallback: i64) -> i64 {
  if value != 0 {
    value
  } else if rng.gen_bool(0.5) {
    fallback
  } else {
    -fallback
  }
}

fn mixed<R: Rng + ?Sized>(rng: &mut R) -> Problem {
  if rng.gen_bool(0.5) {
    let drawn = rng.gen_range(-30..=30);
    let a = nonzero_or(rng, drawn, 15);
    let b = rng.gen_range(2..=10);
    let drawn = rng.gen_range(-10..=10);
    let c = nonzero_or(rng, drawn, 5);
    let a = repair_for_exact_division(a, b, c);

    Problem {
      operation: Operation::MultiplyThenDivide,
      operands: vec![a, b, c],
      answer: (a * b) / c,
      text: format!("({} × {}) ÷ {}", paren_if_negative(a), paren_if_negative(b), paren_if_negative(c)),
    }
  } else {
    let drawn = rng.gen_range(-10..=10);
    let b = nonzero_or(rng, drawn, 6);
    let drawn = rng.gen_range(-20..=20);
    let quotient = nonzero_or(rng, drawn, 8);
    let a = quotient * b;
    let drawn = rng.gen_range(-10..=10);
    let c = nonzero_or(rng, drawn, 3);

    Problem {
      operation: Operation::DivideThenMultiply,
      operands: vec![a, b, c],
      answer: (a / b) * c,
      text: format!("({} ÷ {}) × {}", paren_if_negative(a), paren_if_negative(b), paren_if_negative(c)),
    }
  }
}

/// Adjust `a` so that `(a * b) % c == 0`, keeping its sign and staying non-zero.
///
/// `a * b` is divisible by `c` exactly when `a` is a multiple of `|c| / gcd(b, c)`,
/// so `a` is truncated towards zero to the nearest such multiple.
fn repair_for_exact_division(a: i64, b: i64, c: i64) -> i64 {
  if (a * b) % c == 0 {
    return a;
  }
  let step = c.abs() / gcd(b, c);
  let repaired = (a / step) * step;
  if repaired != 0 {
    repaired
  } else if a < 0 {
    -step
  } else {
    step
  }
}

fn three_digit<R: Rng + ?Sized>(rng: &mut R) -> Problem {
  if rng.gen_bool(0.5) {
    let a = rng.gen_range(100..=999);
    let b = rng.gen_range(10..=99);
    multiply(a, b, format!("{} × {}", a, b))
  } else {
    let divisor = rng.gen_range(10..=99);
    let quotient = rng.gen_range(10..=99);
    divide(divisor, quotient, |dividend| format!("{} ÷ {}", dividend, divisor))
  }
}

// -------- Builders --------

fn multiply(a: i64, b: i64, text: String) -> Problem {
  Problem { operation: Operation::Multiply, operands: vec![a, b], answer: a * b, text }
}

/// Division is always built backwards from the quotient so it is exact.
fn divide(divisor: i64, quotient: i64, render: impl FnOnce(i64) -> String) -> Problem {
  let dividend = divisor * quotient;
  Problem {
    operation: Operation::Divide,
    operands: vec![dividend, divisor],
    answer: quotient,
    text: render(dividend),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use std::collections::HashSet;

  #[test]
  fn explanation_shows_the_worked_expression() {
    let mut rng = StdRng::seed_from_u64(3);
    for tier in Tier::ALL {
      for _ in 0..50 {
        let q = generate_question(tier, &mut rng);
        assert_eq!(q.explanation, format!("{} = {}", q.question_text, q.answer));
      }
    }
  }

  fn check_options(q: &GeneratedQuestion) {
    assert_eq!(q.options.len(), DEFAULT_OPTION_COUNT, "{q:?}");
    let distinct: HashSet<_> = q.options.iter().collect();
    assert_eq!(distinct.len(), q.options.len(), "{q:?}");
    assert!(q.options.contains(&q.answer), "{q:?}");
  }

  #[test]
  fn beginner_is_non_negative_and_exact() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..500 {
      let q = generate_question(Tier::Beginner, &mut rng);
      check_options(&q);
      assert!(q.answer >= 0);
      assert!(q.options.iter().all(|&o| o >= 0), "{q:?}");
      assert!(q.operands.iter().all(|&o| o >= 1));
      if q.operation == Operation::Divide {
        assert_eq!(q.operands[0] % q.operands[1], 0);
        assert_eq!(q.operands[0] / q.operands[1], q.answer);
      } else {
        assert!(q.operands.iter().all(|&o| o <= 10));
      }
    }
  }

  #[test]
  fn intermediate_never_has_two_negatives() {
    let mut rng = StdRng::seed_from_u64(12);
    let mut saw_negative = false;
    for _ in 0..1000 {
      let q = generate_question(Tier::Intermediate, &mut rng);
      check_options(&q);
      let (x, y) = match q.operation {
        Operation::Multiply => (q.operands[0], q.operands[1]),
        // The signed pair for division is (divisor, quotient).
        _ => (q.operands[1], q.answer),
      };
      let negatives = [x, y].iter().filter(|&&v| v < 0).count();
      assert!(negatives <= 1, "{q:?}");
      saw_negative |= negatives == 1;
      if q.operation == Operation::Divide {
        assert_eq!(q.operands[0] % q.operands[1], 0);
      }
    }
    assert!(saw_negative);
  }

  #[test]
  fn single_negative_correction_rules() {
    let mut rng = StdRng::seed_from_u64(3);
    assert_eq!(single_negative(&mut rng, -3, -4), (-3, 4));
    assert_eq!(single_negative(&mut rng, -3, 4), (-3, 4));
    let (a, b) = single_negative(&mut rng, 3, 4);
    assert!((a == -3 && b == 4) || (a == 3 && b == -4));
  }

  #[test]
  fn signed_nonzero_covers_both_ranges() {
    let mut rng = StdRng::seed_from_u64(4);
    let draws: HashSet<i64> = (0..2000).map(|_| signed_nonzero(&mut rng, 10, 2, 10)).collect();
    assert!(!draws.contains(&0) && !draws.contains(&1));
    assert!(draws.contains(&-10) && draws.contains(&-1) && draws.contains(&2) && draws.contains(&10));
    assert_eq!(draws.len(), 19);
  }

  #[test]
  fn advanced_mixed_chains_divide_exactly() {
    let mut rng = StdRng::seed_from_u64(13);
    let mut mixed_seen = 0;
    for _ in 0..2000 {
      let q = generate_question(Tier::Advanced, &mut rng);
      check_options(&q);
      match q.operation {
        Operation::MultiplyThenDivide => {
          let (a, b, c) = (q.operands[0], q.operands[1], q.operands[2]);
          assert_ne!(a, 0);
          assert_eq!((a * b) % c, 0, "{q:?}");
          assert_eq!((a * b) / c, q.answer);
          mixed_seen += 1;
        }
        Operation::DivideThenMultiply => {
          let (a, b, c) = (q.operands[0], q.operands[1], q.operands[2]);
          assert_eq!(a % b, 0, "{q:?}");
          assert_eq!((a / b) * c, q.answer);
          mixed_seen += 1;
        }
        Operation::Divide => assert_eq!(q.operands[0] % q.operands[1], 0),
        Operation::Multiply => assert_eq!(q.operands[0] * q.operands[1], q.answer),
      }
    }
    assert!(mixed_seen > 0);
  }

  #[test]
  fn repair_makes_remainder_vanish() {
    for a in -30..=30 {
      if a == 0 {
        continue;
      }
      for b in 2..=10 {
        for c in (-10..=10).filter(|&c| c != 0) {
          let fixed = repair_for_exact_division(a, b, c);
          assert_ne!(fixed, 0);
          assert_eq!((fixed * b) % c, 0, "a={a} b={b} c={c} fixed={fixed}");
          assert_eq!(fixed.signum(), a.signum());
        }
      }
    }
  }

  #[test]
  fn sign_pattern_weights_are_roughly_40_40_20() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut counts = [0usize; 3];
    for _ in 0..10_000 {
      match sign_pattern(&mut rng) {
        SignPattern::DoubleNegative => counts[0] += 1,
        SignPattern::SingleNegative => counts[1] += 1,
        SignPattern::Positive => counts[2] += 1,
      }
    }
    assert!((3600..4400).contains(&counts[0]), "{counts:?}");
    assert!((3600..4400).contains(&counts[1]), "{counts:?}");
    assert!((1600..2400).contains(&counts[2]), "{counts:?}");
  }

  #[test]
  fn three_digit_has_no_negatives() {
    let mut rng = StdRng::seed_from_u64(6);
    for _ in 0..300 {
      let p = three_digit(&mut rng);
      assert!(p.operands.iter().all(|&o| o > 0));
      assert!(p.answer > 0);
      if p.operation == Operation::Multiply {
        assert!((100..=999).contains(&p.operands[0]));
        assert!((10..=99).contains(&p.operands[1]));
      }
    }
  }

  #[test]
  fn same_seed_same_quiz() {
    let a = generate_quiz(Tier::Advanced, 5, 4, &mut StdRng::seed_from_u64(42));
    let b = generate_quiz(Tier::Advanced, 5, 4, &mut StdRng::seed_from_u64(42));
    let texts = |qs: &[GeneratedQuestion]| qs.iter().map(|q| (q.question_text.clone(), q.options.clone())).collect::<Vec<_>>();
    assert_eq!(texts(&a), texts(&b));
    assert_eq!(a.len(), 5);
  }
}
