//! Complex-number questions (sections 1 and 2) with string options.
//!
//! Unlike the integer generators, answers here are rendered strings such as
//! `3 - 2i`, so distractors are built from typical mistakes and then repaired
//! until all four options are distinct.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

const WRONG_OPTIONS: usize = 3;
const MAX_REPAIR_ATTEMPTS: usize = 100;

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Section {
  /// The basics: the imaginary unit, real and imaginary parts.
  Section1,
  /// Operating with complex numbers: add, subtract, multiply.
  Section2,
}

impl Section {
  pub fn from_str(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "section1" => Some(Self::Section1),
      "section2" => Some(Self::Section2),
      _ => None,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Complex {
  pub re: i64,
  pub im: i64,
}

impl Complex {
  pub fn new(re: i64, im: i64) -> Self {
    Self { re, im }
  }

  pub fn add(self, o: Complex) -> Complex {
    Complex::new(self.re + o.re, self.im + o.im)
  }

  pub fn sub(self, o: Complex) -> Complex {
    Complex::new(self.re - o.re, self.im - o.im)
  }

  pub fn mul(self, o: Complex) -> Complex {
    Complex::new(self.re * o.re - self.im * o.im, self.re * o.im + self.im * o.re)
  }
}

impl fmt::Display for Complex {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.im >= 0 {
      write!(f, "{} + {}i", self.re, self.im)
    } else {
      write!(f, "{} - {}i", self.re, self.im.abs())
    }
  }
}

/// An answer value that can be nudged to produce another plausible option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Answer {
  Real(i64),
  Complex(Complex),
}

impl Answer {
  fn render(&self) -> String {
    match self {
      Self::Real(n) => n.to_string(),
      Self::Complex(z) => z.to_string(),
    }
  }

  fn perturbed<R: Rng + ?Sized>(&self, rng: &mut R) -> Answer {
    const NUDGES: [i64; 4] = [-2, -1, 1, 2];
    let nudge = |rng: &mut R| *NUDGES.choose(rng).unwrap_or(&1);
    match *self {
      Self::Real(n) => Self::Real(n + nudge(rng)),
      Self::Complex(z) => Self::Complex(Complex::new(z.re + nudge(rng), z.im + nudge(rng))),
    }
  }

  /// Deterministic `k`-th neighbour, used once random nudging gives up.
  fn shifted(&self, k: i64) -> Answer {
    match *self {
      Self::Real(n) => Self::Real(n + k),
      Self::Complex(z) => Self::Complex(Complex::new(z.re + k, z.im)),
    }
  }
}

#[derive(Clone, Debug, Serialize)]
pub struct ChoiceQuestion {
  pub section: Section,
  pub question_text: String,
  pub options: Vec<String>,
  pub correct_index: usize,
  pub explanation: String,
}

pub fn generate_complex_question<R: Rng + ?Sized>(section: Section, rng: &mut R) -> ChoiceQuestion {
  match section {
    Section::Section1 => section1(rng),
    Section::Section2 => section2(rng),
  }
}

fn section1<R: Rng + ?Sized>(rng: &mut R) -> ChoiceQuestion {
  match rng.gen_range(0..4) {
    0 => {
      let n: i64 = rng.gen_range(2..=20);
      let answer = format!("i√{}", n);
      let wrong = vec![format!("-i√{}", n), format!("√{}", n), format!("-√{}", n)];
      assemble(
        rng,
        Section::Section1,
        format!("Simplify √(-{}).", n),
        answer,
        wrong,
        format!("√(-{0}) = √(-1) × √{0} = i√{0}", n),
      )
    }
    1 => {
      let n: u32 = rng.gen_range(2..=12);
      let answer = match n % 4 {
        0 => "1",
        1 => "i",
        2 => "-1",
        _ => "-i",
      };
      let wrong = ["1", "i", "-1", "-i"].iter().filter(|o| **o != answer).map(|o| o.to_string()).collect();
      assemble(
        rng,
        Section::Section1,
        format!("What is i^{}?", n),
        answer.to_string(),
        wrong,
        format!("Powers of i repeat every 4: i^{} = i^{} = {}", n, n % 4, answer),
      )
    }
    k => {
      let a = rng.gen_range(-9..=9);
      let drawn = rng.gen_range(-9..=9);
      let b = if drawn == 0 { rng.gen_range(1..=3) } else { drawn };
      let z = Complex::new(a, b);
      let (part, correct, wrong) = if k == 2 {
        ("real", a, vec![b, a.abs(), a + b])
      } else {
        ("imaginary", b, vec![a, b.abs(), a + b])
      };
      let wrong = ensure_unique_options(rng, Answer::Real(correct), wrong.into_iter().map(Answer::Real).collect());
      assemble(
        rng,
        Section::Section1,
        format!("For the complex number {}, what is the {} part?", z, part),
        correct.to_string(),
        wrong,
        format!("In a + bi the real part is a and the imaginary part is b; here the {} part is {}.", part, correct),
      )
    }
  }
}

fn section2<R: Rng + ?Sized>(rng: &mut R) -> ChoiceQuestion {
  let z1 = Complex::new(rng.gen_range(-9..=9), rng.gen_range(-9..=9));
  let z2 = Complex::new(rng.gen_range(-9..=9), rng.gen_range(-9..=9));

  let (symbol, result, wrong, explanation) = match rng.gen_range(0..3) {
    0 => {
      let r = z1.add(z2);
      let wrong = vec![Complex::new(r.re + 1, r.im), Complex::new(r.re, r.im + 1), Complex::new(r.re - 1, r.im - 1)];
      let exp = format!("Add real parts: {} + {} = {}. Add imaginary parts: {} + {} = {}. Result: {}", z1.re, z2.re, r.re, z1.im, z2.im, r.im, r);
      ("+", r, wrong, exp)
    }
    1 => {
      let r = z1.sub(z2);
      // Adding instead of subtracting is the classic slip.
      let wrong = vec![Complex::new(r.re + 1, r.im), Complex::new(r.re, r.im + 1), z1.add(z2)];
      let exp = format!("Subtract real parts: {} - {} = {}. Subtract imaginary parts: {} - {} = {}. Result: {}", z1.re, z2.re, r.re, z1.im, z2.im, r.im, r);
      ("-", r, wrong, exp)
    }
    _ => {
      let r = z1.mul(z2);
      let wrong = vec![
        // forgot i² = -1
        Complex::new(z1.re * z2.re + z1.im * z2.im, r.im),
        Complex::new(z1.re * z2.re, z1.im * z2.im),
        Complex::new(r.re, z1.re * z2.im - z1.im * z2.re),
      ];
      let exp = format!("Expand and use i² = -1: ({})({}) = {}", z1, z2, r);
      ("×", r, wrong, exp)
    }
  };

  let wrong = ensure_unique_options(rng, Answer::Complex(result), wrong.into_iter().map(Answer::Complex).collect());
  assemble(rng, Section::Section2, format!("Simplify: ({}) {} ({})", z1, symbol, z2), result.to_string(), wrong, explanation)
}

/// Return exactly three wrong answers that differ from `correct` and from each other.
/// Duplicates are replaced by nudged copies of the correct answer.
fn ensure_unique_options<R: Rng + ?Sized>(rng: &mut R, correct: Answer, wrong: Vec<Answer>) -> Vec<String> {
  let correct_str = correct.render();
  let mut unique: Vec<String> = Vec::with_capacity(WRONG_OPTIONS);
  for w in wrong {
    let s = w.render();
    if s != correct_str && !unique.contains(&s) && unique.len() < WRONG_OPTIONS {
      unique.push(s);
    }
  }

  let mut attempts = 0;
  let mut k = 3;
  while unique.len() < WRONG_OPTIONS {
    let candidate = if attempts < MAX_REPAIR_ATTEMPTS {
      attempts += 1;
      correct.perturbed(rng)
    } else {
      k += 1;
      correct.shifted(k)
    };
    let s = candidate.render();
    if s != correct_str && !unique.contains(&s) {
      unique.push(s);
    }
  }
  if attempts > 0 {
    debug!(target: "generator", correct = %correct_str, attempts, "Repaired duplicate complex-number options");
  }
  unique
}

fn assemble<R: Rng + ?Sized>(
  rng: &mut R,
  section: Section,
  question_text: String,
  answer: String,
  wrong: Vec<String>,
  explanation: String,
) -> ChoiceQuestion {
  let mut options = Vec::with_capacity(wrong.len() + 1);
  options.push(answer.clone());
  options.extend(wrong);
  options.shuffle(rng);
  let correct_index = options.iter().position(|o| *o == answer).unwrap_or(0);
  ChoiceQuestion { section, question_text, options, correct_index, explanation }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use std::collections::HashSet;

  #[test]
  fn display_uses_sign_of_imaginary_part() {
    assert_eq!(Complex::new(3, -2).to_string(), "3 - 2i");
    assert_eq!(Complex::new(-1, 0).to_string(), "-1 + 0i");
    assert_eq!(Complex::new(2, 3).mul(Complex::new(4, -1)), Complex::new(11, 10));
  }

  #[test]
  fn every_question_has_four_unique_options() {
    let mut rng = StdRng::seed_from_u64(21);
    for section in [Section::Section1, Section::Section2] {
      for _ in 0..500 {
        let q = generate_complex_question(section, &mut rng);
        assert_eq!(q.options.len(), 4, "{q:?}");
        let distinct: HashSet<_> = q.options.iter().collect();
        assert_eq!(distinct.len(), 4, "{q:?}");
        assert!(q.correct_index < 4);
      }
    }
  }

  #[test]
  fn duplicate_distractors_are_repaired() {
    let mut rng = StdRng::seed_from_u64(8);
    // real part of 3 + 3i: b, |a| and a all collide with the answer.
    let wrong = ensure_unique_options(&mut rng, Answer::Real(3), vec![Answer::Real(3), Answer::Real(3), Answer::Real(6)]);
    assert_eq!(wrong.len(), 3);
    assert!(!wrong.contains(&"3".to_string()));
    assert!(wrong.contains(&"6".to_string()));
    let distinct: HashSet<_> = wrong.iter().collect();
    assert_eq!(distinct.len(), 3);
  }

  #[test]
  fn correct_index_points_at_a_valid_sum() {
    let mut rng = StdRng::seed_from_u64(9);
    for _ in 0..200 {
      let q = generate_complex_question(Section::Section2, &mut rng);
      let chosen = &q.options[q.correct_index];
      assert!(q.explanation.contains(chosen.as_str()), "{q:?}");
    }
  }

  #[test]
  fn section_parsing() {
    assert_eq!(Section::from_str("Section2"), Some(Section::Section2));
    assert_eq!(Section::from_str("section4"), None);
  }
}
