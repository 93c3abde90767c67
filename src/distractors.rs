//! Multiple-choice option generation around a correct integer answer.
//!
//! Random offsets first (bounded by `MAX_RANDOM_ATTEMPTS`), then a fixed
//! "common mistakes" offset walk so the result is always full. The final list
//! is shuffled; the position of the correct answer must not be predictable.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

pub const DEFAULT_OPTION_COUNT: usize = 4;

const MAX_RANDOM_ATTEMPTS: usize = 100;
const FALLBACK_OFFSETS: [i64; 8] = [1, -1, 2, -2, 5, -5, 10, -10];
const FALLBACK_OFFSETS_NON_POSITIVE: [i64; 4] = [1, -1, 2, -2];

/// Return exactly `count` distinct integers, one of which is `correct`, in random order.
///
/// `range_size` bounds the random offsets (`[-range_size, range_size]`, zero excluded).
/// With `allow_negative == false` negative candidates are folded to their absolute value.
/// Zero is never offered as a distractor unless `correct` itself is zero.
/// A `count` of zero is treated as one (the correct answer alone).
pub fn generate_options<R: Rng + ?Sized>(
  rng: &mut R,
  correct: i64,
  count: usize,
  range_size: i64,
  allow_negative: bool,
) -> Vec<i64> {
  let count = count.max(1);
  let range_size = range_size.abs();
  let mut options = Vec::with_capacity(count);
  options.push(correct);

  let mut attempts = 0;
  while options.len() < count && attempts < MAX_RANDOM_ATTEMPTS && range_size > 0 {
    attempts += 1;

    let mut offset = rng.gen_range(-range_size..=range_size);
    if offset == 0 {
      let sign = if rng.gen_bool(0.5) { 1 } else { -1 };
      offset = sign * rng.gen_range(1..=range_size);
    }

    let mut candidate = correct + offset;
    if !allow_negative && candidate < 0 {
      candidate = candidate.abs();
    }

    if !options.contains(&candidate) && (candidate != 0 || correct == 0) {
      options.push(candidate);
    }
  }

  if options.len() < count {
    debug!(target: "generator", correct, count, range_size, found = options.len(), "Random distractors exhausted; using fallback offsets");
    fill_with_fallback(&mut options, correct, count);
  }

  options.shuffle(rng);
  options
}

/// Deterministic offset walk: the fixed offsets, then their multiples, until full.
fn fill_with_fallback(options: &mut Vec<i64>, correct: i64, count: usize) {
  let offsets: &[i64] = if correct > 0 { &FALLBACK_OFFSETS } else { &FALLBACK_OFFSETS_NON_POSITIVE };
  let mut multiple = 1;
  while options.len() < count {
    for off in offsets {
      if options.len() >= count {
        break;
      }
      let wrong = correct + off * multiple;
      if !options.contains(&wrong) {
        options.push(wrong);
      }
    }
    multiple += 1;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use std::collections::HashSet;

  fn assert_well_formed(options: &[i64], correct: i64, count: usize) {
    assert_eq!(options.len(), count, "options={options:?}");
    let distinct: HashSet<_> = options.iter().collect();
    assert_eq!(distinct.len(), count, "duplicates in {options:?}");
    assert!(options.contains(&correct), "{correct} missing from {options:?}");
  }

  #[test]
  fn always_returns_count_distinct_options_with_correct() {
    let mut rng = StdRng::seed_from_u64(7);
    for correct in [-250, -12, -1, 0, 1, 3, 42, 999] {
      for count in [1, 2, 4, 6, 12] {
        for range_size in [0, 1, 2, 10, 50] {
          for allow_negative in [false, true] {
            let opts = generate_options(&mut rng, correct, count, range_size, allow_negative);
            assert_well_formed(&opts, correct, count);
          }
        }
      }
    }
  }

  #[test]
  fn degenerate_range_still_terminates() {
    let mut rng = StdRng::seed_from_u64(1);
    // Only one non-zero offset exists in [-1, 1] for a non-negative-only small answer.
    let opts = generate_options(&mut rng, 1, 4, 1, false);
    assert_well_formed(&opts, 1, 4);
    let opts = generate_options(&mut rng, 0, 10, 0, false);
    assert_well_formed(&opts, 0, 10);
  }

  #[test]
  fn no_negatives_or_zero_when_disallowed() {
    let mut rng = StdRng::seed_from_u64(99);
    for correct in 1..=100 {
      let opts = generate_options(&mut rng, correct, DEFAULT_OPTION_COUNT, 10, false);
      assert_well_formed(&opts, correct, DEFAULT_OPTION_COUNT);
      assert!(opts.iter().all(|&o| o > 0), "{opts:?}");
    }
  }

  #[test]
  fn correct_answer_position_varies() {
    let mut rng = StdRng::seed_from_u64(2024);
    let mut positions = HashSet::new();
    for _ in 0..200 {
      let opts = generate_options(&mut rng, 36, 4, 10, false);
      positions.insert(opts.iter().position(|&o| o == 36).unwrap_or(usize::MAX));
    }
    assert_eq!(positions.len(), 4, "correct answer should land in every slot");
  }

  #[test]
  fn fallback_walk_prefers_common_mistakes() {
    let mut opts = vec![5];
    fill_with_fallback(&mut opts, 5, 4);
    assert_eq!(opts, vec![5, 6, 4, 7]);
    let mut opts = vec![-3];
    fill_with_fallback(&mut opts, -3, 6);
    // Second pass uses doubled offsets: -1 and -5 repeat, +4 lands on 1.
    assert_eq!(opts, vec![-3, -2, -4, -1, -5, 1]);
  }
}
