//! Deriving a pool capacity from the host's parallelism and a relative weight.

/// Number of logical CPUs reported by the host at the time of the call.
pub fn hardware_parallelism() -> usize {
  num_cpus::get()
}

/// Named weights relative to [`hardware_parallelism`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
  /// As many concurrent jobs as the pool can represent.
  Maximum,
  /// Eight jobs per logical CPU.
  High,
  /// One job per logical CPU.
  Normal,
  /// One job per four logical CPUs.
  Low,
}

impl Preset {
  /// The `(numerator, denominator)` weight of this preset, or `None` for
  /// [`Preset::Maximum`], which is not relative to the host.
  pub fn ratio(self) -> Option<(usize, usize)> {
    match self {
      Preset::Maximum => None,
      Preset::High => Some((8, 1)),
      Preset::Normal => Some((1, 1)),
      Preset::Low => Some((1, 4)),
    }
  }
}

/// The maximum number of jobs a pool runs at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(usize);

impl Priority {
  pub const MAXIMUM: Priority = Priority(u32::MAX as usize);

  /// `max(1, floor(hardware_parallelism() * num / den))`.
  pub fn rational(num: usize, den: usize) -> Self {
    Self::from_parallelism(hardware_parallelism(), num, den)
  }

  /// Same as [`Priority::rational`] with an explicit parallelism.
  ///
  /// The product saturates at [`Priority::MAXIMUM`]; a zero denominator is
  /// treated as one.
  pub fn from_parallelism(parallelism: usize, num: usize, den: usize) -> Self {
    let scaled = parallelism.saturating_mul(num) / den.max(1);
    Priority(scaled.clamp(1, Self::MAXIMUM.0))
  }

  pub fn from_preset(preset: Preset) -> Self {
    match preset.ratio() {
      Some((num, den)) => Self::rational(num, den),
      None => Self::MAXIMUM,
    }
  }

  pub fn capacity(self) -> usize {
    self.0
  }
}

impl Default for Priority {
  fn default() -> Self {
    Self::from_preset(Preset::Normal)
  }
}

impl From<Preset> for Priority {
  fn from(preset: Preset) -> Self {
    Self::from_preset(preset)
  }
}

/// A raw capacity. Zero is kept as-is here and clamped by the pool.
impl From<usize> for Priority {
  fn from(capacity: usize) -> Self {
    Priority(capacity)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_rational_scales_parallelism() {
    assert_eq!(Priority::from_parallelism(4, 8, 1).capacity(), 32);
    assert_eq!(Priority::from_parallelism(4, 1, 1).capacity(), 4);
    assert_eq!(Priority::from_parallelism(4, 1, 4).capacity(), 1);
    assert_eq!(Priority::from_parallelism(6, 1, 4).capacity(), 1);
    assert_eq!(Priority::from_parallelism(16, 1, 4).capacity(), 4);
  }

  #[test]
  fn test_rational_clamps_up_to_one() {
    assert_eq!(Priority::from_parallelism(4, 1, 100).capacity(), 1);
    assert_eq!(Priority::from_parallelism(4, 0, 1).capacity(), 1);
  }

  #[test]
  fn test_zero_denominator_treated_as_one() {
    assert_eq!(Priority::from_parallelism(4, 2, 0).capacity(), 8);
  }

  #[test]
  fn test_overflow_saturates_at_maximum() {
    assert_eq!(Priority::from_parallelism(usize::MAX, 8, 1), Priority::MAXIMUM);
  }

  #[test]
  fn test_presets_resolve_through_ratio() {
    let cpus = hardware_parallelism();
    assert_eq!(Priority::from(Preset::Normal).capacity(), cpus.max(1));
    assert_eq!(Priority::from(Preset::High).capacity(), (cpus * 8).max(1));
    assert_eq!(Priority::from(Preset::Low).capacity(), (cpus / 4).max(1));
    assert_eq!(Priority::from(Preset::Maximum), Priority::MAXIMUM);
    assert_eq!(Priority::default(), Priority::from(Preset::Normal));
  }
}
