use std::hash::Hash;
use std::hash::Hasher;

/// Deterministic 64-bit FNV-1a hasher, stable across runs and platforms.
struct StableHasher(u64);

impl StableHasher {
  const OFFSET: u64 = 0xcbf29ce484222325;
  const PRIME: u64 = 0x100000001b3;

  fn new() -> Self {
    StableHasher(Self::OFFSET)
  }
}

impl Hasher for StableHasher {
  fn finish(&self) -> u64 {
    self.0
  }

  fn write(&mut self, bytes: &[u8]) {
    for b in bytes {
      self.0 ^= *b as u64;
      self.0 = self.0.wrapping_mul(Self::PRIME);
    }
  }
}

/// Content hash used for module identity, bundle keys and namespaces.
pub fn stable_hash<T: Hash + ?Sized>(value: &T) -> u64 {
  let mut hasher = StableHasher::new();
  value.hash(&mut hasher);
  hasher.finish()
}

pub fn to_base36(mut value: u64) -> String {
  const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
  let mut out = Vec::new();
  loop {
    out.push(DIGITS[(value % 36) as usize]);
    value /= 36;
    if value == 0 {
      break;
    }
  }
  out.reverse();
  out.into_iter().map(char::from).collect()
}
