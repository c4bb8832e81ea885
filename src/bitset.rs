use std::fmt::{self, Debug, Formatter};

type BitBlock = u64;

const BLOCK_NBITS: usize = std::mem::size_of::<BitBlock>() * 8;

#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct BitSet {
  slice: Box<[BitBlock]>,
}

impl BitSet {
  pub(crate) fn new(num_bits: usize) -> Self {
    let len = (num_bits + BLOCK_NBITS - 1) / BLOCK_NBITS;
    Self {
      slice: vec![0; len].into_boxed_slice(),
    }
  }

  pub(crate) fn insert(&mut self, bit: usize) {
    self.slice[bit / BLOCK_NBITS] |=
      1 << (bit as u64 % BLOCK_NBITS as u64);
  }

  pub(crate) fn contains(&self, bit: usize) -> bool {
    self.slice[bit / BLOCK_NBITS] &
      1 << (bit as u64 % BLOCK_NBITS as u64) != 0
  }

  /// Returns whether the set has changed.
  pub(crate) fn union_with(&mut self, other: &BitSet) -> bool {
    let mut changed = false;
    for i in 0..self.slice.len() {
      let old = self.slice[i];
      self.slice[i] |= other.slice[i];
      changed |= old != self.slice[i];
    }
    changed
  }

  pub(crate) fn intersects(&self, other: &BitSet) -> bool {
    self.slice.iter()
      .zip(other.slice.iter())
      .any(|(x, y)| x & y != 0)
  }

  pub(crate) fn iter(&self) -> Iter {
    Iter {
      slice: &*self.slice,
      bit: 0,
      index: 0,
    }
  }
}

pub(crate) struct Iter<'a> {
  slice: &'a [BitBlock],
  bit: usize,
  index: usize,
}

impl<'a> Iterator for Iter<'a> {
  type Item = usize;

  fn next(&mut self) -> Option<usize> {
    while self.index < self.slice.len() {
      if self.bit < BLOCK_NBITS {
        let bit = (self.slice[self.index] & !((1 << self.bit) - 1))
          .trailing_zeros() as usize;
        if bit < BLOCK_NBITS {
          self.bit = bit + 1;
          return Some(self.index * BLOCK_NBITS + bit);
        }
      }

      self.index += 1;
      self.bit = 0;
    }
    None
  }
}

impl Debug for BitSet {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    f.debug_set().entries(self.iter()).finish()
  }
}
