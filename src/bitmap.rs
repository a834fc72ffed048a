use std::collections::btree_map::{self, BTreeMap, Entry};
use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Sub, SubAssign};

use crate::error::SetError;
use crate::interval::IntervalSet;
use crate::source::Source;
use crate::{chunk_base, chunk_split, CHUNK_BITS};

/// A set of non-negative integers stored as sparse bit-packed chunks.
///
/// The backing store maps a chunk index to a word in which bit `b` set
/// means `chunk * CHUNK_BITS + b` is a member. Chunks whose word would
/// become zero are deleted immediately, so the map never holds an empty
/// word and two `BitmapSet`s are equal exactly when their maps are.
///
/// Cheap for scattered individual values: membership, add and discard are
/// one chunk lookup, and same-representation algebra is word-wise per
/// chunk touched.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct BitmapSet {
    chunks: BTreeMap<i64, u64>,
}

/// The word with bits `lo..=hi` set (`hi < CHUNK_BITS`).
#[inline]
fn word_mask(lo: u32, hi: u32) -> u64 {
    debug_assert!(lo <= hi && hi < CHUNK_BITS);
    ((1u64 << (hi - lo + 1)) - 1) << lo
}

/// Reject sources that would add a negative member.
fn check_non_negative(source: &Source<'_>) -> Result<(), SetError> {
    match source.min_value() {
        Some(min) if min < 0 => Err(SetError::NegativeValue(min)),
        _ => Ok(()),
    }
}

impl BitmapSet {
    /// Create a set from any number of value sources.
    ///
    /// Fails if any source can yield a negative value.
    pub fn new<'a, I>(sources: I) -> Result<Self, SetError>
    where
        I: IntoIterator,
        I::Item: Into<Source<'a>>,
    {
        let mut set = Self::default();
        set.update(sources)?;
        Ok(set)
    }

    /// Create a set from inclusive `(start, end)` pairs.
    ///
    /// Fails if any pair reaches below zero. Panics if a pair has
    /// `start > end`.
    pub fn from_ranges<I>(ranges: I) -> Result<Self, SetError>
    where
        I: IntoIterator<Item = (i64, i64)>,
    {
        let mut set = Self::default();
        for (start, end) in ranges {
            assert!(start <= end, "invalid range pair ({start}, {end})");
            if start < 0 {
                return Err(SetError::NegativeValue(start));
            }
            set.insert_span(start, end);
        }
        Ok(set)
    }

    /// Number of members.
    pub fn len(&self) -> u64 {
        self.chunks.values().map(|word| word.count_ones() as u64).sum()
    }

    /// Returns `true` if the set has no members.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The smallest member, or `None` if empty.
    pub fn min(&self) -> Option<i64> {
        self.chunks
            .iter()
            .next()
            .map(|(&chunk, &word)| chunk_base(chunk) + word.trailing_zeros() as i64)
    }

    /// The largest member, or `None` if empty.
    pub fn max(&self) -> Option<i64> {
        self.chunks
            .iter()
            .next_back()
            .map(|(&chunk, &word)| chunk_base(chunk) + (63 - word.leading_zeros()) as i64)
    }

    /// Test whether `value` is a member. Negative values never are.
    pub fn contains(&self, value: i64) -> bool {
        if value < 0 {
            return false;
        }
        let (chunk, bit) = chunk_split(value);
        self.chunks
            .get(&chunk)
            .is_some_and(|word| word & (1 << bit) != 0)
    }

    /// Count how many of the given values are members.
    pub fn count<I>(&self, values: I) -> u64
    where
        I: IntoIterator<Item = i64>,
    {
        values.into_iter().filter(|&v| self.contains(v)).count() as u64
    }

    /// Add a single member. No effect if already present.
    pub fn add(&mut self, value: i64) -> Result<(), SetError> {
        if value < 0 {
            return Err(SetError::NegativeValue(value));
        }
        let (chunk, bit) = chunk_split(value);
        *self.chunks.entry(chunk).or_insert(0) |= 1 << bit;
        Ok(())
    }

    /// Remove a single member if present. No effect otherwise (negative
    /// values are never members, so they are silently ignored).
    pub fn discard(&mut self, value: i64) {
        if value < 0 {
            return;
        }
        let (chunk, bit) = chunk_split(value);
        if let Entry::Occupied(mut entry) = self.chunks.entry(chunk) {
            *entry.get_mut() &= !(1 << bit);
            if *entry.get() == 0 {
                entry.remove();
            }
        }
    }

    /// Remove a member that must be present.
    pub fn remove(&mut self, value: i64) -> Result<(), SetError> {
        if self.contains(value) {
            self.discard(value);
            Ok(())
        } else {
            Err(SetError::MissingMember(value))
        }
    }

    /// Remove and return the smallest member (lowest chunk, lowest bit).
    pub fn pop(&mut self) -> Result<i64, SetError> {
        let mut entry = self.chunks.first_entry().ok_or(SetError::EmptyPop)?;
        let word = *entry.get();
        let bit = word.trailing_zeros();
        let value = chunk_base(*entry.key()) + bit as i64;
        let rest = word & (word - 1);
        if rest == 0 {
            entry.remove();
        } else {
            *entry.get_mut() = rest;
        }
        Ok(value)
    }

    /// Remove all members.
    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    /// Add every member of every source.
    ///
    /// Fails before any mutation if a source can yield a negative value.
    pub fn update<'a, I>(&mut self, others: I) -> Result<(), SetError>
    where
        I: IntoIterator,
        I::Item: Into<Source<'a>>,
    {
        let sources: Vec<Source<'a>> = others.into_iter().map(Into::into).collect();
        for source in &sources {
            source.validate()?;
            check_non_negative(source)?;
        }
        for source in &sources {
            if let Source::Bits(other) = source {
                self.or_with(other);
                continue;
            }
            for span in source.spans()? {
                self.insert_span(span.start, span.end);
            }
        }
        Ok(())
    }

    /// Remove every member of every source.
    ///
    /// Negative values in a source are never members and are ignored.
    pub fn difference_update<'a, I>(&mut self, others: I) -> Result<(), SetError>
    where
        I: IntoIterator,
        I::Item: Into<Source<'a>>,
    {
        let sources: Vec<Source<'a>> = others.into_iter().map(Into::into).collect();
        for source in &sources {
            source.validate()?;
        }
        for source in &sources {
            if let Source::Bits(other) = source {
                self.sub_with(other);
                continue;
            }
            for span in source.spans()? {
                self.remove_span(span.start, span.end);
            }
        }
        Ok(())
    }

    /// Keep only members present in every source.
    ///
    /// Negative values in a source cannot intersect and are ignored.
    pub fn intersection_update<'a, I>(&mut self, others: I) -> Result<(), SetError>
    where
        I: IntoIterator,
        I::Item: Into<Source<'a>>,
    {
        let sources: Vec<Source<'a>> = others.into_iter().map(Into::into).collect();
        for source in &sources {
            source.validate()?;
        }
        for source in &sources {
            if self.chunks.is_empty() {
                break;
            }
            match source {
                Source::Bits(other) => self.and_with(other),
                src => {
                    let other = Self::from_source_clipped(src)?;
                    self.and_with(&other);
                }
            }
        }
        Ok(())
    }

    /// Keep members present in exactly one of `self` and the source.
    ///
    /// Fails before any mutation if the source can yield a negative value.
    pub fn symmetric_difference_update<'a, S>(&mut self, other: S) -> Result<(), SetError>
    where
        S: Into<Source<'a>>,
    {
        let source = other.into();
        source.validate()?;
        check_non_negative(&source)?;
        match &source {
            Source::Bits(other) => self.xor_with(other),
            src => {
                let other = Self::from_source(src)?;
                self.xor_with(&other);
            }
        }
        Ok(())
    }

    /// The union of `self` and every source, as a new set.
    pub fn union<'a, I>(&self, others: I) -> Result<Self, SetError>
    where
        I: IntoIterator,
        I::Item: Into<Source<'a>>,
    {
        let mut out = self.clone();
        out.update(others)?;
        Ok(out)
    }

    /// The intersection of `self` and every source, as a new set.
    pub fn intersection<'a, I>(&self, others: I) -> Result<Self, SetError>
    where
        I: IntoIterator,
        I::Item: Into<Source<'a>>,
    {
        let mut out = self.clone();
        out.intersection_update(others)?;
        Ok(out)
    }

    /// The members of `self` not in any source, as a new set.
    pub fn difference<'a, I>(&self, others: I) -> Result<Self, SetError>
    where
        I: IntoIterator,
        I::Item: Into<Source<'a>>,
    {
        let mut out = self.clone();
        out.difference_update(others)?;
        Ok(out)
    }

    /// The members in exactly one of `self` and the source, as a new set.
    pub fn symmetric_difference<'a, S>(&self, other: S) -> Result<Self, SetError>
    where
        S: Into<Source<'a>>,
    {
        let mut out = self.clone();
        out.symmetric_difference_update(other)?;
        Ok(out)
    }

    /// Returns `true` if `self` and `other` share no member.
    pub fn isdisjoint(&self, other: &BitmapSet) -> bool {
        let (small, large) = if self.chunks.len() <= other.chunks.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .chunks
            .iter()
            .all(|(chunk, &word)| large.chunks.get(chunk).copied().unwrap_or(0) & word == 0)
    }

    /// Returns `true` if every member of `self` is in `other`.
    pub fn issubset(&self, other: &BitmapSet) -> bool {
        self.chunks
            .iter()
            .all(|(chunk, &word)| other.chunks.get(chunk).copied().unwrap_or(0) & word == word)
    }

    /// Returns `true` if every member of `other` is in `self`.
    pub fn issuperset(&self, other: &BitmapSet) -> bool {
        other.issubset(self)
    }

    /// Iterate over members in ascending order: increasing chunk key,
    /// then increasing bit index within each chunk word.
    pub fn iter(&self) -> BitmapIter<'_> {
        BitmapIter {
            chunks: self.chunks.iter(),
            base: 0,
            word: 0,
        }
    }

    /// Iterate over the stored `(chunk index, word)` pairs.
    ///
    /// Every yielded word is non-zero.
    pub fn chunks(&self) -> ChunkIter<'_> {
        ChunkIter(self.chunks.iter())
    }

    /// Set every bit in the inclusive run `[start, end]`, whole chunks at
    /// a time.
    pub(crate) fn insert_span(&mut self, start: i64, end: i64) {
        debug_assert!(0 <= start && start <= end);
        let mut value = start;
        while value <= end {
            let (chunk, lo) = chunk_split(value);
            let chunk_last = chunk_base(chunk) + (CHUNK_BITS as i64 - 1);
            let span_last = chunk_last.min(end);
            let hi = (span_last - chunk_base(chunk)) as u32;
            *self.chunks.entry(chunk).or_insert(0) |= word_mask(lo, hi);
            value = span_last + 1;
        }
    }

    /// Clear every bit in the inclusive run `[start, end]`, dropping
    /// emptied chunks. The run is clipped to the non-negative domain.
    fn remove_span(&mut self, start: i64, end: i64) {
        let start = start.max(0);
        if end < start {
            return;
        }
        let mut value = start;
        while value <= end {
            let (chunk, lo) = chunk_split(value);
            let chunk_last = chunk_base(chunk) + (CHUNK_BITS as i64 - 1);
            let span_last = chunk_last.min(end);
            let hi = (span_last - chunk_base(chunk)) as u32;
            if let Entry::Occupied(mut entry) = self.chunks.entry(chunk) {
                *entry.get_mut() &= !word_mask(lo, hi);
                if *entry.get() == 0 {
                    entry.remove();
                }
            }
            value = span_last + 1;
        }
    }

    /// Build a set from one normalized source. The source must already be
    /// known non-negative.
    fn from_source(source: &Source<'_>) -> Result<Self, SetError> {
        let mut set = Self::default();
        for span in source.spans()? {
            set.insert_span(span.start, span.end);
        }
        Ok(set)
    }

    /// Build a set from one normalized source, silently dropping the
    /// negative part of each span.
    fn from_source_clipped(source: &Source<'_>) -> Result<Self, SetError> {
        let mut set = Self::default();
        for span in source.spans()? {
            let start = span.start.max(0);
            if span.end >= start {
                set.insert_span(start, span.end);
            }
        }
        Ok(set)
    }

    /// Build a set from an interval set, dropping negative members.
    fn clipped_from(set: &IntervalSet) -> Self {
        let mut out = Self::default();
        for (start, end) in set.runs() {
            let start = start.max(0);
            if end >= start {
                out.insert_span(start, end);
            }
        }
        out
    }

    /// In-place union, word-wise.
    fn or_with(&mut self, other: &BitmapSet) {
        for (&chunk, &word) in &other.chunks {
            *self.chunks.entry(chunk).or_insert(0) |= word;
        }
    }

    /// In-place intersection, word-wise, dropping emptied chunks.
    fn and_with(&mut self, other: &BitmapSet) {
        self.chunks.retain(|chunk, word| {
            *word &= other.chunks.get(chunk).copied().unwrap_or(0);
            *word != 0
        });
    }

    /// In-place difference, word-wise AND-NOT, dropping emptied chunks.
    fn sub_with(&mut self, other: &BitmapSet) {
        for (&chunk, &word) in &other.chunks {
            if let Entry::Occupied(mut entry) = self.chunks.entry(chunk) {
                *entry.get_mut() &= !word;
                if *entry.get() == 0 {
                    entry.remove();
                }
            }
        }
    }

    /// In-place symmetric difference, word-wise XOR, dropping emptied
    /// chunks (identical words cancel to zero).
    fn xor_with(&mut self, other: &BitmapSet) {
        for (&chunk, &word) in &other.chunks {
            match self.chunks.entry(chunk) {
                Entry::Occupied(mut entry) => {
                    *entry.get_mut() ^= word;
                    if *entry.get() == 0 {
                        entry.remove();
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(word);
                }
            }
        }
    }
}

/// Iterator over the members of a [`BitmapSet`] in ascending order.
pub struct BitmapIter<'a> {
    chunks: btree_map::Iter<'a, i64, u64>,
    base: i64,
    /// Remaining set bits of the current chunk word.
    word: u64,
}

impl Iterator for BitmapIter<'_> {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        loop {
            if self.word != 0 {
                let bit = self.word.trailing_zeros();
                self.word &= self.word - 1; // clear lowest set bit
                return Some(self.base + bit as i64);
            }
            let (&chunk, &word) = self.chunks.next()?;
            self.base = chunk_base(chunk);
            self.word = word;
        }
    }
}

impl<'a> IntoIterator for &'a BitmapSet {
    type Item = i64;
    type IntoIter = BitmapIter<'a>;

    fn into_iter(self) -> BitmapIter<'a> {
        self.iter()
    }
}

/// Iterator over the `(chunk index, word)` pairs of a [`BitmapSet`].
pub struct ChunkIter<'a>(btree_map::Iter<'a, i64, u64>);

impl Iterator for ChunkIter<'_> {
    type Item = (i64, u64);

    fn next(&mut self) -> Option<(i64, u64)> {
        self.0.next().map(|(&chunk, &word)| (chunk, word))
    }
}

impl fmt::Display for BitmapSet {
    /// Same run notation as [`IntervalSet`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        IntervalSet::from(self).fmt(f)
    }
}

/// Subset partial order: `a < b` iff `a` is a proper subset of `b`.
/// Incomparable sets (neither contains the other) compare as `None`.
impl PartialOrd for BitmapSet {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        if self == other {
            Some(std::cmp::Ordering::Equal)
        } else if self.issubset(other) {
            Some(std::cmp::Ordering::Less)
        } else if self.issuperset(other) {
            Some(std::cmp::Ordering::Greater)
        } else {
            None
        }
    }
}

/// Membership + cardinality equality against the interval representation.
impl PartialEq<IntervalSet> for BitmapSet {
    fn eq(&self, other: &IntervalSet) -> bool {
        self.len() == other.len() && self.iter().all(|v| other.contains(v))
    }
}

impl TryFrom<&IntervalSet> for BitmapSet {
    type Error = SetError;

    /// Exact conversion; fails if the interval set holds a negative member.
    fn try_from(set: &IntervalSet) -> Result<Self, SetError> {
        if let Some(min) = set.min() {
            if min < 0 {
                return Err(SetError::NegativeValue(min));
            }
        }
        let mut out = Self::default();
        for (start, end) in set.runs() {
            out.insert_span(start, end);
        }
        Ok(out)
    }
}

impl BitOr for &BitmapSet {
    type Output = BitmapSet;

    fn bitor(self, rhs: Self) -> BitmapSet {
        let mut out = self.clone();
        out.or_with(rhs);
        out
    }
}

impl BitAnd for &BitmapSet {
    type Output = BitmapSet;

    fn bitand(self, rhs: Self) -> BitmapSet {
        let mut out = self.clone();
        out.and_with(rhs);
        out
    }
}

impl Sub for &BitmapSet {
    type Output = BitmapSet;

    fn sub(self, rhs: Self) -> BitmapSet {
        let mut out = self.clone();
        out.sub_with(rhs);
        out
    }
}

impl BitXor for &BitmapSet {
    type Output = BitmapSet;

    fn bitxor(self, rhs: Self) -> BitmapSet {
        let mut out = self.clone();
        out.xor_with(rhs);
        out
    }
}

impl BitOrAssign<&BitmapSet> for BitmapSet {
    fn bitor_assign(&mut self, rhs: &BitmapSet) {
        self.or_with(rhs);
    }
}

impl BitAndAssign<&BitmapSet> for BitmapSet {
    fn bitand_assign(&mut self, rhs: &BitmapSet) {
        self.and_with(rhs);
    }
}

impl SubAssign<&BitmapSet> for BitmapSet {
    fn sub_assign(&mut self, rhs: &BitmapSet) {
        self.sub_with(rhs);
    }
}

impl BitXorAssign<&BitmapSet> for BitmapSet {
    fn bitxor_assign(&mut self, rhs: &BitmapSet) {
        self.xor_with(rhs);
    }
}

// Mixed-representation operators: the interval operand is converted into
// bitmap form first. Only intersection and difference are offered here —
// the result of either is a subset of `self`, so negative interval
// members can be clipped away without changing it. Union and symmetric
// difference with an interval operand can require negative members in the
// result and go through the fallible named methods instead.

impl BitAnd<&IntervalSet> for &BitmapSet {
    type Output = BitmapSet;

    fn bitand(self, rhs: &IntervalSet) -> BitmapSet {
        let mut out = self.clone();
        out.and_with(&BitmapSet::clipped_from(rhs));
        out
    }
}

impl Sub<&IntervalSet> for &BitmapSet {
    type Output = BitmapSet;

    fn sub(self, rhs: &IntervalSet) -> BitmapSet {
        let mut out = self.clone();
        out.sub_with(&BitmapSet::clipped_from(rhs));
        out
    }
}
