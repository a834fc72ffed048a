use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Sub, SubAssign};

use crate::bitmap::BitmapSet;
use crate::error::SetError;
use crate::source::Source;

/// A set of integers stored as sorted, disjoint, non-adjacent closed
/// intervals.
///
/// The backing store is a flat even-length array read as `(start, end)`
/// pairs with `start <= end`, ordered so that consecutive pairs satisfy
/// `end + 1 < next_start`. Merging is eager: inserting a value or run that
/// touches existing intervals collapses them immediately, so the array is
/// canonical — two `IntervalSet`s are equal exactly when their arrays are.
///
/// Cheap for sets made of large contiguous runs: membership is a binary
/// search over interval bounds, and a run of any length costs one pair.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct IntervalSet {
    runs: Vec<i64>,
}

impl IntervalSet {
    /// Create a set from any number of value sources.
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
    /// The pairs may overlap or arrive in any order; they are merged into
    /// canonical form. Panics if a pair has `start > end`.
    pub fn from_ranges<I>(ranges: I) -> Self
    where
        I: IntoIterator<Item = (i64, i64)>,
    {
        let mut set = Self::default();
        for (start, end) in ranges {
            assert!(start <= end, "invalid range pair ({start}, {end})");
            set.insert_run(start, end);
        }
        set
    }

    /// Number of members.
    pub fn len(&self) -> u64 {
        self.runs()
            .map(|(start, end)| (end - start) as u64 + 1)
            .sum()
    }

    /// Returns `true` if the set has no members.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// The smallest member, or `None` if empty.
    pub fn min(&self) -> Option<i64> {
        self.runs.first().copied()
    }

    /// The largest member, or `None` if empty.
    pub fn max(&self) -> Option<i64> {
        self.runs.last().copied()
    }

    /// Test whether `value` is a member.
    pub fn contains(&self, value: i64) -> bool {
        self.search(value).0
    }

    /// Count how many of the given values are members.
    pub fn count<I>(&self, values: I) -> u64
    where
        I: IntoIterator<Item = i64>,
    {
        values.into_iter().filter(|&v| self.contains(v)).count() as u64
    }

    /// Add a single member. No effect if already present.
    pub fn add(&mut self, value: i64) {
        self.insert_run(value, value);
    }

    /// Remove a single member if present. No effect otherwise.
    pub fn discard(&mut self, value: i64) {
        self.remove_run(value, value);
    }

    /// Remove a member that must be present.
    pub fn remove(&mut self, value: i64) -> Result<(), SetError> {
        if self.contains(value) {
            self.remove_run(value, value);
            Ok(())
        } else {
            Err(SetError::MissingMember(value))
        }
    }

    /// Remove and return the smallest member.
    pub fn pop(&mut self) -> Result<i64, SetError> {
        if self.runs.is_empty() {
            return Err(SetError::EmptyPop);
        }
        let value = self.runs[0];
        if self.runs[0] < self.runs[1] {
            self.runs[0] += 1;
        } else {
            self.runs.drain(0..2);
        }
        Ok(value)
    }

    /// Remove all members.
    pub fn clear(&mut self) {
        self.runs.clear();
    }

    /// Add every member of every source.
    pub fn update<'a, I>(&mut self, others: I) -> Result<(), SetError>
    where
        I: IntoIterator,
        I::Item: Into<Source<'a>>,
    {
        let sources: Vec<Source<'a>> = others.into_iter().map(Into::into).collect();
        for source in &sources {
            source.validate()?;
        }
        for source in &sources {
            if let Source::Intervals(other) = source {
                if self.runs.is_empty() {
                    self.runs = other.runs.clone();
                    continue;
                }
            }
            for span in source.spans()? {
                self.insert_run(span.start, span.end);
            }
        }
        Ok(())
    }

    /// Remove every member of every source.
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
            for span in source.spans()? {
                self.remove_run(span.start, span.end);
            }
        }
        Ok(())
    }

    /// Keep only members present in every source.
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
            if self.runs.is_empty() {
                break;
            }
            match source {
                Source::Intervals(other) => self.clip_to(other),
                src => {
                    let other = Self::from_source(src)?;
                    self.clip_to(&other);
                }
            }
        }
        Ok(())
    }

    /// Keep members present in exactly one of `self` and the source.
    pub fn symmetric_difference_update<'a, S>(&mut self, other: S) -> Result<(), SetError>
    where
        S: Into<Source<'a>>,
    {
        let source = other.into();
        source.validate()?;
        if self.runs.is_empty() {
            for span in source.spans()? {
                self.insert_run(span.start, span.end);
            }
            return Ok(());
        }
        let other = match &source {
            Source::Intervals(set) => (*set).clone(),
            other => Self::from_source(other)?,
        };
        self.xor_with(&other);
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
    pub fn isdisjoint(&self, other: &IntervalSet) -> bool {
        if self.runs.is_empty() || other.runs.is_empty() {
            return true;
        }
        let mut i = 0;
        while i < self.runs.len() {
            let (found, idx) = other.search(self.runs[i]);
            if idx == other.runs.len() {
                // Other is exhausted below this run; nothing further overlaps.
                return true;
            }
            if found || self.runs[i + 1] >= other.runs[idx] {
                return false;
            }
            i += 2;
        }
        true
    }

    /// Returns `true` if every member of `self` is in `other`.
    pub fn issubset(&self, other: &IntervalSet) -> bool {
        if self.runs.is_empty() {
            return true;
        }
        if self.len() > other.len() {
            return false;
        }
        let mut i = 0;
        while i < self.runs.len() {
            let (found, idx) = other.search(self.runs[i]);
            if !found || self.runs[i + 1] > other.runs[idx + 1] {
                return false;
            }
            i += 2;
        }
        true
    }

    /// Returns `true` if every member of `other` is in `self`.
    pub fn issuperset(&self, other: &IntervalSet) -> bool {
        other.issubset(self)
    }

    /// Iterate over members in ascending order.
    pub fn iter(&self) -> IntervalIter<'_> {
        IntervalIter {
            runs: &self.runs,
            pos: 0,
            next: self.runs.first().copied().unwrap_or(0),
        }
    }

    /// Iterate over the canonical `(start, end)` pairs.
    pub fn runs(&self) -> RunIter<'_> {
        RunIter {
            runs: &self.runs,
            pos: 0,
        }
    }

    /// Locate the interval containing `value`.
    ///
    /// Returns `(true, i)` with `i` the even offset of the containing pair,
    /// or `(false, i)` with `i` the even offset where a pair holding
    /// `value` would be spliced in.
    fn search(&self, value: i64) -> (bool, usize) {
        let mut lo = 0;
        let mut hi = self.runs.len() / 2;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if value < self.runs[2 * mid] {
                hi = mid;
            } else if value > self.runs[2 * mid + 1] {
                lo = mid + 1;
            } else {
                return (true, 2 * mid);
            }
        }
        (false, 2 * lo)
    }

    /// Insert the inclusive run `[start, end]`, merging eagerly.
    ///
    /// If the run touches or overlaps the pair before the insertion point,
    /// that pair is extended in place; following pairs whose start lies
    /// within `end + 1` are then absorbed one by one. Otherwise a new pair
    /// is spliced in.
    pub(crate) fn insert_run(&mut self, start: i64, mut end: i64) {
        debug_assert!(start <= end);
        let (mut found, mut idx) = self.search(start);
        let runs = &mut self.runs;
        if !found {
            if idx > 0 && start == runs[idx - 1] + 1 {
                // Extends the previous pair on the right.
                idx -= 2;
                runs[idx + 1] = start;
                if idx + 2 < runs.len() && end == runs[idx + 2] - 1 {
                    // Bridges exactly to the next pair; absorb it below.
                    end = runs[idx + 3];
                }
                found = true;
            } else if idx < runs.len() && end + 1 >= runs[idx] {
                // Touches or overlaps the following pair; pull its start back.
                runs[idx] = start;
                found = true;
            }
        }
        if found {
            // Grow this pair's end, absorbing every following pair it reaches.
            while end > runs[idx + 1] {
                if idx + 2 < runs.len() && end + 1 >= runs[idx + 2] {
                    if end <= runs[idx + 3] {
                        runs[idx + 1] = runs[idx + 3];
                    }
                    runs.drain(idx + 2..idx + 4);
                } else {
                    runs[idx + 1] = end;
                }
            }
        } else {
            runs.splice(idx..idx, [start, end]);
        }
    }

    /// Remove the inclusive run `[start, end]`, splitting and shrinking.
    ///
    /// A removal strictly inside one pair splits it in two; a removal
    /// touching a boundary shrinks that edge; a removal spanning several
    /// pairs shrinks the partially covered first and last pairs and drops
    /// everything fully covered in between.
    pub(crate) fn remove_run(&mut self, start: i64, end: i64) {
        debug_assert!(start <= end);
        let (sfound, mut sidx) = self.search(start);
        let (efound, mut eidx) = self.search(end);
        let runs = &mut self.runs;
        if sfound && efound && sidx == eidx {
            let clip_head = runs[sidx] < start;
            let clip_tail = runs[eidx + 1] > end;
            if clip_head && clip_tail {
                runs.splice(sidx + 1..sidx + 1, [start - 1, end + 1]);
            } else if clip_head {
                runs[sidx + 1] = start - 1;
            } else if clip_tail {
                runs[eidx] = end + 1;
            } else {
                runs.drain(sidx..eidx + 2);
            }
        } else {
            if sfound && runs[sidx] < start {
                runs[sidx + 1] = start - 1;
                sidx += 2;
            }
            if efound {
                if runs[eidx + 1] > end {
                    runs[eidx] = end + 1;
                } else {
                    eidx += 2;
                }
            }
            if sidx < eidx {
                runs.drain(sidx..eidx);
            }
        }
    }

    /// Build a set from one normalized source.
    fn from_source(source: &Source<'_>) -> Result<Self, SetError> {
        let mut set = Self::default();
        for span in source.spans()? {
            set.insert_run(span.start, span.end);
        }
        Ok(set)
    }

    /// In-place union with another interval set.
    fn union_with(&mut self, other: &IntervalSet) {
        if self.runs.is_empty() {
            self.runs = other.runs.clone();
            return;
        }
        for (start, end) in other.runs() {
            self.insert_run(start, end);
        }
    }

    /// In-place difference: drop every run of `other` from `self`.
    fn subtract(&mut self, other: &IntervalSet) {
        for (start, end) in other.runs() {
            self.remove_run(start, end);
        }
    }

    /// In-place intersection: remove everything outside `other`'s runs.
    ///
    /// Clips both tails, then removes the gap between each consecutive
    /// pair of `other`'s runs.
    fn clip_to(&mut self, other: &IntervalSet) {
        if other.runs.is_empty() {
            self.runs.clear();
            return;
        }
        if self.runs.is_empty() {
            return;
        }
        let (self_min, self_max) = (self.runs[0], self.runs[self.runs.len() - 1]);
        let (other_min, other_max) = (other.runs[0], other.runs[other.runs.len() - 1]);
        if self_min < other_min {
            self.remove_run(self_min, other_min - 1);
        }
        if other_max < self_max {
            self.remove_run(other_max + 1, self_max);
        }
        let mut i = 2;
        while !self.runs.is_empty() && i < other.runs.len() {
            let (gap_start, gap_end) = (other.runs[i - 1] + 1, other.runs[i] - 1);
            if gap_start <= gap_end {
                self.remove_run(gap_start, gap_end);
            }
            i += 2;
        }
    }

    /// In-place symmetric difference: `(self - other) ∪ (other - self)`.
    fn xor_with(&mut self, other: &IntervalSet) {
        let mut only_other = other.clone();
        only_other.subtract(self);
        self.subtract(other);
        self.union_with(&only_other);
    }
}

/// Iterator over the members of an [`IntervalSet`] in ascending order.
pub struct IntervalIter<'a> {
    runs: &'a [i64],
    pos: usize,
    next: i64,
}

impl Iterator for IntervalIter<'_> {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.pos >= self.runs.len() {
            return None;
        }
        let value = self.next;
        if value < self.runs[self.pos + 1] {
            self.next += 1;
        } else {
            self.pos += 2;
            if self.pos < self.runs.len() {
                self.next = self.runs[self.pos];
            }
        }
        Some(value)
    }
}

impl<'a> IntoIterator for &'a IntervalSet {
    type Item = i64;
    type IntoIter = IntervalIter<'a>;

    fn into_iter(self) -> IntervalIter<'a> {
        self.iter()
    }
}

/// Iterator over the canonical `(start, end)` pairs of an [`IntervalSet`].
pub struct RunIter<'a> {
    runs: &'a [i64],
    pos: usize,
}

impl Iterator for RunIter<'_> {
    type Item = (i64, i64);

    fn next(&mut self) -> Option<(i64, i64)> {
        if self.pos >= self.runs.len() {
            return None;
        }
        let pair = (self.runs[self.pos], self.runs[self.pos + 1]);
        self.pos += 2;
        Some(pair)
    }
}

impl FromIterator<i64> for IntervalSet {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        let mut set = Self::default();
        set.extend(iter);
        set
    }
}

impl Extend<i64> for IntervalSet {
    fn extend<I: IntoIterator<Item = i64>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl fmt::Display for IntervalSet {
    /// Run notation: `{1..3, 15, 20..23}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        for (start, end) in self.runs() {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            if start == end {
                write!(f, "{start}")?;
            } else {
                write!(f, "{start}..{end}")?;
            }
        }
        write!(f, "}}")
    }
}

/// Subset partial order: `a < b` iff `a` is a proper subset of `b`.
/// Incomparable sets (neither contains the other) compare as `None`.
impl PartialOrd for IntervalSet {
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

/// Membership + cardinality equality against the bitmap representation.
impl PartialEq<BitmapSet> for IntervalSet {
    fn eq(&self, other: &BitmapSet) -> bool {
        self.len() == other.len() && other.iter().all(|v| self.contains(v))
    }
}

impl From<&BitmapSet> for IntervalSet {
    /// Exact conversion, coalescing consecutive members into runs.
    fn from(bits: &BitmapSet) -> Self {
        let mut runs: Vec<i64> = Vec::new();
        for value in bits.iter() {
            if let Some(end) = runs.last_mut() {
                if *end + 1 == value {
                    *end = value;
                    continue;
                }
            }
            runs.extend([value, value]);
        }
        IntervalSet { runs }
    }
}

impl BitOr for &IntervalSet {
    type Output = IntervalSet;

    fn bitor(self, rhs: Self) -> IntervalSet {
        let mut out = self.clone();
        out.union_with(rhs);
        out
    }
}

impl BitAnd for &IntervalSet {
    type Output = IntervalSet;

    fn bitand(self, rhs: Self) -> IntervalSet {
        let mut out = self.clone();
        out.clip_to(rhs);
        out
    }
}

impl Sub for &IntervalSet {
    type Output = IntervalSet;

    fn sub(self, rhs: Self) -> IntervalSet {
        let mut out = self.clone();
        out.subtract(rhs);
        out
    }
}

impl BitXor for &IntervalSet {
    type Output = IntervalSet;

    fn bitxor(self, rhs: Self) -> IntervalSet {
        let mut out = self.clone();
        out.xor_with(rhs);
        out
    }
}

impl BitOrAssign<&IntervalSet> for IntervalSet {
    fn bitor_assign(&mut self, rhs: &IntervalSet) {
        self.union_with(rhs);
    }
}

impl BitAndAssign<&IntervalSet> for IntervalSet {
    fn bitand_assign(&mut self, rhs: &IntervalSet) {
        self.clip_to(rhs);
    }
}

impl SubAssign<&IntervalSet> for IntervalSet {
    fn sub_assign(&mut self, rhs: &IntervalSet) {
        self.subtract(rhs);
    }
}

impl BitXorAssign<&IntervalSet> for IntervalSet {
    fn bitxor_assign(&mut self, rhs: &IntervalSet) {
        self.xor_with(rhs);
    }
}

// Mixed-representation operators: the bitmap operand is converted into
// interval form first (exact, possibly O(size)).

impl BitOr<&BitmapSet> for &IntervalSet {
    type Output = IntervalSet;

    fn bitor(self, rhs: &BitmapSet) -> IntervalSet {
        self | &IntervalSet::from(rhs)
    }
}

impl BitAnd<&BitmapSet> for &IntervalSet {
    type Output = IntervalSet;

    fn bitand(self, rhs: &BitmapSet) -> IntervalSet {
        self & &IntervalSet::from(rhs)
    }
}

impl Sub<&BitmapSet> for &IntervalSet {
    type Output = IntervalSet;

    fn sub(self, rhs: &BitmapSet) -> IntervalSet {
        self - &IntervalSet::from(rhs)
    }
}

impl BitXor<&BitmapSet> for &IntervalSet {
    type Output = IntervalSet;

    fn bitxor(self, rhs: &BitmapSet) -> IntervalSet {
        self ^ &IntervalSet::from(rhs)
    }
}
