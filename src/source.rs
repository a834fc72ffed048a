use crate::bitmap::{BitmapIter, BitmapSet};
use crate::error::SetError;
use crate::interval::{IntervalSet, RunIter};

/// An inclusive run of consecutive integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) start: i64,
    pub(crate) end: i64,
}

impl Span {
    fn single(value: i64) -> Self {
        Span {
            start: value,
            end: value,
        }
    }
}

/// A heterogeneous input to set construction and bulk updates.
///
/// Every constructor and bulk operation on [`IntervalSet`] and
/// [`BitmapSet`] accepts anything convertible into a `Source`, and
/// normalizes it here — once, at this boundary — into a uniform stream of
/// inclusive spans. The set representations never inspect input kinds
/// themselves (beyond special-casing bulk merges of their own kind).
#[derive(Debug, Clone)]
pub enum Source<'a> {
    /// A single member.
    Int(i64),
    /// An arithmetic range with Python `range` semantics: `stop` is
    /// excluded, the sign of `step` gives the direction, and a range that
    /// steps away from `stop` is empty. A unit step (`1` or `-1`) yields
    /// one contiguous span; any other step enumerates individual values.
    Range { start: i64, stop: i64, step: i64 },
    /// An explicit list of members, in any order.
    Values(Vec<i64>),
    /// Every member of an interval set, as its canonical runs.
    Intervals(&'a IntervalSet),
    /// Every member of a bitmap set, ascending.
    Bits(&'a BitmapSet),
}

impl Source<'_> {
    /// Reject malformed sources before any consumer mutates state.
    pub(crate) fn validate(&self) -> Result<(), SetError> {
        match self {
            Source::Range { step: 0, .. } => Err(SetError::ZeroStep),
            _ => Ok(()),
        }
    }

    /// The smallest value this source yields, or `None` if it yields
    /// nothing. Used by [`BitmapSet`] to pre-check non-negativity.
    pub(crate) fn min_value(&self) -> Option<i64> {
        match *self {
            Source::Int(v) => Some(v),
            Source::Range { start, stop, step } => {
                if step > 0 {
                    (start < stop).then_some(start)
                } else if step < 0 {
                    if start <= stop {
                        None
                    } else {
                        // Last value reached when stepping down from start.
                        let count = (start - stop - 1) / -step + 1;
                        Some(start + step * (count - 1))
                    }
                } else {
                    None
                }
            }
            Source::Values(ref values) => values.iter().copied().min(),
            Source::Intervals(set) => set.min(),
            Source::Bits(set) => set.min(),
        }
    }

    /// Normalize into a stream of inclusive spans.
    ///
    /// Fails only on a zero range step; a valid source always normalizes.
    pub(crate) fn spans(&self) -> Result<Spans<'_>, SetError> {
        self.validate()?;
        Ok(match *self {
            Source::Int(v) => Spans::Once(Some(Span::single(v))),
            Source::Range { start, stop, step } => match step {
                1 => Spans::Once((start < stop).then(|| Span {
                    start,
                    end: stop - 1,
                })),
                -1 => Spans::Once((start > stop).then(|| Span {
                    start: stop + 1,
                    end: start,
                })),
                _ => Spans::Stepped {
                    next: start,
                    stop,
                    step,
                },
            },
            Source::Values(ref values) => Spans::Values(values.iter()),
            Source::Intervals(set) => Spans::Runs(set.runs()),
            Source::Bits(set) => Spans::Bits(set.iter()),
        })
    }
}

/// Stream of inclusive spans produced by [`Source::spans`].
pub(crate) enum Spans<'a> {
    Once(Option<Span>),
    Stepped { next: i64, stop: i64, step: i64 },
    Values(std::slice::Iter<'a, i64>),
    Runs(RunIter<'a>),
    Bits(BitmapIter<'a>),
}

impl Iterator for Spans<'_> {
    type Item = Span;

    fn next(&mut self) -> Option<Span> {
        match self {
            Spans::Once(span) => span.take(),
            Spans::Stepped { next, stop, step } => {
                let more = if *step > 0 { *next < *stop } else { *next > *stop };
                if !more {
                    return None;
                }
                let value = *next;
                *next += *step;
                Some(Span::single(value))
            }
            Spans::Values(values) => values.next().map(|&v| Span::single(v)),
            Spans::Runs(runs) => runs.next().map(|(start, end)| Span { start, end }),
            Spans::Bits(bits) => bits.next().map(Span::single),
        }
    }
}

impl<'a> From<i64> for Source<'a> {
    fn from(value: i64) -> Self {
        Source::Int(value)
    }
}

impl<'a> From<std::ops::Range<i64>> for Source<'a> {
    fn from(range: std::ops::Range<i64>) -> Self {
        Source::Range {
            start: range.start,
            stop: range.end,
            step: 1,
        }
    }
}

impl<'a> From<(i64, i64, i64)> for Source<'a> {
    fn from((start, stop, step): (i64, i64, i64)) -> Self {
        Source::Range { start, stop, step }
    }
}

impl<'a> From<Vec<i64>> for Source<'a> {
    fn from(values: Vec<i64>) -> Self {
        Source::Values(values)
    }
}

impl<'a> From<&[i64]> for Source<'a> {
    fn from(values: &[i64]) -> Self {
        Source::Values(values.to_vec())
    }
}

impl<'a, const N: usize> From<[i64; N]> for Source<'a> {
    fn from(values: [i64; N]) -> Self {
        Source::Values(values.to_vec())
    }
}

impl<'a> From<&'a IntervalSet> for Source<'a> {
    fn from(set: &'a IntervalSet) -> Self {
        Source::Intervals(set)
    }
}

impl<'a> From<&'a BitmapSet> for Source<'a> {
    fn from(set: &'a BitmapSet) -> Self {
        Source::Bits(set)
    }
}
