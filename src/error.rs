use thiserror::Error;

/// Errors surfaced by set construction and mutation.
///
/// Every fallible operation validates its inputs before touching any
/// state, so a returned error never leaves a set with a violated
/// representation invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SetError {
    /// A negative integer was supplied where a bitmap-set member is
    /// required. Bitmap sets only address the non-negative domain.
    #[error("value {0} is not a valid bitmap-set member: members must be non-negative")]
    NegativeValue(i64),

    /// A range source was given a step of zero.
    #[error("range step must not be zero")]
    ZeroStep,

    /// `remove` was called with a value that is not a member.
    #[error("{0} is not a member")]
    MissingMember(i64),

    /// `pop` was called on an empty set.
    #[error("pop from an empty set")]
    EmptyPop,
}
