#![forbid(unsafe_code)]

//! Structural change events emitted by observable collections.
//!
//! Every mutating operation produces exactly two events: a [`Phase::Will`]
//! event before the backing sequence changes and a [`Phase::Did`] event after.
//! Index payloads name positions in the collection that emitted the event:
//! pre-mutation positions for removals and updates, post-mutation positions
//! for insertions. [`ArrayChange::Reset`] carries no indices; an observer must
//! drop any derived state and re-read the collection.

use std::fmt;

/// Whether an event precedes or follows its mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Will,
    Did,
}

/// Kind of structural change, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Remove,
    Update,
    Reset,
}

/// A structural change and the indices it affects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayChange {
    Insert(Vec<usize>),
    Remove(Vec<usize>),
    Update(Vec<usize>),
    Reset,
}

impl ArrayChange {
    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Insert(_) => ChangeKind::Insert,
            Self::Remove(_) => ChangeKind::Remove,
            Self::Update(_) => ChangeKind::Update,
            Self::Reset => ChangeKind::Reset,
        }
    }

    /// Affected indices, or `None` for a reset.
    #[must_use]
    pub fn indices(&self) -> Option<&[usize]> {
        match self {
            Self::Insert(i) | Self::Remove(i) | Self::Update(i) => Some(i),
            Self::Reset => None,
        }
    }

    /// Whether this change alters the element count.
    pub(crate) fn changes_len(&self) -> bool {
        match self {
            Self::Insert(i) | Self::Remove(i) => !i.is_empty(),
            Self::Update(_) => false,
            Self::Reset => true,
        }
    }
}

/// A structural event as delivered to a bond's array listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayEvent {
    pub phase: Phase,
    pub change: ArrayChange,
}

impl ArrayEvent {
    #[must_use]
    pub fn will(change: ArrayChange) -> Self {
        Self {
            phase: Phase::Will,
            change,
        }
    }

    #[must_use]
    pub fn did(change: ArrayChange) -> Self {
        Self {
            phase: Phase::Did,
            change,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        self.change.kind()
    }

    #[must_use]
    pub fn indices(&self) -> Option<&[usize]> {
        self.change.indices()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Will => "will",
            Self::Did => "did",
        })
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Insert => "insert",
            Self::Remove => "remove",
            Self::Update => "update",
            Self::Reset => "reset",
        })
    }
}

impl fmt::Display for ArrayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.phase, self.kind())?;
        if let Some(indices) = self.indices() {
            write!(f, " {indices:?}")?;
        }
        Ok(())
    }
}
