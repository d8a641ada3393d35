use std::fmt;

use crate::instructions::{Constant, Slot};

/// An index into the heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub usize);

impl Address {
    pub fn offset(self, Slot { vn }: Slot) -> Self {
        Address(self.0 + usize::from(vn))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h({})", self.0)
    }
}

/// A heap cell. An unbound variable is a reference to itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Ref(Address),
    Const(Constant),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Ref(address) => write!(f, "ref({address})"),
            Cell::Const(constant) => write!(f, "const({constant})"),
        }
    }
}

/// The variable frame of a clause invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    pub base: Address,
    /// The number of choice points when the clause's predicate was called. `!` cuts back to here.
    pub cut_barrier: usize,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ base: {}, cut barrier: {} }}", self.base, self.cut_barrier)
    }
}
