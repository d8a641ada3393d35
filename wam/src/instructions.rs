use std::fmt;

use arcstr::ArcStr;

pub type Arity = u8;
pub type ProgramCounter = usize;

/// An index into the program's constant table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Constant(pub u16);

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c({})", self.0)
    }
}

/// A variable slot, relative to the base of the current environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot {
    pub vn: u16,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v({})", self.vn)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PredicateKey {
    pub name: ArcStr,
    pub arity: Arity,
}

impl PredicateKey {
    pub fn new(name: impl Into<ArcStr>, arity: Arity) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }
}

impl fmt::Display for PredicateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// `\=/2`: succeeds if both arguments are bound to different constants
    NotUnifiable,
}

impl Builtin {
    pub const ALL: [Builtin; 1] = [Builtin::NotUnifiable];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::NotUnifiable => r"\=",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Builtin::NotUnifiable => 2,
        }
    }

    pub fn lookup(name: &str, arity: usize) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|builtin| builtin.name() == name && usize::from(builtin.arity()) == arity)
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name(), self.arity())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Call { p: PredicateKey },
    TryMeElse { next: ProgramCounter },
    RetryMeElse { next: ProgramCounter },
    TrustMe,
    Proceed,
    GetVariable { vn: Slot },
    GetConstant { c: Constant },
    PutConstant { vn: Slot, c: Constant },
    PutVariable { vn: Slot },
    PutAny { vn: Slot },
    UnifyVariable { vn: Slot },
    GetAny,
    Cut,
    Builtin { b: Builtin },
    Allocate { n: u16 },
    Halt,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Call { p } => write!(f, "call({p})"),
            Instruction::TryMeElse { next } => write!(f, "try_me_else({next})"),
            Instruction::RetryMeElse { next } => write!(f, "retry_me_else({next})"),
            Instruction::TrustMe => write!(f, "trust_me"),
            Instruction::Proceed => write!(f, "proceed"),
            Instruction::GetVariable { vn } => write!(f, "get_variable({vn})"),
            Instruction::GetConstant { c } => write!(f, "get_constant({c})"),
            Instruction::PutConstant { vn, c } => write!(f, "put_constant({vn},{c})"),
            Instruction::PutVariable { vn } => write!(f, "put_variable({vn})"),
            Instruction::PutAny { vn } => write!(f, "put_any({vn})"),
            Instruction::UnifyVariable { vn } => write!(f, "unify_variable({vn})"),
            Instruction::GetAny => write!(f, "get_any"),
            Instruction::Cut => write!(f, "cut"),
            Instruction::Builtin { b } => write!(f, "builtin({b})"),
            Instruction::Allocate { n } => write!(f, "allocate({n})"),
            Instruction::Halt => write!(f, "halt"),
        }
    }
}
