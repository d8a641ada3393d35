use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fmt,
};

use arcstr::ArcStr;

use crate::{
    instructions::{Arity, Builtin, Constant, Instruction, PredicateKey, ProgramCounter, Slot},
    log_debug, log_trace,
};

mod ast;

pub use ast::{is_hidden_variable, Clause, Goal, Literal, Shape, ShapeError, Term};

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("{0} is not a valid predicate name")]
    InvalidPredicateName(ArcStr),
    #[error("{name} has {arity} arguments, at most 255 are supported")]
    TooManyArguments { name: ArcStr, arity: usize },
    #[error("cannot redefine built-in predicate {0}")]
    BuiltinRedefinition(Builtin),
    #[error("query has no goals")]
    EmptyQuery,
    #[error("too many distinct constants")]
    TooManyConstants,
    #[error("clause has more variables than a frame can hold")]
    FrameTooLarge,
}

/// Where a predicate's clauses start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateEntry {
    Single(ProgramCounter),
    /// The address of each clause's `try_me_else`, `retry_me_else` or `trust_me`, in source order
    Multiple(Vec<ProgramCounter>),
}

impl PredicateEntry {
    pub fn entry(&self) -> ProgramCounter {
        match self {
            PredicateEntry::Single(entry) => *entry,
            // Multiple always holds at least two clauses
            PredicateEntry::Multiple(clauses) => clauses[0],
        }
    }

    pub fn clauses(&self) -> &[ProgramCounter] {
        match self {
            PredicateEntry::Single(entry) => std::slice::from_ref(entry),
            PredicateEntry::Multiple(clauses) => clauses,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConstantTable {
    names: Vec<ArcStr>,
    indices: HashMap<ArcStr, Constant>,
}

impl ConstantTable {
    fn intern(&mut self, name: &ArcStr) -> Result<Constant, CompileError> {
        if let Some(&constant) = self.indices.get(name) {
            return Ok(constant);
        }

        let constant = Constant(
            u16::try_from(self.names.len()).map_err(|_| CompileError::TooManyConstants)?,
        );

        log_trace!("Interned {} as {}", name, constant);

        self.names.push(name.clone());
        self.indices.insert(name.clone(), constant);

        Ok(constant)
    }

    pub fn lookup(&self, name: &str) -> Option<Constant> {
        self.indices.get(name).copied()
    }

    pub fn name(&self, Constant(index): Constant) -> Option<&ArcStr> {
        self.names.get(usize::from(index))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Constant, &ArcStr)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(index, name)| (Constant(index as u16), name))
    }
}

#[derive(Debug, Clone)]
pub struct CompiledQuery {
    goals: Vec<Goal>,
    entry: ProgramCounter,
    variables: Vec<(ArcStr, Slot)>,
}

impl CompiledQuery {
    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn entry(&self) -> ProgramCounter {
        self.entry
    }

    /// Every named variable of the query, in order of first appearance
    pub fn variables(&self) -> &[(ArcStr, Slot)] {
        &self.variables
    }

    /// The variables which appear in solutions
    pub fn reported_variables(&self) -> impl Iterator<Item = &(ArcStr, Slot)> + '_ {
        self.variables
            .iter()
            .filter(|(name, _)| !is_hidden_variable(name))
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Clause::Query(self.goals.clone()).fmt(f)
    }
}

#[derive(Debug, Clone)]
pub struct CompiledProgram {
    instructions: Vec<Instruction>,
    predicates: HashMap<PredicateKey, PredicateEntry>,
    constants: ConstantTable,
    queries: Vec<CompiledQuery>,
}

impl CompiledProgram {
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn predicate(&self, key: &PredicateKey) -> Option<&PredicateEntry> {
        self.predicates.get(key)
    }

    pub fn predicates(&self) -> impl Iterator<Item = (&PredicateKey, &PredicateEntry)> + '_ {
        self.predicates.iter()
    }

    pub fn constants(&self) -> &ConstantTable {
        &self.constants
    }

    pub fn queries(&self) -> &[CompiledQuery] {
        &self.queries
    }

    /// Predicates which are called but have no clauses. Such calls simply fail.
    pub fn undefined_calls(&self) -> BTreeSet<&PredicateKey> {
        self.instructions
            .iter()
            .filter_map(|instruction| match instruction {
                Instruction::Call { p } if !self.predicates.contains_key(p) => Some(p),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for CompiledProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut labels = BTreeMap::<ProgramCounter, String>::new();

        for (key, entry) in &self.predicates {
            labels.insert(entry.entry(), format!("{key}:"));
        }

        for query in &self.queries {
            labels.insert(query.entry, query.to_string());
        }

        for (pc, instruction) in self.instructions.iter().enumerate() {
            if let Some(label) = labels.get(&pc) {
                writeln!(f, "{label}")?;
            }

            writeln!(f, "{pc:>6}: {instruction}")?;
        }

        Ok(())
    }
}

fn check_predicate_name(name: &ArcStr) -> Result<(), CompileError> {
    match Term::from_symbol(name.clone()) {
        Term::Constant { .. } if name.as_str() != "!" && !name.is_empty() => Ok(()),
        _ => Err(CompileError::InvalidPredicateName(name.clone())),
    }
}

fn predicate_key(literal: &Literal) -> Result<PredicateKey, CompileError> {
    check_predicate_name(&literal.name)?;

    let arity = Arity::try_from(literal.terms.len()).map_err(|_| {
        CompileError::TooManyArguments {
            name: literal.name.clone(),
            arity: literal.terms.len(),
        }
    })?;

    Ok(PredicateKey::new(literal.name.clone(), arity))
}

/// Frame layout of one clause. Head arguments get slots left to right, a scratch slot for
/// each constant or `_`, then the remaining variables in order of first appearance.
struct Frame {
    variables: Vec<(ArcStr, Slot)>,
    head_slots: Vec<Slot>,
    size: u16,
}

impl Frame {
    fn new(head: Option<&Literal>, body: &[Goal]) -> Result<Self, CompileError> {
        let mut frame = Self {
            variables: Vec::new(),
            head_slots: Vec::new(),
            size: 0,
        };

        for term in head.map(|head| head.terms.as_slice()).unwrap_or_default() {
            let slot = match term {
                Term::Variable { name } => frame.variable(name)?,
                Term::Constant { .. } | Term::Void => frame.next_slot()?,
            };

            frame.head_slots.push(slot);
        }

        for name in body.iter().flat_map(Goal::variables) {
            frame.variable(name)?;
        }

        Ok(frame)
    }

    fn next_slot(&mut self) -> Result<Slot, CompileError> {
        let vn = self.size;
        self.size = self.size.checked_add(1).ok_or(CompileError::FrameTooLarge)?;
        Ok(Slot { vn })
    }

    fn variable(&mut self, name: &ArcStr) -> Result<Slot, CompileError> {
        if let Some((_, slot)) = self.variables.iter().find(|(known, _)| known == name) {
            return Ok(*slot);
        }

        let slot = self.next_slot()?;
        self.variables.push((name.clone(), slot));
        Ok(slot)
    }
}

struct Compiler {
    instructions: Vec<Instruction>,
    predicates: HashMap<PredicateKey, PredicateEntry>,
    constants: ConstantTable,
    queries: Vec<CompiledQuery>,
}

impl Compiler {
    fn current_address(&self) -> ProgramCounter {
        self.instructions.len()
    }

    fn emit(&mut self, instruction: Instruction) {
        log_trace!("{:>6}: {}", self.instructions.len(), instruction);
        self.instructions.push(instruction);
    }

    fn compile_head(&mut self, head: &Literal, frame: &Frame) -> Result<(), CompileError> {
        let mut seen = BTreeSet::new();

        // Arguments were pushed left to right, so they are popped right to left
        for (term, &vn) in head.terms.iter().zip(&frame.head_slots).rev() {
            match term {
                Term::Constant { name } => {
                    let c = self.constants.intern(name)?;
                    self.emit(Instruction::PutConstant { vn, c });
                }
                Term::Variable { .. } => {
                    if seen.insert(vn) {
                        self.emit(Instruction::PutVariable { vn });
                    }
                }
                Term::Void => self.emit(Instruction::PutAny { vn }),
            }

            self.emit(Instruction::UnifyVariable { vn });
        }

        Ok(())
    }

    fn compile_goal(&mut self, goal: &Goal, frame: &mut Frame) -> Result<(), CompileError> {
        let literal = match goal {
            Goal::Cut => {
                self.emit(Instruction::Cut);
                return Ok(());
            }
            Goal::Named(literal) => literal,
        };

        let call = match Builtin::lookup(&literal.name, literal.terms.len()) {
            Some(b) => Instruction::Builtin { b },
            None => Instruction::Call {
                p: predicate_key(literal)?,
            },
        };

        for term in &literal.terms {
            match term {
                Term::Constant { name } => {
                    let c = self.constants.intern(name)?;
                    self.emit(Instruction::GetConstant { c });
                }
                Term::Variable { name } => {
                    let vn = frame.variable(name)?;
                    self.emit(Instruction::GetVariable { vn });
                }
                Term::Void => self.emit(Instruction::GetAny),
            }
        }

        self.emit(call);

        Ok(())
    }

    fn compile_clause(
        &mut self,
        head: Option<&Literal>,
        body: &[Goal],
    ) -> Result<Frame, CompileError> {
        let mut frame = Frame::new(head, body)?;

        if let Some(head) = head {
            // Intern head constants in source order, before they are emitted right to left
            for term in &head.terms {
                if let Term::Constant { name } = term {
                    self.constants.intern(name)?;
                }
            }
        }

        self.emit(Instruction::Allocate { n: frame.size });

        if let Some(head) = head {
            self.compile_head(head, &frame)?;
        }

        for goal in body {
            self.compile_goal(goal, &mut frame)?;
        }

        self.emit(Instruction::Proceed);

        Ok(frame)
    }

    fn compile_predicate(
        &mut self,
        key: PredicateKey,
        clauses: &[(&Literal, &[Goal])],
    ) -> Result<(), CompileError> {
        log_debug!("Compiling {} with {} clauses", key, clauses.len());

        let entry = match clauses {
            [(head, body)] => {
                let entry = self.current_address();
                self.compile_clause(Some(*head), body)?;
                PredicateEntry::Single(entry)
            }
            clauses => {
                let last = clauses.len() - 1;
                let mut addresses = Vec::with_capacity(clauses.len());

                for (index, (head, body)) in clauses.iter().enumerate() {
                    let address = self.current_address();
                    addresses.push(address);

                    self.emit(match index {
                        0 => Instruction::TryMeElse { next: 0 },
                        index if index == last => Instruction::TrustMe,
                        _ => Instruction::RetryMeElse { next: 0 },
                    });

                    self.compile_clause(Some(*head), body)?;

                    let next_clause = self.current_address();

                    if let Some(
                        Instruction::TryMeElse { next } | Instruction::RetryMeElse { next },
                    ) = self.instructions.get_mut(address)
                    {
                        *next = next_clause;
                    }
                }

                PredicateEntry::Multiple(addresses)
            }
        };

        self.predicates.insert(key, entry);

        Ok(())
    }

    fn compile_query(&mut self, goals: &[Goal]) -> Result<(), CompileError> {
        if goals.is_empty() {
            return Err(CompileError::EmptyQuery);
        }

        let entry = self.current_address();

        log_debug!("Compiling query at {}", entry);

        let frame = self.compile_clause(None, goals)?;

        self.queries.push(CompiledQuery {
            goals: goals.to_vec(),
            entry,
            variables: frame.variables,
        });

        Ok(())
    }

    fn finish(mut self) -> CompiledProgram {
        self.emit(Instruction::Halt);

        CompiledProgram {
            instructions: self.instructions,
            predicates: self.predicates,
            constants: self.constants,
            queries: self.queries,
        }
    }
}

/// Compiles clauses into a single instruction stream.
///
/// Clauses of the same predicate are grouped in order of the predicate's first appearance,
/// keeping their source order. Queries are compiled after all predicates and followed by `halt`.
pub fn compile<'a>(
    clauses: impl IntoIterator<Item = &'a Clause>,
) -> Result<CompiledProgram, CompileError> {
    let mut definitions = Vec::<(PredicateKey, Vec<(&Literal, &[Goal])>)>::new();
    let mut definition_indices = HashMap::<PredicateKey, usize>::new();
    let mut queries = Vec::new();

    for clause in clauses {
        let (head, body) = match clause {
            Clause::Fact(head) => (head, &[][..]),
            Clause::Rule { head, body } => (head, body.as_slice()),
            Clause::Query(goals) => {
                queries.push(goals.as_slice());
                continue;
            }
        };

        let key = predicate_key(head)?;

        if let Some(builtin) = Builtin::lookup(&head.name, head.terms.len()) {
            return Err(CompileError::BuiltinRedefinition(builtin));
        }

        let index = *definition_indices.entry(key.clone()).or_insert_with(|| {
            definitions.push((key, Vec::new()));
            definitions.len() - 1
        });

        definitions[index].1.push((head, body));
    }

    let mut compiler = Compiler {
        instructions: Vec::new(),
        predicates: HashMap::new(),
        constants: ConstantTable::default(),
        queries: Vec::new(),
    };

    for (key, clauses) in definitions {
        compiler.compile_predicate(key, &clauses)?;
    }

    for goals in queries {
        compiler.compile_query(goals)?;
    }

    Ok(compiler.finish())
}

pub fn compile_shapes<'a>(
    shapes: impl IntoIterator<Item = &'a Shape>,
) -> Result<CompiledProgram, CompileError> {
    let clauses = shapes
        .into_iter()
        .map(Clause::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    compile(&clauses)
}

/// Compiles an additional query against an already compiled program.
///
/// Returns the extended program along with the index of the new query in its [`CompiledProgram::queries`].
pub fn compile_query(
    program: &CompiledProgram,
    goals: &[Goal],
) -> Result<(CompiledProgram, usize), CompileError> {
    let mut instructions = program.instructions.clone();

    if let Some(Instruction::Halt) = instructions.last() {
        instructions.pop();
    }

    let mut compiler = Compiler {
        instructions,
        predicates: program.predicates.clone(),
        constants: program.constants.clone(),
        queries: program.queries.clone(),
    };

    compiler.compile_query(goals)?;

    let index = compiler.queries.len() - 1;

    Ok((compiler.finish(), index))
}
