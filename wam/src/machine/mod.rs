use std::{fmt, rc::Rc};

use arcstr::ArcStr;
use itertools::Itertools;

use crate::{
    compiler::{CompiledProgram, CompiledQuery},
    instructions::{Builtin, Constant, Instruction, ProgramCounter},
    log_debug, log_info, log_trace,
};

mod basic_types;
mod heap;

pub use basic_types::{Address, Cell};
pub use heap::{HeapSnapshot, MemoryError, TrailEntry};

use basic_types::Environment;
use heap::{Heap, UnificationError};

/// Safety valves against runaway queries. The default is unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MachineConfig {
    /// The maximum number of instructions executed over the lifetime of a machine
    pub step_limit: Option<u64>,
    /// The maximum number of heap cells
    pub heap_limit: Option<usize>,
}

impl MachineConfig {
    pub fn with_step_limit(self, step_limit: u64) -> Self {
        Self {
            step_limit: Some(step_limit),
            ..self
        }
    }

    pub fn with_heap_limit(self, heap_limit: usize) -> Self {
        Self {
            heap_limit: Some(heap_limit),
            ..self
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("program counter {pc} is outside the program (length {length})")]
    ProgramCounterOutOfRange { pc: ProgramCounter, length: usize },
    #[error("argument stack underflow at {pc}")]
    StackUnderflow { pc: ProgramCounter },
    #[error("{instruction} at {pc} has no choice point")]
    NoChoicePoint {
        pc: ProgramCounter,
        instruction: Instruction,
    },
    #[error("{constant} is not in the constant table")]
    UnknownConstant { constant: Constant },
    #[error("step limit of {limit} instructions exceeded")]
    StepLimitExceeded { limit: u64 },
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

#[derive(Debug)]
enum ExecutionFailure {
    Failed,
    Error(Error),
}

impl From<Error> for ExecutionFailure {
    fn from(inner: Error) -> Self {
        Self::Error(inner)
    }
}

impl From<MemoryError> for ExecutionFailure {
    fn from(inner: MemoryError) -> Self {
        Self::Error(Error::Memory(inner))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Constant(ArcStr),
    Unbound(Address),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Constant(name) => name.fmt(f),
            Value::Unbound(Address(address)) => write!(f, "_{address}"),
        }
    }
}

/// The values of a query's variables, in order of first appearance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Solution {
    bindings: Vec<(ArcStr, Value)>,
}

impl Solution {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .find_map(|(variable, value)| (variable.as_str() == name).then_some(value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ArcStr, &Value)> + '_ {
        self.bindings.iter().map(|(name, value)| (name, value))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bindings.is_empty() {
            return f.write_str("true");
        }

        write!(
            f,
            "{}",
            self.bindings
                .iter()
                .format_with(", ", |(name, value), f| f(&format_args!("{name} = {value}")))
        )
    }
}

#[derive(Debug)]
struct Continuation {
    return_address: ProgramCounter,
    environment: Environment,
    next: CallStack,
}

/// A persistent stack of continuations, so choice points can share it instead of copying it
#[derive(Debug, Clone, Default)]
struct CallStack(Option<Rc<Continuation>>);

impl CallStack {
    fn push(&mut self, return_address: ProgramCounter, environment: Environment) {
        let next = std::mem::take(self);

        *self = CallStack(Some(Rc::new(Continuation {
            return_address,
            environment,
            next,
        })));
    }

    fn pop(&mut self) -> Option<(ProgramCounter, Environment)> {
        let top = self.0.take()?;
        *self = top.next.clone();
        Some((top.return_address, top.environment))
    }
}

impl Drop for CallStack {
    // Unlinks unshared continuations one at a time, as recursive drops overflow on deep call stacks
    fn drop(&mut self) {
        let mut next = self.0.take();

        while let Some(continuation) = next {
            next = match Rc::try_unwrap(continuation) {
                Ok(mut continuation) => continuation.next.0.take(),
                Err(_) => None,
            };
        }
    }
}

#[derive(Debug)]
struct ChoicePoint {
    arguments: Vec<Cell>,
    heap: HeapSnapshot,
    call_stack: CallStack,
    environment: Environment,
    cut_register: usize,
    alternatives: Vec<ProgramCounter>,
    next_alternative: usize,
}

impl ChoicePoint {
    fn is_exhausted(&self) -> bool {
        self.next_alternative >= self.alternatives.len()
    }
}

enum Step {
    Continue,
    Solution,
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ready,
    Solved,
    Finished,
}

pub struct Machine<'p> {
    program: &'p CompiledProgram,
    query: &'p CompiledQuery,
    config: MachineConfig,
    pc: ProgramCounter,
    steps: u64,
    heap: Heap,
    arguments: Vec<Cell>,
    call_stack: CallStack,
    environment: Environment,
    cut_register: usize,
    choice_points: Vec<ChoicePoint>,
    status: Status,
    solutions: Vec<Solution>,
}

impl<'p> Machine<'p> {
    pub fn load(program: &'p CompiledProgram, query: &'p CompiledQuery) -> Self {
        Self::with_config(program, query, MachineConfig::default())
    }

    pub fn with_config(
        program: &'p CompiledProgram,
        query: &'p CompiledQuery,
        config: MachineConfig,
    ) -> Self {
        Self {
            program,
            query,
            config,
            pc: query.entry(),
            steps: 0,
            heap: Heap::new(config.heap_limit),
            arguments: Vec::new(),
            call_stack: CallStack::default(),
            environment: Environment {
                base: Address(0),
                cut_barrier: 0,
            },
            cut_register: 0,
            choice_points: Vec::new(),
            status: Status::Ready,
            solutions: Vec::new(),
        }
    }

    /// Runs the query, stopping after the first solution unless `find_all` is set.
    ///
    /// Returns every solution found so far by this machine.
    pub fn fetch_execute(&mut self, find_all: bool) -> Result<&[Solution], Error> {
        while self.next_solution()?.is_some() {
            if !find_all {
                break;
            }
        }

        Ok(&self.solutions)
    }

    /// Resumes execution until the next solution is found. Returns `None` once there are no more solutions.
    pub fn next_solution(&mut self) -> Result<Option<Solution>, Error> {
        match self.status {
            Status::Finished => return Ok(None),
            Status::Ready => (),
            Status::Solved => match self.backtrack() {
                Ok(()) => (),
                Err(ExecutionFailure::Failed) => {
                    self.status = Status::Finished;
                    return Ok(None);
                }
                Err(ExecutionFailure::Error(error)) => {
                    self.status = Status::Finished;
                    return Err(error);
                }
            },
        }

        match self.continue_execution() {
            Ok(Step::Solution) => {
                self.status = Status::Solved;
                Ok(self.solutions.last().cloned())
            }
            Ok(Step::Continue | Step::Halt) | Err(ExecutionFailure::Failed) => {
                log_info!("No more solutions");
                self.status = Status::Finished;
                Ok(None)
            }
            Err(ExecutionFailure::Error(error)) => {
                self.status = Status::Finished;
                Err(error)
            }
        }
    }

    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn continue_execution(&mut self) -> Result<Step, ExecutionFailure> {
        let program = self.program;

        loop {
            if let Some(limit) = self.config.step_limit {
                if self.steps >= limit {
                    return Err(Error::StepLimitExceeded { limit }.into());
                }
            }

            self.steps += 1;

            let pc = self.pc;

            let instruction =
                program
                    .instructions()
                    .get(pc)
                    .ok_or(Error::ProgramCounterOutOfRange {
                        pc,
                        length: program.instructions().len(),
                    })?;

            log_debug!("Instruction @{}: {}", pc, instruction);

            self.pc = pc + 1;

            match self.execute_instruction(pc, instruction)? {
                Step::Continue => (),
                step @ (Step::Solution | Step::Halt) => return Ok(step),
            }
        }
    }

    fn execute_instruction(
        &mut self,
        pc: ProgramCounter,
        instruction: &Instruction,
    ) -> Result<Step, ExecutionFailure> {
        let program = self.program;

        match instruction {
            Instruction::Call { p } => match program.predicate(p) {
                Some(entry) => {
                    self.call_stack.push(self.pc, self.environment);
                    self.cut_register = self.choice_points.len();
                    self.pc = entry.entry();
                }
                None => {
                    log_debug!("{} has no clauses", p);
                    self.backtrack()?;
                }
            },
            &Instruction::TryMeElse { next } => {
                log_trace!("New choice point, next clause at {}", next);

                self.choice_points.push(ChoicePoint {
                    arguments: self.arguments.clone(),
                    heap: self.heap.save(),
                    call_stack: self.call_stack.clone(),
                    environment: self.environment,
                    cut_register: self.cut_register,
                    alternatives: vec![next],
                    next_alternative: 0,
                });
            }
            &Instruction::RetryMeElse { next } => {
                self.choice_points
                    .last_mut()
                    .ok_or_else(|| Error::NoChoicePoint {
                        pc,
                        instruction: instruction.clone(),
                    })?
                    .alternatives
                    .push(next);
            }
            Instruction::TrustMe => {
                log_trace!("Discarding exhausted choice point");

                self.choice_points
                    .pop()
                    .ok_or_else(|| Error::NoChoicePoint {
                        pc,
                        instruction: instruction.clone(),
                    })?;
            }
            Instruction::Proceed => match self.call_stack.pop() {
                Some((return_address, environment)) => {
                    self.pc = return_address;
                    self.environment = environment;
                }
                None => {
                    self.record_solution()?;
                    return Ok(Step::Solution);
                }
            },
            &Instruction::GetVariable { vn } => {
                self.arguments.push(Cell::Ref(self.environment.base.offset(vn)));
            }
            &Instruction::GetConstant { c } => {
                self.arguments.push(Cell::Const(c));
            }
            &Instruction::PutConstant { vn, c } => {
                self.heap
                    .store_in_frame(self.environment.base, vn, Cell::Const(c))?;
            }
            &Instruction::PutVariable { vn } | &Instruction::PutAny { vn } => {
                let address = self.environment.base.offset(vn);
                self.heap.store(address, Cell::Ref(address))?;
            }
            &Instruction::UnifyVariable { vn } => {
                let argument = self.pop_argument(pc)?;
                self.unify(Cell::Ref(self.environment.base.offset(vn)), argument)?;
            }
            Instruction::GetAny => {
                let address = self.heap.new_variable()?;
                self.arguments.push(Cell::Ref(address));
            }
            Instruction::Cut => {
                log_trace!(
                    "Cutting choice points from {} to {}",
                    self.choice_points.len(),
                    self.environment.cut_barrier
                );

                self.choice_points.truncate(self.environment.cut_barrier);
            }
            &Instruction::Builtin { b } => self.execute_builtin(pc, b)?,
            &Instruction::Allocate { n } => {
                let base = self.heap.allocate(n)?;

                self.environment = Environment {
                    base,
                    cut_barrier: self.cut_register,
                };

                log_trace!("New environment {}", self.environment);
            }
            Instruction::Halt => return Ok(Step::Halt),
        }

        Ok(Step::Continue)
    }

    fn execute_builtin(&mut self, pc: ProgramCounter, builtin: Builtin) -> Result<(), ExecutionFailure> {
        match builtin {
            Builtin::NotUnifiable => {
                let right = self.pop_argument(pc)?;
                let left = self.pop_argument(pc)?;

                match (self.heap.deref(left)?, self.heap.deref(right)?) {
                    (Cell::Const(left), Cell::Const(right)) if left != right => Ok(()),
                    _ => self.backtrack(),
                }
            }
        }
    }

    fn pop_argument(&mut self, pc: ProgramCounter) -> Result<Cell, Error> {
        self.arguments.pop().ok_or(Error::StackUnderflow { pc })
    }

    fn unify(&mut self, a: Cell, b: Cell) -> Result<(), ExecutionFailure> {
        match self.heap.unify(a, b) {
            Ok(()) => Ok(()),
            Err(UnificationError::UnificationFailure) => self.backtrack(),
            Err(UnificationError::Memory(inner)) => Err(inner.into()),
        }
    }

    /// Resumes from the most recent choice point which has alternatives left.
    ///
    /// Fails if there are none.
    fn backtrack(&mut self) -> Result<(), ExecutionFailure> {
        log_debug!("Backtracking");

        while let Some(choice_point) = self.choice_points.last_mut() {
            if choice_point.is_exhausted() {
                self.choice_points.pop();
                continue;
            }

            let next_clause = choice_point.alternatives[choice_point.next_alternative];
            choice_point.next_alternative += 1;

            self.heap.restore(choice_point.heap);
            self.arguments.clone_from(&choice_point.arguments);
            self.call_stack = choice_point.call_stack.clone();
            self.environment = choice_point.environment;
            self.cut_register = choice_point.cut_register;
            self.pc = next_clause;

            log_trace!("Resuming at {}", next_clause);

            return Ok(());
        }

        Err(ExecutionFailure::Failed)
    }

    fn record_solution(&mut self) -> Result<(), Error> {
        // The query's frame is the first allocation on the heap
        let query_base = Address(0);

        let bindings = self
            .query
            .reported_variables()
            .map(|(name, slot)| {
                let value = match self.heap.deref(Cell::Ref(query_base.offset(*slot)))? {
                    Cell::Ref(address) => Value::Unbound(address),
                    Cell::Const(constant) => Value::Constant(
                        self.program
                            .constants()
                            .name(constant)
                            .cloned()
                            .ok_or(Error::UnknownConstant { constant })?,
                    ),
                };

                Ok((name.clone(), value))
            })
            .collect::<Result<_, Error>>()?;

        let solution = Solution { bindings };

        log_info!("Solution: {}", solution);

        self.solutions.push(solution);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::seq::SliceRandom;

    use super::*;
    use crate::{
        compiler::{compile, compile_query, compile_shapes, Clause, Goal, Literal, Term},
        shape, Shape,
    };

    fn family() -> Vec<Shape> {
        vec![
            shape!(["parent", "zeb", "john"]),
            shape!(["parent", "zeb", "jane"]),
            shape!(["parent", "john", "jim"]),
            shape!(["parent", "jane", "alice"]),
            shape!([":-", ["child", "X"], ["parent", "X", "_"], "!"]),
            shape!([
                ":-",
                ["grandparent", "X", "Z"],
                ["parent", "X", "Y"],
                ["parent", "Y", "Z"]
            ]),
            shape!([
                ":-",
                ["sibling", "X", "Y"],
                ["parent", "Z", "X"],
                ["parent", "Z", "Y"],
                [r"\=", "X", "Y"]
            ]),
        ]
    }

    fn solve_with(
        program: Vec<Shape>,
        query: Shape,
        config: MachineConfig,
    ) -> Result<Vec<Solution>, Error> {
        let program = compile_shapes(program.iter().chain([&query])).unwrap();
        let query = program.queries().last().unwrap();

        let mut machine = Machine::with_config(&program, query, config);
        let solutions = machine.fetch_execute(true)?.to_vec();

        Ok(solutions)
    }

    fn solve(program: Vec<Shape>, query: Shape) -> Vec<Solution> {
        solve_with(program, query, MachineConfig::default()).unwrap()
    }

    fn values(solutions: &[Solution], name: &str) -> Vec<String> {
        solutions
            .iter()
            .map(|solution| solution.get(name).unwrap().to_string())
            .collect()
    }

    #[test]
    fn facts_are_tried_in_source_order() {
        let solutions = solve(
            vec![
                shape!(["fact", "a"]),
                shape!(["fact", "b"]),
                shape!(["fact", "c"]),
            ],
            shape!(["?-", ["fact", "X"]]),
        );

        assert_eq!(values(&solutions, "X"), ["a", "b", "c"]);
    }

    #[test]
    fn clause_order_is_kept_for_any_order_of_facts() {
        let mut rng = rand::thread_rng();

        let mut names = (0..20).map(|n| format!("k{n}")).collect::<Vec<_>>();
        names.shuffle(&mut rng);

        let program = names
            .iter()
            .map(|name| Shape::List(vec![Shape::symbol("fact"), Shape::symbol(name.as_str())]))
            .collect::<Vec<_>>();

        let solutions = solve(program, shape!(["?-", ["fact", "X"]]));

        assert_eq!(values(&solutions, "X"), names);
    }

    #[test]
    fn grandparents() {
        let solutions = solve(family(), shape!(["?-", ["grandparent", "zeb", "Who"]]));

        assert_eq!(values(&solutions, "Who"), ["jim", "alice"]);
    }

    #[test]
    fn cut_commits_to_the_first_parent() {
        let solutions = solve(family(), shape!(["?-", ["child", "X"]]));

        assert_eq!(values(&solutions, "X"), ["zeb"]);
    }

    #[test]
    fn siblings_are_distinct() {
        let solutions = solve(family(), shape!(["?-", ["sibling", "john", "S"]]));

        assert_eq!(values(&solutions, "S"), ["jane"]);

        let solutions = solve(family(), shape!(["?-", ["sibling", "A", "B"]]));

        assert_eq!(
            solutions.iter().map(ToString::to_string).collect::<Vec<_>>(),
            ["A = john, B = jane", "A = jane, B = john"]
        );
    }

    #[test]
    fn cut_prunes_remaining_clauses() {
        let program = || {
            vec![
                shape!([":-", ["p", "X"], ["q", "X"], "!", ["r", "X"]]),
                shape!([":-", ["p", "X"], ["s", "X"]]),
                shape!(["q", "a"]),
                shape!(["s", "b"]),
                shape!(["r", "z"]),
            ]
        };

        assert!(solve(program(), shape!(["?-", ["p", "X"]])).is_empty());

        let without_cut = vec![
            shape!([":-", ["p", "X"], ["q", "X"], ["r", "X"]]),
            shape!([":-", ["p", "X"], ["s", "X"]]),
            shape!(["q", "a"]),
            shape!(["s", "b"]),
            shape!(["r", "z"]),
        ];

        assert_eq!(
            values(&solve(without_cut, shape!(["?-", ["p", "X"]])), "X"),
            ["b"]
        );
    }

    #[test]
    fn cut_is_local_to_its_clause() {
        let solutions = solve(
            vec![
                shape!([":-", ["first", "X"], ["fact", "X"], "!"]),
                shape!(["fact", "a"]),
                shape!(["fact", "b"]),
                shape!(["other", "1"]),
                shape!(["other", "2"]),
            ],
            shape!(["?-", ["other", "Y"], ["first", "X"]]),
        );

        assert_eq!(
            solutions.iter().map(ToString::to_string).collect::<Vec<_>>(),
            ["Y = 1, X = a", "Y = 2, X = a"]
        );
    }

    #[test]
    fn cut_in_a_query() {
        let solutions = solve(family(), shape!(["?-", ["parent", "zeb", "X"], "!"]));

        assert_eq!(values(&solutions, "X"), ["john"]);
    }

    #[test]
    fn member_enumerates_cons_cells() {
        let solutions = solve(
            vec![
                shape!(["cons", "l1", "1", "l2"]),
                shape!(["cons", "l2", "2", "l3"]),
                shape!(["cons", "l3", "3", "nil"]),
                shape!([":-", ["member", "X", "L"], ["cons", "L", "X", "_"]]),
                shape!([
                    ":-",
                    ["member", "X", "L"],
                    ["cons", "L", "_", "T"],
                    ["member", "X", "T"]
                ]),
            ],
            shape!(["?-", ["member", "X", "l1"]]),
        );

        assert_eq!(values(&solutions, "X"), ["1", "2", "3"]);
    }

    #[test]
    fn fresh_machines_are_deterministic() {
        let program = compile_shapes(
            family()
                .iter()
                .chain([&shape!(["?-", ["parent", "P", "C"]])]),
        )
        .unwrap();
        let query = &program.queries()[0];

        let first = Machine::load(&program, query).fetch_execute(true).unwrap().to_vec();
        let second = Machine::load(&program, query).fetch_execute(true).unwrap().to_vec();

        assert_eq!(first.len(), 4);
        assert_eq!(first, second);
    }

    #[test]
    fn disequality() {
        assert!(solve(vec![], shape!(["?-", [r"\=", "a", "a"]])).is_empty());
        assert_eq!(
            solve(vec![], shape!(["?-", [r"\=", "a", "b"]])),
            [Solution::default()]
        );
        assert!(solve(vec![], shape!(["?-", [r"\=", "X", "a"]])).is_empty());
    }

    #[test]
    fn repeated_head_variables_must_agree() {
        let program = || vec![shape!(["same", "X", "X"])];

        assert!(solve(program(), shape!(["?-", ["same", "a", "b"]])).is_empty());
        assert_eq!(solve(program(), shape!(["?-", ["same", "a", "a"]])).len(), 1);
        assert_eq!(
            values(&solve(program(), shape!(["?-", ["same", "a", "Y"]])), "Y"),
            ["a"]
        );
    }

    #[test]
    fn unbound_variables_are_reported_by_address() {
        let solutions = solve(
            vec![shape!(["same", "Z", "Z"])],
            shape!(["?-", ["same", "X", "Y"]]),
        );

        assert_eq!(
            solutions,
            [Solution {
                bindings: vec![
                    ("X".into(), Value::Unbound(Address(0))),
                    ("Y".into(), Value::Unbound(Address(0))),
                ]
            }]
        );
        assert_eq!(solutions[0].to_string(), "X = _0, Y = _0");
    }

    #[test]
    fn hidden_variables_are_not_reported() {
        let solutions = solve(family(), shape!(["?-", ["parent", "zeb", "_Child"]]));

        assert_eq!(solutions, [Solution::default(), Solution::default()]);
    }

    #[test]
    fn undefined_predicates_fail() {
        assert!(solve(family(), shape!(["?-", ["cousin", "jim", "X"]])).is_empty());
        assert!(solve(vec![], shape!(["?-", ["anything"]])).is_empty());
    }

    #[test]
    fn first_solution_only() {
        let program = compile_shapes(
            family()
                .iter()
                .chain([&shape!(["?-", ["parent", "zeb", "X"]])]),
        )
        .unwrap();

        let mut machine = Machine::load(&program, &program.queries()[0]);

        assert_eq!(values(machine.fetch_execute(false).unwrap(), "X"), ["john"]);
        assert_eq!(
            values(machine.fetch_execute(true).unwrap(), "X"),
            ["john", "jane"]
        );
        assert_eq!(machine.next_solution().unwrap(), None);
    }

    #[test]
    fn queries_compiled_later_see_the_program() {
        let clauses = family()
            .iter()
            .map(Clause::try_from)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        let program = compile(&clauses).unwrap();

        let (extended, index) = compile_query(
            &program,
            &[Goal::Named(Literal::new(
                "grandparent",
                [Term::variable("G"), Term::constant("alice")],
            ))],
        )
        .unwrap();

        let solutions = Machine::load(&extended, &extended.queries()[index])
            .fetch_execute(true)
            .unwrap()
            .to_vec();

        assert_eq!(values(&solutions, "G"), ["zeb"]);
    }

    #[test]
    fn step_limit_stops_infinite_loops() {
        let result = solve_with(
            vec![shape!([":-", ["loop"], ["loop"]])],
            shape!(["?-", ["loop"]]),
            MachineConfig::default().with_step_limit(1000),
        );

        assert!(matches!(
            result,
            Err(Error::StepLimitExceeded { limit: 1000 })
        ));
    }

    #[test]
    fn heap_limit_stops_unbounded_recursion() {
        let result = solve_with(
            vec![shape!([":-", ["loop", "X"], ["loop", "X"]])],
            shape!(["?-", ["loop", "a"]]),
            MachineConfig::default().with_heap_limit(100),
        );

        assert!(matches!(
            result,
            Err(Error::Memory(MemoryError::OutOfMemory { limit: 100 }))
        ));
    }

    #[test]
    fn limits_do_not_change_results_of_terminating_queries() {
        let config = MachineConfig::default()
            .with_step_limit(10_000)
            .with_heap_limit(10_000);

        assert_eq!(
            solve_with(family(), shape!(["?-", ["grandparent", "X", "Y"]]), config).unwrap(),
            solve(family(), shape!(["?-", ["grandparent", "X", "Y"]]))
        );
    }
}
