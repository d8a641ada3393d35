use std::fmt;

use arcstr::ArcStr;
use itertools::Itertools;

use crate::instructions::Builtin;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Variable { name: ArcStr },
    Constant { name: ArcStr },
    Void,
}

impl Term {
    /// Classifies a bare symbol: `_` is void, a leading uppercase letter or
    /// underscore makes a variable, anything else is a constant.
    pub fn from_symbol(symbol: impl Into<ArcStr>) -> Self {
        let name = symbol.into();

        if name.as_str() == "_" {
            Term::Void
        } else if name.starts_with(|c: char| c.is_uppercase() || c == '_') {
            Term::Variable { name }
        } else {
            Term::Constant { name }
        }
    }

    pub fn variable(name: impl Into<ArcStr>) -> Self {
        Term::Variable { name: name.into() }
    }

    pub fn constant(name: impl Into<ArcStr>) -> Self {
        Term::Constant { name: name.into() }
    }
}

/// Variables whose names start with `_` take part in unification but are left out of answers.
pub fn is_hidden_variable(name: &str) -> bool {
    name.starts_with('_')
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable { name } | Term::Constant { name } => name.fmt(f),
            Term::Void => f.write_str("_"),
        }
    }
}

/// A predicate name applied to its arguments, as found in clause heads and goals
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    pub name: ArcStr,
    pub terms: Vec<Term>,
}

impl Literal {
    pub fn new(name: impl Into<ArcStr>, terms: impl IntoIterator<Item = Term>) -> Self {
        Self {
            name: name.into(),
            terms: terms.into_iter().collect(),
        }
    }

    pub fn variables(&self) -> impl Iterator<Item = &ArcStr> + '_ {
        self.terms.iter().filter_map(|term| match term {
            Term::Variable { name } => Some(name),
            Term::Constant { .. } | Term::Void => None,
        })
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (Builtin::lookup(&self.name, self.terms.len()), self.terms.as_slice()) {
            (Some(Builtin::NotUnifiable), [lhs, rhs]) => write!(f, r"{lhs} \= {rhs}"),
            (_, []) => self.name.fmt(f),
            (_, terms) => write!(f, "{}({})", self.name, terms.iter().join(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Goal {
    Named(Literal),
    Cut,
}

impl Goal {
    pub fn named(name: impl Into<ArcStr>, terms: impl IntoIterator<Item = Term>) -> Self {
        Goal::Named(Literal::new(name, terms))
    }

    pub fn variables(&self) -> impl Iterator<Item = &ArcStr> + '_ {
        match self {
            Goal::Named(literal) => Some(literal.variables()),
            Goal::Cut => None,
        }
        .into_iter()
        .flatten()
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Goal::Named(literal) => literal.fmt(f),
            Goal::Cut => f.write_str("!"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Clause {
    Fact(Literal),
    Rule { head: Literal, body: Vec<Goal> },
    Query(Vec<Goal>),
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Fact(head) => write!(f, "{head}."),
            Clause::Rule { head, body } if body.is_empty() => write!(f, "{head}."),
            Clause::Rule { head, body } => write!(f, "{head} :- {}.", body.iter().join(", ")),
            Clause::Query(goals) => write!(f, "?- {}.", goals.iter().join(", ")),
        }
    }
}

/// Nested symbol lists: `[pred, arg...]`, `[":-", head, goal...]` and `["?-", goal...]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Shape {
    Symbol(ArcStr),
    List(Vec<Shape>),
}

impl Shape {
    pub fn symbol(symbol: impl Into<ArcStr>) -> Self {
        Shape::Symbol(symbol.into())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Symbol(symbol) => write!(f, "'{symbol}'"),
            Shape::List(items) => write!(f, "[{}]", items.iter().join(", ")),
        }
    }
}

/// Builds a [`Shape`] from bracketed lists of string literals.
///
/// ```
/// let rule = wam::shape!([":-", ["child", "X"], ["parent", "X", "_"], "!"]);
/// assert!(wam::Clause::try_from(&rule).is_ok());
/// ```
#[macro_export]
macro_rules! shape {
    ([$($item:tt),* $(,)?]) => {
        $crate::Shape::List(::std::vec![$($crate::shape!($item)),*])
    };
    ($symbol:expr) => {
        $crate::Shape::symbol($symbol)
    };
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("expected a clause, found the symbol {0}")]
    TopLevelSymbol(ArcStr),
    #[error("empty clause")]
    EmptyClause,
    #[error("rule has no head")]
    MissingHead,
    #[error("query has no goals")]
    EmptyQuery,
    #[error("expected a predicate name followed by its arguments, found {0}")]
    ExpectedLiteral(Shape),
    #[error("argument {0} is a compound term, only constants and variables are supported")]
    CompoundArgument(Shape),
}

const NECK: &str = ":-";
const QUERY: &str = "?-";
const CUT: &str = "!";

impl TryFrom<&Shape> for Literal {
    type Error = ShapeError;

    fn try_from(shape: &Shape) -> Result<Self, Self::Error> {
        let Shape::List(items) = shape else {
            return Err(ShapeError::ExpectedLiteral(shape.clone()));
        };

        let Some((Shape::Symbol(name), arguments)) = items.split_first() else {
            return Err(ShapeError::ExpectedLiteral(shape.clone()));
        };

        let terms = arguments
            .iter()
            .map(|argument| match argument {
                Shape::Symbol(symbol) => Ok(Term::from_symbol(symbol.clone())),
                Shape::List(_) => Err(ShapeError::CompoundArgument(argument.clone())),
            })
            .collect::<Result<_, _>>()?;

        Ok(Literal {
            name: name.clone(),
            terms,
        })
    }
}

impl TryFrom<&Shape> for Goal {
    type Error = ShapeError;

    fn try_from(shape: &Shape) -> Result<Self, Self::Error> {
        match shape {
            Shape::Symbol(symbol) if symbol.as_str() == CUT => Ok(Goal::Cut),
            Shape::Symbol(_) => Err(ShapeError::ExpectedLiteral(shape.clone())),
            Shape::List(_) => Literal::try_from(shape).map(Goal::Named),
        }
    }
}

fn goals(shapes: &[Shape]) -> Result<Vec<Goal>, ShapeError> {
    shapes.iter().map(Goal::try_from).collect()
}

impl TryFrom<&Shape> for Clause {
    type Error = ShapeError;

    fn try_from(shape: &Shape) -> Result<Self, Self::Error> {
        let items = match shape {
            Shape::Symbol(symbol) => return Err(ShapeError::TopLevelSymbol(symbol.clone())),
            Shape::List(items) => items,
        };

        match items.split_first() {
            None => Err(ShapeError::EmptyClause),
            Some((Shape::Symbol(neck), rest)) if neck.as_str() == NECK => {
                let (head, body) = rest.split_first().ok_or(ShapeError::MissingHead)?;

                Ok(Clause::Rule {
                    head: Literal::try_from(head)?,
                    body: goals(body)?,
                })
            }
            Some((Shape::Symbol(query), rest)) if query.as_str() == QUERY => {
                if rest.is_empty() {
                    return Err(ShapeError::EmptyQuery);
                }

                Ok(Clause::Query(goals(rest)?))
            }
            Some(_) => Literal::try_from(shape).map(Clause::Fact),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_classified_by_their_first_character() {
        assert_eq!(Term::from_symbol("_"), Term::Void);
        assert_eq!(Term::from_symbol("X"), Term::variable("X"));
        assert_eq!(Term::from_symbol("_Rest"), Term::variable("_Rest"));
        assert_eq!(Term::from_symbol("zeb"), Term::constant("zeb"));
        assert_eq!(Term::from_symbol("42"), Term::constant("42"));
    }

    #[test]
    fn rule_with_cut() {
        let clause = Clause::try_from(&crate::shape!([
            ":-",
            ["child", "X"],
            ["parent", "X", "_"],
            "!"
        ]))
        .unwrap();

        assert_eq!(
            clause,
            Clause::Rule {
                head: Literal::new("child", [Term::variable("X")]),
                body: vec![
                    Goal::named("parent", [Term::variable("X"), Term::Void]),
                    Goal::Cut,
                ],
            }
        );
        assert_eq!(clause.to_string(), "child(X) :- parent(X, _), !.");
    }

    #[test]
    fn disequality_is_displayed_infix() {
        let clause = Clause::try_from(&crate::shape!(["?-", [r"\=", "X", "a"]])).unwrap();

        assert_eq!(clause.to_string(), r"?- X \= a.");
    }

    #[test]
    fn malformed_shapes_are_rejected() {
        assert_eq!(
            Clause::try_from(&crate::shape!("parent")),
            Err(ShapeError::TopLevelSymbol("parent".into()))
        );
        assert_eq!(
            Clause::try_from(&crate::shape!([])),
            Err(ShapeError::EmptyClause)
        );
        assert_eq!(
            Clause::try_from(&crate::shape!(["?-"])),
            Err(ShapeError::EmptyQuery)
        );
        assert_eq!(
            Clause::try_from(&crate::shape!([":-"])),
            Err(ShapeError::MissingHead)
        );
        assert!(matches!(
            Clause::try_from(&crate::shape!(["member", "X", ["cons", "X", "_"]])),
            Err(ShapeError::CompoundArgument(_))
        ));
        assert!(matches!(
            Clause::try_from(&crate::shape!([":-", "p", ["q"]])),
            Err(ShapeError::ExpectedLiteral(_))
        ));
        assert!(matches!(
            Clause::try_from(&crate::shape!([":-", ["p"], "q"])),
            Err(ShapeError::ExpectedLiteral(_))
        ));
    }
}
