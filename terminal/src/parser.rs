use std::{fmt, path::PathBuf};

use arcstr::ArcStr;
use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use chumsky::{prelude::*, text::whitespace};

use wam::{Clause, Goal, Literal, Term};

type ParseError = Simple<char>;

#[derive(Debug)]
pub enum ParseErrorReport {
    FailedToOpenFile {
        path: PathBuf,
        error: std::io::Error,
    },
    ParseError {
        id: ArcStr,
        source: String,
        errors: Vec<ParseError>,
    },
}

impl fmt::Display for ParseErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailedToOpenFile { path, error } => {
                write!(f, "Failed to open {}: {}", path.display(), error)
            }
            Self::ParseError { id, source, errors } => {
                for error in errors {
                    let msg = if let chumsky::error::SimpleReason::Custom(msg) = error.reason() {
                        msg.clone()
                    } else {
                        format!(
                            "{}{}, expected {}",
                            if error.found().is_some() {
                                "Unexpected token"
                            } else {
                                "Unexpected end of input"
                            },
                            if let Some(label) = error.label() {
                                format!(" while parsing {label}")
                            } else {
                                String::new()
                            },
                            if error.expected().len() == 0 {
                                "something else".to_string()
                            } else {
                                error
                                    .expected()
                                    .map(|expected| match expected {
                                        Some(expected) => expected.to_string(),
                                        None => "end of input".to_string(),
                                    })
                                    .collect::<Vec<_>>()
                                    .join(", ")
                            },
                        )
                    };

                    let report = Report::build(ReportKind::Error, id, error.span().start)
                        .with_message(msg)
                        .with_label(
                            Label::new((id, error.span()))
                                .with_message(match error.reason() {
                                    chumsky::error::SimpleReason::Custom(msg) => msg.clone(),
                                    _ => format!(
                                        "Unexpected {}",
                                        error
                                            .found()
                                            .map(|c| format!("token {}", c.fg(Color::Red)))
                                            .unwrap_or_else(|| "end of input".to_string())
                                    ),
                                })
                                .with_color(Color::Red),
                        );

                    let report = match error.reason() {
                        chumsky::error::SimpleReason::Unclosed { span, delimiter } => report
                            .with_label(
                                Label::new((id, span.clone()))
                                    .with_message(format!(
                                        "Unclosed delimiter {}",
                                        delimiter.fg(Color::Yellow)
                                    ))
                                    .with_color(Color::Yellow),
                            ),
                        chumsky::error::SimpleReason::Unexpected => report,
                        chumsky::error::SimpleReason::Custom(_) => report,
                    };

                    let mut buffer = Vec::new();

                    report
                        .finish()
                        .write((id, Source::from(&source)), &mut buffer)
                        .map_err(|_| fmt::Error)?;

                    f.write_str(std::str::from_utf8(&buffer).map_err(|_| fmt::Error)?)?;
                }

                Ok(())
            }
        }
    }
}

impl std::error::Error for ParseErrorReport {}

fn lowercase(c: &char) -> bool {
    c.is_lowercase()
}

fn uppercase_or_underscore(c: &char) -> bool {
    c.is_uppercase() || *c == '_'
}

fn ident(c: &char) -> bool {
    c.is_alphanumeric() || *c == '_'
}

const NOT_UNIFIABLE: &str = r"\=";

fn name() -> impl Parser<char, ArcStr, Error = ParseError> + Clone {
    filter(lowercase)
        .chain(filter(ident).repeated())
        .collect::<String>()
        .map(ArcStr::from)
        .labelled("name")
}

fn term() -> impl Parser<char, Term, Error = ParseError> + Clone {
    let variable = filter(uppercase_or_underscore)
        .chain(filter(ident).repeated())
        .collect::<String>()
        .map(Term::from_symbol)
        .labelled("variable");

    let constant = name().map(|name| Term::Constant { name });

    let number = filter(char::is_ascii_digit)
        .repeated()
        .at_least(1)
        .collect::<String>()
        .map(Term::constant)
        .labelled("number");

    variable.or(constant).or(number)
}

fn arguments() -> impl Parser<char, Vec<Term>, Error = ParseError> + Clone {
    term()
        .separated_by(just(',').padded())
        .padded()
        .delimited_by(just('('), just(')'))
}

fn literal() -> impl Parser<char, Literal, Error = ParseError> + Clone {
    name()
        .then_ignore(whitespace())
        .then(arguments().or_not().map(Option::unwrap_or_default))
        .map(|(name, terms)| Literal { name, terms })
        .labelled("literal")
}

fn not_unifiable() -> impl Parser<char, Literal, Error = ParseError> + Clone {
    let infix = term()
        .then_ignore(just(NOT_UNIFIABLE).padded())
        .then(term())
        .map(|(lhs, rhs)| vec![lhs, rhs]);

    let prefix = just(NOT_UNIFIABLE)
        .ignore_then(whitespace())
        .ignore_then(arguments());

    infix.or(prefix).map(|terms| Literal {
        name: ArcStr::from(NOT_UNIFIABLE),
        terms,
    })
}

fn goal() -> impl Parser<char, Goal, Error = ParseError> + Clone {
    just('!')
        .to(Goal::Cut)
        .or(not_unifiable().map(Goal::Named))
        .or(literal().map(Goal::Named))
        .labelled("goal")
}

fn body() -> impl Parser<char, Vec<Goal>, Error = ParseError> + Clone {
    goal().padded().separated_by(just(',')).at_least(1)
}

fn clause() -> impl Parser<char, Clause, Error = ParseError> {
    let query = just("?-")
        .padded()
        .ignore_then(body())
        .then_ignore(just('.'))
        .map(Clause::Query);

    let rule = literal()
        .then_ignore(just(":-").padded())
        .then(body())
        .then_ignore(just('.'))
        .map(|(head, body)| Clause::Rule { head, body });

    let fact = literal().then_ignore(just('.').padded()).map(Clause::Fact);

    query.or(rule).or(fact).padded()
}

/// Blanks out `%` line comments, keeping every other character in place so spans stay valid
fn blank_comments(source: &str) -> String {
    let mut in_comment = false;

    source
        .chars()
        .map(|c| match c {
            '\n' => {
                in_comment = false;
                c
            }
            '%' => {
                in_comment = true;
                ' '
            }
            _ if in_comment => ' ',
            _ => c,
        })
        .collect()
}

pub fn parse_source(id: ArcStr, source: String) -> Result<Vec<Clause>, ParseErrorReport> {
    clause()
        .repeated()
        .padded()
        .then_ignore(end())
        .parse(blank_comments(&source).as_str())
        .map_err(|errors| ParseErrorReport::ParseError { id, source, errors })
}

pub fn parse_program(program: PathBuf) -> Result<Vec<Clause>, ParseErrorReport> {
    let source =
        std::fs::read_to_string(&program).map_err(|error| ParseErrorReport::FailedToOpenFile {
            path: program.clone(),
            error,
        })?;

    parse_source(arcstr::format!("{}", program.display()), source)
}

/// Parses the goals of an interactive query. The leading `?-` and the trailing `.` are optional.
pub fn parse_query(query: String) -> Result<Vec<Goal>, ParseErrorReport> {
    just("?-")
        .padded()
        .or_not()
        .ignore_then(body())
        .then_ignore(just('.').padded().or_not())
        .then_ignore(end())
        .parse(blank_comments(&query).as_str())
        .map_err(|errors| ParseErrorReport::ParseError {
            id: arcstr::literal!("<query>"),
            source: query,
            errors,
        })
}
