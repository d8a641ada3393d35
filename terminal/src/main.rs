use std::{
    collections::BTreeSet,
    io::{Stdout, Write},
    path::PathBuf,
};

use anyhow::Context;
use clap::Parser;
use crossterm::{
    style::{Print, Stylize},
    ExecutableCommand,
};
use itertools::Itertools;

use wam::{CompiledProgram, CompiledQuery, Machine, MachineConfig, PredicateKey};

mod parser;

#[derive(Parser)]
struct Cli {
    /// The program to load
    program: PathBuf,

    /// Only find the first solution of each query in the program
    #[arg(short = 'f', long = "first")]
    first_solution_only: bool,

    /// Print the compiled instructions
    #[arg(short = 'l', long = "listing")]
    listing: bool,

    /// Exit after running the queries in the program
    #[arg(long = "no-repl")]
    no_repl: bool,

    /// Abort a query after executing this many instructions
    #[arg(long = "step-limit")]
    step_limit: Option<u64>,

    /// Abort a query once the heap holds this many cells
    #[arg(long = "heap-limit")]
    heap_limit: Option<usize>,
}

/// Defined predicates with the same name as `key`, or a similar name and the same arity
fn similar_predicates<'a>(program: &'a CompiledProgram, key: &PredicateKey) -> Vec<&'a PredicateKey> {
    program
        .predicates()
        .map(|(defined, _)| defined)
        .filter(|defined| {
            let name_matches = defined.name == key.name;
            let names_are_similar = strsim::jaro_winkler(&defined.name, &key.name) > 0.8;
            let arity_matches = defined.arity == key.arity;

            name_matches || (names_are_similar && arity_matches)
        })
        .sorted()
        .collect()
}

fn warn_about_undefined_calls<'a>(
    program: &CompiledProgram,
    undefined: impl IntoIterator<Item = &'a PredicateKey>,
) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();

    for key in undefined {
        log::debug!("Calls to {} will fail", key);

        stderr.execute(Print(format_args!(
            "{}: {key} is not defined\n",
            "warning".yellow().bold()
        )))?;

        for similar in similar_predicates(program, key) {
            stderr.execute(Print(format_args!(
                "{}: found {similar}\n",
                "advice".green()
            )))?;
        }
    }

    Ok(())
}

fn print_solutions(
    stdout: &mut Stdout,
    program: &CompiledProgram,
    query: &CompiledQuery,
    config: MachineConfig,
    find_all: bool,
) -> std::io::Result<()> {
    stdout.execute(Print(format_args!("{query}\n")))?;

    let mut machine = Machine::with_config(program, query, config);

    match machine.fetch_execute(find_all) {
        Ok([]) => {
            stdout.execute(Print("false".bold()))?.execute(Print(".\n"))?;
        }
        Ok(solutions) => {
            for solution in solutions {
                stdout.execute(Print(format_args!("{solution}\n")))?;
            }
        }
        Err(error) => {
            stdout.execute(Print(format_args!("{}\n", error.to_string().red())))?;
        }
    }

    Ok(())
}

fn read_line() -> std::io::Result<Option<String>> {
    let mut line = String::new();

    Ok((std::io::stdin().read_line(&mut line)? > 0).then_some(line))
}

fn run_interactive_query(
    stdout: &mut Stdout,
    program: &CompiledProgram,
    query: &CompiledQuery,
    config: MachineConfig,
) -> std::io::Result<()> {
    let mut machine = Machine::with_config(program, query, config);

    loop {
        match machine.next_solution() {
            Ok(Some(solution)) => {
                stdout.execute(Print(solution.to_string().bold()))?;
                stdout.execute(Print(" "))?;

                // `;` asks for another solution, anything else stops
                match read_line()? {
                    Some(response) if response.trim() == ";" => continue,
                    Some(_) => return Ok(()),
                    None => {
                        stdout.execute(Print("\n"))?;
                        return Ok(());
                    }
                }
            }
            Ok(None) => {
                stdout.execute(Print("false".bold()))?.execute(Print(".\n"))?;
                return Ok(());
            }
            Err(error) => {
                stdout.execute(Print(format_args!("{}\n", error.to_string().red())))?;
                return Ok(());
            }
        }
    }
}

fn repl(program: &CompiledProgram, config: MachineConfig) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();

    let known_undefined_calls = program.undefined_calls();

    loop {
        stdout.execute(Print("?- "))?;
        stdout.flush()?;

        let Some(line) = read_line()? else {
            stdout.execute(Print("\n"))?;
            return Ok(());
        };

        let query = line.trim();

        if query.is_empty() {
            continue;
        }

        let goals = match parser::parse_query(query.to_string()) {
            Ok(goals) => goals,
            Err(error) => {
                stdout.execute(Print(error))?;
                continue;
            }
        };

        let (extended, index) = match wam::compile_query(program, &goals) {
            Ok(result) => result,
            Err(error) => {
                stdout.execute(Print(format_args!("{}\n", error.to_string().red())))?;
                continue;
            }
        };

        let undefined_calls = extended.undefined_calls();

        warn_about_undefined_calls(
            program,
            undefined_calls
                .difference(&known_undefined_calls)
                .copied()
                .collect::<BTreeSet<_>>(),
        )?;

        run_interactive_query(&mut stdout, &extended, &extended.queries()[index], config)?;
    }
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let Cli {
        program,
        first_solution_only,
        listing,
        no_repl,
        step_limit,
        heap_limit,
    } = Cli::parse();

    let clauses = parser::parse_program(program.clone())?;

    let program = wam::compile(&clauses)
        .with_context(|| format!("Failed to compile {}", program.display()))?;

    log::info!(
        "Compiled {} instructions, {} constants",
        program.instructions().len(),
        program.constants().len()
    );

    warn_about_undefined_calls(&program, program.undefined_calls())?;

    let mut stdout = std::io::stdout();

    if listing {
        stdout.execute(Print(&program))?;
    }

    let config = MachineConfig {
        step_limit,
        heap_limit,
    };

    for query in program.queries() {
        print_solutions(&mut stdout, &program, query, config, !first_solution_only)?;
    }

    if no_repl {
        return Ok(());
    }

    repl(&program, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn similar_predicates_are_suggested() {
        let clauses = parser::parse_source(
            arcstr::literal!("<test>"),
            r"
                parent(zeb, john).
                parents(zeb).
                parent(zeb).
                sibling(a, b).
                ?- parnet(X, Y).
            "
            .to_string(),
        )
        .unwrap();

        let program = wam::compile(&clauses).unwrap();

        let undefined = program.undefined_calls();
        let parnet = PredicateKey::new("parnet", 2);

        assert_eq!(undefined.into_iter().collect::<Vec<_>>(), [&parnet]);

        assert_eq!(
            similar_predicates(&program, &parnet)
                .into_iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            ["parent/2"]
        );

        assert_eq!(
            similar_predicates(&program, &PredicateKey::new("parent", 3))
                .into_iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            ["parent/1", "parent/2"]
        );
    }
}
