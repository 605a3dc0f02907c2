// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Bash command lexer, parser, and AST used by the policy engine to split
//! compound commands (`cmd1 && cmd2 | cmd3`) into individual simple commands
//! for rule matching, without shelling out or depending on a system shell.

pub mod ast;
mod error;
mod lexer;
mod parse_error;
mod parser;
mod span;
mod token;

pub use ast::{
    AndOrList, AstVisitor, BraceGroup, Command, CommandItem, CommandList, EnvAssignment, Job,
    LogicalOp, Redirection, SimpleCommand, Subshell, Word, WordPart,
};
pub use error::LexerError;
pub use parse_error::{ParseError, ParseResult};
pub use parser::Parser;
pub use span::{context_snippet, diagnostic_context, Span};
pub use token::{Token, TokenKind};

/// Parse a shell command line into a [`CommandList`].
pub fn parse(input: &str) -> Result<CommandList, ParseError> {
    Parser::parse(input)
}

/// Split a compound command line into its individual simple commands,
/// flattening pipelines, `&&`/`||` chains, and `;`-separated statements.
///
/// Used by the policy engine so a rule only ever has to match a single
/// executable invocation, never a compound shell expression.
pub fn split_simple_commands(input: &str) -> Result<Vec<SimpleCommand>, ParseError> {
    let list = parse(input)?;
    let mut commands = Vec::new();
    collect_from_list(&list, &mut commands);
    Ok(commands)
}

fn collect_from_list(list: &CommandList, out: &mut Vec<SimpleCommand>) {
    for and_or in &list.commands {
        collect_from_item(&and_or.first, out);
        for (_, item) in &and_or.rest {
            collect_from_item(item, out);
        }
    }
}

fn collect_from_item(item: &CommandItem, out: &mut Vec<SimpleCommand>) {
    collect_from_command(&item.command, out);
}

fn collect_from_command(command: &Command, out: &mut Vec<SimpleCommand>) {
    match command {
        Command::Simple(simple) => out.push(simple.clone()),
        Command::Job(job) => out.extend(job.commands.iter().cloned()),
        Command::Subshell(Subshell { body, .. }) | Command::BraceGroup(BraceGroup { body, .. }) => {
            collect_from_list(body, out);
        }
    }
}

/// The literal text of a word, if it is made up only of unquoted/quoted
/// literal parts with no variable or command substitution.
///
/// Returns `None` for words containing expansions, since their runtime
/// value can't be known from the parsed command alone.
pub fn word_literal(word: &Word) -> Option<String> {
    let mut out = String::new();
    for part in &word.parts {
        match part {
            WordPart::Literal { value, .. } => out.push_str(value),
            _ => return None,
        }
    }
    Some(out)
}

/// The first word (executable name) of a simple command, as a literal
/// string if it has no expansions.
pub fn leading_argv0(command: &SimpleCommand) -> Option<String> {
    word_literal(&command.name)
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
