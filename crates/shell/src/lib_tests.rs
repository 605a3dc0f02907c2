// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn splits_and_or_chain_into_simple_commands() {
    let commands = split_simple_commands("echo hi && rm -rf /tmp/x").unwrap();
    assert_eq!(commands.len(), 2);
    assert_eq!(leading_argv0(&commands[0]).as_deref(), Some("echo"));
    assert_eq!(leading_argv0(&commands[1]).as_deref(), Some("rm"));
}

#[test]
fn splits_pipeline_into_each_stage() {
    let commands = split_simple_commands("cat file.txt | grep foo | wc -l").unwrap();
    assert_eq!(commands.len(), 3);
    assert_eq!(leading_argv0(&commands[2]).as_deref(), Some("wc"));
}

#[test]
fn splits_semicolon_separated_statements() {
    let commands = split_simple_commands("echo one; echo two").unwrap();
    assert_eq!(commands.len(), 2);
}

#[test]
fn descends_into_subshells_and_brace_groups() {
    let commands = split_simple_commands("(echo one && echo two)").unwrap();
    assert_eq!(commands.len(), 2);
}

#[test]
fn word_with_variable_expansion_has_no_literal() {
    let commands = split_simple_commands("echo $HOME").unwrap();
    let arg = &commands[0].args[0];
    assert!(word_literal(arg).is_none());
}

#[test]
fn invalid_syntax_is_a_parse_error() {
    assert!(split_simple_commands("echo &&").is_err());
}
