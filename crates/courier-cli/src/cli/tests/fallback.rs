//! Tests for the fallback subcommands.

use super::parse;
use crate::cli::{Cli, CliCommand, FallbackCommand};
use clap::Parser;

fn fallback(args: &[&str]) -> FallbackCommand {
    let mut full = vec!["courier", "fallback"];
    full.extend_from_slice(args);
    match parse(&full) {
        CliCommand::Fallback { command } => command,
        _ => panic!("expected Fallback"),
    }
}

#[test]
fn cli_parse_fallback_list() {
    match fallback(&["list"]) {
        FallbackCommand::List => {}
        _ => panic!("expected List"),
    }
}

#[test]
fn cli_parse_fallback_show_and_remove() {
    match fallback(&["show", "20261019_071500"]) {
        FallbackCommand::Show { name } => assert_eq!(name, "20261019_071500"),
        _ => panic!("expected Show"),
    }
    match fallback(&["remove", "20261019_071500_2"]) {
        FallbackCommand::Remove { name } => assert_eq!(name, "20261019_071500_2"),
        _ => panic!("expected Remove"),
    }
}

#[test]
fn cli_parse_fallback_resend() {
    match fallback(&["resend", "20261019_071500"]) {
        FallbackCommand::Resend { name, remove } => {
            assert_eq!(name, "20261019_071500");
            assert!(!remove);
        }
        _ => panic!("expected Resend"),
    }
    match fallback(&["resend", "20261019_071500", "--remove"]) {
        FallbackCommand::Resend { remove, .. } => assert!(remove),
        _ => panic!("expected Resend with --remove"),
    }
}

#[test]
fn cli_parse_fallback_verify() {
    match fallback(&["verify", "20261019_071500"]) {
        FallbackCommand::Verify { name } => assert_eq!(name, "20261019_071500"),
        _ => panic!("expected Verify"),
    }
}

#[test]
fn cli_fallback_requires_subcommand_and_name() {
    assert!(Cli::try_parse_from(["courier", "fallback"]).is_err());
    assert!(Cli::try_parse_from(["courier", "fallback", "show"]).is_err());
}
