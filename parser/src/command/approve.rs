//! The approve command parser.
//!
//! The grammar is as follows:
//!
//! ```text
//! Command: `/approve`, `/approve no-issue`, or `/approve cancel`.
//! ```

use crate::error::Error;
use crate::token::{Token, Tokenizer};
use std::fmt;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ApproveCommand {
    Approve,
    /// Approves and waives the associated issue requirement.
    NoIssue,
    Cancel,
}

#[derive(PartialEq, Eq, Debug)]
pub enum ParseError {
    ExpectedEnd,
    UnknownArgument,
}

impl std::error::Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::ExpectedEnd => write!(f, "expected end of command"),
            ParseError::UnknownArgument => {
                write!(f, "expected `no-issue`, `cancel` or nothing after approve")
            }
        }
    }
}

impl ApproveCommand {
    pub fn parse<'a>(input: &mut Tokenizer<'a>) -> Result<Option<Self>, Error<'a>> {
        let mut toks = input.clone();
        match toks.next_token()? {
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("approve") => {}
            _ => return Ok(None),
        }
        let command = match toks.peek_token()? {
            None | Some(Token::EndOfLine) | Some(Token::Dot) => ApproveCommand::Approve,
            Some(Token::Word(arg)) if arg.eq_ignore_ascii_case("cancel") => {
                toks.next_token()?;
                ApproveCommand::Cancel
            }
            Some(Token::Word(arg)) if arg.eq_ignore_ascii_case("no-issue") => {
                toks.next_token()?;
                ApproveCommand::NoIssue
            }
            Some(_) => return Err(toks.error(ParseError::UnknownArgument)),
        };
        if !toks.at_command_end()? {
            return Err(toks.error(ParseError::ExpectedEnd));
        }
        *input = toks;
        Ok(Some(command))
    }
}

#[cfg(test)]
fn parse<'a>(input: &'a str) -> Result<Option<ApproveCommand>, Error<'a>> {
    let mut toks = Tokenizer::new(input);
    ApproveCommand::parse(&mut toks)
}

#[test]
fn plain() {
    assert_eq!(parse("approve"), Ok(Some(ApproveCommand::Approve)));
    assert_eq!(parse("approve."), Ok(Some(ApproveCommand::Approve)));
    assert_eq!(parse("APPROVE\nthanks"), Ok(Some(ApproveCommand::Approve)));
}

#[test]
fn arguments() {
    assert_eq!(parse("approve cancel"), Ok(Some(ApproveCommand::Cancel)));
    assert_eq!(parse("approve No-Issue"), Ok(Some(ApproveCommand::NoIssue)));
}

#[test]
fn other_word() {
    assert_eq!(parse("approved"), Ok(None));
    assert_eq!(parse("lgtm"), Ok(None));
}

#[test]
fn unknown_argument() {
    use std::error::Error;
    assert_eq!(
        parse("approve later")
            .unwrap_err()
            .source()
            .unwrap()
            .downcast_ref(),
        Some(&ParseError::UnknownArgument),
    );
}

#[test]
fn trailing_words() {
    use std::error::Error;
    assert_eq!(
        parse("approve cancel now")
            .unwrap_err()
            .source()
            .unwrap()
            .downcast_ref(),
        Some(&ParseError::ExpectedEnd),
    );
}
