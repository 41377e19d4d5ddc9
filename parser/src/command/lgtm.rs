//! The lgtm command parser.
//!
//! ```text
//! Command: `/lgtm` or `/lgtm cancel`.
//! ```

use crate::error::Error;
use crate::token::{Token, Tokenizer};
use std::fmt;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum LgtmCommand {
    Lgtm,
    Cancel,
}

#[derive(PartialEq, Eq, Debug)]
pub enum ParseError {
    ExpectedEnd,
}

impl std::error::Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::ExpectedEnd => write!(f, "expected `cancel` or end of command"),
        }
    }
}

impl LgtmCommand {
    pub fn parse<'a>(input: &mut Tokenizer<'a>) -> Result<Option<Self>, Error<'a>> {
        let mut toks = input.clone();
        match toks.next_token()? {
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("lgtm") => {}
            _ => return Ok(None),
        }
        let command = match toks.peek_token()? {
            Some(Token::Word(arg)) if arg.eq_ignore_ascii_case("cancel") => {
                toks.next_token()?;
                LgtmCommand::Cancel
            }
            _ => LgtmCommand::Lgtm,
        };
        if !toks.at_command_end()? {
            return Err(toks.error(ParseError::ExpectedEnd));
        }
        *input = toks;
        Ok(Some(command))
    }
}

#[cfg(test)]
fn parse<'a>(input: &'a str) -> Result<Option<LgtmCommand>, Error<'a>> {
    let mut toks = Tokenizer::new(input);
    LgtmCommand::parse(&mut toks)
}

#[test]
fn lgtm() {
    assert_eq!(parse("lgtm"), Ok(Some(LgtmCommand::Lgtm)));
    assert_eq!(parse("LGTM cancel"), Ok(Some(LgtmCommand::Cancel)));
}

#[test]
fn lgtm_with_text() {
    assert!(parse("lgtm, ship it").is_err());
}
