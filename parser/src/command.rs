use crate::error::Error;
use crate::ignore_block::IgnoreBlocks;
use crate::token::Tokenizer;

pub mod approve;
pub mod lgtm;

/// Finds the next `/` that starts a line, at or after `from`.
pub fn find_command_start(input: &str, from: usize) -> Option<usize> {
    input[from..]
        .match_indices('/')
        .map(|(idx, _)| from + idx)
        .find(|&idx| idx == 0 || input.as_bytes()[idx - 1] == b'\n')
}

#[derive(Debug, PartialEq)]
pub enum Command<'a> {
    Approve(Result<approve::ApproveCommand, Error<'a>>),
    Lgtm(Result<lgtm::LgtmCommand, Error<'a>>),
}

/// Iterator over the slash commands of a comment body, in order of
/// appearance.
#[derive(Debug)]
pub struct Input<'a> {
    all: &'a str,
    parsed: usize,
    ignore: IgnoreBlocks,
}

fn parse_single_command<'a, T, F, M>(
    parse: F,
    mapper: M,
    tokenizer: &Tokenizer<'a>,
) -> Option<(Tokenizer<'a>, Command<'a>)>
where
    F: FnOnce(&mut Tokenizer<'a>) -> Result<Option<T>, Error<'a>>,
    M: FnOnce(Result<T, Error<'a>>) -> Command<'a>,
    T: std::fmt::Debug,
{
    let mut tok = tokenizer.clone();
    let res = parse(&mut tok);
    tracing::trace!("parsed {:?} command: {:?}", std::any::type_name::<T>(), res);
    match res {
        Ok(None) => None,
        Ok(Some(v)) => Some((tok, mapper(Ok(v)))),
        Err(err) => Some((tok, mapper(Err(err)))),
    }
}

impl<'a> Input<'a> {
    pub fn new(input: &'a str) -> Input<'a> {
        Input {
            all: input,
            parsed: 0,
            ignore: IgnoreBlocks::new(input),
        }
    }

    /// Parses the command whose slash is at `start`.
    fn parse_command(&self, start: usize) -> Option<Command<'a>> {
        let tok = Tokenizer::new(&self.all[start + 1..]);

        let mut success = vec![];
        success.extend(parse_single_command(
            approve::ApproveCommand::parse,
            Command::Approve,
            &tok,
        ));
        success.extend(parse_single_command(
            lgtm::LgtmCommand::parse,
            Command::Lgtm,
            &tok,
        ));
        debug_assert!(success.len() <= 1, "command words are distinct");

        let (mut tok, command) = success.pop()?;
        let end = start + 1 + tok.position();
        if let Some(block) = self.ignore.overlaps_ignore(start..end) {
            tracing::debug!("command overlaps ignored block {:?}", block);
            return None;
        }
        Some(command)
    }

    fn skip_line(&mut self, start: usize) {
        self.parsed = match self.all[start..].find('\n') {
            Some(newline) => start + newline + 1,
            None => self.all.len(),
        };
    }
}

impl<'a> Iterator for Input<'a> {
    type Item = Command<'a>;

    fn next(&mut self) -> Option<Command<'a>> {
        loop {
            let start = find_command_start(self.all, self.parsed)?;
            let command = self.parse_command(start);
            self.skip_line(start);
            if command.is_some() {
                return command;
            }
        }
    }
}

impl Command<'_> {
    pub fn is_ok(&self) -> bool {
        match self {
            Command::Approve(r) => r.is_ok(),
            Command::Lgtm(r) => r.is_ok(),
        }
    }

    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }
}

#[cfg(test)]
fn commands(body: &str) -> Vec<Command<'_>> {
    Input::new(body).collect()
}

#[test]
fn command_must_start_line() {
    assert!(commands("please /approve").is_empty());
    assert!(commands("  /approve").is_empty());
}

#[test]
fn several_commands() {
    assert_eq!(
        commands("Looks great!\n/lgtm\n/approve no-issue\n"),
        [
            Command::Lgtm(Ok(lgtm::LgtmCommand::Lgtm)),
            Command::Approve(Ok(approve::ApproveCommand::NoIssue)),
        ]
    );
}

#[test]
fn unknown_commands_are_skipped() {
    assert_eq!(
        commands("/assign @octocat\n/hold\n/approve"),
        [Command::Approve(Ok(approve::ApproveCommand::Approve))]
    );
}

#[test]
fn code_block_is_ignored() {
    assert!(commands("```\n/approve\n```").is_empty());
    assert_eq!(
        commands("```\n/approve\n```\n/approve cancel\n"),
        [Command::Approve(Ok(approve::ApproveCommand::Cancel))]
    );
}

#[test]
fn bad_argument_is_an_error() {
    let mut input = Input::new("/approve everything\n/lgtm");
    assert!(input.next().unwrap().is_err());
    assert_eq!(input.next(), Some(Command::Lgtm(Ok(lgtm::LgtmCommand::Lgtm))));
    assert!(input.next().is_none());
}

#[test]
fn windows_line_endings() {
    assert_eq!(
        commands("/approve\r\n/lgtm cancel\r\n"),
        [
            Command::Approve(Ok(approve::ApproveCommand::Approve)),
            Command::Lgtm(Ok(lgtm::LgtmCommand::Cancel)),
        ]
    );
}
