use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Token<'a> {
    Dot,
    Comma,
    Semi,
    Exclamation,
    Question,
    Colon,
    EndOfLine,
    Quote(&'a str),
    Word(&'a str),
}

#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    UnterminatedString,
    QuoteInWord,
}

impl std::error::Error for ErrorKind {}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ErrorKind::UnterminatedString => "unterminated string",
                ErrorKind::QuoteInWord => "quotes are not allowed inside words",
            }
        )
    }
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Tokenizer<'a> {
        Tokenizer {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    pub fn error<T: 'static + std::error::Error + Send>(&mut self, source: T) -> crate::Error<'a> {
        crate::Error {
            input: self.input,
            position: self.cur_pos(),
            source: Box::new(source),
        }
    }

    /// Skips whitespace up to (but not including) the next newline.
    fn consume_whitespace(&mut self) {
        while self
            .cur()
            .is_some_and(|(_, ch)| ch.is_whitespace() && ch != '\n')
        {
            self.advance();
        }
    }

    fn cur_punct(&mut self) -> Option<Token<'static>> {
        let (_, ch) = self.cur()?;
        match ch {
            '.' => Some(Token::Dot),
            ',' => Some(Token::Comma),
            ':' => Some(Token::Colon),
            '!' => Some(Token::Exclamation),
            '?' => Some(Token::Question),
            ';' => Some(Token::Semi),
            '\n' => Some(Token::EndOfLine),
            _ => None,
        }
    }

    fn consume_punct(&mut self) -> Option<Token<'a>> {
        let x = self.cur_punct()?;
        self.advance();
        Some(x)
    }

    fn cur(&mut self) -> Option<(usize, char)> {
        self.chars.peek().cloned()
    }

    fn at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }

    fn advance(&mut self) -> Option<()> {
        let (_, _) = self.chars.next()?;
        Some(())
    }

    pub fn position(&mut self) -> usize {
        self.cur_pos()
    }

    fn cur_pos(&mut self) -> usize {
        self.cur().map_or(self.input.len(), |(pos, _)| pos)
    }

    fn str_from(&mut self, pos: usize) -> &'a str {
        &self.input[pos..self.cur_pos()]
    }

    fn consume_string(&mut self) -> Result<Option<Token<'a>>, crate::Error<'a>> {
        if let Some((_, '"')) = self.cur() {
            // okay
        } else {
            return Ok(None);
        }
        self.advance(); // eat "
        let start = self.cur_pos();
        loop {
            match self.cur() {
                Some((_, '"')) => break,
                Some(_) => self.advance(),
                None => return Err(self.error(ErrorKind::UnterminatedString)),
            };
        }
        let body = self.str_from(start);
        self.advance(); // eat final '"'
        Ok(Some(Token::Quote(body)))
    }

    pub fn peek_token(&mut self) -> Result<Option<Token<'a>>, crate::Error<'a>> {
        self.clone().next_token()
    }

    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, crate::Error<'a>> {
        self.consume_whitespace();
        if self.at_end() {
            return Ok(None);
        }
        if let Some(punct) = self.consume_punct() {
            return Ok(Some(punct));
        }

        if let Some(s) = self.consume_string()? {
            return Ok(Some(s));
        }

        // Attempt to consume a word from the input.
        // Stop if we encounter whitespace or punctuation.
        let start = self.cur_pos();
        while let Some((_, ch)) = self.cur() {
            if self.cur_punct().is_some() || ch.is_whitespace() {
                break;
            }
            if ch == '"' {
                return Err(self.error(ErrorKind::QuoteInWord));
            }
            self.advance();
        }
        Ok(Some(Token::Word(self.str_from(start))))
    }

    /// Returns true if the next token ends the command: a newline, a dot, or
    /// the end of input.
    pub fn at_command_end(&mut self) -> Result<bool, crate::Error<'a>> {
        Ok(matches!(
            self.peek_token()?,
            None | Some(Token::EndOfLine) | Some(Token::Dot)
        ))
    }
}

#[cfg(test)]
fn tokenize<'a>(input: &'a str) -> Result<Vec<Token<'a>>, crate::Error<'a>> {
    let mut tokens = Vec::new();
    let mut tokenizer = Tokenizer::new(input);
    while let Some(tok) = tokenizer.next_token()? {
        tokens.push(tok);
    }
    Ok(tokens)
}

#[test]
fn tokenize_newlines() {
    assert_eq!(
        tokenize("foo\t\r\n bar\nbaz").unwrap(),
        [
            Token::Word("foo"),
            Token::EndOfLine,
            Token::Word("bar"),
            Token::EndOfLine,
            Token::Word("baz"),
        ]
    );
}

#[test]
fn tokenize_punctuation() {
    assert_eq!(
        tokenize("approve. ,cancel ").unwrap(),
        [
            Token::Word("approve"),
            Token::Dot,
            Token::Comma,
            Token::Word("cancel")
        ]
    );
}

#[test]
fn tokenize_hyphenated_word() {
    assert_eq!(
        tokenize("approve no-issue").unwrap(),
        [Token::Word("approve"), Token::Word("no-issue")]
    );
}

#[test]
fn tokenize_quote() {
    assert_eq!(tokenize(r#""testing""#).unwrap(), [Token::Quote("testing")]);
}

#[test]
fn tokenize_unterminated_quote() {
    use std::error::Error;
    assert_eq!(
        tokenize(r#""testing"#)
            .unwrap_err()
            .source()
            .unwrap()
            .downcast_ref(),
        Some(&ErrorKind::UnterminatedString)
    );
}

#[test]
fn tokenize_quote_inside_word() {
    use std::error::Error;
    assert_eq!(
        tokenize(r#"app"rove"#)
            .unwrap_err()
            .source()
            .unwrap()
            .downcast_ref(),
        Some(&ErrorKind::QuoteInWord)
    );
}
