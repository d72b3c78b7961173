//! Scanner for the command line parser.

use std::str::Chars;

use crate::error::{ShellError, ShellResult};

/// A token type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenTag {
    /// The end of the command text.
    EndOfCommand,

    /// A string of characters with quotes and escapes already removed.
    Word,

    /// `|`
    Pipe,

    /// `<`
    RedirectIn,

    /// `>`
    RedirectOut,

    /// `>>`
    RedirectOutAppend,

    /// `&`
    Background,
}

/// A token in a command text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// Tags what kind of token this is.
    pub tag: TokenTag,

    /// The token's text. Empty for `EndOfCommand`.
    pub lexeme: String,
}

impl Token {
    fn new(tag: TokenTag, lexeme: String) -> Token {
        Token { tag, lexeme }
    }
}

/// Possible states when scanning a word token.
#[derive(Clone, Copy)]
enum WordState {
    /// Normal state.
    Normal,

    /// Inside single quoted text.
    InSingleQuote,

    /// Inside double quoted text. Backslash escapes only work here.
    InDoubleQuote,
}

/// Converts a command's text into a stream of tokens.
pub struct Scanner<'a> {
    /// An iterator over the command text.
    chars: Chars<'a>,

    /// Current value from command text being considered.
    current: Option<char>,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner for a given command text.
    pub fn new(command_text: &'a str) -> Scanner<'a> {
        let mut scanner = Scanner {
            chars: command_text.chars(),
            current: None,
        };
        scanner.advance();
        scanner
    }

    /// Returns the next token in the command text.
    pub fn next_token(&mut self) -> ShellResult<Token> {
        self.skip_whitespace();

        let token = match self.current {
            None => Token::new(TokenTag::EndOfCommand, String::new()),
            Some(c) if is_operator(c) => self.operator(c),
            Some(_) => self.word()?,
        };

        Ok(token)
    }

    /// Scans a one or two character operator.
    fn operator(&mut self, c: char) -> Token {
        self.advance();
        match c {
            '>' if self.current == Some('>') => {
                self.advance();
                Token::new(TokenTag::RedirectOutAppend, String::from(">>"))
            }
            '>' => Token::new(TokenTag::RedirectOut, String::from(">")),
            '<' => Token::new(TokenTag::RedirectIn, String::from("<")),
            '|' => Token::new(TokenTag::Pipe, String::from("|")),
            _ => Token::new(TokenTag::Background, String::from("&")),
        }
    }

    /// Scans a quoted word.
    ///
    /// An operator reached before any character was collected, as in `''>`,
    /// is the token instead of an empty word.
    fn word(&mut self) -> ShellResult<Token> {
        use WordState::*;

        let mut state = Normal;
        let mut s = String::new();

        loop {
            match (self.current, state) {
                (Some('\''), Normal) => {
                    state = InSingleQuote;
                    self.advance();
                }

                (Some('\''), InSingleQuote) => {
                    state = Normal;
                    self.advance();
                }

                (Some('"'), Normal) => {
                    state = InDoubleQuote;
                    self.advance();
                }

                (Some('"'), InDoubleQuote) => {
                    state = Normal;
                    self.advance();
                }

                (Some('\\'), InDoubleQuote) => {
                    self.advance();
                    if let Some(escaped) = self.current {
                        s.push(escaped);
                        self.advance();
                    }
                }

                (Some(c), Normal) if is_operator(c) && s.is_empty() => {
                    return Ok(self.operator(c));
                }

                (Some(c), Normal) if is_whitespace(c) || is_operator(c) => break,

                (Some(c), _) => {
                    s.push(c);
                    self.advance();
                }

                (None, Normal) => break,

                (None, InSingleQuote | InDoubleQuote) => {
                    return Err(ShellError::UnterminatedQuote);
                }
            }
        }

        Ok(Token::new(TokenTag::Word, s))
    }

    /// Advances the scanner past any whitespace.
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current {
            if !is_whitespace(c) {
                break;
            }
            self.advance();
        }
    }

    /// Advances `current` to the next character in command text.
    fn advance(&mut self) {
        self.current = self.chars.next();
    }
}

/// Scans a whole line. The last token is always `EndOfCommand`.
///
/// An unterminated quote discards everything scanned so far.
pub fn tokenize(command_text: &str) -> ShellResult<Vec<Token>> {
    let mut scanner = Scanner::new(command_text);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.next_token()?;
        let done = token.tag == TokenTag::EndOfCommand;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

/// Determines if the given character starts an operator token.
fn is_operator(c: char) -> bool {
    matches!(c, '>' | '<' | '|' | '&')
}

/// Determines if the given character is whitespace.
fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '\x0b' | '\x0c')
}
