//! Selector Tokenizer
//!
//! Splits a selector string into tokens following the CSS Syntax Module
//! Level 3 rules, restricted to what selectors can contain. Numbers keep
//! their source text so `an+b` arguments can be reassembled exactly.

use crate::error::{SelectorError, SelectorResult, SourceLocation};

/// Selector token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier (type names, classes, pseudo-class names)
    Ident(String),
    /// Function token (identifier followed by '(')
    Function(String),
    /// Hash token (e.g., #id)
    Hash(String, HashType),
    /// Quoted string
    String(String),
    /// Number, as written
    Number(String),
    /// Number followed by an identifier (e.g., `2n`, `3n-1`)
    Dimension(String, String),
    /// Whitespace
    Whitespace,
    /// Colon ':'
    Colon,
    /// Comma ','
    Comma,
    /// Left bracket '['
    LeftBracket,
    /// Right bracket ']'
    RightBracket,
    /// Left paren '('
    LeftParen,
    /// Right paren ')'
    RightParen,
    /// Delim (any other single character)
    Delim(char),
    /// End of input
    Eof,
}

impl Token {
    /// Source-like rendering, used to rebuild argument text
    pub fn to_css(&self) -> String {
        match self {
            Token::Ident(s) => s.clone(),
            Token::Function(s) => format!("{}(", s),
            Token::Hash(s, _) => format!("#{}", s),
            Token::String(s) => format!("{:?}", s),
            Token::Number(n) => n.clone(),
            Token::Dimension(n, u) => format!("{}{}", n, u),
            Token::Whitespace => " ".to_string(),
            Token::Colon => ":".to_string(),
            Token::Comma => ",".to_string(),
            Token::LeftBracket => "[".to_string(),
            Token::RightBracket => "]".to_string(),
            Token::LeftParen => "(".to_string(),
            Token::RightParen => ")".to_string(),
            Token::Delim(c) => c.to_string(),
            Token::Eof => String::new(),
        }
    }
}

/// Hash token type (id or unrestricted)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashType {
    /// Valid identifier after '#'
    Id,
    /// Starts with a digit
    Unrestricted,
}

/// Selector tokenizer
pub struct Tokenizer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    position: usize,
    line: usize,
    column: usize,
}

impl<'a> Tokenizer<'a> {
    /// Create a new tokenizer
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Get the current source location
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column, self.position)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn peek_second(&self) -> Option<char> {
        let mut iter = self.input[self.position..].chars();
        iter.next();
        iter.next()
    }

    fn advance(&mut self) -> Option<char> {
        let (pos, c) = self.chars.next()?;
        self.position = pos + c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn consume_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if is_whitespace(c) {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn consume_comment(&mut self) {
        self.advance();
        self.advance();
        loop {
            match self.advance() {
                Some('*') if self.peek() == Some('/') => {
                    self.advance();
                    return;
                }
                Some(_) => continue,
                None => return,
            }
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> SelectorResult<Token> {
        let mut saw_whitespace = false;
        while let Some(c) = self.peek() {
            if is_whitespace(c) {
                saw_whitespace = true;
                self.consume_whitespace();
            } else if c == '/' && self.peek_second() == Some('*') {
                self.consume_comment();
            } else {
                break;
            }
        }

        if saw_whitespace {
            return Ok(Token::Whitespace);
        }

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let single = match c {
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            '[' => Some(Token::LeftBracket),
            ']' => Some(Token::RightBracket),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        match c {
            '"' | '\'' => self.consume_string(),
            '#' => self.consume_hash(),
            '.' if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => self.consume_number(),
            '0'..='9' => self.consume_number(),
            '+' | '-' => {
                let next = self.peek_second();
                if next.is_some_and(|c| c.is_ascii_digit() || c == '.') {
                    self.consume_number()
                } else if c == '-' && self.starts_identifier() {
                    self.consume_ident_like()
                } else {
                    self.advance();
                    Ok(Token::Delim(c))
                }
            }
            _ if self.starts_identifier() => self.consume_ident_like(),
            _ => {
                self.advance();
                Ok(Token::Delim(c))
            }
        }
    }

    /// Check if input starts an identifier
    fn starts_identifier(&self) -> bool {
        let mut chars = self.input[self.position..].chars();
        match chars.next() {
            Some('-') => match chars.next() {
                Some('-') => true,
                Some('\\') => chars.next().is_some_and(|c| c != '\n'),
                Some(c) => is_ident_start(c),
                None => false,
            },
            Some('\\') => chars.next().is_some_and(|c| c != '\n'),
            Some(c) => is_ident_start(c),
            None => false,
        }
    }

    fn consume_string(&mut self) -> SelectorResult<Token> {
        let Some(quote) = self.advance() else {
            return Err(SelectorError::UnexpectedEof { location: self.location() });
        };
        let mut value = String::new();

        loop {
            match self.advance() {
                Some(c) if c == quote => return Ok(Token::String(value)),
                Some('\\') => match self.peek() {
                    Some('\n') => {
                        self.advance();
                    }
                    Some(_) => value.push(self.consume_escape()),
                    None => {}
                },
                Some('\n') | None => {
                    return Err(SelectorError::UnterminatedString { location: self.location() });
                }
                Some(c) => value.push(c),
            }
        }
    }

    fn consume_hash(&mut self) -> SelectorResult<Token> {
        self.advance(); // '#'
        let hash_type = match self.peek() {
            Some(c) if c.is_ascii_digit() => HashType::Unrestricted,
            _ => HashType::Id,
        };
        let value = self.consume_ident_name();
        if value.is_empty() {
            return Ok(Token::Delim('#'));
        }
        Ok(Token::Hash(value, hash_type))
    }

    /// Consume an escape after the backslash (hex code point or literal char)
    fn consume_escape(&mut self) -> char {
        let mut hex = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_hexdigit() && hex.len() < 6 {
                hex.push(c);
                self.advance();
            } else {
                break;
            }
        }

        if hex.is_empty() {
            return self.advance().unwrap_or('\u{FFFD}');
        }

        if self.peek().is_some_and(is_whitespace) {
            self.advance();
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .filter(|&cp| cp != 0)
            .and_then(char::from_u32)
            .unwrap_or('\u{FFFD}')
    }

    fn consume_ident_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if is_ident_char(c) {
                name.push(c);
                self.advance();
            } else if c == '\\' && self.peek_second().is_some_and(|n| n != '\n') {
                self.advance();
                name.push(self.consume_escape());
            } else {
                break;
            }
        }
        name
    }

    fn consume_ident_like(&mut self) -> SelectorResult<Token> {
        let name = self.consume_ident_name();

        if self.peek() == Some('(') {
            self.advance();
            return Ok(Token::Function(name));
        }

        Ok(Token::Ident(name))
    }

    fn consume_number(&mut self) -> SelectorResult<Token> {
        let mut num_str = String::new();

        if let Some(c @ ('+' | '-')) = self.peek() {
            num_str.push(c);
            self.advance();
        }

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                num_str.push(c);
                self.advance();
            } else {
                break;
            }
        }

        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            num_str.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    num_str.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if num_str.parse::<f64>().is_err() {
            return Err(SelectorError::InvalidNumber {
                number: num_str,
                location: self.location(),
            });
        }

        if self.starts_identifier() {
            let unit = self.consume_ident_name();
            return Ok(Token::Dimension(num_str, unit));
        }

        Ok(Token::Number(num_str))
    }

    /// Tokenize all remaining input, pairing each token with where it starts
    pub fn tokenize_located(&mut self) -> SelectorResult<Vec<(Token, SourceLocation)>> {
        let mut tokens = Vec::new();
        loop {
            let location = self.location();
            let token = self.next_token()?;
            if token == Token::Eof {
                break;
            }
            tokens.push((token, location));
        }
        Ok(tokens)
    }

    /// Tokenize all remaining input
    pub fn tokenize_all(&mut self) -> SelectorResult<Vec<Token>> {
        Ok(self.tokenize_located()?.into_iter().map(|(token, _)| token).collect())
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c > '\x7F'
}

fn is_ident_char(c: char) -> bool {
    is_ident_start(c) || c == '-' || c.is_ascii_digit()
}
