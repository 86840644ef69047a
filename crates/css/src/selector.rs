//! Selector Parser
//!
//! Parses selector groups into a flat list of simple selectors and
//! combinators. Functional pseudo-class arguments are kept as tokens and
//! interpreted later by the translator.

use crate::error::{SelectorError, SelectorResult, SourceLocation};
use crate::tokenizer::{Token, Tokenizer};

/// A complex selector: compound selectors joined by combinators
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub parts: Vec<SelectorPart>,
}

/// Namespace qualifier written before a type or universal selector
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamespacePrefix {
    /// No `|` at all
    #[default]
    Default,
    /// `*|name`
    Any,
    /// `|name`
    None,
    /// `prefix|name`
    Named(String),
}

/// A part of a complex selector
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorPart {
    /// Universal selector (`*`, `ns|*`)
    Universal(NamespacePrefix),
    /// Type selector (`div`, `svg|rect`)
    Type {
        namespace: NamespacePrefix,
        name: String,
    },
    /// Class selector (`.container`)
    Class(String),
    /// ID selector (`#main`)
    Id(String),
    /// Attribute selector (`[type="text" i]`)
    Attribute {
        name: String,
        op: Option<AttributeOp>,
        value: Option<String>,
        case_insensitive: bool,
    },
    /// Pseudo-class; functional ones carry their argument tokens
    PseudoClass {
        name: String,
        args: Option<Vec<Token>>,
    },
    /// Pseudo-element (`::before`)
    PseudoElement(String),
    /// Combinator between compound selectors
    Combinator(Combinator),
}

/// Attribute selector operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeOp {
    /// [attr=value] - exact match
    Equals,
    /// [attr~=value] - contains word
    Includes,
    /// [attr|=value] - equals value or starts with value-
    DashMatch,
    /// [attr^=value] - starts with
    PrefixMatch,
    /// [attr$=value] - ends with
    SuffixMatch,
    /// [attr*=value] - contains
    SubstringMatch,
}

/// Selector combinators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Descendant combinator (space)
    Descendant,
    /// Child combinator (>)
    Child,
    /// Next sibling combinator (+)
    NextSibling,
    /// Subsequent sibling combinator (~)
    SubsequentSibling,
}

impl Selector {
    /// Parse a single complex selector
    pub fn parse(input: &str) -> SelectorResult<Self> {
        let mut parser = SelectorParser::new(input)?;
        let selector = parser.parse_selector()?;
        parser.expect_end()?;
        Ok(selector)
    }

    /// Parse a comma-separated list of selectors
    pub fn parse_list(input: &str) -> SelectorResult<Vec<Self>> {
        SelectorParser::new(input)?.parse_selector_list()
    }

    /// Compound selectors of this selector, with the combinator preceding each
    pub fn compounds(&self) -> Vec<(Option<Combinator>, &[SelectorPart])> {
        let mut result = Vec::new();
        let mut combinator = None;
        let mut start = 0;
        for (i, part) in self.parts.iter().enumerate() {
            if let SelectorPart::Combinator(c) = part {
                result.push((combinator, &self.parts[start..i]));
                combinator = Some(*c);
                start = i + 1;
            }
        }
        result.push((combinator, &self.parts[start..]));
        result
    }
}

/// Parser over a pre-tokenized selector
pub struct SelectorParser {
    tokens: Vec<(Token, SourceLocation)>,
    pos: usize,
    end: SourceLocation,
}

impl SelectorParser {
    /// Tokenize `input` and prepare to parse it
    pub fn new(input: &str) -> SelectorResult<Self> {
        let mut tokenizer = Tokenizer::new(input);
        let tokens = tokenizer.tokenize_located()?;
        let end = tokenizer.location();
        Ok(Self { tokens, pos: 0, end })
    }

    /// Parse tokens captured from a pseudo-class argument
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens
                .into_iter()
                .map(|t| (t, SourceLocation::default()))
                .collect(),
            pos: 0,
            end: SourceLocation::default(),
        }
    }

    fn location(&self) -> SourceLocation {
        self.tokens
            .get(self.pos)
            .map(|(_, loc)| *loc)
            .unwrap_or(self.end)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Skip whitespace, reporting whether any was skipped
    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while let Some(Token::Whitespace) = self.peek() {
            self.pos += 1;
            skipped = true;
        }
        skipped
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(token) => SelectorError::UnexpectedToken {
                found: token.to_css(),
                location: self.location(),
            },
            None => SelectorError::UnexpectedEof { location: self.end },
        }
    }

    /// Fail unless only whitespace remains
    pub fn expect_end(&mut self) -> SelectorResult<()> {
        self.skip_whitespace();
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.unexpected()),
        }
    }

    /// Parse `a, b, c` until the end of input
    pub fn parse_selector_list(&mut self) -> SelectorResult<Vec<Selector>> {
        let mut selectors = Vec::new();

        loop {
            self.skip_whitespace();
            selectors.push(self.parse_selector()?);
            self.skip_whitespace();

            match self.peek() {
                Some(Token::Comma) => {
                    self.advance();
                }
                None => break,
                Some(_) => return Err(self.unexpected()),
            }
        }

        Ok(selectors)
    }

    /// Parse one complex selector, stopping before a comma or the end
    pub fn parse_selector(&mut self) -> SelectorResult<Selector> {
        let mut parts = Vec::new();
        let mut saw_simple_selector = false;

        loop {
            let had_whitespace = self.skip_whitespace();

            if matches!(self.peek(), None | Some(Token::Comma)) {
                break;
            }

            if let Some(comb) = self.try_parse_combinator() {
                if !saw_simple_selector {
                    self.pos -= 1;
                    return Err(self.unexpected());
                }
                parts.push(SelectorPart::Combinator(comb));
                saw_simple_selector = false;
                continue;
            }

            if saw_simple_selector && had_whitespace {
                parts.push(SelectorPart::Combinator(Combinator::Descendant));
            }

            match self.try_parse_simple_selector()? {
                Some(part) => {
                    parts.push(part);
                    saw_simple_selector = true;
                }
                None => return Err(self.unexpected()),
            }
        }

        if !saw_simple_selector {
            return Err(SelectorError::ExpectedSelector { location: self.location() });
        }

        Ok(Selector { parts })
    }

    fn try_parse_combinator(&mut self) -> Option<Combinator> {
        let comb = match self.peek() {
            Some(Token::Delim('>')) => Combinator::Child,
            Some(Token::Delim('+')) => Combinator::NextSibling,
            Some(Token::Delim('~')) => Combinator::SubsequentSibling,
            _ => return None,
        };
        self.advance();
        Some(comb)
    }

    fn try_parse_simple_selector(&mut self) -> SelectorResult<Option<SelectorPart>> {
        match self.peek().cloned() {
            Some(Token::Delim('*')) | Some(Token::Ident(_)) => {
                if matches!(self.peek_at(1), Some(Token::Delim('|')))
                    && matches!(self.peek_at(2), Some(Token::Ident(_)) | Some(Token::Delim('*')))
                {
                    let prefix = match self.advance() {
                        Some(Token::Ident(p)) => NamespacePrefix::Named(p),
                        _ => NamespacePrefix::Any,
                    };
                    self.advance(); // '|'
                    return self.parse_type_or_universal(prefix).map(Some);
                }
                self.parse_type_or_universal(NamespacePrefix::Default).map(Some)
            }
            Some(Token::Delim('|')) => {
                self.advance();
                self.parse_type_or_universal(NamespacePrefix::None).map(Some)
            }
            Some(Token::Hash(name, _)) => {
                self.advance();
                Ok(Some(SelectorPart::Id(name)))
            }
            Some(Token::Delim('.')) => {
                self.advance();
                match self.peek().cloned() {
                    Some(Token::Ident(name)) => {
                        self.advance();
                        Ok(Some(SelectorPart::Class(name)))
                    }
                    _ => Err(self.unexpected()),
                }
            }
            Some(Token::LeftBracket) => self.parse_attribute_selector().map(Some),
            Some(Token::Colon) => self.parse_pseudo_selector().map(Some),
            _ => Ok(None),
        }
    }

    fn parse_type_or_universal(&mut self, namespace: NamespacePrefix) -> SelectorResult<SelectorPart> {
        match self.peek().cloned() {
            Some(Token::Delim('*')) => {
                self.advance();
                Ok(SelectorPart::Universal(namespace))
            }
            Some(Token::Ident(name)) => {
                self.advance();
                Ok(SelectorPart::Type { namespace, name })
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_attribute_selector(&mut self) -> SelectorResult<SelectorPart> {
        self.advance(); // '['
        self.skip_whitespace();

        let name = match self.peek().cloned() {
            Some(Token::Ident(name)) => {
                self.advance();
                name
            }
            _ => return Err(self.unexpected()),
        };

        self.skip_whitespace();

        let op = match self.peek() {
            Some(Token::Delim('=')) => {
                self.advance();
                Some(AttributeOp::Equals)
            }
            Some(Token::Delim(c @ ('~' | '|' | '^' | '$' | '*'))) => {
                let op = match c {
                    '~' => AttributeOp::Includes,
                    '|' => AttributeOp::DashMatch,
                    '^' => AttributeOp::PrefixMatch,
                    '$' => AttributeOp::SuffixMatch,
                    _ => AttributeOp::SubstringMatch,
                };
                self.advance();
                if !matches!(self.peek(), Some(Token::Delim('='))) {
                    return Err(self.unexpected());
                }
                self.advance();
                Some(op)
            }
            _ => None,
        };

        let value = if op.is_some() {
            self.skip_whitespace();
            match self.peek().cloned() {
                Some(Token::Ident(v)) | Some(Token::String(v)) | Some(Token::Number(v)) => {
                    self.advance();
                    Some(v)
                }
                _ => return Err(self.unexpected()),
            }
        } else {
            None
        };

        self.skip_whitespace();

        let case_insensitive = match self.peek() {
            Some(Token::Ident(flag)) if op.is_some() && flag.eq_ignore_ascii_case("i") => {
                self.advance();
                true
            }
            Some(Token::Ident(flag)) if op.is_some() && flag.eq_ignore_ascii_case("s") => {
                self.advance();
                false
            }
            _ => false,
        };

        self.skip_whitespace();

        match self.peek() {
            Some(Token::RightBracket) => {
                self.advance();
            }
            _ => return Err(self.unexpected()),
        }

        Ok(SelectorPart::Attribute { name, op, value, case_insensitive })
    }

    fn parse_pseudo_selector(&mut self) -> SelectorResult<SelectorPart> {
        self.advance(); // ':'

        let is_element = if matches!(self.peek(), Some(Token::Colon)) {
            self.advance();
            true
        } else {
            false
        };

        let (name, is_function) = match self.peek().cloned() {
            Some(Token::Ident(name)) => (name.to_ascii_lowercase(), false),
            Some(Token::Function(name)) => (name.to_ascii_lowercase(), true),
            _ => return Err(self.unexpected()),
        };
        self.advance();

        let args = if is_function {
            Some(self.parse_pseudo_args()?)
        } else {
            None
        };

        let is_element = is_element
            || matches!(name.as_str(), "before" | "after" | "first-line" | "first-letter");

        if is_element {
            Ok(SelectorPart::PseudoElement(name))
        } else {
            Ok(SelectorPart::PseudoClass { name, args })
        }
    }

    /// Collect tokens up to the matching ')', trimmed of outer whitespace
    fn parse_pseudo_args(&mut self) -> SelectorResult<Vec<Token>> {
        let mut args = Vec::new();
        let mut paren_depth = 1;

        loop {
            match self.advance() {
                Some(Token::RightParen) => {
                    paren_depth -= 1;
                    if paren_depth == 0 {
                        break;
                    }
                    args.push(Token::RightParen);
                }
                Some(token @ (Token::LeftParen | Token::Function(_))) => {
                    paren_depth += 1;
                    args.push(token);
                }
                Some(token) => args.push(token),
                None => return Err(SelectorError::UnexpectedEof { location: self.end }),
            }
        }

        while args.last() == Some(&Token::Whitespace) {
            args.pop();
        }
        if args.first() == Some(&Token::Whitespace) {
            args.remove(0);
        }
        Ok(args)
    }
}
