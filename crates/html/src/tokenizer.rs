//! Markup tokenizer
//!
//! Converts HTML or XML text into a stream of tokens. HTML mode recovers
//! from every malformation the way browsers do; XML mode stops at the
//! first well-formedness violation and reports it from `next_token`.

use smallvec::SmallVec;
use std::collections::VecDeque;

use crate::entities::{decode_entity, decode_numeric, decode_numeric_xml, decode_xml_entity};
use crate::error::{HtmlError, HtmlResult};

/// A markup token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// DOCTYPE declaration
    Doctype { name: String },
    /// Start tag
    StartTag {
        name: String,
        attributes: SmallVec<[(String, String); 4]>,
        self_closing: bool,
    },
    /// End tag
    EndTag { name: String },
    /// Character data
    Character(char),
    /// Comment
    Comment(String),
    /// Processing instruction, including the XML declaration
    ProcessingInstruction { target: String, data: String },
    /// End of file
    Eof,
}

/// Tokenizer state machine states
#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Data,
    TagOpen,
    EndTagOpen,
    TagName,
    BeforeAttributeName,
    AttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    AttributeValueDoubleQuoted,
    AttributeValueSingleQuoted,
    AttributeValueUnquoted,
    AfterAttributeValueQuoted,
    SelfClosingStartTag,
    BogusComment,
    MarkupDeclarationOpen,
    CommentStart,
    CommentStartDash,
    Comment,
    CommentEndDash,
    CommentEnd,
    Doctype,
    CData,
    ProcessingInstruction,
    RawText,
    RawTextLessThan,
    RawTextEndTagOpen,
    RawTextEndTagName,
}

fn is_whitespace(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\x0C' | '\r' | ' ')
}

fn is_raw_text_tag(name: &str) -> bool {
    name == "script" || name == "style"
}

/// HTML/XML tokenizer
pub struct Tokenizer {
    input: Vec<char>,
    pos: usize,
    state: State,
    xml: bool,
    tokens: VecDeque<Token>,
    error: Option<HtmlError>,
    finished: bool,

    // Current token being built
    current_tag_name: String,
    current_tag_is_end: bool,
    current_tag_self_closing: bool,
    current_attributes: SmallVec<[(String, String); 4]>,
    current_attr_name: String,
    current_attr_value: String,
    current_attr_has_value: bool,
    current_comment: String,

    // For raw text (script, style) handling
    last_start_tag: String,
    temp_buffer: String,
}

impl Tokenizer {
    /// Create a lenient HTML tokenizer
    pub fn new(input: &str) -> Self {
        Self::with_mode(input, false)
    }

    /// Create a strict XML tokenizer
    pub fn new_xml(input: &str) -> Self {
        Self::with_mode(input, true)
    }

    fn with_mode(input: &str, xml: bool) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            state: State::Data,
            xml,
            tokens: VecDeque::new(),
            error: None,
            finished: false,

            current_tag_name: String::new(),
            current_tag_is_end: false,
            current_tag_self_closing: false,
            current_attributes: SmallVec::new(),
            current_attr_name: String::new(),
            current_attr_value: String::new(),
            current_attr_has_value: false,
            current_comment: String::new(),

            last_start_tag: String::new(),
            temp_buffer: String::new(),
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> HtmlResult<Token> {
        loop {
            if let Some(err) = self.error.take() {
                self.finished = true;
                self.tokens.clear();
                return Err(err);
            }
            if let Some(token) = self.tokens.pop_front() {
                return Ok(token);
            }
            if self.finished {
                return Ok(Token::Eof);
            }
            if self.pos >= self.input.len() {
                self.finish();
                continue;
            }
            self.step();
        }
    }

    /// Peek at the current character without consuming
    fn current_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    /// Consume and return the current character
    fn consume(&mut self) -> Option<char> {
        let c = self.current_char()?;
        self.pos += 1;
        Some(c)
    }

    /// Peek at the next n characters
    fn peek_str(&self, n: usize) -> String {
        self.input[self.pos..].iter().take(n).collect()
    }

    /// Check if we're at a specific string (case-insensitive)
    fn at_str_ci(&self, s: &str) -> bool {
        self.peek_str(s.len()).eq_ignore_ascii_case(s)
    }

    fn at_str(&self, s: &str) -> bool {
        self.peek_str(s.chars().count()) == s
    }

    /// Record a well-formedness error. Only the first one is kept.
    fn fail(&mut self, err: HtmlError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
        self.pos = self.input.len();
        self.finished = true;
    }

    /// Emit a token
    fn emit(&mut self, token: Token) {
        if let Token::StartTag { ref name, .. } = token {
            self.last_start_tag = name.clone();
        }
        self.tokens.push_back(token);
    }

    fn emit_comment(&mut self) {
        let text = std::mem::take(&mut self.current_comment);
        self.emit(Token::Comment(text));
    }

    /// Emit the current tag and pick the state that follows it
    fn finish_tag(&mut self) {
        if !self.current_attr_name.is_empty() {
            self.push_attribute();
        }
        if self.error.is_some() {
            return;
        }
        let is_end = self.current_tag_is_end;
        let self_closing = self.current_tag_self_closing;
        if is_end {
            self.emit(Token::EndTag {
                name: self.current_tag_name.clone(),
            });
        } else {
            let attributes = std::mem::take(&mut self.current_attributes);
            self.emit(Token::StartTag {
                name: self.current_tag_name.clone(),
                attributes,
                self_closing,
            });
        }
        self.reset_tag();

        self.state = if !self.xml && !is_end && !self_closing && is_raw_text_tag(&self.last_start_tag) {
            State::RawText
        } else {
            State::Data
        };
    }

    /// Reset tag state
    fn reset_tag(&mut self) {
        self.current_tag_name.clear();
        self.current_tag_is_end = false;
        self.current_tag_self_closing = false;
        self.current_attributes.clear();
        self.current_attr_name.clear();
        self.current_attr_value.clear();
        self.current_attr_has_value = false;
    }

    /// Push current attribute
    fn push_attribute(&mut self) {
        let name = if self.xml {
            std::mem::take(&mut self.current_attr_name)
        } else {
            std::mem::take(&mut self.current_attr_name).to_ascii_lowercase()
        };
        let value = std::mem::take(&mut self.current_attr_value);
        let has_value = std::mem::replace(&mut self.current_attr_has_value, false);

        if name.is_empty() || self.current_tag_is_end {
            return;
        }
        if self.xml && !has_value {
            self.fail(HtmlError::ParseError(format!(
                "Specification mandates value for attribute {}",
                name
            )));
            return;
        }
        if self.current_attributes.iter().any(|(k, _)| *k == name) {
            if self.xml {
                self.fail(HtmlError::DuplicateAttribute(name));
            }
            return;
        }
        self.current_attributes.push((name, value));
    }

    /// Handle end of input in whatever state we are in
    fn finish(&mut self) {
        self.finished = true;
        match self.state {
            State::Data | State::RawText => {}
            State::Comment
            | State::CommentStart
            | State::CommentStartDash
            | State::CommentEndDash
            | State::CommentEnd
            | State::BogusComment
                if !self.xml =>
            {
                self.emit_comment();
            }
            State::RawTextLessThan | State::TagOpen if !self.xml => {
                self.emit(Token::Character('<'));
            }
            _ if self.xml => self.fail(HtmlError::UnexpectedEof),
            _ => {}
        }
        if self.error.is_none() {
            self.emit(Token::Eof);
        }
    }

    /// Execute one step of the state machine
    fn step(&mut self) {
        match self.state {
            State::Data => self.data_state(),
            State::TagOpen => self.tag_open_state(),
            State::EndTagOpen => self.end_tag_open_state(),
            State::TagName => self.tag_name_state(),
            State::BeforeAttributeName => self.before_attribute_name_state(),
            State::AttributeName => self.attribute_name_state(),
            State::AfterAttributeName => self.after_attribute_name_state(),
            State::BeforeAttributeValue => self.before_attribute_value_state(),
            State::AttributeValueDoubleQuoted => self.attribute_value_quoted_state('"'),
            State::AttributeValueSingleQuoted => self.attribute_value_quoted_state('\''),
            State::AttributeValueUnquoted => self.attribute_value_unquoted_state(),
            State::AfterAttributeValueQuoted => self.after_attribute_value_quoted_state(),
            State::SelfClosingStartTag => self.self_closing_start_tag_state(),
            State::BogusComment => self.bogus_comment_state(),
            State::MarkupDeclarationOpen => self.markup_declaration_open_state(),
            State::CommentStart => self.comment_start_state(),
            State::CommentStartDash => self.comment_start_dash_state(),
            State::Comment => self.comment_state(),
            State::CommentEndDash => self.comment_end_dash_state(),
            State::CommentEnd => self.comment_end_state(),
            State::Doctype => self.doctype_state(),
            State::CData => self.cdata_state(),
            State::ProcessingInstruction => self.processing_instruction_state(),
            State::RawText => self.raw_text_state(),
            State::RawTextLessThan => self.raw_text_less_than_state(),
            State::RawTextEndTagOpen => self.raw_text_end_tag_open_state(),
            State::RawTextEndTagName => self.raw_text_end_tag_name_state(),
        }
    }

    fn starts_name(&self, c: char) -> bool {
        c.is_ascii_alphabetic() || (self.xml && (c == '_' || c == ':' || !c.is_ascii()))
    }

    // State implementations

    fn data_state(&mut self) {
        match self.consume() {
            Some('<') => self.state = State::TagOpen,
            Some('&') => {
                if let Some(decoded) = self.consume_entity() {
                    for c in decoded.chars() {
                        self.emit(Token::Character(c));
                    }
                } else if !self.xml {
                    self.emit(Token::Character('&'));
                }
            }
            Some(c) => self.emit(Token::Character(c)),
            None => {}
        }
    }

    fn tag_open_state(&mut self) {
        match self.current_char() {
            Some('!') => {
                self.consume();
                self.state = State::MarkupDeclarationOpen;
            }
            Some('/') => {
                self.consume();
                self.state = State::EndTagOpen;
            }
            Some('?') => {
                self.consume();
                self.state = State::ProcessingInstruction;
            }
            Some(c) if self.starts_name(c) => {
                self.current_tag_is_end = false;
                self.state = State::TagName;
            }
            Some(c) if self.xml => self.fail(HtmlError::UnexpectedChar(c)),
            _ => {
                self.emit(Token::Character('<'));
                self.state = State::Data;
            }
        }
    }

    fn end_tag_open_state(&mut self) {
        match self.current_char() {
            Some(c) if self.starts_name(c) => {
                self.current_tag_is_end = true;
                self.state = State::TagName;
            }
            Some(c) if self.xml => self.fail(HtmlError::UnexpectedChar(c)),
            Some('>') => {
                self.consume();
                self.state = State::Data;
            }
            _ => {
                self.current_comment.clear();
                self.state = State::BogusComment;
            }
        }
    }

    fn tag_name_state(&mut self) {
        match self.consume() {
            Some(c) if is_whitespace(c) => {
                self.state = State::BeforeAttributeName;
            }
            Some('/') => self.state = State::SelfClosingStartTag,
            Some('>') => self.finish_tag(),
            Some(c) if self.xml => self.current_tag_name.push(c),
            Some(c) => self.current_tag_name.push(c.to_ascii_lowercase()),
            None => {}
        }
    }

    fn before_attribute_name_state(&mut self) {
        match self.current_char() {
            Some(c) if is_whitespace(c) => {
                self.consume();
            }
            Some('/') | Some('>') | None => self.state = State::AfterAttributeName,
            Some(c) if self.xml && matches!(c, '=' | '"' | '\'') => {
                self.fail(HtmlError::UnexpectedChar(c));
            }
            Some('=') => {
                self.consume();
                self.current_attr_name.push('=');
                self.state = State::AttributeName;
            }
            _ => self.state = State::AttributeName,
        }
    }

    fn attribute_name_state(&mut self) {
        match self.current_char() {
            Some(c) if is_whitespace(c) || c == '/' || c == '>' => {
                self.state = State::AfterAttributeName;
            }
            None => self.state = State::AfterAttributeName,
            Some('=') => {
                self.consume();
                self.current_attr_has_value = true;
                self.state = State::BeforeAttributeValue;
            }
            Some(c) => {
                self.consume();
                self.current_attr_name.push(c);
            }
        }
    }

    fn after_attribute_name_state(&mut self) {
        match self.current_char() {
            Some(c) if is_whitespace(c) => {
                self.consume();
            }
            Some('/') => {
                self.consume();
                self.state = State::SelfClosingStartTag;
            }
            Some('=') if !self.current_attr_name.is_empty() => {
                self.consume();
                self.current_attr_has_value = true;
                self.state = State::BeforeAttributeValue;
            }
            Some('>') => {
                self.consume();
                self.finish_tag();
            }
            None => {}
            _ => {
                // a new attribute starts; the pending one had no value
                if !self.current_attr_name.is_empty() {
                    self.push_attribute();
                }
                self.state = State::AttributeName;
            }
        }
    }

    fn before_attribute_value_state(&mut self) {
        match self.current_char() {
            Some(c) if is_whitespace(c) => {
                self.consume();
            }
            Some('"') => {
                self.consume();
                self.state = State::AttributeValueDoubleQuoted;
            }
            Some('\'') => {
                self.consume();
                self.state = State::AttributeValueSingleQuoted;
            }
            Some(c) if self.xml => self.fail(HtmlError::ParseError(format!(
                "AttValue: \" or ' expected, found {:?}",
                c
            ))),
            Some('>') => {
                self.consume();
                self.finish_tag();
            }
            _ => self.state = State::AttributeValueUnquoted,
        }
    }

    fn attribute_value_quoted_state(&mut self, quote: char) {
        match self.consume() {
            Some(c) if c == quote => {
                self.push_attribute();
                self.state = State::AfterAttributeValueQuoted;
            }
            Some('&') => {
                if let Some(decoded) = self.consume_entity() {
                    self.current_attr_value.push_str(&decoded);
                } else if !self.xml {
                    self.current_attr_value.push('&');
                }
            }
            Some('<') if self.xml => self.fail(HtmlError::UnexpectedChar('<')),
            Some(c) => self.current_attr_value.push(c),
            None => {}
        }
    }

    fn attribute_value_unquoted_state(&mut self) {
        match self.current_char() {
            Some(c) if is_whitespace(c) => {
                self.consume();
                self.push_attribute();
                self.state = State::BeforeAttributeName;
            }
            Some('&') => {
                self.consume();
                if let Some(decoded) = self.consume_entity() {
                    self.current_attr_value.push_str(&decoded);
                } else {
                    self.current_attr_value.push('&');
                }
            }
            Some('>') => {
                self.consume();
                self.finish_tag();
            }
            Some(c) => {
                self.consume();
                self.current_attr_value.push(c);
            }
            None => {}
        }
    }

    fn after_attribute_value_quoted_state(&mut self) {
        match self.current_char() {
            Some(c) if is_whitespace(c) => {
                self.consume();
                self.state = State::BeforeAttributeName;
            }
            Some('/') => {
                self.consume();
                self.state = State::SelfClosingStartTag;
            }
            Some('>') => {
                self.consume();
                self.finish_tag();
            }
            None => {}
            Some(_) if self.xml => {
                self.fail(HtmlError::ParseError("attributes construct error".into()))
            }
            _ => self.state = State::BeforeAttributeName,
        }
    }

    fn self_closing_start_tag_state(&mut self) {
        match self.current_char() {
            Some('>') => {
                self.consume();
                self.current_tag_self_closing = true;
                self.finish_tag();
            }
            None => {}
            Some(c) if self.xml => self.fail(HtmlError::UnexpectedChar(c)),
            _ => self.state = State::BeforeAttributeName,
        }
    }

    fn bogus_comment_state(&mut self) {
        match self.consume() {
            Some('>') => {
                self.emit_comment();
                self.state = State::Data;
            }
            Some(c) => self.current_comment.push(c),
            None => {}
        }
    }

    fn markup_declaration_open_state(&mut self) {
        if self.at_str("--") {
            self.pos += 2;
            self.current_comment.clear();
            self.state = State::CommentStart;
        } else if self.at_str_ci("DOCTYPE") {
            self.pos += 7;
            self.state = State::Doctype;
        } else if self.at_str("[CDATA[") {
            self.pos += 7;
            self.current_comment.clear();
            self.state = if self.xml { State::CData } else { State::BogusComment };
        } else if self.xml {
            self.fail(HtmlError::ParseError("StartTag: invalid element name".into()));
        } else {
            self.current_comment.clear();
            self.state = State::BogusComment;
        }
    }

    fn comment_start_state(&mut self) {
        match self.current_char() {
            Some('-') => {
                self.consume();
                self.state = State::CommentStartDash;
            }
            Some('>') => {
                self.consume();
                self.emit_comment();
                self.state = State::Data;
            }
            _ => self.state = State::Comment,
        }
    }

    fn comment_start_dash_state(&mut self) {
        match self.current_char() {
            Some('-') => {
                self.consume();
                self.state = State::CommentEnd;
            }
            Some('>') => {
                self.consume();
                self.emit_comment();
                self.state = State::Data;
            }
            None => {}
            _ => {
                self.current_comment.push('-');
                self.state = State::Comment;
            }
        }
    }

    fn comment_state(&mut self) {
        match self.consume() {
            Some('-') => self.state = State::CommentEndDash,
            Some(c) => self.current_comment.push(c),
            None => {}
        }
    }

    fn comment_end_dash_state(&mut self) {
        match self.current_char() {
            Some('-') => {
                self.consume();
                self.state = State::CommentEnd;
            }
            None => {}
            _ => {
                self.current_comment.push('-');
                self.state = State::Comment;
            }
        }
    }

    fn comment_end_state(&mut self) {
        match self.current_char() {
            Some('>') => {
                self.consume();
                self.emit_comment();
                self.state = State::Data;
            }
            None => {}
            Some(_) if self.xml => {
                self.fail(HtmlError::ParseError("Double hyphen within comment".into()))
            }
            Some('-') => {
                self.consume();
                self.current_comment.push('-');
            }
            _ => {
                self.current_comment.push_str("--");
                self.state = State::Comment;
            }
        }
    }

    /// Read the whole declaration in one go; only the name is kept
    fn doctype_state(&mut self) {
        let mut text = String::new();
        let mut depth = 0usize;
        while let Some(c) = self.consume() {
            match c {
                '[' => depth += 1,
                ']' => depth = depth.saturating_sub(1),
                '>' if depth == 0 => {
                    let name = text.split_whitespace().next().unwrap_or("").to_string();
                    let name = if self.xml { name } else { name.to_ascii_lowercase() };
                    self.emit(Token::Doctype { name });
                    self.state = State::Data;
                    return;
                }
                _ => {}
            }
            text.push(c);
        }
    }

    fn cdata_state(&mut self) {
        if self.at_str("]]>") {
            self.pos += 3;
            self.state = State::Data;
            return;
        }
        if let Some(c) = self.consume() {
            self.emit(Token::Character(c));
        }
    }

    /// `<?target data?>`. HTML mode ends at the first `>`.
    fn processing_instruction_state(&mut self) {
        let mut target = String::new();
        while let Some(c) = self.current_char() {
            if is_whitespace(c) || c == '?' || c == '>' {
                break;
            }
            target.push(c);
            self.consume();
        }
        if target.is_empty() && self.xml {
            self.fail(HtmlError::ParseError("xmlParsePI : no target name".into()));
            return;
        }

        let mut data = String::new();
        loop {
            if self.xml && self.at_str("?>") {
                self.pos += 2;
                break;
            }
            match self.consume() {
                Some('>') if !self.xml => {
                    if data.ends_with('?') {
                        data.pop();
                    }
                    break;
                }
                Some(c) => data.push(c),
                None => return,
            }
        }

        self.emit(Token::ProcessingInstruction {
            target,
            data: data.trim_start().to_string(),
        });
        self.state = State::Data;
    }

    fn raw_text_state(&mut self) {
        match self.consume() {
            Some('<') => self.state = State::RawTextLessThan,
            Some(c) => self.emit(Token::Character(c)),
            None => {}
        }
    }

    fn raw_text_less_than_state(&mut self) {
        match self.current_char() {
            Some('/') => {
                self.consume();
                self.temp_buffer.clear();
                self.state = State::RawTextEndTagOpen;
            }
            _ => {
                self.emit(Token::Character('<'));
                self.state = State::RawText;
            }
        }
    }

    fn raw_text_end_tag_open_state(&mut self) {
        match self.current_char() {
            Some(c) if c.is_ascii_alphabetic() => {
                self.current_tag_name.clear();
                self.current_tag_is_end = true;
                self.state = State::RawTextEndTagName;
            }
            _ => {
                self.emit(Token::Character('<'));
                self.emit(Token::Character('/'));
                self.state = State::RawText;
            }
        }
    }

    fn raw_text_end_tag_name_state(&mut self) {
        let matches_open = self.current_tag_name.eq_ignore_ascii_case(&self.last_start_tag);
        match self.current_char() {
            Some(c) if is_whitespace(c) && matches_open => {
                self.consume();
                self.state = State::BeforeAttributeName;
            }
            Some('/') if matches_open => {
                self.consume();
                self.state = State::SelfClosingStartTag;
            }
            Some('>') if matches_open => {
                self.consume();
                self.finish_tag();
            }
            Some(c) if c.is_ascii_alphabetic() => {
                self.consume();
                self.current_tag_name.push(c.to_ascii_lowercase());
                self.temp_buffer.push(c);
            }
            _ => self.emit_raw_text_chars(),
        }
    }

    fn emit_raw_text_chars(&mut self) {
        self.emit(Token::Character('<'));
        self.emit(Token::Character('/'));
        let temp: Vec<char> = self.temp_buffer.chars().collect();
        for c in temp {
            self.emit(Token::Character(c));
        }
        self.temp_buffer.clear();
        self.current_tag_name.clear();
        self.current_tag_is_end = false;
        self.state = State::RawText;
    }

    /// Try to consume a character reference after `&`
    fn consume_entity(&mut self) -> Option<String> {
        if self.xml {
            return self.consume_xml_reference();
        }
        match self.current_char() {
            Some('#') => {
                let start = self.pos;
                self.consume();
                let is_hex = matches!(self.current_char(), Some('x') | Some('X'));
                if is_hex {
                    self.consume();
                }

                let mut num_str = String::new();
                while let Some(c) = self.current_char() {
                    if c == ';' {
                        self.consume();
                        break;
                    }
                    if (is_hex && c.is_ascii_hexdigit()) || (!is_hex && c.is_ascii_digit()) {
                        num_str.push(c);
                        self.consume();
                    } else {
                        break;
                    }
                }

                if num_str.is_empty() {
                    self.pos = start;
                    return None;
                }
                if is_hex {
                    num_str.insert(0, 'x');
                }
                decode_numeric(&num_str).map(|c| c.to_string())
            }
            Some(c) if c.is_ascii_alphabetic() => {
                let mut name = String::new();
                let start = self.pos;

                while let Some(c) = self.current_char() {
                    if c == ';' {
                        self.consume();
                        break;
                    }
                    if c.is_ascii_alphanumeric() {
                        name.push(c);
                        self.consume();
                    } else {
                        break;
                    }
                }

                if let Some(decoded) = decode_entity(&name) {
                    Some(decoded.to_string())
                } else {
                    // Rewind if no entity found
                    self.pos = start;
                    None
                }
            }
            _ => None,
        }
    }

    /// XML references must be terminated and known
    fn consume_xml_reference(&mut self) -> Option<String> {
        let mut body = String::new();
        loop {
            match self.consume() {
                Some(';') => break,
                Some(c) if c.is_alphanumeric() || matches!(c, '#' | '_' | '-' | '.' | ':') => {
                    body.push(c)
                }
                _ => {
                    self.fail(HtmlError::ParseError("EntityRef: expecting ';'".into()));
                    return None;
                }
            }
        }

        if let Some(num) = body.strip_prefix('#') {
            match decode_numeric_xml(num) {
                Some(c) => Some(c.to_string()),
                None => {
                    self.fail(HtmlError::InvalidCharRef(num.to_string()));
                    None
                }
            }
        } else if body.is_empty() {
            self.fail(HtmlError::ParseError("xmlParseEntityRef: no name".into()));
            None
        } else {
            match decode_xml_entity(&body) {
                Some(s) => Some(s.to_string()),
                None => {
                    self.fail(HtmlError::UndefinedEntity(body));
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(mut tokenizer: Tokenizer) -> HtmlResult<Vec<Token>> {
        let mut out = Vec::new();
        loop {
            match tokenizer.next_token()? {
                Token::Eof => return Ok(out),
                tok => out.push(tok),
            }
        }
    }

    fn text_of(tokens: &[Token]) -> String {
        tokens
            .iter()
            .filter_map(|t| match t {
                Token::Character(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_simple_element() {
        let tokens = tokens(Tokenizer::new("<div>hello</div>")).unwrap();

        assert!(matches!(&tokens[0], Token::StartTag { name, .. } if name == "div"));
        assert!(matches!(&tokens[6], Token::EndTag { name } if name == "div"));
    }

    #[test]
    fn test_attributes() {
        let mut tokenizer = Tokenizer::new(r#"<a href = "test" class='foo' hidden>"#);
        let tok = tokenizer.next_token().unwrap();

        if let Token::StartTag { name, attributes, .. } = tok {
            assert_eq!(name, "a");
            assert_eq!(
                attributes.to_vec(),
                vec![
                    ("href".to_string(), "test".to_string()),
                    ("class".to_string(), "foo".to_string()),
                    ("hidden".to_string(), String::new()),
                ]
            );
        } else {
            panic!("Expected StartTag");
        }
    }

    #[test]
    fn test_doctype() {
        let mut tokenizer = Tokenizer::new("<!DOCTYPE html>");
        let tok = tokenizer.next_token().unwrap();
        assert_eq!(tok, Token::Doctype { name: "html".into() });
    }

    #[test]
    fn test_comment() {
        let mut tokenizer = Tokenizer::new("<!-- this is a comment -->");
        let tok = tokenizer.next_token().unwrap();
        assert_eq!(tok, Token::Comment(" this is a comment ".into()));
    }

    #[test]
    fn test_script_end_returns_to_data() {
        let tokens = tokens(Tokenizer::new("<script>a<b</script><i>x</i>")).unwrap();
        assert!(tokens.contains(&Token::EndTag { name: "script".into() }));
        assert!(tokens.contains(&Token::StartTag {
            name: "i".into(),
            attributes: SmallVec::new(),
            self_closing: false
        }));
        assert_eq!(text_of(&tokens), "a<bx");
    }

    #[test]
    fn test_html_is_lenient() {
        let tokens = tokens(Tokenizer::new("a < b && c &copy; &bogus;")).unwrap();
        assert_eq!(text_of(&tokens), "a < b && c \u{a9} &bogus;");
    }

    #[test]
    fn test_xml_keeps_case() {
        let tokens = tokens(Tokenizer::new_xml(r#"<Root xmlns:a="u" a:Key="v"/>"#)).unwrap();
        match &tokens[0] {
            Token::StartTag { name, attributes, self_closing } => {
                assert_eq!(name, "Root");
                assert_eq!(attributes[1], ("a:Key".to_string(), "v".to_string()));
                assert!(*self_closing);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_xml_strictness() {
        assert_eq!(
            tokens(Tokenizer::new_xml("<a>&nbsp;</a>")).unwrap_err(),
            HtmlError::UndefinedEntity("nbsp".into())
        );
        assert!(tokens(Tokenizer::new_xml("<a>x & y</a>")).is_err());
        assert!(tokens(Tokenizer::new_xml("<a>1 < 2</a>")).is_err());
        assert!(tokens(Tokenizer::new_xml("<input disabled/>")).is_err());
        assert!(tokens(Tokenizer::new_xml("<a href=x/>")).is_err());
        assert_eq!(
            tokens(Tokenizer::new_xml(r#"<a b="1" b="2"/>"#)).unwrap_err(),
            HtmlError::DuplicateAttribute("b".into())
        );
        assert_eq!(
            tokens(Tokenizer::new_xml("<a")).unwrap_err(),
            HtmlError::UnexpectedEof
        );
    }

    #[test]
    fn test_xml_cdata_and_pi() {
        let tokens = tokens(Tokenizer::new_xml(
            r#"<?xml version="1.0" encoding="utf-8"?><a><![CDATA[<b>]]></a>"#,
        ))
        .unwrap();
        assert_eq!(
            tokens[0],
            Token::ProcessingInstruction {
                target: "xml".into(),
                data: r#"version="1.0" encoding="utf-8""#.into()
            }
        );
        assert_eq!(text_of(&tokens), "<b>");
    }
}
