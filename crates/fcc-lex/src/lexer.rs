//! The scanner: decides on `cur`/`next` and produces one token at a time.
//!
//! The dispatch mirrors the classic hand-written shape: digits begin
//! numeric constants, identifier-start characters begin identifiers or
//! keywords, quotes begin string/character constants, `/` peeks for
//! comments, everything else funnels into the punctuator recognizer.
//! The sequence ends with an `Eos` token; any error emits a diagnostic,
//! yields an `Error` token, and is not recoverable.

use std::io::Read;

use fcc_util::{ErrorReported, Handler, PResult};

use crate::reader::Reader;
use crate::token::{keyword_from_ident, Token, TokenKind, TokenValue};

fn is_digit(c: u8) -> bool {
    c.is_ascii_digit()
}

fn is_octdigit(c: u8) -> bool {
    (b'0'..=b'7').contains(&c)
}

fn is_hexdigit(c: u8) -> bool {
    c.is_ascii_hexdigit()
}

fn is_digit_in_base(c: u8, base: u32) -> bool {
    match base {
        8 => is_octdigit(c),
        16 => is_hexdigit(c),
        _ => is_digit(c),
    }
}

fn is_alpha(c: u8) -> bool {
    c.is_ascii_alphabetic()
}

fn is_ident_start(c: u8) -> bool {
    is_alpha(c) || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
    is_ident_start(c) || is_digit(c)
}

fn is_newline(c: u8) -> bool {
    c == b'\n' || c == b'\r'
}

fn is_whitespace(c: u8) -> bool {
    is_newline(c) || c == b'\t' || c == 0x0b || c == b' '
}

fn digit_value(c: u8) -> u32 {
    match c {
        b'a'..=b'f' => (c - b'a') as u32 + 0xA,
        b'A'..=b'F' => (c - b'A') as u32 + 0xA,
        _ => (c - b'0') as u32,
    }
}

pub struct Lexer<'a, R> {
    reader: Reader<R>,
    handler: &'a Handler,
    token_line: u32,
    token_column: u32,
}

impl<'a, R: Read> Lexer<'a, R> {
    pub fn new(source: R, handler: &'a Handler) -> Self {
        Lexer {
            reader: Reader::new(source),
            handler,
            token_line: 1,
            token_column: 1,
        }
    }

    /// Produces the next token.
    ///
    /// Returns an `Eos` token at end of stream and an `Error` token after
    /// reporting a diagnostic; both carry no text and end the sequence.
    pub fn next_token(&mut self) -> Token {
        self.skip_ws();
        self.reader.begin_token();
        self.token_line = self.reader.line();
        self.token_column = self.reader.column();

        let cur = self.reader.cur();
        let next = self.reader.next();

        if cur == 0 {
            return self.sentinel(TokenKind::Eos);
        }

        let scanned = if is_digit(cur) {
            self.lex_scalar()
        } else if is_ident_start(cur) {
            Ok(self.lex_identifier())
        } else if cur == b'"' {
            self.lex_string(b'"')
        } else if cur == b'\'' {
            self.lex_string(b'\'')
        } else if cur == b'.' && is_digit(next) {
            self.lex_float_part(String::new())
        } else if cur == b'/' && next == b'/' {
            self.lex_line_comment()
        } else if cur == b'/' && next == b'*' {
            self.lex_block_comment()
        } else {
            self.lex_punctuator()
        };

        match scanned {
            Ok((kind, value)) => Token {
                kind,
                line: self.token_line,
                column: self.token_column,
                text: self.reader.token_text(),
                value,
            },
            Err(ErrorReported) => self.sentinel(TokenKind::Error),
        }
    }

    fn sentinel(&self, kind: TokenKind) -> Token {
        Token {
            kind,
            line: self.token_line,
            column: self.token_column,
            text: String::new(),
            value: TokenValue::None,
        }
    }

    fn error(&self, message: impl Into<String>) -> ErrorReported {
        self.handler.set_pos(self.token_line, self.token_column);
        self.handler.error(message)
    }

    fn skip_ws(&mut self) {
        while is_whitespace(self.reader.cur()) {
            self.reader.advance();
        }
    }

    fn cur(&self) -> u8 {
        self.reader.cur()
    }

    fn next(&self) -> u8 {
        self.reader.next()
    }

    fn advance(&mut self) {
        self.reader.advance();
    }

    /// Integer constant in decimal, hex (`0x`), or octal (`0`-prefixed)
    /// base, or the integer part of a float.
    ///
    /// The numeric value wraps modulo 2^32.
    fn lex_scalar(&mut self) -> PResult<(TokenKind, TokenValue)> {
        let mut base = 10u32;
        if self.cur() == b'0' {
            if self.next() == b'x' || self.next() == b'X' {
                self.advance();
                self.advance();
                base = 16;
            } else if is_digit(self.next()) {
                self.advance();
                base = 8;
            }
        }

        if !is_digit_in_base(self.cur(), base) {
            return Err(self.error("bad integer constant"));
        }

        let mut digits = String::new();
        let mut result: u32 = 0;
        while is_digit_in_base(self.cur(), base) {
            digits.push(self.cur() as char);
            result = result.wrapping_mul(base).wrapping_add(digit_value(self.cur()));
            self.advance();
        }

        if base == 8 && is_digit(self.cur()) {
            return Err(self.error("invalid digit in octal constant"));
        }

        if base == 10
            && (self.cur() == b'.' || self.cur() == b'e' || self.cur() == b'E')
        {
            return self.lex_float_part(digits);
        }

        let mut has_suffix = false;
        while is_alpha(self.cur()) {
            has_suffix = true;
            self.advance();
        }
        if has_suffix {
            return Err(self.error("unknown suffix on integer constant"));
        }

        Ok((TokenKind::IntConst, TokenValue::Int(result as i32)))
    }

    fn read_dec_digits(&mut self, digits: &mut String) -> PResult<()> {
        if !is_digit(self.cur()) {
            return Err(self.error("invalid float constant"));
        }
        while is_digit(self.cur()) {
            digits.push(self.cur() as char);
            self.advance();
        }
        Ok(())
    }

    /// Fractional and exponent part; `digits` holds the already-consumed
    /// integer part (empty when the literal started with `.`).
    fn lex_float_part(&mut self, mut digits: String) -> PResult<(TokenKind, TokenValue)> {
        if self.cur() == b'.' {
            digits.push('.');
            self.advance();
            // Digits are required after a bare leading dot; `5.` is fine.
            if is_digit(self.cur()) || digits.len() == 1 {
                self.read_dec_digits(&mut digits)?;
            }
        }

        if self.cur() == b'e' || self.cur() == b'E' {
            digits.push('e');
            self.advance();
            if self.cur() == b'+' || self.cur() == b'-' {
                digits.push(self.cur() as char);
                self.advance();
            }
            self.read_dec_digits(&mut digits)?;
        }

        match digits.parse::<f64>() {
            Ok(value) => Ok((TokenKind::FloatConst, TokenValue::Float(value))),
            Err(_) => Err(self.error("invalid float constant")),
        }
    }

    fn lex_identifier(&mut self) -> (TokenKind, TokenValue) {
        let mut ident = String::new();
        loop {
            ident.push(self.cur() as char);
            self.advance();
            if !is_ident_continue(self.cur()) {
                break;
            }
        }

        match keyword_from_ident(&ident) {
            Some(kind) => (kind, TokenValue::None),
            None => (TokenKind::Ident, TokenValue::Str(ident)),
        }
    }

    /// String or character constant, including concatenation of adjacent
    /// literals separated by whitespace.
    fn lex_string(&mut self, quote: u8) -> PResult<(TokenKind, TokenValue)> {
        let mut bytes = Vec::new();
        while self.cur() == quote {
            self.lex_single_string(&mut bytes, quote)?;
            self.skip_ws();
        }

        if quote == b'"' {
            Ok((TokenKind::StringConst, TokenValue::Bytes(bytes)))
        } else {
            match bytes.len() {
                0 => Err(self.error("empty character constant")),
                1 => Ok((TokenKind::IntConst, TokenValue::Int(bytes[0] as i8 as i32))),
                _ => Err(self.error("multi-character character constant")),
            }
        }
    }

    fn lex_single_string(&mut self, out: &mut Vec<u8>, quote: u8) -> PResult<()> {
        self.advance(); // opening quote
        while self.cur() != quote && !is_newline(self.cur()) {
            if self.cur() == b'\\' {
                self.advance();
                self.lex_escape(out)?;
            } else if self.cur() == 0 {
                return Err(self.error("unexpected end of stream"));
            } else {
                out.push(self.cur());
                self.advance();
            }
        }

        if is_newline(self.cur()) {
            return Err(self.error("missing terminating character"));
        }
        self.advance(); // closing quote
        Ok(())
    }

    fn lex_escape(&mut self, out: &mut Vec<u8>) -> PResult<()> {
        let byte = match self.cur() {
            b'\'' => b'\'',
            b'"' => b'"',
            b'\\' => b'\\',
            b'?' => b'?',
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0c,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'v' => 0x0b,
            b'x' => {
                self.advance();
                if !is_hexdigit(self.cur()) {
                    return Err(self.error("\\x used with no following hex digits"));
                }
                let mut value = digit_value(self.cur());
                self.advance();
                if is_hexdigit(self.cur()) {
                    value = value * 16 + digit_value(self.cur());
                    self.advance();
                }
                out.push(value as u8);
                return Ok(());
            }
            c if is_octdigit(c) => {
                let mut value = 0u32;
                let mut count = 0;
                while count < 3 && is_octdigit(self.cur()) {
                    value = value * 8 + digit_value(self.cur());
                    self.advance();
                    count += 1;
                }
                if value > 255 {
                    return Err(self.error("octal escape sequence out of range"));
                }
                out.push(value as u8);
                return Ok(());
            }
            _ => return Err(self.error("unknown escape sequence")),
        };
        out.push(byte);
        self.advance();
        Ok(())
    }

    fn lex_line_comment(&mut self) -> PResult<(TokenKind, TokenValue)> {
        self.advance();
        self.advance();
        let mut text = Vec::new();
        while self.cur() != 0 && !is_newline(self.cur()) {
            text.push(self.cur());
            self.advance();
        }
        Ok((
            TokenKind::Comment,
            TokenValue::Str(String::from_utf8_lossy(&text).into_owned()),
        ))
    }

    fn lex_block_comment(&mut self) -> PResult<(TokenKind, TokenValue)> {
        self.advance();
        self.advance();
        let mut text = Vec::new();
        while !(self.cur() == b'*' && self.next() == b'/') && self.cur() != 0 {
            text.push(self.cur());
            self.advance();
        }

        if self.cur() != b'*' {
            return Err(self.error("unexpected end of stream"));
        }
        self.advance();
        self.advance();
        Ok((
            TokenKind::Comment,
            TokenValue::Str(String::from_utf8_lossy(&text).into_owned()),
        ))
    }

    fn punct1(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// Single token or `=`-suffixed compound.
    fn punct2(&mut self, plain: TokenKind, assign: TokenKind) -> TokenKind {
        if self.next() == b'=' {
            self.advance();
            return self.punct1(assign);
        }
        self.punct1(plain)
    }

    /// Single, `=`-suffixed, or doubled (`++`, `||`, `&&`).
    fn punct3(&mut self, plain: TokenKind, assign: TokenKind, doubled: TokenKind) -> TokenKind {
        if self.next() == self.cur() {
            self.advance();
            return self.punct1(doubled);
        }
        self.punct2(plain, assign)
    }

    fn lex_punctuator(&mut self) -> PResult<(TokenKind, TokenValue)> {
        use TokenKind::*;
        let kind = match self.cur() {
            b'(' => self.punct1(LParen),
            b')' => self.punct1(RParen),
            b'[' => self.punct1(LBracket),
            b']' => self.punct1(RBracket),
            b'{' => self.punct1(LBrace),
            b'}' => self.punct1(RBrace),

            b',' => self.punct1(Comma),
            b'~' => self.punct1(Tilde),
            b'?' => self.punct1(Question),
            b';' => self.punct1(Semicolon),

            b'/' => self.punct2(Slash, SlashEq),
            b'*' => self.punct2(Star, StarEq),
            b'!' => self.punct2(Not, NotEq),
            b'=' => self.punct2(Eq, EqEq),
            b'^' => self.punct2(Caret, CaretEq),

            b'+' => self.punct3(Plus, PlusEq, PlusPlus),
            b'|' => self.punct3(Pipe, PipeEq, PipePipe),
            b'&' => self.punct3(Amp, AmpEq, AmpAmp),

            b':' => {
                if self.next() == b'>' {
                    self.advance();
                    self.punct1(RBracket)
                } else {
                    self.punct1(Colon)
                }
            }
            b'%' => {
                if self.next() == b'>' {
                    self.advance();
                    self.punct1(RBrace)
                } else {
                    self.punct2(Percent, PercentEq)
                }
            }
            b'<' => {
                if self.next() == b'<' {
                    self.advance();
                    self.punct2(Shl, ShlEq)
                } else if self.next() == b':' {
                    self.advance();
                    self.punct1(LBracket)
                } else if self.next() == b'%' {
                    self.advance();
                    self.punct1(LBrace)
                } else {
                    self.punct2(Lt, LtEq)
                }
            }
            b'>' => {
                if self.next() == b'>' {
                    self.advance();
                    self.punct2(Shr, ShrEq)
                } else {
                    self.punct2(Gt, GtEq)
                }
            }
            b'-' => {
                if self.next() == b'>' {
                    self.advance();
                    self.punct1(Arrow)
                } else {
                    self.punct3(Minus, MinusEq, MinusMinus)
                }
            }
            b'.' => {
                if self.next() == b'.' {
                    self.advance();
                    if self.next() == b'.' {
                        self.advance();
                        self.punct1(Ellipsis)
                    } else {
                        // Stay on the second dot; it starts the next token.
                        Dot
                    }
                } else {
                    self.punct1(Dot)
                }
            }
            _ => return Err(self.error("unexpected character")),
        };
        Ok((kind, TokenValue::None))
    }
}
