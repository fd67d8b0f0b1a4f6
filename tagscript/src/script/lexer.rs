//! Two-mode template lexer.
//!
//! Outside tags ([`LexMode::Text`]) the lexer emits runs of literal text,
//! handling the `\{` and `\\` escapes.  `{$` switches to [`LexMode::Tag`],
//! where whitespace is skipped and the tag body is split into names,
//! numbers, strings, identifiers, function references and operators until
//! `$}` switches back.

use std::fmt;

use thiserror::Error;

pub const TAG_OPEN: &str = "{$";
pub const TAG_CLOSE: &str = "$}";
const ESCAPE: char = '\\';

// ── Token ─────────────────────────────────────────────────────────────────────

/// 1-based source position of a token's first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Eof,
    /// Literal text outside tags, escapes already resolved.
    Text(String),
    TagOpen,
    TagClose,
    /// Upper-cased tag name (`FOR`, `END`) or `=`.
    TagName(String),
    Int(i64),
    Float(f64),
    Str(String),
    /// Function name without the leading `@`.
    Function(String),
    Ident(String),
    Operator(char),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Eof => f.write_str("end of input"),
            TokenKind::Text(_) => f.write_str("text"),
            TokenKind::TagOpen => write!(f, "`{TAG_OPEN}`"),
            TokenKind::TagClose => write!(f, "`{TAG_CLOSE}`"),
            TokenKind::TagName(n) => write!(f, "tag name `{n}`"),
            TokenKind::Int(n) => write!(f, "integer `{n}`"),
            TokenKind::Float(x) => write!(f, "float `{x}`"),
            TokenKind::Str(s) => write!(f, "string {s:?}"),
            TokenKind::Function(n) => write!(f, "function `@{n}`"),
            TokenKind::Ident(n) => write!(f, "variable `{n}`"),
            TokenKind::Operator(c) => write!(f, "operator `{c}`"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Position,
}

/// Which half of the grammar the lexer is currently reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexMode {
    Text,
    Tag,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    #[error("unterminated tag")]
    UnterminatedTag,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid escape sequence `\\{0}`")]
    InvalidEscape(String),
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    #[error("unexpected character `{0}`")]
    UnexpectedChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{pos}: {kind}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub pos: Position,
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

/// Forward-only token stream over a template source.
///
/// The lexer is fused: after yielding [`TokenKind::Eof`] or an error it
/// yields `None`.
#[derive(Clone)]
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    column: u32,
    mode: LexMode,
    /// Set right after `{$`: the next word is the tag name.
    expect_name: bool,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self::with_mode(src, LexMode::Text)
    }

    pub fn with_mode(src: &'a str, mode: LexMode) -> Self {
        Lexer {
            src,
            pos: 0,
            line: 1,
            column: 1,
            mode,
            expect_name: mode == LexMode::Tag,
            done: false,
        }
    }

    pub fn mode(&self) -> LexMode {
        self.mode
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek2(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn here(&self) -> Position {
        Position { line: self.line, column: self.column }
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn bump_str(&mut self, s: &str) {
        for _ in s.chars() {
            self.bump();
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn err<T>(&self, kind: LexErrorKind, pos: Position) -> Result<T, LexError> {
        Err(LexError { kind, pos })
    }

    /// Produce the next token, or `Eof` once the input is exhausted.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        match self.mode {
            LexMode::Text => self.lex_text(),
            LexMode::Tag => self.lex_tag(),
        }
    }

    fn lex_text(&mut self) -> Result<Token, LexError> {
        let pos = self.here();
        if self.rest().is_empty() {
            return Ok(Token { kind: TokenKind::Eof, pos });
        }
        if self.rest().starts_with(TAG_OPEN) {
            self.bump_str(TAG_OPEN);
            self.mode = LexMode::Tag;
            self.expect_name = true;
            return Ok(Token { kind: TokenKind::TagOpen, pos });
        }

        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if self.rest().starts_with(TAG_OPEN) {
                break;
            }
            if ch == ESCAPE {
                let esc_pos = self.here();
                self.bump();
                match self.bump() {
                    Some(c @ ('{' | ESCAPE)) => text.push(c),
                    Some(c) => return self.err(LexErrorKind::InvalidEscape(c.to_string()), esc_pos),
                    None => return self.err(LexErrorKind::InvalidEscape(String::new()), esc_pos),
                }
                continue;
            }
            text.push(ch);
            self.bump();
        }
        Ok(Token { kind: TokenKind::Text(text), pos })
    }

    fn lex_tag(&mut self) -> Result<Token, LexError> {
        self.take_while(char::is_whitespace);
        let pos = self.here();
        let Some(first) = self.peek() else {
            return self.err(LexErrorKind::UnterminatedTag, pos);
        };

        if self.rest().starts_with(TAG_CLOSE) {
            self.bump_str(TAG_CLOSE);
            self.mode = LexMode::Text;
            self.expect_name = false;
            return Ok(Token { kind: TokenKind::TagClose, pos });
        }

        if std::mem::take(&mut self.expect_name) {
            if first == '=' {
                self.bump();
                return Ok(Token { kind: TokenKind::TagName("=".into()), pos });
            }
            if first.is_alphabetic() {
                let name = self.take_while(is_ident_char).to_uppercase();
                return Ok(Token { kind: TokenKind::TagName(name), pos });
            }
        }

        let kind = match first {
            c if c.is_ascii_digit() => self.lex_number(pos)?,
            '-' if self.peek2().is_some_and(|c| c.is_ascii_digit()) => self.lex_number(pos)?,
            '"' => self.lex_string(pos)?,
            '@' => {
                self.bump();
                if !self.peek().is_some_and(char::is_alphabetic) {
                    return self.err(LexErrorKind::UnexpectedChar('@'), pos);
                }
                TokenKind::Function(self.take_while(is_ident_char).to_owned())
            }
            c if c.is_alphabetic() => TokenKind::Ident(self.take_while(is_ident_char).to_owned()),
            '+' | '-' | '*' | '/' | '^' => {
                self.bump();
                TokenKind::Operator(first)
            }
            c => return self.err(LexErrorKind::UnexpectedChar(c), pos),
        };
        Ok(Token { kind, pos })
    }

    fn lex_number(&mut self, pos: Position) -> Result<TokenKind, LexError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        self.take_while(|c| c.is_ascii_digit());
        let mut is_float = false;
        if self.peek() == Some('.') {
            self.bump();
            is_float = true;
            if self.take_while(|c| c.is_ascii_digit()).is_empty() {
                // Swallow the rest of the word so the error shows all of it.
                self.take_while(|c| c == '.' || is_ident_char(c));
                return self.invalid_number(start, pos);
            }
        }
        if self.peek().is_some_and(|c| c == '.' || is_ident_char(c)) {
            self.take_while(|c| c == '.' || is_ident_char(c));
            return self.invalid_number(start, pos);
        }

        let text = &self.src[start..self.pos];
        if is_float {
            text.parse().map(TokenKind::Float).or_else(|_| self.invalid_number(start, pos))
        } else {
            text.parse().map(TokenKind::Int).or_else(|_| self.invalid_number(start, pos))
        }
    }

    fn invalid_number<T>(&self, start: usize, pos: Position) -> Result<T, LexError> {
        self.err(LexErrorKind::InvalidNumber(self.src[start..self.pos].to_owned()), pos)
    }

    fn lex_string(&mut self, pos: Position) -> Result<TokenKind, LexError> {
        self.bump(); // opening quote
        let mut s = String::new();
        loop {
            let esc_pos = self.here();
            match self.bump() {
                None => return self.err(LexErrorKind::UnterminatedString, pos),
                Some('"') => return Ok(TokenKind::Str(s)),
                Some(ESCAPE) => match self.bump() {
                    Some('"') => s.push('"'),
                    Some(ESCAPE) => s.push(ESCAPE),
                    Some('n') => s.push('\n'),
                    Some('r') => s.push('\r'),
                    Some('t') => s.push('\t'),
                    Some(c) => return self.err(LexErrorKind::InvalidEscape(c.to_string()), esc_pos),
                    None => return self.err(LexErrorKind::UnterminatedString, pos),
                },
                Some(c) => s.push(c),
            }
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.next_token();
        if matches!(result, Err(_) | Ok(Token { kind: TokenKind::Eof, .. })) {
            self.done = true;
        }
        Some(result)
    }
}

impl std::iter::FusedIterator for Lexer<'_> {}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).map(|t| t.unwrap().kind).collect()
    }

    fn lex_err(src: &str) -> LexErrorKind {
        Lexer::new(src)
            .find_map(Result::err)
            .map(|e| e.kind)
            .expect("expected a lex error")
    }

    #[test]
    fn plain_text_is_one_token() {
        assert_eq!(kinds("hello\nworld"), vec![TokenKind::Text("hello\nworld".into()), TokenKind::Eof]);
    }

    #[test]
    fn empty_input_is_just_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn for_tag_tokens() {
        assert_eq!(
            kinds("a{$ for i -1 10.5 \"2\" $}b"),
            vec![
                TokenKind::Text("a".into()),
                TokenKind::TagOpen,
                TokenKind::TagName("FOR".into()),
                TokenKind::Ident("i".into()),
                TokenKind::Int(-1),
                TokenKind::Float(10.5),
                TokenKind::Str("2".into()),
                TokenKind::TagClose,
                TokenKind::Text("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn echo_tag_tokens() {
        assert_eq!(
            kinds("{$= i i * @sin \"0.000\" @decfmt $}"),
            vec![
                TokenKind::TagOpen,
                TokenKind::TagName("=".into()),
                TokenKind::Ident("i".into()),
                TokenKind::Ident("i".into()),
                TokenKind::Operator('*'),
                TokenKind::Function("sin".into()),
                TokenKind::Str("0.000".into()),
                TokenKind::Function("decfmt".into()),
                TokenKind::TagClose,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn minus_without_digit_is_operator() {
        assert_eq!(
            kinds("{$=a - -3$}")[2..5].to_vec(),
            vec![TokenKind::Ident("a".into()), TokenKind::Operator('-'), TokenKind::Int(-3)]
        );
    }

    #[test]
    fn tag_name_is_case_insensitive() {
        assert_eq!(kinds("{$End$}")[1], TokenKind::TagName("END".into()));
        assert_eq!(kinds("{$ fOr$}")[1], TokenKind::TagName("FOR".into()));
    }

    #[test]
    fn only_first_word_is_a_tag_name() {
        assert_eq!(kinds("{$FOR for$}")[2], TokenKind::Ident("for".into()));
    }

    #[test]
    fn text_escapes() {
        assert_eq!(kinds(r"a \{$ b \\ c")[0], TokenKind::Text(r"a {$ b \ c".into()));
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#"{$= "q\"b\\n\nr\rt\t" $}"#)[2],
            TokenKind::Str("q\"b\\n\nr\rt\t".into())
        );
    }

    #[test]
    fn bad_text_escape() {
        assert_eq!(lex_err(r"oops \n"), LexErrorKind::InvalidEscape("n".into()));
        assert_eq!(lex_err("trailing \\"), LexErrorKind::InvalidEscape(String::new()));
    }

    #[test]
    fn bad_string_escape() {
        assert_eq!(lex_err(r#"{$= "\x" $}"#), LexErrorKind::InvalidEscape("x".into()));
    }

    #[test]
    fn unterminated_tag() {
        assert_eq!(lex_err("{$ FOR i 1 2"), LexErrorKind::UnterminatedTag);
    }

    #[test]
    fn unterminated_string() {
        assert_eq!(lex_err("{$= \"abc $}"), LexErrorKind::UnterminatedString);
    }

    #[test]
    fn invalid_numbers() {
        assert_eq!(lex_err("{$= 1. $}"), LexErrorKind::InvalidNumber("1.".into()));
        assert_eq!(lex_err("{$= 1.2.3 $}"), LexErrorKind::InvalidNumber("1.2.3".into()));
        assert_eq!(lex_err("{$= 12ab $}"), LexErrorKind::InvalidNumber("12ab".into()));
        assert_eq!(
            lex_err("{$= 99999999999999999999 $}"),
            LexErrorKind::InvalidNumber("99999999999999999999".into())
        );
    }

    #[test]
    fn unexpected_symbol() {
        assert_eq!(lex_err("{$= a % b $}"), LexErrorKind::UnexpectedChar('%'));
        assert_eq!(lex_err("{$= @1 $}"), LexErrorKind::UnexpectedChar('@'));
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let toks: Vec<Token> = Lexer::new("ab\n{$= x $}").map(Result::unwrap).collect();
        assert_eq!(toks[1].pos, Position { line: 2, column: 1 });
        assert_eq!(toks[3].pos, Position { line: 2, column: 5 });
    }

    #[test]
    fn error_stops_the_stream() {
        let mut lexer = Lexer::new("{$= % $} more");
        assert!(matches!(lexer.next(), Some(Ok(_))));
        assert!(matches!(lexer.next(), Some(Ok(_))));
        assert!(matches!(lexer.next(), Some(Err(_))));
        assert!(lexer.next().is_none());
    }

    #[test]
    fn start_in_tag_mode() {
        let mut lexer = Lexer::with_mode("= x $}tail", LexMode::Tag);
        assert_eq!(lexer.mode(), LexMode::Tag);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::TagName("=".into()));
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Ident("x".into()));
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::TagClose);
        assert_eq!(lexer.mode(), LexMode::Text);
    }
}
