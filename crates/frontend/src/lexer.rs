//! Tokenizer for phpi source text.
//!
//! Input starts in HTML mode: everything up to `<?php` is a single
//! [`TokenKind::Html`] token. Inside a PHP section, `?>` switches back.

use std::fmt;

use crate::error::SyntaxError;

/// A token with the line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Literal text outside PHP tags.
    Html(String),
    OpenTag,
    CloseTag,

    // Keywords
    Echo,
    Function,
    If,
    Else,
    While,
    For,
    Return,
    Const,
    True,
    False,
    Null,

    /// `$name`, stored without the sigil.
    Var(String),
    /// Bare identifier: a function, constant or cast type name.
    Ident(String),
    Str(String),
    Long(i64),

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Dot,
    Bang,
    Lt,
    Gt,
    Lte,
    Gte,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    PlusPlus,
    MinusMinus,
    Shl,
    Shr,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Html(_) => "inline HTML",
            TokenKind::OpenTag => "'<?php'",
            TokenKind::CloseTag => "'?>'",
            TokenKind::Echo => "'echo'",
            TokenKind::Function => "'function'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::While => "'while'",
            TokenKind::For => "'for'",
            TokenKind::Return => "'return'",
            TokenKind::Const => "'const'",
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
            TokenKind::Null => "'null'",
            TokenKind::Var(name) => return write!(f, "variable ${name}"),
            TokenKind::Ident(name) => return write!(f, "identifier '{name}'"),
            TokenKind::Str(_) => "string literal",
            TokenKind::Long(n) => return write!(f, "number {n}"),
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Comma => "','",
            TokenKind::Semicolon => "';'",
            TokenKind::Assign => "'='",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::Dot => "'.'",
            TokenKind::Bang => "'!'",
            TokenKind::Lt => "'<'",
            TokenKind::Gt => "'>'",
            TokenKind::Lte => "'<='",
            TokenKind::Gte => "'>='",
            TokenKind::EqEq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::AndAnd => "'&&'",
            TokenKind::OrOr => "'||'",
            TokenKind::PlusPlus => "'++'",
            TokenKind::MinusMinus => "'--'",
            TokenKind::Shl => "'<<'",
            TokenKind::Shr => "'>>'",
            TokenKind::Eof => "end of input",
        };
        f.write_str(text)
    }
}

const OPEN_TAG: &str = "<?php";
const CLOSE_TAG: &str = "?>";

const TWO_CHAR_OPERATORS: [(&str, TokenKind); 10] = [
    ("&&", TokenKind::AndAnd),
    ("||", TokenKind::OrOr),
    ("==", TokenKind::EqEq),
    ("!=", TokenKind::NotEq),
    ("<=", TokenKind::Lte),
    (">=", TokenKind::Gte),
    ("<<", TokenKind::Shl),
    (">>", TokenKind::Shr),
    ("++", TokenKind::PlusPlus),
    ("--", TokenKind::MinusMinus),
];

/// Tokenize a whole source file. The last token is always [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    Lexer {
        src: source,
        pos: 0,
        line: 1,
        tokens: Vec::new(),
    }
    .run()
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn run(mut self) -> Result<Vec<Token>, SyntaxError> {
        while !self.at_end() {
            self.lex_html();
            if self.at_end() {
                break;
            }
            self.lex_php()?;
        }
        self.push(TokenKind::Eof, self.line);
        Ok(self.tokens)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// Remaining source text. Only valid at a character boundary.
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    /// Remaining source bytes; safe anywhere, including inside multi-byte
    /// characters of comments and strings.
    fn rest_bytes(&self) -> &'a [u8] {
        &self.src.as_bytes()[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
        }
        Some(b)
    }

    fn push(&mut self, kind: TokenKind, line: u32) {
        self.tokens.push(Token { kind, line });
    }

    fn lex_html(&mut self) {
        let line = self.line;
        let rest = self.rest();
        let (text_len, found) = match rest.find(OPEN_TAG) {
            Some(i) => (i, true),
            None => (rest.len(), false),
        };
        let text = rest[..text_len].to_string();

        for _ in 0..text_len {
            self.bump();
        }
        if !text.is_empty() {
            self.push(TokenKind::Html(text), line);
        }
        if found {
            let line = self.line;
            self.pos += OPEN_TAG.len();
            self.push(TokenKind::OpenTag, line);
        }
    }

    /// Lexes until `?>` or end of input.
    fn lex_php(&mut self) -> Result<(), SyntaxError> {
        loop {
            self.skip_trivia()?;
            let Some(c) = self.peek() else {
                return Ok(());
            };
            let line = self.line;

            if self.rest_bytes().starts_with(CLOSE_TAG.as_bytes()) {
                self.pos += CLOSE_TAG.len();
                // A single newline directly after the close tag is swallowed.
                if self.rest_bytes().starts_with(b"\r\n") {
                    self.pos += 1;
                }
                if self.peek() == Some(b'\n') {
                    self.bump();
                }
                self.push(TokenKind::CloseTag, line);
                return Ok(());
            }

            let kind = match c {
                b'$' => self.lex_var()?,
                b'"' => self.lex_double_quoted()?,
                b'\'' => self.lex_single_quoted()?,
                b'0'..=b'9' => self.lex_number()?,
                c if c.is_ascii_alphabetic() || c == b'_' => self.lex_word(),
                _ => self.lex_operator()?,
            };
            self.push(kind, line);
        }
    }

    fn skip_trivia(&mut self) -> Result<(), SyntaxError> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(b' ' | b'\t' | b'\n' | b'\r'), _) => {
                    self.bump();
                }
                (Some(b'/'), Some(b'/')) | (Some(b'#'), _) => self.skip_line_comment(),
                (Some(b'/'), Some(b'*')) => {
                    let line = self.line;
                    self.pos += 2;
                    loop {
                        if self.rest_bytes().starts_with(b"*/") {
                            self.pos += 2;
                            break;
                        }
                        if self.bump().is_none() {
                            return Err(SyntaxError::UnterminatedComment { line });
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Line comments end at a newline or right before `?>`.
    fn skip_line_comment(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'\n' || self.rest_bytes().starts_with(CLOSE_TAG.as_bytes()) {
                return;
            }
            self.bump();
        }
    }

    fn take_word(&mut self) -> &'a str {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn lex_var(&mut self) -> Result<TokenKind, SyntaxError> {
        self.pos += 1;
        let name = self.take_word();
        if name.is_empty() {
            return Err(SyntaxError::UnexpectedChar {
                line: self.line,
                ch: '$',
            });
        }
        Ok(TokenKind::Var(name.to_string()))
    }

    fn lex_word(&mut self) -> TokenKind {
        let word = self.take_word();
        match word.to_ascii_lowercase().as_str() {
            "echo" => TokenKind::Echo,
            "function" => TokenKind::Function,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "return" => TokenKind::Return,
            "const" => TokenKind::Const,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => TokenKind::Ident(word.to_string()),
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind, SyntaxError> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits = &self.src[start..self.pos];
        digits
            .parse::<i64>()
            .map(TokenKind::Long)
            .map_err(|_| SyntaxError::InvalidNumber {
                line: self.line,
                token: digits.to_string(),
            })
    }

    fn lex_double_quoted(&mut self) -> Result<TokenKind, SyntaxError> {
        let line = self.line;
        self.pos += 1;
        let mut buf = Vec::new();
        loop {
            match self.bump() {
                None => return Err(SyntaxError::UnterminatedString { line }),
                Some(b'"') => break,
                Some(b'\\') => match self.bump() {
                    None => return Err(SyntaxError::UnterminatedString { line }),
                    Some(b'n') => buf.push(b'\n'),
                    Some(b't') => buf.push(b'\t'),
                    Some(b'r') => buf.push(b'\r'),
                    Some(b'\\') => buf.push(b'\\'),
                    Some(b'"') => buf.push(b'"'),
                    Some(b'$') => buf.push(b'$'),
                    Some(other) => {
                        buf.push(b'\\');
                        buf.push(other);
                    }
                },
                Some(b) => buf.push(b),
            }
        }
        Ok(TokenKind::Str(String::from_utf8_lossy(&buf).into_owned()))
    }

    fn lex_single_quoted(&mut self) -> Result<TokenKind, SyntaxError> {
        let line = self.line;
        self.pos += 1;
        let mut buf = Vec::new();
        loop {
            match self.bump() {
                None => return Err(SyntaxError::UnterminatedString { line }),
                Some(b'\'') => break,
                Some(b'\\') if matches!(self.peek(), Some(b'\'' | b'\\')) => {
                    if let Some(b) = self.bump() {
                        buf.push(b);
                    }
                }
                Some(b) => buf.push(b),
            }
        }
        Ok(TokenKind::Str(String::from_utf8_lossy(&buf).into_owned()))
    }

    fn lex_operator(&mut self) -> Result<TokenKind, SyntaxError> {
        for (text, kind) in TWO_CHAR_OPERATORS {
            if self.rest_bytes().starts_with(text.as_bytes()) {
                self.pos += 2;
                return Ok(kind);
            }
        }

        let kind = match self.peek() {
            Some(b'(') => TokenKind::LParen,
            Some(b')') => TokenKind::RParen,
            Some(b'{') => TokenKind::LBrace,
            Some(b'}') => TokenKind::RBrace,
            Some(b',') => TokenKind::Comma,
            Some(b';') => TokenKind::Semicolon,
            Some(b'=') => TokenKind::Assign,
            Some(b'+') => TokenKind::Plus,
            Some(b'-') => TokenKind::Minus,
            Some(b'*') => TokenKind::Star,
            Some(b'/') => TokenKind::Slash,
            Some(b'%') => TokenKind::Percent,
            Some(b'.') => TokenKind::Dot,
            Some(b'!') => TokenKind::Bang,
            Some(b'<') => TokenKind::Lt,
            Some(b'>') => TokenKind::Gt,
            _ => {
                let ch = self
                    .src
                    .get(self.pos..)
                    .and_then(|s| s.chars().next())
                    .unwrap_or('\u{FFFD}');
                return Err(SyntaxError::UnexpectedChar {
                    line: self.line,
                    ch,
                });
            }
        };
        self.pos += 1;
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_source() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn html_only() {
        assert_eq!(
            kinds("<p>hi</p>"),
            vec![TokenKind::Html("<p>hi</p>".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn open_tag_then_echo() {
        assert_eq!(
            kinds("<?php echo 1;"),
            vec![
                TokenKind::OpenTag,
                TokenKind::Echo,
                TokenKind::Long(1),
                TokenKind::Semicolon,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn close_tag_returns_to_html() {
        assert_eq!(
            kinds("a<?php echo 1 ?>\nb"),
            vec![
                TokenKind::Html("a".to_string()),
                TokenKind::OpenTag,
                TokenKind::Echo,
                TokenKind::Long(1),
                TokenKind::CloseTag,
                TokenKind::Html("b".to_string()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            kinds("<?php ECHO True;"),
            vec![
                TokenKind::OpenTag,
                TokenKind::Echo,
                TokenKind::True,
                TokenKind::Semicolon,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn variables_and_identifiers() {
        assert_eq!(
            kinds("<?php $a_1 strlen FOO"),
            vec![
                TokenKind::OpenTag,
                TokenKind::Var("a_1".to_string()),
                TokenKind::Ident("strlen".to_string()),
                TokenKind::Ident("FOO".to_string()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn two_char_operators() {
        assert_eq!(
            kinds("<?php && || == != <= >= << >> ++ --"),
            vec![
                TokenKind::OpenTag,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::Lte,
                TokenKind::Gte,
                TokenKind::Shl,
                TokenKind::Shr,
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#"<?php "a\nb\t\"c\q""#)[1],
            TokenKind::Str("a\nb\t\"c\\q".to_string())
        );
        assert_eq!(
            kinds(r"<?php 'it\'s \n'")[1],
            TokenKind::Str("it's \\n".to_string())
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("<?php // one\n# two\n/* three\n */ 7"),
            vec![TokenKind::OpenTag, TokenKind::Long(7), TokenKind::Eof]
        );
    }

    #[test]
    fn lines_are_tracked() {
        let tokens = tokenize("x\n<?php\n\n$a\n/* \n */ $b").unwrap();
        let lines: Vec<(TokenKind, u32)> = tokens.into_iter().map(|t| (t.kind, t.line)).collect();
        assert_eq!(
            lines,
            vec![
                (TokenKind::Html("x\n".to_string()), 1),
                (TokenKind::OpenTag, 2),
                (TokenKind::Var("a".to_string()), 4),
                (TokenKind::Var("b".to_string()), 6),
                (TokenKind::Eof, 6),
            ]
        );
    }

    #[test]
    fn unterminated_string() {
        assert_eq!(
            tokenize("<?php\n\"abc"),
            Err(SyntaxError::UnterminatedString { line: 2 })
        );
    }

    #[test]
    fn unexpected_char() {
        assert_eq!(
            tokenize("<?php @"),
            Err(SyntaxError::UnexpectedChar { line: 1, ch: '@' })
        );
    }

    #[test]
    fn number_overflow() {
        assert_eq!(
            tokenize("<?php 99999999999999999999"),
            Err(SyntaxError::InvalidNumber {
                line: 1,
                token: "99999999999999999999".to_string()
            })
        );
    }

    #[test]
    fn bare_dollar_rejected() {
        assert!(matches!(
            tokenize("<?php $ ;"),
            Err(SyntaxError::UnexpectedChar { ch: '$', .. })
        ));
    }
}
