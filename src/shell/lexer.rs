//! A small POSIX-leaning lexer for `RUN` scripts.
//!
//! This is a best-effort scanner, not a shell implementation: it exists so
//! rules can find commands, split chains, and preserve separators without
//! executing anything. Malformed input degrades to fewer tokens, never an
//! error.

/// Lexical class of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `;`
    Semi,
    /// `|`
    Pipe,
    /// trailing `&`
    Background,
    /// unescaped newline
    Newline,
    /// `(`
    OpenSub,
    /// `)`
    CloseSub,
    /// `<`, `>`, `>>`, `<<`, `2>`, `&>`, ...
    Redirect,
}

/// One token of a RUN script, with positions relative to the script text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Logical text: unquoted content for words, operator text otherwise.
    pub text: String,
    /// Byte offset of the first character in the script.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    /// 0-based line of `start` within the script.
    pub line: usize,
    /// 0-based column of `start` on that line.
    pub col: usize,
    /// 0-based column one past the token on its final line.
    pub end_col: usize,
    /// Whether any part of the word was quoted.
    pub quoted: bool,
}

impl Token {
    fn op(kind: TokenKind, text: &str, start: usize, line: usize, col: usize) -> Token {
        Token {
            kind,
            text: text.to_string(),
            start,
            end: start + text.len(),
            line,
            col,
            end_col: col + text.len(),
            quoted: false,
        }
    }

    /// True for the operators that separate top-level commands.
    pub fn is_separator(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::And
                | TokenKind::Or
                | TokenKind::Semi
                | TokenKind::Pipe
                | TokenKind::Background
                | TokenKind::Newline
                | TokenKind::OpenSub
                | TokenKind::CloseSub
        )
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(b)
    }
}

/// Tokenizes a script. Never fails; unterminated quotes run to end of input.
pub fn tokenize(script: &str) -> Vec<Token> {
    let mut cur = Cursor { bytes: script.as_bytes(), pos: 0, line: 0, col: 0 };
    let mut tokens = Vec::new();

    while let Some(b) = cur.peek() {
        match b {
            b' ' | b'\t' | b'\r' => {
                cur.bump();
            }
            // escaped newline: line continuation, plain whitespace to us
            b'\\' if cur.peek_at(1) == Some(b'\n') => {
                cur.bump();
                cur.bump();
            }
            b'\\' if cur.peek_at(1) == Some(b'\r') && cur.peek_at(2) == Some(b'\n') => {
                cur.bump();
                cur.bump();
                cur.bump();
            }
            b'\n' => {
                tokens.push(Token::op(TokenKind::Newline, "\n", cur.pos, cur.line, cur.col));
                cur.bump();
            }
            b'#' => {
                // comment to end of line
                while cur.peek().is_some_and(|c| c != b'\n') {
                    cur.bump();
                }
            }
            b'&' if cur.peek_at(1) == Some(b'&') => {
                tokens.push(Token::op(TokenKind::And, "&&", cur.pos, cur.line, cur.col));
                cur.bump();
                cur.bump();
            }
            b'&' if cur.peek_at(1) == Some(b'>') => {
                tokens.push(Token::op(TokenKind::Redirect, "&>", cur.pos, cur.line, cur.col));
                cur.bump();
                cur.bump();
            }
            b'&' => {
                tokens.push(Token::op(TokenKind::Background, "&", cur.pos, cur.line, cur.col));
                cur.bump();
            }
            b'|' if cur.peek_at(1) == Some(b'|') => {
                tokens.push(Token::op(TokenKind::Or, "||", cur.pos, cur.line, cur.col));
                cur.bump();
                cur.bump();
            }
            b'|' => {
                tokens.push(Token::op(TokenKind::Pipe, "|", cur.pos, cur.line, cur.col));
                cur.bump();
            }
            b';' => {
                tokens.push(Token::op(TokenKind::Semi, ";", cur.pos, cur.line, cur.col));
                cur.bump();
                // fold `;;` into one separator
                if cur.peek() == Some(b';') {
                    cur.bump();
                }
            }
            b'(' => {
                tokens.push(Token::op(TokenKind::OpenSub, "(", cur.pos, cur.line, cur.col));
                cur.bump();
            }
            b')' => {
                tokens.push(Token::op(TokenKind::CloseSub, ")", cur.pos, cur.line, cur.col));
                cur.bump();
            }
            b'<' | b'>' => {
                let start = cur.pos;
                let (line, col) = (cur.line, cur.col);
                let mut text = String::new();
                while cur.peek().is_some_and(|c| c == b'<' || c == b'>') {
                    text.push(cur.bump().unwrap() as char);
                }
                tokens.push(Token::op(TokenKind::Redirect, &text, start, line, col));
            }
            _ => {
                tokens.push(lex_word(&mut cur));
            }
        }
    }

    tokens
}

/// Consumes one word, handling quotes, `$( … )`, and fd-prefixed redirects.
fn lex_word(cur: &mut Cursor) -> Token {
    let start = cur.pos;
    let (line, col) = (cur.line, cur.col);
    let mut text: Vec<u8> = Vec::new();
    let mut quoted = false;

    // `2>file` style: a digit immediately before a redirect operator
    if cur.peek().is_some_and(|b| b.is_ascii_digit())
        && matches!(cur.peek_at(1), Some(b'<') | Some(b'>'))
    {
        let mut t = String::new();
        t.push(cur.bump().unwrap() as char);
        while cur.peek().is_some_and(|c| c == b'<' || c == b'>') {
            t.push(cur.bump().unwrap() as char);
        }
        return Token {
            kind: TokenKind::Redirect,
            text: t,
            start,
            end: cur.pos,
            line,
            col,
            end_col: cur.col,
            quoted: false,
        };
    }

    while let Some(b) = cur.peek() {
        match b {
            b' ' | b'\t' | b'\r' | b'\n' | b'&' | b'|' | b';' | b'(' | b')' | b'<' | b'>' => break,
            b'\\' if cur.peek_at(1) == Some(b'\n') => break,
            b'\\' => {
                cur.bump();
                if let Some(escaped) = cur.bump() {
                    text.push(escaped);
                }
            }
            b'\'' => {
                quoted = true;
                cur.bump();
                while cur.peek().is_some_and(|c| c != b'\'') {
                    text.push(cur.bump().unwrap());
                }
                cur.bump(); // closing quote, if any
            }
            b'"' => {
                quoted = true;
                cur.bump();
                while let Some(c) = cur.peek() {
                    match c {
                        b'"' => {
                            cur.bump();
                            break;
                        }
                        b'\\' => {
                            cur.bump();
                            if let Some(escaped) = cur.bump() {
                                text.push(escaped);
                            }
                        }
                        _ => text.push(cur.bump().unwrap()),
                    }
                }
            }
            b'$' if cur.peek_at(1) == Some(b'(') => {
                // command substitution: keep raw, consume balanced parens
                text.push(cur.bump().unwrap());
                text.push(cur.bump().unwrap());
                let mut depth = 1usize;
                while depth > 0 {
                    match cur.bump() {
                        Some(b'(') => {
                            depth += 1;
                            text.push(b'(');
                        }
                        Some(b')') => {
                            depth -= 1;
                            if depth > 0 {
                                text.push(b')');
                            }
                        }
                        Some(other) => text.push(other),
                        None => break,
                    }
                }
                text.push(b')');
            }
            b'`' => {
                text.push(cur.bump().unwrap());
                while let Some(c) = cur.bump() {
                    text.push(c);
                    if c == b'`' {
                        break;
                    }
                }
            }
            _ => text.push(cur.bump().unwrap()),
        }
    }

    Token {
        kind: TokenKind::Word,
        text: String::from_utf8_lossy(&text).into_owned(),
        start,
        end: cur.pos,
        line,
        col,
        end_col: cur.col,
        quoted,
    }
}
