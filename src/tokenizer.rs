use std::fmt;

use crate::error::{Error, Result};

/// The kind of a lexical unit of the SQL language, with its literal payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // --- SQL Keywords ---
    Create,
    Table,
    Insert,
    Into,
    Values,
    Select,
    From,
    Where,
    And,
    Or,
    Order,
    By,
    Limit,
    Update,
    Set,
    Delete,
    /// Reserved; no statement accepts it.
    Null,

    // --- Data Types ---
    Int,
    Varchar,
    Boolean,

    // --- Names and literals ---
    /// Table or column name, kept as written.
    Ident(String),
    /// A 64-bit integer literal, optionally negative (e.g., `42`, `-7`).
    Number(i64),
    /// Contents of a single-quoted literal, quotes stripped.
    String(String),
    True,
    False,

    // --- Operators ---
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,

    // --- Punctuation ---
    /// Left parenthesis `(`
    LeftParen,
    /// Right parenthesis `)`
    RightParen,
    /// Comma `,`
    Comma,
    /// Semicolon `;`
    Semicolon,
    /// Wildcard symbol `*`
    Star,

    // --- Special ---
    /// Represents the End Of Input.
    Eof,
}

impl TokenKind {
    /// Matches a word against the keyword set, case-insensitively.
    fn keyword(word: &str) -> Option<TokenKind> {
        Some(match word.to_ascii_uppercase().as_str() {
            "CREATE" => TokenKind::Create,
            "TABLE" => TokenKind::Table,
            "INSERT" => TokenKind::Insert,
            "INTO" => TokenKind::Into,
            "VALUES" => TokenKind::Values,
            "SELECT" => TokenKind::Select,
            "FROM" => TokenKind::From,
            "WHERE" => TokenKind::Where,
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "ORDER" => TokenKind::Order,
            "BY" => TokenKind::By,
            "LIMIT" => TokenKind::Limit,
            "UPDATE" => TokenKind::Update,
            "SET" => TokenKind::Set,
            "DELETE" => TokenKind::Delete,
            "NULL" => TokenKind::Null,
            "INT" => TokenKind::Int,
            "VARCHAR" => TokenKind::Varchar,
            "BOOLEAN" => TokenKind::Boolean,
            "TRUE" => TokenKind::True,
            "FALSE" => TokenKind::False,
            _ => return None,
        })
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Create => "CREATE",
            TokenKind::Table => "TABLE",
            TokenKind::Insert => "INSERT",
            TokenKind::Into => "INTO",
            TokenKind::Values => "VALUES",
            TokenKind::Select => "SELECT",
            TokenKind::From => "FROM",
            TokenKind::Where => "WHERE",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Order => "ORDER",
            TokenKind::By => "BY",
            TokenKind::Limit => "LIMIT",
            TokenKind::Update => "UPDATE",
            TokenKind::Set => "SET",
            TokenKind::Delete => "DELETE",
            TokenKind::Null => "NULL",
            TokenKind::Int => "INT",
            TokenKind::Varchar => "VARCHAR",
            TokenKind::Boolean => "BOOLEAN",
            TokenKind::Ident(name) => return write!(f, "identifier {name:?}"),
            TokenKind::Number(n) => return write!(f, "number {n}"),
            TokenKind::String(s) => return write!(f, "string '{s}'"),
            TokenKind::True => "TRUE",
            TokenKind::False => "FALSE",
            TokenKind::Equal => "'='",
            TokenKind::NotEqual => "'!='",
            TokenKind::Less => "'<'",
            TokenKind::LessEqual => "'<='",
            TokenKind::Greater => "'>'",
            TokenKind::GreaterEqual => "'>='",
            TokenKind::LeftParen => "'('",
            TokenKind::RightParen => "')'",
            TokenKind::Comma => "','",
            TokenKind::Semicolon => "';'",
            TokenKind::Star => "'*'",
            TokenKind::Eof => "end of input",
        };
        f.write_str(text)
    }
}

/// A token together with the character offset where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

/// Scans SQL text into [Token]s, one character at a time.
pub struct Tokenizer {
    input: Vec<char>,
    /// Index into `input`, also the position reported in tokens and errors.
    position: usize,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Processes the entire input and returns a vector of tokens ending with
    /// [TokenKind::Eof].
    ///
    /// # Errors
    /// [Error::Lex] on a character no token starts with, [Error::MalformedLiteral]
    /// on an unterminated string or an out-of-range integer.
    ///
    /// # Example
    /// ```
    /// # use minidb::tokenizer::{Tokenizer, TokenKind};
    /// let tokens = Tokenizer::new("SELECT *").tokenize().unwrap();
    /// assert_eq!(tokens[0].kind, TokenKind::Select);
    /// assert_eq!(tokens[2].kind, TokenKind::Eof);
    /// ```
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                break;
            }

            let position = self.position;
            let kind = self.next_token()?;
            tokens.push(Token { kind, position });
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            position: self.position,
        });
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<TokenKind> {
        let ch = self.current_char();

        let single = match ch {
            '(' => Some(TokenKind::LeftParen),
            ')' => Some(TokenKind::RightParen),
            ',' => Some(TokenKind::Comma),
            ';' => Some(TokenKind::Semicolon),
            '*' => Some(TokenKind::Star),
            '=' => Some(TokenKind::Equal),
            _ => None,
        };
        if let Some(kind) = single {
            self.advance();
            return Ok(kind);
        }

        match ch {
            '<' => Ok(self.read_comparison(TokenKind::Less, TokenKind::LessEqual)),
            '>' => Ok(self.read_comparison(TokenKind::Greater, TokenKind::GreaterEqual)),
            '!' if self.peek_char() == Some('=') => {
                self.advance();
                self.advance();
                Ok(TokenKind::NotEqual)
            }
            '-' if self.peek_char().is_some_and(|c| c.is_ascii_digit()) => self.read_number(),
            '\'' => self.read_string(),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_alphabetic() || c == '_' => Ok(self.read_identifier()),
            _ => Err(Error::Lex {
                ch,
                position: self.position,
            }),
        }
    }

    // --- Cursor ---

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    /// Consumes characters while `pred` holds and returns them.
    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.position;
        while !self.is_at_end() && pred(self.current_char()) {
            self.advance();
        }
        self.input[start..self.position].iter().collect()
    }

    // --- Literals and words ---

    /// `<`/`>` with an optional trailing `=`.
    fn read_comparison(&mut self, strict: TokenKind, or_equal: TokenKind) -> TokenKind {
        self.advance();
        if self.input.get(self.position) == Some(&'=') {
            self.advance();
            return or_equal;
        }
        strict
    }

    /// A keyword (any case) or an identifier (case kept).
    fn read_identifier(&mut self) -> TokenKind {
        let word = self.take_while(|c| c.is_alphanumeric() || c == '_');
        TokenKind::keyword(&word).unwrap_or(TokenKind::Ident(word))
    }

    /// Digits, possibly after a `-`.
    fn read_number(&mut self) -> Result<TokenKind> {
        let start = self.position;
        let sign = if self.current_char() == '-' {
            self.advance();
            "-"
        } else {
            ""
        };
        let digits = self.take_while(|c| c.is_ascii_digit());
        let literal = format!("{sign}{digits}");

        literal
            .parse::<i64>()
            .map(TokenKind::Number)
            .map_err(|e| Error::MalformedLiteral {
                message: format!("integer literal {literal}: {e}"),
                position: start,
            })
    }

    /// Text up to the next `'`. Quotes cannot be escaped.
    fn read_string(&mut self) -> Result<TokenKind> {
        let start = self.position;
        self.advance();

        let text = self.take_while(|c| c != '\'');
        if self.is_at_end() {
            return Err(Error::MalformedLiteral {
                message: "unterminated string".into(),
                position: start,
            });
        }
        self.advance();

        Ok(TokenKind::String(text))
    }
}
