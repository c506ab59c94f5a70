use crate::{
    diagnostics::{Diagnostic, SourceSpan},
    error_code::ErrorCode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Let,
    Func,
    Class,
    Import,
    If,
    Else,
    When,
    Otherwise,
    While,
    For,
    In,
    Repeat,
    Return,
    Break,
    Continue,
    True,
    False,
    None,
    And,
    Or,
    Not,
    Super,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    Keyword(Keyword),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    DoubleAmpersand,
    DoublePipe,
    Bang,
    BangEqual,
    EqualEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Eof,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Identifier => "identifier".into(),
            TokenKind::Number => "number".into(),
            TokenKind::String => "string".into(),
            TokenKind::Keyword(kw) => format!("keyword `{}`", kw.as_str()),
            TokenKind::Eof => "end of input".into(),
            other => format!("`{}`", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Assign => "=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::DoubleAmpersand => "&&",
            TokenKind::DoublePipe => "||",
            TokenKind::Bang => "!",
            TokenKind::BangEqual => "!=",
            TokenKind::EqualEqual => "==",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            _ => "",
        }
    }
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Let => "let",
            Keyword::Func => "func",
            Keyword::Class => "class",
            Keyword::Import => "import",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::When => "when",
            Keyword::Otherwise => "otherwise",
            Keyword::While => "while",
            Keyword::For => "for",
            Keyword::In => "in",
            Keyword::Repeat => "repeat",
            Keyword::Return => "return",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::None => "none",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Not => "not",
            Keyword::Super => "super",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: SourceSpan,
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    current: usize,
    peeked: Option<(usize, char)>,
    line: usize,
    column: usize,
}

/// Position of the token currently being scanned.
#[derive(Clone, Copy)]
struct Mark {
    start: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices(),
            current: 0,
            peeked: None,
            line: 1,
            column: 1,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = match self.peeked.take() {
            Some(pair) => Some(pair),
            None => self.chars.next(),
        };
        if let Some((idx, ch)) = next {
            self.current = idx + ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        if self.peeked.is_none() {
            self.peeked = self.chars.next();
        }
        self.peeked
    }

    /// Character after the peeked one.
    fn peek_second(&mut self) -> Option<char> {
        self.peek();
        self.chars.clone().next().map(|(_, ch)| ch)
    }

    fn match_next(&mut self, expected: char) -> bool {
        match self.peek() {
            Some((_, ch)) if ch == expected => {
                self.bump();
                true
            }
            _ => false,
        }
    }

    fn mark(&self, start: usize) -> Mark {
        Mark {
            start,
            line: self.line,
            column: self.column,
        }
    }

    fn span_from(&self, mark: Mark) -> SourceSpan {
        SourceSpan::new(
            mark.start,
            self.current,
            mark.line,
            mark.column,
            self.line,
            self.column,
        )
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some((_, ch)) = self.peek() {
            if ch.is_whitespace() {
                self.bump();
            } else if ch == '#' || (ch == '/' && self.peek_second() == Some('/')) {
                while let Some((_, ch)) = self.peek() {
                    if ch == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn identifier_or_keyword(&mut self, mark: Mark) -> Token {
        while let Some((_, ch)) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let lexeme = self.source[mark.start..self.current].to_string();
        let kind = keyword_for(&lexeme).unwrap_or(TokenKind::Identifier);
        Token {
            kind,
            lexeme,
            span: self.span_from(mark),
        }
    }

    fn number_literal(&mut self, mark: Mark) -> Token {
        let mut seen_dot = false;
        while let Some((_, ch)) = self.peek() {
            match ch {
                '0'..='9' | '_' => {
                    self.bump();
                }
                '.' if !seen_dot
                    && self
                        .peek_second()
                        .is_some_and(|next| next.is_ascii_digit()) =>
                {
                    seen_dot = true;
                    self.bump();
                }
                _ => break,
            }
        }
        Token {
            kind: TokenKind::Number,
            lexeme: self.source[mark.start..self.current].to_string(),
            span: self.span_from(mark),
        }
    }

    fn string_literal(&mut self, mark: Mark, quote: char) -> Result<Token, Diagnostic> {
        let mut value = String::new();
        while let Some((_, ch)) = self.bump() {
            match ch {
                c if c == quote => {
                    return Ok(Token {
                        kind: TokenKind::String,
                        lexeme: value,
                        span: self.span_from(mark),
                    });
                }
                '\\' => match self.bump() {
                    Some((_, esc)) => match esc {
                        'n' => value.push('\n'),
                        'r' => value.push('\r'),
                        't' => value.push('\t'),
                        '0' => value.push('\0'),
                        other => value.push(other),
                    },
                    None => break,
                },
                _ => value.push(ch),
            }
        }
        Err(Diagnostic::new(ErrorCode::E0002, "unterminated string literal")
            .with_span(self.span_from(mark)))
    }

    fn simple_token(&self, mark: Mark, kind: TokenKind) -> Token {
        Token {
            kind,
            lexeme: self.source[mark.start..self.current].to_string(),
            span: self.span_from(mark),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            let mark = self.mark(self.current);
            let (start, ch) = match self.bump() {
                Some(pair) => pair,
                None => {
                    tokens.push(Token {
                        kind: TokenKind::Eof,
                        lexeme: String::new(),
                        span: self.span_from(mark),
                    });
                    break;
                }
            };
            let mark = Mark { start, ..mark };

            let token = match ch {
                c if c.is_alphabetic() || c == '_' => self.identifier_or_keyword(mark),
                '0'..='9' => self.number_literal(mark),
                '"' | '\'' => self.string_literal(mark, ch)?,
                '(' => self.simple_token(mark, TokenKind::LParen),
                ')' => self.simple_token(mark, TokenKind::RParen),
                '{' => self.simple_token(mark, TokenKind::LBrace),
                '}' => self.simple_token(mark, TokenKind::RBrace),
                '[' => self.simple_token(mark, TokenKind::LBracket),
                ']' => self.simple_token(mark, TokenKind::RBracket),
                ',' => self.simple_token(mark, TokenKind::Comma),
                '.' => self.simple_token(mark, TokenKind::Dot),
                ';' => self.simple_token(mark, TokenKind::Semicolon),
                ':' => self.simple_token(mark, TokenKind::Colon),
                '+' => self.simple_token(mark, TokenKind::Plus),
                '-' => self.simple_token(mark, TokenKind::Minus),
                '*' => self.simple_token(mark, TokenKind::Star),
                '/' => self.simple_token(mark, TokenKind::Slash),
                '%' => self.simple_token(mark, TokenKind::Percent),
                '=' => {
                    if self.match_next('=') {
                        self.simple_token(mark, TokenKind::EqualEqual)
                    } else {
                        self.simple_token(mark, TokenKind::Assign)
                    }
                }
                '!' => {
                    if self.match_next('=') {
                        self.simple_token(mark, TokenKind::BangEqual)
                    } else {
                        self.simple_token(mark, TokenKind::Bang)
                    }
                }
                '<' => {
                    if self.match_next('=') {
                        self.simple_token(mark, TokenKind::LessEqual)
                    } else {
                        self.simple_token(mark, TokenKind::Less)
                    }
                }
                '>' => {
                    if self.match_next('=') {
                        self.simple_token(mark, TokenKind::GreaterEqual)
                    } else {
                        self.simple_token(mark, TokenKind::Greater)
                    }
                }
                '&' if self.match_next('&') => self.simple_token(mark, TokenKind::DoubleAmpersand),
                '|' if self.match_next('|') => self.simple_token(mark, TokenKind::DoublePipe),
                other => {
                    return Err(Diagnostic::new(
                        ErrorCode::E0006,
                        format!("unexpected character `{other}`"),
                    )
                    .with_span(self.span_from(mark)));
                }
            };
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn keyword_for(ident: &str) -> Option<TokenKind> {
    use self::Keyword as Kw;
    let keyword = match ident {
        "let" => Kw::Let,
        "func" => Kw::Func,
        "class" => Kw::Class,
        "import" => Kw::Import,
        "if" => Kw::If,
        "else" => Kw::Else,
        "when" => Kw::When,
        "otherwise" => Kw::Otherwise,
        "while" => Kw::While,
        "for" => Kw::For,
        "in" => Kw::In,
        "repeat" => Kw::Repeat,
        "return" => Kw::Return,
        "break" => Kw::Break,
        "continue" => Kw::Continue,
        "true" => Kw::True,
        "false" => Kw::False,
        "none" => Kw::None,
        "and" => Kw::And,
        "or" => Kw::Or,
        "not" => Kw::Not,
        "super" => Kw::Super,
        _ => return None,
    };
    Some(TokenKind::Keyword(keyword))
}
