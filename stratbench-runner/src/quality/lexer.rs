//! Token-level view of a unit's source.
//!
//! The lexer recognises just enough of the scripting language to drive the
//! quality rules: keywords that affect control flow, delimiters, numeric
//! literals, identifiers and doc comments. Plain comments and whitespace are
//! stripped. Doc comments are kept as tokens because documentation is scored.

use std::ops::Range;

use logos::Logos;

/// Unit source token.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//([^/!\n][^\n]*)?")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum Token<'s> {
    // === Keywords ===
    #[token("fn")]
    Fn,
    #[token("private")]
    Private,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("loop")]
    Loop,
    #[token("for")]
    For,
    #[token("do")]
    Do,
    #[token("switch")]
    Switch,
    #[token("try")]
    Try,
    #[token("catch")]
    Catch,
    #[token("return")]
    Return,
    #[token("throw")]
    Throw,

    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    /// Object map literal opener `#{`.
    #[token("#{")]
    MapOpen,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // === Operators ===
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("::")]
    PathSep,
    #[token("-")]
    Minus,
    /// Any other single punctuation character.
    #[regex(r"[+*/%<>=!&|^~:?@$.,;#]", |lex| lex.slice())]
    Punct(&'s str),

    // === Literals ===
    #[regex(r"[0-9][0-9_]*", number)]
    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?", number)]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+", number)]
    #[regex(r"0x[0-9a-fA-F_]+", hex)]
    Number(f64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice())]
    #[regex(r"`[^`]*`", |lex| lex.slice())]
    #[regex(r"'([^'\\]|\\.)'", |lex| lex.slice())]
    Str(&'s str),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice())]
    Ident(&'s str),

    // === Docs ===
    /// `//!` inner doc line, prefix stripped.
    #[regex(r"//![^\n]*", |lex| lex.slice()[3..].trim())]
    InnerDoc(&'s str),

    /// `///` outer doc line or `/** */` doc block, delimiters stripped.
    #[regex(r"///[^\n]*", |lex| lex.slice()[3..].trim(), priority = 10)]
    #[regex(r"/\*\*([^*]|\*+[^*/])*\*+/", block_doc, priority = 10)]
    OuterDoc(&'s str),
}

fn block_doc<'s>(lex: &mut logos::Lexer<'s, Token<'s>>) -> &'s str {
    let slice = lex.slice();
    slice[3..slice.len() - 2].trim_matches(|c: char| c.is_whitespace() || c == '*')
}

fn number<'s>(lex: &mut logos::Lexer<'s, Token<'s>>) -> Option<f64> {
    lex.slice().replace('_', "").parse().ok()
}

fn hex<'s>(lex: &mut logos::Lexer<'s, Token<'s>>) -> Option<f64> {
    let digits = lex.slice()[2..].replace('_', "");
    i64::from_str_radix(&digits, 16).ok().map(|v| v as f64)
}

impl Token<'_> {
    /// True for tokens that end an operand, so a following `-` is binary.
    pub fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::Ident(_) | Token::Number(_) | Token::Str(_) | Token::RParen | Token::RBracket | Token::RBrace
        )
    }
}

/// A token with its byte span.
pub type Spanned<'s> = (Token<'s>, Range<usize>);

/// Byte offset of the first unrecognised input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexError {
    pub offset: usize,
}

/// Tokenize `source`, failing on the first unrecognised input.
pub fn lex(source: &str) -> Result<Vec<Spanned<'_>>, LexError> {
    Token::lexer(source)
        .spanned()
        .map(|(token, span)| match token {
            Ok(token) => Ok((token, span)),
            Err(()) => Err(LexError { offset: span.start }),
        })
        .collect()
}

/// One-based line number of a byte offset.
pub fn line_of(source: &str, offset: usize) -> usize {
    let end = offset.min(source.len());
    source.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token<'_>> {
        lex(source).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn keywords_and_idents() {
        assert_eq!(
            tokens("fn handle_data() { return; }"),
            vec![
                Token::Fn,
                Token::Ident("handle_data"),
                Token::LParen,
                Token::RParen,
                Token::LBrace,
                Token::Return,
                Token::Punct(";"),
                Token::RBrace,
            ]
        );
    }

    #[test]
    fn keyword_prefix_is_an_identifier() {
        assert_eq!(tokens("format iffy"), vec![Token::Ident("format"), Token::Ident("iffy")]);
    }

    #[test]
    fn comments_are_stripped_and_docs_kept() {
        let toks = tokens("//! Unit doc\n// plain\n/* block */\n/// Hook doc\nfn x() {}\n//\n");
        assert_eq!(toks[0], Token::InnerDoc("Unit doc"));
        assert_eq!(toks[1], Token::OuterDoc("Hook doc"));
        assert_eq!(toks[2], Token::Fn);
        assert_eq!(toks.len(), 8);
    }

    #[test]
    fn block_docs_are_outer_docs() {
        let toks = tokens("/**\n * Buy on dips.\n */\nfn x() {}");
        assert_eq!(toks[0], Token::OuterDoc("Buy on dips."));
        assert_eq!(toks[1], Token::Fn);
        // Empty and plain block comments stay stripped
        assert_eq!(tokens("/**/ /* plain */ fn")[0], Token::Fn);
        assert_eq!(tokens("/** */ fn")[0], Token::OuterDoc(""));
    }

    #[test]
    fn switch_is_a_keyword() {
        assert_eq!(tokens("switch x {}")[0], Token::Switch);
    }

    #[test]
    fn numbers_parse() {
        assert_eq!(
            tokens("1_000 2.5 1e3 0xff"),
            vec![
                Token::Number(1000.0),
                Token::Number(2.5),
                Token::Number(1000.0),
                Token::Number(255.0)
            ]
        );
    }

    #[test]
    fn operators_split_cleanly() {
        assert_eq!(
            tokens("a && !b || c != ()"),
            vec![
                Token::Ident("a"),
                Token::AndAnd,
                Token::Punct("!"),
                Token::Ident("b"),
                Token::OrOr,
                Token::Ident("c"),
                Token::NotEq,
                Token::LParen,
                Token::RParen,
            ]
        );
    }

    #[test]
    fn strings_hide_their_contents() {
        assert_eq!(tokens(r#"emit_alert("if { return")"#).len(), 4);
    }

    #[test]
    fn map_literal_opener() {
        assert_eq!(tokens("#{a: 1}")[0], Token::MapOpen);
    }

    #[test]
    fn unknown_input_is_an_error() {
        let err = lex("let x = 1;\nlet y = \u{00e9};").unwrap_err();
        assert_eq!(line_of("let x = 1;\nlet y = \u{00e9};", err.offset), 2);
    }
}
