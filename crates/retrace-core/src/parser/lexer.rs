use logos::{Lexer, Logos};

use super::ParseError;
use crate::ast::Span;

#[derive(Debug, Logos, PartialEq, Clone)]
pub enum Tok {
    #[regex(r"[ \t\r\n\f]+", logos::skip)]
    _Whitespace,

    #[regex(r"//[^\n]*", logos::skip)]
    _LineComment,

    #[regex(r"/\*([^*]|\*+[^*/])*\*+/", logos::skip)]
    _BlockComment,

    // Keywords
    #[token("function")]
    Function,
    #[token("var")]
    Var,
    #[token("let")]
    Let,
    #[token("const")]
    Const,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("return")]
    Return,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("throw")]
    Throw,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("undefined")]
    Undefined,
    #[token("this")]
    This,
    #[token("typeof")]
    TypeOf,

    // Punctuation
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("?")]
    Question,

    // Assignment (compound forms before their prefixes)
    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("%=")]
    PercentAssign,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,

    // Arithmetic
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    // Comparison and logic
    #[token("===")]
    EqEqEq,
    #[token("!==")]
    BangEqEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("<=")]
    LessEq,
    #[token("<")]
    Less,
    #[token(">=")]
    GreaterEq,
    #[token(">")]
    Greater,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,

    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", parse_number)]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", parse_number)]
    Number(f64),

    #[regex(r#""([^"\\\n]|\\.)*""#, parse_string)]
    #[regex(r"'([^'\\\n]|\\.)*'", parse_string)]
    Str(String),

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice().to_string())]
    Ident(String),
}

fn parse_number(lex: &mut Lexer<Tok>) -> Option<f64> {
    lex.slice().parse::<f64>().ok()
}

fn parse_string(lex: &mut Lexer<Tok>) -> Option<String> {
    let s = lex.slice();
    let inner = &s[1..s.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '0' => out.push('\0'),
            // \\ \" \' and unknown escapes keep the escaped character
            other => out.push(other),
        }
    }
    Some(out)
}

/// A token with its absolute span
#[derive(Debug, Clone, PartialEq)]
pub struct Lexed {
    pub tok: Tok,
    pub span: Span,
}

/// Tokenize `text`, shifting every span by `base` so spans stay absolute
/// with respect to the source `text` was cut from.
pub fn tokenize(text: &str, base: usize) -> Result<Vec<Lexed>, ParseError> {
    let mut out = Vec::new();
    let mut lex = Tok::lexer(text);
    while let Some(res) = lex.next() {
        let range = lex.span();
        match res {
            Ok(tok) => out.push(Lexed {
                tok,
                span: Span::new(range.start + base, range.end + base),
            }),
            Err(()) => {
                return Err(ParseError::at(
                    text,
                    range.start,
                    format!("unexpected character `{}`", lex.slice()),
                ))
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Tok> {
        tokenize(src, 0)
            .unwrap()
            .into_iter()
            .map(|lexed| lexed.tok)
            .collect()
    }

    #[test]
    fn keywords_win_over_identifiers() {
        assert_eq!(
            kinds("if iffy return"),
            vec![Tok::If, Tok::Ident("iffy".into()), Tok::Return]
        );
    }

    #[test]
    fn longest_operator_matches() {
        assert_eq!(
            kinds("a === b !== c += 1"),
            vec![
                Tok::Ident("a".into()),
                Tok::EqEqEq,
                Tok::Ident("b".into()),
                Tok::BangEqEq,
                Tok::Ident("c".into()),
                Tok::PlusAssign,
                Tok::Number(1.0),
            ]
        );
    }

    #[test]
    fn strings_unescape_and_comments_skip() {
        assert_eq!(
            kinds("'it\\'s' // gone\n\"a\\nb\" /* also gone */"),
            vec![Tok::Str("it's".into()), Tok::Str("a\nb".into())]
        );
    }

    #[test]
    fn spans_are_shifted_by_base() {
        let toks = tokenize("x = 1", 10).unwrap();
        assert_eq!(toks[0].span, Span::new(10, 11));
        assert_eq!(toks[2].span, Span::new(14, 15));
    }

    #[test]
    fn bad_character_reports_position() {
        let err = tokenize("a\n  #", 0).unwrap_err();
        assert_eq!((err.line, err.column), (2, 3));
    }
}
