//! Lexer for markup using logos
//!
//! Tags are lexed as whole slices; attributes are split out by the tree
//! builder. Anything logos cannot match (a stray `<`) is surfaced as an error
//! token so the caller can decide to keep it as text.

use logos::Logos;

/// Token types for markup
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
pub enum Token<'src> {
    #[regex(r"<!--([^-]|-[^-]|--[^>])*-->", |lex| lex.slice())]
    Comment(&'src str),

    #[regex(r"<![a-zA-Z][^>]*>", |lex| lex.slice())]
    Doctype(&'src str),

    #[regex(r"</[a-zA-Z$][^>]*>", |lex| lex.slice())]
    CloseTag(&'src str),

    #[regex(r"<[a-zA-Z$][^>]*>", |lex| lex.slice())]
    OpenTag(&'src str),

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),
}

/// Byte range of a token in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
}

/// A token with its span
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken<'src> {
    pub token: Token<'src>,
    pub span: TokenSpan,
}

/// Lex markup into tokens with spans.
///
/// Unmatched input comes back as `Err(span)`.
pub fn lex(source: &str) -> impl Iterator<Item = Result<SpannedToken<'_>, TokenSpan>> + '_ {
    Token::lexer(source).spanned().map(|(result, span)| {
        let span = TokenSpan {
            start: span.start,
            end: span.end,
        };
        match result {
            Ok(token) => Ok(SpannedToken { token, span }),
            Err(_) => Err(span),
        }
    })
}

/// Tokenize a source string, dropping anything that does not lex
pub fn tokenize(source: &str) -> Vec<(Token<'_>, std::ops::Range<usize>)> {
    Token::lexer(source)
        .spanned()
        .filter_map(|(result, span)| result.ok().map(|token| (token, span)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_and_text() {
        let tokens = tokenize(r#"<p class="a">foo</p>"#);

        assert_eq!(tokens[0].0, Token::OpenTag(r#"<p class="a">"#));
        assert_eq!(tokens[1].0, Token::Text("foo"));
        assert_eq!(tokens[2].0, Token::CloseTag("</p>"));
    }

    #[test]
    fn test_comments_and_doctype() {
        let tokens = tokenize("<!DOCTYPE html><!-- note --><br/>");

        assert!(matches!(tokens[0].0, Token::Doctype(_)));
        assert_eq!(tokens[1].0, Token::Comment("<!-- note -->"));
        assert_eq!(tokens[2].0, Token::OpenTag("<br/>"));
    }

    #[test]
    fn test_model_notation_names() {
        let tokens = tokenize(r#"<$text bold="true">x</$text>"#);

        assert_eq!(tokens[0].0, Token::OpenTag(r#"<$text bold="true">"#));
        assert_eq!(tokens[2].0, Token::CloseTag("</$text>"));
    }

    #[test]
    fn test_stray_angle_bracket_is_error() {
        let results: Vec<_> = lex("a < b").collect();

        assert!(results.iter().any(|r| r.is_err()));
    }
}
