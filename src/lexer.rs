use logos::Logos;
use tracing::trace;

use crate::token::{Token, TokenKind};

/// Pull-based lexer over raw source bytes.
///
/// Recognition is delegated to the logos-generated automaton on [`TokenKind`];
/// this wrapper tracks line and column positions and keeps handing out `EOF`
/// once the input is exhausted. Any byte that starts no token becomes its own
/// `ILLEGAL` token, so the input does not have to be valid UTF-8.
pub struct Lexer<'a> {
    source: &'a [u8],
    inner: logos::Lexer<'a, TokenKind>,
    exhausted: bool,
    line: usize,
    line_start: usize,
    scanned: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Lexer {
            source,
            inner: TokenKind::lexer(source),
            exhausted: false,
            line: 1,
            line_start: 0,
            scanned: 0,
        }
    }

    pub fn next_token(&mut self) -> Token {
        let next = if self.exhausted { None } else { self.inner.next() };

        let Some(result) = next else {
            self.exhausted = true;
            let (line, column) = self.locate(self.source.len());
            return Token::new(TokenKind::Eof, "", line, column);
        };

        let span = self.inner.span();
        let slice = self.inner.slice();
        let (line, column) = self.locate(span.start);

        match result {
            Ok(TokenKind::String) => Token::new(TokenKind::String, text(unquote(slice)), line, column),
            Ok(kind) => Token::new(kind, text(slice), line, column),
            Err(()) => {
                trace!(line, column, byte = ?slice, "illegal token");
                Token::new(TokenKind::Illegal, text(slice), line, column)
            }
        }
    }

    /// Advances the line bookkeeping up to `offset` and returns the position there.
    fn locate(&mut self, offset: usize) -> (usize, usize) {
        let skipped = &self.source[self.scanned..offset];
        for (index, byte) in skipped.iter().enumerate() {
            if *byte == b'\n' {
                self.line += 1;
                self.line_start = self.scanned + index + 1;
            }
        }
        self.scanned = offset;

        (self.line, offset - self.line_start + 1)
    }
}

// Escape sequences are not interpreted; an unterminated literal has no closing quote.
fn unquote(slice: &[u8]) -> &[u8] {
    let content = slice.strip_prefix(b"\"").unwrap_or(slice);
    content.strip_suffix(b"\"").unwrap_or(content)
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::Lexer;
    use crate::token::{Token, TokenKind};

    fn lex(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input.as_bytes());
        let mut tokens = Vec::new();

        loop {
            let token = lexer.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }

        tokens
    }

    fn kinds(input: &str) -> Vec<(TokenKind, String)> {
        lex(input)
            .into_iter()
            .map(|token| (token.kind, token.literal))
            .collect()
    }

    #[test]
    fn positions_follow_lines_and_columns() {
        let input = "var five = 5; // integer variable\nvar add = func(x, y) {\n\treturn x + y;\n};\n55;";

        let expected = vec![
            Token::new(TokenKind::Var, "var", 1, 1),
            Token::new(TokenKind::Identifier, "five", 1, 5),
            Token::new(TokenKind::Assign, "=", 1, 10),
            Token::new(TokenKind::Integer, "5", 1, 12),
            Token::new(TokenKind::Semicolon, ";", 1, 13),
            Token::new(TokenKind::Var, "var", 2, 1),
            Token::new(TokenKind::Identifier, "add", 2, 5),
            Token::new(TokenKind::Assign, "=", 2, 9),
            Token::new(TokenKind::Func, "func", 2, 11),
            Token::new(TokenKind::LeftParen, "(", 2, 15),
            Token::new(TokenKind::Identifier, "x", 2, 16),
            Token::new(TokenKind::Comma, ",", 2, 17),
            Token::new(TokenKind::Identifier, "y", 2, 19),
            Token::new(TokenKind::RightParen, ")", 2, 20),
            Token::new(TokenKind::LeftBrace, "{", 2, 22),
            Token::new(TokenKind::Return, "return", 3, 2),
            Token::new(TokenKind::Identifier, "x", 3, 9),
            Token::new(TokenKind::Plus, "+", 3, 11),
            Token::new(TokenKind::Identifier, "y", 3, 13),
            Token::new(TokenKind::Semicolon, ";", 3, 14),
            Token::new(TokenKind::RightBrace, "}", 4, 1),
            Token::new(TokenKind::Semicolon, ";", 4, 2),
            Token::new(TokenKind::Integer, "55", 5, 1),
            Token::new(TokenKind::Semicolon, ";", 5, 3),
            Token::new(TokenKind::Eof, "", 5, 4),
        ];

        assert_eq!(lex(input), expected);
    }

    #[test]
    fn two_character_operators() {
        assert_eq!(
            kinds("= == ! != < <= > >="),
            vec![
                (TokenKind::Assign, "=".to_owned()),
                (TokenKind::EqualEqual, "==".to_owned()),
                (TokenKind::Bang, "!".to_owned()),
                (TokenKind::BangEqual, "!=".to_owned()),
                (TokenKind::Less, "<".to_owned()),
                (TokenKind::LessEqual, "<=".to_owned()),
                (TokenKind::Greater, ">".to_owned()),
                (TokenKind::GreaterEqual, ">=".to_owned()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("func var true false if else return funky _under x1"),
            vec![
                (TokenKind::Func, "func".to_owned()),
                (TokenKind::Var, "var".to_owned()),
                (TokenKind::True, "true".to_owned()),
                (TokenKind::False, "false".to_owned()),
                (TokenKind::If, "if".to_owned()),
                (TokenKind::Else, "else".to_owned()),
                (TokenKind::Return, "return".to_owned()),
                (TokenKind::Identifier, "funky".to_owned()),
                (TokenKind::Identifier, "_under".to_owned()),
                (TokenKind::Identifier, "x".to_owned()),
                (TokenKind::Integer, "1".to_owned()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn numbers_need_a_digit_after_the_point() {
        assert_eq!(
            kinds("5.5 5. 12"),
            vec![
                (TokenKind::Float, "5.5".to_owned()),
                (TokenKind::Integer, "5".to_owned()),
                (TokenKind::Illegal, ".".to_owned()),
                (TokenKind::Integer, "12".to_owned()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn strings_are_taken_verbatim() {
        assert_eq!(
            kinds(r#""foo bar" "a\n" "open"#),
            vec![
                (TokenKind::String, "foo bar".to_owned()),
                (TokenKind::String, r"a\n".to_owned()),
                (TokenKind::String, "open".to_owned()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn consecutive_comments_are_skipped() {
        let tokens = lex("// one\n   // two\n\n// three\nx // trailing");

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], Token::new(TokenKind::Identifier, "x", 5, 1));
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn unknown_bytes_are_illegal() {
        assert_eq!(
            kinds("a % b"),
            vec![
                (TokenKind::Identifier, "a".to_owned()),
                (TokenKind::Illegal, "%".to_owned()),
                (TokenKind::Identifier, "b".to_owned()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn end_of_input_is_sticky() {
        let mut lexer = Lexer::new(b"x\n");

        assert_eq!(lexer.next_token().kind, TokenKind::Identifier);
        for _ in 0..3 {
            assert_eq!(lexer.next_token(), Token::new(TokenKind::Eof, "", 2, 1));
        }
    }

    #[test]
    fn every_unrecognised_byte_is_its_own_token() {
        let tokens = lex("é x");

        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Illegal, "\u{FFFD}", 1, 1),
                Token::new(TokenKind::Illegal, "\u{FFFD}", 1, 2),
                Token::new(TokenKind::Identifier, "x", 1, 4),
                Token::new(TokenKind::Eof, "", 1, 5),
            ]
        );
    }

    #[test]
    fn input_need_not_be_utf8() {
        let mut lexer = Lexer::new(b"a \xff\xfe \"b\xffc\" // \x80 ignored\nd");

        assert_eq!(lexer.next_token(), Token::new(TokenKind::Identifier, "a", 1, 1));
        assert_eq!(lexer.next_token(), Token::new(TokenKind::Illegal, "\u{FFFD}", 1, 3));
        assert_eq!(lexer.next_token(), Token::new(TokenKind::Illegal, "\u{FFFD}", 1, 4));
        assert_eq!(lexer.next_token(), Token::new(TokenKind::String, "b\u{FFFD}c", 1, 6));
        assert_eq!(lexer.next_token(), Token::new(TokenKind::Identifier, "d", 2, 1));
        assert_eq!(lexer.next_token(), Token::new(TokenKind::Eof, "", 2, 2));
    }
}
