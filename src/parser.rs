use std::mem;
use std::rc::Rc;

use tracing::debug;

use crate::ast::{BinaryOperator, BlockStatement, Expression, Identifier, Program, Statement, UnaryOperator};
use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
    Index,
}

fn precedence(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::EqualEqual | TokenKind::BangEqual => Precedence::Equals,
        TokenKind::Less | TokenKind::Greater | TokenKind::LessEqual | TokenKind::GreaterEqual => {
            Precedence::LessGreater
        }
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Star | TokenKind::Slash => Precedence::Product,
        TokenKind::LeftParen => Precedence::Call,
        TokenKind::LeftBracket => Precedence::Index,
        _ => Precedence::Lowest,
    }
}

fn binary_operator(kind: TokenKind) -> Option<BinaryOperator> {
    let operator = match kind {
        TokenKind::Plus => BinaryOperator::Add,
        TokenKind::Minus => BinaryOperator::Subtract,
        TokenKind::Star => BinaryOperator::Multiply,
        TokenKind::Slash => BinaryOperator::Divide,
        TokenKind::EqualEqual => BinaryOperator::Equal,
        TokenKind::BangEqual => BinaryOperator::NotEqual,
        TokenKind::Less => BinaryOperator::Less,
        TokenKind::LessEqual => BinaryOperator::LessEqual,
        TokenKind::Greater => BinaryOperator::Greater,
        TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
        _ => return None,
    };
    Some(operator)
}

/// Pratt parser pulling tokens from a [`Lexer`] with one token of lookahead.
///
/// Productions return `None` when they had to give up; the reason is recorded
/// in [`Parser::errors`] and the enclosing loop moves on to the next statement.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    next: Token,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>) -> Self {
        let current = lexer.next_token();
        let next = lexer.next_token();

        Parser {
            lexer,
            current,
            next,
            errors: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();

        while self.current.kind != TokenKind::Eof {
            if let Some(statement) = self.parse_statement() {
                program.statements.push(statement);
            }
            self.advance();
        }

        debug!(
            statements = program.statements.len(),
            errors = self.errors.len(),
            "parsed program"
        );
        program
    }

    fn advance(&mut self) {
        let next = self.lexer.next_token();
        self.current = mem::replace(&mut self.next, next);
    }

    fn expect_next(&mut self, kind: TokenKind) -> Option<()> {
        if self.next.kind == kind {
            self.advance();
            return Some(());
        }

        self.errors.push(ParseError::UnexpectedToken {
            expected: kind,
            found: self.next.kind,
            line: self.next.line,
            column: self.next.column,
        });
        None
    }

    fn skip_semicolon(&mut self) {
        if self.next.kind == TokenKind::Semicolon {
            self.advance();
        }
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        match self.current.kind {
            TokenKind::Var => self.parse_var_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_var_statement(&mut self) -> Option<Statement> {
        let token = self.current.clone();
        self.expect_next(TokenKind::Identifier)?;
        let name = Identifier {
            token: self.current.clone(),
        };
        self.expect_next(TokenKind::Assign)?;
        self.advance();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Some(Statement::Var { token, name, value })
    }

    fn parse_return_statement(&mut self) -> Option<Statement> {
        let token = self.current.clone();
        self.advance();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Some(Statement::Return { token, value })
    }

    fn parse_expression_statement(&mut self) -> Option<Statement> {
        let token = self.current.clone();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Some(Statement::Expression { token, value })
    }

    fn parse_expression(&mut self, precedence_level: Precedence) -> Option<Expression> {
        let mut left = match self.current.kind {
            TokenKind::Identifier => Expression::Identifier(Identifier {
                token: self.current.clone(),
            }),
            TokenKind::Integer => self.parse_integer_literal()?,
            TokenKind::Float => self.parse_float_literal()?,
            TokenKind::True | TokenKind::False => Expression::Boolean {
                token: self.current.clone(),
                value: self.current.kind == TokenKind::True,
            },
            TokenKind::String => Expression::String {
                token: self.current.clone(),
            },
            TokenKind::LeftBracket => self.parse_array_literal()?,
            TokenKind::Minus | TokenKind::Bang => self.parse_prefix_expression()?,
            TokenKind::LeftParen => self.parse_grouped_expression()?,
            TokenKind::If => self.parse_if_expression()?,
            TokenKind::Func => self.parse_function_literal()?,
            kind => {
                self.errors.push(ParseError::MissingPrefix {
                    kind,
                    line: self.current.line,
                    column: self.current.column,
                });
                return None;
            }
        };

        while self.next.kind != TokenKind::Semicolon && precedence_level < precedence(self.next.kind) {
            if let Some(operator) = binary_operator(self.next.kind) {
                self.advance();
                left = self.parse_infix_expression(left, operator)?;
                continue;
            }

            match self.next.kind {
                TokenKind::LeftParen => {
                    self.advance();
                    left = self.parse_call_expression(left)?;
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    left = self.parse_index_expression(left)?;
                }
                _ => break,
            }
        }

        Some(left)
    }

    fn parse_integer_literal(&mut self) -> Option<Expression> {
        match self.current.literal.parse::<i64>() {
            Ok(value) => Some(Expression::Integer {
                token: self.current.clone(),
                value,
            }),
            Err(_) => {
                self.invalid_number("integer");
                None
            }
        }
    }

    fn parse_float_literal(&mut self) -> Option<Expression> {
        match self.current.literal.parse::<f64>() {
            Ok(value) => Some(Expression::Float {
                token: self.current.clone(),
                value,
            }),
            Err(_) => {
                self.invalid_number("float");
                None
            }
        }
    }

    fn invalid_number(&mut self, target: &'static str) {
        self.errors.push(ParseError::InvalidNumber {
            literal: self.current.literal.clone(),
            target,
            line: self.current.line,
            column: self.current.column,
        });
    }

    fn parse_array_literal(&mut self) -> Option<Expression> {
        let token = self.current.clone();
        let elements = self.parse_expression_list(TokenKind::RightBracket)?;

        Some(Expression::Array { token, elements })
    }

    /// Comma-separated expressions up to and including `end`.
    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Expression>> {
        let mut expressions = Vec::new();

        if self.next.kind == end {
            self.advance();
            return Some(expressions);
        }

        self.advance();
        expressions.push(self.parse_expression(Precedence::Lowest)?);

        while self.next.kind == TokenKind::Comma {
            self.advance();
            self.advance();
            expressions.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect_next(end)?;
        Some(expressions)
    }

    fn parse_prefix_expression(&mut self) -> Option<Expression> {
        let token = self.current.clone();
        let operator = if token.kind == TokenKind::Bang {
            UnaryOperator::Not
        } else {
            UnaryOperator::Negate
        };
        self.advance();

        let right = self.parse_expression(Precedence::Prefix)?;

        Some(Expression::Prefix {
            token,
            operator,
            right: Box::new(right),
        })
    }

    fn parse_infix_expression(&mut self, left: Expression, operator: BinaryOperator) -> Option<Expression> {
        let token = self.current.clone();
        let precedence_level = precedence(token.kind);
        self.advance();

        let right = self.parse_expression(precedence_level)?;

        Some(Expression::Infix {
            token,
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_grouped_expression(&mut self) -> Option<Expression> {
        self.advance();
        let expression = self.parse_expression(Precedence::Lowest)?;
        self.expect_next(TokenKind::RightParen)?;

        Some(expression)
    }

    // An unclosed block simply runs to the end of input.
    fn parse_block_statement(&mut self) -> BlockStatement {
        let token = self.current.clone();
        let mut statements = Vec::new();
        self.advance();

        while self.current.kind != TokenKind::RightBrace && self.current.kind != TokenKind::Eof {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            self.advance();
        }

        BlockStatement { token, statements }
    }

    fn parse_if_expression(&mut self) -> Option<Expression> {
        let token = self.current.clone();
        self.expect_next(TokenKind::LeftParen)?;
        self.advance();

        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_next(TokenKind::RightParen)?;
        self.expect_next(TokenKind::LeftBrace)?;
        let consequence = self.parse_block_statement();

        let alternative = if self.next.kind == TokenKind::Else {
            self.advance();
            self.expect_next(TokenKind::LeftBrace)?;
            Some(self.parse_block_statement())
        } else {
            None
        };

        Some(Expression::If {
            token,
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_function_literal(&mut self) -> Option<Expression> {
        let token = self.current.clone();
        self.expect_next(TokenKind::LeftParen)?;
        let parameters = self.parse_function_parameters()?;
        self.expect_next(TokenKind::LeftBrace)?;
        let body = self.parse_block_statement();

        Some(Expression::Function {
            token,
            parameters: parameters.into(),
            body: Rc::new(body),
        })
    }

    fn parse_function_parameters(&mut self) -> Option<Vec<Identifier>> {
        let mut identifiers = Vec::new();

        if self.next.kind == TokenKind::RightParen {
            self.advance();
            return Some(identifiers);
        }

        self.expect_next(TokenKind::Identifier)?;
        identifiers.push(Identifier {
            token: self.current.clone(),
        });

        while self.next.kind == TokenKind::Comma {
            self.advance();
            self.expect_next(TokenKind::Identifier)?;
            identifiers.push(Identifier {
                token: self.current.clone(),
            });
        }

        self.expect_next(TokenKind::RightParen)?;
        Some(identifiers)
    }

    fn parse_call_expression(&mut self, function: Expression) -> Option<Expression> {
        let token = self.current.clone();
        let arguments = self.parse_expression_list(TokenKind::RightParen)?;

        Some(Expression::Call {
            token,
            function: Box::new(function),
            arguments,
        })
    }

    fn parse_index_expression(&mut self, left: Expression) -> Option<Expression> {
        let token = self.current.clone();
        self.advance();

        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect_next(TokenKind::RightBracket)?;

        Some(Expression::Index {
            token,
            left: Box::new(left),
            index: Box::new(index),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::Parser;
    use crate::ast::{Expression, Program, Statement};
    use crate::error::ParseError;
    use crate::lexer::Lexer;
    use crate::token::TokenKind;

    fn parse(input: &str) -> (Program, Vec<ParseError>) {
        let mut parser = Parser::new(Lexer::new(input.as_bytes()));
        let program = parser.parse_program();
        let errors = parser.errors().to_vec();
        (program, errors)
    }

    fn render(input: &str) -> String {
        let (program, errors) = parse(input);
        assert!(errors.is_empty(), "unexpected errors for {:?}: {:?}", input, errors);
        program.to_string()
    }

    #[test]
    fn renders_canonical_source() {
        let cases = [
            ("5 / 5.5 * 5 + -5 - x", "((((5 / 5.5) * 5) + (-5)) - x);"),
            (r#""foo" + " " + "bar""#, r#"(("foo" + " ") + "bar");"#),
            ("(true == false) != !false;", "((true == false) != (!false));"),
            (
                "(1 - 5) < 6 == 7 > 10 <= (45 >= 22)",
                "(((1 - 5) < 6) == ((7 > 10) <= (45 >= 22)));",
            ),
            (
                r#"[2, 5.6, "string", [true, false], func(){x + y}, []];"#,
                r#"[2, 5.6, "string", [true, false], func(){(x + y);}, []];"#,
            ),
            (
                "if (true) { 8 + 9 * 10; } else { false; }",
                "if (true) {(8 + (9 * 10));} else {false;};",
            ),
            ("func (x) { } (a+b)", "func(x){}((a + b));"),
            ("array[6-7]*67", "((array[(6 - 7)]) * 67);"),
            (
                r#"var foo = [9, 9.9, "bar", [true, false], 9 + 9.9];"#,
                r#"var foo = [9, 9.9, "bar", [true, false], (9 + 9.9)];"#,
            ),
            (
                "var foo = 2.3; foo; 1; var y = if (true) {true}; var bar = 6.9; return foo;",
                "var foo = 2.3;foo;1;var y = if (true) {true;};var bar = 6.9;return foo;",
            ),
            ("add(1, 2 * 3)[0](x)", "(add(1, (2 * 3))[0])(x);"),
            ("--x", "(-(-x));"),
        ];

        for (input, expected) in cases {
            assert_eq!(render(input), expected, "input: {}", input);
        }
    }

    #[test]
    fn rendering_is_stable_when_reparsed() {
        let first = render("var f = func(a, b) { return a * (b + 1) }; f(2, [1, 2][-1]) <= 3;");
        assert_eq!(render(&first), first);
    }

    #[test]
    fn reports_structural_problems() {
        let cases = [
            ("var", "expected next token to be "),
            ("var x", "expected next token to be "),
            ("x true = 6;", "missing prefix parse function for "),
            ("92233720368547758079223372036854775807;", "could not parse "),
            ("[1, 2, 3, 4;", "expected next token to be "),
            ("(1 + 2 * 3 / 4", "expected next token to be "),
            ("if", "expected next token to be "),
            ("if (true", "expected next token to be "),
            ("if (true)", "expected next token to be "),
            ("if (true) {} else", "expected next token to be "),
            ("func", "expected next token to be "),
            ("func(", "expected next token to be "),
            ("func()", "expected next token to be "),
            ("array[0", "expected next token to be "),
        ];

        for (input, issue) in cases {
            let (_, errors) = parse(input);
            assert!(!errors.is_empty(), "expected an error for {:?}", input);
            let first = errors[0].to_string();
            assert!(first.contains(issue), "{:?}: got {:?}", input, first);
        }
    }

    #[test]
    fn diagnostics_carry_positions_and_kinds() {
        let (_, errors) = parse("var x\n  7");
        assert_eq!(
            errors[0],
            ParseError::UnexpectedToken {
                expected: TokenKind::Assign,
                found: TokenKind::Integer,
                line: 2,
                column: 3,
            }
        );
        assert_eq!(
            errors[0].to_string(),
            "line 2 column 3: expected next token to be =, got INTEGER instead"
        );

        let (_, errors) = parse("var = 1;");
        assert_eq!(
            errors[0].to_string(),
            "line 1 column 5: expected next token to be IDENTIFIER, got = instead"
        );

        let (_, errors) = parse("9223372036854775808");
        assert_eq!(
            errors[0].to_string(),
            "line 1 column 1: could not parse 9223372036854775808 as integer"
        );

        let (_, errors) = parse("}");
        assert_eq!(errors[0].to_string(), "missing prefix parse function for }");
    }

    #[test]
    fn largest_integer_still_parses() {
        assert_eq!(render("9223372036854775807"), "9223372036854775807;");
    }

    #[test]
    fn leading_zeros_stay_decimal() {
        let (program, errors) = parse("010; 09; 007");
        assert!(errors.is_empty(), "{:?}", errors);
        let values = program
            .statements
            .iter()
            .map(|statement| match statement {
                Statement::Expression { value: Expression::Integer { value, .. }, .. } => *value,
                other => panic!("unexpected statement {:?}", other),
            })
            .collect::<Vec<_>>();
        assert_eq!(values, vec![10, 9, 7]);

        match &parse("010").0.statements[0] {
            Statement::Expression { value: Expression::Integer { value, token }, .. } => {
                assert_eq!(*value, 10);
                assert_eq!(token.literal, "010");
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn failed_statements_are_dropped() {
        let (program, errors) = parse("1; ) 2;");

        assert_eq!(errors.len(), 1);
        assert_eq!(program.to_string(), "1;2;");
    }

    #[test]
    fn function_parameters_must_be_identifiers() {
        let (_, errors) = parse("func(a, 1) {}");
        assert_eq!(
            errors[0].to_string(),
            "line 1 column 9: expected next token to be IDENTIFIER, got INTEGER instead"
        );
    }

    #[test]
    fn nodes_keep_their_introducing_token() {
        let (program, _) = parse("a + b;\nf(1)");

        match &program.statements[1] {
            Statement::Expression { value, .. } => {
                assert!(matches!(value, Expression::Call { .. }));
                assert_eq!(value.token().kind, TokenKind::LeftParen);
                assert_eq!((value.token().line, value.token().column), (2, 2));
            }
            other => panic!("unexpected statement {:?}", other),
        }

        match &program.statements[0] {
            Statement::Expression { value, .. } => assert_eq!(value.token().literal, "+"),
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn statements_keep_their_introducing_token() {
        let (program, errors) = parse("var x = 1;
  return x;
x * 2");
        assert!(errors.is_empty(), "{:?}", errors);

        let tokens = program
            .statements
            .iter()
            .map(|statement| {
                let token = statement.token();
                (token.kind, token.line, token.column)
            })
            .collect::<Vec<_>>();

        assert_eq!(
            tokens,
            vec![
                (TokenKind::Var, 1, 1),
                (TokenKind::Return, 2, 3),
                (TokenKind::Identifier, 3, 1),
            ]
        );
    }
}
