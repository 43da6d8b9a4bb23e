use std::{iter::Peekable, str::CharIndices};

use thiserror::Error;

use crate::token::{Span, Token, TokenKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Invalid dedent to {indent_level} spaces at line {line}, column {column}")]
    InvalidDedent {
        indent_level: usize,
        line: usize,
        column: usize,
    },
    #[error("Unexpected character '{character}' at line {line}, column {column}")]
    UnexpectedCharacter {
        character: char,
        line: usize,
        column: usize,
    },
    #[error("Tabs are not supported for indentation at line {line}, column {column}")]
    TabIndentation { line: usize, column: usize },
    #[error("Invalid integer literal '{literal}' at line {line}, column {column}")]
    InvalidIntegerLiteral {
        literal: String,
        line: usize,
        column: usize,
    },
    #[error("Unterminated string literal at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },
}

pub type LexResult<T> = Result<T, LexError>;

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    indent_stack: Vec<usize>,
    pending_tokens: Vec<Token<'a>>,
    at_line_start: bool,
    eof_reached: bool,
    line: usize,
    column: usize,
    bracket_depth: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            indent_stack: vec![0],
            pending_tokens: Vec::new(),
            at_line_start: true,
            eof_reached: false,
            line: 1,
            column: 0,
            bracket_depth: 0,
        }
    }

    pub fn next_token(&mut self) -> LexResult<Token<'a>> {
        if let Some(token) = self.pending_tokens.pop() {
            return Ok(token);
        }

        if self.eof_reached {
            let index = self.current_index();
            return Ok(Token::new(
                TokenKind::EOF,
                Span {
                    start: index,
                    end: index,
                    line: self.line,
                    column: self.column,
                },
            ));
        }

        if self.at_line_start {
            self.at_line_start = false;
            let indent_level = self.count_indentation()?;
            let current_indent = *self.indent_stack.last().unwrap();
            let index = self.current_index();
            let span = Span {
                start: index,
                end: index,
                line: self.line,
                column: self.column,
            };

            if indent_level > current_indent {
                self.indent_stack.push(indent_level);
                return Ok(Token::new(TokenKind::Indent, span));
            } else if indent_level < current_indent {
                while let Some(&top) = self.indent_stack.last() {
                    if top > indent_level {
                        self.indent_stack.pop();
                        self.pending_tokens
                            .push(Token::new(TokenKind::Dedent, span));
                    } else {
                        break;
                    }
                }
                if *self.indent_stack.last().unwrap() != indent_level {
                    return Err(LexError::InvalidDedent {
                        indent_level,
                        line: self.line,
                        column: self.column,
                    });
                }
                if let Some(token) = self.pending_tokens.pop() {
                    return Ok(token);
                }
            }
        }

        // Comments run to end of line; newlines inside an open bracket pair
        // are continuations rather than statement terminators.
        loop {
            self.skip_whitespace();
            match self.chars.peek() {
                Some(&(_, '#')) => self.skip_comment(),
                Some(&(_, '\n')) if self.bracket_depth > 0 => {
                    self.advance_char();
                }
                _ => break,
            }
        }

        let (start_idx, ch) = match self.chars.peek() {
            Some(&(idx, c)) => (idx, c),
            None => {
                self.eof_reached = true;
                // Handle remaining dedents at EOF
                while self.indent_stack.len() > 1 {
                    self.indent_stack.pop();
                    let index = self.current_index();
                    let span = Span {
                        start: index,
                        end: index,
                        line: self.line,
                        column: self.column,
                    };
                    self.pending_tokens
                        .push(Token::new(TokenKind::Dedent, span));
                }
                if let Some(token) = self.pending_tokens.pop() {
                    return Ok(token);
                }
                let index = self.current_index();
                return Ok(Token::new(
                    TokenKind::EOF,
                    Span {
                        start: index,
                        end: index,
                        line: self.line,
                        column: self.column,
                    },
                ));
            }
        };

        let start_line = self.line;
        let start_column = self.column;
        match ch {
            '\n' => Ok({
                self.advance_char();
                self.at_line_start = true;
                Token::new(
                    TokenKind::Newline,
                    Span {
                        start: start_idx,
                        end: start_idx + 1,
                        line: start_line,
                        column: start_column,
                    },
                )
            }),
            '=' => Ok(self.single_char(TokenKind::Equal, start_idx, start_line, start_column)),
            '+' => Ok(self.single_char(TokenKind::Plus, start_idx, start_line, start_column)),
            '-' => Ok(self.single_char(TokenKind::Minus, start_idx, start_line, start_column)),
            '<' => Ok(self.single_char(TokenKind::Less, start_idx, start_line, start_column)),
            ':' => Ok(self.single_char(TokenKind::Colon, start_idx, start_line, start_column)),
            ',' => Ok(self.single_char(TokenKind::Comma, start_idx, start_line, start_column)),
            '.' => Ok(self.single_char(TokenKind::Dot, start_idx, start_line, start_column)),
            '(' => Ok({
                self.bracket_depth += 1;
                self.single_char(TokenKind::LParen, start_idx, start_line, start_column)
            }),
            ')' => Ok({
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                self.single_char(TokenKind::RParen, start_idx, start_line, start_column)
            }),
            '[' => Ok({
                self.bracket_depth += 1;
                self.single_char(TokenKind::LBracket, start_idx, start_line, start_column)
            }),
            ']' => Ok({
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                self.single_char(TokenKind::RBracket, start_idx, start_line, start_column)
            }),
            '"' => self.read_string(start_idx, start_line, start_column),
            c if c.is_alphabetic() || c == '_' => {
                Ok(self.read_identifier(start_idx, start_line, start_column))
            }
            c if c.is_ascii_digit() => self.read_integer(start_idx, start_line, start_column),
            _ => Err(LexError::UnexpectedCharacter {
                character: ch,
                line: start_line,
                column: start_column,
            }),
        }
    }

    fn single_char(
        &mut self,
        kind: TokenKind<'a>,
        start: usize,
        line: usize,
        column: usize,
    ) -> Token<'a> {
        self.advance_char();
        Token::new(
            kind,
            Span {
                start,
                end: start + 1,
                line,
                column,
            },
        )
    }

    fn count_indentation(&mut self) -> LexResult<usize> {
        let mut count = 0;

        // Use clone to look ahead for empty lines check
        let mut temp_chars = self.chars.clone();
        let mut is_empty_line = false;

        while let Some(&(_, c)) = temp_chars.peek() {
            if c == ' ' {
                temp_chars.next();
            } else if c == '\t' {
                return Err(LexError::TabIndentation {
                    line: self.line,
                    column: self.column,
                });
            } else if c == '\n' || c == '#' {
                // Blank and comment-only lines carry no indentation weight.
                is_empty_line = true;
                break;
            } else {
                break;
            }
        }

        if is_empty_line {
            // Return current indentation to avoid generating Indent/Dedent tokens
            return Ok(*self.indent_stack.last().unwrap());
        }

        while let Some(&(_, c)) = self.chars.peek() {
            if c == ' ' {
                self.advance_char();
                count += 1;
            } else {
                break;
            }
        }

        Ok(count)
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c == ' ' {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.advance_char();
        }
    }

    fn read_identifier(&mut self, start: usize, line: usize, column: usize) -> Token<'a> {
        self.advance_char(); // Consume first char
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance_char();
            } else {
                break;
            }
        }

        let end_idx = match self.chars.peek() {
            Some(&(idx, _)) => idx,
            None => self.input.len(),
        };

        let ident = &self.input[start..end_idx];
        let kind = match ident {
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "def" => TokenKind::Def,
            "return" => TokenKind::Return,
            "pass" => TokenKind::Pass,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            "None" => TokenKind::NoneLiteral,
            _ => TokenKind::Identifier(ident),
        };
        Token::new(
            kind,
            Span {
                start,
                end: end_idx,
                line,
                column,
            },
        )
    }

    fn read_integer(&mut self, start: usize, line: usize, column: usize) -> LexResult<Token<'a>> {
        self.advance_char(); // Consume first digit
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.advance_char();
            } else {
                break;
            }
        }

        let end_idx = match self.chars.peek() {
            Some(&(idx, _)) => idx,
            None => self.input.len(),
        };

        let num_str = &self.input[start..end_idx];
        let num = num_str
            .parse::<i64>()
            .map_err(|_| LexError::InvalidIntegerLiteral {
                literal: num_str.to_string(),
                line,
                column,
            })?;
        Ok(Token::new(
            TokenKind::Integer(num),
            Span {
                start,
                end: end_idx,
                line,
                column,
            },
        ))
    }

    fn read_string(&mut self, start: usize, line: usize, column: usize) -> LexResult<Token<'a>> {
        self.advance_char(); // Consume opening quote
        let content_start = (start + 1).min(self.input.len());
        while let Some(&(idx, c)) = self.chars.peek() {
            if c == '"' {
                let content_end = idx;
                self.advance_char(); // Consume closing quote
                return Ok(Token::new(
                    TokenKind::String(&self.input[content_start..content_end]),
                    Span {
                        start,
                        end: idx + 1,
                        line,
                        column,
                    },
                ));
            }
            if c == '\n' {
                return Err(LexError::UnterminatedString { line, column });
            }
            self.advance_char();
        }
        Err(LexError::UnterminatedString { line, column })
    }

    fn advance_char(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }
}

pub fn tokenize<'a>(input: &'a str) -> LexResult<Vec<Token<'a>>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_eof = matches!(token.kind, TokenKind::EOF);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kinds<'a>(input: &'a str) -> Vec<TokenKind<'a>> {
        tokenize(input)
            .expect("tokenize should succeed")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_simple_program() {
        let input = indoc! {"
            def fn():
                n = 4 + 4
                print(n)
            fn()
        "};
        let expected_tokens = vec![
            TokenKind::Def,
            TokenKind::Identifier("fn"),
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::Colon,
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Identifier("n"),
            TokenKind::Equal,
            TokenKind::Integer(4),
            TokenKind::Plus,
            TokenKind::Integer(4),
            TokenKind::Newline,
            TokenKind::Identifier("print"),
            TokenKind::LParen,
            TokenKind::Identifier("n"),
            TokenKind::RParen,
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Identifier("fn"),
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::Newline,
            TokenKind::EOF,
        ];

        assert_eq!(kinds(input), expected_tokens);
    }

    #[test]
    fn attribute_and_subscript_tokens() {
        let expected = vec![
            TokenKind::Identifier("names"),
            TokenKind::Equal,
            TokenKind::Identifier("scry"),
            TokenKind::Dot,
            TokenKind::Identifier("assigned_names"),
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::LBracket,
            TokenKind::Integer(0),
            TokenKind::RBracket,
            TokenKind::Newline,
            TokenKind::EOF,
        ];
        assert_eq!(kinds("names = scry.assigned_names()[0]\n"), expected);
    }

    #[test]
    fn comments_are_skipped() {
        let input = indoc! {"
            # leading comment
            x = 1  # trailing comment
        "};
        let expected = vec![
            TokenKind::Newline,
            TokenKind::Identifier("x"),
            TokenKind::Equal,
            TokenKind::Integer(1),
            TokenKind::Newline,
            TokenKind::EOF,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn comment_only_line_inside_block_keeps_indentation() {
        let input = indoc! {"
            def fn():
                # explain
                return 1
        "};
        let tokens = kinds(input);
        let indents = tokens
            .iter()
            .filter(|kind| matches!(kind, TokenKind::Indent))
            .count();
        let dedents = tokens
            .iter()
            .filter(|kind| matches!(kind, TokenKind::Dedent))
            .count();
        assert_eq!(indents, 1);
        assert_eq!(dedents, 1);
    }

    #[test]
    fn newlines_inside_brackets_are_continuations() {
        let input = indoc! {"
            xs = [
                1,
                2,
            ]
        "};
        let expected = vec![
            TokenKind::Identifier("xs"),
            TokenKind::Equal,
            TokenKind::LBracket,
            TokenKind::Integer(1),
            TokenKind::Comma,
            TokenKind::Integer(2),
            TokenKind::Comma,
            TokenKind::RBracket,
            TokenKind::Newline,
            TokenKind::EOF,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn continuation_lines_report_their_own_line_numbers() {
        let tokens = tokenize("full = note(\n    1)\n").expect("tokenize should succeed");
        let one = tokens
            .iter()
            .find(|token| matches!(token.kind, TokenKind::Integer(1)))
            .expect("integer token present");
        assert_eq!(one.span.line, 2);
    }

    #[test]
    fn errors_on_invalid_character() {
        let err = tokenize("x = 1 @ 2\n").expect_err("expected lexing failure");
        assert!(err.to_string().contains("Unexpected character '@'"));
    }

    #[test]
    fn errors_on_integer_overflow() {
        let err = tokenize("n = 99999999999999999999999999\n").expect_err("expected overflow");
        assert!(err.to_string().contains("Invalid integer literal"));
    }

    #[test]
    fn errors_on_tab_indentation() {
        let input = "def fn():\n\treturn 1\n";
        let err = tokenize(input).expect_err("expected tab failure");
        assert_eq!(err, LexError::TabIndentation { line: 2, column: 0 });
    }

    #[test]
    fn errors_on_unterminated_string() {
        let err = tokenize("s = \"open\n").expect_err("expected string failure");
        assert!(err.to_string().contains("Unterminated string literal"));
    }
}
