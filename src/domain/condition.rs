//! Restricted predicate language for structural watches.
//!
//! A condition is parsed once at startup and evaluated against one
//! [`MatchedElement`] at a time. The grammar is deliberately closed: string
//! comparisons and boolean connectives over the element's text and
//! attributes, nothing else.
//!
//! ```text
//! expr     := or
//! or       := and ( "||" and )*
//! and      := unary ( "&&" unary )*
//! unary    := "!" unary | primary
//! primary  := "(" expr ")"
//!           | "ieq" "(" operand "," operand ")"
//!           | operand ( "==" | "!=" ) operand
//! operand  := "text" | "attr" "(" string ")" | string
//! ```

use super::MatchedElement;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    Eq(Operand, Operand),
    Ne(Operand, Operand),
    /// Case-insensitive equality.
    Ieq(Operand, Operand),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    /// The element's text content.
    Text,
    /// An attribute value; absent attributes resolve to `""`.
    Attr(String),
    Literal(String),
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConditionError {
    #[error("empty condition")]
    Empty,
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unknown word {0:?} (expected text, attr or ieq)")]
    UnknownWord(String),
    #[error("expected {expected}, found {found}")]
    Expected {
        expected: &'static str,
        found: String,
    },
    #[error("trailing input after condition: {0}")]
    Trailing(String),
}

impl Condition {
    pub fn parse(input: &str) -> Result<Self, ConditionError> {
        let tokens = lex(input)?;
        if tokens.is_empty() {
            return Err(ConditionError::Empty);
        }
        let mut parser = Parser { tokens, pos: 0 };
        let condition = parser.expr()?;
        match parser.peek() {
            None => Ok(condition),
            Some(tok) => Err(ConditionError::Trailing(describe(Some(tok)))),
        }
    }

    /// Evaluation is total: operands always resolve to strings.
    pub fn matches(&self, element: &MatchedElement) -> bool {
        match self {
            Condition::Eq(a, b) => a.resolve(element) == b.resolve(element),
            Condition::Ne(a, b) => a.resolve(element) != b.resolve(element),
            Condition::Ieq(a, b) => {
                a.resolve(element).to_lowercase() == b.resolve(element).to_lowercase()
            }
            Condition::And(l, r) => l.matches(element) && r.matches(element),
            Condition::Or(l, r) => l.matches(element) || r.matches(element),
            Condition::Not(inner) => !inner.matches(element),
        }
    }
}

impl Operand {
    fn resolve<'a>(&'a self, element: &'a MatchedElement) -> &'a str {
        match self {
            Operand::Text => &element.text,
            Operand::Attr(name) => element.attr(name),
            Operand::Literal(value) => value,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Text,
    Attr,
    Ieq,
    Str(String),
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    Bang,
    LParen,
    RParen,
    Comma,
}

fn lex(input: &str) -> Result<Vec<Token>, ConditionError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '=' => {
                chars.next();
                if chars.next_if_eq(&'=').is_none() {
                    return Err(ConditionError::UnexpectedChar('='));
                }
                tokens.push(Token::EqEq);
            }
            '!' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::NotEq);
                } else {
                    tokens.push(Token::Bang);
                }
            }
            '&' => {
                chars.next();
                if chars.next_if_eq(&'&').is_none() {
                    return Err(ConditionError::UnexpectedChar('&'));
                }
                tokens.push(Token::AndAnd);
            }
            '|' => {
                chars.next();
                if chars.next_if_eq(&'|').is_none() {
                    return Err(ConditionError::UnexpectedChar('|'));
                }
                tokens.push(Token::OrOr);
            }
            '"' | '\'' => {
                chars.next();
                tokens.push(Token::Str(lex_string(&mut chars, c)?));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match word.as_str() {
                    "text" => Token::Text,
                    "attr" => Token::Attr,
                    "ieq" => Token::Ieq,
                    _ => return Err(ConditionError::UnknownWord(word)),
                });
            }
            other => return Err(ConditionError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

fn lex_string(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    quote: char,
) -> Result<String, ConditionError> {
    let mut value = String::new();
    loop {
        match chars.next() {
            None => return Err(ConditionError::UnterminatedString),
            Some(c) if c == quote => return Ok(value),
            Some('\\') => match chars.next() {
                None => return Err(ConditionError::UnterminatedString),
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some(escaped) => value.push(escaped),
            },
            Some(c) => value.push(c),
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, want: Token, expected: &'static str) -> Result<(), ConditionError> {
        match self.next() {
            Some(ref tok) if *tok == want => Ok(()),
            other => Err(ConditionError::Expected {
                expected,
                found: describe(other.as_ref()),
            }),
        }
    }

    fn expr(&mut self) -> Result<Condition, ConditionError> {
        let mut lhs = self.and_expr()?;
        while self.peek() == Some(&Token::OrOr) {
            self.next();
            let rhs = self.and_expr()?;
            lhs = Condition::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Condition, ConditionError> {
        let mut lhs = self.unary()?;
        while self.peek() == Some(&Token::AndAnd) {
            self.next();
            let rhs = self.unary()?;
            lhs = Condition::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Condition, ConditionError> {
        if self.peek() == Some(&Token::Bang) {
            self.next();
            return Ok(Condition::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Condition, ConditionError> {
        match self.peek() {
            Some(Token::LParen) => {
                self.next();
                let inner = self.expr()?;
                self.expect(Token::RParen, "closing parenthesis")?;
                Ok(inner)
            }
            Some(Token::Ieq) => {
                self.next();
                self.expect(Token::LParen, "opening parenthesis after ieq")?;
                let a = self.operand()?;
                self.expect(Token::Comma, "comma between ieq arguments")?;
                let b = self.operand()?;
                self.expect(Token::RParen, "closing parenthesis after ieq")?;
                Ok(Condition::Ieq(a, b))
            }
            _ => {
                let lhs = self.operand()?;
                match self.next() {
                    Some(Token::EqEq) => Ok(Condition::Eq(lhs, self.operand()?)),
                    Some(Token::NotEq) => Ok(Condition::Ne(lhs, self.operand()?)),
                    other => Err(ConditionError::Expected {
                        expected: "comparison operator",
                        found: describe(other.as_ref()),
                    }),
                }
            }
        }
    }

    fn operand(&mut self) -> Result<Operand, ConditionError> {
        match self.next() {
            Some(Token::Text) => Ok(Operand::Text),
            Some(Token::Str(value)) => Ok(Operand::Literal(value)),
            Some(Token::Attr) => {
                self.expect(Token::LParen, "opening parenthesis after attr")?;
                let name = match self.next() {
                    Some(Token::Str(name)) => name,
                    other => {
                        return Err(ConditionError::Expected {
                            expected: "attribute name string",
                            found: describe(other.as_ref()),
                        })
                    }
                };
                self.expect(Token::RParen, "closing parenthesis after attr")?;
                Ok(Operand::Attr(name))
            }
            other => Err(ConditionError::Expected {
                expected: "operand (text, attr(..) or a string)",
                found: describe(other.as_ref()),
            }),
        }
    }
}

fn describe(token: Option<&Token>) -> String {
    let text = match token {
        None => return "end of input".to_string(),
        Some(Token::Str(s)) => return format!("string {s:?}"),
        Some(Token::Text) => "`text`",
        Some(Token::Attr) => "`attr`",
        Some(Token::Ieq) => "`ieq`",
        Some(Token::EqEq) => "`==`",
        Some(Token::NotEq) => "`!=`",
        Some(Token::AndAnd) => "`&&`",
        Some(Token::OrOr) => "`||`",
        Some(Token::Bang) => "`!`",
        Some(Token::LParen) => "`(`",
        Some(Token::RParen) => "`)`",
        Some(Token::Comma) => "`,`",
    };
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element() -> MatchedElement {
        MatchedElement::new("$10")
            .with_attr("class", "price sale")
            .with_attr("data-stock", "In Stock")
    }

    #[test]
    fn text_equality() {
        let cond = Condition::parse(r#"text == "$10""#).unwrap();
        assert!(cond.matches(&element()));

        let cond = Condition::parse(r#"text == "$20""#).unwrap();
        assert!(!cond.matches(&element()));
    }

    #[test]
    fn text_inequality() {
        let cond = Condition::parse(r#"text != "$20""#).unwrap();
        assert!(cond.matches(&element()));
    }

    #[test]
    fn ieq_is_case_insensitive() {
        let cond = Condition::parse(r#"ieq("ABC", "abc")"#).unwrap();
        assert!(cond.matches(&element()));

        let cond = Condition::parse(r#"ieq("abc", "xyz")"#).unwrap();
        assert!(!cond.matches(&element()));

        let cond = Condition::parse(r#"ieq(attr("data-stock"), "in stock")"#).unwrap();
        assert!(cond.matches(&element()));
    }

    #[test]
    fn attribute_comparison() {
        let cond = Condition::parse(r#"attr("class") == "price sale""#).unwrap();
        assert!(cond.matches(&element()));
    }

    #[test]
    fn missing_attribute_resolves_to_empty_string() {
        let cond = Condition::parse(r#"attr("href") == """#).unwrap();
        assert!(cond.matches(&element()));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        // false && false || true must parse as (false && false) || true.
        let cond = Condition::parse(
            r#"text == "nope" && text == "never" || ieq(text, "$10")"#,
        )
        .unwrap();
        assert!(cond.matches(&element()));
    }

    #[test]
    fn negation_and_parentheses() {
        let cond = Condition::parse(r#"!(text == "$20")"#).unwrap();
        assert!(cond.matches(&element()));

        let cond = Condition::parse(r#"!ieq(text, "$10")"#).unwrap();
        assert!(!cond.matches(&element()));
    }

    #[test]
    fn single_quoted_strings_and_escapes() {
        let cond = Condition::parse(r#"text != 'a\'b'"#).unwrap();
        assert!(cond.matches(&element()));

        let cond = Condition::parse(r#""a\"b" == "a\"b""#).unwrap();
        assert!(cond.matches(&element()));
    }

    #[test]
    fn parse_errors() {
        assert_eq!(Condition::parse("").unwrap_err(), ConditionError::Empty);
        assert_eq!(
            Condition::parse("   ").unwrap_err(),
            ConditionError::Empty
        );
        assert_eq!(
            Condition::parse(r#"text = "$10""#).unwrap_err(),
            ConditionError::UnexpectedChar('=')
        );
        assert_eq!(
            Condition::parse(r#"text == "$10"#).unwrap_err(),
            ConditionError::UnterminatedString
        );
        assert!(matches!(
            Condition::parse(r#"price == "$10""#).unwrap_err(),
            ConditionError::UnknownWord(word) if word == "price"
        ));
        // A bare operand is not a boolean expression.
        assert!(matches!(
            Condition::parse("text").unwrap_err(),
            ConditionError::Expected { .. }
        ));
        // Junk after a complete expression.
        assert!(matches!(
            Condition::parse(r#"text == "$10" text"#).unwrap_err(),
            ConditionError::Trailing(_)
        ));
    }
}
