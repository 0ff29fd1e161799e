//! turns a String expression into a symbolic expression
//!
//! Grammar (usual precedence, `^` right associative, unary minus binds weaker than `^`):
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | '+' unary | power
//! power   := atom ('^' unary)?
//! atom    := number | ident | func '(' expr ')' | '(' expr ')'
//! ident   := letter (letter | digit | '_')* ('[' digits ']')? '\''*
//! ```
//! Identifiers may carry an index (`u[1]`) and primes (`u''`), so derivative symbols of the
//! unknowns are plain variables of the resulting `Expr`.
use crate::symbolic::symbolic_engine::Expr;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || (c == '.' && i + 1 < chars.len() && chars[i + 1].is_ascii_digit()) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            // exponent part: 1e-3, 2.5E+4
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    while j < chars.len() && chars[j].is_ascii_digit() {
                        j += 1;
                    }
                    i = j;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| format!("bad number {}", text))?;
            tokens.push(Token::Num(value));
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            if i < chars.len() && chars[i] == '[' {
                let close = chars[i..]
                    .iter()
                    .position(|&ch| ch == ']')
                    .map(|p| p + i)
                    .ok_or_else(|| format!("unclosed index bracket in {}", input))?;
                if close == i + 1 || !chars[i + 1..close].iter().all(|ch| ch.is_ascii_digit()) {
                    return Err(format!("index must be a non-negative integer in {}", input));
                }
                i = close + 1;
            }
            while i < chars.len() && chars[i] == '\'' {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            match c {
                '+' | '-' | '*' | '/' | '^' => tokens.push(Token::Op(c)),
                '(' => tokens.push(Token::LParen),
                ')' => tokens.push(Token::RParen),
                _ => return Err(format!("unexpected character '{}' in {}", c, input)),
            }
            i += 1;
        }
    }
    Ok(tokens)
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
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            if op != '+' && op != '-' {
                break;
            }
            self.pos += 1;
            let rhs = self.term()?;
            lhs = if op == '+' { lhs + rhs } else { lhs - rhs };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, String> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            if op != '*' && op != '/' {
                break;
            }
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = if op == '*' { lhs * rhs } else { lhs / rhs };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                let inner = self.unary()?;
                Ok(match inner {
                    Expr::Const(v) => Expr::Const(-v),
                    e => -e,
                })
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, String> {
        let base = self.atom()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.pow(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Num(v)) => Ok(Expr::Const(v)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err("missing closing bracket".to_string()),
                }
            }
            Some(Token::Ident(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.pos += 1;
                    let arg = self.expr()?;
                    match self.next() {
                        Some(Token::RParen) => {}
                        _ => return Err(format!("missing closing bracket after {}(", name)),
                    }
                    return apply_function(&name, arg);
                }
                match name.as_str() {
                    "pi" => Ok(Expr::Const(std::f64::consts::PI)),
                    _ => Ok(Expr::Var(name)),
                }
            }
            Some(t) => Err(format!("unexpected token {:?}", t)),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

fn apply_function(name: &str, arg: Expr) -> Result<Expr, String> {
    let b = Box::new(arg);
    match name {
        "exp" => Ok(Expr::Exp(b)),
        "ln" | "log" => Ok(Expr::Ln(b)),
        "sin" => Ok(Expr::sin(b)),
        "cos" => Ok(Expr::cos(b)),
        "tan" | "tg" => Ok(Expr::tg(b)),
        "atan" | "arctg" => Ok(Expr::arctg(b)),
        "sqrt" => Ok(Expr::Pow(b, Box::new(Expr::Const(0.5)))),
        _ => Err(format!("unknown function {}", name)),
    }
}

/// parse a string into `Expr`
pub fn parse_expression_func(input: &str) -> Result<Expr, String> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!(
            "unexpected trailing input in {} at token {}",
            input, parser.pos
        ));
    }
    Ok(expr)
}

impl Expr {
    pub fn parse_expression(input: &str) -> Result<Expr, String> {
        parse_expression_func(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_precedence() {
        let e = parse_expression_func("1 + 2*3^2").unwrap();
        assert_relative_eq!(e.eval_expression(&[], &[]), 19.0);
        let e = parse_expression_func("-2^2").unwrap();
        assert_relative_eq!(e.eval_expression(&[], &[]), -4.0);
        let e = parse_expression_func("2^3^2").unwrap();
        assert_relative_eq!(e.eval_expression(&[], &[]), 512.0);
        let e = parse_expression_func("8/2/2").unwrap();
        assert_relative_eq!(e.eval_expression(&[], &[]), 2.0);
    }

    #[test]
    fn test_derivative_symbols_and_indices() {
        let e = parse_expression_func("u'' + x*u[1]' - 2.5e-1*u").unwrap();
        let vars = e.all_arguments_are_variables();
        assert!(vars.contains(&"u''".to_string()));
        assert!(vars.contains(&"u[1]'".to_string()));
        assert!(vars.contains(&"u".to_string()));
        assert!(vars.contains(&"x".to_string()));
        let v = e.eval_expression(&["u''", "x", "u[1]'", "u"], &[1.0, 2.0, 3.0, 4.0]);
        assert_relative_eq!(v, 1.0 + 6.0 - 1.0);
    }

    #[test]
    fn test_functions() {
        let e = parse_expression_func("exp(x) + log(x) + sqrt(x) + sin(pi*x)").unwrap();
        let v = e.eval_expression(&["x"], &[1.0]);
        assert_relative_eq!(v, std::f64::consts::E + 0.0 + 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_errors() {
        assert!(parse_expression_func("").is_err());
        assert!(parse_expression_func("(x + 1").is_err());
        assert!(parse_expression_func("foo(x)").is_err());
        assert!(parse_expression_func("x $ y").is_err());
        assert!(parse_expression_func("u[a]").is_err());
        assert!(parse_expression_func("x y").is_err());
    }
}
