//! Built-in Tools

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::ToolError;
use crate::tool::{ParameterSchema, Tool, ToolSchema};

/// DateTime tool - returns current time
pub struct DateTimeTool;

#[async_trait]
impl Tool for DateTimeTool {
    fn name(&self) -> &str {
        "datetime"
    }

    fn description(&self) -> &str {
        "Get the current date and time"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            parameters: vec![ParameterSchema::new(
                "format",
                "string",
                "Output format: 'iso', 'human', or 'unix'",
            )],
            output: "The current UTC time in the requested format".into(),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, ToolError> {
        let format = arguments
            .get("format")
            .and_then(Value::as_str)
            .unwrap_or("human");

        let now = chrono::Utc::now();

        let output = match format {
            "iso" => now.to_rfc3339(),
            "unix" => now.timestamp().to_string(),
            "human" => now.format("%A, %B %d, %Y at %H:%M:%S UTC").to_string(),
            other => {
                return Err(ToolError::Validation(format!("Unknown format: {}", other)));
            }
        };

        Ok(json!({ "format": format, "now": output }))
    }
}

/// Calculator tool - evaluates mathematical expressions
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Evaluate a mathematical expression"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            parameters: vec![
                ParameterSchema::new(
                    "expression",
                    "string",
                    "Mathematical expression to evaluate (e.g., '2 + 2', '10 * 5')",
                )
                .required(),
            ],
            output: "The numeric value of the expression".into(),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, ToolError> {
        let expr = arguments
            .get("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::Validation("expression must be a string".into()))?;

        let value = evaluate_expression(expr).map_err(ToolError::Execution)?;
        Ok(json!({ "expression": expr, "value": value }))
    }
}

/// Recursive-descent evaluator for `+ - * / ^` and parentheses
fn evaluate_expression(expr: &str) -> Result<f64, String> {
    if expr.len() > MAX_EXPRESSION_LEN {
        return Err(format!("Expression longer than {} characters", MAX_EXPRESSION_LEN));
    }

    let tokens: Vec<char> = expr.chars().filter(|c| !c.is_whitespace()).collect();
    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let value = parser.sum()?;

    match parser.peek() {
        None => Ok(value),
        Some(c) => Err(format!("Unexpected '{}' at position {}", c, parser.pos)),
    }
}

const MAX_EXPRESSION_LEN: usize = 4096;

/// Maximum nesting of parentheses, unary minus and `^`
const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> Result<f64, String>) -> Result<f64, String> {
        if self.depth >= MAX_DEPTH {
            return Err("Expression nested too deeply".into());
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn sum(&mut self) -> Result<f64, String> {
        let mut acc = self.product()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.product()?;
            acc = if op == '+' { acc + rhs } else { acc - rhs };
        }
        Ok(acc)
    }

    fn product(&mut self) -> Result<f64, String> {
        let mut acc = self.power()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.pos += 1;
            let rhs = self.power()?;
            if op == '/' && rhs == 0.0 {
                return Err("Division by zero".into());
            }
            acc = if op == '*' { acc * rhs } else { acc / rhs };
        }
        Ok(acc)
    }

    // Right-associative
    fn power(&mut self) -> Result<f64, String> {
        let base = self.unary()?;
        if self.peek() == Some('^') {
            self.pos += 1;
            let exp = self.nested(Self::power)?;
            return Ok(base.powf(exp));
        }
        Ok(base)
    }

    fn unary(&mut self) -> Result<f64, String> {
        if self.peek() == Some('-') {
            self.pos += 1;
            return Ok(-self.nested(Self::unary)?);
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                let value = self.nested(Self::sum)?;
                match self.bump() {
                    Some(')') => Ok(value),
                    _ => Err("Missing closing parenthesis".into()),
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
                    self.pos += 1;
                }
                let literal: String = self.tokens[start..self.pos].iter().collect();
                literal.parse::<f64>().map_err(|e| format!("Parse error: {}", e))
            }
            Some(c) => Err(format!("Unexpected '{}' at position {}", c, self.pos)),
            None => Err("Unexpected end of expression".into()),
        }
    }
}
