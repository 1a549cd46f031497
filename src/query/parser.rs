//! GReQL Parser
//!
//! Hand-written recursive-descent parser turning query text into a [`Query`].
//!
//! Precedence, loosest first: `where`, `? :`, `or`, `xor`, `and`,
//! `=` / `<>` / `=~`, relational, additive, multiplicative, unary,
//! path expressions (`v P w`, `v P`, `P w`), postfix `.attr` / `[i]`.

use crate::error::{Error, Result};
use crate::graph::{Direction, HopEnd};
use crate::query::ast::*;
use crate::query::functions;
use crate::schema::{ElementKind, TypeExpression, TypeToken};

/// Words that never denote a variable.
const KEYWORDS: &[&str] = &[
    "and", "or", "xor", "not", "let", "in", "where", "using", "store", "as", "on", "from",
    "with", "report", "reportList", "reportSet", "reportMap", "end", "forall", "exists",
    "true", "false", "null", "import",
];

/// Upper bound on hops of a path description with its exponents unrolled
pub const MAX_UNROLLED_HOPS: u64 = 100_000;

/// Call forms the parser handles itself
const CALL_FORMS: &[&str] = &[
    "list", "set", "tup", "rec", "map", "pathSystem", "reachableVertices", "isReachable",
];

/// How sure the parser is that a path description starts at the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathStart {
    Certain,
    /// `--e->` / `<-e--` look like edge paths but may still be arithmetic
    Tentative,
}

/// GReQL Parser
pub struct GreqlParser {
    input: String,
    pos: usize,
}

impl GreqlParser {
    /// Create a new parser
    pub fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
            pos: 0,
        }
    }

    /// Parse a complete query
    pub fn parse(&mut self) -> Result<Query> {
        let mut imports = Vec::new();
        while self.try_keyword("import") {
            imports.push(self.parse_import()?);
        }

        let mut using = Vec::new();
        if self.try_keyword("using") {
            loop {
                using.push(self.parse_variable_name()?);
                if !self.try_char(',') {
                    break;
                }
            }
            self.expect_char(':')?;
        }

        let body = self.parse_expression()?;

        let store_as = if self.try_keyword("store") {
            self.expect_keyword("as")?;
            Some(self.parse_variable_name()?)
        } else {
            None
        };

        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error(format!(
                "Unexpected input '{}'",
                self.input[self.pos..].chars().take(16).collect::<String>()
            )));
        }

        Ok(Query {
            imports,
            using,
            body,
            store_as,
        })
    }

    /// Parse a standalone path description (used by tools and tests)
    pub fn parse_path_description(&mut self) -> Result<PathDescription> {
        let path = self.parse_path()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error("Unexpected input after path description"));
        }
        Ok(path)
    }

    fn parse_import(&mut self) -> Result<Import> {
        let mut parts = vec![self.parse_identifier()?];
        let mut wildcard = false;
        while self.try_char('.') {
            if self.try_char('*') {
                wildcard = true;
                break;
            }
            parts.push(self.parse_identifier()?);
        }
        self.expect_char(';')?;
        let name = parts.join(".");
        if wildcard {
            Ok(Import::Package(name))
        } else if parts.len() < 2 {
            Err(self.error("Import of a single type needs a qualified name"))
        } else {
            Ok(Import::Type(name))
        }
    }

    // ========================================================================
    // Expression Parsing
    // ========================================================================

    fn parse_expression(&mut self) -> Result<Expression> {
        let mut expr = self.parse_conditional()?;
        while self.try_keyword("where") {
            let bindings = self.parse_bindings()?;
            expr = Expression::Let {
                bindings,
                body: Box::new(expr),
                form: BindingForm::Where,
            };
        }
        Ok(expr)
    }

    /// `x := e, y := e`
    fn parse_bindings(&mut self) -> Result<Vec<(String, Expression)>> {
        let mut bindings = Vec::new();
        loop {
            let name = self.parse_variable_name()?;
            if !self.try_str(":=") {
                return Err(self.error("Expected ':='"));
            }
            let value = self.parse_conditional()?;
            bindings.push((name, value));
            if !self.try_char(',') {
                break;
            }
        }
        Ok(bindings)
    }

    fn parse_conditional(&mut self) -> Result<Expression> {
        let condition = self.parse_or()?;
        if self.try_char('?') {
            let then_branch = self.parse_conditional()?;
            self.expect_char(':')?;
            let else_branch = self.parse_conditional()?;
            return Ok(Expression::Conditional {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }
        Ok(condition)
    }

    fn parse_or(&mut self) -> Result<Expression> {
        let mut left = self.parse_xor()?;
        while self.try_keyword("or") {
            let right = self.parse_xor()?;
            left = binary(BinaryOperator::Or, left, right);
        }
        Ok(left)
    }

    fn parse_xor(&mut self) -> Result<Expression> {
        let mut left = self.parse_and()?;
        while self.try_keyword("xor") {
            let right = self.parse_and()?;
            left = binary(BinaryOperator::Xor, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression> {
        let mut left = self.parse_equality()?;
        while self.try_keyword("and") {
            let right = self.parse_equality()?;
            left = binary(BinaryOperator::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression> {
        let mut left = self.parse_relational()?;
        loop {
            self.skip_whitespace();
            let op = if self.peek_str("=~") {
                self.pos += 2;
                BinaryOperator::Match
            } else if self.peek_str("<>") && !self.peek_str("<>--") {
                self.pos += 2;
                BinaryOperator::Ne
            } else if self.peek_str("=") {
                self.pos += 1;
                BinaryOperator::Eq
            } else {
                break;
            };
            let right = self.parse_relational()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expression> {
        let mut left = self.parse_additive()?;
        loop {
            self.skip_whitespace();
            let op = if self.peek_str("<=") {
                self.pos += 2;
                BinaryOperator::Le
            } else if self.peek_str(">=") {
                self.pos += 2;
                BinaryOperator::Ge
            } else if self.peek_str("<")
                && !self.peek_str("<>")
                && !self.peek_str("<-")
            {
                self.pos += 1;
                BinaryOperator::Lt
            } else if self.peek_str(">") {
                self.pos += 1;
                BinaryOperator::Gt
            } else {
                break;
            };
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression> {
        let mut left = self.parse_multiplicative()?;
        loop {
            self.skip_whitespace();
            let op = if self.peek_str("+") {
                BinaryOperator::Add
            } else if self.peek_str("-") && !self.peek_str("--") && !self.peek_str("->") {
                BinaryOperator::Sub
            } else {
                break;
            };
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek_char() {
                Some('*') => BinaryOperator::Mul,
                Some('/') => BinaryOperator::Div,
                Some('%') => BinaryOperator::Mod,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        if self.try_keyword("not") {
            let operand = self.parse_unary()?;
            return Ok(Expression::Unary {
                op: UnaryOperator::Not,
                operand: Box::new(operand),
            });
        }

        // Backward vertex set: `P w`
        if self.path_start().is_some() {
            let path = self.parse_path()?;
            let target = self.parse_postfix()?;
            return Ok(Expression::BackwardVertexSet {
                path,
                target: Box::new(target),
            });
        }

        self.skip_whitespace();
        if self.peek_str("-") && !self.peek_str("--") && !self.peek_str("->") {
            self.pos += 1;
            let operand = self.parse_unary()?;
            return Ok(Expression::Unary {
                op: UnaryOperator::Neg,
                operand: Box::new(operand),
            });
        }

        self.parse_path_expression()
    }

    /// `v P w`, `v P` or a plain operand
    fn parse_path_expression(&mut self) -> Result<Expression> {
        let operand = self.parse_postfix()?;
        let start = match self.path_start() {
            Some(start) => start,
            None => return Ok(operand),
        };

        let save = self.pos;
        let path = match self.parse_path() {
            Ok(path) => path,
            Err(_) if start == PathStart::Tentative => {
                self.pos = save;
                return Ok(operand);
            }
            Err(e) => return Err(e),
        };

        if self.is_target_start() {
            let target = self.parse_postfix()?;
            Ok(Expression::PathExistence {
                start: Box::new(operand),
                path,
                target: Box::new(target),
            })
        } else {
            Ok(Expression::ForwardVertexSet {
                start: Box::new(operand),
                path,
            })
        }
    }

    fn parse_postfix(&mut self) -> Result<Expression> {
        let mut expr = self.parse_primary()?;
        loop {
            self.skip_whitespace();
            if self.peek_str(".") && !self.peek_str("..") {
                self.pos += 1;
                let attribute = self.parse_identifier()?;
                expr = Expression::AttributeAccess {
                    target: Box::new(expr),
                    attribute,
                };
            } else if self.peek_str("[") && self.path_start().is_none() {
                self.pos += 1;
                let index = self.parse_expression()?;
                self.expect_char(']')?;
                expr = Expression::IndexAccess {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        self.skip_whitespace();
        let c = self
            .peek_char()
            .ok_or_else(|| self.error("Unexpected end of query"))?;

        if c.is_ascii_digit() {
            return self.parse_number_literal();
        }
        if c == '"' || c == '\'' {
            return Ok(Expression::Literal(Literal::Str(self.parse_string()?)));
        }
        if c == '(' {
            self.pos += 1;
            let expr = self.parse_expression()?;
            self.expect_char(')')?;
            return Ok(expr);
        }
        if !(c.is_alphabetic() || c == '_') {
            return Err(self.error(format!("Unexpected character '{}'", c)));
        }

        let word_start = self.pos;
        let word = self.parse_identifier()?;
        match word.as_str() {
            "true" => return Ok(Expression::Literal(Literal::Bool(true))),
            "false" => return Ok(Expression::Literal(Literal::Bool(false))),
            "null" => return Ok(Expression::Literal(Literal::Null)),
            "let" => return self.parse_let(),
            "forall" => return self.parse_quantified(Quantifier::Forall),
            "exists" => {
                let quantifier = if self.peek_str("!") {
                    self.pos += 1;
                    Quantifier::ExistsOne
                } else {
                    Quantifier::Exists
                };
                return self.parse_quantified(quantifier);
            }
            "from" => return self.parse_comprehension(),
            "on" => return self.parse_on(),
            "V" => return Ok(Expression::VertexSet(self.parse_optional_types()?)),
            "E" => return Ok(Expression::EdgeSet(self.parse_optional_types()?)),
            "vertexTypeSubgraph" | "edgeTypeSubgraph" if self.peek_after_whitespace('{') => {
                let kind = if word == "edgeTypeSubgraph" {
                    ElementKind::Edge
                } else {
                    ElementKind::Vertex
                };
                let types = self.parse_type_restriction()?;
                return Ok(Expression::SubgraphByType { kind, types });
            }
            w if KEYWORDS.contains(&w) => {
                self.pos = word_start;
                return Err(self.error(format!("Unexpected keyword '{}'", w)));
            }
            _ => {}
        }

        if !self.peek_after_whitespace('(') || !self.is_call_target(&word) {
            return Ok(Expression::Variable(word));
        }
        self.expect_char('(')?;

        match word.as_str() {
            "list" => self.parse_list_construction(),
            "set" => Ok(Expression::Set(self.parse_arguments()?)),
            "tup" => Ok(Expression::Tuple(self.parse_arguments()?)),
            "rec" => self.parse_record_construction(),
            "map" => self.parse_map_construction(),
            "pathSystem" => {
                let start = self.parse_expression()?;
                self.expect_char(',')?;
                let path = self.parse_path()?;
                self.expect_char(')')?;
                Ok(Expression::PathSystem {
                    start: Box::new(start),
                    path,
                })
            }
            "reachableVertices" => {
                let start = self.parse_expression()?;
                self.expect_char(',')?;
                let path = self.parse_path()?;
                self.expect_char(')')?;
                Ok(Expression::ForwardVertexSet {
                    start: Box::new(start),
                    path,
                })
            }
            "isReachable" => {
                let start = self.parse_expression()?;
                self.expect_char(',')?;
                let target = self.parse_expression()?;
                self.expect_char(',')?;
                let path = self.parse_path()?;
                self.expect_char(')')?;
                Ok(Expression::PathExistence {
                    start: Box::new(start),
                    path,
                    target: Box::new(target),
                })
            }
            _ => Ok(Expression::FunctionCall {
                name: word,
                args: self.parse_arguments()?,
            }),
        }
    }

    /// Whether `word (` opens an argument list rather than a grouped path
    /// following the variable `word`, as in `w (-->)* v`.
    fn is_call_target(&mut self, word: &str) -> bool {
        if CALL_FORMS.contains(&word) || functions::lookup(word).is_some() {
            return true;
        }
        self.path_start().is_none()
    }

    /// Comma-separated expressions up to the closing parenthesis
    fn parse_arguments(&mut self) -> Result<Vec<Expression>> {
        let mut args = Vec::new();
        if self.try_char(')') {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if !self.try_char(',') {
                break;
            }
        }
        self.expect_char(')')?;
        Ok(args)
    }

    fn parse_list_construction(&mut self) -> Result<Expression> {
        if self.try_char(')') {
            return Ok(Expression::List(Vec::new()));
        }
        let first = self.parse_expression()?;
        if self.try_str("..") {
            let end = self.parse_expression()?;
            self.expect_char(')')?;
            return Ok(Expression::ListRange {
                start: Box::new(first),
                end: Box::new(end),
            });
        }
        let mut items = vec![first];
        while self.try_char(',') {
            items.push(self.parse_expression()?);
        }
        self.expect_char(')')?;
        Ok(Expression::List(items))
    }

    fn parse_record_construction(&mut self) -> Result<Expression> {
        let mut fields = Vec::new();
        if self.try_char(')') {
            return Ok(Expression::Record(fields));
        }
        loop {
            let name = self.parse_identifier()?;
            self.expect_char(':')?;
            let value = self.parse_expression()?;
            fields.push((name, value));
            if !self.try_char(',') {
                break;
            }
        }
        self.expect_char(')')?;
        Ok(Expression::Record(fields))
    }

    fn parse_map_construction(&mut self) -> Result<Expression> {
        let mut entries = Vec::new();
        if self.try_char(')') {
            return Ok(Expression::Map(entries));
        }
        loop {
            let key = self.parse_conditional()?;
            if !self.try_str("->") {
                return Err(self.error("Expected '->' in map construction"));
            }
            let value = self.parse_conditional()?;
            entries.push((key, value));
            if !self.try_char(',') {
                break;
            }
        }
        self.expect_char(')')?;
        Ok(Expression::Map(entries))
    }

    /// `let x := e, ... in body` (keyword already consumed)
    fn parse_let(&mut self) -> Result<Expression> {
        let bindings = self.parse_bindings()?;
        self.expect_keyword("in")?;
        let body = self.parse_expression()?;
        Ok(Expression::Let {
            bindings,
            body: Box::new(body),
            form: BindingForm::Let,
        })
    }

    /// `x, y : S, z : T`
    fn parse_declarations(&mut self) -> Result<Vec<Declaration>> {
        let mut declarations = Vec::new();
        loop {
            let mut variables = vec![self.parse_variable_name()?];
            while self.try_char(',') {
                variables.push(self.parse_variable_name()?);
            }
            self.expect_char(':')?;
            let domain = self.parse_or()?;
            declarations.push(Declaration { variables, domain });
            if !self.try_char(',') {
                break;
            }
        }
        Ok(declarations)
    }

    fn parse_quantified(&mut self, quantifier: Quantifier) -> Result<Expression> {
        let declarations = self.parse_declarations()?;
        self.expect_char('@')?;
        let predicate = self.parse_expression()?;
        Ok(Expression::Quantified {
            quantifier,
            declarations,
            predicate: Box::new(predicate),
        })
    }

    /// `from decls [with pred] report ... end`
    fn parse_comprehension(&mut self) -> Result<Expression> {
        let declarations = self.parse_declarations()?;
        let constraint = if self.try_keyword("with") {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        let report = if self.try_keyword("reportMap") {
            let key = self.parse_conditional()?;
            if !self.try_str("->") {
                return Err(self.error("Expected '->' in reportMap"));
            }
            let value = self.parse_conditional()?;
            Report::Map(Box::new(key), Box::new(value))
        } else if self.try_keyword("reportSet") {
            Report::Set(self.parse_report_items()?)
        } else if self.try_keyword("reportList") || self.try_keyword("report") {
            Report::List(self.parse_report_items()?)
        } else {
            return Err(self.error("Expected report clause"));
        };

        self.expect_keyword("end")?;
        Ok(Expression::Comprehension {
            declarations,
            constraint,
            report,
        })
    }

    fn parse_report_items(&mut self) -> Result<Vec<Expression>> {
        let mut items = vec![self.parse_conditional()?];
        while self.try_char(',') {
            items.push(self.parse_conditional()?);
        }
        Ok(items)
    }

    /// `on subgraph: body`
    fn parse_on(&mut self) -> Result<Expression> {
        let subgraph = self.parse_or()?;
        self.expect_char(':')?;
        let body = self.parse_expression()?;
        Ok(Expression::On {
            subgraph: Box::new(subgraph),
            body: Box::new(body),
        })
    }

    fn parse_number_literal(&mut self) -> Result<Expression> {
        let start = self.pos;
        let text = self.parse_number()?;
        if text.contains(['.', 'e', 'E']) {
            text.parse::<f64>()
                .map(|d| Expression::Literal(Literal::Double(d)))
                .map_err(|_| Error::parse(format!("Invalid number '{}'", text), start))
        } else {
            text.parse::<i64>()
                .map(|i| Expression::Literal(Literal::Int(i)))
                .map_err(|_| Error::parse(format!("Integer out of range '{}'", text), start))
        }
    }

    // ========================================================================
    // Path Description Parsing
    // ========================================================================

    /// alternative := sequence ('|' sequence)*
    fn parse_path(&mut self) -> Result<PathDescription> {
        self.skip_whitespace();
        let start = self.pos;
        let first = self.parse_path_sequence()?;
        let mut items = vec![first];
        while self.try_char('|') {
            items.push(self.parse_path_sequence()?);
        }
        let path = if items.len() == 1 {
            items.remove(0)
        } else {
            PathDescription::alternative(items)
        };
        if path.unrolled_size() > MAX_UNROLLED_HOPS {
            return Err(Error::parse(
                format!(
                    "Path description exceeds {} hops once exponents are unrolled",
                    MAX_UNROLLED_HOPS
                ),
                start,
            ));
        }
        Ok(path)
    }

    /// sequence := iterated+
    fn parse_path_sequence(&mut self) -> Result<PathDescription> {
        let mut items = vec![self.parse_path_iterated()?];
        while self.path_start().is_some() {
            items.push(self.parse_path_iterated()?);
        }
        if items.len() == 1 {
            Ok(items.remove(0))
        } else {
            Ok(PathDescription::sequence(items))
        }
    }

    /// iterated := ['&{' types '}'] primary ('*' | '+' | '^' INT | '^T' | '&{' types '}')*
    fn parse_path_iterated(&mut self) -> Result<PathDescription> {
        self.skip_whitespace();
        let start_restriction = if self.peek_str("&{") {
            self.pos += 1;
            Some(self.parse_type_restriction()?)
        } else {
            None
        };

        let mut path = self.parse_path_primary()?;
        loop {
            self.skip_whitespace();
            if self.peek_str("*") {
                self.pos += 1;
                path = path.star();
            } else if self.peek_str("+") {
                self.pos += 1;
                path = path.plus();
            } else if self.peek_str("^") {
                self.pos += 1;
                if self.try_keyword("T") {
                    path = path.transposed();
                } else {
                    self.skip_whitespace();
                    let start = self.pos;
                    while self.peek_char_is_digit() {
                        self.pos += 1;
                    }
                    if start == self.pos {
                        return Err(self.error("Expected exponent or 'T' after '^'"));
                    }
                    let n: u32 = self.input[start..self.pos]
                        .parse()
                        .map_err(|_| Error::parse("Exponent out of range", start))?;
                    path = path.exponent(n);
                }
            } else if self.peek_str("&{") {
                self.pos += 1;
                let types = self.parse_type_restriction()?;
                if path.goal_restriction.is_some() {
                    path = path.group();
                }
                path = path.with_goal_restriction(types);
            } else {
                break;
            }
        }

        if let Some(types) = start_restriction {
            if path.start_restriction.is_some() {
                path = path.group();
            }
            path = path.with_start_restriction(types);
        }
        Ok(path)
    }

    fn parse_path_primary(&mut self) -> Result<PathDescription> {
        self.skip_whitespace();
        let simple = if self.peek_str("<>--") {
            Some((4, Direction::Any, Some(HopEnd::This)))
        } else if self.peek_str("--<>") {
            Some((4, Direction::Any, Some(HopEnd::That)))
        } else if self.peek_str("-->") {
            Some((3, Direction::Out, None))
        } else if self.peek_str("<->") {
            Some((3, Direction::Any, None))
        } else if self.peek_str("<--") {
            Some((3, Direction::In, None))
        } else {
            None
        };
        if let Some((len, direction, aggregation)) = simple {
            self.pos += len;
            let restriction = self.parse_optional_types()?;
            return Ok(PathDescription::new(PathKind::Simple {
                direction,
                aggregation,
                restriction,
            }));
        }

        if self.peek_str("--") {
            self.pos += 2;
            let edge = self.parse_postfix()?;
            if !self.try_str("->") {
                return Err(self.error("Expected '->' closing edge path"));
            }
            return Ok(PathDescription::new(PathKind::Edge {
                direction: Direction::Out,
                edge: Box::new(edge),
            }));
        }
        if self.peek_str("<-") {
            self.pos += 2;
            let edge = self.parse_postfix()?;
            let direction = if self.try_str("->") {
                Direction::Any
            } else if self.try_str("--") {
                Direction::In
            } else {
                return Err(self.error("Expected '->' or '--' closing edge path"));
            };
            return Ok(PathDescription::new(PathKind::Edge {
                direction,
                edge: Box::new(edge),
            }));
        }

        if self.try_char('(') {
            let inner = self.parse_path()?;
            self.expect_char(')')?;
            return Ok(inner.group());
        }
        if self.try_char('[') {
            let inner = self.parse_path()?;
            self.expect_char(']')?;
            return Ok(inner.optional());
        }
        Err(self.error("Expected path description"))
    }

    /// Looks past opening brackets for the first path token.
    fn path_start(&mut self) -> Option<PathStart> {
        self.skip_whitespace();
        let rest = &self.input[self.pos..];
        let trimmed = rest.trim_start_matches(|c: char| c == '(' || c == '[' || c.is_whitespace());
        if trimmed.starts_with("&{")
            || trimmed.starts_with("-->")
            || trimmed.starts_with("<--")
            || trimmed.starts_with("<->")
            || trimmed.starts_with("<>--")
            || trimmed.starts_with("--<>")
        {
            return Some(PathStart::Certain);
        }
        let edge_open = trimmed
            .strip_prefix("--")
            .or_else(|| trimmed.strip_prefix("<-"));
        if let Some(after) = edge_open {
            let next = after.trim_start().chars().next();
            if matches!(next, Some(c) if c.is_alphabetic() || c == '_' || c == '(') {
                return Some(PathStart::Tentative);
            }
        }
        None
    }

    /// Whether an operand follows a path description (making it `v P w`).
    fn is_target_start(&mut self) -> bool {
        self.skip_whitespace();
        match self.peek_char() {
            Some(c) if c.is_ascii_digit() || c == '"' || c == '\'' || c == '(' => true,
            Some(c) if c.is_alphabetic() || c == '_' => match self.peek_word() {
                Some(word) => !KEYWORDS.contains(&word.as_str()),
                None => false,
            },
            _ => false,
        }
    }

    // ========================================================================
    // Type Restrictions
    // ========================================================================

    fn parse_optional_types(&mut self) -> Result<Option<TypeExpression>> {
        if self.peek_after_whitespace('{') {
            Ok(Some(self.parse_type_restriction()?))
        } else {
            Ok(None)
        }
    }

    /// `{[^]Name[!], ...}`
    fn parse_type_restriction(&mut self) -> Result<TypeExpression> {
        self.expect_char('{')?;
        let mut tokens = Vec::new();
        loop {
            let negated = self.try_char('^');
            let mut name = self.parse_identifier()?;
            while self.peek_str(".") {
                self.pos += 1;
                name.push('.');
                name.push_str(&self.parse_identifier()?);
            }
            let mut token = TypeToken::new(name);
            if negated {
                token = token.negated();
            }
            if self.peek_str("!") {
                self.pos += 1;
                token = token.exact();
            }
            tokens.push(token);
            if !self.try_char(',') {
                break;
            }
        }
        self.expect_char('}')?;
        Ok(TypeExpression::new(tokens))
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(message, self.pos)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else if self.peek_str("//") {
                // Single-line comment
                while let Some(c) = self.peek_char() {
                    if c == '\n' {
                        break;
                    }
                    self.pos += c.len_utf8();
                }
            } else if self.peek_str("/*") {
                // Multi-line comment
                self.pos += 2;
                while self.pos < self.input.len() && !self.peek_str("*/") {
                    self.pos += self.peek_char().map_or(1, |c| c.len_utf8());
                }
                if self.peek_str("*/") {
                    self.pos += 2;
                }
            } else {
                break;
            }
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_is_digit(&self) -> bool {
        self.peek_char()
            .map(|c| c.is_ascii_digit())
            .unwrap_or(false)
    }

    /// Peek ahead to check if the input starts with a specific string
    fn peek_str(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn peek_after_whitespace(&mut self, c: char) -> bool {
        self.skip_whitespace();
        self.peek_char() == Some(c)
    }

    fn peek_word(&self) -> Option<String> {
        let word: String = self.input[self.pos..]
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if word.is_empty() {
            None
        } else {
            Some(word)
        }
    }

    fn try_char(&mut self, c: char) -> bool {
        self.skip_whitespace();
        if self.peek_char() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, c: char) -> Result<()> {
        self.skip_whitespace();
        if self.peek_char() == Some(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(self.error(format!("Expected '{}', got {:?}", c, self.peek_char())))
        }
    }

    fn try_str(&mut self, s: &str) -> bool {
        self.skip_whitespace();
        if self.peek_str(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn try_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        match self.peek_word() {
            Some(word) if word == keyword => {
                self.pos += keyword.len();
                true
            }
            _ => false,
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.try_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(format!("Expected keyword '{}'", keyword)))
        }
    }

    fn parse_identifier(&mut self) -> Result<String> {
        self.skip_whitespace();
        match self.peek_char() {
            Some(c) if c.is_alphabetic() || c == '_' => {}
            _ => return Err(self.error("Expected identifier")),
        }
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        Ok(self.input[start..self.pos].to_string())
    }

    /// Identifier that is not a reserved word
    fn parse_variable_name(&mut self) -> Result<String> {
        let start = self.pos;
        let name = self.parse_identifier()?;
        if KEYWORDS.contains(&name.as_str()) {
            self.pos = start;
            return Err(self.error(format!("'{}' is a reserved word", name)));
        }
        Ok(name)
    }

    fn parse_string(&mut self) -> Result<String> {
        let quote = self
            .peek_char()
            .ok_or_else(|| self.error("Expected string"))?;
        if quote != '"' && quote != '\'' {
            return Err(self.error("Expected string quote"));
        }
        let start = self.pos;
        self.pos += 1;

        let mut result = String::new();
        while let Some(c) = self.peek_char() {
            if c == quote {
                self.pos += 1;
                return Ok(result);
            } else if c == '\\' {
                self.pos += 1;
                if let Some(escaped) = self.peek_char() {
                    self.pos += escaped.len_utf8();
                    match escaped {
                        'n' => result.push('\n'),
                        't' => result.push('\t'),
                        'r' => result.push('\r'),
                        _ => result.push(escaped),
                    }
                }
            } else {
                self.pos += c.len_utf8();
                result.push(c);
            }
        }

        Err(Error::parse("Unclosed string", start))
    }

    /// Digits, an optional fraction and an optional exponent; `1..3` stays a range.
    fn parse_number(&mut self) -> Result<String> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek_char_is_digit() {
            self.pos += 1;
        }
        let bytes = self.input.as_bytes();
        if self.peek_str(".") && bytes.get(self.pos + 1).map_or(false, |b| b.is_ascii_digit()) {
            self.pos += 1;
            while self.peek_char_is_digit() {
                self.pos += 1;
            }
        }
        if self.peek_str("e") || self.peek_str("E") {
            let mut look = self.pos + 1;
            if matches!(bytes.get(look), Some(b'+') | Some(b'-')) {
                look += 1;
            }
            if bytes.get(look).map_or(false, |b| b.is_ascii_digit()) {
                self.pos = look;
                while self.peek_char_is_digit() {
                    self.pos += 1;
                }
            }
        }

        if self.pos == start {
            Err(self.error("Expected number"))
        } else {
            Ok(self.input[start..self.pos].to_string())
        }
    }
}

fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Parse a GReQL query
pub fn parse(input: &str) -> Result<Query> {
    let mut parser = GreqlParser::new(input);
    parser.parse()
}

/// Parse a standalone path description such as `(-->{Street} | <--)*`
pub fn parse_path(input: &str) -> Result<PathDescription> {
    let mut parser = GreqlParser::new(input);
    parser.parse_path_description()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(query: &str) -> Expression {
        parse(query).unwrap().body
    }

    #[test]
    fn test_parse_path_existence() {
        match body("getVertex(19) --> getVertex(2)") {
            Expression::PathExistence { start, path, target } => {
                assert_eq!(*start, Expression::call("getVertex", vec![Expression::int(19)]));
                assert_eq!(path, PathDescription::simple(Direction::Out));
                assert_eq!(*target, Expression::call("getVertex", vec![Expression::int(2)]));
            }
            other => panic!("Expected path existence, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_exponent_and_alternative() {
        match body("getVertex(144) -->^4 | -->^2 getVertex(16)") {
            Expression::PathExistence { path, .. } => {
                assert_eq!(
                    path,
                    PathDescription::alternative(vec![
                        PathDescription::simple(Direction::Out).exponent(4),
                        PathDescription::simple(Direction::Out).exponent(2),
                    ])
                );
            }
            other => panic!("Expected path existence, got {:?}", other),
        }
        // ^0 is legal syntax; it fails at evaluation time
        assert!(parse("getVertex(21) -->^0 getVertex(21)").is_ok());
    }

    #[test]
    fn test_parse_forward_and_backward_sets() {
        assert!(matches!(body("v -->{Street}*"), Expression::ForwardVertexSet { .. }));
        assert!(matches!(body("<--+ v"), Expression::BackwardVertexSet { .. }));
        assert!(matches!(
            body("reachableVertices(v, -->)"),
            Expression::ForwardVertexSet { .. }
        ));
    }

    #[test]
    fn test_parse_variable_before_grouped_path() {
        match body("w (-->)* v") {
            Expression::PathExistence { start, path, target } => {
                assert_eq!(*start, Expression::Variable("w".into()));
                assert_eq!(path, PathDescription::simple(Direction::Out).group().star());
                assert_eq!(*target, Expression::Variable("v".into()));
            }
            other => panic!("Expected path existence, got {:?}", other),
        }
        assert!(matches!(body("w ((<--))"), Expression::ForwardVertexSet { .. }));
        // known functions and non-path arguments still parse as calls
        assert!(matches!(body("count (v -->)"), Expression::FunctionCall { .. }));
        assert!(matches!(body("noSuchFunction(1)"), Expression::FunctionCall { .. }));
    }

    #[test]
    fn test_parse_rejects_huge_unrolled_paths() {
        assert!(parse("v -->^100000 w").is_ok());
        for text in [
            "v -->^50000000 w",
            "v (-->^1000)^1000 w",
            "v (-->^60000 <--^60000) w",
            "pathSystem(v, <->^4294967295)",
        ] {
            match parse(text) {
                Err(Error::ParseError { message, .. }) => assert!(message.contains("hops"), "{}", message),
                other => panic!("Expected parse error for {}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_parse_type_restrictions() {
        let path = parse_path("&{Town} <->{^Highway, connections.Street!} &{^City}").unwrap();
        assert_eq!(path.start_restriction.unwrap().to_string(), "Town");
        assert_eq!(path.goal_restriction.unwrap().to_string(), "^City");
        match path.kind {
            PathKind::Simple { restriction: Some(types), .. } => {
                assert_eq!(types.tokens.len(), 2);
                assert!(types.tokens[0].negated);
                assert!(types.tokens[1].exact);
                assert_eq!(types.tokens[1].name, "connections.Street");
            }
            other => panic!("Expected simple path, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_edge_paths() {
        let path = parse_path("--e-> <-getEdge(3)-- <-e->").unwrap();
        match path.kind {
            PathKind::Sequence(items) => {
                assert_eq!(items.len(), 3);
                assert!(matches!(
                    items[1].kind,
                    PathKind::Edge { direction: Direction::In, .. }
                ));
                assert!(matches!(
                    items[2].kind,
                    PathKind::Edge { direction: Direction::Any, .. }
                ));
            }
            other => panic!("Expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_aggregation_and_transpose() {
        let path = parse_path("(<>-- [-->])^T").unwrap();
        match path.kind {
            PathKind::Transposed(inner) => match inner.kind {
                PathKind::Group(group) => match group.kind {
                    PathKind::Sequence(items) => {
                        assert!(matches!(
                            items[0].kind,
                            PathKind::Simple { aggregation: Some(HopEnd::This), .. }
                        ));
                        assert!(matches!(items[1].kind, PathKind::Optional(_)));
                    }
                    other => panic!("Expected sequence, got {:?}", other),
                },
                other => panic!("Expected group, got {:?}", other),
            },
            other => panic!("Expected transposed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_arithmetic_is_not_a_path() {
        assert_eq!(
            body("a - b"),
            binary(BinaryOperator::Sub, Expression::variable("a"), Expression::variable("b"))
        );
        assert!(matches!(body("a < -1"), Expression::Binary { op: BinaryOperator::Lt, .. }));
        assert!(matches!(body("a <> b"), Expression::Binary { op: BinaryOperator::Ne, .. }));
        assert!(matches!(body("x[1]"), Expression::IndexAccess { .. }));
    }

    #[test]
    fn test_parse_bindings_and_store() {
        let query = parse("using k: let x := 1, y := x + k in y * 2 store as result").unwrap();
        assert_eq!(query.using, vec!["k".to_string()]);
        assert_eq!(query.store_as.as_deref(), Some("result"));
        assert!(matches!(query.body, Expression::Let { form: BindingForm::Let, .. }));

        match body("x + y where x := 1, y := 2") {
            Expression::Let { bindings, form, .. } => {
                assert_eq!(form, BindingForm::Where);
                assert_eq!(bindings.len(), 2);
            }
            other => panic!("Expected where binding, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_imports() {
        let query = parse("import routemap.junctions.*; import routemap.localities.Town; V{Town}")
            .unwrap();
        assert_eq!(
            query.imports,
            vec![
                Import::Package("routemap.junctions".into()),
                Import::Type("routemap.localities.Town".into()),
            ]
        );
    }

    #[test]
    fn test_parse_comprehension_and_quantifiers() {
        match body("from x : V{Town}, e : E with x.name =~ \"A.*\" reportMap x -> count(x -->) end") {
            Expression::Comprehension { declarations, constraint, report } => {
                assert_eq!(declarations.len(), 2);
                assert!(constraint.is_some());
                assert!(matches!(report, Report::Map(..)));
            }
            other => panic!("Expected comprehension, got {:?}", other),
        }
        assert!(matches!(
            body("exists! v : V @ v --> v"),
            Expression::Quantified { quantifier: Quantifier::ExistsOne, .. }
        ));
        assert!(matches!(
            body("on vertexTypeSubgraph{Town}: count(V)"),
            Expression::On { .. }
        ));
    }

    #[test]
    fn test_parse_constructions() {
        assert!(matches!(body("list(1..5)"), Expression::ListRange { .. }));
        assert!(matches!(body("rec(a: 1, b: \"x\")"), Expression::Record(_)));
        assert!(matches!(body("map(1 -> 2)"), Expression::Map(_)));
        assert!(matches!(body("c ? 1 : 2"), Expression::Conditional { .. }));
        assert_eq!(body("2.5e1"), Expression::Literal(Literal::Double(25.0)));
    }

    #[test]
    fn test_parse_errors_carry_offsets() {
        match parse("getVertex(1) --> )") {
            Err(Error::ParseError { offset, .. }) => assert!(offset > 0),
            other => panic!("Expected parse error, got {:?}", other),
        }
        assert!(parse("let in 3").is_err());
        assert!(parse("(-->").is_err());
        assert!(parse("\"open").is_err());
    }

    #[test]
    fn test_display_reparses() {
        let texts = [
            "(getVertex(1) (-->{Street} | <--)* &{Town} getVertex(2))",
            "pathSystem(v, (<->^2)^T)",
            "from x : V report x.name end",
        ];
        for text in texts {
            let first = parse(text).unwrap();
            let again = parse(&first.body.to_string()).unwrap();
            assert_eq!(first.body.to_string(), again.body.to_string());
        }
    }
}
