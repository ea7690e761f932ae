//! Reader for the point and curve subset of the gmsh `.geo` language.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::GeometryModel;
use crate::error::{Result, StructeasyError};

/// Longest list a single `a:b:step` range may expand to
pub const MAX_RANGE_LEN: usize = 1_000_000;

/// Statements producing geometry this reader cannot evaluate
const GMSH_ONLY: [&str; 27] = [
    "Extrude",
    "Translate",
    "Rotate",
    "Symmetry",
    "Dilate",
    "Duplicata",
    "Affine",
    "BooleanUnion",
    "BooleanIntersection",
    "BooleanDifference",
    "BooleanFragments",
    "Box",
    "Sphere",
    "Cylinder",
    "Cone",
    "Torus",
    "Rectangle",
    "Disk",
    "Wedge",
    "For",
    "If",
    "Include",
    "Call",
    "Macro",
    "Function",
    "Merge",
    "ShapeFromFile",
];

/// Statements with no effect on points and curves
const IGNORED: [&str; 27] = [
    "Mesh",
    "Geometry",
    "General",
    "Curve",
    "Plane",
    "Surface",
    "Ruled",
    "Volume",
    "Transfinite",
    "Recombine",
    "Characteristic",
    "MeshSize",
    "MeshAlgorithm",
    "Field",
    "Background",
    "Coherence",
    "Compound",
    "Save",
    "Print",
    "Printf",
    "Delete",
    "Hide",
    "Show",
    "Color",
    "Reverse",
    "Periodic",
    "DefineConstant",
];

/// Result of reading a `.geo` source
#[derive(Debug, Clone, Default)]
pub struct GeoReport {
    pub model: GeometryModel,
    /// Keywords of the statements that were not evaluated
    pub skipped: Vec<String>,
    /// Whether skipped statements would have created points or curves
    pub requires_gmsh: bool,
}

/// Headers of control blocks; gmsh does not end them with `;`
const BLOCK_OPEN: [&str; 5] = ["For", "If", "ElseIf", "Macro", "Function"];

/// Control block keywords that stand alone without a `;`
const BLOCK_CLOSE: [&str; 4] = ["EndFor", "EndIf", "Else", "Return"];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Str(String),
    Punct(char),
}

/// Splits a `.geo` source into `;`-terminated statements of tokens
fn tokenize(source: &str) -> Result<Vec<Vec<(Token, usize)>>> {
    let chars: Vec<char> = source.chars().collect();
    let mut statements: Vec<Vec<(Token, usize)>> = Vec::new();
    let mut current: Vec<(Token, usize)> = Vec::new();
    let mut line: usize = 1;
    let mut i: usize = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\n' {
            line += 1;
            i += 1;
        } else if c.is_whitespace() {
            i += 1;
        } else if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            loop {
                if i + 1 >= chars.len() {
                    return Err(StructeasyError::Mesh(format!(
                        "Unterminated comment starting before line {line}"
                    )));
                }
                if chars[i] == '\n' {
                    line += 1;
                }
                if chars[i] == '*' && chars[i + 1] == '/' {
                    i += 2;
                    break;
                }
                i += 1;
            }
        } else if c == '"' {
            let start_line = line;
            let mut value = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    Some('"') => break,
                    Some('\\') if chars.get(i + 1) == Some(&'"') => {
                        value.push('"');
                        i += 2;
                    }
                    Some(ch) => {
                        if *ch == '\n' {
                            line += 1;
                        }
                        value.push(*ch);
                        i += 1;
                    }
                    None => {
                        return Err(StructeasyError::Mesh(format!(
                            "Unterminated string on line {start_line}"
                        )))
                    }
                }
            }
            i += 1;
            current.push((Token::Str(value), start_line));
        } else if c.is_ascii_digit()
            || (c == '.' && chars.get(i + 1).map_or(false, |n| n.is_ascii_digit()))
        {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let text: String = chars[start..i].iter().collect();
            let value: f64 = text.parse().map_err(|_| {
                StructeasyError::Mesh(format!("Invalid number '{text}' on line {line}"))
            })?;
            current.push((Token::Number(value), line));
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len()
                && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
            {
                i += 1;
            }
            let name: String = chars[start..i].iter().collect();
            let is_open = BLOCK_OPEN.contains(&name.as_str());
            let is_close = BLOCK_CLOSE.contains(&name.as_str());

            // a header merges with the first statement of its body
            if (is_open || is_close) && !current.is_empty() {
                statements.push(std::mem::take(&mut current));
            }
            if is_close {
                statements.push(vec![(Token::Ident(name), line)]);
            } else {
                current.push((Token::Ident(name), line));
            }
        } else if c == ';' {
            if !current.is_empty() {
                statements.push(std::mem::take(&mut current));
            }
            i += 1;
        } else {
            current.push((Token::Punct(c), line));
            i += 1;
        }
    }

    if !current.is_empty() {
        let line = current[0].1;
        return Err(StructeasyError::Mesh(format!(
            "Statement starting on line {line} is missing a ';'"
        )));
    }

    Ok(statements)
}

/// Cursor over the tokens of one statement
struct Parser<'a> {
    tokens: &'a [(Token, usize)],
    pos: usize,
    vars: &'a HashMap<String, f64>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [(Token, usize)], vars: &'a HashMap<String, f64>) -> Parser<'a> {
        Parser {
            tokens,
            pos: 0,
            vars,
        }
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |(_, l)| *l)
    }

    fn error(&self, message: &str) -> StructeasyError {
        StructeasyError::Mesh(format!("{message} on line {}", self.line()))
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn is_punct(&self, c: char) -> bool {
        self.peek() == Some(&Token::Punct(c))
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.is_punct(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, c: char) -> Result<()> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            Err(self.error(&format!("Expected '{c}'")))
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        loop {
            if self.eat_punct('+') {
                value += self.term()?;
            } else if self.eat_punct('-') {
                value -= self.term()?;
            } else {
                return Ok(value);
            }
        }
    }

    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;
        loop {
            if self.eat_punct('*') {
                value *= self.unary()?;
            } else if self.eat_punct('/') {
                value /= self.unary()?;
            } else if self.eat_punct('%') {
                value %= self.unary()?;
            } else {
                return Ok(value);
            }
        }
    }

    fn unary(&mut self) -> Result<f64> {
        if self.eat_punct('-') {
            Ok(-self.unary()?)
        } else if self.eat_punct('+') {
            self.unary()
        } else {
            self.power()
        }
    }

    fn power(&mut self) -> Result<f64> {
        let base = self.primary()?;
        if self.eat_punct('^') {
            let exponent = self.unary()?;
            Ok(base.powf(exponent))
        } else {
            Ok(base)
        }
    }

    fn primary(&mut self) -> Result<f64> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(*n),
            Some(Token::Punct('(')) => {
                let value = self.expr()?;
                self.expect_punct(')')?;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                if self.eat_punct('[') {
                    let args = self.arguments(']')?;
                    return call_function(name, &args).ok_or_else(|| {
                        self.error(&format!("Unknown function '{name}'"))
                    });
                }
                if name == "Pi" {
                    return Ok(std::f64::consts::PI);
                }
                self.vars
                    .get(name)
                    .copied()
                    .ok_or_else(|| self.error(&format!("Undefined variable '{name}'")))
            }
            Some(token) => Err(self.error(&format!("Unexpected {token:?}"))),
            None => Err(self.error("Unexpected end of statement")),
        }
    }

    fn arguments(&mut self, close: char) -> Result<Vec<f64>> {
        let mut args = Vec::new();
        if self.eat_punct(close) {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            if self.eat_punct(close) {
                return Ok(args);
            }
            self.expect_punct(',')?;
        }
    }

    /// `{ a, b:c, d:e:step }`
    fn list(&mut self) -> Result<Vec<f64>> {
        self.expect_punct('{')?;
        let mut values = Vec::new();
        if self.eat_punct('}') {
            return Ok(values);
        }
        loop {
            let first = self.expr()?;
            if self.eat_punct(':') {
                let last = self.expr()?;
                let step = if self.eat_punct(':') {
                    self.expr()?
                } else if last >= first {
                    1.0
                } else {
                    -1.0
                };
                if step == 0.0 || (last - first) * step < 0.0 {
                    return Err(self.error("Invalid range"));
                }
                let span = ((last - first) / step + 1e-9).floor();
                if !span.is_finite() || values.len() as f64 + span >= MAX_RANGE_LEN as f64 {
                    return Err(self.error(&format!(
                        "Range {first}:{last}:{step} expands past {MAX_RANGE_LEN} values"
                    )));
                }
                let count = span as usize;
                values.extend((0..=count).map(|k| first + k as f64 * step));
            } else {
                values.push(first);
            }

            if self.eat_punct('}') {
                return Ok(values);
            }
            self.expect_punct(',')?;
        }
    }

    /// Parses `( expr ) = { list }`
    fn tagged_list(&mut self) -> Result<(i32, Vec<f64>)> {
        self.expect_punct('(')?;
        let tag = to_tag(self.expr()?).map_err(|m| self.error(&m))?;
        self.expect_punct(')')?;
        self.expect_punct('=')?;
        let values = self.list()?;
        if !self.at_end() {
            return Err(self.error("Unexpected trailing tokens"));
        }
        Ok((tag, values))
    }
}

fn call_function(name: &str, args: &[f64]) -> Option<f64> {
    let value = match (name, args) {
        ("Sqrt", [x]) => x.sqrt(),
        ("Sin", [x]) => x.sin(),
        ("Cos", [x]) => x.cos(),
        ("Tan", [x]) => x.tan(),
        ("Asin", [x]) => x.asin(),
        ("Acos", [x]) => x.acos(),
        ("Atan", [x]) => x.atan(),
        ("Atan2", [y, x]) => y.atan2(*x),
        ("Exp", [x]) => x.exp(),
        ("Log", [x]) => x.ln(),
        ("Log10", [x]) => x.log10(),
        ("Fabs" | "Abs", [x]) => x.abs(),
        ("Floor", [x]) => x.floor(),
        ("Ceil", [x]) => x.ceil(),
        ("Hypot", [x, y]) => x.hypot(*y),
        _ => return None,
    };
    Some(value)
}

fn to_tag(value: f64) -> std::result::Result<i32, String> {
    if value.fract() != 0.0 || value.abs() > i32::MAX as f64 {
        return Err(format!("Expected an integer tag, got {value}"));
    }
    Ok(value as i32)
}

fn to_tags(values: &[f64]) -> std::result::Result<Vec<i32>, String> {
    values.iter().map(|v| to_tag(*v)).collect()
}

fn physical_dimension(kind: &str) -> Option<i32> {
    match kind {
        "Point" => Some(0),
        "Line" | "Curve" => Some(1),
        "Surface" => Some(2),
        "Volume" => Some(3),
        _ => None,
    }
}

/// Evaluates `.geo` statements into a [`GeometryModel`]
struct GeoReader {
    vars: HashMap<String, f64>,
    model: GeometryModel,
    skipped: Vec<String>,
    requires_gmsh: bool,
    open_cascade: bool,
    /// Nesting of the `For` / `If` / `Macro` blocks being skipped
    block_depth: usize,
}

impl GeoReader {
    fn statement(&mut self, tokens: &[(Token, usize)]) -> Result<()> {
        let keyword = match &tokens[0].0 {
            Token::Ident(name) => name.clone(),
            // leftovers of braced bodies, e.g. the tail of an `Extrude { ... }`
            _ => {
                debug!("ignoring statement on line {}", tokens[0].1);
                return Ok(());
            }
        };
        if BLOCK_CLOSE.contains(&keyword.as_str()) {
            if keyword != "Else" {
                self.block_depth = self.block_depth.saturating_sub(1);
            }
            return Ok(());
        }
        if keyword == "ElseIf" {
            return Ok(());
        }
        if BLOCK_OPEN.contains(&keyword.as_str()) {
            // loop variables and conditions are left to gmsh
            self.block_depth += 1;
            self.skip(&keyword);
            return Ok(());
        }
        if self.block_depth > 0 {
            debug!("ignoring '{keyword}' inside a control block");
            return Ok(());
        }

        let second = tokens.get(1).map(|(t, _)| t);

        match (keyword.as_str(), second) {
            ("Point", Some(Token::Punct('('))) => self.point(&tokens[1..]),
            ("Line", Some(Token::Punct('('))) => self.curve("Line", &tokens[1..]),
            ("Line", Some(Token::Ident(_))) => {
                debug!("ignoring 'Line Loop' statement");
                Ok(())
            }
            (
                "Circle" | "Ellipse" | "Spline" | "BSpline" | "Bezier",
                Some(Token::Punct('(')),
            ) => self.curve(&keyword, &tokens[1..]),
            ("Physical", Some(Token::Ident(kind))) => {
                match physical_dimension(kind) {
                    Some(dim) => self.physical(dim, &tokens[2..]),
                    None => {
                        self.skip(&keyword);
                        Ok(())
                    }
                }
            }
            ("SetFactory", _) => {
                self.open_cascade = tokens
                    .iter()
                    .any(|(t, _)| *t == Token::Str("OpenCASCADE".to_owned()));
                Ok(())
            }
            (_, Some(Token::Punct('='))) => {
                self.assignment(&keyword, &tokens[2..]);
                Ok(())
            }
            _ => {
                self.skip(&keyword);
                Ok(())
            }
        }
    }

    fn skip(&mut self, keyword: &str) {
        if GMSH_ONLY.contains(&keyword) {
            self.requires_gmsh = true;
        }
        if IGNORED.contains(&keyword) {
            debug!("ignoring '{keyword}' statement");
        } else {
            self.skipped.push(keyword.to_owned());
        }
    }

    fn point(&mut self, tokens: &[(Token, usize)]) -> Result<()> {
        let mut parser = Parser::new(tokens, &self.vars);
        let (tag, values) = parser.tagged_list()?;
        if values.len() < 3 {
            return Err(parser.error(&format!("Point {tag} needs three coordinates")));
        }
        self.model.add_point(tag, [values[0], values[1], values[2]])
    }

    fn curve(&mut self, keyword: &str, tokens: &[(Token, usize)]) -> Result<()> {
        let mut parser = Parser::new(tokens, &self.vars);
        let (tag, values) = parser.tagged_list()?;

        // OpenCASCADE circles and ellipses take center and radii, not points
        if self.open_cascade
            && matches!(keyword, "Circle" | "Ellipse")
            && values
                .iter()
                .any(|v| to_tag(*v).map_or(true, |p| !self.model.has_point(p)))
        {
            self.requires_gmsh = true;
            self.skipped.push(keyword.to_owned());
            return Ok(());
        }

        let points = to_tags(&values).map_err(|m| parser.error(&m))?;

        if points.len() < 2 {
            return Err(parser.error(&format!("{keyword} {tag} needs at least two points")));
        }

        let start = points[0];
        let end = points[points.len() - 1];
        self.model.add_curve(tag, vec![start, end])
    }

    /// `Physical Kind ( tag | "name" | "name", tag ) (= | += | -=) { list }`
    fn physical(&mut self, dim: i32, tokens: &[(Token, usize)]) -> Result<()> {
        let mut parser = Parser::new(tokens, &self.vars);
        parser.expect_punct('(')?;

        let mut name: Option<String> = None;
        let mut tag: Option<i32> = None;

        if let Some(Token::Str(s)) = parser.peek() {
            name = Some(s.clone());
            parser.advance();
            if parser.eat_punct(',') {
                tag = Some(to_tag(parser.expr()?).map_err(|m| parser.error(&m))?);
            }
        } else {
            tag = Some(to_tag(parser.expr()?).map_err(|m| parser.error(&m))?);
        }
        parser.expect_punct(')')?;

        let operator = match (parser.peek(), parser.peek_at(1)) {
            (Some(Token::Punct('+')), Some(Token::Punct('='))) => '+',
            (Some(Token::Punct('-')), Some(Token::Punct('='))) => '-',
            (Some(Token::Punct('=')), _) => '=',
            _ => return Err(parser.error("Expected '=', '+=' or '-='")),
        };
        if operator != '=' {
            parser.advance();
        }
        parser.advance();

        let values = parser.list()?;
        if !parser.at_end() {
            return Err(parser.error("Unexpected trailing tokens"));
        }
        let entities: Vec<i32> = to_tags(&values)
            .map_err(|m| parser.error(&m))?
            .into_iter()
            .map(i32::abs)
            .collect();

        let tag = match (tag, &name) {
            (Some(tag), _) => tag,
            (None, Some(n)) => self
                .model
                .physical_tag_by_name(dim, n)
                .unwrap_or_else(|| self.model.max_physical_tag() + 1),
            (None, None) => unreachable!("physical head always has a tag or a name"),
        };

        if operator == '-' {
            self.model.remove_from_physical_group(dim, tag, &entities);
        } else {
            self.model.add_to_physical_group(dim, tag, name, &entities);
        }
        Ok(())
    }

    fn assignment(&mut self, name: &str, tokens: &[(Token, usize)]) {
        if name.contains('.') {
            debug!("ignoring option '{name}'");
            return;
        }
        let mut parser = Parser::new(tokens, &self.vars);
        match parser.expr() {
            Ok(value) if parser.at_end() => {
                self.vars.insert(name.to_owned(), value);
            }
            _ => {
                debug!("ignoring non-numeric assignment to '{name}'");
            }
        }
    }
}

/// Reads the points, curves and physical groups of a `.geo` source
///
/// # Arguments
/// * `source` - The contents of the `.geo` file
///
/// # Returns
/// The model plus the statements that were not evaluated
pub fn parse_geo(source: &str) -> Result<GeoReport> {
    let mut reader = GeoReader {
        vars: HashMap::new(),
        model: GeometryModel::new(),
        skipped: Vec::new(),
        requires_gmsh: false,
        open_cascade: false,
        block_depth: 0,
    };

    for statement in tokenize(source)? {
        reader.statement(&statement)?;
    }

    if !reader.skipped.is_empty() {
        warn!(
            "skipped {} statements the native .geo reader does not evaluate: {}",
            reader.skipped.len(),
            reader.skipped.join(", ")
        );
    }

    Ok(GeoReport {
        model: reader.model,
        skipped: reader.skipped,
        requires_gmsh: reader.requires_gmsh,
    })
}

/// Whether `source` names a statement only gmsh can evaluate
pub(super) fn uses_gmsh_only(source: &str) -> bool {
    source
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .any(|word| GMSH_ONLY.contains(&word))
}
