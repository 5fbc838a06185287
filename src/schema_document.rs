use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// A Prisma schema held as an ordered list of top-level spans.
///
/// Model declarations are parsed into [`ModelBlock`] nodes; everything else
/// (datasource, generator, enums, comments) is kept as raw text. Printing a
/// document that was never mutated reproduces the input byte-for-byte.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
enum Item {
    Raw(String),
    Model(ModelBlock),
}

/// One `model Name { ... }` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBlock {
    name: String,
    header: String,
    body: Vec<BodyLine>,
    footer: String,
}

/// A single line inside a model body, with its original text.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyLine {
    raw: String,
    kind: LineKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    Field(FieldDecl),
    /// `@@name(...)` block attribute, holding the attribute name.
    BlockAttribute(String),
    /// Blank lines, comments and anything not recognised.
    Trivia,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub field_type: String,
    pub attributes: String,
    /// Offset of the type column, measured from the end of the indentation.
    pub type_column: usize,
}

/// Indentation and line ending of an existing line, used to render new lines
/// that sit naturally next to it.
#[derive(Debug, Clone, PartialEq)]
pub struct LineLayout {
    pub indent: String,
    pub type_column: usize,
    pub line_ending: &'static str,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("model `{name}` opened on line {line} is never closed")]
    UnterminatedModel { name: String, line: usize },

    #[error("model `{name}` is declared more than once (line {line})")]
    DuplicateModel { name: String, line: usize },
}

fn model_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*model\s+([A-Za-z_][A-Za-z0-9_]*)\s*\{\s*(?://.*)?$")
            .expect("model header pattern is valid")
    })
}

fn field_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\s*)([A-Za-z_][A-Za-z0-9_]*)(\s+)([A-Za-z_][A-Za-z0-9_]*(?:\[\])?\??)(.*)$")
            .expect("field pattern is valid")
    })
}

fn block_attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*@@([A-Za-z_][A-Za-z0-9_.]*)").expect("block attribute pattern is valid")
    })
}

fn string_default_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"@default\(\s*"([^"]*)"\s*\)"#).expect("string default pattern is valid")
    })
}

/// Block attributes whose first argument is a list of field names.
pub const FIELD_LIST_ATTRIBUTES: [&str; 3] = ["index", "unique", "id"];

/// Replace every whole-identifier occurrence of `from` in `text` with `to`.
fn replace_identifier(text: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        return text.to_string();
    }
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let mut output = String::with_capacity(text.len());
    let mut start = 0;

    while let Some(found) = text[start..].find(from) {
        let index = start + found;
        let end = index + from.len();
        let starts_word = text[..index].chars().next_back().map_or(true, |c| !is_ident(c));
        let ends_word = text[end..].chars().next().map_or(true, |c| !is_ident(c));
        output.push_str(&text[start..index]);
        output.push_str(if starts_word && ends_word { to } else { from });
        start = end;
    }
    output.push_str(&text[start..]);
    output
}

fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

fn line_ending_of(line: &str) -> &'static str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

impl SchemaDocument {
    pub fn model(&self, name: &str) -> Option<&ModelBlock> {
        self.models().find(|model| model.name == name)
    }

    pub fn model_mut(&mut self, name: &str) -> Option<&mut ModelBlock> {
        self.items.iter_mut().find_map(|item| match item {
            Item::Model(model) if model.name == name => Some(model),
            _ => None,
        })
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelBlock> {
        self.items.iter().filter_map(|item| match item {
            Item::Model(model) => Some(model),
            Item::Raw(_) => None,
        })
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models().map(|model| model.name.as_str()).collect()
    }
}

impl FromStr for SchemaDocument {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut items = Vec::new();
        let mut raw = String::new();
        let mut seen = HashSet::new();
        let mut lines = s.split_inclusive('\n').enumerate();

        while let Some((index, line)) = lines.next() {
            let Some(caps) = model_header_regex().captures(strip_line_ending(line)) else {
                raw.push_str(line);
                continue;
            };

            let name = caps[1].to_string();
            if !seen.insert(name.clone()) {
                return Err(ParseError::DuplicateModel { name, line: index + 1 });
            }
            if !raw.is_empty() {
                items.push(Item::Raw(std::mem::take(&mut raw)));
            }

            let mut body = Vec::new();
            let mut footer = None;
            for (_, body_line) in lines.by_ref() {
                if strip_line_ending(body_line).trim_start().starts_with('}') {
                    footer = Some(body_line.to_string());
                    break;
                }
                body.push(BodyLine::parse(body_line));
            }

            let footer = footer.ok_or_else(|| ParseError::UnterminatedModel {
                name: name.clone(),
                line: index + 1,
            })?;

            items.push(Item::Model(ModelBlock {
                name,
                header: line.to_string(),
                body,
                footer,
            }));
        }

        if !raw.is_empty() {
            items.push(Item::Raw(raw));
        }

        Ok(SchemaDocument { items })
    }
}

impl fmt::Display for SchemaDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            match item {
                Item::Raw(text) => f.write_str(text)?,
                Item::Model(model) => write!(f, "{}", model)?,
            }
        }
        Ok(())
    }
}

impl ModelBlock {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lines(&self) -> &[BodyLine] {
        &self.body
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.body.iter().filter_map(BodyLine::field)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields().find(|field| field.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.body
            .iter()
            .position(|line| line.field().is_some_and(|field| field.name == name))
    }

    /// Position of the first `String` field marked `@id` with a generated default.
    pub fn identifier_position(&self) -> Option<usize> {
        self.body
            .iter()
            .position(|line| line.field().is_some_and(FieldDecl::is_generated_string_id))
    }

    /// Position of the first `@@name(...)` attribute in this block.
    pub fn block_attribute_position(&self, name: &str) -> Option<usize> {
        self.body.iter().position(|line| line.block_attribute() == Some(name))
    }

    /// Trimmed text of every `@@name(...)` attribute in this block.
    pub fn block_attributes<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.body
            .iter()
            .filter(move |line| line.block_attribute() == Some(name))
            .map(|line| line.content().trim())
    }

    pub fn layout_at(&self, position: usize) -> LineLayout {
        match self.body.get(position) {
            Some(line) => line.layout(),
            None => LineLayout {
                indent: "  ".to_string(),
                type_column: 0,
                line_ending: line_ending_of(&self.header),
            },
        }
    }

    /// Insert rendered lines so the first one ends up at `position`.
    pub fn insert_lines(&mut self, position: usize, lines: Vec<String>) {
        let position = position.min(self.body.len());
        let parsed: Vec<BodyLine> = lines.iter().map(|line| BodyLine::parse(line)).collect();
        self.body.splice(position..position, parsed);
    }

    /// Replace the line at `position` with the rendered lines.
    pub fn replace_line(&mut self, position: usize, lines: Vec<String>) {
        if position >= self.body.len() {
            return;
        }
        let parsed: Vec<BodyLine> = lines.iter().map(|line| BodyLine::parse(line)).collect();
        self.body.splice(position..=position, parsed);
    }

    /// Rename `from` to `to` inside the field list of every `@@index`,
    /// `@@unique` and `@@id` line. Returns how many lines changed.
    pub fn rename_in_field_lists(&mut self, from: &str, to: &str) -> usize {
        let mut renamed = 0;
        for line in &mut self.body {
            if !line.block_attribute().is_some_and(|name| FIELD_LIST_ATTRIBUTES.contains(&name)) {
                continue;
            }
            let Some(open) = line.raw.find('[') else {
                continue;
            };
            let Some(close) = line.raw[open..].find(']').map(|offset| open + offset) else {
                continue;
            };
            let list = &line.raw[open + 1..close];
            let replaced = replace_identifier(list, from, to);
            if replaced != list {
                let raw = format!("{}{}{}", &line.raw[..=open], replaced, &line.raw[close..]);
                *line = BodyLine::parse(&raw);
                renamed += 1;
            }
        }
        renamed
    }
}

impl fmt::Display for ModelBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header)?;
        for line in &self.body {
            f.write_str(&line.raw)?;
        }
        f.write_str(&self.footer)
    }
}

impl BodyLine {
    pub fn parse(raw: &str) -> Self {
        let content = strip_line_ending(raw);
        let trimmed = content.trim();

        let kind = if trimmed.is_empty() || trimmed.starts_with("//") {
            LineKind::Trivia
        } else if let Some(caps) = block_attribute_regex().captures(content) {
            LineKind::BlockAttribute(caps[1].to_string())
        } else if let Some(caps) = field_regex().captures(content) {
            LineKind::Field(FieldDecl {
                name: caps[2].to_string(),
                field_type: caps[4].to_string(),
                attributes: caps[5].trim().to_string(),
                type_column: caps[2].len() + caps[3].len(),
            })
        } else {
            LineKind::Trivia
        };

        BodyLine {
            raw: raw.to_string(),
            kind,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn content(&self) -> &str {
        strip_line_ending(&self.raw)
    }

    pub fn kind(&self) -> &LineKind {
        &self.kind
    }

    pub fn field(&self) -> Option<&FieldDecl> {
        match &self.kind {
            LineKind::Field(field) => Some(field),
            _ => None,
        }
    }

    pub fn block_attribute(&self) -> Option<&str> {
        match &self.kind {
            LineKind::BlockAttribute(name) => Some(name),
            _ => None,
        }
    }

    fn layout(&self) -> LineLayout {
        let content = self.content();
        let indent_len = content.len() - content.trim_start().len();
        LineLayout {
            indent: content[..indent_len].to_string(),
            type_column: self.field().map_or(0, |field| field.type_column),
            line_ending: line_ending_of(&self.raw),
        }
    }
}

impl FieldDecl {
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.split_whitespace().any(|token| {
            token == name || token.strip_prefix(name).is_some_and(|rest| rest.starts_with('('))
        })
    }

    pub fn is_generated_string_id(&self) -> bool {
        self.field_type == "String" && self.has_attribute("@id") && self.attributes.contains("@default(")
    }

    /// The literal of a `@default("...")` string default, if the field has one.
    pub fn fixed_string_default(&self) -> Option<&str> {
        string_default_regex()
            .captures(&self.attributes)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// The attributes with any `@default("...")` removed.
    pub fn attributes_without_default(&self) -> String {
        let Some(default) = string_default_regex().find(&self.attributes) else {
            return self.attributes.clone();
        };
        let before = self.attributes[..default.start()].trim_end();
        let after = self.attributes[default.end()..].trim_start();
        match (before.is_empty(), after.is_empty()) {
            (true, _) => after.to_string(),
            (_, true) => before.to_string(),
            _ => format!("{} {}", before, after),
        }
    }

    /// The type name without its `?` or `[]` modifier.
    pub fn base_type(&self) -> &str {
        self.field_type.trim_end_matches('?').trim_end_matches("[]")
    }
}

impl LineLayout {
    /// Render `name rest`, padding the name so the type lines up with the anchor.
    pub fn field_line(&self, name: &str, rest: &str) -> String {
        let width = self.type_column.saturating_sub(1).max(name.len());
        format!("{}{:<width$} {}{}", self.indent, name, rest, self.line_ending, width = width)
    }

    /// Widen the type column so that every one of `names` fits in front of it.
    pub fn aligned(mut self, names: &[&str]) -> Self {
        let widest = names.iter().map(|name| name.len() + 1).max().unwrap_or(0);
        self.type_column = self.type_column.max(widest);
        self
    }

    pub fn line(&self, text: &str) -> String {
        format!("{}{}{}", self.indent, text, self.line_ending)
    }
}
