//! Named prompt templates with a closed field contract.
//!
//! A template declares the exact set of fields it needs. Rendering fails when
//! a field is missing *or* when the caller supplies one the template does not
//! declare. Templates are registered through [`TemplateRegistryBuilder`] at
//! startup; the built [`TemplateRegistry`] is immutable and can be shared
//! across requests behind an `Arc`.

mod builtin;

pub use builtin::{builtin_templates, DEFAULT_TEMPLATE, QUESTION_FIELD};

use crate::config::Prompts;
use crate::error::{DocqaError, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;

/// Placeholders are `{field}`; `{{` and `}}` are literal braces.
fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex is valid")
    })
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// A parsed prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    name: String,
    fields: Vec<String>,
    format: String,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parse a format string and check it references exactly `fields`.
    pub fn parse(name: &str, fields: &[String], format: &str) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(DocqaError::InvalidTemplate("template name must not be empty".to_string()));
        }

        let declared: BTreeSet<String> = fields.iter().cloned().collect();
        if declared.len() != fields.len() {
            return Err(DocqaError::InvalidTemplate(format!(
                "template '{}' declares a field more than once",
                name
            )));
        }

        let segments = parse_segments(name, format)?;
        let referenced: BTreeSet<String> = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Field(f) => Some(f.clone()),
                Segment::Literal(_) => None,
            })
            .collect();

        if referenced != declared {
            let unused: Vec<_> = declared.difference(&referenced).cloned().collect();
            let undeclared: Vec<_> = referenced.difference(&declared).cloned().collect();
            return Err(DocqaError::InvalidTemplate(format!(
                "template '{}' fields do not match its format string (unused: [{}], undeclared: [{}])",
                name,
                unused.join(", "),
                undeclared.join(", ")
            )));
        }

        Ok(Self {
            name: name.to_string(),
            fields: fields.to_vec(),
            format: format.to_string(),
            segments,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Required fields, in declaration order.
    pub fn required_fields(&self) -> &[String] {
        &self.fields
    }

    /// The raw format string.
    pub fn format_string(&self) -> &str {
        &self.format
    }

    /// Check `inputs` against the field contract.
    ///
    /// Missing fields are reported before unexpected ones.
    pub fn validate(&self, inputs: &HashMap<String, String>) -> Result<()> {
        let missing: BTreeSet<String> = self
            .fields
            .iter()
            .filter(|f| !inputs.contains_key(f.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(DocqaError::MissingFields {
                template: self.name.clone(),
                fields: missing,
            });
        }

        let extra: BTreeSet<String> = inputs
            .keys()
            .filter(|k| !self.fields.iter().any(|f| f == *k))
            .cloned()
            .collect();
        if !extra.is_empty() {
            return Err(DocqaError::UnexpectedFields {
                template: self.name.clone(),
                fields: extra,
            });
        }

        Ok(())
    }

    /// Validate and substitute.
    pub fn render(&self, inputs: &HashMap<String, String>) -> Result<String> {
        self.validate(inputs)?;

        let mut out = String::with_capacity(self.format.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                // validate() guarantees every field is present
                Segment::Field(field) => {
                    if let Some(value) = inputs.get(field) {
                        out.push_str(value);
                    }
                }
            }
        }
        Ok(out)
    }
}

fn parse_segments(name: &str, format: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut last = 0;

    for caps in placeholder_regex().captures_iter(format) {
        let Some(whole) = caps.get(0) else { continue };
        push_literal(name, &mut literal, &format[last..whole.start()])?;
        last = whole.end();

        match caps.get(1) {
            Some(field) => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Field(field.as_str().to_string()));
            }
            None => literal.push_str(&whole.as_str()[..1]),
        }
    }
    push_literal(name, &mut literal, &format[last..])?;
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}

fn push_literal(name: &str, literal: &mut String, text: &str) -> Result<()> {
    if text.contains('{') || text.contains('}') {
        return Err(DocqaError::InvalidTemplate(format!(
            "template '{}' has an unmatched or malformed brace",
            name
        )));
    }
    literal.push_str(text);
    Ok(())
}

/// Summary of a registered template, for listings.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateInfo {
    pub name: String,
    pub fields: Vec<String>,
    pub format: String,
}

impl From<&PromptTemplate> for TemplateInfo {
    fn from(t: &PromptTemplate) -> Self {
        Self {
            name: t.name.clone(),
            fields: t.fields.clone(),
            format: t.format.clone(),
        }
    }
}

/// Collects templates before the registry is frozen.
#[derive(Debug, Default)]
pub struct TemplateRegistryBuilder {
    templates: BTreeMap<String, PromptTemplate>,
}

impl TemplateRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template. Names must be unique.
    pub fn register(mut self, name: &str, fields: &[&str], format: &str) -> Result<Self> {
        let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        self.insert(PromptTemplate::parse(name, &fields, format)?)?;
        Ok(self)
    }

    /// Register the built-in tone templates.
    pub fn with_builtins(mut self) -> Result<Self> {
        for template in builtin_templates()? {
            self.insert(template)?;
        }
        Ok(self)
    }

    fn insert(&mut self, template: PromptTemplate) -> Result<()> {
        if self.templates.contains_key(template.name()) {
            return Err(DocqaError::InvalidTemplate(format!(
                "template '{}' is already registered",
                template.name()
            )));
        }
        self.templates.insert(template.name.clone(), template);
        Ok(())
    }

    pub fn build(self) -> TemplateRegistry {
        TemplateRegistry {
            templates: self.templates,
        }
    }
}

/// Read-only set of templates, keyed by name.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, PromptTemplate>,
}

impl TemplateRegistry {
    pub fn builder() -> TemplateRegistryBuilder {
        TemplateRegistryBuilder::new()
    }

    /// Registry holding only the built-in tones.
    pub fn with_builtins() -> Result<Self> {
        Ok(Self::builder().with_builtins()?.build())
    }

    /// Built-in tones plus the templates defined in the prompts file.
    pub fn from_prompts(prompts: &Prompts) -> Result<Self> {
        let mut builder = Self::builder().with_builtins()?;
        for def in &prompts.templates {
            let fields: Vec<&str> = def.fields.iter().map(String::as_str).collect();
            builder = builder.register(&def.name, &fields, &def.format)?;
        }
        Ok(builder.build())
    }

    pub fn get(&self, name: &str) -> Option<&PromptTemplate> {
        self.templates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Templates in name order.
    pub fn list(&self) -> impl Iterator<Item = &PromptTemplate> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Look up `name`, failing with `TemplateNotFound`.
    pub fn resolve(&self, name: &str) -> Result<&PromptTemplate> {
        self.get(name)
            .ok_or_else(|| DocqaError::TemplateNotFound(name.to_string()))
    }

    /// Resolve `name` and render it with `inputs`.
    pub fn render(&self, name: &str, inputs: &HashMap<String, String>) -> Result<String> {
        self.resolve(name)?.render(inputs)
    }
}
