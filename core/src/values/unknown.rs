//! Attribute trails and unknown sets for partial evaluation.

use std::fmt;
use std::sync::Arc;

use ecow::EcoString;

/// A variable plus the chain of field selections applied to it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attribute {
    variable: EcoString,
    path: Vec<EcoString>,
}

impl Attribute {
    pub fn new(variable: impl Into<EcoString>) -> Self {
        Self {
            variable: variable.into(),
            path: Vec::new(),
        }
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn path(&self) -> &[EcoString] {
        &self.path
    }

    pub fn field(mut self, name: impl Into<EcoString>) -> Self {
        self.path.push(name.into());
        self
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.variable)?;
        for field in &self.path {
            write!(f, ".{field}")?;
        }
        Ok(())
    }
}

/// Provenance of a value on the operand stack.
///
/// Empty for values that are not rooted in a variable (literals, call
/// results). Cloning is a reference count bump.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeTrail(Option<Arc<Attribute>>);

impl AttributeTrail {
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn for_variable(name: impl Into<EcoString>) -> Self {
        Self(Some(Arc::new(Attribute::new(name))))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn attribute(&self) -> Option<&Attribute> {
        self.0.as_deref()
    }

    /// Extends the trail with a field selection. Empty trails stay empty.
    pub fn step(&self, field: &str) -> Self {
        match &self.0 {
            Some(attribute) => Self(Some(Arc::new(
                Attribute::clone(attribute).field(field),
            ))),
            None => Self(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSegment {
    Field(EcoString),
    Wildcard,
}

/// Declares an attribute (or a subtree of one) as not yet known.
///
/// A pattern `request.auth` matches the attributes `request.auth` and
/// `request.auth.claims`, but not `request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePattern {
    variable: EcoString,
    segments: Vec<PatternSegment>,
}

impl AttributePattern {
    pub fn new(variable: impl Into<EcoString>) -> Self {
        Self {
            variable: variable.into(),
            segments: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<EcoString>) -> Self {
        self.segments.push(PatternSegment::Field(name.into()));
        self
    }

    pub fn wildcard(mut self) -> Self {
        self.segments.push(PatternSegment::Wildcard);
        self
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    pub fn matches(&self, attribute: &Attribute) -> bool {
        if self.variable != attribute.variable || self.segments.len() > attribute.path.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(&attribute.path)
            .all(|(segment, field)| match segment {
                PatternSegment::Field(name) => name == field,
                PatternSegment::Wildcard => true,
            })
    }
}

/// The payload of `Value::Unknown`: the attributes whose values were missing.
///
/// Kept sorted and deduplicated so that equality is set equality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnknownSet {
    attributes: Vec<Attribute>,
}

impl UnknownSet {
    pub fn new(attributes: impl IntoIterator<Item = Attribute>) -> Self {
        let mut attributes: Vec<Attribute> = attributes.into_iter().collect();
        attributes.sort();
        attributes.dedup();
        Self { attributes }
    }

    pub fn from_attribute(attribute: Attribute) -> Self {
        Self {
            attributes: vec![attribute],
        }
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn merge(&self, other: &UnknownSet) -> UnknownSet {
        UnknownSet::new(self.attributes.iter().chain(&other.attributes).cloned())
    }
}

impl fmt::Display for UnknownSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown{")?;
        for (i, attribute) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{attribute}")?;
        }
        f.write_str("}")
    }
}
