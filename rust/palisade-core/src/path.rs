use anyhow::{anyhow, Result};
use serde_json::Value;
use std::{fmt::Display, str::FromStr};

/// One step of a parsed field path
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// Descend into a named member
    Field(String),
    /// Fan out over every member of a collection or object
    Any,
}

/// A parsed dotted field path, e.g. `createdBy.login` or `members.*.login`.
/// Paths are walked instead of string-spliced so that wildcard fan-out and
/// missing members have explicit, testable semantics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Resolve every value reachable through this path on the given record
    pub fn resolve<'a>(&self, value: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![value];

        for segment in &self.0 {
            let mut next = Vec::new();

            for value in current {
                match segment {
                    PathSegment::Field(name) => {
                        if let Some(member) = value.get(name) {
                            next.push(member);
                        }
                    }
                    PathSegment::Any => match value {
                        Value::Array(items) => next.extend(items.iter()),
                        Value::Object(members) => next.extend(members.values()),
                        _ => {}
                    },
                }
            }

            current = next;
        }

        current
    }
}

impl FromStr for FieldPath {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let segments: Vec<PathSegment> = value
            .split('.')
            .map(|part| match part {
                "" => Err(anyhow!("Empty segment in field path: {:?}", value)),
                "*" => Ok(PathSegment::Any),
                name => Ok(PathSegment::Field(name.to_owned())),
            })
            .collect::<Result<_>>()?;

        if segments.is_empty() {
            return Err(anyhow!("Empty field path"));
        }

        Ok(FieldPath(segments))
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|segment| match segment {
                PathSegment::Field(name) => name.clone(),
                PathSegment::Any => "*".into(),
            })
            .collect();
        write!(f, "{}", parts.join("."))
    }
}
