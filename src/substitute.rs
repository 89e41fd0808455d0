//! Literal tag replacement.
//!
//! Tags are matched through an escaped regular expression, so `.`, `#`,
//! `$`, brackets and the like in a tag are plain characters. Values are
//! inserted verbatim: `$1` in a value is not a capture reference.
//!
//! A [`Draft`] threads many substitutions through one document. Inserted
//! values are kept apart from the template text, so a later tag is never
//! found inside a value inserted earlier.

use crate::error::Result;
use regex::Regex;

/// A tag compiled for literal matching.
#[derive(Debug, Clone)]
pub struct LiteralTag {
    text: String,
    pattern: Regex,
}

impl LiteralTag {
    pub fn new(tag: &str) -> Result<Self> {
        let pattern = Regex::new(&regex::escape(tag))?;
        Ok(Self {
            text: tag.to_string(),
            pattern,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Occurrences in `text`, non-overlapping, left to right.
    pub fn count_in(&self, text: &str) -> usize {
        self.pattern.find_iter(text).count()
    }
}

/// Outcome of one substitution call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    pub count: usize,
}

/// Replace every occurrence of `tag` in `template` with `value` in a single
/// left-to-right pass. A tag that does not occur gives the template back
/// unchanged with a count of 0.
pub fn substitute(template: &str, tag: &str, value: &str) -> Result<Substitution> {
    let tag = LiteralTag::new(tag)?;
    let mut draft = Draft::new(template);
    let count = draft.substitute(&tag, value);
    Ok(Substitution {
        text: draft.render(),
        count,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Template text, still open to substitution.
    Template(String),
    /// A substituted value, never scanned again.
    Value(String),
}

/// A document being filled in, one substitution at a time.
#[derive(Debug, Clone)]
pub struct Draft {
    segments: Vec<Segment>,
}

impl Draft {
    pub fn new(template: &str) -> Self {
        Self {
            segments: vec![Segment::Template(template.to_string())],
        }
    }

    /// Replace every occurrence of `tag` in the remaining template text.
    /// Returns the number of occurrences replaced.
    pub fn substitute(&mut self, tag: &LiteralTag, value: &str) -> usize {
        let mut count = 0;
        let mut segments = Vec::with_capacity(self.segments.len());

        for segment in std::mem::take(&mut self.segments) {
            let text = match segment {
                Segment::Template(text) => text,
                value_segment @ Segment::Value(_) => {
                    segments.push(value_segment);
                    continue;
                }
            };

            let mut last = 0;
            for m in tag.pattern.find_iter(&text) {
                if m.start() > last {
                    segments.push(Segment::Template(text[last..m.start()].to_string()));
                }
                segments.push(Segment::Value(value.to_string()));
                last = m.end();
                count += 1;
            }

            if last == 0 {
                segments.push(Segment::Template(text));
            } else if last < text.len() {
                segments.push(Segment::Template(text[last..].to_string()));
            }
        }

        self.segments = segments;
        count
    }

    /// Template text not replaced by any substitution, in document order.
    pub fn template_parts(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Template(s) => Some(s.as_str()),
            Segment::Value(_) => None,
        })
    }

    /// The document text with every substitution so far applied.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Template(s) | Segment::Value(s) => out.push_str(s),
            }
        }
        out
    }
}
