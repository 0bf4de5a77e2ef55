// src/template/parser.rs

//! Placeholder syntax: `{{ source | transform | transform(arg) }}`.
//!
//! `source` is either a dotted config path (`pkg.version`, `list.0`) or a
//! transform call with no input (`today(%Y)`).

use crate::errors::{PipewrightError, Result};

use super::{CLOSE, OPEN};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub source: Source,
    pub transforms: Vec<TransformCall>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Path(String),
    Call(TransformCall),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformCall {
    pub name: String,
    pub arg: Option<String>,
}

/// Split a template string into literal text and placeholders.
pub fn parse(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        if start > 0 {
            segments.push(Segment::Literal(rest[..start].to_string()));
        }

        let after_open = &rest[start + OPEN.len()..];
        let end = after_open.find(CLOSE).ok_or_else(|| {
            PipewrightError::ConfigError(format!("unterminated placeholder in '{template}'"))
        })?;

        let body = &after_open[..end];
        segments.push(Segment::Placeholder(parse_placeholder(body, template)?));
        rest = &after_open[end + CLOSE.len()..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }

    Ok(segments)
}

fn parse_placeholder(body: &str, template: &str) -> Result<Placeholder> {
    let mut parts = body.split('|').map(str::trim);

    let source = match parts.next() {
        Some(s) if !s.is_empty() => s,
        _ => {
            return Err(PipewrightError::ConfigError(format!(
                "empty placeholder in '{template}'"
            )));
        }
    };

    let source = if source.contains('(') {
        Source::Call(parse_call(source, template)?)
    } else {
        if source.contains(char::is_whitespace) || source.split('.').any(str::is_empty) {
            return Err(PipewrightError::ConfigError(format!(
                "invalid config path '{source}' in '{template}'"
            )));
        }
        Source::Path(source.to_string())
    };

    let transforms = parts
        .map(|p| parse_call(p, template))
        .collect::<Result<Vec<_>>>()?;

    Ok(Placeholder { source, transforms })
}

fn parse_call(raw: &str, template: &str) -> Result<TransformCall> {
    let invalid = || {
        PipewrightError::ConfigError(format!("invalid transform '{raw}' in '{template}'"))
    };

    let (name, arg) = match raw.find('(') {
        Some(open) => {
            let inner = raw[open + 1..].strip_suffix(')').ok_or_else(invalid)?;
            (&raw[..open], Some(inner.trim().to_string()))
        }
        None => (raw, None),
    };

    let name = name.trim();
    let valid_name = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid_name {
        return Err(invalid());
    }

    Ok(TransformCall {
        name: name.to_string(),
        arg: arg.filter(|a| !a.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_literals_and_placeholders() {
        let segs = parse("out/{{ A.t1.name }}.js").unwrap();
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0], Segment::Literal("out/".into()));
        assert_eq!(
            segs[1],
            Segment::Placeholder(Placeholder {
                source: Source::Path("A.t1.name".into()),
                transforms: vec![],
            })
        );
        assert_eq!(segs[2], Segment::Literal(".js".into()));
    }

    #[test]
    fn parses_generator_source_and_transform_chain() {
        let segs = parse("{{ today(%Y) }}-{{ less.css.dest | stem | upper }}").unwrap();
        match &segs[0] {
            Segment::Placeholder(p) => assert_eq!(
                p.source,
                Source::Call(TransformCall {
                    name: "today".into(),
                    arg: Some("%Y".into()),
                })
            ),
            other => panic!("unexpected segment {other:?}"),
        }
        match &segs[2] {
            Segment::Placeholder(p) => {
                let names: Vec<_> = p.transforms.iter().map(|t| t.name.as_str()).collect();
                assert_eq!(names, vec!["stem", "upper"]);
            }
            other => panic!("unexpected segment {other:?}"),
        }
    }

    #[test]
    fn rejects_unterminated_and_empty_placeholders() {
        assert!(parse("{{ pkg.version").is_err());
        assert!(parse("a {{ }} b").is_err());
        assert!(parse("{{ pkg..version }}").is_err());
    }
}
