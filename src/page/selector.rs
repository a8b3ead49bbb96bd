//! A small CSS selector engine for [`super::MemoryPage`].
//!
//! Supported: type selectors, `*`, `.class`, `#id`, `[attr]`, `[attr="value"]`, the descendant
//! combinator and comma-separated lists. Anything else is a parse error.

/// Minimal element interface the matcher needs
pub trait ElementView: Sized {
    fn tag_name(&self) -> &str;
    fn has_class(&self, class: &str) -> bool;
    fn attr(&self, name: &str) -> Option<&str>;
    fn parent_element(&self) -> Option<Self>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported selector '{selector}': {reason}")]
pub struct SelectorError {
    pub selector: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrTest {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

impl Compound {
    fn matches<E: ElementView>(&self, el: &E) -> bool {
        if let Some(tag) = &self.tag {
            if !el.tag_name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if el.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| el.has_class(c)) {
            return false;
        }
        self.attrs.iter().all(|test| match (&test.value, el.attr(&test.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(expected), Some(actual)) => expected == actual,
        })
    }
}

/// A parsed, comma-separated selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    /// Each alternative is a descendant chain, outermost first
    alternatives: Vec<Vec<Compound>>,
}

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let fail = |reason: &str| SelectorError {
            selector: input.to_string(),
            reason: reason.to_string(),
        };

        let mut alternatives = Vec::new();
        for part in split_top_level(input, ',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(fail("empty alternative"));
            }
            let mut chain = Vec::new();
            for token in split_top_level(part, ' ') {
                let token = token.trim();
                if token.is_empty() {
                    continue;
                }
                chain.push(parse_compound(token).map_err(|reason| fail(&reason))?);
            }
            alternatives.push(chain);
        }

        if alternatives.is_empty() {
            return Err(fail("empty selector"));
        }
        Ok(Self { alternatives })
    }

    pub fn matches<E: ElementView>(&self, el: &E) -> bool {
        self.alternatives.iter().any(|chain| matches_chain(chain, el))
    }
}

fn matches_chain<E: ElementView>(chain: &[Compound], el: &E) -> bool {
    let Some((last, ancestors)) = chain.split_last() else {
        return false;
    };
    if !last.matches(el) {
        return false;
    }

    let mut remaining = ancestors.iter().rev().peekable();
    let mut current = el.parent_element();
    while let Some(compound) = remaining.peek() {
        let Some(candidate) = current else {
            return false;
        };
        if compound.matches(&candidate) {
            remaining.next();
        }
        current = candidate.parent_element();
    }
    true
}

/// Split on `sep` outside of `[...]` and quotes
fn split_top_level(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, ch) in input.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < chars.len() && is_ident_char(chars[*pos]) {
        *pos += 1;
    }
    chars[start..*pos].iter().collect()
}

fn parse_compound(token: &str) -> Result<Compound, String> {
    let chars: Vec<char> = token.chars().collect();
    let mut pos = 0;
    let mut compound = Compound::default();

    if chars.first() == Some(&'*') {
        pos += 1;
    } else if chars.first().is_some_and(|c| is_ident_char(*c)) {
        compound.tag = Some(take_ident(&chars, &mut pos).to_ascii_lowercase());
    }

    while pos < chars.len() {
        match chars[pos] {
            '.' => {
                pos += 1;
                let class = take_ident(&chars, &mut pos);
                if class.is_empty() {
                    return Err("empty class name".to_string());
                }
                compound.classes.push(class);
            }
            '#' => {
                pos += 1;
                let id = take_ident(&chars, &mut pos);
                if id.is_empty() {
                    return Err("empty id".to_string());
                }
                compound.id = Some(id);
            }
            '[' => {
                pos += 1;
                compound.attrs.push(parse_attr(&chars, &mut pos)?);
            }
            other => return Err(format!("unexpected '{}'", other)),
        }
    }

    Ok(compound)
}

fn parse_attr(chars: &[char], pos: &mut usize) -> Result<AttrTest, String> {
    let name = take_ident(chars, pos);
    if name.is_empty() {
        return Err("empty attribute name".to_string());
    }

    match chars.get(*pos) {
        Some(']') => {
            *pos += 1;
            Ok(AttrTest { name, value: None })
        }
        Some('=') => {
            *pos += 1;
            let value = match chars.get(*pos) {
                Some(&q) if q == '"' || q == '\'' => {
                    *pos += 1;
                    let start = *pos;
                    while *pos < chars.len() && chars[*pos] != q {
                        *pos += 1;
                    }
                    if *pos >= chars.len() {
                        return Err("unterminated attribute value".to_string());
                    }
                    let value: String = chars[start..*pos].iter().collect();
                    *pos += 1;
                    value
                }
                _ => take_ident(chars, pos),
            };
            if chars.get(*pos) != Some(&']') {
                return Err("expected ']'".to_string());
            }
            *pos += 1;
            Ok(AttrTest {
                name,
                value: Some(value),
            })
        }
        _ => Err("unsupported attribute operator".to_string()),
    }
}
