//! Script replay for injected fragments. Markup injected into the content
//! container doesn't run its `<script>` elements, so the router rebuilds each
//! one as a fresh [`ScriptNode`] and hands it to the document to execute.
//! External scripts run at most once per document life: [`LoadedScripts`]
//! remembers every source that has run and only ever grows.

use crate::render::EscapeHtml;
use std::collections::HashSet;
use std::fmt::Write;
use tracing::{debug, warn};

/// The value some templates emit for a `src` that was never filled in.
const UNDEFINED_SOURCE: &str = "undefined";

/// A single attribute of a script element. Boolean attributes (`async`,
/// `defer`) have an empty value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Where a script's code comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptSource<'a> {
    /// The code is the element's text. Replayed every time.
    Inline,

    /// The code is fetched from this URL. Replayed once per document.
    External(&'a str),
}

impl<'a> ScriptSource<'a> {
    /// A missing, empty, or `"undefined"` source means the script is inline.
    pub fn from_attribute(src: Option<&'a str>) -> ScriptSource<'a> {
        match src {
            None | Some("") | Some(UNDEFINED_SOURCE) => ScriptSource::Inline,
            Some(src) => ScriptSource::External(src),
        }
    }
}

/// A script element rebuilt from fragment markup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScriptNode {
    pub attributes: Vec<Attribute>,
    pub text: String,
}

impl ScriptNode {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.value.as_str())
    }

    pub fn source(&self) -> ScriptSource<'_> {
        ScriptSource::from_attribute(self.attribute("src"))
    }

    /// A copy with every attribute carried over except an invalid `src`.
    fn rebuild(&self) -> ScriptNode {
        let attributes = self
            .attributes
            .iter()
            .filter(|attribute| {
                let invalid = attribute.name == "src"
                    && (attribute.value.is_empty() || attribute.value == UNDEFINED_SOURCE);
                if invalid {
                    warn!(value = %attribute.value, "skipping invalid script source");
                }
                !invalid
            })
            .cloned()
            .collect();
        ScriptNode {
            attributes,
            text: self.text.clone(),
        }
    }

    /// Serializes the element back to markup.
    pub fn to_html(&self) -> String {
        let mut html = String::from("<script");
        for attribute in &self.attributes {
            if attribute.value.is_empty() {
                let _ = write!(html, " {}", attribute.name);
            } else {
                let _ = write!(html, r#" {}="{}""#, attribute.name, EscapeHtml(&attribute.value));
            }
        }
        html.push('>');
        html.push_str(&self.text);
        html.push_str("</script>");
        html
    }
}

/// A piece of a fragment: either plain markup or a script element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment<'a> {
    Markup(&'a str),
    Script(ScriptNode),
}

/// Splits `html` into markup and script elements, in document order. A
/// `<script>` without a closing tag runs to the end of the input, as it would
/// in a browser.
pub fn segments(html: &str) -> Vec<Segment<'_>> {
    // ASCII lowercasing keeps byte offsets identical to `html`.
    let lower = html.to_ascii_lowercase();
    let mut segments = Vec::new();
    let mut cursor = 0;
    while let Some(start) = find_script_open(&lower, cursor) {
        let attributes_start = start + "<script".len();
        let open_end = match find_tag_end(html, attributes_start) {
            Some(end) => end,
            None => break,
        };
        if start > cursor {
            segments.push(Segment::Markup(&html[cursor..start]));
        }
        let attributes = parse_attributes(html[attributes_start..open_end].trim_end_matches('/'));
        let body_start = open_end + 1;
        let (text, next) = match lower[body_start..].find("</script") {
            Some(offset) => {
                let close = body_start + offset;
                let after = lower[close..].find('>').map_or(html.len(), |i| close + i + 1);
                (&html[body_start..close], after)
            }
            None => (&html[body_start..], html.len()),
        };
        segments.push(Segment::Script(ScriptNode {
            attributes,
            text: text.to_owned(),
        }));
        cursor = next;
    }
    if cursor < html.len() {
        segments.push(Segment::Markup(&html[cursor..]));
    }
    segments
}

/// Finds the next `<script` that opens an element (and isn't, say,
/// `<scripts>`).
fn find_script_open(lower: &str, from: usize) -> Option<usize> {
    let mut from = from;
    while let Some(offset) = lower[from..].find("<script") {
        let start = from + offset;
        match lower[start + "<script".len()..].chars().next() {
            Some(c) if c.is_ascii_whitespace() || c == '>' || c == '/' => return Some(start),
            _ => from = start + 1,
        }
    }
    None
}

/// Finds the `>` closing a start tag, skipping over quoted attribute values.
fn find_tag_end(html: &str, from: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in html[from..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return Some(from + i),
            _ => {}
        }
    }
    None
}

fn parse_attributes(input: &str) -> Vec<Attribute> {
    let mut attributes = Vec::new();
    let mut chars = input.char_indices().peekable();
    loop {
        while let Some(&(_, c)) = chars.peek() {
            if c.is_whitespace() || c == '/' {
                chars.next();
            } else {
                break;
            }
        }
        let name_start = match chars.peek() {
            Some(&(i, _)) => i,
            None => break,
        };
        let mut name_end = input.len();
        while let Some(&(i, c)) = chars.peek() {
            if c.is_whitespace() || c == '=' || c == '/' {
                name_end = i;
                break;
            }
            chars.next();
        }
        let name = input[name_start..name_end].to_ascii_lowercase();

        while let Some(&(_, c)) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
            } else {
                break;
            }
        }
        let mut value = String::new();
        if let Some(&(_, '=')) = chars.peek() {
            chars.next();
            while let Some(&(_, c)) = chars.peek() {
                if c.is_whitespace() {
                    chars.next();
                } else {
                    break;
                }
            }
            match chars.peek() {
                Some(&(_, quote)) if quote == '"' || quote == '\'' => {
                    chars.next();
                    for (_, c) in chars.by_ref() {
                        if c == quote {
                            break;
                        }
                        value.push(c);
                    }
                }
                _ => {
                    while let Some(&(_, c)) = chars.peek() {
                        if c.is_whitespace() {
                            break;
                        }
                        value.push(c);
                        chars.next();
                    }
                }
            }
        }
        if !name.is_empty() {
            attributes.push(Attribute { name, value });
        }
    }
    attributes
}

/// The external script sources that have already run in this document. Only
/// ever grows.
#[derive(Clone, Debug, Default)]
pub struct LoadedScripts(HashSet<String>);

impl LoadedScripts {
    pub fn contains(&self, src: &str) -> bool {
        self.0.contains(src)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, src: &str) {
        self.0.insert(src.to_owned());
    }
}

/// The outcome of preparing a fragment for injection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Replay {
    /// The fragment with every script element rebuilt and every
    /// already-loaded external script removed.
    pub markup: String,

    /// The scripts to execute, in document order.
    pub scripts: Vec<ScriptNode>,

    /// The number of external scripts dropped because they had already run.
    pub skipped: usize,
}

/// Prepares `html` for injection. External scripts whose source is already in
/// `loaded` are removed; the others are recorded in `loaded` and scheduled
/// along with every inline script.
pub fn replay(html: &str, loaded: &mut LoadedScripts) -> Replay {
    let mut result = Replay::default();
    for segment in segments(html) {
        match segment {
            Segment::Markup(markup) => result.markup.push_str(markup),
            Segment::Script(node) => {
                if let ScriptSource::External(src) = node.source() {
                    if loaded.contains(src) {
                        debug!(src, "script already loaded, skipping");
                        result.skipped += 1;
                        continue;
                    }
                    loaded.insert(src);
                    debug!(src, "tracking external script");
                }
                let rebuilt = node.rebuild();
                result.markup.push_str(&rebuilt.to_html());
                result.scripts.push(rebuilt);
            }
        }
    }
    result
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_segments() {
        let html = r#"<h1>Hi</h1><script src="/js/chart.js" defer></script><p>x</p><SCRIPT type='module'>init("a > b");</SCRIPT>"#;
        let segments = segments(html);
        assert_eq!(4, segments.len());
        assert_eq!(Segment::Markup("<h1>Hi</h1>"), segments[0]);
        match &segments[1] {
            Segment::Script(node) => {
                assert_eq!(Some("/js/chart.js"), node.attribute("src"));
                assert_eq!(Some(""), node.attribute("defer"));
                assert_eq!("", node.text);
            }
            other => panic!("wanted a script, got {:?}", other),
        }
        assert_eq!(Segment::Markup("<p>x</p>"), segments[2]);
        match &segments[3] {
            Segment::Script(node) => {
                assert_eq!(Some("module"), node.attribute("type"));
                assert_eq!(r#"init("a > b");"#, node.text);
                assert_eq!(ScriptSource::Inline, node.source());
            }
            other => panic!("wanted a script, got {:?}", other),
        }
    }

    #[test]
    fn test_quoted_gt_in_attribute() {
        let segments = segments(r#"<script data-x="a>b" src=/app.js></script>"#);
        match &segments[0] {
            Segment::Script(node) => {
                assert_eq!(Some("a>b"), node.attribute("data-x"));
                assert_eq!(Some("/app.js"), node.attribute("src"));
            }
            other => panic!("wanted a script, got {:?}", other),
        }
    }

    #[test]
    fn test_similar_tags_are_markup() {
        let html = "<scripts>not a script</scripts>";
        assert_eq!(vec![Segment::Markup(html)], segments(html));
    }

    #[test]
    fn test_unclosed_script_runs_to_end() {
        let segments = segments("<p>a</p><script>go()");
        assert_eq!(2, segments.len());
        match &segments[1] {
            Segment::Script(node) => assert_eq!("go()", node.text),
            other => panic!("wanted a script, got {:?}", other),
        }
    }

    #[test]
    fn test_undefined_source_is_inline() {
        assert_eq!(ScriptSource::Inline, ScriptSource::from_attribute(Some("undefined")));
        assert_eq!(ScriptSource::Inline, ScriptSource::from_attribute(Some("")));
        assert_eq!(ScriptSource::Inline, ScriptSource::from_attribute(None));
        assert_eq!(ScriptSource::External("/a.js"), ScriptSource::from_attribute(Some("/a.js")));
    }

    #[test]
    fn test_replay_runs_external_scripts_once() {
        let html = r#"<div id="contact"></div><script src="/js/contact.js"></script><script>setup();</script>"#;
        let mut loaded = LoadedScripts::default();

        let first = replay(html, &mut loaded);
        assert_eq!(2, first.scripts.len());
        assert_eq!(0, first.skipped);
        assert!(loaded.contains("/js/contact.js"));
        assert_eq!(html, first.markup);

        let second = replay(html, &mut loaded);
        assert_eq!(1, second.scripts.len());
        assert_eq!("setup();", second.scripts[0].text);
        assert_eq!(1, second.skipped);
        assert!(!second.markup.contains("contact.js"));
        assert_eq!(1, loaded.len());
    }

    #[test]
    fn test_replay_drops_undefined_source() {
        let mut loaded = LoadedScripts::default();
        let result = replay(r#"<script src="undefined" async>boot();</script>"#, &mut loaded);
        assert_eq!(1, result.scripts.len());
        assert_eq!(None, result.scripts[0].attribute("src"));
        assert_eq!(Some(""), result.scripts[0].attribute("async"));
        assert_eq!("<script async>boot();</script>", result.markup);
        assert!(loaded.is_empty());

        let again = replay(r#"<script src="undefined" async>boot();</script>"#, &mut loaded);
        assert_eq!(1, again.scripts.len());
    }
}
