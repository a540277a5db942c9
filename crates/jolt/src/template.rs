//! Template Engine
//!
//! Builds markup from literal pieces and interpolated [`Part`]s. Event
//! handlers are not serializable, so each one is replaced by
//! [`event_marker`] in the source and kept in `events`; materialization
//! walks the parsed fragment in pre-order and binds `events[i]` to the
//! i-th marker attribute it meets. Compilation order and walk order must
//! agree or handlers land on the wrong elements.

use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;

use jolt_dom::{DomError, DomTree, Event, EventHandler, NodeId, TreeWalker};
use regex::Regex;
use serde_json::Value;

/// Per-process placeholder, so interpolated text cannot forge a handler slot
static EVENT_MARKER: LazyLock<String> =
    LazyLock::new(|| format!("{{{{e:{:016x}}}}}", rand::random::<u64>()));

/// Placeholder emitted where an event handler is interpolated
pub fn event_marker() -> &'static str {
    EVENT_MARKER.as_str()
}

/// Literal ends inside an event attribute: ` onclick=` or ` onclick="`
static EVENT_POSITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\son[^\s="'<>/]*="?$"#).expect("valid event regex"));

/// Literal ends with an unquoted attribute assignment: ` title=`
static ATTRIBUTE_POSITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\s[^\s="'<>/]+=$"#).expect("valid attribute regex"));

/// Self-closing custom tag: `<my-tag a="1"/>`
static SELF_CLOSING_CUSTOM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([a-z][a-z0-9]*-[a-z0-9-]*)([^/>]*)/>").expect("valid self-closing regex")
});

/// Compiled markup plus its ordered event handlers
#[derive(Clone, Default)]
pub struct Template {
    source: String,
    events: Vec<EventHandler>,
}

impl Template {
    /// Template without handlers
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            events: Vec::new(),
        }
    }

    pub fn from_parts(source: impl Into<String>, events: Vec<EventHandler>) -> Self {
        Self {
            source: source.into(),
            events,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn events(&self) -> &[EventHandler] {
        &self.events
    }

    /// Append raw markup (used for component styles)
    pub fn push_source(&mut self, markup: &str) {
        self.source.push_str(markup);
    }

    /// Number of event markers in the source
    pub fn marker_count(&self) -> usize {
        self.source.matches(event_marker()).count()
    }

    pub fn into_parts(self) -> (String, Vec<EventHandler>) {
        (self.source, self.events)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("source", &self.source)
            .field("events", &self.events.len())
            .finish()
    }
}

/// Interpolated value
#[derive(Clone)]
pub enum Part {
    /// Stringified value, spliced verbatim
    Text(String),
    /// Absent value, renders as empty
    Undefined,
    /// Event handler, valid only in an event attribute position
    Handler(EventHandler),
    /// Nested template: source spliced, events concatenated
    Template(Template),
    /// Sequence of templates, spliced in order
    Templates(Vec<Template>),
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Part::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Part::Undefined => f.write_str("Undefined"),
            Part::Handler(_) => f.write_str("Handler(..)"),
            Part::Template(t) => f.debug_tuple("Template").field(t).finish(),
            Part::Templates(ts) => f.debug_tuple("Templates").field(ts).finish(),
        }
    }
}

/// Wrap a closure as an event handler part
pub fn on(handler: impl Fn(&mut Event) + 'static) -> Part {
    Part::Handler(Rc::new(handler))
}

impl From<&str> for Part {
    fn from(s: &str) -> Self {
        Part::Text(s.to_string())
    }
}

impl From<String> for Part {
    fn from(s: String) -> Self {
        Part::Text(s)
    }
}

impl From<&String> for Part {
    fn from(s: &String) -> Self {
        Part::Text(s.clone())
    }
}

impl From<char> for Part {
    fn from(c: char) -> Self {
        Part::Text(c.to_string())
    }
}

impl From<bool> for Part {
    fn from(b: bool) -> Self {
        Part::Text(b.to_string())
    }
}

macro_rules! integer_parts {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Part {
                fn from(n: $ty) -> Self {
                    Part::Text(n.to_string())
                }
            }
        )*
    };
}

integer_parts!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl From<f64> for Part {
    fn from(n: f64) -> Self {
        Part::Text(format_number(n))
    }
}

impl From<f32> for Part {
    fn from(n: f32) -> Self {
        Part::Text(format_number(f64::from(n)))
    }
}

impl<T: Into<Part>> From<Option<T>> for Part {
    fn from(value: Option<T>) -> Self {
        value.map_or(Part::Undefined, Into::into)
    }
}

impl From<Value> for Part {
    fn from(value: Value) -> Self {
        Part::from(&value)
    }
}

impl From<&Value> for Part {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Part::Text("null".to_string()),
            Value::String(s) => Part::Text(s.clone()),
            Value::Number(n) => match n.as_f64() {
                Some(f) if !(n.is_i64() || n.is_u64()) => Part::Text(format_number(f)),
                _ => Part::Text(n.to_string()),
            },
            other => Part::Text(other.to_string()),
        }
    }
}

impl From<Template> for Part {
    fn from(t: Template) -> Self {
        Part::Template(t)
    }
}

impl From<&Template> for Part {
    fn from(t: &Template) -> Self {
        Part::Template(t.clone())
    }
}

impl From<Vec<Template>> for Part {
    fn from(ts: Vec<Template>) -> Self {
        Part::Templates(ts)
    }
}

impl From<EventHandler> for Part {
    fn from(handler: EventHandler) -> Self {
        Part::Handler(handler)
    }
}

/// Integral floats print without a fraction, like `1` rather than `1.0`
fn format_number(n: f64) -> String {
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    n.to_string()
}

/// Split a `{}`-delimited literal into its pieces
pub fn split_literal(literal: &str) -> Vec<&str> {
    literal.split("{}").collect()
}

/// Template building and materialization
pub struct TemplateEngine;

impl TemplateEngine {
    /// Interleave `strings` with `values` into a template.
    ///
    /// `values[i]` follows `strings[i]`; a missing value is undefined.
    pub fn create_template<S: AsRef<str>>(strings: &[S], values: Vec<Part>) -> Template {
        if values.len() > strings.len() {
            tracing::warn!(
                "template has {} values for {} literal pieces; extra values ignored",
                values.len(),
                strings.len()
            );
        }

        let mut source = String::new();
        let mut events = Vec::new();
        let mut values = values.into_iter();

        for literal in strings {
            let literal = literal.as_ref();
            source.push_str(literal);

            match values.next().unwrap_or(Part::Undefined) {
                Part::Handler(handler) if EVENT_POSITION.is_match(literal) => {
                    source.push_str(event_marker());
                    events.push(handler);
                }
                part if ATTRIBUTE_POSITION.is_match(literal) => {
                    source.push('"');
                    match part {
                        Part::Text(text) => source.push_str(&text.replace('"', "&quot;")),
                        Part::Undefined => {}
                        _ => tracing::warn!("non-text value in attribute position rendered empty"),
                    }
                    source.push('"');
                }
                Part::Text(text) => source.push_str(&text),
                Part::Undefined => {}
                Part::Handler(_) => {
                    tracing::warn!("event handler outside an event attribute rendered empty");
                }
                Part::Template(template) => {
                    let (markup, nested) = template.into_parts();
                    source.push_str(&markup);
                    events.extend(nested);
                }
                Part::Templates(templates) => {
                    for template in templates {
                        let (markup, nested) = template.into_parts();
                        source.push_str(&markup);
                        events.extend(nested);
                    }
                }
            }
        }

        let source = SELF_CLOSING_CUSTOM.replace_all(&source, "<$1$2></$1>").into_owned();
        Template { source, events }
    }

    /// Materialize a template into a detached fragment and bind its events
    pub fn process_template(tree: &mut DomTree, template: &Template) -> Result<NodeId, TemplateError> {
        let fragment = jolt_html::parse_fragment(tree, template.source())?;
        let elements: Vec<NodeId> = TreeWalker::elements(tree, fragment).collect();

        let mut index = 0;
        for element in elements {
            for attr in tree.attributes(element) {
                if !attr.name.starts_with("on") || attr.value != event_marker() {
                    continue;
                }
                if let Some(handler) = template.events.get(index) {
                    let event_type = attr.name.get(2..).unwrap_or_default();
                    tree.add_event_listener(element, event_type, Rc::clone(handler))?;
                }
                tree.remove_attribute_ns(element, &attr.namespace, &attr.name)?;
                index += 1;
            }
        }

        if index != template.events.len() {
            tracing::warn!(
                "bound {} event markers but template carries {} handlers",
                index,
                template.events.len()
            );
        }
        debug_assert_eq!(
            index,
            template.events.len(),
            "event marker count must match handler count"
        );

        Ok(fragment)
    }
}

/// Template materialization errors
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("failed to parse template markup: {0}")]
    Parse(#[from] jolt_html::ParseError),

    #[error(transparent)]
    Dom(#[from] DomError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use jolt_html::HtmlSerializer;

    #[test]
    fn test_plain_values_are_spliced() {
        let t = TemplateEngine::create_template(&["<p>", " of ", "</p>"], vec![1i32.into(), 2.5f64.into()]);
        assert_eq!(t.source(), "<p>1 of 2.5</p>");
        assert!(t.events().is_empty());
    }

    #[test]
    fn test_undefined_renders_empty() {
        let none: Option<&str> = None;
        let t = TemplateEngine::create_template(&["<p>", "</p>"], vec![none.into()]);
        assert_eq!(t.source(), "<p></p>");
    }

    #[test]
    fn test_missing_trailing_value_is_undefined() {
        let t = TemplateEngine::create_template(&["<p>", "</p>"], vec![]);
        assert_eq!(t.source(), "<p></p>");
    }

    #[test]
    fn test_unquoted_attribute_is_quoted() {
        let t = TemplateEngine::create_template(&["<a title=", ">x</a>"], vec![r#"say "hi""#.into()]);
        assert_eq!(t.source(), r#"<a title="say &quot;hi&quot;">x</a>"#);
    }

    #[test]
    fn test_event_marker_in_both_quote_styles() {
        let t = TemplateEngine::create_template(
            &["<button onclick=", "></button><a onmouseover=\"", "\"></a>"],
            vec![on(|_| {}), on(|_| {})],
        );
        let marker = event_marker();
        assert_eq!(
            t.source(),
            format!(r#"<button onclick={marker}></button><a onmouseover="{marker}"></a>"#)
        );
        assert_eq!(t.events().len(), 2);
        assert_eq!(t.marker_count(), 2);
    }

    #[test]
    fn test_handler_outside_event_position_is_dropped() {
        let t = TemplateEngine::create_template(&["<p>", "</p>"], vec![on(|_| {})]);
        assert_eq!(t.source(), "<p></p>");
        assert!(t.events().is_empty());
    }

    #[test]
    fn test_nested_templates_concatenate_events() {
        let item = |label: &str| {
            TemplateEngine::create_template(&["<li onclick=", ">", "</li>"], vec![on(|_| {}), label.into()])
        };
        let list = TemplateEngine::create_template(
            &["<ul>", "", "</ul>"],
            vec![Part::Templates(vec![item("a"), item("b")]), item("c").into()],
        );
        assert_eq!(list.events().len(), 3);
        assert_eq!(list.marker_count(), 3);
        assert!(list.source().starts_with(&format!("<ul><li onclick={}>a</li>", event_marker())));
    }

    #[test]
    fn test_self_closing_custom_tags_expand() {
        let out = TemplateEngine::create_template(&[r#"<my-card size="2"/><br/>"#], vec![]);
        assert_eq!(out.source(), r#"<my-card size="2"></my-card><br/>"#);
    }

    #[test]
    fn test_json_values() {
        let t = TemplateEngine::create_template(
            &["", " ", " ", " ", ""],
            vec![
                Value::Null.into(),
                serde_json::json!("s").into(),
                serde_json::json!(3.0).into(),
                serde_json::json!([1, 2]).into(),
            ],
        );
        assert_eq!(t.source(), "null s 3 [1,2]");
    }

    #[test]
    fn test_process_binds_and_strips_markers() {
        let mut tree = DomTree::new();
        let t = TemplateEngine::create_template(
            &["<div><button onclick=", ">+</button></div>"],
            vec![on(|_| {})],
        );
        let frag = TemplateEngine::process_template(&mut tree, &t).unwrap();

        let div = tree.first_child(frag).unwrap();
        let button = tree.first_child(div).unwrap();
        assert_eq!(tree.listeners(button).len(), 1);
        assert_eq!(tree.listeners(button)[0].event_type, "click");
        assert_eq!(
            HtmlSerializer::new().serialize_inner(&tree, frag),
            "<div><button>+</button></div>"
        );
    }

    #[test]
    fn test_marker_lookalike_text_is_not_a_handler_slot() {
        let mut tree = DomTree::new();
        let t = TemplateEngine::create_template(
            &["<input value=", "><button onclick=", ">x</button>"],
            vec!["{{e}}".into(), on(|_| {})],
        );
        assert_eq!(t.marker_count(), 1);

        let frag = TemplateEngine::process_template(&mut tree, &t).unwrap();
        let input = tree.first_child(frag).unwrap();
        let button = tree.next_sibling(input).unwrap();
        assert_eq!(tree.get_attribute(input, "value"), Some("{{e}}"));
        assert!(tree.listeners(input).is_empty());
        assert_eq!(tree.listeners(button).len(), 1);
        assert_eq!(tree.listeners(button)[0].event_type, "click");
    }

    #[test]
    fn test_marker_outside_event_attribute_is_left_alone() {
        let mut tree = DomTree::new();
        let source = format!(r#"<p title="{0}"></p><a onclick="{0}"></a>"#, event_marker());
        let t = Template::from_parts(source, vec![Rc::new(|_: &mut Event| {}) as EventHandler]);

        let frag = TemplateEngine::process_template(&mut tree, &t).unwrap();
        let p = tree.first_child(frag).unwrap();
        let a = tree.next_sibling(p).unwrap();
        assert_eq!(tree.get_attribute(p, "title"), Some(event_marker()));
        assert!(tree.listeners(p).is_empty());
        assert_eq!(tree.listeners(a).len(), 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "marker count")]
    fn test_marker_mismatch_asserts_in_debug() {
        let mut tree = DomTree::new();
        let t = Template::from_parts("<p></p>", vec![Rc::new(|_: &mut Event| {}) as EventHandler]);
        let _ = TemplateEngine::process_template(&mut tree, &t);
    }
}
