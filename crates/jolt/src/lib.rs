//! Jolt - minimal component framework
//!
//! Templates compile to markup plus ordered event handlers, the reconciler
//! patches a live tree towards each new render in place, and reactive state
//! marks components for re-rendering when written.
//!
//! ```ignore
//! let mut doc = Document::default();
//! let body = doc.body();
//! jolt::render(doc.tree_mut(), &jolt::html!("<h1>{}</h1>", "Hi"), body)?;
//! ```

pub mod component;
pub mod config;
pub mod observer;
pub mod reconciler;
pub mod registry;
pub mod runtime;
pub mod state;
pub mod template;

pub use component::{Attributes, Component, ComponentOptions, Definition, FunctionComponent};
pub use config::{ConfigError, RuntimeConfig};
pub use observer::{AttributeObserver, AttributeRecord};
pub use reconciler::{ReconcileError, ReconcileStats, Reconciler};
pub use registry::{ComponentRegistry, Registration, RegistryError};
pub use runtime::{Instance, Lifecycle, Runtime, RuntimeError};
pub use state::{create_state, State, StateList, StateRecord, Write};
pub use template::{on, Part, Template, TemplateEngine, TemplateError, event_marker};

pub use jolt_dom as dom;
pub use jolt_dom::{Document, DomTree, Event, NodeId};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build a template from literal pieces and interpolated values.
///
/// `values[i]` is spliced after `strings[i]`.
pub fn html<S: AsRef<str>>(strings: &[S], values: Vec<Part>) -> Template {
    TemplateEngine::create_template(strings, values)
}

/// Reconcile `template` into `container`
pub fn render(
    tree: &mut DomTree,
    template: &Template,
    container: NodeId,
) -> Result<ReconcileStats, ReconcileError> {
    Reconciler::reconcile(tree, template, container)
}

/// Template literal: each `{}` in the literal is one interpolation slot.
///
/// Values go through [`Part::from`], so strings, numbers, `Option`s,
/// templates, `Vec<Template>` and [`on`] handlers can all be interpolated.
///
/// ```ignore
/// let list = html!("<ul>{}</ul>", items.iter().map(|i| html!("<li>{}</li>", i)).collect::<Vec<_>>());
/// let button = html!("<button onclick={}>+</button>", on(|_| {}));
/// ```
#[macro_export]
macro_rules! html {
    ($literal:literal $(, $value:expr)* $(,)?) => {
        $crate::html(
            &$crate::template::split_literal($literal),
            vec![$($crate::Part::from($value)),*],
        )
    };
}
