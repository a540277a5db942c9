//! Components
//!
//! A component renders its attributes to a [`Template`] and may react to
//! lifecycle transitions. Class components implement [`Component`]
//! directly and receive their instance's [`State`] at construction;
//! function components are plain render functions wrapped in
//! [`FunctionComponent`], whose hooks are all no-ops.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::state::State;
use crate::template::Template;

/// Attribute name to value, as read from the host element
pub type Attributes = BTreeMap<String, String>;

/// Render function of a function component
pub type RenderFn = Rc<dyn Fn(&Attributes) -> Template>;

/// Factory of a class component
pub type ComponentFactory = Rc<dyn Fn(State) -> Box<dyn Component>>;

/// Renderable with lifecycle hooks
pub trait Component {
    /// Produce the markup for the current attributes
    fn render(&self, attributes: &Attributes) -> Template;

    /// After the first render into a connected host
    fn did_load(&mut self) {}

    /// After every re-render
    fn did_update(&mut self) {}

    /// Gate for re-renders triggered by state or attribute changes
    fn should_update(&self) -> bool {
        true
    }

    /// Before the instance is dropped on disconnect
    fn will_unload(&mut self) {}
}

/// Adapter giving a render function the [`Component`] interface
pub struct FunctionComponent {
    render: RenderFn,
}

impl FunctionComponent {
    pub fn new(render: RenderFn) -> Self {
        Self { render }
    }
}

impl Component for FunctionComponent {
    fn render(&self, attributes: &Attributes) -> Template {
        (self.render)(attributes)
    }
}

/// How instances of a registered tag are created
#[derive(Clone)]
pub enum Definition {
    Function(RenderFn),
    Class(ComponentFactory),
}

impl Definition {
    pub fn function(render: impl Fn(&Attributes) -> Template + 'static) -> Self {
        Definition::Function(Rc::new(render))
    }

    pub fn class<C, F>(factory: F) -> Self
    where
        C: Component + 'static,
        F: Fn(State) -> C + 'static,
    {
        Definition::Class(Rc::new(move |state| Box::new(factory(state)) as Box<dyn Component>))
    }

    /// Build a component for a new instance
    pub fn instantiate(&self, state: State) -> Box<dyn Component> {
        match self {
            Definition::Function(render) => Box::new(FunctionComponent::new(Rc::clone(render))),
            Definition::Class(factory) => factory(state),
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Definition::Function(_))
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Function(_) => f.write_str("Definition::Function"),
            Definition::Class(_) => f.write_str("Definition::Class"),
        }
    }
}

/// Registration options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentOptions {
    /// Custom element tag
    pub name: String,
    /// Render into a shadow root; `None` uses the runtime default
    pub use_shadow: Option<bool>,
    /// Stylesheets appended to every render
    pub styles: Vec<String>,
    /// Attributes whose changes re-render; `None` observes all of them
    pub observed_attributes: Option<Vec<String>>,
}

impl ComponentOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_shadow(mut self, use_shadow: bool) -> Self {
        self.use_shadow = Some(use_shadow);
        self
    }

    pub fn with_style(mut self, css: impl Into<String>) -> Self {
        self.styles.push(css.into());
        self
    }

    pub fn with_observed_attributes(mut self, names: &[&str]) -> Self {
        self.observed_attributes = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    /// Concatenated stylesheet, if any
    pub fn stylesheet(&self) -> Option<String> {
        (!self.styles.is_empty()).then(|| self.styles.concat())
    }
}

impl From<&str> for ComponentOptions {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ComponentOptions {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counter {
        state: State,
        loads: Rc<Cell<u32>>,
    }

    impl Component for Counter {
        fn render(&self, _: &Attributes) -> Template {
            let count = self.state.get("count").unwrap_or_default();
            Template::new(format!("<p>{}</p>", count))
        }

        fn did_load(&mut self) {
            self.loads.set(self.loads.get() + 1);
        }
    }

    #[test]
    fn test_function_component_renders_attributes() {
        let definition = Definition::function(|attrs: &Attributes| {
            Template::new(format!("<b>{}</b>", attrs.get("name").map_or("", String::as_str)))
        });
        assert!(definition.is_function());

        let mut component = definition.instantiate(State::new(|_, _| {}));
        let mut attrs = Attributes::new();
        attrs.insert("name".into(), "ada".into());
        assert_eq!(component.render(&attrs).source(), "<b>ada</b>");

        // Default hooks
        component.did_load();
        assert!(component.should_update());
    }

    #[test]
    fn test_class_component_receives_state() {
        let loads = Rc::new(Cell::new(0));
        let shared = Rc::clone(&loads);
        let definition = Definition::class(move |state: State| {
            state.set("count", 3);
            Counter {
                state,
                loads: Rc::clone(&shared),
            }
        });

        let mut component = definition.instantiate(State::new(|_, _| {}));
        assert_eq!(component.render(&Attributes::new()).source(), "<p>3</p>");
        component.did_load();
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn test_options() {
        let options = ComponentOptions::from("my-card")
            .with_shadow(false)
            .with_style("p{color:red}")
            .with_style("b{margin:0}");
        assert_eq!(options.name, "my-card");
        assert_eq!(options.use_shadow, Some(false));
        assert_eq!(options.stylesheet().as_deref(), Some("p{color:red}b{margin:0}"));
        assert_eq!(ComponentOptions::new("x-y").stylesheet(), None);
    }
}
