//! Component Runtime
//!
//! Drives component instances from the tree's custom-element reactions:
//!
//! - `Connected` on a registered tag constructs an instance (attributes
//!   read, render root picked), renders it, calls `did_load` and starts
//!   attribute observation.
//! - `AttributeChanged` on an observed host updates its attributes and
//!   marks it dirty.
//! - `Disconnected` tears the instance down (`will_unload`, observation
//!   stopped) unless the host was re-inserted in the meantime.
//!
//! State writes mark their instance dirty too. [`Runtime::process`] drains
//! reactions and dirty instances until nothing is pending, re-rendering
//! each dirty instance once per pass.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use jolt_dom::{DomError, DomTree, Event, LifecycleCallback, NodeId, Reaction};

use crate::component::{Attributes, Component, ComponentOptions, Definition};
use crate::config::RuntimeConfig;
use crate::observer::AttributeObserver;
use crate::reconciler::{ReconcileError, ReconcileStats, Reconciler};
use crate::registry::{ComponentRegistry, Registration, RegistryError};
use crate::state::State;
use crate::template::Template;

/// Instance lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Attributes read, render root picked, not rendered yet
    Constructed,
    /// Rendered and observing attributes
    Connected,
    /// Torn down; terminal
    Disconnected,
}

/// A live component bound to a host element
pub struct Instance {
    host: NodeId,
    root: NodeId,
    tag: String,
    attribs: Attributes,
    component: Box<dyn Component>,
    state: State,
    observer: AttributeObserver,
    lifecycle: Lifecycle,
    styles: Option<String>,
}

impl Instance {
    pub fn host(&self) -> NodeId {
        self.host
    }

    /// Shadow root, or the host itself when rendering without one
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attribs
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn uses_shadow(&self) -> bool {
        self.root != self.host
    }

    pub fn is_observing(&self) -> bool {
        self.observer.is_observing()
    }

    /// Render with the current attributes, styles appended
    fn template(&self) -> Template {
        let mut template = self.component.render(&self.attribs);
        if let Some(css) = &self.styles {
            template.push_source(&format!("<style>{}</style>", css));
        }
        template
    }

    fn paint(&self, tree: &mut DomTree) -> Result<ReconcileStats, ReconcileError> {
        Reconciler::reconcile(tree, &self.template(), self.root)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("host", &self.host)
            .field("root", &self.root)
            .field("tag", &self.tag)
            .field("attribs", &self.attribs)
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

/// Runtime errors
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("component <{0}> is not registered")]
    NotRegistered(String),

    #[error("registration rejected: {0}")]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("tree operation failed: {0}")]
    Dom(#[from] DomError),

    #[error("updates still pending after {0} flush passes")]
    FlushLimit(usize),
}

/// Component runtime: registry plus live instances
pub struct Runtime {
    config: RuntimeConfig,
    registry: ComponentRegistry,
    instances: HashMap<NodeId, Instance>,
    /// Hosts whose state changed since the last flush
    dirty: Rc<RefCell<Vec<NodeId>>>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_registry(config, ComponentRegistry::new())
    }

    pub fn with_registry(config: RuntimeConfig, registry: ComponentRegistry) -> Self {
        Self {
            config,
            registry,
            instances: HashMap::new(),
            dirty: Rc::default(),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Register a component under `options.name`.
    ///
    /// A rejected registration is logged and leaves the registry untouched.
    pub fn register(
        &mut self,
        options: impl Into<ComponentOptions>,
        definition: Definition,
    ) -> Result<(), RuntimeError> {
        let options = options.into();
        let name = options.name.clone();
        if let Err(e) = self.registry.define(options, definition) {
            tracing::error!("Failed to register <{}>: {}", name, e);
            return Err(e.into());
        }
        Ok(())
    }

    pub fn register_function(
        &mut self,
        options: impl Into<ComponentOptions>,
        render: impl Fn(&Attributes) -> Template + 'static,
    ) -> Result<(), RuntimeError> {
        self.register(options, Definition::function(render))
    }

    pub fn register_class<C, F>(
        &mut self,
        options: impl Into<ComponentOptions>,
        factory: F,
    ) -> Result<(), RuntimeError>
    where
        C: Component + 'static,
        F: Fn(State) -> C + 'static,
    {
        self.register(options, Definition::class(factory))
    }

    /// Mount a registered component into `container`.
    ///
    /// Renders `<tag></tag>` into the container and lets the connect path
    /// construct the instance. An unregistered tag mutates nothing.
    pub fn render(
        &mut self,
        tree: &mut DomTree,
        tag: &str,
        container: NodeId,
    ) -> Result<ReconcileStats, RuntimeError> {
        if !self.registry.is_defined(tag) {
            if self.config.warn_unregistered {
                tracing::warn!("Cannot render <{}>: component is not registered", tag);
            }
            return Err(RuntimeError::NotRegistered(tag.to_string()));
        }

        let template = Template::new(format!("<{0}></{0}>", tag));
        let stats = Reconciler::reconcile(tree, &template, container)?;
        self.process(tree)?;
        Ok(stats)
    }

    /// Dispatch an event, then flush the updates its handlers caused
    pub fn dispatch(
        &mut self,
        tree: &mut DomTree,
        target: NodeId,
        event: &mut Event,
    ) -> Result<bool, RuntimeError> {
        let allowed = tree.dispatch_event(target, event)?;
        self.process(tree)?;
        Ok(allowed)
    }

    /// Run pending reactions and re-renders until quiescent.
    ///
    /// Returns the number of renders performed.
    pub fn process(&mut self, tree: &mut DomTree) -> Result<usize, RuntimeError> {
        let mut renders = 0;

        for _ in 0..self.config.max_flush_passes {
            let reactions = tree.take_reactions();
            let dirty = self.take_dirty();
            if reactions.is_empty() && dirty.is_empty() {
                return Ok(renders);
            }

            for reaction in reactions {
                renders += self.react(tree, reaction)?;
            }
            for host in dirty {
                if self.rerender(tree, host)? {
                    renders += 1;
                }
            }
        }

        if !tree.has_pending_reactions() && self.dirty.borrow().is_empty() {
            return Ok(renders);
        }
        tracing::warn!(
            "Component updates did not settle within {} passes",
            self.config.max_flush_passes
        );
        Err(RuntimeError::FlushLimit(self.config.max_flush_passes))
    }

    pub fn instance(&self, host: NodeId) -> Option<&Instance> {
        self.instances.get(&host)
    }

    /// State handle of the instance hosted by `host`
    pub fn state(&self, host: NodeId) -> Option<State> {
        self.instances.get(&host).map(|i| i.state.clone())
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Dirty hosts in first-marked order, each once
    fn take_dirty(&self) -> Vec<NodeId> {
        let marked = std::mem::take(&mut *self.dirty.borrow_mut());
        let mut seen = HashSet::new();
        marked.into_iter().filter(|host| seen.insert(*host)).collect()
    }

    fn react(&mut self, tree: &mut DomTree, reaction: Reaction) -> Result<usize, RuntimeError> {
        let host = reaction.element;
        match reaction.callback {
            LifecycleCallback::Connected => self.connect(tree, host),
            LifecycleCallback::Disconnected => {
                self.disconnect(tree, host);
                Ok(0)
            }
            LifecycleCallback::AttributeChanged => {
                self.observe_attribute(&reaction);
                Ok(0)
            }
        }
    }

    fn connect(&mut self, tree: &mut DomTree, host: NodeId) -> Result<usize, RuntimeError> {
        if self.instances.contains_key(&host) || !tree.is_connected(host) {
            return Ok(0);
        }
        let Some(tag) = tree.tag_name(host).map(str::to_string) else {
            return Ok(0);
        };
        let Some(Registration { options, definition }) = self.registry.get(&tag).cloned() else {
            tracing::trace!("<{}> connected without a definition", tag);
            return Ok(0);
        };

        let use_shadow = options.use_shadow.unwrap_or(self.config.default_use_shadow);
        let root = match (use_shadow, tree.shadow_root(host)) {
            (false, _) => host,
            (true, Some(shadow)) => shadow,
            (true, None) => tree.attach_shadow(host)?,
        };
        let attribs: Attributes = tree
            .attributes(host)
            .into_iter()
            .map(|attr| (attr.name, attr.value))
            .collect();

        let dirty = Rc::clone(&self.dirty);
        let state = State::new(move |key, _| {
            tracing::trace!("state {} changed on {}", key, host);
            dirty.borrow_mut().push(host);
        });

        let mut observer = AttributeObserver::new(host);
        if let Some(names) = &options.observed_attributes {
            observer = observer.with_filter(names);
        }

        let mut instance = Instance {
            host,
            root,
            tag,
            attribs,
            component: definition.instantiate(state.clone()),
            state,
            observer,
            lifecycle: Lifecycle::Constructed,
            styles: options.stylesheet(),
        };
        tracing::debug!("Constructed <{}> at {}", instance.tag, host);

        instance.paint(tree)?;
        instance.lifecycle = Lifecycle::Connected;
        instance.component.did_load();
        instance.observer.observe();
        tracing::debug!("Connected <{}> at {}", instance.tag, host);

        self.instances.insert(host, instance);
        Ok(1)
    }

    fn disconnect(&mut self, tree: &DomTree, host: NodeId) {
        if tree.is_connected(host) {
            if self.instances.contains_key(&host) {
                tracing::debug!("{} moved, keeping its instance", host);
            }
            return;
        }
        let Some(mut instance) = self.instances.remove(&host) else {
            return;
        };

        instance.observer.disconnect();
        instance.component.will_unload();
        instance.lifecycle = Lifecycle::Disconnected;
        tracing::debug!("Disconnected <{}> at {}", instance.tag, host);
    }

    fn observe_attribute(&mut self, reaction: &Reaction) {
        let Some(instance) = self.instances.get_mut(&reaction.element) else {
            return;
        };
        instance.observer.queue(reaction);
        if !instance.observer.has_pending() {
            return;
        }

        for record in instance.observer.take_records() {
            match record.value {
                Some(value) => instance.attribs.insert(record.name, value),
                None => instance.attribs.remove(&record.name),
            };
        }
        self.dirty.borrow_mut().push(reaction.element);
    }

    fn rerender(&mut self, tree: &mut DomTree, host: NodeId) -> Result<bool, RuntimeError> {
        let Some(instance) = self.instances.get_mut(&host) else {
            return Ok(false);
        };
        if instance.lifecycle != Lifecycle::Connected || !instance.component.should_update() {
            return Ok(false);
        }

        let stats = instance.paint(tree)?;
        instance.component.did_update();
        tracing::trace!("Updated <{}>: {} mutations", instance.tag, stats.mutations());
        Ok(true)
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("instances", &self.instances.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jolt_dom::Document;

    fn hello(attrs: &Attributes) -> Template {
        let name = attrs.get("name").map_or("world", String::as_str);
        Template::new(format!("<p>hello {}</p>", name))
    }

    #[test]
    fn test_render_unregistered_mutates_nothing() {
        let mut doc = Document::default();
        let body = doc.body();
        let mut runtime = Runtime::default();

        let err = runtime.render(doc.tree_mut(), "x-missing", body).unwrap_err();
        assert!(matches!(err, RuntimeError::NotRegistered(ref tag) if tag == "x-missing"));
        assert_eq!(doc.tree().child_count(body), 0);
    }

    #[test]
    fn test_register_rejects_missing_name() {
        let mut runtime = Runtime::default();
        let err = runtime.register_function("", hello).unwrap_err();
        assert!(matches!(err, RuntimeError::Registry(RegistryError::MissingName)));
        assert!(runtime.registry().is_empty());
    }

    #[test]
    fn test_render_constructs_instance_in_shadow_root() {
        let mut doc = Document::default();
        let body = doc.body();
        let mut runtime = Runtime::default();
        runtime.register_function("x-hello", hello).unwrap();

        runtime.render(doc.tree_mut(), "x-hello", body).unwrap();

        let tree = doc.tree();
        let host = tree.first_child(body).unwrap();
        let instance = runtime.instance(host).unwrap();
        assert_eq!(instance.lifecycle(), Lifecycle::Connected);
        assert!(instance.uses_shadow());
        assert!(instance.is_observing());
        assert_eq!(tree.text_content(instance.root()), "hello world");
        assert_eq!(tree.child_count(host), 0);
    }

    #[test]
    fn test_light_dom_rendering() {
        let mut doc = Document::default();
        let body = doc.body();
        let mut runtime = Runtime::default();
        runtime
            .register_function(ComponentOptions::new("x-hello").with_shadow(false), hello)
            .unwrap();

        runtime.render(doc.tree_mut(), "x-hello", body).unwrap();
        let host = doc.tree().first_child(body).unwrap();
        assert!(doc.tree().shadow_root(host).is_none());
        assert_eq!(doc.tree().text_content(host), "hello world");
    }

    #[test]
    fn test_config_default_shadow_off() {
        let config = RuntimeConfig {
            default_use_shadow: false,
            ..RuntimeConfig::default()
        };
        let mut doc = Document::default();
        let body = doc.body();
        let mut runtime = Runtime::new(config);
        runtime.register_function("x-hello", hello).unwrap();

        runtime.render(doc.tree_mut(), "x-hello", body).unwrap();
        let host = doc.tree().first_child(body).unwrap();
        assert!(!runtime.instance(host).unwrap().uses_shadow());
    }

    #[test]
    fn test_styles_appended() {
        let mut doc = Document::default();
        let body = doc.body();
        let mut runtime = Runtime::default();
        runtime
            .register_function(ComponentOptions::new("x-hello").with_style("p{margin:0}"), hello)
            .unwrap();

        runtime.render(doc.tree_mut(), "x-hello", body).unwrap();
        let host = doc.tree().first_child(body).unwrap();
        let root = runtime.instance(host).unwrap().root();
        let style = doc.tree().last_child(root).unwrap();
        assert_eq!(doc.tree().tag_name(style), Some("style"));
        assert_eq!(doc.tree().text_content(style), "p{margin:0}");
    }

    #[test]
    fn test_detached_container_does_not_connect() {
        let mut tree = DomTree::new();
        let container = tree.create_element("div");
        let mut runtime = Runtime::default();
        runtime.register_function("x-hello", hello).unwrap();

        runtime.render(&mut tree, "x-hello", container).unwrap();
        assert_eq!(tree.child_count(container), 1);
        assert_eq!(runtime.instance_count(), 0);
    }
}
