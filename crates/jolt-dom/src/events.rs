//! DOM Events
//!
//! Listener storage and bubbling dispatch. Handlers only see the event;
//! anything else they touch (component state) they capture themselves.

use std::fmt;
use std::rc::Rc;

use crate::{DomResult, DomTree, NodeData, NodeId};

/// Event callback
pub type EventHandler = Rc<dyn Fn(&mut Event)>;

/// Registered listener
#[derive(Clone)]
pub struct Listener {
    pub event_type: String,
    pub handler: EventHandler,
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("event_type", &self.event_type)
            .finish_non_exhaustive()
    }
}

/// Dispatched event
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub target: NodeId,
    pub current_target: NodeId,
    pub bubbles: bool,
    pub cancelable: bool,
    /// Payload carried by synthetic events (e.g. typed input)
    pub detail: Option<String>,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl Event {
    /// Bubbling, cancelable event
    pub fn new(event_type: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            target: NodeId::NONE,
            current_target: NodeId::NONE,
            bubbles: true,
            cancelable: true,
            detail: None,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// Event that only reaches its target
    pub fn non_bubbling(event_type: &str) -> Self {
        Self {
            bubbles: false,
            ..Self::new(event_type)
        }
    }

    /// Attach a payload
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Prevent default action
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    /// Stop propagation
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Check if default was prevented
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

impl DomTree {
    /// Attach a listener to a node
    pub fn add_event_listener(
        &mut self,
        id: NodeId,
        event_type: &str,
        handler: EventHandler,
    ) -> DomResult<()> {
        self.node(id)?;
        self.listeners.entry(id).or_default().push(Listener {
            event_type: event_type.to_string(),
            handler,
        });
        Ok(())
    }

    /// Listeners attached to a node
    pub fn listeners(&self, id: NodeId) -> &[Listener] {
        self.listeners.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Detach and return all listeners of a node
    pub fn take_listeners(&mut self, id: NodeId) -> Vec<Listener> {
        self.listeners.remove(&id).unwrap_or_default()
    }

    /// Replace the listeners of a node
    pub fn replace_listeners(&mut self, id: NodeId, listeners: Vec<Listener>) -> DomResult<()> {
        self.node(id)?;
        if listeners.is_empty() {
            self.listeners.remove(&id);
        } else {
            self.listeners.insert(id, listeners);
        }
        Ok(())
    }

    /// Dispatch an event at `target`, bubbling up through shadow hosts.
    ///
    /// Returns `false` if a handler prevented the default action.
    pub fn dispatch_event(&self, target: NodeId, event: &mut Event) -> DomResult<bool> {
        self.node(target)?;
        event.target = target;

        let mut path = vec![target];
        if event.bubbles {
            let mut current = target;
            while let Some(next) = self.propagation_parent(current) {
                path.push(next);
                current = next;
            }
        }

        for node in path {
            let handlers: Vec<EventHandler> = self
                .listeners(node)
                .iter()
                .filter(|l| l.event_type == event.event_type)
                .map(|l| Rc::clone(&l.handler))
                .collect();
            if handlers.is_empty() {
                continue;
            }

            event.current_target = node;
            for handler in handlers {
                handler(event);
            }
            if event.is_propagation_stopped() {
                break;
            }
        }

        tracing::trace!("dispatched {} at {}", event.event_type, target);
        Ok(!event.is_default_prevented())
    }

    fn propagation_parent(&self, id: NodeId) -> Option<NodeId> {
        let node = self.get(id)?;
        if let NodeData::ShadowRoot { host } = node.data {
            return host.option();
        }
        node.parent.option()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_event_bubbles_to_ancestors() {
        let mut tree = DomTree::new();
        let outer = tree.create_element("div");
        let inner = tree.create_element("button");
        tree.append_child(outer, inner).unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        for (id, name) in [(inner, "inner"), (outer, "outer")] {
            let log = Rc::clone(&log);
            tree.add_event_listener(id, "click", Rc::new(move |_: &mut Event| {
                log.borrow_mut().push(name);
            }))
            .unwrap();
        }

        let mut event = Event::new("click");
        assert!(tree.dispatch_event(inner, &mut event).unwrap());
        assert_eq!(*log.borrow(), vec!["inner", "outer"]);
    }

    #[test]
    fn test_stop_propagation_and_prevent_default() {
        let mut tree = DomTree::new();
        let outer = tree.create_element("div");
        let inner = tree.create_element("a");
        tree.append_child(outer, inner).unwrap();

        let reached = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&reached);
        tree.add_event_listener(outer, "click", Rc::new(move |_: &mut Event| {
            *flag.borrow_mut() = true;
        }))
        .unwrap();
        tree.add_event_listener(inner, "click", Rc::new(|e: &mut Event| {
            e.prevent_default();
            e.stop_propagation();
        }))
        .unwrap();

        let mut event = Event::new("click");
        assert!(!tree.dispatch_event(inner, &mut event).unwrap());
        assert!(!*reached.borrow());
    }

    #[test]
    fn test_event_crosses_shadow_boundary() {
        let mut tree = DomTree::new();
        let host = tree.create_element("my-widget");
        let shadow = tree.attach_shadow(host).unwrap();
        let button = tree.create_element("button");
        tree.append_child(shadow, button).unwrap();

        let hits = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&hits);
        tree.add_event_listener(host, "click", Rc::new(move |_: &mut Event| {
            *counter.borrow_mut() += 1;
        }))
        .unwrap();

        tree.dispatch_event(button, &mut Event::new("click")).unwrap();
        assert_eq!(*hits.borrow(), 1);

        tree.dispatch_event(button, &mut Event::non_bubbling("click")).unwrap();
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn test_take_listeners() {
        let mut tree = DomTree::new();
        let node = tree.create_element("div");
        tree.add_event_listener(node, "input", Rc::new(|_: &mut Event| {})).unwrap();

        let taken = tree.take_listeners(node);
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].event_type, "input");
        assert!(tree.listeners(node).is_empty());
    }
}
