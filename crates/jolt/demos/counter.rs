//! Example: a counter component driven by clicks
//!
//! Run with `RUST_LOG=jolt=debug` to watch the lifecycle.

use jolt::{html, on, Attributes, Component, Document, Event, Runtime, RuntimeConfig, State, Template};
use jolt_html::HtmlSerializer;
use serde_json::json;
use tracing_subscriber::EnvFilter;

struct Counter {
    state: State,
}

impl Component for Counter {
    fn render(&self, attributes: &Attributes) -> Template {
        let count = self.state.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
        let state = self.state.clone();
        html!(
            "<h1>{}</h1><p>clicked {} times</p><button id=\"inc\" onclick={}>+1</button>",
            attributes.get("title").map_or("Counter", String::as_str),
            count,
            on(move |_| {
                state.update("count", |v| json!(v.as_i64().unwrap_or(0) + 1));
            })
        )
    }

    fn did_load(&mut self) {
        tracing::info!("counter mounted");
    }

    fn did_update(&mut self) {
        tracing::info!("counter now {}", self.state.get("count").unwrap_or_default());
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = RuntimeConfig::from_json(r#"{ "default_use_shadow": false }"#)?;
    let mut runtime = Runtime::new(config);
    runtime.register_class("x-counter", |state: State| {
        state.set("count", 0);
        Counter { state }
    })?;

    let mut doc = Document::default();
    let body = doc.body();
    runtime.render(doc.tree_mut(), "x-counter", body)?;

    let button = doc
        .get_element_by_id("inc")
        .ok_or_else(|| anyhow::anyhow!("button was not rendered"))?;
    for _ in 0..3 {
        runtime.dispatch(doc.tree_mut(), button, &mut Event::new("click"))?;
    }

    println!("jolt v{}", jolt::VERSION);
    println!("{}", HtmlSerializer::new().serialize_inner(doc.tree(), body));
    Ok(())
}
