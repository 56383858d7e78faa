//! Server-rendered HTML views.
//!
//! Pages are Jinja2 templates under `templates/views/` rendered with minijinja.
//! Every page extends `layout.html`, which owns the outer page container.

pub mod engine;

pub use engine::{init_views, render_view, ViewError};
