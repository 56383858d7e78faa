use minijinja::{Environment, Value};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

use crate::core::config::ViewsConfig;
use crate::core::error::AppError;

/// Global view environment
static VIEW_ENV: OnceLock<Environment<'static>> = OnceLock::new();

const DEFAULT_SITE_NAME: &str = "Resource Portal";

/// Errors that can occur while rendering a page
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("View '{0}' not found")]
    NotFound(String),

    #[error("Failed to render view: {0}")]
    RenderError(String),
}

impl From<ViewError> for AppError {
    fn from(e: ViewError) -> Self {
        AppError::Internal(e.to_string())
    }
}

/// Resolve the template directory.
///
/// Relative paths are tried from the working directory first, then from the crate root
/// so tests and `cargo run` from another directory still find the bundled templates.
fn resolve_template_dir(dir: &str) -> PathBuf {
    let path = PathBuf::from(dir);
    if path.is_absolute() || path.exists() {
        return path;
    }
    Path::new(env!("CARGO_MANIFEST_DIR")).join(dir)
}

fn build_environment(template_dir: &str, site_name: &str) -> Environment<'static> {
    let mut env = Environment::new();
    env.add_global("site_name", Value::from(site_name.to_string()));

    let template_path = resolve_template_dir(template_dir);
    if template_path.exists() {
        load_templates_recursive(&mut env, &template_path, &template_path);
    } else {
        tracing::warn!(
            "View template directory '{}' does not exist",
            template_path.display()
        );
    }

    env
}

/// Recursively load all .html templates from a directory
fn load_templates_recursive(env: &mut Environment<'static>, base_path: &Path, current_path: &Path) {
    let Ok(entries) = std::fs::read_dir(current_path) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            load_templates_recursive(env, base_path, &path);
            continue;
        }
        if !path.extension().is_some_and(|ext| ext == "html") {
            continue;
        }

        let Ok(relative) = path.strip_prefix(base_path) else {
            continue;
        };
        // Template names always use forward slashes
        let template_name = relative.to_string_lossy().replace('\\', "/");
        let Ok(content) = std::fs::read_to_string(&path) else {
            tracing::warn!("Failed to read view template {}", path.display());
            continue;
        };

        // Templates live for the whole process
        let static_name: &'static str = Box::leak(template_name.clone().into_boxed_str());
        let static_content: &'static str = Box::leak(content.into_boxed_str());
        match env.add_template(static_name, static_content) {
            Ok(()) => tracing::debug!("Loaded view: {}", template_name),
            Err(e) => tracing::warn!("Failed to load view {}: {}", template_name, e),
        }
    }
}

/// Initialize the global view environment from configuration.
///
/// Calling it more than once keeps the first environment.
pub fn init_views(config: &ViewsConfig) {
    let env = build_environment(&config.template_dir, &config.site_name);
    if VIEW_ENV.set(env).is_err() {
        tracing::warn!("View environment already initialized");
    }
}

fn get_environment() -> &'static Environment<'static> {
    VIEW_ENV.get_or_init(|| {
        build_environment(ViewsConfig::DEFAULT_TEMPLATE_DIR, DEFAULT_SITE_NAME)
    })
}

/// Render a view with the given context.
///
/// # Example
/// ```ignore
/// let html = render_view("survey/page.html", minijinja::context! { submitted => true })?;
/// ```
pub fn render_view(view_name: &str, ctx: Value) -> Result<String, ViewError> {
    let template = get_environment()
        .get_template(view_name)
        .map_err(|_| ViewError::NotFound(view_name.to_string()))?;

    template
        .render(ctx)
        .map_err(|e| ViewError::RenderError(e.to_string()))
}
