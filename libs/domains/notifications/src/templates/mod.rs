//! Email template rendering.
//!
//! Templates are Handlebars files loaded from a directory at startup and
//! registered under their file name (`registration.html`). A lookup without
//! an extension gets `.html` appended, so `render("registration", ..)` works.

use crate::error::{NotificationError, NotificationResult};
use handlebars::Handlebars;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Placeholder values keyed by placeholder name
pub type TemplateData = BTreeMap<String, String>;

/// Renders a named template with placeholder values.
#[cfg_attr(test, mockall::automock)]
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, name: &str, data: &TemplateData) -> NotificationResult<String>;
}

const DEFAULT_EXTENSION: &str = "html";

fn resolve_name(name: &str) -> String {
    if Path::new(name).extension().is_some() {
        name.to_string()
    } else {
        format!("{}.{}", name, DEFAULT_EXTENSION)
    }
}

/// Handlebars-backed renderer
pub struct HandlebarsRenderer {
    handlebars: Handlebars<'static>,
}

impl HandlebarsRenderer {
    /// Load every `*.html` file directly inside `dir`
    pub fn from_directory(dir: impl AsRef<Path>) -> NotificationResult<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| {
            NotificationError::Template(format!("Failed to read template directory {}: {}", dir.display(), e))
        })?;

        let mut templates = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| NotificationError::Template(format!("Failed to list templates: {}", e)))?
                .path();

            let is_html = path.extension().is_some_and(|ext| ext == DEFAULT_EXTENSION);
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !path.is_file() || !is_html {
                continue;
            }

            let source = std::fs::read_to_string(&path).map_err(|e| {
                NotificationError::Template(format!("Failed to read {}: {}", path.display(), e))
            })?;
            templates.push((file_name.to_string(), source));
        }

        let renderer = Self::from_templates(templates)?;
        info!(
            directory = %dir.display(),
            count = renderer.handlebars.get_templates().len(),
            "Loaded email templates"
        );
        Ok(renderer)
    }

    /// Register templates from `(name, source)` pairs
    pub fn from_templates<I, N, S>(templates: I) -> NotificationResult<Self>
    where
        I: IntoIterator<Item = (N, S)>,
        N: AsRef<str>,
        S: AsRef<str>,
    {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);

        for (name, source) in templates {
            let name = resolve_name(name.as_ref());
            handlebars
                .register_template_string(&name, source.as_ref())
                .map_err(|e| NotificationError::Template(format!("Failed to register {}: {}", name, e)))?;
        }

        Ok(Self { handlebars })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.handlebars.has_template(&resolve_name(name))
    }
}

impl TemplateRenderer for HandlebarsRenderer {
    fn render(&self, name: &str, data: &TemplateData) -> NotificationResult<String> {
        let name = resolve_name(name);
        if !self.handlebars.has_template(&name) {
            return Err(NotificationError::Template(format!("template not found: {}", name)));
        }

        debug!(template = %name, "Rendering template");
        Ok(self.handlebars.render(&name, data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const REGISTRATION: &str = "<p>Здравствуйте, {{DisplayName}}!</p><b>{{ConfirmationCode}}</b> ({{ExpiresIn}})";

    fn data() -> TemplateData {
        TemplateData::from([
            ("DisplayName".to_string(), "Анна".to_string()),
            ("ConfirmationCode".to_string(), "123456".to_string()),
            ("ExpiresIn".to_string(), "15 минут".to_string()),
        ])
    }

    #[test]
    fn test_render_appends_extension() {
        let renderer = HandlebarsRenderer::from_templates([("registration.html", REGISTRATION)]).unwrap();

        let html = renderer.render("registration", &data()).unwrap();
        assert!(html.contains("Здравствуйте, Анна!"));
        assert!(html.contains("<b>123456</b>"));
        assert!(html.contains("15 минут"));

        assert_eq!(renderer.render("registration.html", &data()).unwrap(), html);
    }

    #[test]
    fn test_missing_template() {
        let renderer = HandlebarsRenderer::from_templates([("registration", REGISTRATION)]).unwrap();
        assert!(renderer.has_template("registration.html"));
        assert!(matches!(
            renderer.render("welcome", &data()),
            Err(NotificationError::Template(_))
        ));
    }

    #[test]
    fn test_invalid_template_source() {
        let result = HandlebarsRenderer::from_templates([("broken", "{{#if}}")]);
        assert!(matches!(result, Err(NotificationError::Template(_))));
    }

    #[test]
    fn test_from_directory_loads_html_only() {
        let dir = std::env::temp_dir().join(format!("templates-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("registration.html"), REGISTRATION).unwrap();
        std::fs::write(dir.join("notes.txt"), "{{#if}}").unwrap();

        let renderer = HandlebarsRenderer::from_directory(&dir).unwrap();
        assert!(renderer.has_template("registration"));
        assert!(!renderer.has_template("notes.txt"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_from_missing_directory() {
        let dir = std::env::temp_dir().join(format!("missing-{}", Uuid::new_v4()));
        assert!(matches!(
            HandlebarsRenderer::from_directory(dir),
            Err(NotificationError::Template(_))
        ));
    }
}
