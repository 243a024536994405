//! Process-lifetime storage of labeled templates.

use crate::image::io::load_with_transparency;
use crate::template::Template;
use std::path::Path;

/// Read-only, insertion-ordered set of templates keyed by label.
#[derive(Debug, Default)]
pub struct TemplateStore {
    templates: Vec<Template>,
}

impl TemplateStore {
    /// Loads every `(label, path)` entry, skipping files that cannot be read.
    ///
    /// A missing or undecodable file is logged as a warning and its label is
    /// left out of the store. Matching order follows the entry order; a
    /// repeated label replaces the earlier image but keeps its position.
    pub fn load<I, L, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (L, P)>,
        L: Into<String>,
        P: AsRef<Path>,
    {
        let mut store = Self::default();
        for (label, path) in entries {
            let label: String = label.into();
            let path = path.as_ref();
            let loaded = load_with_transparency(path)
                .and_then(|(color, alpha)| Template::new(label.as_str(), color, alpha));
            match loaded {
                Ok(template) => {
                    tracing::debug!(
                        label = %label,
                        width = template.width(),
                        height = template.height(),
                        masked = template.has_transparency(),
                        "template loaded"
                    );
                    store.insert(template);
                }
                Err(err) => {
                    tracing::warn!(
                        label = %label,
                        path = %path.display(),
                        error = %err,
                        "template not found or unreadable; label excluded"
                    );
                }
            }
        }
        store
    }

    /// Builds a store from in-memory templates.
    pub fn from_templates(templates: impl IntoIterator<Item = Template>) -> Self {
        let mut store = Self::default();
        for template in templates {
            store.insert(template);
        }
        store
    }

    fn insert(&mut self, template: Template) {
        if template.is_degenerate() {
            tracing::warn!(
                label = %template.label(),
                "template has no usable contrast and will never match"
            );
        }
        match self
            .templates
            .iter_mut()
            .find(|t| t.label() == template.label())
        {
            Some(slot) => *slot = template,
            None => self.templates.push(template),
        }
    }

    /// Returns the template for `label`.
    pub fn get(&self, label: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.label() == label)
    }

    /// Iterates templates in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Template> {
        self.templates.iter()
    }

    /// Returns the templates in insertion order.
    pub fn as_slice(&self) -> &[Template] {
        &self.templates
    }

    /// Returns the labels in insertion order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(Template::label)
    }

    /// Returns the number of loaded templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns true when no template was loaded.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl<'a> IntoIterator for &'a TemplateStore {
    type Item = &'a Template;
    type IntoIter = std::slice::Iter<'a, Template>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
