//! Static site templates.
//!
//! A template directory holds small text files ("views"). Rendering expands
//! `@loop{name} ... @endloop` blocks, substitutes `{{ key }}` tokens and
//! splices `@include{view}` references, then keeps only the views marked
//! for export. Every other view is only an include source.

mod resolve;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::GoCalResult;

pub use resolve::{Context, expand_loops, resolve_includes, substitute_variables};

/// One template file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    /// Filename without extension.
    pub name: String,
    pub contents: String,
    /// True only for final output targets (e.g. the index page).
    pub should_export: bool,
}

impl View {
    pub fn new(name: &str, contents: &str, should_export: bool) -> Self {
        View {
            name: name.to_string(),
            contents: contents.to_string(),
            should_export,
        }
    }

    /// Output filename for an exported view.
    pub fn output_filename(&self) -> String {
        format!("{}.html", self.name)
    }
}

/// A loaded set of views, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ViewSet {
    views: BTreeMap<String, View>,
}

impl ViewSet {
    pub fn from_views(views: impl IntoIterator<Item = View>) -> Self {
        ViewSet {
            views: views.into_iter().map(|v| (v.name.clone(), v)).collect(),
        }
    }

    /// Load every file below `dir`, recursively. A file's name without its
    /// extension is its view name; later files win on duplicate names.
    pub fn load(dir: &Path, export_views: &[String]) -> GoCalResult<Self> {
        let mut paths = Vec::new();
        collect_files(dir, &mut paths)?;
        paths.sort();

        let mut views = BTreeMap::new();
        for path in paths {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let contents = std::fs::read_to_string(&path)?;
            let should_export = export_views.iter().any(|v| v == name);
            views.insert(name.to_string(), View::new(name, &contents, should_export));
        }

        for target in export_views {
            if !views.contains_key(target) {
                tracing::warn!(view = %target, dir = %dir.display(), "export view has no template");
            }
        }

        tracing::debug!(views = views.len(), dir = %dir.display(), "loaded views");
        Ok(ViewSet { views })
    }

    pub fn get(&self, name: &str) -> Option<&View> {
        self.views.get(name)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Resolve every view against `context` and return the exported ones,
    /// sorted by name.
    pub fn render(&self, context: &Context) -> GoCalResult<Vec<View>> {
        let mut expanded = BTreeMap::new();

        for view in self.views.values() {
            let contents = expand_loops(&view.name, &view.contents, context)?;
            let contents = substitute_variables(&contents, context);
            expanded.insert(view.name.clone(), contents);
        }

        let resolved = resolve_includes(&expanded)?;

        Ok(self
            .views
            .values()
            .filter(|view| view.should_export)
            .map(|view| View {
                name: view.name.clone(),
                contents: resolved[&view.name].clone(),
                should_export: true,
            })
            .collect())
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> GoCalResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}
