//! Content file → [`ContentRecord`].

use super::{
    front_matter::{self, FrontMatter},
    markdown::MarkdownRenderer,
    route,
};
use crate::{
    config::MarkdownConfig,
    error::{SiteError, SiteResult},
    log,
    logger::Sink,
    markup::Markup,
    registry::Store,
    source::{SourceFile, SourceKind},
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

/// Everything the pipeline knows about one content file.
#[derive(Debug, Clone)]
pub struct ContentRecord {
    pub title: String,
    /// Site path such as `/blog/post/`.
    pub route: String,
    pub description: String,
    /// Ordered, without duplicates.
    pub tags: Vec<String>,
    /// `publish: true` in the front matter.
    pub published: bool,
    pub front_matter: FrontMatter,
    /// Raw file plus the rendered body tree (only set when published).
    pub source: SourceFile,
}

impl ContentRecord {
    #[inline]
    pub fn path(&self) -> &Path {
        &self.source.path
    }

    /// Name of the template from the `template` key.
    pub fn template_name(&self) -> Option<&str> {
        self.front_matter
            .get_str("template")
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Text used when linking to this record.
    pub fn link_text(&self) -> &str {
        if self.title.is_empty() {
            &self.route
        } else {
            &self.title
        }
    }

    pub fn output_path(&self, output: &Path) -> PathBuf {
        route::output_path(output, &self.route)
    }
}

/// Reads, parses and renders content files into the content registry.
pub struct ContentCompiler {
    root: PathBuf,
    renderer: MarkdownRenderer,
    registry: Arc<dyn Store<ContentRecord>>,
    sink: Sink,
}

impl ContentCompiler {
    pub fn new(
        root: &Path,
        markdown: &MarkdownConfig,
        registry: Arc<dyn Store<ContentRecord>>,
        sink: Sink,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            renderer: MarkdownRenderer::new(markdown, &sink),
            registry,
            sink,
        }
    }

    /// Compile one content file and register the result under its path.
    ///
    /// Unpublished files are registered too, without a rendered body.
    pub fn compile(&self, path: &Path) -> SiteResult<ContentRecord> {
        let mut source = SourceFile::read(SourceKind::Content, path)?;
        let text = source.text()?.to_owned();
        let (front_matter, body) = front_matter::parse(path, &text)?;

        let tags = front_matter.tags().unwrap_or_else(|reason| {
            log!(self.sink => "content"; "{}: {reason}, ignoring tags", self.relative(path));
            Vec::new()
        });
        let route = route::route_for(&self.root, path)?;
        let published = front_matter.is_published();

        if published {
            let html = self.renderer.render(body);
            let tree = Markup::parse(&html).map_err(|err| SiteError::Markup {
                path: path.to_path_buf(),
                position: err.position,
                message: err.message,
            })?;
            source.attach_tree(tree);
        }

        let record = ContentRecord {
            title: front_matter.get_str("title").unwrap_or_default().to_owned(),
            description: front_matter
                .get_str("description")
                .unwrap_or_default()
                .to_owned(),
            route,
            tags,
            published,
            front_matter,
            source,
        };

        self.registry.set(path.to_path_buf(), record.clone());
        Ok(record)
    }

    fn relative<'a>(&self, path: &'a Path) -> std::borrow::Cow<'a, str> {
        path.strip_prefix(&self.root).unwrap_or(path).to_string_lossy()
    }
}
