//! Template composition.
//!
//! A page is produced by walking a copy of its template's markup tree once,
//! depth-first in document order, and rewriting it in place:
//!
//! | Node                                   | Action                                      |
//! |----------------------------------------|---------------------------------------------|
//! | sealed node                            | skipped with its whole subtree              |
//! | text containing `{{ $content }}`       | content spliced in (first match only)       |
//! | text containing `{{ $title }}`         | token replaced by the escaped title         |
//! | `<tags>` element (any case)            | replaced by the page's tag list             |
//! | element named like a component         | replaced by the component, then walked      |
//! | anything else                          | children walked                             |
//!
//! Spliced content and tag lists are sealed, so the walk never treats final
//! output as template markup.
//!
//! # Tag list
//!
//! ```text
//! components/Tags.html:   <ul class="tags">{{ $tags }}</ul>
//! page tags [go, infra]:  <ul class="tags"><li><a href="/tags/go">go</a></li>
//!                                          <li><a href="/tags/infra">infra</a></li></ul>
//! ```

use crate::{
    compiler::ContentRecord,
    error::{SiteError, SiteResult},
    log,
    logger::Sink,
    markup::{Element, Markup, NodeData, NodeId},
    registry::{DependencyRecord, Registries},
    utils::slug::is_safe_segment,
};
use quick_xml::escape::escape;
use rustc_hash::FxHashMap;
use std::path::Path;

pub const CONTENT_TOKEN: &str = "{{ $content }}";
pub const TITLE_TOKEN: &str = "{{ $title }}";
pub const TAGS_TOKEN: &str = "{{ $tags }}";

/// Element (and component) name of the tag-list injection point.
const TAGS_ELEMENT: &str = "tags";

/// Title, route and tags a page is composed with.
#[derive(Debug, Clone, Copy)]
pub struct PageInfo<'a> {
    pub title: &'a str,
    pub route: &'a str,
    pub tags: &'a [String],
}

impl<'a> From<&'a ContentRecord> for PageInfo<'a> {
    fn from(record: &'a ContentRecord) -> Self {
        Self {
            title: &record.title,
            route: &record.route,
            tags: &record.tags,
        }
    }
}

/// Snapshot of the template and component registries for one pass.
pub struct Composer {
    templates: FxHashMap<String, DependencyRecord>,
    components: FxHashMap<String, DependencyRecord>,
    sink: Sink,
}

/// Mutable state of one composition walk.
struct Walk<'a> {
    page: PageInfo<'a>,
    origin: &'a Path,
    /// Content fragment, taken by the first `{{ $content }}`.
    content: Option<NodeId>,
    /// Built on the first `<tags>` element, reused after.
    tag_list: Option<Markup>,
    /// Components currently being expanded, outermost first.
    chain: Vec<String>,
}

/// Key records by name. On a clash the first path in sorted order wins.
fn by_name(
    mut records: Vec<DependencyRecord>,
    kind: &str,
    sink: &Sink,
) -> FxHashMap<String, DependencyRecord> {
    records.sort_by(|a, b| a.path().cmp(b.path()));
    let mut named: FxHashMap<String, DependencyRecord> = FxHashMap::default();
    for record in records {
        if let Some(existing) = named.get(&record.name) {
            log!(sink => "compose"; "{kind} `{}` defined twice, using {}", record.name, existing.path().display());
            continue;
        }
        named.insert(record.name.clone(), record);
    }
    named
}

impl Composer {
    pub fn new(registries: &Registries, sink: Sink) -> Self {
        let templates = by_name(registries.templates.values(), "template", &sink);
        let components = by_name(registries.components.values(), "component", &sink);
        Self {
            templates,
            components,
            sink,
        }
    }

    pub fn template(&self, name: &str) -> Option<&DependencyRecord> {
        self.templates.get(name)
    }

    /// Compose a content record against the template named in its front matter.
    pub fn compose_record(&self, record: &ContentRecord) -> SiteResult<String> {
        let origin = record.path();
        let name = record
            .template_name()
            .ok_or_else(|| SiteError::MissingTemplateKey {
                path: origin.to_path_buf(),
            })?;
        let template = self
            .template(name)
            .ok_or_else(|| SiteError::MissingTemplate {
                path: origin.to_path_buf(),
                name: name.to_owned(),
            })?
            .tree()?;

        let empty = Markup::new();
        let content = record.source.tree().unwrap_or(&empty);
        self.compose(template, content, PageInfo::from(record), origin)
    }

    /// Compose `content` into `template`. `origin` names the page in errors.
    pub fn compose(
        &self,
        template: &Markup,
        content: &Markup,
        page: PageInfo<'_>,
        origin: &Path,
    ) -> SiteResult<String> {
        let mut doc = template.clone();
        let content = doc.adopt(content);

        let mut walk = Walk {
            page,
            origin,
            content: Some(content),
            tag_list: None,
            chain: Vec::new(),
        };
        let root = doc.root();
        self.visit(&mut doc, root, &mut walk)?;

        Ok(doc.serialize())
    }

    fn visit(&self, doc: &mut Markup, id: NodeId, walk: &mut Walk<'_>) -> SiteResult<()> {
        if doc.is_sealed(id) {
            return Ok(());
        }

        match doc.get(id) {
            NodeData::Text(text) => {
                let text = text.clone();
                self.visit_text(doc, id, &text, walk);
                Ok(())
            }
            NodeData::Element(element) if element.is_named(TAGS_ELEMENT) => {
                self.expand_tags(doc, id, walk)
            }
            NodeData::Element(element)
                if self.components.contains_key(&element.name.to_ascii_lowercase()) =>
            {
                let name = element.name.to_ascii_lowercase();
                self.expand_component(doc, id, name, walk)
            }
            NodeData::Element(_) | NodeData::Fragment => {
                for child in doc.children(id) {
                    self.visit(doc, child, walk)?;
                }
                Ok(())
            }
            NodeData::Doctype(_) | NodeData::Comment(_) | NodeData::Raw(_) => Ok(()),
        }
    }

    fn visit_text(&self, doc: &mut Markup, id: NodeId, text: &str, walk: &mut Walk<'_>) {
        if text.contains(CONTENT_TOKEN)
            && let Some(content) = walk.content.take()
            && let Some((before, after)) = text.split_once(CONTENT_TOKEN)
        {
            let before = self.substitute_title(before, walk.page);
            let after = self.substitute_title(after, walk.page);

            let moved = doc.splice_after(id, content);
            for &node in &moved {
                doc.seal(node);
            }
            if !after.is_empty() {
                let tail = doc.create(NodeData::Text(after));
                doc.insert_after(moved.last().copied().unwrap_or(id), tail);
                doc.seal(tail);
            }
            if before.is_empty() {
                doc.detach(id);
            } else {
                *doc.get_mut(id) = NodeData::Text(before);
            }
            return;
        }

        if text.contains(TITLE_TOKEN) {
            *doc.get_mut(id) = NodeData::Text(self.substitute_title(text, walk.page));
        }
    }

    fn substitute_title(&self, text: &str, page: PageInfo<'_>) -> String {
        if text.contains(TITLE_TOKEN) {
            text.replace(TITLE_TOKEN, &escape(page.title))
        } else {
            text.to_owned()
        }
    }

    fn expand_tags(&self, doc: &mut Markup, id: NodeId, walk: &mut Walk<'_>) -> SiteResult<()> {
        let list = match walk.tag_list.take() {
            Some(list) => list,
            None => self.tag_list(walk.page.tags, walk.origin)?,
        };

        let fragment = doc.adopt(&list);
        for node in doc.replace_with_children(id, fragment) {
            doc.seal(node);
        }

        walk.tag_list = Some(list);
        Ok(())
    }

    /// The `tags` component with one list item per tag at its `{{ $tags }}` token.
    fn tag_list(&self, tags: &[String], origin: &Path) -> SiteResult<Markup> {
        let component =
            self.components
                .get(TAGS_ELEMENT)
                .ok_or_else(|| SiteError::MissingComponent {
                    path: origin.to_path_buf(),
                    name: TAGS_ELEMENT.to_owned(),
                })?;
        let mut list = component.tree()?.clone();

        let Some(token) = list.find_text(TAGS_TOKEN) else {
            log!(self.sink => "compose"; "{} has no {TAGS_TOKEN} token, tag list left empty", component.path().display());
            return Ok(list);
        };

        let text = match list.get(token) {
            NodeData::Text(text) => text.clone(),
            _ => String::new(),
        };
        let (before, after) = text.split_once(TAGS_TOKEN).unwrap_or((text.as_str(), ""));

        let mut items = Markup::new();
        let root = items.root();
        for tag in tags {
            // the tag indexer writes no page for these
            if !is_safe_segment(tag) {
                log!(self.sink => "compose"; "{}: tag `{tag}` is not a valid path segment, not linked", origin.display());
                continue;
            }
            let li = items.append_element(root, Element::new("li"));
            let href = format!("/tags/{tag}");
            let a = items.append_element(li, Element::new("a").with_attr("href", escape(&href)));
            items.append_text(a, escape(tag));
        }
        if !after.is_empty() {
            items.append_text(root, after);
        }

        let fragment = list.adopt(&items);
        list.splice_after(token, fragment);
        if before.is_empty() {
            list.detach(token);
        } else {
            *list.get_mut(token) = NodeData::Text(before.to_owned());
        }

        Ok(list)
    }

    fn expand_component(
        &self,
        doc: &mut Markup,
        id: NodeId,
        name: String,
        walk: &mut Walk<'_>,
    ) -> SiteResult<()> {
        if walk.chain.contains(&name) {
            return Err(SiteError::RecursiveComponent {
                path: walk.origin.to_path_buf(),
                name,
            });
        }
        let Some(component) = self.components.get(&name) else {
            return Ok(());
        };

        let fragment = doc.adopt(component.tree()?);
        let inserted = doc.replace_with_children(id, fragment);

        walk.chain.push(name);
        let result = inserted
            .into_iter()
            .try_for_each(|node| self.visit(doc, node, walk));
        walk.chain.pop();
        result
    }
}
