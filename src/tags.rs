//! Tag index pages.
//!
//! After a content pass every published record is grouped by tag and two
//! kinds of pages are composed:
//!
//! ```text
//! /tags/            _tags.html            <ul><li><a href="/tags/go">go (2)</a></li>…</ul>
//! /tags/<tag>/      _individual_tag.html  <ul><li><a href="/blog/post/">Post</a></li>…</ul>
//! ```
//!
//! Tags are emitted in lexicographic order and the records of one tag in
//! route order, so output never depends on registry iteration order.

use crate::{
    compiler::{
        ContentRecord,
        assets::write_file,
        route::output_path,
    },
    compose::{CONTENT_TOKEN, Composer, PageInfo},
    error::{SiteError, SiteResult},
    log,
    logger::Sink,
    markup::{Element, Markup},
    utils::slug::is_safe_segment,
};
use quick_xml::escape::escape;
use rayon::prelude::*;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

pub const TAGS_TEMPLATE: &str = "_tags";
pub const TAG_TEMPLATE: &str = "_individual_tag";
pub const TAGS_ROUTE: &str = "/tags/";

/// Published records grouped by tag, each group sorted by route.
pub type TagIndex<'a> = BTreeMap<String, Vec<&'a ContentRecord>>;

/// Outcome of one tag pass.
#[derive(Debug, Default)]
pub struct TagReport {
    /// Pages written, including `/tags/`.
    pub written: usize,
    /// Stale `/tags/<tag>/` directories removed.
    pub removed: usize,
    pub failures: Vec<SiteError>,
}

/// Group published records by tag. Tags that cannot be a directory name are skipped.
pub fn group<'a>(records: &'a [ContentRecord], sink: &Sink) -> TagIndex<'a> {
    let mut index: TagIndex<'a> = BTreeMap::new();

    for record in records.iter().filter(|record| record.published) {
        for tag in &record.tags {
            if !is_safe_segment(tag) {
                log!(sink => "tags"; "{}: tag `{tag}` is not a valid path segment, skipping", record.path().display());
                continue;
            }
            index.entry(tag.clone()).or_default().push(record);
        }
    }

    for members in index.values_mut() {
        members.sort_by(|a, b| a.route.cmp(&b.route));
    }
    index
}

pub struct TagIndexer<'a> {
    composer: &'a Composer,
    output: &'a Path,
    sink: &'a Sink,
}

impl<'a> TagIndexer<'a> {
    pub fn new(composer: &'a Composer, output: &'a Path, sink: &'a Sink) -> Self {
        Self {
            composer,
            output,
            sink,
        }
    }

    /// Rebuild `/tags/` and every `/tags/<tag>/` page from `records`.
    pub fn run(&self, records: &[ContentRecord]) -> TagReport {
        let index = group(records, self.sink);
        let mut report = TagReport::default();

        let listing = tag_listing(&index);
        let page = PageInfo {
            title: "tags",
            route: TAGS_ROUTE,
            tags: &[],
        };
        match self.write_page(TAGS_TEMPLATE, &listing, page) {
            Ok(()) => report.written += 1,
            Err(err) => report.failures.push(err),
        }

        let results: Vec<SiteResult<()>> = index
            .par_iter()
            .map(|(tag, members)| {
                let route = tag_route(tag);
                let page = PageInfo {
                    title: tag,
                    route: &route,
                    tags: &[],
                };
                self.write_page(TAG_TEMPLATE, &member_listing(members), page)
            })
            .collect();
        for result in results {
            match result {
                Ok(()) => report.written += 1,
                Err(err) => report.failures.push(err),
            }
        }

        match self.prune(&index) {
            Ok(removed) => report.removed = removed,
            Err(err) => report.failures.push(err),
        }

        report
    }

    fn write_page(&self, template: &str, listing: &Markup, page: PageInfo<'_>) -> SiteResult<()> {
        let target = output_path(self.output, page.route);

        let fallback;
        let template = match self.composer.template(template) {
            Some(record) => record.tree()?,
            None => {
                log!(self.sink => "tags"; "template `{template}` not found, using bare content");
                fallback = bare_template();
                &fallback
            }
        };

        let html = self.composer.compose(template, listing, page, &target)?;
        write_file(&target, &html)
    }

    /// Remove `/tags/<tag>/` directories of tags that no longer exist.
    ///
    /// Only directories holding nothing but a generated `index.html` are touched.
    fn prune(&self, index: &TagIndex<'_>) -> SiteResult<usize> {
        let tags_dir = self.output.join(TAGS_ROUTE.trim_matches('/'));
        let Ok(entries) = fs::read_dir(&tags_dir) else {
            return Ok(0);
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name();
            if !path.is_dir() || index.contains_key(&*name.to_string_lossy()) {
                continue;
            }
            if is_generated_page_dir(&path) {
                fs::remove_dir_all(&path).map_err(|err| SiteError::write(&path, err))?;
                log!(self.sink => "tags"; "removed stale {}", path.display());
                removed += 1;
            }
        }
        Ok(removed)
    }
}

pub fn tag_route(tag: &str) -> String {
    format!("{TAGS_ROUTE}{tag}/")
}

/// `<ul>` with one `tag (count)` link per tag.
fn tag_listing(index: &TagIndex<'_>) -> Markup {
    let mut listing = Markup::new();
    let root = listing.root();
    let ul = listing.append_element(root, Element::new("ul"));

    for (tag, members) in index {
        let href = format!("/tags/{tag}");
        let li = listing.append_element(ul, Element::new("li"));
        let a = listing.append_element(li, Element::new("a").with_attr("href", escape(&href)));
        listing.append_text(a, escape(&format!("{tag} ({})", members.len())));
    }
    listing
}

/// `<ul>` with one link per record, text from the record title.
/// A non-empty description becomes the link's `title` attribute.
fn member_listing(members: &[&ContentRecord]) -> Markup {
    let mut listing = Markup::new();
    let root = listing.root();
    let ul = listing.append_element(root, Element::new("ul"));

    for record in members {
        let li = listing.append_element(ul, Element::new("li"));
        let mut link = Element::new("a").with_attr("href", escape(&record.route));
        if !record.description.is_empty() {
            link = link.with_attr("title", escape(&record.description));
        }
        let a = listing.append_element(li, link);
        listing.append_text(a, escape(record.link_text()));
    }
    listing
}

fn bare_template() -> Markup {
    let mut template = Markup::new();
    let root = template.root();
    template.append_text(root, CONTENT_TOKEN);
    template
}

fn is_generated_page_dir(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    let names: Vec<PathBuf> = entries.flatten().map(|entry| entry.path()).collect();
    names.len() == 1 && names[0].file_name().is_some_and(|name| name == "index.html")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::front_matter,
        logger::{MemorySink, NullSink},
        registry::{DependencyRecord, Registries, Store},
        source::{SourceFile, SourceKind},
    };
    use std::sync::Arc;
    use tempfile::TempDir;

    fn record(route: &str, title: &str, tags: &[&str], published: bool) -> ContentRecord {
        let path = PathBuf::from(format!("/site/content{}.md", route.trim_end_matches('/')));
        let (front_matter, _) = front_matter::parse(&path, "").unwrap();
        ContentRecord {
            title: title.to_owned(),
            route: route.to_owned(),
            description: String::new(),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            published,
            front_matter,
            source: SourceFile::from_bytes(SourceKind::Content, &path, Vec::new()),
        }
    }

    fn registries(templates: &[(&str, &str)]) -> Registries {
        let registries = Registries::concurrent();
        for (name, html) in templates {
            let path = PathBuf::from(format!("/site/templates/{name}.html"));
            let mut source = SourceFile::from_bytes(SourceKind::Template, &path, html.as_bytes().to_vec());
            source.attach_tree(Markup::parse(html).unwrap());
            registries.templates.set(
                path,
                DependencyRecord {
                    name: (*name).to_owned(),
                    source,
                    parse_error: None,
                },
            );
        }
        registries
    }

    fn sample() -> Vec<ContentRecord> {
        vec![
            record("/b/", "B", &["go", "infra"], true),
            record("/a/", "A", &["go"], true),
            record("/draft/", "Draft", &["go", "secret"], false),
        ]
    }

    #[test]
    fn test_group_sorted_and_published_only() {
        let records = sample();
        let sink: Sink = Arc::new(NullSink);
        let index = group(&records, &sink);

        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["go", "infra"]);
        let go: Vec<_> = index["go"].iter().map(|r| r.route.as_str()).collect();
        assert_eq!(go, vec!["/a/", "/b/"]);
        assert!(!index.contains_key("secret"));
    }

    #[test]
    fn test_unsafe_tags_are_skipped() {
        let records = vec![record("/a/", "A", &["../etc", "ok"], true)];
        let memory = Arc::new(MemorySink::default());
        let sink: Sink = memory.clone();
        let index = group(&records, &sink);
        assert_eq!(index.len(), 1);
        assert!(memory.contains("not a valid path segment"));
    }

    #[test]
    fn test_run_writes_index_and_tag_pages() {
        let dir = TempDir::new().unwrap();
        let registries = registries(&[
            ("_tags", "<main><h1>{{ $title }}</h1>{{ $content }}</main>"),
            ("_individual_tag", "<main><h1>{{ $title }}</h1>{{ $content }}</main>"),
        ]);
        let sink: Sink = Arc::new(NullSink);
        let composer = Composer::new(&registries, sink.clone());

        let records = sample();
        let report = TagIndexer::new(&composer, dir.path(), &sink).run(&records);
        assert!(report.failures.is_empty());
        assert_eq!(report.written, 3);

        let index = fs::read_to_string(dir.path().join("tags/index.html")).unwrap();
        assert_eq!(
            index,
            "<main><h1>tags</h1><ul><li><a href=\"/tags/go\">go (2)</a></li><li><a href=\"/tags/infra\">infra (1)</a></li></ul></main>"
        );

        let go = fs::read_to_string(dir.path().join("tags/go/index.html")).unwrap();
        assert_eq!(
            go,
            "<main><h1>go</h1><ul><li><a href=\"/a/\">A</a></li><li><a href=\"/b/\">B</a></li></ul></main>"
        );
        assert!(!dir.path().join("tags/secret").exists());
    }

    #[test]
    fn test_missing_templates_fall_back_to_bare_content() {
        let dir = TempDir::new().unwrap();
        let registries = Registries::concurrent();
        let memory = Arc::new(MemorySink::default());
        let sink: Sink = memory.clone();
        let composer = Composer::new(&registries, sink.clone());

        let records = vec![record("/a/", "", &["go"], true)];
        let report = TagIndexer::new(&composer, dir.path(), &sink).run(&records);
        assert!(report.failures.is_empty());

        let go = fs::read_to_string(dir.path().join("tags/go/index.html")).unwrap();
        assert_eq!(go, "<ul><li><a href=\"/a/\">/a/</a></li></ul>");
        assert!(memory.contains("`_individual_tag` not found"));
    }

    #[test]
    fn test_stale_tag_directories_are_pruned() {
        let dir = TempDir::new().unwrap();
        let registries = Registries::concurrent();
        let sink: Sink = Arc::new(NullSink);
        let composer = Composer::new(&registries, sink.clone());
        let indexer = TagIndexer::new(&composer, dir.path(), &sink);

        indexer.run(&[record("/a/", "A", &["old", "kept"], true)]);
        fs::create_dir_all(dir.path().join("tags/manual")).unwrap();
        fs::write(dir.path().join("tags/manual/notes.txt"), "mine").unwrap();

        let report = indexer.run(&[record("/a/", "A", &["kept"], true)]);
        assert_eq!(report.removed, 1);
        assert!(!dir.path().join("tags/old").exists());
        assert!(dir.path().join("tags/kept/index.html").exists());
        assert!(dir.path().join("tags/manual/notes.txt").exists());
    }

    #[test]
    fn test_tag_text_is_escaped() {
        let records = vec![record("/a/", "A & B", &["c&d"], true)];
        let sink: Sink = Arc::new(NullSink);
        let index = group(&records, &sink);
        assert_eq!(
            tag_listing(&index).serialize(),
            "<ul><li><a href=\"/tags/c&amp;d\">c&amp;d (1)</a></li></ul>"
        );
        assert_eq!(
            member_listing(&index["c&d"]).serialize(),
            "<ul><li><a href=\"/a/\">A &amp; B</a></li></ul>"
        );
        assert_eq!(tag_route("go"), "/tags/go/");
    }

    #[test]
    fn test_description_becomes_link_title() {
        let mut described = record("/a/", "A", &["go"], true);
        described.description = "About \"A\"".to_owned();
        let records = vec![described, record("/b/", "B", &["go"], true)];
        let sink: Sink = Arc::new(NullSink);
        let index = group(&records, &sink);
        assert_eq!(
            member_listing(&index["go"]).serialize(),
            "<ul><li><a href=\"/a/\" title=\"About &quot;A&quot;\">A</a></li>\
             <li><a href=\"/b/\">B</a></li></ul>"
        );
    }
}
