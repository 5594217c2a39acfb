//! Markup tree → HTML string.

use super::{Element, Markup, NodeData, NodeId, parse::is_void};

impl Markup {
    /// Serialize the whole document.
    pub fn serialize(&self) -> String {
        self.serialize_node(self.root())
    }

    /// Serialize a single node and its subtree.
    pub fn serialize_node(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.get(id) {
            NodeData::Fragment => self.write_children(id, out),
            NodeData::Doctype(declaration) => {
                out.push_str("<!");
                out.push_str(declaration);
                out.push('>');
            }
            NodeData::Element(element) => {
                write_start_tag(element, out);
                let children = self.children(id);
                if is_void(&element.name) && children.is_empty() {
                    return;
                }
                for child in children {
                    self.write_node(child, out);
                }
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
            NodeData::Text(text) | NodeData::Raw(text) => out.push_str(text),
            NodeData::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
        }
    }

    fn write_children(&self, id: NodeId, out: &mut String) {
        for child in self.children(id) {
            self.write_node(child, out);
        }
    }
}

fn write_start_tag(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for attr in &element.attrs {
        out.push(' ');
        out.push_str(&attr.key);
        // Values are stored escaped, so only the authored quote can appear
        // bare inside them. Switch quotes if a built value breaks that.
        let quote = match attr.quote {
            None if attr.value.is_empty() => continue,
            Some('\'') if !attr.value.contains('\'') => '\'',
            _ if attr.value.contains('"') => '\'',
            _ => '"',
        };
        out.push('=');
        out.push(quote);
        out.push_str(&attr.value);
        out.push(quote);
    }
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_quoted_value_keeps_quotes() {
        let markup = Markup::parse(r#"<a title='say "hi"'>x</a>"#).unwrap();
        assert_eq!(markup.serialize(), r#"<a title='say "hi"'>x</a>"#);
    }

    #[test]
    fn test_valueless_and_empty_attributes_differ() {
        let markup = Markup::parse(r#"<input checked value="">"#).unwrap();
        assert_eq!(markup.serialize(), r#"<input checked value="">"#);

        let mut built = Markup::new();
        let root = built.root();
        built.append_element(root, Element::new("a").with_attr("title", r#"say "hi""#));
        assert_eq!(built.serialize(), r#"<a title='say "hi"'></a>"#);
    }

    #[test]
    fn test_empty_custom_element_gets_end_tag() {
        let markup = Markup::parse("<tags/>").unwrap();
        assert_eq!(markup.serialize(), "<tags></tags>");
    }

    #[test]
    fn test_serialize_node_subtree() {
        let markup = Markup::parse("<ul><li>a</li></ul><p>b</p>").unwrap();
        let ul = markup.children(markup.root())[0];
        assert_eq!(markup.serialize_node(ul), "<ul><li>a</li></ul>");
    }

    #[test]
    fn test_built_tree() {
        let mut markup = Markup::new();
        let root = markup.root();
        let ul = markup.append_element(root, Element::new("ul"));
        let li = markup.append_element(ul, Element::new("li"));
        let a = markup.append_element(li, Element::new("a").with_attr("href", "/tags/go"));
        markup.append_text(a, "go");
        assert_eq!(
            markup.serialize(),
            r#"<ul><li><a href="/tags/go">go</a></li></ul>"#
        );
    }
}
