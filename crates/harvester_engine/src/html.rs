//! Loading HTML snapshots into the page tree.
use chardetng::EncodingDetector;
use ego_tree::NodeRef;
use encoding_rs::Encoding;
use harvester_core::{NodeId, PageElement, PageTree};
use scraper::node::Node;
use scraper::Html;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHtml {
    pub html: String,
    pub encoding_label: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("failed to decode bytes with {encoding}: {message}")]
    DecodeFailure { encoding: String, message: String },
}

/// Decode raw bytes into UTF-8 using: BOM -> Content-Type charset -> chardetng fallback.
pub fn decode_html(bytes: &[u8], content_type: Option<&str>) -> Result<DecodedHtml, DecodeError> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(label) = content_type.and_then(extract_charset) {
        if let Some(enc) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, enc);
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let enc = detector.guess(None, true);
    decode_with(bytes, enc)
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim_matches([' ', '"', '\''].as_ref()).to_string())
    })
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> Result<DecodedHtml, DecodeError> {
    let (text, _, had_errors) = enc.decode(bytes);
    if had_errors {
        return Err(DecodeError::DecodeFailure {
            encoding: enc.name().to_string(),
            message: "decoding error".into(),
        });
    }
    Ok(DecodedHtml {
        html: text.into_owned(),
        encoding_label: enc.name().to_string(),
    })
}

/// What one snapshot contributed to the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraftOutcome {
    /// Nodes appended directly under the graft point.
    pub added: Vec<NodeId>,
    /// Text of every `<script>` element, which is kept out of the tree.
    pub scripts: Vec<String>,
}

/// Parses `html` and appends the children of its `<body>` under `parent`.
pub fn graft_document(tree: &mut PageTree, parent: NodeId, html: &str) -> GraftOutcome {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let body = root
        .children()
        .find(|child| matches!(child.value(), Node::Element(el) if el.name().eq_ignore_ascii_case("body")));

    let mut outcome = GraftOutcome::default();
    // Head scripts still carry asset URLs.
    for child in root.children() {
        if Some(child.id()) != body.map(|b| b.id()) {
            collect_scripts(child, &mut outcome.scripts);
        }
    }
    let source = body.unwrap_or(*root);
    for child in source.children() {
        if let Some(id) = copy_node(tree, parent, child, &mut outcome.scripts) {
            outcome.added.push(id);
        }
    }
    outcome
}

fn copy_node(
    tree: &mut PageTree,
    parent: NodeId,
    node: NodeRef<'_, Node>,
    scripts: &mut Vec<String>,
) -> Option<NodeId> {
    match node.value() {
        Node::Text(text) => {
            let text: &str = text;
            if text.trim().is_empty() {
                return None;
            }
            tree.append_text(parent, text)
        }
        Node::Element(el) => {
            let tag = el.name().to_ascii_lowercase();
            if tag == "script" {
                scripts.push(script_text(node));
                return None;
            }
            let element = el
                .attrs()
                .fold(PageElement::new(tag), |element, (name, value)| {
                    element.with_attr(name, value)
                });
            let id = tree.append_element(parent, element)?;
            for child in node.children() {
                copy_node(tree, id, child, scripts);
            }
            Some(id)
        }
        _ => None,
    }
}

fn collect_scripts(node: NodeRef<'_, Node>, scripts: &mut Vec<String>) {
    for descendant in node.descendants() {
        if matches!(descendant.value(), Node::Element(el) if el.name().eq_ignore_ascii_case("script")) {
            scripts.push(script_text(descendant));
        }
    }
}

fn script_text(node: NodeRef<'_, Node>) -> String {
    node.descendants()
        .filter_map(|n| match n.value() {
            Node::Text(text) => Some(&**text),
            _ => None,
        })
        .collect()
}
