use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use xz::bufread::XzDecoder;

use crate::data::osm::{Child, Element, ElementKind};
use crate::errors::{Error, Result};

/// Single forward pass over an `.osm` document, yielding the top-level
/// elements whose kind is allowed. Only the element currently being read is
/// held in memory.
pub struct ElementStream<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    kinds: Vec<ElementKind>,
    depth: usize,
    current: Option<Result<Element>>,
    done: bool,
}

pub type OsmStream = ElementStream<Box<dyn BufRead>>;

impl<R: BufRead> ElementStream<R> {
    pub fn from_reader(source: R) -> ElementStream<R> {
        let mut reader = Reader::from_reader(source);
        reader.trim_text(true);

        ElementStream {
            reader,
            buf: Vec::new(),
            kinds: ElementKind::ALL.to_vec(),
            depth: 0,
            current: None,
            done: false,
        }
    }

    pub fn with_kinds(mut self, kinds: &[ElementKind]) -> ElementStream<R> {
        self.kinds = kinds.to_vec();
        self
    }
}

fn wanted(kinds: &[ElementKind], name: &[u8]) -> Option<ElementKind> {
    ElementKind::from_name(name).filter(|kind| kinds.contains(kind))
}

/// Opens `path` for streaming, decompressing `.xz` files on the fly.
pub fn open_osm(path: &Path) -> Result<OsmStream> {
    let file = fs::File::open(path)?;
    let file_reader = BufReader::new(file);
    let source: Box<dyn BufRead> = if path.extension().is_some_and(|ext| ext == "xz") {
        Box::new(BufReader::new(XzDecoder::new(file_reader)))
    } else {
        Box::new(file_reader)
    };
    Ok(ElementStream::from_reader(source))
}

fn parse_attributes(el: &BytesStart) -> Result<Vec<(String, String)>> {
    let mut attributes = Vec::new();
    for attribute_res in el.attributes() {
        let attribute = attribute_res?;
        let key = str::from_utf8(attribute.key.as_ref())?.to_string();
        let value = attribute
            .unescape_value()
            .map_err(|err| Error::BadAttribute {
                key: key.clone(),
                message: err.to_string(),
            })?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(attributes)
}

fn parse_element(kind: ElementKind, el: &BytesStart) -> Result<Element> {
    let mut element = Element::new(kind);
    element.attributes = parse_attributes(el)?;
    Ok(element)
}

fn parse_child(el: &BytesStart) -> Result<Child> {
    Ok(Child {
        name: str::from_utf8(el.name().as_ref())?.to_string(),
        attributes: parse_attributes(el)?,
    })
}

fn push_child(current: &mut Option<Result<Element>>, el: &BytesStart) {
    if let Some(Ok(element)) = current {
        match parse_child(el) {
            Ok(child) => element.children.push(child),
            Err(err) => *current = Some(Err(err)),
        }
    }
}

impl<R: BufRead> Iterator for ElementStream<R> {
    type Item = Result<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(source) => {
                    self.done = true;
                    return Some(Err(Error::Xml {
                        position: self.reader.buffer_position() as u64,
                        source,
                    }));
                }
            };

            let finished = match event {
                Event::Eof => {
                    self.done = true;
                    return None;
                }
                Event::Start(e) => {
                    if self.depth == 1 {
                        if let Some(kind) = wanted(&self.kinds, e.name().as_ref()) {
                            self.current = Some(parse_element(kind, &e));
                        }
                    } else if self.depth == 2 {
                        push_child(&mut self.current, &e);
                    }
                    self.depth += 1;
                    None
                }
                Event::Empty(e) => {
                    if self.depth == 1 {
                        wanted(&self.kinds, e.name().as_ref()).map(|kind| parse_element(kind, &e))
                    } else {
                        if self.depth == 2 {
                            push_child(&mut self.current, &e);
                        }
                        None
                    }
                }
                Event::End(_) => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 1 {
                        self.current.take()
                    } else {
                        None
                    }
                }
                // Declarations, text, comments and the like carry no map data.
                _ => None,
            };

            // if we don't keep a borrow elsewhere, we can clear the buffer to keep memory usage low
            self.buf.clear();

            if finished.is_some() {
                return finished;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::{Cursor, Write};

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6">
  <bounds minlat="0" minlon="0" maxlat="1" maxlon="1"/>
  <node id="1" lat="1.0" lon="2.0"/>
  <node id="2" lat="1.5" lon="2.5">
    <tag k="addr:street" v="Main St"/>
    <tag k="name" v="Caf&#233; &amp; Bar"/>
  </node>
  <way id="10">
    <nd ref="1"/>
    <nd ref="2"/>
    <tag k="highway" v="residential"/>
  </way>
  <relation id="100">
    <member type="way" ref="10" role="outer"/>
  </relation>
  <node id="3" lat="0.5" lon="0.5"/>
</osm>"#;

    fn stream(doc: &str) -> ElementStream<Cursor<Vec<u8>>> {
        ElementStream::from_reader(Cursor::new(doc.as_bytes().to_vec()))
    }

    fn ids(elements: &[Element]) -> Vec<&str> {
        elements.iter().map(|el| el.id().unwrap()).collect()
    }

    #[test]
    fn yields_every_top_level_element_in_document_order() {
        let elements: Vec<Element> = stream(DOC).collect::<Result<_>>().unwrap();
        assert_eq!(ids(&elements), ["1", "2", "10", "100", "3"]);
        let kinds: Vec<ElementKind> = elements.iter().map(|el| el.kind).collect();
        assert_eq!(
            kinds,
            [
                ElementKind::Node,
                ElementKind::Node,
                ElementKind::Way,
                ElementKind::Relation,
                ElementKind::Node
            ]
        );
    }

    #[rstest]
    #[case(&[ElementKind::Node], &["1", "2", "3"])]
    #[case(&[ElementKind::Way], &["10"])]
    #[case(&[ElementKind::Node, ElementKind::Way], &["1", "2", "10", "3"])]
    #[case(&[], &[])]
    fn restricts_to_requested_kinds(#[case] kinds: &[ElementKind], #[case] expected: &[&str]) {
        let elements: Vec<Element> = stream(DOC)
            .with_kinds(kinds)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(ids(&elements), expected);
    }

    #[test]
    fn keeps_children_and_unescapes_values() {
        let elements: Vec<Element> = stream(DOC).collect::<Result<_>>().unwrap();
        let node = &elements[1];
        let tags: Vec<_> = node.tags().collect::<Result<_>>().unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].key, "addr:street");
        assert_eq!(tags[1].value, "Café & Bar");

        let way = &elements[2];
        let refs: Vec<&str> = way.node_refs().collect::<Result<_>>().unwrap();
        assert_eq!(refs, ["1", "2"]);
        assert_eq!(way.children[2].name, "tag");

        let relation = &elements[3];
        assert_eq!(relation.children[0].attribute("role"), Some("outer"));
    }

    #[test]
    fn ignores_grandchildren_of_collected_elements() {
        let doc = r#"<osm><way id="1"><nd ref="5"><extra k="x"/></nd></way></osm>"#;
        let elements: Vec<Element> = stream(doc).collect::<Result<_>>().unwrap();
        assert_eq!(elements[0].children.len(), 1);
    }

    #[test]
    fn malformed_document_is_fatal() {
        let doc = r#"<osm><node id="1"></way></osm>"#;
        let results: Vec<Result<Element>> = stream(doc).collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(Error::Xml { .. })));
    }

    #[test]
    fn broken_attribute_only_fails_its_element() {
        let doc = r#"<osm><node id="1" lat="1" lat="2"/><node id="2"/></osm>"#;
        let results: Vec<Result<Element>> = stream(doc).collect();
        assert_eq!(results.len(), 2);
        let err = results[0].as_ref().unwrap_err();
        assert!(err.is_element_scoped(), "{err}");
        assert_eq!(results[1].as_ref().unwrap().id().unwrap(), "2");
    }

    #[test]
    fn unknown_entity_only_fails_its_element() {
        let doc = r#"<osm><node id="1"><tag k="name" v="&bogus;"/></node><node id="2"/></osm>"#;
        let results: Vec<Result<Element>> = stream(doc).collect();
        assert!(matches!(results[0], Err(Error::BadAttribute { ref key, .. }) if key == "v"));
        assert!(results[1].is_ok());
    }

    #[test]
    fn opens_plain_and_xz_files() {
        let dir = tempfile::tempdir().unwrap();

        let plain = dir.path().join("map.osm");
        fs::write(&plain, DOC).unwrap();
        assert_eq!(open_osm(&plain).unwrap().count(), 5);

        let packed = dir.path().join("map.osm.xz");
        let mut encoder = xz::write::XzEncoder::new(fs::File::create(&packed).unwrap(), 6);
        encoder.write_all(DOC.as_bytes()).unwrap();
        encoder.finish().unwrap();
        assert_eq!(open_osm(&packed).unwrap().count(), 5);
    }
}
