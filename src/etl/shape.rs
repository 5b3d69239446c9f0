use crate::data::osm::{Element, ElementKind};
use crate::data::records::{Record, RecordBundle};
use crate::errors::Result;
use crate::etl::audit::STREET_KEY;
use crate::etl::clean::StreetCorrections;

pub const DEFAULT_TAG_TYPE: &str = "regular";

/// Turns node and way elements into flat output records.
pub struct RecordShaper {
    node_fields: Vec<String>,
    way_fields: Vec<String>,
    corrections: StreetCorrections,
    default_tag_type: String,
}

impl RecordShaper {
    pub fn new(node_fields: &[String], way_fields: &[String]) -> RecordShaper {
        RecordShaper {
            node_fields: node_fields.to_vec(),
            way_fields: way_fields.to_vec(),
            corrections: StreetCorrections::default(),
            default_tag_type: DEFAULT_TAG_TYPE.to_string(),
        }
    }

    pub fn with_corrections(mut self, corrections: StreetCorrections) -> RecordShaper {
        self.corrections = corrections;
        self
    }

    /// `None` for relations. Every configured field must be present on the
    /// element, and every `tag` child needs both `k` and `v`.
    pub fn shape(&self, element: &Element) -> Result<Option<RecordBundle>> {
        match element.kind {
            ElementKind::Node => Ok(Some(RecordBundle::Node {
                node: attribute_record(element, &self.node_fields)?,
                node_tags: self.tag_records(element)?,
            })),
            ElementKind::Way => Ok(Some(RecordBundle::Way {
                way: attribute_record(element, &self.way_fields)?,
                way_nodes: way_node_records(element)?,
                way_tags: self.tag_records(element)?,
            })),
            ElementKind::Relation => Ok(None),
        }
    }

    fn tag_records(&self, element: &Element) -> Result<Vec<Record>> {
        let id = element.id()?;
        element
            .tags()
            .map(|tag| -> Result<Record> {
                let tag = tag?;
                let value = match tag.key {
                    STREET_KEY => self.corrections.get(tag.value).unwrap_or(tag.value),
                    _ => tag.value,
                };
                Ok(Record::new()
                    .with("id", id)
                    .with("key", tag.key)
                    .with("value", value)
                    .with("type", self.default_tag_type.as_str()))
            })
            .collect()
    }
}

fn attribute_record(element: &Element, fields: &[String]) -> Result<Record> {
    let mut record = Record::new();
    for field in fields {
        record.insert(field, element.require(field)?);
    }
    Ok(record)
}

fn way_node_records(element: &Element) -> Result<Vec<Record>> {
    let id = element.id()?;
    element
        .node_refs()
        .enumerate()
        .map(|(position, node_id)| -> Result<Record> {
            Ok(Record::new()
                .with("id", id)
                .with("node_id", node_id?)
                .with("position", position.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::osm::Child;
    use crate::errors::Error;
    use crate::etl::audit::StreetTypeIndex;
    use crate::etl::clean::{StreetNameNormalizer, STREET_ABBREVIATIONS};
    use rstest::{fixture, rstest};
    use std::collections::BTreeSet;

    const NODE_FIELDS: [&str; 8] = [
        "id", "lat", "lon", "user", "uid", "version", "changeset", "timestamp",
    ];
    const WAY_FIELDS: [&str; 6] = ["id", "user", "uid", "version", "changeset", "timestamp"];

    fn strings(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[fixture]
    fn shaper() -> RecordShaper {
        RecordShaper::new(&strings(&NODE_FIELDS), &strings(&WAY_FIELDS))
    }

    fn child(name: &str, attributes: &[(&str, &str)]) -> Child {
        Child {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn element(kind: ElementKind, attributes: &[(&str, &str)], children: Vec<Child>) -> Element {
        let mut element = Element::new(kind);
        element.attributes = attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        element.children = children;
        element
    }

    const COMMON: [(&str, &str); 5] = [
        ("user", "alice"),
        ("uid", "7"),
        ("version", "2"),
        ("changeset", "99"),
        ("timestamp", "2019-05-22T00:00:00Z"),
    ];

    fn node(tags: Vec<Child>) -> Element {
        let mut attributes = vec![("id", "1"), ("lat", "1.0"), ("lon", "2.0")];
        attributes.extend(COMMON);
        element(ElementKind::Node, &attributes, tags)
    }

    fn way(children: Vec<Child>) -> Element {
        let mut attributes = vec![("id", "10")];
        attributes.extend(COMMON);
        element(ElementKind::Way, &attributes, children)
    }

    #[rstest]
    fn shapes_nodes_in_configured_field_order(shaper: RecordShaper) {
        let el = node(vec![child("tag", &[("k", "amenity"), ("v", "cafe")])]);
        let Some(RecordBundle::Node { node, node_tags }) = shaper.shape(&el).unwrap() else {
            panic!("expected a node bundle");
        };
        let names: Vec<&str> = node.field_names().collect();
        assert_eq!(names, NODE_FIELDS);
        assert_eq!(node.get("lat"), Some("1.0"));
        assert_eq!(node_tags.len(), 1);
        assert_eq!(node_tags[0].get("id"), Some("1"));
        assert_eq!(node_tags[0].get("key"), Some("amenity"));
        assert_eq!(node_tags[0].get("value"), Some("cafe"));
        assert_eq!(node_tags[0].get("type"), Some("regular"));
    }

    #[rstest]
    fn ways_get_contiguous_positions_and_tag_values(shaper: RecordShaper) {
        let el = way(vec![
            child("nd", &[("ref", "5")]),
            child("tag", &[("k", "highway"), ("v", "residential")]),
            child("nd", &[("ref", "3")]),
            child("nd", &[("ref", "5")]),
        ]);
        let Some(RecordBundle::Way { way, way_nodes, way_tags }) = shaper.shape(&el).unwrap() else {
            panic!("expected a way bundle");
        };
        assert_eq!(way.get("id"), Some("10"));
        let refs: Vec<(&str, &str)> = way_nodes
            .iter()
            .map(|r| (r.get("node_id").unwrap(), r.get("position").unwrap()))
            .collect();
        assert_eq!(refs, [("5", "0"), ("3", "1"), ("5", "2")]);
        assert_eq!(way_tags[0].get("value"), Some("residential"));
    }

    #[rstest]
    fn relations_produce_nothing(shaper: RecordShaper) {
        let el = element(ElementKind::Relation, &[("id", "100")], vec![]);
        assert!(shaper.shape(&el).unwrap().is_none());
    }

    #[rstest]
    #[case::node_lat(node(vec![]), "lat")]
    #[case::way_user(way(vec![]), "user")]
    fn missing_attributes_fail_the_element(
        shaper: RecordShaper,
        #[case] el: Element,
        #[case] attribute: &str,
    ) {
        let mut el = el;
        el.attributes.retain(|(k, _)| k != attribute);
        let err = shaper.shape(&el).unwrap_err();
        assert!(
            matches!(err, Error::MissingAttribute { attribute: ref a, .. } if a == attribute),
            "{err}"
        );
    }

    #[rstest]
    fn half_written_tags_fail_the_element(shaper: RecordShaper) {
        let el = way(vec![child("tag", &[("k", "name")])]);
        assert!(matches!(shaper.shape(&el), Err(Error::MalformedTag { .. })));
    }

    #[rstest]
    fn audited_street_names_are_written_back(shaper: RecordShaper) {
        let mapping = STREET_ABBREVIATIONS
            .iter()
            .map(|(a, f)| (a.to_string(), f.to_string()))
            .collect();
        let mut index = StreetTypeIndex::new();
        index.insert("St".to_string(), BTreeSet::from(["Main St".to_string()]));
        let corrections = StreetNameNormalizer::new(&mapping).corrections(&index);
        let shaper = shaper.with_corrections(corrections);

        let el = node(vec![
            child("tag", &[("k", "addr:street"), ("v", "Main St")]),
            child("tag", &[("k", "name"), ("v", "Main St")]),
        ]);
        let Some(RecordBundle::Node { node_tags, .. }) = shaper.shape(&el).unwrap() else {
            panic!("expected a node bundle");
        };
        assert_eq!(node_tags[0].get("value"), Some("Main Street"));
        assert_eq!(node_tags[1].get("value"), Some("Main St"));
    }
}
