use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};
use regex::Regex;

use crate::data::osm::{Element, ElementKind};
use crate::errors::Result;

/// Street types considered already normalised.
pub const EXPECTED_STREET_TYPES: [&str; 14] = [
    "Street", "Avenue", "Boulevard", "Drive", "Court", "Place", "Road", "Way", "Circle", "Trail",
    "Mall", "Square", "Creek", "I-95",
];

pub const STREET_KEY: &str = "addr:street";

/// Unexpected street type -> every distinct street name ending in it.
pub type StreetTypeIndex = BTreeMap<String, BTreeSet<String>>;

pub struct StreetAuditor {
    street_type_re: Regex,
    expected: Vec<String>,
}

impl StreetAuditor {
    pub fn new(expected: &[String]) -> Result<StreetAuditor> {
        Ok(StreetAuditor {
            street_type_re: Regex::new(r"(?i)\b\S+\.?$")?,
            expected: expected.to_vec(),
        })
    }

    /// Last whitespace-free run of `street_name`, if it ends in one.
    pub fn street_type<'a>(&self, street_name: &'a str) -> Option<&'a str> {
        self.street_type_re.find(street_name).map(|m| m.as_str())
    }

    pub fn is_expected(&self, street_type: &str) -> bool {
        self.expected.iter().any(|expected| expected == street_type)
    }

    pub fn audit_street_type(&self, index: &mut StreetTypeIndex, street_name: &str) {
        if let Some(street_type) = self.street_type(street_name) {
            if !self.is_expected(street_type) {
                index
                    .entry(street_type.to_string())
                    .or_default()
                    .insert(street_name.to_string());
            }
        }
    }

    /// Scans the `addr:street` tags of every node and way. Elements that
    /// cannot be inspected are passed over; a broken document is an error.
    pub fn audit<I>(&self, elements: I) -> Result<StreetTypeIndex>
    where
        I: IntoIterator<Item = Result<Element>>,
    {
        let mut index = StreetTypeIndex::new();
        let mut scanned: u64 = 0;
        let mut passed_over: u64 = 0;

        for element in elements {
            let element = match element {
                Ok(element) => element,
                Err(err) if err.is_element_scoped() => {
                    passed_over += 1;
                    continue;
                }
                Err(err) => return Err(err),
            };
            if !matches!(element.kind, ElementKind::Node | ElementKind::Way) {
                continue;
            }
            scanned += 1;
            for tag in element.tags() {
                match tag {
                    Ok(tag) if tag.key == STREET_KEY => {
                        self.audit_street_type(&mut index, tag.value)
                    }
                    Ok(_) => (),
                    Err(err) => {
                        debug!(err = err.to_string(); "Skipping tag during street audit");
                        passed_over += 1;
                    }
                }
            }
        }

        info!(
            scanned = scanned,
            passed_over = passed_over,
            street_types = index.len();
            "Street audit finished"
        );
        Ok(index)
    }
}
