use std::collections::{BTreeMap, HashMap};

use crate::etl::audit::StreetTypeIndex;

pub const STREET_ABBREVIATIONS: [(&str, &str); 5] = [
    ("St", "Street"),
    ("St.", "Street"),
    ("Rd", "Road"),
    ("Ave", "Avenue"),
    ("Ft.", "Fort"),
];

pub struct StreetNameNormalizer {
    mapping: BTreeMap<String, String>,
}

/// Audited street name -> the form written to the output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreetCorrections {
    names: HashMap<String, String>,
}

impl StreetCorrections {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Upper-cases the first char of an already lowercased token. A char whose
/// upper case spans several chars (`ß` -> `SS`) is kept as is, otherwise a
/// second pass would lowercase the tail and change the name again.
fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let mut upper = first.to_uppercase();
    let head = match (upper.next(), upper.next()) {
        (Some(single), None) => single,
        _ => first,
    };
    std::iter::once(head).chain(chars).collect()
}

impl StreetNameNormalizer {
    pub fn new(mapping: &BTreeMap<String, String>) -> StreetNameNormalizer {
        StreetNameNormalizer {
            mapping: mapping.clone(),
        }
    }

    /// Title-cases `name` and expands abbreviated tokens. Only pairs of
    /// spaces are collapsed, so a run of three keeps two.
    pub fn update_name(&self, name: &str) -> String {
        let lowercase_name = name.to_lowercase().replace("  ", " ");

        lowercase_name
            .split(' ')
            .map(|token| {
                let capitalized = capitalize(token);
                match self.mapping.get(&capitalized) {
                    Some(full) => full.clone(),
                    None => capitalized,
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }

    /// Normalised form of every audited name that actually changes.
    pub fn corrections(&self, index: &StreetTypeIndex) -> StreetCorrections {
        let names = index
            .values()
            .flatten()
            .filter_map(|name| {
                let updated = self.update_name(name);
                (updated != *name).then(|| (name.clone(), updated))
            })
            .collect();
        StreetCorrections { names }
    }
}
