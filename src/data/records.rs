/// Flat field-name keyed row, fields kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Record {
        Record::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<String>) -> Record {
        self.insert(field, value);
        self
    }

    /// Sets `field`, replacing an earlier value for the same name.
    pub fn insert(&mut self, field: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((field.to_string(), value)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Everything produced from one shaped element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordBundle {
    Node {
        node: Record,
        node_tags: Vec<Record>,
    },
    Way {
        way: Record,
        way_nodes: Vec<Record>,
        way_tags: Vec<Record>,
    },
}
