use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use crate::errors::{Error, Result};
use crate::etl::audit::EXPECTED_STREET_TYPES;
use crate::etl::clean::STREET_ABBREVIATIONS;

/// Run configuration, loaded and validated once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub sample: SampleConfig,
    pub osm_data: OsmDataConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub street: StreetConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SampleConfig {
    #[serde(default)]
    pub sample_run: bool,
    pub sample_osm: PathBuf,
    /// Keep every k-th element.
    #[serde(default = "default_sample_every")]
    pub sample_every: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsmDataConfig {
    pub osm_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub nodes_path: PathBuf,
    pub node_tags_path: PathBuf,
    pub ways_path: PathBuf,
    pub way_nodes_path: PathBuf,
    pub way_tags_path: PathBuf,

    #[serde(deserialize_with = "field_list")]
    pub node_fields: Vec<String>,
    #[serde(deserialize_with = "field_list")]
    pub node_tag_fields: Vec<String>,
    #[serde(deserialize_with = "field_list")]
    pub way_fields: Vec<String>,
    #[serde(deserialize_with = "field_list")]
    pub way_nodes_fields: Vec<String>,
    #[serde(default, deserialize_with = "optional_field_list")]
    pub way_tag_fields: Option<Vec<String>>,
}

impl DataConfig {
    pub fn way_tag_fields(&self) -> &[String] {
        self.way_tag_fields
            .as_deref()
            .unwrap_or(&self.node_tag_fields)
    }

    fn field_lists(&self) -> [(&'static str, &[String]); 5] {
        [
            ("node_fields", self.node_fields.as_slice()),
            ("node_tag_fields", self.node_tag_fields.as_slice()),
            ("way_fields", self.way_fields.as_slice()),
            ("way_nodes_fields", self.way_nodes_fields.as_slice()),
            ("way_tag_fields", self.way_tag_fields()),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreetConfig {
    #[serde(default = "default_expected")]
    pub expected: Vec<String>,
    #[serde(default = "default_mapping")]
    pub mapping: BTreeMap<String, String>,
}

impl Default for StreetConfig {
    fn default() -> Self {
        StreetConfig {
            expected: default_expected(),
            mapping: default_mapping(),
        }
    }
}

fn default_sample_every() -> usize {
    1
}

fn default_expected() -> Vec<String> {
    EXPECTED_STREET_TYPES.iter().map(|s| s.to_string()).collect()
}

fn default_mapping() -> BTreeMap<String, String> {
    STREET_ABBREVIATIONS
        .iter()
        .map(|(abbrv, full)| (abbrv.to_string(), full.to_string()))
        .collect()
}

/// Field lists are either JSON arrays or strings holding a JSON list literal.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawFieldList {
    List(Vec<String>),
    Literal(String),
}

impl RawFieldList {
    fn into_fields<E: serde::de::Error>(self) -> std::result::Result<Vec<String>, E> {
        match self {
            RawFieldList::List(fields) => Ok(fields),
            RawFieldList::Literal(literal) => serde_json::from_str(&literal)
                .map_err(|err| E::custom(format!("invalid field list {literal:?}: {err}"))),
        }
    }
}

fn field_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    RawFieldList::deserialize(deserializer)?.into_fields()
}

fn optional_field_list<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawFieldList>::deserialize(deserializer)?
        .map(RawFieldList::into_fields)
        .transpose()
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let file = File::open(path).map_err(|err| {
            Error::config(format!("could not open config file {}: {err}", path.display()))
        })?;
        let config: Config = serde_json::from_reader(BufReader::new(file)).map_err(|err| {
            Error::config(format!("could not parse config file {}: {err}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Config> {
        let config: Config = serde_json::from_str(json)
            .map_err(|err| Error::config(format!("could not parse config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample.sample_every == 0 {
            return Err(Error::config("sample.sample_every must be at least 1"));
        }
        for (name, fields) in self.data.field_lists() {
            if fields.is_empty() {
                return Err(Error::config(format!("data.{name} must not be empty")));
            }
            let mut seen = HashSet::new();
            if let Some(dup) = fields.iter().find(|field| !seen.insert(field.as_str())) {
                return Err(Error::config(format!("data.{name} lists `{dup}` twice")));
            }
        }
        if self.street.expected.is_empty() {
            return Err(Error::config("street.expected must not be empty"));
        }
        Ok(())
    }
}
