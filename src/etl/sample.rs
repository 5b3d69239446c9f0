use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use crate::config::Config;
use crate::data::osm::Element;
use crate::errors::{Error, Result};
use crate::etl::parse_osm::{open_osm, OsmStream};
use crate::etl::sink::create_output;
use crate::etl::Etl;

const ETL_NAME: &str = "sample_osm";
const ROOT: &str = "osm";

/// Copies every k-th element of the source document into a small, well
/// formed `.osm` file.
pub struct SampleEtl {
    osm_file: PathBuf,
    sample_osm: PathBuf,
    every: u64,
    progress: bool,
    writer: Option<Writer<BufWriter<File>>>,
}

impl SampleEtl {
    pub fn new(config: &Config) -> SampleEtl {
        SampleEtl {
            osm_file: config.osm_data.osm_file.clone(),
            sample_osm: config.sample.sample_osm.clone(),
            every: config.sample.sample_every.max(1) as u64,
            progress: false,
            writer: None,
        }
    }

    pub fn with_progress(mut self, progress: bool) -> SampleEtl {
        self.progress = progress;
        self
    }

    fn writer(&mut self) -> Result<&mut Writer<BufWriter<File>>> {
        self.writer
            .as_mut()
            .ok_or_else(|| Error::from(std::io::Error::other("sample output is not open")))
    }
}

/// Writes `element` with its direct children as empty elements. Only two
/// levels are kept, which covers everything an OSM node, way or relation holds.
pub fn write_element<W: Write>(xml: &mut Writer<W>, element: &Element) -> Result<()> {
    let name = element.kind.as_str();
    let mut start = BytesStart::new(name);
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        xml.write_event(Event::Empty(start))?;
        return Ok(());
    }

    xml.write_event(Event::Start(start))?;
    for child in &element.children {
        let mut child_start = BytesStart::new(child.name.as_str());
        for (key, value) in &child.attributes {
            child_start.push_attribute((key.as_str(), value.as_str()));
        }
        xml.write_event(Event::Empty(child_start))?;
    }
    xml.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

impl Etl for SampleEtl {
    type Output = Element;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn show_progress(&self) -> bool {
        self.progress
    }

    fn extract(&mut self) -> Result<OsmStream> {
        let stream = open_osm(&self.osm_file)?;

        let mut xml = Writer::new_with_indent(create_output(&self.sample_osm)?, b' ', 2);
        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        xml.write_event(Event::Start(BytesStart::new(ROOT)))?;
        self.writer = Some(xml);

        Ok(stream)
    }

    fn transform(&mut self, index: u64, element: &Element) -> Result<Option<Element>> {
        if index % self.every == 0 {
            Ok(Some(element.clone()))
        } else {
            Ok(None)
        }
    }

    fn load(&mut self, output: Element) -> Result<()> {
        write_element(self.writer()?, &output)
    }

    fn finish(&mut self) -> Result<()> {
        let mut xml = self
            .writer
            .take()
            .ok_or_else(|| Error::from(std::io::Error::other("sample output is not open")))?;
        xml.write_event(Event::End(BytesEnd::new(ROOT)))?;
        xml.get_mut().write_all(b"\n")?;
        xml.into_inner().flush()?;
        Ok(())
    }
}
