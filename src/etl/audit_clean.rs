use log::info;

use crate::config::Config;
use crate::data::osm::{Element, ElementKind};
use crate::data::records::RecordBundle;
use crate::errors::{Error, Result};
use crate::etl::audit::{StreetAuditor, StreetTypeIndex};
use crate::etl::clean::StreetNameNormalizer;
use crate::etl::parse_osm::{open_osm, OsmStream};
use crate::etl::sample::SampleEtl;
use crate::etl::shape::RecordShaper;
use crate::etl::sink::FileSinks;
use crate::etl::{Etl, EtlSummary};

const ETL_NAME: &str = "audit_clean";
const SHAPED_KINDS: [ElementKind; 2] = [ElementKind::Node, ElementKind::Way];

/// Audits street names once, then streams nodes and ways into the CSV
/// outputs with the corrected names written back.
pub struct AuditCleanEtl<'a> {
    config: &'a Config,
    progress: bool,
    street_types: usize,
    corrections: usize,
    shaper: Option<RecordShaper>,
    sinks: Option<FileSinks>,
}

/// Outcome of a complete run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub sample: Option<EtlSummary>,
    pub street_types: usize,
    pub corrections: usize,
    pub records: EtlSummary,
}

/// Builds the street type index with its own pass over the document.
pub fn audit(config: &Config) -> Result<StreetTypeIndex> {
    let auditor = StreetAuditor::new(&config.street.expected)?;
    let stream = open_osm(&config.osm_data.osm_file)?.with_kinds(&SHAPED_KINDS);
    auditor.audit(stream)
}

impl AuditCleanEtl<'_> {
    pub fn new(config: &Config) -> AuditCleanEtl<'_> {
        AuditCleanEtl {
            config,
            progress: false,
            street_types: 0,
            corrections: 0,
            shaper: None,
            sinks: None,
        }
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    fn not_started() -> Error {
        Error::from(std::io::Error::other("audit_clean outputs are not open"))
    }
}

impl Etl for AuditCleanEtl<'_> {
    type Output = RecordBundle;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn show_progress(&self) -> bool {
        self.progress
    }

    fn extract(&mut self) -> Result<OsmStream> {
        let index = audit(self.config)?;
        let corrections = StreetNameNormalizer::new(&self.config.street.mapping).corrections(&index);
        info!(
            etl_name = ETL_NAME,
            street_types = index.len(),
            corrections = corrections.len();
            "Street names audited"
        );
        self.street_types = index.len();
        self.corrections = corrections.len();

        let data = &self.config.data;
        self.shaper = Some(
            RecordShaper::new(&data.node_fields, &data.way_fields).with_corrections(corrections),
        );

        let mut sinks = FileSinks::create(data)?;
        sinks.write_headers()?;
        self.sinks = Some(sinks);

        Ok(open_osm(&self.config.osm_data.osm_file)?.with_kinds(&SHAPED_KINDS))
    }

    fn transform(&mut self, _index: u64, element: &Element) -> Result<Option<RecordBundle>> {
        self.shaper
            .as_ref()
            .ok_or_else(Self::not_started)?
            .shape(element)
    }

    fn load(&mut self, output: RecordBundle) -> Result<()> {
        self.sinks
            .as_mut()
            .ok_or_else(Self::not_started)?
            .write_bundle(&output)
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(mut sinks) = self.sinks.take() {
            sinks.flush()?;
        }
        Ok(())
    }
}

/// Runs the optional sample pass and then the full audit-and-clean pass.
pub fn process(config: &Config, progress: bool) -> Result<RunReport> {
    let sample = if config.sample.sample_run {
        Some(SampleEtl::new(config).with_progress(progress).process()?)
    } else {
        None
    };

    let mut etl = AuditCleanEtl::new(config).with_progress(progress);
    let records = etl.process()?;

    Ok(RunReport {
        sample,
        street_types: etl.street_types,
        corrections: etl.corrections,
        records,
    })
}
