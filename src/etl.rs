pub mod audit;
pub mod audit_clean;
pub mod clean;
pub mod parse_osm;
pub mod sample;
pub mod shape;
pub mod sink;

use log::{error, info, warn};

use crate::data::osm::Element;
use crate::errors::Result;
use crate::etl::parse_osm::OsmStream;

/// Element counts for one pass over the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EtlSummary {
    /// Elements read from the document.
    pub elements: u64,
    /// Elements that produced output.
    pub loaded: u64,
    /// Elements with nothing to load.
    pub ignored: u64,
    /// Elements dropped because of an error of their own.
    pub skipped: u64,
}

/// One streaming pass: every element is transformed, then loaded, on its own.
/// Errors scoped to a single element drop that element; anything else stops
/// the pass.
pub trait Etl {
    type Output;

    fn etl_name(&self) -> &str;

    fn extract(&mut self) -> Result<OsmStream>;
    fn transform(&mut self, index: u64, element: &Element) -> Result<Option<Self::Output>>;
    fn load(&mut self, output: Self::Output) -> Result<()>;
    fn finish(&mut self) -> Result<()>;

    fn show_progress(&self) -> bool {
        false
    }

    fn process(&mut self) -> Result<EtlSummary> {
        info!(etl_name = self.etl_name(); "Starting ETL process");

        info!(etl_name = self.etl_name(); "Extracting");
        let input = match self.extract() {
            Ok(input) => input,
            Err(err) => {
                error!(etl_name = self.etl_name(), err = err.to_string(); "Extraction failed with error");
                return Err(err);
            }
        };
        let input: Box<dyn Iterator<Item = Result<Element>>> = if self.show_progress() {
            Box::new(tqdm::tqdm(input))
        } else {
            Box::new(input)
        };

        info!(etl_name = self.etl_name(); "Transforming and loading");
        let mut summary = EtlSummary::default();
        for (index, element) in (0u64..).zip(input) {
            summary.elements += 1;
            let element = match element {
                Ok(element) => element,
                Err(err) if err.is_element_scoped() => {
                    warn!(etl_name = self.etl_name(), err = err.to_string(); "Skipping unreadable element");
                    summary.skipped += 1;
                    continue;
                }
                Err(err) => {
                    error!(etl_name = self.etl_name(), err = err.to_string(); "Reading failed with error");
                    return Err(err);
                }
            };

            let outcome = match self.transform(index, &element) {
                Ok(Some(output)) => self.load(output).map(|_| true),
                Ok(None) => Ok(false),
                Err(err) => Err(err),
            };
            match outcome {
                Ok(true) => summary.loaded += 1,
                Ok(false) => summary.ignored += 1,
                Err(err) if err.is_element_scoped() => {
                    warn!(
                        etl_name = self.etl_name(),
                        kind = element.kind.as_str(),
                        id = element.attribute("id").unwrap_or("?"),
                        err = err.to_string();
                        "Skipping element"
                    );
                    summary.skipped += 1;
                }
                Err(err) => {
                    error!(etl_name = self.etl_name(), err = err.to_string(); "Loading failed with error");
                    return Err(err);
                }
            }
        }

        if let Err(err) = self.finish() {
            error!(etl_name = self.etl_name(), err = err.to_string(); "Finishing failed with error");
            return Err(err);
        }
        info!(
            etl_name = self.etl_name(),
            elements = summary.elements,
            loaded = summary.loaded,
            ignored = summary.ignored,
            skipped = summary.skipped;
            "Process finished"
        );
        Ok(summary)
    }
}
