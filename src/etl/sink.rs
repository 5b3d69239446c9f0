use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::{Terminator, WriterBuilder};

use crate::config::DataConfig;
use crate::data::records::{Record, RecordBundle};
use crate::errors::{Error, Result};

/// Comma separated output with a fixed, header-declared column order.
pub struct CsvSink<W: Write> {
    name: String,
    fields: Vec<String>,
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(name: &str, fields: &[String], inner: W) -> CsvSink<W> {
        let writer = WriterBuilder::new()
            .delimiter(b',')
            .terminator(Terminator::Any(b'\n'))
            .has_headers(false)
            .from_writer(inner);
        CsvSink {
            name: name.to_string(),
            fields: fields.to_vec(),
            writer,
        }
    }

    pub fn write_header(&mut self) -> Result<()> {
        self.writer.write_record(&self.fields)?;
        Ok(())
    }

    /// Lays `record` out in header order. Columns the record lacks stay
    /// empty; fields without a column are rejected.
    pub fn row(&self, record: &Record) -> Result<Vec<String>> {
        if let Some(field) = record
            .field_names()
            .find(|name| !self.fields.iter().any(|field| field == *name))
        {
            return Err(Error::UnexpectedField {
                sink: self.name.clone(),
                field: field.to_string(),
            });
        }
        Ok(self
            .fields
            .iter()
            .map(|field| record.get(field).unwrap_or_default().to_string())
            .collect())
    }

    pub fn rows(&self, records: &[Record]) -> Result<Vec<Vec<String>>> {
        records.iter().map(|record| self.row(record)).collect()
    }

    pub fn write_rows(&mut self, rows: &[Vec<String>]) -> Result<()> {
        for row in rows {
            self.writer.write_record(row)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| Error::Io(err.into_error()))
    }
}

/// The five outputs of one run. Dropping the set closes every file.
pub struct RecordSinks<W: Write> {
    pub nodes: CsvSink<W>,
    pub node_tags: CsvSink<W>,
    pub ways: CsvSink<W>,
    pub way_nodes: CsvSink<W>,
    pub way_tags: CsvSink<W>,
}

pub type FileSinks = RecordSinks<BufWriter<File>>;

/// Creates `path` for writing along with any missing parent directories.
pub(crate) fn create_output(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

impl FileSinks {
    pub fn create(data: &DataConfig) -> Result<FileSinks> {
        Ok(RecordSinks {
            nodes: CsvSink::new("nodes", &data.node_fields, create_output(&data.nodes_path)?),
            node_tags: CsvSink::new("node_tags", &data.node_tag_fields, create_output(&data.node_tags_path)?),
            ways: CsvSink::new("ways", &data.way_fields, create_output(&data.ways_path)?),
            way_nodes: CsvSink::new("way_nodes", &data.way_nodes_fields, create_output(&data.way_nodes_path)?),
            way_tags: CsvSink::new("way_tags", data.way_tag_fields(), create_output(&data.way_tags_path)?),
        })
    }
}

impl<W: Write> RecordSinks<W> {
    fn all(&mut self) -> [&mut CsvSink<W>; 5] {
        [
            &mut self.nodes,
            &mut self.node_tags,
            &mut self.ways,
            &mut self.way_nodes,
            &mut self.way_tags,
        ]
    }

    pub fn write_headers(&mut self) -> Result<()> {
        for sink in self.all() {
            sink.write_header()?;
        }
        Ok(())
    }

    /// Writes a bundle only once every one of its rows has been laid out, so
    /// a rejected bundle leaves no partial rows behind.
    pub fn write_bundle(&mut self, bundle: &RecordBundle) -> Result<()> {
        match bundle {
            RecordBundle::Node { node, node_tags } => {
                let node_row = self.nodes.row(node)?;
                let tag_rows = self.node_tags.rows(node_tags)?;
                self.nodes.write_rows(&[node_row])?;
                self.node_tags.write_rows(&tag_rows)
            }
            RecordBundle::Way {
                way,
                way_nodes,
                way_tags,
            } => {
                let way_row = self.ways.row(way)?;
                let way_node_rows = self.way_nodes.rows(way_nodes)?;
                let tag_rows = self.way_tags.rows(way_tags)?;
                self.ways.write_rows(&[way_row])?;
                self.way_nodes.write_rows(&way_node_rows)?;
                self.way_tags.write_rows(&tag_rows)
            }
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        for sink in self.all() {
            sink.flush()?;
        }
        Ok(())
    }
}
