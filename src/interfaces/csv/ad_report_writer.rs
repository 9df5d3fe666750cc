use crate::domain::ad::AdPerformance;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct AdReportRecord<'a> {
    ad_id: String,
    title: &'a str,
    impressions: u64,
    clicks: u64,
    ctr: String,
}

/// Writes the supplier ad performance report as CSV.
pub struct AdReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AdReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_rows<'a>(&mut self, rows: impl IntoIterator<Item = &'a AdPerformance>) -> Result<()> {
        let mut wrote_any = false;
        for row in rows {
            self.writer.serialize(AdReportRecord {
                ad_id: row.ad_id.to_string(),
                title: &row.title,
                impressions: row.impressions,
                clicks: row.clicks,
                ctr: format!("{:.4}", row.ctr),
            })?;
            wrote_any = true;
        }
        // serialize() only emits the header alongside the first record.
        if !wrote_any {
            self.writer
                .write_record(["ad_id", "title", "impressions", "clicks", "ctr"])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
