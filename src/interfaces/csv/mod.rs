pub mod activity_reader;
pub mod ad_report_writer;
