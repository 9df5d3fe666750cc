use crate::domain::activity::ActivityDraft;
use crate::error::{AppError, Result};
use serde::Deserialize;
use std::io::Read;

/// One line of the canonical activity list.
#[derive(Debug, Deserialize)]
struct ActivityRecord {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    location: Option<String>,
}

impl From<ActivityRecord> for ActivityDraft {
    fn from(record: ActivityRecord) -> Self {
        Self {
            title: record.title,
            description: record.description,
            category: record.category,
            tags: record
                .tags
                .split(';')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            location: record.location.filter(|l| !l.is_empty()),
        }
    }
}

/// Reads activity drafts from a CSV source with the columns
/// `title,description,category,tags,location`. Tags are `;`-separated.
pub struct ActivityReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ActivityReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily yields one result per row, so a bad row does not stop the rest.
    pub fn activities(self) -> impl Iterator<Item = Result<ActivityDraft>> {
        self.reader.into_deserialize::<ActivityRecord>().map(|result| {
            result
                .map(ActivityDraft::from)
                .map_err(AppError::from)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_splits_tags() {
        let data = "title,description,category,tags,location\n\
                    Learn to surf, Catch a wave, sport, ocean;Water Sports , Bali\n\
                    See the northern lights,,nature,night sky,";
        let drafts: Vec<Result<ActivityDraft>> = ActivityReader::new(data.as_bytes()).activities().collect();

        assert_eq!(drafts.len(), 2);
        let surf = drafts[0].as_ref().unwrap();
        assert_eq!(surf.title, "Learn to surf");
        assert_eq!(surf.tags, vec!["ocean".to_string(), "Water Sports".to_string()]);
        assert_eq!(surf.location.as_deref(), Some("Bali"));

        let lights = drafts[1].as_ref().unwrap();
        assert!(lights.description.is_empty());
        assert_eq!(lights.tags, vec!["night sky".to_string()]);
        assert_eq!(lights.location, None);
    }

    #[test]
    fn test_reader_reports_bad_rows() {
        let data: &[u8] = b"title,description,category,tags,location\n\xff\xfe,x,y,z,w\nFly a kite,,fun,wind,\n";
        let results: Vec<Result<ActivityDraft>> = ActivityReader::new(data).activities().collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(AppError::CsvError(_))));
        assert_eq!(results[1].as_ref().unwrap().title, "Fly a kite");
    }
}
