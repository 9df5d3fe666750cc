use std::fs::File;
use std::io::Error;
use std::path::Path;

pub const SESSION_SECRET: &str = "session-secret-for-tests";

pub fn generate_activities_csv(path: &Path, titles: &[&str]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["title", "description", "category", "tags", "location"])?;
    for title in titles {
        wtr.write_record([title, "", "misc", "fun;outdoors", ""])?;
    }

    wtr.flush()?;
    Ok(())
}
