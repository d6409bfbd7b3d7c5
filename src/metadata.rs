// Reader for the per-strain metadata table: a csv file with `strain`,
// `date` and (optionally) `country` columns. A non-empty country overrides
// the strain's host label, with internal spaces removed.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use csv::Reader;
use serde::Deserialize;

use crate::errors::TnetError;

#[derive(Debug, Deserialize)]
struct MetadataRow {
    strain: String,
    date: String,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Metadata {
    /// Event date per node name (leaves and named internal nodes alike).
    pub dates: HashMap<String, String>,
    /// Host label override per strain; only strains with a non-empty
    /// country column appear here.
    pub countries: HashMap<String, String>,
}

impl Metadata {
    pub fn from_reader<R: Read>(input: R) -> Result<Metadata, TnetError> {
        let mut reader = Reader::from_reader(input);
        let mut metadata = Metadata::default();
        for row in reader.deserialize() {
            let row: MetadataRow = row?;
            metadata.dates.insert(row.strain.clone(), row.date);
            if let Some(country) = row.country {
                if !country.is_empty() {
                    metadata
                        .countries
                        .insert(row.strain, country.replace(' ', ""));
                }
            }
        }
        Ok(metadata)
    }

    pub fn from_path(path: &Path) -> Result<Metadata, TnetError> {
        let file = std::fs::File::open(path)?;
        Metadata::from_reader(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_dates_and_country_overrides() {
        let table = "\
strain,date,country
EPI_1,2020-03-01,United Kingdom
EPI_2,2020-03-05,
EPI_3,2020-04-11,Italy
";
        let metadata = Metadata::from_reader(table.as_bytes()).unwrap();
        assert_eq!(metadata.dates.len(), 3);
        assert_eq!(metadata.dates["EPI_2"], "2020-03-05");
        // Spaces inside the label are removed; empty countries are skipped.
        assert_eq!(metadata.countries["EPI_1"], "UnitedKingdom");
        assert_eq!(metadata.countries["EPI_3"], "Italy");
        assert!(!metadata.countries.contains_key("EPI_2"));
    }

    #[test]
    fn country_column_is_optional() {
        let table = "strain,date\nEPI_1,2020-03-01\n";
        let metadata = Metadata::from_reader(table.as_bytes()).unwrap();
        assert_eq!(metadata.dates["EPI_1"], "2020-03-01");
        assert!(metadata.countries.is_empty());
    }
}
