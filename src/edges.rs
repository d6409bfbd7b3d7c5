// Post-processing of the json report: group the dated transmission edges by
// calendar month and write a csv matrix (edge rows, active-month columns).

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::aggregate::Report;
use crate::errors::TnetError;

type Month = (i32, u32);

fn parse_month(date: &str) -> Result<Month, TnetError> {
    let mut parts = date.split('-');
    let year = parts
        .next()
        .and_then(|p| p.parse::<i32>().ok())
        .ok_or_else(|| TnetError::Parse(format!("bad date {:?} in dated edges", date)))?;
    let month = parts
        .next()
        .and_then(|p| p.parse::<u32>().ok())
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| TnetError::Parse(format!("bad date {:?} in dated edges", date)))?;
    Ok((year, month))
}

/// Active months (ascending) and per-edge occurrence counts per month.
pub(crate) fn group_by_month(
    dated_edges: &[(String, String)],
) -> Result<(Vec<Month>, BTreeMap<String, BTreeMap<Month, u64>>), TnetError> {
    let mut active: BTreeSet<Month> = BTreeSet::new();
    let mut grouped: BTreeMap<String, BTreeMap<Month, u64>> = BTreeMap::new();
    for (edge, date) in dated_edges {
        let month = parse_month(date)?;
        active.insert(month);
        *grouped
            .entry(edge.clone())
            .or_default()
            .entry(month)
            .or_insert(0) += 1;
    }
    Ok((active.into_iter().collect(), grouped))
}

pub fn start(input_json: &Path, output_csv: &Path) -> Result<(), TnetError> {
    let file = File::open(input_json)?;
    let report: Report = serde_json::from_reader(BufReader::new(file))?;
    let (months, grouped) = group_by_month(&report.dated_edges)?;

    let mut writer = csv::Writer::from_path(output_csv)?;
    let mut header = vec!["edges/dates".to_string()];
    header.extend(months.iter().map(|(y, m)| format!("{}-{}", y, m)));
    writer.write_record(&header)?;
    for (edge, counts) in &grouped {
        let mut row = vec![edge.clone()];
        row.extend(
            months
                .iter()
                .map(|month| counts.get(month).copied().unwrap_or(0).to_string()),
        );
        writer.write_record(&row)?;
    }
    writer.flush()?;
    println!(
        "Wrote monthly counts for {} edges across {} months to {:?}",
        grouped.len(),
        months.len(),
        output_csv
    );
    Ok(())
}
