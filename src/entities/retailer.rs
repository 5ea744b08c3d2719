// 🏪 Retailer Entity - Static reference data for purchase descriptions
//
// Retailers are imported from a semicolon-delimited CSV with the columns
// `name;dominant_operational_format`, or taken from the built-in list.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retailer {
    pub id: i64,
    pub name: String,

    /// Retail category ("Hypermarket/Supercenter/Supermarket", "Warehouse Club", ...)
    pub dominant_operational_format: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RetailerRow {
    name: String,
    #[serde(default)]
    dominant_operational_format: Option<String>,
}

/// Load retailers from a `;`-delimited CSV file
///
/// Ids are assigned in file order starting at 1. Blank names are skipped.
pub fn load_retailers_csv(csv_path: &Path) -> Result<Vec<Retailer>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .with_context(|| format!("Failed to open retailer CSV {}", csv_path.display()))?;

    let mut retailers = Vec::new();

    for result in rdr.deserialize() {
        let row: RetailerRow = result.context("Failed to deserialize retailer row")?;
        if row.name.is_empty() {
            continue;
        }

        retailers.push(Retailer {
            id: retailers.len() as i64 + 1,
            name: row.name,
            dominant_operational_format: row
                .dominant_operational_format
                .filter(|format| !format.is_empty()),
        });
    }

    Ok(retailers)
}

/// Built-in retailer list used when no CSV is configured
pub fn default_retailers() -> Vec<Retailer> {
    const RETAILERS: &[(&str, &str)] = &[
        ("Walmart", "Hypermarket/Supercenter/Supermarket"),
        ("Costco", "Cash & Carry/Warehouse Club"),
        ("Kroger", "Supermarket"),
        ("Amazon", "Non-Store"),
        ("Walgreens", "Drug Store/Pharmacy"),
        ("Home Depot", "Home Improvement"),
        ("CVS Health", "Drug Store/Pharmacy"),
        ("Target", "Discount Department Store"),
        ("Lowe's", "Home Improvement"),
        ("Albertsons", "Supermarket"),
        ("Best Buy", "Electronics Specialty"),
        ("Ikea", "Other Specialty"),
        ("Aldi", "Discount Store"),
        ("Starbucks", "Restaurant/Cafe"),
        ("7-Eleven", "Convenience/Forecourt Store"),
    ];

    RETAILERS
        .iter()
        .enumerate()
        .map(|(i, (name, format))| Retailer {
            id: i as i64 + 1,
            name: name.to_string(),
            dominant_operational_format: Some(format.to_string()),
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_retailers_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name;dominant_operational_format").unwrap();
        writeln!(file, "Walmart;Hypermarket/Supercenter/Supermarket").unwrap();
        writeln!(file, " Tesco ; Supermarket ").unwrap();
        writeln!(file, ";Ignored").unwrap();
        writeln!(file, "Corner Shop;").unwrap();

        let retailers = load_retailers_csv(file.path()).unwrap();

        assert_eq!(retailers.len(), 3);
        assert_eq!(retailers[0].id, 1);
        assert_eq!(retailers[1].name, "Tesco");
        assert_eq!(
            retailers[1].dominant_operational_format.as_deref(),
            Some("Supermarket")
        );
        assert_eq!(retailers[2].id, 3);
        assert!(retailers[2].dominant_operational_format.is_none());
    }

    #[test]
    fn test_missing_csv_is_an_error() {
        let result = load_retailers_csv(Path::new("/nonexistent/retailers.csv"));
        assert!(result.is_err());
    }

    #[test]
    fn test_default_retailers_have_unique_names() {
        let retailers = default_retailers();
        let mut names: Vec<&str> = retailers.iter().map(|r| r.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), retailers.len());
    }
}
