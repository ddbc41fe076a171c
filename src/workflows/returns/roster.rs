use crate::config::RosterColumns;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

/// One student as exported by the campus system. Surname alone is not a
/// unique key; surname plus firstname is the natural key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRecord {
    pub username: String,
    pub surname: String,
    pub firstname: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("failed to read roster: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid roster CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("roster is missing required column '{name}'")]
    MissingColumn { name: String },
}

/// Ordered roster plus the set of surnames shared by two or more students.
/// Built once per run; read-only afterwards.
#[derive(Debug)]
pub struct RosterIndex {
    records: Vec<RosterRecord>,
    ambiguous_surnames: HashSet<String>,
}

impl RosterIndex {
    pub fn from_records(records: Vec<RosterRecord>) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for record in &records {
            *counts.entry(record.surname.as_str()).or_insert(0) += 1;
        }
        let ambiguous_surnames = counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(surname, _)| surname.to_string())
            .collect();

        Self {
            records,
            ambiguous_surnames,
        }
    }

    pub fn from_path<P: AsRef<Path>>(
        path: P,
        columns: &RosterColumns,
        delimiter: u8,
    ) -> Result<Self, RosterError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, columns, delimiter)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        columns: &RosterColumns,
        delimiter: u8,
    ) -> Result<Self, RosterError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);

        // Column labels are configurable, so header positions are resolved
        // at load time instead of serde renames.
        let headers = csv_reader.headers()?.clone();
        let username_idx = column_index(&headers, &columns.username)?;
        let surname_idx = column_index(&headers, &columns.surname)?;
        let firstname_idx = column_index(&headers, &columns.firstname)?;

        let mut records = Vec::new();
        for row in csv_reader.records() {
            let row = row?;
            records.push(RosterRecord {
                username: row.get(username_idx).unwrap_or_default().to_string(),
                surname: row.get(surname_idx).unwrap_or_default().to_string(),
                firstname: row.get(firstname_idx).unwrap_or_default().to_string(),
            });
        }

        Ok(Self::from_records(records))
    }

    /// All records whose surname equals `surname` exactly, in roster order.
    pub fn candidates(&self, surname: &str) -> Vec<&RosterRecord> {
        self.records
            .iter()
            .filter(|record| record.surname == surname)
            .collect()
    }

    pub fn is_ambiguous(&self, surname: &str) -> bool {
        self.ambiguous_surnames.contains(surname)
    }

    pub fn records(&self) -> &[RosterRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize, RosterError> {
    headers
        .iter()
        .position(|header| header == name)
        .ok_or_else(|| RosterError::MissingColumn {
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn columns() -> RosterColumns {
        RosterColumns {
            username: "Stud.IP Benutzername".to_string(),
            surname: "Nachname".to_string(),
            firstname: "Vorname".to_string(),
        }
    }

    #[test]
    fn loads_roster_with_semicolon_delimiter() {
        let csv = "Stud.IP Benutzername;Nachname;Vorname\n\
                   anna.smith;Smith;Anna\n\
                   cid.lee;Lee;Cid\n";
        let index =
            RosterIndex::from_reader(Cursor::new(csv), &columns(), b';').expect("roster loads");

        assert_eq!(index.len(), 2);
        assert_eq!(index.records()[0].username, "anna.smith");
        assert!(!index.is_ambiguous("Smith"));
    }

    #[test]
    fn flags_duplicate_surnames_as_ambiguous() {
        let csv = "Stud.IP Benutzername;Nachname;Vorname\n\
                   anna.smith;Smith;Anna\n\
                   bob.smith;Smith;Bob\n\
                   cid.lee;Lee;Cid\n";
        let index =
            RosterIndex::from_reader(Cursor::new(csv), &columns(), b';').expect("roster loads");

        assert!(index.is_ambiguous("Smith"));
        assert!(!index.is_ambiguous("Lee"));
        assert_eq!(index.candidates("Smith").len(), 2);
    }

    #[test]
    fn ambiguity_ignores_firstname() {
        // Identical surname and firstname still counts as two records.
        let csv = "Stud.IP Benutzername;Nachname;Vorname\n\
                   a.nguyen;Nguyen;The Sang\n\
                   b.nguyen;Nguyen;The Sang\n";
        let index =
            RosterIndex::from_reader(Cursor::new(csv), &columns(), b';').expect("roster loads");

        assert!(index.is_ambiguous("Nguyen"));
        assert_eq!(index.candidates("Nguyen").len(), 2);
    }

    #[test]
    fn candidates_preserve_roster_order() {
        let csv = "Stud.IP Benutzername;Nachname;Vorname\n\
                   bob.smith;Smith;Bob\n\
                   anna.smith;Smith;Anna\n";
        let index =
            RosterIndex::from_reader(Cursor::new(csv), &columns(), b';').expect("roster loads");

        let firstnames: Vec<&str> = index
            .candidates("Smith")
            .iter()
            .map(|record| record.firstname.as_str())
            .collect();
        assert_eq!(firstnames, vec!["Bob", "Anna"]);
    }

    #[test]
    fn respects_configured_column_names_and_delimiter() {
        let csv = "login,last,first\nanna.smith,Smith,Anna\n";
        let renamed = RosterColumns {
            username: "login".to_string(),
            surname: "last".to_string(),
            firstname: "first".to_string(),
        };
        let index =
            RosterIndex::from_reader(Cursor::new(csv), &renamed, b',').expect("roster loads");
        assert_eq!(index.records()[0].surname, "Smith");
    }

    #[test]
    fn missing_column_is_reported_by_name() {
        let csv = "Stud.IP Benutzername;Vorname\nanna.smith;Anna\n";
        let err = RosterIndex::from_reader(Cursor::new(csv), &columns(), b';')
            .expect_err("column missing");
        match err {
            RosterError::MissingColumn { name } => assert_eq!(name, "Nachname"),
            other => panic!("expected missing column, got {other:?}"),
        }
    }

    #[test]
    fn missing_roster_file_propagates_io_error() {
        let err = RosterIndex::from_path("./does-not-exist.csv", &columns(), b';')
            .expect_err("expected io error");
        assert!(matches!(err, RosterError::Io(_)));
    }
}
