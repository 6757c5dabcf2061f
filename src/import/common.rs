//! Header aliases and delimited-text reading

use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::core::error::{HabError, HabResult};
use crate::core::text::normalize;

/// Field delimiter of the input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Delimiter {
    Tab,
    Comma,
}

impl Delimiter {
    /// Guess from the file extension; anything but `.csv` is tab-separated
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Delimiter::Comma,
            _ => Delimiter::Tab,
        }
    }

    fn byte(&self) -> u8 {
        match self {
            Delimiter::Tab => b'\t',
            Delimiter::Comma => b',',
        }
    }
}

/// Columns the importer understands by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Matricule,
    LastName,
    FirstName,
    Division,
    Service,
    Team,
    Numero,
    Validated,
    Expires,
}

impl Field {
    pub fn all() -> &'static [Field] {
        &[
            Field::Matricule,
            Field::LastName,
            Field::FirstName,
            Field::Division,
            Field::Service,
            Field::Team,
            Field::Numero,
            Field::Validated,
            Field::Expires,
        ]
    }

    /// Accepted header spellings, compared after normalization
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::Matricule => &["matricule", "mat", "identifier", "id"],
            Field::LastName => &["nom", "last name", "last_name", "lastname"],
            Field::FirstName => &["prenom", "first name", "first_name", "firstname"],
            Field::Division => &["division"],
            Field::Service => &["service"],
            Field::Team => &["equipe", "team"],
            Field::Numero => &["n° du titre", "n° titre", "numero", "n du titre", "document"],
            Field::Validated => &[
                "date validation",
                "date de validation",
                "date_validation",
                "validation",
            ],
            Field::Expires => &[
                "date expiration",
                "date d'expiration",
                "date_expiration",
                "expiration",
            ],
        }
    }

    /// Header written by `--template`
    pub fn template_header(&self) -> &'static str {
        match self {
            Field::Matricule => "Matricule",
            Field::LastName => "Nom",
            Field::FirstName => "Prénom",
            Field::Division => "Division",
            Field::Service => "Service",
            Field::Team => "Equipe",
            Field::Numero => "N° du titre",
            Field::Validated => "Date Validation",
            Field::Expires => "Date Expiration",
        }
    }

    pub fn from_header(header: &str) -> Option<Field> {
        let header = normalize(header);
        Field::all()
            .iter()
            .find(|f| f.aliases().iter().any(|a| normalize(a) == header))
            .copied()
    }
}

/// One non-blank data row
#[derive(Debug, Clone)]
pub struct RawRow {
    /// 1-based line number in the source, header included
    pub line: usize,
    pub values: Vec<String>,
}

/// Parsed input: headers, their field mapping and the data rows
#[derive(Debug, Clone)]
pub struct ImportTable {
    headers: Vec<String>,
    fields: Vec<Option<Field>>,
    pub rows: Vec<RawRow>,
}

impl ImportTable {
    /// Build from already-parsed spreadsheet rows; blank rows are dropped
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, values)| RawRow { line: i + 2, values })
            .collect();
        Self::from_rows(headers, rows)
    }

    fn from_rows(headers: Vec<String>, rows: Vec<RawRow>) -> Self {
        let fields = headers.iter().map(|h| Field::from_header(h)).collect();
        let rows = rows
            .into_iter()
            .filter(|row| row.values.iter().any(|v| !v.trim().is_empty()))
            .collect();
        Self {
            headers,
            fields,
            rows,
        }
    }

    /// True when some header maps to `field`
    pub fn has_field(&self, field: Field) -> bool {
        self.fields.contains(&Some(field))
    }

    /// Trimmed cell of the first column mapped to `field`, empty when absent
    pub fn get<'r>(&self, row: &'r RawRow, field: Field) -> &'r str {
        self.fields
            .iter()
            .position(|f| *f == Some(field))
            .and_then(|idx| row.values.get(idx))
            .map(|v| v.trim())
            .unwrap_or("")
    }

    /// (header, cell) pairs of the columns not mapped to a known field
    pub fn free_cells<'t>(&'t self, row: &'t RawRow) -> impl Iterator<Item = (&'t str, &'t str)> {
        self.headers
            .iter()
            .zip(&self.fields)
            .zip(&row.values)
            .filter(|((_, field), _)| field.is_none())
            .map(|((header, _), value)| (header.as_str(), value.as_str()))
    }
}

/// Read tab- or comma-separated text with a header row
pub fn read_delimited(text: &str, delimiter: Delimiter) -> HabResult<ImportTable> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter.byte())
        .quoting(delimiter == Delimiter::Comma)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| HabError::Validation(format!("cannot read header row: {}", e)))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(HabError::Validation("input has no header row".to_string()));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| HabError::Validation(format!("malformed input: {}", e)))?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(rows.len() + 2);
        rows.push(RawRow {
            line,
            values: record.iter().map(str::to_string).collect(),
        });
    }

    Ok(ImportTable::from_rows(headers, rows))
}

/// Header row for `hab import --template`
pub fn template_header(delimiter: Delimiter) -> String {
    let sep = if delimiter == Delimiter::Comma { "," } else { "\t" };
    let mut headers: Vec<&str> = Field::all().iter().map(Field::template_header).collect();
    headers.push("Habilitations");
    headers.join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_aliases() {
        assert_eq!(Field::from_header("MATRICULE"), Some(Field::Matricule));
        assert_eq!(Field::from_header(" Prénom "), Some(Field::FirstName));
        assert_eq!(Field::from_header("N° du titre"), Some(Field::Numero));
        assert_eq!(Field::from_header("Date d'Expiration"), Some(Field::Expires));
        assert_eq!(Field::from_header("ÉQUIPE"), Some(Field::Team));
        assert_eq!(Field::from_header("H1V"), None);
    }

    #[test]
    fn test_read_tsv_skips_blank_lines() {
        let text = "Matricule\tNom\tH1V\n12345\tDupont\tx\n\n\t\t\n54321\tMartin\n";
        let table = read_delimited(text, Delimiter::Tab).unwrap();
        assert_eq!(table.rows.len(), 2);
        let row = &table.rows[1];
        assert_eq!(row.line, 5);
        assert_eq!(table.get(row, Field::Matricule), "54321");
        assert_eq!(table.get(row, Field::FirstName), "");
        assert!(!table.has_field(Field::FirstName));

        let free: Vec<_> = table.free_cells(&table.rows[0]).collect();
        assert_eq!(free, vec![("H1V", "x")]);
    }

    #[test]
    fn test_read_csv_with_quotes_and_bom() {
        let text = "\u{feff}matricule,nom,codes\n12345,\"Dupont, Jr\",\"H1V, B1V\"\n";
        let table = read_delimited(text, Delimiter::Comma).unwrap();
        let row = &table.rows[0];
        assert_eq!(table.get(row, Field::LastName), "Dupont, Jr");
        assert_eq!(table.free_cells(row).next(), Some(("codes", "H1V, B1V")));
    }

    #[test]
    fn test_tsv_keeps_literal_quotes() {
        let text = "matricule\tnom\n12345\tO\"Neil\n";
        let table = read_delimited(text, Delimiter::Tab).unwrap();
        assert_eq!(table.get(&table.rows[0], Field::LastName), "O\"Neil");
    }

    #[test]
    fn test_table_from_spreadsheet_cells() {
        let headers = vec!["MATRICULE".to_string(), "Nom".to_string(), "B1V".to_string()];
        let cells = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let table = ImportTable::new(
            headers,
            vec![cells(&["12345", " Dupont ", "x"]), cells(&["", " ", ""]), cells(&["54321", "Martin"])],
        );
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].line, 4);
        assert_eq!(table.get(&table.rows[0], Field::LastName), "Dupont");
        assert_eq!(table.free_cells(&table.rows[0]).next(), Some(("B1V", "x")));
        assert_eq!(table.free_cells(&table.rows[1]).count(), 0);
    }

    #[test]
    fn test_delimiter_from_extension() {
        assert_eq!(Delimiter::from_path(Path::new("a.CSV")), Delimiter::Comma);
        assert_eq!(Delimiter::from_path(Path::new("a.tsv")), Delimiter::Tab);
        assert_eq!(Delimiter::from_path(Path::new("a")), Delimiter::Tab);
    }

    #[test]
    fn test_template_header_is_readable_back() {
        let header = template_header(Delimiter::Tab);
        let table = read_delimited(&format!("{}\n", header), Delimiter::Tab).unwrap();
        for field in Field::all() {
            assert!(table.has_field(*field), "{:?} not mapped", field);
        }
    }
}
