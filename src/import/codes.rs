//! Certification code extraction from free-form columns

use std::collections::BTreeSet;

use crate::entities::certification::{CertClass, HT_CODES, ST_CODES};

/// Legacy spreadsheet headers that stand for one code
const HEADER_ALIASES: &[(&str, &str)] = &[
    ("HNE", "H1V"),
    ("HE1HT", "H1V"),
    ("HE2HT", "H2V"),
    ("HEC", "HC"),
    ("HER", "BR"),
    ("HE1ST", "H1N"),
    ("HE2ST", "H2N"),
    ("HSF6", "SF6"),
];

/// Cell values that mean "not held" under a code-named column
const NEGATIVE_MARKERS: &[&str] = &["0", "non", "no", "-", "false"];

/// Codes found on one row, split by class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedCodes {
    pub ht: BTreeSet<String>,
    pub st: BTreeSet<String>,
}

impl ExtractedCodes {
    pub fn is_empty(&self) -> bool {
        self.ht.is_empty() && self.st.is_empty()
    }

    pub fn get(&self, class: CertClass) -> &BTreeSet<String> {
        match class {
            CertClass::Ht => &self.ht,
            CertClass::St => &self.st,
        }
    }

    fn add(&mut self, code: &str) {
        match class_of(code) {
            Some(CertClass::Ht) => {
                self.ht.insert(code.to_string());
            }
            Some(CertClass::St) => {
                self.st.insert(code.to_string());
            }
            None => {}
        }
    }
}

/// Scan (header, cell) pairs for codes
///
/// Callers pass only the columns that are not identity, placement, number
/// or date fields.
pub fn extract_codes<'a, I>(cells: I) -> ExtractedCodes
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut found = ExtractedCodes::default();

    for (header, value) in cells {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        if let Some(code) = header_code(header) {
            if !is_negative(value) {
                found.add(code);
            }
        }

        for token in value.split(|c: char| !c.is_ascii_alphanumeric()) {
            let token = token.to_ascii_uppercase();
            if class_of(&token).is_some() {
                found.add(&token);
            }
        }
    }

    found
}

/// Class whose vocabulary holds `code`
pub fn class_of(code: &str) -> Option<CertClass> {
    if HT_CODES.contains(&code) {
        Some(CertClass::Ht)
    } else if ST_CODES.contains(&code) {
        Some(CertClass::St)
    } else {
        None
    }
}

fn header_code(header: &str) -> Option<&'static str> {
    let header = header.trim().to_ascii_uppercase();
    HT_CODES
        .iter()
        .chain(ST_CODES)
        .find(|c| **c == header)
        .copied()
        .or_else(|| {
            HEADER_ALIASES
                .iter()
                .find(|(alias, _)| *alias == header)
                .map(|(_, code)| *code)
        })
}

fn is_negative(value: &str) -> bool {
    let value = value.to_lowercase();
    NEGATIVE_MARKERS.contains(&value.as_str())
}
