//! Subject identifiers.
//!
//! Every curated table keys its rows on a `SubjectId`, rendered as `{number}_{SITE}`. The raw
//! data encodes the enrollment site in three different ways, one per kind of input:
//!
//! - device folders are named after the subject and contain `NY` for New York subjects,
//! - metadata spreadsheets contain `ldhp` in their file name for Boston subjects,
//! - score tables use plain integers, with New York subjects offset by 100.
//!
//! All three are normalized here so the tables agree with each other.
use once_cell::sync::Lazy;
use qu::ick_use::*;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Marker in a device folder name for a New York subject.
const NYC_FOLDER_MARKER: &str = "NY";
/// Marker in a metadata spreadsheet name for a Boston subject.
const BOS_METADATA_MARKER: &str = "ldhp";
/// New York subjects in the score tables are numbered from this offset.
const NYC_SCORE_OFFSET: i64 = 100;

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Enrollment site.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Site {
    Bos,
    Nyc,
}

impl Site {
    pub fn code(self) -> &'static str {
        match self {
            Site::Bos => "BOS",
            Site::Nyc => "NYC",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Site {
    type Err = Error;
    fn from_str(input: &str) -> Result<Self> {
        match input.trim() {
            "BOS" => Ok(Site::Bos),
            "NYC" => Ok(Site::Nyc),
            _ => Err(format_err!("didn't recognise site code \"{}\"", input)),
        }
    }
}

/// A study participant and the site they enrolled at.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SubjectId {
    pub number: u32,
    pub site: Site,
}

impl SubjectId {
    pub fn new(number: u32, site: Site) -> Self {
        SubjectId { number, site }
    }

    /// Derive the subject from a device folder name, e.g. `patient 7 NY`.
    pub fn from_device_folder(name: &str) -> Result<Self> {
        let number = first_number(name)
            .with_context(|| format!("no subject number in folder name \"{}\"", name))?;
        let site = if name.contains(NYC_FOLDER_MARKER) {
            Site::Nyc
        } else {
            Site::Bos
        };
        Ok(SubjectId::new(number, site))
    }

    /// Derive the subject from a metadata spreadsheet file name, e.g. `ldhp_metadata_3.xlsx`.
    pub fn from_metadata_file(name: &str) -> Result<Self> {
        let number = first_number(name)
            .with_context(|| format!("no subject number in file name \"{}\"", name))?;
        let site = if name.contains(BOS_METADATA_MARKER) {
            Site::Bos
        } else {
            Site::Nyc
        };
        Ok(SubjectId::new(number, site))
    }

    /// Translate the integer ids used by the score tables.
    ///
    /// Ids below 100 are Boston subjects. New York subjects were numbered in a block starting at
    /// 100, so only the remainder is their subject number.
    pub fn from_score_id(id: i64) -> Result<Self> {
        ensure!(id >= 0, "negative subject id {} in score table", id);
        let (number, site) = if id < NYC_SCORE_OFFSET {
            (id, Site::Bos)
        } else {
            (id % NYC_SCORE_OFFSET, Site::Nyc)
        };
        Ok(SubjectId::new(number as u32, site))
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}_{}", self.number, self.site)
    }
}

impl FromStr for SubjectId {
    type Err = Error;
    fn from_str(input: &str) -> Result<Self> {
        let (number, site) = input
            .trim()
            .split_once('_')
            .with_context(|| format!("subject id \"{}\" should look like `12_BOS`", input))?;
        let number = number
            .parse()
            .with_context(|| format!("subject id \"{}\" should start with a number", input))?;
        Ok(SubjectId::new(number, site.parse()?))
    }
}

impl Serialize for SubjectId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// Score-table id to canonical subject id string.
pub fn translate_subject_id(id: i64) -> Result<String> {
    Ok(SubjectId::from_score_id(id)?.to_string())
}

/// The first run of ascii digits in `input`, parsed as a number.
pub fn first_number(input: &str) -> Option<u32> {
    DIGITS.find(input)?.as_str().parse().ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn score_ids() {
        assert_eq!(translate_subject_id(42).unwrap(), "42_BOS");
        assert_eq!(translate_subject_id(142).unwrap(), "42_NYC");
        assert_eq!(translate_subject_id(99).unwrap(), "99_BOS");
        assert_eq!(translate_subject_id(100).unwrap(), "0_NYC");
        assert!(translate_subject_id(-1).is_err());
    }

    #[test]
    fn device_folders() {
        let id = SubjectId::from_device_folder("patient3_NY").unwrap();
        assert_eq!(id.to_string(), "3_NYC");
        let id = SubjectId::from_device_folder("patient 12").unwrap();
        assert_eq!(id.to_string(), "12_BOS");
        // only the first digit run counts
        let id = SubjectId::from_device_folder("s07_day2").unwrap();
        assert_eq!(id.to_string(), "7_BOS");
        assert!(SubjectId::from_device_folder("no digits here").is_err());
    }

    #[test]
    fn metadata_files() {
        let id = SubjectId::from_metadata_file("ldhp_metadata_4.xlsx").unwrap();
        assert_eq!(id.to_string(), "4_BOS");
        let id = SubjectId::from_metadata_file("mssm 11 metadata.xlsx").unwrap();
        assert_eq!(id.to_string(), "11_NYC");
    }

    #[test]
    fn parse_round_trip() {
        let id: SubjectId = "42_NYC".parse().unwrap();
        assert_eq!(id, SubjectId::new(42, Site::Nyc));
        assert!("42_LDN".parse::<SubjectId>().is_err());
        assert!("42".parse::<SubjectId>().is_err());
    }
}
