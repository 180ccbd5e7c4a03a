//! Tab separated files, as exported by the study's data collection tools.
use qu::ick_use::*;
use serde::de::DeserializeOwned;
use std::path::Path;

/// A tsv file held as text, keyed by its header row.
#[derive(Debug, Clone, Default)]
pub struct Tsv {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Tsv {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        fn inner(path: &Path) -> Result<Tsv> {
            let mut reader = reader().from_path(path)?;
            let headers = reader.headers()?.iter().map(str::to_string).collect();
            let rows = reader
                .records()
                .map(|rec| -> Result<Vec<String>> {
                    Ok(rec?.iter().map(str::to_string).collect())
                })
                .collect::<Result<Vec<Vec<String>>>>()?;
            Ok(Tsv { headers, rows })
        }
        let path = path.as_ref();
        inner(path).with_context(|| format!("while loading \"{}\"", path.display()))
    }

    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// The first of `names` that is a column.
    pub fn column(&self, names: &[&str]) -> Result<usize> {
        names
            .iter()
            .find_map(|name| self.find_column(name))
            .with_context(|| format!("missing column `{}`", names.join("` or `")))
    }

    /// The values of one column.
    pub fn values(&self, col: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(col).map(String::as_str).unwrap_or(""))
    }
}

/// Load every row of a tsv file into `T`.
pub fn load_records<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    fn inner<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        reader()
            .from_path(path)?
            .into_deserialize()
            .collect::<Result<Vec<T>, _>>()
            .map_err(Into::into)
    }
    let path = path.as_ref();
    inner(path).with_context(|| format!("while loading \"{}\"", path.display()))
}

fn reader() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(b'\t')
        .has_headers(true)
        .trim(csv::Trim::All);
    builder
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn loads_text_and_records() {
        #[derive(serde::Deserialize)]
        struct Side {
            subject_id: String,
            device_side: String,
        }

        let path = std::env::temp_dir().join(format!("tsv-test-{}.tsv", std::process::id()));
        fs::write(&path, "subject_id\tdevice_side\n3_BOS\tRight\n4_NYC\t Left \n").unwrap();
        let tsv = Tsv::load(&path).unwrap();
        assert_eq!(tsv.headers, ["subject_id", "device_side"]);
        assert_eq!(tsv.column(&["side", "device_side"]).unwrap(), 1);
        assert!(tsv.column(&["side"]).is_err());
        assert_eq!(tsv.values(1).collect::<Vec<_>>(), ["Right", "Left"]);

        let sides: Vec<Side> = load_records(&path).unwrap();
        assert_eq!(sides[1].subject_id, "4_NYC");
        assert_eq!(sides[1].device_side, "Left");
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn missing_file_names_path() {
        #[derive(Debug, serde::Deserialize)]
        struct Row {}

        let path = std::env::temp_dir().join("tsv-test-no-such-file.tsv");
        let err = load_records::<Row>(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("tsv-test-no-such-file.tsv"));
        let err = Tsv::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("tsv-test-no-such-file.tsv"));
    }
}
