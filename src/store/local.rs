//! A [`DataStore`] over a directory tree.
//!
//! Entity ids are `/`-separated paths relative to the root. Every file gets a file handle id when
//! the store is opened (`1..=n` in path order). Copied handles are only recorded in memory; the
//! copies made during a run are available from [`LocalStore::copies`].
use super::{
    CopyRequest, CopyResult, DataStore, Entity, EntityKind, FetchedFile, FileHandleId,
    COPY_BATCH_SIZE,
};
use crate::{
    table::{Column, Table},
    util::path_exists,
};
use qu::ick_use::*;
use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};

/// A file handle copy made during this run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CopyRecord {
    pub original_file_handle_id: FileHandleId,
    pub new_file_handle_id: FileHandleId,
    pub associate_object_id: String,
    pub content_type: String,
    pub file_name: Option<String>,
}

pub struct LocalStore {
    root: PathBuf,
    output: PathBuf,
    handles: BTreeMap<String, FileHandleId>,
    known_handles: BTreeSet<FileHandleId>,
    copies: Vec<CopyRecord>,
    next_handle: FileHandleId,
}

impl LocalStore {
    /// Open a store rooted at `root`, writing tables under `output`.
    pub fn open(root: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let mut files = vec![];
        scan(root, "", &mut files)
            .with_context(|| format!("scanning store at \"{}\"", root.display()))?;
        files.sort();
        let handles = files
            .into_iter()
            .zip(1..)
            .collect::<BTreeMap<String, FileHandleId>>();
        let next_handle = handles.len() as FileHandleId + 1;
        event!(
            Level::INFO,
            "opened store at \"{}\" ({} files)",
            root.display(),
            handles.len()
        );
        Ok(LocalStore {
            root: root.to_owned(),
            output: output.as_ref().to_owned(),
            known_handles: handles.values().copied().collect(),
            handles,
            copies: vec![],
            next_handle,
        })
    }

    pub fn copies(&self) -> &[CopyRecord] {
        &self.copies
    }

    fn path(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }
}

impl DataStore for LocalStore {
    fn children(&self, parent: &str) -> Result<Vec<Entity>> {
        let dir = self.path(parent);
        let mut children = vec![];
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("listing folder \"{}\"", dir.display()))?
        {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let kind = if entry.file_type()?.is_dir() {
                EntityKind::Folder
            } else {
                EntityKind::File
            };
            children.push(Entity {
                id: join_id(parent, &name),
                name,
                kind,
            });
        }
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    fn file_handle(&self, id: &str) -> Result<FileHandleId> {
        self.handles
            .get(id)
            .copied()
            .with_context(|| format!("no file \"{}\" in store", id))
    }

    fn fetch(&self, id: &str) -> Result<FetchedFile> {
        Ok(FetchedFile {
            data_file_handle_id: self.file_handle(id)?,
            path: self.path(id),
        })
    }

    fn copy_file_handles(&mut self, requests: &[CopyRequest]) -> Result<Vec<CopyResult>> {
        ensure!(
            requests.len() <= COPY_BATCH_SIZE,
            "at most {} file handles can be copied at once, got {}",
            COPY_BATCH_SIZE,
            requests.len()
        );
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            ensure!(
                self.known_handles.contains(&request.file_handle_id),
                "unknown file handle {}",
                request.file_handle_id
            );
            ensure!(
                self.handles.get(&request.associate_object_id) == Some(&request.file_handle_id),
                "file handle {} is not reachable from \"{}\"",
                request.file_handle_id,
                request.associate_object_id
            );
            let new_file_handle_id = self.next_handle;
            self.next_handle += 1;
            self.known_handles.insert(new_file_handle_id);
            self.copies.push(CopyRecord {
                original_file_handle_id: request.file_handle_id,
                new_file_handle_id,
                associate_object_id: request.associate_object_id.clone(),
                content_type: request.content_type.clone(),
                file_name: request.file_name.clone(),
            });
            results.push(CopyResult {
                original_file_handle_id: request.file_handle_id,
                new_file_handle_id,
            });
        }
        Ok(results)
    }

    fn store_table(&mut self, parent: &str, table: &Table) -> Result {
        fn inner(dir: &Path, parent: &str, table: &Table) -> Result {
            fs::create_dir_all(dir)?;
            let stem = table.file_stem();

            let data_path = dir.join(format!("{}.csv", stem));
            if path_exists(&data_path)? {
                event!(
                    Level::WARN,
                    "overwriting existing table at \"{}\"",
                    data_path.display()
                );
            }
            let mut writer = csv::Writer::from_path(&data_path)?;
            writer.write_record(table.columns.iter().map(|col| col.name.as_str()))?;
            for row in &table.rows {
                writer.write_record(row)?;
            }
            writer.flush()?;

            let schema = Schema {
                name: &table.name,
                parent,
                columns: &table.columns,
            };
            fs::write(
                dir.join(format!("{}.schema.json", stem)),
                serde_json::to_string_pretty(&schema)?,
            )?;
            Ok(())
        }
        let dir = self.output.join(parent);
        inner(&dir, parent, table)
            .with_context(|| format!("storing table \"{}\" in \"{}\"", table.name, dir.display()))?;
        event!(
            Level::INFO,
            "stored table \"{}\" ({} rows) in \"{}\"",
            table.name,
            table.len(),
            parent
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct Schema<'a> {
    name: &'a str,
    parent: &'a str,
    columns: &'a [Column],
}

fn join_id(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), name)
    }
}

fn scan(root: &Path, prefix: &str, files: &mut Vec<String>) -> Result {
    for entry in fs::read_dir(root.join(prefix))? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let id = join_id(prefix, &name);
        if entry.file_type()?.is_dir() {
            scan(root, &id, files)?;
        } else {
            files.push(id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::table::ColumnType;

    fn temp_store(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sensor-study-curation-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("store/shimmer/1_BOS")).unwrap();
        fs::create_dir_all(dir.join("store/shimmer/2_NYC")).unwrap();
        fs::write(dir.join("store/shimmer/1_BOS/day_1.tsv"), "timestamp\n1\n").unwrap();
        fs::write(dir.join("store/shimmer/1_BOS/day_2.tsv"), "timestamp\n2\n").unwrap();
        fs::write(dir.join("store/shimmer/2_NYC/day_1.tsv"), "timestamp\n3\n").unwrap();
        fs::write(dir.join("store/shimmer/.DS_Store"), "").unwrap();
        dir
    }

    #[test]
    fn listing_and_handles() {
        let dir = temp_store("listing");
        let store = LocalStore::open(dir.join("store"), dir.join("out")).unwrap();
        let folders = store.folders("shimmer").unwrap();
        assert_eq!(
            folders.iter().map(|f| f.id.as_str()).collect::<Vec<_>>(),
            ["shimmer/1_BOS", "shimmer/2_NYC"]
        );
        let files = store.files("shimmer/1_BOS").unwrap();
        assert_eq!(files[1].name, "day_2.tsv");
        assert_eq!(store.file_handle("shimmer/1_BOS/day_1.tsv").unwrap(), 1);
        assert_eq!(store.file_handle("shimmer/2_NYC/day_1.tsv").unwrap(), 3);
        assert!(store.file_handle("shimmer/.DS_Store").is_err());
        let fetched = store.fetch("shimmer/1_BOS/day_2.tsv").unwrap();
        assert_eq!(fs::read_to_string(fetched.path).unwrap(), "timestamp\n2\n");
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn copies_get_fresh_handles() {
        let dir = temp_store("copies");
        let mut store = LocalStore::open(dir.join("store"), dir.join("out")).unwrap();
        let request = CopyRequest {
            file_handle_id: 2,
            associate_object_id: "shimmer/1_BOS/day_2.tsv".into(),
            content_type: "text/tab-separated-values".into(),
            file_name: None,
        };
        let results = store.copy_file_handles(&[request.clone()]).unwrap();
        assert_eq!(
            results,
            [CopyResult {
                original_file_handle_id: 2,
                new_file_handle_id: 4
            }]
        );
        assert_eq!(store.copies().len(), 1);

        let wrong_entity = CopyRequest {
            associate_object_id: "shimmer/2_NYC/day_1.tsv".into(),
            ..request
        };
        assert!(store.copy_file_handles(&[wrong_entity]).is_err());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn stores_csv_and_schema() {
        let dir = temp_store("tables");
        let mut store = LocalStore::open(dir.join("store"), dir.join("out")).unwrap();
        let mut table = Table::new(
            "Sleep Diary",
            vec![
                Column::string("subject_id", 6),
                Column::new("sleep", ColumnType::Integer),
            ],
        );
        table.rows.push(vec!["3_BOS".into(), "1546300800".into()]);
        store.store_table("syn1", &table).unwrap();
        let csv = fs::read_to_string(dir.join("out/syn1/sleep_diary.csv")).unwrap();
        assert_eq!(csv, "subject_id,sleep\n3_BOS,1546300800\n");
        let schema: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.join("out/syn1/sleep_diary.schema.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(schema["columns"][0]["columnType"], "STRING");
        assert_eq!(schema["columns"][0]["maximumSize"], 6);
        assert_eq!(schema["columns"][1]["columnType"], "INTEGER");
        fs::remove_dir_all(dir).unwrap();
    }
}
