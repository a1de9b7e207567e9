use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::*;

const FORMAT_VERSION: u32 = 1;

const RANK_TITLES: [&str; 5] = ["Godlike", "Divine", "Champion", "Knight", "Loon"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub name: String,
    pub score: Score,
}

#[derive(Serialize, Deserialize)]
struct StoredTable {
    version: u32,
    records: Vec<ScoreRecord>,
}

/// Name-unique score table ordered best to worst, backed by a JSON file.
///
/// Equal scores keep insertion order: the earlier entry ranks higher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Leaderboard {
    path: PathBuf,
    records: Vec<ScoreRecord>,
}

impl Leaderboard {
    /// Empty table that will be saved to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
        }
    }

    /// Table loaded from `path`, empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut table = Self::new(path);
        table.load()?;
        Ok(table)
    }

    /// Like [`Leaderboard::open`], but starts empty instead of failing on a
    /// damaged file.
    pub fn open_or_empty(path: impl Into<PathBuf>) -> Self {
        let mut table = Self::new(path);
        if let Err(err) = table.load() {
            log::warn!("{}, starting with an empty score table", err);
            table.records.clear();
        }
        table
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the in-memory records with the persisted ones.
    pub fn load(&mut self) -> Result<()> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("No score table at {}", self.path.display());
                self.records.clear();
                return Ok(());
            }
            Err(err) => return Err(self.deserialize_error(err.to_string())),
        };

        let stored: StoredTable = serde_json::from_str(&contents)
            .map_err(|err| self.deserialize_error(err.to_string()))?;
        if stored.version != FORMAT_VERSION {
            return Err(self.deserialize_error(format!(
                "unsupported format version {}",
                stored.version
            )));
        }
        validate_records(&stored.records).map_err(|reason| self.deserialize_error(reason))?;

        log::debug!(
            "Loaded {} scores from {}",
            stored.records.len(),
            self.path.display()
        );
        self.records = stored.records;
        Ok(())
    }

    /// Writes the table next to its file and renames it over the old one.
    pub fn save(&self) -> Result<()> {
        let stored = StoredTable {
            version: FORMAT_VERSION,
            records: self.records.clone(),
        };
        let mut contents = serde_json::to_string_pretty(&stored).map_err(|err| {
            GameError::Serialize {
                path: self.path.clone(),
                source: err.into(),
            }
        })?;
        contents.push('\n');

        write_atomic(&self.path, contents.as_bytes()).map_err(|source| GameError::Serialize {
            path: self.path.clone(),
            source,
        })?;
        log::debug!(
            "Saved {} scores to {}",
            self.records.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Adds a new record and returns its 1-based rank.
    pub fn upsert(&mut self, name: impl Into<String>, score: Score) -> Result<usize> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(GameError::DuplicateName(name));
        }
        let index = self.records.partition_point(|record| record.score >= score);
        log::debug!("Adding {} with {} points at rank {}", name, score, index + 1);
        self.records.insert(index, ScoreRecord { name, score });
        Ok(index + 1)
    }

    pub fn remove(&mut self, name: &str) -> Result<ScoreRecord> {
        let index = self
            .records
            .iter()
            .position(|record| record.name == name)
            .ok_or_else(|| GameError::NotFound(name.to_owned()))?;
        Ok(self.records.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<&ScoreRecord> {
        self.records.iter().find(|record| record.name == name)
    }

    /// 1-based position of `name`.
    pub fn rank(&self, name: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record.name == name)
            .map(|index| index + 1)
    }

    /// Records from best to worst.
    pub fn iter(&self) -> impl Iterator<Item = &ScoreRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn deserialize_error(&self, reason: String) -> GameError {
        GameError::Deserialize {
            path: self.path.clone(),
            reason,
        }
    }
}

/// Honorary title for the top places of the table.
pub fn rank_title(rank: usize) -> Option<&'static str> {
    rank.checked_sub(1)
        .and_then(|index| RANK_TITLES.get(index))
        .copied()
}

fn validate_records(records: &[ScoreRecord]) -> core::result::Result<(), String> {
    for (index, record) in records.iter().enumerate() {
        if records[..index].iter().any(|other| other.name == record.name) {
            return Err(format!("duplicate name `{}`", record.name));
        }
        if index > 0 && records[index - 1].score < record.score {
            return Err(format!("`{}` is out of order", record.name));
        }
    }
    Ok(())
}

fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp_path = OsString::from(path.as_os_str());
    tmp_path.push(".tmp");
    let tmp_path = PathBuf::from(tmp_path);

    let result = File::create(&tmp_path)
        .and_then(|mut file| {
            file.write_all(contents)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&tmp_path, path));
    if result.is_err() {
        if let Err(err) = fs::remove_file(&tmp_path) {
            log::warn!("Could not clean up {}: {}", tmp_path.display(), err);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(table: &Leaderboard) -> Vec<&str> {
        table.iter().map(|record| record.name.as_str()).collect()
    }

    #[test]
    fn upsert_keeps_descending_order() {
        let mut table = Leaderboard::new("unused.json");

        assert_eq!(table.upsert("alice", 50).unwrap(), 1);
        assert_eq!(table.upsert("bob", 90).unwrap(), 1);
        assert_eq!(table.upsert("carol", 10).unwrap(), 3);
        assert_eq!(table.upsert("dave", 60).unwrap(), 2);

        assert_eq!(names(&table), ["bob", "dave", "alice", "carol"]);
        assert_eq!(table.rank("alice"), Some(3));
        assert_eq!(table.rank("nobody"), None);
    }

    #[test]
    fn equal_scores_keep_insertion_order() {
        let mut table = Leaderboard::new("unused.json");
        table.upsert("first", 40).unwrap();
        table.upsert("second", 40).unwrap();
        table.upsert("third", 40).unwrap();

        assert_eq!(names(&table), ["first", "second", "third"]);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut table = Leaderboard::new("unused.json");
        table.upsert("Alice", 50).unwrap();

        let err = table.upsert("Alice", 90).unwrap_err();

        assert!(matches!(err, GameError::DuplicateName(name) if name == "Alice"));
        assert_eq!(table.get("Alice").unwrap().score, 50);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn remove_missing_name_fails() {
        let mut table = Leaderboard::new("unused.json");

        assert!(matches!(table.remove("Bob"), Err(GameError::NotFound(name)) if name == "Bob"));

        table.upsert("Bob", 3).unwrap();
        assert_eq!(
            table.remove("Bob").unwrap(),
            ScoreRecord {
                name: "Bob".into(),
                score: 3
            }
        );
        assert!(table.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("score.json");

        let mut table = Leaderboard::new(&path);
        table.upsert("alice", 50).unwrap();
        table.upsert("bob", 50).unwrap();
        table.upsert("carol", 70).unwrap();
        table.save().unwrap();

        let loaded = Leaderboard::open(&path).unwrap();

        assert_eq!(loaded, table);
        assert_eq!(names(&loaded), ["carol", "alice", "bob"]);
        assert!(!path.with_file_name("score.json.tmp").exists());
    }

    #[test]
    fn missing_file_loads_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let table = Leaderboard::open(temp.path().join("score.json")).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn corrupt_file_fails_to_load() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("score.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            Leaderboard::open(&path),
            Err(GameError::Deserialize { .. })
        ));
        assert!(Leaderboard::open_or_empty(&path).is_empty());
    }

    #[test]
    fn out_of_order_file_fails_to_load() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("score.json");
        fs::write(
            &path,
            r#"{"version":1,"records":[{"name":"a","score":1},{"name":"b","score":5}]}"#,
        )
        .unwrap();
        assert!(matches!(
            Leaderboard::open(&path),
            Err(GameError::Deserialize { .. })
        ));

        fs::write(
            &path,
            r#"{"version":1,"records":[{"name":"a","score":5},{"name":"a","score":1}]}"#,
        )
        .unwrap();
        assert!(matches!(
            Leaderboard::open(&path),
            Err(GameError::Deserialize { .. })
        ));
    }

    #[test]
    fn failed_save_keeps_existing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("score.json");
        let mut table = Leaderboard::new(&path);
        table.upsert("alice", 5).unwrap();
        table.save().unwrap();
        let before = fs::read_to_string(&path).unwrap();

        // a directory squatting on the temp path makes the write fail
        fs::create_dir(temp.path().join("score.json.tmp")).unwrap();
        table.upsert("bob", 9).unwrap();

        assert!(matches!(table.save(), Err(GameError::Serialize { .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn top_five_have_titles() {
        assert_eq!(rank_title(0), None);
        assert_eq!(rank_title(1), Some("Godlike"));
        assert_eq!(rank_title(5), Some("Loon"));
        assert_eq!(rank_title(6), None);
    }
}
