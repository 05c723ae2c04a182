//! The set of month folders in the archive root.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::executor::ensure_dir;
use super::types::{ArchiveFolder, FolderMerge};
use crate::core::naming::{canonical_folder_name, parse_folder_name, CanonicalName, YearMonth};
use crate::error::PlacementError;

/// Month folders of the archive, at most one per month
#[derive(Debug)]
pub struct FolderCatalog {
    root: PathBuf,
    folders: BTreeMap<YearMonth, ArchiveFolder>,
}

impl FolderCatalog {
    /// Read the month folders under `root`.
    ///
    /// Directories that are not month folders are ignored. Two folders for
    /// the same month are an error.
    pub fn load(root: &Path) -> Result<Self, PlacementError> {
        let read_error = |source| PlacementError::ReadFolder {
            path: root.to_path_buf(),
            source,
        };

        let mut entries: Vec<(String, PathBuf)> = Vec::new();
        for entry in fs::read_dir(root).map_err(read_error)? {
            let entry = entry.map_err(read_error)?;
            if !entry.file_type().map_err(read_error)?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                entries.push((name.to_string(), entry.path()));
            }
        }
        entries.sort();

        let mut folders: BTreeMap<YearMonth, ArchiveFolder> = BTreeMap::new();
        for (name, path) in entries {
            let Some((year_month, countries)) = parse_folder_name(&name) else {
                debug!(folder = %name, "not a month folder, ignored");
                continue;
            };
            if let Some(existing) = folders.get(&year_month) {
                return Err(PlacementError::AmbiguousMonthFolder {
                    year_month: year_month.to_string(),
                    first: existing.path.clone(),
                    second: path,
                });
            }
            folders.insert(
                year_month,
                ArchiveFolder {
                    year_month,
                    countries,
                    path,
                },
            );
        }

        debug!(root = %root.display(), folders = folders.len(), "archive catalog loaded");
        Ok(Self {
            root: root.to_path_buf(),
            folders,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn find(&self, year_month: YearMonth) -> Option<&ArchiveFolder> {
        self.folders.get(&year_month)
    }

    pub fn folders(&self) -> impl Iterator<Item = &ArchiveFolder> {
        self.folders.values()
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Create the folder for a month that has none yet
    pub fn create(
        &mut self,
        year_month: YearMonth,
        country: Option<&str>,
    ) -> Result<&ArchiveFolder, PlacementError> {
        let countries: Vec<String> = country.into_iter().map(str::to_string).collect();
        let path = self.root.join(canonical_folder_name(year_month, &countries));
        ensure_dir(&path)?;
        info!(folder = %path.display(), "created month folder");

        let folder = self.folders.entry(year_month).or_insert(ArchiveFolder {
            year_month,
            countries,
            path,
        });
        Ok(&*folder)
    }

    /// Append a country to a month's folder, renaming the directory.
    ///
    /// Returns `None` when the country is already listed.
    pub fn add_country(
        &mut self,
        year_month: YearMonth,
        country: &str,
    ) -> Result<Option<FolderMerge>, PlacementError> {
        let Some(folder) = self.folders.get_mut(&year_month) else {
            return Ok(None);
        };
        if folder.has_country(country) {
            return Ok(None);
        }

        let mut countries = folder.countries.clone();
        countries.push(country.to_string());
        let to = self.root.join(canonical_folder_name(year_month, &countries));

        fs::rename(&folder.path, &to).map_err(|source| PlacementError::RenameFolder {
            from: folder.path.clone(),
            to: to.clone(),
            source,
        })?;
        info!(from = %folder.path.display(), to = %to.display(), "merged country into folder");

        let from = std::mem::replace(&mut folder.path, to.clone());
        folder.countries = countries;
        Ok(Some(FolderMerge { from, to }))
    }

    /// Country of a canonical file in the month's folder captured on the
    /// same day, if any
    pub fn borrow_country(
        &self,
        year_month: YearMonth,
        date_key: &str,
    ) -> Result<Option<String>, PlacementError> {
        let Some(folder) = self.find(year_month) else {
            return Ok(None);
        };

        let mut names = list_file_names(&folder.path)?;
        names.sort();
        Ok(names
            .iter()
            .filter_map(|name| CanonicalName::parse(name))
            .filter(|canonical| canonical.date_key() == date_key)
            .find_map(|canonical| canonical.country))
    }

    /// Every file currently inside a month folder
    pub fn archived_files(&self) -> Result<Vec<PathBuf>, PlacementError> {
        let mut files = Vec::new();
        for folder in self.folders.values() {
            let mut names = list_file_names(&folder.path)?;
            names.sort();
            files.extend(names.into_iter().map(|name| folder.path.join(name)));
        }
        Ok(files)
    }
}

/// Names of the regular, non-hidden files in a directory
pub(crate) fn list_file_names(dir: &Path) -> Result<Vec<String>, PlacementError> {
    let read_error = |source| PlacementError::ReadFolder {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        if !entry.file_type().map_err(read_error)?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn month(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    #[test]
    fn loads_month_folders_and_ignores_others() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("2024_05_FR,DE")).unwrap();
        fs::create_dir(temp.path().join("2023_12")).unwrap();
        fs::create_dir(temp.path().join("Holidays")).unwrap();
        fs::write(temp.path().join("2022_01_IT"), b"a file, not a folder").unwrap();

        let catalog = FolderCatalog::load(temp.path()).unwrap();

        assert_eq!(catalog.len(), 2);
        let may = catalog.find(month(2024, 5)).unwrap();
        assert_eq!(may.countries, vec!["FR".to_string(), "DE".to_string()]);
        assert!(catalog.find(month(2023, 12)).unwrap().countries.is_empty());
        assert!(catalog.find(month(2022, 1)).is_none());
    }

    #[test]
    fn rejects_two_folders_for_one_month() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("2024_05_FR")).unwrap();
        fs::create_dir(temp.path().join("2024_05_DE")).unwrap();

        let error = FolderCatalog::load(temp.path()).unwrap_err();

        match error {
            PlacementError::AmbiguousMonthFolder {
                year_month,
                first,
                second,
            } => {
                assert_eq!(year_month, "2024_05");
                assert!(first.ends_with("2024_05_DE"));
                assert!(second.ends_with("2024_05_FR"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn missing_root_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = FolderCatalog::load(&temp.path().join("nope"));
        assert!(matches!(result, Err(PlacementError::ReadFolder { .. })));
    }

    #[test]
    fn create_then_add_country_renames_folder() {
        let temp = TempDir::new().unwrap();
        let mut catalog = FolderCatalog::load(temp.path()).unwrap();

        let created = catalog.create(month(2024, 5), Some("FR")).unwrap().path.clone();
        assert!(created.ends_with("2024_05_FR"));
        assert!(created.is_dir());

        let merge = catalog.add_country(month(2024, 5), "DE").unwrap().unwrap();
        assert_eq!(merge.from, created);
        assert!(merge.to.ends_with("2024_05_FR,DE"));
        assert!(merge.to.is_dir());
        assert!(!created.exists());

        assert!(catalog.add_country(month(2024, 5), "FR").unwrap().is_none());
        assert_eq!(
            catalog.find(month(2024, 5)).unwrap().countries,
            vec!["FR".to_string(), "DE".to_string()]
        );
    }

    #[test]
    fn country_list_is_append_only() {
        let temp = TempDir::new().unwrap();
        let mut catalog = FolderCatalog::load(temp.path()).unwrap();
        catalog.create(month(2024, 5), Some("FR")).unwrap();

        let mut seen = vec!["FR".to_string()];
        for code in ["DE", "FR", "IT", "DE"] {
            catalog.add_country(month(2024, 5), code).unwrap();
            let countries = &catalog.find(month(2024, 5)).unwrap().countries;
            assert!(countries.starts_with(&seen));
            seen = countries.clone();
        }
        assert_eq!(seen, vec!["FR", "DE", "IT"]);
    }

    #[test]
    fn borrows_country_from_same_day() {
        let temp = TempDir::new().unwrap();
        let folder = temp.path().join("2024_05_FR");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("FR_20240501_090000.jpg"), b"x").unwrap();
        fs::write(folder.join("20240502_120000.jpg"), b"x").unwrap();

        let catalog = FolderCatalog::load(temp.path()).unwrap();

        assert_eq!(
            catalog.borrow_country(month(2024, 5), "20240501").unwrap(),
            Some("FR".to_string())
        );
        assert_eq!(catalog.borrow_country(month(2024, 5), "20240502").unwrap(), None);
        assert_eq!(catalog.borrow_country(month(2024, 6), "20240601").unwrap(), None);
    }

    #[test]
    fn lists_archived_files() {
        let temp = TempDir::new().unwrap();
        let folder = temp.path().join("2024_05");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("20240501_090000.jpg"), b"x").unwrap();
        fs::write(folder.join(".DS_Store"), b"x").unwrap();

        let catalog = FolderCatalog::load(temp.path()).unwrap();
        let files = catalog.archived_files().unwrap();

        assert_eq!(files, vec![folder.join("20240501_090000.jpg")]);
    }
}
