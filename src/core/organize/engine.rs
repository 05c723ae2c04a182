//! Folder-dating state machine and collision handling.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::catalog::{list_file_names, FolderCatalog};
use super::executor::{divert, move_file, remove_file};
use super::types::*;
use crate::core::naming::{canonical_file_name, date_key, YearMonth};
use crate::core::quality::{resolve_collision, CollisionDecision, QualityOrder};
use crate::core::scanner::{split_name, MediaKind};
use crate::error::PlacementError;
use crate::events::{null_sender, Event, EventSender, PlaceEvent};

/// Places dated files into month folders.
///
/// The only writer of the archive during a run.
pub struct PlacementEngine {
    catalog: FolderCatalog,
    quality: QualityOrder,
    /// Duplicates quarantine; demoted files are deleted without it
    quarantine: Option<PathBuf>,
    events: EventSender,
    folders_created: Vec<PathBuf>,
    folders_merged: Vec<FolderMerge>,
}

/// A file in the target folder with the same stem as the incoming one
struct Resident {
    path: PathBuf,
    same_extension: bool,
}

impl PlacementEngine {
    pub fn new(catalog: FolderCatalog, quality: QualityOrder, quarantine: Option<PathBuf>) -> Self {
        Self {
            catalog,
            quality,
            quarantine,
            events: null_sender(),
            folders_created: Vec::new(),
            folders_merged: Vec::new(),
        }
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    pub fn catalog(&self) -> &FolderCatalog {
        &self.catalog
    }

    pub fn folders_created(&self) -> &[PathBuf] {
        &self.folders_created
    }

    pub fn folders_merged(&self) -> &[FolderMerge] {
        &self.folders_merged
    }

    /// Place one file under its canonical name.
    ///
    /// Returns an error only when the filesystem refuses an operation; the
    /// file is then left where it was.
    pub fn place(&mut self, request: &PlacementRequest) -> Result<PlacementOutcome, PlacementError> {
        let year_month = YearMonth::of(request.captured_at);
        let mut country = request.country.clone().filter(|code| !code.is_empty());

        let state = match self.catalog.find(year_month) {
            None => FolderState::NoFolderForMonth,
            Some(folder) => match &country {
                None => FolderState::FolderExistsNoCountry,
                Some(code) if folder.has_country(code) => FolderState::FolderExistsSameCountry,
                Some(_) => FolderState::FolderExistsDifferentCountry,
            },
        };

        if state == FolderState::FolderExistsNoCountry {
            country = self
                .catalog
                .borrow_country(year_month, &date_key(request.captured_at))?;
            if let Some(code) = &country {
                debug!(file = %request.path.display(), country = %code, "borrowed country from same day");
            }
        }

        let final_name =
            canonical_file_name(request.captured_at, country.as_deref(), &request.extension);

        let mut outgoing = None;
        if let Some(folder) = self.catalog.find(year_month) {
            let incoming_kind = MediaKind::from_extension(&request.extension);
            let quality = &self.quality;
            let resident = find_resident(&folder.path, &final_name, |kind| {
                quality.competes(kind, incoming_kind)
            })?;
            if let Some(resident) = resident {
                if resident.same_extension {
                    let demotion = self.reject_exact(&request.path, &resident.path)?;
                    return Ok(PlacementOutcome::Rejected {
                        existing: resident.path,
                        demotion,
                    });
                }

                let decision = resolve_collision(
                    &self.quality,
                    MediaKind::from_path(&resident.path),
                    incoming_kind,
                );
                debug!(
                    incoming = %request.path.display(),
                    resident = %resident.path.display(),
                    ?decision,
                    "same name, different format"
                );
                match decision {
                    CollisionDecision::KeepResident => {
                        let demotion = self.demote(&request.path)?;
                        return Ok(PlacementOutcome::Rejected {
                            existing: resident.path,
                            demotion,
                        });
                    }
                    CollisionDecision::KeepIncoming => outgoing = Some(resident.path),
                }
            }
        }

        let folder_path = match self.catalog.find(year_month) {
            Some(folder) => folder.path.clone(),
            None => {
                let path = self.catalog.create(year_month, country.as_deref())?.path.clone();
                self.events
                    .send(Event::Place(PlaceEvent::FolderCreated { path: path.clone() }));
                self.folders_created.push(path.clone());
                path
            }
        };

        // The extensions differ, so the incoming file never lands on the
        // resident; the resident is only demoted once the move succeeded
        let mut destination = folder_path.join(&final_name);
        move_file(&request.path, &destination)?;
        info!(from = %request.path.display(), to = %destination.display(), "placed");

        let mut warnings = Vec::new();
        let mut displaced = None;
        if let Some(resident) = outgoing {
            match self.demote(&resident) {
                Ok(demotion) => displaced = Some(demotion),
                Err(e) => {
                    warn!(file = %resident.display(), error = %e, "could not demote lower-quality copy");
                    warnings.push(e.to_string());
                }
            }
        }

        if let Some(code) = &country {
            match self.catalog.add_country(year_month, code) {
                Ok(Some(merge)) => {
                    destination = merge.to.join(&final_name);
                    self.events.send(Event::Place(PlaceEvent::FolderMerged {
                        from: merge.from.clone(),
                        to: merge.to.clone(),
                    }));
                    self.folders_merged.push(merge);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(file = %destination.display(), error = %e, "file placed but folder not renamed");
                    warnings.push(e.to_string());
                }
            }
        }

        self.events.send(Event::Place(PlaceEvent::Placed {
            from: request.path.clone(),
            to: destination.clone(),
        }));

        Ok(PlacementOutcome::Placed {
            destination,
            state,
            displaced,
            warnings,
        })
    }

    /// Quarantine a losing file, or delete it when there is no quarantine
    fn demote(&self, path: &Path) -> Result<Demotion, PlacementError> {
        match &self.quarantine {
            Some(dir) => {
                let landed = divert(path, dir)?;
                info!(file = %path.display(), to = %landed.display(), "lower-quality copy quarantined");
                self.diverted(path, Bucket::Duplicates.to_string());
                Ok(Demotion::Quarantined {
                    from: path.to_path_buf(),
                    to: landed,
                })
            }
            None => {
                warn!(file = %path.display(), "no duplicates folder configured, deleting lower-quality copy");
                remove_file(path)?;
                self.diverted(path, "deleted".to_string());
                Ok(Demotion::Deleted(path.to_path_buf()))
            }
        }
    }

    // Identical names are never compared: the incoming file is quarantined
    // or left alone
    fn reject_exact(&self, incoming: &Path, resident: &Path) -> Result<Demotion, PlacementError> {
        match &self.quarantine {
            Some(dir) => {
                let landed = divert(incoming, dir)?;
                info!(file = %incoming.display(), existing = %resident.display(), "name already archived, quarantined");
                self.diverted(incoming, Bucket::Duplicates.to_string());
                Ok(Demotion::Quarantined {
                    from: incoming.to_path_buf(),
                    to: landed,
                })
            }
            None => {
                warn!(file = %incoming.display(), existing = %resident.display(), "name already archived, skipped");
                Ok(Demotion::Skipped(incoming.to_path_buf()))
            }
        }
    }

    fn diverted(&self, path: &Path, bucket: String) {
        self.events.send(Event::Place(PlaceEvent::Diverted {
            path: path.to_path_buf(),
            bucket,
        }));
    }
}

// Exact name first, then a file sharing the stem whose format competes
fn find_resident(
    folder: &Path,
    file_name: &str,
    competes: impl Fn(MediaKind) -> bool,
) -> Result<Option<Resident>, PlacementError> {
    let (stem, extension) = split_name(file_name);
    let mut names = list_file_names(folder)?;
    names.sort();

    let mut same_stem = None;
    for name in names {
        let (other_stem, other_extension) = split_name(&name);
        if other_stem != stem {
            continue;
        }
        if other_extension.eq_ignore_ascii_case(extension) {
            return Ok(Some(Resident {
                path: folder.join(name),
                same_extension: true,
            }));
        }
        if same_stem.is_none() && competes(MediaKind::from_extension(other_extension)) {
            same_stem = Some(folder.join(&name));
        }
    }

    Ok(same_stem.map(|path| Resident {
        path,
        same_extension: false,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        source: PathBuf,
        archive: PathBuf,
        quarantine: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("inbox");
        let archive = temp.path().join("archive");
        let quarantine = temp.path().join("duplicates");
        for dir in [&source, &archive, &quarantine] {
            fs::create_dir(dir).unwrap();
        }
        Fixture {
            _temp: temp,
            source,
            archive,
            quarantine,
        }
    }

    fn engine(fx: &Fixture, quarantine: bool) -> PlacementEngine {
        let catalog = FolderCatalog::load(&fx.archive).unwrap();
        let quarantine = quarantine.then(|| fx.quarantine.clone());
        PlacementEngine::new(catalog, QualityOrder::default(), quarantine)
    }

    fn request(fx: &Fixture, name: &str, day: u32, country: Option<&str>) -> PlacementRequest {
        let path = fx.source.join(name);
        fs::write(&path, name.as_bytes()).unwrap();
        PlacementRequest {
            path,
            captured_at: NaiveDate::from_ymd_opt(2024, 5, day)
                .unwrap()
                .and_hms_opt(10, 20, 30)
                .unwrap(),
            country: country.map(str::to_string),
            extension: split_name(name).1.to_string(),
        }
    }

    fn destination(outcome: &PlacementOutcome) -> &Path {
        match outcome {
            PlacementOutcome::Placed { destination, .. } => destination.as_path(),
            other => panic!("not placed: {:?}", other),
        }
    }

    #[test]
    fn creates_folder_for_new_month() {
        let fx = fixture();
        let mut engine = engine(&fx, true);

        let outcome = engine.place(&request(&fx, "IMG_0001.jpg", 1, Some("FR"))).unwrap();

        assert_eq!(
            destination(&outcome),
            fx.archive.join("2024_05_FR/FR_20240501_102030.jpg")
        );
        assert!(matches!(
            outcome,
            PlacementOutcome::Placed { state: FolderState::NoFolderForMonth, .. }
        ));
        assert!(!fx.source.join("IMG_0001.jpg").exists());
        assert_eq!(engine.folders_created().len(), 1);
    }

    #[test]
    fn month_without_country_gets_bare_folder() {
        let fx = fixture();
        let mut engine = engine(&fx, true);

        let outcome = engine.place(&request(&fx, "a.jpg", 3, None)).unwrap();

        assert_eq!(destination(&outcome), fx.archive.join("2024_05/20240503_102030.jpg"));
    }

    #[test]
    fn same_country_moves_in() {
        let fx = fixture();
        fs::create_dir(fx.archive.join("2024_05_FR")).unwrap();
        let mut engine = engine(&fx, true);

        let outcome = engine.place(&request(&fx, "a.jpg", 2, Some("FR"))).unwrap();

        assert!(matches!(
            outcome,
            PlacementOutcome::Placed { state: FolderState::FolderExistsSameCountry, .. }
        ));
        assert!(fx.archive.join("2024_05_FR/FR_20240502_102030.jpg").exists());
        assert!(engine.folders_created().is_empty());
    }

    #[test]
    fn new_country_renames_folder_after_move() {
        let fx = fixture();
        fs::create_dir(fx.archive.join("2024_05_FR")).unwrap();
        fs::write(fx.archive.join("2024_05_FR/FR_20240501_090000.jpg"), b"x").unwrap();
        let mut engine = engine(&fx, true);

        let outcome = engine.place(&request(&fx, "b.jpg", 4, Some("DE"))).unwrap();

        let merged = fx.archive.join("2024_05_FR,DE");
        assert_eq!(destination(&outcome), merged.join("DE_20240504_102030.jpg"));
        assert!(merged.join("DE_20240504_102030.jpg").exists());
        assert!(merged.join("FR_20240501_090000.jpg").exists());
        assert!(!fx.archive.join("2024_05_FR").exists());
        assert_eq!(engine.folders_merged().len(), 1);
    }

    #[test]
    fn no_country_borrows_from_same_day() {
        let fx = fixture();
        fs::create_dir(fx.archive.join("2024_05_FR")).unwrap();
        fs::write(fx.archive.join("2024_05_FR/FR_20240501_090000.jpg"), b"x").unwrap();
        let mut engine = engine(&fx, true);

        let borrowed = engine.place(&request(&fx, "c.jpg", 1, None)).unwrap();
        let plain = engine.place(&request(&fx, "d.jpg", 9, None)).unwrap();

        assert_eq!(
            destination(&borrowed),
            fx.archive.join("2024_05_FR/FR_20240501_102030.jpg")
        );
        assert_eq!(destination(&plain), fx.archive.join("2024_05_FR/20240509_102030.jpg"));
    }

    #[test]
    fn preferred_format_replaces_resident() {
        let fx = fixture();
        fs::create_dir(fx.archive.join("2024_05_FR")).unwrap();
        let resident = fx.archive.join("2024_05_FR/FR_20240501_102030.jpg");
        fs::write(&resident, b"jpeg").unwrap();
        let mut engine = engine(&fx, true);

        let outcome = engine.place(&request(&fx, "photo.heic", 1, Some("FR"))).unwrap();

        assert!(fx.archive.join("2024_05_FR/FR_20240501_102030.heic").exists());
        assert!(!resident.exists());
        assert!(fx.quarantine.join("FR_20240501_102030.jpg").exists());
        match outcome {
            PlacementOutcome::Placed { displaced, .. } => {
                assert!(matches!(displaced, Some(Demotion::Quarantined { .. })));
            }
            other => panic!("not placed: {:?}", other),
        }
    }

    #[test]
    fn lesser_format_is_rejected() {
        let fx = fixture();
        fs::create_dir(fx.archive.join("2024_05_FR")).unwrap();
        let resident = fx.archive.join("2024_05_FR/FR_20240501_102030.heic");
        fs::write(&resident, b"heic").unwrap();
        let mut engine = engine(&fx, true);

        let req = request(&fx, "photo.jpg", 1, Some("FR"));
        let outcome = engine.place(&req).unwrap();

        assert_eq!(
            outcome,
            PlacementOutcome::Rejected {
                existing: resident.clone(),
                demotion: Demotion::Quarantined {
                    from: req.path.clone(),
                    to: fx.quarantine.join("photo.jpg"),
                },
            }
        );
        assert!(resident.exists());
        assert!(!fx.archive.join("2024_05_FR/FR_20240501_102030.jpg").exists());
    }

    #[test]
    fn lesser_format_is_deleted_without_quarantine() {
        let fx = fixture();
        fs::create_dir(fx.archive.join("2024_05_FR")).unwrap();
        fs::write(fx.archive.join("2024_05_FR/FR_20240501_102030.heic"), b"heic").unwrap();
        let mut engine = engine(&fx, false);

        let req = request(&fx, "photo.jpg", 1, Some("FR"));
        let outcome = engine.place(&req).unwrap();

        assert!(matches!(
            outcome,
            PlacementOutcome::Rejected { demotion: Demotion::Deleted(_), .. }
        ));
        assert!(!req.path.exists());
    }

    #[test]
    fn exact_name_is_skipped_without_quarantine() {
        let fx = fixture();
        fs::create_dir(fx.archive.join("2024_05_FR")).unwrap();
        fs::write(fx.archive.join("2024_05_FR/FR_20240501_102030.jpg"), b"resident").unwrap();
        let mut engine = engine(&fx, false);

        let req = request(&fx, "FR_20240501_102030.jpg", 1, Some("FR"));
        let outcome = engine.place(&req).unwrap();

        assert!(matches!(
            outcome,
            PlacementOutcome::Rejected { demotion: Demotion::Skipped(_), .. }
        ));
        assert!(req.path.exists());
        assert_eq!(
            fs::read(fx.archive.join("2024_05_FR/FR_20240501_102030.jpg")).unwrap(),
            b"resident"
        );
    }

    #[test]
    fn canonical_file_is_placed_without_renaming() {
        let fx = fixture();
        let mut engine = engine(&fx, true);

        let outcome = engine
            .place(&request(&fx, "FR_20240501_102030.jpg", 1, Some("FR")))
            .unwrap();

        assert_eq!(
            destination(&outcome),
            fx.archive.join("2024_05_FR/FR_20240501_102030.jpg")
        );
        assert_eq!(fs::read_dir(&fx.archive).unwrap().count(), 1);
    }

    #[test]
    fn live_photo_video_is_kept_beside_its_image() {
        let fx = fixture();
        let mut engine = engine(&fx, false);

        engine.place(&request(&fx, "IMG_1234.HEIC", 1, Some("FR"))).unwrap();
        let video = request(&fx, "IMG_1234.MOV", 1, None);
        let outcome = engine.place(&video).unwrap();

        let folder = fx.archive.join("2024_05_FR");
        assert_eq!(destination(&outcome), folder.join("FR_20240501_102030.MOV"));
        assert!(folder.join("FR_20240501_102030.HEIC").exists());
        assert!(folder.join("FR_20240501_102030.MOV").exists());
        assert!(!video.path.exists());
    }

    #[test]
    fn unranked_resident_does_not_hide_competing_format() {
        let fx = fixture();
        fs::create_dir(fx.archive.join("2024_05_FR")).unwrap();
        fs::write(fx.archive.join("2024_05_FR/FR_20240501_102030.MOV"), b"video").unwrap();
        fs::write(fx.archive.join("2024_05_FR/FR_20240501_102030.jpg"), b"jpeg").unwrap();
        let mut engine = engine(&fx, true);

        engine.place(&request(&fx, "photo.heic", 1, Some("FR"))).unwrap();

        assert!(fx.archive.join("2024_05_FR/FR_20240501_102030.MOV").exists());
        assert!(fx.archive.join("2024_05_FR/FR_20240501_102030.heic").exists());
        assert!(fx.quarantine.join("FR_20240501_102030.jpg").exists());
    }

    #[test]
    fn failed_folder_rename_still_reports_placement() {
        let fx = fixture();
        fs::create_dir(fx.archive.join("2024_05_FR")).unwrap();
        fs::write(fx.archive.join("2024_05_FR,DE"), b"stray file").unwrap();
        let mut engine = engine(&fx, true);

        let req = request(&fx, "b.jpg", 4, Some("DE"));
        let outcome = engine.place(&req).unwrap();

        let placed = fx.archive.join("2024_05_FR/DE_20240504_102030.jpg");
        match &outcome {
            PlacementOutcome::Placed {
                destination,
                warnings,
                ..
            } => {
                assert_eq!(destination, &placed);
                assert_eq!(warnings.len(), 1);
            }
            other => panic!("not placed: {:?}", other),
        }
        assert!(placed.exists());
        assert!(!req.path.exists());
        assert!(engine.folders_merged().is_empty());
        let folder = engine.catalog().find(YearMonth::new(2024, 5).unwrap()).unwrap();
        assert_eq!(folder.path, fx.archive.join("2024_05_FR"));
    }

    #[test]
    fn resident_survives_when_incoming_move_fails() {
        let fx = fixture();
        fs::create_dir(fx.archive.join("2024_05_FR")).unwrap();
        let resident = fx.archive.join("2024_05_FR/FR_20240501_102030.jpg");
        fs::write(&resident, b"jpeg").unwrap();
        let mut engine = engine(&fx, false);

        let req = request(&fx, "photo.heic", 1, Some("FR"));
        fs::remove_file(&req.path).unwrap();
        let result = engine.place(&req);

        assert!(matches!(result, Err(PlacementError::MoveFile { .. })));
        assert!(resident.exists());
    }
}
