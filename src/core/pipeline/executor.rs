//! Pipeline execution implementation.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::report::*;
use crate::config::ArchiveConfig;
use crate::core::dedup::{DuplicateDetector, DuplicateVerdict, HashIndex, IndexKey};
use crate::core::geocode::Geocoder;
use crate::core::hasher::{AverageHasher, HashAlgorithm, ImageHash};
use crate::core::metadata::{ContainerExtractor, Coordinates, FfprobeProbe, MetadataExtractor};
use crate::core::naming::{canonical_file_name, date_key, CanonicalName, YearMonth};
use crate::core::organize::{
    divert, remove_file, Bucket, Demotion, FolderCatalog, PlacementEngine, PlacementOutcome,
    PlacementRequest,
};
use crate::core::scanner::{FlatScanner, MediaKind, MediaScanner, ScanConfig, SourceFile};
use crate::error::{ArchiveError, PlacementError, Result};
use crate::events::{
    null_sender, AnalyzeEvent, ClassifyEvent, Event, EventSender, PipelineEvent, PipelinePhase,
    PlaceEvent,
};

/// Cooperative stop flag, checked before each file
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Hash result for one file
#[derive(Debug, Clone, PartialEq)]
pub enum HashOutcome {
    /// Video or audio, deduplicated by name
    NotHashable,
    Hashed(ImageHash),
    Failed(String),
}

/// What the analysis phase learned about one source file
#[derive(Debug, Clone)]
pub struct AnalyzedFile {
    pub file: SourceFile,
    pub captured_at: Option<NaiveDateTime>,
    pub coordinates: Option<Coordinates>,
    /// Country carried by an already-canonical name
    pub embedded_country: Option<String>,
    pub hash: HashOutcome,
}

impl AnalyzedFile {
    fn index_key(&self) -> Option<IndexKey> {
        let hash = match &self.hash {
            HashOutcome::Hashed(hash) => Some(*hash),
            _ => None,
        };
        IndexKey::for_file(self.file.kind, &self.file.name, hash)
    }
}

/// A file with its final disposition
#[derive(Debug, Clone)]
struct Classified {
    analyzed: AnalyzedFile,
    disposition: Disposition,
    duplicate_of: Option<String>,
}

/// Builder for the archiving pipeline
pub struct PipelineBuilder {
    config: ArchiveConfig,
    scan_config: ScanConfig,
    extractor: Option<Box<dyn MetadataExtractor>>,
    geocoder: Option<Box<dyn Geocoder>>,
    hasher: Option<Box<dyn HashAlgorithm>>,
    cancellation: CancellationToken,
}

impl PipelineBuilder {
    pub fn new(config: ArchiveConfig) -> Self {
        Self {
            config,
            scan_config: ScanConfig::default(),
            extractor: None,
            geocoder: None,
            hasher: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Set scanner configuration
    pub fn scan_config(mut self, config: ScanConfig) -> Self {
        self.scan_config = config;
        self
    }

    /// Replace the metadata extractor (EXIF + ffprobe by default)
    pub fn extractor(mut self, extractor: Box<dyn MetadataExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Replace the geocoder (the configured region table by default)
    pub fn geocoder(mut self, geocoder: Box<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// Replace the perceptual hasher (64-bit average hash by default)
    pub fn hasher(mut self, hasher: Box<dyn HashAlgorithm>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline {
        let extractor = self.extractor.unwrap_or_else(|| {
            Box::new(ContainerExtractor::new(Box::new(FfprobeProbe::new(
                self.config.ffprobe.clone(),
            ))))
        });
        let geocoder = self
            .geocoder
            .unwrap_or_else(|| Box::new(self.config.geocoder.clone()));
        let hasher = self
            .hasher
            .unwrap_or_else(|| Box::new(AverageHasher::new()));

        Pipeline {
            config: self.config,
            scan_config: self.scan_config,
            extractor,
            geocoder,
            hasher,
            cancellation: self.cancellation,
        }
    }
}

/// The archiving pipeline
pub struct Pipeline {
    config: ArchiveConfig,
    scan_config: ScanConfig,
    extractor: Box<dyn MetadataExtractor>,
    geocoder: Box<dyn Geocoder>,
    hasher: Box<dyn HashAlgorithm>,
    cancellation: CancellationToken,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder(config: ArchiveConfig) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Run the pipeline without events
    pub fn run(&self) -> Result<RunReport> {
        self.run_with_events(&null_sender())
    }

    /// Run the full pipeline, moving files.
    ///
    /// Fails only when a precondition does not hold; every per-file
    /// problem ends up in the report.
    pub fn run_with_events(&self, events: &EventSender) -> Result<RunReport> {
        let start_time = Instant::now();
        let mut report = RunReport::new(self.config.source.clone(), self.config.destination.clone());

        events.send(Event::Pipeline(PipelineEvent::Started));
        info!(
            run_id = %report.run_id,
            source = %self.config.source.display(),
            destination = %self.config.destination.display(),
            "starting run"
        );

        // Phase 1: Scanning
        phase(events, PipelinePhase::Scanning);
        let files = self.scan(events)?;
        report.total_files = files.len();

        self.prepare_folders()?;
        let catalog = FolderCatalog::load(&self.config.destination)?;

        // Phase 2: Analyzing
        phase(events, PipelinePhase::Analyzing);
        let Some(analyzed) = self.analyze(&files, events) else {
            info!("cancelled during analysis, nothing was moved");
            report.cancelled = true;
            report.untouched = files.into_iter().map(|file| file.path).collect();
            return Ok(self.finish(report, start_time, events));
        };

        // Phase 3 and 4: Classifying, Verifying
        phase(events, PipelinePhase::Classifying);
        let index = self.initial_index(&catalog)?;
        let classified = self.classify(analyzed, index, events);
        report.issues.extend(classification_issues(&classified));

        // Phase 5: Placing
        phase(events, PipelinePhase::Placing);
        self.place_all(classified, catalog, events, &mut report);

        Ok(self.finish(report, start_time, events))
    }

    /// Classify every file without touching the filesystem
    pub fn plan(&self) -> Result<RunPlan> {
        self.plan_with_events(&null_sender())
    }

    pub fn plan_with_events(&self, events: &EventSender) -> Result<RunPlan> {
        events.send(Event::Pipeline(PipelineEvent::Started));

        phase(events, PipelinePhase::Scanning);
        let files = self.scan(events)?;

        let catalog = if self.config.destination.is_dir() {
            Some(FolderCatalog::load(&self.config.destination)?)
        } else {
            None
        };

        phase(events, PipelinePhase::Analyzing);
        let Some(analyzed) = self.analyze(&files, events) else {
            info!("plan cancelled during analysis");
            events.send(Event::Pipeline(PipelineEvent::Cancelled));
            return Ok(RunPlan {
                source: self.config.source.clone(),
                entries: Vec::new(),
                issues: Vec::new(),
                cancelled: true,
            });
        };

        phase(events, PipelinePhase::Classifying);
        let index = match &catalog {
            Some(catalog) => self.initial_index(catalog)?,
            None => HashIndex::new(),
        };
        let classified = self.classify(analyzed, index, events);

        let mut issues = classification_issues(&classified);
        let mut entries = Vec::with_capacity(classified.len());
        for item in classified {
            let target_name = match (item.disposition, item.analyzed.captured_at) {
                (Disposition::Place, Some(captured_at)) => {
                    let mut country = self.resolve_country(&item.analyzed, &mut issues);
                    if country.is_none() {
                        if let Some(catalog) = &catalog {
                            country = catalog
                                .borrow_country(YearMonth::of(captured_at), &date_key(captured_at))?;
                        }
                    }
                    Some(canonical_file_name(
                        captured_at,
                        country.as_deref(),
                        item.analyzed.file.extension(),
                    ))
                }
                _ => None,
            };
            entries.push(PlanEntry {
                name: item.analyzed.file.name,
                disposition: item.disposition,
                target_name,
                duplicate_of: item.duplicate_of,
            });
        }

        Ok(RunPlan {
            source: self.config.source.clone(),
            entries,
            issues,
            cancelled: false,
        })
    }

    fn scan(&self, events: &EventSender) -> Result<Vec<SourceFile>> {
        let scanner = FlatScanner::new(self.scan_config.clone());
        let scan_result = scanner.scan_with_events(&self.config.source, events)?;

        for error in &scan_result.errors {
            warn!(error = %error, "could not list a source entry");
        }
        debug!(
            files = scan_result.files.len(),
            ignored = scan_result.ignored.len(),
            "source listed"
        );
        Ok(scan_result.files)
    }

    /// Create the destination and every configured side folder
    fn prepare_folders(&self) -> Result<()> {
        let destination = std::iter::once(self.config.destination.as_path());
        let buckets = self.config.buckets.configured().map(|(_, path)| path);

        for path in destination.chain(buckets) {
            fs::create_dir_all(path).map_err(|source| ArchiveError::BucketUnreachable {
                path: path.to_path_buf(),
                source,
            })?;
        }

        if self.config.buckets.duplicates.is_none() {
            warn!("no duplicates folder configured: duplicates and lower-quality copies will be deleted");
        }
        Ok(())
    }

    /// Extract metadata and hash every file in parallel.
    ///
    /// Results keep listing order. `None` if the run was cancelled.
    fn analyze(&self, files: &[SourceFile], events: &EventSender) -> Option<Vec<AnalyzedFile>> {
        let total = files.len();
        events.send(Event::Analyze(AnalyzeEvent::Started { total_files: total }));

        let completed = AtomicUsize::new(0);
        let analyzed: Vec<Option<AnalyzedFile>> = files
            .par_iter()
            .map(|file| {
                if self.cancellation.is_cancelled() {
                    return None;
                }
                let result = self.analyze_file(file);

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                events.send(Event::Analyze(AnalyzeEvent::Progress {
                    completed: done,
                    total,
                    current_path: file.path.clone(),
                }));
                Some(result)
            })
            .collect();

        if self.cancellation.is_cancelled() {
            return None;
        }
        let analyzed: Vec<AnalyzedFile> = analyzed.into_iter().flatten().collect();

        events.send(Event::Analyze(AnalyzeEvent::Completed {
            hashed: analyzed
                .iter()
                .filter(|a| matches!(a.hash, HashOutcome::Hashed(_)))
                .count(),
            broken: analyzed
                .iter()
                .filter(|a| matches!(a.hash, HashOutcome::Failed(_)))
                .count(),
            undated: analyzed.iter().filter(|a| a.captured_at.is_none()).count(),
        }));
        Some(analyzed)
    }

    fn analyze_file(&self, file: &SourceFile) -> AnalyzedFile {
        let (captured_at, coordinates, embedded_country) = match CanonicalName::parse(&file.name) {
            Some(canonical) => {
                debug!(file = %file.name, "already canonical, metadata not read");
                (Some(canonical.captured_at), None, canonical.country)
            }
            None => match self.extractor.extract(&file.path) {
                Some(metadata) => (Some(metadata.captured_at), metadata.coordinates, None),
                None => (None, None, None),
            },
        };

        let hash = if file.kind.is_hashable() {
            match self.hasher.hash_file(&file.path) {
                Ok(hash) => HashOutcome::Hashed(hash),
                Err(e) => {
                    warn!(file = %file.path.display(), error = %e, "could not hash");
                    HashOutcome::Failed(e.to_string())
                }
            }
        } else {
            HashOutcome::NotHashable
        };

        AnalyzedFile {
            file: file.clone(),
            captured_at,
            coordinates,
            embedded_country,
            hash,
        }
    }

    /// Index to classify against: empty, or seeded with the archive's images
    fn initial_index(&self, catalog: &FolderCatalog) -> Result<HashIndex> {
        let mut index = HashIndex::new();
        if !self.config.seed_from_archive {
            return Ok(index);
        }

        let archived = catalog.archived_files()?;
        let hashes: Vec<(String, ImageHash)> = archived
            .par_iter()
            .filter(|path| MediaKind::from_path(path).is_hashable())
            .filter_map(|path| match self.hasher.hash_file(path) {
                Ok(hash) => {
                    // the archive-relative path never equals a source name
                    let name = path.strip_prefix(catalog.root()).unwrap_or(path);
                    Some((name.to_string_lossy().into_owned(), hash))
                }
                Err(e) => {
                    debug!(file = %path.display(), error = %e, "archived file not hashable");
                    None
                }
            })
            .collect();

        for (name, hash) in hashes {
            index.insert(IndexKey::Image(hash), &name);
        }
        info!(entries = index.len(), "index seeded from archive");
        Ok(index)
    }

    // Stem, then most preferred format, then name: the preferred copy of a
    // same-stem pair is always seen first
    fn classification_order(&self, a: &AnalyzedFile, b: &AnalyzedFile) -> CmpOrdering {
        let key = |f: &AnalyzedFile| {
            (
                f.file.stem().to_lowercase(),
                self.config.quality.preference_key(f.file.kind),
            )
        };
        key(a)
            .cmp(&key(b))
            .then_with(|| a.file.name.cmp(&b.file.name))
    }

    /// Classify serially, then verify every duplicate
    fn classify(
        &self,
        mut analyzed: Vec<AnalyzedFile>,
        index: HashIndex,
        events: &EventSender,
    ) -> Vec<Classified> {
        analyzed.sort_by(|a, b| self.classification_order(a, b));

        let mut detector = DuplicateDetector::with_index(index);
        let mut verdicts: Vec<(AnalyzedFile, Option<DuplicateVerdict>)> =
            Vec::with_capacity(analyzed.len());

        for file in analyzed {
            let verdict = file
                .index_key()
                .map(|key| detector.classify(&file.file.name, key));
            events.send(Event::Classify(ClassifyEvent::Verdict {
                name: file.file.name.clone(),
                verdict: verdict.map_or_else(|| "broken".to_string(), |v| v.to_string()),
            }));
            verdicts.push((file, verdict));
        }

        phase(events, PipelinePhase::Verifying);
        let verification = detector.verify_duplicates();
        let confirmed: HashMap<String, String> = verification
            .confirmed
            .into_iter()
            .map(|dup| (dup.name, dup.canonical))
            .collect();
        let unresolved: HashSet<String> = verification.unresolved.into_iter().collect();
        for name in &unresolved {
            events.send(Event::Classify(ClassifyEvent::Unresolved { name: name.clone() }));
        }

        let classified: Vec<Classified> = verdicts
            .into_iter()
            .map(|(analyzed, verdict)| {
                let duplicate_of = confirmed.get(&analyzed.file.name).cloned();
                let disposition = match verdict {
                    None => Disposition::Broken,
                    Some(DuplicateVerdict::Unique) if analyzed.captured_at.is_some() => {
                        Disposition::Place
                    }
                    Some(DuplicateVerdict::Unique) => Disposition::Unsorted,
                    Some(DuplicateVerdict::Duplicate) if duplicate_of.is_some() => {
                        Disposition::Duplicate
                    }
                    Some(DuplicateVerdict::Duplicate) | Some(DuplicateVerdict::Unresolved) => {
                        Disposition::Review
                    }
                };
                Classified {
                    analyzed,
                    disposition,
                    duplicate_of,
                }
            })
            .collect();

        let count = |d: Disposition| classified.iter().filter(|c| c.disposition == d).count();
        events.send(Event::Classify(ClassifyEvent::Completed {
            unique: count(Disposition::Place) + count(Disposition::Unsorted),
            duplicates: count(Disposition::Duplicate),
            unresolved: count(Disposition::Review),
        }));
        classified
    }

    /// Move every file to its destination, one at a time
    fn place_all(
        &self,
        classified: Vec<Classified>,
        catalog: FolderCatalog,
        events: &EventSender,
        report: &mut RunReport,
    ) {
        let mut engine = PlacementEngine::new(
            catalog,
            self.config.quality.clone(),
            self.config.buckets.duplicates.clone(),
        )
        .with_events(events.clone());

        events.send(Event::Place(PlaceEvent::Started {
            total_files: classified.len(),
        }));

        let mut remaining = classified.into_iter();
        while let Some(item) = remaining.next() {
            if self.cancellation.is_cancelled() {
                info!("cancelled, leaving the remaining files in the source");
                report.cancelled = true;
                report.untouched.push(item.analyzed.file.path);
                report
                    .untouched
                    .extend(remaining.by_ref().map(|rest| rest.analyzed.file.path));
                break;
            }

            let path = item.analyzed.file.path.clone();
            match (item.disposition, item.analyzed.captured_at) {
                (Disposition::Place, Some(captured_at)) => {
                    self.place_one(&mut engine, &item.analyzed, captured_at, events, report);
                }
                (Disposition::Duplicate, _) => {
                    let diverted = self.divert_to(Bucket::Duplicates, &path, events, report);
                    report.duplicates.push(diverted);
                }
                (Disposition::Review, _) => {
                    let diverted = self.divert_to(Bucket::Review, &path, events, report);
                    report.review.push(diverted);
                }
                (Disposition::Broken, _) => {
                    let diverted = self.divert_to(Bucket::Broken, &path, events, report);
                    report.broken.push(diverted);
                }
                (Disposition::Unsorted, _) | (Disposition::Place, None) => {
                    let diverted = self.divert_to(Bucket::Unsorted, &path, events, report);
                    report.unsorted.push(diverted);
                }
            }
        }

        report.folders_created = engine.folders_created().to_vec();
        report.folders_merged = engine.folders_merged().to_vec();
    }

    fn place_one(
        &self,
        engine: &mut PlacementEngine,
        analyzed: &AnalyzedFile,
        captured_at: NaiveDateTime,
        events: &EventSender,
        report: &mut RunReport,
    ) {
        let path = &analyzed.file.path;
        let request = PlacementRequest {
            path: path.clone(),
            captured_at,
            country: self.resolve_country(analyzed, &mut report.issues),
            extension: analyzed.file.extension().to_string(),
        };

        match engine.place(&request) {
            Ok(PlacementOutcome::Placed {
                destination,
                displaced,
                warnings,
                ..
            }) => {
                for warning in warnings {
                    report.issue(destination.clone(), IssueKind::PlacementIncomplete, warning);
                }
                report.placed.push(PlacedFile {
                    from: path.clone(),
                    to: destination,
                });
                if let Some(demotion) = displaced {
                    report.issue(
                        path.clone(),
                        IssueKind::FilesystemConflict,
                        "replaced a lower-quality copy",
                    );
                    record_demotion(demotion, report);
                }
            }
            Ok(PlacementOutcome::Rejected { existing, demotion }) => {
                report.issue(
                    path.clone(),
                    IssueKind::FilesystemConflict,
                    format!("{} is kept", existing.display()),
                );
                record_demotion(demotion, report);
            }
            Err(e) => self.placement_failed(path, &e, events, report),
        }
    }

    /// Country for a file: embedded in its name, else geocoded
    fn resolve_country(&self, analyzed: &AnalyzedFile, issues: &mut Vec<FileIssue>) -> Option<String> {
        if let Some(code) = &analyzed.embedded_country {
            return Some(code.clone());
        }
        let coordinates = analyzed.coordinates?;
        match self.geocoder.country_code(coordinates) {
            Ok(code) => Some(code),
            Err(e) => {
                warn!(file = %analyzed.file.path.display(), error = %e, "no country, placing by date alone");
                issues.push(FileIssue::new(
                    analyzed.file.path.clone(),
                    IssueKind::GeocodeUnavailable,
                    e.to_string(),
                ));
                None
            }
        }
    }

    /// Send a file to a side folder.
    ///
    /// Without the folder, duplicates are deleted and everything else stays
    /// in the source.
    fn divert_to(
        &self,
        bucket: Bucket,
        path: &Path,
        events: &EventSender,
        report: &mut RunReport,
    ) -> DivertedFile {
        let result = match self.config.buckets.path(bucket) {
            Some(dir) => divert(path, dir).map(DivertOutcome::Moved),
            None if bucket == Bucket::Duplicates => {
                warn!(file = %path.display(), "no duplicates folder configured, deleting duplicate");
                remove_file(path).map(|()| DivertOutcome::Deleted)
            }
            None => {
                info!(file = %path.display(), %bucket, "no folder configured, left in source");
                Ok(DivertOutcome::LeftInSource)
            }
        };

        let outcome = match result {
            Ok(outcome) => {
                let label = match &outcome {
                    DivertOutcome::Deleted => "deleted".to_string(),
                    _ => bucket.to_string(),
                };
                events.send(Event::Place(PlaceEvent::Diverted {
                    path: path.to_path_buf(),
                    bucket: label,
                }));
                outcome
            }
            Err(e) => {
                self.placement_failed(path, &e, events, report);
                DivertOutcome::LeftInSource
            }
        };

        DivertedFile {
            from: path.to_path_buf(),
            outcome,
        }
    }

    fn placement_failed(
        &self,
        path: &Path,
        error: &PlacementError,
        events: &EventSender,
        report: &mut RunReport,
    ) {
        warn!(file = %path.display(), error = %error, "could not move file");
        events.send(Event::Place(PlaceEvent::Error {
            path: path.to_path_buf(),
            message: error.to_string(),
        }));
        report.issue(path.to_path_buf(), IssueKind::PlacementFailed, error.to_string());
    }

    fn finish(&self, mut report: RunReport, start_time: Instant, events: &EventSender) -> RunReport {
        report.duration_ms = start_time.elapsed().as_millis() as u64;
        if report.cancelled {
            events.send(Event::Pipeline(PipelineEvent::Cancelled));
        }
        let summary = report.summary();
        info!(
            placed = summary.placed,
            duplicates = summary.duplicates,
            unresolved = summary.unresolved,
            unsorted = summary.unsorted,
            broken = summary.broken,
            duration_ms = summary.duration_ms,
            "run finished"
        );
        events.send(Event::Pipeline(PipelineEvent::Completed { summary }));
        report
    }
}

fn phase(events: &EventSender, phase: PipelinePhase) {
    debug!(%phase, "phase");
    events.send(Event::Pipeline(PipelineEvent::PhaseChanged { phase }));
}

fn record_demotion(demotion: Demotion, report: &mut RunReport) {
    match demotion {
        Demotion::Quarantined { from, to } => report.duplicates.push(DivertedFile {
            from,
            outcome: DivertOutcome::Moved(to),
        }),
        Demotion::Deleted(from) => report.duplicates.push(DivertedFile {
            from,
            outcome: DivertOutcome::Deleted,
        }),
        Demotion::Skipped(path) => report.skipped.push(path),
    }
}

fn classification_issues(classified: &[Classified]) -> Vec<FileIssue> {
    classified
        .iter()
        .filter_map(|item| {
            let path = item.analyzed.file.path.clone();
            match item.disposition {
                Disposition::Unsorted => Some(FileIssue::new(
                    path,
                    IssueKind::MetadataMissing,
                    "no capture timestamp",
                )),
                Disposition::Broken => {
                    let reason = match &item.analyzed.hash {
                        HashOutcome::Failed(reason) => reason.clone(),
                        _ => "could not be hashed".to_string(),
                    };
                    Some(FileIssue::new(path, IssueKind::HashFailure, reason))
                }
                Disposition::Review => Some(FileIssue::new(
                    path,
                    IssueKind::UnresolvedDuplicate,
                    "named like a copy but no original was found",
                )),
                Disposition::Place | Disposition::Duplicate => None,
            }
        })
        .collect()
}
