use crate::{
    candidate::NameMatcher,
    config::{Config, FolderErrorPolicy, MissingMarkerPolicy},
    document::{DocumentBody, Docx},
    error::FolderError,
    inserter,
    rename::{self, FolderPlan},
    report::{AnchorReport, CandidateReport, PlanEntry, RunReport, SkippedFolder},
    scanner::{self, MarkerScan},
    util::{ensure_dir, hash_file, now_rfc3339, same_path},
};
use anyhow::{anyhow, Result};
use std::path::Path;
use tracing::{debug, info, warn};

pub struct Pipeline {
    cfg: Config,
    matcher: NameMatcher,
}

impl Pipeline {
    pub fn new(cfg: &Config) -> Result<Self> {
        Ok(Self {
            cfg: cfg.clone(),
            matcher: NameMatcher::new(cfg)?,
        })
    }

    /// Plans every candidate folder under `root` without renaming anything.
    pub fn plan(&self, root: &Path) -> Result<Vec<PlanEntry>> {
        let mut entries = Vec::new();
        for dir in rename::candidate_dirs(root)? {
            let entry = match rename::plan_folder(&self.cfg, &self.matcher, &dir) {
                Ok(plan) => PlanEntry {
                    folder: dir,
                    plan: Some(plan),
                    error: None,
                },
                Err(err) => match err.downcast_ref::<FolderError>() {
                    Some(fe) => PlanEntry {
                        error: Some(SkippedFolder::new(dir.clone(), fe)),
                        folder: dir,
                        plan: None,
                    },
                    None => return Err(err),
                },
            };
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Renames every folder, inserts the images and writes `output`. All
    /// folders are planned before the first rename, so an aborting folder
    /// error leaves the filesystem untouched.
    pub fn run(&self, root: &Path, input: &Path, output: &Path) -> Result<RunReport> {
        let started = now_rfc3339();
        let mut skipped = Vec::new();

        let mut plans = Vec::new();
        for dir in rename::candidate_dirs(root)? {
            match rename::plan_folder(&self.cfg, &self.matcher, &dir) {
                Ok(plan) => plans.push(plan),
                Err(err) => {
                    let fe = self.tolerate(err)?;
                    warn!("skipping folder {}: {fe}", dir.display());
                    skipped.push(SkippedFolder::new(dir, &fe));
                }
            }
        }

        if same_path(input, output) {
            return Err(anyhow!(
                "output would overwrite the input document: {}",
                output.display()
            ));
        }
        let input_sha256 = hash_file(input)?;
        let mut doc = Docx::open(input)?;

        for plan in &plans {
            info!("processing folder: {}", rename::folder_name(&plan.folder));
            rename::apply_plan(plan)?;
        }

        if self.cfg.debug.dump_paragraphs {
            for (i, text) in doc.paragraph_texts().iter().enumerate() {
                info!("paragraph {i}: {text}");
            }
        }

        let candidates = self.process_document(&mut doc, &plans)?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }
        doc.save(output)?;
        info!("document saved as {}", output.display());

        Ok(RunReport {
            started,
            finished: now_rfc3339(),
            root: root.to_path_buf(),
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            input_sha256,
            output_sha256: hash_file(output)?,
            candidates,
            skipped,
        })
    }

    /// Runs anchor search, marker scan and insertion for every planned
    /// candidate, in plan order.
    pub fn process_document<D: DocumentBody + ?Sized>(
        &self,
        doc: &mut D,
        plans: &[FolderPlan],
    ) -> Result<Vec<CandidateReport>> {
        let mut reports = Vec::with_capacity(plans.len());
        for plan in plans {
            info!("matched name: {}", plan.name);
            debug!(images = ?plan.images, "image slots");

            let mut report = CandidateReport {
                folder: plan.folder.clone(),
                name: plan.name.clone(),
                renames: plan.renames.clone(),
                unclassified: plan.unclassified.clone(),
                images: plan.images.clone(),
                anchors: Vec::new(),
                error: None,
            };

            if let Err(err) = self.process_candidate(doc, plan, &mut report.anchors) {
                let fe = self.tolerate(err)?;
                warn!("skipping rest of '{}': {fe}", plan.name);
                report.error = Some(fe.to_string());
            }
            if report.anchors.is_empty() && report.error.is_none() {
                warn!("no paragraph mentions '{}'", plan.name);
            }
            reports.push(report);
        }
        Ok(reports)
    }

    fn process_candidate<D: DocumentBody + ?Sized>(
        &self,
        doc: &mut D,
        plan: &FolderPlan,
        anchors: &mut Vec<AnchorReport>,
    ) -> Result<()> {
        let mut from = 0;
        while let Some(anchor) = scanner::next_anchor(&self.cfg, &*doc, &plan.name, from) {
            info!(
                "found matching paragraph {anchor}: {}",
                doc.paragraph_text(anchor).unwrap_or_default().trim()
            );
            let scan = scanner::scan_markers(&self.cfg, &*doc, anchor);
            let inserted = match scan {
                MarkerScan::Found { start, end } => inserter::insert_images(
                    &self.cfg,
                    doc,
                    &plan.name,
                    start,
                    end,
                    &plan.images,
                )?,
                _ => {
                    self.on_missing_markers(&plan.name, anchor, &scan)?;
                    Vec::new()
                }
            };
            anchors.push(AnchorReport {
                paragraph: anchor,
                scan,
                inserted,
            });
            from = anchor + 1;
        }
        Ok(())
    }

    fn on_missing_markers(&self, name: &str, anchor: usize, scan: &MarkerScan) -> Result<()> {
        let missing = scan.missing().unwrap_or("start");
        match self.cfg.policy.on_missing_markers {
            MissingMarkerPolicy::Skip => {
                debug!("no {missing} marker after paragraph {anchor} for '{name}'");
                Ok(())
            }
            MissingMarkerPolicy::Warn => {
                warn!("no {missing} marker after paragraph {anchor} for '{name}'; nothing inserted");
                Ok(())
            }
            MissingMarkerPolicy::Error => Err(FolderError::MarkersMissing {
                name: name.to_string(),
                anchor,
                missing,
            }
            .into()),
        }
    }

    /// Hands back a folder error the skip policy allows the run to absorb;
    /// anything else is returned as the run's error.
    fn tolerate(&self, err: anyhow::Error) -> Result<FolderError> {
        if self.cfg.policy.on_folder_error == FolderErrorPolicy::Abort {
            return Err(err);
        }
        err.downcast::<FolderError>()
    }
}
