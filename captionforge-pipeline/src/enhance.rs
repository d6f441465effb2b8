//! Enhance stage: input captions → enhanced descriptions.
//!
//! Only ids without an enhanced description are sent to the [`Enhancer`];
//! everything already in the manifest is kept as-is.

use std::path::Path;

use serde::Serialize;

use captionforge_core::types::strip_enclosing_quotes;
use captionforge_core::{EnhancementRecord, ImageId, WorkUnit};
use captionforge_prompt::PromptTemplate;

use crate::capability::{CapabilityError, Enhancer};
use crate::error::PipelineError;
use crate::manifest::{self, Manifest};

/// Everything the enhance stage needs besides its two paths.
pub struct EnhanceStage<'a> {
    pub template: &'a PromptTemplate,
    pub enhancer: &'a dyn Enhancer,
    /// Persist the manifest after this many attempted units (0 disables).
    pub checkpoint_every: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnhanceReport {
    pub total: usize,
    pub enhanced: usize,
    /// Already enhanced in a previous run.
    pub skipped: usize,
    pub failed: Vec<ImageId>,
}

/// Run the enhance stage from `input_csv` into the manifest at `output_csv`.
///
/// A capability failure leaves that id's `enhanced_description` absent and
/// the batch continues. The manifest on disk reflects every success even if
/// the stage later returns an error.
pub fn run_enhance(
    input_csv: &Path,
    output_csv: &Path,
    stage: &EnhanceStage<'_>,
) -> Result<EnhanceReport, PipelineError> {
    let units = manifest::load_work_units(input_csv)?;
    let mut records: Manifest<EnhancementRecord> = manifest::load_at(output_csv)?;
    let mut report = EnhanceReport {
        total: units.len(),
        ..EnhanceReport::default()
    };
    tracing::info!(total = units.len(), path = %input_csv.display(), "enhance stage starting");

    let mut attempted = 0usize;
    for unit in &units {
        if records.get(&unit.image_id).is_some_and(EnhancementRecord::is_enhanced) {
            report.skipped += 1;
            continue;
        }

        let enhanced = match enhance_one(unit, stage) {
            Ok(outcome) => outcome,
            Err(err) => {
                manifest::save_at(&records, output_csv)?;
                return Err(err);
            }
        };
        match &enhanced {
            Some(_) => report.enhanced += 1,
            None => report.failed.push(unit.image_id.clone()),
        }

        let mut record = EnhancementRecord::pending(unit);
        record.enhanced_description = enhanced;
        manifest::upsert(&mut records, record);

        attempted += 1;
        if stage.checkpoint_every > 0 && attempted % stage.checkpoint_every == 0 {
            manifest::save_at(&records, output_csv)?;
        }
    }

    manifest::save_at(&records, output_csv)?;
    tracing::info!(
        enhanced = report.enhanced,
        skipped = report.skipped,
        failed = report.failed.len(),
        "enhance stage finished"
    );
    Ok(report)
}

/// `Ok(None)` on a recoverable capability failure; `Err` only when the
/// template itself cannot render.
fn enhance_one(unit: &WorkUnit, stage: &EnhanceStage<'_>) -> Result<Option<String>, PipelineError> {
    let messages = stage.template.render(&unit.description)?;
    let outcome = stage
        .enhancer
        .enhance(&messages)
        .and_then(|raw| clean_completion(&raw));
    match outcome {
        Ok(text) => {
            tracing::debug!(image_id = %unit.image_id, "enhanced");
            Ok(Some(text))
        }
        Err(err) => {
            tracing::warn!(image_id = %unit.image_id, stage = "enhance", error = %err, "enhancement failed");
            Ok(None)
        }
    }
}

fn clean_completion(raw: &str) -> Result<String, CapabilityError> {
    let cleaned = strip_enclosing_quotes(raw);
    if cleaned.is_empty() {
        return Err(CapabilityError::Malformed("empty completion".to_string()));
    }
    Ok(cleaned.to_string())
}

/// Input ids that still lack an enhanced description.
pub fn pending_count(input_csv: &Path, output_csv: &Path) -> Result<usize, PipelineError> {
    let units = manifest::load_work_units(input_csv)?;
    let records: Manifest<EnhancementRecord> = manifest::load_at(output_csv)?;
    Ok(units
        .iter()
        .filter(|u| !records.get(&u.image_id).is_some_and(EnhancementRecord::is_enhanced))
        .count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;

    use captionforge_prompt::ChatMessage;
    use tempfile::TempDir;

    /// Replies "<caption> (enhanced)" and fails for listed captions.
    struct ScriptedEnhancer {
        fail_for: Vec<&'static str>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedEnhancer {
        fn new(fail_for: Vec<&'static str>) -> Self {
            Self {
                fail_for,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Enhancer for ScriptedEnhancer {
        fn enhance(&self, messages: &[ChatMessage]) -> Result<String, CapabilityError> {
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            self.calls.borrow_mut().push(last.clone());
            if self.fail_for.iter().any(|f| last.contains(f)) {
                return Err(CapabilityError::Http {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(format!("\"{last} (enhanced)\""))
        }
    }

    fn template() -> PromptTemplate {
        PromptTemplate::from_yaml(
            "messages:\n  - role: user\n    content: \"{{ description }}\"\n",
            "test",
        )
        .unwrap()
    }

    fn write_input(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("input.csv");
        fs::write(
            &path,
            "image_id,context,description\n001,kitchen,a red mug\n002,garden,a blue chair\n003,garden,a green hose\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn failure_is_contained_and_quotes_are_stripped() {
        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path());
        let output = tmp.path().join("enhanced.csv");
        let template = template();
        let enhancer = ScriptedEnhancer::new(vec!["blue chair"]);
        let stage = EnhanceStage {
            template: &template,
            enhancer: &enhancer,
            checkpoint_every: 1,
        };

        let report = run_enhance(&input, &output, &stage).unwrap();

        assert_eq!(report.enhanced, 2);
        assert_eq!(report.failed, vec![ImageId::from("002")]);
        let saved: Manifest<EnhancementRecord> = manifest::load_at(&output).unwrap();
        assert_eq!(saved.len(), 3);
        assert_eq!(
            saved[&ImageId::from("001")].enhanced_description.as_deref(),
            Some("a red mug (enhanced)")
        );
        assert_eq!(saved[&ImageId::from("002")].enhanced_description, None);
    }

    #[test]
    fn rerun_only_retries_missing_ids() {
        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path());
        let output = tmp.path().join("enhanced.csv");
        let template = template();

        let first = ScriptedEnhancer::new(vec!["blue chair"]);
        run_enhance(
            &input,
            &output,
            &EnhanceStage {
                template: &template,
                enhancer: &first,
                checkpoint_every: 0,
            },
        )
        .unwrap();
        assert_eq!(pending_count(&input, &output).unwrap(), 1);

        let second = ScriptedEnhancer::new(vec![]);
        let report = run_enhance(
            &input,
            &output,
            &EnhanceStage {
                template: &template,
                enhancer: &second,
                checkpoint_every: 0,
            },
        )
        .unwrap();

        assert_eq!(report.skipped, 2);
        assert_eq!(report.enhanced, 1);
        assert_eq!(second.calls.borrow().as_slice(), ["a blue chair"]);
        assert_eq!(pending_count(&input, &output).unwrap(), 0);
    }

    #[test]
    fn blank_completion_counts_as_failure() {
        assert!(matches!(
            clean_completion("  \"\"  "),
            Err(CapabilityError::Malformed(_))
        ));
        assert_eq!(clean_completion(" 'a mug' ").unwrap(), "a mug");
    }
}
