//! Grading-sheet payload and the remote sheet collaborator.
//!
//! The compiler never talks to a sheet itself. [`SheetAttributes`] is the
//! payload a grading layer persists for a compiled file, and [`publish`]
//! refuses to overwrite a previously published payload with one whose
//! questions are inconsistent with it.

use eyre::WrapErr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{DocumentModel, QuestionOptions, Retry, SkipInfo};

/// Per-question grading metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetQuestion {
    pub qnumber: usize,
    pub slide_id: String,
    pub qtype: String,
    /// Correct answer as displayed, if any
    pub correct: Option<String>,
    pub weight: f64,
    pub gweight: Option<f64>,
    pub vweight: f64,
    pub options: QuestionOptions,
    pub retry: Option<Retry>,
    pub hints: Vec<f64>,
    pub digest: String,
    pub skip: Option<SkipInfo>,
}

/// What a grading sheet stores for one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetAttributes {
    pub file: String,
    pub chapter_id: String,
    pub questions: Vec<SheetQuestion>,
    pub cum_score: Vec<f64>,
    pub cum_grade: Vec<f64>,
    pub total_score: f64,
    pub total_grade: f64,
}

impl DocumentModel {
    /// The sheet payload for this file
    pub fn sheet_attributes(&self) -> SheetAttributes {
        SheetAttributes {
            file: self.file.clone(),
            chapter_id: self.chapter_id.clone(),
            questions: self
                .questions
                .iter()
                .map(|q| SheetQuestion {
                    qnumber: q.qnumber,
                    slide_id: q.slide_id.clone(),
                    qtype: q.qtype.keyword(),
                    correct: q.correct.as_ref().map(|c| c.display_value()),
                    weight: q.weight,
                    gweight: q.gweight,
                    vweight: q.vweight,
                    options: q.options.clone(),
                    retry: q.retry,
                    hints: q.hints.clone(),
                    digest: q.digest.clone(),
                    skip: q.skip.clone(),
                })
                .collect(),
            cum_score: self.cum_score.clone(),
            cum_grade: self.cum_grade.clone(),
            total_score: self.total_score_weight(),
            total_grade: self.total_grade_weight(),
        }
    }
}

/// Reasons a payload may not replace a published one
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepublishError {
    #[error("question {qnumber} changed type from '{previous}' to '{current}'")]
    QuestionTypeChanged {
        qnumber: usize,
        previous: String,
        current: String,
    },

    #[error("{previous} questions were published but only {current} remain")]
    QuestionsRemoved { previous: usize, current: usize },

    #[error("published sheet belongs to '{previous}', not '{current}'")]
    WrongFile { previous: String, current: String },
}

/// Check that `current` may replace the published `previous`
pub fn check_republish(
    previous: &SheetAttributes,
    current: &SheetAttributes,
) -> Result<(), RepublishError> {
    if previous.file != current.file {
        return Err(RepublishError::WrongFile {
            previous: previous.file.clone(),
            current: current.file.clone(),
        });
    }
    if current.questions.len() < previous.questions.len() {
        return Err(RepublishError::QuestionsRemoved {
            previous: previous.questions.len(),
            current: current.questions.len(),
        });
    }
    for (old, new) in previous.questions.iter().zip(&current.questions) {
        if old.qtype != new.qtype {
            return Err(RepublishError::QuestionTypeChanged {
                qnumber: old.qnumber,
                previous: old.qtype.clone(),
                current: new.qtype.clone(),
            });
        }
    }
    Ok(())
}

/// Remote grade/roster store
pub trait RemoteSheet {
    fn post(&self, sheet: &str, params: &serde_json::Value) -> eyre::Result<serde_json::Value>;
}

/// Post `attrs` to `sheet`, after checking them against what was
/// published before.
pub fn publish(
    sheet: &dyn RemoteSheet,
    session: &str,
    attrs: &SheetAttributes,
    previous: Option<&SheetAttributes>,
) -> eyre::Result<serde_json::Value> {
    if let Some(previous) = previous {
        check_republish(previous, attrs)
            .wrap_err_with(|| format!("refusing to republish session '{session}'"))?;
    }
    let params = serde_json::json!({
        "action": "publish",
        "session": session,
        "attributes": attrs,
    });
    tracing::info!(session, questions = attrs.questions.len(), "publishing sheet");
    sheet
        .post(session, &params)
        .wrap_err_with(|| format!("failed to post session '{session}'"))
}
