use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use super::domain::{PlaceId, Report, ReportId, ReportKind, ReportStatus, UserId};
use super::ident;
use super::repository::{ReportRepository, RepositoryError};

pub const REPORT_COMMENT_MAX_CHARS: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("a comment describing the report is required")]
    MissingComment,
    #[error("report comments are limited to {max} characters")]
    CommentTooLong { max: usize },
    #[error("this author has already reported this place")]
    Duplicate,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Report and moderation subsystem. Reports only ever resolve as part of
/// the target place's soft-delete cascade.
pub struct ReportService<R> {
    repository: Arc<R>,
}

impl<R> ReportService<R>
where
    R: ReportRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Files an open report. Any prior report by the same author against
    /// the same place blocks filing, even one already resolved.
    pub fn file(
        &self,
        author: &UserId,
        target: &PlaceId,
        kind: ReportKind,
        comment: &str,
    ) -> Result<Report, ReportError> {
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(ReportError::MissingComment);
        }
        if comment.chars().count() > REPORT_COMMENT_MAX_CHARS {
            return Err(ReportError::CommentTooLong {
                max: REPORT_COMMENT_MAX_CHARS,
            });
        }
        if self
            .repository
            .for_author_and_target(author, target)?
            .is_some()
        {
            return Err(ReportError::Duplicate);
        }

        let report = ident::insert_with_retry(|id| {
            self.repository.insert(Report {
                id: ReportId(id),
                author: author.clone(),
                target: target.clone(),
                kind,
                comment: comment.to_string(),
                status: ReportStatus::Open,
                filed_at: Utc::now(),
                resolved_at: None,
            })
        })
        .map_err(|err| match err {
            RepositoryError::Conflict => ReportError::Duplicate,
            other => ReportError::Repository(other),
        })?;
        Ok(report)
    }

    /// Resolves every open report against the place, returning the ids that
    /// transitioned. A mid-cascade failure reopens the reports already
    /// resolved before the error propagates, so the cascade never half
    /// completes.
    pub fn resolve_open_for(&self, target: &PlaceId) -> Result<Vec<ReportId>, ReportError> {
        let open = self.repository.open_for_place(target)?;
        let mut resolved = Vec::with_capacity(open.len());
        for mut report in open {
            let id = report.id.clone();
            report.status = ReportStatus::Resolved;
            report.resolved_at = Some(Utc::now());
            if let Err(err) = self.repository.update(report) {
                self.reopen(&resolved);
                return Err(err.into());
            }
            resolved.push(id);
        }
        Ok(resolved)
    }

    /// Compensation path for a failed delete saga: puts the given reports
    /// back to open. Best-effort; failures are logged, not propagated.
    pub fn reopen(&self, ids: &[ReportId]) {
        for id in ids {
            let mut report = match self.repository.fetch(id) {
                Ok(Some(report)) => report,
                Ok(None) => continue,
                Err(err) => {
                    warn!(report = %id.0, error = %err, "unable to load report while reopening");
                    continue;
                }
            };
            report.status = ReportStatus::Open;
            report.resolved_at = None;
            if let Err(err) = self.repository.update(report) {
                warn!(report = %id.0, error = %err, "unable to reopen report after failed delete");
            }
        }
    }
}
