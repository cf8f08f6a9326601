//! Description engine: task-request event → task type code + task body.
//!
//! Pure functions only. The wording is shown to caseworkers as-is, so the
//! templates below are part of the external contract.

use thiserror::Error;

use crate::domain::{EventDirection, SedType, TaskKind, TaskRequestEvent, TaskTypeCode};

/// Registry the identity-mismatch text refers to.
pub const IDENTITY_REGISTRY: &str = "PDL";

/// Prepended to the generic description when the producer flagged deviating data.
pub const WARNING_PREFIX: &str = "Obs avvikende opplysninger i SED.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    pub task_type: TaskTypeCode,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescribeError {
    #[error("missing SED type for {0} description")]
    MissingSedType(TaskKind),

    #[error("unknown or missing parameters for REVIEW_DOCUMENT description")]
    UnresolvedReview,
}

/// Resolve the task type code and build the human-readable description.
pub fn describe(event: &TaskRequestEvent) -> Result<Description, DescribeError> {
    let text = match event.task_kind {
        TaskKind::IdentityMismatch => identity_mismatch(&event.case_id),
        TaskKind::ReviewDocument => review_document(event)?,
        TaskKind::Claim | TaskKind::General | TaskKind::RoutingIn | TaskKind::RoutingOut => {
            let sed = event
                .sed_code
                .as_ref()
                .ok_or(DescribeError::MissingSedType(event.task_kind))?;
            generic(sed, &event.case_id, event.event_direction, event.warning_flag)
        }
    };

    Ok(Description {
        task_type: event.task_kind.task_type(),
        text,
    })
}

fn identity_mismatch(case_id: &str) -> String {
    format!(
        "Avvik i utenlandsk ID i {IDENTITY_REGISTRY}. I saksnummer {case_id} er det mottatt en SED \
         med utenlandsk ID som er forskjellig fra den som finnes i {IDENTITY_REGISTRY}. Avklar \
         hvilken som er korrekt eller om det skal legges til en utenlandsk ID."
    )
}

/// Sub-cases are evaluated in order; the first match wins.
fn review_document(event: &TaskRequestEvent) -> Result<String, DescribeError> {
    let attachment = event.attachment();

    if attachment.is_none() && event.archive_doc_id.is_some() && event.person_ref.is_some() {
        let sed = event.sed_code.as_ref().ok_or(DescribeError::UnresolvedReview)?;
        return Ok(format!(
            "Det er mottatt {} - {}, med tilhørende saksId: {}",
            sed.code(),
            sed.description(),
            event.case_id
        ));
    }

    if let Some(attachment) = attachment
        && event.archive_doc_id.is_none()
    {
        return Ok(format!(
            "Mottatt vedlegg: {attachment} tilhørende saksId: {} mangler filnavn eller er i et \
             format som ikke kan journalføres. Be avsenderland/institusjon sende SED med vedlegg \
             på nytt, i støttet filformat (pdf, jpeg, jpg, png eller tiff) og filnavn angitt",
            event.case_id
        ));
    }

    Err(DescribeError::UnresolvedReview)
}

fn generic(sed: &SedType, case_id: &str, direction: EventDirection, warning: bool) -> String {
    let direction = match direction {
        EventDirection::Received => "Inngående",
        EventDirection::Sent => "Utgående",
    };
    let body = format!(
        "{direction} {} - {} / saksnr: {case_id}",
        sed.code(),
        sed.description()
    );
    if warning {
        format!("{WARNING_PREFIX} {body}")
    } else {
        body
    }
}
