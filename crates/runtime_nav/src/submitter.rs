//! Form submissions.

use crate::config::NAVIGATE_ATTRIBUTE;
use crate::error::NavigationError;
use crate::form::{FormMethod, FormSubmission};
use crate::navigator::{Navigator, PageContext};
use crate::policy::{same_origin, should_visit};
use core_types::{NavigationReason, NavigationResult};
use html::NodeId;
use platform::Host;

fn rejection<H: Host>(
    ctx: &PageContext<H>,
    submission: &FormSubmission,
    form: NodeId,
    submitter: Option<NodeId>,
) -> Option<NavigationReason> {
    if submission.method == FormMethod::Dialog {
        return Some(NavigationReason::DialogFormTarget);
    }
    if !same_origin(&submission.action, &ctx.location) {
        return Some(NavigationReason::ExternalTarget);
    }
    // The submitter's directive wins over the form's.
    let directive = submitter
        .and_then(|s| ctx.dom.attribute(s, NAVIGATE_ATTRIBUTE))
        .or_else(|| ctx.dom.attribute(form, NAVIGATE_ATTRIBUTE));
    if !should_visit(directive, ctx.config.default_navigate) {
        return Some(NavigationReason::NavigationDisabledOnElement);
    }
    None
}

/// Submit `form` through the runtime. Anything but success ends in a native submission.
pub fn submit<H: Host>(
    ctx: &mut PageContext<H>,
    form: NodeId,
    submitter: Option<NodeId>,
) -> Result<NavigationResult, NavigationError> {
    let outcome = FormSubmission::from_form(&ctx.dom, form, submitter, &ctx.location)
        .map_err(NavigationError::from)
        .and_then(|submission| {
            if let Some(reason) = rejection(ctx, &submission, form, submitter) {
                return Ok(NavigationResult::Failure(reason));
            }
            match submission.to_request() {
                Some(request) => Navigator::new(request.url.clone()).visit(ctx, Some(request)),
                None => Ok(NavigationResult::Failure(
                    NavigationReason::DialogFormTarget,
                )),
            }
        });
    match &outcome {
        Ok(NavigationResult::Success) => {}
        Ok(NavigationResult::Failure(reason)) => {
            log::debug!(target: "nav.submitter", "form {}: {reason}, falling back", form.0);
            ctx.host.submit_form(form);
        }
        Err(err) => {
            log::error!(target: "nav.submitter", "form {}: {err}, falling back", form.0);
            ctx.host.submit_form(form);
        }
    }
    outcome
}
