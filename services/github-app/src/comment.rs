//! Jobs comment template
//!
//! Each project gets a block wrapped in HTML-comment markers so a later edit
//! can replace exactly one project's block. The marker text is a wire
//! convention shared with whatever edits the comment afterwards; keep it
//! byte-for-byte stable.

use crate::pr::Job;

pub const COMMENT_HEADER: &str = ":arrow_right: The following projects are impacted\n\n";

pub fn start_marker(project_name: &str) -> String {
    format!("<!-- PROJECTHOLDER {project_name} -->")
}

pub fn end_marker(project_name: &str) -> String {
    format!("<!-- PROJECTHOLDEREND {project_name} -->")
}

pub fn pending_line(project_name: &str) -> String {
    format!(":airplane: {project_name} Pending")
}

/// Body of the initial comment: header, then one pending block per job
pub fn initial_comment(jobs: &[Job]) -> String {
    let mut message = COMMENT_HEADER.to_string();
    for job in jobs {
        let name = &job.project_name;
        message.push_str(&start_marker(name));
        message.push('\n');
        message.push_str(&pending_line(name));
        message.push('\n');
        message.push_str(&end_marker(name));
        message.push('\n');
    }
    message
}

/// Replace the content between one project's markers
///
/// Markers are kept; everything outside them is untouched. `None` when the
/// project has no block in `body`.
pub fn replace_project_block(body: &str, project_name: &str, content: &str) -> Option<String> {
    let start = start_marker(project_name);
    let end = end_marker(project_name);

    let content_start = body.find(&start)? + start.len();
    let content_end = content_start + body[content_start..].find(&end)?;

    Some(format!(
        "{}\n{}\n{}",
        &body[..content_start],
        content.trim_end_matches('\n'),
        &body[content_end..]
    ))
}
