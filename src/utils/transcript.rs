use crate::api::Session;
use crate::core::message::{Message, Role};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => "Assistant",
        Role::System => "##",
    }
}

/// Plain-text rendering of a conversation: one block per message, separated
/// by blank lines.
pub fn render_transcript(session: Option<&Session>, messages: &[Message]) -> String {
    let mut out = String::new();
    if let Some(session) = session {
        out.push_str(&format!("# {}\n", session.title));
        if let Some(pdf) = session.pdf_filename.as_deref() {
            out.push_str(&format!("# Document: {pdf}\n"));
        }
        out.push('\n');
    }
    for message in messages {
        let label = role_label(message.role);
        let mut lines = message.content.lines();
        match lines.next() {
            Some(first) => out.push_str(&format!("{label}: {first}\n")),
            None => out.push_str(&format!("{label}:\n")),
        }
        for line in lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Write the transcript to `path`, replacing it atomically. Refuses to
/// overwrite an existing file unless `overwrite` is set.
pub fn export_transcript(
    path: &Path,
    session: Option<&Session>,
    messages: &[Message],
    overwrite: bool,
) -> Result<usize, Box<dyn std::error::Error>> {
    if messages.is_empty() {
        return Err("There are no messages to export".into());
    }
    if path.exists() && !overwrite {
        return Err(format!("{} already exists", path.display()).into());
    }
    let parent = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp_file = NamedTempFile::new_in(parent)?;
    temp_file.write_all(render_transcript(session, messages).as_bytes())?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path)?;

    tracing::info!(path = %path.display(), count = messages.len(), "transcript exported");
    Ok(messages.len())
}
