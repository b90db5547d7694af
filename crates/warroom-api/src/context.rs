//! Renders recent room history into the text block fed to the model on the
//! addressed path. Sentinel paths carry their own prompts and skip this.

use warroom_db::models::ChatRow;

/// How many oldest-first messages are loaded as context.
pub const CONTEXT_MESSAGE_LIMIT: u32 = 15;

/// `"{sender}: {message}"` lines joined by newline, oldest first.
pub fn assemble(rows: &[ChatRow]) -> String {
    rows.iter()
        .map(|r| format!("{}: {}", r.sender_name, r.message))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn addressed_prompt(context: &str, message: &str) -> String {
    format!(
        "Context: {}\nUser: {}\nAnswer strategically. If EXECUTE OPTION found, perform analysis.",
        context, message
    )
}
