//! save command - Commit stray changes and push

use anyhow::Result;

use crate::cli::Context;

/// Autosave: the entry point for an external scheduler.
pub fn save(ctx: &Context) -> Result<()> {
    let outcome = ctx.engine.save()?;
    match &outcome.committed {
        Some(subject) => ctx.print(format!("Committed stray changes as {}", subject)),
        None => ctx.print("No unrecorded changes"),
    }
    ctx.print(capitalize(&outcome.push.to_string()));
    Ok(())
}

pub(super) fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::capitalize;

    #[test]
    fn capitalizes_first_letter() {
        assert_eq!(capitalize("no changes to push"), "No changes to push");
        assert_eq!(capitalize(""), "");
    }
}
