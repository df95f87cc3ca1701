//! `oracare history` and `oracare delete <id>`

use anyhow::{anyhow, Result};

use oracare_core::Session;
use oracare_workflow::{HistoryWorkflow, Services};

use crate::terminal_output::{note_info, note_success, render_history};

pub async fn list(services: Services, session: &Session) -> Result<()> {
    let mut history = HistoryWorkflow::new(services);
    if let Err(e) = history.load(session).await {
        let message = history.error().unwrap_or("Failed to fetch analysis history").to_string();
        return Err(anyhow!(e).context(message));
    }

    if history.records().is_empty() {
        note_info("No analyses yet. Run `oracare analyze <image>` to create one.");
    } else {
        print!("{}", render_history(history.records()));
    }
    Ok(())
}

pub async fn delete(services: Services, session: &Session, id: &str) -> Result<()> {
    let mut history = HistoryWorkflow::new(services);
    if let Err(e) = history.delete(session, id).await {
        let message = history.error().unwrap_or("Failed to delete analysis").to_string();
        return Err(anyhow!(e).context(message));
    }
    note_success(&format!("Deleted analysis {id}"));
    Ok(())
}
