//! `oracare analyze <image>`

use std::path::Path;

use anyhow::{anyhow, Result};
use tokio::task::JoinHandle;

use oracare_core::Session;
use oracare_workflow::{AnalysisStage, AnalysisWorkflow, ImageFile, Services, WorkflowOptions};

use crate::terminal_output::{note_info, note_success, render_result};

fn describe(stage: AnalysisStage) -> Option<&'static str> {
    match stage {
        AnalysisStage::Uploading => Some("Uploading image..."),
        AnalysisStage::Analyzing => Some("Analyzing image..."),
        _ => None,
    }
}

/// Print progress lines while the workflow runs; ends when the workflow is dropped.
fn follow_progress(workflow: &AnalysisWorkflow) -> JoinHandle<()> {
    let mut stages = workflow.subscribe();
    tokio::spawn(async move {
        while stages.changed().await.is_ok() {
            let stage = *stages.borrow_and_update();
            if let Some(text) = describe(stage) {
                note_info(text);
            }
        }
    })
}

pub async fn run(
    services: Services,
    options: WorkflowOptions,
    session: &Session,
    image: &Path,
) -> Result<()> {
    let file = ImageFile::from_path(image).await?;
    let mut workflow = AnalysisWorkflow::new(services, options);

    if workflow.select_file(file).is_err() {
        let message = workflow.error().unwrap_or("Please select an image file").to_string();
        return Err(anyhow!(message));
    }

    let progress = follow_progress(&workflow);
    let outcome = workflow.analyze(session).await;
    let message = workflow.error().map(str::to_string);
    drop(workflow);
    let _ = progress.await;

    match outcome {
        Ok(record) => {
            println!();
            print!("{}", render_result(&record.result));
            println!();
            note_success(&format!("Saved as {}", record.id));
            Ok(())
        }
        Err(e) => {
            let message = message.unwrap_or_else(|| e.to_string());
            Err(anyhow!(e).context(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use oracare_core::{
        AnalysisClient, AnalysisResult, DocumentStore, IdentityProvider, OraResult,
    };
    use oracare_firebase::{MemoryDocumentStore, MemoryIdentity, MemoryObjectStore};
    use std::sync::Arc;

    struct Fixed;

    #[async_trait]
    impl AnalysisClient for Fixed {
        async fn analyze(&self, _: &str) -> OraResult<AnalysisResult> {
            Ok(AnalysisResult {
                summary: "Healthy tissue.".into(),
                confidence: 90,
                recommendations: "Routine check-up.".into(),
            })
        }
    }

    #[tokio::test]
    async fn analyzes_file_from_disk() {
        let identity = Arc::new(MemoryIdentity::new());
        let session = identity.sign_up("pat@example.com", "secret1").await.unwrap();
        let documents = Arc::new(MemoryDocumentStore::new());
        let services = Services {
            identity,
            objects: Arc::new(MemoryObjectStore::new()),
            documents: documents.clone(),
            analyzer: Arc::new(Fixed),
        };

        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("mouth.jpg");
        std::fs::write(&image, [0xff, 0xd8, 0xff]).unwrap();
        run(services.clone(), WorkflowOptions::default(), &session, &image)
            .await
            .unwrap();
        assert_eq!(documents.list_for_user(&session, session.uid()).await.unwrap().len(), 1);

        let text = dir.path().join("notes.txt");
        std::fs::write(&text, "hello").unwrap();
        let err = run(services, WorkflowOptions::default(), &session, &text)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Please select an image file");
    }
}
