// Integration tests for the session orchestrator
//
// These tests drive whole enhance -> synthesize pipelines against a scripted
// model and check the resulting screen transitions.

mod common;

use anyhow::Result;
use common::{answer, inline_image, orchestrator, png, thought, voice_clip, ScriptedBackend};
use std::time::Duration;
use voice_canvas::error::PipelineError;
use voice_canvas::gemini::InputPart;
use voice_canvas::session::{EditInput, Phase, SessionState, Submission, MAX_PENDING_IMAGES};
use voice_canvas::MediaBlob;

fn script_generation(backend: &ScriptedBackend, magic_prompt: &str, image: &[u8]) {
    backend.push_stream(vec![
        vec![thought("Planning the scene.")],
        vec![answer(&format!(
            r#"{{"magicPrompt": "{magic_prompt}", "aspectRatio": "4:3"}}"#
        ))],
    ]);
    backend.push_stream(vec![vec![inline_image(Some("image/png"), image)]]);
}

fn script_edit(backend: &ScriptedBackend, instruction: &str, image: &[u8]) {
    backend.push_stream(vec![vec![answer(instruction)]]);
    backend.push_stream(vec![vec![inline_image(Some("image/png"), image)]]);
}

fn text(text: &str) -> Submission {
    Submission::Text {
        text: text.to_string(),
        images: Vec::new(),
    }
}

async fn wait_for_generating(orchestrator: &voice_canvas::SessionOrchestrator) {
    for _ in 0..100 {
        if orchestrator.state().is_generating() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session never started generating");
}

#[tokio::test]
async fn test_text_submission_reaches_display() -> Result<()> {
    let backend = ScriptedBackend::new();
    script_generation(&backend, "A paper lion in a jungle", &[1, 2, 3]);
    let session = orchestrator(backend.clone())?;

    let result = session.submit(text("a lion made of paper")).await?;

    assert_eq!(result.original_prompt, "a lion made of paper");
    assert_eq!(result.enhanced_prompt, "A paper lion in a jungle");
    assert_eq!(result.image, MediaBlob::new("image/png", vec![1, 2, 3]));
    assert!(result.base_image.is_none());

    match session.state() {
        SessionState::Display { result: shown } => assert_eq!(shown.id, result.id),
        other => panic!("expected display, got {other:?}"),
    }
    // Cleared on entering the image phase
    assert_eq!(session.thought(), "");
    assert_eq!(
        backend.requests()[1].text(),
        "A paper lion in a jungle The desired aspect ratio is 4:3."
    );

    Ok(())
}

#[tokio::test]
async fn test_thoughts_are_broadcast_while_enhancing() -> Result<()> {
    let backend = ScriptedBackend::new();
    script_generation(&backend, "p", &[1]);
    let session = orchestrator(backend)?;
    let mut thoughts = session.subscribe_thoughts();

    session.submit(text("anything")).await?;

    assert_eq!(thoughts.try_recv()?, "Planning the scene.");

    Ok(())
}

#[tokio::test]
async fn test_pending_images_are_capped_and_removable() -> Result<()> {
    let session = orchestrator(ScriptedBackend::new())?;

    assert_eq!(session.add_images((0..5).map(png).collect()), 5);
    assert_eq!(session.add_images((5..10).map(png).collect()), MAX_PENDING_IMAGES);

    assert_eq!(session.remove_image(0), 6);
    assert_eq!(session.remove_image(42), 6);
    assert_eq!(session.pending_images()[0], png(1));

    Ok(())
}

#[tokio::test]
async fn test_submission_with_images_edits_first_image() -> Result<()> {
    let backend = ScriptedBackend::new();
    script_edit(&backend, "Make it ghibli style", &[7]);
    let session = orchestrator(backend.clone())?;

    let result = session
        .submit(Submission::Text {
            text: "ghibli".to_string(),
            images: vec![png(1), png(2)],
        })
        .await?;

    assert_eq!(result.base_image, Some(png(1)));
    assert_eq!(result.enhanced_prompt, "Make it ghibli style");

    let requests = backend.requests();
    assert_eq!(requests[0].inline_blobs(), vec![&png(1), &png(2)]);
    assert_eq!(
        requests[1].parts,
        vec![
            InputPart::Inline(png(1)),
            InputPart::Inline(png(2)),
            InputPart::Text("Make it ghibli style".to_string()),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_submission_images_are_capped() -> Result<()> {
    let backend = ScriptedBackend::new();
    script_edit(&backend, "Combine them", &[9]);
    let session = orchestrator(backend.clone())?;

    session
        .submit(Submission::Text {
            text: "combine".to_string(),
            images: (0..12).map(png).collect(),
        })
        .await?;

    let sent = backend.requests()[1].inline_blobs().len();
    assert_eq!(sent, MAX_PENDING_IMAGES);

    Ok(())
}

#[tokio::test]
async fn test_edit_context_images_are_capped() -> Result<()> {
    let backend = ScriptedBackend::new();
    script_generation(&backend, "A dog", &[1]);
    script_edit(&backend, "Put the dog in these places.", &[2]);
    let session = orchestrator(backend.clone())?;

    session.submit(text("a dog")).await?;
    session
        .submit_edit(EditInput {
            images: (0..12).map(png).collect(),
            ..Default::default()
        })
        .await?;

    // Base image plus the capped context
    let sent = backend.requests()[3].inline_blobs().len();
    assert_eq!(sent, MAX_PENDING_IMAGES + 1);

    Ok(())
}

#[tokio::test]
async fn test_chained_edit_uses_previous_result_as_base() -> Result<()> {
    let backend = ScriptedBackend::new();
    script_generation(&backend, "A dog", &[1]);
    script_edit(&backend, "Add a red scarf to the dog.", &[2]);
    let session = orchestrator(backend.clone())?;

    let first = session.submit(text("a dog")).await?;
    let second = session
        .submit_edit(EditInput {
            text: Some("give it a scarf".to_string()),
            ..Default::default()
        })
        .await?;

    assert_eq!(second.base_image.as_ref(), Some(&first.image));
    assert_eq!(second.image.data, vec![2]);
    assert_eq!(backend.requests()[2].inline_blobs(), vec![&first.image]);

    Ok(())
}

#[tokio::test]
async fn test_voice_edit_takes_precedence_over_text() -> Result<()> {
    let backend = ScriptedBackend::new();
    script_generation(&backend, "A dog", &[1]);
    backend.push_text("make it blue");
    script_edit(&backend, "Recolor the dog blue.", &[2]);
    let session = orchestrator(backend.clone())?;

    session.submit(text("a dog")).await?;
    let edited = session
        .submit_edit(EditInput {
            audio: Some(voice_clip()),
            text: Some("ignored".to_string()),
            images: Vec::new(),
        })
        .await?;

    assert_eq!(edited.original_prompt, "make it blue");
    assert!(!backend.requests()[3].text().contains("ignored"));

    Ok(())
}

#[tokio::test]
async fn test_edit_without_input_is_rejected_without_calls() -> Result<()> {
    let backend = ScriptedBackend::new();
    script_generation(&backend, "A dog", &[1]);
    let session = orchestrator(backend.clone())?;
    session.submit(text("a dog")).await?;
    let calls = backend.call_count();

    let result = session
        .submit_edit(EditInput {
            text: Some("   ".to_string()),
            ..Default::default()
        })
        .await;

    assert!(matches!(result, Err(PipelineError::NoInputForEditing)));
    assert_eq!(backend.call_count(), calls);
    assert_eq!(
        session.state(),
        SessionState::Error {
            message: "No input provided for editing.".to_string()
        }
    );

    Ok(())
}

#[tokio::test]
async fn test_preconditions_leave_state_untouched() -> Result<()> {
    let backend = ScriptedBackend::new();
    let session = orchestrator(backend.clone())?;

    let empty = session.submit(text("  ")).await;
    assert!(matches!(empty, Err(PipelineError::EmptyPrompt)));

    let short = session
        .submit(Submission::Voice {
            audio: MediaBlob::new("audio/webm", vec![0; 10]),
            images: Vec::new(),
        })
        .await;
    assert!(matches!(
        short,
        Err(PipelineError::AudioTooShort { bytes: 10, min: 1000 })
    ));

    let boundary = session
        .submit(Submission::Voice {
            audio: MediaBlob::new("audio/webm", vec![0; 1000]),
            images: Vec::new(),
        })
        .await;
    assert!(matches!(
        boundary,
        Err(PipelineError::AudioTooShort { bytes: 1000, min: 1000 })
    ));

    let nothing = session.submit_edit(EditInput::default()).await;
    assert!(matches!(nothing, Err(PipelineError::NothingToEdit)));

    assert_eq!(session.state(), SessionState::default());
    assert_eq!(backend.call_count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_failure_moves_to_error_and_can_resubmit() -> Result<()> {
    let backend = ScriptedBackend::new();
    backend.push_stream(vec![vec![answer(r#"{"magicPrompt": "p"}"#)]]);
    backend.push_stream(vec![vec![answer("no image for you")]]);
    script_generation(&backend, "p", &[5]);
    let session = orchestrator(backend)?;

    let failed = session.submit(text("cat")).await;
    assert!(matches!(failed, Err(PipelineError::NoImageReturned)));
    assert_eq!(
        session.state(),
        SessionState::Error {
            message: "Failed to generate image.".to_string()
        }
    );

    let result = session.submit(text("cat")).await?;
    assert_eq!(result.image.data, vec![5]);
    assert_eq!(session.state().screen(), "display");

    Ok(())
}

#[tokio::test]
async fn test_second_submission_while_running_is_busy() -> Result<()> {
    let backend = ScriptedBackend::new();
    backend.push_pending_stream();
    let session = orchestrator(backend)?;

    let running = {
        let session = session.clone();
        tokio::spawn(async move { session.submit(text("slow")).await })
    };
    wait_for_generating(&session).await;

    assert_eq!(
        session.state(),
        SessionState::Generating {
            phase: Phase::Enhance
        }
    );
    assert!(matches!(
        session.submit(text("fast")).await,
        Err(PipelineError::Busy)
    ));

    session.reset();
    assert!(matches!(running.await?, Err(PipelineError::Cancelled)));
    assert_eq!(session.state(), SessionState::default());
    assert!(!session.is_busy());

    Ok(())
}

#[tokio::test]
async fn test_reset_during_image_phase_discards_result() -> Result<()> {
    let backend = ScriptedBackend::new();
    backend.push_stream(vec![vec![answer(r#"{"magicPrompt": "p"}"#)]]);
    backend.push_pending_stream();
    let session = orchestrator(backend)?;

    let running = {
        let session = session.clone();
        tokio::spawn(async move { session.submit(text("slow")).await })
    };
    for _ in 0..100 {
        if session.state()
            == (SessionState::Generating {
                phase: Phase::Image,
            })
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    session.reset();
    assert!(matches!(running.await?, Err(PipelineError::Cancelled)));
    assert_eq!(session.state(), SessionState::default());

    Ok(())
}

#[tokio::test]
async fn test_reset_while_connecting_cancels() -> Result<()> {
    let backend = ScriptedBackend::new();
    backend.push_stalled_stream();
    let session = orchestrator(backend.clone())?;

    let running = {
        let session = session.clone();
        tokio::spawn(async move { session.submit(text("slow")).await })
    };
    wait_for_generating(&session).await;
    while backend.call_count() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    session.reset();
    let outcome = tokio::time::timeout(Duration::from_secs(1), running).await??;
    assert!(matches!(outcome, Err(PipelineError::Cancelled)));
    assert_eq!(session.state(), SessionState::default());
    assert!(!session.is_busy());

    Ok(())
}
