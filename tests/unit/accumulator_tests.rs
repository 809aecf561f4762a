//! Unit tests for folding frames into the transcript.
//!
//! Covers the clean stream, a server error after partial output, an error
//! before any token, frames arriving after a terminal state and cancelling
//! a partial answer.

use magic_bot::client::{
    Accumulator, MessageStatus, ResponseState, Role, Step, StreamFailure, Transcript,
};
use magic_bot::protocol::Frame;

use super::test_helpers::memory_reporter;

fn contents(transcript: &Transcript) -> Vec<(Role, MessageStatus, String)> {
    transcript
        .messages()
        .iter()
        .map(|m| (m.role(), m.status(), m.content().to_owned()))
        .collect()
}

// ── Clean stream ─────────────────────────────────────────────

#[test]
fn tokens_accumulate_into_one_answer() {
    let (reporter, sink) = memory_reporter();
    let mut transcript = Transcript::new();
    transcript.push_user("Hi");
    let mut acc = Accumulator::new();

    let first = acc.apply(&mut transcript, &reporter, Frame::token("Hel"));
    let second = acc.apply(&mut transcript, &reporter, Frame::token("lo"));
    assert_eq!(acc.state(), ResponseState::Streaming);
    let done = acc.finish(&mut transcript);

    let id = acc.assistant_id().expect("answer started").to_owned();
    assert_eq!(
        first,
        Step::Token {
            message_id: id.clone(),
            text: "Hel".into()
        }
    );
    assert_eq!(
        second,
        Step::Token {
            message_id: id.clone(),
            text: "lo".into()
        }
    );
    assert_eq!(done, Step::Completed);
    assert_eq!(acc.state(), ResponseState::Completed);

    assert_eq!(
        contents(&transcript),
        vec![
            (Role::User, MessageStatus::Token, "Hi".to_owned()),
            (Role::Assistant, MessageStatus::Token, "Hello".to_owned()),
        ]
    );
    assert!(transcript.get(&id).unwrap().is_frozen());
    assert!(sink.lines().is_empty());
}

#[test]
fn empty_token_still_starts_the_answer() {
    let (reporter, _sink) = memory_reporter();
    let mut transcript = Transcript::new();
    let mut acc = Accumulator::new();

    acc.apply(&mut transcript, &reporter, Frame::token(""));
    acc.apply(&mut transcript, &reporter, Frame::token("x"));

    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript.last().unwrap().content(), "x");
}

#[test]
fn stream_without_tokens_completes_without_a_message() {
    let mut transcript = Transcript::new();
    let mut acc = Accumulator::new();

    assert_eq!(acc.finish(&mut transcript), Step::Completed);
    assert_eq!(acc.state(), ResponseState::Completed);
    assert!(transcript.is_empty());
}

// ── Server-signalled failure ─────────────────────────────────

#[test]
fn error_after_partial_answer_keeps_it_and_appends_error() {
    let (reporter, sink) = memory_reporter();
    let mut transcript = Transcript::new();
    transcript.push_user("Hi");
    let mut acc = Accumulator::new();

    acc.apply(&mut transcript, &reporter, Frame::token("Partial"));
    let step = acc.apply(&mut transcript, &reporter, Frame::error("Streaming failed...."));

    let Step::Failed { error_message_id } = step else {
        panic!("expected failure step, got {step:?}");
    };
    assert_eq!(acc.state(), ResponseState::Failed);
    assert_eq!(
        contents(&transcript),
        vec![
            (Role::User, MessageStatus::Token, "Hi".to_owned()),
            (Role::Assistant, MessageStatus::Token, "Partial".to_owned()),
            (Role::Assistant, MessageStatus::Error, "Streaming failed....".to_owned()),
        ]
    );

    let answer_id = acc.assistant_id().unwrap();
    assert_ne!(answer_id, error_message_id);
    assert!(transcript.get(answer_id).unwrap().is_frozen());
    assert!(transcript.get(&error_message_id).unwrap().is_frozen());

    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("[ERROR] server signaled error: Streaming failed...."));
}

#[test]
fn error_before_any_token_adds_only_the_error() {
    let (reporter, _sink) = memory_reporter();
    let mut transcript = Transcript::new();
    let mut acc = Accumulator::new();

    acc.apply(&mut transcript, &reporter, Frame::error("quota exceeded"));

    assert_eq!(acc.assistant_id(), None);
    assert_eq!(
        contents(&transcript),
        vec![(Role::Assistant, MessageStatus::Error, "quota exceeded".to_owned())]
    );
}

#[test]
fn frames_after_failure_are_ignored() {
    let (reporter, sink) = memory_reporter();
    let mut transcript = Transcript::new();
    let mut acc = Accumulator::new();

    acc.apply(&mut transcript, &reporter, Frame::token("a"));
    acc.apply(&mut transcript, &reporter, Frame::error("boom"));
    let late_token = acc.apply(&mut transcript, &reporter, Frame::token("b"));
    let late_error = acc.apply(&mut transcript, &reporter, Frame::error("again"));

    assert_eq!(late_token, Step::Ignored);
    assert_eq!(late_error, Step::Ignored);
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.messages()[0].content(), "a");
    assert_eq!(sink.lines().len(), 1);
}

#[test]
fn local_failure_uses_generic_message() {
    let (reporter, sink) = memory_reporter();
    let mut transcript = Transcript::new();
    let mut acc = Accumulator::new();

    acc.apply(&mut transcript, &reporter, Frame::token("Hel"));
    acc.fail(
        &mut transcript,
        &reporter,
        &StreamFailure::Transport("connection reset by peer".into()),
    );

    assert_eq!(transcript.last().unwrap().content(), "Something went wrong");
    assert!(sink.lines()[0].contains("connection reset by peer"));
}

#[test]
fn answer_frozen_elsewhere_is_an_internal_failure() {
    let (reporter, sink) = memory_reporter();
    let mut transcript = Transcript::new();
    let mut acc = Accumulator::new();

    acc.apply(&mut transcript, &reporter, Frame::token("Hel"));
    transcript.freeze(acc.assistant_id().unwrap()).unwrap();
    let step = acc.apply(&mut transcript, &reporter, Frame::token("lo"));

    assert!(matches!(step, Step::Failed { .. }));
    assert_eq!(acc.state(), ResponseState::Failed);
    assert_eq!(transcript.messages()[0].content(), "Hel");
    assert_eq!(transcript.last().unwrap().content(), "internal client error");
    let lines = sink.lines();
    assert!(lines[0].contains("internal failure: cannot extend answer"));
    assert!(!lines[0].contains("transport"));
}

#[test]
fn finish_after_failure_is_ignored() {
    let (reporter, _sink) = memory_reporter();
    let mut transcript = Transcript::new();
    let mut acc = Accumulator::new();

    acc.apply(&mut transcript, &reporter, Frame::error("boom"));
    assert_eq!(acc.finish(&mut transcript), Step::Ignored);
    assert_eq!(acc.state(), ResponseState::Failed);
}

// ── Cancellation ─────────────────────────────────────────────

#[test]
fn cancel_discards_partial_answer() {
    let (reporter, sink) = memory_reporter();
    let mut transcript = Transcript::new();
    let user = transcript.push_user("Hi");
    let mut acc = Accumulator::new();

    acc.apply(&mut transcript, &reporter, Frame::token("Hal"));
    let partial = acc.assistant_id().unwrap().to_owned();
    let step = acc.cancel(&mut transcript);

    assert_eq!(
        step,
        Step::Cancelled {
            discarded: Some(partial)
        }
    );
    assert_eq!(acc.state(), ResponseState::Cancelled);
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript.last().unwrap().id(), user);
    assert!(sink.lines().is_empty());
}

#[test]
fn cancel_after_completion_changes_nothing() {
    let (reporter, _sink) = memory_reporter();
    let mut transcript = Transcript::new();
    let mut acc = Accumulator::new();

    acc.apply(&mut transcript, &reporter, Frame::token("done"));
    acc.finish(&mut transcript);

    assert_eq!(acc.cancel(&mut transcript), Step::Ignored);
    assert_eq!(acc.state(), ResponseState::Completed);
    assert_eq!(transcript.len(), 1);
}

#[test]
fn request_ids_are_unique() {
    assert_ne!(Accumulator::new().request_id(), Accumulator::new().request_id());
}
