//! Game session engine.
//!
//! Drives a session through its lifecycle: starting over a generated
//! assignment set, validating each answer exactly once, advancing the
//! round/question pointers, detecting round and game completion, and
//! rolling completed games into host statistics.
//!
//! Double submission is defused at the storage layer: the answer record
//! insert is a compare-and-set, and only its winner mutates the session.
//! Session writes compare the full snapshot they were derived from, so a
//! lifecycle transition racing a committed answer loses cleanly instead
//! of rewinding the score.

use std::time::SystemTime;

use rand::{rng, seq::SliceRandom};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{
        AnswerRecordEntity, AssignmentEntity, QuestionEntity, RoundStatus, SessionEntity,
    },
    dto::{
        question::QuestionCard,
        session::{
            CreateSessionRequest, GameSummaryResponse, ResumeResponse, RoundBreakdown,
            SessionSummary, StartGameResponse, SubmitAnswerRequest, SubmitAnswerResponse,
        },
    },
    error::ServiceError,
    services::stats_service,
    state::{
        SharedState,
        session_machine::{SessionEvent, SessionStatus},
    },
};

/// Bind a fresh session to a game, in `setup` status.
pub async fn create_session(
    state: &SharedState,
    request: CreateSessionRequest,
) -> Result<SessionSummary, ServiceError> {
    let store = state.require_store().await?;

    let Some(game) = store.find_game(request.game_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "game `{}` not found",
            request.game_id
        )));
    };
    if game.host_id != request.host_id {
        return Err(ServiceError::Unauthorized(
            "game belongs to a different host".into(),
        ));
    }

    let session = SessionEntity {
        id: Uuid::new_v4(),
        game_id: game.id,
        host_id: game.host_id,
        status: SessionStatus::Setup,
        total_rounds: game.total_rounds,
        questions_per_round: game.questions_per_round,
        current_round: 1,
        current_question_index: 0,
        total_score: 0,
        started_at: None,
        ended_at: None,
        total_duration_ms: None,
    };
    store.save_session(session.clone()).await?;

    Ok(session.into())
}

/// Start a session, returning the first question of round 1.
///
/// Requires a complete assignment set; a session without one stays in
/// setup.
pub async fn start_game(
    state: &SharedState,
    session_id: Uuid,
    host_id: Uuid,
) -> Result<StartGameResponse, ServiceError> {
    let store = state.require_store().await?;
    let session = load_owned_session(state, session_id, host_id).await?;

    let total = session.total_rounds * session.questions_per_round;
    let assignments = store.assignments_for_game(session.game_id).await?;
    if (assignments.len() as u32) < total {
        return Err(ServiceError::InvalidState(
            "assignment set has not been generated for this game".into(),
        ));
    }

    let mut started = session.clone();
    started.status = session.status.apply(SessionEvent::Start)?;
    started.started_at = Some(SystemTime::now());
    started.current_round = 1;
    started.current_question_index = 0;

    if !store
        .update_session_if(started.clone(), session.clone())
        .await?
    {
        return Err(ServiceError::Conflict("session already started".into()));
    }

    let first_question = card_at(state, &started, &assignments, 1, 1).await?;
    info!(session_id = %session_id, "session started");

    Ok(StartGameResponse {
        session: started.into(),
        first_question,
    })
}

/// Validate one answer, record it exactly once, and advance the session.
pub async fn submit_answer(
    state: &SharedState,
    session_id: Uuid,
    request: SubmitAnswerRequest,
) -> Result<SubmitAnswerResponse, ServiceError> {
    let store = state.require_store().await?;
    let bank = state.require_bank().await?;

    let session = load_owned_session(state, session_id, request.host_id).await?;
    if session.status != SessionStatus::InProgress {
        return Err(ServiceError::InvalidState(format!(
            "answers are only accepted while in progress (status: {:?})",
            session.status
        )));
    }

    let Some(assignment) = store.find_assignment(request.assignment_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "assignment `{}` not found",
            request.assignment_id
        )));
    };
    if assignment.game_id != session.game_id {
        return Err(ServiceError::InvalidInput(
            "assignment belongs to a different game".into(),
        ));
    }

    // Idempotency before the slot check: once a question has an answer
    // record the pointer has moved past it, and a resubmission must read
    // as "already answered" rather than "wrong slot".
    if store.find_answer(session_id, assignment.id).await?.is_some() {
        return Err(ServiceError::Conflict(
            "answer already submitted for this question".into(),
        ));
    }

    if assignment.round_number != session.current_round
        || assignment.question_order != session.current_question_index + 1
    {
        return Err(ServiceError::InvalidInput(
            "assignment is not the session's current question".into(),
        ));
    }

    let Some(question) = bank.question(assignment.question_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "question `{}` missing from bank",
            assignment.question_id
        )));
    };

    let is_correct = answers_match(&request.answer, &question.correct_answer);
    let record = AnswerRecordEntity {
        id: Uuid::new_v4(),
        session_id,
        assignment_id: assignment.id,
        round_number: assignment.round_number,
        submitted_answer: request.answer.clone(),
        is_correct,
        time_to_answer_ms: request.time_to_answer_ms,
        answered_at: SystemTime::now(),
    };

    // The insert is the claim on this assignment; the loser of a double
    // submission stops here without touching the session.
    if !store.insert_answer(record).await? {
        return Err(ServiceError::Conflict(
            "answer already submitted for this question".into(),
        ));
    }

    let mut updated = session.clone();
    if is_correct {
        updated.total_score += 1;
    }
    updated.current_question_index += 1;

    let round_complete = updated.current_question_index == updated.questions_per_round;
    let mut game_complete = false;
    if round_complete {
        updated.current_question_index = 0;
        updated.current_round += 1;
        if updated.current_round > updated.total_rounds {
            game_complete = true;
            updated.status = updated.status.apply(SessionEvent::Complete)?;
            stamp_ended(&mut updated);
        }
    }

    if !store
        .update_session_if(updated.clone(), session.clone())
        .await?
    {
        // The session was paused, cancelled, or completed underneath us;
        // withdraw the claim so the submission leaves no partial trace.
        store.remove_answer(session_id, assignment.id).await?;
        return Err(ServiceError::InvalidState(
            "session is no longer in progress".into(),
        ));
    }

    let round_status = if round_complete {
        RoundStatus::Completed
    } else {
        RoundStatus::InProgress
    };
    store
        .update_round_status(session.game_id, assignment.round_number, round_status)
        .await?;

    if game_complete {
        info!(session_id = %session_id, score = updated.total_score, "game completed");
        // Completion already committed; a stats failure must not undo it.
        if let Err(err) = stats_service::rollup_completed(state, &updated).await {
            warn!(session_id = %session_id, error = %err, "stats rollup failed");
        }
    }

    let next_question = if round_complete || game_complete {
        None
    } else {
        let assignments = store.assignments_for_game(session.game_id).await?;
        Some(
            card_at(
                state,
                &updated,
                &assignments,
                updated.current_round,
                updated.current_question_index + 1,
            )
            .await?,
        )
    };

    Ok(SubmitAnswerResponse {
        is_correct,
        correct_answer: question.correct_answer,
        updated_score: updated.total_score,
        round_complete,
        game_complete,
        next_question,
    })
}

/// Suspend an in-progress session without moving its pointers.
pub async fn pause(
    state: &SharedState,
    session_id: Uuid,
    host_id: Uuid,
) -> Result<SessionSummary, ServiceError> {
    let store = state.require_store().await?;
    let session = load_owned_session(state, session_id, host_id).await?;

    let mut paused = session.clone();
    paused.status = session.status.apply(SessionEvent::Pause)?;

    if !store
        .update_session_if(paused.clone(), session.clone())
        .await?
    {
        return Err(ServiceError::Conflict(
            "session changed during pause; re-read and retry".into(),
        ));
    }

    Ok(paused.into())
}

/// Resume a paused session, returning the question it was paused on.
pub async fn resume(
    state: &SharedState,
    session_id: Uuid,
    host_id: Uuid,
) -> Result<ResumeResponse, ServiceError> {
    let store = state.require_store().await?;
    let session = load_owned_session(state, session_id, host_id).await?;

    let mut resumed = session.clone();
    resumed.status = session.status.apply(SessionEvent::Resume)?;

    // Look the card up before committing so a missing bank leaves the
    // session paused; only a genuinely absent assignment maps to `None`.
    let assignments = store.assignments_for_game(session.game_id).await?;
    let next_question = match card_at(
        state,
        &session,
        &assignments,
        session.current_round,
        session.current_question_index + 1,
    )
    .await
    {
        Ok(card) => Some(card),
        Err(ServiceError::NotFound(_)) => None,
        Err(err) => return Err(err),
    };

    if !store
        .update_session_if(resumed.clone(), session.clone())
        .await?
    {
        return Err(ServiceError::Conflict(
            "session changed during resume; re-read and retry".into(),
        ));
    }

    Ok(ResumeResponse {
        session: resumed.into(),
        next_question,
    })
}

/// Finish a session by host decision, rolling it into lifetime stats.
pub async fn complete_game(
    state: &SharedState,
    session_id: Uuid,
    host_id: Uuid,
) -> Result<GameSummaryResponse, ServiceError> {
    let store = state.require_store().await?;
    let session = load_owned_session(state, session_id, host_id).await?;

    let mut completed = session.clone();
    completed.status = session.status.apply(SessionEvent::Complete)?;
    stamp_ended(&mut completed);

    if !store
        .update_session_if(completed.clone(), session.clone())
        .await?
    {
        return Err(ServiceError::Conflict(
            "session changed during completion; re-read and retry".into(),
        ));
    }

    info!(session_id = %session_id, "session completed by host");
    if let Err(err) = stats_service::rollup_completed(state, &completed).await {
        warn!(session_id = %session_id, error = %err, "stats rollup failed");
    }

    summarize(state, &completed).await
}

/// Abandon a session from any non-terminal status. No stats are recorded.
pub async fn cancel(
    state: &SharedState,
    session_id: Uuid,
    host_id: Uuid,
) -> Result<SessionSummary, ServiceError> {
    let store = state.require_store().await?;
    let session = load_owned_session(state, session_id, host_id).await?;

    let mut cancelled = session.clone();
    cancelled.status = session.status.apply(SessionEvent::Cancel)?;
    cancelled.ended_at = Some(SystemTime::now());

    if !store
        .update_session_if(cancelled.clone(), session.clone())
        .await?
    {
        return Err(ServiceError::Conflict(
            "session changed during cancellation; re-read and retry".into(),
        ));
    }

    info!(session_id = %session_id, "session cancelled");
    Ok(cancelled.into())
}

/// Derived, read-only per-round view over a session's answer records.
pub async fn summary(
    state: &SharedState,
    session_id: Uuid,
) -> Result<GameSummaryResponse, ServiceError> {
    let Some(session) = state.require_store().await?.find_session(session_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "session `{session_id}` not found"
        )));
    };
    summarize(state, &session).await
}

async fn summarize(
    state: &SharedState,
    session: &SessionEntity,
) -> Result<GameSummaryResponse, ServiceError> {
    let store = state.require_store().await?;
    let records = store.answers_for_session(session.id).await?;

    let mut rounds: Vec<RoundBreakdown> = (1..=session.total_rounds)
        .map(|round_number| RoundBreakdown {
            round_number,
            answered: 0,
            correct: 0,
            accuracy: 0.0,
        })
        .collect();

    for record in &records {
        let Some(round) = rounds
            .iter_mut()
            .find(|round| round.round_number == record.round_number)
        else {
            continue;
        };
        round.answered += 1;
        if record.is_correct {
            round.correct += 1;
        }
    }
    for round in &mut rounds {
        if round.answered > 0 {
            round.accuracy = f64::from(round.correct) / f64::from(round.answered);
        }
    }

    let correct_answers = records.iter().filter(|record| record.is_correct).count() as u32;

    Ok(GameSummaryResponse {
        session_id: session.id,
        status: session.status,
        total_score: session.total_score,
        questions_answered: records.len() as u32,
        correct_answers,
        total_duration_ms: session.total_duration_ms,
        rounds,
    })
}

async fn load_owned_session(
    state: &SharedState,
    session_id: Uuid,
    host_id: Uuid,
) -> Result<SessionEntity, ServiceError> {
    let store = state.require_store().await?;
    let Some(session) = store.find_session(session_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "session `{session_id}` not found"
        )));
    };
    if session.host_id != host_id {
        return Err(ServiceError::Unauthorized(
            "session belongs to a different host".into(),
        ));
    }
    Ok(session)
}

fn stamp_ended(session: &mut SessionEntity) {
    let ended = SystemTime::now();
    session.ended_at = Some(ended);
    session.total_duration_ms = session.started_at.map(|started| {
        ended
            .duration_since(started)
            .unwrap_or_default()
            .as_millis() as u64
    });
}

/// Exact comparison against the stored correct answer, ignoring surrounding
/// whitespace only.
fn answers_match(submitted: &str, correct: &str) -> bool {
    submitted.trim() == correct.trim()
}

/// Build the presentation payload for the question at a round/order slot.
async fn card_at(
    state: &SharedState,
    session: &SessionEntity,
    assignments: &[AssignmentEntity],
    round_number: u32,
    question_order: u32,
) -> Result<QuestionCard, ServiceError> {
    let bank = state.require_bank().await?;

    let Some(assignment) = assignments.iter().find(|assignment| {
        assignment.round_number == round_number && assignment.question_order == question_order
    }) else {
        return Err(ServiceError::NotFound(format!(
            "no assignment at round {round_number}, question {question_order} of game `{}`",
            session.game_id
        )));
    };

    let Some(question) = bank.question(assignment.question_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "question `{}` missing from bank",
            assignment.question_id
        )));
    };

    Ok(card_from(assignment, question, state.config().shuffle))
}

fn card_from(
    assignment: &AssignmentEntity,
    question: QuestionEntity,
    shuffle: bool,
) -> QuestionCard {
    let mut answers = Vec::with_capacity(1 + question.distractors.len());
    answers.push(question.correct_answer);
    answers.extend(question.distractors);
    if shuffle {
        let mut generator = rng();
        answers.shuffle(&mut generator);
    }

    QuestionCard {
        assignment_id: assignment.id,
        round_number: assignment.round_number,
        question_order: assignment.question_order,
        category: question.category,
        prompt: question.prompt,
        answers,
    }
}
