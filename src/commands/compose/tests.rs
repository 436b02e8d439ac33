use rusqlite::{Connection, params};

use super::error::{CompositionError, is_foreign_key_violation};
use super::events::*;
use super::rounds::*;
use super::slots::*;
use super::user_questions::*;
use super::view::*;
use crate::db::{count_rows, open_in_memory};
use crate::model::{Difficulty, EventStatus, QuestionStatus};

fn seed_category(connection: &Connection, name: &str) -> i64 {
    connection
        .execute("INSERT INTO categories(name) VALUES(?1)", params![name])
        .expect("insert category");
    connection.last_insert_rowid()
}

fn seed_preset(connection: &Connection, category_id: i64, question: &str, difficulty: &str) -> i64 {
    connection
        .execute(
            "
            INSERT INTO trivia_questions(question, answer, category_id, difficulty, notes)
            VALUES(?1, 'preset answer', ?2, ?3, ' ')
            ",
            params![question, category_id, difficulty],
        )
        .expect("insert trivia question");
    connection.last_insert_rowid()
}

fn seed_user_question(connection: &Connection, category_id: Option<i64>) -> i64 {
    create_user_question(
        connection,
        &NewUserQuestion {
            question: "user prompt".to_string(),
            answer: "user answer".to_string(),
            difficulty: Difficulty::Medium,
            category_id,
            created_by: Some(9),
            notes: None,
        },
    )
    .expect("create user question")
}

fn seed_round(connection: &mut Connection) -> (Event, Round) {
    let event = create_event(
        connection,
        &NewEvent {
            name: "Pub night".to_string(),
            creator_id: 1,
            ..NewEvent::default()
        },
    )
    .expect("create event");
    let round = create_round(connection, event.id, &NewRound::default()).expect("create round");
    (event, round)
}

#[test]
fn question_ref_requires_exactly_one_source() {
    assert_eq!(
        QuestionRef::from_columns(Some(3), None).expect("preset"),
        QuestionRef::Preset(3)
    );
    assert_eq!(
        QuestionRef::from_columns(None, Some(4)).expect("user"),
        QuestionRef::User(4)
    );
    assert!(matches!(
        QuestionRef::from_columns(Some(3), Some(4)),
        Err(CompositionError::InvalidSlotReference { .. })
    ));
    assert!(matches!(
        QuestionRef::from_columns(None, None),
        Err(CompositionError::InvalidSlotReference { .. })
    ));
    assert_eq!(QuestionRef::User(4).to_columns(), (None, Some(4)));
}

#[test]
fn storage_rejects_slots_with_both_or_neither_source() {
    let mut connection = open_in_memory().expect("in-memory db");
    let category_id = seed_category(&connection, "HISTORY");
    let preset_id = seed_preset(&connection, category_id, "p", "easy");
    let user_id = seed_user_question(&connection, None);
    let (_, round) = seed_round(&mut connection);

    let both = connection.execute(
        "
        INSERT INTO round_questions(round_id, question_number, preset_question_id, user_question_id, created_at)
        VALUES(?1, 1, ?2, ?3, 'now')
        ",
        params![round.id, preset_id, user_id],
    );
    assert!(both.is_err());

    let neither = connection.execute(
        "
        INSERT INTO round_questions(round_id, question_number, created_at)
        VALUES(?1, 2, 'now')
        ",
        params![round.id],
    );
    assert!(neither.is_err());
    assert_eq!(
        count_rows(&connection, "SELECT COUNT(*) FROM round_questions").expect("count"),
        0
    );
}

#[test]
fn event_status_moves_forward_only() {
    let mut connection = open_in_memory().expect("in-memory db");
    let (event, _) = seed_round(&mut connection);
    assert_eq!(event.status, EventStatus::Draft);

    let skipped = transition_event(&mut connection, event.id, EventStatus::Completed);
    assert!(matches!(skipped, Err(CompositionError::InvalidTransition { .. })));

    let active = transition_event(&mut connection, event.id, EventStatus::Active).expect("activate");
    assert_eq!(active.status, EventStatus::Active);
    let completed =
        transition_event(&mut connection, event.id, EventStatus::Completed).expect("complete");
    assert_eq!(completed.status, EventStatus::Completed);

    let back = transition_event(&mut connection, event.id, EventStatus::Draft);
    assert!(matches!(back, Err(CompositionError::InvalidTransition { .. })));
}

#[test]
fn soft_delete_is_orthogonal_to_status() {
    let mut connection = open_in_memory().expect("in-memory db");
    let (event, _) = seed_round(&mut connection);
    transition_event(&mut connection, event.id, EventStatus::Active).expect("activate");
    transition_event(&mut connection, event.id, EventStatus::Completed).expect("complete");

    soft_delete_event(&connection, event.id).expect("soft delete");
    let reloaded = load_event(&connection, event.id).expect("reload");
    assert!(reloaded.is_deleted);
    assert_eq!(reloaded.status, EventStatus::Completed);

    let frozen = transition_event(&mut connection, event.id, EventStatus::Completed);
    assert!(matches!(frozen, Err(CompositionError::Deleted { .. })));
}

#[test]
fn rounds_are_numbered_uniquely_per_event() {
    let mut connection = open_in_memory().expect("in-memory db");
    let (event, first) = seed_round(&mut connection);
    assert_eq!(first.round_number, 1);
    assert_eq!(first.name.as_deref(), Some("Round 1"));

    let second = create_round(&mut connection, event.id, &NewRound::default()).expect("second");
    assert_eq!(second.round_number, 2);

    let duplicate = create_round(
        &mut connection,
        event.id,
        &NewRound {
            round_number: Some(2),
            ..NewRound::default()
        },
    );
    assert!(matches!(
        duplicate,
        Err(CompositionError::DuplicateRoundNumber { round_number: 2, .. })
    ));

    let (other_event, other_round) = seed_round(&mut connection);
    assert_ne!(other_event.id, event.id);
    assert_eq!(other_round.round_number, 1);
}

#[test]
fn slots_are_numbered_uniquely_per_round() {
    let mut connection = open_in_memory().expect("in-memory db");
    let category_id = seed_category(&connection, "HISTORY");
    let preset_id = seed_preset(&connection, category_id, "p", "easy");
    let (_, round) = seed_round(&mut connection);

    add_slot(&mut connection, round.id, 1, QuestionRef::Preset(preset_id)).expect("first slot");
    let duplicate = add_slot(&mut connection, round.id, 1, QuestionRef::Preset(preset_id));
    assert!(matches!(
        duplicate,
        Err(CompositionError::DuplicateQuestionNumber { question_number: 1, .. })
    ));
}

#[test]
fn slots_reject_missing_or_deleted_questions() {
    let mut connection = open_in_memory().expect("in-memory db");
    let user_id = seed_user_question(&connection, None);
    let (_, round) = seed_round(&mut connection);

    let missing = add_slot(&mut connection, round.id, 1, QuestionRef::Preset(999));
    assert!(matches!(missing, Err(CompositionError::NotFound { .. })));

    moderate_user_question(&connection, user_id, QuestionStatus::Deleted).expect("moderate");
    let deleted = add_slot(&mut connection, round.id, 1, QuestionRef::User(user_id));
    assert!(matches!(deleted, Err(CompositionError::Deleted { .. })));

    soft_delete_round(&connection, round.id).expect("delete round");
    let closed = add_slot(&mut connection, round.id, 2, QuestionRef::Preset(1));
    assert!(matches!(closed, Err(CompositionError::Deleted { .. })));
}

#[test]
fn replacing_a_slot_switches_its_source() {
    let mut connection = open_in_memory().expect("in-memory db");
    let category_id = seed_category(&connection, "HISTORY");
    let preset_id = seed_preset(&connection, category_id, "p", "hard");
    let user_id = seed_user_question(&connection, Some(category_id));
    let (_, round) = seed_round(&mut connection);

    let slot = add_slot(&mut connection, round.id, 1, QuestionRef::Preset(preset_id)).expect("add");
    let replaced =
        replace_slot_question(&mut connection, slot.id, QuestionRef::User(user_id)).expect("replace");
    assert_eq!(replaced.question, QuestionRef::User(user_id));
    assert_eq!(replaced.question_number, 1);

    let reloaded = load_slot(&connection, slot.id).expect("reload");
    assert_eq!(reloaded.question, QuestionRef::User(user_id));
}

#[test]
fn referenced_user_questions_cannot_be_purged() {
    let mut connection = open_in_memory().expect("in-memory db");
    let user_id = seed_user_question(&connection, None);
    let (_, round) = seed_round(&mut connection);
    let slot = add_slot(&mut connection, round.id, 1, QuestionRef::User(user_id)).expect("add");

    let blocked = purge_user_question(&mut connection, user_id);
    assert!(matches!(
        blocked,
        Err(CompositionError::QuestionReferenced { id }) if id == user_id
    ));

    moderate_user_question(&connection, user_id, QuestionStatus::Deleted).expect("moderate");
    let still_blocked = purge_user_question(&mut connection, user_id);
    assert!(matches!(still_blocked, Err(CompositionError::QuestionReferenced { .. })));

    remove_slot(&connection, slot.id).expect("remove slot");
    purge_user_question(&mut connection, user_id).expect("purge unreferenced question");
    assert!(matches!(
        purge_user_question(&mut connection, user_id),
        Err(CompositionError::NotFound { .. })
    ));
}

#[test]
fn restricted_question_delete_is_recognized_as_foreign_key_failure() {
    let mut connection = open_in_memory().expect("in-memory db");
    let category_id = seed_category(&connection, "HISTORY");
    let preset_id = seed_preset(&connection, category_id, "p", "easy");
    let (_, round) = seed_round(&mut connection);
    add_slot(&mut connection, round.id, 1, QuestionRef::Preset(preset_id)).expect("add");

    let err = connection
        .execute("DELETE FROM trivia_questions WHERE id = ?1", params![preset_id])
        .expect_err("referenced preset question is restricted");
    assert!(is_foreign_key_violation(&err));
}

#[test]
fn purging_an_event_cascades_to_rounds_and_slots() {
    let mut connection = open_in_memory().expect("in-memory db");
    let category_id = seed_category(&connection, "HISTORY");
    let preset_id = seed_preset(&connection, category_id, "p", "easy");
    let (event, round) = seed_round(&mut connection);
    add_slot(&mut connection, round.id, 1, QuestionRef::Preset(preset_id)).expect("add");

    purge_event(&connection, event.id).expect("purge");
    assert_eq!(count_rows(&connection, "SELECT COUNT(*) FROM rounds").expect("count"), 0);
    assert_eq!(
        count_rows(&connection, "SELECT COUNT(*) FROM round_questions").expect("count"),
        0
    );
    assert_eq!(
        count_rows(&connection, "SELECT COUNT(*) FROM trivia_questions").expect("count"),
        1
    );
}

#[test]
fn normalized_view_merges_both_sources() {
    let mut connection = open_in_memory().expect("in-memory db");
    let category_id = seed_category(&connection, "HISTORY");
    let preset_id = seed_preset(&connection, category_id, "preset prompt", "hard");
    let user_id = seed_user_question(&connection, None);
    let (_, round) = seed_round(&mut connection);

    add_slot(&mut connection, round.id, 2, QuestionRef::User(user_id)).expect("user slot");
    add_slot(&mut connection, round.id, 1, QuestionRef::Preset(preset_id)).expect("preset slot");

    let rows = round_questions(&connection, round.id).expect("view");
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].question_number, 1);
    assert_eq!(rows[0].source, QuestionRef::Preset(preset_id));
    assert_eq!(rows[0].question, "preset prompt");
    assert_eq!(rows[0].answer, "preset answer");
    assert_eq!(rows[0].difficulty, Difficulty::Hard);
    assert_eq!(rows[0].category_id, Some(category_id));
    assert_eq!(rows[0].category_name, "HISTORY");

    assert_eq!(rows[1].source, QuestionRef::User(user_id));
    assert_eq!(rows[1].question, "user prompt");
    assert_eq!(rows[1].difficulty, Difficulty::Medium);
    assert_eq!(rows[1].category_id, None);
    assert_eq!(rows[1].category_name, "Uncategorized");

    let view_rows =
        count_rows(&connection, "SELECT COUNT(*) FROM normalized_questions_view").expect("count");
    let slot_rows = count_rows(&connection, "SELECT COUNT(*) FROM round_questions").expect("count");
    assert_eq!(view_rows, slot_rows);
}

#[test]
fn normalized_view_serializes_tagged_source() {
    let mut connection = open_in_memory().expect("in-memory db");
    let user_id = seed_user_question(&connection, None);
    let (_, round) = seed_round(&mut connection);
    add_slot(&mut connection, round.id, 1, QuestionRef::User(user_id)).expect("add");

    let rows = round_questions(&connection, round.id).expect("view");
    let json = serde_json::to_value(&rows[0]).expect("serialize");
    assert_eq!(json["source"]["type"], "user");
    assert_eq!(json["source"]["id"], user_id);
    assert_eq!(json["difficulty"], "medium");
}
