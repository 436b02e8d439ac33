use std::io::{self, Write};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

use super::events::{NewEvent, create_event, purge_event, soft_delete_event, transition_event};
use super::rounds::{NewRound, create_round, soft_delete_round};
use super::slots::{QuestionRef, add_slot, remove_slot, replace_slot_question};
use super::user_questions::{
    NewUserQuestion, create_user_question, moderate_user_question, purge_user_question,
};
use super::view::{NormalizedSlot, round_questions};
use crate::cli::{
    EventAction, EventArgs, RoundAction, RoundArgs, SlotAction, SlotArgs, UserQuestionAction,
    UserQuestionArgs, ViewArgs,
};
use crate::db::open_database;

pub fn run_event(args: EventArgs) -> Result<()> {
    let mut connection = open_database(&args.store.resolved_db_path())?;

    match args.action {
        EventAction::Create {
            name,
            creator,
            event_date,
            description,
        } => {
            let event_date = event_date
                .as_deref()
                .map(|raw| {
                    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                        .with_context(|| format!("invalid event date {raw:?}, expected YYYY-MM-DD"))
                })
                .transpose()?;
            let event = create_event(
                &connection,
                &NewEvent {
                    name,
                    creator_id: creator,
                    event_date,
                    description,
                },
            )?;
            info!(event_id = event.id, name = %event.name, status = event.status.as_str(), "created event");
        }
        EventAction::Status { id, to } => {
            let event = transition_event(&mut connection, id, to)?;
            info!(event_id = event.id, status = event.status.as_str(), "updated event status");
        }
        EventAction::Delete { id } => {
            soft_delete_event(&connection, id)?;
            info!(event_id = id, "marked event deleted");
        }
        EventAction::Purge { id } => {
            purge_event(&connection, id)?;
            info!(event_id = id, "purged event with its rounds");
        }
    }

    Ok(())
}

pub fn run_round(args: RoundArgs) -> Result<()> {
    let mut connection = open_database(&args.store.resolved_db_path())?;

    match args.action {
        RoundAction::Create {
            event,
            number,
            name,
            category,
        } => {
            let round = create_round(
                &mut connection,
                event,
                &NewRound {
                    round_number: number,
                    name,
                    category_id: category,
                },
            )?;
            info!(
                round_id = round.id,
                event_id = round.event_id,
                round_number = round.round_number,
                "created round"
            );
        }
        RoundAction::Delete { id } => {
            soft_delete_round(&connection, id)?;
            info!(round_id = id, "marked round deleted");
        }
    }

    Ok(())
}

pub fn run_slot(args: SlotArgs) -> Result<()> {
    let mut connection = open_database(&args.store.resolved_db_path())?;

    match args.action {
        SlotAction::Add {
            round,
            number,
            preset,
            user,
        } => {
            let question = QuestionRef::from_columns(preset, user)?;
            let slot = add_slot(&mut connection, round, number, question)?;
            info!(
                slot_id = slot.id,
                round_id = slot.round_id,
                question_number = slot.question_number,
                source = slot.question.kind(),
                question_id = slot.question.id(),
                "added round slot"
            );
        }
        SlotAction::Replace { id, preset, user } => {
            let question = QuestionRef::from_columns(preset, user)?;
            let slot = replace_slot_question(&mut connection, id, question)?;
            info!(
                slot_id = slot.id,
                source = slot.question.kind(),
                question_id = slot.question.id(),
                "replaced round slot question"
            );
        }
        SlotAction::Remove { id } => {
            remove_slot(&connection, id)?;
            info!(slot_id = id, "removed round slot");
        }
    }

    Ok(())
}

pub fn run_user_question(args: UserQuestionArgs) -> Result<()> {
    let mut connection = open_database(&args.store.resolved_db_path())?;

    match args.action {
        UserQuestionAction::Create {
            question,
            answer,
            difficulty,
            category,
            creator,
            notes,
        } => {
            let id = create_user_question(
                &connection,
                &NewUserQuestion {
                    question,
                    answer,
                    difficulty,
                    category_id: category,
                    created_by: creator,
                    notes,
                },
            )?;
            info!(question_id = id, "created user question");
        }
        UserQuestionAction::Moderate { id, status } => {
            moderate_user_question(&connection, id, status)?;
            info!(question_id = id, status = status.as_str(), "moderated user question");
        }
        UserQuestionAction::Purge { id } => {
            purge_user_question(&mut connection, id)?;
            info!(question_id = id, "purged user question");
        }
    }

    Ok(())
}

pub fn run_view(args: ViewArgs) -> Result<()> {
    let connection = open_database(&args.store.resolved_db_path())?;
    let slots = round_questions(&connection, args.round)?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &slots)
            .context("failed to serialize round questions")?;
        writeln!(output)?;
    } else {
        write_text_view(&mut output, args.round, &slots)?;
    }
    output.flush()?;

    Ok(())
}

fn write_text_view(output: &mut impl Write, round_id: i64, slots: &[NormalizedSlot]) -> Result<()> {
    writeln!(output, "Round {round_id}: {} questions", slots.len())?;
    for slot in slots {
        writeln!(
            output,
            "{}.\t{} #{}\t{}\t{}",
            slot.question_number,
            slot.source.kind(),
            slot.source.id(),
            slot.difficulty.as_str(),
            slot.category_name,
        )?;
        writeln!(output, "\tQ: {}", slot.question)?;
        writeln!(output, "\tA: {}", slot.answer)?;
    }
    Ok(())
}
