//! Terminal host for a timed attempt.

use std::io::{self, Write};

use api::ApiError;
use prep_core::model::{ExamResult, ResultId, TestId};
use services::{
    CountdownTimer, Direction, ExamLoopService, ExamSession, ExamView, PendingSubmission,
    ResultService, SubmitOutcome, SubmitTrigger, TickState,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

type SentSubmission = (SubmitTrigger, Result<ResultId, ApiError>);

/// One line of learner input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Next,
    Previous,
    Choose(usize),
    Submit,
    Quit,
    Unknown,
}

impl Input {
    fn parse(line: &str) -> Self {
        match line.trim() {
            "n" | "next" => Self::Next,
            "p" | "prev" => Self::Previous,
            "s" | "submit" => Self::Submit,
            "q" | "quit" => Self::Quit,
            other => match other.parse::<usize>() {
                Ok(choice @ 1..=9) => Self::Choose(choice - 1),
                _ => Self::Unknown,
            },
        }
    }
}

/// How the attempt ended.
enum Exit {
    Submitted(ResultId),
    Abandoned,
    Quit,
}

fn spawn_send(pending: PendingSubmission, done: &mpsc::Sender<SentSubmission>) {
    let done = done.clone();
    tokio::spawn(async move {
        let trigger = pending.trigger();
        let outcome = pending.send().await;
        // The receiver only goes away when the attempt loop has ended.
        let _ = done.send((trigger, outcome)).await;
    });
}

/// Run one attempt end to end: load, answer, submit, then show the result.
///
/// Load failures and a failed submission after expiry print a notice and
/// return normally; the learner is simply back at the prompt.
pub(crate) async fn take_exam(
    exams: &ExamLoopService,
    results: &ResultService,
    test_id: TestId,
    duration_minutes: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = match exams.start_exam(test_id.clone(), duration_minutes).await {
        Ok(session) => session,
        Err(err) => {
            println!("Could not load test {test_id}: {err}");
            return Ok(());
        }
    };

    let (timer, mut ticks) = CountdownTimer::every_second();
    let (done_tx, mut done_rx) = mpsc::channel::<SentSubmission>(1);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_closed = false;

    print_help();
    render(&ExamView::from_session(&session));

    let exit = loop {
        tokio::select! {
            Some(()) = ticks.recv() => {
                match session.tick() {
                    TickState::Running { remaining_seconds } => {
                        if remaining_seconds % 60 == 0 || remaining_seconds <= 10 {
                            println!("  {} left", session.countdown().display());
                        }
                    }
                    TickState::Expired => {
                        println!("Time is up. Submitting your answers...");
                        if let Some(pending) =
                            exams.prepare_submission(&mut session, SubmitTrigger::Expiry)
                        {
                            spawn_send(pending, &done_tx);
                        }
                    }
                    TickState::Idle => {}
                }
            }
            Some((trigger, outcome)) = done_rx.recv() => {
                match exams.finish_submission(&mut session, trigger, outcome) {
                    Ok(SubmitOutcome::Submitted { result_id }) => break Exit::Submitted(result_id),
                    Ok(SubmitOutcome::Skipped) => {}
                    Err(err) if trigger == SubmitTrigger::Expiry => {
                        println!("Could not submit your answers: {err}");
                        break Exit::Abandoned;
                    }
                    Err(err) if input_closed => {
                        println!("Submission failed: {err}");
                        break Exit::Abandoned;
                    }
                    Err(err) => {
                        println!("Submission failed: {err}. Your answers are kept, try again with `s`.");
                    }
                }
            }
            line = lines.next_line(), if !input_closed => {
                let input = match line? {
                    Some(line) => Input::parse(&line),
                    None => {
                        input_closed = true;
                        Input::Quit
                    }
                };
                match input {
                    Input::Next => {
                        session.navigate(Direction::Next);
                        render(&ExamView::from_session(&session));
                    }
                    Input::Previous => {
                        session.navigate(Direction::Previous);
                        render(&ExamView::from_session(&session));
                    }
                    Input::Choose(option_index) => choose(&mut session, option_index),
                    Input::Submit => {
                        let view = ExamView::from_session(&session);
                        if view.submitting {
                            println!("Already submitting...");
                        } else if !view.can_submit {
                            println!(
                                "Answer every question before submitting ({}/{} answered).",
                                view.answered, view.total
                            );
                        } else if let Some(pending) =
                            exams.prepare_submission(&mut session, SubmitTrigger::Manual)
                        {
                            println!("Submitting...");
                            spawn_send(pending, &done_tx);
                        }
                    }
                    Input::Quit if session.is_submitting() => {
                        println!("Waiting for the submission in flight...");
                    }
                    Input::Quit => break Exit::Quit,
                    Input::Unknown => print_help(),
                }
            }
            else => break Exit::Quit,
        }
    };
    timer.stop();

    match exit {
        Exit::Submitted(result_id) => {
            println!("Submitted. Result id: {result_id}");
            match results.fetch(session.test_id(), &result_id).await {
                Ok(result) => print_result(&result)?,
                Err(err) => {
                    warn!(%result_id, error = %err, "could not load result");
                    println!(
                        "Could not load the result now. Try: app result --test-id {} --result-id {result_id}",
                        session.test_id()
                    );
                }
            }
        }
        Exit::Abandoned => println!("The attempt was not recorded."),
        Exit::Quit => {
            info!(test_id = %session.test_id(), answered = session.answered_count(), "attempt left without submitting");
            println!("Left the exam without submitting.");
        }
    }
    Ok(())
}

fn choose(session: &mut ExamSession, option_index: usize) {
    let Some(question_id) = session.current_question().map(|q| q.id().clone()) else {
        return;
    };
    match session.select_answer(&question_id, option_index) {
        Ok(true) => render(&ExamView::from_session(session)),
        Ok(false) => println!("Answers are closed for this attempt."),
        Err(err) => println!("{err}"),
    }
}

fn print_help() {
    println!("Commands: n next, p previous, 1-9 choose option, s submit, q quit");
}

fn render(view: &ExamView) {
    println!();
    println!(
        "Question {}/{}   time {}   answered {}/{} ({}%)",
        view.index + 1,
        view.total,
        view.remaining_display,
        view.answered,
        view.total,
        view.progress_percent
    );
    let Some(question) = &view.question else {
        return;
    };
    println!("{}", question.prompt);
    for (index, option) in question.options.iter().enumerate() {
        let marker = if question.selected == Some(index) { '*' } else { ' ' };
        println!(" {marker} {}. {option}", index + 1);
    }
    if let Some(explanation) = &question.explanation {
        println!("  Explanation: {explanation}");
    }
    if view.all_answered {
        println!("All questions answered. Live score {}/{}. Press `s` to submit.", view.live_score, view.total);
    }
}

pub(crate) fn print_result(result: &ExamResult) -> io::Result<()> {
    let stdout = io::stdout();
    write_result(&mut stdout.lock(), result)
}

/// Score is a server-side percent; the correct count comes from the items.
fn write_result(out: &mut impl Write, result: &ExamResult) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Score: {}%", result.score)?;
    writeln!(out, "{}/{} correct", result.correct_count(), result.total)?;
    for subject in result.by_subject() {
        writeln!(out, "  {:<20} {}/{}", subject.subject, subject.correct, subject.total)?;
    }
    for (number, item) in result.items.iter().enumerate() {
        let mark = if item.correct { "correct" } else { "wrong" };
        writeln!(out)?;
        writeln!(out, "{}. {} [{mark}]", number + 1, item.prompt)?;
        for (index, option) in item.options.iter().enumerate() {
            let index = i64::try_from(index).unwrap_or(i64::MAX);
            let tag = match (index == item.user_index, index == item.correct_index) {
                (true, true) => " (your answer, correct)",
                (true, false) => " (your answer)",
                (false, true) => " (correct)",
                (false, false) => "",
            };
            writeln!(out, "   - {option}{tag}")?;
        }
        if let Some(explanation) = &item.explanation {
            writeln!(out, "   {explanation}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prep_core::model::{QuestionId, ResultItem};

    #[test]
    fn parses_commands() {
        assert_eq!(Input::parse("n"), Input::Next);
        assert_eq!(Input::parse(" prev "), Input::Previous);
        assert_eq!(Input::parse("3"), Input::Choose(2));
        assert_eq!(Input::parse("s"), Input::Submit);
        assert_eq!(Input::parse("q"), Input::Quit);
    }

    fn item(id: &str, subject: &str, correct: bool) -> ResultItem {
        ResultItem {
            question_id: QuestionId::new(id),
            prompt: format!("prompt {id}"),
            options: vec!["a".to_owned(), "b".to_owned()],
            user_index: if correct { 1 } else { 0 },
            correct_index: 1,
            correct,
            explanation: None,
            subject: Some(subject.to_owned()),
            topics: Vec::new(),
        }
    }

    fn rendered(result: &ExamResult) -> String {
        let mut out = Vec::new();
        write_result(&mut out, result).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn result_shows_percent_score_and_correct_count() {
        let result = ExamResult::new(
            67,
            None,
            vec![
                item("q1", "Mathematics", true),
                item("q2", "Mathematics", false),
                item("q3", "English", true),
            ],
        );
        let text = rendered(&result);
        assert!(text.contains("Score: 67%\n"));
        assert!(text.contains("2/3 correct\n"));
        assert!(text.contains("Mathematics          1/2"));
        assert!(text.contains("   - b (your answer, correct)"));
    }

    #[test]
    fn result_score_is_not_divided_by_total() {
        let text = rendered(&ExamResult::new(85, Some(40), vec![]));
        assert!(text.contains("Score: 85%\n"));
        assert!(text.contains("0/40 correct\n"));
    }

    #[test]
    fn rejects_out_of_range_choices() {
        assert_eq!(Input::parse("0"), Input::Unknown);
        assert_eq!(Input::parse("10"), Input::Unknown);
        assert_eq!(Input::parse("maybe"), Input::Unknown);
    }
}
