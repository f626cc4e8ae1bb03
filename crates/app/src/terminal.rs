//! Line-oriented terminal front-end for taking an exam and listing attempts.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

use exam_core::model::{ExamError, ExamSession, FinishReason, option_label};
use exam_core::time::{format_countdown, format_time_spent};
use services::{ExamController, ExamLoopService, HistoryOverview, ResultNotice, TimerHandle};

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Select(usize),
    Next,
    Prev,
    GoTo(usize),
    Finish,
    Status,
    Map,
    Help,
    Quit,
    Invalid(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Input::Status;
    };

    match head.to_ascii_lowercase().as_str() {
        "n" | "next" => Input::Next,
        "p" | "prev" => Input::Prev,
        "f" | "finish" => Input::Finish,
        "s" | "status" => Input::Status,
        "m" | "map" => Input::Map,
        "h" | "help" | "?" => Input::Help,
        "q" | "quit" => Input::Quit,
        "g" | "go" => match parts.next().map(str::parse::<i64>) {
            Some(Ok(n)) if n >= 1 => usize::try_from(n - 1)
                .map_or_else(|_| Input::Invalid(line.to_string()), Input::GoTo),
            _ => Input::Invalid(line.to_string()),
        },
        other => parse_option(other).map_or_else(|| Input::Invalid(line.to_string()), Input::Select),
    }
}

/// `a`..`z` or a 1-based number.
fn parse_option(raw: &str) -> Option<usize> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_lowercase() => Some(usize::from(c as u8 - b'a')),
        _ => raw.parse::<usize>().ok().filter(|n| *n >= 1).map(|n| n - 1),
    }
}

fn print_help() {
    println!("  a-d / 1-4   choose an option");
    println!("  n, p        next / previous question");
    println!("  g <n>       go to question n");
    println!("  s           show the current question again");
    println!("  m           map of answered (*) and current ([ ]) questions");
    println!("  f           finish (every question must be answered)");
    println!("  q           quit without recording");
}

fn render(exam: &ExamController) {
    let session = exam.session();
    let progress = exam.progress();
    let question = exam.current_question();
    let selected = session.selected_option(question.id());

    println!();
    println!(
        "[{}] Question {}/{} | answered {}/{}",
        format_countdown(progress.remaining_secs),
        progress.current_index + 1,
        progress.total,
        progress.answered,
        progress.total
    );
    println!("{}", question.prompt());
    for (index, option) in question.options().iter().enumerate() {
        let marker = if selected == Some(index) { '*' } else { ' ' };
        println!(" {marker} {}) {option}", option_label(index));
    }
}

/// Question numbers ten per row, answered ones starred and the current one
/// bracketed, followed by the unanswered numbers.
fn question_map(session: &ExamSession) -> String {
    let current = session.current_index();
    let mut lines = Vec::new();
    let mut row = String::new();
    let mut unanswered = Vec::new();

    for (index, question) in session.questions().iter().enumerate() {
        let answered = session.answers().contains(question.id());
        if !answered {
            unanswered.push((index + 1).to_string());
        }
        let (open, close) = if index == current { ('[', ']') } else { (' ', ' ') };
        let mark = if answered { '*' } else { ' ' };
        row.push_str(&format!("{open}{:>2}{mark}{close}", index + 1));
        if (index + 1) % 10 == 0 {
            lines.push(row.trim_end().to_string());
            row.clear();
        }
    }
    if !row.is_empty() {
        lines.push(row.trim_end().to_string());
    }

    if unanswered.is_empty() {
        lines.push("all questions answered".to_string());
    } else {
        lines.push(format!("unanswered: {}", unanswered.join(", ")));
    }
    lines.join("\n")
}

fn print_notice(notice: &ResultNotice) {
    let (title, detail) = notice.headline();
    println!();
    println!("{title} {detail}");
    if notice.reason == FinishReason::TimedOut {
        println!("Time is up.");
    }
}

/// Apply one command. Returns `false` when the user quits.
fn apply(exam: &mut ExamController, input: Input) -> bool {
    let outcome = match input {
        Input::Select(option) => exam.select_current(option).and_then(|()| {
            if exam.session().current_index() + 1 < exam.session().total_questions() {
                exam.advance().map(|_| ())
            } else {
                Ok(())
            }
        }),
        Input::Next => exam.advance().map(|_| ()),
        Input::Prev => exam.retreat().map(|_| ()),
        Input::GoTo(index) => exam.go_to_question(index),
        Input::Finish => match exam.finish() {
            Ok(_) => return true,
            Err(err) => Err(err),
        },
        Input::Status => Ok(()),
        Input::Map => {
            println!("{}", question_map(exam.session()));
            return true;
        }
        Input::Help => {
            print_help();
            return true;
        }
        Input::Quit => return false,
        Input::Invalid(raw) => {
            println!("unrecognised input: {raw} (h for help)");
            return true;
        }
    };

    match outcome {
        Ok(()) => render(exam),
        Err(ExamError::Incomplete { answered, total }) => {
            println!("{answered} of {total} answered; answer every question before finishing");
            println!("{}", question_map(exam.session()));
        }
        Err(err) => println!("{err}"),
    }
    true
}

/// Run one exam on stdin/stdout and record it once it finishes.
///
/// # Errors
///
/// Returns an error if the exam cannot start, stdin fails, or the attempt
/// cannot be stored.
pub async fn take_exam(
    service: &ExamLoopService,
    mut notices: UnboundedReceiver<ResultNotice>,
) -> Result<(), Box<dyn std::error::Error>> {
    let exam = service.start_exam().await?.into_shared();
    let mut timer = TimerHandle::spawn(Arc::clone(&exam));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!(
        "{} questions, {} to finish. h for help.",
        service.config().question_count,
        format_countdown(service.config().time_limit_secs)
    );
    render(&*exam.lock().await);

    loop {
        tokio::select! {
            Some(notice) = notices.recv() => {
                print_notice(&notice);
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    log::debug!("stdin closed");
                    break;
                };
                let mut guard = exam.lock().await;
                if !apply(&mut guard, parse_input(&line)) {
                    // Under the lock, so no tick can finish the session after quitting.
                    timer.cancel();
                    break;
                }
            }
        }
    }

    timer.cancel();
    let mut guard = exam.lock().await;
    if guard.is_finished() {
        let id = service.record_attempt(&mut guard).await?;
        log::info!("attempt {id} recorded");
        println!(
            "Time spent: {}",
            format_time_spent(guard.session().elapsed_secs())
        );
    } else {
        println!("Exam abandoned; nothing recorded.");
    }
    Ok(())
}

pub fn print_history(overview: &HistoryOverview) {
    let stats = &overview.stats;
    println!("Exam {}: {} attempts", overview.exam_id, stats.total_attempts);
    if let (Some(avg), Some(best), Some(rate)) =
        (stats.average_score, stats.best_score, stats.pass_rate())
    {
        println!(
            "passed {}/{} ({rate:.0}%), average {avg:.1}%, best {best:.1}%",
            stats.passed_attempts, stats.total_attempts
        );
    }
    if let Some(secs) = stats.average_time_spent_secs {
        println!("average time {}", format_time_spent(secs));
    }

    for item in &overview.recent {
        println!(
            "  #{:<4} {}  {:>2}/{:<2} {:>5.1}%  {:<10} {:>8}  {}",
            item.id,
            item.completed_at.format("%Y-%m-%d %H:%M"),
            item.correct_count,
            item.total_questions,
            item.score_percent,
            if item.passed { "passed" } else { "not passed" },
            format_time_spent(item.time_spent_secs),
            item.finish_reason.as_str()
        );
    }
}
