//! Terminal front end.
//!
//! Thin glue over [`ChatSession`]: it reads lines from stdin, forwards
//! them to the session, and renders whatever the session broadcasts. All
//! log and state mutation stays inside the session; this module only
//! subscribes and reacts.

use crate::backend::{AssistantBackend, BackendError, Course, HttpBackend};
use crate::config::Config;
use crate::session::{ChatMessage, ChatSession, Sender, SessionEvent, SessionState};
use anyhow::{Context, Result};
use console::{style, Term};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP_TEXT: &str = "\
Commands:
  /courses     list your active courses
  /course N    prefill a question about course N
  /clear       clear the chat history
  /quit        shut down the assistant backend and exit
  /exit        leave without shutting the backend down
  /help        show this help";

/// Run the interactive chat loop against the configured backend.
pub async fn run(config: &Config) -> Result<()> {
    let backend: Arc<dyn AssistantBackend> = Arc::new(HttpBackend::new(
        &config.backend_url,
        config.request_timeout(),
    )?);
    run_with_backend(config, backend).await
}

pub async fn run_with_backend(
    config: &Config,
    backend: Arc<dyn AssistantBackend>,
) -> Result<()> {
    let mut session = ChatSession::new(Arc::clone(&backend), config.reply_timeout());

    let timestamps = config.ui.timestamps;
    session.subscribe(move |event| {
        if let SessionEvent::MessageAppended(message) = event {
            print_message(message, timestamps);
        }
    });

    let typing = Arc::new(AtomicBool::new(false));
    if config.ui.typing_indicator {
        let flag = Arc::clone(&typing);
        session.subscribe(move |event| match event {
            SessionEvent::IndicatorShown => flag.store(true, Ordering::Relaxed),
            SessionEvent::IndicatorHidden => {
                flag.store(false, Ordering::Relaxed);
                let _ = Term::stderr().clear_line();
            }
            _ => {}
        });
        spawn_typing_indicator(Arc::clone(&typing));
    }

    println!("{}", style("campusmate — type /help for commands").dim());

    let stdin = tokio::io::stdin();
    let reader = BufReader::new(stdin);
    let mut lines = reader.lines();

    // Course list cache for /course N prefills.
    let mut courses: Vec<Course> = Vec::new();
    let mut prefill: Option<String> = None;

    loop {
        prompt(prefill.as_deref());
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim().to_string();

        if line.is_empty() {
            // An empty line accepts a pending prefill; otherwise it is the
            // usual silent no-op.
            if let Some(text) = prefill.take() {
                session.submit(&text).await;
            }
            continue;
        }
        prefill = None;

        match line.as_str() {
            "/help" => println!("{HELP_TEXT}"),
            "/courses" => match refresh_courses(backend.as_ref(), &mut courses).await {
                Ok(()) => print_courses(&courses),
                Err(error) => print_course_error(&error),
            },
            "/clear" => {
                if confirm("Clear the chat history?").await? {
                    session.clear();
                }
            }
            "/quit" => {
                if confirm("Shut down the assistant backend?").await? {
                    session.request_shutdown().await;
                    if session.state() == SessionState::ShuttingDown {
                        break;
                    }
                }
            }
            "/exit" => break,
            _ => {
                if let Some(number) = line.strip_prefix("/course ") {
                    match number.trim().parse::<usize>() {
                        Ok(n) => {
                            if courses.is_empty() {
                                if let Err(error) =
                                    refresh_courses(backend.as_ref(), &mut courses).await
                                {
                                    print_course_error(&error);
                                    continue;
                                }
                            }
                            match courses.get(n.wrapping_sub(1)) {
                                Some(course) => {
                                    let template =
                                        format!("Tell me about my {} course", course.name);
                                    println!(
                                        "{} {template}",
                                        style("press Enter to send:").dim()
                                    );
                                    prefill = Some(template);
                                }
                                None => println!("No course numbered {number}"),
                            }
                        }
                        Err(_) => println!("Usage: /course N (see /courses)"),
                    }
                } else if line.starts_with('/') {
                    println!("Unknown command {line} — type /help");
                } else {
                    session.submit(&line).await;
                }
            }
        }
    }

    Ok(())
}

async fn refresh_courses(
    backend: &dyn AssistantBackend,
    courses: &mut Vec<Course>,
) -> Result<(), BackendError> {
    *courses = backend.fetch_courses().await?;
    Ok(())
}

fn print_courses(courses: &[Course]) {
    if courses.is_empty() {
        println!("No courses found");
        return;
    }
    for (i, course) in courses.iter().enumerate() {
        println!("{:>3}. {}", i + 1, course.name);
    }
}

fn print_course_error(error: &BackendError) {
    match error {
        BackendError::Application(message) => println!("Error: {message}"),
        BackendError::Transport(_) => {
            tracing::warn!("course list fetch failed: {error}");
            println!("Failed to load courses");
        }
    }
}

fn prompt(prefill: Option<&str>) {
    use std::io::Write;
    match prefill {
        Some(_) => print!("{} ", style("❯ (Enter to send)").dim()),
        None => print!("{} ", style("❯").cyan()),
    }
    let _ = std::io::stdout().flush();
}

fn print_message(message: &ChatMessage, timestamps: bool) {
    let text = nanohtml2text::html2text(&message.rendered_html);
    let label = match message.sender {
        Sender::User => style("you").cyan().bold(),
        Sender::Assistant => style("assistant").green().bold(),
        Sender::System => style("system").yellow(),
    };
    if timestamps {
        println!("{} {label} {text}", style(clock_time(message.created_at)).dim());
    } else {
        println!("{label} {text}");
    }
}

fn clock_time(epoch_secs: u64) -> String {
    chrono::DateTime::from_timestamp(epoch_secs.try_into().unwrap_or(0), 0)
        .map(|dt| dt.with_timezone(&chrono::Local).format("%H:%M").to_string())
        .unwrap_or_default()
}

/// Three animated dots while a reply is pending, on stderr so it never
/// interleaves with logged messages on stdout.
fn spawn_typing_indicator(typing: Arc<AtomicBool>) {
    tokio::spawn(async move {
        let term = Term::stderr();
        let frames = ["·", "··", "···"];
        let mut frame = 0usize;
        loop {
            if typing.load(Ordering::Relaxed) {
                let _ = term.write_str(&format!("\r{}   ", frames[frame % frames.len()]));
                frame += 1;
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    });
}

/// Yes/no confirmation. dialoguer blocks, so it runs on a blocking thread.
async fn confirm(message: &str) -> Result<bool> {
    let message = message.to_string();
    tokio::task::spawn_blocking(move || {
        dialoguer::Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()
    })
    .await
    .context("confirmation prompt task failed")?
    .context("confirmation prompt failed")
}
