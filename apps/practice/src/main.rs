use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use practice::auth::TokenStore;
use practice::capture::ClipDevice;
use practice::catalog::{resolve_topic, Catalog, DEFAULT_APTITUDE_TOPIC};
use practice::client::{PlaceholderEvaluator, PracticeClient, SpeechEvaluator};
use practice::config::{Config, EvaluatorChoice};
use practice::forms::{Credentials, IntroLength, ResumeUpload, SelfIntroRequest, Tone};
use practice::models::{ItemResult, Prompt, ScoreRecord, SpeechEvaluation};
use practice::session::{
    Backend, Outcome, Phase, PromptSelector, ResponseValue, Session, SessionConfig, SessionEvent,
    SessionHandle, SessionRunner, SessionUpdate,
};

const DEFAULT_CLIP_PATH: &str = "answer.webm";

type StdinLines = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting practice drill v{}", env!("CARGO_PKG_VERSION"));

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut tokens = TokenStore::load(&config.token_path)?;
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    let client = PracticeClient::new(config.api_url.clone(), config.request_timeout())?
        .with_answer_policy(config.answer_policy());

    match args.first().map(String::as_str) {
        Some("logout") => {
            tokens.clear()?;
            println!("Logged out.");
            return Ok(());
        }
        Some("login") => {
            login(&client, &mut tokens, &mut stdin).await?;
            return Ok(());
        }
        Some("signup") => {
            signup(&client, &mut tokens, &mut stdin).await?;
            return Ok(());
        }
        _ => {}
    }

    if !tokens.is_authenticated() {
        println!("Please log in to continue.");
        login(&client, &mut tokens, &mut stdin).await?;
    }

    let client = client.with_token(tokens.token().map(str::to_string));

    match args.first().map(String::as_str) {
        Some("speak") => {
            let clip = args.get(1).map(String::as_str).unwrap_or(DEFAULT_CLIP_PATH);
            return speak(&config, client, clip, stdin).await;
        }
        Some("intro") => return self_intro(&client, &mut stdin).await,
        Some("resume") => {
            let Some(path) = args.get(1) else {
                bail!("Usage: practice resume <file>");
            };
            return analyze_resume(&client, path, &mut stdin).await;
        }
        _ => {}
    }

    let custom = (!args.is_empty()).then(|| args.join(" "));
    let topic = resolve_topic(DEFAULT_APTITUDE_TOPIC, custom.as_deref())?;

    let backend = Backend::Quiz {
        questions: Arc::new(client),
        count: config.question_count,
    };
    let (handle, mut updates, task) =
        SessionRunner::spawn(Session::new(SessionConfig::quiz()), backend, config.tick_period())?;

    handle.start(Some(topic)).await?;
    let outcome = drive_quiz(&handle, &mut updates, &mut stdin).await;

    handle.shutdown().await.ok();
    task.await.context("session runner panicked")?;
    outcome
}

/// Spoken drill: think, then talk while `clip` is being recorded by an
/// external recorder, then wait for the evaluation.
async fn speak(config: &Config, client: PracticeClient, clip: &str, mut stdin: StdinLines) -> Result<()> {
    let evaluator: Arc<dyn SpeechEvaluator> = match config.speech_evaluator {
        EvaluatorChoice::Placeholder => Arc::new(PlaceholderEvaluator::new()),
        EvaluatorChoice::Remote => Arc::new(client),
    };
    let backend = Backend::Speech {
        selector: PromptSelector::new(Catalog::speaking_topics()),
        evaluator,
    };
    let session = Session::new(config.speech_session()).with_capture_device(Box::new(ClipDevice::new(clip)));
    let (handle, mut updates, task) = SessionRunner::spawn(session, backend, config.tick_period())?;

    // Typed commands while the countdowns run: `n` for a new topic, `q` to quit.
    let commands = handle.clone();
    let input = tokio::spawn(async move {
        while let Ok(Some(line)) = stdin.next_line().await {
            let sent = match line.trim() {
                "n" => commands.reroll().await,
                "q" => commands.cancel().await,
                _ => Ok(()),
            };
            if sent.is_err() {
                break;
            }
        }
    });

    handle.start(None).await?;
    println!("Type n + Enter for a new topic, q + Enter to stop.");
    let outcome = drive_speech(clip, &mut updates).await;

    input.abort();
    handle.shutdown().await.ok();
    task.await.context("session runner panicked")?;
    outcome
}

async fn drive_speech(clip: &str, updates: &mut UnboundedReceiver<SessionUpdate>) -> Result<()> {
    while let Some(update) = updates.recv().await {
        match update {
            SessionUpdate::Event(SessionEvent::PromptChanged { prompt, rerolls_left }) => {
                println!("Topic: {} ({rerolls_left} topic changes left)", prompt.text);
            }
            SessionUpdate::Event(SessionEvent::PhaseChanged { to, .. }) => match to {
                Phase::Preparing => println!("Think about your answer..."),
                Phase::Responding => println!("Speak now. Recording into {clip}"),
                Phase::Scoring => println!("Evaluating your answer..."),
                Phase::Idle => {
                    // A failure is reported right after the session settles in idle.
                    if let Ok(SessionUpdate::Failed(report)) = updates.try_recv() {
                        bail!("{}", report.message);
                    }
                    println!("Session stopped.");
                    return Ok(());
                }
                Phase::Complete | Phase::Aborted => {}
            },
            SessionUpdate::Event(SessionEvent::Countdown { remaining, .. }) => {
                if remaining > 0 && (remaining <= 3 || remaining % 5 == 0) {
                    println!("  {remaining}s");
                }
            }
            SessionUpdate::Event(SessionEvent::Completed(Outcome::Evaluation(evaluation))) => {
                print_evaluation(&evaluation);
                return Ok(());
            }
            SessionUpdate::Event(_) | SessionUpdate::Loading { .. } | SessionUpdate::Prompts(_) => {}
            SessionUpdate::Rejected { command, report } => {
                warn!(command, code = report.code, "Command rejected");
                println!("{}", report.message);
            }
            SessionUpdate::Failed(report) => bail!("{}", report.message),
        }
    }
    bail!("Session ended without a result")
}

fn print_evaluation(evaluation: &SpeechEvaluation) {
    println!();
    println!("Score: {}/100 - {}", evaluation.score, evaluation.verdict);
    for (label, value) in [
        ("Fluency", evaluation.fluency_score),
        ("Vocabulary", evaluation.vocabulary_score),
        ("Coherence", evaluation.coherence_score),
    ] {
        if let Some(value) = value {
            println!("  {label}: {value}");
        }
    }
    println!("Strengths:");
    for item in &evaluation.strengths {
        println!("  + {item}");
    }
    println!("To improve:");
    for item in &evaluation.improvements {
        println!("  - {item}");
    }
    if !evaluation.interviewer_feedback.is_empty() {
        println!("Feedback: {}", evaluation.interviewer_feedback);
    }
}

async fn login(client: &PracticeClient, tokens: &mut TokenStore, stdin: &mut StdinLines) -> Result<()> {
    let email = ask(stdin, "Email: ").await?;
    let password = ask(stdin, "Password: ").await?;
    let credentials = Credentials::new(&email, &password).map_err(|e| anyhow::anyhow!(e.user_message()))?;

    let response = client.login(&credentials).await.context("Login failed")?;
    tokens.store(&response.access_token)?;
    println!("Logged in as {}.", credentials.email);
    Ok(())
}

async fn signup(client: &PracticeClient, tokens: &mut TokenStore, stdin: &mut StdinLines) -> Result<()> {
    let name = ask(stdin, "Name (optional): ").await?;
    let email = ask(stdin, "Email: ").await?;
    let password = ask(stdin, "Password: ").await?;
    let credentials = Credentials::new(&email, &password).map_err(|e| anyhow::anyhow!(e.user_message()))?;

    let name = Some(name.trim()).filter(|n| !n.is_empty());
    let response = client
        .signup(&credentials, name)
        .await
        .context("Sign up failed")?;
    tokens.store(&response.access_token)?;
    println!("Account created for {}.", credentials.email);
    Ok(())
}

async fn self_intro(client: &PracticeClient, stdin: &mut StdinLines) -> Result<()> {
    let name = ask(stdin, "Your name: ").await?;
    let role = ask(stdin, "Target role (blank for Data Analyst): ").await?;
    let length = match ask(stdin, "Length 15s/30s/60s (blank for 15s): ").await?.trim() {
        "" => IntroLength::default(),
        value => IntroLength::parse(value)?,
    };
    let tone = match ask(stdin, "Tone Formal/Neutral/Confident/Friendly (blank for Formal): ")
        .await?
        .trim()
    {
        "" => Tone::default(),
        value => Tone::parse(value)?,
    };

    let request = SelfIntroRequest::new(&name, &role, length, tone)?;
    let intro = client
        .generate_self_intro(&request)
        .await
        .context("Could not generate an introduction")?;
    println!();
    println!("{intro}");
    Ok(())
}

async fn analyze_resume(client: &PracticeClient, path: &str, stdin: &mut StdinLines) -> Result<()> {
    let contents = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {path}"))?;
    let file_name = std::path::Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path);
    let job_description = ask(stdin, "Paste the job description: ").await?;

    let upload = ResumeUpload::new(file_name, contents.into(), &job_description)?;
    let analysis = client
        .analyze_resume(&upload)
        .await
        .context("Resume analysis failed")?;
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}

async fn drive_quiz(
    handle: &SessionHandle,
    updates: &mut UnboundedReceiver<SessionUpdate>,
    stdin: &mut StdinLines,
) -> Result<()> {
    let mut prompts: Vec<Prompt> = Vec::new();

    while let Some(update) = updates.recv().await {
        match update {
            SessionUpdate::Loading { topic } => println!("Loading questions on {topic}..."),
            SessionUpdate::Prompts(loaded) => {
                prompts = loaded;
                for (slot, prompt) in prompts.iter().enumerate() {
                    let Some(choice) = ask_choice(stdin, slot, prompt).await? else {
                        handle.cancel().await?;
                        bail!("Input closed before the quiz was finished");
                    };
                    handle.record(slot, ResponseValue::Choice(choice)).await?;
                }
                handle.submit().await?;
            }
            SessionUpdate::Event(SessionEvent::Completed(Outcome::Score(record))) => {
                print_score(&prompts, &record);
                return Ok(());
            }
            SessionUpdate::Event(_) => {}
            SessionUpdate::Rejected { command, report } => {
                warn!(command, code = report.code, "Command rejected");
                println!("{}", report.message);
            }
            SessionUpdate::Failed(report) => bail!("{}", report.message),
        }
    }
    bail!("Session ended without a result")
}

/// Asks until a listed letter is entered. `None` on end of input.
async fn ask_choice(stdin: &mut StdinLines, slot: usize, prompt: &Prompt) -> Result<Option<String>> {
    println!();
    println!("Q{}. {}", slot + 1, prompt.text);
    for (index, option) in prompt.options.iter().enumerate() {
        println!("   {}) {}", Prompt::option_label(index), option);
    }

    loop {
        let Some(line) = read_line(stdin, "Your answer: ").await? else {
            return Ok(None);
        };
        let picked = line
            .trim()
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .and_then(|c| (0..prompt.options.len()).find(|&i| Prompt::option_label(i) == c));
        match picked {
            Some(index) => return Ok(Some(prompt.options[index].clone())),
            None => println!("Please pick one of the listed letters."),
        }
    }
}

fn print_score(prompts: &[Prompt], record: &ScoreRecord) {
    println!();
    for (slot, (prompt, item)) in prompts.iter().zip(&record.items).enumerate() {
        let mark = match item {
            ItemResult::Correct => "correct",
            ItemResult::Incorrect => "incorrect",
            ItemResult::Unscored => "not scored",
        };
        match (item, prompt.correct_option()) {
            (ItemResult::Incorrect, Some(answer)) => {
                println!("Q{}: {mark} (answer: {answer})", slot + 1)
            }
            _ => println!("Q{}: {mark}", slot + 1),
        }
    }
    println!(
        "Score: {}/{} ({}%) - {:?}",
        record.correct, record.total, record.percentage, record.tier
    );
}

async fn ask(stdin: &mut StdinLines, label: &str) -> Result<String> {
    read_line(stdin, label)
        .await?
        .context("Input closed before a value was entered")
}

async fn read_line(stdin: &mut StdinLines, label: &str) -> Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;
    Ok(stdin.next_line().await?)
}
