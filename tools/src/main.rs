//! session-runner: headless incident session over stdin/stdout JSON.
//!
//! Usage:
//!   session-runner --seed 12345 --evidence incident.json
//!   session-runner --seed 12345            (built-in demo evidence)
//!
//! One JSON command per line on stdin, one JSON response per line on
//! stdout. Every command counts as one tick of simulated time.

use anyhow::Result;
use haystack_core::{
    rate_limiter::{Admission, RateLimitConfig, RateLimiter},
    session::LogQuery,
    EvidenceCorpus, IncidentSession, SimConfig,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;

const DEMO_EVIDENCE: &str = include_str!("../data/demo_evidence.json");

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    ListChannels,
    GetMessages {
        channel: String,
        #[serde(default)]
        cursor: usize,
        #[serde(default = "default_limit")]
        limit: usize,
    },
    SearchChat {
        query: String,
        #[serde(default = "default_limit")]
        limit: usize,
    },
    PostMessage {
        channel: String,
        text: String,
    },
    ListServices,
    GetLogs {
        service: String,
        #[serde(default)]
        cursor: usize,
        #[serde(default = "default_limit")]
        limit: usize,
        #[serde(default)]
        level: Option<String>,
        #[serde(default)]
        since: Option<chrono::DateTime<chrono::Utc>>,
        #[serde(default)]
        grep: Option<String>,
    },
    SearchLogs {
        query: String,
        #[serde(default = "default_limit")]
        limit: usize,
    },
    QueryMetric {
        query: String,
    },
    ListProjects,
    ListIssues {
        #[serde(default)]
        project: Option<String>,
    },
    GetIssue {
        id: String,
    },
    GetState,
    Quit,
}

fn default_limit() -> usize {
    20
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let evidence_path = args
        .windows(2)
        .find(|w| w[0] == "--evidence")
        .map(|w| w[1].as_str());

    let evidence = match evidence_path {
        Some(path) => EvidenceCorpus::from_json_file(Path::new(path))?,
        None => EvidenceCorpus::from_json_str(DEMO_EVIDENCE)?,
    };

    let session_id = uuid::Uuid::new_v4().to_string();
    log::info!("session {session_id} starting, seed {seed}");

    let config = SimConfig::with_seed(seed);
    let mut session = IncidentSession::new(config, evidence)?;
    let mut limiter = RateLimiter::new(RateLimitConfig::default());

    run_ipc_loop(&mut session, &mut limiter)
}

fn run_ipc_loop(session: &mut IncidentSession, limiter: &mut RateLimiter) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        if let IpcCommand::Quit = cmd {
            break;
        }

        if let Admission::Limited {
            retry_after_seconds,
        } = limiter.admit()
        {
            let limited = serde_json::json!({
                "status": "rate_limited",
                "retry_after_seconds": retry_after_seconds,
            });
            writeln!(stdout, "{}", limited)?;
            stdout.flush()?;
            continue;
        }

        let response = dispatch(session, cmd)?;
        writeln!(stdout, "{}", response)?;
        stdout.flush()?;
    }
    Ok(())
}

fn dispatch(session: &mut IncidentSession, cmd: IpcCommand) -> Result<String> {
    let json = match cmd {
        IpcCommand::ListChannels => serde_json::to_string(&session.list_channels())?,
        IpcCommand::GetMessages {
            channel,
            cursor,
            limit,
        } => serde_json::to_string(&session.get_messages(&channel, cursor, limit))?,
        IpcCommand::SearchChat { query, limit } => {
            serde_json::to_string(&session.search_chat(&query, limit))?
        }
        IpcCommand::PostMessage { channel, text } => {
            serde_json::to_string(&session.post_message(&channel, &text))?
        }
        IpcCommand::ListServices => serde_json::to_string(&session.list_services())?,
        IpcCommand::GetLogs {
            service,
            cursor,
            limit,
            level,
            since,
            grep,
        } => {
            let query = LogQuery { level, since, grep };
            serde_json::to_string(&session.get_logs(&service, cursor, limit, &query))?
        }
        IpcCommand::SearchLogs { query, limit } => {
            serde_json::to_string(&session.search_logs(&query, limit))?
        }
        IpcCommand::QueryMetric { query } => {
            serde_json::to_string(&session.query_metric(&query))?
        }
        IpcCommand::ListProjects => serde_json::to_string(&session.list_projects())?,
        IpcCommand::ListIssues { project } => {
            serde_json::to_string(&session.list_issues(project.as_deref()))?
        }
        IpcCommand::GetIssue { id } => serde_json::to_string(&session.get_issue(&id))?,
        IpcCommand::GetState => serde_json::json!({
            "minutes_elapsed": session.clock().minutes_elapsed(),
            "ticks_elapsed": session.clock().ticks_elapsed(),
            "recovering": session.clock().in_recovery_window(),
            "sim_now": session.sim_now(),
        })
        .to_string(),
        IpcCommand::Quit => unreachable!("handled by the loop"),
    };
    Ok(json)
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
