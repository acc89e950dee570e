use anyhow::{Context, Result};
use flume::Receiver;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::chat;
use super::scenarios;
use negotium_core::session::{
    AnalysisStatus, EndReason, SessionClock, SessionController, SessionEvent, SessionPhase,
};
use negotium_core::{AnalysisClient, ApiClient, ClientConfig, SessionError};

const HELP: &str = "\
Commands:
  scenarios           list rehearsal scenarios
  start <n>           start scenario number n
  <text>              say something to the counterpart
  /retry              resend your last unanswered message
  /status             show metrics, clock and coach tip
  /end                end the session and fetch its analysis
  /analysis [id]      refetch this session's analysis, or open a past one
  /history            list recent sessions stored by the backend
  /saveconfig         write the current settings to negotium_config.toml
  /help               show this help
  /quit               leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Scenarios,
    Start(usize),
    Say(String),
    Retry,
    Status,
    End,
    Analysis(Option<String>),
    History,
    SaveConfig,
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (trimmed, ""),
    };

    match head {
        "scenarios" | "/scenarios" => Command::Scenarios,
        "start" | "/start" => match rest.parse::<usize>() {
            Ok(number) => Command::Start(number),
            Err(_) => Command::Unknown(trimmed.to_string()),
        },
        "/retry" => Command::Retry,
        "/status" => Command::Status,
        "/end" => Command::End,
        "/analysis" if rest.is_empty() => Command::Analysis(None),
        "/analysis" => Command::Analysis(Some(rest.to_string())),
        "/history" => Command::History,
        "/saveconfig" => Command::SaveConfig,
        "/help" | "help" => Command::Help,
        "/quit" | "/exit" | "quit" => Command::Quit,
        other if other.starts_with('/') => Command::Unknown(trimmed.to_string()),
        _ => Command::Say(line.to_string()),
    }
}

struct ActiveSession {
    controller: Arc<SessionController>,
    clock: SessionClock,
    events: Receiver<SessionEvent>,
    countdown: JoinHandle<()>,
}

pub struct ConsoleApp {
    config: ClientConfig,
    api_client: Arc<ApiClient>,
    runtime: tokio::runtime::Runtime,
    session: Option<ActiveSession>,
}

impl ConsoleApp {
    pub fn new(config: ClientConfig, api_client: ApiClient) -> Result<Self> {
        let runtime = tokio::runtime::Runtime::new().context("failed to start console runtime")?;
        Ok(Self {
            config,
            api_client: Arc::new(api_client),
            runtime,
            session: None,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        println!("Negotium: rehearse your next negotiation.");
        println!("{}", chat::render_scenarios());
        println!("{}", HELP);

        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        loop {
            self.prompt()?;
            let Some(line) = lines.next() else {
                break;
            };
            let line = line.context("failed to read from stdin")?;

            self.drain_events();
            match parse_command(&line) {
                Command::Quit => break,
                command => self.handle(command),
            }
            self.drain_events();
        }

        if let Some(session) = self.session.take() {
            session.countdown.abort();
        }
        Ok(())
    }

    fn prompt(&self) -> Result<()> {
        match &self.session {
            Some(session) => print!("[{}] > ", session.clock.display()),
            None => print!("> "),
        }
        io::stdout().flush().context("failed to flush stdout")
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Scenarios => println!("{}", chat::render_scenarios()),
            Command::Start(number) => self.start_session(number),
            Command::Say(text) => self.say(&text),
            Command::Retry => self.retry(),
            Command::Status => self.show_status(),
            Command::End => self.finish_session(EndReason::User),
            Command::Analysis(id) => self.show_analysis(id),
            Command::History => self.show_history(),
            Command::SaveConfig => self.save_config(),
            Command::Help => println!("{}", HELP),
            Command::Quit => {}
            Command::Unknown(raw) => println!("Unknown command '{}'. Type /help.", raw),
        }
    }

    fn start_session(&mut self, number: usize) {
        let Some(scenario) = scenarios::by_number(number) else {
            println!("No scenario {}. Type 'scenarios' to list them.", number);
            return;
        };
        if let Some(previous) = self.session.take() {
            previous.countdown.abort();
        }

        let (event_tx, events) = flume::unbounded();
        let controller = Arc::new(SessionController::new(
            scenario.title,
            &self.config.opening_message,
            self.api_client.clone(),
            self.api_client.clone(),
            event_tx,
        ));
        let clock = SessionClock::start(self.config.session_duration());
        let countdown = {
            let _guard = self.runtime.enter();
            controller.spawn_countdown(clock, self.config.enforce_time_limit)
        };

        tracing::info!("Started session '{}'", scenario.title);
        println!("{}", chat::render_session_header(scenario, &clock));
        let snapshot = self.runtime.block_on(controller.snapshot());
        for message in &snapshot.messages {
            println!("{}", chat::render_message(message));
        }

        self.session = Some(ActiveSession {
            controller,
            clock,
            events,
            countdown,
        });
    }

    fn say(&self, text: &str) {
        let Some(session) = &self.session else {
            println!("Start a scenario first (e.g. 'start 1').");
            return;
        };

        match self.runtime.block_on(session.controller.submit(text)) {
            Ok(_) => {}
            Err(SessionError::Validation(_)) => {}
            Err(error) => report_turn_error(&error),
        }
    }

    fn retry(&self) {
        let Some(session) = &self.session else {
            println!("No active session.");
            return;
        };
        if let Err(error) = self.runtime.block_on(session.controller.retry_last_turn()) {
            report_turn_error(&error);
        }
    }

    fn show_status(&self) {
        let Some(session) = &self.session else {
            println!("No active session.");
            return;
        };
        let snapshot = self.runtime.block_on(session.controller.snapshot());
        println!(
            "{} | {} | {:?}",
            session.controller.scenario(),
            chat::render_metrics(&snapshot.metrics),
            snapshot.phase
        );
        println!("{}", chat::render_clock(&session.clock));
        if let Some(tip) = snapshot.coach_tip.as_deref() {
            println!("{}", chat::render_coach_tip(tip, snapshot.mood.as_deref()));
        }
    }

    fn finish_session(&mut self, reason: EndReason) {
        let Some(session) = &self.session else {
            println!("No active session.");
            return;
        };

        if let Err(error) = self.runtime.block_on(session.controller.end(reason)) {
            tracing::debug!("end() on closed session: {}", error);
        }
        session.countdown.abort();
        println!("Session over. Fetching analysis...");
        let status = self.runtime.block_on(session.controller.finish());
        println!("{}", chat::render_analysis_status(&status));
    }

    fn show_analysis(&self, id: Option<String>) {
        match id {
            Some(id) => {
                let status = match self.runtime.block_on(self.api_client.fetch_analysis(&id)) {
                    Ok(report) => AnalysisStatus::Ready(report),
                    Err(error) => AnalysisStatus::Failed(error),
                };
                println!("{}", chat::render_analysis_status(&status));
            }
            None => {
                let Some(session) = &self.session else {
                    println!("No active session. Use /analysis <session id> for a past one.");
                    return;
                };
                match self.runtime.block_on(session.controller.fetch_analysis()) {
                    Ok(report) => println!("{}", chat::render_analysis(&report)),
                    Err(SessionError::Network(error)) => {
                        println!("{}", chat::render_analysis_status(&AnalysisStatus::Failed(error)))
                    }
                    Err(error) => println!("{}", error),
                }
            }
        }
    }

    fn show_history(&self) {
        match self
            .runtime
            .block_on(self.api_client.list_sessions(self.config.session_list_limit))
        {
            Ok(listing) => println!("{}", chat::render_history(&listing)),
            Err(error) => println!("Could not load history: {}", error),
        }
    }

    fn save_config(&self) {
        match self.config.save() {
            Ok(()) => println!("Settings saved to {:?}", ClientConfig::config_path()),
            Err(error) => println!("Could not save settings: {:#}", error),
        }
    }

    /// Print whatever the session reported since the last command.
    fn drain_events(&mut self) {
        let mut time_expired = false;
        if let Some(session) = &self.session {
            for event in session.events.try_iter() {
                match event {
                    SessionEvent::TurnCompleted {
                        reply,
                        metrics,
                        coach_tip,
                        mood,
                    } => {
                        println!("{}", chat::render_message(&reply));
                        println!("{}", chat::render_metrics(&metrics));
                        println!("{}", chat::render_coach_tip(&coach_tip, Some(mood.as_str())));
                    }
                    SessionEvent::TimeExpired => time_expired = true,
                    SessionEvent::Ended(EndReason::TimeExpired) => {
                        println!("Time limit enforced; the session is closed.");
                    }
                    SessionEvent::PhaseChanged(SessionPhase::AwaitingResponse) => {
                        println!("(waiting for the counterpart...)");
                    }
                    SessionEvent::PhaseChanged(_)
                    | SessionEvent::TurnFailed(_)
                    | SessionEvent::Ended(EndReason::User)
                    | SessionEvent::AnalysisUpdated(_) => {}
                }
            }
        }

        if time_expired {
            println!("⏰ Time's up!");
            self.finish_session(EndReason::TimeExpired);
        }
    }
}

fn report_turn_error(error: &SessionError) {
    match error {
        SessionError::Network(network) if network.is_retryable() => {
            println!("Could not reach the counterpart ({}). Type /retry to resend.", network)
        }
        SessionError::Network(network) => println!("The backend rejected the turn: {}", network),
        other => println!("{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_speech() {
        assert_eq!(
            parse_command("I'd like 20% more"),
            Command::Say("I'd like 20% more".to_string())
        );
    }

    #[test]
    fn parses_start_with_number() {
        assert_eq!(parse_command("start 3"), Command::Start(3));
        assert_eq!(parse_command("/start  2 "), Command::Start(2));
        assert!(matches!(parse_command("start three"), Command::Unknown(_)));
    }

    #[test]
    fn analysis_takes_optional_id() {
        assert_eq!(parse_command("/analysis"), Command::Analysis(None));
        assert_eq!(
            parse_command("/analysis 65f0c0ffee"),
            Command::Analysis(Some("65f0c0ffee".to_string()))
        );
    }

    #[test]
    fn unknown_slash_commands_are_not_sent() {
        assert_eq!(
            parse_command("/walkaway"),
            Command::Unknown("/walkaway".to_string())
        );
        assert_eq!(parse_command("/quit"), Command::Quit);
    }

    #[test]
    fn save_config_is_a_command() {
        assert_eq!(parse_command("/saveconfig"), Command::SaveConfig);
    }
}
