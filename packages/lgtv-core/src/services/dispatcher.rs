//! Text command language.
//!
//! A command line is a verb followed by space-separated words:
//!
//! | verb | effect | returns |
//! |------|--------|---------|
//! | `power on` / `power off` | wake packet / `turnOff` | immediately |
//! | `toast <msg...>` | notification toast | immediately |
//! | `input <id>` | switch input | immediately |
//! | `launch <appId>` | launch app | after the acknowledgement |
//! | `open <url...>` | open URL | after the acknowledgement |
//! | `volumeUp [n]` / `volumeDown [n]` | paced volume steps | after the last step |
//! | `request <uri> [json...]` | arbitrary request | immediately |
//! | `requestw <uri> [json...]` | arbitrary request | with the reply payload |
//!
//! Every verb that talks to the TV except `power off` and `toast` sends a wake
//! packet first, without waiting for it. Unknown verbs are logged and ignored.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::task::TaskTracker;

use super::connection::ConnectionError;
use super::sequencer::RequestSequencer;
use crate::device::services::{input_payload, launch_payload, open_payload, toast_payload};
use crate::device::{SsapService, WakeSender};
use crate::error::{LgtvError, LgtvResult};
use crate::events::{AdapterEvent, EventEmitter};
use crate::utils::{now_millis, parse_repeat_count};

/// A parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    PowerOn,
    PowerOff,
    Toast(String),
    Input(String),
    Launch(String),
    Open(String),
    VolumeUp(usize),
    VolumeDown(usize),
    /// Arbitrary SSAP request. `wait` is set for `requestw`.
    Request {
        service: String,
        payload: Option<Value>,
        wait: bool,
    },
    /// Anything else; carries the verb.
    Unknown(String),
}

impl Command {
    /// Parses one command line.
    ///
    /// Fails with `MalformedPayload` when a request payload is not valid JSON
    /// and with `MissingArgument` when a verb that needs a target has none.
    /// `power` with anything other than `on` means off.
    pub fn parse(line: &str) -> LgtvResult<Self> {
        let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
        let mut words = line.split(' ');
        let verb = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        let command = match verb {
            "power" => {
                if args.first() == Some(&"on") {
                    Self::PowerOn
                } else {
                    Self::PowerOff
                }
            }
            "toast" => Self::Toast(args.join(" ")),
            "input" => Self::Input(first_arg(verb, &args)?),
            "launch" => Self::Launch(first_arg(verb, &args)?),
            "open" => {
                let url = args.join(" ");
                if url.trim().is_empty() {
                    return Err(LgtvError::MissingArgument(format!("{verb} needs a URL")));
                }
                Self::Open(url)
            }
            "volumeUp" => Self::VolumeUp(parse_repeat_count(args.first().copied())),
            "volumeDown" => Self::VolumeDown(parse_repeat_count(args.first().copied())),
            "request" | "requestw" => {
                let service = first_arg(verb, &args)?;
                let rest = args
                    .iter()
                    .skip_while(|word| word.is_empty())
                    .skip(1)
                    .copied()
                    .collect::<Vec<_>>()
                    .join(" ");
                let payload = if rest.trim().is_empty() {
                    None
                } else {
                    Some(
                        serde_json::from_str(&rest)
                            .map_err(|e| LgtvError::MalformedPayload(e.to_string()))?,
                    )
                };
                Self::Request {
                    service,
                    payload,
                    wait: verb == "requestw",
                }
            }
            other => Self::Unknown(other.to_string()),
        };
        Ok(command)
    }
}

fn first_arg(verb: &str, args: &[&str]) -> LgtvResult<String> {
    args.iter()
        .find(|word| !word.is_empty())
        .map(|word| word.to_string())
        .ok_or_else(|| LgtvError::MissingArgument(format!("{verb} needs an argument")))
}

/// What executing a command amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// The command finished, including its device round-trips.
    Completed,
    /// The command was handed off; its device round-trip runs in the background.
    Dispatched,
    /// Reply payload of a `requestw`.
    Reply(Value),
    /// The TV could not be reached for an awaited command.
    Unreachable(ConnectionError),
    /// The verb is unknown; nothing was done.
    Ignored(String),
}

/// Maps commands onto wake packets and sequenced requests.
pub struct CommandDispatcher {
    sequencer: Arc<RequestSequencer>,
    wake: Arc<dyn WakeSender>,
    mac: Option<String>,
    emitter: Arc<dyn EventEmitter>,
    /// Wake packets and detached requests still in flight.
    background: TaskTracker,
}

impl CommandDispatcher {
    pub fn new(
        sequencer: Arc<RequestSequencer>,
        wake: Arc<dyn WakeSender>,
        mac: Option<String>,
        emitter: Arc<dyn EventEmitter>,
    ) -> Self {
        Self {
            sequencer,
            wake,
            mac,
            emitter,
            background: TaskTracker::new(),
        }
    }

    /// Waits until every background wake packet and detached request has
    /// finished. Commands issued meanwhile are tracked as well.
    pub async fn settle(&self) {
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }

    /// Parses and runs one command line.
    ///
    /// Only parse failures are returned as errors. Failures to reach the TV
    /// surface as [`CommandOutcome::Unreachable`] for awaited commands and are
    /// logged for background ones.
    pub async fn execute(&self, line: &str) -> LgtvResult<CommandOutcome> {
        let command = Command::parse(line)?;
        Ok(self.run(command).await)
    }

    /// Runs a parsed command.
    pub async fn run(&self, command: Command) -> CommandOutcome {
        match command {
            Command::PowerOn => {
                self.power_on();
                CommandOutcome::Completed
            }
            Command::PowerOff => self.power_off(),
            Command::Toast(message) => self.toast(&message),
            Command::Input(input_id) => self.set_input(&input_id),
            Command::Launch(app_id) => self.launch(&app_id).await,
            Command::Open(url) => self.open(&url).await,
            Command::VolumeUp(count) => self.volume_up(count).await,
            Command::VolumeDown(count) => self.volume_down(count).await,
            Command::Request {
                service,
                payload,
                wait: false,
            } => self.request(&service, payload),
            Command::Request {
                service,
                payload,
                wait: true,
            } => self.request_wait(&service, payload).await,
            Command::Unknown(verb) => {
                log::info!("[Dispatch] Unknown command: {:?}", verb);
                self.emitter.emit(AdapterEvent::UnknownCommand {
                    verb: verb.clone(),
                    timestamp: now_millis(),
                });
                CommandOutcome::Ignored(verb)
            }
        }
    }

    /// Sends a wake packet in the background. Does nothing without a hardware
    /// address.
    pub fn power_on(&self) {
        let Some(mac) = self.mac.clone() else {
            log::debug!("[Dispatch] No hardware address; skipping wake packet");
            return;
        };

        let wake = Arc::clone(&self.wake);
        let emitter = Arc::clone(&self.emitter);
        self.background.spawn(async move {
            match wake.wake(&mac).await {
                Ok(()) => emitter.emit(AdapterEvent::WakeSent {
                    mac,
                    timestamp: now_millis(),
                }),
                Err(e) => log::warn!("[WoL] Failed to wake {}: {}", mac, e),
            }
        });
    }

    pub fn power_off(&self) -> CommandOutcome {
        self.detach(SsapService::TurnOff.uri(), None)
    }

    pub fn toast(&self, message: &str) -> CommandOutcome {
        self.detach(
            SsapService::CreateToast.uri(),
            Some(toast_payload(message)),
        )
    }

    pub fn set_input(&self, input_id: &str) -> CommandOutcome {
        self.power_on();
        self.detach(
            SsapService::SwitchInput.uri(),
            Some(input_payload(input_id)),
        )
    }

    pub async fn launch(&self, app_id: &str) -> CommandOutcome {
        self.power_on();
        self.awaited(SsapService::LaunchApp.uri(), Some(launch_payload(app_id)))
            .await
    }

    pub async fn open(&self, url: &str) -> CommandOutcome {
        self.power_on();
        self.awaited(SsapService::OpenUrl.uri(), Some(open_payload(url)))
            .await
    }

    pub async fn volume_up(&self, count: usize) -> CommandOutcome {
        self.power_on();
        self.repeat(SsapService::VolumeUp.uri(), count).await
    }

    pub async fn volume_down(&self, count: usize) -> CommandOutcome {
        self.power_on();
        self.repeat(SsapService::VolumeDown.uri(), count).await
    }

    /// Sends an arbitrary request without waiting for the acknowledgement.
    pub fn request(&self, service: &str, payload: Option<Value>) -> CommandOutcome {
        self.power_on();
        self.detach(service, payload)
    }

    /// Sends an arbitrary request and returns the device's reply payload.
    pub async fn request_wait(&self, service: &str, payload: Option<Value>) -> CommandOutcome {
        self.power_on();
        match self.sequencer.send(service, payload).await {
            Ok(reply) => CommandOutcome::Reply(reply),
            Err(e) => unreachable_outcome(service, e),
        }
    }

    async fn awaited(&self, service: &str, payload: Option<Value>) -> CommandOutcome {
        match self.sequencer.send(service, payload).await {
            Ok(_) => CommandOutcome::Completed,
            Err(e) => unreachable_outcome(service, e),
        }
    }

    async fn repeat(&self, service: &str, count: usize) -> CommandOutcome {
        match self.sequencer.repeat(service, count).await {
            Ok(()) => CommandOutcome::Completed,
            Err(e) => unreachable_outcome(service, e),
        }
    }

    fn detach(&self, service: &str, payload: Option<Value>) -> CommandOutcome {
        let sequencer = Arc::clone(&self.sequencer);
        let service = service.to_string();
        self.background.spawn(async move {
            if let Err(e) = sequencer.send(&service, payload).await {
                log::warn!("[Dispatch] {} not delivered: {}", service, e);
            }
        });
        CommandOutcome::Dispatched
    }
}

fn unreachable_outcome(service: &str, err: ConnectionError) -> CommandOutcome {
    log::warn!("[Dispatch] {} not delivered: {}", service, err);
    CommandOutcome::Unreachable(err)
}
