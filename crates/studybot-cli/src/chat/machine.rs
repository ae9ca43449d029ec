//! Submission lifecycle as a pure state machine
//!
//! ```text
//!          Submit              StreamOpened            StreamEnded
//!   Idle ─────────▶ Sending ───────────────▶ Streaming ───────────▶ Idle
//!    ▲                │  ▲                       │
//!    │           Busy │  │ RetryElapsed          │ Fail
//!    │                ▼  │                       ▼
//!    │             BusyRetry ──── Fail ────────▶ Failed ── Submit ──▶ Sending
//! ```
//!
//! [`transition`] performs no I/O. It returns the next state plus the list
//! of effects the controller has to carry out, in order.

use std::fmt;
use std::time::Duration;

use super::error::ChatError;

pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(3000);
/// 60 polls at 3 s gives a queue ceiling of about three minutes
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    /// Requests sent per submission, the first one included
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RETRY_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChatState {
    #[default]
    Idle,
    /// A request is on the wire. `attempt` counts from 1.
    Sending { attempt: u32, notice_shown: bool },
    /// The gateway answered 409; waiting before polling again.
    BusyRetry { attempt: u32 },
    Streaming,
    /// Resting state after an error; accepts a new submission.
    Failed(ChatError),
}

impl ChatState {
    pub fn name(&self) -> &'static str {
        match self {
            ChatState::Idle => "idle",
            ChatState::Sending { .. } => "sending",
            ChatState::BusyRetry { .. } => "busy-retry",
            ChatState::Streaming => "streaming",
            ChatState::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Submit(String),
    /// Gateway returned 409
    Busy,
    RetryElapsed,
    StreamOpened,
    StreamEnded,
    Fail(ChatError),
}

impl ChatEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ChatEvent::Submit(_) => "submit",
            ChatEvent::Busy => "busy",
            ChatEvent::RetryElapsed => "retry-elapsed",
            ChatEvent::StreamOpened => "stream-opened",
            ChatEvent::StreamEnded => "stream-ended",
            ChatEvent::Fail(_) => "fail",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    LockInput,
    AppendUserMessage(String),
    SendRequest,
    ShowBusyNotice,
    HideBusyNotice,
    Wait(Duration),
    BeginStream,
    FinalizeStream,
    CommitAssistant,
    TeardownStream,
    ShowError(ChatError),
    UnlockInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: ChatState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(next: ChatState, effects: Vec<Effect>) -> Self {
        Self { next, effects }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub state: &'static str,
    pub event: &'static str,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event '{}' is not valid in state '{}'", self.event, self.state)
    }
}

impl std::error::Error for InvalidTransition {}

pub fn transition(
    state: &ChatState,
    event: ChatEvent,
    policy: &RetryPolicy,
) -> Result<Transition, InvalidTransition> {
    use ChatEvent as E;
    use ChatState as S;

    let invalid = InvalidTransition {
        state: state.name(),
        event: event.name(),
    };

    let next = match (state, event) {
        (S::Idle | S::Failed(_), E::Submit(text)) => Transition::to(
            S::Sending {
                attempt: 1,
                notice_shown: false,
            },
            vec![
                Effect::LockInput,
                Effect::AppendUserMessage(text),
                Effect::SendRequest,
            ],
        ),

        (
            S::Sending {
                attempt,
                notice_shown,
            },
            E::Busy,
        ) => {
            if *attempt >= policy.max_attempts {
                let mut effects = Vec::with_capacity(3);
                if *notice_shown {
                    effects.push(Effect::HideBusyNotice);
                }
                effects.push(Effect::ShowError(ChatError::QueueTimeout));
                effects.push(Effect::UnlockInput);
                Transition::to(S::Failed(ChatError::QueueTimeout), effects)
            } else {
                let mut effects = Vec::with_capacity(2);
                if !*notice_shown {
                    effects.push(Effect::ShowBusyNotice);
                }
                effects.push(Effect::Wait(policy.interval));
                Transition::to(S::BusyRetry { attempt: *attempt }, effects)
            }
        }

        (S::BusyRetry { attempt }, E::RetryElapsed) => Transition::to(
            S::Sending {
                attempt: attempt + 1,
                notice_shown: true,
            },
            vec![Effect::SendRequest],
        ),

        (S::Sending { notice_shown, .. }, E::StreamOpened) => {
            let mut effects = Vec::with_capacity(2);
            if *notice_shown {
                effects.push(Effect::HideBusyNotice);
            }
            effects.push(Effect::BeginStream);
            Transition::to(S::Streaming, effects)
        }

        (S::Streaming, E::StreamEnded) => Transition::to(
            S::Idle,
            vec![
                Effect::FinalizeStream,
                Effect::CommitAssistant,
                Effect::UnlockInput,
            ],
        ),

        (S::Sending { notice_shown, .. }, E::Fail(err)) => {
            let mut effects = Vec::with_capacity(3);
            if *notice_shown {
                effects.push(Effect::HideBusyNotice);
            }
            effects.push(Effect::ShowError(err.clone()));
            effects.push(Effect::UnlockInput);
            Transition::to(S::Failed(err), effects)
        }

        (S::BusyRetry { .. }, E::Fail(err)) => Transition::to(
            S::Failed(err.clone()),
            vec![
                Effect::HideBusyNotice,
                Effect::ShowError(err),
                Effect::UnlockInput,
            ],
        ),

        (S::Streaming, E::Fail(err)) => Transition::to(
            S::Failed(err.clone()),
            vec![
                Effect::TeardownStream,
                Effect::ShowError(err),
                Effect::UnlockInput,
            ],
        ),

        _ => return Err(invalid),
    };

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
    }

    fn step(state: &ChatState, event: ChatEvent) -> Transition {
        transition(state, event, &policy()).unwrap()
    }

    #[test]
    fn test_submit_locks_appends_and_sends() {
        let t = step(&ChatState::Idle, ChatEvent::Submit("hi".to_string()));
        assert_eq!(
            t.next,
            ChatState::Sending {
                attempt: 1,
                notice_shown: false
            }
        );
        assert_eq!(
            t.effects,
            vec![
                Effect::LockInput,
                Effect::AppendUserMessage("hi".to_string()),
                Effect::SendRequest,
            ]
        );
    }

    #[test]
    fn test_busy_notice_shown_once_per_cycle() {
        let mut state = step(&ChatState::Idle, ChatEvent::Submit("q".into())).next;
        let mut notices = 0;

        for _ in 0..5 {
            let t = step(&state, ChatEvent::Busy);
            notices += t
                .effects
                .iter()
                .filter(|e| **e == Effect::ShowBusyNotice)
                .count();
            assert!(t.effects.contains(&Effect::Wait(DEFAULT_RETRY_INTERVAL)));
            state = step(&t.next, ChatEvent::RetryElapsed).next;
        }

        assert_eq!(notices, 1);
        assert_eq!(
            state,
            ChatState::Sending {
                attempt: 6,
                notice_shown: true
            }
        );

        let t = step(&state, ChatEvent::StreamOpened);
        assert_eq!(t.next, ChatState::Streaming);
        assert_eq!(t.effects, vec![Effect::HideBusyNotice, Effect::BeginStream]);
    }

    #[test]
    fn test_last_attempt_busy_times_out_without_waiting() {
        let policy = RetryPolicy {
            interval: Duration::from_millis(10),
            max_attempts: 3,
        };
        let mut state = ChatState::Sending {
            attempt: 1,
            notice_shown: false,
        };
        for _ in 0..2 {
            state = transition(&state, ChatEvent::Busy, &policy).unwrap().next;
            state = transition(&state, ChatEvent::RetryElapsed, &policy)
                .unwrap()
                .next;
        }

        let t = transition(&state, ChatEvent::Busy, &policy).unwrap();
        assert_eq!(t.next, ChatState::Failed(ChatError::QueueTimeout));
        assert_eq!(
            t.effects,
            vec![
                Effect::HideBusyNotice,
                Effect::ShowError(ChatError::QueueTimeout),
                Effect::UnlockInput,
            ]
        );
    }

    #[test]
    fn test_stream_end_commits_and_unlocks() {
        let t = step(&ChatState::Streaming, ChatEvent::StreamEnded);
        assert_eq!(t.next, ChatState::Idle);
        assert_eq!(
            t.effects,
            vec![
                Effect::FinalizeStream,
                Effect::CommitAssistant,
                Effect::UnlockInput,
            ]
        );
    }

    #[test]
    fn test_every_failure_unlocks() {
        let states = [
            ChatState::Sending {
                attempt: 1,
                notice_shown: false,
            },
            ChatState::BusyRetry { attempt: 2 },
            ChatState::Streaming,
        ];

        for state in states {
            let t = step(&state, ChatEvent::Fail(ChatError::EngineOffline));
            assert_eq!(t.next, ChatState::Failed(ChatError::EngineOffline));
            assert_eq!(t.effects.last(), Some(&Effect::UnlockInput));
            assert!(
                t.effects
                    .contains(&Effect::ShowError(ChatError::EngineOffline))
            );
        }
    }

    #[test]
    fn test_stream_failure_tears_down_partial_output() {
        let t = step(
            &ChatState::Streaming,
            ChatEvent::Fail(ChatError::Stream("reset".into())),
        );
        assert_eq!(t.effects.first(), Some(&Effect::TeardownStream));
        assert!(!t.effects.contains(&Effect::CommitAssistant));
    }

    #[test]
    fn test_failed_accepts_new_submission() {
        let t = step(
            &ChatState::Failed(ChatError::QueueTimeout),
            ChatEvent::Submit("again".into()),
        );
        assert!(matches!(t.next, ChatState::Sending { attempt: 1, .. }));
    }

    #[test]
    fn test_submit_rejected_while_in_flight() {
        for state in [
            ChatState::Sending {
                attempt: 1,
                notice_shown: false,
            },
            ChatState::BusyRetry { attempt: 1 },
            ChatState::Streaming,
        ] {
            let err = transition(&state, ChatEvent::Submit("spam".into()), &policy()).unwrap_err();
            assert_eq!(err.event, "submit");
        }
    }

    #[test]
    fn test_unexpected_events_are_rejected() {
        assert!(transition(&ChatState::Idle, ChatEvent::StreamEnded, &policy()).is_err());
        assert!(transition(&ChatState::Idle, ChatEvent::Busy, &policy()).is_err());
        assert!(transition(&ChatState::Streaming, ChatEvent::Busy, &policy()).is_err());
    }
}
