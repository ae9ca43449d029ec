use futures::StreamExt;
use studybot_ai::ConversationHistory;
use tracing::{debug, info, warn};

use super::error::ChatError;
use super::input::InputGate;
use super::machine::{ChatEvent, ChatState, Effect, RetryPolicy, transition};
use super::renderer::StreamRenderer;
use super::transport::{ChatTransport, DeltaStream, TransportReply};
use super::view::ChatView;

/// Drives one conversation: feeds events into the state machine and carries
/// out the effects it asks for.
pub struct ChatController<T, V> {
    transport: T,
    view: V,
    history: ConversationHistory,
    policy: RetryPolicy,
    state: ChatState,
    gate: InputGate,
}

impl<T: ChatTransport, V: ChatView> ChatController<T, V> {
    pub fn new(transport: T, view: V, history: ConversationHistory, policy: RetryPolicy) -> Self {
        Self {
            transport,
            view,
            history,
            policy,
            state: ChatState::Idle,
            gate: InputGate::new(),
        }
    }

    /// Handle for the input reader; locked while a submission is in flight.
    pub fn gate(&self) -> InputGate {
        self.gate.clone()
    }

    #[cfg(test)]
    pub fn state(&self) -> &ChatState {
        &self.state
    }

    #[cfg(test)]
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut ConversationHistory {
        &mut self.history
    }

    #[cfg(test)]
    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }

    /// Send one user message and wait for the complete reply.
    ///
    /// Returns the reply as stored in the history (reasoning removed).
    pub async fn submit(&mut self, text: &str) -> Result<String, ChatError> {
        let mut event = ChatEvent::Submit(text.to_string());
        let mut stream: Option<DeltaStream> = None;
        let mut renderer = StreamRenderer::new();

        loop {
            let step = transition(&self.state, event, &self.policy).map_err(|err| {
                debug!(%err, "Submission rejected");
                ChatError::InputLocked
            })?;
            debug!(from = self.state.name(), to = step.next.name(), "Chat transition");
            self.state = step.next;

            let mut follow_up = None;
            for effect in step.effects {
                match effect {
                    Effect::LockInput => self.gate.lock(),
                    Effect::UnlockInput => self.gate.unlock(),
                    Effect::AppendUserMessage(text) => self.history.push_user(text),
                    Effect::SendRequest => {
                        follow_up = Some(match self.transport.send(self.history.messages()).await {
                            Ok(TransportReply::Busy) => ChatEvent::Busy,
                            Ok(TransportReply::Stream(deltas)) => {
                                stream = Some(deltas);
                                ChatEvent::StreamOpened
                            }
                            Err(err) => ChatEvent::Fail(err),
                        });
                    }
                    Effect::ShowBusyNotice => self.view.show_busy_notice(),
                    Effect::HideBusyNotice => self.view.hide_busy_notice(),
                    Effect::Wait(interval) => {
                        tokio::time::sleep(interval).await;
                        follow_up = Some(ChatEvent::RetryElapsed);
                    }
                    Effect::BeginStream => {
                        self.view.begin_stream();
                        follow_up = Some(match stream.take() {
                            Some(deltas) => self.consume(deltas, &mut renderer).await,
                            None => ChatEvent::StreamEnded,
                        });
                    }
                    Effect::FinalizeStream => {
                        let frame = renderer.finalize();
                        self.view.finalize_stream(&frame);
                    }
                    Effect::CommitAssistant => self.history.push_assistant(renderer.reply()),
                    Effect::TeardownStream => self.view.teardown_stream(),
                    Effect::ShowError(err) => {
                        warn!(error = %err, "Chat submission failed");
                        self.view.show_error(&err);
                    }
                }
            }

            match &self.state {
                ChatState::Idle => {
                    let reply = renderer.reply();
                    info!(reply_chars = reply.chars().count(), "Reply received");
                    return Ok(reply);
                }
                ChatState::Failed(err) => return Err(err.clone()),
                _ => {}
            }

            event = match follow_up {
                Some(next) => next,
                None => {
                    // Every in-flight state schedules its own follow-up.
                    self.gate.unlock();
                    self.state = ChatState::Idle;
                    return Err(ChatError::Stream("chat session stalled".to_string()));
                }
            };
        }
    }

    async fn consume(&mut self, mut deltas: DeltaStream, renderer: &mut StreamRenderer) -> ChatEvent {
        while let Some(delta) = deltas.next().await {
            match delta {
                Ok(text) => {
                    let frame = renderer.push(&text);
                    self.view.update_stream(&frame);
                }
                Err(err) => return ChatEvent::Fail(err),
            }
        }
        ChatEvent::StreamEnded
    }
}
