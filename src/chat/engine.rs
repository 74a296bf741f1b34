//! Turn-based chat state machine.
//!
//! [`ChatEngine`] owns the active [`Session`], talks to the model through a
//! [`CompletionClient`] and persists through a [`SessionStore`]. It is
//! deliberately free of terminal I/O: streamed text goes to a [`Renderer`]
//! and interruption arrives as a future, so the REPL and the tests drive it
//! the same way.

use futures::StreamExt;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use super::commands::{parse_input, Command, Input};
use super::ChatError;
use crate::config::Config;
use crate::message::{Message, Role};
use crate::output::Renderer;
use crate::provider::{ApiError, CompletionClient, CompletionRequest};
use crate::session::{Session, SessionStore, StoreError};

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Waiting for input.
    Idle,
    /// A reply is being received.
    Streaming,
    /// `/exit` completed; no further input is accepted.
    Terminated,
}

/// Chat parameters resolved from [`Config`].
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Model for newly created sessions. Loaded sessions keep their own.
    pub model: String,
    pub system_prompt: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Most recent transcript messages sent per request; 0 sends all.
    pub context_messages: usize,
    /// Longest silence tolerated between two deltas.
    pub chunk_timeout: Duration,
    pub autosave: bool,
}

impl ChatSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.models.chat.clone(),
            system_prompt: Some(config.chat_system_prompt().to_string())
                .filter(|p| !p.trim().is_empty()),
            temperature: config.chat.temperature,
            max_tokens: Some(config.chat.max_tokens).filter(|&n| n > 0),
            context_messages: config.chat.context_messages,
            chunk_timeout: Duration::from_secs(config.api.chunk_timeout_secs.max(1)),
            autosave: config.storage.autosave,
        }
    }
}

/// How a streamed turn ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The whole reply arrived and was appended.
    Completed,
    /// The user interrupted. With `kept`, the partial reply was appended;
    /// otherwise the user message was withdrawn.
    Interrupted { kept: bool },
}

/// Result of a successful control command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Created {
        name: String,
        /// Where the previous session was saved first, if it had changes.
        saved_previous: Option<PathBuf>,
    },
    Loaded {
        name: String,
        model: String,
        messages: usize,
        /// A trailing unanswered user message was removed.
        dropped_unanswered: bool,
        saved_previous: Option<PathBuf>,
    },
    Listed(Vec<String>),
    Saved(PathBuf),
    /// `/exit` with unsaved changes; call [`ChatEngine::terminate`] with the
    /// user's decision.
    ExitPending,
    Exited,
    Help,
}

enum StreamEvent {
    Delta(String),
    End,
    Failed(ApiError),
    Stalled,
    Interrupted,
}

pub struct ChatEngine<C> {
    client: C,
    store: SessionStore,
    settings: ChatSettings,
    session: Session,
    state: EngineState,
    /// Reply text accumulated during the current turn.
    partial: String,
    /// Transcript differs from what was last saved.
    dirty: bool,
}

impl<C: CompletionClient> ChatEngine<C> {
    /// Starts an idle engine on `session`, treated as already persisted.
    pub fn new(client: C, store: SessionStore, settings: ChatSettings, session: Session) -> Self {
        Self {
            client,
            store,
            settings,
            session,
            state: EngineState::Idle,
            partial: String::new(),
            dirty: false,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// True when the transcript has changes not yet on disk.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Classifies an input line, refusing it unless the engine is idle.
    pub(crate) fn accept(&self, line: &str) -> Result<Input, ChatError> {
        self.ensure_idle()?;
        parse_input(line)
    }

    /// Runs one conversational turn.
    ///
    /// The user message is appended, the request is streamed and every delta
    /// is rendered as it arrives. `interrupt` resolving stops the turn: a
    /// non-empty partial reply is kept, otherwise the user message is
    /// withdrawn. A stall longer than the chunk timeout keeps the partial
    /// reply the same way and reports [`ApiError::Timeout`]. Any other
    /// failure withdraws the turn entirely, so the transcript always
    /// alternates user/assistant when the engine is idle.
    pub async fn send<I>(
        &mut self,
        text: &str,
        renderer: &mut dyn Renderer,
        interrupt: I,
    ) -> Result<TurnOutcome, ChatError>
    where
        I: Future<Output = ()>,
    {
        self.begin_turn(text)?;
        let request = self.request();
        tokio::pin!(interrupt);

        tracing::info!(
            session = %self.session.name,
            model = %request.model,
            messages = request.messages.len(),
            "chat turn started"
        );

        let opened = tokio::select! {
            biased;
            _ = &mut interrupt => None,
            result = self.client.complete_streaming(&request) => Some(result),
        };
        let mut stream = match opened {
            None => {
                tracing::info!("chat turn interrupted before the reply started");
                self.abort_turn();
                renderer.render_done();
                return Ok(TurnOutcome::Interrupted { kept: false });
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "chat request failed");
                self.abort_turn();
                renderer.render_error(&e.to_string());
                return Err(e.into());
            }
            Some(Ok(stream)) => stream,
        };

        let chunk_timeout = self.settings.chunk_timeout;
        loop {
            let event = tokio::select! {
                biased;
                _ = &mut interrupt => StreamEvent::Interrupted,
                next = tokio::time::timeout(chunk_timeout, stream.next()) => match next {
                    Err(_) => StreamEvent::Stalled,
                    Ok(None) => StreamEvent::End,
                    Ok(Some(Ok(delta))) => StreamEvent::Delta(delta),
                    Ok(Some(Err(e))) => StreamEvent::Failed(e),
                },
            };

            match event {
                StreamEvent::Delta(delta) => {
                    renderer.render_token(&delta);
                    self.push_delta(&delta);
                }
                StreamEvent::End => {
                    renderer.render_done();
                    self.finish_turn();
                    tracing::info!(chars = self.last_reply_len(), "chat turn completed");
                    return Ok(TurnOutcome::Completed);
                }
                StreamEvent::Interrupted => {
                    drop(stream);
                    renderer.render_done();
                    let kept = self.interrupt_turn();
                    tracing::info!(kept, "chat turn interrupted");
                    return Ok(TurnOutcome::Interrupted { kept });
                }
                StreamEvent::Stalled => {
                    drop(stream);
                    let err = ApiError::Timeout(chunk_timeout);
                    renderer.render_error(&err.to_string());
                    let kept = self.interrupt_turn();
                    tracing::warn!(kept, "chat reply stalled");
                    return Err(err.into());
                }
                StreamEvent::Failed(e) => {
                    drop(stream);
                    renderer.render_error(&e.to_string());
                    self.abort_turn();
                    tracing::warn!(error = %e, "chat stream failed");
                    return Err(e.into());
                }
            }
        }
    }

    /// Executes a control command. Commands never touch the transcript of a
    /// turn in flight; they are refused with [`ChatError::Busy`] meanwhile.
    pub(crate) fn execute(&mut self, command: Command) -> Result<CommandOutcome, ChatError> {
        self.ensure_idle()?;
        match command {
            Command::New(name) => self.new_session(name),
            Command::Load(name) => self.load_session(&name),
            Command::List => Ok(CommandOutcome::Listed(self.store.list()?)),
            Command::Save => {
                let path = self.save()?;
                Ok(CommandOutcome::Saved(path))
            }
            Command::Exit => {
                if self.dirty {
                    Ok(CommandOutcome::ExitPending)
                } else {
                    self.state = EngineState::Terminated;
                    Ok(CommandOutcome::Exited)
                }
            }
            Command::Help => Ok(CommandOutcome::Help),
        }
    }

    /// Ends the session, saving it first when `save` is set. A failed save
    /// leaves the engine idle so nothing is lost.
    pub fn terminate(&mut self, save: bool) -> Result<Option<PathBuf>, ChatError> {
        self.ensure_idle()?;
        let saved = if save { Some(self.save()?) } else { None };
        self.state = EngineState::Terminated;
        tracing::info!(session = %self.session.name, saved = saved.is_some(), "chat ended");
        Ok(saved)
    }

    /// Saves after a finished turn when autosave is enabled and something
    /// changed. Returns `None` when nothing was attempted.
    pub fn autosave(&mut self) -> Option<Result<PathBuf, StoreError>> {
        if !self.settings.autosave || !self.dirty || self.state != EngineState::Idle {
            return None;
        }
        let result = self.store.save(&self.session);
        match &result {
            Ok(_) => self.dirty = false,
            Err(e) => tracing::warn!(error = %e, "autosave failed"),
        }
        Some(result)
    }

    fn ensure_idle(&self) -> Result<(), ChatError> {
        match self.state {
            EngineState::Idle => Ok(()),
            EngineState::Streaming => Err(ChatError::Busy),
            EngineState::Terminated => Err(ChatError::Terminated),
        }
    }

    fn save(&mut self) -> Result<PathBuf, ChatError> {
        let path = self.store.save(&self.session)?;
        self.dirty = false;
        Ok(path)
    }

    fn save_if_dirty(&mut self) -> Result<Option<PathBuf>, ChatError> {
        if self.dirty {
            self.save().map(Some)
        } else {
            Ok(None)
        }
    }

    fn new_session(&mut self, name: Option<String>) -> Result<CommandOutcome, ChatError> {
        let name = match name {
            Some(name) => {
                if self.store.exists(&name) || name == self.session.name {
                    return Err(ChatError::SessionExists(name));
                }
                Some(name)
            }
            None => None,
        };
        let saved_previous = self.save_if_dirty()?;

        let mut session = Session::new(name, self.settings.model.clone());
        if self.store.exists(&session.name) || session.name == self.session.name {
            session.name = self.unique_name(&session.name);
        }
        if self.settings.autosave {
            self.store.save(&session)?;
        }
        self.session = session;
        self.dirty = false;
        tracing::info!(session = %self.session.name, "new chat");
        Ok(CommandOutcome::Created {
            name: self.session.name.clone(),
            saved_previous,
        })
    }

    /// Appends `-2`, `-3`, ... to a generated name until it is unused.
    fn unique_name(&self, base: &str) -> String {
        (2..)
            .map(|n| format!("{}-{}", base, n))
            .find(|candidate| !self.store.exists(candidate) && *candidate != self.session.name)
            .unwrap_or_else(|| base.to_string())
    }

    fn load_session(&mut self, name: &str) -> Result<CommandOutcome, ChatError> {
        // The active chat's unsaved turns are written before its file is read.
        let (mut loaded, saved_previous) = if name == self.session.name {
            let saved_previous = self.save_if_dirty()?;
            (self.store.load(name)?, saved_previous)
        } else {
            let loaded = self.store.load(name)?;
            (loaded, self.save_if_dirty()?)
        };

        let dropped_unanswered = matches!(loaded.messages.last(), Some(m) if m.role == Role::User);
        if dropped_unanswered {
            loaded.messages.pop();
        }

        self.session = loaded;
        self.dirty = dropped_unanswered;
        tracing::info!(
            session = %self.session.name,
            messages = self.session.messages.len(),
            "chat loaded"
        );
        Ok(CommandOutcome::Loaded {
            name: self.session.name.clone(),
            model: self.session.model.clone(),
            messages: self.session.messages.len(),
            dropped_unanswered,
            saved_previous,
        })
    }

    /// System prompt followed by the most recent transcript window. The
    /// window never opens on an assistant message.
    fn request(&self) -> CompletionRequest {
        let history = &self.session.messages;
        let mut start = match self.settings.context_messages {
            0 => 0,
            n => history.len().saturating_sub(n),
        };
        while start < history.len() && history[start].role != Role::User {
            start += 1;
        }

        let mut messages = Vec::with_capacity(history.len() - start + 1);
        if let Some(prompt) = &self.settings.system_prompt {
            messages.push(Message::system(prompt.clone()));
        }
        messages.extend_from_slice(&history[start..]);

        let request = CompletionRequest::new(
            self.session.model.clone(),
            messages,
            self.settings.temperature,
        );
        match self.settings.max_tokens {
            Some(n) => request.max_tokens(n),
            None => request,
        }
    }

    fn begin_turn(&mut self, text: &str) -> Result<(), ChatError> {
        self.ensure_idle()?;
        self.session.messages.push(Message::user(text));
        self.partial.clear();
        self.state = EngineState::Streaming;
        Ok(())
    }

    fn push_delta(&mut self, delta: &str) {
        debug_assert_eq!(self.state, EngineState::Streaming);
        self.partial.push_str(delta);
    }

    fn finish_turn(&mut self) {
        let reply = std::mem::take(&mut self.partial);
        self.session.messages.push(Message::assistant(reply));
        self.state = EngineState::Idle;
        self.dirty = true;
    }

    /// Keeps the partial reply if there is one; returns whether it did.
    fn interrupt_turn(&mut self) -> bool {
        if self.partial.is_empty() {
            self.abort_turn();
            false
        } else {
            self.finish_turn();
            true
        }
    }

    /// Withdraws the pending user message.
    fn abort_turn(&mut self) {
        self.partial.clear();
        debug_assert!(matches!(self.session.messages.last(), Some(m) if m.role == Role::User));
        self.session.messages.pop();
        self.state = EngineState::Idle;
    }

    fn last_reply_len(&self) -> usize {
        self.session
            .messages
            .last()
            .map(|m| m.content.chars().count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests;
