//! `ai ask`: a short question with a few follow-ups, nothing persisted.

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::config::Config;
use crate::constants::{ASK_MAX_EXCHANGES, ASK_MAX_TOKENS, ASK_SYSTEM_PROMPT, ASK_TEMPERATURE};
use crate::format;
use crate::message::Message;
use crate::provider::{ApiError, CompletionClient, CompletionRequest, OpenAiClient};

/// In-memory conversation capped at [`ASK_MAX_EXCHANGES`] answers.
pub(crate) struct AskSession {
    model: String,
    messages: Vec<Message>,
    exchanges: usize,
}

impl AskSession {
    pub(crate) fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![Message::system(ASK_SYSTEM_PROMPT)],
            exchanges: 0,
        }
    }

    /// Answers still allowed.
    pub(crate) fn remaining(&self) -> usize {
        ASK_MAX_EXCHANGES.saturating_sub(self.exchanges)
    }

    /// Sends `question` with the conversation so far. A failed call leaves
    /// the conversation as it was.
    pub(crate) async fn ask<C: CompletionClient>(
        &mut self,
        client: &C,
        question: &str,
    ) -> Result<String, ApiError> {
        debug_assert!(self.remaining() > 0);
        self.messages.push(Message::user(question));
        let request = CompletionRequest::new(&self.model, self.messages.clone(), ASK_TEMPERATURE)
            .max_tokens(ASK_MAX_TOKENS);

        match client.complete(&request).await {
            Ok(answer) => {
                let answer = format::strip_citations(&answer);
                self.messages.push(Message::assistant(answer.clone()));
                self.exchanges += 1;
                tracing::info!(exchange = self.exchanges, "ask answered");
                Ok(answer)
            }
            Err(e) => {
                self.messages.pop();
                Err(e)
            }
        }
    }
}

/// Answers `question`, then offers follow-ups until the user enters an
/// empty line or the exchange limit is reached.
pub async fn run_ask(config: &Config, question: &str, verbose: bool) -> Result<()> {
    let client = OpenAiClient::from_config(config)?;
    let mut session = AskSession::new(config.models.ask.as_str());

    println!("{} {}", "Question:".bold().cyan(), question);
    if verbose {
        println!("{} {}", "model:".dimmed(), config.models.ask);
        println!("{} {}", "temperature:".dimmed(), ASK_TEMPERATURE);
        println!("{} {}", "max tokens:".dimmed(), ASK_MAX_TOKENS);
    }

    let mut rl: Option<DefaultEditor> = None;
    let mut next = Some(question.to_string());
    while let Some(question) = next.take() {
        let answer = session.ask(&client, &question).await?;
        println!();
        println!("{}", format::render_markdown_lite(&answer));
        println!();

        if session.remaining() == 0 {
            println!(
                "{}",
                format!("Exchange limit reached ({}).", ASK_MAX_EXCHANGES).dimmed()
            );
            break;
        }
        println!(
            "{}",
            format!(
                "{} follow-up(s) left; empty line to finish.",
                session.remaining()
            )
            .dimmed()
        );

        if rl.is_none() {
            rl = Some(DefaultEditor::new()?);
        }
        if let Some(editor) = rl.as_mut() {
            next = read_follow_up(editor)?;
        }
    }
    Ok(())
}

fn read_follow_up(rl: &mut DefaultEditor) -> Result<Option<String>> {
    match rl.readline(&format!("{} ", "?".green().bold())) {
        Ok(line) => {
            let line = line.trim();
            Ok((!line.is_empty()).then(|| line.to_string()))
        }
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::{Reply, ScriptedClient};

    #[tokio::test]
    async fn test_follow_up_carries_history() {
        let client = ScriptedClient::new(vec![
            Reply::Deltas(vec!["Use `Vec` [1]."]),
            Reply::Deltas(vec!["Or `VecDeque`."]),
        ]);
        let mut session = AskSession::new("deepseek/deepseek-v3.2");

        assert_eq!(session.ask(&client, "list type?").await.unwrap(), "Use `Vec` .");
        assert_eq!(session.ask(&client, "queue?").await.unwrap(), "Or `VecDeque`.");
        assert_eq!(session.remaining(), ASK_MAX_EXCHANGES - 2);

        let requests = client.requests();
        let last = &requests[1];
        assert_eq!(last.temperature, ASK_TEMPERATURE);
        assert_eq!(last.max_tokens, Some(ASK_MAX_TOKENS));
        assert_eq!(
            last.messages,
            vec![
                Message::system(ASK_SYSTEM_PROMPT),
                Message::user("list type?"),
                Message::assistant("Use `Vec` ."),
                Message::user("queue?"),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_question_is_not_kept() {
        let client = ScriptedClient::new(vec![
            Reply::Fail(ApiError::Network("down".into())),
            Reply::Deltas(vec!["ok"]),
        ]);
        let mut session = AskSession::new("m");

        assert!(session.ask(&client, "first").await.is_err());
        assert_eq!(session.remaining(), ASK_MAX_EXCHANGES);

        session.ask(&client, "second").await.unwrap();
        let requests = client.requests();
        assert_eq!(
            requests[1].messages,
            vec![Message::system(ASK_SYSTEM_PROMPT), Message::user("second")]
        );
    }

    #[tokio::test]
    async fn test_exchange_limit() {
        let client = ScriptedClient::new(vec![
            Reply::Deltas(vec!["1"]),
            Reply::Deltas(vec!["2"]),
            Reply::Deltas(vec!["3"]),
        ]);
        let mut session = AskSession::new("m");
        for q in ["a", "b", "c"] {
            session.ask(&client, q).await.unwrap();
        }
        assert_eq!(session.remaining(), 0);
    }
}
