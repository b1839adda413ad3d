use async_trait::async_trait;
use dialoguer::{Input, Select};
use tgi_project::Prompter;

/// Terminal prompts, with flags that answer them up front.
pub struct TerminalPrompter {
    /// Answer for the name prompt (`--name`).
    pub name: Option<String>,
    /// Pick the first option of every choice (`--yes`).
    pub assume_yes: bool,
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn input_text(&self, title: &str, prompt: &str, default: &str) -> Option<String> {
        if let Some(name) = &self.name {
            return Some(name.clone());
        }

        let label = format!("{title} ({prompt})");
        let initial = default.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            Input::<String>::new()
                .with_prompt(label)
                .with_initial_text(initial)
                .allow_empty(true)
                .interact_text()
        })
        .await;

        match answer {
            Ok(Ok(text)) => Some(text),
            Ok(Err(err)) => {
                log::debug!("Name prompt unavailable: {err}");
                None
            }
            Err(err) => {
                log::warn!("Prompt task failed: {err}");
                None
            }
        }
    }

    async fn choose(&self, message: &str, options: &[&str]) -> Option<usize> {
        if self.assume_yes {
            return Some(0);
        }

        let message = message.to_string();
        let items: Vec<String> = options.iter().map(|o| (*o).to_string()).collect();
        let answer = tokio::task::spawn_blocking(move || {
            Select::new()
                .with_prompt(message)
                .items(&items)
                .default(0)
                .interact_opt()
        })
        .await;

        match answer {
            Ok(Ok(choice)) => choice,
            Ok(Err(err)) => {
                log::debug!("Choice prompt unavailable: {err}");
                None
            }
            Err(err) => {
                log::warn!("Prompt task failed: {err}");
                None
            }
        }
    }
}
