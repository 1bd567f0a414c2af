use async_trait::async_trait;

/// Line-based human console. `read_line` returns `None` once the input
/// stream is closed; callers treat that as the user walking away.
#[async_trait]
pub trait Console: Send + Sync {
    async fn read_line(&self) -> Option<String>;
    async fn print(&self, message: &str);

    async fn prompt(&self, message: &str) -> Option<String> {
        self.print(message).await;
        self.read_line().await
    }
}

/// A recognized yes/no answer. Anything `parse` rejects must be re-asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Yes,
    No,
}

impl Decision {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "y" | "yes" => Some(Decision::Yes),
            "n" | "no" => Some(Decision::No),
            _ => None,
        }
    }
}
