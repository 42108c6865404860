use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ConsentDecision {
    Accepted,
    Declined,
    /// Closed without choosing; recorded like a decline.
    Dismissed,
}

impl ConsentDecision {
    pub fn accepted(&self) -> bool {
        matches!(self, ConsentDecision::Accepted)
    }
}

/// Presents the enhanced-experience choice to the user.
#[async_trait]
pub trait ConsentPrompt: Send + Sync {
    async fn ask(&self) -> ConsentDecision;
}

/// Always answers the same way. Handy for headless runs.
pub struct FixedConsent(pub ConsentDecision);

#[async_trait]
impl ConsentPrompt for FixedConsent {
    async fn ask(&self) -> ConsentDecision {
        self.0
    }
}

/// Asks on the terminal: `y` accepts, `n` declines, anything else dismisses.
pub struct TerminalConsentPrompt;

#[async_trait]
impl ConsentPrompt for TerminalConsentPrompt {
    async fn ask(&self) -> ConsentDecision {
        let answer = tokio::task::spawn_blocking(|| -> io::Result<String> {
            let mut stdout = io::stdout();
            write!(
                stdout,
                "Enable the enhanced experience (location, device details)? [y/n] "
            )?;
            stdout.flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => parse_answer(&line),
            _ => ConsentDecision::Dismissed,
        }
    }
}

fn parse_answer(line: &str) -> ConsentDecision {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => ConsentDecision::Accepted,
        "n" | "no" => ConsentDecision::Declined,
        _ => ConsentDecision::Dismissed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("Y\n"), ConsentDecision::Accepted);
        assert_eq!(parse_answer(" yes "), ConsentDecision::Accepted);
        assert_eq!(parse_answer("no"), ConsentDecision::Declined);
        assert_eq!(parse_answer(""), ConsentDecision::Dismissed);
        assert!(!ConsentDecision::Dismissed.accepted());
    }
}
