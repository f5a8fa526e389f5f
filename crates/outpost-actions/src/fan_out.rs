//! Fan-out/fan-in over independent units of work.
//!
//! Every unit runs on its own worker and reports onto one shared channel.
//! The coordinator receives exactly one report per unit, even after an early
//! failure, so no worker is left running unobserved. Reports arrive in
//! completion order; only the full set of outcomes matters.

use std::fmt;
use std::future::Future;

use tokio::sync::mpsc;

/// Failure of one or more units, e.g. `'2' drain script(s) failed: a\nb\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateError {
    noun: String,
    messages: Vec<String>,
}

impl AggregateError {
    pub fn new(noun: impl Into<String>, messages: Vec<String>) -> Self {
        Self {
            noun: noun.into(),
            messages,
        }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' {}(s) failed: ", self.messages.len(), self.noun)?;
        for message in &self.messages {
            writeln!(f, "{message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Run every unit concurrently and wait for all of them.
///
/// `noun` names a unit in the aggregate message ("drain script", "script").
pub async fn run_all<I, F>(noun: &str, units: I) -> Result<(), AggregateError>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let units: Vec<F> = units.into_iter().collect();
    let total = units.len();
    if total == 0 {
        return Ok(());
    }

    let (tx, mut rx) = mpsc::channel::<anyhow::Result<()>>(total);
    for unit in units {
        let tx = tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(unit.await).await;
        });
    }
    drop(tx);

    let mut messages = Vec::new();
    for _ in 0..total {
        match rx.recv().await {
            Some(Ok(())) => {}
            Some(Err(e)) => messages.push(format!("{e:#}")),
            // A worker went away without reporting (panicked).
            None => messages.push(format!("{noun} exited without reporting")),
        }
    }

    if messages.is_empty() {
        Ok(())
    } else {
        tracing::warn!(noun, failed = messages.len(), total, "parallel run had failures");
        Err(AggregateError::new(noun, messages))
    }
}
