//! Display surfaces receiving the final text

use std::sync::{Arc, Mutex};
use log::{debug, warn};

/// Anything that can show one line of text.
/// Each call replaces whatever was shown before.
pub trait DisplaySink: Send + Sync
{   fn display(&self, text: &str);
}

impl<F> DisplaySink for F
where F: Fn(&str) + Send + Sync
{   fn display(&self, text: &str)
    {   self(text)
    }
}

/// Prints to stdout, tagged with the surface id
#[derive(Debug, Clone)]
pub struct ConsoleSink
{   pub id: String
}

impl ConsoleSink
{   pub fn new(id: impl Into<String>) -> Self
    {   ConsoleSink
        {   id: id.into()
        }
    }
}

impl DisplaySink for ConsoleSink
{   fn display(&self, text: &str)
    {   debug!("Writing to display '{}'", self.id);
        println!("[{}] {}", self.id, text);
    }
}

/// Keeps every write; clones share the same record
#[derive(Debug, Clone, Default)]
pub struct MemorySink
{   writes: Arc<Mutex<Vec<String>>>
}

impl MemorySink
{   pub fn new() -> Self
    {   MemorySink::default()
    }

    /// All writes so far, oldest first
    pub fn writes(&self) -> Vec<String>
    {   match self.writes.lock()
        {   Ok(guard) => guard.clone()
          , Err(poisoned) => poisoned.into_inner().clone()
        }
    }

    /// What the surface currently shows
    pub fn current(&self) -> Option<String>
    {   self.writes().last().cloned()
    }
}

impl DisplaySink for MemorySink
{   fn display(&self, text: &str)
    {   match self.writes.lock()
        {   Ok(mut guard) => guard.push(text.to_string())
          , Err(poisoned) => {
              warn!("Memory sink lock poisoned, recovering");
              poisoned.into_inner().push(text.to_string());
            }
        }
    }
}
