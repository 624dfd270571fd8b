//! Session replay
//!
//! A session log is a JSON array of the UI-facing events a chat client sees:
//! received messages, profile loads, logouts and modal dismissals. Replaying
//! feeds them through a fresh [`AppStores`] with observers attached, the same
//! way the live client's event handlers would.
//!
//! ```json
//! [
//!   { "event": "profile", "profile": { "name": "ada", "uid": 7, "join_time": 1700000000 } },
//!   { "event": "message", "message": { "Text": { "name": "bo", "uid": 9, "mid": 1,
//!       "timestamp": 1700000005, "payload": [104, 105], "pic": [] } } },
//!   { "event": "modal_closed" },
//!   { "event": "logout" }
//! ]
//! ```

use anyhow::{Context, Result};
use murmur_core::{AppStores, Message, Profile};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info};

/// One recorded UI event
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A message arrived from the network
    Message { message: Message },
    /// A profile was loaded or personalised
    Profile { profile: Profile },
    Logout,
    /// A modal was dismissed by Escape or an outside click
    ModalClosed,
    ClearHistory,
}

pub fn load_events(path: &Path) -> Result<Vec<SessionEvent>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    parse_events(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn parse_events(content: &str) -> Result<Vec<SessionEvent>> {
    Ok(serde_json::from_str(content)?)
}

/// Apply a single event to the stores
pub fn apply(app: &AppStores, event: SessionEvent) {
    match event {
        SessionEvent::Message { message } => app.push_message(message),
        SessionEvent::Profile { profile } => app.load_profile(profile),
        SessionEvent::Logout => app.clear_profile(),
        SessionEvent::ModalClosed => app.modal_closed().fire(),
        SessionEvent::ClearHistory => app.clear_history(),
    }
}

/// What the stores looked like after a replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub events: usize,
    pub messages: usize,
    pub profile: Option<String>,
    /// Modal dismissals handled by the modal observer
    pub modal_closes: usize,
    /// Notifications delivered to the history observer, initial one included
    pub history_renders: usize,
}

impl fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "events replayed: {}", self.events)?;
        writeln!(f, "messages:        {}", self.messages)?;
        writeln!(
            f,
            "profile:         {}",
            self.profile.as_deref().unwrap_or("(none)")
        )?;
        writeln!(f, "modal closes:    {}", self.modal_closes)?;
        write!(f, "history renders: {}", self.history_renders)
    }
}

/// Replay `events` through `app` and summarise the result
pub fn replay(app: &AppStores, events: Vec<SessionEvent>) -> ReplaySummary {
    let renders = Rc::new(Cell::new(0usize));
    let render_count = renders.clone();
    let history_sub = app.msg_history().subscribe(move |history: &Vec<Message>| {
        render_count.set(render_count.get() + 1);
        if let Some(last) = history.last() {
            debug!(len = history.len(), mid = last.mid(), "history changed");
        }
    });

    let profile_sub = app.profile().subscribe(|profile: &Option<Profile>| match profile {
        Some(profile) => info!(name = %profile.name, uid = profile.uid, "profile active"),
        None => debug!("no profile"),
    });

    let closes = Rc::new(Cell::new(0usize));
    let close_count = closes.clone();
    let modal_sub = app.modal_closed().on_fire(move || {
        close_count.set(close_count.get() + 1);
        debug!("modal dismissed");
    });

    let total = events.len();
    for event in events {
        apply(app, event);
    }

    history_sub.unsubscribe();
    profile_sub.unsubscribe();
    modal_sub.unsubscribe();

    ReplaySummary {
        events: total,
        messages: app.msg_history().with(Vec::len),
        profile: app.profile().with(|p| p.as_ref().map(|p| p.name.clone())),
        modal_closes: closes.get(),
        history_renders: renders.get(),
    }
}
