//! WLED lighting sync
//!
//! Pushes the active theme's palette to a WLED controller over its JSON
//! API. Requests run on a background thread and report back through a
//! channel that the frame loop drains once per frame.

use crate::theme::Theme;
use serde::Serialize;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LightingStatus {
    Disabled,
    Pending,
    Synced,
    Failed(String),
}

impl LightingStatus {
    pub fn label(&self) -> String {
        match self {
            LightingStatus::Disabled => String::new(),
            LightingStatus::Pending => "WLED: syncing".to_string(),
            LightingStatus::Synced => "WLED: synced".to_string(),
            LightingStatus::Failed(reason) => format!("WLED: {}", reason),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Segment {
    pub id: u8,
    pub col: [[u8; 3]; 3],
    pub fx: u8,
    pub sx: u8,
    pub ix: u8,
}

/// Body of `POST /json/state`
#[derive(Debug, Serialize, PartialEq)]
pub struct StatePayload {
    pub on: bool,
    pub bri: u8,
    pub seg: [Segment; 1],
}

impl StatePayload {
    pub fn for_theme(theme: &Theme, brightness: u8, effect: u8) -> Self {
        Self {
            on: true,
            bri: brightness,
            seg: [Segment {
                id: 0,
                col: theme.lighting_palette(),
                fx: effect,
                sx: 128,
                ix: 128,
            }],
        }
    }
}

pub fn validate_ip(ip: &str) -> Result<(), String> {
    if ip.len() < 7 {
        Err("Invalid IP".to_string())
    } else {
        Ok(())
    }
}

/// Blocking push of one theme to the controller at `ip`.
pub fn sync_theme(ip: &str, theme: &Theme, brightness: u8, effect: u8) -> Result<(), String> {
    validate_ip(ip)?;
    let url = format!("http://{}/json/state", ip);
    let payload = StatePayload::for_theme(theme, brightness, effect);

    match ureq::post(&url).timeout(REQUEST_TIMEOUT).send_json(&payload) {
        Ok(_) => Ok(()),
        Err(ureq::Error::Status(code, response)) => Err(format!("{} {}", code, response.status_text())),
        Err(ureq::Error::Transport(err)) => Err(err.kind().to_string()),
    }
}

/// Fire-and-forget sync requests plus the latest outcome.
pub struct LightingSync {
    ip: Option<String>,
    brightness: u8,
    effect: u8,
    last_theme: Option<&'static str>,
    status: LightingStatus,
    receiver: Receiver<Result<(), String>>,
    sender: Sender<Result<(), String>>,
}

impl LightingSync {
    pub fn new(ip: Option<String>, brightness: u8, effect: u8) -> Self {
        let (tx, rx) = mpsc::channel();
        let status = if ip.is_some() { LightingStatus::Pending } else { LightingStatus::Disabled };
        Self {
            ip,
            brightness,
            effect,
            last_theme: None,
            status,
            receiver: rx,
            sender: tx,
        }
    }

    pub fn status(&self) -> &LightingStatus {
        &self.status
    }

    /// Sync when the theme differs from the last one sent.
    pub fn theme_changed(&mut self, theme: &'static Theme) {
        let Some(ip) = self.ip.clone() else {
            return;
        };
        if self.last_theme == Some(theme.id) {
            return;
        }
        self.last_theme = Some(theme.id);

        if let Err(reason) = validate_ip(&ip) {
            log::warn!("lighting sync skipped for {:?}: {}", ip, reason);
            self.status = LightingStatus::Failed(reason);
            return;
        }

        self.status = LightingStatus::Pending;
        let tx = self.sender.clone();
        let (brightness, effect) = (self.brightness, self.effect);
        thread::spawn(move || {
            let _ = tx.send(sync_theme(&ip, theme, brightness, effect));
        });
    }

    /// Drain finished requests; call once per frame.
    pub fn poll(&mut self) {
        loop {
            match self.receiver.try_recv() {
                Ok(Ok(())) => {
                    log::info!("lighting synced");
                    self.status = LightingStatus::Synced;
                }
                Ok(Err(reason)) => {
                    log::warn!("lighting sync failed: {}", reason);
                    self.status = LightingStatus::Failed(reason);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::THEMES;

    #[test]
    fn payload_layout() {
        let theme = Theme::by_id("cyber").unwrap();
        let payload = StatePayload::for_theme(theme, 200, 9);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "on": true,
                "bri": 200,
                "seg": [{
                    "id": 0,
                    "col": [[6, 182, 212], [224, 224, 224], [5, 5, 5]],
                    "fx": 9,
                    "sx": 128,
                    "ix": 128
                }]
            })
        );
    }

    #[test]
    fn short_ip_fails_without_network() {
        assert_eq!(sync_theme("1.2.3", &THEMES[0], 128, 0), Err("Invalid IP".to_string()));
        assert_eq!(validate_ip("10.0.0.1"), Ok(()));
    }

    #[test]
    fn disabled_without_ip() {
        let mut sync = LightingSync::new(None, 128, 0);
        sync.theme_changed(&THEMES[1]);
        sync.poll();
        assert_eq!(sync.status(), &LightingStatus::Disabled);
        assert_eq!(sync.status().label(), "");
    }

    #[test]
    fn invalid_ip_reports_failure() {
        let mut sync = LightingSync::new(Some("bad".to_string()), 128, 0);
        sync.theme_changed(&THEMES[0]);
        assert_eq!(sync.status(), &LightingStatus::Failed("Invalid IP".to_string()));
        assert_eq!(sync.status().label(), "WLED: Invalid IP");
    }
}
