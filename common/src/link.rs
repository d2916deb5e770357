use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    AnnounceOnline,
    SubscribeCommands,
    PublishSnapshot,
}

#[derive(Debug, Clone)]
pub struct Connectivity {
    state: LinkState,
    retry_interval: Duration,
    connects: u32,
    losses: u32,
    lost_at_ms: Option<u64>,
}

impl Connectivity {
    pub fn new(retry_interval_ms: u64) -> Self {
        Self {
            state: LinkState::Disconnected,
            retry_interval: Duration::from_millis(retry_interval_ms),
            connects: 0,
            losses: 0,
            lost_at_ms: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    pub fn reconnects(&self) -> u32 {
        self.connects.saturating_sub(1)
    }

    pub fn losses(&self) -> u32 {
        self.losses
    }

    /// The snapshot goes out on every connect so the hub never keeps showing
    /// data from before the outage.
    pub fn on_connected(&mut self) -> [LinkAction; 3] {
        self.state = LinkState::Connected;
        self.connects = self.connects.saturating_add(1);
        self.lost_at_ms = None;
        [
            LinkAction::AnnounceOnline,
            LinkAction::SubscribeCommands,
            LinkAction::PublishSnapshot,
        ]
    }

    /// Returns `true` when this failure ended an established connection, as
    /// opposed to another failed retry.
    pub fn on_lost(&mut self, now_ms: u64) -> bool {
        if self.lost_at_ms.is_none() {
            self.lost_at_ms = Some(now_ms);
        }
        if self.state == LinkState::Connected {
            self.state = LinkState::Disconnected;
            self.losses = self.losses.saturating_add(1);
            true
        } else {
            false
        }
    }

    pub fn offline_for_ms(&self, now_ms: u64) -> u64 {
        self.lost_at_ms
            .map(|since| now_ms.saturating_sub(since))
            .unwrap_or(0)
    }
}
