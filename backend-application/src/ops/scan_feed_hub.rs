use std::collections::VecDeque;

use backend_domain::{AdminFeedMessage, ScanLog};
use tokio::sync::{broadcast, RwLock};

const CHANNEL_BUFFER: usize = 256;

/// Bounded mirror of recent scans plus the live admin push channel.
///
/// Slow subscribers lag and lose messages; publishing never waits on them.
pub struct ScanFeedHub {
    capacity: usize,
    recent: RwLock<VecDeque<ScanLog>>,
    sender: broadcast::Sender<AdminFeedMessage>,
}

impl ScanFeedHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _rx) = broadcast::channel(CHANNEL_BUFFER);
        Self {
            capacity: capacity.max(1),
            recent: RwLock::new(VecDeque::new()),
            sender,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AdminFeedMessage> {
        self.sender.subscribe()
    }

    pub fn publish(&self, message: AdminFeedMessage) {
        let _ = self.sender.send(message);
    }

    pub async fn record_scan(&self, log: ScanLog) {
        let mut recent = self.recent.write().await;
        recent.push_front(log);
        recent.truncate(self.capacity);
    }

    /// Newest first.
    pub async fn recent(&self, limit: usize) -> Vec<ScanLog> {
        let recent = self.recent.read().await;
        recent.iter().take(limit).cloned().collect()
    }

    pub async fn clear(&self) {
        self.recent.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_domain::{utc_now, ScanStatus, ScannerId, ScannerIdentity, TicketKey};

    fn log(ticket: &str) -> ScanLog {
        let scanner = ScannerIdentity {
            id: ScannerId("s".to_string()),
            name: "gate".to_string(),
        };
        ScanLog::record(
            &TicketKey::new("E1", ticket),
            &scanner,
            ScanStatus::Success,
            utc_now(),
            0.5,
            None,
        )
    }

    #[tokio::test]
    async fn mirror_keeps_newest_entries_up_to_capacity() {
        let hub = ScanFeedHub::new(3);
        for ticket in ["T-1", "T-2", "T-3", "T-4"] {
            hub.record_scan(log(ticket)).await;
        }
        let ids: Vec<String> = hub
            .recent(10)
            .await
            .into_iter()
            .map(|log| log.ticket_id)
            .collect();
        assert_eq!(ids, vec!["T-4", "T-3", "T-2"]);

        hub.clear().await;
        assert!(hub.recent(10).await.is_empty());
    }

    #[tokio::test]
    async fn subscribers_receive_published_messages() {
        let hub = ScanFeedHub::new(10);
        let mut rx = hub.subscribe();
        let scan = log("T-9");
        hub.publish(AdminFeedMessage::Scan {
            scan: scan.clone(),
            stats: Default::default(),
        });
        match rx.recv().await.expect("message") {
            AdminFeedMessage::Scan { scan: received, .. } => assert_eq!(received, scan),
            other => panic!("unexpected message {other:?}"),
        }
    }
}
