//! 危机预警与事件推送

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use mc_assess::{EmotionLabel, RiskLevel};
use mc_core::{SessionId, StudentId};

/// 推送给咨询师的预警，不含消息原文
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrisisAlert {
    pub session_id: SessionId,
    pub student_id: StudentId,
    pub risk: RiskLevel,
    pub emotion: EmotionLabel,
    pub turn: u32,
    pub created_at: DateTime<Utc>,
}

/// 有界的广播通道
///
/// 每个订阅者各自持有游标，落后超过容量时收到 `Lagged` 并跳到最新的消息。
/// 推送方从不阻塞，也不持有接收端。
pub struct AlertBus<T> {
    tx: broadcast::Sender<T>,
}

impl<T: Clone> AlertBus<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// 推送，返回是否有订阅者收到
    pub fn publish(&self, item: T) -> bool {
        match self.tx.send(item) {
            Ok(_) => true,
            Err(_) => {
                tracing::debug!("no subscriber on alert bus, item dropped");
                false
            }
        }
    }

    /// 订阅，只能收到订阅之后推送的消息
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_publish_and_receive() {
        let bus = AlertBus::new(4);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);
        assert!(bus.publish(1u32));
        assert!(bus.publish(2u32));
        assert_eq!(a.try_recv().unwrap(), 1);
        assert_eq!(a.try_recv().unwrap(), 2);
        assert_eq!(b.try_recv().unwrap(), 1);
        assert_eq!(b.try_recv().unwrap(), 2);
    }

    #[test]
    fn test_publish_without_subscriber_keeps_nothing() {
        let bus = AlertBus::new(2);
        for i in 0..10u32 {
            assert!(!bus.publish(i));
        }

        let mut rx = bus.subscribe();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert!(bus.publish(42));
        assert_eq!(rx.try_recv().unwrap(), 42);
    }

    #[test]
    fn test_slow_subscriber_skips_to_newest() {
        let bus = AlertBus::new(2);
        let mut rx = bus.subscribe();
        for i in 0..5u32 {
            assert!(bus.publish(i));
        }

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Lagged(3))));
        assert_eq!(rx.try_recv().unwrap(), 3);
        assert_eq!(rx.try_recv().unwrap(), 4);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        // 追上之后继续正常接收
        assert!(bus.publish(5));
        assert_eq!(rx.try_recv().unwrap(), 5);
    }
}
