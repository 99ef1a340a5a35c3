use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use evokv_common::Timestamp;

/// Fonte de tempo do store.
///
/// Todas as escritas sem timestamp explícito e todas as leituras "agora"
/// consultam o mesmo relógio, o que mantém as chains monotônicas.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Timestamp;
}

/// Relógio de parede (`SystemTime`). Sujeito a ajustes de NTP.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Relógio controlado manualmente, para testes determinísticos e scripts
/// de "viagem no tempo".
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            nanos: AtomicU64::new(start.as_nanos()),
        }
    }

    pub fn set(&self, at: Timestamp) {
        self.nanos.store(at.as_nanos(), Ordering::SeqCst);
    }

    /// Avança o relógio e retorna o novo instante.
    pub fn advance(&self, by: Duration) -> Timestamp {
        let step = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        let prev = self
            .nanos
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_add(step))
            })
            .unwrap_or_else(|n| n);
        Timestamp::from_nanos(prev.saturating_add(step))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}
