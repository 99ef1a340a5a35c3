use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::{NANOS_PER_SEC, StoreError};

/// Instante lógico do store: nanossegundos desde a época UNIX.
///
/// Todas as versões de uma chain e todas as consultas históricas usam este
/// tipo, então a ordenação é total e não depende de float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);
    pub const MAX: Timestamp = Timestamp(u64::MAX);

    pub const fn from_nanos(nanos: u64) -> Self {
        Timestamp(nanos)
    }

    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(millis.saturating_mul(1_000_000))
    }

    pub const fn from_secs(secs: u64) -> Self {
        Timestamp(secs.saturating_mul(NANOS_PER_SEC))
    }

    /// Converte segundos decimais (ex.: `0.5`) em timestamp.
    ///
    /// Rejeita NaN, valores negativos e valores fora do intervalo de `u64`.
    pub fn try_from_secs_f64(secs: f64) -> Result<Self, StoreError> {
        let duration = Duration::try_from_secs_f64(secs)
            .map_err(|_| StoreError::InvalidTimestamp(secs.to_string()))?;
        u64::try_from(duration.as_nanos())
            .map(Timestamp)
            .map_err(|_| StoreError::InvalidTimestamp(secs.to_string()))
    }

    /// Relógio de parede atual. Antes da época UNIX vira `ZERO`.
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Timestamp(u64::try_from(since_epoch.as_nanos()).unwrap_or(u64::MAX))
    }

    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// `None` quando o resultado não cabe em `u64` (tratado como +∞ pelo resolver).
    pub fn checked_add(self, duration: Duration) -> Option<Timestamp> {
        let nanos = u64::try_from(duration.as_nanos()).ok()?;
        self.0.checked_add(nanos).map(Timestamp)
    }

    pub fn saturating_add(self, duration: Duration) -> Timestamp {
        self.checked_add(duration).unwrap_or(Timestamp::MAX)
    }

    pub fn saturating_sub(self, duration: Duration) -> Timestamp {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_sub(nanos))
    }

    /// Distância até `earlier`; zero se `earlier` for posterior.
    pub fn duration_since(self, earlier: Timestamp) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0 / NANOS_PER_SEC;
        let frac = self.0 % NANOS_PER_SEC;
        if frac == 0 {
            write!(f, "{secs}s")
        } else {
            let frac = format!("{frac:09}");
            write!(f, "{secs}.{}s", frac.trim_end_matches('0'))
        }
    }
}
