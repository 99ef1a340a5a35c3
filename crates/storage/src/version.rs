use std::time::Duration;

use evokv_common::Timestamp;

/// Um fato imutável da vida de uma chave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Version<V> {
    /// Valor gravado em `created_at`, opcionalmente com TTL.
    Put {
        value: V,
        created_at: Timestamp,
        ttl: Option<Duration>,
    },
    /// Marca de remoção. Nunca é "visível"; só encerra a janela anterior.
    Tombstone { created_at: Timestamp },
}

impl<V> Version<V> {
    pub fn put(value: V, created_at: Timestamp, ttl: Option<Duration>) -> Self {
        Version::Put {
            value,
            created_at,
            ttl,
        }
    }

    pub fn tombstone(created_at: Timestamp) -> Self {
        Version::Tombstone { created_at }
    }

    pub fn created_at(&self) -> Timestamp {
        match self {
            Version::Put { created_at, .. } | Version::Tombstone { created_at } => *created_at,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, Version::Tombstone { .. })
    }

    pub fn value(&self) -> Option<&V> {
        match self {
            Version::Put { value, .. } => Some(value),
            Version::Tombstone { .. } => None,
        }
    }

    /// Instante em que o TTL vence. `None` = nunca (sem TTL ou overflow).
    ///
    /// TTL zero vence no próprio `created_at`: a versão nasce expirada.
    pub fn expires_at(&self) -> Option<Timestamp> {
        match self {
            Version::Put {
                created_at,
                ttl: Some(ttl),
                ..
            } => created_at.checked_add(*ttl),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Version::Put { .. } => "put",
            Version::Tombstone { .. } => "tombstone",
        }
    }
}
