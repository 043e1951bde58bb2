use anyhow::Result;
use redis::AsyncCommands;

/// Fixed dedup retention window. Bounds how long duplicate protection
/// lasts, not how long an event stays in flight.
const IDEMPOTENCY_TTL_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdempotencyStatus {
    Processing,
    Succeeded,
    Failed,
}

impl IdempotencyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(Self::Processing),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClaimOutcome {
    pub is_new: bool,
    pub existing_status: Option<IdempotencyStatus>,
}

#[derive(Clone)]
pub struct IdempotencyStore {
    pub client: redis::Client,
}

impl IdempotencyStore {
    pub fn new(redis_url: &str) -> Result<Self> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
        })
    }

    fn redis_key(key: &str) -> String {
        format!("idempotency:{key}")
    }

    /// Atomic create-if-absent claim. Exactly one caller per key observes
    /// `is_new = true`; every other caller gets the winner's current status.
    /// A store failure propagates: skipping the claim would risk duplicate
    /// side effects downstream.
    pub async fn claim(&self, key: &str) -> Result<ClaimOutcome> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let redis_key = Self::redis_key(key);

        let set: Option<String> = redis::cmd("SET")
            .arg(&redis_key)
            .arg(IdempotencyStatus::Processing.as_str())
            .arg("NX")
            .arg("EX")
            .arg(IDEMPOTENCY_TTL_SECS)
            .query_async(&mut conn)
            .await?;

        if set.is_some() {
            return Ok(ClaimOutcome {
                is_new: true,
                existing_status: None,
            });
        }

        // Lost to a concurrent claimant or the key already existed; re-read
        // so the caller sees the winner's status.
        let existing: Option<String> = conn.get(&redis_key).await?;
        Ok(ClaimOutcome {
            is_new: false,
            existing_status: existing.as_deref().and_then(IdempotencyStatus::parse),
        })
    }

    /// Unconditional terminal overwrite with a fresh TTL.
    pub async fn set_terminal_status(&self, key: &str, status: IdempotencyStatus) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn
            .set_ex(Self::redis_key(key), status.as_str(), IDEMPOTENCY_TTL_SECS)
            .await?;
        Ok(())
    }

    pub async fn read(&self, key: &str) -> Result<Option<IdempotencyStatus>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(Self::redis_key(key)).await?;
        Ok(value.as_deref().and_then(IdempotencyStatus::parse))
    }
}
