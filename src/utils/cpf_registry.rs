use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use moka::future::Cache;
use sqlx::SqlitePool;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::info;

/// Expected capacity and false-positive rate.
/// Tune these based on real user counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;
const CACHE_CAPACITY: u64 = 500_000;
const CACHE_TTL: Duration = Duration::from_secs(86_400);

/// In-memory view of which national IDs (CPF) are already registered.
///
/// The cuckoo filter answers "definitely free", the cache answers "taken";
/// anything else falls through to the database. The UNIQUE index on
/// `usuarios.cpf` stays the final authority.
#[derive(Clone)]
pub struct CpfRegistry {
    filter: Arc<RwLock<CuckooFilter<String>>>,
    taken: Cache<String, bool>,
}

impl Default for CpfRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn normalize(cpf: &str) -> String {
    cpf.trim().to_string()
}

impl CpfRegistry {
    pub fn new() -> Self {
        Self {
            filter: Arc::new(RwLock::new(CuckooFilter::new(
                FILTER_CAPACITY,
                FALSE_POSITIVE_RATE,
            ))),
            taken: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    /// Check if a CPF might exist (false positives possible)
    pub fn might_exist(&self, cpf: &str) -> bool {
        let cpf = normalize(cpf);
        self.filter
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&cpf)
    }

    /// Record a freshly stored CPF in both filter and cache.
    pub async fn mark_taken(&self, cpf: &str) {
        let cpf = normalize(cpf);
        self.filter
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .add(&cpf);
        self.taken.insert(cpf, true).await;
    }

    /// Forget a CPF after its user is deleted or changes CPF.
    pub async fn release(&self, cpf: &str) {
        let cpf = normalize(cpf);
        self.filter
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&cpf);
        self.taken.invalidate(&cpf).await;
    }

    pub async fn is_cached_taken(&self, cpf: &str) -> bool {
        self.taken.get(&normalize(cpf)).await.unwrap_or(false)
    }

    /// true  => CPF AVAILABLE
    /// false => CPF TAKEN
    pub async fn is_available(&self, pool: &SqlitePool, cpf: &str) -> Result<bool, sqlx::Error> {
        // 1. cuckoo filter: fast negative
        if !self.might_exist(cpf) {
            return Ok(true);
        }

        // 2. cache: fast positive
        if self.is_cached_taken(cpf).await {
            return Ok(false);
        }

        // 3. database fallback
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM usuarios WHERE cpf = ? LIMIT 1)",
        )
        .bind(normalize(cpf))
        .fetch_one(pool)
        .await?;

        Ok(!exists)
    }

    /// Warm up the filter with every stored CPF using streaming + batching
    pub async fn warmup_filter(&self, pool: &SqlitePool, batch_size: usize) -> Result<()> {
        let mut stream = sqlx::query_scalar::<_, String>("SELECT cpf FROM usuarios").fetch(pool);

        let mut batch = Vec::with_capacity(batch_size);
        let mut total = 0usize;

        while let Some(row) = stream.next().await {
            let cpf = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;
            batch.push(normalize(&cpf));
            total += 1;

            if batch.len() == batch_size {
                self.insert_batch(&batch);
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.insert_batch(&batch);
        }

        info!("CPF filter warmup complete: {} users", total);
        Ok(())
    }

    /// Load only users with a recent login into the cache (batched)
    pub async fn warmup_cache(&self, pool: &SqlitePool, days: u32, batch_size: usize) -> Result<()> {
        let mut stream = sqlx::query_scalar::<_, String>(
            r#"
            SELECT cpf
            FROM usuarios
            WHERE last_login_at >= datetime('now', ?)
            ORDER BY last_login_at DESC
            "#,
        )
        .bind(format!("-{days} days"))
        .fetch(pool);

        let mut batch = Vec::with_capacity(batch_size);
        let mut total = 0usize;

        while let Some(row) = stream.next().await {
            batch.push(normalize(&row?));
            total += 1;

            if batch.len() >= batch_size {
                self.cache_batch(&batch).await;
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.cache_batch(&batch).await;
        }

        info!(
            "CPF cache warmup complete: {} recent users (last {} days)",
            total, days
        );
        Ok(())
    }

    fn insert_batch(&self, cpfs: &[String]) {
        let mut filter = self
            .filter
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        for cpf in cpfs {
            filter.add(cpf);
        }
    }

    async fn cache_batch(&self, cpfs: &[String]) {
        let inserts: Vec<_> = cpfs
            .iter()
            .map(|cpf| self.taken.insert(cpf.clone(), true))
            .collect();

        futures::future::join_all(inserts).await;
    }
}
