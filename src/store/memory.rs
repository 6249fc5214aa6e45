//! In-memory [`ReferenceStore`] implementation for tests.
//!
//! Uses `HashMap`s behind `std::sync::RwLock`. Search is
//! lowercase-substring matching to mirror the ILIKE semantics of the
//! PostgreSQL implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{EtimClass, ProductClassification, UnspscCode};

use super::{ReferenceStore, SearchFilter};

#[derive(Default)]
pub struct MemoryStore {
    codes: RwLock<HashMap<String, UnspscCode>>,
    etim: RwLock<HashMap<(String, String), EtimClass>>,
    classifications: RwLock<HashMap<(String, String, String), ProductClassification>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a store outage: every call errors until restored. For
    /// tests exercising transient-fault behavior.
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            anyhow::bail!("store connection refused");
        }
        Ok(())
    }

    /// Stored classifications, for test assertions.
    pub fn classifications(&self) -> Vec<ProductClassification> {
        self.classifications.read().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl ReferenceStore for MemoryStore {
    async fn get_code(&self, code: &str) -> Result<Option<UnspscCode>> {
        self.check_available()?;
        Ok(self.codes.read().unwrap().get(code).cloned())
    }

    async fn search_codes(
        &self,
        term: &str,
        filter: &SearchFilter,
        limit: i64,
    ) -> Result<Vec<UnspscCode>> {
        self.check_available()?;
        let term_lower = term.to_lowercase();
        let prefix = filter
            .family
            .clone()
            .or_else(|| filter.segment.clone())
            .unwrap_or_default();
        let mut matches: Vec<UnspscCode> = self
            .codes
            .read()
            .unwrap()
            .values()
            .filter(|c| c.code.starts_with(&prefix))
            .filter(|c| {
                c.title.to_lowercase().contains(&term_lower)
                    || c.description
                        .as_deref()
                        .map(|d| d.to_lowercase().contains(&term_lower))
                        .unwrap_or(false)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.code.cmp(&b.code));
        matches.truncate(limit as usize);
        Ok(matches)
    }

    async fn codes_with_prefix(&self, prefix: &str, limit: i64) -> Result<Vec<UnspscCode>> {
        self.check_available()?;
        let mut matches: Vec<UnspscCode> = self
            .codes
            .read()
            .unwrap()
            .values()
            .filter(|c| c.code.starts_with(prefix))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.code.cmp(&b.code));
        matches.truncate(limit as usize);
        Ok(matches)
    }

    async fn segment_exists(&self, segment: &str) -> Result<bool> {
        self.check_available()?;
        Ok(self
            .codes
            .read()
            .unwrap()
            .values()
            .any(|c| c.segment.as_deref() == Some(segment)))
    }

    async fn segment_title(&self, segment: &str) -> Result<Option<String>> {
        self.check_available()?;
        Ok(self
            .codes
            .read()
            .unwrap()
            .values()
            .find(|c| c.segment.as_deref() == Some(segment) && c.level == 1)
            .map(|c| c.title.clone()))
    }

    async fn upsert_code(&self, record: &UnspscCode) -> Result<()> {
        self.check_available()?;
        self.codes
            .write()
            .unwrap()
            .insert(record.code.clone(), record.clone());
        Ok(())
    }

    async fn count_codes(&self) -> Result<i64> {
        self.check_available()?;
        Ok(self.codes.read().unwrap().len() as i64)
    }

    async fn get_etim_class(&self, class_code: &str, version: &str) -> Result<Option<EtimClass>> {
        self.check_available()?;
        Ok(self
            .etim
            .read()
            .unwrap()
            .get(&(class_code.to_string(), version.to_string()))
            .cloned())
    }

    async fn upsert_etim_class(&self, record: &EtimClass) -> Result<()> {
        self.check_available()?;
        self.etim.write().unwrap().insert(
            (record.class_code.clone(), record.version.clone()),
            record.clone(),
        );
        Ok(())
    }

    async fn count_etim_classes(&self) -> Result<i64> {
        self.check_available()?;
        Ok(self.etim.read().unwrap().len() as i64)
    }

    async fn upsert_classification(&self, record: &ProductClassification) -> Result<()> {
        self.check_available()?;
        let key = (
            record.product_id.clone(),
            record.unspsc_code.clone().unwrap_or_default(),
            record.etim_class.clone().unwrap_or_default(),
        );
        self.classifications.write().unwrap().insert(key, record.clone());
        Ok(())
    }
}

/// Store double that fails every call, simulating a database outage.
pub struct FailingStore;

#[async_trait]
impl ReferenceStore for FailingStore {
    async fn get_code(&self, _code: &str) -> Result<Option<UnspscCode>> {
        anyhow::bail!("store connection refused")
    }

    async fn search_codes(
        &self,
        _term: &str,
        _filter: &SearchFilter,
        _limit: i64,
    ) -> Result<Vec<UnspscCode>> {
        anyhow::bail!("store connection refused")
    }

    async fn codes_with_prefix(&self, _prefix: &str, _limit: i64) -> Result<Vec<UnspscCode>> {
        anyhow::bail!("store connection refused")
    }

    async fn segment_exists(&self, _segment: &str) -> Result<bool> {
        anyhow::bail!("store connection refused")
    }

    async fn segment_title(&self, _segment: &str) -> Result<Option<String>> {
        anyhow::bail!("store connection refused")
    }

    async fn upsert_code(&self, _record: &UnspscCode) -> Result<()> {
        anyhow::bail!("store connection refused")
    }

    async fn count_codes(&self) -> Result<i64> {
        anyhow::bail!("store connection refused")
    }

    async fn get_etim_class(&self, _class_code: &str, _version: &str) -> Result<Option<EtimClass>> {
        anyhow::bail!("store connection refused")
    }

    async fn upsert_etim_class(&self, _record: &EtimClass) -> Result<()> {
        anyhow::bail!("store connection refused")
    }

    async fn count_etim_classes(&self) -> Result<i64> {
        anyhow::bail!("store connection refused")
    }

    async fn upsert_classification(&self, _record: &ProductClassification) -> Result<()> {
        anyhow::bail!("store connection refused")
    }
}
