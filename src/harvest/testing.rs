//! Fakes shared by the harvest unit tests

use crate::provider::PageSource;
use crate::state::{Item, ItemStatus, Source};
use crate::storage::{ItemSink, SqliteStorage, StorageError, StorageResult};
use crate::{HarvestError, Result};
use async_trait::async_trait;
use std::sync::Mutex;

pub fn items(ids: &[&str]) -> Vec<Item> {
    ids.iter().map(|id| Item::new(*id)).collect()
}

/// Finite cursor-paged source; the cursor is the last id of the previous page
pub struct ScriptedPages {
    pages: Vec<Vec<Item>>,
    fetches: Mutex<Vec<String>>,
    fail_on_fetch: Mutex<Option<usize>>,
}

impl ScriptedPages {
    pub fn new(pages: &[&[&str]]) -> Self {
        Self {
            pages: pages.iter().map(|page| items(page)).collect(),
            fetches: Mutex::new(Vec::new()),
            fail_on_fetch: Mutex::new(None),
        }
    }

    /// Makes the n-th fetch from now (0-based) fail once
    pub fn fail_on_fetch(&self, n: usize) {
        let done = self.fetches.lock().unwrap().len();
        *self.fail_on_fetch.lock().unwrap() = Some(done + n);
    }

    /// Cursors of every fetch so far
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    fn page_after(&self, cursor: &str) -> Vec<Item> {
        let index = if cursor.is_empty() {
            0
        } else {
            self.pages
                .iter()
                .position(|page| page.last().map(|item| item.id.as_str()) == Some(cursor))
                .map(|i| i + 1)
                .unwrap_or(self.pages.len())
        };
        self.pages.get(index).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl PageSource for ScriptedPages {
    async fn fetch_page(&self, source: &Source, cursor: &str) -> Result<Vec<Item>> {
        let attempt = {
            let mut fetches = self.fetches.lock().unwrap();
            fetches.push(cursor.to_string());
            fetches.len() - 1
        };

        let mut fail = self.fail_on_fetch.lock().unwrap();
        if *fail == Some(attempt) {
            *fail = None;
            return Err(HarvestError::Api {
                source_id: source.id.clone(),
                status: 503,
            });
        }

        Ok(self.page_after(cursor))
    }
}

/// Sink that dies on a chosen call, simulating a crash mid-page
pub struct CrashingSink<'a> {
    inner: &'a SqliteStorage,
    crash_on_call: usize,
    calls: Mutex<usize>,
}

impl<'a> CrashingSink<'a> {
    pub fn new(inner: &'a SqliteStorage, crash_on_call: usize) -> Self {
        Self {
            inner,
            crash_on_call,
            calls: Mutex::new(0),
        }
    }
}

impl ItemSink for CrashingSink<'_> {
    fn save(&self, items: &[Item], source: &Source, status: ItemStatus) -> StorageResult<usize> {
        let mut calls = self.calls.lock().unwrap();
        let call = *calls;
        *calls += 1;
        if call == self.crash_on_call {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "simulated crash",
            )));
        }
        self.inner.save(items, source, status)
    }
}
