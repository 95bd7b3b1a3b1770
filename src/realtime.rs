// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Balance cache kept fresh by the store's change feed.
//!
//! Events carry no data the cache uses: any number of them only marks the
//! cached balance stale, and the next read refetches it once.

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::models::Balance;
use crate::session::SessionGate;
use crate::store::{codec, select_one, Filter, Store, Subscription, Table};

pub struct RealtimeBridge<'a, S: Store + ?Sized> {
    store: &'a S,
    user_id: String,
    subscription: Option<Subscription>,
    cached: Option<Balance>,
    stale: bool,
    fetches: u64,
}

impl<'a, S: Store + ?Sized> RealtimeBridge<'a, S> {
    pub fn attach(store: &'a S, gate: &SessionGate) -> Result<Self> {
        let user_id = gate.user_id()?.to_string();
        let subscription = store.subscribe(
            Table::Balance,
            Filter::new().eq("user_id", user_id.as_str()),
        )?;
        debug!("realtime balance feed attached for {}", user_id);
        Ok(Self {
            store,
            user_id,
            subscription: Some(subscription),
            cached: None,
            stale: true,
            fetches: 0,
        })
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Number of balance reads issued against the store so far.
    pub fn fetches(&self) -> u64 {
        self.fetches
    }

    pub fn cached(&self) -> Option<&Balance> {
        self.cached.as_ref()
    }

    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Drain pending change events; returns how many arrived.
    pub fn pump(&mut self) -> usize {
        let Some(sub) = &self.subscription else {
            return 0;
        };
        match sub.drain() {
            Some(events) => {
                if !events.is_empty() {
                    debug!(
                        "{} balance change event(s) for {}; invalidating",
                        events.len(),
                        self.user_id
                    );
                    self.invalidate();
                }
                events.len()
            }
            None => {
                warn!("realtime balance feed for {} closed by the store", self.user_id);
                self.subscription = None;
                self.invalidate();
                0
            }
        }
    }

    /// Cached balance, refetched when a change event arrived since the last read.
    pub fn balance(&mut self, gate: &SessionGate) -> Result<Balance> {
        if gate.user_id().ok() != Some(self.user_id.as_str()) {
            self.detach();
            return Err(Error::Unauthenticated);
        }
        self.pump();
        if !self.stale {
            if let Some(b) = &self.cached {
                return Ok(b.clone());
            }
        }
        self.fetches += 1;
        let row = select_one(
            self.store,
            Table::Balance,
            &Filter::new().eq("user_id", self.user_id.as_str()),
        )?
        .ok_or_else(|| Error::not_found(format!("balance record for user {}", self.user_id)))?;
        let balance = codec::balance_from_row(&row)?;
        self.cached = Some(balance.clone());
        self.stale = false;
        Ok(balance)
    }

    pub fn detach(&mut self) {
        if let Some(sub) = self.subscription.take() {
            self.store.unsubscribe(sub.id());
            debug!("realtime balance feed detached for {}", self.user_id);
        }
        self.cached = None;
        self.stale = true;
    }
}

impl<S: Store + ?Sized> Drop for RealtimeBridge<'_, S> {
    fn drop(&mut self) {
        self.detach();
    }
}
