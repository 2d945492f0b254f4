use esp_println::println;
use heapless::Vec;

use crate::app::config::{CANDIDATES_MAX, KNOWN_CREDENTIALS_MAX};

use super::candidate::{Candidate, KnownCredential, ScanRecord, SignalQuality};
use super::credentials::CredentialSlots;
use super::reconnect::{ReconnectCache, ReconnectRecord};

/// Priority-ordered list of access-point attempts for one scan cycle.
///
/// `refresh` rebuilds the list from a scan table: every visible station is
/// matched against every configured credential (several credentials may share
/// one SSID), hidden stations are queued for per-credential resolution, and
/// the result is sorted strongest-signal-first. `advance` then drains the
/// list one offering at a time; a hidden entry at the front is re-offered
/// once per known credential before it is removed, and every usable offering
/// refreshes the retained fast-reconnect record.
pub(crate) struct CandidateList<S, C> {
    slots: S,
    cache: C,
    known: Vec<KnownCredential, KNOWN_CREDENTIALS_MAX>,
    known_cursor: usize,
    candidates: Vec<Candidate, CANDIDATES_MAX>,
    current: Option<Candidate>,
    needs_reload: bool,
}

impl<S: CredentialSlots, C: ReconnectCache> CandidateList<S, C> {
    pub(crate) fn new(slots: S, cache: C) -> Self {
        let mut list = Self {
            slots,
            cache,
            known: Vec::new(),
            known_cursor: 0,
            candidates: Vec::new(),
            current: None,
            needs_reload: false,
        };
        list.reload_known();
        // Lets the first attempt after a warm reset skip the scan wait.
        list.seed_from_cache();
        list
    }

    /// Rebuild the candidate sequence from a fresh scan table. Idempotent for
    /// identical records and unchanged credentials.
    pub(crate) fn refresh(&mut self, records: &[ScanRecord]) {
        if self.needs_reload {
            self.reload_known();
        }
        self.candidates.clear();
        self.seed_from_cache();
        self.known_cursor = 0;

        for record in records {
            self.merge(record);
        }

        self.known.retain(|entry| entry.usable());
        self.candidates.retain(|candidate| candidate.usable());
        self.sort_candidates();

        for candidate in &self.candidates {
            if let SignalQuality::Scanned(rssi) = candidate.signal {
                println!(
                    "net: scan result: ssid={} bssid={} channel={} rssi={} slot={} hidden={}",
                    candidate.ssid,
                    candidate.bssid_str(),
                    candidate.channel,
                    rssi,
                    candidate.slot,
                    candidate.hidden
                );
            }
        }
    }

    /// Offer the next attempt. Returns `false` once the cycle is exhausted.
    /// The offered entry is exposed through `current`; callers re-check its
    /// usability, since a hidden entry that ran out of credentials is still
    /// offered (and consumed) unresolved.
    pub(crate) fn advance(&mut self) -> bool {
        if self.candidates.is_empty() {
            return false;
        }
        if self.needs_reload {
            // Deliberately touches `known` only: candidates merged from the
            // old credentials stay queued and the hidden-resolution cursor
            // keeps its position for the rest of this cycle.
            self.reload_known();
        }

        let mut working = self.candidates[0].clone();
        let mut must_pop = true;

        if working.hidden {
            if self.known_cursor < self.known.len() {
                let entry = &self.known[self.known_cursor];
                working.ssid = entry.ssid.clone();
                working.key = entry.key.clone();
                working.slot = entry.slot;
                self.known_cursor += 1;
            }
            if self.known_cursor < self.known.len() {
                // Same hidden entry gets re-offered with the next credential.
                must_pop = false;
            }
        }

        if working.usable() {
            self.cache.store(ReconnectRecord {
                slot: working.slot,
                bssid: working.bssid,
                channel: working.channel,
            });
        }
        self.current = Some(working);

        if must_pop {
            self.known_cursor = 0;
            self.candidates.remove(0);
        }
        true
    }

    pub(crate) fn current(&self) -> Option<&Candidate> {
        self.current.as_ref()
    }

    /// Strongest genuine scan hit, never a quick-connect seed.
    pub(crate) fn best_scan_result(&self) -> Option<&Candidate> {
        self.candidates
            .iter()
            .find(|candidate| candidate.signal.is_scanned())
    }

    pub(crate) fn has_known_credentials(&mut self) -> bool {
        if self.needs_reload {
            self.reload_known();
        }
        !self.known.is_empty()
    }

    /// Owner-pushed invalidation token; the reload itself happens lazily on
    /// the next refresh, advance, or credential query.
    pub(crate) fn invalidate_credentials(&mut self) {
        self.needs_reload = true;
    }

    /// Mutable access to the injected slot store, for owners that also
    /// service provisioning writes. Pair mutations with
    /// `invalidate_credentials`.
    pub(crate) fn slots_mut(&mut self) -> &mut S {
        &mut self.slots
    }

    /// Sole writer of `known`: read slots sequentially from 1, stopping at
    /// the first gap. Candidates and the resolution cursor are left alone;
    /// callers reset the cursor where the protocol requires it.
    fn reload_known(&mut self) {
        self.needs_reload = false;
        self.known.clear();

        let mut slot = 1u8;
        while let Some(credential) = self.slots.read_slot(slot) {
            let entry = KnownCredential {
                slot,
                ssid: credential.ssid,
                key: credential.key,
            };
            if self.known.push(entry).is_err() {
                break;
            }
            slot = match slot.checked_add(1) {
                Some(next) => next,
                None => break,
            };
        }

        self.known.retain(|entry| entry.usable());
    }

    /// Install the retained last-association record as the immediate
    /// selection, when it still resolves to a usable credential naming a
    /// concrete station. Never inserted into the candidate sequence.
    fn seed_from_cache(&mut self) {
        let record = self.cache.load();
        if record.slot == 0 {
            return;
        }
        let Some(credential) = self.slots.read_slot(record.slot) else {
            return;
        };
        let candidate = Candidate {
            ssid: credential.ssid,
            key: credential.key,
            bssid: record.bssid,
            channel: record.channel,
            signal: SignalQuality::QuickConnectSeed,
            slot: record.slot,
            hidden: false,
        };
        if candidate.usable() && candidate.allow_quick_connect() {
            self.current = Some(candidate);
        }
    }

    fn merge(&mut self, record: &ScanRecord) {
        let tentative = Candidate::from_scan(record);

        if tentative.hidden {
            // Resolved later, one known credential per offering.
            let _ = self.candidates.push(tentative);
            return;
        }
        if tentative.ssid.is_empty() {
            return;
        }

        for entry in &self.known {
            if entry.ssid != tentative.ssid {
                continue;
            }
            let mut matched = tentative.clone();
            matched.key = entry.key.clone();
            matched.slot = entry.slot;
            if matched.usable() {
                // No early exit: several credentials may be configured for
                // one SSID, and several stations may broadcast it.
                let _ = self.candidates.push(matched);
            }
        }
    }

    fn sort_candidates(&mut self) {
        // Insertion sort: core has no allocator-free stable sort, and
        // equal-signal candidates must keep their scan order.
        for i in 1..self.candidates.len() {
            let mut j = i;
            while j > 0 && self.candidates[j - 1].signal.rank() < self.candidates[j].signal.rank() {
                self.candidates.swap(j - 1, j);
                j -= 1;
            }
        }
    }
}
