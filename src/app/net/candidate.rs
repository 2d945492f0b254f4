use core::fmt::Write;

use crate::app::config::{WIFI_PASSPHRASE_MAX, WIFI_PASSPHRASE_MIN, WIFI_SSID_MAX};

pub(crate) type SsidBuf = heapless::String<WIFI_SSID_MAX>;
pub(crate) type KeyBuf = heapless::String<WIFI_PASSPHRASE_MAX>;

/// One row of the scan table handed to the candidate list. Hidden stations
/// arrive with an empty SSID; their credentials are filled in during
/// iteration, not during the merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ScanRecord {
    pub(crate) ssid: SsidBuf,
    pub(crate) bssid: [u8; 6],
    pub(crate) channel: u8,
    pub(crate) rssi: i8,
    pub(crate) hidden: bool,
}

/// Where a candidate's signal figure came from. A quick-connect seed is
/// synthetic and outranks every scanned RSSI so it is tried first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SignalQuality {
    QuickConnectSeed,
    Scanned(i8),
}

impl SignalQuality {
    pub(crate) const fn rank(self) -> i16 {
        match self {
            Self::QuickConnectSeed => i16::MAX,
            Self::Scanned(rssi) => rssi as i16,
        }
    }

    pub(crate) const fn is_scanned(self) -> bool {
        matches!(self, Self::Scanned(_))
    }
}

/// One configured (slot, ssid, key) triple. Slot 0 never appears here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct KnownCredential {
    pub(crate) slot: u8,
    pub(crate) ssid: SsidBuf,
    pub(crate) key: KeyBuf,
}

impl KnownCredential {
    pub(crate) fn usable(&self) -> bool {
        !self.ssid.is_empty() && key_length_ok(self.key.len())
    }
}

/// One access-point attempt: merged from a scan row, or synthesized from the
/// fast-reconnect record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub(crate) ssid: SsidBuf,
    pub(crate) key: KeyBuf,
    pub(crate) bssid: [u8; 6],
    pub(crate) channel: u8,
    pub(crate) signal: SignalQuality,
    pub(crate) slot: u8,
    pub(crate) hidden: bool,
}

impl Candidate {
    pub(crate) fn from_scan(record: &ScanRecord) -> Self {
        Self {
            ssid: record.ssid.clone(),
            key: KeyBuf::new(),
            bssid: record.bssid,
            channel: record.channel,
            signal: SignalQuality::Scanned(record.rssi),
            slot: 0,
            hidden: record.hidden,
        }
    }

    /// An entry with no SSID can still be offered when it is hidden: the
    /// iteration protocol substitutes each known credential in turn. Anything
    /// else needs a resolved SSID and an open-network or valid-length key.
    pub(crate) fn usable(&self) -> bool {
        if self.ssid.is_empty() {
            return self.hidden;
        }
        key_length_ok(self.key.len())
    }

    /// Stricter than `usable`: a cache seed may only become the immediate
    /// selection when it names a concrete station to associate with.
    pub(crate) fn allow_quick_connect(&self) -> bool {
        self.channel != 0 && self.bssid != [0u8; 6]
    }

    pub(crate) fn bssid_str(&self) -> heapless::String<17> {
        let mut out = heapless::String::<17>::new();
        let [a, b, c, d, e, f] = self.bssid;
        let _ = write!(out, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{f:02x}");
        out
    }
}

fn key_length_ok(len: usize) -> bool {
    len == 0 || (WIFI_PASSPHRASE_MIN..=WIFI_PASSPHRASE_MAX).contains(&len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf<const N: usize>(text: &str) -> heapless::String<N> {
        heapless::String::try_from(text).expect("fits")
    }

    fn scanned(ssid: &str, rssi: i8, hidden: bool) -> Candidate {
        Candidate::from_scan(&ScanRecord {
            ssid: buf(ssid),
            bssid: [2, 4, 6, 8, 10, 12],
            channel: 6,
            rssi,
            hidden,
        })
    }

    #[test]
    fn open_network_is_usable_without_key() {
        let candidate = scanned("cafe", -50, false);
        assert!(candidate.usable());
    }

    #[test]
    fn short_key_is_not_usable() {
        let mut candidate = scanned("cafe", -50, false);
        candidate.key = buf("short");
        assert!(!candidate.usable());
    }

    #[test]
    fn key_length_bounds_are_inclusive() {
        let mut candidate = scanned("cafe", -50, false);
        candidate.key = buf("12345678");
        assert!(candidate.usable());
        candidate.key = buf(core::str::from_utf8(&[b'a'; 64]).unwrap());
        assert!(candidate.usable());
    }

    #[test]
    fn empty_ssid_is_usable_only_when_hidden() {
        assert!(scanned("", -50, true).usable());
        assert!(!scanned("", -50, false).usable());
    }

    #[test]
    fn quick_connect_needs_channel_and_bssid() {
        let mut candidate = scanned("cafe", -50, false);
        assert!(candidate.allow_quick_connect());
        candidate.channel = 0;
        assert!(!candidate.allow_quick_connect());
        candidate.channel = 6;
        candidate.bssid = [0u8; 6];
        assert!(!candidate.allow_quick_connect());
    }

    #[test]
    fn seed_outranks_any_scanned_rssi() {
        assert!(SignalQuality::QuickConnectSeed.rank() > SignalQuality::Scanned(i8::MAX).rank());
        assert!(SignalQuality::Scanned(-40).rank() > SignalQuality::Scanned(-60).rank());
        assert!(!SignalQuality::QuickConnectSeed.is_scanned());
        assert!(SignalQuality::Scanned(-1).is_scanned());
    }

    #[test]
    fn bssid_formats_lowercase_hex() {
        let candidate = scanned("cafe", -50, false);
        assert_eq!(candidate.bssid_str().as_str(), "02:04:06:08:0a:0c");
    }
}
