use embassy_time::Duration;
use esp_radio::wifi::{AccessPointInfo, ScanConfig, ScanTypeConfig};

use crate::app::config::{NET_SCAN_ACTIVE_MAX_MS, NET_SCAN_ACTIVE_MIN_MS, SCAN_RESULTS_MAX};

use super::candidate::{ScanRecord, SsidBuf};

pub(super) fn active_scan_config() -> ScanConfig<'static> {
    ScanConfig::default()
        .with_show_hidden(true)
        .with_max(SCAN_RESULTS_MAX)
        .with_scan_type(ScanTypeConfig::Active {
            min: Duration::from_millis(NET_SCAN_ACTIVE_MIN_MS).into(),
            max: Duration::from_millis(NET_SCAN_ACTIVE_MAX_MS).into(),
        })
}

/// Hidden stations show up with an empty SSID when `show_hidden` is set.
/// Overlong SSIDs are cut at the buffer boundary; being unmatched against any
/// configured credential, they fall out during the merge.
pub(super) fn scan_record_from_ap(ap: &AccessPointInfo) -> ScanRecord {
    ScanRecord {
        ssid: bounded_ssid(&ap.ssid),
        bssid: ap.bssid,
        channel: ap.channel,
        rssi: ap.signal_strength,
        hidden: ap.ssid.is_empty(),
    }
}

fn bounded_ssid(ssid: &str) -> SsidBuf {
    let mut out = SsidBuf::new();
    for ch in ssid.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ssid_maps_to_hidden() {
        let mut ap = AccessPointInfo::default();
        ap.bssid = [1, 2, 3, 4, 5, 6];
        ap.channel = 6;
        ap.signal_strength = -61;
        let record = scan_record_from_ap(&ap);
        assert!(record.hidden);
        assert!(record.ssid.is_empty());
        assert_eq!(record.rssi, -61);
    }

    #[test]
    fn broadcast_ssid_is_not_hidden() {
        let mut ap = AccessPointInfo::default();
        ap.ssid = "Home".into();
        let record = scan_record_from_ap(&ap);
        assert!(!record.hidden);
        assert_eq!(record.ssid.as_str(), "Home");
    }

    #[test]
    fn overlong_ssid_is_cut_at_buffer_boundary() {
        let long = "0123456789012345678901234567890123456789";
        assert_eq!(bounded_ssid(long).len(), 32);
        assert_eq!(bounded_ssid(long).as_str(), &long[..32]);
    }
}
