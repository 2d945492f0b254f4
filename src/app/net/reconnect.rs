use esp_hal::ram;

use crate::app::config::{RECONNECT_MAGIC, RECONNECT_RECORD_LEN, RECONNECT_VERSION};

/// Last successfully offered association target. Retained across a warm
/// reset so the next boot can try it before the first scan completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ReconnectRecord {
    pub(crate) slot: u8,
    pub(crate) bssid: [u8; 6],
    pub(crate) channel: u8,
}

impl ReconnectRecord {
    pub(crate) const fn unset() -> Self {
        Self {
            slot: 0,
            bssid: [0; 6],
            channel: 0,
        }
    }

    pub(crate) fn record_bytes(self) -> [u8; RECONNECT_RECORD_LEN] {
        let mut record = [0xFFu8; RECONNECT_RECORD_LEN];
        record[0..4].copy_from_slice(&RECONNECT_MAGIC.to_le_bytes());
        record[4] = RECONNECT_VERSION;
        record[5] = self.slot;
        record[6..12].copy_from_slice(&self.bssid);
        record[12] = self.channel;
        record[RECONNECT_RECORD_LEN - 1] = checksum8(&record[..RECONNECT_RECORD_LEN - 1]);
        record
    }

    pub(crate) fn from_record(record: &[u8; RECONNECT_RECORD_LEN]) -> Option<Self> {
        if record.iter().all(|&byte| byte == 0xFF) {
            return None;
        }
        if u32::from_le_bytes([record[0], record[1], record[2], record[3]]) != RECONNECT_MAGIC {
            return None;
        }
        if record[4] != RECONNECT_VERSION {
            return None;
        }
        let expected = checksum8(&record[..RECONNECT_RECORD_LEN - 1]);
        if record[RECONNECT_RECORD_LEN - 1] != expected {
            return None;
        }
        let mut bssid = [0u8; 6];
        bssid.copy_from_slice(&record[6..12]);
        Some(Self {
            slot: record[5],
            bssid,
            channel: record[12],
        })
    }
}

/// Retained storage for the last-association record. `load` must answer the
/// unset record rather than fail when the region holds garbage.
pub(crate) trait ReconnectCache {
    fn load(&mut self) -> ReconnectRecord;
    fn store(&mut self, record: ReconnectRecord);
}

// Lives in RTC fast RAM and is skipped by runtime init, so the record
// survives a warm reset; the checksum gates the garbage left by a cold boot.
#[ram(rtc_fast, persistent)]
static mut RETAINED_RECONNECT: [u8; RECONNECT_RECORD_LEN] = [0xFF; RECONNECT_RECORD_LEN];

pub(crate) struct RtcReconnectCache(());

impl RtcReconnectCache {
    /// Single instance, created once during network setup and owned by the
    /// connection task.
    pub(crate) const fn new() -> Self {
        Self(())
    }
}

impl ReconnectCache for RtcReconnectCache {
    fn load(&mut self) -> ReconnectRecord {
        // Safety: single writer; only the connection task touches the
        // retained region.
        let record = unsafe { core::ptr::addr_of!(RETAINED_RECONNECT).read() };
        ReconnectRecord::from_record(&record).unwrap_or(ReconnectRecord::unset())
    }

    fn store(&mut self, record: ReconnectRecord) {
        let bytes = record.record_bytes();
        // Safety: single writer (see load).
        unsafe { core::ptr::addr_of_mut!(RETAINED_RECONNECT).write(bytes) };
    }
}

fn checksum8(bytes: &[u8]) -> u8 {
    let mut acc = 0x5Au8;
    for &byte in bytes {
        acc ^= byte.rotate_left(1);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_record_roundtrip() {
        let record = ReconnectRecord {
            slot: 2,
            bssid: [0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x42],
            channel: 11,
        };
        let bytes = record.record_bytes();
        assert_eq!(ReconnectRecord::from_record(&bytes), Some(record));
    }

    #[test]
    fn unset_record_roundtrips_with_slot_zero() {
        let bytes = ReconnectRecord::unset().record_bytes();
        let decoded = ReconnectRecord::from_record(&bytes).expect("decode");
        assert_eq!(decoded.slot, 0);
    }

    #[test]
    fn erased_region_reads_as_absent() {
        let bytes = [0xFFu8; RECONNECT_RECORD_LEN];
        assert_eq!(ReconnectRecord::from_record(&bytes), None);
    }

    #[test]
    fn flipped_bit_reads_as_absent() {
        let mut bytes = ReconnectRecord {
            slot: 1,
            bssid: [1, 2, 3, 4, 5, 6],
            channel: 1,
        }
        .record_bytes();
        bytes[6] ^= 0x80;
        assert_eq!(ReconnectRecord::from_record(&bytes), None);
    }

    #[test]
    fn rejects_other_version() {
        let mut bytes = ReconnectRecord::unset().record_bytes();
        bytes[4] = 9;
        bytes[RECONNECT_RECORD_LEN - 1] = checksum8(&bytes[..RECONNECT_RECORD_LEN - 1]);
        assert_eq!(ReconnectRecord::from_record(&bytes), None);
    }
}
