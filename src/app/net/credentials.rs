use embedded_storage::{ReadStorage, Storage};
use esp_storage::FlashStorage;

use crate::app::config::{
    CRED_SLOT_RECORD_LEN, CRED_STORE_MAGIC, CRED_STORE_VERSION, KNOWN_CREDENTIALS_MAX,
    WIFI_PASSPHRASE_MAX, WIFI_SSID_MAX,
};

use super::candidate::{KeyBuf, SsidBuf};

/// One configured (ssid, key) pair as returned by the slot store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SlotCredential {
    pub(crate) ssid: SsidBuf,
    pub(crate) key: KeyBuf,
}

/// Provisioning request routed to the slot store's owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum CredentialCommand {
    Set { slot: u8, credential: SlotCredential },
    Clear { slot: u8 },
}

/// Indexed credential storage. Slot 0 is the reserved "unset" value and never
/// resolves; a `None` return ends sequential enumeration at the first gap.
pub(crate) trait CredentialSlots {
    fn read_slot(&mut self, slot: u8) -> Option<SlotCredential>;
}

const SSID_OFFSET: usize = 8;
const KEY_OFFSET: usize = SSID_OFFSET + WIFI_SSID_MAX;

fn encode_slot_record(
    slot: u8,
    credential: &SlotCredential,
    out: &mut [u8; CRED_SLOT_RECORD_LEN],
) -> Result<(), ()> {
    let ssid = credential.ssid.as_bytes();
    let key = credential.key.as_bytes();
    if slot == 0 || ssid.is_empty() || ssid.len() > WIFI_SSID_MAX || key.len() > WIFI_PASSPHRASE_MAX
    {
        return Err(());
    }

    out.fill(0xFF);
    out[0..4].copy_from_slice(&CRED_STORE_MAGIC.to_le_bytes());
    out[4] = CRED_STORE_VERSION;
    out[5] = slot;
    out[6] = ssid.len() as u8;
    out[7] = key.len() as u8;
    out[SSID_OFFSET..SSID_OFFSET + ssid.len()].copy_from_slice(ssid);
    out[KEY_OFFSET..KEY_OFFSET + key.len()].copy_from_slice(key);
    out[CRED_SLOT_RECORD_LEN - 1] = checksum8(&out[..CRED_SLOT_RECORD_LEN - 1]);
    Ok(())
}

fn decode_slot_record(slot: u8, record: &[u8; CRED_SLOT_RECORD_LEN]) -> Option<SlotCredential> {
    if record.iter().all(|&byte| byte == 0xFF) {
        return None;
    }
    if u32::from_le_bytes([record[0], record[1], record[2], record[3]]) != CRED_STORE_MAGIC {
        return None;
    }
    if record[4] != CRED_STORE_VERSION || record[5] != slot {
        return None;
    }
    let ssid_len = record[6] as usize;
    let key_len = record[7] as usize;
    if ssid_len == 0 || ssid_len > WIFI_SSID_MAX || key_len > WIFI_PASSPHRASE_MAX {
        return None;
    }
    let expected = checksum8(&record[..CRED_SLOT_RECORD_LEN - 1]);
    if record[CRED_SLOT_RECORD_LEN - 1] != expected {
        return None;
    }

    let ssid = core::str::from_utf8(&record[SSID_OFFSET..SSID_OFFSET + ssid_len]).ok()?;
    let key = core::str::from_utf8(&record[KEY_OFFSET..KEY_OFFSET + key_len]).ok()?;
    Some(SlotCredential {
        ssid: SsidBuf::try_from(ssid).ok()?,
        key: KeyBuf::try_from(key).ok()?,
    })
}

/// Credential slots persisted as fixed-size records in the last flash sector.
pub(crate) struct FlashCredentialStore<'d> {
    flash: FlashStorage<'d>,
    base: u32,
}

impl<'d> FlashCredentialStore<'d> {
    pub(crate) fn new(flash_peripheral: esp_hal::peripherals::FLASH<'d>) -> Self {
        let flash = FlashStorage::new(flash_peripheral).multicore_auto_park();
        let capacity = flash.capacity() as u32;
        let base = capacity.saturating_sub(FlashStorage::SECTOR_SIZE);
        Self { flash, base }
    }

    pub(crate) fn write_slot(&mut self, slot: u8, credential: &SlotCredential) -> bool {
        if self.read_slot(slot).as_ref() == Some(credential) {
            return true;
        }
        let mut record = [0u8; CRED_SLOT_RECORD_LEN];
        if encode_slot_record(slot, credential, &mut record).is_err() {
            return false;
        }
        let Some(offset) = self.slot_offset(slot) else {
            return false;
        };
        self.flash.write(offset, &record).is_ok()
    }

    pub(crate) fn clear_slot(&mut self, slot: u8) -> bool {
        let Some(offset) = self.slot_offset(slot) else {
            return false;
        };
        let record = [0xFFu8; CRED_SLOT_RECORD_LEN];
        self.flash.write(offset, &record).is_ok()
    }

    fn slot_offset(&self, slot: u8) -> Option<u32> {
        if slot == 0 || slot as usize > KNOWN_CREDENTIALS_MAX {
            return None;
        }
        Some(self.base + (slot as u32 - 1) * CRED_SLOT_RECORD_LEN as u32)
    }
}

impl CredentialSlots for FlashCredentialStore<'_> {
    fn read_slot(&mut self, slot: u8) -> Option<SlotCredential> {
        let offset = self.slot_offset(slot)?;
        let mut record = [0u8; CRED_SLOT_RECORD_LEN];
        self.flash.read(offset, &mut record).ok()?;
        decode_slot_record(slot, &record)
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

    fn credential(ssid: &str, key: &str) -> SlotCredential {
        SlotCredential {
            ssid: SsidBuf::try_from(ssid).expect("fits"),
            key: KeyBuf::try_from(key).expect("fits"),
        }
    }

    #[test]
    fn slot_record_roundtrip() {
        let stored = credential("backyard", "hunter2hunter2");
        let mut record = [0u8; CRED_SLOT_RECORD_LEN];
        encode_slot_record(3, &stored, &mut record).expect("encode");
        assert_eq!(decode_slot_record(3, &record), Some(stored));
    }

    #[test]
    fn open_network_roundtrips_with_empty_key() {
        let stored = credential("lobby", "");
        let mut record = [0u8; CRED_SLOT_RECORD_LEN];
        encode_slot_record(1, &stored, &mut record).expect("encode");
        assert_eq!(decode_slot_record(1, &record), Some(stored));
    }

    #[test]
    fn erased_record_reads_as_absent() {
        let record = [0xFFu8; CRED_SLOT_RECORD_LEN];
        assert_eq!(decode_slot_record(1, &record), None);
    }

    #[test]
    fn corrupt_checksum_reads_as_absent() {
        let mut record = [0u8; CRED_SLOT_RECORD_LEN];
        encode_slot_record(2, &credential("backyard", "hunter2hunter2"), &mut record)
            .expect("encode");
        record[SSID_OFFSET] ^= 0x01;
        assert_eq!(decode_slot_record(2, &record), None);
    }

    #[test]
    fn record_bound_to_its_slot_index() {
        let mut record = [0u8; CRED_SLOT_RECORD_LEN];
        encode_slot_record(2, &credential("backyard", "hunter2hunter2"), &mut record)
            .expect("encode");
        assert_eq!(decode_slot_record(4, &record), None);
    }

    #[test]
    fn slot_zero_never_encodes() {
        let mut record = [0u8; CRED_SLOT_RECORD_LEN];
        assert!(encode_slot_record(0, &credential("backyard", "hunter2"), &mut record).is_err());
    }
}
