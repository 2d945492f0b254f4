use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};

use super::net::credentials::CredentialCommand;

pub(crate) const UART_BAUD: u32 = 115_200;
// WIFISET + slot + SSID + key + separators fits well within this.
pub(crate) const NET_CMD_BUF_LEN: usize = 160;

pub(crate) const WIFI_SSID_MAX: usize = 32;
// 8..=63 covers WPA/WPA2 passphrases; 64 admits a raw hex PSK.
pub(crate) const WIFI_PASSPHRASE_MIN: usize = 8;
pub(crate) const WIFI_PASSPHRASE_MAX: usize = 64;

// Slot 0 is the reserved "unset" value, so slots 1..=KNOWN_CREDENTIALS_MAX
// are addressable in the flash store.
pub(crate) const KNOWN_CREDENTIALS_MAX: usize = 8;
pub(crate) const SCAN_RESULTS_MAX: usize = 16;
// Every scan row can fan out to several credentials sharing one SSID.
pub(crate) const CANDIDATES_MAX: usize = 24;

// Active scan dwell is per channel; defaults bias toward reliability over
// fastest join.
pub(crate) const NET_SCAN_ACTIVE_MIN_MS: u64 = 600;
pub(crate) const NET_SCAN_ACTIVE_MAX_MS: u64 = 1_500;
// 1.2s between association attempts avoids hot-loop retries while keeping
// candidate rotation responsive.
pub(crate) const NET_ATTEMPT_COOLDOWN_MS: u64 = 1_200;
// 5s before rescanning once a cycle's candidates are exhausted.
pub(crate) const NET_RESCAN_COOLDOWN_MS: u64 = 5_000;

pub(crate) const CRED_STORE_MAGIC: u32 = 0x454C_4353; // "ELCS"
pub(crate) const CRED_STORE_VERSION: u8 = 1;
// magic(4) version(1) slot(1) ssid_len(1) key_len(1) ssid(32) key(64) checksum(1)
pub(crate) const CRED_SLOT_RECORD_LEN: usize = 105;

pub(crate) const RECONNECT_MAGIC: u32 = 0x454C_5243; // "ELRC"
pub(crate) const RECONNECT_VERSION: u8 = 1;
// magic(4) version(1) slot(1) bssid(6) channel(1) checksum(1)
pub(crate) const RECONNECT_RECORD_LEN: usize = 14;

// Parsed by the provisioning console, applied by the connection task (the
// slot store's owner), which then invalidates its credential view.
pub(crate) static CREDENTIAL_COMMANDS: Channel<CriticalSectionRawMutex, CredentialCommand, 2> =
    Channel::new();
