pub(crate) mod candidate;
mod candidates;
pub(crate) mod credentials;
mod reconnect;
mod scan;
mod task;

use esp_radio::wifi::{Config as WifiRuntimeConfig, InternalWifiError, WifiController, WifiError};
use static_cell::StaticCell;

use self::candidates::CandidateList;
use self::credentials::FlashCredentialStore;
use self::reconnect::RtcReconnectCache;

pub(crate) type NetCandidateList = CandidateList<FlashCredentialStore<'static>, RtcReconnectCache>;

const WIFI_RX_QUEUE_SIZE: usize = 3;
const WIFI_TX_QUEUE_SIZE: usize = 2;
const WIFI_STATIC_RX_BUF_NUM: u8 = 4;
const WIFI_DYNAMIC_RX_BUF_NUM: u16 = 8;
const WIFI_DYNAMIC_TX_BUF_NUM: u16 = 8;
const WIFI_RX_BA_WIN: u8 = 3;

pub(crate) struct NetRuntime {
    controller: WifiController<'static>,
    list: NetCandidateList,
}

pub(crate) fn setup(
    wifi: esp_hal::peripherals::WIFI<'static>,
    flash: esp_hal::peripherals::FLASH<'static>,
) -> Result<NetRuntime, &'static str> {
    static RADIO_CTRL: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();

    let radio_ctrl = esp_radio::init().map_err(|err| {
        esp_println::println!("net: esp_radio::init err={:?}", err);
        "net: radio init failed"
    })?;
    let radio_ctrl = RADIO_CTRL.init(radio_ctrl);

    let (controller, _ifaces) = esp_radio::wifi::new(radio_ctrl, wifi, wifi_runtime_config())
        .map_err(|err| match err {
            WifiError::InvalidArguments => "net: wifi init failed invalid_args",
            WifiError::Unsupported => "net: wifi init failed unsupported",
            WifiError::NotInitialized => "net: wifi init failed not_initialized",
            WifiError::InternalError(InternalWifiError::NoMem) => "net: wifi init failed no_mem",
            _ => "net: wifi init failed other",
        })?;

    let store = FlashCredentialStore::new(flash);
    let list = CandidateList::new(store, RtcReconnectCache::new());

    Ok(NetRuntime { controller, list })
}

fn wifi_runtime_config() -> WifiRuntimeConfig {
    WifiRuntimeConfig::default()
        .with_rx_queue_size(WIFI_RX_QUEUE_SIZE)
        .with_tx_queue_size(WIFI_TX_QUEUE_SIZE)
        .with_static_rx_buf_num(WIFI_STATIC_RX_BUF_NUM)
        .with_dynamic_rx_buf_num(WIFI_DYNAMIC_RX_BUF_NUM)
        .with_dynamic_tx_buf_num(WIFI_DYNAMIC_TX_BUF_NUM)
        .with_ampdu_rx_enable(false)
        .with_ampdu_tx_enable(false)
        .with_rx_ba_win(WIFI_RX_BA_WIN)
}

#[embassy_executor::task]
pub(crate) async fn connection_task(runtime: NetRuntime) {
    task::run_connection_task(runtime.controller, runtime.list).await;
}
