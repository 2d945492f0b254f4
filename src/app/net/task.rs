use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Timer};
use esp_println::println;
use esp_radio::wifi::{
    AuthMethod, ClientConfig, ModeConfig, ScanMethod, WifiController, WifiEvent,
};
use heapless::Vec;

use crate::app::config::{
    CREDENTIAL_COMMANDS, NET_ATTEMPT_COOLDOWN_MS, NET_RESCAN_COOLDOWN_MS, SCAN_RESULTS_MAX,
};

use super::candidate::{Candidate, ScanRecord};
use super::credentials::CredentialCommand;
use super::scan::{active_scan_config, scan_record_from_ap};
use super::NetCandidateList;

pub(super) async fn run_connection_task(
    mut controller: WifiController<'static>,
    mut list: NetCandidateList,
) {
    // Construction may have installed a quick-connect selection from the
    // retained record; it is worth one attempt before paying for a scan.
    let mut quick_connect = list.current().cloned();

    loop {
        drain_credential_commands(&mut list);

        if !list.has_known_credentials() {
            println!("net: no credentials configured; waiting");
            let command = CREDENTIAL_COMMANDS.receive().await;
            apply_credential_command(&mut list, command);
            quick_connect = None;
            continue;
        }

        let connected = match quick_connect.take() {
            Some(seed) if seed.usable() => {
                println!(
                    "net: quick connect ssid={} bssid={} channel={}",
                    seed.ssid,
                    seed.bssid_str(),
                    seed.channel
                );
                try_associate(&mut controller, &seed).await
            }
            _ => false,
        };

        let connected = if connected {
            true
        } else {
            let records = scan_once(&mut controller).await;
            list.refresh(&records);
            drain_candidates(&mut controller, &mut list).await
        };

        if connected {
            match select(
                controller.wait_for_event(WifiEvent::StaDisconnected),
                CREDENTIAL_COMMANDS.receive(),
            )
            .await
            {
                Either::First(_) => {
                    println!("net: link lost; rescanning");
                }
                Either::Second(command) => {
                    println!("net: credentials changed; reconnecting");
                    apply_credential_command(&mut list, command);
                    let _ = controller.disconnect_async().await;
                }
            }
        } else {
            Timer::after(Duration::from_millis(NET_RESCAN_COOLDOWN_MS)).await;
        }
    }
}

/// Drain the current cycle one offering at a time. Offerings that fail the
/// usability check (a hidden entry that ran out of credentials) are skipped
/// without an association attempt.
async fn drain_candidates(
    controller: &mut WifiController<'static>,
    list: &mut NetCandidateList,
) -> bool {
    while list.advance() {
        let Some(candidate) = list.current().cloned() else {
            continue;
        };
        if !candidate.usable() {
            continue;
        }
        if try_associate(controller, &candidate).await {
            return true;
        }
        Timer::after(Duration::from_millis(NET_ATTEMPT_COOLDOWN_MS)).await;
    }
    println!("net: candidate cycle exhausted");
    false
}

async fn scan_once(controller: &mut WifiController<'static>) -> Vec<ScanRecord, SCAN_RESULTS_MAX> {
    let mut records = Vec::new();
    if !ensure_started(controller).await {
        return records;
    }
    match controller.scan_with_config_async(active_scan_config()).await {
        Ok(results) => {
            println!("net: scan found={}", results.len());
            for ap in results.iter() {
                if records.push(scan_record_from_ap(ap)).is_err() {
                    break;
                }
            }
        }
        Err(err) => {
            println!("net: scan err={:?}", err);
        }
    }
    records
}

async fn try_associate(controller: &mut WifiController<'static>, candidate: &Candidate) -> bool {
    let Some(mode) = mode_config_for(candidate) else {
        return false;
    };
    if let Err(err) = controller.set_config(&mode) {
        println!("net: station config err={:?}", err);
        return false;
    }
    if !ensure_started(controller).await {
        return false;
    }
    match controller.connect_async().await {
        Ok(()) => {
            println!(
                "net: associated ssid={} slot={}",
                candidate.ssid, candidate.slot
            );
            true
        }
        Err(err) => {
            println!(
                "net: connect err={:?} ssid={} channel={}",
                err, candidate.ssid, candidate.channel
            );
            let _ = controller.disconnect_async().await;
            false
        }
    }
}

fn mode_config_for(candidate: &Candidate) -> Option<ModeConfig> {
    if candidate.ssid.is_empty() {
        return None;
    }
    let auth_method = if candidate.key.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::Wpa2Personal
    };
    let mut client = ClientConfig::default()
        .with_ssid(candidate.ssid.as_str().into())
        .with_password(candidate.key.as_str().into())
        .with_auth_method(auth_method)
        .with_scan_method(ScanMethod::AllChannels);
    if candidate.channel != 0 {
        client = client.with_channel(candidate.channel);
    }
    Some(ModeConfig::Client(client))
}

async fn ensure_started(controller: &mut WifiController<'static>) -> bool {
    match controller.is_started() {
        Ok(true) => true,
        Ok(false) => match controller.start_async().await {
            Ok(()) => true,
            Err(err) => {
                println!("net: wifi start err={:?}", err);
                false
            }
        },
        Err(err) => {
            println!("net: wifi status err={:?}", err);
            false
        }
    }
}

fn apply_credential_command(list: &mut NetCandidateList, command: CredentialCommand) {
    let applied = match command {
        CredentialCommand::Set { slot, credential } => {
            list.slots_mut().write_slot(slot, &credential)
        }
        CredentialCommand::Clear { slot } => list.slots_mut().clear_slot(slot),
    };
    if applied {
        list.invalidate_credentials();
    } else {
        println!("net: credential update rejected");
    }
}

fn drain_credential_commands(list: &mut NetCandidateList) {
    while let Ok(command) = CREDENTIAL_COMMANDS.try_receive() {
        apply_credential_command(list, command);
    }
}
