use esp_hal::{uart::Uart, Async};
use esp_println::println;

use crate::app::config::{CREDENTIAL_COMMANDS, NET_CMD_BUF_LEN, WIFI_PASSPHRASE_MAX, WIFI_SSID_MAX};
use crate::app::net::candidate::{KeyBuf, SsidBuf};
use crate::app::net::credentials::{CredentialCommand, SlotCredential};

pub(crate) type SerialUart = Uart<'static, Async>;

/// Provisioning console on UART0. One command per CR/LF-terminated line:
///
///   WIFISET <slot> <ssid> [key]
///   WIFICLEAR <slot>
///
/// Applying the command to flash happens in the connection task, which owns
/// the slot store; this task only parses, enqueues, and acknowledges.
#[embassy_executor::task]
pub(crate) async fn provisioning_task(mut uart: SerialUart) {
    let mut reader = LineReader::new();
    let mut rx = [0u8; 1];

    loop {
        let byte = match uart.read_async(&mut rx).await {
            Ok(1) => rx[0],
            Ok(_) => continue,
            Err(err) => {
                println!("net: uart read err={:?}", err);
                continue;
            }
        };

        let Some(line) = reader.push_byte(byte) else {
            continue;
        };
        let Some(command) = parse_credential_command(line) else {
            if starts_with_command_word(line) {
                let _ = uart_write_all(&mut uart, b"WIFI ERR\r\n").await;
            }
            continue;
        };

        if CREDENTIAL_COMMANDS.try_send(command).is_err() {
            let _ = uart_write_all(&mut uart, b"WIFI BUSY\r\n").await;
            continue;
        }
        let _ = uart_write_all(&mut uart, b"WIFI OK\r\n").await;
    }
}

async fn uart_write_all(uart: &mut SerialUart, mut bytes: &[u8]) -> bool {
    while !bytes.is_empty() {
        match uart.write_async(bytes).await {
            Ok(0) => return false,
            Ok(written) => bytes = &bytes[written..],
            Err(_) => return false,
        }
    }
    true
}

/// Accumulates bytes into CR/LF-terminated lines. An overlong line is dropped
/// wholesale; accumulation resumes after the next terminator.
struct LineReader {
    buf: [u8; NET_CMD_BUF_LEN],
    len: usize,
    dropping: bool,
}

impl LineReader {
    const fn new() -> Self {
        Self {
            buf: [0; NET_CMD_BUF_LEN],
            len: 0,
            dropping: false,
        }
    }

    fn push_byte(&mut self, byte: u8) -> Option<&[u8]> {
        if byte == b'\r' || byte == b'\n' {
            let dropped = core::mem::replace(&mut self.dropping, false);
            let len = core::mem::replace(&mut self.len, 0);
            if dropped || len == 0 {
                return None;
            }
            return Some(&self.buf[..len]);
        }

        if self.dropping {
            return None;
        }
        if self.len == self.buf.len() {
            self.len = 0;
            self.dropping = true;
            return None;
        }
        self.buf[self.len] = byte;
        self.len += 1;
        None
    }
}

fn starts_with_command_word(line: &[u8]) -> bool {
    let mut tokens = Tokens::new(line);
    matches!(tokens.next(), Some(b"WIFISET" | b"WIFICLEAR"))
}

fn parse_credential_command(line: &[u8]) -> Option<CredentialCommand> {
    let mut tokens = Tokens::new(line);
    match tokens.next()? {
        b"WIFISET" => {
            let slot = parse_slot(tokens.next()?)?;
            let ssid = tokens.next()?;
            let key = tokens.next().unwrap_or(b"");
            if tokens.next().is_some() {
                return None;
            }
            if ssid.len() > WIFI_SSID_MAX || key.len() > WIFI_PASSPHRASE_MAX {
                return None;
            }
            let credential = SlotCredential {
                ssid: SsidBuf::try_from(core::str::from_utf8(ssid).ok()?).ok()?,
                key: KeyBuf::try_from(core::str::from_utf8(key).ok()?).ok()?,
            };
            Some(CredentialCommand::Set { slot, credential })
        }
        b"WIFICLEAR" => {
            let slot = parse_slot(tokens.next()?)?;
            if tokens.next().is_some() {
                return None;
            }
            Some(CredentialCommand::Clear { slot })
        }
        _ => None,
    }
}

fn parse_slot(token: &[u8]) -> Option<u8> {
    let mut value = 0u32;
    if token.is_empty() {
        return None;
    }
    for &byte in token {
        if !byte.is_ascii_digit() {
            return None;
        }
        value = value.checked_mul(10)?.checked_add((byte - b'0') as u32)?;
    }
    // Slot 0 is the reserved "unset" value and is never writable.
    if value == 0 || value > u8::MAX as u32 {
        return None;
    }
    Some(value as u8)
}

struct Tokens<'a> {
    rest: &'a [u8],
}

impl<'a> Tokens<'a> {
    fn new(line: &'a [u8]) -> Self {
        Self { rest: line }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let mut start = 0;
        while start < self.rest.len() && self.rest[start].is_ascii_whitespace() {
            start += 1;
        }
        let mut end = start;
        while end < self.rest.len() && !self.rest[end].is_ascii_whitespace() {
            end += 1;
        }
        if end == start {
            self.rest = &[];
            return None;
        }
        let token = &self.rest[start..end];
        self.rest = &self.rest[end..];
        Some(token)
    }
}
